use std::{
    fmt,
    fs,
    path::Path,
};

use anyhow::{
    Context,
    bail,
    ensure,
};
use log::warn;

use crate::{
    types::{
        Result,
        Mat33,
        MatX3,
        frac_to_cart,
        cart_to_frac,
        mat33_det,
        mat33_inv,
    },
    commands::common::read_text_file,
};


#[derive(Clone, Debug, PartialEq)]
pub struct Poscar {
    pub comment: String,
    pub scale: f64,
    /// Scaled lattice vectors, one per row.
    pub cell: Mat33<f64>,
    pub ion_types: Vec<String>,
    pub ions_per_type: Vec<i32>,
    pub pos_cart: MatX3<f64>,
    pub pos_frac: MatX3<f64>,
    /// Selective dynamics flags, `true` means the coordinate is free to move.
    pub constraints: Option<MatX3<bool>>,
}


impl Poscar {
    pub fn from_file(path: &(impl AsRef<Path> + ?Sized)) -> Result<Self> {
        let content = read_text_file(path)?;
        Self::from_str(&content)
            .with_context(|| format!("Parse POSCAR file {:?} failed.", path.as_ref()))
    }

    #[allow(clippy::should_implement_trait)]
    pub fn from_str(content: &str) -> Result<Self> {
        let mut lines = content.lines()
            .enumerate()
            .map(|(i, l)| (i + 1, l));

        let mut next_line = |what: &str| {
            lines.next()
                .with_context(|| format!("Unexpected end of POSCAR while reading {}", what))
        };

        let comment = next_line("comment")?.1.trim().to_string();

        let (iline, l) = next_line("scale")?;
        let scale = l.split_whitespace()
            .next()
            .context("Empty scale line")?
            .parse::<f64>()
            .with_context(|| format!("Invalid scale at line {}", iline))?;
        ensure!(scale != 0.0, "Scale factor can't be zero.");

        let mut cell = [[0.0f64; 3]; 3];
        for row in cell.iter_mut() {
            let (iline, l) = next_line("lattice vectors")?;
            *row = parse_vec3(l)
                .with_context(|| format!("Invalid lattice vector at line {}", iline))?;
        }

        let scale_factor = if scale > 0.0 {
            scale
        } else {
            let volume = mat33_det(&cell).abs();
            ensure!(volume > 0.0, "Cell with zero volume can't be scaled to a target volume.");
            (scale.abs() / volume).cbrt()
        };
        for row in cell.iter_mut() {
            for v in row.iter_mut() {
                *v *= scale_factor;
            }
        }

        let (iline, l) = next_line("element symbols")?;
        if l.split_whitespace().all(|s| s.parse::<i32>().is_ok()) {
            bail!("Element symbols are missing at line {}, only VASP5 format POSCAR is supported.", iline);
        }
        let ion_types = l.split_whitespace()
            .map(|s| s.split('/').next().unwrap_or(s).to_string())
            .collect::<Vec<String>>();

        let (iline, l) = next_line("ion counts")?;
        let ions_per_type = l.split_whitespace()
            .map(|s| s.parse::<i32>())
            .collect::<std::result::Result<Vec<i32>, _>>()
            .with_context(|| format!("Invalid ion counts at line {}", iline))?;
        ensure!(ions_per_type.len() == ion_types.len(),
            "Number of element symbols ({}) and number of ion counts ({}) are inconsistent.",
            ion_types.len(), ions_per_type.len());
        ensure!(ions_per_type.iter().all(|&n| n > 0), "Ion counts must be positive.");
        let nions = ions_per_type.iter().sum::<i32>() as usize;

        let (_, mut l) = next_line("coordinate type")?;
        let selective = l.trim_start().starts_with(|c: char| c == 's' || c == 'S');
        if selective {
            l = next_line("coordinate type")?.1;
        }
        let is_direct = match l.trim_start().chars().next() {
            Some('c') | Some('C') | Some('k') | Some('K') => false,
            _ => true,
        };

        let mut positions: MatX3<f64> = Vec::with_capacity(nions);
        let mut flags: MatX3<bool> = Vec::with_capacity(nions);
        for _ in 0 .. nions {
            let (iline, l) = next_line("coordinates")?;
            positions.push(parse_vec3(l)
                .with_context(|| format!("Invalid coordinate at line {}", iline))?);

            if selective {
                let f = l.split_whitespace()
                    .skip(3)
                    .take(3)
                    .map(|s| match s.chars().next() {
                        Some('T') | Some('t') => Ok(true),
                        Some('F') | Some('f') => Ok(false),
                        _ => bail!("Invalid selective dynamics flag {:?} at line {}", s, iline),
                    })
                    .collect::<Result<Vec<bool>>>()?;
                ensure!(f.len() == 3, "Selective dynamics flags are missing at line {}", iline);
                flags.push([f[0], f[1], f[2]]);
            }
        }

        let inv_cell = mat33_inv(&cell).context("The lattice vectors are linearly dependent.")?;
        let (pos_cart, pos_frac) = if is_direct {
            let cart = positions.iter().map(|p| frac_to_cart(p, &cell)).collect();
            (cart, positions)
        } else {
            let cart = positions.iter()
                .map(|p| [p[0] * scale_factor, p[1] * scale_factor, p[2] * scale_factor])
                .collect::<MatX3<f64>>();
            let frac = cart.iter().map(|p| cart_to_frac(p, &inv_cell)).collect();
            (cart, frac)
        };

        if scale < 0.0 {
            warn!("Negative scale in POSCAR is treated as target volume, the cell is rescaled.");
        }

        Ok(Self {
            comment,
            scale: 1.0,
            cell,
            ion_types,
            ions_per_type,
            pos_cart,
            pos_frac,
            constraints: if selective { Some(flags) } else { None },
        })
    }

    /// Build a structure from fractional coordinates.
    pub fn from_frac(
        comment: String,
        cell: Mat33<f64>,
        ion_types: Vec<String>,
        ions_per_type: Vec<i32>,
        pos_frac: MatX3<f64>,
        constraints: Option<MatX3<bool>>,
    ) -> Self {
        let pos_cart = pos_frac.iter().map(|p| frac_to_cart(p, &cell)).collect();
        Self {
            comment,
            scale: 1.0,
            cell,
            ion_types,
            ions_per_type,
            pos_cart,
            pos_frac,
            constraints,
        }
    }

    pub fn nions(&self) -> usize {
        self.pos_frac.len()
    }

    /// Element symbol of each atom.
    pub fn symbols(&self) -> Vec<String> {
        self.ion_types.iter()
            .zip(self.ions_per_type.iter())
            .flat_map(|(t, &n)| std::iter::repeat(t.clone()).take(n as usize))
            .collect()
    }

    pub fn volume(&self) -> f64 {
        mat33_det(&self.cell).abs()
    }

    pub fn to_formatter(&self) -> PoscarFormatter<'_> {
        PoscarFormatter::new(self)
    }

    pub fn to_file(&self, path: &(impl AsRef<Path> + ?Sized)) -> Result<()> {
        fs::write(path, self.to_formatter().to_string())
            .with_context(|| format!("Write POSCAR to {:?} failed.", path.as_ref()))?;
        Ok(())
    }
}


fn parse_vec3(line: &str) -> Result<[f64; 3]> {
    let v = line.split_whitespace()
        .take(3)
        .map(|s| s.parse::<f64>())
        .collect::<std::result::Result<Vec<f64>, _>>()?;
    ensure!(v.len() == 3, "Three numbers are expected in {:?}", line);
    Ok([v[0], v[1], v[2]])
}


/// VASP5 style POSCAR writer with direct coordinates.
pub struct PoscarFormatter<'a> {
    pub poscar: &'a Poscar,
    pub preserve_constraints: bool,
}


impl<'a> PoscarFormatter<'a> {
    pub fn new(poscar: &'a Poscar) -> Self {
        Self {
            poscar,
            preserve_constraints: true,
        }
    }

    pub fn preserve_constraints(mut self, flag: bool) -> Self {
        self.preserve_constraints = flag;
        self
    }
}


impl fmt::Display for PoscarFormatter<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let poscar = self.poscar;

        writeln!(f, "{}", poscar.comment)?;
        writeln!(f, "{:19.14}", 1.0)?;
        for row in poscar.cell.iter() {
            writeln!(f, " {:22.16}{:22.16}{:22.16}", row[0], row[1], row[2])?;
        }

        let symbols = poscar.ion_types.iter()
            .map(|s| format!("{:>5}", s))
            .collect::<String>();
        let counts = poscar.ions_per_type.iter()
            .map(|n| format!("{:>5}", n))
            .collect::<String>();
        writeln!(f, "{}", symbols)?;
        writeln!(f, "{}", counts)?;

        let constraints = if self.preserve_constraints {
            poscar.constraints.as_ref()
        } else {
            None
        };

        if constraints.is_some() {
            writeln!(f, "Selective dynamics")?;
        }
        writeln!(f, "Direct")?;

        for (i, p) in poscar.pos_frac.iter().enumerate() {
            write!(f, " {:20.16}{:20.16}{:20.16}", p[0], p[1], p[2])?;
            if let Some(c) = constraints {
                let tf = |b: bool| if b { "T" } else { "F" };
                write!(f, "   {}   {}   {}", tf(c[i][0]), tf(c[i][1]), tf(c[i][2]))?;
            }
            writeln!(f)?;
        }

        Ok(())
    }
}
