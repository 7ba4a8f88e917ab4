//! Convergence of force and energy along the ionic steps of a relaxation.

use std::{
    fs,
    io::{
        BufWriter,
        Write,
    },
    path::Path,
};

use anyhow::ensure;
use ndarray::{
    Array2,
    Axis,
};

use crate::{
    types::{
        Result,
        MatX3,
    },
    vasp_parsers::outcar::Outcar,
};


#[derive(Clone, Debug, PartialEq)]
pub struct StepConvergence {
    /// Ionic step index, starts from 1.
    pub step: usize,
    /// energy(sigma->0) in eV.
    pub energy: f64,
    /// Free energy TOTEN in eV.
    pub toten: f64,
    pub nscf: i32,
    /// Norm of the constrained force on each atom.
    pub total_forces: Vec<f64>,
    pub fmax: f64,
    /// Atom carrying `fmax`, starts from 1.
    pub fmax_index: usize,
    /// Averaged over atoms that are not fixed in all three directions.
    pub favg: f64,
}


#[derive(Clone, Copy, Debug, PartialEq)]
pub enum Criterion {
    /// EDIFFG < 0, stop when every force component drops below |EDIFFG| eV/A.
    Force(f64),
    /// EDIFFG >= 0, stop when the energy change between two ionic steps is below EDIFFG eV.
    Energy(f64),
}


impl Criterion {
    pub fn from_ediffg(ediffg: f64) -> Self {
        if ediffg < 0.0 {
            Self::Force(ediffg.abs())
        } else {
            Self::Energy(ediffg)
        }
    }
}


#[derive(Clone, Debug, PartialEq)]
pub struct Convergence {
    pub symbols: Vec<String>,
    /// Selective dynamics flags, `true` means free.
    pub constraints: MatX3<bool>,
    /// Number of atoms fixed in all three directions.
    pub nfix: usize,
    pub criterion: Option<Criterion>,
    pub steps: Vec<StepConvergence>,
}


impl Convergence {
    /// Constrained forces of each ionic step. Atoms without constraints are treated as free.
    pub fn from_outcar(outcar: &Outcar, symbols: Vec<String>, constraints: Option<MatX3<bool>>) -> Result<Self> {
        let nions = outcar.nions;
        let constraints = constraints.unwrap_or_else(|| vec![[true; 3]; nions]);
        ensure!(constraints.len() == nions,
            "Number of atoms in POSCAR ({}) and OUTCAR ({}) are inconsistent.", constraints.len(), nions);
        ensure!(symbols.len() == nions,
            "{} element symbols are given but there are {} atoms.", symbols.len(), nions);
        ensure!(!outcar.ion_iters.is_empty(), "No complete ionic step found in OUTCAR.");

        let mask = Array2::from_shape_fn((nions, 3), |(i, j)| {
            if constraints[i][j] { 1.0 } else { 0.0 }
        });
        let nfix = constraints.iter()
            .filter(|c| c.iter().all(|&x| !x))
            .count();
        let nfree = nions - nfix;

        let steps = outcar.ion_iters.iter()
            .enumerate()
            .map(|(i, it)| {
                let forces = Array2::from_shape_fn((nions, 3), |(a, k)| it.forces[a][k]) * &mask;
                let total_forces = forces.map_axis(Axis(1), |f| f.dot(&f).sqrt()).to_vec();

                let (fmax_index, fmax) = total_forces.iter()
                    .copied()
                    .enumerate()
                    .fold((0, f64::NEG_INFINITY), |acc, (i, f)| if f > acc.1 { (i, f) } else { acc });

                let favg = if nfree > 0 {
                    total_forces.iter().sum::<f64>() / nfree as f64
                } else {
                    0.0
                };

                StepConvergence {
                    step: i + 1,
                    energy: it.toten_z,
                    toten: it.toten,
                    nscf: it.nscf,
                    total_forces,
                    fmax,
                    fmax_index: fmax_index + 1,
                    favg,
                }
            })
            .collect::<Vec<StepConvergence>>();

        Ok(Self {
            symbols,
            constraints,
            nfix,
            criterion: outcar.ediffg.map(Criterion::from_ediffg),
            steps,
        })
    }

    pub fn nions(&self) -> usize {
        self.constraints.len()
    }

    pub fn last(&self) -> &StepConvergence {
        &self.steps[self.steps.len() - 1]
    }

    /// Energy change of each step with respect to the previous one, 0 for the first step.
    pub fn energy_changes(&self) -> Vec<f64> {
        std::iter::once(0.0)
            .chain(self.steps.windows(2).map(|w| w[1].energy - w[0].energy))
            .collect()
    }

    /// `None` if the stopping criterion is unknown.
    pub fn is_converged(&self) -> Option<bool> {
        let last = self.last();
        match self.criterion? {
            Criterion::Force(f)  => Some(last.fmax < f),
            Criterion::Energy(e) => {
                if self.steps.len() < 2 {
                    Some(false)
                } else {
                    let de = self.energy_changes()[self.steps.len() - 1];
                    Some(de.abs() < e)
                }
            },
        }
    }

    /// The last `n` steps, all of them if `n` is 0 or too large.
    pub fn tail(&self, n: usize) -> &[StepConvergence] {
        let len = self.steps.len();
        if n == 0 || n >= len {
            &self.steps
        } else {
            &self.steps[len - n ..]
        }
    }

    pub fn summary(&self) -> String {
        let last = self.last();
        format!("After {} ionic steps, max force converged to {:.6} at atom {}, energy(sigma->0): {}.\n\
{} of {} atoms were fixed, average force: {:.6}.",
            self.steps.len(), last.fmax, last.fmax_index, last.energy,
            self.nfix, self.nions(), last.favg)
    }

    /// Per-atom positions and forces of every step, as `check_conv.log`.
    pub fn write_log<W: Write>(&self, mut w: W, outcar: &Outcar) -> Result<()> {
        let tf = |b: bool| if b { "T" } else { "F" };

        for (s, it) in self.steps.iter().zip(outcar.ion_iters.iter()) {
            writeln!(w, "Ionic step: {:>4}", s.step)?;
            writeln!(w, "-------atom-------||---------Position x y z----------------||-------------------Force x y z total------------")?;
            for (i, ((p, f), c)) in it.positions.iter()
                .zip(it.forces.iter())
                .zip(self.constraints.iter())
                .enumerate() {
                write!(w, "{:>4}{:>4}  ", i + 1, self.symbols[i])?;
                write!(w, "{:>3}{:>3}{:>3}", tf(c[0]), tf(c[1]), tf(c[2]))?;
                for v in p.iter().chain(f.iter()) {
                    write!(w, "{:13.7}", v)?;
                }
                writeln!(w, "{:12.7}", s.total_forces[i])?;
            }
            writeln!(w, "{}", "-".repeat(109))?;
            writeln!(w, "Step {}: max force {:.6} at atom {}, energy(sigma->0): {}.",
                     s.step, s.fmax, s.fmax_index, s.energy)?;
            writeln!(w, "Free energy TOTEN: {} eV.", s.toten)?;
            writeln!(w, "{} of {} atoms were fixed, average force: {:.6}.", self.nfix, self.nions(), s.favg)?;
            writeln!(w)?;
        }
        Ok(())
    }

    pub fn save_log(&self, file_name: &(impl AsRef<Path> + ?Sized), outcar: &Outcar) -> Result<()> {
        let f = fs::File::create(file_name)?;
        let mut w = BufWriter::new(f);
        self.write_log(&mut w, outcar)?;
        w.flush()?;
        Ok(())
    }
}
