//! Initial guess of NEB images between two relaxed structures.

pub mod interpolate;
pub mod idpp;
pub mod xyz;

use std::{
    fmt,
    fs,
    path::Path,
};

use anyhow::{
    Context,
    ensure,
};
use clap::ValueEnum;
use log::{
    info,
    warn,
};
use serde::{
    Serialize,
    Deserialize,
};

use crate::{
    types::{
        Result,
        MatX3,
        cart_to_frac,
        mat33_inv,
    },
    vasp_parsers::poscar::Poscar,
};

pub use interpolate::{
    check_compatible,
    frac_displacements,
    linear_images,
    min_interatomic_distance,
    max_displacement,
};
pub use idpp::{
    IdppParams,
    IdppReport,
    idpp_relax,
};
pub use xyz::{
    write_xyz_frame,
    save_xyz_movie,
};


#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, ValueEnum, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum InterpolationMethod {
    /// Straight line interpolation of fractional coordinates.
    #[value(alias = "line")]
    #[serde(alias = "line")]
    Linear,
    /// Linear interpolation refined with the image dependent pair potential.
    #[default]
    Idpp,
}


impl InterpolationMethod {
    /// Tag used in the trajectory file name.
    pub fn tag(&self) -> &'static str {
        match self {
            Self::Linear => "line",
            Self::Idpp   => "idpp",
        }
    }
}


impl fmt::Display for InterpolationMethod {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Linear => write!(f, "linear"),
            Self::Idpp   => write!(f, "idpp"),
        }
    }
}


#[derive(Clone, Debug, PartialEq)]
pub struct NebOptions {
    pub method: InterpolationMethod,
    /// Number of intermediate images.
    pub nimages: usize,
    /// Fold displacements to the nearest periodic image.
    pub wrap: bool,
    pub idpp: IdppParams,
}


impl Default for NebOptions {
    fn default() -> Self {
        Self {
            method: InterpolationMethod::default(),
            nimages: 5,
            wrap: true,
            idpp: IdppParams::default(),
        }
    }
}


/// Generated band, end points included.
#[derive(Clone, Debug)]
pub struct NebPath {
    pub method: InterpolationMethod,
    pub images: Vec<Poscar>,
    pub idpp_report: Option<IdppReport>,
}


impl NebPath {
    pub fn generate(initial: &Poscar, fin: &Poscar, opts: &NebOptions) -> Result<Self> {
        ensure!(opts.nimages > 0, "At least one intermediate image is required.");
        let mut images = linear_images(initial, fin, opts.nimages, opts.wrap)?;

        let idpp_report = match opts.method {
            InterpolationMethod::Linear => None,
            InterpolationMethod::Idpp => {
                let free = initial.constraints.clone()
                    .unwrap_or_else(|| vec![[true; 3]; initial.nions()]);
                let mut band = images.iter()
                    .map(|img| img.pos_cart.clone())
                    .collect::<Vec<MatX3<f64>>>();

                let report = idpp_relax(&mut band, &free, &opts.idpp);
                if !report.converged {
                    warn!("IDPP not converged after {} steps, fmax = {:.5} eV/A. The images are still written.",
                          report.nsteps, report.fmax);
                }

                for (img, cart) in images.iter_mut().zip(band.into_iter()) {
                    let inv_cell = mat33_inv(&img.cell).context("The lattice vectors are linearly dependent.")?;
                    img.pos_frac = cart.iter().map(|p| cart_to_frac(p, &inv_cell)).collect();
                    img.pos_cart = cart;
                }
                Some(report)
            },
        };

        Ok(Self {
            method: opts.method,
            images,
            idpp_report,
        })
    }

    /// Warn about images with atoms closer than `min_dist` A, returns the smallest distance found.
    pub fn check_distances(&self, min_dist: f64) -> Result<Option<f64>> {
        let mut shortest: Option<f64> = None;
        for (i, img) in self.images.iter().enumerate() {
            if let Some((d, a, b)) = min_interatomic_distance(img)? {
                if d < min_dist {
                    warn!("Image {:02}: atoms {} and {} are only {:.3} A apart.", i, a, b, d);
                }
                shortest = Some(shortest.map_or(d, |s: f64| s.min(d)));
            }
        }
        Ok(shortest)
    }

    /// `00/POSCAR` .. `NN/POSCAR` and `movie_<method>.xyz` under `prefix`.
    pub fn save_in(&self, prefix: &(impl AsRef<Path> + ?Sized)) -> Result<()> {
        let prefix = prefix.as_ref();
        fs::create_dir_all(prefix)?;

        for (i, img) in self.images.iter().enumerate() {
            let dir = prefix.join(format!("{:02}", i));
            fs::create_dir_all(&dir)
                .with_context(|| format!("Cannot create directory {:?}", dir))?;
            img.to_file(&dir.join("POSCAR"))?;
        }
        info!("Written {} images to {:?}", self.images.len(), prefix);

        let movie = prefix.join(format!("movie_{}.xyz", self.method.tag()));
        save_xyz_movie(&movie, &self.images)?;
        info!("Trajectory written to {:?}", movie);
        Ok(())
    }
}
