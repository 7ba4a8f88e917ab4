use std::path::PathBuf;

use clap::Args;
use log::{
    info,
    warn,
};

use crate::{
    types::Result,
    OptProcess,
    Poscar,
    settings::Settings,
    neb::{
        InterpolationMethod,
        IdppParams,
        NebOptions,
        NebPath,
        max_displacement,
    },
};


#[derive(Debug, Args)]
/// Generate the initial images for an NEB calculation.
///
/// Images are interpolated between the initial and final structures, optionally refined
/// with the image dependent pair potential (IDPP). Each image is written to `NN/POSCAR`
/// with the constraints of the initial structure, and all images are collected into an
/// XYZ trajectory for visualization.
pub struct Neb {
    #[arg(short, long, default_value = "is/CONTCAR")]
    /// Initial state structure.
    initial: PathBuf,

    #[arg(short, long = "final", default_value = "fs/CONTCAR")]
    /// Final state structure.
    fin: PathBuf,

    #[arg(short, long, value_enum, ignore_case = true)]
    /// Interpolation method. [default: idpp]
    method: Option<InterpolationMethod>,

    #[arg(short, long)]
    /// Number of intermediate images. [default: 5]
    nimages: Option<usize>,

    #[arg(long, default_value = ".")]
    /// Directory where the images are saved.
    save_in: PathBuf,

    #[arg(long)]
    /// Warn if two atoms come closer than this distance in Angstrom. [default: 0.8]
    min_dist: Option<f64>,

    #[arg(long)]
    /// Interpolate the raw fractional coordinates, atoms may travel across the cell.
    no_wrap: bool,

    #[arg(short, long)]
    /// Extra config file in TOML format, overrides `rspath.toml` and the user config.
    config: Option<PathBuf>,
}


impl OptProcess for Neb {
    fn process(&self) -> Result<()> {
        let settings = Settings::load(self.config.as_deref())?.neb;

        let opts = NebOptions {
            method: self.method.unwrap_or(settings.method),
            nimages: self.nimages.unwrap_or(settings.nimages),
            wrap: !self.no_wrap,
            idpp: IdppParams {
                fmax: settings.idpp_fmax,
                max_steps: settings.idpp_steps,
                spring: settings.idpp_spring,
                ..Default::default()
            },
        };
        let min_dist = self.min_dist.unwrap_or(settings.min_dist);

        info!("Reading initial state from {:?}", &self.initial);
        let initial = Poscar::from_file(&self.initial)?;
        info!("Reading final state from {:?}", &self.fin);
        let fin = Poscar::from_file(&self.fin)?;

        info!("Generating {} images with {} interpolation ...", opts.nimages, opts.method);
        let path = NebPath::generate(&initial, &fin, &opts)?;

        if let Some((d, iatom)) = max_displacement(&path.images) {
            info!("Max displacement from initial to final state: {:.4} A of atom {}.", d, iatom);
        }

        match path.check_distances(min_dist)? {
            Some(d) if d < min_dist => warn!("Shortest interatomic distance along the path is {:.3} A, check the images before running NEB.", d),
            Some(d) => info!("Shortest interatomic distance along the path is {:.3} A.", d),
            None => {},
        }

        path.save_in(&self.save_in)?;
        Ok(())
    }
}
