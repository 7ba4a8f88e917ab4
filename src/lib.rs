pub mod types;
pub mod settings;
pub mod vasp_parsers;
pub mod ped;
pub mod neb;
pub mod conv;
pub mod format;
pub mod commands;
pub mod cli;

pub use types::Result;

pub use cli::OptProcess;

pub use vasp_parsers::poscar::{
    Poscar,
    PoscarFormatter,
};

pub use vasp_parsers::outcar::{
    Outcar,
    IonicStep,
};

pub use ped::{
    Pathway,
    PedError,
    CurveBuilder,
    ConnectMode,
};

pub use neb::{
    InterpolationMethod,
    NebOptions,
    NebPath,
};

pub use conv::Convergence;

pub use format::ConvergenceFormat;

pub use settings::Settings;
