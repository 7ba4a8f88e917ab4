use thiserror::Error;

/// Where a PED input was rejected.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    /// The table itself is malformed, found while parsing.
    Structural,
    /// The table is well formed but cannot be drawn, found while building curves.
    Semantic,
}


#[derive(Debug, Error, Clone, PartialEq)]
pub enum PedError {
    #[error("[PED]: row {row} has no partner row, rows must come in (color/energy, legend/tag) pairs")]
    UnpairedRow { row: usize },

    #[error("[PED]: pathway {legend:?} has {nenergy} energies but {ntag} tags")]
    LengthMismatch {
        legend: String,
        nenergy: usize,
        ntag: usize,
    },

    #[error("[PED]: invalid energy {value:?} at row {row}, column {column}")]
    InvalidEnergy {
        row: usize,
        column: usize,
        value: String,
    },

    #[error("[PED]: pathway {legend:?} contains no steps")]
    EmptyPathway { legend: String },

    #[error("[PED]: malformed table: {0}")]
    Malformed(String),

    #[error("[PED]: no pathway found in the input table")]
    NoPathway,

    #[error("[PED]: invalid connect type {0:?}, available types are `cubic` and `line`")]
    UnknownConnectMode(String),

    #[error("[PED]: the last point of pathway {legend:?} (tag {tag:?}) can't be a transition state")]
    TerminalTransitionState {
        legend: String,
        tag: String,
    },

    #[error("[PED]: cannot fit a cubic between x0 = {x0} and x1 = {x1}")]
    DegenerateSegment { x0: f64, x1: f64 },

    #[error("[PED]: at least 2 samples are needed for each cubic connector, got {0}")]
    TooFewSamples(usize),
}


impl PedError {
    pub fn kind(&self) -> ErrorKind {
        match self {
            Self::UnpairedRow { .. }
            | Self::Malformed(_)
            | Self::LengthMismatch { .. }
            | Self::InvalidEnergy { .. }
            | Self::EmptyPathway { .. }
            | Self::NoPathway => ErrorKind::Structural,

            Self::UnknownConnectMode(_)
            | Self::TerminalTransitionState { .. }
            | Self::DegenerateSegment { .. }
            | Self::TooFewSamples(_) => ErrorKind::Semantic,
        }
    }
}
