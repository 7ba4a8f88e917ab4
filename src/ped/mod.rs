//! Potential energy diagrams: reaction steps read from a table, drawn as flat bars joined
//! by straight or zero-slope cubic connectors.

pub mod error;
pub mod table;
pub mod curve;
pub mod data;

pub use error::{
    PedError,
    ErrorKind,
};

pub use table::{
    Step,
    Pathway,
    parse_table,
    parse_table_with_colors,
    default_color_shorthands,
};

pub use curve::{
    ConnectMode,
    Layout,
    CubicSegment,
    CurveBuilder,
    CurveSeries,
    cubic_fit,
};

pub use data::{
    write_ped_data,
    save_ped_data,
};
