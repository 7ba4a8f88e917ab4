pub mod common;
pub mod ped;
pub mod neb;
pub mod conv;
