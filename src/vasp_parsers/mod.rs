pub mod poscar;
pub mod outcar;
