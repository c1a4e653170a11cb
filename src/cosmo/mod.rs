//! Background cosmology: distances, linear power spectrum, growth factor.

pub mod distance;
pub mod growth;
pub mod power;

pub use distance::*;
pub use growth::*;
pub use power::*;
