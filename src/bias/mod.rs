//! Stellar-mass bias table applied to dark-matter σ.

pub mod table;

pub use table::*;
