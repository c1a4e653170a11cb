//! Terminal output for batch runs and single slices.

pub mod format;

pub use format::*;
