//! `cosmic-variance` library crate.
//!
//! Computes the cosmic variance (fractional count uncertainty from large-scale
//! structure) of a rectangular pencil-beam survey, for dark matter and for
//! galaxies in nine stellar-mass bins.
//!
//! The binary (`cv`) is a thin wrapper around this library so that:
//!
//! - the numeric core is testable without spawning processes
//! - the pipeline is reusable from other tools

pub mod app;
pub mod bias;
pub mod cli;
pub mod cosmo;
pub mod domain;
pub mod error;
pub mod io;
pub mod math;
pub mod report;
pub mod variance;
