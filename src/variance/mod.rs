//! Cosmic variance of a survey box.
//!
//! - `integrator`: the windowed power-spectrum triple integral
//! - `quickcv`: geometry → box → σ for one redshift slice

pub mod integrator;
pub mod quickcv;

pub use integrator::*;
pub use quickcv::*;
