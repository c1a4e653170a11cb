//! Input/output helpers.
//!
//! - named-run CSV exports (`export`)
//! - run JSON and bias-table JSON (`run`)

pub mod export;
pub mod run;

pub use export::*;
pub use run::*;
