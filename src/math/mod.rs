//! Mathematical utilities: adaptive quadrature and the sinc window.

pub mod quad;
pub mod window;

pub use quad::*;
pub use window::*;
