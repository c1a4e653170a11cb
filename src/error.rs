//! Error types.
//!
//! Two layers:
//!
//! - [`CvError`]: typed failures of the numeric core (distance, power spectrum,
//!   growth, quadrature). Callers can match on the failure mode.
//! - [`AppError`]: what the `cv` binary reports, a message plus a process exit code.

use thiserror::Error;

/// Failures raised by the numeric core.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum CvError {
    /// Parameters that make a formula non-real or divide by zero
    /// (e.g. a negative `E(z)^2`, or `omega_m = 0` in the growth factor).
    #[error("numeric domain error: {0}")]
    NumericDomain(String),

    /// Quadrature did not reach its tolerance within the subdivision limit,
    /// or produced a non-finite value.
    #[error("integration did not converge (result={result:e}, abserr={abserr:e})")]
    IntegrationNonConvergence { result: f64, abserr: f64 },

    /// A deadline passed while a quadrature was still running.
    #[error("integration timed out after {elapsed_secs:.1}s")]
    IntegrationTimeout { elapsed_secs: f64 },

    /// Caller-supplied values that violate an input contract.
    #[error("invalid input: {0}")]
    InvalidInput(String),
}

impl CvError {
    pub fn invalid(message: impl Into<String>) -> Self {
        CvError::InvalidInput(message.into())
    }

    pub fn domain(message: impl Into<String>) -> Self {
        CvError::NumericDomain(message.into())
    }

    /// Exit code used when this error terminates the `cv` binary.
    pub fn exit_code(&self) -> u8 {
        match self {
            CvError::InvalidInput(_) => 2,
            CvError::NumericDomain(_) => 3,
            CvError::IntegrationNonConvergence { .. } | CvError::IntegrationTimeout { .. } => 4,
        }
    }
}

#[derive(Clone)]
pub struct AppError {
    exit_code: u8,
    message: String,
}

impl AppError {
    pub fn new(exit_code: u8, message: impl Into<String>) -> Self {
        Self {
            exit_code,
            message: message.into(),
        }
    }

    pub fn exit_code(&self) -> u8 {
        self.exit_code
    }
}

impl From<CvError> for AppError {
    fn from(err: CvError) -> Self {
        AppError::new(err.exit_code(), err.to_string())
    }
}

impl std::fmt::Display for AppError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.message)
    }
}

impl std::fmt::Debug for AppError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AppError")
            .field("exit_code", &self.exit_code)
            .field("message", &self.message)
            .finish()
    }
}

impl std::error::Error for AppError {}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn exit_codes_follow_failure_kind() {
        assert_eq!(CvError::invalid("x").exit_code(), 2);
        assert_eq!(CvError::domain("x").exit_code(), 3);
        assert_eq!(
            CvError::IntegrationNonConvergence { result: 1.0, abserr: 0.5 }.exit_code(),
            4
        );
        assert_eq!(CvError::IntegrationTimeout { elapsed_secs: 2.0 }.exit_code(), 4);
    }

    #[test]
    fn app_error_keeps_core_message() {
        let app: AppError = CvError::invalid("redshift edges must be strictly increasing").into();
        assert_eq!(app.exit_code(), 2);
        assert!(app.to_string().contains("strictly increasing"));
    }
}
