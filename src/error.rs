//! Error types used by the rigvisor runtime and its collaborators.
//!
//! This module defines the error enums of the control-plane:
//!
//! - [`InstantiateError`] — errors raised while bringing a component up.
//! - [`TerminateError`] — errors raised while bringing a component down.
//! - [`PersistError`] — errors in the persistent settings document.
//! - [`RuntimeError`] — errors raised by the container itself.
//!
//! The central distinction is [`InstantiateError::is_retryable`]: hardware
//! errors keep the component a ghost and are retried after the scan backoff
//! window; everything else is a model/driver defect and brings the whole
//! container down.

use std::time::Duration;
use thiserror::Error;

/// # Errors produced while instantiating a component.
///
/// Instantiation talks to real hardware, so two failure classes exist:
/// a device that is absent or unresponsive right now ([`Hardware`]), and a
/// defect in the declared model or the driver itself ([`Model`]).
///
/// [`Hardware`]: InstantiateError::Hardware
/// [`Model`]: InstantiateError::Model
#[non_exhaustive]
#[derive(Error, Debug)]
pub enum InstantiateError {
    /// Hardware is not present or not responding; the component stays a
    /// ghost and the attempt is retried after the backoff window.
    #[error("hardware unavailable: {error}")]
    Hardware {
        /// The underlying error message.
        error: String,
    },

    /// Model or driver defect (no retry). Aborts the instantiation loop and
    /// triggers full container shutdown.
    #[error("model error (no retry): {error}")]
    Model {
        /// The underlying error message.
        error: String,
    },
}

impl InstantiateError {
    /// Shorthand for a recoverable hardware failure.
    pub fn hardware(error: impl Into<String>) -> Self {
        InstantiateError::Hardware {
            error: error.into(),
        }
    }

    /// Shorthand for a fatal model/driver failure.
    pub fn model(error: impl Into<String>) -> Self {
        InstantiateError::Model {
            error: error.into(),
        }
    }

    /// Returns a short stable label (snake_case) for use in logs/metrics.
    ///
    /// # Example
    /// ```
    /// use rigvisor::InstantiateError;
    ///
    /// let err = InstantiateError::hardware("no answer on /dev/ttyUSB0");
    /// assert_eq!(err.as_label(), "instantiate_hardware");
    /// ```
    pub fn as_label(&self) -> &'static str {
        match self {
            InstantiateError::Hardware { .. } => "instantiate_hardware",
            InstantiateError::Model { .. } => "instantiate_model",
        }
    }

    /// Indicates whether the error is safe to retry.
    ///
    /// Returns `true` only for [`InstantiateError::Hardware`]; a model error
    /// is never retried.
    ///
    /// # Example
    /// ```
    /// use rigvisor::InstantiateError;
    ///
    /// assert!(InstantiateError::hardware("unplugged").is_retryable());
    /// assert!(!InstantiateError::model("bad role").is_retryable());
    /// ```
    pub fn is_retryable(&self) -> bool {
        matches!(self, InstantiateError::Hardware { .. })
    }
}

/// Error raised while terminating a component or sub-container.
///
/// Termination errors are always caught, published on the bus, and treated as
/// "terminated" for graph-progress purposes; they never block shutdown.
#[derive(Error, Debug)]
#[error("termination failed: {0}")]
pub struct TerminateError(pub String);

impl TerminateError {
    /// Creates a termination error from any message.
    pub fn new(error: impl Into<String>) -> Self {
        TerminateError(error.into())
    }
}

/// # Errors in the persistent settings document.
///
/// Persistence errors are logged and skipped; they never block instantiation
/// or termination.
#[non_exhaustive]
#[derive(Error, Debug)]
pub enum PersistError {
    /// Filesystem error while reading or rewriting the document.
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),

    /// The document on disk is not valid JSON for the expected shape.
    #[error("json error: {0}")]
    Json(#[from] serde_json::Error),
}

impl PersistError {
    /// Returns a short stable label (snake_case) for use in logs/metrics.
    pub fn as_label(&self) -> &'static str {
        match self {
            PersistError::Io(_) => "persist_io",
            PersistError::Json(_) => "persist_json",
        }
    }
}

/// # Errors produced by the container runtime.
#[non_exhaustive]
#[derive(Error, Debug)]
pub enum RuntimeError {
    /// The instantiation loop hit a fatal (non-hardware) error and the
    /// container shut itself down.
    #[error("fatal instantiation error: {reason}")]
    FatalInstantiation {
        /// Message of the fatal instantiation failure.
        reason: String,
    },

    /// The instantiation loop did not stop within the bounded join window;
    /// shutdown proceeded without it.
    #[error("instantiation loop still running after {waited:?}; proceeding with shutdown")]
    StarterStuck {
        /// How long the container waited for the loop to stop.
        waited: Duration,
    },
}

impl RuntimeError {
    /// Returns a short stable label (snake_case) for use in logs/metrics.
    pub fn as_label(&self) -> &'static str {
        match self {
            RuntimeError::FatalInstantiation { .. } => "runtime_fatal_instantiation",
            RuntimeError::StarterStuck { .. } => "runtime_starter_stuck",
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_hardware_is_retryable() {
        assert!(InstantiateError::hardware("device off").is_retryable());
    }

    #[test]
    fn test_model_is_not_retryable() {
        assert!(!InstantiateError::model("unknown child role").is_retryable());
    }

    #[test]
    fn test_labels_are_stable() {
        assert_eq!(
            InstantiateError::hardware("x").as_label(),
            "instantiate_hardware"
        );
        assert_eq!(InstantiateError::model("x").as_label(), "instantiate_model");
        assert_eq!(
            RuntimeError::FatalInstantiation { reason: "x".into() }.as_label(),
            "runtime_fatal_instantiation"
        );
    }
}
