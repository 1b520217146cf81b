//! Reconciliation domain errors

use core_kernel::PortError;
use thiserror::Error;

/// Errors that can occur during a reconciliation pass
#[derive(Debug, Error)]
pub enum ReconciliationError {
    /// The enrollment directory could not be read; the scan cannot start
    #[error("Enrollment directory unavailable: {0}")]
    Directory(#[source] PortError),

    /// Invalid run parameters
    #[error("Invalid run parameters: {0}")]
    InvalidParameters(String),
}
