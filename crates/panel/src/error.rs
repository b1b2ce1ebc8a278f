//! Panel error types.

use thiserror::Error;

/// Errors from panel operations.
///
/// All of these are absorbed by the reporter and relay; they exist so the
/// client's callers can log a useful reason.
#[derive(Debug, Error)]
pub enum PanelError {
    /// Network error talking to the panel
    #[error("network error: {0}")]
    Network(String),

    /// Panel returned an error status
    #[error("panel error: HTTP {0}")]
    Server(u16),
}
