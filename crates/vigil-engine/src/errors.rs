//! Adapter errors
//!
//! Backend failures are raised as [`AdapterError`] and converted into the
//! canonical [`VgError`] at the orchestration boundary.

use thiserror::Error;
use vigil_core::errors::{VgError, VgErrorKind};

#[derive(Error, Debug, Clone, PartialEq)]
pub enum AdapterError {
    /// Transport could not be established or setup failed
    #[error("Connection failed: {reason}")]
    Connect { reason: String },

    /// A live session lost its transport
    #[error("Connection lost: {reason}")]
    TransportLost { reason: String },

    /// The peer sent something the adapter cannot work with
    #[error("Protocol error: {reason}")]
    Protocol { reason: String },

    /// A message could not be sent to one destination
    #[error("Delivery to {destination} failed: {reason}")]
    Delivery { destination: String, reason: String },

    /// Delivery was asked of an adapter without a live session
    #[error("Adapter is not connected")]
    NotConnected,

    #[error("Timed out during {op}")]
    Timeout { op: String },
}

/// Conversion from AdapterError to VgError
impl From<AdapterError> for VgError {
    fn from(err: AdapterError) -> Self {
        let kind = match &err {
            AdapterError::Connect { .. }
            | AdapterError::TransportLost { .. }
            | AdapterError::Protocol { .. } => VgErrorKind::AdapterConnection,
            AdapterError::Delivery { .. } | AdapterError::NotConnected => {
                VgErrorKind::AdapterDelivery
            }
            AdapterError::Timeout { .. } => VgErrorKind::Timeout,
        };
        VgError::new(kind).with_message(err.to_string())
    }
}
