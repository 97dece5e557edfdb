use std::time::Duration;

use macaddr::MacAddr6;

use crate::lywsd03mmc::{Role, SessionState};

pub type BoxError = Box<dyn std::error::Error + Send + Sync>;

pub type Result<T, E = Error> = std::result::Result<T, E>;

#[derive(Debug, thiserror::Error)]
pub enum Error {
    #[error("transport error")]
    Transport(#[source] BoxError),

    #[error("timed out after {timeout:?} while connecting to {address}")]
    ConnectTimeout { address: MacAddr6, timeout: Duration },

    #[error("failed to discover GATT profile")]
    Discovery(#[source] BoxError),

    #[error("{role} attribute not found: handle 0x{handle:02x}")]
    AttributeNotFound { role: Role, handle: u16 },

    #[error("malformed {payload} payload: expected {expected} bytes, got {actual}")]
    MalformedPayload {
        payload: &'static str,
        expected: usize,
        actual: usize,
    },

    #[error("invalid comfort range: {0}")]
    InvalidRange(&'static str),

    #[error("session is closed")]
    SessionClosed,

    #[error("cannot {operation} while session is {state}")]
    InvalidState {
        operation: &'static str,
        state: SessionState,
    },
}

impl Error {
    pub fn transport(err: impl Into<BoxError>) -> Self {
        Error::Transport(err.into())
    }
}

impl From<btleplug::Error> for Error {
    fn from(err: btleplug::Error) -> Self {
        Error::Transport(Box::new(err))
    }
}
