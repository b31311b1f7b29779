use crate::violation::{AvnId, Rupees};
use thiserror::Error;

#[derive(Debug, Error, PartialEq)]
pub enum RegistryError {
    #[error("AVN #{0} not found")]
    UnknownViolation(AvnId),

    #[error("airline '{0}' not found")]
    UnknownAirline(String),

    #[error("insufficient payment for AVN #{id}: required PKR {required}, offered PKR {offered}, short by PKR {shortfall}")]
    InsufficientPayment {
        id: AvnId,
        required: Rupees,
        offered: Rupees,
        shortfall: Rupees,
    },
}

#[derive(Debug, Error, PartialEq)]
pub enum WireError {
    #[error("frame too short: expected {expected}, got {actual}")]
    BufferTooShort { expected: usize, actual: usize },

    #[error("unsupported wire version {0}")]
    UnsupportedVersion(u8),

    #[error("unknown message kind {0}")]
    UnknownKind(u8),

    #[error("field {field} declares {len} bytes, capacity is {capacity}")]
    FieldTooLong {
        field: &'static str,
        len: usize,
        capacity: usize,
    },

    #[error("field {0} is not valid UTF-8")]
    InvalidUtf8(&'static str),
}

#[derive(Debug, Error)]
pub enum IpcError {
    #[error("channel to {0} is closed")]
    Disconnected(&'static str),

    #[error(transparent)]
    Wire(#[from] WireError),

    #[error("failed to start {name}: {source}")]
    Spawn {
        name: &'static str,
        #[source]
        source: std::io::Error,
    },
}

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("cannot read scenario: {0}")]
    Io(#[from] std::io::Error),

    #[error("cannot parse scenario: {0}")]
    Parse(#[from] serde_json::Error),

    #[error("invalid scenario: {0}")]
    Invalid(String),
}
