use std::fmt;

use crate::ingest::SendError;

/// Why a single record could not be forwarded.
///
/// Never fatal for the batch; the record's id is reported back for redelivery.
#[derive(Debug)]
pub enum RecordError {
    /// A pre-formed body could not be read back as an event.
    Normalize(serde_json::Error),
    Send(SendError),
    /// The batch deadline passed before the record was delivered.
    DeadlineExceeded,
}

impl fmt::Display for RecordError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            RecordError::Normalize(e) => write!(f, "normalize event failed: {}", e),
            RecordError::Send(e) => write!(f, "{}", e),
            RecordError::DeadlineExceeded => write!(f, "batch deadline exceeded"),
        }
    }
}

impl std::error::Error for RecordError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            RecordError::Normalize(e) => Some(e),
            RecordError::Send(e) => Some(e),
            RecordError::DeadlineExceeded => None,
        }
    }
}

impl From<serde_json::Error> for RecordError {
    fn from(e: serde_json::Error) -> Self {
        RecordError::Normalize(e)
    }
}

impl From<SendError> for RecordError {
    fn from(e: SendError) -> Self {
        RecordError::Send(e)
    }
}
