//! Error types for record store operations.
use std::error::Error as StdError;
use std::fmt;

use serde::Serialize;

/// Errors while executing operations against the record stores.
/// The intent is to categorize errors into two major types:
///  * Errors related to data. Ex RecordNotFound
///  * Errors related to interactions with the backing store itself. Ex StoreUnavailable
#[derive(Debug)]
pub struct Error {
    // Underlying error emitted from the store implementation
    pub source: Option<Box<dyn StdError + Send + Sync>>,
    // Enum representing which category of error
    pub error_kind: RecordStoreErrorKind,
}

#[derive(Debug, PartialEq, Serialize)]
pub enum RecordStoreErrorKind {
    // Record not found
    RecordNotFound,
    // Record not updated
    RecordNotUpdated,
    // Errors related to interactions with the backing store itself
    StoreUnavailable,
    // Other errors
    Other,
}

impl Error {
    pub fn not_found() -> Self {
        Error {
            source: None,
            error_kind: RecordStoreErrorKind::RecordNotFound,
        }
    }
}

impl fmt::Display for Error {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "Record Store Error: {:?}", self)
    }
}

impl StdError for Error {
    fn source(&self) -> Option<&(dyn StdError + 'static)> {
        self.source
            .as_ref()
            .map(|e| e.as_ref() as &(dyn StdError + 'static))
    }
}
