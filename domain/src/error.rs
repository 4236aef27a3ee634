//! Error types for the `domain` layer.
use meeting_ai::Error as MeetingAiError;
use record_store::error::Error as RecordStoreError;
use std::error::Error as StdError;
use std::fmt;

/// Top-level domain error type.
/// Errors in the domain layer are modeled as a tree structure with
/// `domain::error::Error` as the root type holding a tree of `error_kind`
/// enums that represent the kinds of errors that can occur in the pipeline or
/// in lower layers. The `source` field holds the original error that caused
/// the domain error. The intent is to translate errors between layers while
/// maintaining layer boundaries: `domain` depends on `meeting-ai` and
/// `record_store`, but consumers of `domain` never see those crates' error
/// types directly. The `error_kind` tree is what the orchestrator uses to
/// decide retries, fallbacks, and terminal meeting states.
#[derive(Debug)]
pub struct Error {
    pub source: Option<Box<dyn StdError + Send + Sync>>,
    pub error_kind: DomainErrorKind,
}

/// Enum representing the major categories of errors that can occur in the `domain` layer.
#[derive(Debug, PartialEq)]
pub enum DomainErrorKind {
    Internal(InternalErrorKind),
    External(ExternalErrorKind),
}

/// Enum representing the various kinds of internal errors that can occur in the `domain` layer.
#[derive(Debug, PartialEq)]
pub enum InternalErrorKind {
    /// Missing or malformed credentials/configuration. Never retried.
    Config,
    /// Zero-byte or missing audio input. Never retried.
    EmptyInput,
    /// Local audio split tool failure. Triggers chunk cleanup.
    Segmentation,
    /// Record store write failure.
    Persistence,
    Other(String),
}

/// Enum representing the various kinds of external errors that can occur in the `domain` layer.
#[derive(Debug, PartialEq)]
pub enum ExternalErrorKind {
    Network,
    /// Credential rejected by the remote service.
    Authentication,
    /// Rate-limit or abuse signal; callers stop or defer retries.
    RateLimited,
    Other(String),
}

impl Error {
    pub fn empty_input(message: &str) -> Self {
        Error {
            source: None,
            error_kind: DomainErrorKind::Internal(InternalErrorKind::EmptyInput),
        }
        .with_context(message)
    }

    pub fn segmentation(message: String) -> Self {
        Error {
            source: Some(message.into()),
            error_kind: DomainErrorKind::Internal(InternalErrorKind::Segmentation),
        }
    }

    fn with_context(mut self, message: &str) -> Self {
        if self.source.is_none() {
            self.source = Some(message.to_string().into());
        }
        self
    }
}

impl fmt::Display for Error {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match &self.source {
            Some(source) => write!(f, "{:?}: {}", self.error_kind, source),
            None => write!(f, "{:?}", self.error_kind),
        }
    }
}

impl StdError for Error {
    fn source(&self) -> Option<&(dyn StdError + 'static)> {
        self.source
            .as_ref()
            .map(|e| e.as_ref() as &(dyn StdError + 'static))
    }
}

// This is where we translate errors from the `meeting-ai` layer to the
// `domain` layer.
impl From<MeetingAiError> for Error {
    fn from(err: MeetingAiError) -> Self {
        let error_kind = match &err {
            MeetingAiError::Configuration(_) => {
                DomainErrorKind::Internal(InternalErrorKind::Config)
            }
            MeetingAiError::EmptyInput(_) => {
                DomainErrorKind::Internal(InternalErrorKind::EmptyInput)
            }
            MeetingAiError::Authentication(_) => {
                DomainErrorKind::External(ExternalErrorKind::Authentication)
            }
            MeetingAiError::Network(_) => DomainErrorKind::External(ExternalErrorKind::Network),
            MeetingAiError::RateLimited { .. } => {
                DomainErrorKind::External(ExternalErrorKind::RateLimited)
            }
            MeetingAiError::Provider(msg) | MeetingAiError::Deserialization(msg) => {
                DomainErrorKind::External(ExternalErrorKind::Other(msg.clone()))
            }
            MeetingAiError::Other(_) => {
                DomainErrorKind::External(ExternalErrorKind::Other("provider error".to_string()))
            }
        };

        Error {
            source: Some(Box::new(err)),
            error_kind,
        }
    }
}

// This is where we translate errors from the `record_store` layer to the
// `domain` layer.
impl From<RecordStoreError> for Error {
    fn from(err: RecordStoreError) -> Self {
        Error {
            source: Some(Box::new(err)),
            error_kind: DomainErrorKind::Internal(InternalErrorKind::Persistence),
        }
    }
}

impl From<reqwest::Error> for Error {
    fn from(err: reqwest::Error) -> Self {
        // Errors that result from issues building the reqwest::Client instance. This
        // type of error will occur prior to any network calls being made.
        if err.is_builder() {
            Error {
                source: Some(Box::new(err)),
                error_kind: DomainErrorKind::Internal(InternalErrorKind::Other(
                    "Failed to build reqwest client".to_string(),
                )),
            }
        // Errors that result from issues with the network call itself.
        } else {
            Error {
                source: Some(Box::new(err)),
                error_kind: DomainErrorKind::External(ExternalErrorKind::Network),
            }
        }
    }
}

impl From<std::io::Error> for Error {
    fn from(err: std::io::Error) -> Self {
        Error {
            source: Some(Box::new(err)),
            error_kind: DomainErrorKind::Internal(InternalErrorKind::Other(
                "I/O error".to_string(),
            )),
        }
    }
}
