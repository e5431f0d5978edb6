use std::fmt;

use thiserror::Error;

/// Type-erased failure raised by a collaborator (fetcher, renderer, storage).
pub type BoxError = Box<dyn std::error::Error + Send + Sync + 'static>;

/// Every way a conversion attempt can fail, keyed by the step that failed.
#[derive(Debug, Error)]
pub enum ConvertError {
    #[error("Invalid URL {url:?}: it must start with http:// or https://")]
    InvalidUrl { url: String },
    #[error("Invalid timeout: it must be greater than zero")]
    InvalidTimeout,
    #[error("Failed to fetch {url}: {source}")]
    Fetch {
        url: String,
        #[source]
        source: BoxError,
    },
    #[error("Could not create {file_name}: {source}")]
    Destination {
        file_name: String,
        #[source]
        source: BoxError,
    },
    #[error("Could not open the output stream: {source}")]
    StreamOpen {
        #[source]
        source: BoxError,
    },
    #[error("PDF conversion failed: {source}")]
    Render {
        #[source]
        source: BoxError,
    },
    #[error("Could not finalize the saved document: {source}")]
    Finalize {
        #[source]
        source: BoxError,
    },
    #[error("Unexpected error: {message}")]
    Unexpected { message: String },
}

impl ConvertError {
    pub fn step(&self) -> FailureStep {
        match self {
            ConvertError::InvalidUrl { .. } | ConvertError::InvalidTimeout => FailureStep::Validate,
            ConvertError::Fetch { .. } => FailureStep::Fetch,
            ConvertError::Destination { .. } => FailureStep::CreateDestination,
            ConvertError::StreamOpen { .. } => FailureStep::OpenStream,
            ConvertError::Render { .. } => FailureStep::Render,
            ConvertError::Finalize { .. } => FailureStep::Finalize,
            ConvertError::Unexpected { .. } => FailureStep::Unknown,
        }
    }
}

/// Pipeline step a failure originated from.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FailureStep {
    Validate,
    Fetch,
    CreateDestination,
    OpenStream,
    Render,
    Finalize,
    Unknown,
}

impl fmt::Display for FailureStep {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            FailureStep::Validate => write!(f, "validate"),
            FailureStep::Fetch => write!(f, "fetch"),
            FailureStep::CreateDestination => write!(f, "create destination"),
            FailureStep::OpenStream => write!(f, "open stream"),
            FailureStep::Render => write!(f, "render"),
            FailureStep::Finalize => write!(f, "finalize"),
            FailureStep::Unknown => write!(f, "unknown"),
        }
    }
}
