use std::fmt;
use std::path::PathBuf;
use std::sync::Arc;

use crate::ConvertError;

/// Opaque reference to an entry registered with a managed media store.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct ContentUri(String);

impl ContentUri {
    pub fn new(uri: impl Into<String>) -> Self {
        Self(uri.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for ContentUri {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Where a converted document ended up.
///
/// The storage back-end owns the underlying entry; a locator only names it.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum Locator {
    /// Entry in managed storage.
    Content(ContentUri),
    /// Plain file in the shared downloads directory.
    File(PathBuf),
}

impl fmt::Display for Locator {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Locator::Content(uri) => write!(f, "{uri}"),
            Locator::File(path) => write!(f, "{}", path.display()),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Success {
    pub locator: Locator,
    pub message: String,
}

impl Success {
    pub fn new(locator: Locator) -> Self {
        let message = format!("PDF saved to {locator}");
        Self { locator, message }
    }
}

/// Terminal failure. `cause` is always present; `message` is what a UI shows.
#[derive(Debug, Clone)]
pub struct Failure {
    pub cause: Arc<ConvertError>,
    pub message: String,
}

impl Failure {
    /// Uses the cause's own text as the message.
    pub fn new(cause: ConvertError) -> Self {
        let message = cause.to_string();
        Self {
            cause: Arc::new(cause),
            message,
        }
    }

    pub fn with_message(cause: ConvertError, message: impl Into<String>) -> Self {
        Self {
            cause: Arc::new(cause),
            message: message.into(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Progress {
    pub message: String,
}

impl Progress {
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
        }
    }
}

/// Event of a conversion attempt. `Success` and `Error` are terminal.
#[derive(Debug, Clone)]
pub enum Outcome {
    Success(Success),
    Error(Failure),
    Progress(Progress),
}

impl Outcome {
    pub fn is_terminal(&self) -> bool {
        !matches!(self, Outcome::Progress(_))
    }

    pub fn is_success(&self) -> bool {
        matches!(self, Outcome::Success(_))
    }

    pub fn message(&self) -> &str {
        match self {
            Outcome::Success(success) => &success.message,
            Outcome::Error(failure) => &failure.message,
            Outcome::Progress(progress) => &progress.message,
        }
    }

    /// Only `Success` carries a locator.
    pub fn locator(&self) -> Option<&Locator> {
        match self {
            Outcome::Success(success) => Some(&success.locator),
            _ => None,
        }
    }
}

impl From<ConvertError> for Outcome {
    fn from(cause: ConvertError) -> Self {
        Outcome::Error(Failure::new(cause))
    }
}
