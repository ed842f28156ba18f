use std::error::Error;
use std::fmt::{self, Display, Formatter};

/// Raised when the provider cannot settle on exactly one factory.
#[derive(thiserror::Error, Debug, Clone, Copy, PartialEq, Eq)]
pub enum InitializationError {
    #[error("No implementations found for MessagingFactory")]
    NoImplementation,
    #[error("More than one implementations found for MessagingFactory")]
    AmbiguousImplementation,
}

/// Failure reported by a broker bridge while factoring, sending or
/// listening. `code` is a short snake_case tag such as `listener_closed`
/// that callers can match on; the provider passes it through unchanged as
/// [`ProviderError::Factory`].
#[derive(Debug)]
pub struct MessagingError {
    code: String,
    message: String,
    source: Option<anyhow::Error>,
}

impl MessagingError {
    pub fn new(code: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            code: code.into(),
            message: message.into(),
            source: None,
        }
    }

    /// Keeps the broker client's own error, e.g. a refused connection.
    pub fn with_source(mut self, source: impl Into<anyhow::Error>) -> Self {
        self.source = Some(source.into());
        self
    }

    pub fn code(&self) -> &str {
        &self.code
    }

    pub fn message(&self) -> &str {
        &self.message
    }
}

impl Display for MessagingError {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        write!(f, "{}: {}", self.code, self.message)
    }
}

impl Error for MessagingError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        self.source
            .as_ref()
            .map(|err| err.as_ref() as &(dyn Error + 'static))
    }
}

// Lets bridges use `?` on their client libraries' errors.
impl From<anyhow::Error> for MessagingError {
    fn from(err: anyhow::Error) -> Self {
        MessagingError::new("internal_error", err.to_string()).with_source(err)
    }
}

/// Errors surfaced by [`crate::MessagingProvider`].
#[derive(thiserror::Error, Debug)]
pub enum ProviderError {
    #[error(transparent)]
    Initialization(#[from] InitializationError),
    #[error(transparent)]
    Factory(#[from] MessagingError),
    #[error("channel `{0}` is not configured")]
    UnknownChannel(String),
}

impl ProviderError {
    /// Returns the initialization failure, if that is what this error is.
    pub fn as_initialization(&self) -> Option<InitializationError> {
        match self {
            ProviderError::Initialization(err) => Some(*err),
            _ => None,
        }
    }
}
