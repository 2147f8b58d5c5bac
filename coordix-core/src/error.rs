// Error types for the mediator

use crate::handler::HandlerError;
use std::fmt;
use thiserror::Error;

/// Dispatch error
#[derive(Debug, Error)]
pub enum MediatorError {
    /// No binding exists for the request type
    #[error("Handler not found for {message_type}")]
    HandlerNotFound { message_type: &'static str },

    /// The handler failed; its error is carried unchanged
    #[error(transparent)]
    Handler(HandlerError),

    /// One or more notification handlers failed
    #[error(transparent)]
    Publish(#[from] PublishError),
}

impl MediatorError {
    /// The handler's own error, when the failure came from a handler.
    ///
    /// For publish failures this is the first failure in registration order.
    pub fn handler_error(&self) -> Option<&(dyn std::error::Error + Send + Sync + 'static)> {
        match self {
            MediatorError::HandlerNotFound { .. } => None,
            MediatorError::Handler(error) => Some(error.as_ref()),
            MediatorError::Publish(publish) => publish.first().map(|f| f.error.as_ref()),
        }
    }

    /// Downcast the handler's error to a concrete type
    pub fn downcast_ref<E: std::error::Error + 'static>(&self) -> Option<&E> {
        self.handler_error().and_then(|e| e.downcast_ref::<E>())
    }

    /// Returns true if no handler was bound for the message
    pub fn is_handler_not_found(&self) -> bool {
        matches!(self, MediatorError::HandlerNotFound { .. })
    }
}

/// A single notification handler failure
#[derive(Debug)]
pub struct HandlerFailure {
    /// Position of the handler in registration order
    pub position: usize,
    /// The handler's error, unchanged
    pub error: HandlerError,
}

/// Aggregated notification handler failures.
///
/// Every failure is kept, ordered by the handlers' registration order.
#[derive(Debug)]
pub struct PublishError {
    notification: &'static str,
    handler_count: usize,
    failures: Vec<HandlerFailure>,
}

impl PublishError {
    pub(crate) fn new(
        notification: &'static str,
        handler_count: usize,
        mut failures: Vec<HandlerFailure>,
    ) -> Self {
        failures.sort_by_key(|f| f.position);
        Self {
            notification,
            handler_count,
            failures,
        }
    }

    /// Name of the notification type that was published
    pub fn notification(&self) -> &'static str {
        self.notification
    }

    /// Number of handlers that were invoked
    pub fn handler_count(&self) -> usize {
        self.handler_count
    }

    /// First failure in registration order
    pub fn first(&self) -> Option<&HandlerFailure> {
        self.failures.first()
    }

    /// All failures in registration order
    pub fn failures(&self) -> &[HandlerFailure] {
        &self.failures
    }

    /// Consume the error and take the failures
    pub fn into_failures(self) -> Vec<HandlerFailure> {
        self.failures
    }
}

impl fmt::Display for PublishError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.first() {
            Some(first) => write!(
                f,
                "{} of {} handler(s) failed for {}: {}",
                self.failures.len(),
                self.handler_count,
                self.notification,
                first.error
            ),
            None => write!(f, "Publishing {} failed", self.notification),
        }
    }
}

impl std::error::Error for PublishError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        self.first()
            .map(|f| f.error.as_ref() as &(dyn std::error::Error + 'static))
    }
}

/// Registration and configuration error
///
/// Raised before any binding from the failing call takes effect.
#[derive(Debug, Error)]
pub enum ConfigurationError {
    #[error(
        "Invalid handler sources: use no sources, module paths only, or name prefixes only"
    )]
    MixedSources,

    #[error(
        "Ambiguous handler for {message_type}: {existing} is already registered, rejecting {rejected}"
    )]
    AmbiguousHandler {
        message_type: &'static str,
        existing: &'static str,
        rejected: &'static str,
    },

    #[error("Failed to load configuration: {0}")]
    Load(String),

    #[error("Failed to parse configuration: {0}")]
    Parse(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}
