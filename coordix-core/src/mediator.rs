//! Mediator: routes requests and notifications to their handlers

use crate::error::{HandlerFailure, MediatorError, PublishError};
use crate::handler::{NotificationHandler, RequestHandler, VoidRequestHandler};
use crate::message::{Notification, Request, VoidRequest, short_type_name};
use crate::provider::{HandlerProvider, ServiceProvider};
use futures::FutureExt;
use futures::future::join_all;
use serde::{Deserialize, Serialize};
use std::panic::AssertUnwindSafe;
use std::sync::Arc;
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, warn};

/// Mediator configuration
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct MediatorOptions {
    /// Log dispatches and handler failures
    pub enable_logging: bool,
}

impl Default for MediatorOptions {
    fn default() -> Self {
        Self {
            enable_logging: true,
        }
    }
}

/// The mediator
///
/// Holds nothing but the provider and its options, so a single instance can
/// be cloned freely and shared by every caller in the process. Handlers are
/// resolved from the provider on every dispatch.
///
/// # Examples
///
/// ```rust,ignore
/// let mediator = provider.mediator();
/// let token = CancellationToken::new();
///
/// let pong = mediator.send(Ping { message: "Hello".into() }, &token).await?;
/// mediator.publish(&Touched, &token).await?;
/// ```
#[derive(Clone)]
pub struct Mediator<P: HandlerProvider = ServiceProvider> {
    provider: P,
    options: Arc<MediatorOptions>,
}

impl<P: HandlerProvider> Mediator<P> {
    /// Create a mediator over a handler provider
    pub fn new(provider: P) -> Self {
        Self::with_options(provider, MediatorOptions::default())
    }

    /// Create a mediator with custom options
    pub fn with_options(provider: P, options: MediatorOptions) -> Self {
        Self {
            provider,
            options: Arc::new(options),
        }
    }

    /// The provider handlers are resolved from
    pub fn provider(&self) -> &P {
        &self.provider
    }

    pub fn options(&self) -> &MediatorOptions {
        &self.options
    }

    /// Send a request to its single handler and return the response
    ///
    /// The handler's response is returned unchanged. Its error, if any, is
    /// returned as [`MediatorError::Handler`] without modification.
    pub async fn send<R: Request>(
        &self,
        request: R,
        cancellation: &CancellationToken,
    ) -> Result<R::Response, MediatorError> {
        let message_type = short_type_name::<R>();
        let handler = self
            .provider
            .get_one::<dyn RequestHandler<R>>()
            .ok_or_else(|| self.not_found(message_type))?;

        if self.options.enable_logging {
            debug!(message_type, "Sending request");
        }

        handler
            .handle(request, cancellation)
            .await
            .map_err(|e| self.handler_failed(message_type, e))
    }

    /// Send a request without a response to its single handler
    pub async fn send_void<R: VoidRequest>(
        &self,
        request: R,
        cancellation: &CancellationToken,
    ) -> Result<(), MediatorError> {
        let message_type = short_type_name::<R>();
        let handler = self
            .provider
            .get_one::<dyn VoidRequestHandler<R>>()
            .ok_or_else(|| self.not_found(message_type))?;

        if self.options.enable_logging {
            debug!(message_type, "Sending void request");
        }

        handler
            .handle(request, cancellation)
            .await
            .map_err(|e| self.handler_failed(message_type, e))
    }

    /// Publish a notification to every registered handler
    ///
    /// Handlers run concurrently on the caller's task and all of them run to
    /// completion, even when a sibling fails. With no handlers this is a no-op.
    /// Failures are reported together, ordered by registration.
    ///
    /// A panicking handler does not cut its siblings short: the panic is
    /// resumed once every handler has finished.
    pub async fn publish<N: Notification>(
        &self,
        notification: &N,
        cancellation: &CancellationToken,
    ) -> Result<(), MediatorError> {
        let message_type = short_type_name::<N>();
        let handlers = self.provider.get_all::<dyn NotificationHandler<N>>();

        if handlers.is_empty() {
            if self.options.enable_logging {
                debug!(message_type, "No handlers registered for notification");
            }
            return Ok(());
        }

        if self.options.enable_logging {
            debug!(
                message_type,
                handler_count = handlers.len(),
                "Publishing notification"
            );
        }

        let invocations = handlers
            .iter()
            .map(|handler| AssertUnwindSafe(handler.handle(notification, cancellation)).catch_unwind());
        let outcomes = join_all(invocations).await;

        let mut failures = Vec::new();
        let mut panic = None;
        for (position, outcome) in outcomes.into_iter().enumerate() {
            match outcome {
                Ok(Ok(())) => {}
                Ok(Err(error)) => {
                    if self.options.enable_logging {
                        error!(message_type, position, error = %error, "Notification handler failed");
                    }
                    failures.push(HandlerFailure { position, error });
                }
                Err(payload) => {
                    panic.get_or_insert(payload);
                }
            }
        }

        if let Some(payload) = panic {
            std::panic::resume_unwind(payload);
        }

        if failures.is_empty() {
            return Ok(());
        }

        Err(PublishError::new(message_type, handlers.len(), failures).into())
    }

    fn not_found(&self, message_type: &'static str) -> MediatorError {
        if self.options.enable_logging {
            warn!(message_type, "No handler registered for request");
        }
        MediatorError::HandlerNotFound { message_type }
    }

    fn handler_failed(&self, message_type: &'static str, error: crate::HandlerError) -> MediatorError {
        if self.options.enable_logging {
            error!(message_type, error = %error, "Request handler failed");
        }
        MediatorError::Handler(error)
    }
}
