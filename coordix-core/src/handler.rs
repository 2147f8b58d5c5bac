//! Handler capability contracts

use crate::message::{Notification, Request, VoidRequest};
use crate::provider::ServiceProvider;
use async_trait::async_trait;
use tokio_util::sync::CancellationToken;

/// Error produced by a handler.
///
/// The mediator never inspects or wraps it beyond carrying it back to the
/// caller, so any error type can be returned with `?` or `.into()`.
pub type HandlerError = Box<dyn std::error::Error + Send + Sync + 'static>;

/// Request handler trait
#[async_trait]
pub trait RequestHandler<R: Request>: Send + Sync {
    /// Handle the request and produce its response
    async fn handle(
        &self,
        request: R,
        cancellation: &CancellationToken,
    ) -> Result<R::Response, HandlerError>;
}

/// Handler for requests without a response
#[async_trait]
pub trait VoidRequestHandler<R: VoidRequest>: Send + Sync {
    /// Handle the request
    async fn handle(&self, request: R, cancellation: &CancellationToken)
    -> Result<(), HandlerError>;
}

/// Notification handler trait
///
/// Several handlers for the same notification run concurrently and share
/// the notification by reference.
#[async_trait]
pub trait NotificationHandler<N: Notification>: Send + Sync {
    /// Handle the notification
    async fn handle(
        &self,
        notification: &N,
        cancellation: &CancellationToken,
    ) -> Result<(), HandlerError>;
}

/// Construct a value from the service provider.
///
/// Transient handler bindings call this once per dispatch, so a handler
/// can pull its collaborators (including the [`Mediator`](crate::Mediator)
/// itself) out of the provider.
///
/// ```rust,ignore
/// struct WeatherHandler {
///     mediator: Mediator,
/// }
///
/// impl FromProvider for WeatherHandler {
///     fn from_provider(provider: &ServiceProvider) -> Self {
///         Self { mediator: provider.mediator() }
///     }
/// }
/// ```
pub trait FromProvider: Sized {
    fn from_provider(provider: &ServiceProvider) -> Self;
}
