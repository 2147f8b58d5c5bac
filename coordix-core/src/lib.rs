//! In-process mediator for Coordix
//!
//! Callers send typed requests and publish typed notifications through a
//! single [`Mediator`]; the message type selects the handler.
//!
//! ## Features
//!
//! - **Requests** - exactly one handler, with or without a response
//! - **Notifications** - zero or more handlers, run concurrently
//! - **Discovery** - handlers self-register and are selected by module or prefix
//! - **Transient handlers** - a fresh handler per dispatch, built from the provider
//! - **Async** - Full async/await support with cancellation forwarding
//!
//! ## Quick Start
//!
//! ```rust,ignore
//! use coordix_core::*;
//! use async_trait::async_trait;
//!
//! // Define a request
//! struct Ping {
//!     message: String,
//! }
//!
//! impl Request for Ping {
//!     type Response = String;
//! }
//!
//! // Define its handler
//! struct PingHandler;
//!
//! impl FromProvider for PingHandler {
//!     fn from_provider(_: &ServiceProvider) -> Self {
//!         Self
//!     }
//! }
//!
//! #[async_trait]
//! impl RequestHandler<Ping> for PingHandler {
//!     async fn handle(&self, request: Ping, _: &CancellationToken) -> Result<String, HandlerError> {
//!         Ok(format!("Pong: {}", request.message))
//!     }
//! }
//!
//! register_request_handler!(PingHandler => Ping);
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let mut services = ServiceCollection::new();
//!     services.add_mediator(&[])?;
//!
//!     let mediator = services.build().mediator();
//!     let pong = mediator
//!         .send(Ping { message: "Hello".into() }, &CancellationToken::new())
//!         .await?;
//!
//!     assert_eq!(pong, "Pong: Hello");
//!     Ok(())
//! }
//! ```
//!
//! ## Notifications
//!
//! ```rust,ignore
//! register_notification_handler!(EmailHandler => UserCreated);
//! register_notification_handler!(AuditHandler => UserCreated);
//!
//! // Both handlers run; the call returns once both have finished
//! mediator.publish(&UserCreated { id }, &token).await?;
//! ```
//!
//! ## Error Handling
//!
//! ```rust,ignore
//! match mediator.publish(&event, &token).await {
//!     Ok(()) => println!("All handlers succeeded"),
//!     Err(MediatorError::Publish(errors)) => {
//!         for failure in errors.failures() {
//!             eprintln!("handler #{} failed: {}", failure.position, failure.error);
//!         }
//!     }
//!     Err(e) => eprintln!("Publish error: {}", e),
//! }
//! ```

pub mod bootstrap;
pub mod config;
pub mod error;
pub mod handler;
pub mod logging;
pub mod mediator;
pub mod message;
pub mod provider;
pub mod registry;

pub use bootstrap::Coordix;
pub use config::{CoordixConfig, DiscoveryConfig, FileFormat, LoggingConfig, RegistryConfig};
pub use error::{ConfigurationError, HandlerFailure, MediatorError, PublishError};
pub use handler::{
    FromProvider, HandlerError, NotificationHandler, RequestHandler, VoidRequestHandler,
};
pub use mediator::{Mediator, MediatorOptions};
pub use message::{Notification, Request, VoidRequest};
pub use provider::{
    AmbiguityPolicy, HandlerDescriptor, HandlerKind, HandlerProvider, Lifetime,
    ServiceCollection, ServiceProvider,
};
pub use registry::{
    DiscoveryReport, HandlerRegistration, HandlerRegistry, HandlerSource, SourceFilter,
};

pub use tokio_util::sync::CancellationToken;

// Used by the registration macros
#[doc(hidden)]
pub use inventory;
