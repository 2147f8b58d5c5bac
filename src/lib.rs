// Coordix - an in-process mediator for Rust
//
// Requests are routed to exactly one handler, notifications to every
// registered handler. Handlers self-register and are bound at startup by
// discovery.

// Re-export core functionality
pub use coordix_core::*;

pub use async_trait::async_trait;

// Re-export optional crates
#[cfg(feature = "testing")]
pub use coordix_testing;

// Prelude for common imports
pub mod prelude {
    pub use crate::{
        AmbiguityPolicy,
        CancellationToken,
        ConfigurationError,
        Coordix,
        CoordixConfig,
        FromProvider,
        HandlerError,
        HandlerSource,
        Mediator,
        MediatorError,
        MediatorOptions,
        Notification,
        NotificationHandler,
        Request,
        RequestHandler,
        ServiceCollection,
        ServiceProvider,
        VoidRequest,
        VoidRequestHandler,
        async_trait,
        register_notification_handler,
        register_request_handler,
        register_void_handler,
    };
}
