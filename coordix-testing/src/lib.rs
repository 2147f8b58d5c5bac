//! Testing utilities for Coordix.
//!
//! Mock handlers and a small harness for exercising a mediator in tests.
//!
//! ## Features
//!
//! - **MockRequestHandler** - canned or computed responses, call counting
//! - **MockVoidRequestHandler** - succeeding or failing void handlers
//! - **RecordingNotificationHandler** - records invocations, with delays and failures
//! - **TestMediator** - builds a mediator around mocks
//!
//! ## Quick Start
//!
//! ```rust,ignore
//! use coordix_testing::*;
//!
//! # tokio_test::block_on(async {
//! let ping = MockRequestHandler::<Ping>::responding(|p| format!("Pong: {}", p.message));
//! let harness = TestMediator::new().request(ping.clone())?.build();
//!
//! let pong = harness.send(Ping { message: "Hello".into() }).await?;
//! assert_eq!(pong, "Pong: Hello");
//! assert_eq!(ping.call_count(), 1);
//! # });
//! ```
//!
//! ## Observing a Publish
//!
//! ```rust,ignore
//! let log = InvocationLog::default();
//! let harness = TestMediator::new()
//!     .notification(RecordingNotificationHandler::<Touched>::new("email", &log))
//!     .notification(RecordingNotificationHandler::<Touched>::new("audit", &log).failing("down"))
//!     .build();
//!
//! let err = harness.publish(&Touched).await.unwrap_err();
//! assert_eq!(log.lock().unwrap().len(), 2);
//! ```

mod harness;
mod mock;

pub use harness::{TestMediator, TestMediatorBuilder};
pub use mock::{
    Invocation, InvocationLog, MockRequestHandler, MockVoidRequestHandler,
    RecordingNotificationHandler, TestError, token_address,
};

// Re-export common testing utilities
pub use tokio::test as tokio_test;
