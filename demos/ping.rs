//! Ping Example
//!
//! The smallest mediator setup: one request, one self-registered handler.
//!
//! Run with: `cargo run --example ping`

use coordix::logging::{LogConfig, LogFormat, info};
use coordix::prelude::*;

struct Ping {
    message: String,
}

impl Request for Ping {
    type Response = String;
}

struct PingHandler;

impl FromProvider for PingHandler {
    fn from_provider(_: &ServiceProvider) -> Self {
        Self
    }
}

#[async_trait]
impl RequestHandler<Ping> for PingHandler {
    async fn handle(&self, request: Ping, _: &CancellationToken) -> Result<String, HandlerError> {
        Ok(format!("Pong: {}", request.message))
    }
}

register_request_handler!(PingHandler => Ping);

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let _guard = LogConfig::new().format(LogFormat::Compact).init();

    let mut services = ServiceCollection::new();
    let report = services.add_mediator(&[])?;
    info!(handler_count = report.handler_count(), "Handlers registered");

    let mediator = services.build().mediator();
    let response = mediator
        .send(
            Ping {
                message: "Hello".to_string(),
            },
            &CancellationToken::new(),
        )
        .await?;

    println!("{}", response);
    Ok(())
}
