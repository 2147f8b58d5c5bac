//! Weather Forecast Example
//!
//! Handlers live in separate modules and are bound by prefix. The query
//! handler resolves the mediator from the provider and publishes an event
//! that the email module consumes.
//!
//! Run with: `cargo run --example weather_forecast`

use coordix::logging::info;
use coordix::prelude::*;
use uuid::Uuid;

// ============================================================================
// Domain
// ============================================================================

mod domain {
    use coordix::{Notification, Request};
    use uuid::Uuid;

    #[derive(Debug, Clone)]
    pub struct WeatherForecast {
        pub days_ahead: u32,
        pub temperature_c: i32,
        pub temperature_f: i32,
        pub summary: &'static str,
    }

    #[derive(Debug)]
    pub struct WeatherForecastResponse {
        pub id: Uuid,
        pub forecasts: Vec<WeatherForecast>,
    }

    pub struct WeatherForecastQuery {
        pub id: Uuid,
    }

    impl Request for WeatherForecastQuery {
        type Response = WeatherForecastResponse;
    }

    pub struct WeatherForecastEmailEvent {
        pub event_id: Uuid,
    }

    impl Notification for WeatherForecastEmailEvent {}
}

// ============================================================================
// Application
// ============================================================================

mod application {
    use super::domain::*;
    use coordix::prelude::*;
    use rand::Rng;

    const SUMMARIES: [&str; 10] = [
        "Freezing",
        "Bracing",
        "Chilly",
        "Cool",
        "Mild",
        "Warm",
        "Balmy",
        "Hot",
        "Sweltering",
        "Scorching",
    ];

    pub struct WeatherForecastHandler {
        mediator: Mediator,
    }

    impl FromProvider for WeatherForecastHandler {
        fn from_provider(provider: &ServiceProvider) -> Self {
            Self {
                mediator: provider.mediator(),
            }
        }
    }

    fn forecast() -> Vec<WeatherForecast> {
        let mut rng = rand::rng();
        (1..=5)
            .map(|days_ahead| {
                let temperature_c = rng.random_range(-20..55);
                WeatherForecast {
                    days_ahead,
                    temperature_c,
                    temperature_f: temperature_c * 9 / 5 + 32,
                    summary: SUMMARIES[rng.random_range(0..SUMMARIES.len())],
                }
            })
            .collect()
    }

    #[async_trait]
    impl RequestHandler<WeatherForecastQuery> for WeatherForecastHandler {
        async fn handle(
            &self,
            query: WeatherForecastQuery,
            cancellation: &CancellationToken,
        ) -> Result<WeatherForecastResponse, HandlerError> {
            let forecasts = forecast();

            let event = WeatherForecastEmailEvent { event_id: query.id };
            self.mediator.publish(&event, cancellation).await?;

            Ok(WeatherForecastResponse {
                id: query.id,
                forecasts,
            })
        }
    }

    register_request_handler!(WeatherForecastHandler => WeatherForecastQuery);
}

// ============================================================================
// Email Service
// ============================================================================

mod email {
    use super::domain::WeatherForecastEmailEvent;
    use coordix::prelude::*;

    pub struct WeatherForecastEmailHandler;

    impl FromProvider for WeatherForecastEmailHandler {
        fn from_provider(_: &ServiceProvider) -> Self {
            Self
        }
    }

    #[async_trait]
    impl NotificationHandler<WeatherForecastEmailEvent> for WeatherForecastEmailHandler {
        async fn handle(
            &self,
            event: &WeatherForecastEmailEvent,
            _: &CancellationToken,
        ) -> Result<(), HandlerError> {
            println!("Sending email requested by notification: {}", event.event_id);
            Ok(())
        }
    }

    register_notification_handler!(WeatherForecastEmailHandler => WeatherForecastEmailEvent);
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let config = CoordixConfig::parse(
        r#"
        [discovery]
        prefixes = ["weather_forecast::application", "weather_forecast::email"]

        [logging]
        level = "debug"
        format = "compact"
        "#,
        coordix::FileFormat::Toml,
    )?
    .apply_env()?;

    let _guard = config.logging.to_log_config().init();

    let coordix = Coordix::from_config(&config)?;
    for module in &coordix.report().modules {
        info!(module = *module, "Handlers loaded");
    }

    let id = Uuid::new_v4();
    info!(%id, "Getting weather");

    let response = coordix
        .mediator()
        .send(domain::WeatherForecastQuery { id }, &CancellationToken::new())
        .await?;

    println!("Forecast {}", response.id);
    for day in &response.forecasts {
        println!(
            "+{} day(s): {}C / {}F, {}",
            day.days_ahead, day.temperature_c, day.temperature_f, day.summary
        );
    }
    Ok(())
}
