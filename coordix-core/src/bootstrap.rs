// Startup wiring: discovery plus mediator registration in one call

use crate::config::CoordixConfig;
use crate::error::ConfigurationError;
use crate::mediator::{Mediator, MediatorOptions};
use crate::provider::{ServiceCollection, ServiceProvider};
use crate::registry::{DiscoveryReport, HandlerRegistry, HandlerSource};
use std::sync::Arc;
use tracing::info;

impl ServiceCollection {
    /// Discover handlers from `sources` and make the mediator available
    ///
    /// Equivalent to [`HandlerRegistry::discover`]; the mediator itself is
    /// always resolvable from the built provider.
    pub fn add_mediator(
        &mut self,
        sources: &[HandlerSource],
    ) -> Result<DiscoveryReport, ConfigurationError> {
        HandlerRegistry::discover(self, sources)
    }

    /// Alias for [`add_mediator`](Self::add_mediator)
    pub fn add_coordix(
        &mut self,
        sources: &[HandlerSource],
    ) -> Result<DiscoveryReport, ConfigurationError> {
        self.add_mediator(sources)
    }

    /// Register the options used by [`ServiceProvider::mediator`]
    pub fn configure_mediator(&mut self, options: MediatorOptions) -> &mut Self {
        self.add_singleton(Arc::new(options))
    }
}

/// A built provider and the mediator dispatching through it
pub struct Coordix {
    provider: ServiceProvider,
    mediator: Mediator,
    report: DiscoveryReport,
}

impl Coordix {
    /// Bootstrap from configuration
    pub fn from_config(config: &CoordixConfig) -> Result<Self, ConfigurationError> {
        Self::from_config_with(config, |_| Ok(()))
    }

    /// Bootstrap from configuration, registering extra services first
    ///
    /// `configure` runs before discovery, so its bindings count toward the
    /// ambiguity check.
    pub fn from_config_with<F>(config: &CoordixConfig, configure: F) -> Result<Self, ConfigurationError>
    where
        F: FnOnce(&mut ServiceCollection) -> Result<(), ConfigurationError>,
    {
        let mut services = ServiceCollection::with_policy(config.registry.ambiguity);
        configure(&mut services)?;
        services.configure_mediator(config.mediator.clone());

        let report = services.add_mediator(&config.discovery.sources())?;
        let provider = services.build();
        let mediator = provider.mediator();

        info!(
            handler_count = report.handler_count(),
            ambiguity = ?config.registry.ambiguity,
            "Mediator ready"
        );

        Ok(Self {
            provider,
            mediator,
            report,
        })
    }

    pub fn mediator(&self) -> &Mediator {
        &self.mediator
    }

    pub fn provider(&self) -> &ServiceProvider {
        &self.provider
    }

    /// What discovery registered during bootstrap
    pub fn report(&self) -> &DiscoveryReport {
        &self.report
    }
}
