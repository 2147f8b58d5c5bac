// Test mediator builder

use crate::mock::{MockRequestHandler, MockVoidRequestHandler, RecordingNotificationHandler};
use coordix_core::{
    AmbiguityPolicy, CancellationToken, ConfigurationError, DiscoveryReport, HandlerSource,
    Mediator, MediatorOptions, Notification, Request, ServiceCollection, ServiceProvider,
    VoidRequest,
};

/// Builds a mediator around mock handlers
///
/// ```rust,ignore
/// let ping = MockRequestHandler::<Ping>::returning("Pong".to_string());
/// let harness = TestMediator::new().request(ping.clone())?.build();
///
/// harness.mediator().send(Ping, &harness.token()).await?;
/// assert_eq!(ping.call_count(), 1);
/// ```
pub struct TestMediatorBuilder {
    services: ServiceCollection,
}

impl TestMediatorBuilder {
    /// Register a mock as the handler for `R`
    pub fn request<R: Request>(
        mut self,
        handler: MockRequestHandler<R>,
    ) -> Result<Self, ConfigurationError> {
        self.services
            .add_request_handler_with::<R, _, _>(move |_| handler.clone())?;
        Ok(self)
    }

    /// Register a mock as the handler for void request `R`
    pub fn void_request<R: VoidRequest>(
        mut self,
        handler: MockVoidRequestHandler<R>,
    ) -> Result<Self, ConfigurationError> {
        self.services
            .add_void_handler_with::<R, _, _>(move |_| handler.clone())?;
        Ok(self)
    }

    /// Add a recorder to the handlers of `N`
    pub fn notification<N: Notification>(mut self, handler: RecordingNotificationHandler<N>) -> Self {
        self.services
            .add_notification_handler_with::<N, _, _>(move |_| handler.clone());
        self
    }

    /// Run discovery against the registered handlers
    pub fn discover(
        mut self,
        sources: &[HandlerSource],
    ) -> Result<(Self, DiscoveryReport), ConfigurationError> {
        let report = self.services.add_mediator(sources)?;
        Ok((self, report))
    }

    /// Set the mediator options
    pub fn options(mut self, options: MediatorOptions) -> Self {
        self.services.configure_mediator(options);
        self
    }

    /// Direct access to the underlying collection
    pub fn services_mut(&mut self) -> &mut ServiceCollection {
        &mut self.services
    }

    pub fn build(self) -> TestMediator {
        let provider = self.services.build();
        TestMediator {
            mediator: provider.mediator(),
            provider,
            token: CancellationToken::new(),
        }
    }
}

/// A built mediator with a token to dispatch with
pub struct TestMediator {
    mediator: Mediator,
    provider: ServiceProvider,
    token: CancellationToken,
}

impl TestMediator {
    #[allow(clippy::new_ret_no_self)]
    pub fn new() -> TestMediatorBuilder {
        Self::with_policy(AmbiguityPolicy::default())
    }

    pub fn with_policy(policy: AmbiguityPolicy) -> TestMediatorBuilder {
        TestMediatorBuilder {
            services: ServiceCollection::with_policy(policy),
        }
    }

    pub fn mediator(&self) -> &Mediator {
        &self.mediator
    }

    pub fn provider(&self) -> &ServiceProvider {
        &self.provider
    }

    /// The harness token; cancel it to observe cancellation in handlers
    pub fn token(&self) -> &CancellationToken {
        &self.token
    }

    /// Send `request` with the harness token
    pub async fn send<R: Request>(&self, request: R) -> Result<R::Response, coordix_core::MediatorError> {
        self.mediator.send(request, &self.token).await
    }

    /// Send void `request` with the harness token
    pub async fn send_void<R: VoidRequest>(&self, request: R) -> Result<(), coordix_core::MediatorError> {
        self.mediator.send_void(request, &self.token).await
    }

    /// Publish `notification` with the harness token
    pub async fn publish<N: Notification>(&self, notification: &N) -> Result<(), coordix_core::MediatorError> {
        self.mediator.publish(notification, &self.token).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::mock::{InvocationLog, TestError, token_address};
    use coordix_core::MediatorError;
    use std::time::Duration;

    struct Ping(&'static str);

    impl Request for Ping {
        type Response = String;
    }

    struct Purge;

    impl VoidRequest for Purge {}

    struct Touched;

    impl Notification for Touched {}

    #[tokio::test]
    async fn test_send_through_mock() {
        let ping = MockRequestHandler::<Ping>::responding(|Ping(m)| format!("Pong: {m}"));
        let harness = TestMediator::new().request(ping.clone()).unwrap().build();

        assert_eq!(harness.send(Ping("Hello")).await.unwrap(), "Pong: Hello");
        assert_eq!(harness.send(Ping("again")).await.unwrap(), "Pong: again");
        assert_eq!(ping.call_count(), 2);
    }

    #[tokio::test]
    async fn test_second_request_mock_is_rejected() {
        let result = TestMediator::new()
            .request(MockRequestHandler::<Ping>::returning("a".to_string()))
            .unwrap()
            .request(MockRequestHandler::<Ping>::returning("b".to_string()));

        assert!(matches!(
            result.err(),
            Some(ConfigurationError::AmbiguousHandler { .. })
        ));
    }

    #[tokio::test]
    async fn test_last_wins_harness() {
        let harness = TestMediator::with_policy(AmbiguityPolicy::LastWins)
            .request(MockRequestHandler::<Ping>::returning("a".to_string()))
            .unwrap()
            .request(MockRequestHandler::<Ping>::returning("b".to_string()))
            .unwrap()
            .build();

        assert_eq!(harness.send(Ping("x")).await.unwrap(), "b");
    }

    #[tokio::test]
    async fn test_void_failure_is_returned() {
        let harness = TestMediator::new()
            .void_request(MockVoidRequestHandler::<Purge>::failing("purge failed"))
            .unwrap()
            .build();

        let err = harness.send_void(Purge).await.unwrap_err();
        assert_eq!(err.downcast_ref::<TestError>(), Some(&TestError::new("purge failed")));
    }

    #[tokio::test]
    async fn test_publish_shares_token_and_keeps_failures() {
        let log = InvocationLog::default();
        let harness = TestMediator::new()
            .notification(
                RecordingNotificationHandler::<Touched>::new("slow", &log)
                    .with_delay(Duration::from_millis(30))
                    .failing("slow failed"),
            )
            .notification(RecordingNotificationHandler::<Touched>::new("fast", &log).failing("fast failed"))
            .build();

        let err = harness.publish(&Touched).await.unwrap_err();

        let invocations = log.lock().unwrap().clone();
        assert_eq!(invocations.len(), 2);
        assert_eq!(invocations[0].handler, "fast");
        assert!(
            invocations
                .iter()
                .all(|i| i.token_address == token_address(harness.token()))
        );

        let MediatorError::Publish(publish) = err else {
            panic!("expected publish error");
        };
        assert_eq!(publish.failures().len(), 2);
        assert_eq!(publish.first().unwrap().error.to_string(), "slow failed");
    }

    #[tokio::test]
    async fn test_cancelled_token_reaches_handler() {
        let ping = MockRequestHandler::<Ping>::returning("ok".to_string());
        let harness = TestMediator::new().request(ping.clone()).unwrap().build();

        harness.token().cancel();
        harness.send(Ping("x")).await.unwrap();

        assert_eq!(ping.cancellation_states(), vec![true]);
    }

    #[test]
    fn test_options_are_applied() {
        let harness = TestMediator::new()
            .options(MediatorOptions {
                enable_logging: false,
            })
            .build();

        assert!(!harness.mediator().options().enable_logging);
        assert!(harness.provider().handler_descriptors().is_empty());
    }
}
