// Mock handlers for testing

use async_trait::async_trait;
use coordix_core::{
    CancellationToken, HandlerError, Notification, NotificationHandler, Request, RequestHandler,
    VoidRequest, VoidRequestHandler,
};
use std::marker::PhantomData;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

/// Error returned by failing mocks
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("{0}")]
pub struct TestError(pub String);

impl TestError {
    pub fn new(message: impl Into<String>) -> Self {
        Self(message.into())
    }
}

type Responder<R> =
    Arc<dyn Fn(R) -> Result<<R as Request>::Response, TestError> + Send + Sync>;

/// Mock request handler
///
/// Clones share their call count, so a clone registered as a transient
/// handler reports every dispatch back to the original.
pub struct MockRequestHandler<R: Request> {
    responder: Responder<R>,
    calls: Arc<AtomicUsize>,
    cancelled: Arc<Mutex<Vec<bool>>>,
}

impl<R: Request> Clone for MockRequestHandler<R> {
    fn clone(&self) -> Self {
        Self {
            responder: self.responder.clone(),
            calls: self.calls.clone(),
            cancelled: self.cancelled.clone(),
        }
    }
}

impl<R: Request> MockRequestHandler<R> {
    /// Respond by applying `f` to each request
    pub fn responding<F>(f: F) -> Self
    where
        F: Fn(R) -> R::Response + Send + Sync + 'static,
    {
        Self::from_responder(Arc::new(move |request: R| -> Result<R::Response, TestError> {
            Ok(f(request))
        }))
    }

    /// Always respond with `response`
    pub fn returning(response: R::Response) -> Self
    where
        R::Response: Clone + Sync,
    {
        Self::responding(move |_| response.clone())
    }

    /// Always fail with a [`TestError`]
    pub fn failing(message: impl Into<String>) -> Self {
        let error = TestError::new(message);
        Self::from_responder(Arc::new(move |_: R| -> Result<R::Response, TestError> {
            Err(error.clone())
        }))
    }

    fn from_responder(responder: Responder<R>) -> Self {
        Self {
            responder,
            calls: Arc::new(AtomicUsize::new(0)),
            cancelled: Arc::new(Mutex::new(Vec::new())),
        }
    }

    pub fn call_count(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }

    pub fn was_called(&self) -> bool {
        self.call_count() > 0
    }

    /// Whether the token was cancelled at each call, in call order
    pub fn cancellation_states(&self) -> Vec<bool> {
        self.cancelled.lock().unwrap().clone()
    }

    /// Clear all recorded calls
    pub fn clear_calls(&self) {
        self.calls.store(0, Ordering::SeqCst);
        self.cancelled.lock().unwrap().clear();
    }
}

#[async_trait]
impl<R: Request> RequestHandler<R> for MockRequestHandler<R> {
    async fn handle(
        &self,
        request: R,
        cancellation: &CancellationToken,
    ) -> Result<R::Response, HandlerError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        self.cancelled
            .lock()
            .unwrap()
            .push(cancellation.is_cancelled());
        Ok((self.responder)(request)?)
    }
}

/// Mock handler for requests without a response
pub struct MockVoidRequestHandler<R: VoidRequest> {
    failure: Option<TestError>,
    calls: Arc<AtomicUsize>,
    _request: PhantomData<fn(R)>,
}

impl<R: VoidRequest> Clone for MockVoidRequestHandler<R> {
    fn clone(&self) -> Self {
        Self {
            failure: self.failure.clone(),
            calls: self.calls.clone(),
            _request: PhantomData,
        }
    }
}

impl<R: VoidRequest> Default for MockVoidRequestHandler<R> {
    fn default() -> Self {
        Self::new()
    }
}

impl<R: VoidRequest> MockVoidRequestHandler<R> {
    /// A handler that succeeds
    pub fn new() -> Self {
        Self {
            failure: None,
            calls: Arc::new(AtomicUsize::new(0)),
            _request: PhantomData,
        }
    }

    /// A handler that fails with a [`TestError`]
    pub fn failing(message: impl Into<String>) -> Self {
        Self {
            failure: Some(TestError::new(message)),
            ..Self::new()
        }
    }

    pub fn call_count(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl<R: VoidRequest> VoidRequestHandler<R> for MockVoidRequestHandler<R> {
    async fn handle(&self, _: R, _: &CancellationToken) -> Result<(), HandlerError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        match &self.failure {
            Some(error) => Err(error.clone().into()),
            None => Ok(()),
        }
    }
}

/// One recorded notification handler invocation
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Invocation {
    /// Name the handler was created with
    pub handler: String,
    /// Address of the token the handler received
    pub token_address: usize,
    /// Whether the token was cancelled when the handler finished
    pub cancelled: bool,
}

/// Shared log of notification handler invocations, in completion order
pub type InvocationLog = Arc<Mutex<Vec<Invocation>>>;

/// Notification handler that records each invocation
///
/// Several recorders can share one [`InvocationLog`] to observe how a
/// publish fanned out.
///
/// ```rust,ignore
/// let log = InvocationLog::default();
/// let slow = RecordingNotificationHandler::<Touched>::new("slow", &log)
///     .with_delay(Duration::from_millis(50));
/// let broken = RecordingNotificationHandler::<Touched>::new("broken", &log).failing("boom");
/// ```
pub struct RecordingNotificationHandler<N: Notification> {
    name: String,
    delay: Option<Duration>,
    failure: Option<TestError>,
    log: InvocationLog,
    _notification: PhantomData<fn(&N)>,
}

impl<N: Notification> Clone for RecordingNotificationHandler<N> {
    fn clone(&self) -> Self {
        Self {
            name: self.name.clone(),
            delay: self.delay,
            failure: self.failure.clone(),
            log: self.log.clone(),
            _notification: PhantomData,
        }
    }
}

impl<N: Notification> RecordingNotificationHandler<N> {
    pub fn new(name: impl Into<String>, log: &InvocationLog) -> Self {
        Self {
            name: name.into(),
            delay: None,
            failure: None,
            log: log.clone(),
            _notification: PhantomData,
        }
    }

    /// Sleep before completing
    pub fn with_delay(mut self, delay: Duration) -> Self {
        self.delay = Some(delay);
        self
    }

    /// Fail with a [`TestError`] after recording
    pub fn failing(mut self, message: impl Into<String>) -> Self {
        self.failure = Some(TestError::new(message));
        self
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    /// Invocations recorded by this handler
    pub fn invocations(&self) -> Vec<Invocation> {
        self.log
            .lock()
            .unwrap()
            .iter()
            .filter(|i| i.handler == self.name)
            .cloned()
            .collect()
    }

    pub fn call_count(&self) -> usize {
        self.invocations().len()
    }
}

#[async_trait]
impl<N: Notification> NotificationHandler<N> for RecordingNotificationHandler<N> {
    async fn handle(&self, _: &N, cancellation: &CancellationToken) -> Result<(), HandlerError> {
        if let Some(delay) = self.delay {
            tokio::time::sleep(delay).await;
        }

        self.log.lock().unwrap().push(Invocation {
            handler: self.name.clone(),
            token_address: token_address(cancellation),
            cancelled: cancellation.is_cancelled(),
        });

        match &self.failure {
            Some(error) => Err(error.clone().into()),
            None => Ok(()),
        }
    }
}

/// Address of a cancellation token, for asserting that handlers shared one
pub fn token_address(token: &CancellationToken) -> usize {
    token as *const CancellationToken as usize
}

#[cfg(test)]
mod tests {
    use super::*;

    struct Double(u32);

    impl Request for Double {
        type Response = u32;
    }

    struct Purge;

    impl VoidRequest for Purge {}

    struct Touched;

    impl Notification for Touched {}

    #[tokio::test]
    async fn test_mock_request_handler_responds() {
        let mock = MockRequestHandler::<Double>::responding(|Double(n)| n * 2);
        let token = CancellationToken::new();

        assert_eq!(mock.handle(Double(21), &token).await.unwrap(), 42);
        assert_eq!(mock.call_count(), 1);
        assert_eq!(mock.cancellation_states(), vec![false]);

        mock.clear_calls();
        assert!(!mock.was_called());
    }

    #[tokio::test]
    async fn test_mock_request_handler_fails() {
        let mock = MockRequestHandler::<Double>::failing("nope");
        let err = mock.handle(Double(1), &CancellationToken::new()).await.unwrap_err();

        assert_eq!(err.downcast_ref::<TestError>(), Some(&TestError::new("nope")));
    }

    #[tokio::test]
    async fn test_clones_share_calls() {
        let mock = MockRequestHandler::<Double>::returning(7);
        let clone = mock.clone();
        clone.handle(Double(0), &CancellationToken::new()).await.unwrap();

        assert_eq!(mock.call_count(), 1);
    }

    #[tokio::test]
    async fn test_mock_void_handler() {
        let ok = MockVoidRequestHandler::<Purge>::new();
        let broken = MockVoidRequestHandler::<Purge>::failing("purge failed");
        let token = CancellationToken::new();

        ok.handle(Purge, &token).await.unwrap();
        let err = broken.handle(Purge, &token).await.unwrap_err();

        assert_eq!(ok.call_count(), 1);
        assert_eq!(broken.call_count(), 1);
        assert_eq!(err.to_string(), "purge failed");
    }

    #[test]
    fn test_mock_handlers_drive_from_sync_code() {
        let mock = MockRequestHandler::<Double>::responding(|Double(n)| n * 2);
        let purge = MockVoidRequestHandler::<Purge>::default();
        let token = CancellationToken::new();

        let doubled = tokio_test::block_on(mock.handle(Double(5), &token)).unwrap();
        tokio_test::block_on(purge.handle(Purge, &token)).unwrap();

        assert_eq!(doubled, 10);
        assert_eq!(purge.call_count(), 1);
    }

    #[tokio::test]
    async fn test_recording_handler_records_token() {
        let log = InvocationLog::default();
        let recorder = RecordingNotificationHandler::<Touched>::new("audit", &log);
        let token = CancellationToken::new();
        token.cancel();

        recorder.handle(&Touched, &token).await.unwrap();

        assert_eq!(
            recorder.invocations(),
            vec![Invocation {
                handler: "audit".to_string(),
                token_address: token_address(&token),
                cancelled: true,
            }]
        );
    }

    #[tokio::test(start_paused = true)]
    async fn test_recording_handler_delay_and_failure() {
        let log = InvocationLog::default();
        let recorder = RecordingNotificationHandler::<Touched>::new("slow", &log)
            .with_delay(Duration::from_secs(5))
            .failing("slow failed");

        let started = tokio::time::Instant::now();
        let err = recorder
            .handle(&Touched, &CancellationToken::new())
            .await
            .unwrap_err();

        assert!(started.elapsed() >= Duration::from_secs(5));
        assert_eq!(err.to_string(), "slow failed");
        assert_eq!(recorder.call_count(), 1);
    }
}
