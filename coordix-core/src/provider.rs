// Handler provider: registration-phase collection and the immutable provider built from it

use crate::error::ConfigurationError;
use crate::handler::{
    FromProvider, NotificationHandler, RequestHandler, VoidRequestHandler,
};
use crate::mediator::{Mediator, MediatorOptions};
use crate::message::{Notification, Request, VoidRequest, short_name, short_type_name};
use serde::{Deserialize, Serialize};
use std::any::{Any, TypeId};
use std::collections::HashMap;
use std::sync::Arc;
use tracing::{debug, trace};

/// Resolves capability types to instances.
///
/// This is the only view of the container the [`Mediator`] needs. Any
/// container offering these two lookups can stand in for [`ServiceProvider`].
pub trait HandlerProvider: Clone + Send + Sync + 'static {
    /// The most recent binding for `T`, if any
    fn get_one<T: ?Sized + 'static>(&self) -> Option<Arc<T>>;

    /// Every binding for `T` in registration order
    fn get_all<T: ?Sized + 'static>(&self) -> Vec<Arc<T>>;
}

/// How instances of a binding are produced
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Lifetime {
    /// A fresh instance per resolution
    Transient,
    /// One shared instance
    Singleton,
}

/// What to do when a second handler is registered for the same request type
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AmbiguityPolicy {
    /// Fail the registration with [`ConfigurationError::AmbiguousHandler`]
    #[default]
    Reject,
    /// Keep both bindings; dispatch resolves the last one registered
    LastWins,
}

/// Contract a handler binding fulfils
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum HandlerKind {
    Request,
    VoidRequest,
    Notification,
}

impl HandlerKind {
    /// Single-handler kinds must resolve to at most one binding
    pub fn is_single(&self) -> bool {
        !matches!(self, HandlerKind::Notification)
    }
}

/// A `(message type, response type) -> handler type` binding
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HandlerDescriptor {
    pub kind: HandlerKind,
    pub message_type: &'static str,
    pub response_type: Option<&'static str>,
    pub handler_type: &'static str,
    pub lifetime: Lifetime,
    capability: TypeId,
}

impl HandlerDescriptor {
    /// Identity of the capability this binding is stored under
    pub fn capability(&self) -> TypeId {
        self.capability
    }
}

type Factory<T> = Arc<dyn Fn(&ServiceProvider) -> Arc<T> + Send + Sync>;

#[derive(Clone)]
struct Binding {
    implementation: &'static str,
    lifetime: Lifetime,
    // Always a `Factory<T>` for the capability it is stored under
    factory: Arc<dyn Any + Send + Sync>,
}

impl Binding {
    fn new<T: ?Sized + 'static>(
        implementation: &'static str,
        lifetime: Lifetime,
        factory: Factory<T>,
    ) -> Self {
        Self {
            implementation,
            lifetime,
            factory: Arc::new(factory),
        }
    }

    fn resolve<T: ?Sized + 'static>(&self, provider: &ServiceProvider) -> Option<Arc<T>> {
        self.factory
            .downcast_ref::<Factory<T>>()
            .map(|factory| factory(provider))
    }
}

/// Registration-phase service collection
///
/// Bindings are added here during startup and frozen by [`build`](Self::build).
///
/// ```rust,ignore
/// let mut services = ServiceCollection::new();
/// services.add_request_handler::<Ping, PingHandler>()?;
/// services.add_notification_handler::<Touched, AuditHandler>();
///
/// let provider = services.build();
/// let mediator = provider.mediator();
/// ```
#[derive(Clone, Default)]
pub struct ServiceCollection {
    bindings: HashMap<TypeId, Vec<Binding>>,
    descriptors: Vec<HandlerDescriptor>,
    policy: AmbiguityPolicy,
}

impl ServiceCollection {
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a collection with an explicit ambiguity policy
    pub fn with_policy(policy: AmbiguityPolicy) -> Self {
        Self {
            policy,
            ..Self::default()
        }
    }

    pub fn policy(&self) -> AmbiguityPolicy {
        self.policy
    }

    /// Register a transient factory for capability `T`
    pub fn register_transient<T, F>(&mut self, implementation: &'static str, factory: F) -> &mut Self
    where
        T: ?Sized + 'static,
        F: Fn(&ServiceProvider) -> Arc<T> + Send + Sync + 'static,
    {
        self.push::<T>(Binding::new::<T>(
            implementation,
            Lifetime::Transient,
            Arc::new(factory),
        ));

        trace!(
            service = std::any::type_name::<T>(),
            implementation,
            "Transient binding registered"
        );
        self
    }

    /// Register a shared instance for capability `T`
    pub fn add_singleton<T: ?Sized + Send + Sync + 'static>(&mut self, instance: Arc<T>) -> &mut Self {
        let factory: Factory<T> = Arc::new(move |_: &ServiceProvider| instance.clone());
        self.push::<T>(Binding::new::<T>(
            std::any::type_name::<T>(),
            Lifetime::Singleton,
            factory,
        ));

        trace!(service = std::any::type_name::<T>(), "Singleton registered");
        self
    }

    /// Register `H` as the transient handler for request `R`
    pub fn add_request_handler<R, H>(&mut self) -> Result<&mut Self, ConfigurationError>
    where
        R: Request,
        H: RequestHandler<R> + FromProvider + 'static,
    {
        self.add_request_handler_with::<R, H, _>(H::from_provider)
    }

    /// Register a transient request handler built by `factory`
    pub fn add_request_handler_with<R, H, F>(&mut self, factory: F) -> Result<&mut Self, ConfigurationError>
    where
        R: Request,
        H: RequestHandler<R> + 'static,
        F: Fn(&ServiceProvider) -> H + Send + Sync + 'static,
    {
        let descriptor = HandlerDescriptor {
            kind: HandlerKind::Request,
            message_type: std::any::type_name::<R>(),
            response_type: Some(std::any::type_name::<R::Response>()),
            handler_type: std::any::type_name::<H>(),
            lifetime: Lifetime::Transient,
            capability: TypeId::of::<dyn RequestHandler<R>>(),
        };
        self.check_single(&descriptor, short_type_name::<R>())?;

        self.register_transient::<dyn RequestHandler<R>, _>(descriptor.handler_type, move |p| {
            Arc::new(factory(p)) as Arc<dyn RequestHandler<R>>
        });
        self.record(descriptor);
        Ok(self)
    }

    /// Register `H` as the transient handler for void request `R`
    pub fn add_void_handler<R, H>(&mut self) -> Result<&mut Self, ConfigurationError>
    where
        R: VoidRequest,
        H: VoidRequestHandler<R> + FromProvider + 'static,
    {
        self.add_void_handler_with::<R, H, _>(H::from_provider)
    }

    /// Register a transient void request handler built by `factory`
    pub fn add_void_handler_with<R, H, F>(&mut self, factory: F) -> Result<&mut Self, ConfigurationError>
    where
        R: VoidRequest,
        H: VoidRequestHandler<R> + 'static,
        F: Fn(&ServiceProvider) -> H + Send + Sync + 'static,
    {
        let descriptor = HandlerDescriptor {
            kind: HandlerKind::VoidRequest,
            message_type: std::any::type_name::<R>(),
            response_type: None,
            handler_type: std::any::type_name::<H>(),
            lifetime: Lifetime::Transient,
            capability: TypeId::of::<dyn VoidRequestHandler<R>>(),
        };
        self.check_single(&descriptor, short_type_name::<R>())?;

        self.register_transient::<dyn VoidRequestHandler<R>, _>(descriptor.handler_type, move |p| {
            Arc::new(factory(p)) as Arc<dyn VoidRequestHandler<R>>
        });
        self.record(descriptor);
        Ok(self)
    }

    /// Add `H` to the transient handlers of notification `N`
    pub fn add_notification_handler<N, H>(&mut self) -> &mut Self
    where
        N: Notification,
        H: NotificationHandler<N> + FromProvider + 'static,
    {
        self.add_notification_handler_with::<N, H, _>(H::from_provider)
    }

    /// Add a transient notification handler built by `factory`
    pub fn add_notification_handler_with<N, H, F>(&mut self, factory: F) -> &mut Self
    where
        N: Notification,
        H: NotificationHandler<N> + 'static,
        F: Fn(&ServiceProvider) -> H + Send + Sync + 'static,
    {
        let descriptor = HandlerDescriptor {
            kind: HandlerKind::Notification,
            message_type: std::any::type_name::<N>(),
            response_type: None,
            handler_type: std::any::type_name::<H>(),
            lifetime: Lifetime::Transient,
            capability: TypeId::of::<dyn NotificationHandler<N>>(),
        };

        self.register_transient::<dyn NotificationHandler<N>, _>(descriptor.handler_type, move |p| {
            Arc::new(factory(p)) as Arc<dyn NotificationHandler<N>>
        });
        self.record(descriptor);
        self
    }

    /// Check if any binding exists for capability `T`
    pub fn contains<T: ?Sized + 'static>(&self) -> bool {
        self.bindings.contains_key(&TypeId::of::<T>())
    }

    /// Handler bindings in registration order
    pub fn handler_descriptors(&self) -> &[HandlerDescriptor] {
        &self.descriptors
    }

    /// Total number of bindings, handlers and other services
    pub fn len(&self) -> usize {
        self.bindings.values().map(Vec::len).sum()
    }

    pub fn is_empty(&self) -> bool {
        self.bindings.is_empty()
    }

    /// Verify that `staged` can be merged without creating an ambiguous request binding
    pub(crate) fn check_merge(&self, staged: &ServiceCollection) -> Result<(), ConfigurationError> {
        staged
            .descriptors
            .iter()
            .filter(|d| d.kind.is_single())
            .try_for_each(|d| self.check_single(d, short_name(d.message_type)))
    }

    /// Append every binding of `staged`, preserving its order
    pub(crate) fn merge(&mut self, staged: ServiceCollection) {
        for (type_id, bindings) in staged.bindings {
            self.bindings.entry(type_id).or_default().extend(bindings);
        }
        self.descriptors.extend(staged.descriptors);
    }

    /// Freeze the collection into a provider
    pub fn build(self) -> ServiceProvider {
        debug!(
            binding_count = self.len(),
            handler_count = self.descriptors.len(),
            "Building service provider"
        );

        ServiceProvider {
            inner: Arc::new(ProviderInner {
                bindings: self.bindings,
                descriptors: self.descriptors,
            }),
        }
    }

    fn check_single(
        &self,
        descriptor: &HandlerDescriptor,
        message_type: &'static str,
    ) -> Result<(), ConfigurationError> {
        if self.policy == AmbiguityPolicy::LastWins {
            return Ok(());
        }

        match self.bindings.get(&descriptor.capability).and_then(|b| b.last()) {
            Some(existing) => Err(ConfigurationError::AmbiguousHandler {
                message_type,
                existing: existing.implementation,
                rejected: descriptor.handler_type,
            }),
            None => Ok(()),
        }
    }

    fn push<T: ?Sized + 'static>(&mut self, binding: Binding) {
        self.bindings
            .entry(TypeId::of::<T>())
            .or_default()
            .push(binding);
    }

    fn record(&mut self, descriptor: HandlerDescriptor) {
        debug!(
            message_type = descriptor.message_type,
            handler = descriptor.handler_type,
            kind = ?descriptor.kind,
            "Handler registered"
        );
        self.descriptors.push(descriptor);
    }
}

struct ProviderInner {
    bindings: HashMap<TypeId, Vec<Binding>>,
    descriptors: Vec<HandlerDescriptor>,
}

/// Immutable service provider
///
/// Cheap to clone; every clone shares the same frozen bindings, so it can
/// be read concurrently without locking.
#[derive(Clone)]
pub struct ServiceProvider {
    inner: Arc<ProviderInner>,
}

impl ServiceProvider {
    /// Resolve the most recent binding for `T`
    pub fn get_one<T: ?Sized + 'static>(&self) -> Option<Arc<T>> {
        let binding = self.inner.bindings.get(&TypeId::of::<T>())?.last()?;

        trace!(
            service = std::any::type_name::<T>(),
            implementation = binding.implementation,
            lifetime = ?binding.lifetime,
            "Resolving service"
        );
        binding.resolve::<T>(self)
    }

    /// Resolve every binding for `T` in registration order
    pub fn get_all<T: ?Sized + 'static>(&self) -> Vec<Arc<T>> {
        self.inner
            .bindings
            .get(&TypeId::of::<T>())
            .map(|bindings| bindings.iter().filter_map(|b| b.resolve::<T>(self)).collect())
            .unwrap_or_default()
    }

    /// Check if a binding exists for `T`
    pub fn contains<T: ?Sized + 'static>(&self) -> bool {
        self.inner.bindings.contains_key(&TypeId::of::<T>())
    }

    /// Handler bindings in registration order
    pub fn handler_descriptors(&self) -> &[HandlerDescriptor] {
        &self.inner.descriptors
    }

    /// A mediator dispatching through this provider
    ///
    /// Uses the registered [`MediatorOptions`] when present.
    pub fn mediator(&self) -> Mediator {
        let options = self
            .get_one::<MediatorOptions>()
            .map(|options| options.as_ref().clone())
            .unwrap_or_default();
        Mediator::with_options(self.clone(), options)
    }
}

impl HandlerProvider for ServiceProvider {
    fn get_one<T: ?Sized + 'static>(&self) -> Option<Arc<T>> {
        ServiceProvider::get_one(self)
    }

    fn get_all<T: ?Sized + 'static>(&self) -> Vec<Arc<T>> {
        ServiceProvider::get_all(self)
    }
}

impl FromProvider for Mediator {
    fn from_provider(provider: &ServiceProvider) -> Self {
        provider.mediator()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::handler::HandlerError;
    use async_trait::async_trait;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use tokio_util::sync::CancellationToken;

    static CONSTRUCTED: AtomicUsize = AtomicUsize::new(0);

    struct Ping;

    impl Request for Ping {
        type Response = String;
    }

    struct PingHandler;

    impl FromProvider for PingHandler {
        fn from_provider(_: &ServiceProvider) -> Self {
            CONSTRUCTED.fetch_add(1, Ordering::SeqCst);
            Self
        }
    }

    #[async_trait]
    impl RequestHandler<Ping> for PingHandler {
        async fn handle(&self, _: Ping, _: &CancellationToken) -> Result<String, HandlerError> {
            Ok("pong".to_string())
        }
    }

    struct OtherPingHandler;

    impl FromProvider for OtherPingHandler {
        fn from_provider(_: &ServiceProvider) -> Self {
            Self
        }
    }

    #[async_trait]
    impl RequestHandler<Ping> for OtherPingHandler {
        async fn handle(&self, _: Ping, _: &CancellationToken) -> Result<String, HandlerError> {
            Ok("other".to_string())
        }
    }

    struct Greeting(&'static str);

    #[test]
    fn test_transient_creates_fresh_instances() {
        let mut services = ServiceCollection::new();
        services.add_request_handler::<Ping, PingHandler>().unwrap();
        let provider = services.build();

        let before = CONSTRUCTED.load(Ordering::SeqCst);
        let first = provider.get_one::<dyn RequestHandler<Ping>>().unwrap();
        let second = provider.get_one::<dyn RequestHandler<Ping>>().unwrap();

        assert!(!Arc::ptr_eq(&first, &second));
        assert_eq!(CONSTRUCTED.load(Ordering::SeqCst) - before, 2);
    }

    #[test]
    fn test_singleton_is_shared() {
        let mut services = ServiceCollection::new();
        services.add_singleton(Arc::new(Greeting("hello")));
        let provider = services.build();

        let a = provider.get_one::<Greeting>().unwrap();
        let b = provider.get_one::<Greeting>().unwrap();
        assert!(Arc::ptr_eq(&a, &b));
        assert_eq!(a.0, "hello");
    }

    #[test]
    fn test_missing_binding_resolves_to_none() {
        let provider = ServiceCollection::new().build();
        assert!(provider.get_one::<dyn RequestHandler<Ping>>().is_none());
        assert!(provider.get_all::<Greeting>().is_empty());
        assert!(!provider.contains::<Greeting>());
    }

    #[test]
    fn test_get_all_keeps_registration_order() {
        let mut services = ServiceCollection::new();
        services.add_singleton(Arc::new(Greeting("first")));
        services.add_singleton(Arc::new(Greeting("second")));
        let provider = services.build();

        let all: Vec<_> = provider.get_all::<Greeting>().iter().map(|g| g.0).collect();
        assert_eq!(all, vec!["first", "second"]);
        assert_eq!(provider.get_one::<Greeting>().unwrap().0, "second");
    }

    #[test]
    fn test_ambiguous_request_rejected_by_default() {
        let mut services = ServiceCollection::new();
        services.add_request_handler::<Ping, PingHandler>().unwrap();

        let err = services
            .add_request_handler::<Ping, OtherPingHandler>()
            .err()
            .unwrap();

        match err {
            ConfigurationError::AmbiguousHandler {
                message_type,
                existing,
                rejected,
            } => {
                assert_eq!(message_type, "Ping");
                assert!(existing.ends_with("PingHandler"));
                assert!(rejected.ends_with("OtherPingHandler"));
            }
            other => panic!("unexpected error: {other}"),
        }
        assert_eq!(services.handler_descriptors().len(), 1);
    }

    #[test]
    fn test_last_wins_policy_resolves_latest() {
        let mut services = ServiceCollection::with_policy(AmbiguityPolicy::LastWins);
        services.add_request_handler::<Ping, PingHandler>().unwrap();
        services.add_request_handler::<Ping, OtherPingHandler>().unwrap();
        let provider = services.build();

        let handler = provider.get_one::<dyn RequestHandler<Ping>>().unwrap();
        let response = tokio_test::block_on(handler.handle(Ping, &CancellationToken::new())).unwrap();
        assert_eq!(response, "other");
        assert_eq!(provider.handler_descriptors().len(), 2);
    }

    #[test]
    fn test_descriptor_records_types() {
        let mut services = ServiceCollection::new();
        services.add_request_handler::<Ping, PingHandler>().unwrap();

        let descriptor = &services.handler_descriptors()[0];
        assert_eq!(descriptor.kind, HandlerKind::Request);
        assert!(descriptor.message_type.ends_with("Ping"));
        assert_eq!(descriptor.response_type, Some(std::any::type_name::<String>()));
        assert_eq!(descriptor.lifetime, Lifetime::Transient);
        assert_eq!(descriptor.capability(), TypeId::of::<dyn RequestHandler<Ping>>());
    }
}
