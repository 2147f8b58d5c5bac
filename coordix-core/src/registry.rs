//! Handler discovery using inventory
//!
//! Handlers announce themselves at build time with the registration macros.
//! Each announcement carries the module it was declared in, so discovery can
//! select handlers by module or by module-path prefix at startup.
//!
//! ```rust,ignore
//! mod email {
//!     pub struct WeatherEmailHandler;
//!     // impl NotificationHandler<WeatherForecastEmailEvent> + FromProvider ...
//!
//!     coordix_core::register_notification_handler!(WeatherEmailHandler => WeatherForecastEmailEvent);
//! }
//!
//! let mut services = ServiceCollection::new();
//! HandlerRegistry::discover(&mut services, &[HandlerSource::prefix("my_app::email")])?;
//! ```

use crate::error::ConfigurationError;
use crate::message::module_of_type_name;
use crate::provider::{HandlerDescriptor, HandlerKind, ServiceCollection};
use tracing::{debug, info, trace};

/// Function applying one registration to a collection
pub type RegisterFn = fn(&mut ServiceCollection) -> Result<(), ConfigurationError>;

/// A handler binding collected via inventory
pub struct HandlerRegistration {
    /// Module the registration was declared in (`module_path!()`)
    pub module_path: &'static str,
    /// Handler type as written at the registration site
    pub handler_name: &'static str,
    /// Message type as written at the registration site
    pub message_name: &'static str,
    /// Contract the binding fulfils
    pub kind: HandlerKind,
    register: RegisterFn,
}

// Register HandlerRegistration with inventory for compile-time collection
inventory::collect!(HandlerRegistration);

impl HandlerRegistration {
    /// Create a new registration entry
    pub const fn new(
        module_path: &'static str,
        handler_name: &'static str,
        message_name: &'static str,
        kind: HandlerKind,
        register: RegisterFn,
    ) -> Self {
        Self {
            module_path,
            handler_name,
            message_name,
            kind,
            register,
        }
    }

    /// Apply the registration to a collection
    pub fn apply(&self, services: &mut ServiceCollection) -> Result<(), ConfigurationError> {
        (self.register)(services)
    }
}

/// Where discovery looks for handlers
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum HandlerSource {
    /// A module path; includes its nested modules
    Module(String),
    /// A case-sensitive prefix of the declaring module path
    Prefix(String),
}

impl HandlerSource {
    /// A module path; a trailing `::` is ignored
    pub fn module(path: impl Into<String>) -> Self {
        HandlerSource::Module(trim_module_path(path.into()))
    }

    /// The module declaring `T`
    pub fn module_of<T: ?Sized>() -> Self {
        HandlerSource::Module(module_of_type_name(std::any::type_name::<T>()).to_string())
    }

    pub fn prefix(prefix: impl Into<String>) -> Self {
        HandlerSource::Prefix(prefix.into())
    }
}

fn trim_module_path(mut path: String) -> String {
    while path.ends_with("::") {
        path.truncate(path.len() - 2);
    }
    path
}

/// Resolved discovery scope
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SourceFilter {
    /// Every registration linked into the process
    All,
    Modules(Vec<String>),
    Prefixes(Vec<String>),
}

impl SourceFilter {
    /// Resolve a source list, rejecting mixed kinds
    pub fn resolve(sources: &[HandlerSource]) -> Result<Self, ConfigurationError> {
        if sources.is_empty() {
            return Ok(SourceFilter::All);
        }

        let modules: Vec<String> = sources
            .iter()
            .filter_map(|s| match s {
                HandlerSource::Module(m) => Some(trim_module_path(m.clone())),
                HandlerSource::Prefix(_) => None,
            })
            .collect();

        if modules.len() == sources.len() {
            return Ok(SourceFilter::Modules(modules));
        }

        if !modules.is_empty() {
            return Err(ConfigurationError::MixedSources);
        }

        let prefixes = sources
            .iter()
            .filter_map(|s| match s {
                HandlerSource::Prefix(p) => Some(p.clone()),
                HandlerSource::Module(_) => None,
            })
            .collect();

        Ok(SourceFilter::Prefixes(prefixes))
    }

    /// Check if a declaring module falls inside this scope
    pub fn matches(&self, module_path: &str) -> bool {
        match self {
            SourceFilter::All => true,
            SourceFilter::Modules(modules) => modules.iter().any(|m| {
                module_path
                    .strip_prefix(m.as_str())
                    .is_some_and(|rest| rest.is_empty() || rest.starts_with("::"))
            }),
            SourceFilter::Prefixes(prefixes) => {
                prefixes.iter().any(|p| module_path.starts_with(p.as_str()))
            }
        }
    }
}

/// Result of a discovery call
#[derive(Debug, Clone, Default)]
pub struct DiscoveryReport {
    /// Distinct modules that contributed handlers
    pub modules: Vec<&'static str>,
    /// Bindings added by this call, in registration order
    pub registered: Vec<HandlerDescriptor>,
}

impl DiscoveryReport {
    pub fn handler_count(&self) -> usize {
        self.registered.len()
    }
}

/// Discovers handler registrations and binds them into a collection
pub struct HandlerRegistry;

impl HandlerRegistry {
    /// Every registration linked into the process, in deterministic order
    ///
    /// Ordered by module path, then handler, message and contract; this is
    /// the registration order discovery applies.
    pub fn registrations() -> Vec<&'static HandlerRegistration> {
        let mut entries: Vec<_> = inventory::iter::<HandlerRegistration>
            .into_iter()
            .collect();
        entries.sort_by(|a, b| {
            (a.module_path, a.handler_name, a.message_name, a.kind).cmp(&(
                b.module_path,
                b.handler_name,
                b.message_name,
                b.kind,
            ))
        });
        entries
    }

    /// Registrations inside the given scope
    pub fn registrations_in(filter: &SourceFilter) -> Vec<&'static HandlerRegistration> {
        Self::registrations()
            .into_iter()
            .filter(|entry| filter.matches(entry.module_path))
            .collect()
    }

    /// Discover handlers from `sources` and bind them as transient handlers
    ///
    /// - no sources: every registration in the process
    /// - only modules: registrations declared in those modules
    /// - only prefixes: registrations whose module path starts with a prefix
    ///
    /// Mixing modules and prefixes fails with
    /// [`ConfigurationError::MixedSources`]. The call is all-or-nothing:
    /// if any binding fails, `services` is left untouched.
    pub fn discover(
        services: &mut ServiceCollection,
        sources: &[HandlerSource],
    ) -> Result<DiscoveryReport, ConfigurationError> {
        let filter = SourceFilter::resolve(sources)?;
        debug!(filter = ?filter, "Discovering handlers");

        let mut staged = ServiceCollection::with_policy(services.policy());
        let mut modules: Vec<&'static str> = Vec::new();

        for entry in Self::registrations_in(&filter) {
            trace!(
                module = entry.module_path,
                handler = entry.handler_name,
                message = entry.message_name,
                kind = ?entry.kind,
                "Applying handler registration"
            );
            entry.apply(&mut staged)?;

            if !modules.contains(&entry.module_path) {
                modules.push(entry.module_path);
            }
        }

        services.check_merge(&staged)?;

        let report = DiscoveryReport {
            modules,
            registered: staged.handler_descriptors().to_vec(),
        };
        services.merge(staged);

        info!(
            handler_count = report.handler_count(),
            module_count = report.modules.len(),
            "Handlers discovered"
        );
        Ok(report)
    }
}

/// Register a request handler for discovery
///
/// The handler must implement [`RequestHandler`](crate::RequestHandler) and
/// [`FromProvider`](crate::FromProvider). Several request types may be listed
/// for a handler implementing several contracts.
///
/// ```rust,ignore
/// register_request_handler!(PingHandler => Ping);
/// ```
#[macro_export]
macro_rules! register_request_handler {
    ($handler:ty => $($request:ty),+ $(,)?) => {
        $(
            $crate::inventory::submit! {
                $crate::registry::HandlerRegistration::new(
                    module_path!(),
                    stringify!($handler),
                    stringify!($request),
                    $crate::HandlerKind::Request,
                    {
                        fn register(
                            services: &mut $crate::ServiceCollection,
                        ) -> ::core::result::Result<(), $crate::ConfigurationError> {
                            services.add_request_handler::<$request, $handler>().map(|_| ())
                        }
                        register
                    },
                )
            }
        )+
    };
}

/// Register a void request handler for discovery
#[macro_export]
macro_rules! register_void_handler {
    ($handler:ty => $($request:ty),+ $(,)?) => {
        $(
            $crate::inventory::submit! {
                $crate::registry::HandlerRegistration::new(
                    module_path!(),
                    stringify!($handler),
                    stringify!($request),
                    $crate::HandlerKind::VoidRequest,
                    {
                        fn register(
                            services: &mut $crate::ServiceCollection,
                        ) -> ::core::result::Result<(), $crate::ConfigurationError> {
                            services.add_void_handler::<$request, $handler>().map(|_| ())
                        }
                        register
                    },
                )
            }
        )+
    };
}

/// Register a notification handler for discovery
#[macro_export]
macro_rules! register_notification_handler {
    ($handler:ty => $($notification:ty),+ $(,)?) => {
        $(
            $crate::inventory::submit! {
                $crate::registry::HandlerRegistration::new(
                    module_path!(),
                    stringify!($handler),
                    stringify!($notification),
                    $crate::HandlerKind::Notification,
                    {
                        fn register(
                            services: &mut $crate::ServiceCollection,
                        ) -> ::core::result::Result<(), $crate::ConfigurationError> {
                            services.add_notification_handler::<$notification, $handler>();
                            Ok(())
                        }
                        register
                    },
                )
            }
        )+
    };
}
