//! Message kinds routed by the mediator

/// Request trait
///
/// A request is handled by exactly one handler and produces a response.
/// The response type is part of the request's identity: a request type
/// always resolves to the handler bound for `(Self, Self::Response)`.
pub trait Request: Send + 'static {
    /// Response produced by the handler
    type Response: Send + 'static;
}

/// Request without a response
///
/// Handled by exactly one handler; the caller only learns whether it
/// succeeded.
pub trait VoidRequest: Send + 'static {}

/// Notification trait
///
/// Notifications fan out to zero or more handlers. Every handler receives
/// a shared reference to the same value, so notifications must be `Sync`.
pub trait Notification: Send + Sync + 'static {}

/// Short name of a message type, without its module path or generic arguments.
///
/// `my_app::queries::Ping` becomes `Ping`.
pub fn short_type_name<T: ?Sized>() -> &'static str {
    short_name(std::any::type_name::<T>())
}

/// Last path segment of a type name, without generic arguments
pub fn short_name(type_name: &'static str) -> &'static str {
    let base = type_path(type_name);
    base.rsplit("::").next().unwrap_or(base)
}

/// Module path declaring a type name, e.g. `my_app::queries` for `my_app::queries::Ping<u8>`
pub fn module_of_type_name(type_name: &'static str) -> &'static str {
    let base = type_path(type_name);
    base.rsplit_once("::").map(|(module, _)| module).unwrap_or(base)
}

fn type_path(type_name: &'static str) -> &'static str {
    type_name.split('<').next().unwrap_or(type_name)
}

#[cfg(test)]
mod tests {
    use super::*;

    struct Ping;

    #[allow(dead_code)]
    struct Envelope<T>(T);

    #[test]
    fn test_short_type_name() {
        assert_eq!(short_type_name::<Ping>(), "Ping");
        assert_eq!(short_type_name::<Envelope<Ping>>(), "Envelope");
        assert_eq!(short_type_name::<u32>(), "u32");
    }

    #[test]
    fn test_type_name_helpers() {
        assert_eq!(short_name("app::queries::Envelope<app::Ping>"), "Envelope");
        assert_eq!(module_of_type_name("app::queries::Envelope<app::Ping>"), "app::queries");
        assert_eq!(module_of_type_name("u32"), "u32");
    }
}
