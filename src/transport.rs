//! Contracts of the external collaborators.
//!
//! The service registry, the in-process implementation registry and the
//! client notification sink are supplied by the transport layer. This crate
//! only calls through these traits; `crate::registry::InMemoryRegistry` is an
//! in-process implementation of the registry side.

use std::fmt;
use std::sync::Arc;
use std::time::Instant;

use serde::{Deserialize, Serialize};

use crate::error::CallResult;
use crate::handle::ServiceHandle;

/// How a (descriptor, instance) pair should be reached.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TransportKind {
    /// Inter-process call through the registry.
    Direct,
    /// In-process implementation wrapped by the passthrough adapter.
    Passthrough,
    /// Pre-classification transport.
    Legacy,
    /// The registry has no classification for the pair.
    #[default]
    Unknown,
}

impl fmt::Display for TransportKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            TransportKind::Direct => "direct",
            TransportKind::Passthrough => "passthrough",
            TransportKind::Legacy => "legacy",
            TransportKind::Unknown => "unknown",
        };
        f.write_str(name)
    }
}

/// Receives per-service connect/disconnect notifications.
///
/// Invoked on notification threads owned by the transport; calls for
/// distinct services may run concurrently.
pub trait ClientCallback: Send + Sync {
    /// `has_clients` is true when `service` gained its first client and
    /// false when it lost its last one.
    fn on_clients_changed(&self, service: &ServiceHandle, has_clients: bool);
}

/// The process-external service registry.
pub trait ServiceRegistry: Send + Sync {
    /// Register a local service under `name`.
    fn register_by_name(&self, service: &ServiceHandle, name: &str) -> CallResult<bool>;

    /// Classify how (descriptor, instance) is reached.
    fn transport_kind(&self, descriptor: &str, instance: &str) -> CallResult<TransportKind>;

    /// Fetch a handle; `Ok(None)` when nothing is registered (yet).
    fn get(&self, descriptor: &str, instance: &str) -> CallResult<Option<ServiceHandle>>;

    /// Subscribe `callback` to client changes of a registered service.
    fn attach_lifecycle_callback(
        &self,
        service: &ServiceHandle,
        callback: Arc<dyn ClientCallback>,
    ) -> CallResult<bool>;

    /// Block until (descriptor, instance) is registered.
    ///
    /// `None` blocks without bound; with a deadline the wait gives up once it passes.
    fn wait_for_service(&self, descriptor: &str, instance: &str, deadline: Option<Instant>);
}

/// Source of in-process implementations for passthrough transport.
pub trait ImplementationRegistry: Send + Sync {
    fn get(&self, descriptor: &str, instance: &str) -> CallResult<Option<ServiceHandle>>;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_transport_kind_serde() {
        let kind: TransportKind = serde_json::from_str("\"passthrough\"").unwrap();
        assert_eq!(kind, TransportKind::Passthrough);
        assert_eq!(serde_json::to_string(&TransportKind::Direct).unwrap(), "\"direct\"");
        assert_eq!(TransportKind::default(), TransportKind::Unknown);
        assert_eq!(TransportKind::Legacy.to_string(), "legacy");
    }
}
