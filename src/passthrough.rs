//! Passthrough adapter for in-process service implementations.
//!
//! A locally linked implementation is wrapped so that it presents the same
//! surface as a remote proxy. Wrapping is driven by constructors keyed by
//! exact interface descriptor, looked up in two places:
//!
//! 1. A `ConstructorTable` built at startup and injected into the adapter.
//! 2. Constructors registered at link time with `inventory::submit!`.
//!
//! # Example
//!
//! ```ignore
//! use lazysvc::passthrough::{ConstructorTable, PassthroughAdapter, PassthroughConstructor};
//!
//! // Explicit registration, typically done once during startup
//! let table = Arc::new(ConstructorTable::new());
//! table.register("vendor.foo@1.0::IFoo", |local| ServiceHandle::new(PassthroughFoo::new(local)));
//!
//! // Link-time registration emitted next to the interface
//! inventory::submit! {
//!     PassthroughConstructor::new("vendor.bar@1.0::IBar", wrap_bar)
//! }
//!
//! let adapter = PassthroughAdapter::new(table);
//! let wrapped = adapter.wrap(Some(local_foo));
//! ```

use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;

use parking_lot::RwLock;
use tracing::{debug, warn};

use crate::compat::{CompatibilityChecker, InterfaceChainChecker};
use crate::handle::ServiceHandle;

/// Adapts a local implementation into a handle of the wrapped type.
///
/// The result must implement the descriptor the constructor is registered
/// under, or a descendant of it.
pub type Constructor = Arc<dyn Fn(ServiceHandle) -> ServiceHandle + Send + Sync>;

/// Constructor signature for link-time registration.
pub type ConstructorFn = fn(ServiceHandle) -> ServiceHandle;

/// Link-time passthrough constructor registration.
///
/// Interfaces submit one of these per descriptor with `inventory::submit!`.
pub struct PassthroughConstructor {
    /// Interface descriptor the constructor wraps
    pub descriptor: &'static str,

    /// Wrapping function
    pub construct: ConstructorFn,
}

impl PassthroughConstructor {
    pub const fn new(descriptor: &'static str, construct: ConstructorFn) -> Self {
        Self {
            descriptor,
            construct,
        }
    }
}

inventory::collect!(PassthroughConstructor);

/// Get a link-time constructor by exact descriptor.
pub fn get_static_constructor(descriptor: &str) -> Option<&'static PassthroughConstructor> {
    inventory::iter::<PassthroughConstructor>().find(|c| c.descriptor == descriptor)
}

/// List all link-time constructors.
pub fn list_static_constructors() -> impl Iterator<Item = &'static PassthroughConstructor> {
    inventory::iter::<PassthroughConstructor>()
}

/// Descriptor → constructor map.
///
/// Insert-only; lookups may run concurrently with registrations.
#[derive(Default)]
pub struct ConstructorTable {
    constructors: RwLock<HashMap<String, Constructor>>,
}

impl ConstructorTable {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a constructor for `descriptor`.
    ///
    /// The first registration for a descriptor wins; returns false if one
    /// was already present.
    pub fn register<F>(&self, descriptor: impl Into<String>, construct: F) -> bool
    where
        F: Fn(ServiceHandle) -> ServiceHandle + Send + Sync + 'static,
    {
        let descriptor = descriptor.into();
        let mut constructors = self.constructors.write();
        if constructors.contains_key(&descriptor) {
            debug!("passthrough constructor for {} already registered", descriptor);
            return false;
        }
        constructors.insert(descriptor, Arc::new(construct));
        true
    }

    pub fn get(&self, descriptor: &str) -> Option<Constructor> {
        self.constructors.read().get(descriptor).cloned()
    }

    pub fn contains(&self, descriptor: &str) -> bool {
        self.constructors.read().contains_key(descriptor)
    }

    pub fn len(&self) -> usize {
        self.constructors.read().len()
    }

    pub fn is_empty(&self) -> bool {
        self.constructors.read().is_empty()
    }

    /// Registered descriptors, sorted.
    pub fn descriptors(&self) -> Vec<String> {
        let mut descriptors: Vec<String> = self.constructors.read().keys().cloned().collect();
        descriptors.sort();
        descriptors
    }
}

impl fmt::Debug for ConstructorTable {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ConstructorTable")
            .field("descriptors", &self.descriptors())
            .finish()
    }
}

/// Wraps local implementations as uniform service handles.
#[derive(Debug, Clone)]
pub struct PassthroughAdapter {
    table: Arc<ConstructorTable>,
    verify: bool,
}

impl PassthroughAdapter {
    pub fn new(table: Arc<ConstructorTable>) -> Self {
        Self {
            table,
            verify: false,
        }
    }

    /// Re-check constructor output against the wrapped descriptor.
    ///
    /// Constructors are trusted by default.
    pub fn with_verification(mut self, verify: bool) -> Self {
        self.verify = verify;
        self
    }

    pub fn verifies(&self) -> bool {
        self.verify
    }

    pub fn table(&self) -> &Arc<ConstructorTable> {
        &self.table
    }

    /// Find a constructor: the injected table first, then link-time registrations.
    pub fn lookup(&self, descriptor: &str) -> Option<Constructor> {
        if let Some(construct) = self.table.get(descriptor) {
            return Some(construct);
        }
        get_static_constructor(descriptor).map(|c| Arc::new(c.construct) as Constructor)
    }

    /// Wrap a local implementation.
    ///
    /// `None` and remote handles are returned unchanged. A local handle whose
    /// descriptor cannot be read, or that has no constructor, yields `None`.
    pub fn wrap(&self, handle: Option<ServiceHandle>) -> Option<ServiceHandle> {
        let handle = handle?;
        if handle.is_remote() {
            return Some(handle);
        }

        let descriptor = match handle.interface_descriptor() {
            Ok(descriptor) if !descriptor.is_empty() => descriptor,
            Ok(_) => {
                warn!("passthrough: local implementation reports an empty descriptor");
                return None;
            }
            Err(e) => {
                warn!("passthrough: interface descriptor lookup failed: {}", e);
                return None;
            }
        };

        let Some(construct) = self.lookup(&descriptor) else {
            debug!("passthrough: no constructor registered for {}", descriptor);
            return None;
        };

        let wrapped = construct(handle);

        if self.verify {
            match InterfaceChainChecker::quiet().can_cast(&wrapped, &descriptor) {
                Ok(true) => {}
                Ok(false) => {
                    warn!("passthrough: constructor for {} produced an incompatible object", descriptor);
                    return None;
                }
                Err(e) => {
                    warn!("passthrough: could not verify wrapped {}: {}", descriptor, e);
                    return None;
                }
            }
        }

        Some(wrapped)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::{CallResult, TransportError};
    use crate::handle::{Locality, ServiceObject, BASE_DESCRIPTOR};
    use std::any::Any;

    const FOO: &str = "test.foo@1.0::IFoo";
    const LINKED: &str = "test.linked@1.0::ILinked";

    struct LocalImpl {
        descriptor: &'static str,
    }

    impl ServiceObject for LocalImpl {
        fn interface_chain(&self) -> CallResult<Vec<String>> {
            Ok(vec![self.descriptor.to_owned(), BASE_DESCRIPTOR.to_owned()])
        }

        fn as_any(&self) -> &dyn Any {
            self
        }
    }

    struct Proxy;

    impl ServiceObject for Proxy {
        fn interface_chain(&self) -> CallResult<Vec<String>> {
            Err(TransportError::DeadObject)
        }

        fn locality(&self) -> Locality {
            Locality::Remote
        }

        fn as_any(&self) -> &dyn Any {
            self
        }
    }

    struct Broken;

    impl ServiceObject for Broken {
        fn interface_chain(&self) -> CallResult<Vec<String>> {
            Err(TransportError::TransactionFailed("no chain".to_owned()))
        }

        fn as_any(&self) -> &dyn Any {
            self
        }
    }

    /// Wrapper that forwards to the local implementation.
    struct Wrapped {
        inner: ServiceHandle,
    }

    impl ServiceObject for Wrapped {
        fn interface_chain(&self) -> CallResult<Vec<String>> {
            self.inner.interface_chain()
        }

        fn as_any(&self) -> &dyn Any {
            self
        }
    }

    fn wrap_linked(inner: ServiceHandle) -> ServiceHandle {
        ServiceHandle::new(Wrapped { inner })
    }

    inventory::submit! {
        PassthroughConstructor::new(LINKED, wrap_linked)
    }

    fn adapter_with_foo() -> PassthroughAdapter {
        let table = Arc::new(ConstructorTable::new());
        table.register(FOO, |inner| ServiceHandle::new(Wrapped { inner }));
        PassthroughAdapter::new(table)
    }

    #[test]
    fn test_wrap_none() {
        assert!(adapter_with_foo().wrap(None).is_none());
    }

    #[test]
    fn test_wrap_remote_is_identity() {
        let remote = ServiceHandle::new(Proxy);
        let wrapped = adapter_with_foo().wrap(Some(remote.clone())).unwrap();
        assert!(ServiceHandle::ptr_eq(&remote, &wrapped));
    }

    #[test]
    fn test_wrap_unregistered_descriptor() {
        let local = ServiceHandle::new(LocalImpl {
            descriptor: "test.none@1.0::INone",
        });
        assert!(adapter_with_foo().wrap(Some(local)).is_none());
    }

    #[test]
    fn test_wrap_broken_descriptor() {
        assert!(adapter_with_foo().wrap(Some(ServiceHandle::new(Broken))).is_none());
    }

    #[test]
    fn test_wrap_primary_table() {
        let local = ServiceHandle::new(LocalImpl { descriptor: FOO });
        let wrapped = adapter_with_foo().wrap(Some(local.clone())).unwrap();

        assert!(!ServiceHandle::ptr_eq(&local, &wrapped));
        let inner = &wrapped.downcast_ref::<Wrapped>().unwrap().inner;
        assert!(ServiceHandle::ptr_eq(inner, &local));
    }

    #[test]
    fn test_wrap_falls_back_to_linked_constructors() {
        assert!(get_static_constructor(LINKED).is_some());
        assert!(list_static_constructors().any(|c| c.descriptor == LINKED));

        let local = ServiceHandle::new(LocalImpl { descriptor: LINKED });
        let wrapped = adapter_with_foo().wrap(Some(local)).unwrap();
        assert!(wrapped.downcast_ref::<Wrapped>().is_some());
    }

    #[test]
    fn test_first_registration_wins() {
        let table = ConstructorTable::new();
        assert!(table.register(FOO, |inner| inner));
        assert!(!table.register(FOO, |inner| ServiceHandle::new(Wrapped { inner })));
        assert_eq!(table.len(), 1);
        assert_eq!(table.descriptors(), vec![FOO.to_owned()]);
    }

    #[test]
    fn test_verification_rejects_wrong_type() {
        let table = Arc::new(ConstructorTable::new());
        table.register(FOO, |_| {
            ServiceHandle::new(LocalImpl {
                descriptor: "test.other@1.0::IOther",
            })
        });
        let local = ServiceHandle::new(LocalImpl { descriptor: FOO });

        let trusting = PassthroughAdapter::new(table.clone());
        assert!(trusting.wrap(Some(local.clone())).is_some());

        let verifying = PassthroughAdapter::new(table).with_verification(true);
        assert!(verifying.wrap(Some(local)).is_none());
    }

    #[test]
    fn test_concurrent_registration_and_lookup() {
        let table = Arc::new(ConstructorTable::new());
        let threads: Vec<_> = (0..8)
            .map(|i| {
                let table = table.clone();
                std::thread::spawn(move || {
                    let descriptor = format!("test.concurrent@1.0::I{i}");
                    table.register(descriptor.clone(), |inner| inner);
                    assert!(table.get(&descriptor).is_some());
                })
            })
            .collect();
        for t in threads {
            t.join().unwrap();
        }
        assert_eq!(table.len(), 8);
    }
}
