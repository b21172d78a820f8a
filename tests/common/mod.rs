//! Common test fixtures for service resolution and lazy lifecycle tests

#![allow(dead_code)]

use std::any::Any;
use std::collections::VecDeque;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::{Duration, Instant};

use lazysvc::error::{CallResult, TransportError};
use lazysvc::{
    ClientCallback, ImplementationRegistry, Locality, ResolverConfig, ServiceHandle,
    ServiceObject, ServiceRegistry, TransportKind, BASE_DESCRIPTOR,
};
use parking_lot::Mutex;

pub const FOO: &str = "test.foo@1.0::IFoo";
pub const FOO_V2: &str = "test.foo@2.0::IFoo";
pub const OTHER: &str = "test.other@1.0::IOther";

/// Service object with a fixed interface chain.
pub struct TestService {
    chain: Vec<String>,
    locality: Locality,
}

impl ServiceObject for TestService {
    fn interface_chain(&self) -> CallResult<Vec<String>> {
        Ok(self.chain.clone())
    }

    fn locality(&self) -> Locality {
        self.locality
    }

    fn as_any(&self) -> &dyn Any {
        self
    }
}

fn chain(descriptors: &[&str]) -> Vec<String> {
    descriptors
        .iter()
        .map(|d| d.to_string())
        .chain(std::iter::once(BASE_DESCRIPTOR.to_owned()))
        .collect()
}

pub fn local(descriptors: &[&str]) -> ServiceHandle {
    ServiceHandle::new(TestService {
        chain: chain(descriptors),
        locality: Locality::Local,
    })
}

pub fn remote(descriptors: &[&str]) -> ServiceHandle {
    ServiceHandle::new(TestService {
        chain: chain(descriptors),
        locality: Locality::Remote,
    })
}

/// Remote object whose every call fails with `error`.
pub struct FailingService {
    error: TransportError,
}

impl ServiceObject for FailingService {
    fn interface_chain(&self) -> CallResult<Vec<String>> {
        Err(self.error.clone())
    }

    fn locality(&self) -> Locality {
        Locality::Remote
    }

    fn as_any(&self) -> &dyn Any {
        self
    }
}

pub fn dead() -> ServiceHandle {
    ServiceHandle::new(FailingService {
        error: TransportError::DeadObject,
    })
}

pub fn failing() -> ServiceHandle {
    ServiceHandle::new(FailingService {
        error: TransportError::TransactionFailed("permission denied".to_owned()),
    })
}

/// Passthrough wrapper around a local implementation.
pub struct Wrapper {
    pub inner: ServiceHandle,
}

impl ServiceObject for Wrapper {
    fn interface_chain(&self) -> CallResult<Vec<String>> {
        self.inner.interface_chain()
    }

    fn as_any(&self) -> &dyn Any {
        self
    }
}

pub fn wrap(inner: ServiceHandle) -> ServiceHandle {
    ServiceHandle::new(Wrapper { inner })
}

/// Registry that answers `get` from a script and counts calls.
///
/// Once the script is exhausted, `get` returns no handle.
pub struct ScriptedRegistry {
    kind: TransportKind,
    script: Mutex<VecDeque<CallResult<Option<ServiceHandle>>>>,
    get_calls: AtomicUsize,
    waits: AtomicUsize,
}

impl ScriptedRegistry {
    pub fn new(
        kind: TransportKind,
        script: impl IntoIterator<Item = CallResult<Option<ServiceHandle>>>,
    ) -> Arc<Self> {
        Arc::new(Self {
            kind,
            script: Mutex::new(script.into_iter().collect()),
            get_calls: AtomicUsize::new(0),
            waits: AtomicUsize::new(0),
        })
    }

    pub fn get_calls(&self) -> usize {
        self.get_calls.load(Ordering::SeqCst)
    }

    pub fn waits(&self) -> usize {
        self.waits.load(Ordering::SeqCst)
    }
}

impl ServiceRegistry for ScriptedRegistry {
    fn register_by_name(&self, _service: &ServiceHandle, _name: &str) -> CallResult<bool> {
        Ok(true)
    }

    fn transport_kind(&self, _descriptor: &str, _instance: &str) -> CallResult<TransportKind> {
        Ok(self.kind)
    }

    fn get(&self, _descriptor: &str, _instance: &str) -> CallResult<Option<ServiceHandle>> {
        self.get_calls.fetch_add(1, Ordering::SeqCst);
        self.script.lock().pop_front().unwrap_or(Ok(None))
    }

    fn attach_lifecycle_callback(
        &self,
        _service: &ServiceHandle,
        _callback: Arc<dyn ClientCallback>,
    ) -> CallResult<bool> {
        Ok(true)
    }

    fn wait_for_service(&self, _descriptor: &str, _instance: &str, _deadline: Option<Instant>) {
        self.waits.fetch_add(1, Ordering::SeqCst);
    }
}

/// In-process implementations keyed by nothing: always the same answer.
pub struct FixedImplementations {
    answer: CallResult<Option<ServiceHandle>>,
}

impl FixedImplementations {
    pub fn new(answer: CallResult<Option<ServiceHandle>>) -> Arc<Self> {
        Arc::new(Self { answer })
    }
}

impl ImplementationRegistry for FixedImplementations {
    fn get(&self, _descriptor: &str, _instance: &str) -> CallResult<Option<ServiceHandle>> {
        self.answer.clone()
    }
}

/// Resolver flags for a build with transport classification, not debuggable.
pub fn classified_config() -> ResolverConfig {
    ResolverConfig {
        kind_classification: true,
        debuggable: false,
        testing_override: false,
        retry_backoff: Duration::from_millis(10),
        verify_passthrough: false,
    }
}

/// Exit handler that counts invocations.
pub fn counting_exit() -> (Arc<AtomicUsize>, lazysvc::lifecycle::ExitHandler) {
    let exits = Arc::new(AtomicUsize::new(0));
    let counter = exits.clone();
    (
        exits,
        Arc::new(move || {
            counter.fetch_add(1, Ordering::SeqCst);
        }),
    )
}
