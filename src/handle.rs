//! Service objects and the shared handles that refer to them.
//!
//! A `ServiceHandle` is a reference-counted pointer to a `ServiceObject`.
//! The object is either a local implementation living in this process or a
//! remote proxy to an object hosted elsewhere. Dropping the last clone of a
//! proxy handle drops the proxy, which is where a transport signals
//! disconnection to the remote side.

use std::any::Any;
use std::fmt;
use std::sync::{Arc, Weak};

use crate::error::{CallResult, TransportError};

/// Descriptor every interface chain ends with.
///
/// Any live object can be cast to the base interface.
pub const BASE_DESCRIPTOR: &str = "lazysvc.base@1.0::IBase";

/// Where a service object lives relative to the caller.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Locality {
    /// Implemented in this process.
    Local,
    /// Proxy to an object in another process.
    Remote,
}

/// A callable endpoint for one interface instance.
pub trait ServiceObject: Send + Sync + 'static {
    /// Interface descriptors this object implements, most-derived first.
    fn interface_chain(&self) -> CallResult<Vec<String>>;

    /// The object's own interface descriptor (head of its chain).
    fn interface_descriptor(&self) -> CallResult<String> {
        self.interface_chain()?
            .into_iter()
            .next()
            .ok_or_else(|| TransportError::TransactionFailed("empty interface chain".to_owned()))
    }

    /// Local implementations keep the default.
    fn locality(&self) -> Locality {
        Locality::Local
    }

    /// Concrete object, for downcasting.
    fn as_any(&self) -> &dyn Any;
}

/// Shared reference to a service object.
#[derive(Clone)]
pub struct ServiceHandle {
    inner: Arc<dyn ServiceObject>,
}

impl ServiceHandle {
    /// Wrap a service object in a new handle.
    pub fn new<T: ServiceObject>(object: T) -> Self {
        Self {
            inner: Arc::new(object),
        }
    }

    /// Wrap an already shared service object.
    pub fn from_arc(inner: Arc<dyn ServiceObject>) -> Self {
        Self { inner }
    }

    pub fn locality(&self) -> Locality {
        self.inner.locality()
    }

    pub fn is_remote(&self) -> bool {
        self.locality() == Locality::Remote
    }

    pub fn interface_chain(&self) -> CallResult<Vec<String>> {
        self.inner.interface_chain()
    }

    pub fn interface_descriptor(&self) -> CallResult<String> {
        self.inner.interface_descriptor()
    }

    /// Borrow the concrete object if it is a `T`.
    pub fn downcast_ref<T: ServiceObject>(&self) -> Option<&T> {
        self.inner.as_any().downcast_ref::<T>()
    }

    /// Identity of the underlying object, stable while any clone is alive.
    pub fn id(&self) -> usize {
        Arc::as_ptr(&self.inner) as *const () as usize
    }

    /// True when both handles refer to the same object.
    pub fn ptr_eq(a: &ServiceHandle, b: &ServiceHandle) -> bool {
        a.id() == b.id()
    }

    /// Number of live clones of this handle.
    pub fn strong_count(&self) -> usize {
        Arc::strong_count(&self.inner)
    }

    pub fn downgrade(&self) -> WeakServiceHandle {
        WeakServiceHandle {
            inner: Arc::downgrade(&self.inner),
        }
    }
}

impl fmt::Debug for ServiceHandle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ServiceHandle")
            .field("id", &format_args!("{:#x}", self.id()))
            .field("locality", &self.locality())
            .finish()
    }
}

/// Non-owning reference to a service object.
#[derive(Clone)]
pub struct WeakServiceHandle {
    inner: Weak<dyn ServiceObject>,
}

impl WeakServiceHandle {
    /// Recover a strong handle if the object is still alive.
    pub fn upgrade(&self) -> Option<ServiceHandle> {
        self.inner.upgrade().map(ServiceHandle::from_arc)
    }

    pub fn is_alive(&self) -> bool {
        self.inner.strong_count() > 0
    }
}

impl fmt::Debug for WeakServiceHandle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("WeakServiceHandle")
            .field("alive", &self.is_alive())
            .finish()
    }
}
