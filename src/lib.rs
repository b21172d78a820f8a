//! Lazy service lifecycle and resolution.
//!
//! - `lifecycle` registers services so their hosting process exits once no
//!   client holds any of them.
//! - `resolver` looks services up by (descriptor, instance), retrying while
//!   hosts start, with an in-process passthrough fallback.
//! - `registry` is an in-process registry implementing the transport traits.

pub mod compat;
pub mod config;
pub mod dispatch;
pub mod error;
pub mod handle;
pub mod lifecycle;
pub mod passthrough;
pub mod registry;
pub mod resolver;
pub mod scheduler;
pub mod transport;

// Re-export commonly used types
pub use compat::{CompatibilityChecker, InterfaceChainChecker};
pub use self::config::LifecycleConfig;
pub use dispatch::{NotificationDispatcher, Notifier};
pub use error::{CallResult, Error, RegistrationError, Result, TransportError};
pub use handle::{Locality, ServiceHandle, ServiceObject, BASE_DESCRIPTOR};
pub use lifecycle::{ClientCounterCallback, LazyServiceRegistrar};
pub use passthrough::{ConstructorTable, PassthroughAdapter, PassthroughConstructor};
pub use registry::InMemoryRegistry;
pub use resolver::{ResolveOptions, ResolverConfig, ServiceResolver};
pub use transport::{ClientCallback, ImplementationRegistry, ServiceRegistry, TransportKind};
