//! Lazy-exit lifecycle management.
//!
//! A lazily hosted process registers its services through a
//! `LazyServiceRegistrar`. All registrations share one
//! `ClientCounterCallback`, which the registry notifies whenever a service
//! gains its first client or loses its last one. When no service of the
//! process has a client left, the process exits.
//!
//! # Usage
//!
//! ```ignore
//! use lazysvc::lifecycle::LazyServiceRegistrar;
//!
//! let registrar = LazyServiceRegistrar::new(registry.clone());
//! registrar.register_service(&light, "default")?;
//! registrar.register_service(&vibrator, "default")?;
//!
//! // Serve until the last client disconnects
//! dispatcher.join();
//! ```

mod counter;
mod registrar;

pub use counter::{exit_process, ClientCounterCallback, ExitHandler};
pub use registrar::LazyServiceRegistrar;
