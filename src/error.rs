//! Error types for service lifecycle and resolution.

use thiserror::Error;

/// Out-of-band failure of a call into a service object or a registry.
///
/// Collaborators surface failures as values; nothing in this crate panics
/// on a failed call.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum TransportError {
    /// The remote object died (its host process exited or is restarting).
    #[error("dead object")]
    DeadObject,

    /// The call reached the peer but could not complete, or the reply was malformed.
    #[error("transaction failed: {0}")]
    TransactionFailed(String),

    /// The peer (usually the registry) could not be reached at all.
    #[error("unavailable: {0}")]
    Unavailable(String),
}

impl TransportError {
    /// Dead objects are transient from the resolver's point of view.
    pub fn is_dead_object(&self) -> bool {
        matches!(self, TransportError::DeadObject)
    }
}

/// Result type alias for collaborator calls.
pub type CallResult<T> = std::result::Result<T, TransportError>;

/// Errors returned by `LazyServiceRegistrar::register_service`.
#[derive(Debug, Error)]
pub enum RegistrationError {
    /// The registry refused the registration.
    #[error("registry rejected registration of {name}")]
    Rejected { name: String },

    /// The registry call itself failed.
    #[error("registry call failed: {0}")]
    Transport(#[from] TransportError),

    /// The service is registered, but it has no lazy-exit protection.
    #[error("service {name} registered but the client callback could not be attached")]
    CallbackAttachFailed { name: String },
}

impl RegistrationError {
    /// True when the service ended up registered despite the error.
    pub fn is_registered(&self) -> bool {
        matches!(self, RegistrationError::CallbackAttachFailed { .. })
    }
}

/// Errors from scheduler policy validation.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum PolicyError {
    /// Scheduling hints only apply to services hosted in this process.
    #[error("can't set scheduler policy on remote service")]
    RemoteService,

    /// Unknown scheduler policy value.
    #[error("invalid scheduler policy {0}")]
    InvalidPolicy(i32),

    /// Priority out of range for the policy.
    #[error("invalid priority {priority} for {policy} policy")]
    InvalidPriority { policy: &'static str, priority: i32 },
}

/// Crate-level error for configuration and setup paths.
#[derive(Debug, Error)]
pub enum Error {
    /// Configuration could not be loaded or deserialized.
    #[error("configuration error: {0}")]
    Config(#[from] config::ConfigError),

    /// IO error (thread pool creation, config files).
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),

    /// Service registration failed.
    #[error(transparent)]
    Registration(#[from] RegistrationError),

    /// Scheduler policy rejected.
    #[error(transparent)]
    Policy(#[from] PolicyError),
}

/// Result type alias for crate-level operations.
pub type Result<T> = std::result::Result<T, Error>;
