//! Service resolution.
//!
//! `ServiceResolver` turns an (interface descriptor, instance name) pair into
//! a live, type-checked `ServiceHandle`:
//!
//! 1. Ask the registry how the pair is reached (`TransportKind`).
//! 2. For direct transport (or unclassified services in legacy mode), fetch
//!    the handle from the registry, retrying while the host is starting up.
//! 3. Otherwise, or when the fetch loop gives up, fall back to an in-process
//!    implementation wrapped by the `PassthroughAdapter`.
//!
//! Service startup order is not guaranteed, so a consumer may ask before the
//! host has registered. `retry = false` polls once; `retry = true` blocks
//! until the service shows up, optionally bounded by a deadline.
//!
//! # Example
//!
//! ```ignore
//! let resolver = ServiceResolver::new(registry.clone(), ResolverConfig::from_settings(&config.resolver))
//!     .with_implementations(registry.clone())
//!     .with_passthrough(adapter);
//!
//! let light = resolver.resolve("vendor.light@2.0::ILight", "default", true, false);
//! ```

use std::fmt;
use std::sync::Arc;
use std::time::{Duration, Instant};

use tracing::{debug, error, info, warn};

use crate::compat::{CompatibilityChecker, InterfaceChainChecker};
use crate::config::ResolverSettings;
use crate::handle::ServiceHandle;
use crate::passthrough::{ConstructorTable, PassthroughAdapter};
use crate::transport::{ImplementationRegistry, ServiceRegistry, TransportKind};

/// Default delay between retries after the second attempt.
pub const DEFAULT_RETRY_BACKOFF: Duration = Duration::from_secs(1);

/// Build-time and environment flags steering resolution.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ResolverConfig {
    /// The registry classifies services by transport kind.
    pub kind_classification: bool,
    /// Debuggable-only paths are enabled.
    pub debuggable: bool,
    /// Legacy transport testing override requested by the environment.
    pub testing_override: bool,
    /// Sleep between retries after the second attempt.
    pub retry_backoff: Duration,
    /// Re-check passthrough constructor output.
    pub verify_passthrough: bool,
}

impl Default for ResolverConfig {
    fn default() -> Self {
        Self {
            kind_classification: cfg!(feature = "kind-classification"),
            debuggable: cfg!(feature = "debuggable"),
            testing_override: false,
            retry_backoff: DEFAULT_RETRY_BACKOFF,
            verify_passthrough: false,
        }
    }
}

impl ResolverConfig {
    /// Combine build features with loaded settings.
    pub fn from_settings(settings: &ResolverSettings) -> Self {
        Self {
            testing_override: settings.legacy_testing_override,
            retry_backoff: settings.retry_backoff(),
            verify_passthrough: settings.verify_passthrough,
            ..Self::default()
        }
    }

    /// The testing override, as far as this build honours it.
    ///
    /// Builds with transport classification only honour it when debuggable.
    pub fn effective_testing_override(&self) -> bool {
        if self.kind_classification {
            self.debuggable && self.testing_override
        } else {
            self.testing_override
        }
    }

    /// Whether a service is reached through legacy transport.
    ///
    /// Explicitly legacy services always are; unclassified ones only when the
    /// build cannot classify or the testing override applies.
    pub fn legacy_mode(&self, kind: TransportKind) -> bool {
        match kind {
            TransportKind::Legacy => true,
            TransportKind::Unknown => {
                !self.kind_classification || self.effective_testing_override()
            }
            TransportKind::Direct | TransportKind::Passthrough => false,
        }
    }
}

/// Per-call resolution options.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ResolveOptions {
    /// Keep trying until the service appears (or the deadline passes).
    pub retry: bool,
    /// Return the raw in-process implementation instead of a remote handle.
    pub get_stub: bool,
    /// Give up retrying at this instant.
    pub deadline: Option<Instant>,
}

impl ResolveOptions {
    pub fn new(retry: bool, get_stub: bool) -> Self {
        Self {
            retry,
            get_stub,
            deadline: None,
        }
    }

    pub fn with_deadline(mut self, deadline: Instant) -> Self {
        self.deadline = Some(deadline);
        self
    }

    pub fn with_timeout(self, timeout: Duration) -> Self {
        self.with_deadline(Instant::now() + timeout)
    }

    fn expired(&self) -> bool {
        self.deadline.is_some_and(|deadline| Instant::now() >= deadline)
    }
}

/// Resolves (descriptor, instance) pairs to live handles.
pub struct ServiceResolver {
    registry: Arc<dyn ServiceRegistry>,
    implementations: Option<Arc<dyn ImplementationRegistry>>,
    adapter: PassthroughAdapter,
    checker: Box<dyn CompatibilityChecker>,
    config: ResolverConfig,
}

impl ServiceResolver {
    /// Resolver without in-process implementations.
    pub fn new(registry: Arc<dyn ServiceRegistry>, config: ResolverConfig) -> Self {
        let adapter = PassthroughAdapter::new(Arc::new(ConstructorTable::new()))
            .with_verification(config.verify_passthrough);
        Self {
            registry,
            implementations: None,
            adapter,
            checker: Box::new(InterfaceChainChecker::new()),
            config,
        }
    }

    /// Source of in-process implementations for the local fallback.
    pub fn with_implementations(mut self, implementations: Arc<dyn ImplementationRegistry>) -> Self {
        self.implementations = Some(implementations);
        self
    }

    pub fn with_passthrough(mut self, adapter: PassthroughAdapter) -> Self {
        let verify = adapter.verifies() || self.config.verify_passthrough;
        self.adapter = adapter.with_verification(verify);
        self
    }

    pub fn with_checker(mut self, checker: impl CompatibilityChecker + 'static) -> Self {
        self.checker = Box::new(checker);
        self
    }

    pub fn config(&self) -> &ResolverConfig {
        &self.config
    }

    pub fn adapter(&self) -> &PassthroughAdapter {
        &self.adapter
    }

    /// Resolve without a deadline.
    pub fn resolve(
        &self,
        descriptor: &str,
        instance: &str,
        retry: bool,
        get_stub: bool,
    ) -> Option<ServiceHandle> {
        self.resolve_with(descriptor, instance, ResolveOptions::new(retry, get_stub))
    }

    /// Resolve a service.
    ///
    /// Returns `None` when the service is unavailable; failures are logged.
    pub fn resolve_with(
        &self,
        descriptor: &str,
        instance: &str,
        options: ResolveOptions,
    ) -> Option<ServiceHandle> {
        let kind = match self.registry.transport_kind(descriptor, instance) {
            Ok(kind) => kind,
            Err(e) => {
                error!(
                    "resolve: transport_kind for {}/{} failed: {}",
                    descriptor, instance, e
                );
                return None;
            }
        };

        let direct = kind == TransportKind::Direct;
        let passthrough = kind == TransportKind::Passthrough;
        let legacy = self.config.legacy_mode(kind);
        debug!(
            "resolve: {}/{} transport={} legacy={} retry={} get_stub={}",
            descriptor, instance, kind, legacy, options.retry, options.get_stub
        );

        if let Some(handle) = self.fetch_remote(descriptor, instance, direct, legacy, &options) {
            return Some(handle);
        }

        if options.get_stub || passthrough || legacy {
            return self.local_fallback(descriptor, instance, options.get_stub);
        }

        None
    }

    /// The registry fetch loop. `None` means fall through.
    fn fetch_remote(
        &self,
        descriptor: &str,
        instance: &str,
        direct: bool,
        legacy: bool,
        options: &ResolveOptions,
    ) -> Option<ServiceHandle> {
        let eligible = |tries: u32| {
            !options.get_stub && (direct || (legacy && tries == 0)) && (options.retry || tries < 1)
        };

        for tries in (0u32..).take_while(|&tries| eligible(tries)) {
            if tries > 0 && options.expired() {
                warn!(
                    "resolve: deadline passed for {}/{} after {} tries",
                    descriptor, instance, tries
                );
                break;
            }
            if tries > 1 {
                info!(
                    "resolve: will do try {} for {}/{} in {:?}...",
                    tries, descriptor, instance, self.config.retry_backoff
                );
                self.backoff(options);
            }
            if direct && tries > 0 {
                self.registry
                    .wait_for_service(descriptor, instance, options.deadline);
            }

            let handle = match self.registry.get(descriptor, instance) {
                Ok(Some(handle)) => handle,
                Ok(None) => {
                    if tries > 0 {
                        warn!(
                            "resolve: found unexpected null handle for {}/{}.",
                            descriptor, instance
                        );
                    }
                    continue;
                }
                Err(e) => {
                    error!(
                        "resolve: registry get returns {} for {}/{}.",
                        e, descriptor, instance
                    );
                    break;
                }
            };

            match self.checker.can_cast(&handle, descriptor) {
                Ok(true) => return Some(handle),
                Ok(false) => {
                    warn!(
                        "resolve: received incompatible service for {}/{}.",
                        descriptor, instance
                    );
                    break;
                }
                Err(e) if e.is_dead_object() => {
                    warn!("resolve: found dead service for {}/{}.", descriptor, instance);
                    continue;
                }
                Err(e) => {
                    // Retrying would spin forever on e.g. a permission failure
                    warn!(
                        "resolve: unable to call into service for {}/{}: {}",
                        descriptor, instance, e
                    );
                    break;
                }
            }
        }

        None
    }

    fn backoff(&self, options: &ResolveOptions) {
        let mut pause = self.config.retry_backoff;
        if let Some(deadline) = options.deadline {
            pause = pause.min(deadline.saturating_duration_since(Instant::now()));
        }
        if !pause.is_zero() {
            std::thread::sleep(pause);
        }
    }

    fn local_fallback(
        &self,
        descriptor: &str,
        instance: &str,
        get_stub: bool,
    ) -> Option<ServiceHandle> {
        let Some(implementations) = &self.implementations else {
            debug!("resolve: no in-process implementations for {}/{}", descriptor, instance);
            return None;
        };

        let base = match implementations.get(descriptor, instance) {
            Ok(base) => base,
            Err(e) => {
                warn!(
                    "resolve: in-process lookup for {}/{} failed: {}",
                    descriptor, instance, e
                );
                None
            }
        };

        if !get_stub || self.config.effective_testing_override() {
            return self.adapter.wrap(base);
        }
        base
    }
}

impl fmt::Debug for ServiceResolver {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ServiceResolver")
            .field("config", &self.config)
            .field("has_implementations", &self.implementations.is_some())
            .field("adapter", &self.adapter)
            .finish()
    }
}
