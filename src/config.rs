//! Configuration management for lazy service hosting.
//!
//! Configuration is loaded from multiple sources:
//! 1. Built-in defaults
//! 2. User-specified configuration file (TOML)
//! 3. Environment variables (prefixed with `LAZYSVC_`, nested keys separated by `__`)
//! 4. Command-line arguments
//!
//! Later sources override earlier ones.
//!
//! # Environment Variables
//!
//! - `LAZYSVC_RESOLVER__RETRY_BACKOFF_MS` - Delay between resolver retries
//! - `LAZYSVC_THREADPOOL__MAX_THREADS` - Notification thread pool size
//! - `LAZYSVC_TESTING_OVERRIDE` - Set to exactly `true` to enable the legacy
//!   transport testing override

use std::env;
use std::path::PathBuf;
use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::error::Result;

/// Environment variable enabling the legacy transport testing override.
pub const TESTING_OVERRIDE_ENV: &str = "LAZYSVC_TESTING_OVERRIDE";

/// Prefix for configuration environment variables.
const ENV_PREFIX: &str = "LAZYSVC";

/// Configuration command-line arguments
#[derive(Debug, Default, clap::Args)]
pub struct ConfigArgs {
    /// Configuration file path
    #[arg(short, long)]
    pub config: Option<PathBuf>,

    /// Treat unclassified services as legacy transport
    #[arg(long)]
    pub legacy_testing_override: Option<bool>,

    /// Delay between resolver retries in milliseconds
    #[arg(long)]
    pub retry_backoff_ms: Option<u64>,

    /// Notification thread pool size
    #[arg(long)]
    pub max_threads: Option<usize>,
}

/// Lifecycle configuration
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct LifecycleConfig {
    /// Service resolution settings
    pub resolver: ResolverSettings,
    /// Notification thread pool settings
    pub threadpool: ThreadpoolConfig,
}

/// Service resolution settings
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ResolverSettings {
    /// Treat unclassified services as legacy transport (debuggable builds)
    pub legacy_testing_override: bool,
    /// Delay between retries after the second attempt
    pub retry_backoff_ms: u64,
    /// Re-check passthrough constructor output
    pub verify_passthrough: bool,
}

impl Default for ResolverSettings {
    fn default() -> Self {
        Self {
            legacy_testing_override: false,
            retry_backoff_ms: default_retry_backoff_ms(),
            verify_passthrough: false,
        }
    }
}

impl ResolverSettings {
    pub fn retry_backoff(&self) -> Duration {
        Duration::from_millis(self.retry_backoff_ms)
    }
}

/// Notification thread pool settings
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ThreadpoolConfig {
    /// Worker threads delivering client notifications
    pub max_threads: usize,
    /// The configuring thread will block in `join`
    pub caller_will_join: bool,
}

impl Default for ThreadpoolConfig {
    fn default() -> Self {
        Self {
            max_threads: default_max_threads(),
            caller_will_join: true,
        }
    }
}

impl LifecycleConfig {
    /// Load configuration from all sources
    pub fn load(args: &ConfigArgs) -> Result<Self> {
        let mut builder = config::Config::builder();

        if let Some(path) = &args.config {
            builder = builder.add_source(config::File::from(path.as_path()));
        }

        builder = builder.add_source(
            config::Environment::with_prefix(ENV_PREFIX)
                .prefix_separator("_")
                .separator("__")
                .try_parsing(true),
        );

        let mut config: LifecycleConfig = builder.build()?.try_deserialize()?;

        if testing_override_enabled(env::var(TESTING_OVERRIDE_ENV).ok().as_deref()) {
            config.resolver.legacy_testing_override = true;
        }

        // Override with command line args
        if let Some(enabled) = args.legacy_testing_override {
            config.resolver.legacy_testing_override = enabled;
        }
        if let Some(backoff) = args.retry_backoff_ms {
            config.resolver.retry_backoff_ms = backoff;
        }
        if let Some(threads) = args.max_threads {
            config.threadpool.max_threads = threads;
        }

        Ok(config)
    }
}

/// Only the exact value `true` enables the override.
pub fn testing_override_enabled(value: Option<&str>) -> bool {
    value == Some("true")
}

fn default_retry_backoff_ms() -> u64 {
    1000
}

fn default_max_threads() -> usize {
    1
}
