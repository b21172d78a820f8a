//! Interface compatibility checks for fetched handles.

use tracing::warn;

use crate::error::CallResult;
use crate::handle::{ServiceHandle, BASE_DESCRIPTOR};

/// Confirms a live handle implements a target interface or a descendant.
pub trait CompatibilityChecker: Send + Sync {
    /// `Err` means the call into the object failed; `Ok(false)` is a mismatch.
    fn can_cast(&self, handle: &ServiceHandle, descriptor: &str) -> CallResult<bool>;
}

/// Checks the target descriptor against the object's interface chain.
#[derive(Debug, Clone, Copy)]
pub struct InterfaceChainChecker {
    emit_error: bool,
}

impl InterfaceChainChecker {
    pub fn new() -> Self {
        Self { emit_error: true }
    }

    /// Skip the mismatch warning (used for speculative checks).
    pub fn quiet() -> Self {
        Self { emit_error: false }
    }
}

impl Default for InterfaceChainChecker {
    fn default() -> Self {
        Self::new()
    }
}

impl CompatibilityChecker for InterfaceChainChecker {
    fn can_cast(&self, handle: &ServiceHandle, descriptor: &str) -> CallResult<bool> {
        if descriptor == BASE_DESCRIPTOR {
            return Ok(true);
        }
        let chain = handle.interface_chain()?;
        let compatible = chain.iter().any(|d| d == descriptor);
        if !compatible && self.emit_error {
            warn!(
                "{} cannot be cast to {} (chain: {})",
                chain.first().map(String::as_str).unwrap_or("<empty>"),
                descriptor,
                chain.join(", ")
            );
        }
        Ok(compatible)
    }
}
