//! Minimum scheduler policy hints for locally hosted services.
//!
//! A hosting process may ask that threads serving a given local service run
//! with at least a certain scheduling class. The hint is recorded here and
//! picked up when the service is registered.

use std::collections::HashMap;
use std::fmt;

use parking_lot::RwLock;
use serde::{Deserialize, Serialize};
use tracing::{debug, error};

use crate::error::PolicyError;
use crate::handle::{ServiceHandle, WeakServiceHandle};

/// Raw policy value for the default time-sharing class.
pub const SCHED_NORMAL: i32 = 0;
/// Raw policy value for first-in first-out real-time scheduling.
pub const SCHED_FIFO: i32 = 1;
/// Raw policy value for round-robin real-time scheduling.
pub const SCHED_RR: i32 = 2;

/// Scheduling class.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SchedPolicy {
    Normal,
    Fifo,
    RoundRobin,
}

impl SchedPolicy {
    pub fn as_raw(&self) -> i32 {
        match self {
            SchedPolicy::Normal => SCHED_NORMAL,
            SchedPolicy::Fifo => SCHED_FIFO,
            SchedPolicy::RoundRobin => SCHED_RR,
        }
    }

    pub fn is_realtime(&self) -> bool {
        !matches!(self, SchedPolicy::Normal)
    }

    fn name(&self) -> &'static str {
        match self {
            SchedPolicy::Normal => "normal",
            SchedPolicy::Fifo => "fifo",
            SchedPolicy::RoundRobin => "rr",
        }
    }
}

impl TryFrom<i32> for SchedPolicy {
    type Error = PolicyError;

    fn try_from(raw: i32) -> Result<Self, Self::Error> {
        match raw {
            SCHED_NORMAL => Ok(SchedPolicy::Normal),
            SCHED_FIFO => Ok(SchedPolicy::Fifo),
            SCHED_RR => Ok(SchedPolicy::RoundRobin),
            other => Err(PolicyError::InvalidPolicy(other)),
        }
    }
}

impl fmt::Display for SchedPolicy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// A validated (policy, priority) pair.
///
/// Normal priorities are nice values in -20..=19; real-time priorities are
/// in 1..=99.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct SchedulerPolicy {
    policy: SchedPolicy,
    priority: i32,
}

impl SchedulerPolicy {
    pub fn new(policy: SchedPolicy, priority: i32) -> Result<Self, PolicyError> {
        let valid = if policy.is_realtime() {
            (1..=99).contains(&priority)
        } else {
            (-20..=19).contains(&priority)
        };
        if !valid {
            return Err(PolicyError::InvalidPriority {
                policy: policy.name(),
                priority,
            });
        }
        Ok(Self { policy, priority })
    }

    /// Validate raw policy and priority values.
    pub fn from_raw(policy: i32, priority: i32) -> Result<Self, PolicyError> {
        Self::new(SchedPolicy::try_from(policy)?, priority)
    }

    pub fn policy(&self) -> SchedPolicy {
        self.policy
    }

    pub fn priority(&self) -> i32 {
        self.priority
    }
}

struct PolicyEntry {
    service: WeakServiceHandle,
    policy: SchedulerPolicy,
}

/// Per-service scheduler policy hints, keyed by service identity.
///
/// Entries do not keep services alive; entries of released services are
/// pruned on the next update.
#[derive(Default)]
pub struct SchedulerPolicyMap {
    entries: RwLock<HashMap<usize, PolicyEntry>>,
}

impl SchedulerPolicyMap {
    pub fn new() -> Self {
        Self::default()
    }

    /// Record a minimum scheduler policy for a local service.
    pub fn set_min_scheduler_policy(
        &self,
        service: &ServiceHandle,
        policy: i32,
        priority: i32,
    ) -> Result<(), PolicyError> {
        if service.is_remote() {
            error!("Can't set scheduler policy on remote service.");
            return Err(PolicyError::RemoteService);
        }

        let policy = SchedulerPolicy::from_raw(policy, priority).map_err(|e| {
            error!("{}", e);
            e
        })?;

        let mut entries = self.entries.write();
        entries.retain(|_, entry| entry.service.is_alive());
        entries.insert(
            service.id(),
            PolicyEntry {
                service: service.downgrade(),
                policy,
            },
        );
        debug!(
            "scheduler policy {} priority {} recorded for service {:#x}",
            policy.policy(),
            policy.priority(),
            service.id()
        );
        Ok(())
    }

    /// Policy recorded for `service`, if any.
    pub fn get(&self, service: &ServiceHandle) -> Option<SchedulerPolicy> {
        let entries = self.entries.read();
        let entry = entries.get(&service.id())?;
        // A recycled address must not inherit a released service's policy
        let alive = entry.service.upgrade()?;
        ServiceHandle::ptr_eq(&alive, service).then_some(entry.policy)
    }

    /// Number of entries for services that are still alive.
    pub fn len(&self) -> usize {
        self.entries
            .read()
            .values()
            .filter(|entry| entry.service.is_alive())
            .count()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}
