//! In-process service registry.
//!
//! `InMemoryRegistry` implements both registry collaborators
//! (`ServiceRegistry` and `ImplementationRegistry`) inside one process. It is
//! what the `lazysvc` binary hosts on, and what tests resolve against.
//!
//! - A transport manifest classifies (descriptor, instance) pairs.
//! - Local services register by instance name under every descriptor of
//!   their interface chain. Each registration of an object starts a new
//!   generation; leases of an earlier generation never count against it.
//! - `get` hands out remote proxies. Each proxy holds a client lease; the
//!   first lease of a service notifies its callbacks that it has clients,
//!   and releasing the last one (dropping the last clone of the last proxy)
//!   notifies that it has none. A service removed or replaced while it
//!   still has clients notifies that it has none at that point.
//!
//! Client transitions and their notifications are serialized, so callbacks
//! observe `true`/`false` in the same order the client count changed.
//!
//! # Usage
//!
//! ```ignore
//! use lazysvc::registry::InMemoryRegistry;
//!
//! let registry = InMemoryRegistry::new(Notifier::Inline, None);
//! registry.declare("vendor.light@2.0::ILight", "default", TransportKind::Direct);
//!
//! // Host side
//! registry.register_by_name(&light, "default")?;
//!
//! // Client side: the proxy keeps the service "in use" while alive
//! let proxy = registry.get("vendor.light@2.0::ILight", "default")?;
//! ```

use std::any::Any;
use std::collections::HashMap;
use std::fmt;
use std::sync::{Arc, Weak};
use std::time::Instant;

use parking_lot::{Condvar, Mutex, ReentrantMutex};
use serde::Serialize;
use tracing::{debug, info, warn};

use crate::dispatch::Notifier;
use crate::error::{CallResult, TransportError};
use crate::handle::{Locality, ServiceHandle, ServiceObject};
use crate::scheduler::{SchedulerPolicy, SchedulerPolicyMap};
use crate::transport::{ClientCallback, ImplementationRegistry, ServiceRegistry, TransportKind};

type ServiceKey = (String, String);

/// Identity of one registration of a service object.
type Generation = u64;

fn key(descriptor: &str, instance: &str) -> ServiceKey {
    (descriptor.to_owned(), instance.to_owned())
}

struct ServiceRecord {
    handle: ServiceHandle,
    instances: Vec<String>,
    interfaces: Vec<String>,
    clients: usize,
    callbacks: Vec<Arc<dyn ClientCallback>>,
    scheduler_policy: Option<SchedulerPolicy>,
}

#[derive(Default)]
struct RegistryState {
    manifest: HashMap<ServiceKey, TransportKind>,
    names: HashMap<ServiceKey, Generation>,
    records: HashMap<Generation, ServiceRecord>,
    /// Current generation of each registered object, by object identity
    objects: HashMap<usize, Generation>,
    passthrough: HashMap<ServiceKey, ServiceHandle>,
    next_generation: Generation,
}

impl RegistryState {
    /// Drop the mapping for `key`, and its record once no name refers to it.
    fn unmap(&mut self, key: &ServiceKey) -> Option<ServiceRecord> {
        let generation = self.names.remove(key)?;
        if self.names.values().any(|other| *other == generation) {
            return None;
        }
        self.drop_record(generation)
    }

    /// Remove a record together with every name and identity pointing at it.
    fn drop_record(&mut self, generation: Generation) -> Option<ServiceRecord> {
        self.names.retain(|_, other| *other != generation);
        let record = self.records.remove(&generation)?;
        self.objects.remove(&record.handle.id());
        Some(record)
    }
}

/// Snapshot of one registered service.
#[derive(Debug, Clone, Serialize)]
pub struct ServiceEntry {
    /// Most-derived interface descriptor
    pub descriptor: String,
    /// Instance names the service is registered under
    pub instances: Vec<String>,
    /// Full interface chain
    pub interfaces: Vec<String>,
    /// Outstanding client leases
    pub clients: usize,
    /// Scheduler hint recorded at registration
    pub scheduler_policy: Option<SchedulerPolicy>,
}

/// Registry of services hosted in this process.
pub struct InMemoryRegistry {
    state: Mutex<RegistryState>,
    registered: Condvar,
    /// Held across a client transition and its notification. Reentrant so
    /// inline callbacks may acquire or release proxies themselves.
    transitions: ReentrantMutex<()>,
    notifier: Notifier,
    scheduler: Option<Arc<SchedulerPolicyMap>>,
    this: Weak<InMemoryRegistry>,
}

impl InMemoryRegistry {
    /// Create a registry.
    ///
    /// # Arguments
    ///
    /// * `notifier` - How client changes reach lifecycle callbacks
    /// * `scheduler` - Scheduler hints attached to services at registration
    pub fn new(notifier: Notifier, scheduler: Option<Arc<SchedulerPolicyMap>>) -> Arc<Self> {
        Arc::new_cyclic(|this| Self {
            state: Mutex::new(RegistryState::default()),
            registered: Condvar::new(),
            transitions: ReentrantMutex::new(()),
            notifier,
            scheduler,
            this: this.clone(),
        })
    }

    /// Registry that notifies callbacks on the releasing thread.
    pub fn inline() -> Arc<Self> {
        Self::new(Notifier::Inline, None)
    }

    /// Classify how (descriptor, instance) is reached.
    pub fn declare(&self, descriptor: &str, instance: &str, kind: TransportKind) {
        self.state.lock().manifest.insert(key(descriptor, instance), kind);
    }

    /// Make an in-process implementation available for passthrough.
    pub fn add_passthrough(&self, descriptor: &str, instance: &str, implementation: ServiceHandle) {
        self.state
            .lock()
            .passthrough
            .insert(key(descriptor, instance), implementation);
    }

    /// Unregister the service registered under (descriptor, instance).
    ///
    /// Outstanding proxies to it report `DeadObject` from then on, and its
    /// callbacks are told it has no clients left.
    pub fn remove(&self, descriptor: &str, instance: &str) -> bool {
        let _transition = self.transitions.lock();
        let removed = {
            let mut state = self.state.lock();
            let Some(generation) = state.names.get(&key(descriptor, instance)).copied() else {
                return false;
            };
            state.drop_record(generation)
        };

        match removed {
            Some(record) => {
                info!("Removed service {}/{}", descriptor, instance);
                self.notify_orphaned(record);
                true
            }
            None => false,
        }
    }

    /// Outstanding client leases for (descriptor, instance).
    pub fn clients(&self, descriptor: &str, instance: &str) -> Option<usize> {
        let state = self.state.lock();
        let generation = state.names.get(&key(descriptor, instance))?;
        state.records.get(generation).map(|record| record.clients)
    }

    /// Scheduler hint recorded for (descriptor, instance).
    pub fn scheduler_policy(&self, descriptor: &str, instance: &str) -> Option<SchedulerPolicy> {
        let state = self.state.lock();
        let generation = state.names.get(&key(descriptor, instance))?;
        state.records.get(generation)?.scheduler_policy
    }

    /// List all registered services.
    pub fn list_services(&self) -> Vec<ServiceEntry> {
        let state = self.state.lock();
        let mut entries: Vec<ServiceEntry> = state
            .records
            .values()
            .map(|record| ServiceEntry {
                descriptor: record.interfaces.first().cloned().unwrap_or_default(),
                instances: record.instances.clone(),
                interfaces: record.interfaces.clone(),
                clients: record.clients,
                scheduler_policy: record.scheduler_policy,
            })
            .collect();
        entries.sort_by(|a, b| (&a.descriptor, &a.instances).cmp(&(&b.descriptor, &b.instances)));
        entries
    }

    fn is_live(&self, generation: Generation) -> bool {
        self.state.lock().records.contains_key(&generation)
    }

    /// Tell the callbacks of a dropped record that its clients are gone.
    ///
    /// Must be called with the transition lock held and the state lock released.
    fn notify_orphaned(&self, record: ServiceRecord) {
        if record.clients == 0 {
            return;
        }
        debug!(
            "service {:#x} dropped with {} client(s)",
            record.handle.id(),
            record.clients
        );
        self.notifier.notify(&record.handle, false, record.callbacks);
    }

    fn release(&self, generation: Generation) {
        let _transition = self.transitions.lock();
        let notification = {
            let mut state = self.state.lock();
            let Some(record) = state.records.get_mut(&generation) else {
                return;
            };
            if record.clients == 0 {
                warn!("client release without a lease on generation {}", generation);
                return;
            }
            record.clients -= 1;
            (record.clients == 0).then(|| (record.handle.clone(), record.callbacks.clone()))
        };

        if let Some((service, callbacks)) = notification {
            debug!("service {:#x} has no clients", service.id());
            self.notifier.notify(&service, false, callbacks);
        }
    }
}

impl ServiceRegistry for InMemoryRegistry {
    fn register_by_name(&self, service: &ServiceHandle, name: &str) -> CallResult<bool> {
        if service.is_remote() {
            warn!("refusing to register a remote proxy as {}", name);
            return Ok(false);
        }

        let interfaces = service.interface_chain()?;
        if interfaces.is_empty() {
            warn!("refusing to register {} with an empty interface chain", name);
            return Ok(false);
        }

        let scheduler_policy = self.scheduler.as_ref().and_then(|map| map.get(service));

        let _transition = self.transitions.lock();
        // Replaced records are notified and dropped after the state lock is released
        let mut replaced = Vec::new();
        {
            let mut state = self.state.lock();
            let generation = match state.objects.get(&service.id()).copied() {
                Some(generation) => generation,
                None => {
                    let generation = state.next_generation;
                    state.next_generation += 1;
                    state.objects.insert(service.id(), generation);
                    state.records.insert(
                        generation,
                        ServiceRecord {
                            handle: service.clone(),
                            instances: Vec::new(),
                            interfaces: interfaces.clone(),
                            clients: 0,
                            callbacks: Vec::new(),
                            scheduler_policy: None,
                        },
                    );
                    generation
                }
            };

            for descriptor in &interfaces {
                let service_key = key(descriptor, name);
                if state
                    .names
                    .get(&service_key)
                    .is_some_and(|other| *other != generation)
                {
                    replaced.extend(state.unmap(&service_key));
                }
                state.names.insert(service_key, generation);
            }

            if let Some(record) = state.records.get_mut(&generation) {
                if !record.instances.iter().any(|instance| instance == name) {
                    record.instances.push(name.to_owned());
                }
                if scheduler_policy.is_some() {
                    record.scheduler_policy = scheduler_policy;
                }
            }
        }
        self.registered.notify_all();
        for record in replaced {
            self.notify_orphaned(record);
        }

        info!("Registered {} as {}", interfaces[0], name);
        Ok(true)
    }

    fn transport_kind(&self, descriptor: &str, instance: &str) -> CallResult<TransportKind> {
        Ok(self
            .state
            .lock()
            .manifest
            .get(&key(descriptor, instance))
            .copied()
            .unwrap_or_default())
    }

    fn get(&self, descriptor: &str, instance: &str) -> CallResult<Option<ServiceHandle>> {
        let _transition = self.transitions.lock();
        let (target, generation, callbacks) = {
            let mut state = self.state.lock();
            let Some(generation) = state.names.get(&key(descriptor, instance)).copied() else {
                return Ok(None);
            };
            let Some(record) = state.records.get_mut(&generation) else {
                return Ok(None);
            };
            record.clients += 1;
            let callbacks = if record.clients == 1 {
                record.callbacks.clone()
            } else {
                Vec::new()
            };
            (record.handle.clone(), generation, callbacks)
        };

        if !callbacks.is_empty() {
            debug!("service {:#x} has clients", target.id());
            self.notifier.notify(&target, true, callbacks);
        }

        let proxy = RegistryProxy {
            target,
            lease: ClientLease {
                registry: self.this.clone(),
                generation,
            },
        };
        Ok(Some(ServiceHandle::new(proxy)))
    }

    fn attach_lifecycle_callback(
        &self,
        service: &ServiceHandle,
        callback: Arc<dyn ClientCallback>,
    ) -> CallResult<bool> {
        let mut state = self.state.lock();
        let Some(generation) = state.objects.get(&service.id()).copied() else {
            return Ok(false);
        };
        match state.records.get_mut(&generation) {
            Some(record) => {
                record.callbacks.push(callback);
                Ok(true)
            }
            None => Ok(false),
        }
    }

    fn wait_for_service(&self, descriptor: &str, instance: &str, deadline: Option<Instant>) {
        let service_key = key(descriptor, instance);
        let mut state = self.state.lock();
        while !state.names.contains_key(&service_key) {
            match deadline {
                None => self.registered.wait(&mut state),
                Some(deadline) => {
                    if self.registered.wait_until(&mut state, deadline).timed_out() {
                        debug!("wait_for_service {}/{} timed out", descriptor, instance);
                        return;
                    }
                }
            }
        }
    }
}

impl ImplementationRegistry for InMemoryRegistry {
    fn get(&self, descriptor: &str, instance: &str) -> CallResult<Option<ServiceHandle>> {
        Ok(self
            .state
            .lock()
            .passthrough
            .get(&key(descriptor, instance))
            .cloned())
    }
}

impl fmt::Debug for InMemoryRegistry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let state = self.state.lock();
        f.debug_struct("InMemoryRegistry")
            .field("services", &state.records.len())
            .field("declared", &state.manifest.len())
            .field("passthrough", &state.passthrough.len())
            .finish()
    }
}

/// One client's claim on one registration of a service.
///
/// Released when dropped.
struct ClientLease {
    registry: Weak<InMemoryRegistry>,
    generation: Generation,
}

impl ClientLease {
    fn is_live(&self) -> bool {
        self.registry
            .upgrade()
            .is_some_and(|registry| registry.is_live(self.generation))
    }
}

impl Drop for ClientLease {
    fn drop(&mut self) {
        if let Some(registry) = self.registry.upgrade() {
            registry.release(self.generation);
        }
    }
}

/// Remote proxy handed out by `InMemoryRegistry::get`.
pub struct RegistryProxy {
    target: ServiceHandle,
    lease: ClientLease,
}

impl RegistryProxy {
    /// The registered service behind this proxy.
    pub fn target(&self) -> CallResult<&ServiceHandle> {
        if self.lease.is_live() {
            Ok(&self.target)
        } else {
            Err(TransportError::DeadObject)
        }
    }
}

impl ServiceObject for RegistryProxy {
    fn interface_chain(&self) -> CallResult<Vec<String>> {
        self.target()?.interface_chain()
    }

    fn locality(&self) -> Locality {
        Locality::Remote
    }

    fn as_any(&self) -> &dyn Any {
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::handle::BASE_DESCRIPTOR;
    use crate::scheduler::{SchedPolicy, SCHED_FIFO};
    use std::time::Duration;

    const LIGHT: &str = "test.light@2.0::ILight";
    const LIGHT_V1: &str = "test.light@1.0::ILight";

    struct Light;

    impl ServiceObject for Light {
        fn interface_chain(&self) -> CallResult<Vec<String>> {
            Ok(vec![
                LIGHT.to_owned(),
                LIGHT_V1.to_owned(),
                BASE_DESCRIPTOR.to_owned(),
            ])
        }

        fn as_any(&self) -> &dyn Any {
            self
        }
    }

    #[derive(Default)]
    struct Recorder {
        events: Mutex<Vec<bool>>,
    }

    impl ClientCallback for Recorder {
        fn on_clients_changed(&self, _service: &ServiceHandle, has_clients: bool) {
            self.events.lock().push(has_clients);
        }
    }

    #[test]
    fn test_manifest_classification() -> CallResult<()> {
        let registry = InMemoryRegistry::inline();
        registry.declare(LIGHT, "default", TransportKind::Direct);

        assert_eq!(registry.transport_kind(LIGHT, "default")?, TransportKind::Direct);
        assert_eq!(registry.transport_kind(LIGHT, "other")?, TransportKind::Unknown);
        Ok(())
    }

    #[test]
    fn test_registers_whole_chain() -> CallResult<()> {
        let registry = InMemoryRegistry::inline();
        assert!(ServiceRegistry::get(&*registry, LIGHT, "default")?.is_none());

        let light = ServiceHandle::new(Light);
        assert!(registry.register_by_name(&light, "default")?);

        let proxy = ServiceRegistry::get(&*registry, LIGHT_V1, "default")?.unwrap();
        assert!(proxy.is_remote());
        assert_eq!(proxy.interface_descriptor()?, LIGHT);
        let target = proxy.downcast_ref::<RegistryProxy>().unwrap().target()?;
        assert!(ServiceHandle::ptr_eq(target, &light));

        let services = registry.list_services();
        assert_eq!(services.len(), 1);
        assert_eq!(services[0].descriptor, LIGHT);
        assert_eq!(services[0].instances, vec!["default".to_owned()]);
        Ok(())
    }

    #[test]
    fn test_client_leases_notify_edges_only() -> CallResult<()> {
        let registry = InMemoryRegistry::inline();
        let light = ServiceHandle::new(Light);
        let recorder = Arc::new(Recorder::default());
        registry.register_by_name(&light, "default")?;
        assert!(registry.attach_lifecycle_callback(&light, recorder.clone())?);

        let first = ServiceRegistry::get(&*registry, LIGHT, "default")?.unwrap();
        let second = ServiceRegistry::get(&*registry, LIGHT, "default")?.unwrap();
        let first_clone = first.clone();
        assert_eq!(registry.clients(LIGHT, "default"), Some(2));
        assert_eq!(*recorder.events.lock(), vec![true]);

        drop(first);
        drop(second);
        // A clone of the first proxy is still alive
        assert_eq!(registry.clients(LIGHT, "default"), Some(1));
        assert_eq!(*recorder.events.lock(), vec![true]);

        drop(first_clone);
        assert_eq!(registry.clients(LIGHT, "default"), Some(0));
        assert_eq!(*recorder.events.lock(), vec![true, false]);
        Ok(())
    }

    #[test]
    fn test_attach_to_unregistered_service() -> CallResult<()> {
        let registry = InMemoryRegistry::inline();
        let light = ServiceHandle::new(Light);
        assert!(!registry.attach_lifecycle_callback(&light, Arc::new(Recorder::default()))?);
        Ok(())
    }

    #[test]
    fn test_remote_registration_rejected() -> CallResult<()> {
        let registry = InMemoryRegistry::inline();
        registry.register_by_name(&ServiceHandle::new(Light), "default")?;
        let proxy = ServiceRegistry::get(&*registry, LIGHT, "default")?.unwrap();

        assert!(!registry.register_by_name(&proxy, "again")?);
        Ok(())
    }

    #[test]
    fn test_removed_service_is_dead() -> CallResult<()> {
        let registry = InMemoryRegistry::inline();
        registry.register_by_name(&ServiceHandle::new(Light), "default")?;
        let proxy = ServiceRegistry::get(&*registry, LIGHT, "default")?.unwrap();

        assert!(registry.remove(LIGHT, "default"));
        assert_eq!(proxy.interface_chain(), Err(TransportError::DeadObject));
        assert!(ServiceRegistry::get(&*registry, LIGHT_V1, "default")?.is_none());
        assert!(!registry.remove(LIGHT, "default"));
        Ok(())
    }

    #[test]
    fn test_wait_for_service_deadline() {
        let registry = InMemoryRegistry::inline();
        let start = Instant::now();
        registry.wait_for_service(LIGHT, "default", Some(start + Duration::from_millis(50)));
        assert!(start.elapsed() >= Duration::from_millis(50));
    }

    #[test]
    fn test_wait_for_service_wakes_on_registration() {
        let registry = InMemoryRegistry::inline();
        let host = {
            let registry = registry.clone();
            std::thread::spawn(move || {
                std::thread::sleep(Duration::from_millis(20));
                registry
                    .register_by_name(&ServiceHandle::new(Light), "default")
                    .unwrap();
            })
        };

        registry.wait_for_service(LIGHT, "default", Some(Instant::now() + Duration::from_secs(10)));
        assert_eq!(registry.clients(LIGHT, "default"), Some(0));
        host.join().unwrap();
    }

    #[test]
    fn test_scheduler_policy_attached_at_registration() -> anyhow::Result<()> {
        let policies = Arc::new(SchedulerPolicyMap::new());
        let registry = InMemoryRegistry::new(Notifier::Inline, Some(policies.clone()));
        let light = ServiceHandle::new(Light);

        policies.set_min_scheduler_policy(&light, SCHED_FIFO, 10)?;
        registry.register_by_name(&light, "default")?;

        let policy = registry.scheduler_policy(LIGHT, "default").unwrap();
        assert_eq!(policy.policy(), SchedPolicy::Fifo);
        assert_eq!(policy.priority(), 10);
        Ok(())
    }

    #[test]
    fn test_passthrough_implementations() -> CallResult<()> {
        let registry = InMemoryRegistry::inline();
        let light = ServiceHandle::new(Light);
        registry.add_passthrough(LIGHT, "default", light.clone());

        let found = ImplementationRegistry::get(&*registry, LIGHT, "default")?.unwrap();
        assert!(ServiceHandle::ptr_eq(&found, &light));
        assert!(ImplementationRegistry::get(&*registry, LIGHT, "other")?.is_none());
        Ok(())
    }

    #[test]
    fn test_remove_with_clients_notifies_disconnect() -> CallResult<()> {
        let registry = InMemoryRegistry::inline();
        let light = ServiceHandle::new(Light);
        let recorder = Arc::new(Recorder::default());
        registry.register_by_name(&light, "default")?;
        registry.attach_lifecycle_callback(&light, recorder.clone())?;

        let proxy = ServiceRegistry::get(&*registry, LIGHT, "default")?.unwrap();
        assert!(registry.remove(LIGHT, "default"));
        assert_eq!(*recorder.events.lock(), vec![true, false]);

        // The lease outlived its record; releasing it changes nothing
        drop(proxy);
        assert_eq!(*recorder.events.lock(), vec![true, false]);
        Ok(())
    }

    #[test]
    fn test_replaced_service_with_clients_notifies_disconnect() -> CallResult<()> {
        let registry = InMemoryRegistry::inline();
        let first = ServiceHandle::new(Light);
        let second = ServiceHandle::new(Light);
        let recorder = Arc::new(Recorder::default());
        registry.register_by_name(&first, "default")?;
        registry.attach_lifecycle_callback(&first, recorder.clone())?;
        let proxy = ServiceRegistry::get(&*registry, LIGHT, "default")?.unwrap();

        registry.register_by_name(&second, "default")?;
        assert_eq!(*recorder.events.lock(), vec![true, false]);
        assert_eq!(registry.clients(LIGHT, "default"), Some(0));

        drop(proxy);
        assert_eq!(*recorder.events.lock(), vec![true, false]);
        Ok(())
    }

    #[test]
    fn test_reregistration_ignores_stale_leases() -> CallResult<()> {
        let registry = InMemoryRegistry::inline();
        let light = ServiceHandle::new(Light);
        let recorder = Arc::new(Recorder::default());

        registry.register_by_name(&light, "default")?;
        registry.attach_lifecycle_callback(&light, recorder.clone())?;
        let old = ServiceRegistry::get(&*registry, LIGHT, "default")?.unwrap();
        registry.remove(LIGHT, "default");

        // Same object, new registration
        registry.register_by_name(&light, "default")?;
        registry.attach_lifecycle_callback(&light, recorder.clone())?;
        let new = ServiceRegistry::get(&*registry, LIGHT, "default")?.unwrap();

        drop(old);
        assert_eq!(registry.clients(LIGHT, "default"), Some(1));
        assert_eq!(*recorder.events.lock(), vec![true, false, true]);
        assert_eq!(new.interface_descriptor()?, LIGHT);

        drop(new);
        assert_eq!(registry.clients(LIGHT, "default"), Some(0));
        assert_eq!(*recorder.events.lock(), vec![true, false, true, false]);
        Ok(())
    }

    #[test]
    fn test_concurrent_clients_alternate_notifications() {
        let registry = InMemoryRegistry::inline();
        let light = ServiceHandle::new(Light);
        let recorder = Arc::new(Recorder::default());
        registry.register_by_name(&light, "default").unwrap();
        registry
            .attach_lifecycle_callback(&light, recorder.clone())
            .unwrap();

        let clients: Vec<_> = (0..8)
            .map(|_| {
                let registry = registry.clone();
                std::thread::spawn(move || {
                    for _ in 0..200 {
                        let proxy = ServiceRegistry::get(&*registry, LIGHT, "default")
                            .unwrap()
                            .unwrap();
                        drop(proxy);
                    }
                })
            })
            .collect();
        for client in clients {
            client.join().unwrap();
        }

        let events = recorder.events.lock();
        assert!(!events.is_empty());
        for (i, has_clients) in events.iter().enumerate() {
            assert_eq!(*has_clients, i % 2 == 0, "notification {} out of order", i);
        }
        assert_eq!(events.last(), Some(&false));
        assert_eq!(registry.clients(LIGHT, "default"), Some(0));
    }
}
