//! Process-wide client counter that drives lazy exit.

use std::fmt;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::Arc;

use tracing::{info, warn};

use crate::handle::ServiceHandle;
use crate::transport::ClientCallback;

/// Action run once when the last client of the process disconnects.
pub type ExitHandler = Arc<dyn Fn() + Send + Sync>;

/// Default exit action: terminate the process successfully.
///
/// No in-flight calls are drained; zero connected services means none exist.
pub fn exit_process() -> ExitHandler {
    Arc::new(|| std::process::exit(0))
}

/// Counts services with connected clients across every service of the process.
///
/// One instance is shared by all registrations of a process. The counter is
/// only mutated by `on_clients_changed`, which may run concurrently on
/// several notification threads.
pub struct ClientCounterCallback {
    /// Number of services that currently have at least one client.
    connected: AtomicUsize,

    /// Number of services registered through this callback.
    registered: AtomicUsize,

    exited: AtomicBool,
    on_exit: ExitHandler,
}

impl ClientCounterCallback {
    /// Callback that exits the process at zero.
    pub fn new() -> Self {
        Self::with_exit_handler(exit_process())
    }

    pub fn with_exit_handler(on_exit: ExitHandler) -> Self {
        Self {
            connected: AtomicUsize::new(0),
            registered: AtomicUsize::new(0),
            exited: AtomicBool::new(false),
            on_exit,
        }
    }

    /// Count one successful registration.
    pub fn register_service_counted(&self) {
        self.registered.fetch_add(1, Ordering::SeqCst);
    }

    pub fn live_connections(&self) -> usize {
        self.connected.load(Ordering::SeqCst)
    }

    pub fn registered_services(&self) -> usize {
        self.registered.load(Ordering::SeqCst)
    }

    /// True once the exit handler has run.
    pub fn has_exited(&self) -> bool {
        self.exited.load(Ordering::SeqCst)
    }

    fn shutdown(&self) {
        if self.exited.swap(true, Ordering::SeqCst) {
            return;
        }
        info!("Exiting. No clients in use for any service in process.");
        (self.on_exit)();
    }
}

impl Default for ClientCounterCallback {
    fn default() -> Self {
        Self::new()
    }
}

impl ClientCallback for ClientCounterCallback {
    fn on_clients_changed(&self, service: &ServiceHandle, has_clients: bool) {
        let descriptor = service
            .interface_descriptor()
            .unwrap_or_else(|_| "<unknown>".to_owned());

        let connected = if has_clients {
            info!("Service {} connected.", descriptor);
            self.connected.fetch_add(1, Ordering::SeqCst) + 1
        } else {
            info!("Service {} disconnected.", descriptor);
            match self
                .connected
                .fetch_update(Ordering::SeqCst, Ordering::SeqCst, |n| n.checked_sub(1))
            {
                Ok(previous) => previous - 1,
                Err(_) => {
                    warn!(
                        "Disconnect from {} without a matching connect; ignoring",
                        descriptor
                    );
                    return;
                }
            }
        };

        info!(
            "{} (of {} available) services in use.",
            connected,
            self.registered_services()
        );

        if connected == 0 {
            self.shutdown();
        }
    }
}

impl fmt::Debug for ClientCounterCallback {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ClientCounterCallback")
            .field("connected", &self.live_connections())
            .field("registered", &self.registered_services())
            .field("exited", &self.has_exited())
            .finish()
    }
}
