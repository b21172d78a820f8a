//! Client notification delivery.
//!
//! The transport delivers connect/disconnect notifications on threads it
//! owns. `NotificationDispatcher` is that thread pool: a tokio runtime sized
//! from `ThreadpoolConfig`, fed through a cloneable `NotificationSender`.
//!
//! # Architecture
//!
//! ```text
//! NotificationSender ──► router task ──► lane (service A) ──► callback
//!                                   ├──► lane (service B) ──► callback
//!                                   └──► ...
//! ```
//!
//! Each service gets its own lane, so notifications of one service are
//! handled in order while different services proceed concurrently. A lane
//! that stays idle for `LANE_IDLE` retires; the next event for its service
//! starts a new lane once the old one has drained.

use std::collections::HashMap;
use std::fmt;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;

use tokio::runtime::{Builder, Runtime};
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tracing::{debug, trace, warn};

use crate::config::ThreadpoolConfig;
use crate::handle::ServiceHandle;
use crate::transport::ClientCallback;

/// How long a lane waits for another event before retiring.
const LANE_IDLE: Duration = Duration::from_millis(500);

/// One client change to deliver to one callback.
pub struct ClientEvent {
    pub service: ServiceHandle,
    pub has_clients: bool,
    pub callback: Arc<dyn ClientCallback>,
}

impl ClientEvent {
    fn deliver(self) {
        self.callback.on_clients_changed(&self.service, self.has_clients);
    }
}

impl fmt::Debug for ClientEvent {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ClientEvent")
            .field("service", &self.service)
            .field("has_clients", &self.has_clients)
            .finish()
    }
}

/// Posts events to a `NotificationDispatcher`.
#[derive(Clone)]
pub struct NotificationSender {
    tx: mpsc::UnboundedSender<ClientEvent>,
}

impl NotificationSender {
    /// Queue an event; returns false if the dispatcher is gone.
    pub fn post(&self, event: ClientEvent) -> bool {
        match self.tx.send(event) {
            Ok(()) => true,
            Err(mpsc::error::SendError(event)) => {
                warn!("notification dispatcher stopped; dropping {:?}", event);
                false
            }
        }
    }
}

impl fmt::Debug for NotificationSender {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("NotificationSender")
            .field("closed", &self.tx.is_closed())
            .finish()
    }
}

/// How a registry delivers client notifications.
#[derive(Debug, Clone, Default)]
pub enum Notifier {
    /// Call callbacks on the thread that observed the change.
    #[default]
    Inline,
    /// Hand events to a dispatcher thread pool.
    Dispatched(NotificationSender),
}

impl Notifier {
    pub fn notify(
        &self,
        service: &ServiceHandle,
        has_clients: bool,
        callbacks: Vec<Arc<dyn ClientCallback>>,
    ) {
        for callback in callbacks {
            let event = ClientEvent {
                service: service.clone(),
                has_clients,
                callback,
            };
            match self {
                Notifier::Inline => event.deliver(),
                Notifier::Dispatched(sender) => {
                    sender.post(event);
                }
            }
        }
    }
}

/// Thread pool that delivers client notifications.
pub struct NotificationDispatcher {
    runtime: Runtime,
    router: JoinHandle<()>,
    sender: NotificationSender,
    caller_will_join: bool,
    active_lanes: Arc<AtomicUsize>,
}

impl NotificationDispatcher {
    /// Build the pool with `max_threads` workers.
    pub fn configure(config: &ThreadpoolConfig) -> std::io::Result<Self> {
        let threads = config.max_threads.max(1);
        let runtime = Builder::new_multi_thread()
            .worker_threads(threads)
            .thread_name("lazysvc-notify")
            .enable_all()
            .build()?;

        let (tx, rx) = mpsc::unbounded_channel();
        let active_lanes = Arc::new(AtomicUsize::new(0));
        let router = runtime.spawn(route_events(rx, active_lanes.clone()));
        debug!(
            "notification dispatcher configured with {} thread(s), caller_will_join={}",
            threads, config.caller_will_join
        );

        Ok(Self {
            runtime,
            router,
            sender: NotificationSender { tx },
            caller_will_join: config.caller_will_join,
            active_lanes,
        })
    }

    pub fn sender(&self) -> NotificationSender {
        self.sender.clone()
    }

    /// Notifier that routes through this pool.
    pub fn notifier(&self) -> Notifier {
        Notifier::Dispatched(self.sender())
    }

    /// Number of per-service lanes currently running.
    pub fn active_lanes(&self) -> usize {
        self.active_lanes.load(Ordering::SeqCst)
    }

    /// Whether the configuring thread intends to call `join`.
    pub fn caller_will_join(&self) -> bool {
        self.caller_will_join
    }

    /// Block until every sender has been dropped and queued events are delivered.
    ///
    /// In a lazily hosted process this normally never returns: the exit
    /// handler terminates the process first.
    pub fn join(self) {
        let Self {
            runtime,
            router,
            sender,
            ..
        } = self;
        drop(sender);
        if let Err(e) = runtime.block_on(router) {
            warn!("notification router ended abnormally: {}", e);
        }
    }

    /// Stop the pool without waiting for queued events.
    pub fn shutdown(self) {
        self.runtime.shutdown_background();
    }
}

impl fmt::Debug for NotificationDispatcher {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("NotificationDispatcher")
            .field("caller_will_join", &self.caller_will_join)
            .finish()
    }
}

struct Lane {
    tx: mpsc::UnboundedSender<ClientEvent>,
    worker: JoinHandle<()>,
}

async fn route_events(mut rx: mpsc::UnboundedReceiver<ClientEvent>, active: Arc<AtomicUsize>) {
    let mut lanes: HashMap<usize, Lane> = HashMap::new();

    while let Some(event) = rx.recv().await {
        let id = event.service.id();
        let event = match lanes.get(&id) {
            Some(lane) => match lane.tx.send(event) {
                Ok(()) => continue,
                // The lane retired
                Err(mpsc::error::SendError(event)) => event,
            },
            None => event,
        };

        let previous = lanes.remove(&id).map(|lane| lane.worker);
        lanes.retain(|_, lane| !lane.worker.is_finished());

        let (tx, lane_rx) = mpsc::unbounded_channel();
        if let Err(mpsc::error::SendError(event)) = tx.send(event) {
            warn!("notification lane closed; dropping {:?}", event);
        }
        active.fetch_add(1, Ordering::SeqCst);
        let worker = tokio::spawn(drain_lane(previous, lane_rx, active.clone()));
        lanes.insert(id, Lane { tx, worker });
    }

    // Close every lane, then wait for queued events to be delivered
    for (_, lane) in lanes.drain() {
        drop(lane.tx);
        if let Err(e) = lane.worker.await {
            warn!("notification lane ended abnormally: {}", e);
        }
    }
    debug!("notification router stopped");
}

async fn drain_lane(
    previous: Option<JoinHandle<()>>,
    mut rx: mpsc::UnboundedReceiver<ClientEvent>,
    active: Arc<AtomicUsize>,
) {
    // Events of the retired lane go first
    if let Some(previous) = previous {
        if let Err(e) = previous.await {
            warn!("notification lane ended abnormally: {}", e);
        }
    }

    loop {
        match tokio::time::timeout(LANE_IDLE, rx.recv()).await {
            Ok(Some(event)) => {
                trace!("delivering {:?}", event);
                event.deliver();
            }
            Ok(None) => break,
            Err(_) => {
                // Refuse new events, then deliver what is already queued
                rx.close();
                while let Some(event) = rx.recv().await {
                    trace!("delivering {:?}", event);
                    event.deliver();
                }
                break;
            }
        }
    }
    active.fetch_sub(1, Ordering::SeqCst);
}
