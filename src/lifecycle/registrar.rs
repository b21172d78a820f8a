//! Lazy service registration.

use std::sync::{Arc, OnceLock};

use tracing::{error, info};

use super::counter::{exit_process, ClientCounterCallback, ExitHandler};
use crate::error::RegistrationError;
use crate::handle::ServiceHandle;
use crate::transport::{ClientCallback, ServiceRegistry};

/// Registers services so that the process exits once none has a client.
///
/// Every registration made through one registrar shares a single
/// `ClientCounterCallback`, created on first use. Share the registrar itself
/// (behind an `Arc`) between all code paths that host services.
pub struct LazyServiceRegistrar {
    registry: Arc<dyn ServiceRegistry>,
    callback: OnceLock<Arc<ClientCounterCallback>>,
    on_exit: ExitHandler,
}

impl LazyServiceRegistrar {
    /// Registrar whose callback exits the process at zero clients.
    pub fn new(registry: Arc<dyn ServiceRegistry>) -> Self {
        Self::with_exit_handler(registry, exit_process())
    }

    /// Registrar with a custom exit action.
    pub fn with_exit_handler(registry: Arc<dyn ServiceRegistry>, on_exit: ExitHandler) -> Self {
        Self {
            registry,
            callback: OnceLock::new(),
            on_exit,
        }
    }

    /// The shared client callback, created exactly once.
    pub fn client_callback(&self) -> Arc<ClientCounterCallback> {
        self.callback
            .get_or_init(|| Arc::new(ClientCounterCallback::with_exit_handler(self.on_exit.clone())))
            .clone()
    }

    /// Register `service` under `name` and subscribe it to lazy exit.
    ///
    /// The service is counted before the callback is attached, so a client
    /// change can never observe a registered-but-uncounted service.
    ///
    /// # Errors
    ///
    /// Registry failures are returned unchanged and nothing is attached.
    /// `CallbackAttachFailed` means the service *is* registered but will not
    /// keep the process alive or let it exit.
    pub fn register_service(
        &self,
        service: &ServiceHandle,
        name: &str,
    ) -> Result<(), RegistrationError> {
        let callback = self.client_callback();
        let descriptor = service
            .interface_descriptor()
            .unwrap_or_else(|_| "<unknown>".to_owned());

        info!("Registering service {} with name {}", descriptor, name);
        match self.registry.register_by_name(service, name) {
            Ok(true) => {}
            Ok(false) => {
                error!("Failed to register {} as {}", descriptor, name);
                return Err(RegistrationError::Rejected {
                    name: name.to_owned(),
                });
            }
            Err(e) => {
                error!("Failed to register {} as {}: {}", descriptor, name, e);
                return Err(RegistrationError::Transport(e));
            }
        }

        callback.register_service_counted();

        let attached = self
            .registry
            .attach_lifecycle_callback(service, callback as Arc<dyn ClientCallback>);
        match attached {
            Ok(true) => Ok(()),
            Ok(false) => {
                error!("Failed to add client callback for {}", name);
                Err(RegistrationError::CallbackAttachFailed {
                    name: name.to_owned(),
                })
            }
            Err(e) => {
                error!("Failed to add client callback for {}: {}", name, e);
                Err(RegistrationError::CallbackAttachFailed {
                    name: name.to_owned(),
                })
            }
        }
    }
}
