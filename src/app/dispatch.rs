//! The module chain and the rules for running it.

use std::panic::AssertUnwindSafe;
use std::sync::Arc;
use std::time::Duration;

use futures::FutureExt;
use tokio::sync::{OwnedSemaphorePermit, Semaphore};
use tracing::{debug, warn};

use crate::config::{AppConfig, CtcpConfig};
use crate::irc::ctcp;
use crate::irc::message::ChatEvent;
use crate::irc::outbound::Outbound;
use crate::modules::{self, Module, ModuleError, ModuleKind, Outcome};

#[derive(Debug, thiserror::Error)]
pub enum BuildError {
    #[error("unknown module in config: {0}")]
    UnknownModule(String),
}

/// Runs every chat event through the ordered module chain.
///
/// One event is processed sequentially on one task; separate events are
/// independent and may run in any order. At most `max_in_flight` events
/// are processed at once.
pub struct Dispatcher {
    modules: Vec<Arc<dyn Module>>,
    ctcp: CtcpConfig,
    out: Outbound,
    module_timeout: Duration,
    permits: Arc<Semaphore>,
}

impl Dispatcher {
    pub fn new(
        modules: Vec<Arc<dyn Module>>,
        ctcp: CtcpConfig,
        out: Outbound,
        module_timeout: Duration,
        max_in_flight: usize,
    ) -> Self {
        Self {
            modules,
            ctcp,
            out,
            module_timeout,
            permits: Arc::new(Semaphore::new(max_in_flight.max(1))),
        }
    }

    /// Build the chain named by `config.modules`, in order.
    pub fn from_config(config: &AppConfig, out: Outbound) -> Result<Self, BuildError> {
        let chain = config
            .modules
            .iter()
            .map(|name| {
                modules::from_name(name, config)
                    .ok_or_else(|| BuildError::UnknownModule(name.clone()))
            })
            .collect::<Result<Vec<_>, _>>()?;

        Ok(Self::new(
            chain,
            config.ctcp.clone(),
            out,
            Duration::from_secs(config.dispatch.module_timeout_secs),
            config.dispatch.max_in_flight,
        ))
    }

    pub fn module_names(&self) -> Vec<&'static str> {
        self.modules.iter().map(|m| m.name()).collect()
    }

    /// Take a free dispatch slot without waiting. `None` when `max_in_flight`
    /// events are already running. The slot is released when the permit is
    /// dropped.
    pub fn try_acquire(&self) -> Option<OwnedSemaphorePermit> {
        Arc::clone(&self.permits).try_acquire_owned().ok()
    }

    /// Handle one chat event to completion.
    pub async fn dispatch(&self, event: ChatEvent) {
        if event.is_ctcp() {
            if let Err(e) = ctcp::handle_request(&self.ctcp, &event, &self.out).await {
                warn!(sender = %event.sender, "CTCP reply failed: {}", e);
            }
            return;
        }

        let mut handled = false;
        for module in &self.modules {
            if handled && module.kind() == ModuleKind::Command {
                continue;
            }
            match self.invoke(module.as_ref(), &event).await {
                Ok(Outcome::Handled) => {
                    debug!(module = module.name(), source = %event.source, "handled");
                    handled = true;
                }
                Ok(Outcome::Declined) => {}
                Err(e) => {
                    warn!(
                        module = module.name(),
                        source = %event.source,
                        sender = %event.sender,
                        "module failed, skipping rest of chain: {}",
                        e
                    );
                    break;
                }
            }
        }
    }

    async fn invoke(&self, module: &dyn Module, event: &ChatEvent) -> Result<Outcome, ModuleError> {
        let call = AssertUnwindSafe(module.handle(event, &self.out)).catch_unwind();
        match tokio::time::timeout(self.module_timeout, call).await {
            Ok(Ok(result)) => result,
            Ok(Err(_)) => Err(ModuleError::Panicked),
            Err(_) => Err(ModuleError::Timeout(self.module_timeout)),
        }
    }
}
