//! Public worker handle: connects to the scheduler, hosts `ExpertInstance`s
//! up to capacity, and reconnects on a backoff when the connection drops.

use std::collections::HashMap;
use std::sync::Arc;

use askexperts_relay::RelayPool;
use askexperts_scheduler::{SchedulerMessage, WorkerMessage};
use askexperts_types::{Expert, Pubkey};
use tokio::sync::{mpsc, RwLock};
use tracing::{info, warn};

use crate::components::ExpertComponentFactory;
use crate::config::WorkerConfig;
use crate::instance::ExpertInstance;
use crate::payments::{PaymentBackendCache, PaymentBackendFactory};

struct Inner {
    worker_id: String,
    config: WorkerConfig,
    relay_pool: Arc<dyn RelayPool>,
    component_factory: Arc<dyn ExpertComponentFactory>,
    payment_backends: PaymentBackendCache,
    instances: RwLock<HashMap<Pubkey, ExpertInstance>>,
}

#[derive(Clone)]
pub struct Worker(Arc<Inner>);

impl Worker {
    pub fn new(
        worker_id: impl Into<String>,
        config: WorkerConfig,
        relay_pool: Arc<dyn RelayPool>,
        payment_factory: Arc<dyn PaymentBackendFactory>,
        component_factory: Arc<dyn ExpertComponentFactory>,
    ) -> Self {
        Self(Arc::new(Inner {
            worker_id: worker_id.into(),
            config,
            relay_pool,
            component_factory,
            payment_backends: PaymentBackendCache::new(payment_factory),
            instances: RwLock::new(HashMap::new()),
        }))
    }

    pub fn worker_id(&self) -> &str {
        &self.0.worker_id
    }

    pub(crate) fn config(&self) -> &WorkerConfig {
        &self.0.config
    }

    /// Reconnects to the scheduler forever, with a fixed backoff between
    /// attempts. Each fault domain (worker vs. scheduler) is independent
    /// per §5, so a scheduler outage never drops hosted experts.
    pub async fn run(&self) -> ! {
        loop {
            if let Err(err) = self.connect_and_serve().await {
                warn!(error = %err, "scheduler connection lost");
            }
            tokio::time::sleep(self.0.config.reconnect_backoff).await;
        }
    }

    /// Pubkeys of experts currently hosted by this worker.
    pub async fn hosted_pubkeys(&self) -> Vec<Pubkey> {
        self.0.instances.read().await.keys().cloned().collect()
    }

    pub(crate) async fn has_capacity(&self) -> bool {
        self.0.instances.read().await.len() < self.0.config.capacity
    }

    pub(crate) async fn handle_scheduler_frame(
        &self,
        frame: SchedulerMessage,
        outbound: &mpsc::UnboundedSender<WorkerMessage>,
    ) {
        match frame {
            SchedulerMessage::Job {
                expert_pubkey,
                expert_object,
                nwc_string,
            } => {
                if self.start_instance(expert_object, nwc_string).await {
                    let _ = outbound.send(WorkerMessage::Started {
                        worker_id: self.worker_id().to_string(),
                        expert: expert_pubkey,
                    });
                }
            }
            SchedulerMessage::Stop { expert } => {
                self.stop_instance(&expert).await;
                let _ = outbound.send(WorkerMessage::Stopped {
                    worker_id: self.worker_id().to_string(),
                    expert,
                });
            }
            SchedulerMessage::Restart {
                expert,
                expert_object,
                nwc_string,
            } => {
                self.stop_instance(&expert).await;
                let _ = outbound.send(WorkerMessage::Stopped {
                    worker_id: self.worker_id().to_string(),
                    expert: expert.clone(),
                });
                if self.start_instance(expert_object, nwc_string).await {
                    let _ = outbound.send(WorkerMessage::Started {
                        worker_id: self.worker_id().to_string(),
                        expert,
                    });
                }
            }
            SchedulerMessage::NoJob {} => {}
        }
    }

    async fn start_instance(&self, expert: Expert, nwc_string: String) -> bool {
        let pubkey = expert.pubkey.clone();
        let payment_backend = self.0.payment_backends.get(&nwc_string).await;
        let components = match self.0.component_factory.build(&expert).await {
            Ok(components) => components,
            Err(err) => {
                warn!(expert = %pubkey, error = %err, "failed to build expert components");
                return false;
            }
        };
        match ExpertInstance::spawn(self.0.relay_pool.clone(), payment_backend, components).await {
            Ok(instance) => {
                self.0.instances.write().await.insert(pubkey.clone(), instance);
                info!(expert = %pubkey, "expert instance started");
                true
            }
            Err(err) => {
                warn!(expert = %pubkey, error = %err, "failed to spawn expert instance");
                false
            }
        }
    }

    async fn stop_instance(&self, pubkey: &str) {
        if let Some(instance) = self.0.instances.write().await.remove(pubkey) {
            instance.stop().await;
            info!(expert = %pubkey, "expert instance stopped");
        }
    }

    #[cfg(test)]
    pub(crate) async fn instance_count(&self) -> usize {
        self.0.instances.read().await.len()
    }
}
