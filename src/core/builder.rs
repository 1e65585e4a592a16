use std::collections::HashMap;
use std::sync::{Arc, Mutex};

use tokio_util::sync::CancellationToken;

use crate::{
    core::{CleanupScheduler, IntakeConfig, IntakeGate, Orchestrator, TaskRegistry},
    core::driver::BatchDriver,
    error::IntakeError,
    events::Bus,
    subscribers::{Subscribe, SubscriberSet},
    transport::TransportRef,
};

/// Builder for constructing an [`Orchestrator`].
pub struct OrchestratorBuilder {
    cfg: IntakeConfig,
    transport: Option<TransportRef>,
    registry: Option<Arc<TaskRegistry>>,
    subscribers: Vec<Arc<dyn Subscribe>>,
}

impl OrchestratorBuilder {
    /// Creates a new builder with the given configuration.
    pub fn new(cfg: IntakeConfig) -> Self {
        Self {
            cfg,
            transport: None,
            registry: None,
            subscribers: Vec::new(),
        }
    }

    /// Sets the transport every accepted file is uploaded with (required).
    pub fn with_transport(mut self, transport: TransportRef) -> Self {
        self.transport = Some(transport);
        self
    }

    /// Uses an existing registry instead of a fresh one.
    ///
    /// Handy when a presentation layer already holds the registry, and in tests.
    pub fn with_registry(mut self, registry: Arc<TaskRegistry>) -> Self {
        self.registry = Some(registry);
        self
    }

    /// Sets event subscribers for observability.
    ///
    /// Subscribers receive intake events (task lifecycle, rejections, gate flips)
    /// through dedicated workers with bounded queues.
    pub fn with_subscribers(mut self, subscribers: Vec<Arc<dyn Subscribe>>) -> Self {
        self.subscribers = subscribers;
        self
    }

    /// Builds the orchestrator.
    ///
    /// Spawns the subscriber workers, so it must be called inside a tokio runtime.
    /// Fails with [`IntakeError::MissingTransport`] if no transport was set.
    pub fn build(self) -> Result<Arc<Orchestrator>, IntakeError> {
        let transport = self.transport.ok_or(IntakeError::MissingTransport)?;

        let bus = Bus::new(self.cfg.bus_capacity_clamped());
        let subs = SubscriberSet::new(self.subscribers, bus.clone());
        let registry = self.registry.unwrap_or_default();

        let gate = Arc::new(IntakeGate::new(Arc::clone(&registry), bus.clone()));
        let cleanup = Arc::new(CleanupScheduler::new(
            self.cfg.cleanup_delay,
            Arc::clone(&registry),
            bus.clone(),
        ));

        let driver = BatchDriver {
            registry: Arc::clone(&registry),
            transport,
            bus: bus.clone(),
            gate,
            cleanup,
            inflight: Arc::new(Mutex::new(HashMap::new())),
            runtime_token: CancellationToken::new(),
            drive: self.cfg.drive,
        };

        Ok(Arc::new(Orchestrator::new_internal(
            self.cfg, bus, subs, registry, driver,
        )))
    }
}
