// File: testing-framework/src/node/pillar.rs
//
// Momentum producer
//
// A pillar owns a coinbase key. When triggered for a slot it first lets
// embedded contracts consume their pending sends, then seals every
// uncommitted account block into a signed momentum.

use std::sync::Arc;

use log::{debug, info, trace};
use nom_common::{
    block::Momentum,
    crypto::{Address, KeyPair},
};
use parking_lot::{Mutex, RwLock};

use super::{
    error::ProductionError,
    lifecycle::{ComponentState, Lifecycle, LifecycleError},
    supervisor::Supervisor,
    Broadcaster, Chain, Consensus, DiagnosticEvent, Producer, ProducerEvent, ProducerObserver,
    ProductionHandle, ProductionResult,
};

/// Log target of pillar messages, for [`LogCapture`](crate::orchestrator::LogCapture)
pub const LOG_TARGET: &str = module_path!();

struct PillarInner {
    chain: Arc<dyn Chain>,
    consensus: Arc<dyn Consensus>,
    supervisor: Supervisor,
    broadcaster: Arc<dyn Broadcaster>,
    observers: RwLock<Vec<Arc<dyn ProducerObserver>>>,
    coinbase: RwLock<Option<KeyPair>>,
    lifecycle: Lifecycle,
    // One production step at a time
    production: Mutex<()>,
}

impl PillarInner {
    fn notify(&self, event: DiagnosticEvent) {
        for observer in self.observers.read().iter() {
            observer.on_event(&event);
        }
    }

    fn produce(&self, event: &ProducerEvent) -> ProductionResult {
        let _production = self.production.lock();

        let state = self.lifecycle.state();
        if state != ComponentState::Running {
            return Err(LifecycleError {
                component: "pillar",
                action: "produce",
                state,
            }
            .into());
        }

        let key = self
            .coinbase
            .read()
            .clone()
            .ok_or(ProductionError::NoCoinbase)?;
        if event.producer != key.address() {
            trace!("slot {} belongs to {}, not to us", event.start_time, event.producer);
            return Ok(None);
        }

        if self.consensus.momentum_producer(event.start_time)? != Some(key.address()) {
            return Err(ProductionError::NotAuthorized {
                producer: key.address(),
                slot_start: event.start_time,
            });
        }

        let frontier = self.chain.frontier_momentum()?;
        if event.start_time <= frontier.timestamp {
            return Err(ProductionError::StaleSlot {
                slot_start: event.start_time,
                frontier: frontier.timestamp,
            });
        }

        for send in self.chain.unreceived_embedded_sends()? {
            let execution = self.supervisor.generate_embedded(&send)?;
            let identifier = execution.receive.block.header();
            self.broadcaster.create_account_block(execution.receive)?;
            for descendant in execution.descendants {
                self.broadcaster.create_account_block(descendant)?;
            }

            info!(
                "generated embedded-block identifier={} send-block-header={} returned-error={}",
                identifier,
                send.header(),
                execution.returned_error.as_deref().unwrap_or("<nil>")
            );
            self.notify(DiagnosticEvent::EmbeddedBlockGenerated {
                identifier,
                send_block: send.header(),
                returned_error: execution.returned_error,
            });
        }

        let mut momentum = Momentum {
            height: frontier.height + 1,
            previous_hash: frontier.hash,
            timestamp: event.start_time,
            producer: key.address(),
            content: self.chain.uncommitted_account_blocks()?,
            public_key: key.public_key().to_vec(),
            ..Default::default()
        };
        momentum.hash = momentum.compute_hash();
        momentum.signature = key.sign(&momentum.hash);

        self.broadcaster.create_momentum(momentum.clone())?;
        debug!(
            "produced momentum height={} hash={} blocks={}",
            momentum.height,
            momentum.hash,
            momentum.content.len()
        );
        self.notify(DiagnosticEvent::MomentumProduced {
            identifier: momentum.identifier(),
            blocks: momentum.content.len(),
        });

        Ok(Some(momentum))
    }
}

/// In-process momentum producer.
#[derive(Clone)]
pub struct Pillar {
    inner: Arc<PillarInner>,
}

impl Pillar {
    pub fn new(
        chain: Arc<dyn Chain>,
        consensus: Arc<dyn Consensus>,
        broadcaster: Arc<dyn Broadcaster>,
    ) -> Self {
        let supervisor = Supervisor::new(chain.clone());
        Self {
            inner: Arc::new(PillarInner {
                chain,
                consensus,
                supervisor,
                broadcaster,
                observers: RwLock::new(Vec::new()),
                coinbase: RwLock::new(None),
                lifecycle: Lifecycle::new("pillar"),
                production: Mutex::new(()),
            }),
        }
    }

    /// Register a sink for diagnostics emitted while producing
    pub fn add_observer(&self, observer: Arc<dyn ProducerObserver>) {
        self.inner.observers.write().push(observer);
    }

    pub fn state(&self) -> ComponentState {
        self.inner.lifecycle.state()
    }
}

impl Producer for Pillar {
    fn init(&self) -> Result<(), ProductionError> {
        self.inner.lifecycle.init()?;
        Ok(())
    }

    fn start(&self) -> Result<(), ProductionError> {
        if self.inner.coinbase.read().is_none() {
            return Err(ProductionError::NoCoinbase);
        }
        self.inner.lifecycle.start()?;
        Ok(())
    }

    fn stop(&self) -> Result<(), ProductionError> {
        self.inner.lifecycle.stop()?;
        Ok(())
    }

    fn set_coinbase(&self, key: KeyPair) {
        *self.inner.coinbase.write() = Some(key);
    }

    fn coinbase(&self) -> Option<Address> {
        self.inner.coinbase.read().as_ref().map(KeyPair::address)
    }

    fn process(&self, event: ProducerEvent) -> ProductionHandle {
        let state = self.inner.lifecycle.state();
        if state != ComponentState::Running {
            return ProductionHandle::ready(Err(LifecycleError {
                component: "pillar",
                action: "process",
                state,
            }
            .into()));
        }

        let inner = self.inner.clone();
        ProductionHandle::new(tokio::task::spawn_blocking(move || inner.produce(&event)))
    }
}
