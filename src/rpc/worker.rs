//! Background compute context.
//!
//! The worker owns the receiving end of the replication channel and applies
//! messages to the [`Counterparts`] registry strictly in arrival order. On
//! shutdown, anything still queued is abandoned rather than flushed.

use std::sync::Arc;

use parking_lot::Mutex;
use tokio::sync::{mpsc, watch};
use tracing::{debug, error, info};

use crate::rpc::protocol::RpcMessage;
use crate::rpc::transport::Counterparts;

pub struct CounterpartWorker {
    counterparts: Arc<Mutex<Counterparts>>,
    receiver: mpsc::UnboundedReceiver<RpcMessage>,
}

impl CounterpartWorker {
    pub fn new(receiver: mpsc::UnboundedReceiver<RpcMessage>) -> Self {
        CounterpartWorker {
            counterparts: Arc::new(Mutex::new(Counterparts::new())),
            receiver,
        }
    }

    /// Shared view of the compute-side objects.
    pub fn counterparts(&self) -> Arc<Mutex<Counterparts>> {
        Arc::clone(&self.counterparts)
    }

    /// Runs until `shutdown` fires or the control context drops its handle.
    pub async fn run(mut self, mut shutdown: watch::Receiver<bool>) {
        info!("compute context started");
        loop {
            tokio::select! {
                biased;
                _ = shutdown.changed() => {
                    info!("compute context shutting down, abandoning pending replication");
                    break;
                }
                message = self.receiver.recv() => match message {
                    Some(message) => self.apply(message),
                    None => {
                        info!("control context closed the replication channel");
                        break;
                    }
                },
            }
        }
    }

    /// Applies every message already queued, without waiting for more.
    /// Returns the number of messages processed.
    pub fn drain_pending(&mut self) -> usize {
        let mut processed = 0;
        while let Ok(message) = self.receiver.try_recv() {
            self.apply(message);
            processed += 1;
        }
        processed
    }

    fn apply(&self, message: RpcMessage) {
        let id = message.object_id();
        match self.counterparts.lock().handle(message) {
            Ok(true) => debug!(object = id, "counterpart changed"),
            Ok(false) => {}
            Err(e) => error!(object = id, "replication channel halted: {}", e),
        }
    }
}
