//! Replication transport between the control and compute contexts.

pub mod protocol;
pub mod transport;
pub mod worker;

pub use protocol::{Batch, RpcMessage, SetOperation};
pub use transport::{Counterparts, ReplicationSink, RpcHandle};
pub use worker::CounterpartWorker;
