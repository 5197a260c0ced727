//! Replicating a segment set from the control context to the compute context.
//!
//! The control side mutates a set with a registered counterpart; a background
//! task plays the compute context and applies the replicated operations.
//!
//! Run with: cargo run --example two_contexts

use std::time::Duration;

use segment_sets::rpc::{CounterpartWorker, RpcHandle};
use segment_sets::{Uint64, Uint64Set};
use tokio::sync::watch;

#[tokio::main]
async fn main() {
    tracing_subscriber::fmt()
        .with_env_filter("segment_sets=debug")
        .init();

    println!("=== Two Context Replication Example ===\n");

    let (rpc, receiver) = RpcHandle::channel();
    let worker = CounterpartWorker::new(receiver);
    let compute = worker.counterparts();
    let (shutdown_tx, shutdown_rx) = watch::channel(false);
    let task = tokio::spawn(worker.run(shutdown_rx));

    let mut visible = Uint64Set::with_counterpart(&rpc);
    let id = visible.rpc_id().unwrap();

    println!("Control context adds 1, 2, 3 and removes 2");
    visible.add(vec![Uint64::new(1), Uint64::new(2), Uint64::new(3)]);
    visible.delete(Uint64::new(2));

    // Give the compute task a moment to catch up.
    tokio::time::sleep(Duration::from_millis(50)).await;

    let control_view = visible.to_json();
    let compute_view = compute.lock().get(id).map(|set| set.to_json());
    println!("  Control sees: {:?}", control_view);
    println!("  Compute sees: {:?}", compute_view);

    if compute_view.as_ref() == Some(&control_view) {
        println!("\n✓ Both contexts agree");
    } else {
        println!("\n✗ Contexts diverged");
    }

    shutdown_tx.send(true).unwrap();
    task.await.unwrap();
}
