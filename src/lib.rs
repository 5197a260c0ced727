//! # Segment Sets - replicated segment id state
//!
//! Shared state describing groupings of 64-bit segment ids, kept in sync
//! between an interactive control context and a background compute context.
//!
//! ## Features
//!
//! - **Full 64-bit ids**: no precision loss in parsing, ordering or serialization
//! - **Replicated sets**: local mutation plus one-hop, ordered replication to a counterpart
//! - **Disjoint sets**: union-find whose representative is each set's maximum member
//! - **Deterministic serialization**: stable output for persisted view state
//!
//! ## Example
//!
//! ```rust
//! use segment_sets::{DisjointUint64Sets, Uint64};
//!
//! let mut sets = DisjointUint64Sets::new();
//! sets.link(Uint64::new(10), Uint64::new(20));
//! sets.link(Uint64::new(20), Uint64::new(5));
//! assert_eq!(sets.get(Uint64::new(10)), Uint64::new(20));
//! assert_eq!(sets.to_json(), vec![vec!["5", "10", "20"]]);
//! ```

pub mod config;
pub mod error;
pub mod rpc;
pub mod segments;
pub mod server;

pub use error::{Error, Result};
pub use rpc::{Batch, CounterpartWorker, Counterparts, ReplicationSink, RpcHandle, RpcMessage, SetOperation};
pub use segments::{DisjointUint64Sets, ObjectId, SetChange, Signal, Uint64, Uint64Set};
