//! Segment id structures shared between the control and compute contexts.

pub mod disjoint_sets;
pub mod signal;
pub mod types;
pub mod uint64_set;

pub use disjoint_sets::{DisjointUint64Sets, Mappings, SetElements};
pub use signal::{Signal, SubscriptionId};
pub use types::{ObjectId, Uint64};
pub use uint64_set::{SetChange, Uint64Set};
