//! Type definitions shared by the segment set structures.

pub mod object_id;
pub mod uint64;

pub use object_id::ObjectId;
pub use uint64::Uint64;
