//! Registration identifier for replicated objects.
//!
//! Every object that has a counterpart in the other execution context is
//! addressed on the wire by the `ObjectId` it was given at registration time.

/// Opaque numeric id assigned to a replicated object when its counterpart is
/// registered with the transport.
pub type ObjectId = u64;
