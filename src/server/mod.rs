//! Web server module for the control context.
//!
//! Exposes the control-side segment state over HTTP and accepts edits over
//! a WebSocket; edits to visible segments are replicated to the compute
//! context as they are applied.

pub mod routes;
pub mod state;
pub mod websocket;

pub use routes::create_router;
pub use state::{AppState, ClientCommand, ControlContext, SharedState, StateSnapshot};
