//! Synchronous change notification.
//!
//! Observers (render layers, widgets, the compute worker's recomputation
//! hooks) register a callback and are invoked in registration order every
//! time the owning structure dispatches an event.

use std::fmt;

/// Handle returned by [`Signal::add`], used to unsubscribe.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct SubscriptionId(u64);

type Handler<E> = Box<dyn FnMut(&E) + Send>;

pub struct Signal<E> {
    handlers: Vec<(SubscriptionId, Handler<E>)>,
    next_id: u64,
}

impl<E> Signal<E> {
    pub fn new() -> Self {
        Signal {
            handlers: Vec::new(),
            next_id: 0,
        }
    }

    /// Registers `handler` and returns its subscription id.
    pub fn add<F>(&mut self, handler: F) -> SubscriptionId
    where
        F: FnMut(&E) + Send + 'static,
    {
        let id = SubscriptionId(self.next_id);
        self.next_id += 1;
        self.handlers.push((id, Box::new(handler)));
        id
    }

    /// Removes a subscription. Returns `false` if it was not registered.
    pub fn remove(&mut self, id: SubscriptionId) -> bool {
        let before = self.handlers.len();
        self.handlers.retain(|(handler_id, _)| *handler_id != id);
        self.handlers.len() != before
    }

    pub fn dispatch(&mut self, event: &E) {
        for (_, handler) in self.handlers.iter_mut() {
            handler(event);
        }
    }

    pub fn len(&self) -> usize {
        self.handlers.len()
    }

    pub fn is_empty(&self) -> bool {
        self.handlers.is_empty()
    }

    /// Drops every subscriber.
    pub fn clear(&mut self) {
        self.handlers.clear();
    }
}

impl<E> Default for Signal<E> {
    fn default() -> Self {
        Self::new()
    }
}

impl<E> fmt::Debug for Signal<E> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Signal")
            .field("subscribers", &self.handlers.len())
            .finish()
    }
}
