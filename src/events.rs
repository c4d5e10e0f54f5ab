//! Host event primitive.
//!
//! Listeners are keyed by node identity and event name. Dispatch reaches only
//! the listeners of the exact target node; there is no capture or bubbling.

use markup5ever_rcdom::Handle;
use std::cell::RefCell;
use std::rc::Rc;

pub type Handler = Rc<dyn Fn()>;

/// Something listeners can be registered on.
pub trait EventTarget {
    fn add_event_listener(&self, node: &Handle, event: &str, handler: Handler);

    /// Remove the registration made with this exact handler. Returns whether one was found.
    fn remove_event_listener(&self, node: &Handle, event: &str, handler: &Handler) -> bool;
}

struct Listener {
    node: Handle,
    event: String,
    handler: Handler,
}

impl Listener {
    fn matches(&self, node: &Handle, event: &str) -> bool {
        Rc::ptr_eq(&self.node, node) && self.event == event
    }
}

#[derive(Default)]
pub struct EventDispatcher {
    listeners: RefCell<Vec<Listener>>,
}

impl EventDispatcher {
    pub fn new() -> Self {
        Self::default()
    }

    /// Invoke every listener for `event` on `node` in registration order.
    ///
    /// Listeners added or removed by a handler take effect on the next dispatch.
    pub fn dispatch(&self, node: &Handle, event: &str) -> usize {
        let snapshot: Vec<Handler> = self
            .listeners
            .borrow()
            .iter()
            .filter(|l| l.matches(node, event))
            .map(|l| l.handler.clone())
            .collect();

        tracing::trace!(event, listeners = snapshot.len(), "dispatching event");
        for handler in &snapshot {
            handler();
        }
        snapshot.len()
    }

    pub fn listener_count(&self, node: &Handle, event: &str) -> usize {
        self.listeners
            .borrow()
            .iter()
            .filter(|l| l.matches(node, event))
            .count()
    }
}

impl EventTarget for EventDispatcher {
    fn add_event_listener(&self, node: &Handle, event: &str, handler: Handler) {
        self.listeners.borrow_mut().push(Listener {
            node: node.clone(),
            event: event.to_string(),
            handler,
        });
    }

    fn remove_event_listener(&self, node: &Handle, event: &str, handler: &Handler) -> bool {
        let mut listeners = self.listeners.borrow_mut();
        match listeners
            .iter()
            .position(|l| l.matches(node, event) && Rc::ptr_eq(&l.handler, handler))
        {
            Some(index) => {
                listeners.remove(index);
                true
            }
            None => false,
        }
    }
}
