//! Change-Detection Zone
//!
//! Holds every input-binding refresh routine of an application and re-runs
//! all of them after any event handler registered through the zone returns.
//!
//! The zone sits between the framework and the host event primitive: it is
//! itself an [`EventTarget`], wrapping each handler before delegating to the
//! real target. A side table remembers which wrapper was installed for which
//! `(node, event, handler)` so removal forwards the exact wrapper.

use crate::error::ExpressionError;
use crate::events::{EventTarget, Handler};
use markup5ever_rcdom::Handle;
use std::cell::{Cell, RefCell};
use std::rc::{Rc, Weak};
use tracing::{trace, warn};

pub type Refresh = Rc<dyn Fn() -> Result<(), ExpressionError>>;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct TickId(u64);

/// Outcome of one pass over the refresh registry.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct TickReport {
    pub refreshed: usize,
    pub failed: usize,
}

struct Wrapped {
    node: Handle,
    event: String,
    original: Handler,
    wrapper: Handler,
}

pub struct Zone {
    this: Weak<Zone>,
    target: Rc<dyn EventTarget>,
    refreshes: RefCell<Vec<(TickId, Refresh)>>,
    next_id: Cell<u64>,
    wrappers: RefCell<Vec<Wrapped>>,
    ticks: Cell<u64>,
}

impl Zone {
    pub fn new(target: Rc<dyn EventTarget>) -> Rc<Zone> {
        Rc::new_cyclic(|this| Zone {
            this: this.clone(),
            target,
            refreshes: RefCell::new(Vec::new()),
            next_id: Cell::new(0),
            wrappers: RefCell::new(Vec::new()),
            ticks: Cell::new(0),
        })
    }

    pub fn on_tick(&self, refresh: Refresh) -> TickId {
        let id = TickId(self.next_id.get());
        self.next_id.set(id.0 + 1);
        self.refreshes.borrow_mut().push((id, refresh));
        id
    }

    pub fn remove_tick(&self, id: TickId) -> bool {
        let mut refreshes = self.refreshes.borrow_mut();
        let before = refreshes.len();
        refreshes.retain(|(existing, _)| *existing != id);
        refreshes.len() != before
    }

    /// Run every registered refresh once, in registration order.
    ///
    /// A failing refresh is logged and counted; the rest still run.
    pub fn tick(&self) -> TickReport {
        let snapshot: Vec<(TickId, Refresh)> = self.refreshes.borrow().clone();
        self.ticks.set(self.ticks.get() + 1);

        let mut report = TickReport::default();
        for (id, refresh) in &snapshot {
            match refresh() {
                Ok(()) => report.refreshed += 1,
                Err(e) => {
                    report.failed += 1;
                    warn!(tick_id = id.0, code = e.code(), error = %e, "binding refresh failed");
                }
            }
        }
        trace!(
            refreshed = report.refreshed,
            failed = report.failed,
            "zone tick complete"
        );
        report
    }

    pub fn registered(&self) -> usize {
        self.refreshes.borrow().len()
    }

    /// Number of ticks run so far.
    pub fn tick_count(&self) -> u64 {
        self.ticks.get()
    }

    /// Number of handlers currently installed through the zone.
    pub fn wrapped_listeners(&self) -> usize {
        self.wrappers.borrow().len()
    }
}

impl std::fmt::Debug for Zone {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Zone")
            .field("registered", &self.registered())
            .field("ticks", &self.tick_count())
            .finish()
    }
}

impl EventTarget for Zone {
    fn add_event_listener(&self, node: &Handle, event: &str, handler: Handler) {
        let zone = self.this.clone();
        let inner = handler.clone();
        let wrapper: Handler = Rc::new(move || {
            inner();
            if let Some(zone) = zone.upgrade() {
                zone.tick();
            }
        });

        self.wrappers.borrow_mut().push(Wrapped {
            node: node.clone(),
            event: event.to_string(),
            original: handler,
            wrapper: wrapper.clone(),
        });
        self.target.add_event_listener(node, event, wrapper);
    }

    /// Remove every wrapper installed for this `(node, event, handler)`.
    fn remove_event_listener(&self, node: &Handle, event: &str, handler: &Handler) -> bool {
        let removed: Vec<Wrapped> = {
            let mut wrappers = self.wrappers.borrow_mut();
            let (matching, kept): (Vec<Wrapped>, Vec<Wrapped>) = std::mem::take(&mut *wrappers)
                .into_iter()
                .partition(|w| {
                    Rc::ptr_eq(&w.node, node)
                        && w.event == event
                        && Rc::ptr_eq(&w.original, handler)
                });
            *wrappers = kept;
            matching
        };

        let mut forwarded = false;
        for w in &removed {
            forwarded |= self.target.remove_event_listener(node, event, &w.wrapper);
        }
        forwarded
    }
}
