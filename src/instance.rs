//! Instantiator / Attacher
//!
//! Stamps a blueprint's template into a host element. The template is cloned
//! node by node; whenever a clone's subtree is complete, every attach callback
//! registered for the matching template node runs against the clone. Bindings
//! and child components therefore always wire up live nodes, never the shared
//! template.

use crate::binding::{Attached, Subscription};
use crate::compiler::Blueprint;
use crate::dom::{self, NodeKey};
use crate::events::EventTarget;
use crate::scope::SharedScope;
use crate::zone::{TickId, Zone};
use markup5ever_rcdom::Handle;
use std::cell::{Cell, RefCell};
use std::collections::HashMap;
use std::rc::Rc;
use tracing::{debug, instrument, trace};

type AttachFn<'a> = Box<dyn FnOnce(&Handle) + 'a>;

/// A live component: its business object, where it is mounted, and what it registered.
pub struct ComponentInstance {
    blueprint: Rc<Blueprint>,
    component: SharedScope,
    child_components: Vec<SharedScope>,
    host: Handle,
    zone: Rc<Zone>,
    children: RefCell<Vec<Rc<ComponentInstance>>>,
    ticks: RefCell<Vec<TickId>>,
    listeners: RefCell<Vec<Subscription>>,
    mounted: RefCell<Vec<Handle>>,
    attached: Cell<bool>,
}

/// Attach a new instance of `blueprint` to `host`, appending its rendered
/// template to the host's children.
#[instrument(level = "debug", skip_all, fields(component = blueprint.class().name()))]
pub fn attach(host: &Handle, blueprint: &Rc<Blueprint>, zone: &Rc<Zone>) -> Rc<ComponentInstance> {
    let constructed = blueprint.constructor().construct();
    attach_constructed(
        host,
        blueprint,
        zone,
        constructed.component,
        constructed.child_components,
    )
}

fn attach_constructed(
    host: &Handle,
    blueprint: &Rc<Blueprint>,
    zone: &Rc<Zone>,
    component: SharedScope,
    child_components: Vec<SharedScope>,
) -> Rc<ComponentInstance> {
    let instance = Rc::new(ComponentInstance {
        blueprint: blueprint.clone(),
        component,
        child_components,
        host: host.clone(),
        zone: zone.clone(),
        children: RefCell::new(Vec::new()),
        ticks: RefCell::new(Vec::new()),
        listeners: RefCell::new(Vec::new()),
        mounted: RefCell::new(Vec::new()),
        attached: Cell::new(true),
    });

    let live_root = instance.render();

    let fragment = dom::create_fragment();
    dom::move_children(&live_root, &fragment);
    let mounted = dom::move_children(&fragment, host);
    debug!(
        nodes = mounted.len(),
        children = instance.children.borrow().len(),
        "component attached"
    );
    *instance.mounted.borrow_mut() = mounted;

    instance
}

/// Clone `source` and its subtree, running the attach callbacks of each
/// source node once its clone has all of its children.
fn instantiate(source: &Handle, attachments: &mut HashMap<NodeKey, Vec<AttachFn<'_>>>) -> Handle {
    let cloned = dom::shallow_clone(source);
    for child in dom::children(source) {
        let live_child = instantiate(&child, attachments);
        dom::append_child(&cloned, live_child);
    }
    if let Some(callbacks) = attachments.remove(&NodeKey::of(source)) {
        for attach in callbacks {
            attach(&cloned);
        }
    }
    cloned
}

impl ComponentInstance {
    /// Build this instance's live tree. The attachment map lives only for the
    /// duration of the clone.
    fn render(self: &Rc<Self>) -> Handle {
        let blueprint = self.blueprint.clone();
        let mut attachments: HashMap<NodeKey, Vec<AttachFn<'_>>> = HashMap::new();

        for binding in blueprint.bindings() {
            attachments
                .entry(NodeKey::of(&binding.template_node))
                .or_default()
                .push(Box::new(move |live: &Handle| {
                    match binding.attach(live, &self.component, &self.zone) {
                        Some(Attached::Refresh(id)) => self.ticks.borrow_mut().push(id),
                        Some(Attached::Listener(sub)) => self.listeners.borrow_mut().push(sub),
                        None => {}
                    }
                }));
        }

        for (index, child) in blueprint.children().iter().enumerate() {
            attachments
                .entry(NodeKey::of(&child.template_node))
                .or_default()
                .push(Box::new(move |live: &Handle| {
                    self.attach_child(index, &child.blueprint, live);
                }));
        }

        instantiate(blueprint.template_root(), &mut attachments)
    }

    fn attach_child(&self, index: usize, blueprint: &Rc<Blueprint>, live: &Handle) {
        trace!(child = blueprint.class().name(), index, "attaching child component");
        let child = match self.child_components.get(index) {
            Some(component) => {
                let constructed = blueprint.constructor().construct_with(component.clone());
                attach_constructed(
                    live,
                    blueprint,
                    &self.zone,
                    constructed.component,
                    constructed.child_components,
                )
            }
            None => attach(live, blueprint, &self.zone),
        };
        self.children.borrow_mut().push(child);
    }

    pub fn blueprint(&self) -> &Rc<Blueprint> {
        &self.blueprint
    }

    /// The business object expressions evaluate against.
    pub fn component(&self) -> &SharedScope {
        &self.component
    }

    /// Business objects created for attachable children, in template order.
    pub fn child_components(&self) -> &[SharedScope] {
        &self.child_components
    }

    pub fn host(&self) -> &Handle {
        &self.host
    }

    pub fn children(&self) -> Vec<Rc<ComponentInstance>> {
        self.children.borrow().clone()
    }

    /// Top-level nodes this instance appended to its host.
    pub fn mounted(&self) -> Vec<Handle> {
        self.mounted.borrow().clone()
    }

    pub fn tick_ids(&self) -> Vec<TickId> {
        self.ticks.borrow().clone()
    }

    pub fn is_attached(&self) -> bool {
        self.attached.get()
    }

    /// Tear down children first, then drop this instance's tick registrations
    /// and event handlers and remove its nodes from the host. Idempotent.
    pub fn detach(&self) {
        if !self.attached.replace(false) {
            return;
        }
        for child in self.children.borrow().iter() {
            child.detach();
        }
        for id in self.ticks.borrow_mut().drain(..) {
            self.zone.remove_tick(id);
        }
        for sub in self.listeners.borrow_mut().drain(..) {
            self.zone.remove_event_listener(&sub.node, &sub.event, &sub.handler);
        }
        for node in self.mounted.borrow_mut().drain(..) {
            dom::remove_child(&self.host, &node);
        }
        debug!(component = self.blueprint.class().name(), "component detached");
    }
}

impl std::fmt::Debug for ComponentInstance {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ComponentInstance")
            .field("component", &self.blueprint.class().name())
            .field("children", &self.children.borrow().len())
            .field("ticks", &self.ticks.borrow().len())
            .field("listeners", &self.listeners.borrow().len())
            .field("attached", &self.attached.get())
            .finish()
    }
}
