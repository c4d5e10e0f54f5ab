//! Host tree capabilities over `markup5ever_rcdom`.
//!
//! Templates and host documents are both parsed with html5ever. The parser
//! always wraps content in `html`/`head`/`body`; a template's root is the
//! `<body>` container with anything hoisted into `<head>` moved back in front,
//! so its children are exactly the template's top-level nodes.
//!
//! NOTE: dropping an rcdom node detaches the children of every node below it,
//! even ones still referenced elsewhere. Anything that hands out handles into
//! a parsed tree must keep the tree's document node alive.

use crate::events::{EventDispatcher, EventTarget, Handler};
use html5ever::serialize::{serialize, SerializeOpts, TraversalScope};
use html5ever::tendril::TendrilSink;
use html5ever::{parse_document, Attribute, LocalName, Namespace, QualName};
use markup5ever_rcdom::{Handle, Node, NodeData, RcDom, SerializableHandle};
use std::cell::RefCell;
use std::io;
use std::rc::Rc;
use tendril::StrTendril;

/// Identity of a node, valid while the node is alive.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct NodeKey(usize);

impl NodeKey {
    pub fn of(handle: &Handle) -> Self {
        NodeKey(Rc::as_ptr(handle) as usize)
    }
}

// ═══════════════════════════════════════════════════════════════════════════════
// PARSING
// ═══════════════════════════════════════════════════════════════════════════════

pub fn parse_html(html: &str) -> io::Result<RcDom> {
    parse_document(RcDom::default(), Default::default())
        .from_utf8()
        .read_from(&mut html.as_bytes())
}

/// A parsed template. Owns the document so `root` keeps its children.
#[derive(Debug)]
pub struct Template {
    document: Handle,
    root: Handle,
}

impl Template {
    pub fn parse(html: &str) -> io::Result<Self> {
        let dom = parse_html(html)?;
        let root = find_element(&dom.document, "BODY").ok_or_else(|| {
            io::Error::new(io::ErrorKind::InvalidData, "parsed template has no body")
        })?;
        // Leading <style>, <link>, <meta>, <title>... land in <head>; they are
        // template content like anything else.
        if let Some(head) = find_element(&dom.document, "HEAD") {
            let hoisted = std::mem::take(&mut *head.children.borrow_mut());
            let rest = std::mem::take(&mut *root.children.borrow_mut());
            for node in hoisted.into_iter().chain(rest) {
                node.parent.set(None);
                append_child(&root, node);
            }
        }
        Ok(Template {
            document: dom.document,
            root,
        })
    }

    /// The container whose children are the template's top-level nodes.
    pub fn root(&self) -> &Handle {
        &self.root
    }

    pub fn document(&self) -> &Handle {
        &self.document
    }
}

// ═══════════════════════════════════════════════════════════════════════════════
// INSPECTION
// ═══════════════════════════════════════════════════════════════════════════════

/// Uppercased local name of an element, `None` for other node kinds.
pub fn tag_name(handle: &Handle) -> Option<String> {
    match &handle.data {
        NodeData::Element { name, .. } => Some(name.local.to_string().to_uppercase()),
        _ => None,
    }
}

pub fn is_element(handle: &Handle) -> bool {
    matches!(handle.data, NodeData::Element { .. })
}

pub fn children(handle: &Handle) -> Vec<Handle> {
    handle.children.borrow().clone()
}

/// Every element below `root` in document pre-order. `root` itself is excluded.
pub fn walk_elements(root: &Handle) -> Vec<Handle> {
    let mut out = Vec::new();
    let mut stack: Vec<Handle> = root.children.borrow().iter().rev().cloned().collect();
    while let Some(node) = stack.pop() {
        if is_element(&node) {
            out.push(node.clone());
        }
        stack.extend(node.children.borrow().iter().rev().cloned());
    }
    out
}

pub fn find_elements_by_tag(root: &Handle, tag: &str) -> Vec<Handle> {
    let wanted = tag.to_uppercase();
    walk_elements(root)
        .into_iter()
        .filter(|node| tag_name(node).as_deref() == Some(wanted.as_str()))
        .collect()
}

fn find_element(root: &Handle, tag: &str) -> Option<Handle> {
    find_elements_by_tag(root, tag).into_iter().next()
}

/// Attribute `(name, value)` pairs in source order.
pub fn attributes(handle: &Handle) -> Vec<(String, String)> {
    match &handle.data {
        NodeData::Element { attrs, .. } => attrs
            .borrow()
            .iter()
            .map(|a| (a.name.local.to_string(), a.value.to_string()))
            .collect(),
        _ => Vec::new(),
    }
}

pub fn get_attribute(handle: &Handle, name: &str) -> Option<String> {
    match &handle.data {
        NodeData::Element { attrs, .. } => attrs
            .borrow()
            .iter()
            .find(|a| &*a.name.local == name)
            .map(|a| a.value.to_string()),
        _ => None,
    }
}

/// Set or add an attribute. Returns false for non-element nodes.
pub fn set_attribute(handle: &Handle, name: &str, value: &str) -> bool {
    let NodeData::Element { attrs, .. } = &handle.data else {
        return false;
    };
    let mut attrs = attrs.borrow_mut();
    match attrs.iter_mut().find(|a| &*a.name.local == name) {
        Some(existing) => existing.value = StrTendril::from(value),
        None => attrs.push(Attribute {
            name: QualName::new(None, Namespace::from(""), LocalName::from(name)),
            value: StrTendril::from(value),
        }),
    }
    true
}

pub fn text_content(handle: &Handle) -> String {
    let mut out = String::new();
    let mut stack = vec![handle.clone()];
    while let Some(node) = stack.pop() {
        if let NodeData::Text { contents } = &node.data {
            out.push_str(&contents.borrow());
        }
        stack.extend(node.children.borrow().iter().rev().cloned());
    }
    out
}

/// Serialized markup of a node's children.
pub fn inner_html(handle: &Handle) -> String {
    let mut bytes = Vec::new();
    let opts = SerializeOpts {
        traversal_scope: TraversalScope::ChildrenOnly(None),
        ..Default::default()
    };
    let serializable: SerializableHandle = handle.clone().into();
    if serialize(&mut bytes, &serializable, opts).is_err() {
        return String::new();
    }
    String::from_utf8_lossy(&bytes).into_owned()
}

// ═══════════════════════════════════════════════════════════════════════════════
// MUTATION
// ═══════════════════════════════════════════════════════════════════════════════

/// Copy a node's own data (tag, attributes, text) without its children.
pub fn shallow_clone(handle: &Handle) -> Handle {
    let data = match &handle.data {
        NodeData::Document => NodeData::Document,
        NodeData::Doctype {
            name,
            public_id,
            system_id,
        } => NodeData::Doctype {
            name: name.clone(),
            public_id: public_id.clone(),
            system_id: system_id.clone(),
        },
        NodeData::Text { contents } => NodeData::Text {
            contents: RefCell::new(contents.borrow().clone()),
        },
        NodeData::Comment { contents } => NodeData::Comment {
            contents: contents.clone(),
        },
        NodeData::Element {
            name,
            attrs,
            mathml_annotation_xml_integration_point,
            ..
        } => NodeData::Element {
            name: name.clone(),
            attrs: RefCell::new(attrs.borrow().clone()),
            template_contents: RefCell::new(None),
            mathml_annotation_xml_integration_point: *mathml_annotation_xml_integration_point,
        },
        NodeData::ProcessingInstruction { target, contents } => {
            NodeData::ProcessingInstruction {
                target: target.clone(),
                contents: contents.clone(),
            }
        }
    };
    Node::new(data)
}

pub fn append_child(parent: &Handle, child: Handle) {
    if let Some(previous) = child.parent.take().and_then(|weak| weak.upgrade()) {
        previous
            .children
            .borrow_mut()
            .retain(|c| !Rc::ptr_eq(c, &child));
    }
    child.parent.set(Some(Rc::downgrade(parent)));
    parent.children.borrow_mut().push(child);
}

pub fn remove_child(parent: &Handle, child: &Handle) -> bool {
    let mut children = parent.children.borrow_mut();
    let before = children.len();
    children.retain(|c| !Rc::ptr_eq(c, child));
    let removed = children.len() != before;
    if removed {
        child.parent.set(None);
    }
    removed
}

/// A detached container for moving a group of nodes at once.
pub fn create_fragment() -> Handle {
    Node::new(NodeData::Document)
}

/// Move every child of `from` to the end of `to`, returning the moved nodes.
pub fn move_children(from: &Handle, to: &Handle) -> Vec<Handle> {
    let moved = std::mem::take(&mut *from.children.borrow_mut());
    for child in &moved {
        child.parent.set(None);
        append_child(to, child.clone());
    }
    moved
}

// ═══════════════════════════════════════════════════════════════════════════════
// HOST DOCUMENT
// ═══════════════════════════════════════════════════════════════════════════════

/// The host tree an application mounts into, plus its event registry.
///
/// Listener registration goes through a replaceable [`EventTarget`]. It starts
/// out as the raw dispatcher; bootstrap swaps in its zone so every handler
/// registered on the document afterwards is wrapped.
pub struct Document {
    dom: RcDom,
    events: Rc<EventDispatcher>,
    target: RefCell<Rc<dyn EventTarget>>,
}

impl Document {
    pub fn parse(html: &str) -> io::Result<Self> {
        let events = Rc::new(EventDispatcher::new());
        Ok(Document {
            dom: parse_html(html)?,
            target: RefCell::new(events.clone()),
            events,
        })
    }

    pub fn root(&self) -> &Handle {
        &self.dom.document
    }

    pub fn body(&self) -> Option<Handle> {
        find_element(&self.dom.document, "BODY")
    }

    /// Elements with the given tag, in document order.
    pub fn query_tag(&self, tag: &str) -> Vec<Handle> {
        find_elements_by_tag(&self.dom.document, tag)
    }

    pub fn events(&self) -> Rc<EventDispatcher> {
        self.events.clone()
    }

    /// Fire `event` on `node`. Listeners on ancestors are not invoked.
    pub fn dispatch_event(&self, node: &Handle, event: &str) -> usize {
        self.events.dispatch(node, event)
    }

    /// Replace the registration mechanism, returning the previous one.
    pub fn set_event_target(&self, target: Rc<dyn EventTarget>) -> Rc<dyn EventTarget> {
        self.target.replace(target)
    }

    pub fn event_target(&self) -> Rc<dyn EventTarget> {
        self.target.borrow().clone()
    }

    pub fn add_event_listener(&self, node: &Handle, event: &str, handler: Handler) {
        self.event_target().add_event_listener(node, event, handler);
    }

    pub fn remove_event_listener(&self, node: &Handle, event: &str, handler: &Handler) -> bool {
        self.event_target().remove_event_listener(node, event, handler)
    }

    pub fn inner_html(&self, node: &Handle) -> String {
        inner_html(node)
    }
}

impl std::fmt::Debug for Document {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Document")
            .field("html", &inner_html(&self.dom.document))
            .finish()
    }
}
