//! Binding Engine
//!
//! Input bindings (`[name]=expr`) keep an attribute of a live node equal to the
//! value of their expression: they render once at attach time and again on
//! every zone tick. Output bindings (`(name)=expr`) run their program when the
//! named event fires on the live node and never register with the tick.

use crate::dom;
use crate::error::ExpressionError;
use crate::events::{EventTarget, Handler};
use crate::expression::{compile_input, compile_output, CompiledExpression};
use crate::scope::SharedScope;
use crate::zone::{Refresh, TickId, Zone};
use markup5ever_rcdom::Handle;
use serde::Serialize;
use std::rc::Rc;
use tracing::{trace, warn};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum BindingKind {
    Input,
    Output,
}

/// One binding attribute found on a template node.
#[derive(Debug, Clone)]
pub struct BindingDescriptor {
    pub kind: BindingKind,
    /// Attribute name for inputs, event name for outputs.
    pub name: String,
    pub expression: String,
    pub template_node: Handle,
    pub program: Result<Rc<CompiledExpression>, ExpressionError>,
}

/// An event handler installed through the zone, kept so it can be removed.
#[derive(Clone)]
pub struct Subscription {
    pub node: Handle,
    pub event: String,
    pub handler: Handler,
}

impl std::fmt::Debug for Subscription {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Subscription")
            .field("event", &self.event)
            .finish()
    }
}

/// What attaching a binding left registered.
#[derive(Debug)]
pub enum Attached {
    Refresh(TickId),
    Listener(Subscription),
}

impl BindingDescriptor {
    pub fn new(kind: BindingKind, name: &str, expression: &str, template_node: Handle) -> Self {
        let program = match kind {
            BindingKind::Input => compile_input(expression),
            BindingKind::Output => compile_output(expression),
        }
        .map(Rc::new);

        BindingDescriptor {
            kind,
            name: name.to_string(),
            expression: expression.to_string(),
            template_node,
            program,
        }
    }

    /// The attribute as written in the template, e.g. `[value]`.
    pub fn attribute(&self) -> String {
        match self.kind {
            BindingKind::Input => format!("[{}]", self.name),
            BindingKind::Output => format!("({})", self.name),
        }
    }

    pub fn dependencies(&self) -> Vec<String> {
        match &self.program {
            Ok(program) => program.dependencies.iter().cloned().collect(),
            Err(_) => Vec::new(),
        }
    }

    /// Wire this binding to `live`, the clone of its template node.
    ///
    /// Returns `None` when the expression never compiled; the binding is then
    /// skipped and its siblings attach as usual.
    pub fn attach(
        &self,
        live: &Handle,
        component: &SharedScope,
        zone: &Rc<Zone>,
    ) -> Option<Attached> {
        let program = match &self.program {
            Ok(program) => program.clone(),
            Err(e) => {
                warn!(
                    attribute = %self.attribute(),
                    error = %e,
                    "skipping binding that failed to compile"
                );
                return None;
            }
        };

        match self.kind {
            BindingKind::Input => {
                let id = self.attach_input(program, live, component, zone);
                Some(Attached::Refresh(id))
            }
            BindingKind::Output => {
                let subscription = self.attach_output(program, live, component, zone);
                Some(Attached::Listener(subscription))
            }
        }
    }

    fn attach_input(
        &self,
        program: Rc<CompiledExpression>,
        live: &Handle,
        component: &SharedScope,
        zone: &Rc<Zone>,
    ) -> TickId {
        let node = live.clone();
        let scope = component.clone();
        let attribute = self.name.clone();
        let refresh: Refresh = Rc::new(move || -> Result<(), ExpressionError> {
            let value = program.evaluate_shared(&scope)?;
            dom::set_attribute(&node, &attribute, &value.to_string());
            Ok(())
        });

        let id = zone.on_tick(refresh.clone());
        if let Err(e) = refresh() {
            warn!(
                attribute = %self.attribute(),
                code = e.code(),
                error = %e,
                "initial render of binding failed"
            );
        }
        trace!(attribute = %self.attribute(), "input binding attached");
        id
    }

    fn attach_output(
        &self,
        program: Rc<CompiledExpression>,
        live: &Handle,
        component: &SharedScope,
        zone: &Rc<Zone>,
    ) -> Subscription {
        let scope = component.clone();
        let event = self.name.clone();
        let handler: Handler = Rc::new(move || {
            if let Err(e) = program.evaluate_shared(&scope) {
                warn!(event = %event, code = e.code(), error = %e, "event handler failed");
            }
        });

        zone.add_event_listener(live, &self.name, handler.clone());
        trace!(attribute = %self.attribute(), "output binding attached");
        Subscription {
            node: live.clone(),
            event: self.name.clone(),
            handler,
        }
    }
}
