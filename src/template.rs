//! Template Parser
//!
//! Walks a parsed template in document pre-order. Each element whose tag
//! matches a declared child component becomes an attachment point (its class
//! is compiled on the spot), then each `[name]` / `(name)` attribute on the
//! element becomes a binding. The resulting order is what instances later
//! attach and refresh in.

use crate::binding::{BindingDescriptor, BindingKind};
use crate::compiler::{Blueprint, Compiler};
use crate::component::ComponentClass;
use crate::dom;
use crate::error::ConfigurationError;
use lazy_static::lazy_static;
use markup5ever_rcdom::Handle;
use regex::Regex;
use std::collections::HashMap;
use std::rc::Rc;
use tracing::{trace, warn};

lazy_static! {
    /// `[name]` is an input, `(name)` an output. Anything else is a plain attribute.
    static ref BINDING_ATTR: Regex = Regex::new(r"^(?:\[(\w+)\]|\((\w+)\))$").unwrap();
}

/// A placeholder in a parent template where a child instance gets attached.
#[derive(Debug, Clone)]
pub struct AttachableChild {
    pub blueprint: Rc<Blueprint>,
    pub template_node: Handle,
}

#[derive(Debug, Default)]
pub struct ParsedTemplate {
    pub bindings: Vec<BindingDescriptor>,
    pub components: Vec<AttachableChild>,
    /// Declared child classes whose tag never appeared.
    pub unused: Vec<ComponentClass>,
}

/// Recognize a binding attribute name.
pub fn binding_syntax(attribute: &str) -> Option<(BindingKind, &str)> {
    let caps = BINDING_ATTR.captures(attribute)?;
    if let Some(name) = caps.get(1) {
        return Some((BindingKind::Input, name.as_str()));
    }
    caps.get(2).map(|name| (BindingKind::Output, name.as_str()))
}

/// Binding attributes of one element, in attribute order.
pub fn gather_bindings(node: &Handle) -> Vec<(BindingKind, String, String)> {
    dom::attributes(node)
        .into_iter()
        .filter_map(|(attr, value)| {
            binding_syntax(&attr).map(|(kind, name)| (kind, name.to_string(), value))
        })
        .collect()
}

pub fn parse_template(
    root: &Handle,
    owner: &ComponentClass,
    declared: &[ComponentClass],
    compiler: &Compiler,
) -> Result<ParsedTemplate, ConfigurationError> {
    let by_tag: HashMap<String, ComponentClass> = declared
        .iter()
        .map(|class| (class.tag_name(), *class))
        .collect();

    let strict_expressions = compiler.options().strict_expressions;
    let mut parsed = ParsedTemplate::default();
    let mut used: Vec<ComponentClass> = Vec::new();

    for node in dom::walk_elements(root) {
        let Some(tag) = dom::tag_name(&node) else {
            continue;
        };

        if let Some(class) = by_tag.get(&tag) {
            trace!(parent = owner.name(), child = class.name(), "found attachment point");
            let blueprint = compiler.compile(*class)?;
            parsed.components.push(AttachableChild {
                blueprint,
                template_node: node.clone(),
            });
            if !used.contains(class) {
                used.push(*class);
            }
        }

        for (kind, name, expression) in gather_bindings(&node) {
            let descriptor = BindingDescriptor::new(kind, &name, &expression, node.clone());
            if let Err(e) = &descriptor.program {
                if strict_expressions {
                    return Err(ConfigurationError::InvalidBinding {
                        component: owner.name().to_string(),
                        attribute: descriptor.attribute(),
                        source: e.clone(),
                    });
                }
                warn!(
                    component = owner.name(),
                    attribute = %descriptor.attribute(),
                    code = e.code(),
                    error = %e,
                    "binding will not be attached"
                );
            }
            parsed.bindings.push(descriptor);
        }
    }

    parsed.unused = declared
        .iter()
        .filter(|class| !used.contains(class))
        .copied()
        .collect();

    Ok(parsed)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::dom::Template;
    use crate::fixtures::{Counter, Label};

    #[test]
    fn test_binding_syntax() {
        assert_eq!(binding_syntax("[value]"), Some((BindingKind::Input, "value")));
        assert_eq!(binding_syntax("(click)"), Some((BindingKind::Output, "click")));
        assert_eq!(binding_syntax("value"), None);
        assert_eq!(binding_syntax("[value)"), None);
        assert_eq!(binding_syntax("data-[x]"), None);
        assert_eq!(binding_syntax("[]"), None);
        assert_eq!(binding_syntax("[a-b]"), None);
    }

    #[test]
    fn test_gather_bindings_keeps_attribute_order() {
        let template = Template::parse(
            "<button id=b (click)='this.add()' [title]=this.count></button>",
        )
        .unwrap();
        let button = dom::walk_elements(template.root()).remove(0);
        assert_eq!(
            gather_bindings(&button),
            vec![
                (BindingKind::Output, "click".to_string(), "this.add()".to_string()),
                (BindingKind::Input, "title".to_string(), "this.count".to_string()),
            ]
        );
    }

    #[test]
    fn test_parse_orders_bindings_in_preorder() {
        let template = Template::parse(
            "<div [title]=a><p [title]=b></p></div><span (click)=c()></span><i [title]=d></i>",
        )
        .unwrap();
        let compiler = Compiler::new();
        let owner = ComponentClass::of::<Counter>();
        let parsed = parse_template(template.root(), &owner, &[], &compiler).unwrap();

        let order: Vec<&str> = parsed.bindings.iter().map(|b| b.expression.as_str()).collect();
        assert_eq!(order, vec!["a", "b", "c()", "d"]);
        assert!(parsed.components.is_empty());
    }

    #[test]
    fn test_parse_records_attachment_points_and_compiles_children() {
        let template = Template::parse("<label></label><div><label></label></div>").unwrap();
        let compiler = Compiler::new();
        let owner = ComponentClass::of::<Counter>();
        let declared = [ComponentClass::of::<Label>()];
        let parsed = parse_template(template.root(), &owner, &declared, &compiler).unwrap();

        assert_eq!(parsed.components.len(), 2);
        assert!(Rc::ptr_eq(
            &parsed.components[0].blueprint,
            &parsed.components[1].blueprint
        ));
        assert!(parsed.unused.is_empty());
        assert!(compiler.get(ComponentClass::of::<Label>()).is_some());
    }

    #[test]
    fn test_unmatched_declared_child_is_reported_unused() {
        let template = Template::parse("<p>no children here</p>").unwrap();
        let compiler = Compiler::new();
        let owner = ComponentClass::of::<Counter>();
        let declared = [ComponentClass::of::<Label>()];
        let parsed = parse_template(template.root(), &owner, &declared, &compiler).unwrap();

        assert_eq!(parsed.unused, vec![ComponentClass::of::<Label>()]);
        assert!(compiler.get(ComponentClass::of::<Label>()).is_none());
    }
}
