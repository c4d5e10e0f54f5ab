//! Component Compiler
//!
//! Turns a component class into a [`Blueprint`] exactly once. The registry is
//! keyed by the class's `TypeId`; compiling a class again hands back the same
//! `Rc`. Child classes are compiled while their parent's template is being
//! parsed, so by the time a blueprint exists every blueprint below it does too.

use crate::binding::{BindingDescriptor, BindingKind};
use crate::component::ComponentClass;
use crate::dom::{self, Template};
use crate::error::ConfigurationError;
use crate::scope::{share, SharedScope};
use crate::template::{self, AttachableChild};
use markup5ever_rcdom::Handle;
use serde::{Deserialize, Serialize};
use std::any::TypeId;
use std::cell::RefCell;
use std::collections::HashMap;
use std::rc::Rc;
use tracing::{debug, instrument, trace, warn};

// ═══════════════════════════════════════════════════════════════════════════════
// OPTIONS
// ═══════════════════════════════════════════════════════════════════════════════

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct CompileOptions {
    /// Declared-but-unused child classes fail compilation instead of warning.
    pub strict_components: bool,
    /// Binding expressions that do not compile fail compilation instead of
    /// being skipped at attach time.
    pub strict_expressions: bool,
    /// Mount on the first of several matching host elements instead of failing.
    pub allow_duplicate_hosts: bool,
}

impl Default for CompileOptions {
    fn default() -> Self {
        CompileOptions {
            strict_components: false,
            strict_expressions: false,
            allow_duplicate_hosts: true,
        }
    }
}

impl CompileOptions {
    pub fn from_json(json: &str) -> Result<Self, serde_json::Error> {
        serde_json::from_str(json)
    }
}

// ═══════════════════════════════════════════════════════════════════════════════
// CONSTRUCTOR
// ═══════════════════════════════════════════════════════════════════════════════

/// Business objects for one new instance: its own plus one per attachable child.
pub struct Constructed {
    pub component: SharedScope,
    pub child_components: Vec<SharedScope>,
}

/// Construction plan fixed at compile time.
///
/// Creates the component's own business object, then one per attachable
/// child in template order, resolving each child class by name.
#[derive(Debug)]
pub struct Constructor {
    class: ComponentClass,
    child_names: Vec<&'static str>,
    components: HashMap<&'static str, ComponentClass>,
}

impl Constructor {
    fn new(class: ComponentClass, children: &[AttachableChild]) -> Self {
        let child_names = children.iter().map(|c| c.blueprint.class().name()).collect();
        let components = children
            .iter()
            .map(|c| (c.blueprint.class().name(), c.blueprint.class()))
            .collect();
        Constructor {
            class,
            child_names,
            components,
        }
    }

    pub fn construct(&self) -> Constructed {
        self.construct_with(share(self.class.construct()))
    }

    /// Like [`construct`](Self::construct), around a business object created elsewhere.
    pub fn construct_with(&self, component: SharedScope) -> Constructed {
        let child_components = self
            .child_names
            .iter()
            .filter_map(|name| self.components.get(name))
            .map(|class| share(class.construct()))
            .collect();
        Constructed {
            component,
            child_components,
        }
    }

    pub fn components(&self) -> &HashMap<&'static str, ComponentClass> {
        &self.components
    }
}

// ═══════════════════════════════════════════════════════════════════════════════
// BLUEPRINT
// ═══════════════════════════════════════════════════════════════════════════════

/// Everything needed to stamp out instances of one component class.
/// Immutable once built and shared by every instance of the class.
#[derive(Debug)]
pub struct Blueprint {
    class: ComponentClass,
    template: Template,
    bindings: Vec<BindingDescriptor>,
    children: Vec<AttachableChild>,
    constructor: Constructor,
    warnings: Vec<ConfigurationError>,
}

impl Blueprint {
    pub fn class(&self) -> ComponentClass {
        self.class
    }

    pub fn template(&self) -> &Template {
        &self.template
    }

    pub fn template_root(&self) -> &Handle {
        self.template.root()
    }

    pub fn bindings(&self) -> &[BindingDescriptor] {
        &self.bindings
    }

    pub fn children(&self) -> &[AttachableChild] {
        &self.children
    }

    /// Child component name to class.
    pub fn components(&self) -> &HashMap<&'static str, ComponentClass> {
        self.constructor.components()
    }

    pub fn constructor(&self) -> &Constructor {
        &self.constructor
    }

    pub fn warnings(&self) -> &[ConfigurationError] {
        &self.warnings
    }

    pub fn manifest(&self) -> BlueprintManifest {
        BlueprintManifest {
            component: self.class.name().to_string(),
            tag: self.class.tag_name(),
            bindings: self
                .bindings
                .iter()
                .map(|b| BindingManifest {
                    kind: b.kind,
                    name: b.name.clone(),
                    expression: b.expression.clone(),
                    target: dom::tag_name(&b.template_node).unwrap_or_default(),
                    dependencies: b.dependencies(),
                    error: b.program.as_ref().err().map(|e| e.to_string()),
                })
                .collect(),
            children: self.children.iter().map(|c| c.blueprint.manifest()).collect(),
            warnings: self.warnings.iter().map(|w| w.to_string()).collect(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct BlueprintManifest {
    pub component: String,
    pub tag: String,
    pub bindings: Vec<BindingManifest>,
    pub children: Vec<BlueprintManifest>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub warnings: Vec<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct BindingManifest {
    pub kind: BindingKind,
    pub name: String,
    pub expression: String,
    /// Tag of the template element the binding sits on.
    pub target: String,
    pub dependencies: Vec<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

// ═══════════════════════════════════════════════════════════════════════════════
// COMPILER
// ═══════════════════════════════════════════════════════════════════════════════

#[derive(Debug, Default)]
pub struct Compiler {
    options: CompileOptions,
    blueprints: RefCell<HashMap<TypeId, Rc<Blueprint>>>,
    /// Classes currently being compiled, outermost first.
    in_progress: RefCell<Vec<ComponentClass>>,
}

impl Compiler {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_options(options: CompileOptions) -> Self {
        Compiler {
            options,
            ..Self::default()
        }
    }

    pub fn options(&self) -> &CompileOptions {
        &self.options
    }

    /// Already-compiled blueprint for `class`, if any.
    pub fn get(&self, class: ComponentClass) -> Option<Rc<Blueprint>> {
        self.blueprints.borrow().get(&class.id()).cloned()
    }

    pub fn len(&self) -> usize {
        self.blueprints.borrow().len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    #[instrument(level = "debug", skip_all, fields(component = class.name()))]
    pub fn compile(&self, class: ComponentClass) -> Result<Rc<Blueprint>, ConfigurationError> {
        if let Some(existing) = self.get(class) {
            trace!("reusing compiled blueprint");
            return Ok(existing);
        }

        if self.in_progress.borrow().contains(&class) {
            return Err(ConfigurationError::RecursiveComponent {
                component: class.name().to_string(),
            });
        }

        let metadata = class.metadata()?;
        let template =
            Template::parse(&metadata.template).map_err(|e| ConfigurationError::TemplateParse {
                component: class.name().to_string(),
                message: e.to_string(),
            })?;

        self.in_progress.borrow_mut().push(class);
        let parsed = template::parse_template(template.root(), &class, &metadata.components, self);
        self.in_progress.borrow_mut().pop();
        let parsed = parsed?;

        let mut warnings = Vec::new();
        for unused in &parsed.unused {
            let diagnostic = ConfigurationError::UnusedComponent {
                parent: class.name().to_string(),
                component: unused.name().to_string(),
                tag: unused.tag_name(),
            };
            if self.options.strict_components {
                return Err(diagnostic);
            }
            warn!(code = diagnostic.code(), "{}", diagnostic);
            warnings.push(diagnostic);
        }

        let blueprint = Rc::new(Blueprint {
            class,
            constructor: Constructor::new(class, &parsed.components),
            template,
            bindings: parsed.bindings,
            children: parsed.components,
            warnings,
        });

        debug!(
            bindings = blueprint.bindings.len(),
            children = blueprint.children.len(),
            "compiled component"
        );
        self.blueprints
            .borrow_mut()
            .insert(class.id(), blueprint.clone());
        Ok(blueprint)
    }
}
