//! Component classes and their metadata.
//!
//! A component is any [`Scope`] that can also describe its template and the
//! child components that template uses. [`ComponentClass`] is the type-erased
//! handle the compiler works with; its identity is the Rust type behind it.

use crate::error::ConfigurationError;
use crate::scope::Scope;
use lazy_static::lazy_static;
use regex::Regex;
use std::any::TypeId;
use std::fmt;
use std::hash::{Hash, Hasher};

lazy_static! {
    /// Lowercase-to-uppercase boundary inside a class name.
    static ref CAMEL_BOUNDARY: Regex = Regex::new(r"([a-z])([A-Z])").unwrap();
}

/// What a component declares about its own rendering.
#[derive(Debug, Clone, Default)]
pub struct Metadata {
    pub template: String,
    /// Child component classes the template may use, in declaration order.
    pub components: Vec<ComponentClass>,
}

impl Metadata {
    pub fn new(template: impl Into<String>) -> Self {
        Metadata {
            template: template.into(),
            components: Vec::new(),
        }
    }

    pub fn component(mut self, class: ComponentClass) -> Self {
        self.components.push(class);
        self
    }
}

pub trait Component: Scope + 'static {
    fn metadata() -> Metadata
    where
        Self: Sized;
}

#[derive(Clone, Copy)]
pub struct ComponentClass {
    id: TypeId,
    name: &'static str,
    metadata: Option<fn() -> Metadata>,
    construct: fn() -> Box<dyn Scope>,
}

fn construct_default<T: Scope + Default + 'static>() -> Box<dyn Scope> {
    Box::new(T::default())
}

/// `zoneui::fixtures::Counter` -> `Counter`
fn short_type_name(full: &'static str) -> &'static str {
    let base = full.split('<').next().unwrap_or(full);
    base.rsplit("::").next().unwrap_or(base)
}

impl ComponentClass {
    pub fn of<C: Component + Default>() -> Self {
        ComponentClass {
            id: TypeId::of::<C>(),
            name: short_type_name(std::any::type_name::<C>()),
            metadata: Some(C::metadata as fn() -> Metadata),
            construct: construct_default::<C>,
        }
    }

    /// A class that can be constructed but never compiled.
    pub fn without_metadata<T: Scope + Default + 'static>() -> Self {
        ComponentClass {
            id: TypeId::of::<T>(),
            name: short_type_name(std::any::type_name::<T>()),
            metadata: None,
            construct: construct_default::<T>,
        }
    }

    pub fn id(&self) -> TypeId {
        self.id
    }

    pub fn name(&self) -> &'static str {
        self.name
    }

    pub fn tag_name(&self) -> String {
        derive_tag_name(self.name)
    }

    pub fn metadata(&self) -> Result<Metadata, ConfigurationError> {
        match self.metadata {
            Some(provider) => Ok(provider()),
            None => Err(ConfigurationError::MissingMetadata {
                component: self.name.to_string(),
            }),
        }
    }

    /// Create a fresh business object.
    pub fn construct(&self) -> Box<dyn Scope> {
        (self.construct)()
    }
}

impl PartialEq for ComponentClass {
    fn eq(&self, other: &Self) -> bool {
        self.id == other.id
    }
}

impl Eq for ComponentClass {}

impl Hash for ComponentClass {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.id.hash(state);
    }
}

impl fmt::Debug for ComponentClass {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ComponentClass")
            .field("name", &self.name)
            .field("has_metadata", &self.metadata.is_some())
            .finish()
    }
}

/// `FooBar` -> `FOO-BAR`. Consecutive capitals are not split (`HTMLView` -> `HTMLVIEW`).
pub fn derive_tag_name(class_name: &str) -> String {
    CAMEL_BOUNDARY
        .replace_all(class_name, "$1-$2")
        .to_uppercase()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::fixtures::{Counter, MyWidget, Widget};
    use crate::scope::MapScope;

    #[test]
    fn test_tag_derivation() {
        assert_eq!(derive_tag_name("MyWidget"), "MY-WIDGET");
        assert_eq!(derive_tag_name("Widget"), "WIDGET");
        assert_eq!(derive_tag_name("FooBarBaz"), "FOO-BAR-BAZ");
        assert_eq!(derive_tag_name("HTMLView"), "HTMLVIEW");
        assert_eq!(derive_tag_name("counter"), "COUNTER");
    }

    #[test]
    fn test_tag_derivation_is_stable_per_class() {
        let widget = ComponentClass::of::<MyWidget>();
        assert_eq!(widget.name(), "MyWidget");
        assert_eq!(widget.tag_name(), "MY-WIDGET");
        assert_eq!(widget.tag_name(), widget.tag_name());
        assert_eq!(ComponentClass::of::<Widget>().tag_name(), "WIDGET");
    }

    #[test]
    fn test_identity_is_by_type() {
        assert_eq!(ComponentClass::of::<Counter>(), ComponentClass::of::<Counter>());
        assert_ne!(ComponentClass::of::<Counter>(), ComponentClass::of::<Widget>());
    }

    #[test]
    fn test_missing_metadata_fails_fast() {
        let class = ComponentClass::without_metadata::<MapScope>();
        let err = class.metadata().unwrap_err();
        assert_eq!(
            err,
            ConfigurationError::MissingMetadata {
                component: "MapScope".to_string()
            }
        );
    }

    #[test]
    fn test_construct_creates_fresh_objects() {
        let class = ComponentClass::of::<Counter>();
        let mut a = class.construct();
        let b = class.construct();
        a.call("add", &[]).unwrap();
        assert_eq!(a.get("count"), Some(crate::value::Value::Number(1.0)));
        assert_eq!(b.get("count"), Some(crate::value::Value::Number(0.0)));
    }
}
