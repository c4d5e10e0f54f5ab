//! # zoneui
//!
//! A small component framework that compiles string templates once per
//! component class and stamps out live trees from them.
//!
//! ## Pipeline
//!
//! 1. **Compile**: `Compiler::compile` parses a class's template with html5ever,
//!    extracts `[attr]=expr` / `(event)=expr` bindings in document pre-order and
//!    recursively compiles every declared child component whose tag appears.
//!    Each class yields exactly one `Blueprint`, shared by all of its instances.
//!
//! 2. **Attach**: `attach` clones the blueprint's template into a host element.
//!    Attach callbacks are keyed by template node and run on the matching clone,
//!    so instances never share live nodes or state.
//!
//! 3. **Tick**: input bindings register a refresh with the application's `Zone`.
//!    Every event handler installed through the zone triggers one synchronous
//!    pass over all refreshes once it returns.
//!
//! ## Expression Invariants
//!
//! - Binding expressions see only the component's `Scope`: no globals, no
//!   member chains beyond `this.member`, no constructors or function literals.
//! - Anything outside that set is rejected when the blueprint is compiled.
//! - A binding that fails at runtime is logged and skipped; its siblings and
//!   the rest of the tick carry on.

pub mod binding;
pub mod bootstrap;
pub mod compiler;
pub mod component;
pub mod dom;
pub mod error;
pub mod events;
pub mod expression;
pub mod instance;
pub mod scope;
pub mod template;
pub mod value;
pub mod zone;

#[cfg(test)]
mod fixtures;


pub use binding::{BindingDescriptor, BindingKind};
pub use bootstrap::{bootstrap, bootstrap_with_options, Application};
pub use compiler::{Blueprint, BlueprintManifest, CompileOptions, Compiler};
pub use component::{derive_tag_name, Component, ComponentClass, Metadata};
pub use dom::Document;
pub use error::{ConfigurationError, ExpressionError, FrameworkError, MountError, Result};
pub use events::{EventDispatcher, EventTarget, Handler};
pub use instance::{attach, ComponentInstance};
pub use scope::{MapScope, Scope, SharedScope};
pub use template::AttachableChild;
pub use value::Value;
pub use zone::{TickId, TickReport, Zone};
