//! Components shared by the test modules.

use crate::component::{Component, ComponentClass, Metadata};
use crate::error::ExpressionError;
use crate::scope::Scope;
use crate::value::Value;
use std::cell::RefCell;

pub const COUNTER_TEMPLATE: &str = r#"
  <h3>Counter</h3>
  <input [value]=this.count >
  <button (click)='this.add()'>Increment</button>
  <button (click)='this.reset()'>Reset</button>
"#;

pub const APP_TEMPLATE: &str = r#"
  <h2>Counters</h2>
  <p>Each counter below has its own backing component instance.</p>
  <counter></counter>
  <counter></counter>
  <counter></counter>
"#;

fn read_only(member: &str) -> ExpressionError {
    ExpressionError::ReadOnly {
        member: member.to_string(),
    }
}

fn unknown_method(method: &str) -> ExpressionError {
    ExpressionError::UnknownMethod {
        method: method.to_string(),
    }
}

// ═══════════════════════════════════════════════════════════════════════════════
// COUNTER / APP
// ═══════════════════════════════════════════════════════════════════════════════

#[derive(Debug, Default)]
pub struct Counter {
    pub count: f64,
}

impl Scope for Counter {
    fn get(&self, member: &str) -> Option<Value> {
        match member {
            "count" => Some(Value::Number(self.count)),
            _ => None,
        }
    }

    fn set(&mut self, member: &str, value: Value) -> Result<(), ExpressionError> {
        match member {
            "count" => {
                self.count = value.to_number();
                Ok(())
            }
            _ => Err(read_only(member)),
        }
    }

    fn call(&mut self, method: &str, _args: &[Value]) -> Result<Value, ExpressionError> {
        match method {
            "add" => self.count += 1.0,
            "reset" => self.count = 0.0,
            _ => return Err(unknown_method(method)),
        }
        Ok(Value::Undefined)
    }
}

impl Component for Counter {
    fn metadata() -> Metadata {
        Metadata::new(COUNTER_TEMPLATE)
    }
}

#[derive(Debug, Default)]
pub struct App;

impl Scope for App {
    fn get(&self, _member: &str) -> Option<Value> {
        None
    }
}

impl Component for App {
    fn metadata() -> Metadata {
        Metadata::new(APP_TEMPLATE).component(ComponentClass::of::<Counter>())
    }
}

// ═══════════════════════════════════════════════════════════════════════════════
// SMALL LEAVES
// ═══════════════════════════════════════════════════════════════════════════════

#[derive(Debug)]
pub struct Label {
    pub text: String,
}

impl Default for Label {
    fn default() -> Self {
        Label {
            text: "label".to_string(),
        }
    }
}

impl Scope for Label {
    fn get(&self, member: &str) -> Option<Value> {
        match member {
            "text" => Some(Value::String(self.text.clone())),
            _ => None,
        }
    }
}

impl Component for Label {
    fn metadata() -> Metadata {
        Metadata::new("<span [title]=this.text>label</span>")
    }
}

#[derive(Debug, Default)]
pub struct MyWidget;

impl Scope for MyWidget {
    fn get(&self, _member: &str) -> Option<Value> {
        None
    }
}

impl Component for MyWidget {
    fn metadata() -> Metadata {
        Metadata::new("<p>my widget</p>")
    }
}

#[derive(Debug, Default)]
pub struct Widget;

impl Scope for Widget {
    fn get(&self, _member: &str) -> Option<Value> {
        None
    }
}

impl Component for Widget {
    fn metadata() -> Metadata {
        Metadata::new("<p>widget</p>")
    }
}

// ═══════════════════════════════════════════════════════════════════════════════
// CONFIGURATION EDGE CASES
// ═══════════════════════════════════════════════════════════════════════════════

/// Uses itself in its own template.
#[derive(Debug, Default)]
pub struct Ouroboros;

impl Scope for Ouroboros {
    fn get(&self, _member: &str) -> Option<Value> {
        None
    }
}

impl Component for Ouroboros {
    fn metadata() -> Metadata {
        Metadata::new("<ouroboros></ouroboros>").component(ComponentClass::of::<Ouroboros>())
    }
}

/// Declares a child it never renders.
#[derive(Debug, Default)]
pub struct Lonely;

impl Scope for Lonely {
    fn get(&self, _member: &str) -> Option<Value> {
        None
    }
}

impl Component for Lonely {
    fn metadata() -> Metadata {
        Metadata::new("<p>alone</p>").component(ComponentClass::of::<Label>())
    }
}

/// One unknown member, one good binding, one syntax error.
#[derive(Debug)]
pub struct Broken {
    pub count: f64,
}

impl Default for Broken {
    fn default() -> Self {
        Broken { count: 7.0 }
    }
}

impl Scope for Broken {
    fn get(&self, member: &str) -> Option<Value> {
        match member {
            "count" => Some(Value::Number(self.count)),
            _ => None,
        }
    }
}

impl Component for Broken {
    fn metadata() -> Metadata {
        Metadata::new(concat!(
            "<input id=missing [value]=this.missing>",
            "<input id=good [value]=this.count>",
            r#"<input id=syntax [value]="this.count +">"#,
        ))
    }
}

/// Increment handler calls a method that does not exist.
#[derive(Debug, Default)]
pub struct Clumsy {
    pub count: f64,
}

impl Scope for Clumsy {
    fn get(&self, member: &str) -> Option<Value> {
        match member {
            "count" => Some(Value::Number(self.count)),
            _ => None,
        }
    }

    fn set(&mut self, member: &str, value: Value) -> Result<(), ExpressionError> {
        match member {
            "count" => {
                self.count = value.to_number();
                Ok(())
            }
            _ => Err(read_only(member)),
        }
    }
}

impl Component for Clumsy {
    fn metadata() -> Metadata {
        Metadata::new("<input [value]=this.count><button (click)=this.nope()>+</button>")
    }
}

// ═══════════════════════════════════════════════════════════════════════════════
// HEAD CONTENT
// ═══════════════════════════════════════════════════════════════════════════════

/// Starts with elements an HTML parser would put in `<head>`.
#[derive(Debug)]
pub struct Themed {
    pub sheet: String,
}

impl Default for Themed {
    fn default() -> Self {
        Themed {
            sheet: "theme.css".to_string(),
        }
    }
}

impl Scope for Themed {
    fn get(&self, member: &str) -> Option<Value> {
        match member {
            "sheet" => Some(Value::String(self.sheet.clone())),
            "t" => Some(Value::String("tip".to_string())),
            _ => None,
        }
    }
}

impl Component for Themed {
    fn metadata() -> Metadata {
        Metadata::new(
            "<style>p { color: red }</style><link [href]=this.sheet><p [title]=this.t>x</p>",
        )
    }
}

#[derive(Debug, Default)]
pub struct Title;

impl Scope for Title {
    fn get(&self, _member: &str) -> Option<Value> {
        None
    }
}

impl Component for Title {
    fn metadata() -> Metadata {
        Metadata::new("<b>t</b>")
    }
}

/// Uses a child whose tag is `TITLE`.
#[derive(Debug, Default)]
pub struct Headed;

impl Scope for Headed {
    fn get(&self, _member: &str) -> Option<Value> {
        None
    }
}

impl Component for Headed {
    fn metadata() -> Metadata {
        Metadata::new("<title></title><p>body</p>").component(ComponentClass::of::<Title>())
    }
}

// ═══════════════════════════════════════════════════════════════════════════════
// ORDERING
// ═══════════════════════════════════════════════════════════════════════════════

thread_local! {
    /// Members read by [`Recorder`] and [`RecorderLeaf`], in read order.
    pub static READS: RefCell<Vec<String>> = const { RefCell::new(Vec::new()) };
}

pub fn take_reads() -> Vec<String> {
    READS.with(|reads| std::mem::take(&mut *reads.borrow_mut()))
}

fn record(member: &str) -> Option<Value> {
    READS.with(|reads| reads.borrow_mut().push(member.to_string()));
    Some(Value::String(member.to_string()))
}

/// Interleaves bindings and a child component across nesting levels.
#[derive(Debug, Default)]
pub struct Recorder;

impl Scope for Recorder {
    fn get(&self, member: &str) -> Option<Value> {
        record(member)
    }
}

impl Component for Recorder {
    fn metadata() -> Metadata {
        Metadata::new(concat!(
            "<div [title]=this.outer>",
            "<recorder-leaf [title]=this.host></recorder-leaf>",
            "<p [title]=this.inner></p>",
            "</div>",
            "<span [title]=this.after></span>",
        ))
        .component(ComponentClass::of::<RecorderLeaf>())
    }
}

#[derive(Debug, Default)]
pub struct RecorderLeaf;

impl Scope for RecorderLeaf {
    fn get(&self, member: &str) -> Option<Value> {
        record(member)
    }
}

impl Component for RecorderLeaf {
    fn metadata() -> Metadata {
        Metadata::new("<b [title]=this.leaf></b>")
    }
}

// ═══════════════════════════════════════════════════════════════════════════════
// HELPERS
// ═══════════════════════════════════════════════════════════════════════════════

pub fn document_with(body: &str) -> crate::dom::Document {
    crate::dom::Document::parse(&format!(
        "<!DOCTYPE html><html><head></head><body>{}</body></html>",
        body
    ))
    .unwrap()
}

/// `value` attribute of every `<input>` under `root`, in document order.
pub fn input_values(root: &markup5ever_rcdom::Handle) -> Vec<String> {
    crate::dom::find_elements_by_tag(root, "input")
        .iter()
        .map(|input| crate::dom::get_attribute(input, "value").unwrap_or_default())
        .collect()
}

/// The `index`th `<button>` under `root`.
pub fn button(root: &markup5ever_rcdom::Handle, index: usize) -> markup5ever_rcdom::Handle {
    crate::dom::find_elements_by_tag(root, "button").remove(index)
}
