//! Binding Expression Compiler
//!
//! Binding sources are parsed once with Oxc and lowered into a closed, owned
//! instruction set ([`Expr`]). Evaluation only ever touches the component
//! context it is handed: members are read through [`Scope::get`], written
//! through [`Scope::set`] and methods are invoked through [`Scope::call`].
//! Globals, arbitrary member chains, `new`, and function literals are rejected
//! when the binding is compiled, not when it runs.

use crate::error::ExpressionError;
use crate::scope::{Scope, SharedScope};
use crate::value::Value;
use oxc_allocator::Allocator;
use oxc_ast::ast::{AssignmentTarget, Expression, SimpleAssignmentTarget, Statement};
use oxc_parser::Parser;
use oxc_span::{GetSpan, SourceType, Span};
use oxc_syntax::operator::{
    AssignmentOperator, BinaryOperator, LogicalOperator, UnaryOperator, UpdateOperator,
};
use std::collections::BTreeSet;

// ═══════════════════════════════════════════════════════════════════════════════
// INSTRUCTION SET
// ═══════════════════════════════════════════════════════════════════════════════

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UnaryOp {
    Not,
    Negate,
    Plus,
    TypeOf,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BinaryOp {
    Eq,
    NotEq,
    StrictEq,
    StrictNotEq,
    Lt,
    LtEq,
    Gt,
    GtEq,
    Add,
    Sub,
    Mul,
    Div,
    Rem,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LogicalOp {
    And,
    Or,
    Coalesce,
}

#[derive(Debug, Clone, PartialEq)]
pub enum Expr {
    Literal(Value),
    /// `quasis.len() == expressions.len() + 1`
    Template {
        quasis: Vec<String>,
        expressions: Vec<Expr>,
    },
    /// Context member read (`this.count` or `count`).
    Member(String),
    /// Context method call (`this.add(1)` or `add(1)`).
    Call { method: String, args: Vec<Expr> },
    Unary {
        operator: UnaryOp,
        argument: Box<Expr>,
    },
    Binary {
        operator: BinaryOp,
        left: Box<Expr>,
        right: Box<Expr>,
    },
    Logical {
        operator: LogicalOp,
        left: Box<Expr>,
        right: Box<Expr>,
    },
    Conditional {
        test: Box<Expr>,
        consequent: Box<Expr>,
        alternate: Box<Expr>,
    },
    /// `member = value`, or `member op= value` when `operator` is set.
    Assign {
        member: String,
        operator: Option<BinaryOp>,
        value: Box<Expr>,
    },
    Update {
        member: String,
        increment: bool,
        prefix: bool,
    },
    Sequence(Vec<Expr>),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ExpressionKind {
    /// Value expression feeding a DOM attribute.
    Input,
    /// Statement list run when an event fires.
    Output,
}

/// A binding source compiled against nothing but the component context.
#[derive(Debug, Clone, PartialEq)]
pub struct CompiledExpression {
    pub source: String,
    pub kind: ExpressionKind,
    pub program: Expr,
    /// Context members the program reads.
    pub dependencies: BTreeSet<String>,
}

// ═══════════════════════════════════════════════════════════════════════════════
// COMPILATION
// ═══════════════════════════════════════════════════════════════════════════════

/// Compile an input binding: exactly one expression.
pub fn compile_input(source: &str) -> Result<CompiledExpression, ExpressionError> {
    let trimmed = source.trim();
    if trimmed.is_empty() {
        return Err(syntax(source, "empty expression"));
    }

    let allocator = Allocator::default();
    let parsed = Parser::new(&allocator, trimmed, SourceType::default())
        .parse_expression()
        .map_err(|errors| syntax(source, format!("{:?}", errors)))?;

    if (parsed.span().end as usize) < trimmed.len() {
        return Err(syntax(source, "unexpected trailing input"));
    }

    let mut lowering = Lowering::new(trimmed);
    let program = lowering.lower(&parsed)?;

    Ok(CompiledExpression {
        source: source.to_string(),
        kind: ExpressionKind::Input,
        program,
        dependencies: lowering.dependencies,
    })
}

/// Compile an output binding: one or more expression statements.
pub fn compile_output(source: &str) -> Result<CompiledExpression, ExpressionError> {
    let trimmed = source.trim();
    let allocator = Allocator::default();
    let ret = Parser::new(&allocator, trimmed, SourceType::default()).parse();

    if !ret.errors.is_empty() {
        return Err(syntax(source, format!("{:?}", ret.errors)));
    }

    let mut lowering = Lowering::new(trimmed);
    let mut steps = Vec::new();
    for stmt in &ret.program.body {
        match stmt {
            Statement::ExpressionStatement(s) => steps.push(lowering.lower(&s.expression)?),
            Statement::EmptyStatement(_) => {}
            other => return Err(lowering.unsupported(other.span())),
        }
    }

    let program = if steps.len() == 1 {
        steps.remove(0)
    } else {
        Expr::Sequence(steps)
    };

    Ok(CompiledExpression {
        source: source.to_string(),
        kind: ExpressionKind::Output,
        program,
        dependencies: lowering.dependencies,
    })
}

fn syntax(source: &str, message: impl Into<String>) -> ExpressionError {
    ExpressionError::Syntax {
        source_text: source.to_string(),
        message: message.into(),
    }
}

struct Lowering<'s> {
    source: &'s str,
    dependencies: BTreeSet<String>,
}

impl<'s> Lowering<'s> {
    fn new(source: &'s str) -> Self {
        Self {
            source,
            dependencies: BTreeSet::new(),
        }
    }

    fn unsupported(&self, span: Span) -> ExpressionError {
        let construct = self
            .source
            .get(span.start as usize..span.end as usize)
            .unwrap_or(self.source);
        ExpressionError::Unsupported {
            source_text: self.source.to_string(),
            construct: construct.to_string(),
        }
    }

    fn read(&mut self, member: String) -> Expr {
        self.dependencies.insert(member.clone());
        Expr::Member(member)
    }

    fn lower(&mut self, expr: &Expression<'_>) -> Result<Expr, ExpressionError> {
        match expr {
            Expression::BooleanLiteral(lit) => Ok(Expr::Literal(Value::Bool(lit.value))),
            Expression::NullLiteral(_) => Ok(Expr::Literal(Value::Null)),
            Expression::NumericLiteral(lit) => Ok(Expr::Literal(Value::Number(lit.value))),
            Expression::StringLiteral(lit) => {
                Ok(Expr::Literal(Value::String(lit.value.to_string())))
            }

            Expression::TemplateLiteral(tpl) => {
                let quasis = tpl
                    .quasis
                    .iter()
                    .map(|q| match &q.value.cooked {
                        Some(cooked) => cooked.to_string(),
                        None => q.value.raw.to_string(),
                    })
                    .collect();
                let expressions = tpl
                    .expressions
                    .iter()
                    .map(|e| self.lower(e))
                    .collect::<Result<Vec<_>, _>>()?;
                Ok(Expr::Template {
                    quasis,
                    expressions,
                })
            }

            Expression::Identifier(id) => match id.name.as_str() {
                "undefined" => Ok(Expr::Literal(Value::Undefined)),
                "NaN" => Ok(Expr::Literal(Value::Number(f64::NAN))),
                "Infinity" => Ok(Expr::Literal(Value::Number(f64::INFINITY))),
                name => Ok(self.read(name.to_string())),
            },

            Expression::StaticMemberExpression(m) if is_context(&m.object) && !m.optional => {
                Ok(self.read(m.property.name.to_string()))
            }

            Expression::ComputedMemberExpression(m) if is_context(&m.object) && !m.optional => {
                match &m.expression {
                    Expression::StringLiteral(key) => Ok(self.read(key.value.to_string())),
                    _ => Err(self.unsupported(m.span)),
                }
            }

            Expression::CallExpression(call) if !call.optional => {
                let method = match &call.callee {
                    Expression::Identifier(id) => id.name.to_string(),
                    Expression::StaticMemberExpression(m) if is_context(&m.object) => {
                        m.property.name.to_string()
                    }
                    _ => return Err(self.unsupported(call.span)),
                };
                let mut args = Vec::with_capacity(call.arguments.len());
                for arg in &call.arguments {
                    match arg.as_expression() {
                        Some(e) => args.push(self.lower(e)?),
                        None => return Err(self.unsupported(arg.span())),
                    }
                }
                Ok(Expr::Call { method, args })
            }

            Expression::UnaryExpression(u) => {
                let operator = match u.operator {
                    UnaryOperator::LogicalNot => UnaryOp::Not,
                    UnaryOperator::UnaryNegation => UnaryOp::Negate,
                    UnaryOperator::UnaryPlus => UnaryOp::Plus,
                    UnaryOperator::Typeof => UnaryOp::TypeOf,
                    _ => return Err(self.unsupported(u.span)),
                };
                Ok(Expr::Unary {
                    operator,
                    argument: Box::new(self.lower(&u.argument)?),
                })
            }

            Expression::BinaryExpression(b) => {
                let operator = binary_op(b.operator).ok_or_else(|| self.unsupported(b.span))?;
                Ok(Expr::Binary {
                    operator,
                    left: Box::new(self.lower(&b.left)?),
                    right: Box::new(self.lower(&b.right)?),
                })
            }

            Expression::LogicalExpression(l) => {
                let operator = match l.operator {
                    LogicalOperator::And => LogicalOp::And,
                    LogicalOperator::Or => LogicalOp::Or,
                    LogicalOperator::Coalesce => LogicalOp::Coalesce,
                };
                Ok(Expr::Logical {
                    operator,
                    left: Box::new(self.lower(&l.left)?),
                    right: Box::new(self.lower(&l.right)?),
                })
            }

            Expression::ConditionalExpression(c) => Ok(Expr::Conditional {
                test: Box::new(self.lower(&c.test)?),
                consequent: Box::new(self.lower(&c.consequent)?),
                alternate: Box::new(self.lower(&c.alternate)?),
            }),

            Expression::AssignmentExpression(a) => {
                let member = match &a.left {
                    AssignmentTarget::AssignmentTargetIdentifier(id) => id.name.to_string(),
                    AssignmentTarget::StaticMemberExpression(m) if is_context(&m.object) => {
                        m.property.name.to_string()
                    }
                    target => return Err(self.unsupported(target.span())),
                };
                let operator = match a.operator {
                    AssignmentOperator::Assign => None,
                    AssignmentOperator::Addition => Some(BinaryOp::Add),
                    AssignmentOperator::Subtraction => Some(BinaryOp::Sub),
                    AssignmentOperator::Multiplication => Some(BinaryOp::Mul),
                    AssignmentOperator::Division => Some(BinaryOp::Div),
                    AssignmentOperator::Remainder => Some(BinaryOp::Rem),
                    _ => return Err(self.unsupported(a.span)),
                };
                if operator.is_some() {
                    self.dependencies.insert(member.clone());
                }
                Ok(Expr::Assign {
                    member,
                    operator,
                    value: Box::new(self.lower(&a.right)?),
                })
            }

            Expression::UpdateExpression(u) => {
                let member = match &u.argument {
                    SimpleAssignmentTarget::AssignmentTargetIdentifier(id) => id.name.to_string(),
                    SimpleAssignmentTarget::StaticMemberExpression(m) if is_context(&m.object) => {
                        m.property.name.to_string()
                    }
                    _ => return Err(self.unsupported(u.span)),
                };
                self.dependencies.insert(member.clone());
                Ok(Expr::Update {
                    member,
                    increment: u.operator == UpdateOperator::Increment,
                    prefix: u.prefix,
                })
            }

            Expression::ParenthesizedExpression(p) => self.lower(&p.expression),

            Expression::SequenceExpression(s) => Ok(Expr::Sequence(
                s.expressions
                    .iter()
                    .map(|e| self.lower(e))
                    .collect::<Result<Vec<_>, _>>()?,
            )),

            other => Err(self.unsupported(other.span())),
        }
    }
}

fn is_context(object: &Expression<'_>) -> bool {
    matches!(object, Expression::ThisExpression(_))
}

fn binary_op(op: BinaryOperator) -> Option<BinaryOp> {
    Some(match op {
        BinaryOperator::Equality => BinaryOp::Eq,
        BinaryOperator::Inequality => BinaryOp::NotEq,
        BinaryOperator::StrictEquality => BinaryOp::StrictEq,
        BinaryOperator::StrictInequality => BinaryOp::StrictNotEq,
        BinaryOperator::LessThan => BinaryOp::Lt,
        BinaryOperator::LessEqualThan => BinaryOp::LtEq,
        BinaryOperator::GreaterThan => BinaryOp::Gt,
        BinaryOperator::GreaterEqualThan => BinaryOp::GtEq,
        BinaryOperator::Addition => BinaryOp::Add,
        BinaryOperator::Subtraction => BinaryOp::Sub,
        BinaryOperator::Multiplication => BinaryOp::Mul,
        BinaryOperator::Division => BinaryOp::Div,
        BinaryOperator::Remainder => BinaryOp::Rem,
        _ => return None,
    })
}

// ═══════════════════════════════════════════════════════════════════════════════
// EVALUATION
// ═══════════════════════════════════════════════════════════════════════════════

impl CompiledExpression {
    pub fn evaluate(&self, scope: &mut dyn Scope) -> Result<Value, ExpressionError> {
        eval(&self.program, scope)
    }

    /// Evaluate against a shared business object.
    ///
    /// Fails with [`ExpressionError::Reentrant`] if the object is already
    /// borrowed, e.g. a handler that synchronously dispatches another event
    /// into the same component.
    pub fn evaluate_shared(&self, scope: &SharedScope) -> Result<Value, ExpressionError> {
        let mut guard = scope
            .try_borrow_mut()
            .map_err(|_| ExpressionError::Reentrant {
                source_text: self.source.clone(),
            })?;
        self.evaluate(&mut **guard)
    }
}

fn read_member(scope: &dyn Scope, member: &str) -> Result<Value, ExpressionError> {
    scope.get(member).ok_or_else(|| ExpressionError::UnknownMember {
        member: member.to_string(),
    })
}

fn eval(expr: &Expr, scope: &mut dyn Scope) -> Result<Value, ExpressionError> {
    match expr {
        Expr::Literal(v) => Ok(v.clone()),

        Expr::Template {
            quasis,
            expressions,
        } => {
            let mut out = String::new();
            for (i, quasi) in quasis.iter().enumerate() {
                out.push_str(quasi);
                if let Some(e) = expressions.get(i) {
                    out.push_str(&eval(e, scope)?.to_string());
                }
            }
            Ok(Value::String(out))
        }

        Expr::Member(name) => read_member(scope, name),

        Expr::Call { method, args } => {
            let values = args
                .iter()
                .map(|a| eval(a, scope))
                .collect::<Result<Vec<_>, _>>()?;
            scope.call(method, &values)
        }

        Expr::Unary { operator, argument } => {
            let v = eval(argument, scope)?;
            Ok(match operator {
                UnaryOp::Not => Value::Bool(!v.is_truthy()),
                UnaryOp::Negate => Value::Number(-v.to_number()),
                UnaryOp::Plus => Value::Number(v.to_number()),
                UnaryOp::TypeOf => Value::String(v.type_of().to_string()),
            })
        }

        Expr::Binary {
            operator,
            left,
            right,
        } => {
            let l = eval(left, scope)?;
            let r = eval(right, scope)?;
            Ok(apply_binary(*operator, &l, &r))
        }

        Expr::Logical {
            operator,
            left,
            right,
        } => {
            let l = eval(left, scope)?;
            let short_circuit = match operator {
                LogicalOp::And => !l.is_truthy(),
                LogicalOp::Or => l.is_truthy(),
                LogicalOp::Coalesce => !l.is_nullish(),
            };
            if short_circuit {
                Ok(l)
            } else {
                eval(right, scope)
            }
        }

        Expr::Conditional {
            test,
            consequent,
            alternate,
        } => {
            if eval(test, scope)?.is_truthy() {
                eval(consequent, scope)
            } else {
                eval(alternate, scope)
            }
        }

        Expr::Assign {
            member,
            operator,
            value,
        } => {
            let rhs = eval(value, scope)?;
            let next = match operator {
                Some(op) => apply_binary(*op, &read_member(scope, member)?, &rhs),
                None => rhs,
            };
            scope.set(member, next.clone())?;
            Ok(next)
        }

        Expr::Update {
            member,
            increment,
            prefix,
        } => {
            let old = read_member(scope, member)?.to_number();
            let new = if *increment { old + 1.0 } else { old - 1.0 };
            scope.set(member, Value::Number(new))?;
            Ok(Value::Number(if *prefix { new } else { old }))
        }

        Expr::Sequence(steps) => {
            let mut last = Value::Undefined;
            for step in steps {
                last = eval(step, scope)?;
            }
            Ok(last)
        }
    }
}

fn apply_binary(op: BinaryOp, l: &Value, r: &Value) -> Value {
    match op {
        BinaryOp::Eq => Value::Bool(l.loose_eq(r)),
        BinaryOp::NotEq => Value::Bool(!l.loose_eq(r)),
        BinaryOp::StrictEq => Value::Bool(l.strict_eq(r)),
        BinaryOp::StrictNotEq => Value::Bool(!l.strict_eq(r)),
        BinaryOp::Lt | BinaryOp::LtEq | BinaryOp::Gt | BinaryOp::GtEq => {
            Value::Bool(compare(op, l, r))
        }
        BinaryOp::Add => match (l, r) {
            (Value::String(_), _) | (_, Value::String(_)) => {
                Value::String(format!("{}{}", l, r))
            }
            _ => Value::Number(l.to_number() + r.to_number()),
        },
        BinaryOp::Sub => Value::Number(l.to_number() - r.to_number()),
        BinaryOp::Mul => Value::Number(l.to_number() * r.to_number()),
        BinaryOp::Div => Value::Number(l.to_number() / r.to_number()),
        BinaryOp::Rem => Value::Number(l.to_number() % r.to_number()),
    }
}

fn compare(op: BinaryOp, l: &Value, r: &Value) -> bool {
    if let (Value::String(a), Value::String(b)) = (l, r) {
        return match op {
            BinaryOp::Lt => a < b,
            BinaryOp::LtEq => a <= b,
            BinaryOp::Gt => a > b,
            _ => a >= b,
        };
    }
    // NaN compares false on every side
    let (a, b) = (l.to_number(), r.to_number());
    match op {
        BinaryOp::Lt => a < b,
        BinaryOp::LtEq => a <= b,
        BinaryOp::Gt => a > b,
        _ => a >= b,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::scope::MapScope;

    struct Tally {
        count: f64,
        calls: Vec<String>,
    }

    impl Scope for Tally {
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
                _ => Err(ExpressionError::ReadOnly {
                    member: member.to_string(),
                }),
            }
        }

        fn call(&mut self, method: &str, args: &[Value]) -> Result<Value, ExpressionError> {
            self.calls.push(method.to_string());
            match method {
                "add" => {
                    self.count += args.first().map(Value::to_number).unwrap_or(1.0);
                    Ok(Value::Undefined)
                }
                _ => Err(ExpressionError::UnknownMethod {
                    method: method.to_string(),
                }),
            }
        }
    }

    fn tally() -> Tally {
        Tally {
            count: 0.0,
            calls: Vec::new(),
        }
    }

    #[test]
    fn test_input_reads_context_member() {
        let compiled = compile_input("this.count").unwrap();
        assert_eq!(compiled.program, Expr::Member("count".to_string()));
        assert!(compiled.dependencies.contains("count"));

        let mut scope = tally();
        assert_eq!(compiled.evaluate(&mut scope).unwrap(), Value::Number(0.0));
    }

    #[test]
    fn test_bare_identifier_resolves_against_context() {
        let compiled = compile_input("count + 1").unwrap();
        let mut scope = MapScope::new().with("count", 41);
        assert_eq!(compiled.evaluate(&mut scope).unwrap(), Value::Number(42.0));
    }

    #[test]
    fn test_output_calls_context_method() {
        let compiled = compile_output("this.add()").unwrap();
        assert_eq!(compiled.kind, ExpressionKind::Output);

        let mut scope = tally();
        compiled.evaluate(&mut scope).unwrap();
        compiled.evaluate(&mut scope).unwrap();
        assert_eq!(scope.count, 2.0);
        assert_eq!(scope.calls, vec!["add", "add"]);
    }

    #[test]
    fn test_output_statement_list_runs_in_order() {
        let compiled = compile_output("this.count = 5; this.count++; this.add(10)").unwrap();
        let mut scope = tally();
        compiled.evaluate(&mut scope).unwrap();
        assert_eq!(scope.count, 16.0);
    }

    #[test]
    fn test_template_literal_and_conditional() {
        let compiled = compile_input("`Count: ${this.count > 1 ? 'many' : count}`").unwrap();
        let mut scope = MapScope::new().with("count", 1);
        assert_eq!(
            compiled.evaluate(&mut scope).unwrap(),
            Value::String("Count: 1".to_string())
        );
        scope.set("count", Value::from(3)).unwrap();
        assert_eq!(
            compiled.evaluate(&mut scope).unwrap(),
            Value::String("Count: many".to_string())
        );
    }

    #[test]
    fn test_logical_short_circuit_skips_call() {
        let compiled = compile_output("this.count > 0 && this.add(1)").unwrap();
        let mut scope = tally();
        compiled.evaluate(&mut scope).unwrap();
        assert!(scope.calls.is_empty());
    }

    #[test]
    fn test_globals_are_rejected_at_compile_time() {
        let err = compile_input("window.location").unwrap_err();
        assert!(matches!(err, ExpressionError::Unsupported { .. }));

        let err = compile_output("this.count = new Date()").unwrap_err();
        assert!(matches!(err, ExpressionError::Unsupported { .. }));

        let err = compile_input("this.a.b").unwrap_err();
        assert!(matches!(err, ExpressionError::Unsupported { .. }));
    }

    #[test]
    fn test_syntax_errors_are_reported() {
        assert!(matches!(
            compile_input("this.count +").unwrap_err(),
            ExpressionError::Syntax { .. }
        ));
        assert!(matches!(
            compile_input("   ").unwrap_err(),
            ExpressionError::Syntax { .. }
        ));
    }

    #[test]
    fn test_unknown_member_is_a_runtime_error() {
        let compiled = compile_input("this.missing").unwrap();
        let mut scope = tally();
        assert_eq!(
            compiled.evaluate(&mut scope).unwrap_err(),
            ExpressionError::UnknownMember {
                member: "missing".to_string()
            }
        );
    }

    #[test]
    fn test_string_concatenation_and_typeof() {
        let compiled = compile_input("'n=' + this.count + ':' + typeof this.count").unwrap();
        let mut scope = MapScope::new().with("count", 7);
        assert_eq!(
            compiled.evaluate(&mut scope).unwrap(),
            Value::String("n=7:number".to_string())
        );
    }

    #[test]
    fn test_evaluate_shared_detects_reentrancy() {
        let shared = crate::scope::share(Box::new(tally()));
        let compiled = compile_input("this.count").unwrap();
        let _held = shared.borrow();
        assert!(matches!(
            compiled.evaluate_shared(&shared).unwrap_err(),
            ExpressionError::Reentrant { .. }
        ));
    }
}
