//! Error taxonomy.
//!
//! Every variant carries a stable code in its message so diagnostics can be
//! grepped for regardless of the surrounding text.

use thiserror::Error;

pub const ERR_MISSING_METADATA: &str = "ZUI-CFG-001";
pub const ERR_UNUSED_COMPONENT: &str = "ZUI-CFG-002";
pub const ERR_RECURSIVE_COMPONENT: &str = "ZUI-CFG-003";
pub const ERR_TEMPLATE_PARSE: &str = "ZUI-CFG-004";
pub const ERR_INVALID_BINDING: &str = "ZUI-CFG-005";
pub const ERR_NO_HOST: &str = "ZUI-MNT-001";
pub const ERR_DUPLICATE_HOST: &str = "ZUI-MNT-002";
pub const ERR_EXPR_SYNTAX: &str = "ZUI-EXP-001";
pub const ERR_EXPR_UNSUPPORTED: &str = "ZUI-EXP-002";
pub const ERR_EXPR_RUNTIME: &str = "ZUI-EXP-003";

// ═══════════════════════════════════════════════════════════════════════════════
// CONFIGURATION
// ═══════════════════════════════════════════════════════════════════════════════

#[derive(Error, Debug, Clone, PartialEq)]
pub enum ConfigurationError {
    #[error("ZUI-CFG-001: component '{component}' has no metadata provider")]
    MissingMetadata { component: String },

    #[error("ZUI-CFG-002: '{parent}' declares '{component}' but its template never uses <{tag}>")]
    UnusedComponent {
        parent: String,
        component: String,
        tag: String,
    },

    #[error("ZUI-CFG-003: component '{component}' includes itself through its template")]
    RecursiveComponent { component: String },

    #[error("ZUI-CFG-004: template of '{component}' could not be parsed: {message}")]
    TemplateParse { component: String, message: String },

    #[error("ZUI-CFG-005: binding '{attribute}' in '{component}' is invalid: {source}")]
    InvalidBinding {
        component: String,
        attribute: String,
        source: ExpressionError,
    },
}

impl ConfigurationError {
    pub fn code(&self) -> &'static str {
        match self {
            Self::MissingMetadata { .. } => ERR_MISSING_METADATA,
            Self::UnusedComponent { .. } => ERR_UNUSED_COMPONENT,
            Self::RecursiveComponent { .. } => ERR_RECURSIVE_COMPONENT,
            Self::TemplateParse { .. } => ERR_TEMPLATE_PARSE,
            Self::InvalidBinding { .. } => ERR_INVALID_BINDING,
        }
    }

    /// Diagnostics that the compiler reports but does not stop on.
    pub fn is_fatal(&self) -> bool {
        !matches!(self, Self::UnusedComponent { .. })
    }
}

// ═══════════════════════════════════════════════════════════════════════════════
// MOUNT
// ═══════════════════════════════════════════════════════════════════════════════

#[derive(Error, Debug, Clone, PartialEq)]
pub enum MountError {
    #[error("ZUI-MNT-001: couldn't find {tag} element for app bootstrap")]
    NoHostElement { tag: String },

    #[error("ZUI-MNT-002: found {count} {tag} elements for app bootstrap, expected exactly one")]
    DuplicateHostElement { tag: String, count: usize },
}

impl MountError {
    pub fn code(&self) -> &'static str {
        match self {
            Self::NoHostElement { .. } => ERR_NO_HOST,
            Self::DuplicateHostElement { .. } => ERR_DUPLICATE_HOST,
        }
    }
}

// ═══════════════════════════════════════════════════════════════════════════════
// EXPRESSIONS
// ═══════════════════════════════════════════════════════════════════════════════

#[derive(Error, Debug, Clone, PartialEq)]
pub enum ExpressionError {
    #[error("ZUI-EXP-001: invalid expression syntax in `{source_text}`: {message}")]
    Syntax { source_text: String, message: String },

    #[error("ZUI-EXP-002: unsupported construct `{construct}` in `{source_text}`")]
    Unsupported {
        source_text: String,
        construct: String,
    },

    #[error("ZUI-EXP-003: unknown member '{member}'")]
    UnknownMember { member: String },

    #[error("ZUI-EXP-003: unknown method '{method}'")]
    UnknownMethod { method: String },

    #[error("ZUI-EXP-003: member '{member}' is read-only")]
    ReadOnly { member: String },

    #[error("ZUI-EXP-003: {message}")]
    Runtime { message: String },

    #[error("ZUI-EXP-003: component is already borrowed while evaluating `{source_text}`")]
    Reentrant { source_text: String },
}

impl ExpressionError {
    pub fn code(&self) -> &'static str {
        match self {
            Self::Syntax { .. } => ERR_EXPR_SYNTAX,
            Self::Unsupported { .. } => ERR_EXPR_UNSUPPORTED,
            _ => ERR_EXPR_RUNTIME,
        }
    }

    pub fn runtime(message: impl Into<String>) -> Self {
        Self::Runtime {
            message: message.into(),
        }
    }
}

// ═══════════════════════════════════════════════════════════════════════════════
// UMBRELLA
// ═══════════════════════════════════════════════════════════════════════════════

#[derive(Error, Debug, Clone, PartialEq)]
pub enum FrameworkError {
    #[error(transparent)]
    Configuration(#[from] ConfigurationError),

    #[error(transparent)]
    Mount(#[from] MountError),

    #[error(transparent)]
    Expression(#[from] ExpressionError),
}

impl FrameworkError {
    pub fn code(&self) -> &'static str {
        match self {
            Self::Configuration(e) => e.code(),
            Self::Mount(e) => e.code(),
            Self::Expression(e) => e.code(),
        }
    }
}

pub type Result<T, E = FrameworkError> = std::result::Result<T, E>;
