//! Error types for template parsing and synthesis.

use core::fmt::{self, Display};
use std::path::PathBuf;

/// A JSON value that cannot be read as an expression.
///
/// Raised for intrinsics with the wrong shape, e.g. an `Fn::If` with two
/// arguments or a `Ref` to something other than a string.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ExprError {
    /// The intrinsic (or section) being read, e.g. `Fn::If`
    pub context: String,
    /// What was wrong with it
    pub reason: String,
}

impl ExprError {
    /// Create a new expression error
    pub fn new(context: impl Into<String>, reason: impl Into<String>) -> Self {
        ExprError {
            context: context.into(),
            reason: reason.into(),
        }
    }
}

impl Display for ExprError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "malformed `{}`: {}", self.context, self.reason)
    }
}

impl std::error::Error for ExprError {}

/// Error type for loading, persisting and synthesizing templates.
#[derive(Debug)]
pub enum TemplateError {
    /// The template JSON could not be parsed or produced
    Json(serde_json::Error),
    /// Reading or writing a template file failed
    Io {
        /// The file or directory involved
        path: PathBuf,
        /// The underlying I/O error
        source: std::io::Error,
    },
    /// An expression was malformed
    Expr(ExprError),
    /// The same logical ID was declared twice in one section
    DuplicateLogicalId {
        /// Which section: `resource`, `parameter`, `condition` or `output`
        kind: &'static str,
        /// The duplicated ID
        id: String,
    },
    /// A `Ref`, `Fn::GetAtt` or `DependsOn` names something that is not declared
    UnresolvedReference {
        /// Where the reference appears, e.g. "resource `NATRoute`"
        from: String,
        /// The missing target
        target: String,
    },
    /// A condition is used but never declared
    UndeclaredCondition {
        /// Where the condition is used
        from: String,
        /// The missing condition name
        condition: String,
    },
}

impl Display for TemplateError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            TemplateError::Json(e) => write!(f, "invalid template JSON: {e}"),
            TemplateError::Io { path, source } => {
                write!(f, "I/O error on `{}`: {source}", path.display())
            }
            TemplateError::Expr(e) => write!(f, "{e}"),
            TemplateError::DuplicateLogicalId { kind, id } => {
                write!(f, "{kind} `{id}` is declared more than once")
            }
            TemplateError::UnresolvedReference { from, target } => {
                write!(f, "{from} references `{target}`, which is not declared")
            }
            TemplateError::UndeclaredCondition { from, condition } => {
                write!(f, "{from} uses condition `{condition}`, which is not declared")
            }
        }
    }
}

impl std::error::Error for TemplateError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            TemplateError::Json(e) => Some(e),
            TemplateError::Io { source, .. } => Some(source),
            TemplateError::Expr(e) => Some(e),
            _ => None,
        }
    }
}

impl From<serde_json::Error> for TemplateError {
    fn from(value: serde_json::Error) -> Self {
        TemplateError::Json(value)
    }
}

impl From<ExprError> for TemplateError {
    fn from(value: ExprError) -> Self {
        TemplateError::Expr(value)
    }
}
