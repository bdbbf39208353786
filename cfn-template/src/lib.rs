#![warn(missing_docs)]
#![forbid(unsafe_code)]
#![doc = include_str!("../README.md")]

mod error;
mod expr;
mod stack;
mod template;

pub use error::{ExprError, TemplateError};
pub use expr::{Expr, Literal};
pub use stack::{FORMAT_VERSION, Stack};
pub use template::{Output, Parameter, Properties, Resource, Template, properties_from_json};
