//! Verification failures.

use core::fmt::{self, Display};

use crate::diff::PropertyDiff;

/// What a lookup was searching for when it found nothing.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Lookup {
    /// A resource type, e.g. `AWS::EC2::EIP`
    Type(String),
    /// A logical ID pattern, e.g. `NATRoute.*`
    IdPattern(String),
}

/// A resource whose condition is not the expected one.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ConditionFinding {
    /// Logical ID of the resource
    pub id: String,
    /// The condition it actually carries, if any
    pub actual: Option<String>,
}

/// Why a template failed verification.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum VerifyError {
    /// The number of resources of a type is not the expected one
    CountMismatch {
        /// The resource type counted
        type_name: String,
        /// Expected count
        expected: usize,
        /// Actual count
        actual: usize,
    },
    /// Resources of the type exist, but none has the expected properties
    PropertyMismatch {
        /// The resource type searched
        type_name: String,
        /// How many resources of that type were compared
        candidates: usize,
        /// Logical ID of the candidate with the fewest differences
        nearest: String,
        /// Expected-vs-actual differences for `nearest`
        diff: PropertyDiff,
    },
    /// Nothing in the template matches the lookup
    MissingResource {
        /// What was searched for
        lookup: Lookup,
        /// A known resource type with a similar name
        suggestion: Option<String>,
    },
    /// Resources matching a pattern do not all carry the expected condition
    ConditionMismatch {
        /// The logical ID pattern
        pattern: String,
        /// The condition every match should carry
        expected: String,
        /// Every match that does not carry it
        findings: Vec<ConditionFinding>,
    },
}

impl Display for VerifyError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            VerifyError::CountMismatch {
                type_name,
                expected,
                actual,
            } => write!(
                f,
                "expected {expected} resource(s) of type `{type_name}`, found {actual}"
            ),
            VerifyError::PropertyMismatch {
                type_name,
                candidates,
                nearest,
                diff,
            } => write!(
                f,
                "none of the {candidates} resource(s) of type `{type_name}` has the expected properties; closest is `{nearest}`:\n{diff}"
            ),
            VerifyError::MissingResource { lookup, suggestion } => {
                match lookup {
                    Lookup::Type(type_name) => {
                        write!(f, "no resource of type `{type_name}` in template")?
                    }
                    Lookup::IdPattern(pattern) => {
                        write!(f, "no resource with a logical ID matching `/{pattern}/`")?
                    }
                }
                if let Some(suggestion) = suggestion {
                    write!(f, " (did you mean `{suggestion}`?)")?;
                }
                Ok(())
            }
            VerifyError::ConditionMismatch {
                pattern,
                expected,
                findings,
            } => {
                write!(
                    f,
                    "resources matching `/{pattern}/` should have condition `{expected}`:"
                )?;
                for finding in findings {
                    match &finding.actual {
                        Some(actual) => {
                            write!(f, "\n  `{}` has condition `{actual}`", finding.id)?
                        }
                        None => write!(f, "\n  `{}` has no condition", finding.id)?,
                    }
                }
                Ok(())
            }
        }
    }
}

impl std::error::Error for VerifyError {}
