//! Expected-vs-actual comparison of resource properties.

use core::fmt::{self, Display};

use cfn_template::{Expr, Properties};
use owo_colors::{OwoColorize, Style};

/// One difference between the expected and the actual properties.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DiffLine {
    /// Both sides have a value at `path`, and they differ
    Changed {
        /// Location, e.g. `Properties.Tags[1].Value`
        path: String,
        /// Expected value, as compact JSON
        expected: String,
        /// Actual value, as compact JSON
        actual: String,
    },
    /// Expected a value at `path`, the resource has none
    Missing {
        /// Location of the missing value
        path: String,
        /// Expected value, as compact JSON
        expected: String,
    },
    /// The resource has a value at `path` that was not expected
    Unexpected {
        /// Location of the extra value
        path: String,
        /// Actual value, as compact JSON
        actual: String,
    },
}

impl DiffLine {
    /// Where the difference is.
    pub fn path(&self) -> &str {
        match self {
            DiffLine::Changed { path, .. }
            | DiffLine::Missing { path, .. }
            | DiffLine::Unexpected { path, .. } => path,
        }
    }
}

/// The differences between expected properties and one resource.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PropertyDiff {
    lines: Vec<DiffLine>,
    colors: bool,
}

impl PropertyDiff {
    /// The recorded differences, in the order of the expected keys.
    pub fn lines(&self) -> &[DiffLine] {
        &self.lines
    }

    /// True when nothing differs.
    pub fn is_empty(&self) -> bool {
        self.lines.is_empty()
    }

    /// Number of differing paths.
    pub fn len(&self) -> usize {
        self.lines.len()
    }

    fn paint(&self, text: &str, style: Style) -> String {
        if self.colors {
            text.style(style).to_string()
        } else {
            text.to_owned()
        }
    }
}

impl Display for PropertyDiff {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let bold = Style::new().bold();
        let red = Style::new().red();
        let green = Style::new().green();

        for line in &self.lines {
            match line {
                DiffLine::Changed {
                    path,
                    expected,
                    actual,
                } => {
                    writeln!(f, "{}:", self.paint(path, bold))?;
                    writeln!(f, "  {}", self.paint(&format!("- {expected}"), red))?;
                    writeln!(f, "  {}", self.paint(&format!("+ {actual}"), green))?;
                }
                DiffLine::Missing { path, expected } => {
                    writeln!(f, "{} (missing):", self.paint(path, bold))?;
                    writeln!(f, "  {}", self.paint(&format!("- {expected}"), red))?;
                }
                DiffLine::Unexpected { path, actual } => {
                    writeln!(f, "{} (unexpected):", self.paint(path, bold))?;
                    writeln!(f, "  {}", self.paint(&format!("+ {actual}"), green))?;
                }
            }
        }
        Ok(())
    }
}

/// Compare expected properties against a resource's properties.
///
/// Every expected key must be present. Extra top-level keys on the resource
/// are ignored; below the top level, extra map keys are differences unless
/// `value_extension` is set. Lists are compared position by position.
pub(crate) fn diff_properties(
    expected: &Properties,
    actual: &Properties,
    value_extension: bool,
    colors: bool,
) -> PropertyDiff {
    let mut differ = Differ {
        value_extension,
        lines: Vec::new(),
    };
    for (key, expected) in expected {
        let path = format!("Properties.{key}");
        match actual.get(key) {
            Some(actual) => differ.compare(expected, actual, &path),
            None => differ.lines.push(DiffLine::Missing {
                path,
                expected: expected.to_string(),
            }),
        }
    }
    PropertyDiff {
        lines: differ.lines,
        colors,
    }
}

struct Differ {
    value_extension: bool,
    lines: Vec<DiffLine>,
}

impl Differ {
    fn compare(&mut self, expected: &Expr, actual: &Expr, path: &str) {
        if expected == actual {
            return;
        }

        match (expected, actual) {
            (Expr::Map(expected), Expr::Map(actual)) => {
                for (key, value) in expected {
                    let path = format!("{path}.{key}");
                    match actual.get(key) {
                        Some(actual) => self.compare(value, actual, &path),
                        None => self.lines.push(DiffLine::Missing {
                            path,
                            expected: value.to_string(),
                        }),
                    }
                }
                if !self.value_extension {
                    for (key, value) in actual {
                        if !expected.contains_key(key) {
                            self.lines.push(DiffLine::Unexpected {
                                path: format!("{path}.{key}"),
                                actual: value.to_string(),
                            });
                        }
                    }
                }
            }
            (Expr::List(expected), Expr::List(actual)) if expected.len() == actual.len() => {
                self.compare_items(expected, actual, path);
            }
            (
                Expr::If {
                    condition: expected_condition,
                    then: expected_then,
                    otherwise: expected_otherwise,
                },
                Expr::If {
                    condition: actual_condition,
                    then: actual_then,
                    otherwise: actual_otherwise,
                },
            ) if expected_condition == actual_condition => {
                self.compare(expected_then, actual_then, &format!("{path}.Fn::If[1]"));
                self.compare(
                    expected_otherwise,
                    actual_otherwise,
                    &format!("{path}.Fn::If[2]"),
                );
            }
            (
                Expr::Join {
                    delimiter: expected_delimiter,
                    parts: expected_parts,
                },
                Expr::Join {
                    delimiter: actual_delimiter,
                    parts: actual_parts,
                },
            ) if expected_delimiter == actual_delimiter
                && expected_parts.len() == actual_parts.len() =>
            {
                self.compare_items(expected_parts, actual_parts, &format!("{path}.Fn::Join[1]"));
            }
            (
                Expr::Fn {
                    name: expected_name,
                    args: expected_args,
                },
                Expr::Fn {
                    name: actual_name,
                    args: actual_args,
                },
            ) if expected_name == actual_name => {
                self.compare(expected_args, actual_args, &format!("{path}.{expected_name}"));
            }
            _ => {
                tracing::trace!(
                    %path,
                    expected = expected.kind(),
                    actual = actual.kind(),
                    "values differ"
                );
                self.lines.push(DiffLine::Changed {
                    path: path.to_owned(),
                    expected: expected.to_string(),
                    actual: actual.to_string(),
                });
            }
        }
    }

    fn compare_items(&mut self, expected: &[Expr], actual: &[Expr], path: &str) {
        for (index, (expected, actual)) in expected.iter().zip(actual).enumerate() {
            self.compare(expected, actual, &format!("{path}[{index}]"));
        }
    }
}
