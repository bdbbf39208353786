//! The checks themselves.

use cfn_template::{Properties, Template};
use regex::Regex;

use crate::diff::{PropertyDiff, diff_properties};
use crate::error::{ConditionFinding, Lookup, VerifyError};

/// Minimum Jaro-Winkler similarity for a type to be offered as a suggestion.
const SUGGESTION_THRESHOLD: f64 = 0.9;

/// Options for customizing property matching and failure rendering.
///
/// ```
/// use cfn_assert::VerifyOptions;
///
/// let options = VerifyOptions::new().value_extension(true).colors(false);
/// ```
#[derive(Debug, Clone, Default)]
pub struct VerifyOptions {
    /// Allow extra keys in nested maps of the actual properties.
    value_extension: bool,
    /// Render diffs with ANSI colors.
    colors: bool,
}

impl VerifyOptions {
    /// Exact nested matching, no colors.
    pub fn new() -> Self {
        Self::default()
    }

    /// Defaults, with colors unless `NO_COLOR` is set.
    pub fn from_env() -> Self {
        Self::new().colors(std::env::var_os("NO_COLOR").is_none())
    }

    /// Let nested maps in the actual value carry keys the expectation does
    /// not mention.
    pub fn value_extension(mut self, enabled: bool) -> Self {
        self.value_extension = enabled;
        self
    }

    /// Render failure diffs with ANSI colors.
    pub fn colors(mut self, enabled: bool) -> Self {
        self.colors = enabled;
        self
    }
}

/// Check that exactly `expected` resources have type `type_name`.
pub fn check_resource_count(
    template: &Template,
    type_name: &str,
    expected: usize,
) -> Result<(), VerifyError> {
    let actual = template.resources_of_type(type_name).count();
    tracing::debug!(type_name, expected, actual, "counted resources");
    if actual == expected {
        Ok(())
    } else {
        Err(VerifyError::CountMismatch {
            type_name: type_name.to_owned(),
            expected,
            actual,
        })
    }
}

/// Check that some resource of type `type_name` has the expected properties.
///
/// Equivalent to [`check_has_resource_with`] with default options.
pub fn check_has_resource(
    template: &Template,
    type_name: &str,
    expected: &Properties,
) -> Result<(), VerifyError> {
    check_has_resource_with(template, type_name, expected, VerifyOptions::default())
}

/// Check that some resource of type `type_name` has the expected properties.
///
/// Succeeds as soon as one candidate matches: every expected key present with
/// a structurally equal value. Extra top-level properties on the candidate are
/// fine. On failure the candidate with the fewest differences is reported.
pub fn check_has_resource_with(
    template: &Template,
    type_name: &str,
    expected: &Properties,
    options: VerifyOptions,
) -> Result<(), VerifyError> {
    let mut candidates = 0;
    let mut nearest: Option<(&str, PropertyDiff)> = None;

    for (id, resource) in template.resources_of_type(type_name) {
        candidates += 1;
        let diff = diff_properties(
            expected,
            &resource.properties,
            options.value_extension,
            options.colors,
        );
        if diff.is_empty() {
            tracing::debug!(type_name, id, "found resource with expected properties");
            return Ok(());
        }
        tracing::trace!(type_name, id, differences = diff.len(), "candidate rejected");
        if nearest
            .as_ref()
            .is_none_or(|(_, best)| diff.len() < best.len())
        {
            nearest = Some((id, diff));
        }
    }

    match nearest {
        Some((id, diff)) => Err(VerifyError::PropertyMismatch {
            type_name: type_name.to_owned(),
            candidates,
            nearest: id.to_owned(),
            diff,
        }),
        None => Err(VerifyError::MissingResource {
            lookup: Lookup::Type(type_name.to_owned()),
            suggestion: suggest_type(template, type_name),
        }),
    }
}

/// Check that every resource whose logical ID matches `pattern` is gated by
/// `condition`.
///
/// The pattern is searched anywhere in the ID, like a JavaScript `RegExp`;
/// anchor it with `^`/`$` for whole-ID matches. At least one ID must match.
/// Condition names are compared exactly.
pub fn check_resource_like_has_condition(
    template: &Template,
    pattern: &Regex,
    condition: &str,
) -> Result<(), VerifyError> {
    let mut matched = 0;
    let mut findings = Vec::new();

    for (id, resource) in &template.resources {
        if !pattern.is_match(id) {
            continue;
        }
        matched += 1;
        if resource.condition.as_deref() != Some(condition) {
            findings.push(ConditionFinding {
                id: id.clone(),
                actual: resource.condition.clone(),
            });
        }
    }
    tracing::debug!(
        pattern = pattern.as_str(),
        condition,
        matched,
        mismatched = findings.len(),
        "checked conditions"
    );

    if matched == 0 {
        return Err(VerifyError::MissingResource {
            lookup: Lookup::IdPattern(pattern.as_str().to_owned()),
            suggestion: None,
        });
    }
    if findings.is_empty() {
        Ok(())
    } else {
        Err(VerifyError::ConditionMismatch {
            pattern: pattern.as_str().to_owned(),
            expected: condition.to_owned(),
            findings,
        })
    }
}

fn suggest_type(template: &Template, type_name: &str) -> Option<String> {
    template
        .resource_types()
        .into_iter()
        .map(|candidate| (strsim::jaro_winkler(type_name, candidate), candidate))
        .filter(|(score, _)| *score >= SUGGESTION_THRESHOLD)
        .max_by(|(a, _), (b, _)| a.total_cmp(b))
        .map(|(_, candidate)| candidate.to_owned())
}
