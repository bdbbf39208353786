#![warn(missing_docs)]
#![forbid(unsafe_code)]
#![doc = include_str!("../README.md")]

mod diff;
mod error;
mod verify;

pub use cfn_template::{Template, properties_from_json};
pub use diff::{DiffLine, PropertyDiff};
pub use error::{ConditionFinding, Lookup, VerifyError};
pub use regex::Regex;
pub use verify::{
    VerifyOptions, check_has_resource, check_has_resource_with, check_resource_count,
    check_resource_like_has_condition,
};

#[doc(hidden)]
pub mod __private {
    use cfn_template::Properties;

    #[track_caller]
    pub fn expected_properties(value: &serde_json::Value) -> Properties {
        match cfn_template::properties_from_json(value) {
            Ok(properties) => properties,
            Err(e) => panic!("invalid expected properties: {e}"),
        }
    }

    #[track_caller]
    pub fn id_pattern(pattern: &str) -> regex::Regex {
        match regex::Regex::new(pattern) {
            Ok(regex) => regex,
            Err(e) => panic!("invalid logical ID pattern `{pattern}`: {e}"),
        }
    }
}

/// Asserts that a template has exactly `count` resources of a type.
///
/// # Panics
///
/// Panics with both counts if they differ.
///
/// # Example
///
/// ```
/// use cfn_assert::{Template, assert_resource_count};
///
/// let template = Template::from_json_str(
///     r#"{ "Resources": { "Gateway": { "Type": "AWS::EC2::NatGateway" } } }"#,
/// ).unwrap();
/// assert_resource_count!(template, "AWS::EC2::NatGateway", 1);
/// assert_resource_count!(template, "AWS::EC2::Route", 0);
/// ```
#[macro_export]
macro_rules! assert_resource_count {
    ($template:expr, $type_name:expr, $count:expr $(,)?) => {
        if let Err(err) = $crate::check_resource_count(&$template, $type_name, $count) {
            panic!("assertion `assert_resource_count!(template, type, count)` failed: {err}");
        }
    };
    ($template:expr, $type_name:expr, $count:expr, $($arg:tt)+) => {
        if let Err(err) = $crate::check_resource_count(&$template, $type_name, $count) {
            panic!(
                "assertion `assert_resource_count!(template, type, count)` failed: {}: {err}",
                format_args!($($arg)+)
            );
        }
    };
}

/// Asserts that some resource of a type has the expected properties.
///
/// The expectation is a `serde_json::Value` object; intrinsics inside it are
/// written in their JSON form. Top-level keys the resource has beyond the
/// expected ones are ignored, nested values must match exactly.
///
/// # Panics
///
/// Panics with a diff against the closest resource if none matches.
///
/// # Example
///
/// ```
/// use cfn_assert::{Template, assert_has_resource};
/// use serde_json::json;
///
/// let template = Template::from_json_str(r#"{
///     "Resources": {
///         "EIP": { "Type": "AWS::EC2::EIP", "Properties": { "Domain": "vpc", "Tags": [] } }
///     }
/// }"#).unwrap();
/// assert_has_resource!(template, "AWS::EC2::EIP", json!({ "Domain": "vpc" }));
/// ```
#[macro_export]
macro_rules! assert_has_resource {
    (
        @with $template:expr, $type_name:expr, $expected:expr, $options:expr, $name:literal $(,)?
    ) => {{
        let expected = $crate::__private::expected_properties(&$expected);
        if let Err(err) =
            $crate::check_has_resource_with(&$template, $type_name, &expected, $options)
        {
            panic!("assertion `{}` failed: {err}", $name);
        }
    }};
    (
        @with $template:expr, $type_name:expr, $expected:expr, $options:expr, $name:literal,
        $($arg:tt)+
    ) => {{
        let expected = $crate::__private::expected_properties(&$expected);
        if let Err(err) =
            $crate::check_has_resource_with(&$template, $type_name, &expected, $options)
        {
            panic!("assertion `{}` failed: {}: {err}", $name, format_args!($($arg)+));
        }
    }};
    ($template:expr, $type_name:expr, $expected:expr $(,)?) => {
        $crate::assert_has_resource!(
            @with $template,
            $type_name,
            $expected,
            $crate::VerifyOptions::from_env(),
            "assert_has_resource!(template, type, properties)"
        )
    };
    ($template:expr, $type_name:expr, $expected:expr, $($arg:tt)+) => {
        $crate::assert_has_resource!(
            @with $template,
            $type_name,
            $expected,
            $crate::VerifyOptions::from_env(),
            "assert_has_resource!(template, type, properties)",
            $($arg)+
        )
    };
}

/// Asserts that some resource of a type has the expected properties, allowing
/// extra keys in nested maps.
///
/// Like [`assert_has_resource!`], with [`VerifyOptions::value_extension`] on.
#[macro_export]
macro_rules! assert_has_resource_like {
    ($template:expr, $type_name:expr, $expected:expr $(,)?) => {
        $crate::assert_has_resource!(
            @with $template,
            $type_name,
            $expected,
            $crate::VerifyOptions::from_env().value_extension(true),
            "assert_has_resource_like!(template, type, properties)"
        )
    };
    ($template:expr, $type_name:expr, $expected:expr, $($arg:tt)+) => {
        $crate::assert_has_resource!(
            @with $template,
            $type_name,
            $expected,
            $crate::VerifyOptions::from_env().value_extension(true),
            "assert_has_resource_like!(template, type, properties)",
            $($arg)+
        )
    };
}

/// Asserts that every resource whose logical ID matches a pattern carries a
/// condition.
///
/// The pattern is a regular expression searched anywhere in the logical ID.
///
/// # Panics
///
/// Panics if no logical ID matches, or lists every match whose condition is
/// missing or different.
///
/// # Example
///
/// ```
/// use cfn_assert::{Template, assert_resource_like_has_condition};
///
/// let template = Template::from_json_str(r#"{
///     "Resources": {
///         "NATRoute5F1B2C8E": { "Type": "AWS::EC2::Route", "Condition": "UseNAT" }
///     }
/// }"#).unwrap();
/// assert_resource_like_has_condition!(template, "NATRoute.*", "UseNAT");
/// ```
#[macro_export]
macro_rules! assert_resource_like_has_condition {
    ($template:expr, $pattern:expr, $condition:expr $(,)?) => {{
        let pattern = $crate::__private::id_pattern($pattern);
        if let Err(err) =
            $crate::check_resource_like_has_condition(&$template, &pattern, $condition)
        {
            panic!(
                "assertion `assert_resource_like_has_condition!(template, pattern, condition)` \
                 failed: {err}"
            );
        }
    }};
    ($template:expr, $pattern:expr, $condition:expr, $($arg:tt)+) => {{
        let pattern = $crate::__private::id_pattern($pattern);
        if let Err(err) =
            $crate::check_resource_like_has_condition(&$template, &pattern, $condition)
        {
            panic!(
                "assertion `assert_resource_like_has_condition!(template, pattern, condition)` \
                 failed: {}: {err}",
                format_args!($($arg)+)
            );
        }
    }};
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn template() -> Template {
        Template::from_json_str(
            r#"{
                "Resources": {
                    "NATNATEIPEC65D153": {
                        "Type": "AWS::EC2::EIP",
                        "Properties": {
                            "Domain": "vpc",
                            "Tags": [{
                                "Key": "Name",
                                "Value": { "Fn::Join": ["", [{ "Ref": "AWS::StackName" }, "-NAT"]] }
                            }]
                        },
                        "Condition": "AllocateNATIP"
                    },
                    "NATRoute5F1B2C8E": {
                        "Type": "AWS::EC2::Route",
                        "Properties": { "DestinationCidrBlock": "0.0.0.0/0" }
                    }
                }
            }"#,
        )
        .unwrap()
    }

    #[test]
    fn passing_assertions() {
        cfn_testhelpers::setup();
        let template = template();
        assert_resource_count!(template, "AWS::EC2::EIP", 1);
        assert_resource_count!(template, "AWS::EC2::Route", 1, "routes in {}", "template");
        assert_has_resource!(
            template,
            "AWS::EC2::EIP",
            json!({
                "Domain": "vpc",
                "Tags": [{
                    "Key": "Name",
                    "Value": { "Fn::Join": ["", [{ "Ref": "AWS::StackName" }, "-NAT"]] }
                }]
            })
        );
        assert_has_resource_like!(
            template,
            "AWS::EC2::EIP",
            json!({ "Tags": [{ "Key": "Name" }] })
        );
        assert_resource_like_has_condition!(template, "NATNATEIP.*", "AllocateNATIP");
    }

    #[test]
    #[should_panic(expected = "expected 2 resource(s) of type `AWS::EC2::EIP`, found 1")]
    fn count_assertion_panics() {
        cfn_testhelpers::setup();
        assert_resource_count!(template(), "AWS::EC2::EIP", 2);
    }

    #[test]
    #[should_panic(expected = "closest is `NATNATEIPEC65D153`")]
    fn property_assertion_panics() {
        cfn_testhelpers::setup();
        assert_has_resource!(template(), "AWS::EC2::EIP", json!({ "Domain": "standard" }));
    }

    #[test]
    #[should_panic(expected = "nested tags: none of the 1 resource(s)")]
    fn strict_nested_match_panics_with_message() {
        cfn_testhelpers::setup();
        assert_has_resource!(
            template(),
            "AWS::EC2::EIP",
            json!({ "Tags": [{ "Key": "Name" }] }),
            "nested {}",
            "tags"
        );
    }

    #[test]
    #[should_panic(expected = "`NATRoute5F1B2C8E` has no condition")]
    fn condition_assertion_panics() {
        cfn_testhelpers::setup();
        assert_resource_like_has_condition!(template(), "NATRoute.*", "UseNAT");
    }

    #[test]
    #[should_panic(expected = "invalid logical ID pattern")]
    fn bad_pattern_panics() {
        cfn_testhelpers::setup();
        assert_resource_like_has_condition!(template(), "NATRoute(", "UseNAT");
    }

    #[test]
    #[should_panic(expected = "invalid expected properties")]
    fn non_object_expectation_panics() {
        cfn_testhelpers::setup();
        assert_has_resource!(template(), "AWS::EC2::EIP", json!(["vpc"]));
    }
}
