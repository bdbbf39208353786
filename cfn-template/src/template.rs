//! The synthesized template and its sections.

use std::fs;
use std::io;
use std::path::Path;

use indexmap::IndexMap;
use serde::{Deserialize, Deserializer, Serialize};
use serde_json::Value;

use crate::error::{ExprError, TemplateError};
use crate::expr::Expr;

/// Resource properties, in declaration order.
pub type Properties = IndexMap<String, Expr>;

/// Read a JSON object as resource properties.
pub fn properties_from_json(value: &Value) -> Result<Properties, ExprError> {
    match value {
        Value::Object(map) => map
            .iter()
            .map(|(k, v)| Expr::from_json(v).map(|expr| (k.clone(), expr)))
            .collect(),
        _ => Err(ExprError::new("Properties", "expected a JSON object")),
    }
}

/// One entry of the `Resources` section.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct Resource {
    /// Resource type, e.g. `AWS::EC2::NatGateway`
    #[serde(rename = "Type")]
    pub type_name: String,
    /// Declared properties
    #[serde(default, skip_serializing_if = "IndexMap::is_empty")]
    pub properties: Properties,
    /// Name of the condition gating creation
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub condition: Option<String>,
    /// Explicit dependencies; a single string is accepted on input
    #[serde(
        default,
        skip_serializing_if = "Vec::is_empty",
        deserialize_with = "one_or_many"
    )]
    pub depends_on: Vec<String>,
    /// `Delete`, `Retain` or `Snapshot`
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub deletion_policy: Option<String>,
    /// Policy applied when an update replaces the resource
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub update_replace_policy: Option<String>,
    /// `CreationPolicy` attribute, kept as written
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub creation_policy: Option<Value>,
    /// `UpdatePolicy` attribute, kept as written
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub update_policy: Option<Value>,
    /// Free-form metadata
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub metadata: Option<Expr>,
}

impl Resource {
    /// A resource of the given type with no properties.
    pub fn new(type_name: impl Into<String>) -> Self {
        Resource {
            type_name: type_name.into(),
            properties: Properties::new(),
            condition: None,
            depends_on: Vec::new(),
            deletion_policy: None,
            update_replace_policy: None,
            creation_policy: None,
            update_policy: None,
            metadata: None,
        }
    }

    /// Set a property.
    pub fn property(mut self, key: impl Into<String>, value: impl Into<Expr>) -> Self {
        self.properties.insert(key.into(), value.into());
        self
    }

    /// Gate the resource on a condition.
    pub fn condition(mut self, name: impl Into<String>) -> Self {
        self.condition = Some(name.into());
        self
    }

    /// Add an explicit dependency.
    pub fn depends_on(mut self, id: impl Into<String>) -> Self {
        self.depends_on.push(id.into());
        self
    }

    /// Set the deletion policy.
    pub fn deletion_policy(mut self, policy: impl Into<String>) -> Self {
        self.deletion_policy = Some(policy.into());
        self
    }

    /// Every expression the resource declares: property values, then metadata.
    pub fn expressions(&self) -> impl Iterator<Item = &Expr> {
        self.properties.values().chain(self.metadata.as_ref())
    }
}

fn one_or_many<'de, D: Deserializer<'de>>(deserializer: D) -> Result<Vec<String>, D::Error> {
    #[derive(Deserialize)]
    #[serde(untagged)]
    enum OneOrMany {
        One(String),
        Many(Vec<String>),
    }

    Ok(match OneOrMany::deserialize(deserializer)? {
        OneOrMany::One(id) => vec![id],
        OneOrMany::Many(ids) => ids,
    })
}

/// One entry of the `Parameters` section.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct Parameter {
    /// Parameter type, usually `String`
    #[serde(rename = "Type")]
    pub type_name: String,
    /// Value used when none is supplied; a number for `Number` parameters
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub default: Option<Value>,
    /// Human-readable description
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    /// Accepted values, empty for any
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub allowed_values: Vec<Value>,
    /// Remaining constraints (`MinValue`, `AllowedPattern`, `NoEcho`, ...)
    #[serde(flatten)]
    pub constraints: IndexMap<String, Value>,
}

impl Parameter {
    /// A `String` parameter.
    pub fn string() -> Self {
        Parameter {
            type_name: "String".to_owned(),
            default: None,
            description: None,
            allowed_values: Vec::new(),
            constraints: IndexMap::new(),
        }
    }

    /// Set the default value.
    pub fn default_value(mut self, value: impl Into<Value>) -> Self {
        self.default = Some(value.into());
        self
    }

    /// Set the description.
    pub fn description(mut self, text: impl Into<String>) -> Self {
        self.description = Some(text.into());
        self
    }
}

/// One entry of the `Outputs` section.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct Output {
    /// The exported value
    pub value: Expr,
    /// Name of the condition gating the output
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub condition: Option<String>,
    /// Human-readable description
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    /// `{"Name": ...}` under which the value is exported
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub export: Option<Expr>,
}

impl Output {
    /// An unconditional output of `value`.
    pub fn new(value: impl Into<Expr>) -> Self {
        Output {
            value: value.into(),
            condition: None,
            description: None,
            export: None,
        }
    }

    /// Gate the output on a condition.
    pub fn condition(mut self, name: impl Into<String>) -> Self {
        self.condition = Some(name.into());
        self
    }

    /// Set the description.
    pub fn description(mut self, text: impl Into<String>) -> Self {
        self.description = Some(text.into());
        self
    }

    /// Export the value under `name`.
    pub fn export(mut self, name: impl Into<Expr>) -> Self {
        self.export = Some(Expr::map([("Name", name.into())]));
        self
    }
}

/// A synthesized template.
///
/// Produced once by [`crate::Stack::synth`] or loaded from JSON, and only
/// read afterwards.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct Template {
    /// `AWSTemplateFormatVersion`
    #[serde(
        rename = "AWSTemplateFormatVersion",
        default,
        skip_serializing_if = "Option::is_none"
    )]
    pub format_version: Option<String>,
    /// Template description
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    /// Template-level metadata, kept as written
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub metadata: Option<Value>,
    /// Macros processing the template, e.g. `AWS::Serverless-2016-10-31`
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub transform: Option<Value>,
    /// Input parameters
    #[serde(default, skip_serializing_if = "IndexMap::is_empty")]
    pub parameters: IndexMap<String, Parameter>,
    /// Parameter validation rules, kept as written
    #[serde(default, skip_serializing_if = "IndexMap::is_empty")]
    pub rules: IndexMap<String, Value>,
    /// Lookup tables for `Fn::FindInMap`
    #[serde(default, skip_serializing_if = "IndexMap::is_empty")]
    pub mappings: IndexMap<String, Value>,
    /// Named conditions; bodies are never evaluated
    #[serde(default, skip_serializing_if = "IndexMap::is_empty")]
    pub conditions: IndexMap<String, Expr>,
    /// Resources by logical ID
    #[serde(default)]
    pub resources: IndexMap<String, Resource>,
    /// Stack outputs
    #[serde(default, skip_serializing_if = "IndexMap::is_empty")]
    pub outputs: IndexMap<String, Output>,
}

impl Template {
    /// Parse a template from a JSON string.
    pub fn from_json_str(json: &str) -> Result<Self, TemplateError> {
        Ok(serde_json::from_str(json)?)
    }

    /// Parse a template from a reader.
    pub fn from_reader<R: io::Read>(reader: R) -> Result<Self, TemplateError> {
        Ok(serde_json::from_reader(reader)?)
    }

    /// Pretty-printed JSON (two-space indent) with a trailing newline.
    pub fn to_json_pretty(&self) -> Result<String, TemplateError> {
        let mut out = serde_json::to_string_pretty(self)?;
        out.push('\n');
        Ok(out)
    }

    /// Write the template as pretty JSON, creating parent directories.
    pub fn write_pretty(&self, path: impl AsRef<Path>) -> Result<(), TemplateError> {
        let path = path.as_ref();
        if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
            fs::create_dir_all(parent).map_err(|source| TemplateError::Io {
                path: parent.to_path_buf(),
                source,
            })?;
        }
        fs::write(path, self.to_json_pretty()?).map_err(|source| TemplateError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        tracing::debug!(
            path = %path.display(),
            resources = self.resources.len(),
            "wrote template"
        );
        Ok(())
    }

    /// Look up a resource by logical ID.
    pub fn resource(&self, id: &str) -> Option<&Resource> {
        self.resources.get(id)
    }

    /// Resources of one type, with their logical IDs, in declaration order.
    pub fn resources_of_type<'a>(
        &'a self,
        type_name: &'a str,
    ) -> impl Iterator<Item = (&'a str, &'a Resource)> + 'a {
        self.resources
            .iter()
            .filter(move |(_, resource)| resource.type_name == type_name)
            .map(|(id, resource)| (id.as_str(), resource))
    }

    /// Distinct resource types, in order of first appearance.
    pub fn resource_types(&self) -> Vec<&str> {
        let mut types: Vec<&str> = Vec::new();
        for resource in self.resources.values() {
            if !types.contains(&resource.type_name.as_str()) {
                types.push(&resource.type_name);
            }
        }
        types
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    const ROUTE_TEMPLATE: &str = r#"{
        "Conditions": {
            "UseNAT": { "Fn::Not": [{ "Fn::Equals": [{ "Ref": "EIPNAT" }, "none"] }] }
        },
        "Resources": {
            "Gateway": {
                "Type": "AWS::EC2::NatGateway",
                "Properties": { "SubnetId": "subnet-1234" },
                "Condition": "UseNAT"
            },
            "Route": {
                "Type": "AWS::EC2::Route",
                "Properties": {
                    "RouteTableId": "rtb-1234",
                    "DestinationCidrBlock": "0.0.0.0/0",
                    "NatGatewayId": { "Ref": "Gateway" }
                },
                "Condition": "UseNAT",
                "DependsOn": "Gateway"
            },
            "OtherRoute": {
                "Type": "AWS::EC2::Route",
                "Properties": { "RouteTableId": "rtb-5678" }
            }
        }
    }"#;

    #[test]
    fn parses_sections() {
        cfn_testhelpers::setup();
        let template = Template::from_json_str(ROUTE_TEMPLATE).unwrap();
        assert_eq!(template.resources.len(), 3);
        assert!(template.conditions.contains_key("UseNAT"));

        let route = template.resource("Route").unwrap();
        assert_eq!(route.type_name, "AWS::EC2::Route");
        assert_eq!(route.condition.as_deref(), Some("UseNAT"));
        assert_eq!(route.depends_on, vec!["Gateway"]);
        assert_eq!(
            route.properties["NatGatewayId"],
            Expr::reference("Gateway")
        );
    }

    #[test]
    fn resources_of_type_keeps_declaration_order() {
        cfn_testhelpers::setup();
        let template = Template::from_json_str(ROUTE_TEMPLATE).unwrap();
        let ids: Vec<_> = template
            .resources_of_type("AWS::EC2::Route")
            .map(|(id, _)| id)
            .collect();
        assert_eq!(ids, vec!["Route", "OtherRoute"]);
        assert_eq!(
            template.resource_types(),
            vec!["AWS::EC2::NatGateway", "AWS::EC2::Route"]
        );
    }

    #[test]
    fn malformed_intrinsic_fails_to_load() {
        cfn_testhelpers::setup();
        let err = Template::from_json_str(
            r#"{ "Resources": { "R": { "Type": "T", "Properties": { "A": { "Ref": [] } } } } }"#,
        )
        .unwrap_err();
        assert!(matches!(err, TemplateError::Json(_)));
        assert!(err.to_string().contains("malformed `Ref`"));
    }

    #[test]
    fn write_pretty_round_trips() {
        cfn_testhelpers::setup();
        let template = Template::from_json_str(ROUTE_TEMPLATE).unwrap();
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("out").join("route.synth.json");

        template.write_pretty(&path).unwrap();

        let written = fs::read_to_string(&path).unwrap();
        assert!(written.ends_with("}\n"));
        assert!(written.contains("\n  \"Conditions\": {"));
        let reloaded = Template::from_json_str(&written).unwrap();
        assert_eq!(reloaded, template);
    }

    #[test]
    fn every_section_survives_a_round_trip() {
        cfn_testhelpers::setup();
        let source = json!({
            "AWSTemplateFormatVersion": "2010-09-09",
            "Description": "all sections",
            "Metadata": { "AWS::CloudFormation::Interface": { "ParameterGroups": [] } },
            "Transform": "AWS::Serverless-2016-10-31",
            "Parameters": {
                "Count": {
                    "Type": "Number",
                    "Default": 3,
                    "MinValue": 1,
                    "AllowedValues": [1, 3]
                },
                "Subnets": { "Type": "List<AWS::EC2::Subnet::Id>", "NoEcho": true }
            },
            "Rules": {
                "CountRule": {
                    "Assertions": [{ "Assert": { "Fn::Equals": [{ "Ref": "Count" }, 3] } }]
                }
            },
            "Mappings": {
                "RegionMap": { "eu-west-1": { "Ami": "ami-1234" } }
            },
            "Conditions": {
                "Many": { "Fn::Not": [{ "Fn::Equals": [{ "Ref": "Count" }, 1] }] }
            },
            "Resources": {
                "Queue": {
                    "Type": "AWS::SQS::Queue",
                    "Properties": {
                        "DelaySeconds": { "Fn::FindInMap": ["RegionMap", "eu-west-1", "Ami"] }
                    },
                    "DependsOn": ["Topic"],
                    "DeletionPolicy": "Retain",
                    "UpdateReplacePolicy": "Retain",
                    "CreationPolicy": { "ResourceSignal": { "Count": 1, "Timeout": "PT5M" } },
                    "UpdatePolicy": { "AutoScalingReplacingUpdate": { "WillReplace": true } },
                    "Metadata": { "Owner": "nat" }
                },
                "Topic": { "Type": "AWS::SNS::Topic", "Condition": "Many" }
            },
            "Outputs": {
                "QueueUrl": {
                    "Value": { "Ref": "Queue" },
                    "Export": {
                        "Name": { "Fn::Join": ["-", [{ "Ref": "AWS::StackName" }, "Queue"]] }
                    }
                }
            }
        });

        let template = Template::from_json_str(&source.to_string()).unwrap();
        assert_eq!(template.parameters["Count"].default, Some(json!(3)));
        assert_eq!(template.parameters["Count"].constraints["MinValue"], json!(1));
        assert!(template.outputs["QueueUrl"].export.is_some());

        let written: Value = serde_json::from_str(&template.to_json_pretty().unwrap()).unwrap();
        assert_eq!(written, source);
    }

    #[test]
    fn properties_must_be_an_object() {
        cfn_testhelpers::setup();
        let props = properties_from_json(&json!({ "Domain": "vpc" })).unwrap();
        assert_eq!(props["Domain"], Expr::from("vpc"));

        let err = properties_from_json(&json!(["vpc"])).unwrap_err();
        assert_eq!(err.context, "Properties");
    }

    #[test]
    fn builder_sets_fields() {
        cfn_testhelpers::setup();
        let resource = Resource::new("AWS::EC2::EIP")
            .property("Domain", "vpc")
            .condition("AllocateNATIP")
            .depends_on("Gateway")
            .deletion_policy("Retain");
        assert_eq!(resource.properties["Domain"], Expr::from("vpc"));
        assert_eq!(resource.condition.as_deref(), Some("AllocateNATIP"));
        assert_eq!(resource.depends_on, vec!["Gateway"]);
        assert_eq!(resource.deletion_policy.as_deref(), Some("Retain"));
        assert_eq!(resource.expressions().count(), 1);
    }
}
