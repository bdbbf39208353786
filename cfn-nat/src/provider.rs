//! The Lambda-backed provider for custom resources.

use cfn_template::{Expr, Parameter, Resource, Stack, TemplateError};
use serde_json::json;

/// Logical ID of the provider's execution role.
pub const ROLE_ID: &str = "CfnProviderServiceRole6B2E8D4A";
/// Logical ID of the role's inline policy.
pub const POLICY_ID: &str = "CfnProviderServiceRoleDefaultPolicy91C5A3E7";
/// Logical ID of the handler function.
pub const FUNCTION_ID: &str = "CfnProviderFunctionD4E7B1C2";
/// Parameter naming the S3 bucket that holds the handler code.
pub const CODE_BUCKET_PARAMETER: &str = "CfnProviderCodeBucket";
/// Parameter naming the S3 key of the handler code.
pub const CODE_KEY_PARAMETER: &str = "CfnProviderCodeKey";

/// EC2 calls the handlers make.
const HANDLER_ACTIONS: &[&str] = &[
    "ec2:DescribeAddresses",
    "ec2:ReleaseAddress",
    "ec2:DescribeSubnets",
    "ec2:DescribeNatGateways",
];

/// A declared provider; custom resources point their `ServiceToken` at it.
#[derive(Debug, Clone)]
pub struct CfnProvider {
    function_id: String,
}

impl CfnProvider {
    /// `Fn::GetAtt` of the handler function's ARN.
    pub fn service_token(&self) -> Expr {
        Expr::get_att(self.function_id.as_str(), "Arn")
    }

    /// A custom resource served by this provider, dispatched on `handler`.
    pub fn custom_resource(&self, handler: &str) -> Resource {
        Resource::new("AWS::CloudFormation::CustomResource")
            .property("ServiceToken", self.service_token())
            .property("Handler", handler)
    }
}

/// Declare the execution role, its policy and the handler function.
pub fn cfn_provider(stack: &mut Stack) -> Result<CfnProvider, TemplateError> {
    stack.add_parameter(
        CODE_BUCKET_PARAMETER,
        Parameter::string().description("S3 bucket holding the custom resource handler code"),
    )?;
    stack.add_parameter(
        CODE_KEY_PARAMETER,
        Parameter::string().description("S3 key of the custom resource handler code"),
    )?;

    stack.add_resource(
        ROLE_ID,
        Resource::new("AWS::IAM::Role")
            .property(
                "AssumeRolePolicyDocument",
                Expr::from_json(&json!({
                    "Statement": [{
                        "Action": "sts:AssumeRole",
                        "Effect": "Allow",
                        "Principal": { "Service": "lambda.amazonaws.com" }
                    }],
                    "Version": "2012-10-17"
                }))?,
            )
            .property(
                "ManagedPolicyArns",
                vec![Expr::join(
                    "",
                    [
                        "arn:".into(),
                        Expr::reference("AWS::Partition"),
                        ":iam::aws:policy/service-role/AWSLambdaBasicExecutionRole".into(),
                    ],
                )],
            ),
    )?;

    stack.add_resource(
        POLICY_ID,
        Resource::new("AWS::IAM::Policy")
            .property(
                "PolicyDocument",
                Expr::from_json(&json!({
                    "Statement": [{
                        "Action": HANDLER_ACTIONS,
                        "Effect": "Allow",
                        "Resource": "*"
                    }],
                    "Version": "2012-10-17"
                }))?,
            )
            .property("PolicyName", POLICY_ID)
            .property("Roles", vec![Expr::reference(ROLE_ID)]),
    )?;

    stack.add_resource(
        FUNCTION_ID,
        Resource::new("AWS::Lambda::Function")
            .property(
                "Code",
                Expr::map([
                    ("S3Bucket", Expr::reference(CODE_BUCKET_PARAMETER)),
                    ("S3Key", Expr::reference(CODE_KEY_PARAMETER)),
                ]),
            )
            .property("Handler", "index.handler")
            .property("Role", Expr::get_att(ROLE_ID, "Arn"))
            .property("Runtime", "python3.12")
            .property("Timeout", 300_i64)
            .property(
                "Environment",
                Expr::map([(
                    "Variables",
                    Expr::map([("REGION", Expr::reference("AWS::Region"))]),
                )]),
            )
            .depends_on(POLICY_ID)
            .depends_on(ROLE_ID),
    )?;

    tracing::debug!(
        stack = stack.name(),
        function = FUNCTION_ID,
        "declared custom resource provider"
    );
    Ok(CfnProvider {
        function_id: FUNCTION_ID.to_owned(),
    })
}
