use std::path::{Path, PathBuf};
use std::sync::LazyLock;

use cfn_assert::{
    Template, assert_has_resource, assert_has_resource_like, assert_resource_count,
    assert_resource_like_has_condition,
};
use cfn_nat::{NatProps, cfn_provider, nat};
use cfn_template::{Expr, Stack};
use serde_json::json;

fn synth_path() -> PathBuf {
    Path::new(env!("CARGO_TARGET_TMPDIR")).join("nat.synth.json")
}

static TEMPLATE: LazyLock<Template> = LazyLock::new(|| {
    let mut stack = Stack::new("NATStack");
    let provider = cfn_provider(&mut stack).expect("provider declares");
    nat(&mut stack, &provider, &NatProps::new("subnet-1234", "rtb-1234")).expect("nat declares");
    let template = stack.synth().expect("stack synthesizes");
    template
        .write_pretty(synth_path())
        .expect("synthesized template is written");
    template
});

#[test]
fn resource_counts() {
    cfn_testhelpers::setup();
    let template = &*TEMPLATE;
    assert_resource_count!(template, "AWS::EC2::NatGateway", 1);
    assert_resource_count!(template, "AWS::EC2::Route", 1);
    assert_resource_count!(template, "AWS::EC2::EIP", 1);
    assert_resource_count!(template, "AWS::IAM::Role", 1);
    assert_resource_count!(template, "AWS::IAM::Policy", 1);
    assert_resource_count!(template, "AWS::Lambda::Function", 1);
    assert_resource_count!(template, "AWS::CloudFormation::CustomResource", 2);
}

#[test]
fn eip_is_allocated_in_the_vpc() {
    cfn_testhelpers::setup();
    assert_has_resource!(
        TEMPLATE,
        "AWS::EC2::EIP",
        json!({
            "Domain": "vpc",
            "Tags": [{
                "Key": "Name",
                "Value": { "Fn::Join": ["", [{ "Ref": "AWS::StackName" }, "-NAT"]] }
            }]
        })
    );
}

#[test]
fn eip_is_conditional_on_allocation() {
    cfn_testhelpers::setup();
    assert_resource_like_has_condition!(TEMPLATE, "NATNATEIP.*", "AllocateNATIP");
}

#[test]
fn gateway_uses_the_selected_eip() {
    cfn_testhelpers::setup();
    assert_has_resource!(
        TEMPLATE,
        "AWS::EC2::NatGateway",
        json!({
            "AllocationId": {
                "Fn::If": [
                    "AllocateNATIP",
                    { "Fn::GetAtt": ["NATNATEIPEC65D153", "AllocationId"] },
                    { "Ref": "EIPNAT" }
                ]
            },
            "SubnetId": "subnet-1234",
            "Tags": [
                {
                    "Key": "Name",
                    "Value": { "Fn::Join": ["", [{ "Ref": "AWS::StackName" }, "-NAT"]] }
                },
                {
                    "Key": "Reaper",
                    "Value": {
                        "Fn::If": ["AllocateNATIP", { "Ref": "NATEIPReaper07051D245" }, "n/a"]
                    }
                }
            ]
        })
    );
}

#[test]
fn gateway_is_conditional_on_use() {
    cfn_testhelpers::setup();
    assert_resource_like_has_condition!(TEMPLATE, "NATGateway.*", "UseNAT");
}

#[test]
fn route_goes_through_the_gateway() {
    cfn_testhelpers::setup();
    assert_has_resource!(
        TEMPLATE,
        "AWS::EC2::Route",
        json!({
            "RouteTableId": "rtb-1234",
            "DestinationCidrBlock": "0.0.0.0/0",
            "NatGatewayId": { "Ref": "NATGateway3927D637" }
        })
    );
    assert_resource_like_has_condition!(TEMPLATE, "NATRoute.*", "UseNAT");
}

#[test]
fn custom_resources_share_the_provider() {
    cfn_testhelpers::setup();
    let token = json!({ "Fn::GetAtt": ["CfnProviderFunctionD4E7B1C2", "Arn"] });
    assert_has_resource!(
        TEMPLATE,
        "AWS::CloudFormation::CustomResource",
        json!({ "ServiceToken": token.clone(), "Handler": "EIPReaper" })
    );
    assert_has_resource!(
        TEMPLATE,
        "AWS::CloudFormation::CustomResource",
        json!({ "ServiceToken": token, "Handler": "SubnetLookup", "SubnetId": "subnet-1234" })
    );
    assert_has_resource_like!(
        TEMPLATE,
        "AWS::Lambda::Function",
        json!({ "Environment": { "Variables": {} }, "Runtime": "python3.12" })
    );
}

#[test]
fn conditions_and_parameter_are_declared() {
    cfn_testhelpers::setup();
    let template = &*TEMPLATE;
    assert_eq!(template.parameters["EIPNAT"].default, Some(json!("allocate")));
    assert_eq!(
        template.outputs["NATGatewayId"].export.as_ref().map(Expr::to_json),
        Some(json!({
            "Name": { "Fn::Join": ["", [{ "Ref": "AWS::StackName" }, "-NATGatewayId"]] }
        }))
    );
    assert_eq!(
        template.conditions["AllocateNATIP"].to_json(),
        json!({ "Fn::Equals": [{ "Ref": "EIPNAT" }, "allocate"] })
    );
    assert_eq!(
        template.conditions["UseNAT"].to_json(),
        json!({ "Fn::Not": [{ "Fn::Equals": [{ "Ref": "EIPNAT" }, "none"] }] })
    );
}

#[test]
#[should_panic(expected = "closest is `NATGateway3927D637`")]
fn wrong_subnet_is_reported() {
    cfn_testhelpers::setup();
    assert_has_resource!(
        TEMPLATE,
        "AWS::EC2::NatGateway",
        json!({ "SubnetId": "subnet-9999" })
    );
}

#[test]
fn synthesis_is_deterministic() {
    cfn_testhelpers::setup();
    let mut stack = Stack::new("NATStack");
    let provider = cfn_provider(&mut stack).unwrap();
    nat(&mut stack, &provider, &NatProps::new("subnet-1234", "rtb-1234")).unwrap();
    let again = stack.synth().unwrap();
    assert_eq!(again, *TEMPLATE);
    assert_eq!(again.to_json_pretty().unwrap(), TEMPLATE.to_json_pretty().unwrap());
}

#[test]
fn written_template_reads_back_equal() {
    cfn_testhelpers::setup();
    let template = &*TEMPLATE;
    let file = std::fs::File::open(synth_path()).unwrap();
    let reloaded = Template::from_reader(std::io::BufReader::new(file)).unwrap();
    assert_eq!(reloaded, *template);
}
