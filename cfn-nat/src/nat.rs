//! The NAT gateway construct.

use cfn_template::{Expr, Output, Parameter, Resource, Stack, TemplateError};

use crate::provider::CfnProvider;

/// Parameter selecting the EIP strategy: an allocation ID, `allocate`, or `none`.
pub const EIP_PARAMETER: &str = "EIPNAT";
/// `EIP_PARAMETER` value asking for a new EIP.
pub const ALLOCATE: &str = "allocate";
/// `EIP_PARAMETER` value omitting the NAT gateway.
pub const NONE: &str = "none";

/// Holds when a new EIP is allocated.
pub const ALLOCATE_CONDITION: &str = "AllocateNATIP";
/// Holds when a NAT gateway is created at all.
pub const USE_NAT_CONDITION: &str = "UseNAT";

/// Logical ID of the allocated EIP.
pub const EIP_ID: &str = "NATNATEIPEC65D153";
/// Logical ID of the custom resource releasing the EIP on delete.
pub const REAPER_ID: &str = "NATEIPReaper07051D245";
/// Logical ID of the NAT gateway.
pub const GATEWAY_ID: &str = "NATGateway3927D637";
/// Logical ID of the default route through the gateway.
pub const ROUTE_ID: &str = "NATRoute5F1B2C8E";
/// Logical ID of the custom resource resolving the subnet's VPC and zone.
pub const SUBNET_LOOKUP_ID: &str = "NATSubnetLookupA07C3E19";
/// Output exporting the gateway ID.
pub const GATEWAY_OUTPUT: &str = "NATGatewayId";

/// Where the NAT gateway goes.
#[derive(Debug, Clone)]
pub struct NatProps {
    /// Public subnet hosting the gateway
    pub subnet_id: Expr,
    /// Private route table sending `0.0.0.0/0` through the gateway
    pub route_table_id: Expr,
}

impl NatProps {
    /// Props from a subnet and a route table.
    pub fn new(subnet_id: impl Into<Expr>, route_table_id: impl Into<Expr>) -> Self {
        NatProps {
            subnet_id: subnet_id.into(),
            route_table_id: route_table_id.into(),
        }
    }
}

/// References to what [`nat`] declared.
#[derive(Debug, Clone)]
pub struct Nat {
    /// `Ref` of the gateway
    pub gateway: Expr,
    /// The allocation ID the gateway uses, conditional on the EIP strategy
    pub allocation_id: Expr,
}

/// `Fn::Join ["", [Ref AWS::StackName, suffix]]`
fn stack_name_with(suffix: &str) -> Expr {
    Expr::join("", [Expr::reference("AWS::StackName"), suffix.into()])
}

/// Declare a NAT gateway, its EIP and route, and the conditions gating them.
///
/// With `EIPNAT` left at `allocate` a new EIP is created and reaped on
/// delete; an allocation ID reuses an existing EIP; `none` omits the gateway
/// and its route.
pub fn nat(
    stack: &mut Stack,
    provider: &CfnProvider,
    props: &NatProps,
) -> Result<Nat, TemplateError> {
    stack.add_parameter(
        EIP_PARAMETER,
        Parameter::string()
            .default_value(ALLOCATE)
            .description(format!(
                "EIP allocation ID for the NAT gateway, `{ALLOCATE}` to allocate one, \
                 or `{NONE}` for no NAT gateway"
            )),
    )?;

    let eip_equals = |value: &str| {
        Expr::fn_(
            "Equals",
            vec![Expr::reference(EIP_PARAMETER), value.into()],
        )
    };
    stack.add_condition(ALLOCATE_CONDITION, eip_equals(ALLOCATE))?;
    stack.add_condition(USE_NAT_CONDITION, Expr::fn_("Not", vec![eip_equals(NONE)]))?;

    stack.add_resource(
        EIP_ID,
        Resource::new("AWS::EC2::EIP")
            .property("Domain", "vpc")
            .property("Tags", vec![Expr::tag("Name", stack_name_with("-NAT"))])
            .condition(ALLOCATE_CONDITION),
    )?;

    stack.add_resource(
        REAPER_ID,
        provider
            .custom_resource("EIPReaper")
            .property("AllocationId", Expr::get_att(EIP_ID, "AllocationId"))
            .property("Region", Expr::reference("AWS::Region"))
            .condition(ALLOCATE_CONDITION)
            .deletion_policy("Delete"),
    )?;

    let allocation_id = Expr::if_(
        ALLOCATE_CONDITION,
        Expr::get_att(EIP_ID, "AllocationId"),
        Expr::reference(EIP_PARAMETER),
    );
    stack.add_resource(
        GATEWAY_ID,
        Resource::new("AWS::EC2::NatGateway")
            .property("AllocationId", allocation_id.clone())
            .property("SubnetId", props.subnet_id.clone())
            .property(
                "Tags",
                vec![
                    Expr::tag("Name", stack_name_with("-NAT")),
                    Expr::tag(
                        "Reaper",
                        Expr::if_(ALLOCATE_CONDITION, Expr::reference(REAPER_ID), "n/a"),
                    ),
                ],
            )
            .condition(USE_NAT_CONDITION),
    )?;

    stack.add_resource(
        ROUTE_ID,
        Resource::new("AWS::EC2::Route")
            .property("RouteTableId", props.route_table_id.clone())
            .property("DestinationCidrBlock", "0.0.0.0/0")
            .property("NatGatewayId", Expr::reference(GATEWAY_ID))
            .condition(USE_NAT_CONDITION),
    )?;

    stack.add_resource(
        SUBNET_LOOKUP_ID,
        provider
            .custom_resource("SubnetLookup")
            .property("SubnetId", props.subnet_id.clone())
            .property("Region", Expr::reference("AWS::Region")),
    )?;

    stack.add_output(
        GATEWAY_OUTPUT,
        Output::new(Expr::reference(GATEWAY_ID))
            .condition(USE_NAT_CONDITION)
            .description("ID of the NAT gateway")
            .export(stack_name_with("-NATGatewayId")),
    )?;

    tracing::debug!(stack = stack.name(), gateway = GATEWAY_ID, "declared NAT gateway");
    Ok(Nat {
        gateway: Expr::reference(GATEWAY_ID),
        allocation_id,
    })
}
