#![warn(missing_docs)]
#![forbid(unsafe_code)]
#![doc = include_str!("../README.md")]

mod nat;
mod provider;

pub use nat::{
    ALLOCATE, ALLOCATE_CONDITION, EIP_ID, EIP_PARAMETER, GATEWAY_ID, GATEWAY_OUTPUT, NONE, Nat,
    NatProps, REAPER_ID, ROUTE_ID, SUBNET_LOOKUP_ID, USE_NAT_CONDITION, nat,
};
pub use provider::{
    CODE_BUCKET_PARAMETER, CODE_KEY_PARAMETER, CfnProvider, FUNCTION_ID, POLICY_ID, ROLE_ID,
    cfn_provider,
};
