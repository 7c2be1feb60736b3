//! Built-in declaration
//!
//! A minimal public network and a single web server: VPC, public subnet,
//! internet gateway, default route, SSH/HTTP security group, the latest
//! Amazon Linux 2 image and one instance serving a static page.
//!
//! The image is resolved by filter rather than pinned, so two deployments of
//! this declaration may boot different images.

use crate::model::{
    AmiFilter, AmiLookup, Cidr, FirewallRule, Instance, InternetGateway, Output, Resource,
    ResourceKind, ResourceRef, Route, RouteTable, RouteTableAssociation, SecurityGroup, Stack,
    Subnet, UserData, Vpc,
};
use std::net::Ipv4Addr;

pub const PROJECT_NAME: &str = "minimal-web";

pub const VPC_NAME: &str = "pulumi-vpc";
pub const SUBNET_NAME: &str = "pulumi-public-subnet";
pub const GATEWAY_NAME: &str = "pulumi-igw";
pub const ROUTE_TABLE_NAME: &str = "pulumi-rt";
pub const ROUTE_ASSOCIATION_NAME: &str = "pulumi-rt-assoc";
pub const SECURITY_GROUP_NAME: &str = "pulumi-sg";
pub const AMI_NAME: &str = "ami";
pub const INSTANCE_NAME: &str = "pulumi-ec2";

pub const OUTPUT_PUBLIC_IP: &str = "instance_public_ip";
pub const OUTPUT_PUBLIC_DNS: &str = "instance_public_dns";

pub const INSTANCE_TYPE: &str = "t2.micro";
pub const AMI_OWNER: &str = "amazon";
pub const AMI_NAME_PATTERN: &str = "amzn2-ami-hvm-*-x86_64-gp2";

/// Boot script installing httpd and writing a fixed index page
pub const BOOT_SCRIPT: &str = include_str!("../assets/boot.sh");

/// The built-in declaration written as a stack file
pub const STACK_KDL: &str = include_str!("../assets/stack.kdl");

/// File name `STACK_KDL` loads its boot script from
pub const BOOT_SCRIPT_FILE: &str = "boot.sh";

const VPC_CIDR: Cidr = Cidr::from_parts(Ipv4Addr::new(10, 0, 0, 0), 16);
const SUBNET_CIDR: Cidr = Cidr::from_parts(Ipv4Addr::new(10, 0, 1, 0), 24);

/// Build the built-in declaration
pub fn minimal_web_stack() -> Stack {
    let mut stack = Stack::new(PROJECT_NAME);
    stack.description = Some("A minimal VPC with a single web server".to_string());

    stack.add(
        Resource::new(
            VPC_NAME,
            ResourceKind::Vpc(Vpc {
                cidr_block: VPC_CIDR,
                enable_dns_support: true,
                enable_dns_hostnames: true,
            }),
        )
        .with_name_tag(),
    );

    stack.add(
        Resource::new(
            SUBNET_NAME,
            ResourceKind::Subnet(Subnet {
                vpc: ResourceRef::new(VPC_NAME),
                cidr_block: SUBNET_CIDR,
                map_public_ip_on_launch: true,
                availability_zone: None,
            }),
        )
        .with_name_tag(),
    );

    stack.add(Resource::new(
        GATEWAY_NAME,
        ResourceKind::InternetGateway(InternetGateway {
            vpc: ResourceRef::new(VPC_NAME),
        }),
    ));

    stack.add(Resource::new(
        ROUTE_TABLE_NAME,
        ResourceKind::RouteTable(RouteTable {
            vpc: ResourceRef::new(VPC_NAME),
            routes: vec![Route {
                cidr_block: Cidr::any(),
                gateway: ResourceRef::new(GATEWAY_NAME),
            }],
        }),
    ));

    stack.add(Resource::new(
        ROUTE_ASSOCIATION_NAME,
        ResourceKind::RouteTableAssociation(RouteTableAssociation {
            subnet: ResourceRef::new(SUBNET_NAME),
            route_table: ResourceRef::new(ROUTE_TABLE_NAME),
        }),
    ));

    stack.add(
        Resource::new(
            SECURITY_GROUP_NAME,
            ResourceKind::SecurityGroup(SecurityGroup {
                vpc: ResourceRef::new(VPC_NAME),
                description: Some("Allow SSH and HTTP access".to_string()),
                ingress: vec![
                    FirewallRule::tcp(22, Cidr::any()),
                    FirewallRule::tcp(80, Cidr::any()),
                ],
                egress: vec![FirewallRule::allow_all(Cidr::any())],
            }),
        )
        .with_name_tag(),
    );

    stack.add(Resource::new(
        AMI_NAME,
        ResourceKind::Ami(AmiLookup {
            most_recent: true,
            owners: vec![AMI_OWNER.to_string()],
            filters: vec![AmiFilter {
                name: "name".to_string(),
                values: vec![AMI_NAME_PATTERN.to_string()],
            }],
            image_id: None,
        }),
    ));

    stack.add(
        Resource::new(
            INSTANCE_NAME,
            ResourceKind::Instance(Instance {
                instance_type: INSTANCE_TYPE.to_string(),
                ami: ResourceRef::new(AMI_NAME),
                subnet: ResourceRef::new(SUBNET_NAME),
                security_groups: vec![ResourceRef::new(SECURITY_GROUP_NAME)],
                associate_public_ip_address: true,
                user_data: Some(UserData::Inline(BOOT_SCRIPT.to_string())),
            }),
        )
        .with_name_tag(),
    );

    stack.add_output(Output::new(OUTPUT_PUBLIC_IP, INSTANCE_NAME, "publicIp"));
    stack.add_output(Output::new(OUTPUT_PUBLIC_DNS, INSTANCE_NAME, "publicDns"));

    stack
}
