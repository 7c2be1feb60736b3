//! Resource model
//!
//! Typed cloud resources and the references between them. A reference is a
//! directed edge to a resource that must exist before the referencing one.

use super::network::{Cidr, FirewallRule};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;
use std::path::PathBuf;

/// Logical name of another resource in the same stack
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ResourceRef(String);

impl ResourceRef {
    pub fn new(name: impl Into<String>) -> Self {
        Self(name.into())
    }

    pub fn name(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for ResourceRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Resource type
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum ResourceType {
    Vpc,
    Subnet,
    InternetGateway,
    RouteTable,
    RouteTableAssociation,
    SecurityGroup,
    Ami,
    Instance,
}

impl ResourceType {
    /// Node name used in stack.kdl
    pub fn kdl_name(&self) -> &'static str {
        match self {
            Self::Vpc => "vpc",
            Self::Subnet => "subnet",
            Self::InternetGateway => "internet-gateway",
            Self::RouteTable => "route-table",
            Self::RouteTableAssociation => "route-table-association",
            Self::SecurityGroup => "security-group",
            Self::Ami => "ami",
            Self::Instance => "instance",
        }
    }

    /// Pulumi type token (or function token for lookups)
    pub fn engine_token(&self) -> &'static str {
        match self {
            Self::Vpc => "aws:ec2:Vpc",
            Self::Subnet => "aws:ec2:Subnet",
            Self::InternetGateway => "aws:ec2:InternetGateway",
            Self::RouteTable => "aws:ec2:RouteTable",
            Self::RouteTableAssociation => "aws:ec2:RouteTableAssociation",
            Self::SecurityGroup => "aws:ec2:SecurityGroup",
            Self::Ami => "aws:ec2:getAmi",
            Self::Instance => "aws:ec2:Instance",
        }
    }

    /// Lookups are resolved by the engine, never created
    pub fn is_lookup(&self) -> bool {
        matches!(self, Self::Ami)
    }
}

impl fmt::Display for ResourceType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.kdl_name())
    }
}

/// Isolated IP address space
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Vpc {
    pub cidr_block: Cidr,
    pub enable_dns_support: bool,
    pub enable_dns_hostnames: bool,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Subnet {
    pub vpc: ResourceRef,
    pub cidr_block: Cidr,
    pub map_public_ip_on_launch: bool,
    pub availability_zone: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct InternetGateway {
    pub vpc: ResourceRef,
}

/// Routing rule sending `cidr_block` through an internet gateway
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Route {
    pub cidr_block: Cidr,
    pub gateway: ResourceRef,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RouteTable {
    pub vpc: ResourceRef,
    pub routes: Vec<Route>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RouteTableAssociation {
    pub subnet: ResourceRef,
    pub route_table: ResourceRef,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SecurityGroup {
    pub vpc: ResourceRef,
    pub description: Option<String>,
    pub ingress: Vec<FirewallRule>,
    pub egress: Vec<FirewallRule>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AmiFilter {
    pub name: String,
    pub values: Vec<String>,
}

/// Boot image lookup
///
/// With `image_id` set the lookup is skipped and the image is pinned.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct AmiLookup {
    pub most_recent: bool,
    pub owners: Vec<String>,
    pub filters: Vec<AmiFilter>,
    pub image_id: Option<String>,
}

/// Boot script of an instance
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum UserData {
    Inline(String),
    /// Path relative to the project root, read by the loader
    File(PathBuf),
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Instance {
    pub instance_type: String,
    pub ami: ResourceRef,
    pub subnet: ResourceRef,
    pub security_groups: Vec<ResourceRef>,
    pub associate_public_ip_address: bool,
    pub user_data: Option<UserData>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "kebab-case")]
pub enum ResourceKind {
    Vpc(Vpc),
    Subnet(Subnet),
    InternetGateway(InternetGateway),
    RouteTable(RouteTable),
    RouteTableAssociation(RouteTableAssociation),
    SecurityGroup(SecurityGroup),
    Ami(AmiLookup),
    Instance(Instance),
}

/// An outgoing edge of a resource
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Reference<'a> {
    /// Field holding the reference (`vpc`, `subnet`, ...)
    pub field: &'static str,
    pub target: &'a ResourceRef,
    pub expected: ResourceType,
}

impl<'a> Reference<'a> {
    fn new(field: &'static str, target: &'a ResourceRef, expected: ResourceType) -> Self {
        Self {
            field,
            target,
            expected,
        }
    }
}

impl ResourceKind {
    pub fn resource_type(&self) -> ResourceType {
        match self {
            Self::Vpc(_) => ResourceType::Vpc,
            Self::Subnet(_) => ResourceType::Subnet,
            Self::InternetGateway(_) => ResourceType::InternetGateway,
            Self::RouteTable(_) => ResourceType::RouteTable,
            Self::RouteTableAssociation(_) => ResourceType::RouteTableAssociation,
            Self::SecurityGroup(_) => ResourceType::SecurityGroup,
            Self::Ami(_) => ResourceType::Ami,
            Self::Instance(_) => ResourceType::Instance,
        }
    }

    pub fn references(&self) -> Vec<Reference<'_>> {
        match self {
            Self::Vpc(_) | Self::Ami(_) => Vec::new(),
            Self::Subnet(s) => vec![Reference::new("vpc", &s.vpc, ResourceType::Vpc)],
            Self::InternetGateway(g) => vec![Reference::new("vpc", &g.vpc, ResourceType::Vpc)],
            Self::RouteTable(rt) => {
                let mut refs = vec![Reference::new("vpc", &rt.vpc, ResourceType::Vpc)];
                refs.extend(rt.routes.iter().map(|r| {
                    Reference::new("gateway", &r.gateway, ResourceType::InternetGateway)
                }));
                refs
            }
            Self::RouteTableAssociation(a) => vec![
                Reference::new("subnet", &a.subnet, ResourceType::Subnet),
                Reference::new("route-table", &a.route_table, ResourceType::RouteTable),
            ],
            Self::SecurityGroup(sg) => vec![Reference::new("vpc", &sg.vpc, ResourceType::Vpc)],
            Self::Instance(i) => {
                let mut refs = vec![
                    Reference::new("ami", &i.ami, ResourceType::Ami),
                    Reference::new("subnet", &i.subnet, ResourceType::Subnet),
                ];
                refs.extend(i.security_groups.iter().map(|sg| {
                    Reference::new("security-groups", sg, ResourceType::SecurityGroup)
                }));
                refs
            }
        }
    }
}

/// A named resource in a stack
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Resource {
    /// Logical name, unique within the stack
    pub name: String,
    pub tags: BTreeMap<String, String>,
    pub kind: ResourceKind,
}

impl Resource {
    pub fn new(name: impl Into<String>, kind: ResourceKind) -> Self {
        Self {
            name: name.into(),
            tags: BTreeMap::new(),
            kind,
        }
    }

    pub fn with_tag(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.tags.insert(key.into(), value.into());
        self
    }

    /// Tag the resource with `Name = <logical name>`
    pub fn with_name_tag(self) -> Self {
        let name = self.name.clone();
        self.with_tag("Name", name)
    }

    pub fn resource_type(&self) -> ResourceType {
        self.kind.resource_type()
    }

    pub fn references(&self) -> Vec<Reference<'_>> {
        self.kind.references()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn vpc_ref() -> ResourceRef {
        ResourceRef::new("main-vpc")
    }

    #[test]
    fn test_vpc_has_no_references() {
        let kind = ResourceKind::Vpc(Vpc {
            cidr_block: "10.0.0.0/16".parse().unwrap(),
            enable_dns_support: true,
            enable_dns_hostnames: true,
        });
        assert!(kind.references().is_empty());
        assert_eq!(kind.resource_type(), ResourceType::Vpc);
    }

    #[test]
    fn test_route_table_references_vpc_and_gateways() {
        let kind = ResourceKind::RouteTable(RouteTable {
            vpc: vpc_ref(),
            routes: vec![Route {
                cidr_block: Cidr::any(),
                gateway: ResourceRef::new("igw"),
            }],
        });

        let refs = kind.references();
        assert_eq!(refs.len(), 2);
        assert_eq!(refs[0].target.name(), "main-vpc");
        assert_eq!(refs[0].expected, ResourceType::Vpc);
        assert_eq!(refs[1].target.name(), "igw");
        assert_eq!(refs[1].expected, ResourceType::InternetGateway);
    }

    #[test]
    fn test_instance_references() {
        let kind = ResourceKind::Instance(Instance {
            instance_type: "t2.micro".to_string(),
            ami: ResourceRef::new("ami"),
            subnet: ResourceRef::new("public"),
            security_groups: vec![ResourceRef::new("web"), ResourceRef::new("ssh")],
            associate_public_ip_address: true,
            user_data: None,
        });

        let targets: Vec<&str> = kind.references().iter().map(|r| r.target.name()).collect();
        assert_eq!(targets, vec!["ami", "public", "web", "ssh"]);
    }

    #[test]
    fn test_name_tag() {
        let resource = Resource::new(
            "igw",
            ResourceKind::InternetGateway(InternetGateway { vpc: vpc_ref() }),
        )
        .with_name_tag();
        assert_eq!(resource.tags.get("Name"), Some(&"igw".to_string()));
    }

    #[test]
    fn test_lookup_types() {
        assert!(ResourceType::Ami.is_lookup());
        assert!(!ResourceType::Instance.is_lookup());
        assert_eq!(ResourceType::Ami.engine_token(), "aws:ec2:getAmi");
        assert_eq!(
            ResourceType::RouteTableAssociation.to_string(),
            "route-table-association"
        );
    }
}
