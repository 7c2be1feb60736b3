//! Network resource node parsing

use super::{
    args, first_bool, first_string, parse_cidr, property_port, property_string, required,
};
use crate::error::{Result, StackError};
use crate::model::{
    FirewallRule, InternetGateway, Protocol, ResourceKind, ResourceRef, Route, RouteTable,
    RouteTableAssociation, SecurityGroup, Subnet, Vpc,
};
use kdl::KdlNode;
use tracing::debug;

fn reference(node: &KdlNode) -> Option<ResourceRef> {
    first_string(node).map(ResourceRef::new)
}

/// vpc "name" { cidr-block "10.0.0.0/16"; enable-dns-support #true; ... }
pub fn parse_vpc(name: &str, children: &[KdlNode]) -> Result<ResourceKind> {
    let mut cidr_block = None;
    // EC2 defaults
    let mut enable_dns_support = true;
    let mut enable_dns_hostnames = false;

    for child in children {
        match child.name().value() {
            "cidr-block" | "cidr_block" | "cidr" => {
                let value = required(first_string(child), name, "a cidr-block value")?;
                cidr_block = Some(parse_cidr(&value, name)?);
            }
            "enable-dns-support" | "enable_dns_support" => {
                enable_dns_support = first_bool(child).unwrap_or(true);
            }
            "enable-dns-hostnames" | "enable_dns_hostnames" => {
                enable_dns_hostnames = first_bool(child).unwrap_or(true);
            }
            "tags" => {}
            other => debug!(resource = %name, child = %other, "Ignoring unknown vpc setting"),
        }
    }

    Ok(ResourceKind::Vpc(Vpc {
        cidr_block: required(cidr_block, name, "cidr-block")?,
        enable_dns_support,
        enable_dns_hostnames,
    }))
}

/// subnet "name" { vpc "main"; cidr-block "10.0.1.0/24"; map-public-ip-on-launch #true; }
pub fn parse_subnet(name: &str, children: &[KdlNode]) -> Result<ResourceKind> {
    let mut vpc = None;
    let mut cidr_block = None;
    let mut map_public_ip_on_launch = false;
    let mut availability_zone = None;

    for child in children {
        match child.name().value() {
            "vpc" => vpc = reference(child),
            "cidr-block" | "cidr_block" | "cidr" => {
                let value = required(first_string(child), name, "a cidr-block value")?;
                cidr_block = Some(parse_cidr(&value, name)?);
            }
            "map-public-ip-on-launch" | "map_public_ip_on_launch" => {
                map_public_ip_on_launch = first_bool(child).unwrap_or(true);
            }
            "availability-zone" | "availability_zone" => {
                availability_zone = first_string(child);
            }
            "tags" => {}
            other => debug!(resource = %name, child = %other, "Ignoring unknown subnet setting"),
        }
    }

    Ok(ResourceKind::Subnet(Subnet {
        vpc: required(vpc, name, "vpc")?,
        cidr_block: required(cidr_block, name, "cidr-block")?,
        map_public_ip_on_launch,
        availability_zone,
    }))
}

/// internet-gateway "name" { vpc "main"; }
pub fn parse_internet_gateway(name: &str, children: &[KdlNode]) -> Result<ResourceKind> {
    let vpc = children
        .iter()
        .find(|c| c.name().value() == "vpc")
        .and_then(reference);

    Ok(ResourceKind::InternetGateway(InternetGateway {
        vpc: required(vpc, name, "vpc")?,
    }))
}

/// route-table "name" { vpc "main"; route "0.0.0.0/0" gateway="igw"; }
pub fn parse_route_table(name: &str, children: &[KdlNode]) -> Result<ResourceKind> {
    let mut vpc = None;
    let mut routes = Vec::new();

    for child in children {
        match child.name().value() {
            "vpc" => vpc = reference(child),
            "route" => {
                let cidr = required(first_string(child), name, "a route destination")?;
                let gateway = required(property_string(child, "gateway"), name, "route gateway")?;
                routes.push(Route {
                    cidr_block: parse_cidr(&cidr, name)?,
                    gateway: ResourceRef::new(gateway),
                });
            }
            "tags" => {}
            other => {
                debug!(resource = %name, child = %other, "Ignoring unknown route-table setting")
            }
        }
    }

    Ok(ResourceKind::RouteTable(RouteTable {
        vpc: required(vpc, name, "vpc")?,
        routes,
    }))
}

/// route-table-association "name" { subnet "public"; route-table "rt"; }
pub fn parse_route_table_association(name: &str, children: &[KdlNode]) -> Result<ResourceKind> {
    let mut subnet = None;
    let mut route_table = None;

    for child in children {
        match child.name().value() {
            "subnet" => subnet = reference(child),
            "route-table" | "route_table" => route_table = reference(child),
            other => {
                debug!(resource = %name, child = %other, "Ignoring unknown association setting");
            }
        }
    }

    Ok(ResourceKind::RouteTableAssociation(RouteTableAssociation {
        subnet: required(subnet, name, "subnet")?,
        route_table: required(route_table, name, "route-table")?,
    }))
}

/// security-group "name" { vpc "main"; ingress "tcp" port=22 cidr="0.0.0.0/0"; }
pub fn parse_security_group(name: &str, children: &[KdlNode]) -> Result<ResourceKind> {
    let mut vpc = None;
    let mut description = None;
    let mut ingress = Vec::new();
    let mut egress = Vec::new();

    for child in children {
        match child.name().value() {
            "vpc" => vpc = reference(child),
            "description" => description = first_string(child),
            "ingress" => ingress.push(parse_rule(child, name)?),
            "egress" => egress.push(parse_rule(child, name)?),
            "tags" => {}
            other => {
                debug!(resource = %name, child = %other, "Ignoring unknown security-group setting")
            }
        }
    }

    Ok(ResourceKind::SecurityGroup(SecurityGroup {
        vpc: required(vpc, name, "vpc")?,
        description,
        ingress,
        egress,
    }))
}

/// Parse a firewall rule
///
/// Supported forms:
/// - `ingress "tcp" port=22 cidr="0.0.0.0/0"`
/// - `ingress "tcp" from=8000 to=8080 cidr="10.0.0.0/8"`
/// - `ingress "tcp" "10.0.0.0/8" "192.168.0.0/16" port=443` (extra positional CIDRs)
/// - `egress "all" cidr="0.0.0.0/0"`
fn parse_rule(node: &KdlNode, resource: &str) -> Result<FirewallRule> {
    let mut positional = args(node).filter_map(|v| v.as_string());

    let protocol = positional
        .next()
        .ok_or_else(|| StackError::InvalidConfig(format!("{}: rule requires a protocol", resource)))
        .and_then(Protocol::parse)?;

    let mut cidr_blocks = Vec::new();
    for value in positional {
        cidr_blocks.push(parse_cidr(value, resource)?);
    }
    if let Some(value) = property_string(node, "cidr") {
        cidr_blocks.push(parse_cidr(&value, resource)?);
    }
    if cidr_blocks.is_empty() {
        return Err(StackError::InvalidConfig(format!(
            "{}: {} rule requires at least one cidr",
            resource, protocol
        )));
    }

    let port = property_port(node, "port")?;
    let from_port = property_port(node, "from")?.or(port);
    let to_port = property_port(node, "to")?.or(port).or(from_port);

    let (from_port, to_port) = match (protocol, from_port, to_port) {
        (Protocol::Tcp | Protocol::Udp, Some(from), Some(to)) => (from, to),
        (Protocol::Tcp | Protocol::Udp, _, _) => {
            return Err(StackError::InvalidConfig(format!(
                "{}: {} rule requires port or from/to",
                resource, protocol
            )));
        }
        (_, from, to) => (from.unwrap_or(0), to.unwrap_or(0)),
    };

    Ok(FirewallRule {
        protocol,
        from_port,
        to_port,
        cidr_blocks,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::Cidr;

    fn node_from(kdl: &str) -> KdlNode {
        let doc: kdl::KdlDocument = kdl.parse().unwrap();
        doc.nodes().first().unwrap().clone()
    }

    fn nodes(node: &KdlNode) -> &[KdlNode] {
        node.children().unwrap().nodes()
    }

    #[test]
    fn test_parse_vpc() {
        let node = node_from(
            r#"
            vpc "main" {
                cidr-block "10.0.0.0/16"
                enable-dns-hostnames #true
            }
        "#,
        );

        match parse_vpc("main", nodes(&node)).unwrap() {
            ResourceKind::Vpc(vpc) => {
                assert_eq!(vpc.cidr_block.to_string(), "10.0.0.0/16");
                assert!(vpc.enable_dns_support);
                assert!(vpc.enable_dns_hostnames);
            }
            other => panic!("unexpected kind: {:?}", other),
        }
    }

    #[test]
    fn test_parse_vpc_requires_cidr() {
        let node = node_from(r#"vpc "main" { enable-dns-support #false; }"#);
        assert!(parse_vpc("main", nodes(&node)).is_err());
    }

    #[test]
    fn test_parse_vpc_invalid_cidr() {
        let node = node_from(r#"vpc "main" { cidr-block "10.0.0.1/16"; }"#);
        assert!(parse_vpc("main", nodes(&node)).is_err());
    }

    #[test]
    fn test_parse_subnet_requires_vpc() {
        let node = node_from(r#"subnet "public" { cidr-block "10.0.1.0/24"; }"#);
        let err = parse_subnet("public", nodes(&node)).unwrap_err();
        assert!(err.to_string().contains("requires vpc"));
    }

    #[test]
    fn test_parse_route_table() {
        let node = node_from(
            r#"
            route-table "rt" {
                vpc "main"
                route "0.0.0.0/0" gateway="igw"
            }
        "#,
        );

        match parse_route_table("rt", nodes(&node)).unwrap() {
            ResourceKind::RouteTable(rt) => {
                assert_eq!(rt.vpc.name(), "main");
                assert_eq!(rt.routes.len(), 1);
                assert_eq!(rt.routes[0].cidr_block, Cidr::any());
                assert_eq!(rt.routes[0].gateway.name(), "igw");
            }
            other => panic!("unexpected kind: {:?}", other),
        }
    }

    #[test]
    fn test_parse_route_without_gateway() {
        let node = node_from(r#"route-table "rt" { vpc "main"; route "0.0.0.0/0"; }"#);
        assert!(parse_route_table("rt", nodes(&node)).is_err());
    }

    #[test]
    fn test_parse_security_group_rules() {
        let node = node_from(
            r#"
            security-group "web" {
                vpc "main"
                description "web traffic"
                ingress "tcp" port=22 cidr="0.0.0.0/0"
                ingress "tcp" from=8000 to=8080 "10.0.0.0/8" "192.168.0.0/16"
                egress "all" cidr="0.0.0.0/0"
            }
        "#,
        );

        match parse_security_group("web", nodes(&node)).unwrap() {
            ResourceKind::SecurityGroup(sg) => {
                assert_eq!(sg.description.as_deref(), Some("web traffic"));
                assert_eq!(sg.ingress[0], FirewallRule::tcp(22, Cidr::any()));
                assert_eq!(sg.ingress[1].from_port, 8000);
                assert_eq!(sg.ingress[1].to_port, 8080);
                assert_eq!(sg.ingress[1].cidr_blocks.len(), 2);
                assert_eq!(sg.egress, vec![FirewallRule::allow_all(Cidr::any())]);
            }
            other => panic!("unexpected kind: {:?}", other),
        }
    }

    #[test]
    fn test_parse_rule_errors() {
        let missing_port =
            node_from(r#"security-group "sg" { vpc "main"; ingress "tcp" cidr="0.0.0.0/0"; }"#);
        assert!(parse_security_group("sg", nodes(&missing_port)).is_err());

        let missing_cidr =
            node_from(r#"security-group "sg" { vpc "main"; ingress "tcp" port=80; }"#);
        assert!(parse_security_group("sg", nodes(&missing_cidr)).is_err());

        let bad_protocol = node_from(
            r#"security-group "sg" { vpc "main"; ingress "sctp" port=80 cidr="0.0.0.0/0"; }"#,
        );
        assert!(parse_security_group("sg", nodes(&bad_protocol)).is_err());

        let bad_port = node_from(
            r#"security-group "sg" { vpc "main"; ingress "tcp" port=70000 cidr="0.0.0.0/0"; }"#,
        );
        assert!(parse_security_group("sg", nodes(&bad_port)).is_err());
    }
}
