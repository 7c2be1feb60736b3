//! Compute resource and output node parsing

use super::{first_bool, first_string, property_string, required, strings};
use crate::error::{Result, StackError};
use crate::model::{AmiFilter, AmiLookup, Instance, Output, ResourceKind, ResourceRef, UserData};
use kdl::KdlNode;
use std::path::PathBuf;
use tracing::debug;

/// ami "name" { most-recent #true; owners "amazon"; filter "name" "amzn2-*"; }
///
/// `image-id "ami-0abc"` pins the image and skips the lookup.
pub fn parse_ami(name: &str, children: &[KdlNode]) -> Result<ResourceKind> {
    let mut lookup = AmiLookup::default();

    for child in children {
        match child.name().value() {
            "most-recent" | "most_recent" => {
                lookup.most_recent = first_bool(child).unwrap_or(true);
            }
            "owners" | "owner" => lookup.owners.extend(strings(child)),
            "filter" => {
                let mut values = strings(child);
                if values.len() < 2 {
                    return Err(StackError::InvalidConfig(format!(
                        "{}: filter requires a name and at least one value",
                        name
                    )));
                }
                let filter_name = values.remove(0);
                lookup.filters.push(AmiFilter {
                    name: filter_name,
                    values,
                });
            }
            "image-id" | "image_id" => lookup.image_id = first_string(child),
            "tags" => {}
            other => debug!(resource = %name, child = %other, "Ignoring unknown ami setting"),
        }
    }

    if lookup.image_id.is_none() && lookup.owners.is_empty() && lookup.filters.is_empty() {
        return Err(StackError::InvalidConfig(format!(
            "{} requires image-id, owners or filter",
            name
        )));
    }

    Ok(ResourceKind::Ami(lookup))
}

/// instance "name" { instance-type "t2.micro"; ami "ami"; subnet "public"; security-groups "web"; }
pub fn parse_instance(name: &str, children: &[KdlNode]) -> Result<ResourceKind> {
    let mut instance_type = None;
    let mut ami = None;
    let mut subnet = None;
    let mut security_groups = Vec::new();
    let mut associate_public_ip_address = false;
    let mut user_data = None;

    for child in children {
        match child.name().value() {
            "instance-type" | "instance_type" => instance_type = first_string(child),
            "ami" => ami = first_string(child).map(ResourceRef::new),
            "subnet" => subnet = first_string(child).map(ResourceRef::new),
            "security-groups" | "security_groups" | "security-group" | "security_group" => {
                security_groups.extend(strings(child).into_iter().map(ResourceRef::new));
            }
            "associate-public-ip-address" | "associate_public_ip_address" => {
                associate_public_ip_address = first_bool(child).unwrap_or(true);
            }
            "user-data" | "user_data" => {
                user_data = first_string(child).map(UserData::Inline);
            }
            "user-data-file" | "user_data_file" => {
                user_data = first_string(child).map(|p| UserData::File(PathBuf::from(p)));
            }
            "tags" => {}
            other => debug!(resource = %name, child = %other, "Ignoring unknown instance setting"),
        }
    }

    Ok(ResourceKind::Instance(Instance {
        instance_type: required(instance_type, name, "instance-type")?,
        ami: required(ami, name, "ami")?,
        subnet: required(subnet, name, "subnet")?,
        security_groups,
        associate_public_ip_address,
        user_data,
    }))
}

/// output "instance_public_ip" resource="web" attribute="publicIp"
pub fn parse_output(node: &KdlNode) -> Result<Output> {
    let name = first_string(node)
        .ok_or_else(|| StackError::InvalidConfig("output requires a name".to_string()))?;
    let resource = required(property_string(node, "resource"), &name, "resource")?;
    let attribute = required(property_string(node, "attribute"), &name, "attribute")?;

    Ok(Output::new(name, resource, attribute))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn node_from(kdl: &str) -> KdlNode {
        let doc: kdl::KdlDocument = kdl.parse().unwrap();
        doc.nodes().first().unwrap().clone()
    }

    fn nodes(node: &KdlNode) -> &[KdlNode] {
        node.children().unwrap().nodes()
    }

    #[test]
    fn test_parse_ami_lookup() {
        let node = node_from(
            r#"
            ami "ami" {
                most-recent #true
                owners "amazon" "self"
                filter "name" "amzn2-ami-hvm-*-x86_64-gp2"
                filter "architecture" "x86_64"
            }
        "#,
        );

        match parse_ami("ami", nodes(&node)).unwrap() {
            ResourceKind::Ami(lookup) => {
                assert!(lookup.most_recent);
                assert_eq!(lookup.owners, vec!["amazon", "self"]);
                assert_eq!(lookup.filters.len(), 2);
                assert_eq!(lookup.filters[0].name, "name");
                assert_eq!(lookup.filters[0].values, vec!["amzn2-ami-hvm-*-x86_64-gp2"]);
                assert!(lookup.image_id.is_none());
            }
            other => panic!("unexpected kind: {:?}", other),
        }
    }

    #[test]
    fn test_parse_pinned_ami() {
        let node = node_from(r#"ami "ami" { image-id "ami-0123456789abcdef0"; }"#);
        match parse_ami("ami", nodes(&node)).unwrap() {
            ResourceKind::Ami(lookup) => {
                assert_eq!(lookup.image_id.as_deref(), Some("ami-0123456789abcdef0"));
            }
            other => panic!("unexpected kind: {:?}", other),
        }
    }

    #[test]
    fn test_parse_ami_without_selection() {
        let node = node_from(r#"ami "ami" { most-recent #true; }"#);
        assert!(parse_ami("ami", nodes(&node)).is_err());

        let short_filter = node_from(r#"ami "ami" { filter "name"; }"#);
        assert!(parse_ami("ami", nodes(&short_filter)).is_err());
    }

    #[test]
    fn test_parse_instance() {
        let node = node_from(
            r#"
            instance "web" {
                instance-type "t2.micro"
                ami "ami"
                subnet "public"
                security-groups "web-sg" "ssh-sg"
                associate-public-ip-address #true
                user-data-file "scripts/boot.sh"
            }
        "#,
        );

        match parse_instance("web", nodes(&node)).unwrap() {
            ResourceKind::Instance(instance) => {
                assert_eq!(instance.instance_type, "t2.micro");
                assert_eq!(instance.ami.name(), "ami");
                assert_eq!(instance.subnet.name(), "public");
                assert_eq!(instance.security_groups.len(), 2);
                assert!(instance.associate_public_ip_address);
                assert_eq!(
                    instance.user_data,
                    Some(UserData::File(PathBuf::from("scripts/boot.sh")))
                );
            }
            other => panic!("unexpected kind: {:?}", other),
        }
    }

    #[test]
    fn test_parse_instance_requires_type() {
        let node = node_from(r#"instance "web" { ami "ami"; subnet "public"; }"#);
        let err = parse_instance("web", nodes(&node)).unwrap_err();
        assert!(err.to_string().contains("instance-type"));
    }

    #[test]
    fn test_parse_output() {
        let node = node_from(r#"output "ip" resource="web" attribute="publicIp""#);
        let output = parse_output(&node).unwrap();
        assert_eq!(output.name, "ip");
        assert_eq!(output.resource.name(), "web");
        assert_eq!(output.attribute, "publicIp");

        let missing = node_from(r#"output "ip" resource="web""#);
        assert!(parse_output(&missing).is_err());
    }
}
