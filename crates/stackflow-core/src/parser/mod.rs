//! KDL parser
//!
//! Parses `stack.kdl` into a [`Stack`]. Resource node parsers live in
//! separate modules by concern.

mod compute;
mod network;

use compute::{parse_ami, parse_instance, parse_output};
use network::{
    parse_internet_gateway, parse_route_table, parse_route_table_association,
    parse_security_group, parse_subnet, parse_vpc,
};

use crate::error::{Result, StackError};
use crate::model::{Cidr, Resource, ResourceKind, ResourceType, Stack};
use crate::template::{TemplateProcessor, extract_variables, has_template_syntax};
use kdl::{KdlDocument, KdlNode};
use std::collections::BTreeMap;
use std::fs;
use std::path::Path;
use tracing::debug;

/// Parse a KDL file into a Stack
///
/// The project name defaults to the name of the directory holding the file.
pub fn parse_kdl_file<P: AsRef<Path>>(path: P) -> Result<Stack> {
    let content = fs::read_to_string(path.as_ref()).map_err(|e| StackError::IoError {
        path: path.as_ref().to_path_buf(),
        message: e.to_string(),
    })?;
    let name = path
        .as_ref()
        .parent()
        .and_then(|p| p.file_name())
        .and_then(|n| n.to_str())
        .unwrap_or("unnamed")
        .to_string();
    parse_kdl_string(&content, name)
}

/// Parse KDL content into a Stack
///
/// `{{ name }}` references inside string values are expanded from the
/// file's own `variables` blocks before the resources are read.
pub fn parse_kdl_string(content: &str, default_name: String) -> Result<Stack> {
    let mut doc: KdlDocument = content.parse()?;

    if has_template_syntax(content) {
        let mut processor = TemplateProcessor::new();
        processor.add_variables(extract_variables(&doc));
        processor.expand_document(&mut doc)?;
    }

    let mut stack = Stack::new(default_name);

    for node in doc.nodes() {
        match node.name().value() {
            "project" => {
                if let Some(name) = first_string(node) {
                    stack.name = name;
                }
            }
            "region" => stack.region = first_string(node),
            "description" => stack.description = first_string(node),
            "variables" => {
                // Already consumed by template expansion
            }
            "vpc" => stack.add(parse_resource(node, ResourceType::Vpc, parse_vpc)?),
            "subnet" => stack.add(parse_resource(node, ResourceType::Subnet, parse_subnet)?),
            "internet-gateway" | "internet_gateway" => stack.add(parse_resource(
                node,
                ResourceType::InternetGateway,
                parse_internet_gateway,
            )?),
            "route-table" | "route_table" => stack.add(parse_resource(
                node,
                ResourceType::RouteTable,
                parse_route_table,
            )?),
            "route-table-association" | "route_table_association" => stack.add(parse_resource(
                node,
                ResourceType::RouteTableAssociation,
                parse_route_table_association,
            )?),
            "security-group" | "security_group" => stack.add(parse_resource(
                node,
                ResourceType::SecurityGroup,
                parse_security_group,
            )?),
            "ami" => stack.add(parse_resource(node, ResourceType::Ami, parse_ami)?),
            "instance" => stack.add(parse_resource(node, ResourceType::Instance, parse_instance)?),
            "output" => stack.add_output(parse_output(node)?),
            other => {
                debug!(node = %other, "Skipping unknown node");
            }
        }
    }

    debug!(
        resources = stack.resources.len(),
        outputs = stack.outputs.len(),
        "Parsed stack"
    );
    Ok(stack)
}

/// Parse the shared parts of a resource node (name, tags) and hand the
/// children to the type-specific parser
fn parse_resource(
    node: &KdlNode,
    resource_type: ResourceType,
    parse_kind: fn(&str, &[KdlNode]) -> Result<ResourceKind>,
) -> Result<Resource> {
    let name = first_string(node).ok_or_else(|| {
        StackError::InvalidConfig(format!("{} requires a name", resource_type))
    })?;

    let children = node.children().map(|c| c.nodes()).unwrap_or_default();
    let kind = parse_kind(&name, children)?;

    let mut resource = Resource::new(name, kind);
    if let Some(tags) = children.iter().find(|c| c.name().value() == "tags") {
        resource.tags = parse_tags(tags);
    }

    Ok(resource)
}

/// `tags { Name "web"; Team "infra"; }`
fn parse_tags(node: &KdlNode) -> BTreeMap<String, String> {
    let mut tags = BTreeMap::new();
    if let Some(children) = node.children() {
        for tag in children.nodes() {
            if let Some(value) = first_string(tag) {
                tags.insert(tag.name().value().to_string(), value);
            }
        }
    }
    tags
}

/// Positional (unnamed) arguments of a node
fn args(node: &KdlNode) -> impl Iterator<Item = &kdl::KdlValue> {
    node.entries()
        .iter()
        .filter(|e| e.name().is_none())
        .map(|e| e.value())
}

fn first_string(node: &KdlNode) -> Option<String> {
    args(node).next().and_then(|v| v.as_string()).map(|s| s.to_string())
}

fn first_bool(node: &KdlNode) -> Option<bool> {
    args(node).next().and_then(|v| v.as_bool())
}

fn strings(node: &KdlNode) -> Vec<String> {
    args(node)
        .filter_map(|v| v.as_string().map(|s| s.to_string()))
        .collect()
}

fn property_string(node: &KdlNode, key: &str) -> Option<String> {
    node.get(key).and_then(|v| v.as_string()).map(|s| s.to_string())
}

fn property_port(node: &KdlNode, key: &str) -> Result<Option<u16>> {
    match node.get(key).and_then(|v| v.as_integer()) {
        Some(v) => u16::try_from(v)
            .map(Some)
            .map_err(|_| StackError::InvalidConfig(format!("port {} is out of range", v))),
        None => Ok(None),
    }
}

fn parse_cidr(value: &str, resource: &str) -> Result<Cidr> {
    value
        .parse()
        .map_err(|e| StackError::InvalidConfig(format!("{}: {}", resource, e)))
}

fn required<T>(value: Option<T>, resource: &str, field: &str) -> Result<T> {
    value.ok_or_else(|| StackError::InvalidConfig(format!("{} requires {}", resource, field)))
}
