//! Pulumi YAML rendering
//!
//! Turns a validated [`Stack`] into a `Pulumi.yaml` program. Managed
//! resources become `resources` entries in declaration order, image lookups
//! become `variables` evaluated with `fn::invoke`, and outputs become
//! `${resource.attribute}` interpolations.

use crate::error::{Result, StackError};
use crate::graph::ResourceGraph;
use crate::model::{
    AmiLookup, FirewallRule, Instance, Resource, ResourceKind, ResourceRef, ResourceType,
    RouteTable, SecurityGroup, Stack, Subnet, UserData, Vpc,
};
use serde::Serialize;
use serde_yaml::{Mapping, Value};
use std::collections::BTreeMap;
use tracing::{debug, instrument};

/// Runtime name understood by the engine for YAML programs
pub const RUNTIME: &str = "yaml";

/// Stack config key the AWS provider reads its region from
pub const REGION_CONFIG_KEY: &str = "aws:region";

#[derive(Debug, Serialize)]
struct Program<'a> {
    name: &'a str,
    runtime: &'static str,
    #[serde(skip_serializing_if = "Option::is_none")]
    description: Option<&'a str>,
    #[serde(skip_serializing_if = "Mapping::is_empty")]
    variables: Mapping,
    resources: Mapping,
    #[serde(skip_serializing_if = "Mapping::is_empty")]
    outputs: Mapping,
}

#[derive(Debug, Serialize)]
struct ResourceEntry<P: Serialize> {
    #[serde(rename = "type")]
    resource_type: &'static str,
    properties: P,
}

type Tags = BTreeMap<String, String>;

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct VpcProperties {
    cidr_block: String,
    enable_dns_support: bool,
    enable_dns_hostnames: bool,
    #[serde(skip_serializing_if = "BTreeMap::is_empty")]
    tags: Tags,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct SubnetProperties {
    vpc_id: String,
    cidr_block: String,
    map_public_ip_on_launch: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    availability_zone: Option<String>,
    #[serde(skip_serializing_if = "BTreeMap::is_empty")]
    tags: Tags,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct InternetGatewayProperties {
    vpc_id: String,
    #[serde(skip_serializing_if = "BTreeMap::is_empty")]
    tags: Tags,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct RouteProperties {
    cidr_block: String,
    gateway_id: String,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct RouteTableProperties {
    vpc_id: String,
    routes: Vec<RouteProperties>,
    #[serde(skip_serializing_if = "BTreeMap::is_empty")]
    tags: Tags,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct RouteTableAssociationProperties {
    subnet_id: String,
    route_table_id: String,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct RuleProperties {
    protocol: &'static str,
    from_port: u16,
    to_port: u16,
    cidr_blocks: Vec<String>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct SecurityGroupProperties {
    vpc_id: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    description: Option<String>,
    ingress: Vec<RuleProperties>,
    egress: Vec<RuleProperties>,
    #[serde(skip_serializing_if = "BTreeMap::is_empty")]
    tags: Tags,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct InstanceProperties {
    instance_type: String,
    ami: String,
    subnet_id: String,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    vpc_security_group_ids: Vec<String>,
    associate_public_ip_address: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    user_data: Option<String>,
    #[serde(skip_serializing_if = "BTreeMap::is_empty")]
    tags: Tags,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct AmiFilterArgument<'a> {
    name: &'a str,
    values: &'a [String],
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct AmiArguments<'a> {
    most_recent: bool,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    owners: Vec<String>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    filters: Vec<AmiFilterArgument<'a>>,
}

#[derive(Debug, Serialize)]
struct Invoke<'a> {
    function: &'static str,
    arguments: AmiArguments<'a>,
    #[serde(rename = "return")]
    return_field: &'static str,
}

#[derive(Debug, Serialize)]
struct InvokeVariable<'a> {
    #[serde(rename = "fn::invoke")]
    invoke: Invoke<'a>,
}

/// Render the stack as a Pulumi YAML program
///
/// The stack is validated first; an invalid graph never renders.
#[instrument(skip(stack), fields(project = %stack.name))]
pub fn render_program(stack: &Stack) -> Result<String> {
    let graph = ResourceGraph::build(stack)?;

    let mut variables = Mapping::new();
    let mut resources = Mapping::new();

    for resource in &stack.resources {
        let key = Value::String(resource.name.clone());
        match &resource.kind {
            ResourceKind::Ami(lookup) => {
                variables.insert(key, ami_variable(lookup)?);
            }
            kind => {
                resources.insert(key, resource_entry(resource, kind)?);
            }
        }
    }

    let mut outputs = Mapping::new();
    for output in &stack.outputs {
        outputs.insert(
            Value::String(output.name.clone()),
            Value::String(format!("${{{}.{}}}", output.resource, output.attribute)),
        );
    }

    let program = Program {
        name: &stack.name,
        runtime: RUNTIME,
        description: stack.description.as_deref(),
        variables,
        resources,
        outputs,
    };

    let yaml = serde_yaml::to_string(&program)?;
    debug!(
        resources = graph.len(),
        bytes = yaml.len(),
        "Rendered program"
    );
    Ok(yaml)
}

/// Render the per-stack config file (`Pulumi.<stack>.yaml`)
pub fn render_stack_config(stack: &Stack) -> Result<String> {
    let mut config = Mapping::new();
    if let Some(region) = &stack.region {
        config.insert(
            Value::String(REGION_CONFIG_KEY.to_string()),
            Value::String(region.clone()),
        );
    }

    let mut root = Mapping::new();
    root.insert(Value::String("config".to_string()), Value::Mapping(config));
    Ok(serde_yaml::to_string(&root)?)
}

/// Interpolation resolving to a resource's ID
fn id_of(reference: &ResourceRef) -> String {
    format!("${{{}.id}}", reference)
}

/// Interpolation resolving to a variable's value
fn variable(reference: &ResourceRef) -> String {
    format!("${{{}}}", reference)
}

/// Escape literal `${` so the engine does not treat it as an interpolation
fn escape(value: &str) -> String {
    value.replace("${", "$${")
}

fn escape_tags(tags: &Tags) -> Tags {
    tags.iter().map(|(k, v)| (k.clone(), escape(v))).collect()
}

fn ami_variable(lookup: &AmiLookup) -> Result<Value> {
    if let Some(image_id) = &lookup.image_id {
        return Ok(Value::String(image_id.clone()));
    }

    let invoke = InvokeVariable {
        invoke: Invoke {
            function: ResourceType::Ami.engine_token(),
            arguments: AmiArguments {
                most_recent: lookup.most_recent,
                owners: lookup.owners.clone(),
                filters: lookup
                    .filters
                    .iter()
                    .map(|f| AmiFilterArgument {
                        name: &f.name,
                        values: &f.values,
                    })
                    .collect(),
            },
            return_field: "id",
        },
    };
    Ok(serde_yaml::to_value(invoke)?)
}

fn entry<P: Serialize>(resource_type: ResourceType, properties: P) -> Result<Value> {
    Ok(serde_yaml::to_value(ResourceEntry {
        resource_type: resource_type.engine_token(),
        properties,
    })?)
}

fn rules(rules: &[FirewallRule]) -> Vec<RuleProperties> {
    rules
        .iter()
        .map(|rule| RuleProperties {
            protocol: rule.protocol.as_engine_str(),
            from_port: rule.from_port,
            to_port: rule.to_port,
            cidr_blocks: rule.cidr_blocks.iter().map(|c| c.to_string()).collect(),
        })
        .collect()
}

fn resource_entry(resource: &Resource, kind: &ResourceKind) -> Result<Value> {
    let tags = escape_tags(&resource.tags);
    let resource_type = resource.resource_type();

    match kind {
        ResourceKind::Vpc(Vpc {
            cidr_block,
            enable_dns_support,
            enable_dns_hostnames,
        }) => entry(
            resource_type,
            VpcProperties {
                cidr_block: cidr_block.to_string(),
                enable_dns_support: *enable_dns_support,
                enable_dns_hostnames: *enable_dns_hostnames,
                tags,
            },
        ),
        ResourceKind::Subnet(Subnet {
            vpc,
            cidr_block,
            map_public_ip_on_launch,
            availability_zone,
        }) => entry(
            resource_type,
            SubnetProperties {
                vpc_id: id_of(vpc),
                cidr_block: cidr_block.to_string(),
                map_public_ip_on_launch: *map_public_ip_on_launch,
                availability_zone: availability_zone.clone(),
                tags,
            },
        ),
        ResourceKind::InternetGateway(gateway) => entry(
            resource_type,
            InternetGatewayProperties {
                vpc_id: id_of(&gateway.vpc),
                tags,
            },
        ),
        ResourceKind::RouteTable(RouteTable { vpc, routes }) => entry(
            resource_type,
            RouteTableProperties {
                vpc_id: id_of(vpc),
                routes: routes
                    .iter()
                    .map(|r| RouteProperties {
                        cidr_block: r.cidr_block.to_string(),
                        gateway_id: id_of(&r.gateway),
                    })
                    .collect(),
                tags,
            },
        ),
        ResourceKind::RouteTableAssociation(association) => {
            if !tags.is_empty() {
                debug!(resource = %resource.name, "Route table associations carry no tags");
            }
            entry(
                resource_type,
                RouteTableAssociationProperties {
                    subnet_id: id_of(&association.subnet),
                    route_table_id: id_of(&association.route_table),
                },
            )
        }
        ResourceKind::SecurityGroup(SecurityGroup {
            vpc,
            description,
            ingress,
            egress,
        }) => entry(
            resource_type,
            SecurityGroupProperties {
                vpc_id: id_of(vpc),
                description: description.as_deref().map(escape),
                ingress: rules(ingress),
                egress: rules(egress),
                tags,
            },
        ),
        ResourceKind::Instance(Instance {
            instance_type,
            ami,
            subnet,
            security_groups,
            associate_public_ip_address,
            user_data,
        }) => {
            let user_data = match user_data {
                Some(UserData::Inline(script)) => Some(escape(script)),
                Some(UserData::File(path)) => {
                    return Err(StackError::InvalidConfig(format!(
                        "{}: user data file {} was not loaded",
                        resource.name,
                        path.display()
                    )));
                }
                None => None,
            };
            entry(
                resource_type,
                InstanceProperties {
                    instance_type: instance_type.clone(),
                    ami: variable(ami),
                    subnet_id: id_of(subnet),
                    vpc_security_group_ids: security_groups.iter().map(id_of).collect(),
                    associate_public_ip_address: *associate_public_ip_address,
                    user_data,
                    tags,
                },
            )
        }
        ResourceKind::Ami(_) => Err(StackError::InvalidConfig(format!(
            "{} is a lookup, not a managed resource",
            resource.name
        ))),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::declaration::minimal_web_stack;
    use std::path::PathBuf;

    fn parse(yaml: &str) -> Value {
        serde_yaml::from_str(yaml).unwrap()
    }

    fn resource<'a>(program: &'a Value, name: &str) -> &'a Value {
        &program["resources"][name]
    }

    #[test]
    fn test_render_is_deterministic() {
        let first = render_program(&minimal_web_stack()).unwrap();
        let second = render_program(&minimal_web_stack()).unwrap();
        assert_eq!(first, second);
    }

    #[test]
    fn test_program_header() {
        let program = parse(&render_program(&minimal_web_stack()).unwrap());
        assert_eq!(program["name"], Value::from("minimal-web"));
        assert_eq!(program["runtime"], Value::from("yaml"));
    }

    #[test]
    fn test_resources_in_declaration_order() {
        let program = parse(&render_program(&minimal_web_stack()).unwrap());
        let names: Vec<&str> = program["resources"]
            .as_mapping()
            .unwrap()
            .keys()
            .filter_map(|k| k.as_str())
            .collect();
        assert_eq!(
            names,
            vec![
                "pulumi-vpc",
                "pulumi-public-subnet",
                "pulumi-igw",
                "pulumi-rt",
                "pulumi-rt-assoc",
                "pulumi-sg",
                "pulumi-ec2",
            ]
        );
    }

    #[test]
    fn test_references_become_interpolations() {
        let program = parse(&render_program(&minimal_web_stack()).unwrap());

        let subnet = resource(&program, "pulumi-public-subnet");
        assert_eq!(subnet["type"], Value::from("aws:ec2:Subnet"));
        assert_eq!(subnet["properties"]["vpcId"], Value::from("${pulumi-vpc.id}"));
        assert_eq!(subnet["properties"]["cidrBlock"], Value::from("10.0.1.0/24"));

        let route = &resource(&program, "pulumi-rt")["properties"]["routes"][0];
        assert_eq!(route["cidrBlock"], Value::from("0.0.0.0/0"));
        assert_eq!(route["gatewayId"], Value::from("${pulumi-igw.id}"));

        let ec2 = &resource(&program, "pulumi-ec2")["properties"];
        assert_eq!(ec2["ami"], Value::from("${ami}"));
        assert_eq!(ec2["subnetId"], Value::from("${pulumi-public-subnet.id}"));
        assert_eq!(ec2["vpcSecurityGroupIds"][0], Value::from("${pulumi-sg.id}"));
        assert_eq!(ec2["instanceType"], Value::from("t2.micro"));
    }

    #[test]
    fn test_firewall_rendering() {
        let program = parse(&render_program(&minimal_web_stack()).unwrap());
        let sg = &resource(&program, "pulumi-sg")["properties"];

        assert_eq!(sg["ingress"][0]["protocol"], Value::from("tcp"));
        assert_eq!(sg["ingress"][0]["fromPort"].as_u64(), Some(22));
        assert_eq!(sg["ingress"][1]["toPort"].as_u64(), Some(80));
        assert_eq!(sg["egress"][0]["protocol"], Value::from("-1"));
        assert_eq!(sg["egress"][0]["fromPort"].as_u64(), Some(0));
        assert_eq!(sg["egress"][0]["cidrBlocks"][0], Value::from("0.0.0.0/0"));
    }

    #[test]
    fn test_ami_lookup_is_invoke_variable() {
        let program = parse(&render_program(&minimal_web_stack()).unwrap());
        let invoke = &program["variables"]["ami"]["fn::invoke"];

        assert_eq!(invoke["function"], Value::from("aws:ec2:getAmi"));
        assert_eq!(invoke["return"], Value::from("id"));
        assert_eq!(invoke["arguments"]["mostRecent"], Value::from(true));
        assert_eq!(invoke["arguments"]["owners"][0], Value::from("amazon"));
        assert_eq!(
            invoke["arguments"]["filters"][0]["values"][0],
            Value::from("amzn2-ami-hvm-*-x86_64-gp2")
        );
        assert!(program["resources"].get("ami").is_none());
    }

    #[test]
    fn test_pinned_image_is_literal() {
        let mut stack = minimal_web_stack();
        for resource in &mut stack.resources {
            if let ResourceKind::Ami(lookup) = &mut resource.kind {
                lookup.image_id = Some("ami-0123456789abcdef0".to_string());
            }
        }

        let program = parse(&render_program(&stack).unwrap());
        assert_eq!(program["variables"]["ami"], Value::from("ami-0123456789abcdef0"));
    }

    #[test]
    fn test_outputs() {
        let program = parse(&render_program(&minimal_web_stack()).unwrap());
        assert_eq!(
            program["outputs"]["instance_public_ip"],
            Value::from("${pulumi-ec2.publicIp}")
        );
        assert_eq!(
            program["outputs"]["instance_public_dns"],
            Value::from("${pulumi-ec2.publicDns}")
        );
    }

    #[test]
    fn test_user_data_and_tags() {
        let program = parse(&render_program(&minimal_web_stack()).unwrap());
        let ec2 = &resource(&program, "pulumi-ec2")["properties"];
        assert!(
            ec2["userData"]
                .as_str()
                .unwrap()
                .contains("systemctl start httpd")
        );
        assert_eq!(ec2["tags"]["Name"], Value::from("pulumi-ec2"));
        assert!(resource(&program, "pulumi-igw")["properties"].get("tags").is_none());
    }

    #[test]
    fn test_interpolation_in_literals_is_escaped() {
        let mut stack = minimal_web_stack();
        for resource in &mut stack.resources {
            if let ResourceKind::Instance(instance) = &mut resource.kind {
                instance.user_data = Some(UserData::Inline("echo ${HOME}".to_string()));
            }
        }

        let program = parse(&render_program(&stack).unwrap());
        assert_eq!(
            resource(&program, "pulumi-ec2")["properties"]["userData"],
            Value::from("echo $${HOME}")
        );
    }

    #[test]
    fn test_project_description_is_not_escaped() {
        let mut stack = minimal_web_stack();
        stack.description = Some("costs ${5} a month".to_string());

        let program = parse(&render_program(&stack).unwrap());
        assert_eq!(program["description"], Value::from("costs ${5} a month"));
    }

    #[test]
    fn test_unloaded_user_data_file_fails() {
        let mut stack = minimal_web_stack();
        for resource in &mut stack.resources {
            if let ResourceKind::Instance(instance) = &mut resource.kind {
                instance.user_data = Some(UserData::File(PathBuf::from("boot.sh")));
            }
        }

        let err = render_program(&stack).unwrap_err();
        assert!(matches!(err, StackError::InvalidConfig(_)));
    }

    #[test]
    fn test_invalid_stack_does_not_render() {
        let mut stack = minimal_web_stack();
        stack.resources.retain(|r| r.name != "pulumi-vpc");
        assert!(matches!(
            render_program(&stack),
            Err(StackError::UnknownReference { .. })
        ));
    }

    #[test]
    fn test_stack_config_region() {
        let mut stack = minimal_web_stack();
        let empty = parse(&render_stack_config(&stack).unwrap());
        assert!(empty["config"].as_mapping().unwrap().is_empty());

        stack.region = Some("us-east-1".to_string());
        let config = parse(&render_stack_config(&stack).unwrap());
        assert_eq!(config["config"]["aws:region"], Value::from("us-east-1"));
    }
}
