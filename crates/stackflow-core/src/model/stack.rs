//! Stack model

use super::resource::{Resource, ResourceRef, ResourceType};
use serde::{Deserialize, Serialize};

/// Named value exported from a provisioned resource
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Output {
    pub name: String,
    pub resource: ResourceRef,
    /// Engine attribute name (`publicIp`, `publicDns`, ...)
    pub attribute: String,
}

impl Output {
    pub fn new(
        name: impl Into<String>,
        resource: impl Into<String>,
        attribute: impl Into<String>,
    ) -> Self {
        Self {
            name: name.into(),
            resource: ResourceRef::new(resource),
            attribute: attribute.into(),
        }
    }
}

/// A complete declaration: resources in declaration order plus outputs
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Stack {
    pub name: String,
    /// Rendered into stack config; when unset the engine uses the ambient region
    pub region: Option<String>,
    pub description: Option<String>,
    pub resources: Vec<Resource>,
    pub outputs: Vec<Output>,
}

impl Stack {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            ..Default::default()
        }
    }

    pub fn add(&mut self, resource: Resource) {
        self.resources.push(resource);
    }

    pub fn add_output(&mut self, output: Output) {
        self.outputs.push(output);
    }

    pub fn resource(&self, name: &str) -> Option<&Resource> {
        self.resources.iter().find(|r| r.name == name)
    }

    pub fn output(&self, name: &str) -> Option<&Output> {
        self.outputs.iter().find(|o| o.name == name)
    }

    pub fn by_type(&self, resource_type: ResourceType) -> Vec<&Resource> {
        self.resources
            .iter()
            .filter(|r| r.resource_type() == resource_type)
            .collect()
    }

    /// Resources the engine creates (lookups excluded)
    pub fn managed_resources(&self) -> impl Iterator<Item = &Resource> {
        self.resources
            .iter()
            .filter(|r| !r.resource_type().is_lookup())
    }
}
