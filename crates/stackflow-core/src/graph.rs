//! Resource dependency graph
//!
//! Builds the reference DAG of a [`Stack`] and answers ordering questions
//! about it. Edges point from a dependency to the resource that references
//! it, so a topological walk yields a valid creation order.

use crate::error::{Result, StackError};
use crate::model::{ResourceKind, ResourceType, Stack};
use petgraph::Direction;
use petgraph::algo::kosaraju_scc;
use petgraph::graph::{DiGraph, NodeIndex};
use petgraph::visit::{Dfs, EdgeRef, Reversed};
use serde::Serialize;
use std::cmp::Reverse;
use std::collections::{BinaryHeap, HashMap};
use tracing::{debug, instrument};

#[derive(Debug, Clone)]
struct Node {
    name: String,
    resource_type: ResourceType,
}

/// A reference edge, `from` depends on `to`
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Edge {
    pub from: String,
    pub to: String,
    pub field: &'static str,
}

/// Summary suitable for display or JSON output
#[derive(Debug, Clone, Serialize)]
pub struct GraphSummary {
    pub creation_order: Vec<String>,
    pub layers: Vec<Vec<String>>,
    pub edges: Vec<Edge>,
}

/// Validated dependency graph of a stack
#[derive(Debug)]
pub struct ResourceGraph {
    graph: DiGraph<Node, &'static str>,
    index: HashMap<String, NodeIndex>,
    creation_order: Vec<NodeIndex>,
}

impl ResourceGraph {
    /// Build and validate the graph
    ///
    /// Fails when a name is declared twice, a reference names an unknown
    /// resource or one of the wrong type, an output points nowhere, a subnet
    /// lies outside its VPC, a firewall rule is malformed, or the references
    /// form a cycle.
    #[instrument(skip(stack), fields(stack = %stack.name))]
    pub fn build(stack: &Stack) -> Result<Self> {
        let mut graph = DiGraph::new();
        let mut index = HashMap::new();

        // Node indices follow declaration order.
        for resource in &stack.resources {
            if index.contains_key(&resource.name) {
                return Err(StackError::DuplicateResource(resource.name.clone()));
            }
            let idx = graph.add_node(Node {
                name: resource.name.clone(),
                resource_type: resource.resource_type(),
            });
            index.insert(resource.name.clone(), idx);
        }

        for resource in &stack.resources {
            let from = index[&resource.name];
            for reference in resource.references() {
                let to = *index.get(reference.target.name()).ok_or_else(|| {
                    StackError::UnknownReference {
                        from: resource.name.clone(),
                        to: reference.target.name().to_string(),
                    }
                })?;

                let found = graph[to].resource_type;
                if found != reference.expected {
                    return Err(StackError::ReferenceKindMismatch {
                        from: resource.name.clone(),
                        to: reference.target.name().to_string(),
                        expected: reference.expected.to_string(),
                        found: found.to_string(),
                    });
                }

                graph.add_edge(to, from, reference.field);
            }
        }

        for output in &stack.outputs {
            if !index.contains_key(output.resource.name()) {
                return Err(StackError::UnknownReference {
                    from: format!("output {}", output.name),
                    to: output.resource.name().to_string(),
                });
            }
            if output.attribute.is_empty() {
                return Err(StackError::InvalidConfig(format!(
                    "output {} has no attribute",
                    output.name
                )));
            }
        }

        check_literals(stack)?;

        let creation_order = topological_order(&graph)?;
        debug!(
            nodes = graph.node_count(),
            edges = graph.edge_count(),
            "Resource graph built"
        );

        Ok(Self {
            graph,
            index,
            creation_order,
        })
    }

    pub fn len(&self) -> usize {
        self.graph.node_count()
    }

    pub fn is_empty(&self) -> bool {
        self.graph.node_count() == 0
    }

    pub fn edge_count(&self) -> usize {
        self.graph.edge_count()
    }

    fn name(&self, idx: NodeIndex) -> &str {
        &self.graph[idx].name
    }

    /// Dependencies first; ties keep declaration order
    pub fn creation_order(&self) -> Vec<&str> {
        self.creation_order.iter().map(|&i| self.name(i)).collect()
    }

    /// Dependents first
    pub fn destroy_order(&self) -> Vec<&str> {
        self.creation_order
            .iter()
            .rev()
            .map(|&i| self.name(i))
            .collect()
    }

    /// Groups of resources an engine may provision concurrently
    ///
    /// Every resource sits one layer after its deepest dependency.
    pub fn layers(&self) -> Vec<Vec<&str>> {
        let mut depth: HashMap<NodeIndex, usize> = HashMap::new();
        for &idx in &self.creation_order {
            let d = self
                .graph
                .neighbors_directed(idx, Direction::Incoming)
                .map(|dep| depth[&dep] + 1)
                .max()
                .unwrap_or(0);
            depth.insert(idx, d);
        }

        let mut layers: Vec<Vec<&str>> = Vec::new();
        for idx in self.graph.node_indices() {
            let d = depth[&idx];
            if layers.len() <= d {
                layers.resize_with(d + 1, Vec::new);
            }
            layers[d].push(self.name(idx));
        }
        layers
    }

    /// Direct dependencies in declaration order
    pub fn dependencies(&self, name: &str) -> Option<Vec<&str>> {
        let idx = *self.index.get(name)?;
        let mut deps: Vec<NodeIndex> = self
            .graph
            .neighbors_directed(idx, Direction::Incoming)
            .collect();
        deps.sort();
        deps.dedup();
        Some(deps.into_iter().map(|i| self.name(i)).collect())
    }

    /// Direct dependents in declaration order
    pub fn dependents(&self, name: &str) -> Option<Vec<&str>> {
        let idx = *self.index.get(name)?;
        let mut deps: Vec<NodeIndex> = self
            .graph
            .neighbors_directed(idx, Direction::Outgoing)
            .collect();
        deps.sort();
        deps.dedup();
        Some(deps.into_iter().map(|i| self.name(i)).collect())
    }

    /// Everything that must exist before `name`, in declaration order
    pub fn transitive_dependencies(&self, name: &str) -> Option<Vec<&str>> {
        let start = *self.index.get(name)?;
        let reversed = Reversed(&self.graph);
        let mut dfs = Dfs::new(reversed, start);
        let mut found = Vec::new();
        while let Some(idx) = dfs.next(reversed) {
            if idx != start {
                found.push(idx);
            }
        }
        found.sort();
        Some(found.into_iter().map(|i| self.name(i)).collect())
    }

    /// All reference edges, grouped by referencing resource
    pub fn edges(&self) -> Vec<Edge> {
        let mut edges: Vec<(NodeIndex, NodeIndex, &'static str)> = self
            .graph
            .edge_references()
            .map(|e| (e.target(), e.source(), *e.weight()))
            .collect();
        edges.sort_by_key(|(from, to, _)| (*from, *to));
        edges
            .into_iter()
            .map(|(from, to, field)| Edge {
                from: self.name(from).to_string(),
                to: self.name(to).to_string(),
                field,
            })
            .collect()
    }

    /// References to resources declared later than the referencing one
    ///
    /// The engine orders by edges, so these are legal but harder to read.
    pub fn forward_references(&self) -> Vec<Edge> {
        self.edges()
            .into_iter()
            .filter(|e| self.index[&e.to] > self.index[&e.from])
            .collect()
    }

    pub fn summary(&self) -> GraphSummary {
        GraphSummary {
            creation_order: self
                .creation_order()
                .into_iter()
                .map(str::to_string)
                .collect(),
            layers: self
                .layers()
                .into_iter()
                .map(|l| l.into_iter().map(str::to_string).collect())
                .collect(),
            edges: self.edges(),
        }
    }
}

/// Kahn's algorithm preferring the earliest declared ready node
fn topological_order(graph: &DiGraph<Node, &'static str>) -> Result<Vec<NodeIndex>> {
    let mut in_degree: HashMap<NodeIndex, usize> = graph
        .node_indices()
        .map(|i| (i, graph.edges_directed(i, Direction::Incoming).count()))
        .collect();

    let mut ready: BinaryHeap<Reverse<NodeIndex>> = in_degree
        .iter()
        .filter(|(_, d)| **d == 0)
        .map(|(i, _)| Reverse(*i))
        .collect();

    let mut order = Vec::with_capacity(graph.node_count());
    while let Some(Reverse(idx)) = ready.pop() {
        order.push(idx);
        for edge in graph.edges_directed(idx, Direction::Outgoing) {
            if let Some(d) = in_degree.get_mut(&edge.target()) {
                *d -= 1;
                if *d == 0 {
                    ready.push(Reverse(edge.target()));
                }
            }
        }
    }

    if order.len() < graph.node_count() {
        return Err(StackError::CircularDependency(describe_cycle(graph)));
    }

    Ok(order)
}

fn describe_cycle(graph: &DiGraph<Node, &'static str>) -> String {
    kosaraju_scc(graph)
        .into_iter()
        .find(|scc| scc.len() > 1 || graph.contains_edge(scc[0], scc[0]))
        .map(|mut scc| {
            scc.sort();
            let mut names: Vec<&str> = scc.iter().map(|&i| graph[i].name.as_str()).collect();
            names.push(names[0]);
            names.join(" -> ")
        })
        .unwrap_or_else(|| "unknown cycle".to_string())
}

/// Checks on literal values that need the whole stack in view
fn check_literals(stack: &Stack) -> Result<()> {
    for resource in &stack.resources {
        match &resource.kind {
            ResourceKind::Subnet(subnet) => {
                if let Some(ResourceKind::Vpc(vpc)) =
                    stack.resource(subnet.vpc.name()).map(|r| &r.kind)
                    && !vpc.cidr_block.contains(&subnet.cidr_block)
                {
                    return Err(StackError::InvalidConfig(format!(
                        "subnet {} ({}) lies outside vpc {} ({})",
                        resource.name, subnet.cidr_block, subnet.vpc, vpc.cidr_block
                    )));
                }
            }
            ResourceKind::SecurityGroup(sg) => {
                for rule in sg.ingress.iter().chain(sg.egress.iter()) {
                    rule.validate().map_err(|e| {
                        StackError::InvalidConfig(format!("{}: {}", resource.name, e))
                    })?;
                }
            }
            ResourceKind::Instance(instance) => {
                if instance.instance_type.is_empty() {
                    return Err(StackError::InvalidConfig(format!(
                        "instance {} has no instance type",
                        resource.name
                    )));
                }
            }
            _ => {}
        }
    }
    Ok(())
}
