use std::collections::BTreeMap;

use pep440_rs::Version;

use crate::requirement::canonical_name;
use crate::warning::Warning;

pub const CHECKSUM_TYPE_SHA256: &str = "sha256";

/// One resolved dependency: the installed version (if any), the credential-
/// and fragment-free source-archive URL, and its checksum. Immutable once
/// built; the graph builder attaches everything in one pass.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DependencyNode {
    pub name: String,
    pub version: Option<Version>,
    pub url: String,
    pub checksum: String,
    pub checksum_type: String,
}

impl DependencyNode {
    /// Node for a package the index has no source archive for. Rendering
    /// tolerates the empty url/checksum fields.
    pub fn placeholder(name: &str) -> Self {
        Self {
            name: name.to_string(),
            version: None,
            url: String::new(),
            checksum: String::new(),
            checksum_type: CHECKSUM_TYPE_SHA256.to_string(),
        }
    }
}

/// A deduplicated set of dependency nodes keyed by canonical package name.
/// Not an edge-preserving graph: adjacency is discarded after traversal,
/// only the closure survives. BTreeMap keys keep iteration sorted by name.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct DependencyGraph {
    nodes: BTreeMap<String, DependencyNode>,
}

impl DependencyGraph {
    pub fn insert(&mut self, node: DependencyNode) {
        self.nodes.insert(canonical_name(&node.name), node);
    }

    pub fn get(&self, name: &str) -> Option<&DependencyNode> {
        self.nodes.get(&canonical_name(name))
    }

    pub fn contains(&self, name: &str) -> bool {
        self.nodes.contains_key(&canonical_name(name))
    }

    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.nodes.keys().map(String::as_str)
    }

    pub fn nodes(&self) -> impl Iterator<Item = &DependencyNode> {
        self.nodes.values()
    }

    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }
}

/// Unions several graphs into one. The first graph containing a name wins;
/// a later, different node for the same name only produces a warning. An
/// identical later node is silently deduplicated.
pub fn merge_graphs(graphs: Vec<DependencyGraph>, warnings: &mut Vec<Warning>) -> DependencyGraph {
    let mut merged = DependencyGraph::default();
    for graph in graphs {
        for node in graph.nodes() {
            match merged.get(&node.name) {
                None => merged.insert(node.clone()),
                Some(existing) if existing == node => {}
                Some(existing) => warnings.push(Warning::ConflictingDependency {
                    name: canonical_name(&node.name),
                    kept: existing.version.clone(),
                    discarded: node.version.clone(),
                }),
            }
        }
    }
    merged
}
