use anyhow::Result;
use pybrew_core::{DependencyGraph, DependencyNode, Requirement, Version, Warning};

use crate::installed::InstalledSnapshot;
use crate::walk::{recursive_dependencies, ImplicitExtras};

/// Packaging-infrastructure names that never belong in resource stanzas.
const IGNORED_PACKAGES: &[&str] = &["argparse", "pip", "setuptools", "wsgiref"];

/// Builds the resolved node set for one root requirement string.
///
/// The index lookup is injected as a closure so this stays free of network
/// concerns: it receives the canonical name, the installed version as a
/// hint (absent when the package is not installed locally) and the shared
/// warning sink. Lookups run sequentially, one blocking call per node;
/// result order is fixed by the graph's sorted keys either way.
pub fn build_graph<F>(
    requirement_text: &str,
    snapshot: &InstalledSnapshot,
    rules: &ImplicitExtras,
    mut research: F,
    warnings: &mut Vec<Warning>,
) -> Result<DependencyGraph>
where
    F: FnMut(&str, Option<&Version>, &mut Vec<Warning>) -> Result<DependencyNode>,
{
    let root = Requirement::parse(requirement_text)?;
    let closure = recursive_dependencies(&root, snapshot, rules);

    let mut graph = DependencyGraph::default();
    for name in closure {
        if IGNORED_PACKAGES.contains(&name.as_str()) {
            continue;
        }
        let installed = snapshot.installed_version(&name);
        if installed.is_none() {
            warnings.push(Warning::NotInstalled { name: name.clone() });
        }
        let node = research(&name, installed, warnings)?;
        graph.insert(node);
    }
    Ok(graph)
}
