use anyhow::{anyhow, Result};
use pybrew_core::{
    canonical_name, merge_graphs, DependencyGraph, DependencyNode, Requirement, Warning,
};
use pybrew_index::{research_package, PackageIndex};
use pybrew_resolver::{build_graph, ImplicitExtras, InstalledSnapshot};

use crate::template::StanzaRenderer;

/// Renders one formula: the first root becomes the top-level package, every
/// other node in the merged closure becomes an attached resource stanza.
pub fn formula_for(
    index: &dyn PackageIndex,
    snapshot: &InstalledSnapshot,
    rules: &ImplicitExtras,
    package: &str,
    also: &[String],
    warnings: &mut Vec<Warning>,
) -> Result<String> {
    let root_name = Requirement::parse(package)?.canonical_name();

    let mut roots = vec![package.to_string()];
    roots.extend(also.iter().cloned());
    let nodes = merged_graph(index, snapshot, rules, &roots, warnings)?;

    let root = nodes
        .get(&root_name)
        .ok_or_else(|| anyhow!("package '{package}' missing from resolved dependency set"))?;
    let resources: Vec<&DependencyNode> = nodes
        .nodes()
        .filter(|node| canonical_name(&node.name) != root_name)
        .collect();

    let renderer = StanzaRenderer::new()?;
    renderer.render_formula(root, &resources)
}

/// Renders resource stanzas for every node in the merged closure of the
/// given roots, the roots themselves included.
pub fn resources_for(
    index: &dyn PackageIndex,
    snapshot: &InstalledSnapshot,
    rules: &ImplicitExtras,
    roots: &[String],
    warnings: &mut Vec<Warning>,
) -> Result<String> {
    let nodes = merged_graph(index, snapshot, rules, roots, warnings)?;

    let renderer = StanzaRenderer::new()?;
    let stanzas = nodes
        .nodes()
        .map(|node| renderer.render_resource(node))
        .collect::<Result<Vec<_>>>()?;
    Ok(stanzas.join("\n\n"))
}

/// Renders stanzas for the named packages only, without any dependency
/// traversal or installed-version lookup.
pub fn single_resources(
    index: &dyn PackageIndex,
    packages: &[String],
    warnings: &mut Vec<Warning>,
) -> Result<String> {
    let renderer = StanzaRenderer::new()?;
    let mut stanzas = Vec::new();
    for package in packages {
        let node = research_package(index, package, None, warnings)?;
        stanzas.push(renderer.render_resource(&node)?);
    }
    Ok(stanzas.join("\n\n"))
}

fn merged_graph(
    index: &dyn PackageIndex,
    snapshot: &InstalledSnapshot,
    rules: &ImplicitExtras,
    roots: &[String],
    warnings: &mut Vec<Warning>,
) -> Result<DependencyGraph> {
    let mut graphs = Vec::with_capacity(roots.len());
    for root in roots {
        let graph = build_graph(
            root,
            snapshot,
            rules,
            |name, installed, warnings| research_package(index, name, installed, warnings),
            warnings,
        )?;
        graphs.push(graph);
    }
    Ok(merge_graphs(graphs, warnings))
}
