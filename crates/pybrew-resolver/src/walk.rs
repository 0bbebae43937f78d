use std::collections::{BTreeMap, BTreeSet, HashSet};

use pybrew_core::{canonical_name, Requirement};

use crate::installed::InstalledSnapshot;

/// Extras that get activated implicitly when a given package is traversed.
/// Ecosystem accommodations live here as data instead of being wired into
/// the walker; the default table carries the one rule the tool has always
/// shipped with.
#[derive(Debug, Clone)]
pub struct ImplicitExtras {
    rules: BTreeMap<String, Vec<String>>,
}

impl Default for ImplicitExtras {
    fn default() -> Self {
        // requests pulled its TLS stack in through the "security" extra for
        // a long stretch of releases.
        let mut rules = BTreeMap::new();
        rules.insert("requests".to_string(), vec!["security".to_string()]);
        Self { rules }
    }
}

impl ImplicitExtras {
    pub fn empty() -> Self {
        Self {
            rules: BTreeMap::new(),
        }
    }

    pub fn add(&mut self, name: &str, extra: &str) {
        self.rules
            .entry(canonical_name(name))
            .or_default()
            .push(extra.to_ascii_lowercase());
    }

    pub fn extras_for(&self, name: &str) -> &[String] {
        self.rules
            .get(&canonical_name(name))
            .map(Vec::as_slice)
            .unwrap_or(&[])
    }
}

/// Collects the closure of canonical package names the root requirement
/// pulls in, root included, by walking the installed metadata depth-first.
///
/// The visited set is keyed on name+extras identity, so the same package
/// reached again with different extras is explored once per variant, and
/// cyclic declarations terminate. Dependencies that are declared but not
/// installed still land in the result; they just cannot be recursed into.
pub fn recursive_dependencies(
    root: &Requirement,
    snapshot: &InstalledSnapshot,
    rules: &ImplicitExtras,
) -> BTreeSet<String> {
    let mut discovered = BTreeSet::new();
    discovered.insert(root.canonical_name());
    let mut visited = HashSet::new();
    walk(root, snapshot, rules, &mut discovered, &mut visited);
    discovered
}

fn walk(
    requirement: &Requirement,
    snapshot: &InstalledSnapshot,
    rules: &ImplicitExtras,
    discovered: &mut BTreeSet<String>,
    visited: &mut HashSet<String>,
) {
    let implicit = rules.extras_for(&requirement.canonical_name());
    let requirement = if implicit.is_empty() {
        requirement.clone()
    } else {
        requirement.with_extras(implicit)
    };

    if !visited.insert(requirement.key()) {
        return;
    }

    let Some(dependencies) = snapshot.requires(&requirement) else {
        // Declared but not installed; the graph builder warns about these.
        return;
    };

    for dependency in &dependencies {
        discovered.insert(dependency.canonical_name());
    }
    for dependency in &dependencies {
        walk(dependency, snapshot, rules, discovered, visited);
    }
}
