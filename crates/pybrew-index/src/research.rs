use anyhow::{anyhow, Result};
use pybrew_core::{DependencyNode, Version, Warning, CHECKSUM_TYPE_SHA256};
use tracing::debug;

use crate::client::{Distribution, PackageIndex};
use crate::urlutil::strip_fragment;

/// Looks a package up on the index and produces its dependency node.
///
/// Only source archives are considered. With no sdist at all this returns a
/// placeholder node plus a warning rather than failing, since a formula can
/// still be assembled around the gap. A version hint that has no sdist
/// falls back to the newest release under PEP 440 ordering. The node's
/// version field records the hint (the locally installed version), not the
/// selected release.
pub fn research_package(
    index: &dyn PackageIndex,
    name: &str,
    version: Option<&Version>,
    warnings: &mut Vec<Warning>,
) -> Result<DependencyNode> {
    let distributions = index.project_files(name)?;
    let sdists: Vec<Distribution> = distributions
        .into_iter()
        .filter(Distribution::is_sdist)
        .collect();

    if sdists.is_empty() {
        warnings.push(Warning::MissingArchive {
            name: name.to_string(),
        });
        return Ok(DependencyNode::placeholder(name));
    }

    let mut selected = None;
    if let Some(requested) = version {
        selected = sdists.iter().find(|dist| dist.version == *requested);
        if selected.is_none() {
            warnings.push(Warning::VersionNotFound {
                name: name.to_string(),
                requested: requested.clone(),
            });
        }
    }
    let selected = match selected {
        Some(distribution) => distribution,
        None => sdists
            .iter()
            .max_by(|a, b| a.version.cmp(&b.version))
            .ok_or_else(|| anyhow!("internal selection error for '{name}'"))?,
    };

    let url = strip_fragment(&selected.url)?;
    let checksum = match &selected.sha256 {
        Some(digest) => digest.clone(),
        None => {
            // Expensive path: no published digest means a full transfer of
            // the archive body just to hash it.
            debug!("fetching sdist to compute checksum for {name}");
            let digest = index.fetch_checksum(&selected.url)?;
            debug!("done fetching {name}");
            digest
        }
    };

    Ok(DependencyNode {
        name: name.to_string(),
        version: version.cloned(),
        url,
        checksum,
        checksum_type: CHECKSUM_TYPE_SHA256.to_string(),
    })
}
