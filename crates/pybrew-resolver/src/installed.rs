use std::collections::{BTreeMap, BTreeSet};
use std::fs;
use std::path::{Path, PathBuf};
use std::process::Command;
use std::str::FromStr;

use anyhow::{anyhow, Context, Result};
use pybrew_core::{canonical_name, Requirement, Version};

/// One installed distribution as described by its `.dist-info/METADATA`.
#[derive(Debug, Clone)]
pub struct InstalledPackage {
    pub name: String,
    pub version: Version,
    pub requires_dist: Vec<Requirement>,
}

/// Read-only view of the packages installed in one Python environment,
/// built once per run and passed explicitly to the walker and builder.
#[derive(Debug, Clone, Default)]
pub struct InstalledSnapshot {
    packages: BTreeMap<String, InstalledPackage>,
}

impl InstalledSnapshot {
    pub fn new(packages: impl IntoIterator<Item = InstalledPackage>) -> Self {
        let packages = packages
            .into_iter()
            .map(|package| (canonical_name(&package.name), package))
            .collect();
        Self { packages }
    }

    /// Scans the given site-packages directories for `*.dist-info` entries.
    /// Directories that do not exist are skipped; python reports paths that
    /// are not present on every installation.
    pub fn from_site_packages(dirs: &[PathBuf]) -> Result<Self> {
        let mut packages = BTreeMap::new();
        for dir in dirs {
            scan_site_packages(dir, &mut packages)?;
        }
        Ok(Self { packages })
    }

    pub fn installed_version(&self, name: &str) -> Option<&Version> {
        self.packages
            .get(&canonical_name(name))
            .map(|package| &package.version)
    }

    pub fn len(&self) -> usize {
        self.packages.len()
    }

    pub fn is_empty(&self) -> bool {
        self.packages.is_empty()
    }

    /// Declared dependencies of the package the requirement names, filtered
    /// by the requirement's active extras. `None` means the package is not
    /// installed here, which the walker treats as a leaf.
    pub fn requires(&self, requirement: &Requirement) -> Option<Vec<Requirement>> {
        let package = self.packages.get(&requirement.canonical_name())?;
        let active: BTreeSet<String> = requirement.extras().iter().cloned().collect();
        Some(
            package
                .requires_dist
                .iter()
                .filter(|dependency| dependency.marker_matches(&active))
                .cloned()
                .collect(),
        )
    }
}

fn scan_site_packages(dir: &Path, out: &mut BTreeMap<String, InstalledPackage>) -> Result<()> {
    let entries = match fs::read_dir(dir) {
        Ok(entries) => entries,
        Err(_) => return Ok(()),
    };

    for entry in entries {
        let entry =
            entry.with_context(|| format!("failed to list site-packages dir: {}", dir.display()))?;
        let path = entry.path();
        let Some(file_name) = path.file_name().and_then(|name| name.to_str()) else {
            continue;
        };
        if !file_name.ends_with(".dist-info") {
            continue;
        }
        let metadata_path = path.join("METADATA");
        if !metadata_path.exists() {
            continue;
        }
        let text = fs::read_to_string(&metadata_path)
            .with_context(|| format!("failed to read {}", metadata_path.display()))?;
        match parse_metadata(&text) {
            Ok(package) => {
                out.insert(canonical_name(&package.name), package);
            }
            Err(err) => tracing::debug!(
                "skipping unreadable metadata at {}: {err:#}",
                metadata_path.display()
            ),
        }
    }

    Ok(())
}

/// Parses the RFC 822-style header block of a METADATA file. Only the
/// Name, Version and Requires-Dist headers matter here; the body after the
/// first blank line is the package description.
pub(crate) fn parse_metadata(text: &str) -> Result<InstalledPackage> {
    let mut name = None;
    let mut version_text = None;
    let mut requires_dist = Vec::new();

    for line in text.lines() {
        if line.is_empty() {
            break;
        }
        let Some((key, value)) = line.split_once(':') else {
            continue;
        };
        let value = value.trim();
        match key.trim() {
            "Name" => name = Some(value.to_string()),
            "Version" => version_text = Some(value.to_string()),
            "Requires-Dist" => match Requirement::parse(value) {
                Ok(requirement) => requires_dist.push(requirement),
                // Direct URL references and other exotica are not useful
                // for resource stanzas.
                Err(err) => tracing::debug!("ignoring Requires-Dist '{value}': {err:#}"),
            },
            _ => {}
        }
    }

    let name = name.ok_or_else(|| anyhow!("metadata is missing the Name header"))?;
    let version_text =
        version_text.ok_or_else(|| anyhow!("metadata is missing the Version header"))?;
    let version = Version::from_str(&version_text)
        .map_err(|err| anyhow!("invalid installed version '{version_text}': {err}"))?;

    Ok(InstalledPackage {
        name,
        version,
        requires_dist,
    })
}

const DISCOVERY_SNIPPET: &str = "\
import json, site
paths = list(site.getsitepackages())
paths.append(site.getusersitepackages())
print(json.dumps(paths))
";

/// Asks the host python3 where its site-packages directories live.
pub fn discover_site_packages() -> Result<Vec<PathBuf>> {
    let output = Command::new("python3")
        .arg("-c")
        .arg(DISCOVERY_SNIPPET)
        .output()
        .context("failed to run python3 for site-packages discovery")?;
    if !output.status.success() {
        let stderr = String::from_utf8_lossy(&output.stderr);
        return Err(anyhow!(
            "site-packages discovery failed: status={} stderr='{}'",
            output.status,
            stderr.trim()
        ));
    }

    let stdout = String::from_utf8_lossy(&output.stdout);
    let paths: Vec<String> = serde_json::from_str(stdout.trim())
        .context("unexpected output from site-packages discovery")?;
    Ok(paths.into_iter().map(PathBuf::from).collect())
}
