use std::fmt;

use pep440_rs::Version;

/// Non-fatal conditions surfaced while building or merging dependency
/// graphs. Collected into plain `Vec<Warning>` sinks by the callers so the
/// CLI can decide how to present them; none of these abort a run.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Warning {
    /// A dependency was declared by an installed package but is not itself
    /// installed, so its own dependencies cannot be inspected.
    NotInstalled { name: String },
    /// The requested version has no source archive on the index; the newest
    /// one was used instead.
    VersionNotFound { name: String, requested: Version },
    /// Two merged graphs disagree about a package; the first entry wins.
    ConflictingDependency {
        name: String,
        kept: Option<Version>,
        discarded: Option<Version>,
    },
    /// The index has no source archive at all for a package.
    MissingArchive { name: String },
}

impl Warning {
    pub fn kind(&self) -> &'static str {
        match self {
            Warning::NotInstalled { .. } => "not-installed",
            Warning::VersionNotFound { .. } => "version-not-found",
            Warning::ConflictingDependency { .. } => "conflicting-dependency",
            Warning::MissingArchive { .. } => "missing-archive",
        }
    }
}

impl fmt::Display for Warning {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Warning::NotInstalled { name } => write!(
                f,
                "{name} is not installed so we cannot compute resources for its dependencies"
            ),
            Warning::VersionNotFound { name, requested } => write!(
                f,
                "could not find an exact version match for {name} {requested}; using newest instead"
            ),
            Warning::ConflictingDependency {
                name,
                kept,
                discarded,
            } => write!(
                f,
                "conflicting entries for {name} ({} vs {}); keeping the first",
                version_label(kept),
                version_label(discarded)
            ),
            Warning::MissingArchive { name } => write!(f, "no sdist found for {name}"),
        }
    }
}

fn version_label(version: &Option<Version>) -> String {
    match version {
        Some(version) => version.to_string(),
        None => "unknown".to_string(),
    }
}
