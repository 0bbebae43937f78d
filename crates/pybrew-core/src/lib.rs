mod node;
mod requirement;
mod warning;

pub use node::{merge_graphs, DependencyGraph, DependencyNode, CHECKSUM_TYPE_SHA256};
pub use requirement::{canonical_name, Requirement};
pub use warning::Warning;

pub use pep440_rs::{Version, VersionSpecifiers};
