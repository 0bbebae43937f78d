mod build;
mod installed;
mod walk;

pub use build::build_graph;
pub use installed::{discover_site_packages, InstalledPackage, InstalledSnapshot};
pub use walk::{recursive_dependencies, ImplicitExtras};
