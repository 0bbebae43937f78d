mod checksum;
mod client;
mod research;
mod urlutil;

pub use checksum::{compute_sha256, sha256_hex_reader};
pub use client::{Distribution, PackageIndex, PypiClient, DEFAULT_INDEX_URL};
pub use research::research_package;
pub use urlutil::{extract_credentials, strip_fragment};

#[cfg(test)]
mod tests;
