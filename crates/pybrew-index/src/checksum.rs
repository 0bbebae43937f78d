use std::io::{self, Read};

use anyhow::{Context, Result};
use sha2::{Digest, Sha256};

/// Streams an entire remote resource and returns its SHA-256 as lowercase
/// hex. This transfers the full archive body; callers use it only when the
/// index did not publish a digest.
pub fn compute_sha256(client: &reqwest::blocking::Client, url: &str) -> Result<String> {
    let mut response = client
        .get(url)
        .send()
        .with_context(|| format!("failed to download {url}"))?
        .error_for_status()
        .with_context(|| format!("download of {url} was rejected"))?;
    sha256_hex_reader(&mut response).with_context(|| format!("failed to read body of {url}"))
}

pub fn sha256_hex_reader(reader: &mut impl Read) -> Result<String> {
    let mut hasher = Sha256::new();
    io::copy(reader, &mut hasher).context("failed to hash stream")?;
    Ok(hex::encode(hasher.finalize()))
}
