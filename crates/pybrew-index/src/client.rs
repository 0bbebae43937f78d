use std::collections::BTreeMap;
use std::str::FromStr;

use anyhow::{Context, Result};
use pybrew_core::Version;
use serde::Deserialize;

use crate::checksum::compute_sha256;
use crate::urlutil::extract_credentials;

pub const DEFAULT_INDEX_URL: &str = "https://pypi.org/pypi";

/// One downloadable file of one release, as reported by the index.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Distribution {
    pub version: Version,
    pub url: String,
    pub packagetype: String,
    pub sha256: Option<String>,
}

impl Distribution {
    pub fn is_sdist(&self) -> bool {
        self.packagetype == "sdist"
    }
}

/// The two index capabilities the researcher needs: listing a project's
/// files and hashing an archive the index published no digest for.
/// Injected so graph building is testable without a network.
pub trait PackageIndex {
    fn project_files(&self, name: &str) -> Result<Vec<Distribution>>;
    fn fetch_checksum(&self, url: &str) -> Result<String>;
}

#[derive(Debug, Deserialize)]
pub(crate) struct ProjectPayload {
    pub(crate) releases: BTreeMap<String, Vec<ReleaseFile>>,
}

#[derive(Debug, Deserialize)]
pub(crate) struct ReleaseFile {
    pub(crate) packagetype: String,
    pub(crate) url: String,
    #[serde(default)]
    pub(crate) digests: Digests,
}

#[derive(Debug, Default, Deserialize)]
pub(crate) struct Digests {
    pub(crate) sha256: Option<String>,
}

/// Blocking client for the index JSON API (`{endpoint}/{name}/json`).
/// Credentials embedded in the configured index URL are stripped and sent
/// as basic auth on every request.
pub struct PypiClient {
    endpoint: String,
    username: Option<String>,
    password: Option<String>,
    http: reqwest::blocking::Client,
}

impl PypiClient {
    pub fn new(index_url: &str) -> Result<Self> {
        let (endpoint, username, password) = extract_credentials(index_url)?;
        let http = reqwest::blocking::Client::builder()
            .user_agent(concat!("pybrew/", env!("CARGO_PKG_VERSION")))
            .build()
            .context("failed to build http client")?;
        Ok(Self {
            endpoint: endpoint.trim_end_matches('/').to_string(),
            username,
            password,
            http,
        })
    }

    fn get(&self, url: &str) -> reqwest::blocking::RequestBuilder {
        let mut request = self.http.get(url);
        if let Some(username) = &self.username {
            request = request.basic_auth(username, self.password.as_deref());
        }
        request
    }
}

impl PackageIndex for PypiClient {
    fn project_files(&self, name: &str) -> Result<Vec<Distribution>> {
        let url = format!("{}/{}/json", self.endpoint, name);
        let payload: ProjectPayload = self
            .get(&url)
            .send()
            .with_context(|| format!("failed to query package index for '{name}'"))?
            .error_for_status()
            .with_context(|| format!("package index rejected query for '{name}'"))?
            .json()
            .with_context(|| format!("failed to decode index response for '{name}'"))?;
        Ok(flatten_releases(payload))
    }

    fn fetch_checksum(&self, url: &str) -> Result<String> {
        compute_sha256(&self.http, url)
    }
}

/// Flattens the per-version release map into one distribution list.
/// Releases whose version string is not valid PEP 440 are skipped; they
/// cannot take part in version ordering.
pub(crate) fn flatten_releases(payload: ProjectPayload) -> Vec<Distribution> {
    let mut distributions = Vec::new();
    for (version_text, files) in payload.releases {
        let Ok(version) = Version::from_str(&version_text) else {
            tracing::debug!("skipping release with unparseable version: {version_text}");
            continue;
        };
        for file in files {
            distributions.push(Distribution {
                version: version.clone(),
                url: file.url,
                packagetype: file.packagetype,
                sha256: file.digests.sha256,
            });
        }
    }
    distributions
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn flattens_release_map_and_skips_bad_versions() {
        let payload: ProjectPayload = serde_json::from_str(
            r#"{
                "releases": {
                    "1.0": [
                        {
                            "packagetype": "sdist",
                            "url": "https://files.example.test/pkg-1.0.tar.gz",
                            "digests": {"sha256": "aa"}
                        },
                        {
                            "packagetype": "bdist_wheel",
                            "url": "https://files.example.test/pkg-1.0-py3-none-any.whl",
                            "digests": {"sha256": "bb"}
                        }
                    ],
                    "not-a-version": [
                        {
                            "packagetype": "sdist",
                            "url": "https://files.example.test/pkg-junk.tar.gz"
                        }
                    ]
                }
            }"#,
        )
        .expect("payload must deserialize");

        let distributions = flatten_releases(payload);

        assert_eq!(distributions.len(), 2);
        assert!(distributions.iter().all(|d| d.version.to_string() == "1.0"));
        assert_eq!(
            distributions.iter().filter(|d| d.is_sdist()).count(),
            1
        );
    }

    #[test]
    fn missing_digests_deserialize_as_none() {
        let payload: ProjectPayload = serde_json::from_str(
            r#"{
                "releases": {
                    "2.1": [
                        {
                            "packagetype": "sdist",
                            "url": "https://files.example.test/pkg-2.1.tar.gz"
                        }
                    ]
                }
            }"#,
        )
        .expect("payload must deserialize");

        let distributions = flatten_releases(payload);

        assert_eq!(distributions.len(), 1);
        assert_eq!(distributions[0].sha256, None);
    }
}
