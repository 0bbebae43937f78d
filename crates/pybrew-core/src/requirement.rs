use std::collections::BTreeSet;
use std::fmt;
use std::str::FromStr;

use anyhow::{anyhow, Result};
use pep440_rs::VersionSpecifiers;

/// Canonical form of a package name. PyPI treats names case-insensitively,
/// so every map key and comparison in this workspace goes through here.
pub fn canonical_name(name: &str) -> String {
    name.to_ascii_lowercase()
}

/// A parsed requirement specifier: package name, optional extras, optional
/// version specifiers, optional trailing environment marker.
///
/// Values are only created by [`Requirement::parse`]; invalid syntax is
/// rejected at that boundary instead of being carried around.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Requirement {
    name: String,
    extras: Vec<String>,
    specifier: Option<VersionSpecifiers>,
    marker: Option<String>,
}

impl Requirement {
    /// Parses a PEP 508-style specifier such as
    /// `requests[security,socks] (>=2.0) ; python_version >= "3.6"`.
    pub fn parse(input: &str) -> Result<Self> {
        let text = input.trim();
        if text.is_empty() {
            return Err(anyhow!("requirement must not be empty"));
        }

        let (spec_part, marker) = match text.split_once(';') {
            Some((head, tail)) => {
                let marker = tail.trim();
                if marker.is_empty() {
                    return Err(anyhow!("invalid requirement '{input}': empty marker"));
                }
                (head.trim_end(), Some(marker.to_string()))
            }
            None => (text, None),
        };

        let name_end = spec_part
            .find(|ch: char| !is_name_char(ch))
            .unwrap_or(spec_part.len());
        let (name, rest) = spec_part.split_at(name_end);
        validate_name(name, input)?;
        let mut rest = rest.trim_start();

        let mut extras = Vec::new();
        if let Some(after_bracket) = rest.strip_prefix('[') {
            let Some(end) = after_bracket.find(']') else {
                return Err(anyhow!("invalid requirement '{input}': unterminated extras"));
            };
            for extra in after_bracket[..end].split(',') {
                let extra = extra.trim();
                if extra.is_empty() {
                    return Err(anyhow!("invalid requirement '{input}': empty extra name"));
                }
                extras.push(extra.to_ascii_lowercase());
            }
            rest = after_bracket[end + 1..].trim_start();
        }
        extras.sort();
        extras.dedup();

        let spec_text = rest
            .trim()
            .trim_start_matches('(')
            .trim_end_matches(')')
            .trim();
        let specifier = if spec_text.is_empty() {
            None
        } else {
            let parsed = VersionSpecifiers::from_str(spec_text)
                .map_err(|err| anyhow!("invalid version specifier in '{input}': {err}"))?;
            Some(parsed)
        };

        Ok(Self {
            name: name.to_string(),
            extras,
            specifier,
            marker,
        })
    }

    /// The name exactly as written in the specifier.
    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn canonical_name(&self) -> String {
        canonical_name(&self.name)
    }

    /// Active extras, lowercased and sorted.
    pub fn extras(&self) -> &[String] {
        &self.extras
    }

    pub fn specifier(&self) -> Option<&VersionSpecifiers> {
        self.specifier.as_ref()
    }

    pub fn marker(&self) -> Option<&str> {
        self.marker.as_deref()
    }

    /// Identity used by the dependency walker's visited set: the same
    /// package requested with different extras is a distinct visit.
    pub fn key(&self) -> String {
        format!("{}[{}]", self.canonical_name(), self.extras.join(","))
    }

    /// Returns a copy of this requirement with additional extras activated.
    pub fn with_extras(&self, additional: &[String]) -> Self {
        let mut copy = self.clone();
        copy.extras
            .extend(additional.iter().map(|extra| extra.to_ascii_lowercase()));
        copy.extras.sort();
        copy.extras.dedup();
        copy
    }

    /// Whether this requirement's marker is satisfied under the given active
    /// extras. Markers carrying `extra == "x"` clauses match when any named
    /// extra is active; markers with no extra clause (platform or Python
    /// version conditions) are treated as satisfied.
    pub fn marker_matches(&self, active_extras: &BTreeSet<String>) -> bool {
        let Some(marker) = &self.marker else {
            return true;
        };
        let wanted = marker_extras(marker);
        if wanted.is_empty() {
            return true;
        }
        wanted.iter().any(|extra| active_extras.contains(extra))
    }
}

impl fmt::Display for Requirement {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.name)?;
        if !self.extras.is_empty() {
            write!(f, "[{}]", self.extras.join(","))?;
        }
        if let Some(specifier) = &self.specifier {
            write!(f, "{specifier}")?;
        }
        if let Some(marker) = &self.marker {
            write!(f, "; {marker}")?;
        }
        Ok(())
    }
}

fn is_name_char(ch: char) -> bool {
    ch.is_ascii_alphanumeric() || ch == '-' || ch == '_' || ch == '.'
}

fn validate_name(name: &str, input: &str) -> Result<()> {
    if name.is_empty() {
        return Err(anyhow!("invalid requirement '{input}': missing package name"));
    }
    let starts_ok = name
        .chars()
        .next()
        .is_some_and(|ch| ch.is_ascii_alphanumeric());
    let ends_ok = name
        .chars()
        .last()
        .is_some_and(|ch| ch.is_ascii_alphanumeric());
    if !starts_ok || !ends_ok {
        return Err(anyhow!("invalid package name in '{input}': {name}"));
    }
    Ok(())
}

fn marker_extras(marker: &str) -> Vec<String> {
    let tokens: Vec<&str> = marker.split_whitespace().collect();
    let mut extras = Vec::new();
    for window in tokens.windows(3) {
        if window[0] == "extra" && window[1] == "==" {
            let value = window[2].trim_matches(|ch| ch == '"' || ch == '\'');
            extras.push(value.to_ascii_lowercase());
        }
    }
    extras
}
