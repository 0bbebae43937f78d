use std::collections::BTreeMap;
use std::str::FromStr;

use clap::Parser;
use pybrew_core::{DependencyNode, Version, CHECKSUM_TYPE_SHA256};
use pybrew_index::{Distribution, PackageIndex};
use pybrew_resolver::{ImplicitExtras, InstalledPackage, InstalledSnapshot};

use super::flows::{formula_for, resources_for, single_resources};
use super::template::{dash_to_studly, StanzaRenderer};
use super::*;

fn version(text: &str) -> Version {
    Version::from_str(text).expect("version must parse")
}

fn sdist(version_text: &str, url: &str, sha256: &str) -> Distribution {
    Distribution {
        version: version(version_text),
        url: url.to_string(),
        packagetype: "sdist".to_string(),
        sha256: Some(sha256.to_string()),
    }
}

fn installed(name: &str, version_text: &str, requires: &[&str]) -> InstalledPackage {
    InstalledPackage {
        name: name.to_string(),
        version: version(version_text),
        requires_dist: requires
            .iter()
            .map(|text| pybrew_core::Requirement::parse(text).expect("requirement must parse"))
            .collect(),
    }
}

#[derive(Default)]
struct StubIndex {
    files: BTreeMap<String, Vec<Distribution>>,
}

impl StubIndex {
    fn with(packages: &[(&str, &str)]) -> Self {
        let mut files = BTreeMap::new();
        for (name, version_text) in packages {
            files.insert(
                name.to_string(),
                vec![sdist(
                    version_text,
                    &format!("https://files.example.test/{name}-{version_text}.tar.gz"),
                    &"a".repeat(64),
                )],
            );
        }
        Self { files }
    }
}

impl PackageIndex for StubIndex {
    fn project_files(&self, name: &str) -> anyhow::Result<Vec<Distribution>> {
        Ok(self.files.get(name).cloned().unwrap_or_default())
    }

    fn fetch_checksum(&self, _url: &str) -> anyhow::Result<String> {
        Ok("b".repeat(64))
    }
}

fn node(name: &str, url: &str, checksum: &str) -> DependencyNode {
    DependencyNode {
        name: name.to_string(),
        version: Some(version("1.0")),
        url: url.to_string(),
        checksum: checksum.to_string(),
        checksum_type: CHECKSUM_TYPE_SHA256.to_string(),
    }
}

#[test]
fn studly_folds_delimiters() {
    assert_eq!(dash_to_studly("pytest-cov"), "PytestCov");
    assert_eq!(dash_to_studly("foo_bar"), "FooBar");
    assert_eq!(dash_to_studly("flask"), "Flask");
    assert_eq!(dash_to_studly("zope.interface"), "Zope.interface");
}

#[test]
fn renders_resource_stanza() {
    let renderer = StanzaRenderer::new().expect("renderer must build");
    let node = node(
        "bar",
        "https://files.example.test/bar-1.0.tar.gz",
        "deadbeef",
    );

    let stanza = renderer.render_resource(&node).expect("must render");

    assert_eq!(
        stanza,
        "resource \"bar\" do\n  url \"https://files.example.test/bar-1.0.tar.gz\"\n  sha256 \"deadbeef\"\nend"
    );
}

#[test]
fn renders_placeholder_resource_with_empty_fields() {
    let renderer = StanzaRenderer::new().expect("renderer must build");

    let stanza = renderer
        .render_resource(&DependencyNode::placeholder("ghost"))
        .expect("must render");

    assert!(stanza.contains("resource \"ghost\" do"));
    assert!(stanza.contains("url \"\""));
    assert!(stanza.contains("sha256 \"\""));
}

#[test]
fn renders_formula_with_studly_class_and_resource_blocks() {
    let renderer = StanzaRenderer::new().expect("renderer must build");
    let root = node(
        "pytest-cov",
        "https://files.example.test/pytest-cov-1.0.tar.gz",
        "aa",
    );
    let dep = node("coverage", "https://files.example.test/coverage-1.0.tar.gz", "bb");

    let formula = renderer
        .render_formula(&root, &[&dep])
        .expect("must render");

    assert!(formula.starts_with("class PytestCov < Formula"));
    assert!(formula.contains("include Language::Python::Virtualenv"));
    assert!(formula.contains("url \"https://files.example.test/pytest-cov-1.0.tar.gz\""));
    assert!(formula.contains("depends_on \"python3\""));
    assert!(formula.contains("  resource \"coverage\" do"));
    assert!(formula.contains("virtualenv_install_with_resources"));
    assert!(formula.ends_with("end"));
}

#[test]
fn formula_excludes_root_from_resources_but_resources_mode_keeps_it() {
    let index = StubIndex::with(&[("foo", "1.0"), ("bar", "2.0")]);
    let snapshot = InstalledSnapshot::new([
        installed("foo", "1.0", &["bar"]),
        installed("bar", "2.0", &[]),
    ]);
    let rules = ImplicitExtras::empty();

    let mut warnings = Vec::new();
    let formula = formula_for(&index, &snapshot, &rules, "foo", &[], &mut warnings)
        .expect("formula must render");
    assert!(formula.contains("class Foo < Formula"));
    assert!(formula.contains("resource \"bar\""));
    assert!(!formula.contains("resource \"foo\""));

    let mut warnings = Vec::new();
    let resources = resources_for(
        &index,
        &snapshot,
        &rules,
        &["foo".to_string()],
        &mut warnings,
    )
    .expect("resources must render");
    assert!(resources.contains("resource \"foo\""));
    assert!(resources.contains("resource \"bar\""));
}

#[test]
fn also_roots_are_merged_into_the_resource_set() {
    let index = StubIndex::with(&[("foo", "1.0"), ("bar", "2.0"), ("extra", "3.0")]);
    let snapshot = InstalledSnapshot::new([
        installed("foo", "1.0", &["bar"]),
        installed("bar", "2.0", &[]),
        installed("extra", "3.0", &[]),
    ]);
    let rules = ImplicitExtras::empty();

    let mut warnings = Vec::new();
    let resources = resources_for(
        &index,
        &snapshot,
        &rules,
        &["foo".to_string(), "extra".to_string()],
        &mut warnings,
    )
    .expect("resources must render");

    assert!(resources.contains("resource \"foo\""));
    assert!(resources.contains("resource \"bar\""));
    assert!(resources.contains("resource \"extra\""));
    assert!(warnings.is_empty());
}

#[test]
fn single_mode_skips_traversal() {
    let index = StubIndex::with(&[("foo", "1.0"), ("bar", "2.0")]);

    let mut warnings = Vec::new();
    let output = single_resources(&index, &["foo".to_string()], &mut warnings)
        .expect("must render");

    assert!(output.contains("resource \"foo\""));
    assert!(!output.contains("resource \"bar\""));
}

#[test]
fn formula_for_missing_root_node_is_an_error() {
    // Empty index: foo resolves to a placeholder node, which still carries
    // the root name, so the failure needs a root that never enters the
    // graph at all. An ignored tooling name does exactly that.
    let index = StubIndex::default();
    let snapshot = InstalledSnapshot::new([installed("pip", "21.0", &[])]);
    let rules = ImplicitExtras::empty();

    let mut warnings = Vec::new();
    let result = formula_for(&index, &snapshot, &rules, "pip", &[], &mut warnings);

    assert!(result.is_err());
}

#[test]
fn identical_nodes_from_multiple_roots_merge_silently() {
    let mut index = StubIndex::default();
    index.files.insert(
        "shared".to_string(),
        vec![
            sdist("1.0", "https://files.example.test/shared-1.0.tar.gz", "aa"),
            sdist("2.0", "https://files.example.test/shared-2.0.tar.gz", "bb"),
        ],
    );
    index.files.insert(
        "a".to_string(),
        vec![sdist("1.0", "https://files.example.test/a-1.0.tar.gz", "cc")],
    );
    index.files.insert(
        "b".to_string(),
        vec![sdist("1.0", "https://files.example.test/b-1.0.tar.gz", "dd")],
    );
    let snapshot = InstalledSnapshot::new([
        installed("a", "1.0", &["shared"]),
        installed("b", "1.0", &["shared"]),
        installed("shared", "1.0", &[]),
    ]);
    let rules = ImplicitExtras::empty();

    let mut warnings = Vec::new();
    let resources = resources_for(
        &index,
        &snapshot,
        &rules,
        &["a".to_string(), "b".to_string()],
        &mut warnings,
    )
    .expect("resources must render");

    assert!(resources.contains("resource \"shared\""));
    // Identical nodes from both closures merge silently.
    assert!(warnings.is_empty());
}

#[test]
fn usage_error_when_positional_combined_with_formula() {
    let cli = Cli::try_parse_from(["pybrew", "--formula", "foo", "bar"]).expect("args must parse");

    assert_eq!(run(cli).expect("usage errors are not failures"), 1);
}

#[test]
fn usage_error_when_also_combined_with_single() {
    let cli = Cli::try_parse_from(["pybrew", "--single", "foo", "--also", "bar"])
        .expect("args must parse");

    assert_eq!(run(cli).expect("usage errors are not failures"), 1);
}

#[test]
fn usage_error_when_actions_conflict() {
    let cli = Cli::try_parse_from(["pybrew", "--formula", "foo", "--resources", "bar"])
        .expect("args must parse");

    assert_eq!(run(cli).expect("usage errors are not failures"), 1);
}

#[test]
fn usage_error_when_no_package_given() {
    let cli = Cli::try_parse_from(["pybrew"]).expect("args must parse");

    assert_eq!(run(cli).expect("usage errors are not failures"), 1);
}

#[test]
fn implicit_extra_overrides_replace_the_default_table() {
    let defaults = parse_implicit_extras(&[]).expect("defaults must build");
    assert_eq!(defaults.extras_for("requests"), ["security"]);

    let custom =
        parse_implicit_extras(&["mypkg=fast".to_string()]).expect("override must parse");
    assert_eq!(custom.extras_for("mypkg"), ["fast"]);
    assert!(custom.extras_for("requests").is_empty());

    assert!(parse_implicit_extras(&["broken".to_string()]).is_err());
    assert!(parse_implicit_extras(&["=extra".to_string()]).is_err());
}
