use std::collections::HashMap;

use anyhow::{Context, Result};
use pybrew_core::DependencyNode;
use serde::Serialize;
use tera::{Tera, Value};

const RESOURCE_TEMPLATE: &str = r#"resource "{{ resource.name }}" do
  url "{{ resource.url }}"
  {{ resource.checksum_type }} "{{ resource.checksum }}"
end"#;

const FORMULA_TEMPLATE: &str = r#"class {{ package.name | studly }} < Formula
  include Language::Python::Virtualenv

  desc "Shiny new formula"
  homepage ""
  url "{{ package.url }}"
  sha256 "{{ package.checksum }}"

  depends_on "{{ python }}"
{% for resource in resources %}
  resource "{{ resource.name }}" do
    url "{{ resource.url }}"
    {{ resource.checksum_type }} "{{ resource.checksum }}"
  end
{% endfor %}
  def install
    virtualenv_install_with_resources
  end

  test do
    false
  end
end"#;

/// String-only projection of a node handed to the template engine.
#[derive(Serialize)]
struct ResourceView {
    name: String,
    url: String,
    checksum: String,
    checksum_type: String,
}

impl From<&DependencyNode> for ResourceView {
    fn from(node: &DependencyNode) -> Self {
        Self {
            name: node.name.clone(),
            url: node.url.clone(),
            checksum: node.checksum.clone(),
            checksum_type: node.checksum_type.clone(),
        }
    }
}

pub struct StanzaRenderer {
    tera: Tera,
}

impl StanzaRenderer {
    pub fn new() -> Result<Self> {
        let mut tera = Tera::default();
        tera.register_filter("studly", studly_filter);
        tera.add_raw_template("resource", RESOURCE_TEMPLATE)
            .context("invalid resource template")?;
        tera.add_raw_template("formula", FORMULA_TEMPLATE)
            .context("invalid formula template")?;
        Ok(Self { tera })
    }

    pub fn render_resource(&self, node: &DependencyNode) -> Result<String> {
        let mut context = tera::Context::new();
        context.insert("resource", &ResourceView::from(node));
        self.tera
            .render("resource", &context)
            .context("failed to render resource stanza")
    }

    pub fn render_formula(
        &self,
        root: &DependencyNode,
        resources: &[&DependencyNode],
    ) -> Result<String> {
        let views: Vec<ResourceView> = resources
            .iter()
            .map(|node| ResourceView::from(*node))
            .collect();
        let mut context = tera::Context::new();
        context.insert("package", &ResourceView::from(root));
        context.insert("resources", &views);
        context.insert("python", "python3");
        self.tera
            .render("formula", &context)
            .context("failed to render formula")
    }
}

/// `pytest-cov` -> `PytestCov`: Homebrew class names are StudlyCaps with
/// dash/underscore delimiters folded away.
fn studly_filter(value: &Value, _args: &HashMap<String, Value>) -> tera::Result<Value> {
    let input = value
        .as_str()
        .ok_or_else(|| tera::Error::msg("studly filter requires a string"))?;
    Ok(Value::String(dash_to_studly(input)))
}

pub(crate) fn dash_to_studly(input: &str) -> String {
    let mut out = String::with_capacity(input.len());
    let mut upper_next = true;
    for ch in input.chars() {
        if ch == '-' || ch == '_' {
            upper_next = true;
            continue;
        }
        if upper_next {
            out.extend(ch.to_uppercase());
            upper_next = false;
        } else {
            out.push(ch);
        }
    }
    out
}
