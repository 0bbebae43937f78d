use std::path::PathBuf;
use std::process::ExitCode;

use anyhow::{anyhow, Result};
use clap::{CommandFactory, Parser};
use pybrew_core::Warning;
use pybrew_index::{PypiClient, DEFAULT_INDEX_URL};
use pybrew_resolver::{discover_site_packages, ImplicitExtras, InstalledSnapshot};

use crate::flows::{formula_for, resources_for, single_resources};

mod flows;
mod template;

#[cfg(test)]
mod tests;

#[derive(Parser, Debug)]
#[command(name = "pybrew", version)]
#[command(
    about = "Generate Homebrew resource stanzas for PyPI packages and their dependencies",
    long_about = None
)]
struct Cli {
    /// Generate a resource stanza for one or more packages, without
    /// considering dependencies.
    #[arg(short, long, value_name = "PACKAGE", num_args = 1..)]
    single: Vec<String>,
    /// Generate a complete formula for a PyPI package with its recursive
    /// dependencies as resources.
    #[arg(short, long, value_name = "PACKAGE")]
    formula: Option<String>,
    /// Generate resource stanzas for a package and its recursive
    /// dependencies (default).
    #[arg(short, long, value_name = "PACKAGE")]
    resources: Option<String>,
    /// Additional root package merged into the same resource set. May be
    /// repeated; not usable with --single.
    #[arg(short, long, value_name = "PACKAGE")]
    also: Vec<String>,
    /// Base URL of the package index.
    #[arg(long, default_value = DEFAULT_INDEX_URL, value_name = "URL")]
    index_url: String,
    /// Site-packages directory to inspect instead of asking python3.
    /// May be repeated.
    #[arg(long, value_name = "DIR")]
    site_packages: Vec<PathBuf>,
    /// Replace the implicit-extra rule table, as name=extra. May be
    /// repeated. The default table is requests=security.
    #[arg(long, value_name = "NAME=EXTRA")]
    implicit_extra: Vec<String>,
    package: Option<String>,
}

fn main() -> ExitCode {
    init_tracing();
    let cli = Cli::parse();
    match run(cli) {
        Ok(code) => ExitCode::from(code),
        Err(err) => {
            eprintln!("error: {err:#}");
            ExitCode::FAILURE
        }
    }
}

fn run(cli: Cli) -> Result<u8> {
    let actions = [
        cli.formula.is_some(),
        cli.resources.is_some(),
        !cli.single.is_empty(),
    ]
    .iter()
    .filter(|set| **set)
    .count();
    if actions > 1 {
        return Ok(usage_error(
            "--formula, --resources, and --single are mutually exclusive.",
        ));
    }
    if (cli.formula.is_some() || cli.resources.is_some()) && cli.package.is_some() {
        return Ok(usage_error("--formula and --resources take a single argument."));
    }
    if !cli.single.is_empty() && !cli.also.is_empty() {
        return Ok(usage_error("Can't use --also with --single."));
    }

    let client = PypiClient::new(&cli.index_url)?;
    let mut warnings = Vec::new();

    let output = if let Some(package) = &cli.formula {
        let snapshot = load_snapshot(&cli.site_packages)?;
        let rules = parse_implicit_extras(&cli.implicit_extra)?;
        formula_for(&client, &snapshot, &rules, package, &cli.also, &mut warnings)?
    } else if !cli.single.is_empty() {
        single_resources(&client, &cli.single, &mut warnings)?
    } else {
        let Some(package) = cli.resources.as_ref().or(cli.package.as_ref()) else {
            return Ok(usage_error("A package argument is required."));
        };
        let snapshot = load_snapshot(&cli.site_packages)?;
        let rules = parse_implicit_extras(&cli.implicit_extra)?;
        let mut roots = vec![package.clone()];
        roots.extend(cli.also.iter().cloned());
        resources_for(&client, &snapshot, &rules, &roots, &mut warnings)?
    };

    report_warnings(&warnings);
    println!("{output}");
    Ok(0)
}

fn usage_error(message: &str) -> u8 {
    eprintln!("{message}");
    eprintln!("{}", Cli::command().render_usage());
    1
}

fn load_snapshot(site_packages: &[PathBuf]) -> Result<InstalledSnapshot> {
    let dirs = if site_packages.is_empty() {
        discover_site_packages()?
    } else {
        site_packages.to_vec()
    };
    InstalledSnapshot::from_site_packages(&dirs)
}

fn parse_implicit_extras(values: &[String]) -> Result<ImplicitExtras> {
    if values.is_empty() {
        return Ok(ImplicitExtras::default());
    }
    let mut rules = ImplicitExtras::empty();
    for value in values {
        let (name, extra) = value
            .split_once('=')
            .ok_or_else(|| anyhow!("invalid implicit extra '{value}': expected name=extra"))?;
        let (name, extra) = (name.trim(), extra.trim());
        if name.is_empty() || extra.is_empty() {
            return Err(anyhow!("invalid implicit extra '{value}': expected name=extra"));
        }
        rules.add(name, extra);
    }
    Ok(rules)
}

fn report_warnings(warnings: &[Warning]) {
    for warning in warnings {
        eprintln!("warning: {warning}");
    }
}

fn init_tracing() {
    use tracing_subscriber::EnvFilter;

    let filter = EnvFilter::try_from_env("PYBREW_LOG").unwrap_or_else(|_| EnvFilter::new("warn"));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();
}
