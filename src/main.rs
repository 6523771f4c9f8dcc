#![forbid(unsafe_code)]

mod cli;
mod output;

use anyhow::{anyhow, Context, Result};
use std::path::Path;

use cli::{CliCommand, CliConfig};
use opshim::config::{HostProfile, Preferences};
use opshim::engine::{Engine, MemoryResourceTable};
use opshim::logging::init_cli_logger;
use opshim::models::{LoadOutput, Subject};

fn main() -> Result<()> {
    let config = cli::parse_args()?;
    init_cli_logger(config.verbose)?;
    run(&config)
}

fn run(config: &CliConfig) -> Result<()> {
    match &config.command {
        CliCommand::Load { profile, prefs, package } => {
            run_load(profile, prefs.as_deref(), package.as_deref(), config.verbose, config.json_output)
        }
        CliCommand::Ops { profile, package } => run_ops(profile, package, config.json_output),
        CliCommand::Addable { profile, package } => run_addable(profile, package, config.json_output),
    }
}

fn run_load(
    profile_path: &Path,
    prefs_path: Option<&Path>,
    package: Option<&str>,
    verbose: bool,
    json: bool,
) -> Result<()> {
    let profile = HostProfile::load_from_file(profile_path)?;
    let mut prefs = Preferences::load_or_default(prefs_path)?;
    // -v also lifts the engine's own event filter
    prefs.debug |= verbose;

    let identity = match package {
        Some(package) => profile.identity_for(package),
        None => profile.identity(),
    };
    let host = profile.build_host()?;
    let (ops, _subsystem) = profile.build_ops()?;
    let mut resources = MemoryResourceTable::new();

    let engine = Engine::builtin();
    let output = LoadOutput {
        reports: vec![
            engine.on_resource_phase(&identity, &mut resources, &prefs),
            engine.on_behavior_phase(&identity, &host, &prefs, Some(&ops)),
        ],
    };

    if json {
        output::print_json(&output)
    } else {
        print!("{}", output::render_load(&output)?);
        Ok(())
    }
}

fn find_subject(profile: &HostProfile, package: &str) -> Result<Subject> {
    profile
        .subject(package)
        .ok_or_else(|| anyhow!("Package {} is not described by the profile", package))
}

fn run_ops(profile_path: &Path, package: &str, json: bool) -> Result<()> {
    let profile = HostProfile::load_from_file(profile_path)?;
    let subject = find_subject(&profile, package)?;
    let (ops, _subsystem) = profile.build_ops()?;
    let reports = ops
        .describe_package(&subject)
        .with_context(|| format!("Failed to read ops for {}", subject))?;

    if json {
        output::print_json(&reports)
    } else {
        let labels = profile.labels(ops.table());
        print!("{}", output::render_ops(&subject, &reports, &labels)?);
        Ok(())
    }
}

fn run_addable(profile_path: &Path, package: &str, json: bool) -> Result<()> {
    let profile = HostProfile::load_from_file(profile_path)?;
    let subject = find_subject(&profile, package)?;
    let (ops, _subsystem) = profile.build_ops()?;
    let permissions = profile.permissions();
    let addable = ops
        .addable_op_switches(&subject, &permissions)
        .with_context(|| format!("Failed to compute addable ops for {}", subject))?;

    if json {
        output::print_json(&addable)
    } else {
        let labels = profile.labels(ops.table());
        print!("{}", output::render_addable(&subject, &addable, &ops, &labels)?);
        Ok(())
    }
}
