//! CLI argument parsing and validation module
//!
//! Handles command-line interface using clap, including:
//! - `load`: run both load phases against a simulated host profile
//! - `ops`: dump a package's tracked ops
//! - `addable`: list switch groups that could be added for a package
//! - Output format selection (human/JSON) and verbosity

use anyhow::{anyhow, Result};
use clap::{Arg, ArgAction, ArgMatches, Command};
use std::path::{Path, PathBuf};

/// What the user asked the binary to do
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CliCommand {
    Load {
        profile: PathBuf,
        prefs: Option<PathBuf>,
        /// Load as this package instead of the profile's own
        package: Option<String>,
    },
    Ops {
        profile: PathBuf,
        package: String,
    },
    Addable {
        profile: PathBuf,
        package: String,
    },
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CliConfig {
    pub command: CliCommand,
    pub json_output: bool,
    pub verbose: bool,
}

fn profile_arg() -> Arg {
    Arg::new("profile")
        .value_name("PROFILE")
        .help("Host profile (TOML) describing the simulated device")
        .required(true)
}

fn package_arg(required: bool) -> Arg {
    Arg::new("package")
        .short('p')
        .long("package")
        .value_name("PACKAGE")
        .help("Package name to operate on")
        .required(required)
}

fn json_arg() -> Arg {
    Arg::new("json")
        .short('j')
        .long("json")
        .help("Output in JSON format")
        .action(ArgAction::SetTrue)
}

pub fn build_command() -> Command {
    Command::new("opshim")
        .version(env!("OPSHIM_VERSION"))
        .about("Adaptive app-ops hook engine")
        .long_about("Resolves host variants, installs guarded hooks and applies hacks against a simulated host profile, and inspects per-package op state.")
        .subcommand_required(true)
        .arg_required_else_help(true)
        .arg(
            Arg::new("verbose")
                .short('v')
                .long("verbose")
                .help("Enable debug logging on stderr")
                .action(ArgAction::SetTrue)
                .global(true),
        )
        .subcommand(
            Command::new("load")
                .about("Run the resource and behavior phases against a host profile")
                .arg(profile_arg())
                .arg(
                    Arg::new("prefs")
                        .long("prefs")
                        .value_name("FILE")
                        .help("Preferences file (defaults to the user config directory)"),
                )
                .arg(package_arg(false).help("Load as this package instead of the profile's own"))
                .arg(json_arg()),
        )
        .subcommand(
            Command::new("ops")
                .about("List the ops tracked for a package")
                .arg(profile_arg())
                .arg(package_arg(true))
                .arg(json_arg()),
        )
        .subcommand(
            Command::new("addable")
                .about("List switch groups that can be added for a package")
                .arg(profile_arg())
                .arg(package_arg(true))
                .arg(json_arg()),
        )
}

/// Parse command line arguments and return configuration
pub fn parse_args() -> Result<CliConfig> {
    config_from_matches(&build_command().get_matches())
}

fn existing_path(matches: &ArgMatches, id: &str) -> Result<PathBuf> {
    let value = matches
        .get_one::<String>(id)
        .ok_or_else(|| anyhow!("Missing required argument: {}", id))?;
    let path = Path::new(value);
    if !path.exists() {
        return Err(anyhow!("Path does not exist: {}", value));
    }
    Ok(path.to_path_buf())
}

fn required_package(matches: &ArgMatches) -> Result<String> {
    matches
        .get_one::<String>("package")
        .cloned()
        .ok_or_else(|| anyhow!("Missing required argument: --package"))
}

pub fn config_from_matches(matches: &ArgMatches) -> Result<CliConfig> {
    let (name, sub) = matches
        .subcommand()
        .ok_or_else(|| anyhow!("No subcommand given"))?;

    let command = match name {
        "load" => CliCommand::Load {
            profile: existing_path(sub, "profile")?,
            prefs: match sub.get_one::<String>("prefs") {
                Some(_) => Some(existing_path(sub, "prefs")?),
                None => None,
            },
            package: sub.get_one::<String>("package").cloned(),
        },
        "ops" => CliCommand::Ops {
            profile: existing_path(sub, "profile")?,
            package: required_package(sub)?,
        },
        "addable" => CliCommand::Addable {
            profile: existing_path(sub, "profile")?,
            package: required_package(sub)?,
        },
        other => return Err(anyhow!("Unknown subcommand: {}", other)),
    };

    Ok(CliConfig {
        command,
        json_output: sub.get_flag("json"),
        verbose: matches.get_flag("verbose"),
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn parse(args: &[&str]) -> Result<CliConfig> {
        let matches = build_command().try_get_matches_from(args)?;
        config_from_matches(&matches)
    }

    #[test]
    fn test_command_is_consistent() {
        build_command().debug_assert();
    }

    #[test]
    fn test_ops_requires_package() {
        let file = tempfile::NamedTempFile::new().unwrap();
        let path = file.path().to_str().unwrap();
        assert!(parse(&["opshim", "ops", path]).is_err());

        let config = parse(&["opshim", "ops", path, "--package", "com.example", "--json", "-v"]).unwrap();
        assert!(config.json_output);
        assert!(config.verbose);
        assert_eq!(
            config.command,
            CliCommand::Ops { profile: PathBuf::from(path), package: "com.example".to_string() }
        );
    }

    #[test]
    fn test_missing_profile_is_rejected() {
        let err = parse(&["opshim", "load", "/nonexistent/profile.toml"]).unwrap_err();
        assert!(err.to_string().contains("Path does not exist"));
    }
}
