use crate::{cli::actions::Action, config::Config};
use anyhow::{Context, Result, ensure};
use clap::ArgMatches;
use std::path::PathBuf;

/// Convert `ArgMatches` into a typed Action, loading and validating the
/// configuration file along the way. The loaded `Config` is the single
/// immutable source of truth for the rest of the run.
///
/// # Errors
///
/// Returns an error if the config file cannot be loaded or required paths are
/// missing
pub fn dispatch(matches: &ArgMatches) -> Result<Action> {
    let path = matches
        .get_one::<PathBuf>("config")
        .context("config file path is required")?;

    let config = Config::load(path)?;

    ensure!(
        !config.paths.dbtool_path.is_empty(),
        "paths.DBToolPath must be set in {}",
        path.display()
    );

    Ok(Action::Provision { config })
}
