use crate::{
    config::{Config, ImportData, Paths, Probe},
    console::Console,
    runner::{Invocation, Runner},
};
use anyhow::{Context, Result};
use std::path::{Path, PathBuf};

const JAVA: &str = "java";
const PROJECT_NAME: &str = "GENERAL";
const USERNAME: &str = "admin";

/// Run the provisioning pipeline described by `config`.
///
/// Steps run strictly one after another, each gated by its flag: database
/// creation, initialization, core-config import, project-type import,
/// named-config imports, project creation, data imports, probe create+run.
/// Any fatal-step failure aborts the run; probe failures are printed and the
/// remaining probes still run.
///
/// # Errors
///
/// Returns the first fatal-step failure, with the step named in the context.
pub async fn start(config: &Config) -> Result<()> {
    let (console, writer) = Console::spawn();
    let outcome = {
        let runner = Runner::new(
            &config.paths.logs_path,
            config.print_execution,
            console.clone(),
        );
        run_steps(config, &runner, &console).await
    };
    // all sink clones are gone at this point; wait for the writer to flush
    drop(console);
    let _ = writer.await;
    outcome
}

async fn run_steps(config: &Config, runner: &Runner, console: &Console) -> Result<()> {
    create_db(config, runner, console).await?;
    initialize(config, runner, console).await?;
    import_core_config(config, runner, console).await?;
    import_project_types(config, runner, console).await?;
    import_configs(config, runner, console).await?;
    create_project(config, runner, console).await?;
    import_data(config, runner, console).await?;
    create_and_run_probes(config, runner, console).await;
    Ok(())
}

async fn create_db(config: &Config, runner: &Runner, console: &Console) -> Result<()> {
    if !config.actions.create_db {
        return Ok(());
    }
    console.step("Running createDB command");

    let mut args = base_command(&config.paths);
    args.push("createDatabase".to_string());
    args.push("--drop-if-exists".to_string());

    let invocation = dbtool_invocation(&config.paths, args, None);
    runner
        .run(&invocation)
        .await
        .context("createDatabase step failed")?;
    Ok(())
}

async fn initialize(config: &Config, runner: &Runner, console: &Console) -> Result<()> {
    if !config.actions.initialize {
        return Ok(());
    }
    console.step("Running initialize command");

    let mut args = base_command(&config.paths);
    args.push("initialize".to_string());

    let invocation = dbtool_invocation(&config.paths, args, None);
    runner
        .run(&invocation)
        .await
        .context("initialize step failed")?;
    Ok(())
}

async fn import_core_config(config: &Config, runner: &Runner, console: &Console) -> Result<()> {
    if !config.actions.import_core_config {
        return Ok(());
    }
    let mut args = base_command(&config.paths);
    args.push("importConfig".to_string());
    args.push("--import-core-conf".to_string());
    console.step(&format!("Running command: {}", args.join(" ")));

    let invocation = dbtool_invocation(&config.paths, args, None);
    runner
        .run(&invocation)
        .await
        .context("core config import step failed")?;
    Ok(())
}

async fn import_project_types(config: &Config, runner: &Runner, console: &Console) -> Result<()> {
    let entry = &config.actions.import_project_types;
    if !entry.run {
        return Ok(());
    }
    let args = import_config_args(&config.paths, &entry.path);
    console.step(&format!("Running command: {}", args.join(" ")));

    let invocation = dbtool_invocation(&config.paths, args, None);
    runner
        .run(&invocation)
        .await
        .context("project types import step failed")?;
    Ok(())
}

async fn import_configs(config: &Config, runner: &Runner, console: &Console) -> Result<()> {
    for entry in &config.actions.import_configs {
        if !entry.run {
            continue;
        }
        let args = import_config_args(&config.paths, &entry.path);
        console.step(&format!("Running command: {}", args.join(" ")));

        let invocation = dbtool_invocation(&config.paths, args, None);
        runner
            .run(&invocation)
            .await
            .with_context(|| format!("config import of {} failed", entry.path))?;
    }
    Ok(())
}

async fn create_project(config: &Config, runner: &Runner, console: &Console) -> Result<()> {
    if !config.actions.create_project {
        return Ok(());
    }
    console.step("Running createProject command");

    let mut args = base_command(&config.paths);
    args.push("createProject".to_string());
    args.push(format!("-n={PROJECT_NAME}"));
    args.push(format!("-t={PROJECT_NAME}"));

    let invocation = dbtool_invocation(&config.paths, args, None);
    runner
        .run(&invocation)
        .await
        .context("createProject step failed")?;
    Ok(())
}

async fn import_data(config: &Config, runner: &Runner, console: &Console) -> Result<()> {
    for entry in &config.actions.import_data {
        if !entry.run {
            continue;
        }
        let args = import_data_args(&config.paths, entry);
        console.step(&format!("Running command: {}", args.join(" ")));

        let invocation = dbtool_invocation(&config.paths, args, None);
        runner
            .run(&invocation)
            .await
            .with_context(|| format!("data import of {} failed", entry.probe_name))?;
    }
    Ok(())
}

/// Probe steps are non-fatal: a failed create or run is printed and the loop
/// moves on to the next probe.
async fn create_and_run_probes(config: &Config, runner: &Runner, console: &Console) {
    if config.actions.probes.is_empty() {
        return;
    }
    console.step("Running probes command");

    for probe in &config.actions.probes {
        if !probe.run {
            continue;
        }

        let create = dbtool_invocation(
            &config.paths,
            probe_create_args(&config.paths, probe),
            None,
        );
        console.detail(&format!(
            "create probe {} command: {}",
            probe.probe_name,
            create.args.join(" ")
        ));
        if let Err(err) = runner.run(&create).await {
            console.warn(&format!("probe {} create failed: {err}", probe.probe_name));
        }

        // probe run output is the one we keep on disk, keyed by probe name
        let run = dbtool_invocation(
            &config.paths,
            probe_run_args(&config.paths, probe),
            Some(probe.probe_name.clone()),
        );
        console.detail(&format!(
            "run probe {} command: {}",
            probe.probe_name,
            run.args.join(" ")
        ));
        if let Err(err) = runner.run(&run).await {
            console.warn(&format!("probe {} run failed: {err}", probe.probe_name));
        }
    }
}

/// Every step launches the `DBTool` jar from its install directory.
fn dbtool_invocation(paths: &Paths, args: Vec<String>, log_name: Option<String>) -> Invocation {
    Invocation {
        program: JAVA.to_string(),
        args,
        current_dir: Some(PathBuf::from(&paths.dbtool_path)),
        log_name,
    }
}

/// `-jar <tool>.jar -p=<repo><propertiesFilePath>`, where `<tool>` is the
/// last component of the `DBTool` install path.
fn base_command(paths: &Paths) -> Vec<String> {
    let tool = Path::new(&paths.dbtool_path).file_name().map_or_else(
        || paths.dbtool_path.clone(),
        |name| name.to_string_lossy().into_owned(),
    );
    vec![
        "-jar".to_string(),
        format!("{tool}.jar"),
        format!("-p={}{}", paths.repo, paths.properties_file_path),
    ]
}

/// Plain entry paths are resolved under `configsPath` and passed with `-f`;
/// entries starting with `-` go through verbatim as `DBTool` flags.
fn import_config_args(paths: &Paths, entry_path: &str) -> Vec<String> {
    let mut args = base_command(paths);
    args.push("importConfig".to_string());
    if entry_path.starts_with('-') {
        args.push(entry_path.to_string());
    } else {
        args.push("-f".to_string());
        args.push(format!("{}{}", paths.configs_path, entry_path));
    }
    args
}

fn import_data_args(paths: &Paths, entry: &ImportData) -> Vec<String> {
    let mut args = base_command(paths);
    args.extend([
        "importData".to_string(),
        format!("--project-name={PROJECT_NAME}"),
        format!("-n={}", entry.probe_name),
        format!("-f={}{}", paths.data_path, entry.probe_xml),
    ]);
    args
}

fn probe_create_args(paths: &Paths, probe: &Probe) -> Vec<String> {
    let mut args = base_command(paths);
    args.extend([
        "probe".to_string(),
        "create".to_string(),
        format!("-jar={}", probe_jar_path(paths, probe)),
        format!("-n={}", probe.probe_name.to_uppercase()),
        format!("--project-name={PROJECT_NAME}"),
        format!("--user-name={USERNAME}"),
    ]);
    args
}

fn probe_run_args(paths: &Paths, probe: &Probe) -> Vec<String> {
    let mut args = base_command(paths);
    args.extend([
        "probe".to_string(),
        "run".to_string(),
        format!("-n={}", probe.probe_name.to_uppercase()),
    ]);
    args
}

fn probe_jar_path(paths: &Paths, probe: &Probe) -> String {
    format!(
        "{}{}/target/{}.jar",
        paths.repo, probe.jar_path, probe.probe_name
    )
}
