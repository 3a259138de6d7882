use anyhow::{Context, Result};
use serde::Deserialize;
use std::{fs, path::Path};

/// Filesystem locations the provisioning run works with.
///
/// `repo`, `propertiesFilePath`, `configsPath` and `dataPath` are concatenated
/// as plain strings when building `DBTool` arguments, so trailing separators
/// in the config file are significant.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct Paths {
    pub repo: String,
    #[serde(rename = "DBToolPath")]
    pub dbtool_path: String,
    pub properties_file_path: String,
    pub logs_path: String,
    pub configs_path: String,
    pub data_path: String,
}

/// A single config bundle import, gated by its own run flag.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct ImportConfig {
    pub run: bool,
    pub path: String,
}

/// One data payload to import into the project.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct ImportData {
    pub run: bool,
    pub probe_name: String,
    #[serde(rename = "probeXML")]
    pub probe_xml: String,
}

/// A monitoring probe to create and then start.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct Probe {
    pub run: bool,
    pub probe_name: String,
    pub jar_path: String,
}

/// Pipeline step flags, in the order the steps run.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct Actions {
    #[serde(rename = "createDB")]
    pub create_db: bool,
    pub initialize: bool,
    pub import_core_config: bool,
    pub import_project_types: ImportConfig,
    pub create_project: bool,
    pub import_configs: Vec<ImportConfig>,
    pub import_data: Vec<ImportData>,
    pub probes: Vec<Probe>,
}

/// Full configuration, read once at startup and passed by reference from then
/// on. Every section defaults to disabled/empty so a partial file is valid.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct Config {
    pub print_execution: bool,
    pub paths: Paths,
    pub actions: Actions,
}

impl Config {
    /// Load and parse the JSON configuration file
    ///
    /// # Errors
    ///
    /// Returns an error if the file cannot be read or is not valid JSON
    pub fn load(path: &Path) -> Result<Self> {
        let raw = fs::read_to_string(path)
            .with_context(|| format!("failed to read config file {}", path.display()))?;
        let config: Self = serde_json::from_str(&raw)
            .with_context(|| format!("failed to parse config file {}", path.display()))?;
        Ok(config)
    }
}
