use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::Path;

use crate::services::export::PageGeometry;

pub const CONFIG_FILE: &str = "config.yml";

#[derive(Debug, Serialize, Deserialize, Clone, PartialEq)]
pub struct Config {
    #[serde(default = "default_data")]
    pub data_folder: String,

    #[serde(default = "default_output")]
    pub output_folder: String,

    #[serde(default = "default_storage_key")]
    pub storage_key: String,

    /// Skip the confirmation prompt before deleting a saved script.
    #[serde(default)]
    pub unattended: bool,

    #[serde(default)]
    pub export: PageGeometry,
}

fn default_data() -> String {
    "data".to_string()
}
fn default_output() -> String {
    "output".to_string()
}
fn default_storage_key() -> String {
    "movieScripts".to_string()
}

impl Default for Config {
    fn default() -> Self {
        Self {
            data_folder: default_data(),
            output_folder: default_output(),
            storage_key: default_storage_key(),
            unattended: false,
            export: PageGeometry::default(),
        }
    }
}

impl Config {
    pub fn load() -> Result<Self> {
        Self::load_from(Path::new(CONFIG_FILE))
    }

    pub fn load_from(path: &Path) -> Result<Self> {
        if !path.exists() {
            log::info!("{:?} not found, using default configuration", path);
            return Ok(Self::default());
        }

        let content =
            fs::read_to_string(path).with_context(|| format!("Failed to read {:?}", path))?;
        let config: Config = serde_yaml_ng::from_str(&content)
            .with_context(|| format!("Failed to parse {:?}", path))?;
        Ok(config)
    }

    pub fn save(&self) -> Result<()> {
        self.save_to(Path::new(CONFIG_FILE))
    }

    pub fn save_to(&self, path: &Path) -> Result<()> {
        let content = serde_yaml_ng::to_string(self)?;
        fs::write(path, content).with_context(|| format!("Failed to write {:?}", path))?;
        Ok(())
    }

    pub fn ensure_directories(&self) -> Result<()> {
        fs::create_dir_all(&self.data_folder)?;
        fs::create_dir_all(&self.output_folder)?;
        Ok(())
    }
}
