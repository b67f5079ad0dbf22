//! User settings that shape dumps and table browsing

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

/// How data rows are written into a dump
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum InsertStyle {
    /// One `INSERT` per batch with a `VALUES` tuple per row
    #[default]
    MultiRow,
    /// One `INSERT` per row
    SingleRow,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct DumpSettings {
    /// Offer views in the dump pick list
    pub show_view: bool,
    pub show_procedure: bool,
    pub show_function: bool,
    pub show_trigger: bool,
    /// Rows fetched when opening a table
    pub default_page_size: u64,
    /// Rows per data batch in a dump
    pub dump_batch_size: u64,
    pub insert_style: InsertStyle,
    /// Emit `DROP ... IF EXISTS` before each `CREATE`
    pub drop_before_create: bool,
}

impl Default for DumpSettings {
    fn default() -> Self {
        Self {
            show_view: true,
            show_procedure: true,
            show_function: true,
            show_trigger: true,
            default_page_size: 100,
            dump_batch_size: 200,
            insert_style: InsertStyle::MultiRow,
            drop_before_create: true,
        }
    }
}

impl DumpSettings {
    pub fn load() -> Result<Self> {
        Self::load_from(&Self::settings_path()?)
    }

    pub fn save(&self) -> Result<()> {
        self.save_to(&Self::settings_path()?)
    }

    pub fn load_from(path: &Path) -> Result<Self> {
        if !path.exists() {
            return Ok(Self::default());
        }
        let content = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read settings from {:?}", path))?;
        let settings: Self =
            serde_json::from_str(&content).with_context(|| "Failed to parse settings JSON")?;
        settings.validated()
    }

    pub fn save_to(&self, path: &Path) -> Result<()> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        let content = serde_json::to_string_pretty(self)?;
        std::fs::write(path, content)
            .with_context(|| format!("Failed to write settings to {:?}", path))?;
        Ok(())
    }

    pub fn settings_path() -> Result<PathBuf> {
        let config_dir = dirs::config_dir().context("Could not find config directory")?;
        Ok(config_dir.join("sqlport").join("settings.json"))
    }

    fn validated(self) -> Result<Self> {
        anyhow::ensure!(self.dump_batch_size > 0, "dump_batch_size must be greater than 0");
        anyhow::ensure!(
            self.default_page_size > 0,
            "default_page_size must be greater than 0"
        );
        Ok(self)
    }
}
