use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::PathBuf;

use crate::state::{dayblock_home, default_store_path, ensure_dayblock_home};

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Config {
    #[serde(default)]
    pub storage: StorageSection,
    #[serde(default)]
    pub log: LogSection,
    #[serde(default)]
    pub calendar: CalendarSection,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct StorageSection {
    /// Data file; defaults to `<home>/store.json`.
    pub path: Option<PathBuf>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LogSection {
    /// `tracing` filter used when RUST_LOG is unset.
    pub level: String,
}

impl Default for LogSection {
    fn default() -> Self {
        Self {
            level: "warn".to_string(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CalendarSection {
    /// Prepended to every exported event summary.
    pub ics_prefix: String,
}

impl Default for CalendarSection {
    fn default() -> Self {
        Self {
            ics_prefix: "[dayblock] ".to_string(),
        }
    }
}

impl Config {
    pub fn store_path(&self) -> Result<PathBuf> {
        match &self.storage.path {
            Some(p) => Ok(p.clone()),
            None => default_store_path(),
        }
    }
}

pub fn config_path() -> Result<PathBuf> {
    Ok(dayblock_home()?.join("config.toml"))
}

pub fn load_config() -> Result<Config> {
    let p = config_path()?;
    if !p.exists() {
        return Ok(Config::default());
    }
    let s = fs::read_to_string(&p).with_context(|| format!("read {}", p.display()))?;
    toml::from_str(&s).with_context(|| format!("parse {}", p.display()))
}

pub fn save_config(cfg: &Config) -> Result<()> {
    ensure_dayblock_home()?;
    let p = config_path()?;
    let s = toml::to_string_pretty(cfg).context("serialize config")?;
    fs::write(&p, s).with_context(|| format!("write {}", p.display()))?;
    Ok(())
}

pub fn init_config() -> Result<()> {
    let p = config_path()?;
    if p.exists() {
        println!("Config already exists: {}", p.display());
        return Ok(());
    }
    save_config(&Config::default())?;
    println!("Wrote {}", p.display());
    Ok(())
}
