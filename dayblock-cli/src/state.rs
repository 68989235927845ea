use anyhow::{Context, Result};
use std::fs;
use std::path::PathBuf;

/// `$DAYBLOCK_HOME`, else `~/.dayblock`.
pub fn dayblock_home() -> Result<PathBuf> {
    if let Some(dir) = std::env::var_os("DAYBLOCK_HOME").filter(|d| !d.is_empty()) {
        return Ok(PathBuf::from(dir));
    }
    let home = std::env::var("HOME").context("HOME is not set")?;
    Ok(PathBuf::from(home).join(".dayblock"))
}

pub fn ensure_dayblock_home() -> Result<PathBuf> {
    let dir = dayblock_home()?;
    fs::create_dir_all(&dir).with_context(|| format!("create {}", dir.display()))?;
    Ok(dir)
}

pub fn default_store_path() -> Result<PathBuf> {
    Ok(dayblock_home()?.join("store.json"))
}
