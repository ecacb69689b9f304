use anyhow::{Context, Result};
use std::fs;
use std::path::PathBuf;

pub fn giftcast_home() -> Result<PathBuf> {
    let home = std::env::var("HOME").context("HOME is not set")?;
    Ok(PathBuf::from(home).join(".giftcast"))
}

pub fn ensure_giftcast_home() -> Result<PathBuf> {
    let dir = giftcast_home()?;
    fs::create_dir_all(&dir).with_context(|| format!("create {}", dir.display()))?;
    Ok(dir)
}

pub fn default_config_path() -> Result<PathBuf> {
    Ok(giftcast_home()?.join("config.toml"))
}
