use std::{collections::HashMap, path::PathBuf};

use anyhow::Context;
use tracing::{info, warn};

const CONFIG_FILE: &str = "server.toml";

#[derive(Debug, Clone)]
pub struct Settings {
    pub server_bind: String,
    pub uploads_dir: String,
    pub station_name: String,
    pub printer_name: String,
    pub animal_species: String,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            server_bind: "127.0.0.1:3001".to_string(),
            uploads_dir: "./uploads".to_string(),
            station_name: "ESA_SH05 - Slaughter Recovery".to_string(),
            printer_name: "LBL 101".to_string(),
            animal_species: "Vitender".to_string(),
        }
    }
}

/// Loads settings from `server.toml` in the working directory, then applies
/// environment overrides. Missing file or keys fall back to defaults.
pub fn load_settings() -> Settings {
    let mut settings = Settings::default();

    match std::fs::read_to_string(CONFIG_FILE) {
        Ok(raw) => {
            if let Err(err) = apply_file_config(&mut settings, &raw) {
                warn!(%err, "ignoring malformed {CONFIG_FILE}");
            } else {
                info!("loaded settings from {CONFIG_FILE}");
            }
        }
        Err(_) => info!("no {CONFIG_FILE} found, using defaults"),
    }

    apply_env_overrides(&mut settings);
    settings
}

fn apply_file_config(settings: &mut Settings, raw: &str) -> anyhow::Result<()> {
    let table: HashMap<String, String> =
        toml::from_str(raw).context("config must be flat string keys")?;
    if let Some(v) = table.get("server_bind") {
        settings.server_bind = v.clone();
    }
    if let Some(v) = table.get("uploads_dir") {
        settings.uploads_dir = v.clone();
    }
    if let Some(v) = table.get("station_name") {
        settings.station_name = v.clone();
    }
    if let Some(v) = table.get("printer_name") {
        settings.printer_name = v.clone();
    }
    if let Some(v) = table.get("animal_species") {
        settings.animal_species = v.clone();
    }
    Ok(())
}

fn apply_env_overrides(settings: &mut Settings) {
    if let Ok(v) = std::env::var("SERVER_BIND") {
        settings.server_bind = v;
    }
    if let Ok(v) = std::env::var("UPLOADS_DIR") {
        settings.uploads_dir = v;
    }
    if let Ok(v) = std::env::var("STATION_NAME") {
        settings.station_name = v;
    }
    if let Ok(v) = std::env::var("PRINTER_NAME") {
        settings.printer_name = v;
    }
    if let Ok(v) = std::env::var("ANIMAL_SPECIES") {
        settings.animal_species = v;
    }
}

/// Ensures the photo uploads directory exists and returns its path.
pub fn prepare_uploads_dir(dir: &str) -> anyhow::Result<PathBuf> {
    let path = PathBuf::from(dir);
    std::fs::create_dir_all(&path)
        .with_context(|| format!("creating uploads directory {}", path.display()))?;
    Ok(path)
}
