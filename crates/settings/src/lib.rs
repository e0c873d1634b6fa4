//! Server-level settings: listen address, active profile and encoder quality.

pub mod paths;

use std::fs;
use std::io::Write;
use std::path::Path;

use params::ProfileName;
use serde::{Deserialize, Serialize};
use tracing::{debug, info};

const SETTINGS_SCHEMA_VERSION: u32 = 1;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ServerSettings {
    #[serde(default)]
    pub version: u32,
    #[serde(default = "default_bind_address")]
    pub bind_address: String,
    #[serde(default = "default_port")]
    pub port: u16,
    #[serde(default)]
    pub profile: ProfileName,
    #[serde(default)]
    pub quality: QualitySettings,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct QualitySettings {
    #[serde(default = "default_jpeg_quality")]
    pub jpeg: u8,
    #[serde(default = "default_png_compression")]
    pub png: u8,
    #[serde(default = "default_webp_quality")]
    pub webp: u8,
}

fn default_bind_address() -> String {
    "0.0.0.0".to_string()
}

fn default_port() -> u16 {
    8080
}

fn default_jpeg_quality() -> u8 {
    50
}

fn default_png_compression() -> u8 {
    7
}

fn default_webp_quality() -> u8 {
    50
}

impl Default for QualitySettings {
    fn default() -> Self {
        Self {
            jpeg: default_jpeg_quality(),
            png: default_png_compression(),
            webp: default_webp_quality(),
        }
    }
}

impl Default for ServerSettings {
    fn default() -> Self {
        Self {
            version: SETTINGS_SCHEMA_VERSION,
            bind_address: default_bind_address(),
            port: default_port(),
            profile: ProfileName::default(),
            quality: QualitySettings::default(),
        }
    }
}

impl ServerSettings {
    pub fn validate(&self) -> anyhow::Result<()> {
        if self.bind_address.trim().is_empty() {
            anyhow::bail!("bind_address is empty");
        }
        if !(1..=100).contains(&self.quality.jpeg) {
            anyhow::bail!("jpeg quality must be within 1..=100 (got {})", self.quality.jpeg);
        }
        if self.quality.png > 9 {
            anyhow::bail!("png compression must be within 0..=9 (got {})", self.quality.png);
        }
        if !(1..=100).contains(&self.quality.webp) {
            anyhow::bail!("webp quality must be within 1..=100 (got {})", self.quality.webp);
        }
        Ok(())
    }
}

pub fn load_settings(path: &Path) -> anyhow::Result<ServerSettings> {
    let raw = fs::read_to_string(path)
        .map_err(|e| anyhow::anyhow!("failed to read settings {}: {e}", path.display()))?;
    let mut s: ServerSettings = serde_json::from_str(&raw)?;

    if s.version == 0 {
        // Hand-written files usually omit the version.
        s.version = SETTINGS_SCHEMA_VERSION;
    }

    if s.version != SETTINGS_SCHEMA_VERSION {
        anyhow::bail!("unsupported settings version: {}", s.version);
    }

    s.validate()?;
    Ok(s)
}

/// Resolve settings from an explicit path, else the platform config file, else
/// built-in defaults.
///
/// An explicit path must exist; the platform file is optional.
pub fn load_or_default(explicit: Option<&Path>) -> anyhow::Result<ServerSettings> {
    if let Some(path) = explicit {
        info!(path = %path.display(), "loading settings");
        return load_settings(path);
    }

    match paths::default_settings_path() {
        Ok(path) if path.is_file() => {
            info!(path = %path.display(), "loading settings");
            load_settings(&path)
        }
        Ok(path) => {
            debug!(path = %path.display(), "no settings file, using defaults");
            Ok(ServerSettings::default())
        }
        Err(e) => {
            debug!(error = %e, "no config directory, using defaults");
            Ok(ServerSettings::default())
        }
    }
}

/// Write `settings` as pretty JSON to `path`.
///
/// The file is staged next to its destination and persisted in one step, so a
/// reader never sees a partial file. Without `overwrite`, an existing file is left
/// untouched and an error is returned.
pub fn write_settings(settings: &ServerSettings, path: &Path, overwrite: bool) -> anyhow::Result<()> {
    settings.validate()?;

    let dir = path
        .parent()
        .filter(|p| !p.as_os_str().is_empty())
        .unwrap_or_else(|| Path::new("."));
    fs::create_dir_all(dir)?;

    let mut staged = tempfile::NamedTempFile::new_in(dir)?;
    serde_json::to_writer_pretty(&mut staged, settings)?;
    writeln!(staged)?;
    staged.as_file().sync_all()?;

    if overwrite {
        staged.persist(path)?;
    } else {
        staged.persist_noclobber(path).map_err(|e| {
            anyhow::anyhow!("not overwriting {} ({})", path.display(), e.error)
        })?;
    }

    info!(path = %path.display(), "wrote settings");
    Ok(())
}
