use std::path::PathBuf;

use directories::ProjectDirs;

pub fn project_dirs() -> anyhow::Result<ProjectDirs> {
    ProjectDirs::from("io", "github", "prig")
        .ok_or_else(|| anyhow::anyhow!("unable to determine platform config directories"))
}

/// Directory holding user-editable configuration (`server.json`).
pub fn config_dir() -> anyhow::Result<PathBuf> {
    Ok(project_dirs()?.config_dir().to_path_buf())
}

pub fn default_settings_path() -> anyhow::Result<PathBuf> {
    Ok(config_dir()?.join("server.json"))
}
