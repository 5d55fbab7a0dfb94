use anyhow::{Context, Result};
use std::fs;
use std::path::Path;

use crate::models::DashboardData;

pub const DEFAULT_DATA_FILE: &str = "data/publications.json";
pub const DEFAULT_HTML_FILE: &str = "index.html";

/// Load the publication dataset written by `fetch-publications`
pub fn load_dataset(filepath: &Path) -> Result<DashboardData> {
    if !filepath.exists() {
        anyhow::bail!("Publication data file not found: {}", filepath.display());
    }

    let content = fs::read_to_string(filepath)
        .with_context(|| format!("Failed to read data file: {}", filepath.display()))?;

    serde_json::from_str(&content).with_context(|| {
        format!(
            "Failed to parse publication JSON from {}. Re-run fetch-publications to regenerate it.",
            filepath.display()
        )
    })
}

/// Like [`load_dataset`], but a missing file is `None` rather than an error
pub fn load_existing_dataset(filepath: &Path) -> Result<Option<DashboardData>> {
    if filepath.exists() {
        load_dataset(filepath).map(Some)
    } else {
        Ok(None)
    }
}

fn ensure_parent_dir(filepath: &Path) -> Result<()> {
    if let Some(parent) = filepath.parent().filter(|p| !p.as_os_str().is_empty()) {
        fs::create_dir_all(parent)
            .with_context(|| format!("Failed to create directory {}", parent.display()))?;
    }
    Ok(())
}

/// Save the dataset as compact JSON, creating parent directories as needed.
/// Returns false when the file already held this exact dataset.
pub fn save_dataset(data: &DashboardData, filepath: &Path) -> Result<bool> {
    let json = serde_json::to_string(data).context("Failed to serialize publication data")?;
    write_if_changed(filepath, &json)
}

/// Write `content` unless the file already holds exactly that. Returns whether it wrote.
pub fn write_if_changed(filepath: &Path, content: &str) -> Result<bool> {
    if let Ok(existing) = fs::read_to_string(filepath) {
        if existing == content {
            return Ok(false);
        }
    }

    ensure_parent_dir(filepath)?;
    fs::write(filepath, content)
        .with_context(|| format!("Failed to write {}", filepath.display()))?;
    Ok(true)
}
