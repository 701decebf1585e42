use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use directories::ProjectDirs;
use serde::{Deserialize, Serialize};
use tracing::debug;

const CONFIG_FILE: &str = "config.toml";

/// Display settings for the dashboard. Every key is optional in the TOML file.
#[derive(Debug, Deserialize, Serialize, Clone, PartialEq)]
#[serde(default)]
pub struct DashboardConfig {
    /// How many names the recent followers/following lists show.
    pub recent_limit: usize,
    pub top_contacts_limit: usize,
    /// Media types broken out on the Media tab, in display order.
    pub media_types: Vec<MediaTypeLabel>,
}

#[derive(Debug, Deserialize, Serialize, Clone, PartialEq)]
pub struct MediaTypeLabel {
    pub media_type: String,
    pub label: String,
}

impl MediaTypeLabel {
    fn new(media_type: &str, label: &str) -> Self {
        Self { media_type: media_type.to_string(), label: label.to_string() }
    }
}

impl Default for DashboardConfig {
    fn default() -> Self {
        Self {
            recent_limit: 5,
            top_contacts_limit: 5,
            media_types: vec![
                MediaTypeLabel::new("photo", "Photos"),
                MediaTypeLabel::new("video", "Videos"),
            ],
        }
    }
}

impl DashboardConfig {
    pub fn from_toml_str(s: &str) -> Result<Self> {
        toml::from_str(s).context("invalid dashboard config")
    }

    pub fn load(path: &Path) -> Result<Self> {
        let text = std::fs::read_to_string(path)
            .with_context(|| format!("failed to read config: {}", path.display()))?;
        Self::from_toml_str(&text).with_context(|| format!("in {}", path.display()))
    }

    /// `config.toml` in the platform config directory.
    pub fn default_path() -> Option<PathBuf> {
        ProjectDirs::from("", "", "export-insights").map(|d| d.config_dir().join(CONFIG_FILE))
    }

    /// An explicit path must exist; the default location is optional.
    pub fn resolve(explicit: Option<&Path>) -> Result<Self> {
        if let Some(path) = explicit {
            return Self::load(path);
        }
        match Self::default_path() {
            Some(path) if path.exists() => {
                debug!(path = %path.display(), "using default config");
                Self::load(&path)
            }
            _ => Ok(Self::default()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn empty_file_gives_defaults() {
        assert_eq!(DashboardConfig::from_toml_str("").unwrap(), DashboardConfig::default());
    }

    #[test]
    fn partial_overrides() {
        let cfg = DashboardConfig::from_toml_str(
            r#"
            top_contacts_limit = 10

            [[media_types]]
            media_type = "reel"
            label = "Reels"
            "#,
        )
        .unwrap();
        assert_eq!(cfg.recent_limit, 5);
        assert_eq!(cfg.top_contacts_limit, 10);
        assert_eq!(cfg.media_types, vec![MediaTypeLabel::new("reel", "Reels")]);
    }

    #[test]
    fn bad_types_are_rejected() {
        assert!(DashboardConfig::from_toml_str("recent_limit = \"five\"").is_err());
    }

    #[test]
    fn explicit_path_must_exist() {
        let tmp = tempfile::tempdir().unwrap();
        let missing = tmp.path().join("missing.toml");
        assert!(DashboardConfig::resolve(Some(&missing)).is_err());

        let present = tmp.path().join("insights.toml");
        std::fs::write(&present, "recent_limit = 2\n").unwrap();
        assert_eq!(DashboardConfig::resolve(Some(&present)).unwrap().recent_limit, 2);
    }
}
