//! Application Configuration
//!
//! Service endpoints and scan settings stored in TOML format.

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

/// Application settings
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct AppConfig {
    /// External service endpoints
    pub services: ServicesConfig,
    /// Scan behavior
    pub scan: ScanSettings,
    /// Catalog lookup cache
    pub cache: CacheSettings,
}

/// Endpoints of the external collaborators. Every endpoint is optional;
/// features backed by an unconfigured service are simply unavailable.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServicesConfig {
    /// OCR service URL (required for `scan`)
    pub ocr_url: Option<String>,
    /// Vision-annotation service URL (enables the label/color strategy)
    pub annotate_url: Option<String>,
    /// Catalog backend base URL (enables `lookup`, enrichment and the
    /// authoritative rule engine cross-check)
    pub backend_url: Option<String>,
    /// Per-request timeout in seconds
    pub timeout_secs: u64,
    /// Language hint passed to the OCR service
    pub ocr_language: String,
}

impl Default for ServicesConfig {
    fn default() -> Self {
        Self {
            ocr_url: None,
            annotate_url: None,
            backend_url: None,
            timeout_secs: 30,
            ocr_language: "en-IN".to_string(),
        }
    }
}

/// Scan-related settings
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ScanSettings {
    /// Look scanned products up in the catalog when a barcode is given
    pub auto_enrich: bool,
    /// Submit fields to the remote rule engine when the backend is configured
    pub remote_validation: bool,
}

impl Default for ScanSettings {
    fn default() -> Self {
        Self {
            auto_enrich: true,
            remote_validation: false,
        }
    }
}

/// Catalog cache settings
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CacheSettings {
    /// Seconds a catalog record stays fresh
    pub lookup_ttl_secs: u64,
    /// Maximum number of cached products
    pub max_entries: usize,
}

impl Default for CacheSettings {
    fn default() -> Self {
        Self {
            lookup_ttl_secs: 900,
            max_entries: 256,
        }
    }
}

/// Resolve the platform configuration directory for this application.
pub fn config_dir() -> Result<PathBuf> {
    let dirs = directories::ProjectDirs::from("com", "labelguard", "labelguard")
        .context("could not determine a configuration directory")?;
    Ok(dirs.config_dir().to_path_buf())
}

/// Load configuration from file
pub fn load_config(path: &Path) -> Result<AppConfig> {
    let content = std::fs::read_to_string(path)
        .with_context(|| format!("failed to read config {}", path.display()))?;
    let config: AppConfig = toml::from_str(&content)
        .with_context(|| format!("failed to parse config {}", path.display()))?;
    Ok(config)
}

/// Save configuration to file
pub fn save_config(config: &AppConfig, path: &Path) -> Result<()> {
    let content = toml::to_string_pretty(config)?;
    std::fs::write(path, content)
        .with_context(|| format!("failed to write config {}", path.display()))?;
    Ok(())
}
