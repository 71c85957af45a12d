use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use crate::error::{PapermindError, Result};

/// Root application configuration, loaded from `~/.config/papermind/config.toml`
/// and then overridden by environment variables.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct AppConfig {
    pub library: LibraryConfig,
    pub zotero: ZoteroConfig,
    pub crossref: CrossrefConfig,
    pub download: DownloadConfig,
    pub llm: LlmConfig,
    pub qa: QaConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct LibraryConfig {
    /// PDFs linked to Zotero items; downloads land here too.
    pub papers_dir: String,
    /// Personal PDFs with no bibliography record.
    pub local_papers_dir: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ZoteroConfig {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub api_key: Option<String>,
    pub base_url: String,
    pub item_type: String,
    pub page_size: u32,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct CrossrefConfig {
    pub base_url: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub polite_email: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct DownloadConfig {
    pub enabled: bool,
    pub mirror: String,
    pub timeout_secs: u64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct LlmConfig {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub api_key: Option<String>,
    pub base_url: String,
    pub model: String,
    pub summary_model: String,
    pub temperature: f32,
    pub max_tokens: u32,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct QaConfig {
    pub chunk_chars: usize,
    pub chunk_overlap: usize,
    pub evidence_k: usize,
    pub max_sources: usize,
}

// ─── Defaults ──────────────────────────────────────────────

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            library: LibraryConfig::default(),
            zotero: ZoteroConfig::default(),
            crossref: CrossrefConfig::default(),
            download: DownloadConfig::default(),
            llm: LlmConfig::default(),
            qa: QaConfig::default(),
        }
    }
}

impl Default for LibraryConfig {
    fn default() -> Self {
        Self {
            papers_dir: "./zotero_papers".to_string(),
            local_papers_dir: "./mis_papers".to_string(),
        }
    }
}

impl Default for ZoteroConfig {
    fn default() -> Self {
        Self {
            api_key: None,
            base_url: "https://api.zotero.org".to_string(),
            item_type: "journalArticle".to_string(),
            page_size: 100,
        }
    }
}

impl Default for CrossrefConfig {
    fn default() -> Self {
        Self {
            base_url: "https://api.crossref.org".to_string(),
            polite_email: None,
        }
    }
}

impl Default for DownloadConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            mirror: "https://sci-hub.se".to_string(),
            timeout_secs: 10,
        }
    }
}

impl Default for LlmConfig {
    fn default() -> Self {
        Self {
            api_key: None,
            base_url: "https://api.openai.com/v1".to_string(),
            model: "gpt-4o-mini".to_string(),
            summary_model: "gpt-4o-mini".to_string(),
            temperature: 0.0,
            max_tokens: 1024,
        }
    }
}

impl Default for QaConfig {
    fn default() -> Self {
        Self {
            chunk_chars: 3000,
            chunk_overlap: 100,
            evidence_k: 10,
            max_sources: 5,
        }
    }
}

// ─── Load / Save ───────────────────────────────────────────

impl AppConfig {
    /// Standard config file path: `~/.config/papermind/config.toml`
    pub fn config_path() -> PathBuf {
        if let Ok(path) = std::env::var("PAPERMIND_CONFIG") {
            return PathBuf::from(path);
        }

        dirs::config_dir()
            .unwrap_or_else(|| PathBuf::from("~/.config"))
            .join("papermind")
            .join("config.toml")
    }

    /// Load config from disk and apply environment overrides.
    pub fn load() -> Result<Self> {
        let mut config = Self::load_from(&Self::config_path())?;
        config.apply_env(|key| std::env::var(key).ok());
        Ok(config)
    }

    /// Load config from a specific path, falling back to defaults if it doesn't exist.
    pub fn load_from(path: &Path) -> Result<Self> {
        if !path.exists() {
            return Ok(Self::default());
        }

        let contents = std::fs::read_to_string(path)?;
        let config: Self = toml::from_str(&contents)?;
        Ok(config)
    }

    /// Save config to a specific path.
    pub fn save_to(&self, path: &Path) -> Result<()> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        let toml_str = toml::to_string_pretty(self)?;
        std::fs::write(path, toml_str)?;
        Ok(())
    }

    /// Override values from environment variables. `lookup` is `std::env::var`
    /// in production and a map in tests.
    pub fn apply_env<F>(&mut self, lookup: F)
    where
        F: Fn(&str) -> Option<String>,
    {
        let non_empty = |key: &str| lookup(key).filter(|v| !v.trim().is_empty());

        if let Some(dir) = non_empty("PAPERS_DIR") {
            self.library.papers_dir = dir;
        }
        if let Some(dir) = non_empty("LOCAL_PAPERS_DIR") {
            self.library.local_papers_dir = dir;
        }
        if let Some(key) = non_empty("ZOTERO_API_KEY") {
            self.zotero.api_key = Some(key);
        }
        if let Some(key) = non_empty("OPENAI_API_KEY") {
            self.llm.api_key = Some(key);
        }
        if let Some(url) = non_empty("OPENAI_BASE_URL") {
            self.llm.base_url = url;
        }
        if let Some(email) = non_empty("CROSSREF_MAILTO") {
            self.crossref.polite_email = Some(email);
        }
    }

    /// Both API keys must be present before the application starts.
    pub fn validate(&self) -> Result<()> {
        if self.llm.api_key.as_deref().is_none_or(str::is_empty) {
            return Err(PapermindError::MissingCredential("OPENAI_API_KEY".to_string()));
        }
        if self.zotero.api_key.as_deref().is_none_or(str::is_empty) {
            return Err(PapermindError::MissingCredential("ZOTERO_API_KEY".to_string()));
        }
        if self.qa.chunk_overlap >= self.qa.chunk_chars {
            return Err(PapermindError::ConfigError(
                "qa.chunk_overlap must be smaller than qa.chunk_chars".to_string(),
            ));
        }
        Ok(())
    }

    /// Create both PDF directories if missing.
    pub fn ensure_directories(&self) -> Result<()> {
        std::fs::create_dir_all(self.papers_dir())?;
        std::fs::create_dir_all(self.local_papers_dir())?;
        Ok(())
    }

    // ─── Derived paths ─────────────────────────────────────

    pub fn papers_dir(&self) -> PathBuf {
        PathBuf::from(&self.library.papers_dir)
    }

    pub fn local_papers_dir(&self) -> PathBuf {
        PathBuf::from(&self.library.local_papers_dir)
    }

    /// Where the last synchronization's metadata snapshot is kept.
    pub fn metadata_store_path(&self) -> PathBuf {
        dirs::data_dir()
            .unwrap_or_else(|| PathBuf::from("~/.local/share"))
            .join("papermind")
            .join("metadata.json")
    }

    /// HTTP cache directory for metadata lookups.
    pub fn cache_dir(&self) -> PathBuf {
        dirs::cache_dir()
            .unwrap_or_else(|| PathBuf::from("/tmp"))
            .join("papermind")
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;
    use tempfile::TempDir;

    fn env(pairs: &[(&str, &str)]) -> HashMap<String, String> {
        pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect()
    }

    #[test]
    fn test_default_config() {
        let cfg = AppConfig::default();
        assert_eq!(cfg.library.papers_dir, "./zotero_papers");
        assert_eq!(cfg.library.local_papers_dir, "./mis_papers");
        assert_eq!(cfg.zotero.base_url, "https://api.zotero.org");
        assert_eq!(cfg.download.timeout_secs, 10);
        assert_eq!(cfg.llm.model, "gpt-4o-mini");
    }

    #[test]
    fn test_config_toml_roundtrip() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("config.toml");

        let mut cfg = AppConfig::default();
        cfg.library.papers_dir = "/data/zotero".to_string();
        cfg.qa.max_sources = 3;
        cfg.save_to(&path).unwrap();

        let loaded = AppConfig::load_from(&path).unwrap();
        assert_eq!(loaded.library.papers_dir, "/data/zotero");
        assert_eq!(loaded.qa.max_sources, 3);
        assert_eq!(loaded.llm.model, cfg.llm.model);
    }

    #[test]
    fn test_partial_toml_fills_defaults() {
        let cfg: AppConfig = toml::from_str("[library]\npapers_dir = \"/x\"\n").unwrap();
        assert_eq!(cfg.library.papers_dir, "/x");
        assert_eq!(cfg.library.local_papers_dir, "./mis_papers");
        assert_eq!(cfg.qa.chunk_chars, 3000);
    }

    #[test]
    fn test_load_nonexistent_returns_default() {
        let cfg = AppConfig::load_from(Path::new("/tmp/nonexistent_papermind_config.toml")).unwrap();
        assert_eq!(cfg.zotero.page_size, 100);
    }

    #[test]
    fn test_env_overrides() {
        let vars = env(&[
            ("PAPERS_DIR", "/papers"),
            ("LOCAL_PAPERS_DIR", "/mine"),
            ("ZOTERO_API_KEY", "zkey"),
            ("OPENAI_API_KEY", "okey"),
            ("CROSSREF_MAILTO", ""),
        ]);
        let mut cfg = AppConfig::default();
        cfg.apply_env(|k| vars.get(k).cloned());

        assert_eq!(cfg.library.papers_dir, "/papers");
        assert_eq!(cfg.library.local_papers_dir, "/mine");
        assert_eq!(cfg.zotero.api_key.as_deref(), Some("zkey"));
        assert_eq!(cfg.llm.api_key.as_deref(), Some("okey"));
        assert!(cfg.crossref.polite_email.is_none());
    }

    #[test]
    fn test_validate_requires_both_keys() {
        let mut cfg = AppConfig::default();
        let err = cfg.validate().unwrap_err();
        assert!(err.to_string().contains("OPENAI_API_KEY"));

        cfg.llm.api_key = Some("okey".to_string());
        let err = cfg.validate().unwrap_err();
        assert!(err.to_string().contains("ZOTERO_API_KEY"));

        cfg.zotero.api_key = Some("zkey".to_string());
        assert!(cfg.validate().is_ok());
    }

    #[test]
    fn test_ensure_directories_creates_both() {
        let dir = TempDir::new().unwrap();
        let mut cfg = AppConfig::default();
        cfg.library.papers_dir = dir.path().join("z").to_string_lossy().to_string();
        cfg.library.local_papers_dir = dir.path().join("l").to_string_lossy().to_string();

        cfg.ensure_directories().unwrap();
        assert!(cfg.papers_dir().is_dir());
        assert!(cfg.local_papers_dir().is_dir());
    }
}
