use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

use crate::ai::GeminiSettings;
use crate::error::{AppError, Result};

pub const API_KEY_ENV: &str = "GEMINI_API_KEY";

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    #[serde(default = "default_db_path")]
    pub db_path: String,

    #[serde(default = "default_listen_addr")]
    pub listen_addr: String,

    pub gemini_api_key: Option<String>,

    #[serde(default = "default_api_url")]
    pub gemini_api_url: String,

    #[serde(default = "default_text_model")]
    pub text_model: String,

    #[serde(default = "default_image_model")]
    pub image_model: String,

    #[serde(default = "default_recent_limit")]
    pub recent_limit: usize,

    #[serde(default = "default_generate_images")]
    pub generate_images: bool,
}

fn default_db_path() -> String {
    let data_dir = dirs::data_dir()
        .unwrap_or_else(|| PathBuf::from("."))
        .join("derpedia");
    std::fs::create_dir_all(&data_dir).ok();
    data_dir.join("derpedia.db").to_string_lossy().to_string()
}

fn default_listen_addr() -> String {
    "127.0.0.1:5000".to_string()
}

fn default_api_url() -> String {
    crate::ai::DEFAULT_API_URL.to_string()
}

fn default_text_model() -> String {
    crate::ai::DEFAULT_TEXT_MODEL.to_string()
}

fn default_image_model() -> String {
    crate::ai::DEFAULT_IMAGE_MODEL.to_string()
}

fn default_recent_limit() -> usize {
    5
}

fn default_generate_images() -> bool {
    true
}

impl Default for Config {
    fn default() -> Self {
        Self {
            db_path: default_db_path(),
            listen_addr: default_listen_addr(),
            gemini_api_key: None,
            gemini_api_url: default_api_url(),
            text_model: default_text_model(),
            image_model: default_image_model(),
            recent_limit: default_recent_limit(),
            generate_images: default_generate_images(),
        }
    }
}

impl Config {
    /// Loads the config file at `path` (or the default location), creating it
    /// with defaults when missing. `GEMINI_API_KEY` overrides the file.
    pub fn load(path: Option<&Path>) -> Result<Self> {
        let config_path = path.map(Path::to_path_buf).unwrap_or_else(Self::config_path);

        let mut config = if config_path.exists() {
            let content = std::fs::read_to_string(&config_path)?;
            Self::from_toml(&content)?
        } else {
            let config = Config::default();
            config.save(&config_path)?;
            config
        };

        if let Ok(key) = std::env::var(API_KEY_ENV) {
            config.gemini_api_key = Some(key);
        }
        config.gemini_api_key = config
            .gemini_api_key
            .filter(|key| !key.trim().is_empty());

        Ok(config)
    }

    pub fn from_toml(content: &str) -> Result<Self> {
        let config: Config = toml::from_str(content)?;
        if config.recent_limit == 0 {
            return Err(AppError::Config(
                "recent_limit must be a positive integer".to_string(),
            ));
        }
        Ok(config)
    }

    pub fn save(&self, config_path: &Path) -> Result<()> {
        if let Some(parent) = config_path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        let content =
            toml::to_string_pretty(self).map_err(|e| AppError::Config(e.to_string()))?;
        std::fs::write(config_path, content)?;
        Ok(())
    }

    pub fn config_path() -> PathBuf {
        dirs::config_dir()
            .unwrap_or_else(|| PathBuf::from("."))
            .join("derpedia")
            .join("config.toml")
    }

    /// Generator settings, or `None` when no API key is configured.
    pub fn gemini_settings(&self) -> Option<GeminiSettings> {
        let api_key = self.gemini_api_key.clone()?;
        Some(GeminiSettings {
            api_key,
            api_url: self.gemini_api_url.clone(),
            text_model: self.text_model.clone(),
            image_model: self.image_model.clone(),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn missing_fields_fall_back_to_defaults() {
        let config = Config::from_toml("db_path = \"/tmp/derpedia-test.db\"\n").unwrap();
        assert_eq!(config.db_path, "/tmp/derpedia-test.db");
        assert_eq!(config.listen_addr, "127.0.0.1:5000");
        assert_eq!(config.recent_limit, 5);
        assert!(config.generate_images);
        assert!(config.gemini_settings().is_none());
    }

    #[test]
    fn zero_recent_limit_is_rejected() {
        let err = Config::from_toml("recent_limit = 0\n").unwrap_err();
        assert!(matches!(err, AppError::Config(_)));
    }

    #[test]
    fn api_key_enables_gemini_settings() {
        let config = Config::from_toml(
            "gemini_api_key = \"secret\"\ntext_model = \"gemini-test\"\n",
        )
        .unwrap();
        let settings = config.gemini_settings().unwrap();
        assert_eq!(settings.api_key, "secret");
        assert_eq!(settings.text_model, "gemini-test");
    }

    #[test]
    fn save_then_load_round_trips_through_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("nested").join("config.toml");
        let mut config = Config::default();
        config.listen_addr = "0.0.0.0:8080".to_string();
        config.save(&path).unwrap();

        let content = std::fs::read_to_string(&path).unwrap();
        let loaded = Config::from_toml(&content).unwrap();
        assert_eq!(loaded.listen_addr, "0.0.0.0:8080");
    }
}
