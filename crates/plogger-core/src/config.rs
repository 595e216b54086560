use std::path::Path;

use serde::{Deserialize, Serialize};
use tracing::{info, warn};

use crate::error::{PloggerError, Result};

/// Top-level configuration for the plogger service.
///
/// Loaded from `~/.plogger/config.toml` by default, then overlaid with
/// environment variables (see [`PloggerConfig::apply_env_overrides`]).
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct PloggerConfig {
    #[serde(default)]
    pub general: GeneralConfig,
    #[serde(default)]
    pub server: ServerConfig,
    #[serde(default)]
    pub laas: LaasConfig,
    #[serde(default)]
    pub hashes: HashConfig,
    #[serde(default)]
    pub tour: TourConfig,
    #[serde(default)]
    pub tmap: TmapConfig,
    #[serde(default)]
    pub session: SessionConfig,
    #[serde(default)]
    pub persistence: PersistenceConfig,
}

impl PloggerConfig {
    /// Load configuration from a TOML file.
    ///
    /// Returns an error if the file cannot be read or parsed.
    pub fn load(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)?;
        let config: PloggerConfig = toml::from_str(&content)?;
        info!("Configuration loaded from {}", path.display());
        Ok(config)
    }

    /// Load configuration from a TOML file, falling back to defaults if the
    /// file does not exist or cannot be parsed.
    pub fn load_or_default(path: &Path) -> Self {
        match Self::load(path) {
            Ok(config) => config,
            Err(e) => {
                warn!(
                    "Failed to load config from {}: {}. Using defaults.",
                    path.display(),
                    e
                );
                Self::default()
            }
        }
    }

    /// Save the current configuration to a TOML file.
    pub fn save(&self, path: &Path) -> Result<()> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        let content =
            toml::to_string_pretty(self).map_err(|e| PloggerError::Config(e.to_string()))?;
        std::fs::write(path, content)?;
        info!("Configuration saved to {}", path.display());
        Ok(())
    }

    /// Overlay values from the process environment.
    pub fn apply_env_overrides(&mut self) {
        self.apply_env_with(|key| std::env::var(key).ok());
    }

    /// Overlay values from an arbitrary key lookup. Empty values are ignored.
    pub fn apply_env_with<F>(&mut self, lookup: F)
    where
        F: Fn(&str) -> Option<String>,
    {
        let get = |key: &str| lookup(key).filter(|v| !v.trim().is_empty());

        let string_overrides: [(&str, &mut String); 10] = [
            ("LAAS_URL", &mut self.laas.chat_url),
            ("LAAS_API_KEY", &mut self.laas.api_key),
            ("PROJECT_CODE", &mut self.laas.project_code),
            ("HASH_LOCATION", &mut self.hashes.location),
            ("HASH_PLACE", &mut self.hashes.place),
            ("HASH_ROUTE", &mut self.hashes.route),
            ("HASH_IMAGE", &mut self.hashes.image),
            ("HASH_TRASHBAG", &mut self.hashes.trashbag),
            ("HASH_RAG", &mut self.hashes.rag),
            ("TMAP_API_KEY", &mut self.tmap.app_key),
        ];
        for (key, slot) in string_overrides {
            if let Some(value) = get(key) {
                *slot = value;
            }
        }

        // The legacy deployment spells this one with a capital T only.
        if let Some(value) = get("TOUR_API_KEY").or_else(|| get("Tour_API_KEY")) {
            self.tour.service_key = value;
        }

        if let Some(raw) = get("PLOGGER_PORT") {
            match raw.parse::<u16>() {
                Ok(port) => self.server.port = port,
                Err(_) => warn!(value = %raw, "Ignoring unparsable PLOGGER_PORT"),
            }
        }
    }

    /// Names of credentials and prompt hashes that are still unset.
    pub fn missing_settings(&self) -> Vec<&'static str> {
        let checks: [(&'static str, &str); 11] = [
            ("HASH_LOCATION", &self.hashes.location),
            ("HASH_PLACE", &self.hashes.place),
            ("HASH_ROUTE", &self.hashes.route),
            ("HASH_IMAGE", &self.hashes.image),
            ("HASH_TRASHBAG", &self.hashes.trashbag),
            ("HASH_RAG", &self.hashes.rag),
            ("LAAS_API_KEY", &self.laas.api_key),
            ("PROJECT_CODE", &self.laas.project_code),
            ("LAAS_URL", &self.laas.chat_url),
            ("TMAP_API_KEY", &self.tmap.app_key),
            ("TOUR_API_KEY", &self.tour.service_key),
        ];
        checks
            .iter()
            .filter(|(_, value)| value.trim().is_empty())
            .map(|(name, _)| *name)
            .collect()
    }
}

/// General application settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct GeneralConfig {
    /// Log level: trace, debug, info, warn, error.
    pub log_level: String,
}

impl Default for GeneralConfig {
    fn default() -> Self {
        Self {
            log_level: "info".to_string(),
        }
    }
}

/// HTTP listener settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ServerConfig {
    pub host: String,
    pub port: u16,
    /// Maximum accepted request body in bytes (base64 images are large).
    pub body_limit_bytes: usize,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: "0.0.0.0".to_string(),
            port: 8000,
            body_limit_bytes: 10 * 1024 * 1024,
        }
    }
}

/// LLM gateway endpoint and credentials.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct LaasConfig {
    /// Full URL of the chat-completion endpoint.
    pub chat_url: String,
    pub project_code: String,
    pub api_key: String,
    /// Base URL for the document similarity API.
    pub documents_base_url: String,
}

impl Default for LaasConfig {
    fn default() -> Self {
        Self {
            chat_url: String::new(),
            project_code: String::new(),
            api_key: String::new(),
            documents_base_url: "https://api-laas.wanted.co.kr".to_string(),
        }
    }
}

/// Prompt-template identifiers, one per flow. Opaque to this service.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct HashConfig {
    pub location: String,
    pub place: String,
    pub route: String,
    pub image: String,
    pub trashbag: String,
    pub rag: String,
}

/// Public tourism data API.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct TourConfig {
    pub base_url: String,
    pub service_key: String,
    /// Candidate lists larger than this are randomly sampled down to it.
    pub sample_size: usize,
    /// Content type ids kept from the attraction list.
    pub content_types: Vec<String>,
}

impl Default for TourConfig {
    fn default() -> Self {
        Self {
            base_url: "http://apis.data.go.kr/B551011/KorService2".to_string(),
            service_key: String::new(),
            sample_size: 50,
            content_types: vec!["12".to_string(), "14".to_string(), "28".to_string()],
        }
    }
}

/// Pedestrian routing API.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct TmapConfig {
    pub base_url: String,
    pub app_key: String,
}

impl Default for TmapConfig {
    fn default() -> Self {
        Self {
            base_url: "https://apis.openapi.sk.com".to_string(),
            app_key: String::new(),
        }
    }
}

/// Conversation session registry settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct SessionConfig {
    /// Idle minutes before a non-default session is evicted. 0 disables eviction.
    pub timeout_minutes: u32,
    /// Live sessions kept before the least recently used one is evicted. 0 disables the cap.
    pub max_sessions: usize,
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self {
            timeout_minutes: 120,
            max_sessions: 1000,
        }
    }
}

/// Optional flat-file history for the default session.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct PersistenceConfig {
    pub history_file: Option<String>,
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;
    use std::io::Write;
    use tempfile::NamedTempFile;

    fn create_temp_config(content: &str) -> NamedTempFile {
        let mut file = NamedTempFile::new().unwrap();
        file.write_all(content.as_bytes()).unwrap();
        file
    }

    fn lookup_from(pairs: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let map: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        move |key| map.get(key).cloned()
    }

    #[test]
    fn test_default_config() {
        let config = PloggerConfig::default();
        assert_eq!(config.general.log_level, "info");
        assert_eq!(config.server.host, "0.0.0.0");
        assert_eq!(config.server.port, 8000);
        assert_eq!(config.tour.sample_size, 50);
        assert_eq!(config.tour.content_types, vec!["12", "14", "28"]);
        assert_eq!(config.tmap.base_url, "https://apis.openapi.sk.com");
        assert_eq!(config.session.timeout_minutes, 120);
        assert_eq!(config.session.max_sessions, 1000);
        assert!(config.persistence.history_file.is_none());
    }

    #[test]
    fn test_load_partial_config_uses_defaults() {
        let file = create_temp_config(
            r#"
[server]
port = 9100

[hashes]
location = "loc-hash"
"#,
        );
        let config = PloggerConfig::load(file.path()).unwrap();
        assert_eq!(config.server.port, 9100);
        assert_eq!(config.server.host, "0.0.0.0");
        assert_eq!(config.hashes.location, "loc-hash");
        assert!(config.hashes.place.is_empty());
        assert_eq!(config.tour.sample_size, 50);
    }

    #[test]
    fn test_load_invalid_toml() {
        let file = create_temp_config("[server\nport = ");
        assert!(matches!(
            PloggerConfig::load(file.path()),
            Err(PloggerError::Config(_))
        ));
    }

    #[test]
    fn test_load_or_default_missing_file() {
        let config = PloggerConfig::load_or_default(Path::new("/does/not/exist/config.toml"));
        assert_eq!(config.server.port, 8000);
    }

    #[test]
    fn test_save_and_reload() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("nested").join("config.toml");
        let mut config = PloggerConfig::default();
        config.hashes.rag = "rag-hash".to_string();
        config.persistence.history_file = Some("history.json".to_string());
        config.save(&path).unwrap();

        let reloaded = PloggerConfig::load(&path).unwrap();
        assert_eq!(reloaded.hashes.rag, "rag-hash");
        assert_eq!(
            reloaded.persistence.history_file.as_deref(),
            Some("history.json")
        );
    }

    // ---- Environment overrides ----

    #[test]
    fn test_env_overrides_apply() {
        let mut config = PloggerConfig::default();
        config.apply_env_with(lookup_from(&[
            ("LAAS_URL", "https://laas.example/chat"),
            ("LAAS_API_KEY", "key"),
            ("PROJECT_CODE", "proj"),
            ("HASH_PLACE", "place-hash"),
            ("TMAP_API_KEY", "tmap"),
            ("TOUR_API_KEY", "tour"),
            ("PLOGGER_PORT", "9000"),
        ]));
        assert_eq!(config.laas.chat_url, "https://laas.example/chat");
        assert_eq!(config.laas.api_key, "key");
        assert_eq!(config.laas.project_code, "proj");
        assert_eq!(config.hashes.place, "place-hash");
        assert_eq!(config.tmap.app_key, "tmap");
        assert_eq!(config.tour.service_key, "tour");
        assert_eq!(config.server.port, 9000);
    }

    #[test]
    fn test_env_legacy_tour_key_spelling() {
        let mut config = PloggerConfig::default();
        config.apply_env_with(lookup_from(&[("Tour_API_KEY", "legacy")]));
        assert_eq!(config.tour.service_key, "legacy");
    }

    #[test]
    fn test_env_empty_values_ignored() {
        let mut config = PloggerConfig::default();
        config.hashes.route = "from-file".to_string();
        config.apply_env_with(lookup_from(&[("HASH_ROUTE", "  ")]));
        assert_eq!(config.hashes.route, "from-file");
    }

    #[test]
    fn test_env_bad_port_ignored() {
        let mut config = PloggerConfig::default();
        config.apply_env_with(lookup_from(&[("PLOGGER_PORT", "eighty")]));
        assert_eq!(config.server.port, 8000);
    }

    #[test]
    fn test_missing_settings() {
        let config = PloggerConfig::default();
        let missing = config.missing_settings();
        assert_eq!(missing.len(), 11);
        assert!(missing.contains(&"HASH_RAG"));

        let mut config = PloggerConfig::default();
        config.apply_env_with(lookup_from(&[("HASH_RAG", "r"), ("LAAS_URL", "u")]));
        let missing = config.missing_settings();
        assert_eq!(missing.len(), 9);
        assert!(!missing.contains(&"HASH_RAG"));
        assert!(!missing.contains(&"LAAS_URL"));
    }
}
