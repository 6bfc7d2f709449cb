use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

pub const DEFAULT_CONFIG_PATH: &str = "config/service.yaml";

#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Failed to read config {path}: {source}")]
    Io {
        path: PathBuf,
        source: std::io::Error,
    },
    #[error("Invalid YAML in config: {0}")]
    Yaml(#[from] serde_yaml::Error),
    #[error("Invalid configuration: {0}")]
    Invalid(String),
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct AppConfig {
    pub server: ServerConfig,
    pub models: ModelConfig,
    pub caption: CaptionConfig,
    pub analysis: AnalysisConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ServerConfig {
    pub host: String,
    pub port: u16,
    /// Cap on JSON bodies and on each multipart upload.
    pub max_body_mb: usize,
}

impl ServerConfig {
    pub fn body_limit(&self) -> usize {
        self.max_body_mb * 1024 * 1024
    }
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: "0.0.0.0".into(),
            port: 5001,
            max_body_mb: 32,
        }
    }
}

/// Locations of the trained artifacts, relative to `dir` unless absolute.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ModelConfig {
    pub dir: PathBuf,
    /// Directory holding `model.pt` and `label_map.json`.
    pub transformer: PathBuf,
    pub cnn: PathBuf,
    pub class_indices: PathBuf,
}

impl Default for ModelConfig {
    fn default() -> Self {
        Self {
            dir: PathBuf::from("model"),
            transformer: PathBuf::from("huggingface_pcos"),
            cnn: PathBuf::from("pcos_cnn_model.pt"),
            class_indices: PathBuf::from("class_indices.json"),
        }
    }
}

impl ModelConfig {
    pub fn resolve(&self, path: &Path) -> PathBuf {
        if path.is_absolute() {
            path.to_path_buf()
        } else {
            self.dir.join(path)
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct CaptionConfig {
    pub endpoint: String,
    pub model: String,
    pub timeout_secs: u64,
    /// Name of the environment variable holding the bearer token.
    pub api_key_env: String,
}

impl Default for CaptionConfig {
    fn default() -> Self {
        Self {
            endpoint: "https://api-inference.huggingface.co/models".into(),
            model: "Salesforce/blip-image-captioning-large".into(),
            timeout_secs: 30,
            api_key_env: "HUGGINGFACE_API_KEY".into(),
        }
    }
}

impl CaptionConfig {
    pub fn api_key(&self) -> Option<String> {
        std::env::var(&self.api_key_env).ok()
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct AnalysisConfig {
    /// Follicle count at or above which the CV counter reports PCOS.
    pub follicle_threshold: u32,
}

impl Default for AnalysisConfig {
    fn default() -> Self {
        Self {
            follicle_threshold: 12,
        }
    }
}

impl AppConfig {
    /// Reads the YAML file at `path`; a missing file yields the defaults.
    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        if !path.exists() {
            log::warn!("Config file {} not found, using defaults", path.display());
            return Ok(Self::default());
        }
        let text = std::fs::read_to_string(path).map_err(|source| ConfigError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        let config: AppConfig = serde_yaml::from_str(&text)?;
        Ok(config)
    }

    /// Loads `.env`, the YAML file named by `SERVICE_CONFIG` (or the default
    /// path), then applies environment overrides.
    pub fn from_env() -> Result<Self, ConfigError> {
        dotenv::dotenv().ok();
        let path = std::env::var("SERVICE_CONFIG").unwrap_or_else(|_| DEFAULT_CONFIG_PATH.to_string());
        let mut config = Self::load(Path::new(&path))?;
        config.apply_overrides(|key| std::env::var(key).ok())?;
        config.validate()?;
        Ok(config)
    }

    pub fn apply_overrides<F>(&mut self, lookup: F) -> Result<(), ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        if let Some(host) = lookup("HOST") {
            self.server.host = host;
        }
        if let Some(port) = lookup("PORT") {
            self.server.port = port
                .parse()
                .map_err(|_| ConfigError::Invalid(format!("PORT is not a valid port: {}", port)))?;
        }
        if let Some(dir) = lookup("MODEL_DIR") {
            self.models.dir = PathBuf::from(dir);
        }
        Ok(())
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.server.port == 0 {
            return Err(ConfigError::Invalid("server.port must be non-zero".into()));
        }
        if self.server.max_body_mb == 0 {
            return Err(ConfigError::Invalid("server.max_body_mb must be non-zero".into()));
        }
        if self.analysis.follicle_threshold == 0 {
            return Err(ConfigError::Invalid(
                "analysis.follicle_threshold must be at least 1".into(),
            ));
        }
        if self.caption.timeout_secs == 0 {
            return Err(ConfigError::Invalid("caption.timeout_secs must be non-zero".into()));
        }
        Ok(())
    }

    pub fn bind_address(&self) -> String {
        format!("{}:{}", self.server.host, self.server.port)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn missing_file_gives_defaults() {
        let dir = tempfile::tempdir().unwrap();
        let config = AppConfig::load(&dir.path().join("absent.yaml")).unwrap();
        assert_eq!(config.server.port, 5001);
        assert_eq!(config.analysis.follicle_threshold, 12);
        assert_eq!(config.caption.timeout_secs, 30);
        assert_eq!(config.server.body_limit(), 32 * 1024 * 1024);
    }

    #[test]
    fn partial_yaml_keeps_other_defaults() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(file, "server:\n  port: 9000\nanalysis:\n  follicle_threshold: 10").unwrap();
        let config = AppConfig::load(file.path()).unwrap();
        assert_eq!(config.server.port, 9000);
        assert_eq!(config.server.host, "0.0.0.0");
        assert_eq!(config.analysis.follicle_threshold, 10);
        assert_eq!(config.models.dir, PathBuf::from("model"));
    }

    #[test]
    fn malformed_yaml_is_an_error() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(file, "server: [unclosed").unwrap();
        assert!(matches!(AppConfig::load(file.path()), Err(ConfigError::Yaml(_))));
    }

    #[test]
    fn env_overrides_apply() {
        let mut config = AppConfig::default();
        config
            .apply_overrides(|key| match key {
                "PORT" => Some("8081".into()),
                "MODEL_DIR" => Some("/srv/models".into()),
                _ => None,
            })
            .unwrap();
        assert_eq!(config.bind_address(), "0.0.0.0:8081");
        assert_eq!(
            config.models.resolve(&config.models.cnn),
            PathBuf::from("/srv/models/pcos_cnn_model.pt")
        );
    }

    #[test]
    fn bad_port_override_is_rejected() {
        let mut config = AppConfig::default();
        let err = config
            .apply_overrides(|key| (key == "PORT").then(|| "eighty".to_string()))
            .unwrap_err();
        assert!(matches!(err, ConfigError::Invalid(_)));
    }

    #[test]
    fn zero_body_limit_fails_validation() {
        let mut config = AppConfig::default();
        config.server.max_body_mb = 0;
        assert!(matches!(config.validate(), Err(ConfigError::Invalid(_))));
    }

    #[test]
    fn zero_threshold_fails_validation() {
        let mut config = AppConfig::default();
        config.analysis.follicle_threshold = 0;
        assert!(config.validate().is_err());
    }
}
