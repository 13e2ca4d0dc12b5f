use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::path::{Path, PathBuf};

pub const DEFAULT_CONFIG_PATH: &str = "config/config.yml";
pub const DEFAULT_HOST: &str = "127.0.0.1";
pub const DEFAULT_PORT: u16 = 2444;

#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Failed to read config file {}: {source}", .path.display())]
    Io {
        path: PathBuf,
        source: std::io::Error,
    },
    #[error("Failed to parse config: {0}")]
    Parse(#[from] serde_yaml::Error),
    #[error("Invalid config: {0}")]
    Invalid(String),
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AppConfig {
    #[serde(default)]
    pub server: ServerConfig,
    pub services: ServicesConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServerConfig {
    #[serde(default = "default_host")]
    pub host: String,
    #[serde(default = "default_port")]
    pub port: u16,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: default_host(),
            port: default_port(),
        }
    }
}

fn default_host() -> String {
    DEFAULT_HOST.to_string()
}

fn default_port() -> u16 {
    DEFAULT_PORT
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServicesConfig {
    pub planet_classifier: ClassifierConfig,
}

/// Settings for the planet classifier. Immutable once loaded.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ClassifierConfig {
    pub model_path: PathBuf,
    pub device: String,
    pub classes: Vec<String>,
    pub input_size: InputSize,
    pub thresholds: Thresholds,
}

/// Target `(width, height)` for the resize step. Written as `[w, h]` in YAML.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(from = "[usize; 2]", into = "[usize; 2]")]
pub struct InputSize {
    pub width: usize,
    pub height: usize,
}

impl From<[usize; 2]> for InputSize {
    fn from([width, height]: [usize; 2]) -> Self {
        Self { width, height }
    }
}

impl From<InputSize> for [usize; 2] {
    fn from(size: InputSize) -> Self {
        [size.width, size.height]
    }
}

/// Cutoff applied to sigmoid scores: one value for every class, or one per class.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum Thresholds {
    Uniform(f32),
    PerClass(Vec<f32>),
}

impl Thresholds {
    /// `None` when a per-class list has no entry for `index`.
    pub fn for_class(&self, index: usize) -> Option<f32> {
        match self {
            Thresholds::Uniform(t) => Some(*t),
            Thresholds::PerClass(ts) => ts.get(index).copied(),
        }
    }
}

impl AppConfig {
    /// Loads from `PLANET_CONFIG` (or the default path), then applies
    /// `HOST` / `PORT` overrides from the environment.
    pub fn load() -> Result<Self, ConfigError> {
        let path = std::env::var("PLANET_CONFIG").unwrap_or_else(|_| DEFAULT_CONFIG_PATH.into());
        let mut config = Self::from_file(&path)?;

        if let Ok(host) = std::env::var("HOST") {
            config.server.host = host;
        }
        if let Ok(port) = std::env::var("PORT") {
            config.server.port = port
                .parse()
                .map_err(|_| ConfigError::Invalid(format!("PORT is not a valid port: {}", port)))?;
        }
        Ok(config)
    }

    pub fn from_file(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let path = path.as_ref();
        let config_str = std::fs::read_to_string(path).map_err(|source| ConfigError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        Self::from_yaml(&config_str)
    }

    pub fn from_yaml(config_str: &str) -> Result<Self, ConfigError> {
        let config: AppConfig = serde_yaml::from_str(config_str)?;
        config.services.planet_classifier.validate()?;
        Ok(config)
    }

    pub fn bind_address(&self) -> String {
        format!("{}:{}", self.server.host, self.server.port)
    }
}

impl ClassifierConfig {
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.classes.is_empty() {
            return Err(ConfigError::Invalid("classes must not be empty".into()));
        }
        let mut seen = HashSet::new();
        for class in &self.classes {
            if !seen.insert(class.as_str()) {
                return Err(ConfigError::Invalid(format!("duplicate class '{}'", class)));
            }
        }
        if self.input_size.width == 0 || self.input_size.height == 0 {
            return Err(ConfigError::Invalid(format!(
                "input_size must be positive, got {:?}",
                self.input_size
            )));
        }
        match &self.thresholds {
            Thresholds::Uniform(t) if !t.is_finite() => {
                return Err(ConfigError::Invalid("threshold must be finite".into()));
            }
            Thresholds::PerClass(ts) => {
                if ts.len() != self.classes.len() {
                    return Err(ConfigError::Invalid(format!(
                        "expected {} thresholds, got {}",
                        self.classes.len(),
                        ts.len()
                    )));
                }
                if ts.iter().any(|t| !t.is_finite()) {
                    return Err(ConfigError::Invalid("thresholds must be finite".into()));
                }
            }
            _ => {}
        }
        Ok(())
    }
}
