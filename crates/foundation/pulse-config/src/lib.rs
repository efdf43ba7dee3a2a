//! # Pulse Config
//!
//! Layered configuration:
//!
//! ```text
//!   built-in defaults  →  YAML file  →  environment overrides
//! ```
//!
//! The file is looked up at `--config`, then `$PULSE_CONFIG`, then
//! `<config_dir>/pulse/config.yaml`. A missing file is fine; a malformed one
//! is an error.

use std::env;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use tracing::{debug, info};

pub type Result<T> = std::result::Result<T, ConfigError>;

#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Failed to read config file {path}: {source}")]
    Io {
        path: PathBuf,
        source: std::io::Error,
    },

    #[error("Invalid YAML config: {0}")]
    Yaml(#[from] serde_yaml::Error),

    #[error("Invalid value for {key}: {value:?}")]
    Env { key: String, value: String },

    #[error("Invalid config: {0}")]
    Invalid(String),
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ServerConfig {
    pub bind: String,
    /// Base URL used when redirecting to a freshly created property.
    pub public_url: String,
    pub cors_origins: Vec<String>,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            bind: "0.0.0.0:3000".into(),
            public_url: "http://localhost:3000".into(),
            cors_origins: Vec::new(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct MongoConfig {
    pub uri: String,
    pub database: String,
}

impl Default for MongoConfig {
    fn default() -> Self {
        Self {
            uri: "mongodb://localhost:27017".into(),
            database: "propertypulse".into(),
        }
    }
}

/// Credentials for the image host's signed upload API.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct MediaConfig {
    pub cloud_name: String,
    pub api_key: String,
    pub api_secret: String,
    pub folder: String,
    pub api_base: String,
}

impl Default for MediaConfig {
    fn default() -> Self {
        Self {
            cloud_name: String::new(),
            api_key: String::new(),
            api_secret: String::new(),
            folder: "propertypulse".into(),
            api_base: "https://api.cloudinary.com/v1_1".into(),
        }
    }
}

impl MediaConfig {
    pub fn is_configured(&self) -> bool {
        !self.cloud_name.is_empty() && !self.api_key.is_empty() && !self.api_secret.is_empty()
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct AuthConfig {
    /// HMAC secret shared with the session provider.
    pub session_secret: String,
    pub cookie_name: String,
}

impl Default for AuthConfig {
    fn default() -> Self {
        Self {
            session_secret: String::new(),
            cookie_name: "pulse_session".into(),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ListingConfig {
    pub page_size: u64,
    pub max_page_size: u64,
    pub featured_limit: u64,
}

impl Default for ListingConfig {
    fn default() -> Self {
        Self {
            page_size: 6,
            max_page_size: 50,
            featured_limit: 3,
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    pub server: ServerConfig,
    pub mongodb: MongoConfig,
    pub media: MediaConfig,
    pub auth: AuthConfig,
    pub listing: ListingConfig,
}

impl Config {
    /// Defaults, then the YAML file (if any), then the process environment.
    pub fn load(explicit: Option<&Path>) -> Result<Self> {
        let path = explicit
            .map(Path::to_path_buf)
            .or_else(|| env::var_os("PULSE_CONFIG").map(PathBuf::from))
            .or_else(Self::default_path);

        let mut config = match path {
            Some(path) if path.exists() => {
                info!("Loading config from {}", path.display());
                let raw = std::fs::read_to_string(&path)
                    .map_err(|source| ConfigError::Io { path: path.clone(), source })?;
                Self::from_yaml(&raw)?
            }
            Some(path) if explicit.is_some() => {
                return Err(ConfigError::Io {
                    path,
                    source: std::io::Error::from(std::io::ErrorKind::NotFound),
                });
            }
            _ => {
                debug!("No config file found, using defaults");
                Self::default()
            }
        };

        config.apply_overrides(|key| env::var(key).ok())?;
        config.validate()?;
        Ok(config)
    }

    /// `<config_dir>/pulse/config.yaml`
    pub fn default_path() -> Option<PathBuf> {
        dirs::config_dir().map(|d| d.join("pulse").join("config.yaml"))
    }

    pub fn from_yaml(raw: &str) -> Result<Self> {
        if raw.trim().is_empty() {
            return Ok(Self::default());
        }
        Ok(serde_yaml::from_str(raw)?)
    }

    /// Apply environment-style overrides from `lookup`.
    pub fn apply_overrides(&mut self, lookup: impl Fn(&str) -> Option<String>) -> Result<()> {
        let set = |key: &str, target: &mut String| {
            if let Some(value) = lookup(key) {
                debug!("{key} overrides config");
                *target = value;
            }
        };
        set("MONGODB_URI", &mut self.mongodb.uri);
        set("PULSE_DB", &mut self.mongodb.database);
        set("PULSE_BIND", &mut self.server.bind);
        set("PULSE_PUBLIC_URL", &mut self.server.public_url);
        set("CLOUDINARY_CLOUD_NAME", &mut self.media.cloud_name);
        set("CLOUDINARY_API_KEY", &mut self.media.api_key);
        set("CLOUDINARY_API_SECRET", &mut self.media.api_secret);
        set("PULSE_SESSION_SECRET", &mut self.auth.session_secret);

        if let Some(raw) = lookup("PULSE_PAGE_SIZE") {
            self.listing.page_size = raw.trim().parse().map_err(|_| ConfigError::Env {
                key: "PULSE_PAGE_SIZE".into(),
                value: raw.clone(),
            })?;
        }
        Ok(())
    }

    pub fn validate(&self) -> Result<()> {
        let l = &self.listing;
        if l.max_page_size == 0 || l.page_size == 0 {
            return Err(ConfigError::Invalid("listing page sizes must be positive".into()));
        }
        if l.page_size > l.max_page_size {
            return Err(ConfigError::Invalid(format!(
                "listing.page_size ({}) exceeds listing.max_page_size ({})",
                l.page_size, l.max_page_size
            )));
        }
        if self.mongodb.database.trim().is_empty() {
            return Err(ConfigError::Invalid("mongodb.database is empty".into()));
        }
        Ok(())
    }

    /// Copy with secrets masked, for printing.
    pub fn redacted(&self) -> Self {
        let mask = |s: &str| if s.is_empty() { String::new() } else { "********".into() };
        let mut out = self.clone();
        out.media.api_secret = mask(&self.media.api_secret);
        out.auth.session_secret = mask(&self.auth.session_secret);
        out
    }

    pub fn to_yaml(&self) -> Result<String> {
        Ok(serde_yaml::to_string(self)?)
    }
}
