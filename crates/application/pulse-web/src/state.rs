use pulse_config::{Config, ServerConfig};
use pulse_service::Service;

use crate::middleware::SessionVerifier;

/// Shared across every request.
#[derive(Clone)]
pub struct AppState {
    pub service: Service,
    pub sessions: SessionVerifier,
    /// Base for the redirect after a property is created.
    pub public_url: String,
    pub cors_origins: Vec<String>,
}

impl AppState {
    pub fn new(service: Service, sessions: SessionVerifier, server: &ServerConfig) -> Self {
        Self {
            service,
            sessions,
            public_url: server.public_url.trim_end_matches('/').to_string(),
            cors_origins: server.cors_origins.clone(),
        }
    }

    pub fn from_config(service: Service, config: &Config) -> Self {
        let sessions = SessionVerifier::new(&config.auth.session_secret, &config.auth.cookie_name);
        Self::new(service, sessions, &config.server)
    }

    pub fn property_url(&self, id: &str) -> String {
        format!("{}/properties/{}", self.public_url, id)
    }
}
