//! Session resolution.
//!
//! The session provider signs a small claims document with a secret shared
//! with this service:
//!
//! ```text
//!   token = base64url(json claims) "." hex(hmac_sha256(secret, base64url(json claims)))
//! ```
//!
//! Resolution order:
//!   1. `Authorization: Bearer <token>` header
//!   2. session cookie (`auth.cookie_name`)
//!
//! Anything absent, malformed, badly signed or expired resolves to no
//! identity. The result is injected into request extensions as [`Session`].

use std::convert::Infallible;
use std::sync::Arc;

use axum::extract::{FromRequestParts, Request, State};
use axum::http::request::Parts;
use axum::http::{header, HeaderMap};
use axum::middleware::Next;
use axum::response::Response;
use base64::engine::general_purpose::URL_SAFE_NO_PAD;
use base64::Engine;
use hmac::{Hmac, Mac};
use serde::{Deserialize, Serialize};
use sha2::Sha256;
use tracing::debug;

use pulse_core::{Identity, UserId};

use crate::AppState;

type HmacSha256 = Hmac<Sha256>;

/// Claims carried by a session token.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Claims {
    pub sub: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub email: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub phone: Option<String>,
    /// Expiry, seconds since the epoch.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub exp: Option<i64>,
}

impl Claims {
    pub fn new(sub: impl Into<String>) -> Self {
        Self {
            sub: sub.into(),
            name: None,
            email: None,
            phone: None,
            exp: None,
        }
    }

    fn into_identity(self) -> Option<Identity> {
        let mut identity = Identity::new(UserId::parse(&self.sub).ok()?);
        identity.name = self.name;
        identity.email = self.email;
        identity.phone = self.phone;
        Some(identity)
    }
}

/// Verifies (and, for tooling, mints) session tokens.
#[derive(Clone)]
pub struct SessionVerifier {
    mac: Option<HmacSha256>,
    cookie_name: String,
}

impl SessionVerifier {
    /// An empty secret disables sessions: every request is anonymous.
    pub fn new(secret: &str, cookie_name: impl Into<String>) -> Self {
        let mac = if secret.is_empty() {
            None
        } else {
            HmacSha256::new_from_slice(secret.as_bytes()).ok()
        };
        Self {
            mac,
            cookie_name: cookie_name.into(),
        }
    }

    pub fn is_enabled(&self) -> bool {
        self.mac.is_some()
    }

    pub fn cookie_name(&self) -> &str {
        &self.cookie_name
    }

    /// `None` when sessions are disabled.
    pub fn sign(&self, claims: &Claims) -> Option<String> {
        let mut mac = self.mac.clone()?;
        let payload = URL_SAFE_NO_PAD.encode(serde_json::to_vec(claims).ok()?);
        mac.update(payload.as_bytes());
        let signature = hex::encode(mac.finalize().into_bytes());
        Some(format!("{payload}.{signature}"))
    }

    pub fn verify(&self, token: &str) -> Option<Identity> {
        let mut mac = self.mac.clone()?;
        let (payload, signature) = token.trim().split_once('.')?;
        let signature = hex::decode(signature).ok()?;
        mac.update(payload.as_bytes());
        mac.verify_slice(&signature).ok()?;

        let raw = URL_SAFE_NO_PAD.decode(payload).ok()?;
        let claims: Claims = serde_json::from_slice(&raw).ok()?;
        if let Some(exp) = claims.exp {
            if exp <= chrono::Utc::now().timestamp() {
                debug!(sub = %claims.sub, "Session token expired");
                return None;
            }
        }
        claims.into_identity()
    }

    /// Identity for a request, if any.
    pub fn identify(&self, headers: &HeaderMap) -> Option<Identity> {
        let token = bearer_token(headers).or_else(|| cookie_value(headers, &self.cookie_name))?;
        self.verify(token)
    }
}

fn bearer_token(headers: &HeaderMap) -> Option<&str> {
    let value = headers.get(header::AUTHORIZATION)?.to_str().ok()?;
    value
        .strip_prefix("Bearer ")
        .map(str::trim)
        .filter(|t| !t.is_empty())
}

fn cookie_value<'a>(headers: &'a HeaderMap, name: &str) -> Option<&'a str> {
    for value in headers.get_all(header::COOKIE) {
        let Ok(cookies) = value.to_str() else {
            continue;
        };
        for pair in cookies.split(';') {
            if let Some((key, val)) = pair.trim().split_once('=') {
                if key == name && !val.is_empty() {
                    return Some(val);
                }
            }
        }
    }
    None
}

/// The caller's identity for this request. Anonymous when absent.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Session(pub Option<Identity>);

impl Session {
    pub fn identity(&self) -> Option<&Identity> {
        self.0.as_ref()
    }
}

impl<S: Send + Sync> FromRequestParts<S> for Session {
    type Rejection = Infallible;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        Ok(parts.extensions.get::<Session>().cloned().unwrap_or_default())
    }
}

/// Axum middleware that resolves the session and injects [`Session`].
pub async fn resolve_session(
    State(state): State<Arc<AppState>>,
    mut req: Request,
    next: Next,
) -> Response {
    let identity = state.sessions.identify(req.headers());
    if let Some(identity) = &identity {
        debug!(user = %identity.user_id, "Session resolved");
    }
    req.extensions_mut().insert(Session(identity));
    next.run(req).await
}
