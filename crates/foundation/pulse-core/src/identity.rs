//! Session identity passed explicitly into every operation.

use serde::{Deserialize, Serialize};

use crate::{Error, Result, UserId};

/// The authenticated caller, as resolved from the session provider.
///
/// The contact fields are a snapshot taken at sign-in and are only used to
/// fill denormalized fields (for example the contact block of a reply).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Identity {
    pub user_id: UserId,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub email: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub phone: Option<String>,
}

impl Identity {
    pub fn new(user_id: UserId) -> Self {
        Self {
            user_id,
            name: None,
            email: None,
            phone: None,
        }
    }

    pub fn with_name(mut self, name: impl Into<String>) -> Self {
        self.name = Some(name.into());
        self
    }

    pub fn with_email(mut self, email: impl Into<String>) -> Self {
        self.email = Some(email.into());
        self
    }

    pub fn with_phone(mut self, phone: impl Into<String>) -> Self {
        self.phone = Some(phone.into());
        self
    }

    /// String comparison against a stored owner reference.
    pub fn is(&self, user: &UserId) -> bool {
        self.user_id.as_str() == user.as_str()
    }
}

/// Unwrap an optional identity or fail with `Unauthenticated`.
pub fn require<'a>(identity: Option<&'a Identity>, message: &str) -> Result<&'a Identity> {
    identity.ok_or_else(|| Error::Unauthenticated(message.to_string()))
}
