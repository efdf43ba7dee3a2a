use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::{PropertyId, ReviewAuthor, UserId};

/// A signed-in user. Rows are provisioned from the session provider.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct User {
    #[serde(rename = "_id")]
    pub id: UserId,
    pub email: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub username: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub image: Option<String>,
    /// Bookmarked properties. Only the toggle operation mutates this.
    #[serde(default)]
    pub bookmarks: Vec<PropertyId>,
    #[serde(rename = "createdAt")]
    pub created_at: DateTime<Utc>,
    #[serde(rename = "updatedAt")]
    pub updated_at: DateTime<Utc>,
}

impl User {
    pub fn new(id: UserId, email: impl Into<String>) -> Self {
        let now = Utc::now();
        Self {
            id,
            email: email.into(),
            username: None,
            image: None,
            bookmarks: Vec::new(),
            created_at: now,
            updated_at: now,
        }
    }

    pub fn with_username(mut self, username: impl Into<String>) -> Self {
        self.username = Some(username.into());
        self
    }

    pub fn with_image(mut self, image: impl Into<String>) -> Self {
        self.image = Some(image.into());
        self
    }

    pub fn author(&self) -> ReviewAuthor {
        ReviewAuthor {
            id: self.id.clone(),
            username: self.username.clone(),
            image: self.image.clone(),
        }
    }
}
