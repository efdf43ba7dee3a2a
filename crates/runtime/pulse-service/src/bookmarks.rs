//! Bookmark toggle and saved listings.

use serde::Serialize;
use tracing::debug;

use pulse_core::{require, Error, Identity, Property, PropertyId, Result, User};

use crate::Service;

const LOGIN_REQUIRED: &str = "Please login to bookmark this property.";

/// Outcome of a toggle, shaped for the JSON response.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct BookmarkToggle {
    pub message: String,
    pub is_bookmarked: bool,
}

impl BookmarkToggle {
    fn new(is_bookmarked: bool) -> Self {
        let message = if is_bookmarked {
            "Property added to bookmarks"
        } else {
            "Property removed from bookmarks"
        };
        Self {
            message: message.into(),
            is_bookmarked,
        }
    }
}

impl Service {
    /// Add the property if absent, remove it if present. Calling twice
    /// restores the original membership.
    pub async fn toggle_bookmark(
        &self,
        identity: Option<&Identity>,
        property_id: &str,
    ) -> Result<BookmarkToggle> {
        let identity = require(identity, LOGIN_REQUIRED)?;
        let property = PropertyId::parse(property_id)?;
        self.existing_property(&property).await?;

        let toggled = match self.store.toggle_bookmark(&identity.user_id, &property).await? {
            Some(state) => state,
            None => {
                // Signed in but never provisioned.
                self.store.upsert_user(&user_from_identity(identity)).await?;
                self.store
                    .toggle_bookmark(&identity.user_id, &property)
                    .await?
                    .ok_or_else(|| Error::unavailable("user row vanished during bookmark"))?
            }
        };
        debug!(user = %identity.user_id, %property, bookmarked = toggled, "Bookmark toggled");
        Ok(BookmarkToggle::new(toggled))
    }

    pub async fn bookmark_status(&self, identity: Option<&Identity>, property_id: &str) -> Result<bool> {
        let identity = require(identity, LOGIN_REQUIRED)?;
        let property = PropertyId::parse(property_id)?;
        self.store.is_bookmarked(&identity.user_id, &property).await
    }

    /// Bookmarked listings in bookmark order. Deleted listings are skipped.
    pub async fn saved_properties(&self, identity: Option<&Identity>) -> Result<Vec<Property>> {
        let identity = require(identity, "User ID is required")?;
        let Some(user) = self.store.find_user(&identity.user_id).await? else {
            return Ok(Vec::new());
        };
        self.store.find_properties(&user.bookmarks).await
    }
}

fn user_from_identity(identity: &Identity) -> User {
    let user = User::new(identity.user_id.clone(), identity.email.clone().unwrap_or_default());
    match &identity.name {
        Some(name) => user.with_username(name.clone()),
        None => user,
    }
}
