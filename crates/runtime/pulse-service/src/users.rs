//! User provisioning.

use tracing::info;

use pulse_core::{Error, Result, User};

use crate::Service;

impl Service {
    /// Create or refresh the row for a signed-in user. Bookmarks survive.
    pub async fn upsert_user(&self, user: &User) -> Result<()> {
        if user.email.trim().is_empty() {
            return Err(Error::invalid("Email is required"));
        }
        self.store.upsert_user(user).await?;
        info!(id = %user.id, "User provisioned");
        Ok(())
    }
}
