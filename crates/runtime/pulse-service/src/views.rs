//! View counter.

use tracing::debug;

use pulse_core::{Error, PropertyId, Result};

use crate::Service;

impl Service {
    /// Count one view and return the new total. Every call counts; callers
    /// suppress repeats within a browsing session.
    pub async fn increment_views(&self, id: &str) -> Result<i64> {
        let id = PropertyId::parse(id)?;
        let views = self
            .store
            .increment_views(&id)
            .await?
            .ok_or_else(|| Error::not_found("Property Not Found"))?;
        debug!(%id, views, "View recorded");
        Ok(views)
    }
}
