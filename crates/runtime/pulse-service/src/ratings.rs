//! Rating aggregation.
//!
//! Averages are computed on every read and never stored on the property.

use pulse_core::{PropertyId, RatingSummary, Result};

use crate::Service;

impl Service {
    /// `{averageRating, reviewCount}` for one property. No reviews, or no
    /// such property, gives zero for both.
    pub async fn property_rating(&self, id: &str) -> Result<RatingSummary> {
        let id = PropertyId::parse(id)?;
        self.store.rating_summary(&id).await
    }
}
