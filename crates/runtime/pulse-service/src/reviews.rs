//! Review lifecycle: one review per user per property, owner-only edits.

use tracing::{debug, info};

use pulse_core::{
    require, Error, Identity, PropertyId, Result, Review, ReviewForm, ReviewId,
    ReviewUpdateForm, ReviewWithAuthor,
};

use crate::Service;

const NOT_FOUND: &str = "Review not found";

impl Service {
    /// Newest first, optionally for one property only.
    pub async fn list_reviews(&self, property_id: Option<&str>) -> Result<Vec<ReviewWithAuthor>> {
        let property = property_id
            .map(str::trim)
            .filter(|p| !p.is_empty())
            .map(PropertyId::parse)
            .transpose()?;
        self.store.list_reviews(property.as_ref()).await
    }

    pub async fn get_review(&self, id: &str) -> Result<ReviewWithAuthor> {
        let id = ReviewId::parse(id)?;
        self.store
            .review_with_author(&id)
            .await?
            .ok_or_else(|| Error::not_found(NOT_FOUND))
    }

    pub async fn create_review(
        &self,
        identity: Option<&Identity>,
        form: ReviewForm,
    ) -> Result<ReviewWithAuthor> {
        let identity = require(identity, "You must be logged in to leave a review")?;
        let new = form.validate(&identity.user_id)?;
        self.existing_property(&new.property).await?;

        // The unique index backs this check up under concurrent submits.
        if self
            .store
            .find_user_review(&new.user, &new.property)
            .await?
            .is_some()
        {
            return Err(Error::Conflict("You have already reviewed this property".into()));
        }

        let review = self.store.insert_review(&new).await?;
        info!(id = %review.id, property = %review.property, rating = review.rating.get(), "Review added");
        self.joined(review).await
    }

    /// Owner-only. Only supplied fields change.
    pub async fn update_review(
        &self,
        identity: Option<&Identity>,
        id: &str,
        form: ReviewUpdateForm,
    ) -> Result<ReviewWithAuthor> {
        let identity = require(identity, "User ID is required")?;
        let id = ReviewId::parse(id)?;
        let patch = form.validate()?;
        let current = self.owned_review(identity, &id).await?;
        if patch.is_empty() {
            return self.joined(current).await;
        }
        let updated = self
            .store
            .update_review(&id, &patch)
            .await?
            .ok_or_else(|| Error::not_found(NOT_FOUND))?;
        debug!(%id, "Review updated");
        self.joined(updated).await
    }

    pub async fn delete_review(&self, identity: Option<&Identity>, id: &str) -> Result<()> {
        let identity = require(identity, "User ID is required")?;
        let id = ReviewId::parse(id)?;
        self.owned_review(identity, &id).await?;
        if !self.store.delete_review(&id).await? {
            return Err(Error::not_found(NOT_FOUND));
        }
        info!(%id, "Review deleted");
        Ok(())
    }

    async fn owned_review(&self, identity: &Identity, id: &ReviewId) -> Result<Review> {
        let review = self
            .store
            .find_review(id)
            .await?
            .ok_or_else(|| Error::not_found(NOT_FOUND))?;
        if !identity.is(&review.user) {
            return Err(Error::Unauthorized("Unauthorized".into()));
        }
        Ok(review)
    }

    async fn joined(&self, review: Review) -> Result<ReviewWithAuthor> {
        match self.store.review_with_author(&review.id).await? {
            Some(joined) => Ok(joined),
            None => Ok(ReviewWithAuthor::from_parts(review, None)),
        }
    }
}
