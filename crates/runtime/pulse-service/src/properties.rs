//! Property CRUD and listings.

use serde::Deserialize;
use tracing::{debug, info, warn};

use pulse_core::{
    require, Error, Identity, ListQuery, Page, Pagination, Property, PropertyFilter, PropertyForm,
    PropertyId, PropertyListing, PropertyPatch, Result, SortBy, UserId,
};
use pulse_media::ImageUpload;

use crate::Service;

const NOT_FOUND: &str = "Property not found";

/// Query string of `GET /properties`.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ListParams {
    #[serde(default)]
    pub page: Option<String>,
    #[serde(default)]
    pub page_size: Option<String>,
    #[serde(default)]
    pub sort_by: Option<String>,
}

/// Query string of `GET /properties/search`.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SearchParams {
    #[serde(default)]
    pub location: Option<String>,
    #[serde(default)]
    pub property_type: Option<String>,
    #[serde(default)]
    pub sort_by: Option<String>,
    #[serde(default)]
    pub page: Option<String>,
    #[serde(default)]
    pub page_size: Option<String>,
}

impl Service {
    fn pagination(&self, page: Option<&str>, page_size: Option<&str>) -> Result<Pagination> {
        Pagination::from_params(
            page,
            page_size,
            self.listing.page_size,
            self.listing.max_page_size,
        )
    }

    pub(crate) async fn existing_property(&self, id: &PropertyId) -> Result<Property> {
        self.store
            .find_property(id)
            .await?
            .ok_or_else(|| Error::not_found(NOT_FOUND))
    }

    /// Validate the form, upload images in order, then insert.
    pub async fn create_property(
        &self,
        identity: Option<&Identity>,
        form: PropertyForm,
        images: Vec<ImageUpload>,
    ) -> Result<Property> {
        let identity = require(identity, "User ID is required")?;
        let mut new = form.validate(identity.user_id.clone())?;

        for image in images.iter().filter(|i| !i.is_empty()) {
            let url = self.media.upload(image).await?;
            new.images.push(url);
        }

        let property = self.store.insert_property(&new).await?;
        info!(id = %property.id, owner = %property.owner, images = property.images.len(), "Property created");
        Ok(property)
    }

    pub async fn get_property(&self, id: &str) -> Result<Property> {
        let id = PropertyId::parse(id)?;
        self.existing_property(&id).await
    }

    /// Owner-only partial update.
    pub async fn update_property(
        &self,
        identity: Option<&Identity>,
        id: &str,
        patch: PropertyPatch,
    ) -> Result<Property> {
        let identity = require(identity, "User ID is required")?;
        let id = PropertyId::parse(id)?;
        let patch = patch.validate()?;
        let current = self.existing_property(&id).await?;
        if !identity.is(&current.owner) {
            return Err(Error::Unauthorized("Unauthorized".into()));
        }
        if patch.is_empty() {
            return Ok(current);
        }
        self.store
            .update_property(&id, &patch)
            .await?
            .ok_or_else(|| Error::not_found(NOT_FOUND))
    }

    /// Owner-only. Hosted images are removed first; a failed removal is
    /// logged and does not stop the delete.
    pub async fn delete_property(&self, identity: Option<&Identity>, id: &str) -> Result<()> {
        let identity = require(identity, "User ID is required")?;
        let id = PropertyId::parse(id)?;
        let property = self.existing_property(&id).await?;
        if !identity.is(&property.owner) {
            return Err(Error::Unauthorized("Unauthorized".into()));
        }

        for url in &property.images {
            let Some(public_id) = self.media.public_id(url) else {
                warn!(%url, "Image URL has no public id");
                continue;
            };
            if let Err(err) = self.media.destroy(&public_id).await {
                warn!(%public_id, %err, "Failed to destroy image");
            }
        }

        if !self.store.delete_property(&id).await? {
            return Err(Error::not_found(NOT_FOUND));
        }
        info!(%id, "Property deleted");
        Ok(())
    }

    pub async fn list_properties(&self, params: &ListParams) -> Result<Page<PropertyListing>> {
        let query = ListQuery {
            filter: PropertyFilter::default(),
            sort: SortBy::parse(params.sort_by.as_deref().unwrap_or_default()),
            pagination: Some(self.pagination(params.page.as_deref(), params.page_size.as_deref())?),
        };
        debug!(?query, "Listing properties");
        self.store.list_properties(&query).await
    }

    pub async fn search_properties(&self, params: &SearchParams) -> Result<Page<PropertyListing>> {
        let query = ListQuery {
            filter: PropertyFilter::search(params.location.clone(), params.property_type.clone()),
            sort: SortBy::parse(params.sort_by.as_deref().unwrap_or_default()),
            pagination: Some(self.pagination(params.page.as_deref(), params.page_size.as_deref())?),
        };
        debug!(?query, "Searching properties");
        self.store.list_properties(&query).await
    }

    /// Featured listings, newest first.
    pub async fn featured_properties(&self) -> Result<Vec<Property>> {
        let limit = self.listing.featured_limit;
        let query = ListQuery {
            filter: PropertyFilter::featured(),
            sort: SortBy::Newest,
            pagination: Some(Pagination::new(1, limit, limit)),
        };
        Ok(listings_to_properties(self.store.list_properties(&query).await?))
    }

    /// Every listing owned by `user_id`, newest first.
    pub async fn user_properties(&self, user_id: &str) -> Result<Vec<Property>> {
        let owner = UserId::parse(user_id)?;
        let query = ListQuery {
            filter: PropertyFilter::owned_by(owner),
            sort: SortBy::Newest,
            pagination: None,
        };
        Ok(listings_to_properties(self.store.list_properties(&query).await?))
    }
}

fn listings_to_properties(page: Page<PropertyListing>) -> Vec<Property> {
    page.properties.into_iter().map(|l| l.property).collect()
}
