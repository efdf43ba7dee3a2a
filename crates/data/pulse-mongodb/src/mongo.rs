//! Store traits over the MongoDB driver.

use std::collections::HashMap;

use async_trait::async_trait;
use bson::oid::ObjectId;
use bson::{doc, Bson, DateTime, Document};
use futures::TryStreamExt;
use mongodb::options::ReturnDocument;
use tracing::debug;

use pulse_core::{
    Error, ListQuery, Message, MessageId, NewMessage, NewProperty, NewReview, Page, Property,
    PropertyId, PropertyListing, PropertyPatch, RatingSummary, Result, Review, ReviewId,
    ReviewPatch, ReviewWithAuthor, SortBy, User, UserId,
};

use crate::error::{decode_err, is_duplicate_key, store_err};
use crate::gateway::MongoStore;
use crate::pipeline;
use crate::schema::{bson_f64, normalize_views, oid, MessageDoc, PropertyDoc, ReviewDoc, ReviewJoinedDoc};
use crate::{MessageStore, PropertyStore, ReviewStore, Store, UserStore};

const DUPLICATE_REVIEW: &str = "You have already reviewed this property";

/// Split the computed rating fields off an aggregation row.
fn rated_row(mut row: Document) -> Result<PropertyListing> {
    let average = bson_f64(row.get("averageRating"));
    let count = bson_f64(row.get("reviewCount"));
    row.remove("averageRating");
    row.remove("reviewCount");
    let property = bson::from_document::<PropertyDoc>(row)
        .map_err(decode_err)?
        .into_property()?;
    Ok(PropertyListing {
        property,
        average_rating: Some(average),
        review_count: Some(count as u64),
    })
}

#[async_trait]
impl PropertyStore for MongoStore {
    async fn insert_property(&self, property: &NewProperty) -> Result<Property> {
        let row = PropertyDoc::from_new(property)?;
        self.properties().insert_one(&row).await.map_err(store_err)?;
        debug!(id = %row.id, "Property inserted");
        row.into_property()
    }

    async fn find_property(&self, id: &PropertyId) -> Result<Option<Property>> {
        self.properties()
            .find_one(doc! { "_id": oid(id.as_str())? })
            .await
            .map_err(store_err)?
            .map(PropertyDoc::into_property)
            .transpose()
    }

    async fn find_properties(&self, ids: &[PropertyId]) -> Result<Vec<Property>> {
        if ids.is_empty() {
            return Ok(Vec::new());
        }
        let oids = ids
            .iter()
            .map(|id| oid(id.as_str()))
            .collect::<Result<Vec<ObjectId>>>()?;
        let rows: Vec<PropertyDoc> = self
            .properties()
            .find(doc! { "_id": { "$in": oids } })
            .await
            .map_err(store_err)?
            .try_collect()
            .await
            .map_err(store_err)?;

        let mut by_id: HashMap<String, Property> = HashMap::with_capacity(rows.len());
        for row in rows {
            let property = row.into_property()?;
            by_id.insert(property.id.to_string(), property);
        }
        Ok(ids.iter().filter_map(|id| by_id.remove(id.as_str())).collect())
    }

    async fn update_property(
        &self,
        id: &PropertyId,
        patch: &PropertyPatch,
    ) -> Result<Option<Property>> {
        self.properties()
            .find_one_and_update(doc! { "_id": oid(id.as_str())? }, pipeline::property_update(patch))
            .return_document(ReturnDocument::After)
            .await
            .map_err(store_err)?
            .map(PropertyDoc::into_property)
            .transpose()
    }

    async fn delete_property(&self, id: &PropertyId) -> Result<bool> {
        let result = self
            .properties()
            .delete_one(doc! { "_id": oid(id.as_str())? })
            .await
            .map_err(store_err)?;
        Ok(result.deleted_count > 0)
    }

    async fn list_properties(&self, query: &ListQuery) -> Result<Page<PropertyListing>> {
        let filter = pipeline::property_filter(&query.filter)?;
        let total = self
            .properties()
            .count_documents(filter.clone())
            .await
            .map_err(store_err)?;
        let skip = query.pagination.map(|p| p.skip()).unwrap_or(0);
        let limit = query.pagination.map(|p| p.limit());

        let properties = if query.sort == SortBy::RatingDesc {
            let rows: Vec<Document> = self
                .properties()
                .aggregate(pipeline::rated_listing(filter, skip, limit))
                .await
                .map_err(store_err)?
                .try_collect()
                .await
                .map_err(store_err)?;
            rows.into_iter().map(rated_row).collect::<Result<Vec<_>>>()?
        } else {
            let collection = self.properties();
            let mut find = collection
                .find(filter)
                .sort(pipeline::sort_spec(query.sort))
                .skip(skip);
            if let Some(limit) = limit {
                find = find.limit(pipeline::clamp_i64(limit));
            }
            let rows: Vec<PropertyDoc> = find
                .await
                .map_err(store_err)?
                .try_collect()
                .await
                .map_err(store_err)?;
            rows.into_iter()
                .map(|row| row.into_property().map(PropertyListing::from))
                .collect::<Result<Vec<_>>>()?
        };
        Ok(Page { total, properties })
    }

    async fn increment_views(&self, id: &PropertyId) -> Result<Option<i64>> {
        let updated = self
            .properties()
            .find_one_and_update(doc! { "_id": oid(id.as_str())? }, pipeline::increment_views())
            .return_document(ReturnDocument::After)
            .await
            .map_err(store_err)?;
        Ok(updated.map(|row| normalize_views(row.views.as_ref())))
    }

    async fn rating_summary(&self, id: &PropertyId) -> Result<RatingSummary> {
        let mut cursor = self
            .properties()
            .aggregate(pipeline::rating_summary(oid(id.as_str())?))
            .await
            .map_err(store_err)?;
        let Some(row) = cursor.try_next().await.map_err(store_err)? else {
            return Ok(RatingSummary::default());
        };
        Ok(RatingSummary {
            average_rating: bson_f64(row.get("averageRating")),
            review_count: bson_f64(row.get("reviewCount")) as u64,
        })
    }
}

impl MongoStore {
    async fn joined_reviews(&self, filter: Document) -> Result<Vec<ReviewWithAuthor>> {
        let rows: Vec<Document> = self
            .reviews()
            .aggregate(pipeline::reviews_with_author(filter))
            .await
            .map_err(store_err)?
            .try_collect()
            .await
            .map_err(store_err)?;
        rows.into_iter()
            .map(|row| {
                bson::from_document::<ReviewJoinedDoc>(row)
                    .map_err(decode_err)?
                    .into_review_with_author()
            })
            .collect()
    }
}

#[async_trait]
impl ReviewStore for MongoStore {
    async fn insert_review(&self, review: &NewReview) -> Result<Review> {
        let row = ReviewDoc::from_new(review)?;
        match self.reviews().insert_one(&row).await {
            Ok(_) => row.into_review(),
            Err(err) if is_duplicate_key(&err) => Err(Error::Conflict(DUPLICATE_REVIEW.into())),
            Err(err) => Err(store_err(err)),
        }
    }

    async fn find_review(&self, id: &ReviewId) -> Result<Option<Review>> {
        self.reviews()
            .find_one(doc! { "_id": oid(id.as_str())? })
            .await
            .map_err(store_err)?
            .map(ReviewDoc::into_review)
            .transpose()
    }

    async fn find_user_review(
        &self,
        user: &UserId,
        property: &PropertyId,
    ) -> Result<Option<Review>> {
        self.reviews()
            .find_one(doc! {
                "user": oid(user.as_str())?,
                "property": oid(property.as_str())?,
            })
            .await
            .map_err(store_err)?
            .map(ReviewDoc::into_review)
            .transpose()
    }

    async fn review_with_author(&self, id: &ReviewId) -> Result<Option<ReviewWithAuthor>> {
        let mut rows = self.joined_reviews(doc! { "_id": oid(id.as_str())? }).await?;
        Ok(rows.pop())
    }

    async fn list_reviews(&self, property: Option<&PropertyId>) -> Result<Vec<ReviewWithAuthor>> {
        let filter = match property {
            Some(p) => doc! { "property": oid(p.as_str())? },
            None => Document::new(),
        };
        self.joined_reviews(filter).await
    }

    async fn update_review(&self, id: &ReviewId, patch: &ReviewPatch) -> Result<Option<Review>> {
        self.reviews()
            .find_one_and_update(doc! { "_id": oid(id.as_str())? }, pipeline::review_update(patch))
            .return_document(ReturnDocument::After)
            .await
            .map_err(store_err)?
            .map(ReviewDoc::into_review)
            .transpose()
    }

    async fn delete_review(&self, id: &ReviewId) -> Result<bool> {
        let result = self
            .reviews()
            .delete_one(doc! { "_id": oid(id.as_str())? })
            .await
            .map_err(store_err)?;
        Ok(result.deleted_count > 0)
    }
}

#[async_trait]
impl UserStore for MongoStore {
    async fn upsert_user(&self, user: &User) -> Result<()> {
        let mut set = doc! {
            "email": user.email.clone(),
            "updatedAt": DateTime::now(),
        };
        if let Some(username) = &user.username {
            set.insert("username", username.clone());
        }
        if let Some(image) = &user.image {
            set.insert("image", image.clone());
        }
        let created = DateTime::from_chrono(user.created_at);
        self.users()
            .update_one(
                doc! { "_id": oid(user.id.as_str())? },
                doc! {
                    "$set": set,
                    "$setOnInsert": { "bookmarks": Bson::Array(Vec::new()), "createdAt": created },
                },
            )
            .upsert(true)
            .await
            .map_err(store_err)?;
        Ok(())
    }

    async fn find_user(&self, id: &UserId) -> Result<Option<User>> {
        self.users()
            .find_one(doc! { "_id": oid(id.as_str())? })
            .await
            .map_err(store_err)?
            .map(|row| row.into_user())
            .transpose()
    }

    async fn toggle_bookmark(&self, user: &UserId, property: &PropertyId) -> Result<Option<bool>> {
        let user = oid(user.as_str())?;
        let property = oid(property.as_str())?;

        let updated = self
            .users()
            .find_one_and_update(doc! { "_id": user }, pipeline::toggle_bookmark(property))
            .return_document(ReturnDocument::After)
            .await
            .map_err(store_err)?;
        Ok(updated.map(|row| row.bookmarks.contains(&property)))
    }

    async fn is_bookmarked(&self, user: &UserId, property: &PropertyId) -> Result<bool> {
        let count = self
            .users()
            .count_documents(doc! {
                "_id": oid(user.as_str())?,
                "bookmarks": oid(property.as_str())?,
            })
            .await
            .map_err(store_err)?;
        Ok(count > 0)
    }
}

#[async_trait]
impl MessageStore for MongoStore {
    async fn insert_message(&self, message: &NewMessage) -> Result<Message> {
        let row = MessageDoc::from_new(message)?;
        self.messages().insert_one(&row).await.map_err(store_err)?;
        row.into_message()
    }

    async fn find_message(&self, id: &MessageId) -> Result<Option<Message>> {
        self.messages()
            .find_one(doc! { "_id": oid(id.as_str())? })
            .await
            .map_err(store_err)?
            .map(MessageDoc::into_message)
            .transpose()
    }

    async fn mark_replied(&self, id: &MessageId) -> Result<bool> {
        let result = self
            .messages()
            .update_one(
                doc! { "_id": oid(id.as_str())? },
                doc! { "$set": { "hasReply": true, "read": true, "updatedAt": DateTime::now() } },
            )
            .await
            .map_err(store_err)?;
        Ok(result.matched_count > 0)
    }

    async fn toggle_read(&self, id: &MessageId) -> Result<Option<bool>> {
        let updated = self
            .messages()
            .find_one_and_update(doc! { "_id": oid(id.as_str())? }, pipeline::toggle_read())
            .return_document(ReturnDocument::After)
            .await
            .map_err(store_err)?;
        Ok(updated.map(|row| row.read))
    }

    async fn delete_message(&self, id: &MessageId) -> Result<bool> {
        let result = self
            .messages()
            .delete_one(doc! { "_id": oid(id.as_str())? })
            .await
            .map_err(store_err)?;
        Ok(result.deleted_count > 0)
    }

    async fn inbox(&self, recipient: &UserId) -> Result<Vec<Message>> {
        let rows: Vec<MessageDoc> = self
            .messages()
            .find(doc! { "recipient": oid(recipient.as_str())? })
            .sort(doc! { "read": 1, "createdAt": -1, "_id": -1 })
            .await
            .map_err(store_err)?
            .try_collect()
            .await
            .map_err(store_err)?;
        rows.into_iter().map(MessageDoc::into_message).collect()
    }

    async fn unread_count(&self, recipient: &UserId) -> Result<u64> {
        self.messages()
            .count_documents(pipeline::unread_filter(oid(recipient.as_str())?))
            .await
            .map_err(store_err)
    }
}

#[async_trait]
impl Store for MongoStore {
    async fn ping(&self) -> Result<()> {
        self.ping_server().await
    }

    fn backend(&self) -> &'static str {
        "mongodb"
    }
}
