//! # Pulse MongoDB
//!
//! Data Store Gateway for the four collections:
//!
//! ```text
//!   properties   reviews (unique user+property)   users   messages
//! ```
//!
//! [`MongoStore`] is the production gateway: one pooled client opened at
//! startup and shared by every request. [`MemoryStore`] implements the same
//! traits in process, with the same atomicity guarantees, for tests and
//! local runs without a database.
//!
//! Counter and set mutations (view increment, bookmark toggle, read toggle)
//! are single-document atomic updates in both implementations.

pub mod error;
pub mod gateway;
pub mod memory;
pub mod pipeline;
pub mod schema;
mod mongo;

use async_trait::async_trait;

use pulse_core::{
    ListQuery, Message, MessageId, NewMessage, NewProperty, NewReview, Page, Property,
    PropertyId, PropertyListing, PropertyPatch, RatingSummary, Result, Review, ReviewId,
    ReviewPatch, ReviewWithAuthor, User, UserId,
};

pub use gateway::MongoStore;
pub use memory::MemoryStore;

/// Collection names.
pub const PROPERTIES: &str = "properties";
pub const REVIEWS: &str = "reviews";
pub const USERS: &str = "users";
pub const MESSAGES: &str = "messages";

#[async_trait]
pub trait PropertyStore: Send + Sync {
    async fn insert_property(&self, property: &NewProperty) -> Result<Property>;

    async fn find_property(&self, id: &PropertyId) -> Result<Option<Property>>;

    /// Fetch several properties, keeping the order of `ids` and skipping
    /// ids that no longer exist.
    async fn find_properties(&self, ids: &[PropertyId]) -> Result<Vec<Property>>;

    async fn update_property(&self, id: &PropertyId, patch: &PropertyPatch)
        -> Result<Option<Property>>;

    async fn delete_property(&self, id: &PropertyId) -> Result<bool>;

    /// Filter, sort and paginate. `total` counts every match.
    async fn list_properties(&self, query: &ListQuery) -> Result<Page<PropertyListing>>;

    /// Add one view and return the new count; `None` if the property is gone.
    async fn increment_views(&self, id: &PropertyId) -> Result<Option<i64>>;

    async fn rating_summary(&self, id: &PropertyId) -> Result<RatingSummary>;
}

#[async_trait]
pub trait ReviewStore: Send + Sync {
    /// Fails with `Conflict` if the user already reviewed the property.
    async fn insert_review(&self, review: &NewReview) -> Result<Review>;

    async fn find_review(&self, id: &ReviewId) -> Result<Option<Review>>;

    async fn find_user_review(&self, user: &UserId, property: &PropertyId)
        -> Result<Option<Review>>;

    async fn review_with_author(&self, id: &ReviewId) -> Result<Option<ReviewWithAuthor>>;

    /// Newest first, optionally restricted to one property.
    async fn list_reviews(&self, property: Option<&PropertyId>) -> Result<Vec<ReviewWithAuthor>>;

    async fn update_review(&self, id: &ReviewId, patch: &ReviewPatch) -> Result<Option<Review>>;

    async fn delete_review(&self, id: &ReviewId) -> Result<bool>;
}

#[async_trait]
pub trait UserStore: Send + Sync {
    /// Insert or refresh the profile fields of a user. Bookmarks are kept.
    async fn upsert_user(&self, user: &User) -> Result<()>;

    async fn find_user(&self, id: &UserId) -> Result<Option<User>>;

    /// Flip bookmark membership. `Some(true)` when the property is now
    /// bookmarked, `None` when the user does not exist.
    async fn toggle_bookmark(&self, user: &UserId, property: &PropertyId) -> Result<Option<bool>>;

    async fn is_bookmarked(&self, user: &UserId, property: &PropertyId) -> Result<bool>;
}

#[async_trait]
pub trait MessageStore: Send + Sync {
    async fn insert_message(&self, message: &NewMessage) -> Result<Message>;

    async fn find_message(&self, id: &MessageId) -> Result<Option<Message>>;

    /// Set `hasReply` and `read` on the original of a reply.
    async fn mark_replied(&self, id: &MessageId) -> Result<bool>;

    /// Flip `read` and return the new value.
    async fn toggle_read(&self, id: &MessageId) -> Result<Option<bool>>;

    async fn delete_message(&self, id: &MessageId) -> Result<bool>;

    /// Messages addressed to `recipient`, unread first, then newest first.
    async fn inbox(&self, recipient: &UserId) -> Result<Vec<Message>>;

    async fn unread_count(&self, recipient: &UserId) -> Result<u64>;
}

/// Everything the service layer needs from the document store.
#[async_trait]
pub trait Store: PropertyStore + ReviewStore + UserStore + MessageStore {
    /// Round-trip to the store, for health checks.
    async fn ping(&self) -> Result<()>;

    fn backend(&self) -> &'static str;
}
