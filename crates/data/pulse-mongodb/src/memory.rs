//! In-process store with the same contract as [`MongoStore`](crate::MongoStore).
//!
//! Every operation runs under one lock, so counter and set updates are as
//! atomic here as the single-document updates on the server. Orderings
//! follow the server's: nulls sort first ascending, ties break on insertion
//! order, newest first.

use std::cmp::Ordering;
use std::collections::HashMap;

use async_trait::async_trait;
use bson::oid::ObjectId;
use chrono::Utc;
use serde_json::Value;
use tokio::sync::RwLock;

use pulse_core::{
    Error, ListQuery, Message, MessageId, NewMessage, NewProperty, NewReview, Page, Property,
    PropertyId, PropertyListing, PropertyPatch, RatingSummary, Result, Review, ReviewId,
    ReviewPatch, ReviewWithAuthor, SortBy, User, UserId,
};

use crate::{MessageStore, PropertyStore, ReviewStore, Store, UserStore};

struct PropertyRow {
    seq: u64,
    property: Property,
    /// Counter as stored. Kept raw so malformed legacy values can be seeded.
    views: Option<Value>,
}

impl PropertyRow {
    fn snapshot(&self) -> Property {
        let mut property = self.property.clone();
        property.views = json_views(self.views.as_ref());
        property
    }
}

struct Row<T> {
    seq: u64,
    value: T,
}

#[derive(Default)]
struct Tables {
    seq: u64,
    properties: Vec<PropertyRow>,
    reviews: Vec<Row<Review>>,
    users: HashMap<String, User>,
    messages: Vec<Row<Message>>,
}

impl Tables {
    fn next_seq(&mut self) -> u64 {
        self.seq += 1;
        self.seq
    }

    fn property(&self, id: &PropertyId) -> Option<&PropertyRow> {
        self.properties.iter().find(|r| &r.property.id == id)
    }

    fn summary(&self, id: &PropertyId) -> RatingSummary {
        RatingSummary::from_ratings(
            self.reviews
                .iter()
                .filter(|r| &r.value.property == id)
                .map(|r| r.value.rating),
        )
    }

    fn with_author(&self, review: &Review) -> ReviewWithAuthor {
        let author = self.users.get(review.user.as_str()).map(User::author);
        ReviewWithAuthor::from_parts(review.clone(), author)
    }
}

fn json_views(raw: Option<&Value>) -> i64 {
    match raw.and_then(Value::as_f64) {
        Some(n) if n.is_finite() && n > 0.0 => n as i64,
        _ => 0,
    }
}

fn fresh_id<T: std::str::FromStr<Err = Error>>() -> Result<T> {
    ObjectId::new().to_hex().parse()
}

/// Newest first, later inserts first on equal timestamps.
fn newest(a: (&chrono::DateTime<Utc>, u64), b: (&chrono::DateTime<Utc>, u64)) -> Ordering {
    b.0.cmp(a.0).then(b.1.cmp(&a.1))
}

fn price_key(p: &Property) -> [Option<f64>; 3] {
    [p.rates.monthly, p.rates.weekly, p.rates.nightly]
}

fn cmp_price(a: &Property, b: &Property) -> Ordering {
    price_key(a)
        .partial_cmp(&price_key(b))
        .unwrap_or(Ordering::Equal)
}

#[derive(Default)]
pub struct MemoryStore {
    tables: RwLock<Tables>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Overwrite the stored view counter with an arbitrary value.
    pub async fn set_raw_views(&self, id: &PropertyId, views: Option<Value>) -> bool {
        let mut tables = self.tables.write().await;
        match tables.properties.iter_mut().find(|r| &r.property.id == id) {
            Some(row) => {
                row.views = views;
                true
            }
            None => false,
        }
    }

    pub async fn property_count(&self) -> usize {
        self.tables.read().await.properties.len()
    }

    pub async fn message_count(&self) -> usize {
        self.tables.read().await.messages.len()
    }
}

#[async_trait]
impl PropertyStore for MemoryStore {
    async fn insert_property(&self, new: &NewProperty) -> Result<Property> {
        let mut tables = self.tables.write().await;
        let now = Utc::now();
        let property = Property {
            id: fresh_id()?,
            owner: new.owner.clone(),
            name: new.name.clone(),
            property_type: new.property_type.clone(),
            description: new.description.clone(),
            location: new.location.clone(),
            beds: new.beds,
            baths: new.baths,
            square_feet: new.square_feet,
            amenities: new.amenities.clone(),
            rates: new.rates,
            seller_info: new.seller_info.clone(),
            images: new.images.clone(),
            views: 0,
            is_featured: new.is_featured,
            created_at: now,
            updated_at: now,
        };
        let seq = tables.next_seq();
        tables.properties.push(PropertyRow {
            seq,
            property: property.clone(),
            views: Some(Value::from(0)),
        });
        Ok(property)
    }

    async fn find_property(&self, id: &PropertyId) -> Result<Option<Property>> {
        let tables = self.tables.read().await;
        Ok(tables.property(id).map(PropertyRow::snapshot))
    }

    async fn find_properties(&self, ids: &[PropertyId]) -> Result<Vec<Property>> {
        let tables = self.tables.read().await;
        Ok(ids
            .iter()
            .filter_map(|id| tables.property(id).map(PropertyRow::snapshot))
            .collect())
    }

    async fn update_property(
        &self,
        id: &PropertyId,
        patch: &PropertyPatch,
    ) -> Result<Option<Property>> {
        let mut tables = self.tables.write().await;
        let Some(row) = tables.properties.iter_mut().find(|r| &r.property.id == id) else {
            return Ok(None);
        };
        patch.apply_to(&mut row.property);
        row.property.updated_at = Utc::now();
        Ok(Some(row.snapshot()))
    }

    async fn delete_property(&self, id: &PropertyId) -> Result<bool> {
        let mut tables = self.tables.write().await;
        let before = tables.properties.len();
        tables.properties.retain(|r| &r.property.id != id);
        Ok(tables.properties.len() < before)
    }

    async fn list_properties(&self, query: &ListQuery) -> Result<Page<PropertyListing>> {
        let tables = self.tables.read().await;
        let mut matched: Vec<(u64, Property)> = tables
            .properties
            .iter()
            .map(|r| (r.seq, r.snapshot()))
            .filter(|(_, p)| query.filter.matches(p))
            .collect();
        let total = matched.len() as u64;

        let mut summaries: HashMap<String, RatingSummary> = HashMap::new();
        if query.sort == SortBy::RatingDesc {
            for (_, p) in &matched {
                summaries.insert(p.id.to_string(), tables.summary(&p.id));
            }
        }
        let avg = |p: &Property| {
            summaries
                .get(p.id.as_str())
                .map(|s| s.average_rating)
                .unwrap_or(0.0)
        };

        matched.sort_by(|(sa, a), (sb, b)| {
            let tie = sb.cmp(sa);
            match query.sort {
                SortBy::Newest => newest((&a.created_at, *sa), (&b.created_at, *sb)),
                SortBy::PriceAsc => cmp_price(a, b).then(tie),
                SortBy::PriceDesc => cmp_price(b, a).then(tie),
                SortBy::BedsDesc => b.beds.cmp(&a.beds).then(tie),
                SortBy::BathsDesc => b
                    .baths
                    .partial_cmp(&a.baths)
                    .unwrap_or(Ordering::Equal)
                    .then(tie),
                SortBy::RatingDesc => avg(b)
                    .partial_cmp(&avg(a))
                    .unwrap_or(Ordering::Equal)
                    .then_with(|| newest((&a.created_at, *sa), (&b.created_at, *sb))),
            }
        });

        let (skip, limit) = match query.pagination {
            Some(p) => (
                usize::try_from(p.skip()).unwrap_or(usize::MAX),
                usize::try_from(p.limit()).unwrap_or(usize::MAX),
            ),
            None => (0, usize::MAX),
        };
        let properties = matched
            .into_iter()
            .skip(skip)
            .take(limit)
            .map(|(_, p)| match summaries.get(p.id.as_str()) {
                Some(s) => PropertyListing {
                    average_rating: Some(s.average_rating),
                    review_count: Some(s.review_count),
                    property: p,
                },
                None => PropertyListing::from(p),
            })
            .collect();
        Ok(Page { total, properties })
    }

    async fn increment_views(&self, id: &PropertyId) -> Result<Option<i64>> {
        let mut tables = self.tables.write().await;
        let Some(row) = tables.properties.iter_mut().find(|r| &r.property.id == id) else {
            return Ok(None);
        };
        let next = match row.views.as_ref().and_then(Value::as_f64) {
            Some(n) if n.is_finite() && n > 0.0 => n as i64 + 1,
            _ => 1,
        };
        row.views = Some(Value::from(next));
        Ok(Some(next))
    }

    async fn rating_summary(&self, id: &PropertyId) -> Result<RatingSummary> {
        let tables = self.tables.read().await;
        if tables.property(id).is_none() {
            return Ok(RatingSummary::default());
        }
        Ok(tables.summary(id))
    }
}

#[async_trait]
impl ReviewStore for MemoryStore {
    async fn insert_review(&self, new: &NewReview) -> Result<Review> {
        let mut tables = self.tables.write().await;
        if tables
            .reviews
            .iter()
            .any(|r| r.value.user == new.user && r.value.property == new.property)
        {
            return Err(Error::Conflict("You have already reviewed this property".into()));
        }
        let now = Utc::now();
        let review = Review {
            id: fresh_id()?,
            user: new.user.clone(),
            property: new.property.clone(),
            rating: new.rating,
            text: new.text.clone(),
            created_at: now,
            updated_at: now,
        };
        let seq = tables.next_seq();
        tables.reviews.push(Row {
            seq,
            value: review.clone(),
        });
        Ok(review)
    }

    async fn find_review(&self, id: &ReviewId) -> Result<Option<Review>> {
        let tables = self.tables.read().await;
        Ok(tables
            .reviews
            .iter()
            .find(|r| &r.value.id == id)
            .map(|r| r.value.clone()))
    }

    async fn find_user_review(
        &self,
        user: &UserId,
        property: &PropertyId,
    ) -> Result<Option<Review>> {
        let tables = self.tables.read().await;
        Ok(tables
            .reviews
            .iter()
            .find(|r| &r.value.user == user && &r.value.property == property)
            .map(|r| r.value.clone()))
    }

    async fn review_with_author(&self, id: &ReviewId) -> Result<Option<ReviewWithAuthor>> {
        let tables = self.tables.read().await;
        Ok(tables
            .reviews
            .iter()
            .find(|r| &r.value.id == id)
            .map(|r| tables.with_author(&r.value)))
    }

    async fn list_reviews(&self, property: Option<&PropertyId>) -> Result<Vec<ReviewWithAuthor>> {
        let tables = self.tables.read().await;
        let mut rows: Vec<&Row<Review>> = tables
            .reviews
            .iter()
            .filter(|r| property.map_or(true, |p| &r.value.property == p))
            .collect();
        rows.sort_by(|a, b| newest((&a.value.created_at, a.seq), (&b.value.created_at, b.seq)));
        Ok(rows.into_iter().map(|r| tables.with_author(&r.value)).collect())
    }

    async fn update_review(&self, id: &ReviewId, patch: &ReviewPatch) -> Result<Option<Review>> {
        let mut tables = self.tables.write().await;
        let Some(row) = tables.reviews.iter_mut().find(|r| &r.value.id == id) else {
            return Ok(None);
        };
        patch.apply_to(&mut row.value);
        row.value.updated_at = Utc::now();
        Ok(Some(row.value.clone()))
    }

    async fn delete_review(&self, id: &ReviewId) -> Result<bool> {
        let mut tables = self.tables.write().await;
        let before = tables.reviews.len();
        tables.reviews.retain(|r| &r.value.id != id);
        Ok(tables.reviews.len() < before)
    }
}

#[async_trait]
impl UserStore for MemoryStore {
    async fn upsert_user(&self, user: &User) -> Result<()> {
        let mut tables = self.tables.write().await;
        match tables.users.get_mut(user.id.as_str()) {
            Some(existing) => {
                existing.email.clone_from(&user.email);
                if user.username.is_some() {
                    existing.username.clone_from(&user.username);
                }
                if user.image.is_some() {
                    existing.image.clone_from(&user.image);
                }
                existing.updated_at = Utc::now();
            }
            None => {
                let mut fresh = user.clone();
                fresh.bookmarks.clear();
                fresh.updated_at = Utc::now();
                tables.users.insert(user.id.to_string(), fresh);
            }
        }
        Ok(())
    }

    async fn find_user(&self, id: &UserId) -> Result<Option<User>> {
        let tables = self.tables.read().await;
        Ok(tables.users.get(id.as_str()).cloned())
    }

    async fn toggle_bookmark(&self, user: &UserId, property: &PropertyId) -> Result<Option<bool>> {
        let mut tables = self.tables.write().await;
        let Some(user) = tables.users.get_mut(user.as_str()) else {
            return Ok(None);
        };
        let before = user.bookmarks.len();
        user.bookmarks.retain(|b| b != property);
        if user.bookmarks.len() < before {
            return Ok(Some(false));
        }
        user.bookmarks.push(property.clone());
        Ok(Some(true))
    }

    async fn is_bookmarked(&self, user: &UserId, property: &PropertyId) -> Result<bool> {
        let tables = self.tables.read().await;
        Ok(tables
            .users
            .get(user.as_str())
            .is_some_and(|u| u.bookmarks.contains(property)))
    }
}

#[async_trait]
impl MessageStore for MemoryStore {
    async fn insert_message(&self, new: &NewMessage) -> Result<Message> {
        let mut tables = self.tables.write().await;
        let now = Utc::now();
        let message = Message {
            id: fresh_id()?,
            sender: new.sender.clone(),
            recipient: new.recipient.clone(),
            property: new.property.clone(),
            name: new.name.clone(),
            email: new.email.clone(),
            phone: new.phone.clone(),
            body: new.body.clone(),
            read: false,
            has_reply: false,
            is_reply: new.is_reply,
            reply_to: new.reply_to.clone(),
            created_at: now,
            updated_at: now,
        };
        let seq = tables.next_seq();
        tables.messages.push(Row {
            seq,
            value: message.clone(),
        });
        Ok(message)
    }

    async fn find_message(&self, id: &MessageId) -> Result<Option<Message>> {
        let tables = self.tables.read().await;
        Ok(tables
            .messages
            .iter()
            .find(|r| &r.value.id == id)
            .map(|r| r.value.clone()))
    }

    async fn mark_replied(&self, id: &MessageId) -> Result<bool> {
        let mut tables = self.tables.write().await;
        let Some(row) = tables.messages.iter_mut().find(|r| &r.value.id == id) else {
            return Ok(false);
        };
        row.value.has_reply = true;
        row.value.read = true;
        row.value.updated_at = Utc::now();
        Ok(true)
    }

    async fn toggle_read(&self, id: &MessageId) -> Result<Option<bool>> {
        let mut tables = self.tables.write().await;
        let Some(row) = tables.messages.iter_mut().find(|r| &r.value.id == id) else {
            return Ok(None);
        };
        row.value.read = !row.value.read;
        row.value.updated_at = Utc::now();
        Ok(Some(row.value.read))
    }

    async fn delete_message(&self, id: &MessageId) -> Result<bool> {
        let mut tables = self.tables.write().await;
        let before = tables.messages.len();
        tables.messages.retain(|r| &r.value.id != id);
        Ok(tables.messages.len() < before)
    }

    async fn inbox(&self, recipient: &UserId) -> Result<Vec<Message>> {
        let tables = self.tables.read().await;
        let mut rows: Vec<&Row<Message>> = tables
            .messages
            .iter()
            .filter(|r| &r.value.recipient == recipient)
            .collect();
        rows.sort_by(|a, b| {
            a.value
                .read
                .cmp(&b.value.read)
                .then_with(|| newest((&a.value.created_at, a.seq), (&b.value.created_at, b.seq)))
        });
        Ok(rows.into_iter().map(|r| r.value.clone()).collect())
    }

    async fn unread_count(&self, recipient: &UserId) -> Result<u64> {
        let tables = self.tables.read().await;
        Ok(tables
            .messages
            .iter()
            .filter(|r| &r.value.recipient == recipient && !r.value.read)
            .count() as u64)
    }
}

#[async_trait]
impl Store for MemoryStore {
    async fn ping(&self) -> Result<()> {
        Ok(())
    }

    fn backend(&self) -> &'static str {
        "memory"
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn stored_views_read_as_non_negative_integers() {
        assert_eq!(json_views(None), 0);
        assert_eq!(json_views(Some(&Value::Null)), 0);
        assert_eq!(json_views(Some(&json!("12"))), 0);
        assert_eq!(json_views(Some(&json!(-3))), 0);
        assert_eq!(json_views(Some(&json!(41))), 41);
    }

    #[test]
    fn missing_rates_sort_first_ascending() {
        let now = Utc::now();
        let base = Property {
            id: PropertyId::parse(&"a".repeat(24)).unwrap(),
            owner: UserId::parse(&"b".repeat(24)).unwrap(),
            name: "n".into(),
            property_type: "House".into(),
            description: None,
            location: Default::default(),
            beds: 1,
            baths: 1.0,
            square_feet: 1,
            amenities: vec![],
            rates: Default::default(),
            seller_info: Default::default(),
            images: vec![],
            views: 0,
            is_featured: false,
            created_at: now,
            updated_at: now,
        };
        let mut monthly = base.clone();
        monthly.rates.monthly = Some(2000.0);
        let mut weekly = base.clone();
        weekly.rates.weekly = Some(500.0);

        assert_eq!(cmp_price(&weekly, &monthly), Ordering::Less);
        assert_eq!(cmp_price(&base, &weekly), Ordering::Less);
    }
}
