//! Entity schemas as stored in MongoDB, and conversions to domain types.
//!
//! Numeric fields are read as `f64` so rows written by other clients
//! (int32, int64 or double) all decode. `views` is read as raw BSON because
//! older rows may hold null, a string or nothing at all.

use bson::oid::ObjectId;
use bson::{Bson, DateTime};
use serde::{Deserialize, Serialize};

use pulse_core::{
    Error, Location, Message, MessageId, NewMessage, NewProperty, NewReview, Property,
    PropertyId, Rates, Rating, Result, Review, ReviewAuthor, ReviewId, ReviewWithAuthor,
    SellerInfo, User, UserId,
};

use crate::error::corrupt;

/// Parse a validated domain id into an object id.
pub(crate) fn oid(raw: &str) -> Result<ObjectId> {
    ObjectId::parse_str(raw).map_err(|_| Error::invalid(format!("Invalid id: {raw:?}")))
}

fn property_id(id: ObjectId) -> Result<PropertyId> {
    PropertyId::parse(&id.to_hex()).map_err(|_| corrupt("property id"))
}

fn user_id(id: ObjectId) -> Result<UserId> {
    UserId::parse(&id.to_hex()).map_err(|_| corrupt("user id"))
}

fn review_id(id: ObjectId) -> Result<ReviewId> {
    ReviewId::parse(&id.to_hex()).map_err(|_| corrupt("review id"))
}

fn message_id(id: ObjectId) -> Result<MessageId> {
    MessageId::parse(&id.to_hex()).map_err(|_| corrupt("message id"))
}

/// Missing timestamps fall back to the creation time encoded in the id.
fn stamp(at: Option<DateTime>, id: &ObjectId) -> chrono::DateTime<chrono::Utc> {
    at.unwrap_or_else(|| id.timestamp()).to_chrono()
}

/// Read a stored view counter. Absent, null and non-numeric values count as 0.
pub fn normalize_views(raw: Option<&Bson>) -> i64 {
    let n = match raw {
        Some(Bson::Int32(n)) => *n as i64,
        Some(Bson::Int64(n)) => *n,
        Some(Bson::Double(f)) if f.is_finite() => *f as i64,
        _ => 0,
    };
    n.max(0)
}

/// Numeric field from an aggregation result.
pub(crate) fn bson_f64(raw: Option<&Bson>) -> f64 {
    match raw {
        Some(Bson::Int32(n)) => *n as f64,
        Some(Bson::Int64(n)) => *n as f64,
        Some(Bson::Double(f)) if f.is_finite() => *f,
        _ => 0.0,
    }
}

fn count(raw: f64) -> u32 {
    if raw.is_finite() && raw > 0.0 {
        raw.round().min(u32::MAX as f64) as u32
    } else {
        0
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PropertyDoc {
    #[serde(rename = "_id")]
    pub id: ObjectId,
    pub owner: ObjectId,
    pub name: String,
    #[serde(rename = "type")]
    pub property_type: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(default)]
    pub location: Location,
    #[serde(default)]
    pub beds: f64,
    #[serde(default)]
    pub baths: f64,
    #[serde(default)]
    pub square_feet: f64,
    #[serde(default)]
    pub amenities: Vec<String>,
    #[serde(default)]
    pub rates: Rates,
    #[serde(default)]
    pub seller_info: SellerInfo,
    #[serde(default)]
    pub images: Vec<String>,
    #[serde(default)]
    pub views: Option<Bson>,
    #[serde(default)]
    pub is_featured: bool,
    #[serde(rename = "createdAt", default)]
    pub created_at: Option<DateTime>,
    #[serde(rename = "updatedAt", default)]
    pub updated_at: Option<DateTime>,
}

impl PropertyDoc {
    pub fn from_new(new: &NewProperty) -> Result<Self> {
        let now = DateTime::now();
        Ok(Self {
            id: ObjectId::new(),
            owner: oid(new.owner.as_str())?,
            name: new.name.clone(),
            property_type: new.property_type.clone(),
            description: new.description.clone(),
            location: new.location.clone(),
            beds: new.beds as f64,
            baths: new.baths,
            square_feet: new.square_feet as f64,
            amenities: new.amenities.clone(),
            rates: new.rates,
            seller_info: new.seller_info.clone(),
            images: new.images.clone(),
            views: Some(Bson::Int64(0)),
            is_featured: new.is_featured,
            created_at: Some(now),
            updated_at: Some(now),
        })
    }

    pub fn into_property(self) -> Result<Property> {
        Ok(Property {
            views: normalize_views(self.views.as_ref()),
            created_at: stamp(self.created_at, &self.id),
            updated_at: stamp(self.updated_at.or(self.created_at), &self.id),
            id: property_id(self.id)?,
            owner: user_id(self.owner)?,
            name: self.name,
            property_type: self.property_type,
            description: self.description,
            location: self.location,
            beds: count(self.beds),
            baths: if self.baths.is_finite() { self.baths.max(0.0) } else { 0.0 },
            square_feet: count(self.square_feet),
            amenities: self.amenities,
            rates: self.rates,
            seller_info: self.seller_info,
            images: self.images,
            is_featured: self.is_featured,
        })
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ReviewDoc {
    #[serde(rename = "_id")]
    pub id: ObjectId,
    pub user: ObjectId,
    pub property: ObjectId,
    pub rating: i32,
    pub text: String,
    #[serde(rename = "createdAt", default)]
    pub created_at: Option<DateTime>,
    #[serde(rename = "updatedAt", default)]
    pub updated_at: Option<DateTime>,
}

impl ReviewDoc {
    pub fn from_new(new: &NewReview) -> Result<Self> {
        let now = DateTime::now();
        Ok(Self {
            id: ObjectId::new(),
            user: oid(new.user.as_str())?,
            property: oid(new.property.as_str())?,
            rating: new.rating.get() as i32,
            text: new.text.clone(),
            created_at: Some(now),
            updated_at: Some(now),
        })
    }

    pub fn into_review(self) -> Result<Review> {
        Ok(Review {
            created_at: stamp(self.created_at, &self.id),
            updated_at: stamp(self.updated_at.or(self.created_at), &self.id),
            id: review_id(self.id)?,
            user: user_id(self.user)?,
            property: property_id(self.property)?,
            rating: Rating::new(self.rating as i64).map_err(|_| corrupt("review rating"))?,
            text: self.text,
        })
    }
}

/// Author projection produced by the reviews → users lookup.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AuthorDoc {
    #[serde(rename = "_id")]
    pub id: ObjectId,
    #[serde(default)]
    pub username: Option<String>,
    #[serde(default)]
    pub image: Option<String>,
}

/// A review row with the joined author.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ReviewJoinedDoc {
    #[serde(rename = "_id")]
    pub id: ObjectId,
    pub user: ObjectId,
    pub property: ObjectId,
    pub rating: i32,
    pub text: String,
    #[serde(rename = "createdAt", default)]
    pub created_at: Option<DateTime>,
    #[serde(rename = "updatedAt", default)]
    pub updated_at: Option<DateTime>,
    #[serde(default)]
    pub author: Option<AuthorDoc>,
}

impl ReviewJoinedDoc {
    pub fn into_review_with_author(self) -> Result<ReviewWithAuthor> {
        let author = match self.author {
            Some(a) => Some(ReviewAuthor {
                id: user_id(a.id)?,
                username: a.username,
                image: a.image,
            }),
            None => None,
        };
        let review = ReviewDoc {
            id: self.id,
            user: self.user,
            property: self.property,
            rating: self.rating,
            text: self.text,
            created_at: self.created_at,
            updated_at: self.updated_at,
        }
        .into_review()?;
        Ok(ReviewWithAuthor::from_parts(review, author))
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct UserDoc {
    #[serde(rename = "_id")]
    pub id: ObjectId,
    #[serde(default)]
    pub email: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub username: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub image: Option<String>,
    #[serde(default)]
    pub bookmarks: Vec<ObjectId>,
    #[serde(rename = "createdAt", default)]
    pub created_at: Option<DateTime>,
    #[serde(rename = "updatedAt", default)]
    pub updated_at: Option<DateTime>,
}

impl UserDoc {
    pub fn into_user(self) -> Result<User> {
        let bookmarks = self
            .bookmarks
            .into_iter()
            .map(property_id)
            .collect::<Result<Vec<_>>>()?;
        Ok(User {
            created_at: stamp(self.created_at, &self.id),
            updated_at: stamp(self.updated_at.or(self.created_at), &self.id),
            id: user_id(self.id)?,
            email: self.email,
            username: self.username,
            image: self.image,
            bookmarks,
        })
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MessageDoc {
    #[serde(rename = "_id")]
    pub id: ObjectId,
    pub sender: ObjectId,
    pub recipient: ObjectId,
    pub property: ObjectId,
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub email: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub phone: Option<String>,
    #[serde(default)]
    pub body: String,
    #[serde(default)]
    pub read: bool,
    #[serde(default)]
    pub has_reply: bool,
    #[serde(default)]
    pub is_reply: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub reply_to: Option<ObjectId>,
    #[serde(default)]
    pub created_at: Option<DateTime>,
    #[serde(default)]
    pub updated_at: Option<DateTime>,
}

impl MessageDoc {
    pub fn from_new(new: &NewMessage) -> Result<Self> {
        let now = DateTime::now();
        Ok(Self {
            id: ObjectId::new(),
            sender: oid(new.sender.as_str())?,
            recipient: oid(new.recipient.as_str())?,
            property: oid(new.property.as_str())?,
            name: new.name.clone(),
            email: new.email.clone(),
            phone: new.phone.clone(),
            body: new.body.clone(),
            read: false,
            has_reply: false,
            is_reply: new.is_reply,
            reply_to: new.reply_to.as_ref().map(|r| oid(r.as_str())).transpose()?,
            created_at: Some(now),
            updated_at: Some(now),
        })
    }

    pub fn into_message(self) -> Result<Message> {
        Ok(Message {
            created_at: stamp(self.created_at, &self.id),
            updated_at: stamp(self.updated_at.or(self.created_at), &self.id),
            id: message_id(self.id)?,
            sender: user_id(self.sender)?,
            recipient: user_id(self.recipient)?,
            property: property_id(self.property)?,
            name: self.name,
            email: self.email,
            phone: self.phone,
            body: self.body,
            read: self.read,
            has_reply: self.has_reply,
            is_reply: self.is_reply,
            reply_to: self.reply_to.map(message_id).transpose()?,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use bson::doc;

    #[test]
    fn views_normalization() {
        assert_eq!(normalize_views(None), 0);
        assert_eq!(normalize_views(Some(&Bson::Null)), 0);
        assert_eq!(normalize_views(Some(&Bson::String("12".into()))), 0);
        assert_eq!(normalize_views(Some(&Bson::Int32(7))), 7);
        assert_eq!(normalize_views(Some(&Bson::Int64(9))), 9);
        assert_eq!(normalize_views(Some(&Bson::Double(3.0))), 3);
        assert_eq!(normalize_views(Some(&Bson::Int32(-4))), 0);
        assert_eq!(normalize_views(Some(&Bson::Double(f64::NAN))), 0);
    }

    #[test]
    fn legacy_property_row_decodes() {
        let id = ObjectId::new();
        let owner = ObjectId::new();
        let row = doc! {
            "_id": id,
            "owner": owner,
            "name": "Beach House",
            "type": "House",
            "beds": 3_i32,
            "baths": 2.5,
            "square_feet": 1800_i64,
            "views": "lots",
            "rates": { "weekly": 900_i32 },
        };
        let property = bson::from_document::<PropertyDoc>(row)
            .unwrap()
            .into_property()
            .unwrap();
        assert_eq!(property.id.as_str(), id.to_hex());
        assert_eq!(property.beds, 3);
        assert_eq!(property.baths, 2.5);
        assert_eq!(property.square_feet, 1800);
        assert_eq!(property.views, 0);
        assert_eq!(property.rates.weekly, Some(900.0));
        assert!(!property.is_featured);
        assert_eq!(property.created_at, id.timestamp().to_chrono());
    }

    #[test]
    fn out_of_range_rating_is_corrupt() {
        let row = ReviewDoc {
            id: ObjectId::new(),
            user: ObjectId::new(),
            property: ObjectId::new(),
            rating: 9,
            text: "x".into(),
            created_at: None,
            updated_at: None,
        };
        assert!(matches!(
            row.into_review(),
            Err(Error::DependencyUnavailable(_))
        ));
    }

    #[test]
    fn joined_review_without_author_keeps_user_id() {
        let user = ObjectId::new();
        let row = ReviewJoinedDoc {
            id: ObjectId::new(),
            user,
            property: ObjectId::new(),
            rating: 4,
            text: "Nice".into(),
            created_at: Some(DateTime::now()),
            updated_at: None,
            author: None,
        };
        let joined = row.into_review_with_author().unwrap();
        assert_eq!(joined.user.id.as_str(), user.to_hex());
        assert_eq!(joined.user.username, None);
    }

    #[test]
    fn message_field_names_match_collection() {
        let new = NewMessage {
            sender: UserId::parse(&"a".repeat(24)).unwrap(),
            recipient: UserId::parse(&"b".repeat(24)).unwrap(),
            property: PropertyId::parse(&"c".repeat(24)).unwrap(),
            name: "Sam".into(),
            email: "sam@example.com".into(),
            phone: None,
            body: "hi".into(),
            is_reply: true,
            reply_to: Some(MessageId::parse(&"d".repeat(24)).unwrap()),
        };
        let row = bson::to_document(&MessageDoc::from_new(&new).unwrap()).unwrap();
        assert!(row.contains_key("hasReply"));
        assert!(row.contains_key("isReply"));
        assert!(row.contains_key("replyTo"));
        assert!(row.contains_key("createdAt"));
        assert_eq!(row.get_bool("read").unwrap(), false);
    }
}
