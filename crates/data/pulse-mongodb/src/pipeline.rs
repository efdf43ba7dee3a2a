//! Query, update and aggregation documents.
//!
//! Everything here is a pure builder so stage order can be checked without
//! a server.

use bson::oid::ObjectId;
use bson::{doc, Bson, DateTime, Document};

use pulse_core::{PropertyFilter, PropertyPatch, ReviewPatch, Result, SortBy};

use crate::schema::oid;
use crate::{REVIEWS, USERS};

/// Fields searched by the free-text location filter.
pub const LOCATION_FIELDS: [&str; 6] = [
    "name",
    "description",
    "location.street",
    "location.city",
    "location.state",
    "location.zipcode",
];

/// User input is matched literally, never as a pattern.
fn contains_ci(raw: &str) -> Document {
    doc! { "$regex": regex::escape(raw), "$options": "i" }
}

pub fn property_filter(filter: &PropertyFilter) -> Result<Document> {
    let mut query = Document::new();
    if let Some(location) = &filter.location {
        let pattern = contains_ci(location);
        let any: Vec<Bson> = LOCATION_FIELDS
            .iter()
            .map(|field| {
                let mut clause = Document::new();
                clause.insert(*field, pattern.clone());
                Bson::Document(clause)
            })
            .collect();
        query.insert("$or", any);
    }
    if let Some(kind) = &filter.property_type {
        query.insert("type", contains_ci(kind));
    }
    if let Some(owner) = &filter.owner {
        query.insert("owner", oid(owner.as_str())?);
    }
    if let Some(featured) = filter.featured {
        query.insert("is_featured", featured);
    }
    Ok(query)
}

/// Sort document for every order except `RatingDesc`, which needs the
/// aggregation in [`rated_listing`]. `_id` breaks ties so pages are stable.
pub fn sort_spec(sort: SortBy) -> Document {
    match sort {
        SortBy::Newest | SortBy::RatingDesc => doc! { "createdAt": -1, "_id": -1 },
        SortBy::PriceAsc => doc! {
            "rates.monthly": 1,
            "rates.weekly": 1,
            "rates.nightly": 1,
            "_id": -1,
        },
        SortBy::PriceDesc => doc! {
            "rates.monthly": -1,
            "rates.weekly": -1,
            "rates.nightly": -1,
            "_id": -1,
        },
        SortBy::BedsDesc => doc! { "beds": -1, "_id": -1 },
        SortBy::BathsDesc => doc! { "baths": -1, "_id": -1 },
    }
}

fn reviews_lookup() -> Document {
    doc! {
        "$lookup": {
            "from": REVIEWS,
            "localField": "_id",
            "foreignField": "property",
            "as": "reviews",
        }
    }
}

fn rating_fields() -> Document {
    doc! {
        "averageRating": { "$ifNull": [{ "$avg": "$reviews.rating" }, 0.0] },
        "reviewCount": { "$size": "$reviews" },
    }
}

/// Average rating and review count of one property.
pub fn rating_summary(property: ObjectId) -> Vec<Document> {
    let mut project = doc! { "_id": 0 };
    for (key, value) in rating_fields() {
        project.insert(key, value);
    }
    vec![
        doc! { "$match": { "_id": property } },
        reviews_lookup(),
        doc! { "$project": project },
    ]
}

/// Listing sorted by average rating: match, join reviews, compute, drop the
/// joined array, sort, then paginate.
pub fn rated_listing(filter: Document, skip: u64, limit: Option<u64>) -> Vec<Document> {
    let mut stages = Vec::with_capacity(7);
    if !filter.is_empty() {
        stages.push(doc! { "$match": filter });
    }
    stages.push(reviews_lookup());
    stages.push(doc! { "$addFields": rating_fields() });
    stages.push(doc! { "$project": { "reviews": 0 } });
    stages.push(doc! { "$sort": { "averageRating": -1, "createdAt": -1, "_id": -1 } });
    if skip > 0 {
        stages.push(doc! { "$skip": clamp_i64(skip) });
    }
    if let Some(limit) = limit {
        stages.push(doc! { "$limit": clamp_i64(limit) });
    }
    stages
}

/// Server-side counts are signed; anything past `i64::MAX` pins to it.
pub fn clamp_i64(n: u64) -> i64 {
    i64::try_from(n).unwrap_or(i64::MAX)
}

/// Update pipeline that adds one view. A missing, null, non-numeric or
/// non-positive counter restarts at 1.
pub fn increment_views() -> Vec<Document> {
    vec![doc! {
        "$set": {
            "views": {
                "$cond": [
                    { "$and": [{ "$isNumber": "$views" }, { "$gt": ["$views", 0] }] },
                    { "$add": ["$views", 1] },
                    1,
                ]
            }
        }
    }]
}

/// Update pipeline that flips `read`. A missing flag counts as unread.
pub fn toggle_read() -> Vec<Document> {
    vec![doc! {
        "$set": {
            "read": { "$not": [{ "$eq": ["$read", true] }] },
            "updatedAt": "$$NOW",
        }
    }]
}

/// Update pipeline that adds `property` to `bookmarks` when absent and
/// removes it when present, in one write. A missing array counts as empty.
pub fn toggle_bookmark(property: ObjectId) -> Vec<Document> {
    let current = doc! { "$ifNull": ["$bookmarks", []] };
    vec![doc! {
        "$set": {
            "bookmarks": {
                "$cond": [
                    { "$in": [property, current.clone()] },
                    {
                        "$filter": {
                            "input": current.clone(),
                            "cond": { "$ne": ["$$this", property] },
                        }
                    },
                    { "$concatArrays": [current, [property]] },
                ]
            },
            "updatedAt": "$$NOW",
        }
    }]
}

/// Messages addressed to `recipient` that have not been read. A missing
/// flag counts as unread.
pub fn unread_filter(recipient: ObjectId) -> Document {
    doc! { "recipient": recipient, "read": { "$ne": true } }
}

/// Reviews matching `filter`, newest first, with the author joined.
pub fn reviews_with_author(filter: Document) -> Vec<Document> {
    vec![
        doc! { "$match": filter },
        doc! { "$sort": { "createdAt": -1, "_id": -1 } },
        doc! {
            "$lookup": {
                "from": USERS,
                "localField": "user",
                "foreignField": "_id",
                "as": "author",
            }
        },
        doc! { "$unwind": { "path": "$author", "preserveNullAndEmptyArrays": true } },
        doc! {
            "$project": {
                "user": 1,
                "property": 1,
                "rating": 1,
                "text": 1,
                "createdAt": 1,
                "updatedAt": 1,
                "author._id": 1,
                "author.username": 1,
                "author.image": 1,
            }
        },
    ]
}

fn set_opt(set: &mut Document, key: &str, value: &Option<String>) {
    if let Some(v) = value {
        set.insert(key, v.clone());
    }
}

fn set_rate(set: &mut Document, key: &str, value: Option<f64>) {
    if let Some(v) = value {
        set.insert(key, v);
    }
}

/// `$set` document for a property patch. Nested fields are set one by one
/// so unspecified siblings survive.
pub fn property_update(patch: &PropertyPatch) -> Document {
    let mut set = Document::new();
    set_opt(&mut set, "name", &patch.name);
    set_opt(&mut set, "type", &patch.property_type);
    set_opt(&mut set, "description", &patch.description);
    if let Some(loc) = &patch.location {
        set_opt(&mut set, "location.street", &loc.street);
        set_opt(&mut set, "location.city", &loc.city);
        set_opt(&mut set, "location.state", &loc.state);
        set_opt(&mut set, "location.zipcode", &loc.zipcode);
    }
    if let Some(beds) = patch.beds {
        set.insert("beds", beds as i64);
    }
    if let Some(baths) = patch.baths {
        set.insert("baths", baths);
    }
    if let Some(square_feet) = patch.square_feet {
        set.insert("square_feet", square_feet as i64);
    }
    if let Some(amenities) = &patch.amenities {
        set.insert("amenities", amenities.clone());
    }
    if let Some(rates) = &patch.rates {
        set_rate(&mut set, "rates.nightly", rates.nightly);
        set_rate(&mut set, "rates.weekly", rates.weekly);
        set_rate(&mut set, "rates.monthly", rates.monthly);
    }
    if let Some(seller) = &patch.seller_info {
        set_opt(&mut set, "seller_info.name", &seller.name);
        set_opt(&mut set, "seller_info.email", &seller.email);
        set_opt(&mut set, "seller_info.phone", &seller.phone);
    }
    set.insert("updatedAt", DateTime::now());
    doc! { "$set": set }
}

pub fn review_update(patch: &ReviewPatch) -> Document {
    let mut set = Document::new();
    if let Some(rating) = patch.rating {
        set.insert("rating", rating.get() as i32);
    }
    set_opt(&mut set, "text", &patch.text);
    set.insert("updatedAt", DateTime::now());
    doc! { "$set": set }
}

/// First-stage operator name of each stage, for diagnostics and tests.
pub fn stage_names(pipeline: &[Document]) -> Vec<String> {
    pipeline
        .iter()
        .filter_map(|stage| stage.keys().next().cloned())
        .collect()
}
