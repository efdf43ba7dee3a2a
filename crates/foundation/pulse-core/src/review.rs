//! Star ratings and reviews. One review per (user, property).

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::{non_blank, Error, PropertyId, Result, ReviewId, UserId};

pub const MIN_RATING: u8 = 1;
pub const MAX_RATING: u8 = 5;

/// A star rating, always within `1..=5`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(try_from = "i64", into = "u8")]
pub struct Rating(u8);

impl Rating {
    pub fn new(value: i64) -> Result<Self> {
        if (MIN_RATING as i64..=MAX_RATING as i64).contains(&value) {
            Ok(Self(value as u8))
        } else {
            Err(out_of_range())
        }
    }

    pub fn get(self) -> u8 {
        self.0
    }

    /// Accept a JSON number or a numeric string, the way form posts send it.
    pub fn from_json(value: &Value) -> Result<Self> {
        match value {
            Value::Number(n) => match (n.as_i64(), n.as_f64()) {
                (Some(i), _) => Self::new(i),
                (None, Some(f)) if f.fract() == 0.0 => Self::new(f as i64),
                _ => Err(out_of_range()),
            },
            Value::String(s) => s
                .trim()
                .parse::<i64>()
                .map_err(|_| out_of_range())
                .and_then(Self::new),
            _ => Err(out_of_range()),
        }
    }
}

impl TryFrom<i64> for Rating {
    type Error = Error;

    fn try_from(value: i64) -> Result<Self> {
        Self::new(value)
    }
}

impl From<Rating> for u8 {
    fn from(rating: Rating) -> u8 {
        rating.0
    }
}

fn out_of_range() -> Error {
    Error::invalid(format!(
        "Rating must be between {MIN_RATING} and {MAX_RATING}"
    ))
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Review {
    #[serde(rename = "_id")]
    pub id: ReviewId,
    pub user: UserId,
    pub property: PropertyId,
    pub rating: Rating,
    pub text: String,
    #[serde(rename = "createdAt")]
    pub created_at: DateTime<Utc>,
    #[serde(rename = "updatedAt")]
    pub updated_at: DateTime<Utc>,
}

/// A validated review ready for insertion.
#[derive(Debug, Clone, PartialEq)]
pub struct NewReview {
    pub user: UserId,
    pub property: PropertyId,
    pub rating: Rating,
    pub text: String,
}

/// Body of a create-review request.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ReviewForm {
    #[serde(default)]
    pub property_id: Option<String>,
    #[serde(default)]
    pub rating: Option<Value>,
    #[serde(default)]
    pub text: Option<String>,
}

impl ReviewForm {
    pub fn validate(self, user: &UserId) -> Result<NewReview> {
        let property_id = non_blank(self.property_id);
        let text = non_blank(self.text);
        let rating = self.rating.filter(|r| !r.is_null());

        let (Some(property_id), Some(rating), Some(text)) = (property_id, rating, text) else {
            return Err(Error::invalid("Please fill in all fields"));
        };

        Ok(NewReview {
            user: user.clone(),
            property: PropertyId::parse(&property_id)?,
            rating: Rating::from_json(&rating)?,
            text,
        })
    }
}

/// Body of an update-review request.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct ReviewUpdateForm {
    #[serde(default)]
    pub rating: Option<Value>,
    #[serde(default)]
    pub text: Option<String>,
}

impl ReviewUpdateForm {
    /// Null rating and blank text count as "not supplied".
    pub fn validate(self) -> Result<ReviewPatch> {
        let rating = match self.rating {
            None | Some(Value::Null) => None,
            Some(value) => Some(Rating::from_json(&value)?),
        };
        Ok(ReviewPatch {
            rating,
            text: non_blank(self.text),
        })
    }
}

/// Validated partial update. Omitted fields keep their stored values.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ReviewPatch {
    pub rating: Option<Rating>,
    pub text: Option<String>,
}

impl ReviewPatch {
    pub fn is_empty(&self) -> bool {
        self.rating.is_none() && self.text.is_none()
    }

    pub fn apply_to(&self, review: &mut Review) {
        if let Some(rating) = self.rating {
            review.rating = rating;
        }
        if let Some(text) = &self.text {
            review.text.clone_from(text);
        }
    }
}

/// Minimal author projection joined onto reviews.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ReviewAuthor {
    #[serde(rename = "_id")]
    pub id: UserId,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub username: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub image: Option<String>,
}

/// A review with its author joined in place of the bare user reference.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ReviewWithAuthor {
    #[serde(rename = "_id")]
    pub id: ReviewId,
    pub user: ReviewAuthor,
    pub property: PropertyId,
    pub rating: Rating,
    pub text: String,
    #[serde(rename = "createdAt")]
    pub created_at: DateTime<Utc>,
    #[serde(rename = "updatedAt")]
    pub updated_at: DateTime<Utc>,
}

impl ReviewWithAuthor {
    /// A deleted author degrades to a projection carrying only the id.
    pub fn from_parts(review: Review, author: Option<ReviewAuthor>) -> Self {
        let user = author.unwrap_or(ReviewAuthor {
            id: review.user.clone(),
            username: None,
            image: None,
        });
        Self {
            id: review.id,
            user,
            property: review.property,
            rating: review.rating,
            text: review.text,
            created_at: review.created_at,
            updated_at: review.updated_at,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn user() -> UserId {
        UserId::parse("aaaaaaaaaaaaaaaaaaaaaaaa").unwrap()
    }

    #[test]
    fn rating_bounds() {
        assert!(Rating::new(0).is_err());
        assert_eq!(Rating::new(1).unwrap().get(), 1);
        assert_eq!(Rating::new(5).unwrap().get(), 5);
        assert!(Rating::new(6).is_err());
    }

    #[test]
    fn rating_from_form_values() {
        assert_eq!(Rating::from_json(&json!("4")).unwrap().get(), 4);
        assert_eq!(Rating::from_json(&json!(3)).unwrap().get(), 3);
        assert_eq!(Rating::from_json(&json!(2.0)).unwrap().get(), 2);
        assert!(Rating::from_json(&json!(4.5)).is_err());
        assert!(Rating::from_json(&json!("five")).is_err());
        assert!(Rating::from_json(&json!(true)).is_err());
    }

    #[test]
    fn form_requires_all_fields() {
        let form = ReviewForm {
            property_id: Some("bbbbbbbbbbbbbbbbbbbbbbbb".into()),
            rating: Some(json!(4)),
            text: Some("   ".into()),
        };
        assert_eq!(
            form.validate(&user()).unwrap_err(),
            Error::invalid("Please fill in all fields")
        );
    }

    #[test]
    fn form_rejects_out_of_range_rating() {
        let form: ReviewForm = serde_json::from_value(json!({
            "propertyId": "bbbbbbbbbbbbbbbbbbbbbbbb",
            "rating": 7,
            "text": "Great stay"
        }))
        .unwrap();
        assert_eq!(
            form.validate(&user()).unwrap_err(),
            Error::invalid("Rating must be between 1 and 5")
        );
    }

    #[test]
    fn form_validates() {
        let form: ReviewForm = serde_json::from_value(json!({
            "propertyId": "bbbbbbbbbbbbbbbbbbbbbbbb",
            "rating": "5",
            "text": "Great stay"
        }))
        .unwrap();
        let review = form.validate(&user()).unwrap();
        assert_eq!(review.rating.get(), 5);
        assert_eq!(review.text, "Great stay");
    }

    #[test]
    fn update_form_treats_blank_as_absent() {
        let patch = ReviewUpdateForm {
            rating: Some(Value::Null),
            text: Some("".into()),
        }
        .validate()
        .unwrap();
        assert!(patch.is_empty());

        let bad = ReviewUpdateForm {
            rating: Some(json!(9)),
            text: None,
        };
        assert!(bad.validate().is_err());
    }

    #[test]
    fn rating_serializes_as_number() {
        let r = Rating::new(4).unwrap();
        assert_eq!(serde_json::to_value(r).unwrap(), json!(4));
        let back: Rating = serde_json::from_value(json!(4)).unwrap();
        assert_eq!(back, r);
    }
}
