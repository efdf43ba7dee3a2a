//! Listing queries: filter, sort order, pagination and the rating projection.

use serde::{Deserialize, Serialize};

use crate::{non_blank, Error, Property, Rating, Result, UserId};

/// Sort orders accepted by the listing endpoints.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum SortBy {
    /// `createdAt` descending. Used for empty and unknown values.
    #[default]
    Newest,
    /// Monthly, then weekly, then nightly rate ascending.
    PriceAsc,
    PriceDesc,
    /// Average review rating descending (computed, never stored).
    RatingDesc,
    BedsDesc,
    BathsDesc,
}

impl SortBy {
    pub fn parse(raw: &str) -> Self {
        match raw.trim() {
            "price_asc" => SortBy::PriceAsc,
            "price_desc" => SortBy::PriceDesc,
            "rating_desc" => SortBy::RatingDesc,
            "beds_desc" => SortBy::BedsDesc,
            "baths_desc" => SortBy::BathsDesc,
            _ => SortBy::Newest,
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            SortBy::Newest => "",
            SortBy::PriceAsc => "price_asc",
            SortBy::PriceDesc => "price_desc",
            SortBy::RatingDesc => "rating_desc",
            SortBy::BedsDesc => "beds_desc",
            SortBy::BathsDesc => "baths_desc",
        }
    }
}

/// One-based page number and page size.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Pagination {
    pub page: u64,
    pub page_size: u64,
}

impl Pagination {
    /// Clamp the page to at least 1 and the size to `1..=max_size`.
    pub fn new(page: u64, page_size: u64, max_size: u64) -> Self {
        Self {
            page: page.max(1),
            page_size: page_size.clamp(1, max_size.max(1)),
        }
    }

    /// Parse raw query parameters. Absent values take the defaults.
    pub fn from_params(
        page: Option<&str>,
        page_size: Option<&str>,
        default_size: u64,
        max_size: u64,
    ) -> Result<Self> {
        let page = parse_positive(page, "page")?.unwrap_or(1);
        let size = parse_positive(page_size, "pageSize")?.unwrap_or(default_size);
        let pagination = Self::new(page, size, max_size);
        let in_range = (pagination.page - 1)
            .checked_mul(pagination.page_size)
            .is_some_and(|skip| i64::try_from(skip).is_ok());
        if !in_range {
            return Err(Error::invalid("page is out of range"));
        }
        Ok(pagination)
    }

    /// Rows before this page. Saturates instead of overflowing.
    pub fn skip(&self) -> u64 {
        self.page.saturating_sub(1).saturating_mul(self.page_size)
    }

    pub fn limit(&self) -> u64 {
        self.page_size
    }
}

fn parse_positive(raw: Option<&str>, label: &str) -> Result<Option<u64>> {
    match raw.map(str::trim).filter(|r| !r.is_empty()) {
        None => Ok(None),
        Some(r) => r
            .parse::<u64>()
            .map(Some)
            .map_err(|_| Error::invalid(format!("{label} must be a positive integer"))),
    }
}

/// Which properties a listing covers. Empty filter means all of them.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct PropertyFilter {
    /// Case-insensitive literal match over name, description and address.
    pub location: Option<String>,
    /// Case-insensitive literal match on the property type.
    pub property_type: Option<String>,
    pub owner: Option<UserId>,
    pub featured: Option<bool>,
}

impl PropertyFilter {
    /// Build a search filter. `All` and blank types match every type.
    pub fn search(location: Option<String>, property_type: Option<String>) -> Self {
        Self {
            location: non_blank(location),
            property_type: non_blank(property_type).filter(|t| t != "All"),
            ..Default::default()
        }
    }

    pub fn owned_by(owner: UserId) -> Self {
        Self {
            owner: Some(owner),
            ..Default::default()
        }
    }

    pub fn featured() -> Self {
        Self {
            featured: Some(true),
            ..Default::default()
        }
    }

    pub fn matches(&self, property: &Property) -> bool {
        if let Some(owner) = &self.owner {
            if &property.owner != owner {
                return false;
            }
        }
        if let Some(featured) = self.featured {
            if property.is_featured != featured {
                return false;
            }
        }
        if let Some(kind) = &self.property_type {
            if !contains_ci(&property.property_type, kind) {
                return false;
            }
        }
        if let Some(needle) = &self.location {
            let loc = &property.location;
            let haystacks = [
                Some(property.name.as_str()),
                property.description.as_deref(),
                loc.street.as_deref(),
                loc.city.as_deref(),
                loc.state.as_deref(),
                loc.zipcode.as_deref(),
            ];
            if !haystacks.into_iter().flatten().any(|h| contains_ci(h, needle)) {
                return false;
            }
        }
        true
    }
}

fn contains_ci(haystack: &str, needle: &str) -> bool {
    haystack.to_lowercase().contains(&needle.to_lowercase())
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct ListQuery {
    pub filter: PropertyFilter,
    pub sort: SortBy,
    pub pagination: Option<Pagination>,
}

/// One page of results plus the total count of matches.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Page<T> {
    pub total: u64,
    pub properties: Vec<T>,
}

/// Average rating and review count of one property.
///
/// A property without reviews reports `0` and `0`, never null.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RatingSummary {
    pub average_rating: f64,
    pub review_count: u64,
}

impl RatingSummary {
    pub fn from_ratings(ratings: impl IntoIterator<Item = Rating>) -> Self {
        let (sum, count) = ratings
            .into_iter()
            .fold((0u64, 0u64), |(sum, count), r| (sum + r.get() as u64, count + 1));
        if count == 0 {
            return Self::default();
        }
        Self {
            average_rating: sum as f64 / count as f64,
            review_count: count,
        }
    }
}

/// A property as returned by listing endpoints. The rating fields are
/// present only when the listing computed them.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PropertyListing {
    #[serde(flatten)]
    pub property: Property,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub average_rating: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub review_count: Option<u64>,
}

impl From<Property> for PropertyListing {
    fn from(property: Property) -> Self {
        Self {
            property,
            average_rating: None,
            review_count: None,
        }
    }
}
