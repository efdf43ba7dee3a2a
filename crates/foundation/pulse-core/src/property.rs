//! Property listings.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::{non_blank, Error, PropertyId, Result, UserId};

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Location {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub street: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub city: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub state: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub zipcode: Option<String>,
}

impl Location {
    fn merge(&mut self, other: &Location) {
        merge_field(&mut self.street, &other.street);
        merge_field(&mut self.city, &other.city);
        merge_field(&mut self.state, &other.state);
        merge_field(&mut self.zipcode, &other.zipcode);
    }
}

/// Nightly, weekly and monthly rates. Listing display expects at least
/// one of them to be set, but nothing enforces it.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct Rates {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub nightly: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub weekly: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub monthly: Option<f64>,
}

impl Rates {
    fn merge(&mut self, other: &Rates) {
        if other.nightly.is_some() {
            self.nightly = other.nightly;
        }
        if other.weekly.is_some() {
            self.weekly = other.weekly;
        }
        if other.monthly.is_some() {
            self.monthly = other.monthly;
        }
    }

    fn validate(&self) -> Result<()> {
        for (label, rate) in [
            ("Nightly rate", self.nightly),
            ("Weekly rate", self.weekly),
            ("Monthly rate", self.monthly),
        ] {
            if let Some(rate) = rate {
                if !rate.is_finite() || rate < 0.0 {
                    return Err(Error::invalid(format!("{label} must be a positive number")));
                }
            }
        }
        Ok(())
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct SellerInfo {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub email: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub phone: Option<String>,
}

impl SellerInfo {
    fn merge(&mut self, other: &SellerInfo) {
        merge_field(&mut self.name, &other.name);
        merge_field(&mut self.email, &other.email);
        merge_field(&mut self.phone, &other.phone);
    }
}

fn merge_field(target: &mut Option<String>, source: &Option<String>) {
    if source.is_some() {
        target.clone_from(source);
    }
}

/// A stored listing.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Property {
    #[serde(rename = "_id")]
    pub id: PropertyId,
    pub owner: UserId,
    pub name: String,
    #[serde(rename = "type")]
    pub property_type: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(default)]
    pub location: Location,
    pub beds: u32,
    pub baths: f64,
    pub square_feet: u32,
    #[serde(default)]
    pub amenities: Vec<String>,
    #[serde(default)]
    pub rates: Rates,
    #[serde(default)]
    pub seller_info: SellerInfo,
    #[serde(default)]
    pub images: Vec<String>,
    #[serde(default)]
    pub views: i64,
    #[serde(default)]
    pub is_featured: bool,
    #[serde(rename = "createdAt")]
    pub created_at: DateTime<Utc>,
    #[serde(rename = "updatedAt")]
    pub updated_at: DateTime<Utc>,
}

/// A validated listing ready to be inserted.
#[derive(Debug, Clone, PartialEq)]
pub struct NewProperty {
    pub owner: UserId,
    pub name: String,
    pub property_type: String,
    pub description: Option<String>,
    pub location: Location,
    pub beds: u32,
    pub baths: f64,
    pub square_feet: u32,
    pub amenities: Vec<String>,
    pub rates: Rates,
    pub seller_info: SellerInfo,
    pub images: Vec<String>,
    pub is_featured: bool,
}

/// Raw text fields of the add-property form, keyed by their form names.
#[derive(Debug, Clone, Default)]
pub struct PropertyForm {
    pub name: Option<String>,
    pub property_type: Option<String>,
    pub description: Option<String>,
    pub location: Location,
    pub beds: Option<String>,
    pub baths: Option<String>,
    pub square_feet: Option<String>,
    pub amenities: Vec<String>,
    pub nightly: Option<String>,
    pub weekly: Option<String>,
    pub monthly: Option<String>,
    pub seller_info: SellerInfo,
}

impl PropertyForm {
    /// Record one form field. Returns `false` for names the form does not use.
    pub fn set(&mut self, field: &str, value: String) -> bool {
        match field {
            "name" => self.name = Some(value),
            "type" => self.property_type = Some(value),
            "description" => self.description = Some(value),
            "location.street" => self.location.street = Some(value),
            "location.city" => self.location.city = Some(value),
            "location.state" => self.location.state = Some(value),
            "location.zipcode" => self.location.zipcode = Some(value),
            "beds" => self.beds = Some(value),
            "baths" => self.baths = Some(value),
            "square_feet" => self.square_feet = Some(value),
            "amenities" => self.amenities.push(value),
            "rates.nightly" => self.nightly = Some(value),
            "rates.weekly" => self.weekly = Some(value),
            "rates.monthly" => self.monthly = Some(value),
            "seller_info.name" => self.seller_info.name = Some(value),
            "seller_info.email" => self.seller_info.email = Some(value),
            "seller_info.phone" => self.seller_info.phone = Some(value),
            _ => return false,
        }
        true
    }

    /// Validate every field before anything touches the store.
    pub fn validate(self, owner: UserId) -> Result<NewProperty> {
        let name = required(self.name, "Name")?;
        let property_type = required(self.property_type, "Type")?;
        let beds = parse_count(self.beds, "Beds")?;
        let baths = parse_number(self.baths, "Baths")?
            .ok_or_else(|| Error::invalid("Baths is required"))?;
        if baths < 0.0 {
            return Err(Error::invalid("Baths must be a positive number"));
        }
        let square_feet = parse_count(self.square_feet, "Square feet")?;

        let rates = Rates {
            nightly: parse_number(self.nightly, "Nightly rate")?,
            weekly: parse_number(self.weekly, "Weekly rate")?,
            monthly: parse_number(self.monthly, "Monthly rate")?,
        };
        rates.validate()?;

        let amenities = self
            .amenities
            .into_iter()
            .filter_map(|a| non_blank(Some(a)))
            .collect();

        Ok(NewProperty {
            owner,
            name,
            property_type,
            description: non_blank(self.description),
            location: clean_location(self.location),
            beds,
            baths,
            square_feet,
            amenities,
            rates,
            seller_info: clean_seller(self.seller_info),
            images: Vec::new(),
            is_featured: false,
        })
    }
}

/// Partial update of a listing. Only supplied fields overwrite.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct PropertyPatch {
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default, rename = "type")]
    pub property_type: Option<String>,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(default)]
    pub location: Option<Location>,
    #[serde(default)]
    pub beds: Option<u32>,
    #[serde(default)]
    pub baths: Option<f64>,
    #[serde(default)]
    pub square_feet: Option<u32>,
    #[serde(default)]
    pub amenities: Option<Vec<String>>,
    #[serde(default)]
    pub rates: Option<Rates>,
    #[serde(default)]
    pub seller_info: Option<SellerInfo>,
}

impl PropertyPatch {
    pub fn validate(mut self) -> Result<Self> {
        if let Some(name) = self.name.take() {
            self.name = Some(required(Some(name), "Name")?);
        }
        if let Some(kind) = self.property_type.take() {
            self.property_type = Some(required(Some(kind), "Type")?);
        }
        if let Some(baths) = self.baths {
            if !baths.is_finite() || baths < 0.0 {
                return Err(Error::invalid("Baths must be a positive number"));
            }
        }
        if let Some(rates) = &self.rates {
            rates.validate()?;
        }
        Ok(self)
    }

    pub fn is_empty(&self) -> bool {
        *self == Self::default()
    }

    pub fn apply_to(&self, property: &mut Property) {
        if let Some(name) = &self.name {
            property.name.clone_from(name);
        }
        if let Some(kind) = &self.property_type {
            property.property_type.clone_from(kind);
        }
        if self.description.is_some() {
            property.description.clone_from(&self.description);
        }
        if let Some(location) = &self.location {
            property.location.merge(location);
        }
        if let Some(beds) = self.beds {
            property.beds = beds;
        }
        if let Some(baths) = self.baths {
            property.baths = baths;
        }
        if let Some(square_feet) = self.square_feet {
            property.square_feet = square_feet;
        }
        if let Some(amenities) = &self.amenities {
            property.amenities.clone_from(amenities);
        }
        if let Some(rates) = &self.rates {
            property.rates.merge(rates);
        }
        if let Some(seller) = &self.seller_info {
            property.seller_info.merge(seller);
        }
    }
}

fn required(value: Option<String>, label: &str) -> Result<String> {
    non_blank(value).ok_or_else(|| Error::invalid(format!("{label} is required")))
}

fn parse_number(value: Option<String>, label: &str) -> Result<Option<f64>> {
    match non_blank(value) {
        None => Ok(None),
        Some(raw) => raw
            .parse::<f64>()
            .ok()
            .filter(|n| n.is_finite())
            .map(Some)
            .ok_or_else(|| Error::invalid(format!("{label} must be a number"))),
    }
}

fn parse_count(value: Option<String>, label: &str) -> Result<u32> {
    let raw = required(value, label)?;
    raw.parse::<u32>()
        .map_err(|_| Error::invalid(format!("{label} must be a whole number")))
}

fn clean_location(location: Location) -> Location {
    Location {
        street: non_blank(location.street),
        city: non_blank(location.city),
        state: non_blank(location.state),
        zipcode: non_blank(location.zipcode),
    }
}

fn clean_seller(seller: SellerInfo) -> SellerInfo {
    SellerInfo {
        name: non_blank(seller.name),
        email: non_blank(seller.email),
        phone: non_blank(seller.phone),
    }
}
