//! Data models
//!
//! Rust structs mirroring the rows served by the data service, plus the
//! write payloads sent back to it. Read models tolerate missing embedded
//! relations (they are only present when the select asked for them).

use chrono::{DateTime, Utc};
use serde::{Deserialize, Deserializer, Serialize};

// =============================================================================
// Lenient field decoding
// =============================================================================

/// Lookup descriptions and phone numbers arrive either as text or as numbers.
fn text_or_number<'de, D>(deserializer: D) -> Result<String, D::Error>
where
    D: Deserializer<'de>,
{
    match serde_json::Value::deserialize(deserializer)? {
        serde_json::Value::String(s) => Ok(s),
        serde_json::Value::Number(n) => Ok(n.to_string()),
        serde_json::Value::Null => Ok(String::new()),
        other => Err(serde::de::Error::custom(format!(
            "expected text or number, got {other}"
        ))),
    }
}

fn optional_text_or_number<'de, D>(deserializer: D) -> Result<Option<String>, D::Error>
where
    D: Deserializer<'de>,
{
    match serde_json::Value::deserialize(deserializer)? {
        serde_json::Value::String(s) => Ok(Some(s)),
        serde_json::Value::Number(n) => Ok(Some(n.to_string())),
        serde_json::Value::Null => Ok(None),
        other => Err(serde::de::Error::custom(format!(
            "expected text or number, got {other}"
        ))),
    }
}

/// Timestamps come back with or without an offset depending on the column type.
mod timestamp {
    use chrono::{DateTime, NaiveDateTime, Utc};
    use serde::{Deserialize, Deserializer, Serializer};

    pub fn parse(raw: &str) -> Option<DateTime<Utc>> {
        if let Ok(parsed) = DateTime::parse_from_rfc3339(raw) {
            return Some(parsed.with_timezone(&Utc));
        }
        NaiveDateTime::parse_from_str(raw, "%Y-%m-%dT%H:%M:%S%.f")
            .or_else(|_| NaiveDateTime::parse_from_str(raw, "%Y-%m-%d %H:%M:%S%.f"))
            .ok()
            .map(|naive| naive.and_utc())
    }

    pub fn deserialize<'de, D>(deserializer: D) -> Result<Option<DateTime<Utc>>, D::Error>
    where
        D: Deserializer<'de>,
    {
        let raw = Option::<String>::deserialize(deserializer)?;
        match raw {
            None => Ok(None),
            Some(raw) => parse(&raw)
                .map(Some)
                .ok_or_else(|| serde::de::Error::custom(format!("invalid timestamp: {raw}"))),
        }
    }

    pub fn serialize<S>(value: &Option<DateTime<Utc>>, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        match value {
            Some(value) => serializer.serialize_str(&value.to_rfc3339()),
            None => serializer.serialize_none(),
        }
    }
}

// =============================================================================
// Catalog lookups
// =============================================================================

/// A small reference table (brand, model, style, ...) with `{id, desc}` rows
pub trait Lookup {
    /// Resource name on the data service
    const RESOURCE: &'static str;
    /// Primary key column
    const ID_COLUMN: &'static str;

    fn id(&self) -> i64;
    fn description(&self) -> &str;
}

macro_rules! lookup_entity {
    ($(#[$meta:meta])* $name:ident, $resource:literal, $id:ident) => {
        $(#[$meta])*
        #[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
        pub struct $name {
            pub $id: i64,
            #[serde(deserialize_with = "text_or_number", default)]
            pub desc: String,
        }

        impl Lookup for $name {
            const RESOURCE: &'static str = $resource;
            const ID_COLUMN: &'static str = stringify!($id);

            fn id(&self) -> i64 {
                self.$id
            }

            fn description(&self) -> &str {
                &self.desc
            }
        }
    };
}

lookup_entity!(
    /// Vehicle brand (Toyota, Honda, ...)
    Brand, "brands", id_brands
);
lookup_entity!(
    /// Vehicle model (Corolla, Civic, ...)
    Model, "models", id_models
);
lookup_entity!(
    /// Body style (sedan, pickup, ...)
    Style, "styles", id_styles
);
lookup_entity!(Transmission, "transmissions", id_transmissions);
lookup_entity!(Displacement, "displacements", id_displacements);
lookup_entity!(Fuel, "fuel", id_fuel);
lookup_entity!(
    /// Model year; `desc` holds the year as text ("2020")
    Year, "years", id_years
);

/// Door-count choices offered by the publication form
pub const DOOR_OPTIONS: [(i32, &str); 2] = [(2, "2 - 3"), (4, "4 o más")];

/// Door count preselected for a new listing
pub const DEFAULT_DOORS: i32 = 4;

/// All lookup lists, loaded once per session
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Catalog {
    pub brands: Vec<Brand>,
    pub models: Vec<Model>,
    pub styles: Vec<Style>,
    pub transmissions: Vec<Transmission>,
    pub displacements: Vec<Displacement>,
    pub fuel: Vec<Fuel>,
    pub years: Vec<Year>,
}

impl Catalog {
    /// Lowest and highest model year, for the advanced filter bounds
    pub fn year_bounds(&self) -> Option<(i32, i32)> {
        let years: Vec<i32> = self
            .years
            .iter()
            .filter_map(|year| year.desc.trim().parse().ok())
            .collect();
        Some((*years.iter().min()?, *years.iter().max()?))
    }

    pub fn brand(&self, id: i64) -> Option<&Brand> {
        self.brands.iter().find(|brand| brand.id_brands == id)
    }

    pub fn model(&self, id: i64) -> Option<&Model> {
        self.models.iter().find(|model| model.id_models == id)
    }
}

// =============================================================================
// Audit
// =============================================================================

/// Generic "when was this touched" record attached 1:1 to a listing, image or user
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Audit {
    pub id_audit: i64,
    #[serde(with = "timestamp", default)]
    pub created_at: Option<DateTime<Utc>>,
    #[serde(with = "timestamp", default)]
    pub updated_at: Option<DateTime<Utc>>,
}

/// Body for creating an audit row; the service fills both timestamps
#[derive(Debug, Clone, Default, Serialize)]
pub struct NewAudit {}

/// Body for touching an audit row
#[derive(Debug, Clone, Serialize)]
pub struct AuditTouch {
    pub updated_at: DateTime<Utc>,
}

impl AuditTouch {
    pub fn now() -> Self {
        Self {
            updated_at: Utc::now(),
        }
    }
}

// =============================================================================
// Images
// =============================================================================

/// Picture stored as base64 text (usually a `data:` URL)
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Image {
    pub id_images: i64,
    #[serde(default)]
    pub image: String,
    #[serde(default)]
    pub id_audit: Option<i64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub audit: Option<Audit>,
}

/// Body for creating an image row
#[derive(Debug, Clone, Serialize)]
pub struct NewImage {
    pub image: String,
    pub id_audit: Option<i64>,
}

/// Embedded `cars_images(images(*))` entry
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ListingImageEmbed {
    #[serde(default)]
    pub images: Option<Image>,
}

/// Join row linking a listing to one of its images
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ListingImageLink {
    pub id_cars: i64,
    pub id_images: i64,
}

// =============================================================================
// Users
// =============================================================================

/// Marketplace user profile
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct User {
    pub id_user: i64,
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub last_name: String,
    #[serde(default)]
    pub email: String,
    #[serde(default, deserialize_with = "optional_text_or_number")]
    pub phone: Option<String>,
    #[serde(default)]
    pub idcard: Option<String>,
    #[serde(default)]
    pub age: Option<i32>,
    #[serde(default)]
    pub rol: Option<i32>,
    #[serde(default)]
    pub id_images: Option<i64>,
    #[serde(default)]
    pub id_audit: Option<i64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub audit: Option<Audit>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub images: Option<Image>,
}

impl User {
    pub fn full_name(&self) -> String {
        format!("{} {}", self.name, self.last_name).trim().to_string()
    }
}

/// Profile fields a user may change
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct UserPatch {
    pub name: String,
    pub last_name: String,
    pub email: String,
    pub phone: Option<String>,
    pub idcard: Option<String>,
    pub age: Option<i32>,
    pub id_audit: Option<i64>,
    pub id_images: Option<i64>,
}

/// Clears the user's own image/audit references before those rows are deleted
#[derive(Debug, Clone, Default, Serialize)]
pub struct UserDetach {
    pub id_images: Option<i64>,
    pub id_audit: Option<i64>,
}

// =============================================================================
// Listings
// =============================================================================

/// A vehicle for sale (`cars` resource)
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Listing {
    pub id_cars: i64,
    #[serde(default)]
    pub id_brands: i64,
    #[serde(default)]
    pub id_models: i64,
    #[serde(default)]
    pub id_styles: i64,
    #[serde(default)]
    pub exterior_color: String,
    #[serde(default)]
    pub interior_color: String,
    #[serde(default)]
    pub id_transmission: i64,
    #[serde(default)]
    pub id_displacement: i64,
    #[serde(default)]
    pub id_fuel: i64,
    /// Trade-in accepted
    #[serde(default)]
    pub receives: bool,
    #[serde(default)]
    pub negotiable: bool,
    #[serde(default)]
    pub number_of_doors: i32,
    #[serde(default)]
    pub id_year: i64,
    /// Whole units of local currency
    #[serde(default)]
    pub price: i64,
    #[serde(default)]
    pub id_audit: i64,
    #[serde(default)]
    pub sold: bool,
    #[serde(default)]
    pub id_users: i64,

    #[serde(default)]
    pub brands: Option<Brand>,
    #[serde(default)]
    pub models: Option<Model>,
    #[serde(default)]
    pub styles: Option<Style>,
    #[serde(default)]
    pub transmissions: Option<Transmission>,
    #[serde(default)]
    pub displacements: Option<Displacement>,
    #[serde(default)]
    pub fuel: Option<Fuel>,
    #[serde(default)]
    pub years: Option<Year>,
    #[serde(default)]
    pub audit: Option<Audit>,
    #[serde(default)]
    pub users: Option<User>,
    #[serde(default)]
    pub cars_images: Vec<ListingImageEmbed>,
}

impl Listing {
    /// Images embedded through the join rows, in response order
    pub fn images(&self) -> impl Iterator<Item = &Image> {
        self.cars_images.iter().filter_map(|link| link.images.as_ref())
    }

    pub fn image_ids(&self) -> Vec<i64> {
        self.images().map(|image| image.id_images).collect()
    }

    pub fn brand_name(&self) -> &str {
        self.brands.as_ref().map_or("", |brand| brand.desc.as_str())
    }

    pub fn model_name(&self) -> &str {
        self.models.as_ref().map_or("", |model| model.desc.as_str())
    }

    pub fn year_label(&self) -> &str {
        self.years.as_ref().map_or("", |year| year.desc.as_str())
    }

    /// "Toyota Corolla 2020"
    pub fn headline(&self) -> String {
        [self.brand_name(), self.model_name(), self.year_label()]
            .into_iter()
            .filter(|part| !part.is_empty())
            .collect::<Vec<_>>()
            .join(" ")
    }
}

/// Minimal projection used by the deletion cascade
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct ListingKeys {
    pub id_cars: i64,
    #[serde(default)]
    pub id_audit: Option<i64>,
}

/// Body for creating a listing row
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct NewListing {
    pub id_brands: i64,
    pub id_models: i64,
    pub id_styles: i64,
    pub exterior_color: String,
    pub interior_color: String,
    pub id_transmission: i64,
    pub id_displacement: i64,
    pub id_fuel: i64,
    pub receives: bool,
    pub negotiable: bool,
    pub number_of_doors: i32,
    pub id_year: i64,
    pub price: i64,
    pub id_audit: i64,
    pub sold: bool,
    pub id_users: i64,
}

/// Mutable listing fields; audit reference and owner are never patched
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ListingPatch {
    pub id_brands: i64,
    pub id_models: i64,
    pub id_styles: i64,
    pub exterior_color: String,
    pub interior_color: String,
    pub id_transmission: i64,
    pub id_displacement: i64,
    pub id_fuel: i64,
    pub receives: bool,
    pub negotiable: bool,
    pub number_of_doors: i32,
    pub id_year: i64,
    pub price: i64,
}

/// Flags a listing as no longer available
#[derive(Debug, Clone, Serialize)]
pub struct SoldPatch {
    pub sold: bool,
}

// =============================================================================
// Favorites
// =============================================================================

/// Wishlist row pairing a user with a listing they do not own
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Favorite {
    pub id_wishlist: i64,
    pub id_users: i64,
    pub id_cars: i64,
}

/// Body for creating a wishlist row
#[derive(Debug, Clone, Serialize)]
pub struct NewFavorite {
    pub id_users: i64,
    pub id_cars: i64,
}

// =============================================================================
// Advanced filter
// =============================================================================

/// Advanced-search selection; never persisted, translated into query predicates
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ListingFilter {
    pub brand: Option<i64>,
    pub model: Option<i64>,
    pub style: Option<i64>,
    pub color_ext: Option<String>,
    pub color_inter: Option<String>,
    /// Year bounds are Year catalog ids, which follow chronological order
    pub year_from: Option<i64>,
    pub year_to: Option<i64>,
    pub price_from: Option<i64>,
    pub price_to: Option<i64>,
    pub displacement: Option<i64>,
    pub transmission: Option<i64>,
    pub fuel: Option<i64>,
    pub doors: Option<i32>,
    #[serde(default)]
    pub order_by_price: bool,
    #[serde(default)]
    pub order_by_year: bool,
}

impl ListingFilter {
    /// True when the filter would not change a plain browse query
    pub fn is_empty(&self) -> bool {
        self.brand.is_none()
            && self.model.is_none()
            && self.style.is_none()
            && self.color_ext.as_deref().is_none_or(|c| c.trim().is_empty())
            && self.color_inter.as_deref().is_none_or(|c| c.trim().is_empty())
            && self.year_from.is_none()
            && self.year_to.is_none()
            && self.price_from.is_none()
            && self.price_to.is_none()
            && self.displacement.is_none()
            && self.transmission.is_none()
            && self.fuel.is_none()
            && self.doors.is_none()
            && !self.order_by_price
            && !self.order_by_year
    }
}
