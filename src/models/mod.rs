use chrono::NaiveDateTime;
use indexmap::IndexMap;
use serde::{Deserialize, Serialize};

// ── Columns ───────────────────────────────────────────────────────────────────

pub const FIXED_WIDTH: usize = 10;
pub const PERMIT_WIDTH: usize = 8;

/// Fixed property columns, in export order.
pub const PROPERTY_COLUMNS: [&str; FIXED_WIDTH] = [
    "address",
    "price",
    "zip_code",
    "sqft",
    "land_use",
    "ward",
    "realtor",
    "parcel_id",
    "zoning",
    "owner",
];

/// Permit table columns carried into the export, one group per permit slot.
pub const PERMIT_FIELDS: [&str; PERMIT_WIDTH] = [
    "Owner Name",
    "Permit Type",
    "Application Date",
    "Completion Date",
    "Issued Date",
    "New Use",
    "Estimated Costs",
    "Description",
];

// ── Listing summary ───────────────────────────────────────────────────────────

/// One entry of the LRA owned-property search results.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct PropertySummary {
    pub address: String,
    pub price: String,    // digits and '.', "$" and "," stripped
    pub zip_code: String,
    pub sqft: String,     // digits only
    pub land_use: String,
    pub ward: u32,
    pub realtor: String,
    pub parcel_id: String,
}

// ── Permits ───────────────────────────────────────────────────────────────────

/// A permit history row keyed by the detail page's header cells, in the
/// order the header lists them.
pub type PermitRecord = IndexMap<String, String>;

/// Fields read off a parcel's detail page. Absent labels are `None`.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct DetailInfo {
    pub zoning: Option<String>,
    pub land_use: Option<String>,
    pub owner: Option<String>,
    pub permits: Vec<PermitRecord>,
}

// ── Enriched property ─────────────────────────────────────────────────────────

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct PropertyDetail {
    #[serde(flatten)]
    pub summary: PropertySummary,
    pub zoning: Option<String>,
    pub owner: Option<String>,
    #[serde(default)]
    pub permits: Vec<PermitRecord>,
}

impl PropertyDetail {
    /// Merge detail-page fields into a summary. The detail page's land use
    /// replaces the listing label when it has one.
    pub fn from_parts(mut summary: PropertySummary, info: DetailInfo) -> Self {
        if let Some(land_use) = info.land_use {
            summary.land_use = land_use;
        }
        Self {
            summary,
            zoning: info.zoning,
            owner: info.owner,
            permits: info.permits,
        }
    }
}

impl From<PropertySummary> for PropertyDetail {
    fn from(summary: PropertySummary) -> Self {
        Self {
            summary,
            zoning: None,
            owner: None,
            permits: Vec::new(),
        }
    }
}

// ── Export row ────────────────────────────────────────────────────────────────

/// A property with its permit list spread over a fixed number of slots.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FlattenedRow {
    pub fields: [String; FIXED_WIDTH],
    pub permits: Vec<[String; PERMIT_WIDTH]>,
}

impl FlattenedRow {
    pub fn width(&self) -> usize {
        FIXED_WIDTH + self.permits.len() * PERMIT_WIDTH
    }

    /// Cells in header order.
    pub fn cells(&self) -> impl Iterator<Item = &str> {
        self.fields
            .iter()
            .chain(self.permits.iter().flatten())
            .map(String::as_str)
    }
}

// ── Persisted ward ────────────────────────────────────────────────────────────

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct WardSnapshot {
    pub ward: u32,
    pub scraped_at: NaiveDateTime,
    pub properties: Vec<PropertyDetail>,
}
