pub mod cleaner;
pub mod http_client;
pub mod parsers;

use crate::config::ScraperConfig;
use crate::models::{DetailInfo, PropertyDetail, PropertySummary};
use anyhow::{Context, Result};
use async_trait::async_trait;
use tracing::{debug, info, warn};
use url::Url;

use self::http_client::HttpClient;
use self::parsers::{parse_detail_page, parse_summary_page};

/// Listings served per search results page.
pub const PAGE_SIZE: u32 = 27;

// Fixed detail-page sections the address search is asked to render.
const DETAIL_CATEGORIES: &str = "form.start,form.RealEstatePropertyInfor,form.BoundaryGeography,\
form.ResidentialServices,form.TrashMaintenance,form.ElectedOfficialsContacts,\
form.RealEstatePropertyInfor,form.BoundaryGeography,form.TrashMaintenance,\
form.ElectedOfficialsContacts";

// ── Source trait ──────────────────────────────────────────────────────────────

/// Swappable listing source: the live site, or canned pages in tests.
#[async_trait]
pub trait ListingSource: Send + Sync {
    /// One results page for `ward`, starting at the 1-based `start_row`.
    async fn fetch_summary_page(&self, ward: u32, start_row: u32) -> Result<Vec<PropertySummary>>;
    async fn fetch_detail(&self, parcel_id: &str) -> Result<DetailInfo>;
}

// ── LRA site scraper ──────────────────────────────────────────────────────────

pub struct LraScraper {
    client: HttpClient,
    listing_url: Url,
    detail_url: Url,
}

impl LraScraper {
    pub fn new(config: &ScraperConfig) -> Result<Self> {
        Ok(Self {
            client: HttpClient::new(config)?,
            listing_url: Url::parse(&config.listing_url)
                .with_context(|| format!("Bad listing URL {}", config.listing_url))?,
            detail_url: Url::parse(&config.detail_url)
                .with_context(|| format!("Bad detail URL {}", config.detail_url))?,
        })
    }

    /// e.g. lra-owned-property-search.cfm?startRow=28&ward=3&Usagew=All
    fn listing_page_url(&self, ward: u32, start_row: u32) -> Url {
        let mut url = self.listing_url.clone();
        url.query_pairs_mut()
            .append_pair("startRow", &start_row.to_string())
            .append_pair("ward", &ward.to_string())
            .append_pair("Usagew", "All");
        url
    }

    fn detail_page_url(&self, parcel_id: &str) -> Url {
        let mut url = self.detail_url.clone();
        url.query_pairs_mut()
            .append_pair("parcelid", parcel_id)
            .append_pair("firstview", "true")
            .append_pair("categoryBy", DETAIL_CATEGORIES);
        url
    }
}

#[async_trait]
impl ListingSource for LraScraper {
    async fn fetch_summary_page(&self, ward: u32, start_row: u32) -> Result<Vec<PropertySummary>> {
        let url = self.listing_page_url(ward, start_row);
        let html = self.client.get_text(url.as_str()).await
            .with_context(|| format!("Failed to fetch ward {} from row {}", ward, start_row))?;

        let props = parse_summary_page(&html, ward)
            .with_context(|| format!("Ward {} row {}: malformed listing page", ward, start_row))?;
        Ok(props)
    }

    async fn fetch_detail(&self, parcel_id: &str) -> Result<DetailInfo> {
        let url = self.detail_page_url(parcel_id);
        let html = self.client.get_text(url.as_str()).await
            .with_context(|| format!("Failed to fetch detail page for parcel {}", parcel_id))?;
        Ok(parse_detail_page(&html))
    }
}

// ── Paginator ─────────────────────────────────────────────────────────────────

/// Walk one ward's results 27 rows at a time until a page comes back empty.
/// `max_pages` caps the walk for servers that never return an empty page.
pub async fn paginate<S: ListingSource + ?Sized>(
    source: &S,
    ward: u32,
    max_pages: Option<u32>,
) -> Result<Vec<PropertySummary>> {
    let mut all = Vec::new();
    let mut row = 1u32;
    let mut page = 1u32;

    loop {
        info!("Scraping page {} of ward {}", page, ward);
        let props = source.fetch_summary_page(ward, row).await?;

        if props.is_empty() {
            debug!("Ward {}: empty page at row {}, stopping", ward, row);
            break;
        }

        all.extend(props);

        if max_pages.is_some_and(|max| page >= max) {
            warn!("Ward {}: reached page limit ({}), stopping", ward, page);
            break;
        }

        row += PAGE_SIZE;
        page += 1;
    }

    Ok(all)
}

// ── Detail enrichment ─────────────────────────────────────────────────────────

/// Fetch every property's detail page, one at a time.
pub async fn enrich<S: ListingSource + ?Sized>(
    source: &S,
    properties: Vec<PropertySummary>,
) -> Result<Vec<PropertyDetail>> {
    let mut enriched = Vec::with_capacity(properties.len());

    for prop in properties {
        let info = source.fetch_detail(&prop.parcel_id).await?;
        debug!(
            "Parcel {}: zoning={:?}, {} permits",
            prop.parcel_id,
            info.zoning,
            info.permits.len()
        );
        enriched.push(PropertyDetail::from_parts(prop, info));
    }

    Ok(enriched)
}

// ── Tests ─────────────────────────────────────────────────────────────────────
