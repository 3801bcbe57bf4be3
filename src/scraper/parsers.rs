use crate::models::{DetailInfo, PermitRecord, PropertySummary};
use crate::scraper::cleaner::{clean_price, clean_sqft, clean_text, parcel_id_from_href, split_description};
use scraper::{ElementRef, Html, Selector};
use std::sync::LazyLock;

#[derive(Debug, thiserror::Error)]
pub enum ParseError {
    #[error("listing {index}: missing {field}")]
    MissingNode { index: usize, field: &'static str },
    #[error("listing {index}: description has {found} parts, expected 3")]
    Description { index: usize, found: usize },
}

fn sel(css: &str) -> Selector {
    Selector::parse(css).expect("invalid static selector")
}

// Class matches are substring matches: the site composes class names
// (e.g. "large-photo-button-aside") around these stems.
static SEL_LISTING: LazyLock<Selector> = LazyLock::new(|| {
    sel(r#"div[class*="large-photo-button-container-flex"] a[class*="large-photo-button"]"#)
});
static SEL_TITLE: LazyLock<Selector> =
    LazyLock::new(|| sel(r#"[class*="large-photo-button-title"]"#));
static SEL_DESCRIPTION: LazyLock<Selector> =
    LazyLock::new(|| sel(r#"[class*="large-photo-button-description small"]"#));
static SEL_ASIDE: LazyLock<Selector> = LazyLock::new(|| sel(r#"[class*="aside"]"#));
static SEL_STRONG: LazyLock<Selector> = LazyLock::new(|| sel("strong"));
static SEL_HREF: LazyLock<Selector> = LazyLock::new(|| sel("[href]"));
static SEL_TABLE: LazyLock<Selector> = LazyLock::new(|| sel("table"));
static SEL_TR: LazyLock<Selector> = LazyLock::new(|| sel("tr"));
static SEL_TH: LazyLock<Selector> = LazyLock::new(|| sel("th"));
static SEL_TD: LazyLock<Selector> = LazyLock::new(|| sel("td"));
static SEL_CELL: LazyLock<Selector> = LazyLock::new(|| sel("th, td"));

// ── Text helpers ──────────────────────────────────────────────────────────────

/// First non-blank text node directly under `el`.
fn own_text(el: ElementRef) -> Option<String> {
    el.children()
        .filter_map(|n| n.value().as_text())
        .map(|t| clean_text(t))
        .find(|t| !t.is_empty())
}

fn all_text(el: ElementRef) -> String {
    clean_text(&el.text().collect::<String>())
}

/// Elements owning a text node that contains `needle`.
fn elements_with_text<'a>(root: ElementRef<'a>, needle: &str) -> impl Iterator<Item = ElementRef<'a>> {
    root.descendants()
        .filter(move |n| n.value().as_text().is_some_and(|t| t.contains(needle)))
        .filter_map(|n| n.parent())
        .filter_map(ElementRef::wrap)
}

// ── Listing page ──────────────────────────────────────────────────────────────

/// Parse one page of the owned-property search. Extraction is positional:
/// the first malformed listing fails the whole page.
pub fn parse_summary_page(html: &str, ward: u32) -> Result<Vec<PropertySummary>, ParseError> {
    let doc = Html::parse_document(html);
    doc.select(&SEL_LISTING)
        .enumerate()
        .map(|(index, el)| parse_listing(el, ward, index))
        .collect()
}

fn parse_listing(el: ElementRef, ward: u32, index: usize) -> Result<PropertySummary, ParseError> {
    let missing = |field| ParseError::MissingNode { index, field };

    let address = el
        .select(&SEL_TITLE)
        .find_map(own_text)
        .ok_or_else(|| missing("title"))?;

    let description_el = el
        .select(&SEL_DESCRIPTION)
        .next()
        .ok_or_else(|| missing("description"))?;
    let description = own_text(description_el).ok_or_else(|| missing("description text"))?;

    // realtor | zip code | square footage
    let parts = split_description(&description);
    let [realtor, zip_code, sqft] = <[String; 3]>::try_from(parts).map_err(|parts| {
        ParseError::Description { index, found: parts.len() }
    })?;

    let land_use = description_el
        .select(&SEL_STRONG)
        .next()
        .map(all_text)
        .ok_or_else(|| missing("land use"))?;

    let price = el
        .select(&SEL_ASIDE)
        .find_map(own_text)
        .ok_or_else(|| missing("price"))?;

    let href = el
        .value()
        .attr("href")
        .or_else(|| el.select(&SEL_HREF).find_map(|a| a.value().attr("href")))
        .ok_or_else(|| missing("href"))?;

    Ok(PropertySummary {
        address,
        price: clean_price(&price),
        zip_code,
        sqft: clean_sqft(&sqft),
        land_use,
        ward,
        realtor,
        parcel_id: parcel_id_from_href(href),
    })
}

// ── Detail page ───────────────────────────────────────────────────────────────

/// Parse a parcel's address-search page. Labels that are not on the page
/// come back as `None`; a page without a permit table has no permits.
pub fn parse_detail_page(html: &str) -> DetailInfo {
    let doc = Html::parse_document(html);
    let root = doc.root_element();

    let land_use_tables = section_tables(root, "Land Use Information");
    let property_tables = section_tables(root, "Property Information");

    DetailInfo {
        zoning: lookup_label(&land_use_tables, root, "Zoning:"),
        land_use: lookup_label(&land_use_tables, root, "Land use:"),
        owner: lookup_label(&property_tables, root, "Owner name:"),
        permits: permit_table(root).map(parse_permit_table).unwrap_or_default(),
    }
}

/// Tables under the parent of the element carrying `heading`.
fn section_tables<'a>(root: ElementRef<'a>, heading: &str) -> Vec<ElementRef<'a>> {
    elements_with_text(root, heading)
        .filter_map(|h| h.parent().and_then(ElementRef::wrap))
        .flat_map(|parent| parent.select(&SEL_TABLE).collect::<Vec<_>>())
        .collect()
}

/// Label cell → first text node of the next data cell in the same row.
/// Searches the whole page when the section heading was not found.
fn lookup_label<'a>(tables: &[ElementRef<'a>], root: ElementRef<'a>, label: &str) -> Option<String> {
    let scopes: Vec<ElementRef<'a>> = if tables.is_empty() { vec![root] } else { tables.to_vec() };

    scopes
        .iter()
        .flat_map(|scope| scope.select(&SEL_TR))
        .filter(|tr| tr.select(&SEL_CELL).any(|c| all_text(c).contains(label)))
        .find_map(|tr| {
            tr.select(&SEL_TD)
                .find(|td| !all_text(*td).contains(label))
                .and_then(own_text)
        })
}

/// Nearest table enclosing the "Permit Type" header cell.
fn permit_table(root: ElementRef) -> Option<ElementRef> {
    elements_with_text(root, "Permit Type").find_map(|el| {
        std::iter::once(el)
            .chain(el.ancestors().filter_map(ElementRef::wrap))
            .find(|a| a.value().name() == "table")
    })
}

/// First row's `th` cells name the columns; later rows are zipped against
/// them by position. A cell's value is its first text node.
pub fn parse_permit_table(table: ElementRef) -> Vec<PermitRecord> {
    let mut rows = table.select(&SEL_TR);

    let Some(header_row) = rows.next() else {
        return Vec::new();
    };
    let headers: Vec<String> = header_row
        .select(&SEL_TH)
        .map(all_text)
        .filter(|h| !h.is_empty())
        .collect();
    if headers.is_empty() {
        return Vec::new();
    }

    rows.filter_map(|tr| {
        let cells: Vec<String> = tr
            .select(&SEL_TD)
            .map(|td| own_text(td).unwrap_or_default())
            .collect();
        if cells.is_empty() {
            return None;
        }
        Some(headers.iter().cloned().zip(cells).collect::<PermitRecord>())
    })
    .collect()
}

// ── Tests ─────────────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;

    fn listing(title: &str, description: &str, price: &str, href: &str) -> String {
        format!(
            r#"<a class="large-photo-button" href="{href}">
                 <span class="large-photo-button-title">
                   {title}
                 </span>
                 <p class="large-photo-button-description small"><strong>Residential</strong><br>
                   {description}
                 </p>
                 <span class="aside">{price}</span>
               </a>"#
        )
    }

    fn page(listings: &[String]) -> String {
        format!(
            r#"<html><body><div class="large-photo-button-container-flex">{}</div></body></html>"#,
            listings.join("\n")
        )
    }

    #[test]
    fn parses_listing_fields() {
        let html = page(&[listing(
            "1234 Main St",
            "LRA Realty | 63104 | 1,200 sqft",
            "$123,456.78 est.",
            "/data/address-search/index.cfm?parcelid=12345",
        )]);

        let props = parse_summary_page(&html, 3).unwrap();
        assert_eq!(props.len(), 1);
        let p = &props[0];
        assert_eq!(p.address, "1234 Main St");
        assert_eq!(p.realtor, "LRA Realty");
        assert_eq!(p.zip_code, "63104");
        assert_eq!(p.sqft, "1200");
        assert_eq!(p.price, "123456.78");
        assert_eq!(p.land_use, "Residential");
        assert_eq!(p.parcel_id, "12345");
        assert_eq!(p.ward, 3);
    }

    #[test]
    fn empty_page_has_no_listings() {
        let html = "<html><body><p>No properties found.</p></body></html>";
        assert!(parse_summary_page(html, 7).unwrap().is_empty());
    }

    #[test]
    fn short_description_fails_the_page() {
        let html = page(&[
            listing("1 A St", "LRA | 63104 | 900 sqft", "$1", "?parcelid=1"),
            listing("2 B St", "LRA | 63104", "$2", "?parcelid=2"),
        ]);
        let err = parse_summary_page(&html, 1).unwrap_err();
        assert!(matches!(err, ParseError::Description { index: 1, found: 2 }));
    }

    #[test]
    fn missing_price_fails_the_page() {
        let html = page(&[r#"<a class="large-photo-button" href="?parcelid=9">
              <span class="large-photo-button-title">9 Elm</span>
              <p class="large-photo-button-description small"><strong>Vacant</strong> LRA | 63110 | 50 sqft</p>
            </a>"#
            .to_string()]);
        let err = parse_summary_page(&html, 1).unwrap_err();
        assert!(matches!(err, ParseError::MissingNode { field: "price", .. }));
    }

    #[test]
    fn compound_class_names_still_match() {
        let html = page(&[r#"<a class="large-photo-button large-photo-button--lra" href="?parcelid=77">
              <span class="large-photo-button-title text-bold">77 Pine St</span>
              <p class="large-photo-button-description small muted"><strong>Commercial</strong><br>LRA | 63101 | 2,400 sqft</p>
              <span class="large-photo-button-aside">$1,000</span>
            </a>"#
            .to_string()]);
        let props = parse_summary_page(&html, 6).unwrap();
        assert_eq!(props.len(), 1);
        assert_eq!(props[0].address, "77 Pine St");
        assert_eq!(props[0].price, "1000");
        assert_eq!(props[0].sqft, "2400");
        assert_eq!(props[0].land_use, "Commercial");
        assert_eq!(props[0].parcel_id, "77");
    }

    const DETAIL: &str = r#"<html><body>
        <div class="section">
          <h3>Land Use Information</h3>
          <table>
            <tr><th>Zoning:</th><td>B - Two-Family Dwelling</td></tr>
            <tr><th>Land use:</th><td>Vacant Residential</td></tr>
          </table>
        </div>
        <div class="section">
          <h3>Property Information</h3>
          <table>
            <tr><th>Owner name:</th><td>LRA</td></tr>
          </table>
        </div>
        <div class="section">
          <h3>Building permits</h3>
          <table>
            <tr><th>Owner Name</th><th>Permit Type</th></tr>
            <tr><td>Jane Doe</td><td>Demolition</td></tr>
          </table>
        </div>
      </body></html>"#;

    #[test]
    fn parses_detail_labels() {
        let info = parse_detail_page(DETAIL);
        assert_eq!(info.zoning.as_deref(), Some("B - Two-Family Dwelling"));
        assert_eq!(info.land_use.as_deref(), Some("Vacant Residential"));
        assert_eq!(info.owner.as_deref(), Some("LRA"));
    }

    #[test]
    fn parses_permit_rows_by_header() {
        let info = parse_detail_page(DETAIL);
        let expected: PermitRecord = [
            ("Owner Name".to_string(), "Jane Doe".to_string()),
            ("Permit Type".to_string(), "Demolition".to_string()),
        ]
        .into_iter()
        .collect();
        assert_eq!(info.permits, vec![expected]);
    }

    #[test]
    fn line_breaks_keep_only_the_first_line() {
        let html = r#"<html><body>
            <div><h3>Property Information</h3>
              <table><tr><th>Owner name:</th><td>LAND REUTILIZATION AUTH<br>1520 MARKET ST</td></tr></table>
            </div>
            <table>
              <tr><th>Permit Type</th><th>Description</th></tr>
              <tr><td>Demolition</td><td>WRECK 2 STORY<br>BRICK DWELLING</td></tr>
            </table>
          </body></html>"#;
        let info = parse_detail_page(html);
        assert_eq!(info.owner.as_deref(), Some("LAND REUTILIZATION AUTH"));
        assert_eq!(info.permits.len(), 1);
        assert_eq!(info.permits[0]["Description"], "WRECK 2 STORY");
    }

    #[test]
    fn labels_found_page_wide_without_section_heading() {
        let html = r#"<html><body>
            <table>
              <tr><th>Zoning:</th><td>C - Multiple-Family Dwelling</td></tr>
              <tr><th>Owner name:</th><td>LRA</td></tr>
            </table>
          </body></html>"#;
        let info = parse_detail_page(html);
        assert_eq!(info.zoning.as_deref(), Some("C - Multiple-Family Dwelling"));
        assert_eq!(info.owner.as_deref(), Some("LRA"));
        assert_eq!(info.land_use, None);
    }

    #[test]
    fn label_in_data_cell_reads_the_next_cell() {
        let html = r#"<html><body>
            <div><h3>Land Use Information</h3>
              <table>
                <tr><td>Zoning:</td><td>F - Neighborhood Commercial</td></tr>
                <tr><td>Land use:</td><td></td></tr>
              </table>
            </div>
          </body></html>"#;
        let info = parse_detail_page(html);
        assert_eq!(info.zoning.as_deref(), Some("F - Neighborhood Commercial"));
        assert_eq!(info.land_use, None);
    }

    #[test]
    fn permit_record_keeps_header_order() {
        let html = r#"<table>
            <tr><th>Permit Type</th><th>Application Date</th><th>Description</th></tr>
            <tr><td>Fence</td><td>01/02/2015</td><td>New fence</td></tr>
          </table>"#;
        let doc = Html::parse_fragment(html);
        let table = doc.select(&SEL_TABLE).next().unwrap();
        let permits = parse_permit_table(table);
        let keys: Vec<&str> = permits[0].keys().map(String::as_str).collect();
        assert_eq!(keys, vec!["Permit Type", "Application Date", "Description"]);
    }

    #[test]
    fn bare_detail_page_yields_nothing() {
        let info = parse_detail_page("<html><body><p>Parcel not found</p></body></html>");
        assert_eq!(info, DetailInfo::default());
    }

    #[test]
    fn permit_table_without_header_row_is_empty() {
        let html = r#"<table><tr><td>Permit Type</td><td>x</td></tr></table>"#;
        let doc = Html::parse_fragment(html);
        let table = doc.select(&SEL_TABLE).next().unwrap();
        assert!(parse_permit_table(table).is_empty());
    }

    #[test]
    fn extra_permit_cells_are_dropped() {
        let html = r#"<table>
            <tr><th>Permit Type</th></tr>
            <tr><td>Alteration</td><td>stray</td></tr>
            <tr><td></td></tr>
          </table>"#;
        let doc = Html::parse_fragment(html);
        let table = doc.select(&SEL_TABLE).next().unwrap();
        let permits = parse_permit_table(table);
        assert_eq!(permits.len(), 2);
        assert_eq!(permits[0].len(), 1);
        assert_eq!(permits[0]["Permit Type"], "Alteration");
        assert_eq!(permits[1]["Permit Type"], "");
    }
}
