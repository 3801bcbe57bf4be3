// ── Field cleaners ────────────────────────────────────────────────────────────

/// First number in the text, thousands separators dropped.
/// "$123,456.78 est." → "123456.78"
pub fn clean_price(s: &str) -> String {
    let Some(start) = s.find(|c: char| c.is_ascii_digit()) else {
        return String::new();
    };
    let number: String = s[start..]
        .chars()
        .take_while(|c| c.is_ascii_digit() || *c == ',' || *c == '.')
        .filter(|c| *c != ',')
        .collect();
    number.trim_end_matches('.').to_string()
}

/// Digits only. "1,200 sqft" → "1200"
pub fn clean_sqft(s: &str) -> String {
    s.chars().filter(|c| c.is_ascii_digit()).collect()
}

/// Parcel id is whatever follows the last '='.
/// ".../index.cfm?parcelid=12345" → "12345"
pub fn parcel_id_from_href(href: &str) -> String {
    href.rsplit('=').next().unwrap_or(href).to_string()
}

/// Trim surrounding whitespace, including the newlines the site pads text with.
pub fn clean_text(s: &str) -> String {
    s.trim().to_string()
}

/// Split the "realtor | zip | sqft" description line into trimmed parts.
pub fn split_description(s: &str) -> Vec<String> {
    s.split('|').map(clean_text).collect()
}

// ── Tests ─────────────────────────────────────────────────────────────────────
