use crate::models::{FlattenedRow, PERMIT_FIELDS, PERMIT_WIDTH, PermitRecord, PropertyDetail};

#[derive(Debug, thiserror::Error)]
pub enum FlattenError {
    #[error("no properties to flatten")]
    Empty,
}

/// Spread each property's permits over `max_permit_count` fixed slots, where
/// the max is taken over the whole set before any row is built.
pub fn flatten(rows: &[PropertyDetail]) -> Result<(Vec<FlattenedRow>, usize), FlattenError> {
    let max_permits = rows
        .iter()
        .map(|r| r.permits.len())
        .max()
        .ok_or(FlattenError::Empty)?;

    let flattened = rows.iter().map(|r| flatten_row(r, max_permits)).collect();
    Ok((flattened, max_permits))
}

fn flatten_row(row: &PropertyDetail, slots: usize) -> FlattenedRow {
    let s = &row.summary;
    let fields = [
        s.address.clone(),
        s.price.clone(),
        s.zip_code.clone(),
        s.sqft.clone(),
        s.land_use.clone(),
        s.ward.to_string(),
        s.realtor.clone(),
        s.parcel_id.clone(),
        row.zoning.clone().unwrap_or_default(),
        row.owner.clone().unwrap_or_default(),
    ];

    let permits = (0..slots)
        .map(|i| row.permits.get(i).map(permit_slot).unwrap_or_default())
        .collect();

    FlattenedRow { fields, permits }
}

fn permit_slot(permit: &PermitRecord) -> [String; PERMIT_WIDTH] {
    PERMIT_FIELDS.map(|field| permit.get(field).cloned().unwrap_or_default())
}

/// Header: fixed property columns, then "Permit {n} {field}" per slot.
pub fn header(max_permits: usize) -> Vec<String> {
    let fixed = crate::models::PROPERTY_COLUMNS.iter().map(|c| c.to_string());
    let permits = (1..=max_permits)
        .flat_map(|n| PERMIT_FIELDS.iter().map(move |f| format!("Permit {} {}", n, f)));
    fixed.chain(permits).collect()
}
