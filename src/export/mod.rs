//! Flat CSV export: one row per property, permits spread over numbered
//! column groups sized to the largest permit history in the set.

pub mod flatten;
pub mod writer;

use crate::models::PropertyDetail;
use anyhow::Result;
use std::path::Path;
use tracing::info;

pub use self::flatten::flatten;
pub use self::writer::write_csv;

/// Flatten the full result set and write it to `path`.
pub fn export_properties(path: &Path, rows: &[PropertyDetail]) -> Result<usize> {
    let (flat, max_permits) = flatten(rows)?;
    write_csv(path, &flat, max_permits)?;
    info!(
        "Exported {} properties ({} permit slots) to {:?}",
        flat.len(),
        max_permits,
        path
    );
    Ok(flat.len())
}
