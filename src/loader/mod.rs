//! Reload per-ward snapshots for aggregation and inspection.

use crate::models::{PropertyDetail, WardSnapshot};
use crate::storage::SnapshotStore;
use anyhow::Result;
use std::path::{Path, PathBuf};
use tracing::info;

/// Extract the ward number from a snapshot filename (`save_12.json` → 12).
pub fn ward_from_filename(path: &Path) -> Option<u32> {
    let stem = path.file_stem()?.to_str()?;
    stem.strip_prefix("save_")?.parse().ok()
}

/// Load the given wards in order and concatenate their properties.
/// Any missing or unreadable ward fails the whole load.
pub fn load_wards(store: &SnapshotStore, wards: &[u32]) -> Result<Vec<PropertyDetail>> {
    let mut rows = Vec::new();

    for &ward in wards {
        let snapshot = store.load_ward(ward)?;
        info!("{} properties in {:?}", snapshot.properties.len(), store.path_for(ward));
        rows.extend(snapshot.properties);
    }

    info!("{} properties across {} wards", rows.len(), wards.len());
    Ok(rows)
}

/// Snapshot files present in `dir`, sorted by ward.
pub fn discover_snapshot_files(dir: &Path) -> Result<Vec<(u32, PathBuf)>> {
    if !dir.exists() {
        return Ok(vec![]);
    }

    let mut files = Vec::new();
    for entry in std::fs::read_dir(dir)? {
        let path = entry?.path();
        let is_json = path.extension().map(|e| e == "json").unwrap_or(false);
        if !path.is_file() || !is_json {
            continue;
        }
        if let Some(ward) = ward_from_filename(&path) {
            files.push((ward, path));
        }
    }
    files.sort();
    Ok(files)
}

/// Per-ward numbers for the `stats` command.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WardStats {
    pub ward: u32,
    pub properties: usize,
    pub permits: usize,
    pub max_permits: usize,
}

impl From<&WardSnapshot> for WardStats {
    fn from(snap: &WardSnapshot) -> Self {
        Self {
            ward: snap.ward,
            properties: snap.properties.len(),
            permits: snap.properties.iter().map(|p| p.permits.len()).sum(),
            max_permits: snap.properties.iter().map(|p| p.permits.len()).max().unwrap_or(0),
        }
    }
}

pub fn snapshot_stats(store: &SnapshotStore) -> Result<Vec<WardStats>> {
    discover_snapshot_files(store.dir())?
        .into_iter()
        .map(|(ward, _)| -> Result<WardStats> { Ok(WardStats::from(&store.load_ward(ward)?)) })
        .collect()
}
