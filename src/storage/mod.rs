use crate::models::{PropertyDetail, WardSnapshot};
use anyhow::{Context, Result};
use chrono::Utc;
use std::fs::File;
use std::io::{BufReader, BufWriter, Write};
use std::path::{Path, PathBuf};
use tracing::info;

// ── Snapshot store ────────────────────────────────────────────────────────────

/// One JSON file per ward, `save_{ward}.json`, rewritten on each crawl.
#[derive(Debug, Clone)]
pub struct SnapshotStore {
    dir: PathBuf,
}

impl SnapshotStore {
    pub fn open(dir: &Path) -> Result<Self> {
        std::fs::create_dir_all(dir)
            .with_context(|| format!("Could not create dir {:?}", dir))?;
        Ok(Self { dir: dir.to_path_buf() })
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    pub fn path_for(&self, ward: u32) -> PathBuf {
        self.dir.join(format!("save_{}.json", ward))
    }

    pub fn save_ward(&self, ward: u32, properties: Vec<PropertyDetail>) -> Result<usize> {
        let path = self.path_for(ward);
        let snapshot = WardSnapshot {
            ward,
            scraped_at: Utc::now().naive_utc(),
            properties,
        };

        let file = File::create(&path)
            .with_context(|| format!("Could not create snapshot {:?}", path))?;
        let mut out = BufWriter::new(file);
        serde_json::to_writer(&mut out, &snapshot)
            .with_context(|| format!("Failed to serialise ward {}", ward))?;
        out.flush()?;

        info!("Ward {}: saved {} properties to {:?}", ward, snapshot.properties.len(), path);
        Ok(snapshot.properties.len())
    }

    pub fn load_ward(&self, ward: u32) -> Result<WardSnapshot> {
        let path = self.path_for(ward);
        let file = File::open(&path)
            .with_context(|| format!("No snapshot for ward {} at {:?}", ward, path))?;
        let snapshot: WardSnapshot = serde_json::from_reader(BufReader::new(file))
            .with_context(|| format!("Corrupt snapshot {:?}", path))?;
        Ok(snapshot)
    }
}
