use crate::export::flatten::header;
use crate::models::FlattenedRow;
use anyhow::{Context, Result};
use std::io;
use std::path::Path;

/// Write header + rows to any writer.
pub fn write_records<W: io::Write>(out: W, rows: &[FlattenedRow], max_permits: usize) -> Result<()> {
    let header = header(max_permits);
    let mut writer = csv::Writer::from_writer(out);
    writer.write_record(&header)?;
    for row in rows {
        debug_assert_eq!(row.width(), header.len());
        writer.write_record(row.cells())?;
    }
    writer.flush()?;
    Ok(())
}

/// Write the export file, replacing whatever is at `path`.
pub fn write_csv(path: &Path, rows: &[FlattenedRow], max_permits: usize) -> Result<()> {
    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        std::fs::create_dir_all(parent)
            .with_context(|| format!("Could not create dir {:?}", parent))?;
    }
    let file = std::fs::File::create(path)
        .with_context(|| format!("Could not create {:?}", path))?;
    write_records(file, rows, max_permits)
        .with_context(|| format!("Failed writing CSV to {:?}", path))
}
