//! The comparison spreadsheet: one CSV row per scraped product with the
//! marketplace reference price, the margin and the publish decision. The
//! publish command reads the same file back, so writes and reads share one
//! row type.

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::path::Path;

/// One row of the comparison spreadsheet.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Comparison {
    pub title: String,
    pub portal_price: f64,
    pub meli_price: f64,
    pub margin: f64,
    pub worth_publishing: bool,
    pub meli_category: Option<String>,
    pub image: String,
    pub description: String,
    pub stock: u32,
    pub brand: Option<String>,
    pub category: Option<String>,
    /// When the marketplace price was fetched (RFC 3339).
    pub checked_at: String,
}

/// Write the spreadsheet, replacing any previous one.
pub fn write_report(path: &Path, rows: &[Comparison]) -> Result<()> {
    if let Some(parent) = path.parent() {
        if !parent.as_os_str().is_empty() {
            std::fs::create_dir_all(parent)
                .with_context(|| format!("could not create {}", parent.display()))?;
        }
    }
    let mut writer = csv::Writer::from_path(path)
        .with_context(|| format!("could not create {}", path.display()))?;
    for row in rows {
        writer
            .serialize(row)
            .with_context(|| format!("could not write row for '{}'", row.title))?;
    }
    writer
        .flush()
        .with_context(|| format!("could not flush {}", path.display()))?;
    Ok(())
}

/// Read a spreadsheet produced by `write_report`.
pub fn read_report(path: &Path) -> Result<Vec<Comparison>> {
    let mut reader = csv::Reader::from_path(path)
        .with_context(|| format!("could not open {}", path.display()))?;
    let mut rows = Vec::new();
    for record in reader.deserialize() {
        let row: Comparison = record.context("malformed spreadsheet row")?;
        rows.push(row);
    }
    Ok(rows)
}
