//! File export of stored quotes (JSON and CSV)

use crate::storage::StoredQuote;
use crate::HarvestError;
use chrono::Utc;
use std::fs::{self, File};
use std::io::{self, BufWriter, Write};
use std::path::{Path, PathBuf};

const CSV_HEADER: [&str; 6] = ["id", "text", "author", "tags", "source_url", "scraped_at"];

/// Supported export formats
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ExportFormat {
    Json,
    Csv,
}

impl ExportFormat {
    pub fn extension(&self) -> &'static str {
        match self {
            ExportFormat::Json => "json",
            ExportFormat::Csv => "csv",
        }
    }
}

/// Timestamped export file path inside `dir`, e.g. `data/quotes_20240101_120000.json`
pub fn export_path(dir: &Path, format: ExportFormat) -> PathBuf {
    let stamp = Utc::now().format("%Y%m%d_%H%M%S");
    dir.join(format!("quotes_{}.{}", stamp, format.extension()))
}

/// Writes quotes to `path` in the given format, creating parent directories
pub fn export_quotes(
    quotes: &[StoredQuote],
    path: &Path,
    format: ExportFormat,
) -> Result<(), HarvestError> {
    match format {
        ExportFormat::Json => export_json(quotes, path),
        ExportFormat::Csv => export_csv(quotes, path),
    }
}

pub fn export_json(quotes: &[StoredQuote], path: &Path) -> Result<(), HarvestError> {
    let mut writer = create(path)?;
    serde_json::to_writer_pretty(&mut writer, quotes)?;
    writer.flush()?;
    tracing::info!("Exported {} quotes to {}", quotes.len(), path.display());
    Ok(())
}

pub fn export_csv(quotes: &[StoredQuote], path: &Path) -> Result<(), HarvestError> {
    let mut writer = create(path)?;
    write_csv(&mut writer, quotes)?;
    writer.flush()?;
    tracing::info!("Exported {} quotes to {}", quotes.len(), path.display());
    Ok(())
}

fn create(path: &Path) -> Result<BufWriter<File>, HarvestError> {
    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        fs::create_dir_all(parent)?;
    }
    let file = File::create(path).map_err(|e| {
        HarvestError::Export(format!("cannot create {}: {}", path.display(), e))
    })?;
    Ok(BufWriter::new(file))
}

/// Writes a header row and one row per quote; tags are joined with ", "
pub fn write_csv<W: Write>(mut w: W, quotes: &[StoredQuote]) -> io::Result<()> {
    write_row(&mut w, &CSV_HEADER)?;
    for quote in quotes {
        let id = quote.id.to_string();
        let tags = quote.tags.join(", ");
        let source = quote.source_url.as_deref().unwrap_or("");
        write_row(
            &mut w,
            &[
                id.as_str(),
                quote.text.as_str(),
                quote.author.as_str(),
                tags.as_str(),
                source,
                quote.scraped_at.as_str(),
            ],
        )?;
    }
    Ok(())
}

fn needs_quotes(field: &str) -> bool {
    field.contains(',') || field.contains('"') || field.contains('\n') || field.contains('\r')
}

fn write_row<W: Write>(w: &mut W, row: &[&str]) -> io::Result<()> {
    let mut first = true;
    for cell in row {
        if !first {
            write!(w, ",")?;
        } else {
            first = false;
        }
        if needs_quotes(cell) {
            write!(w, "\"{}\"", cell.replace('"', "\"\""))?;
        } else {
            write!(w, "{}", cell)?;
        }
    }
    writeln!(w)
}
