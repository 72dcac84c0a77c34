//! Output module for building and exporting crawl results
//!
//! This module handles:
//! - Merging collected page records into one capped [`CrawlResult`]
//! - Cleaning boilerplate out of the free-text buffers
//! - Writing the result as JSON and printing a console summary

mod aggregate;
mod clean;
mod result;
pub mod stats;

pub use aggregate::{aggregate, normalize_color};
pub use clean::{clean_page_buffer, clean_text};
pub use result::{
    ColorRole, ColorUsageKind, CrawlResult, LogoSet, LogoType, PageSummary, PaletteColor,
    RankedLogo, ResultMetrics, ResultSource,
};
pub use stats::{format_statistics, print_statistics, CrawlStatistics};

use crate::CrawlError;
use std::fs;
use std::path::Path;

/// Serializes a result as pretty-printed JSON
pub fn to_json(result: &CrawlResult) -> Result<String, CrawlError> {
    Ok(serde_json::to_string_pretty(result)?)
}

/// Writes a result as pretty-printed JSON to `path`
///
/// Parent directories are created as needed.
pub fn write_json(result: &CrawlResult, path: &Path) -> Result<(), CrawlError> {
    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        fs::create_dir_all(parent)?;
    }
    fs::write(path, to_json(result)?)?;
    tracing::info!("Wrote crawl result to {}", path.display());
    Ok(())
}
