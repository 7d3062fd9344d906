use super::{exit_with, open_client};
use crate::context::AppContext;
use crate::format::{self, OutputFormat};
use libsreg::format::short_version;
use libsreg::{Client, Descriptor, Result};
use serde::Serialize;
use tabled::Tabled;

/// One search hit as a table row
#[derive(Debug, Clone, Serialize, Tabled)]
pub struct SearchRow {
    #[tabled(rename = "URI")]
    pub uri: String,
    #[tabled(rename = "VERSION")]
    pub version: String,
    #[tabled(rename = "LOCATION")]
    pub location: String,
}

impl From<&Descriptor> for SearchRow {
    fn from(descriptor: &Descriptor) -> Self {
        let version = descriptor
            .image_name()
            .ok()
            .and_then(|name| name.version)
            .map(|v| short_version(&v).to_string())
            .unwrap_or_else(|| "-".to_string());
        let location = descriptor
            .path
            .as_ref()
            .map(|p| p.display().to_string())
            .or_else(|| descriptor.url.clone())
            .unwrap_or_else(|| "-".to_string());

        Self {
            uri: descriptor.uri.clone(),
            version,
            location,
        }
    }
}

/// Search known containers; no query lists everything
pub fn search_rows(client: &Client, query: Option<&str>) -> Result<Vec<SearchRow>> {
    let hits = client.search(query.unwrap_or(""))?;
    Ok(hits.iter().map(SearchRow::from).collect())
}

/// Search known containers by label
pub fn label_rows(client: &Client, key: Option<&str>, value: Option<&str>) -> Result<Vec<SearchRow>> {
    let hits = client.label_search(key, value)?;
    Ok(hits.iter().map(SearchRow::from).collect())
}

/// Handle the search command
pub fn handle_search(ctx: &AppContext, query: Option<&str>, format: OutputFormat) {
    let client = open_client(ctx);
    match search_rows(&client, query) {
        Ok(rows) => format::print_formatted(format::format_table(
            &rows,
            format,
            "No containers found.",
        )),
        Err(e) => exit_with(e),
    }
}

/// Handle the labels command
pub fn handle_labels(
    ctx: &AppContext,
    key: Option<&str>,
    value: Option<&str>,
    format: OutputFormat,
) {
    let client = open_client(ctx);
    match label_rows(&client, key, value) {
        Ok(rows) => format::print_formatted(format::format_table(
            &rows,
            format,
            "No containers match those labels.",
        )),
        Err(e) => exit_with(e),
    }
}

#[cfg(test)]
#[path = "search_tests.rs"]
mod tests;
