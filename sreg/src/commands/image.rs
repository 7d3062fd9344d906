use super::{exit_with, open_client};
use crate::context::AppContext;
use crate::format::{self, Formattable, OutputFormat, OutputFormatter};
use chrono::{DateTime, Utc};
use libsreg::format::{format_age, format_optional_size};
use libsreg::{Client, Container, Descriptor, Result, SregError, metadata};
use serde::Serialize;
use serde_json::Value;
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

/// Result of a push or pull
#[derive(Debug, Clone, Serialize)]
pub struct TransferView {
    pub uri: String,
    pub size: Option<u64>,
    pub path: Option<PathBuf>,
    pub url: Option<String>,
}

impl From<Descriptor> for TransferView {
    fn from(descriptor: Descriptor) -> Self {
        Self {
            uri: descriptor.uri,
            size: descriptor.size,
            path: descriptor.path,
            url: descriptor.url,
        }
    }
}

impl Formattable for TransferView {
    fn format_pretty(&self) -> String {
        let mut lines = vec![format!("URI:  {}", self.uri)];
        if self.size.is_some() {
            lines.push(format!("Size: {}", format_optional_size(self.size)));
        }
        if let Some(path) = &self.path {
            lines.push(format!("Path: {}", path.display()));
        }
        if let Some(url) = &self.url {
            lines.push(format!("URL:  {}", url));
        }
        lines.join("\n")
    }
}

/// A known container with its inspection document
#[derive(Debug, Clone, Serialize)]
pub struct ContainerDetails {
    pub uri: String,
    pub collection: String,
    pub name: String,
    pub tag: String,
    pub version: Option<String>,
    pub client: String,
    pub image: Option<String>,
    pub url: Option<String>,
    pub created_at: DateTime<Utc>,
    pub labels: BTreeMap<String, String>,
    pub metrics: Value,
}

impl From<&Container> for ContainerDetails {
    fn from(container: &Container) -> Self {
        let metrics = container.metrics_document();
        Self {
            uri: container.uri.clone(),
            collection: container.collection.name.clone(),
            name: container.name.clone(),
            tag: container.tag.clone(),
            version: container.version.clone(),
            client: container.client.clone(),
            image: container.image.clone(),
            url: container.url.clone(),
            created_at: container.created_at,
            labels: metadata::labels(&metrics),
            metrics,
        }
    }
}

impl Formattable for ContainerDetails {
    fn format_pretty(&self) -> String {
        let mut output = String::new();

        output.push_str(&format!("URI:        {}\n", self.uri));
        output.push_str(&format!("Collection: {}\n", self.collection));
        output.push_str(&format!("Name:       {}\n", self.name));
        output.push_str(&format!("Tag:        {}\n", self.tag));
        output.push_str(&format!(
            "Version:    {}\n",
            self.version.as_deref().unwrap_or("-")
        ));
        output.push_str(&format!("Backend:    {}\n", self.client));
        output.push_str(&format!(
            "Image:      {}\n",
            self.image.as_deref().unwrap_or("-")
        ));
        if let Some(url) = &self.url {
            output.push_str(&format!("URL:        {}\n", url));
        }
        output.push_str(&format!("Created:    {}\n", format_age(&self.created_at)));

        if !self.labels.is_empty() {
            output.push_str("\nLabels:\n");
            for (key, value) in &self.labels {
                output.push_str(&format!("  {}: {}\n", key, value));
            }
        }

        output
    }
}

/// Push a local image and describe the result
pub fn push_image(
    client: &Client,
    path: &Path,
    name: &str,
    tag: Option<&str>,
) -> Result<TransferView> {
    client.push(path, name, tag).map(TransferView::from)
}

/// Pull an image into the cache and describe the result
pub fn pull_image(client: &Client, uri: &str) -> Result<TransferView> {
    client.pull(uri).map(TransferView::from)
}

/// Local image path of a known container
pub fn image_path(client: &Client, uri: &str) -> Result<PathBuf> {
    let container = client.find(uri)?;
    container
        .image
        .map(PathBuf::from)
        .ok_or_else(|| SregError::not_found("image file", container.uri))
}

/// Full record of a known container
pub fn container_details(client: &Client, uri: &str) -> Result<ContainerDetails> {
    client.find(uri).map(|c| ContainerDetails::from(&c))
}

/// Handle the push command
pub fn handle_push(ctx: &AppContext, path: &Path, name: &str, tag: Option<&str>) {
    let client = open_client(ctx);
    let formatter = format::create_formatter(ctx.color);

    let spinner = formatter.spinner(&format!("Pushing {}", path.display()));
    let result = push_image(&client, path, name, tag);
    formatter.finish_spinner(spinner);

    report_transfer(formatter.as_ref(), "Pushed", result);
}

/// Handle the pull command
pub fn handle_pull(ctx: &AppContext, uri: &str) {
    let client = open_client(ctx);
    let formatter = format::create_formatter(ctx.color);

    let spinner = formatter.spinner(&format!("Pulling {}", uri));
    let result = pull_image(&client, uri);
    formatter.finish_spinner(spinner);

    report_transfer(formatter.as_ref(), "Pulled", result);
}

fn report_transfer(formatter: &dyn OutputFormatter, action: &str, result: Result<TransferView>) {
    match result {
        Ok(view) => {
            formatter.success(&format!("{} {}", action, view.uri));
            println!("{}", view.format_pretty());
        }
        Err(e) => exit_with(e),
    }
}

/// Handle the get command
pub fn handle_get(ctx: &AppContext, uri: &str) {
    let client = open_client(ctx);
    match image_path(&client, uri) {
        Ok(path) => println!("{}", path.display()),
        Err(e) => exit_with(e),
    }
}

/// Handle the inspect command
pub fn handle_inspect(ctx: &AppContext, uri: &str, format: OutputFormat) {
    let client = open_client(ctx);
    match container_details(&client, uri) {
        Ok(details) => format::print_formatted(format::format_output(&details, format)),
        Err(e) => exit_with(e),
    }
}

#[cfg(test)]
#[path = "image_tests.rs"]
mod tests;
