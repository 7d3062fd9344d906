use super::{confirm, exit_with, open_client};
use crate::context::AppContext;
use crate::format::{self, OutputFormat};
use libsreg::format::format_age;
use libsreg::{Client, Result};
use serde::Serialize;
use tabled::Tabled;

/// A collection with its container count
#[derive(Debug, Clone, Serialize, Tabled)]
pub struct CollectionRow {
    #[tabled(rename = "NAME")]
    pub name: String,
    #[tabled(rename = "CONTAINERS")]
    pub containers: usize,
    #[tabled(rename = "CREATED")]
    pub created: String,
}

/// List collections with their container counts
pub fn list_collections(client: &Client) -> Result<Vec<CollectionRow>> {
    let store = client.store();
    store
        .list_collections()?
        .into_iter()
        .map(|collection| -> Result<CollectionRow> {
            let containers = store.collection_containers(&collection)?.len();
            Ok(CollectionRow {
                containers,
                created: format_age(&collection.created_at),
                name: collection.name,
            })
        })
        .collect()
}

/// Handle the collection list command
pub fn handle_collection_list(ctx: &AppContext, format: OutputFormat) {
    let client = open_client(ctx);
    match list_collections(&client) {
        Ok(rows) => format::print_formatted(format::format_table(
            &rows,
            format,
            "No collections found.",
        )),
        Err(e) => exit_with(e),
    }
}

/// Handle the collection remove command
pub fn handle_collection_remove(ctx: &AppContext, name: &str, force: bool) {
    let mut client = open_client(ctx);

    if !force
        && !confirm(&format!(
            "Remove collection '{}' and all of its containers from the local database?",
            name
        ))
    {
        println!("Cancelled.");
        return;
    }

    match client.delete_collection(name) {
        Ok(removed) => format::create_formatter(ctx.color).success(&format!(
            "Removed collection '{}' ({} container(s))",
            name, removed
        )),
        Err(e) => exit_with(e),
    }
}

#[cfg(test)]
#[path = "collection_tests.rs"]
mod tests;
