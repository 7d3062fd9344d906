//! Basic usage example for the libsreg library.
//!
//! Pushes an image file to a directory acting as the remote, pulls it back
//! and lists what the local store knows.
//!
//! Run with: cargo run --example basic_usage -- <image file>

use libsreg::format::{format_age, short_version};
use libsreg::{Client, Config};
use std::path::PathBuf;

fn main() -> Result<(), Box<dyn std::error::Error>> {
    let image = std::env::args()
        .nth(1)
        .map(PathBuf::from)
        .ok_or("usage: basic_usage <image file>")?;

    let workdir = std::env::temp_dir().join("libsreg-example");
    std::fs::create_dir_all(&workdir)?;

    let mut config = Config::default();
    config.filesystem.root = Some(workdir.join("remote"));
    config.database = workdir.join("sregistry.db");
    config.storage = workdir.join("cache");

    let client = Client::from_config(&config)?;
    println!("Using the {} backend\n", client.backend_name());

    let pushed = client.push(&image, "examples/basic", None)?;
    println!("✓ Pushed {}", pushed.uri);
    if let Some(url) = &pushed.url {
        println!("  stored at {}", url);
    }

    let pulled = client.pull("examples/basic")?;
    if let Some(path) = &pulled.path {
        println!("✓ Pulled to {}\n", path.display());
    }

    println!("Known containers:");
    for container in client.containers()? {
        println!(
            "  - {}/{}:{} {} ({})",
            container.collection.name,
            container.name,
            container.tag,
            container.version.as_deref().map(short_version).unwrap_or("-"),
            format_age(&container.created_at)
        );
    }

    Ok(())
}
