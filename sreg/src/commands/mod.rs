use crate::context::AppContext;
use libsreg::Client;
use std::fmt::Display;
use std::io::{self, Write};

/// Cache command handlers
pub mod cache;

/// Collection command handlers
pub mod collection;

/// Push, pull and container lookup handlers
pub mod image;

/// Name and label search handlers
pub mod search;

/// Version command handlers
pub mod version;

#[cfg(test)]
mod testing;

/// Print an error and exit with status 1
pub(crate) fn exit_with(error: impl Display) -> ! {
    eprintln!("Error: {}", error);
    std::process::exit(1);
}

/// Open the client for the context, exiting on configuration errors
pub(crate) fn open_client(ctx: &AppContext) -> Client {
    match ctx.client() {
        Ok(client) => client,
        Err(e) => exit_with(e),
    }
}

/// Ask for confirmation on stdin; anything but y/yes declines
pub(crate) fn confirm(prompt: &str) -> bool {
    print!("{} [y/N]: ", prompt);
    if io::stdout().flush().is_err() {
        return false;
    }

    let mut input = String::new();
    if io::stdin().read_line(&mut input).is_err() {
        return false;
    }
    is_yes(&input)
}

fn is_yes(input: &str) -> bool {
    matches!(input.trim().to_lowercase().as_str(), "y" | "yes")
}
