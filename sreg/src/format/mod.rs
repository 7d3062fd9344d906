//! Terminal output: status marks, spinners and structured formats.

use indicatif::{ProgressBar, ProgressStyle};
use owo_colors::OwoColorize;
use serde::{Deserialize, Serialize};
use std::io::IsTerminal;
use std::time::Duration;
use tabled::{Table, Tabled, settings::Style};

/// When to use colors and spinners.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ColorChoice {
    #[default]
    Auto,
    Always,
    Never,
}

impl From<&str> for ColorChoice {
    fn from(s: &str) -> Self {
        match s.to_lowercase().as_str() {
            "always" | "yes" | "true" => ColorChoice::Always,
            "never" | "no" | "false" => ColorChoice::Never,
            _ => ColorChoice::Auto,
        }
    }
}

impl ColorChoice {
    /// Resolves the choice against the terminal and `NO_COLOR`.
    pub fn enabled(self) -> bool {
        match self {
            ColorChoice::Always => true,
            ColorChoice::Never => false,
            ColorChoice::Auto => {
                std::env::var_os("NO_COLOR").is_none()
                    && (std::io::stdout().is_terminal() || std::io::stderr().is_terminal())
            }
        }
    }
}

/// Trait for output formatting that can be TTY-aware or plain text
pub trait OutputFormatter {
    fn success(&self, message: &str);

    fn warning(&self, message: &str);

    /// Create a spinner for a transfer of unknown duration
    fn spinner(&self, message: &str) -> ProgressBar;

    /// Stop a spinner, leaving nothing behind on the terminal
    fn finish_spinner(&self, spinner: ProgressBar) {
        spinner.finish_and_clear();
    }
}

/// TTY-aware formatter with colors and spinners
pub struct TtyFormatter;

impl OutputFormatter for TtyFormatter {
    fn success(&self, message: &str) {
        println!("{} {}", "✓".green().bold(), message);
    }

    fn warning(&self, message: &str) {
        eprintln!("{} {}", "⚠".yellow().bold(), message);
    }

    fn spinner(&self, message: &str) -> ProgressBar {
        let spinner = ProgressBar::new_spinner();
        if let Ok(style) = ProgressStyle::default_spinner().template("{spinner:.cyan} {msg}") {
            spinner.set_style(style);
        }
        spinner.set_message(message.to_string());
        spinner.enable_steady_tick(Duration::from_millis(100));
        spinner
    }
}

/// Plain text formatter for non-TTY output (piped, scripted)
pub struct PlainFormatter;

impl OutputFormatter for PlainFormatter {
    fn success(&self, message: &str) {
        println!("✓ {}", message);
    }

    fn warning(&self, message: &str) {
        eprintln!("⚠ {}", message);
    }

    fn spinner(&self, _message: &str) -> ProgressBar {
        ProgressBar::hidden()
    }
}

/// Create the formatter for `color`.
pub fn create_formatter(color: ColorChoice) -> Box<dyn OutputFormatter> {
    if color.enabled() {
        Box::new(TtyFormatter)
    } else {
        Box::new(PlainFormatter)
    }
}

/// Output format for CLI commands
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum OutputFormat {
    /// Human-readable pretty format
    Pretty,
    Json,
    Yaml,
}

impl From<&str> for OutputFormat {
    fn from(s: &str) -> Self {
        match s.to_lowercase().as_str() {
            "json" => OutputFormat::Json,
            "yaml" | "yml" => OutputFormat::Yaml,
            _ => OutputFormat::Pretty,
        }
    }
}

/// Trait for types that can be formatted for CLI output
pub trait Formattable: Serialize {
    /// Format the type for pretty (human-readable) output
    fn format_pretty(&self) -> String;
}

/// Format a single item for output
pub fn format_output<T: Formattable>(item: &T, format: OutputFormat) -> Result<String, String> {
    match format {
        OutputFormat::Pretty => Ok(item.format_pretty()),
        OutputFormat::Json => serde_json::to_string_pretty(item)
            .map_err(|e| format!("Failed to serialize to JSON: {}", e)),
        OutputFormat::Yaml => {
            serde_yaml::to_string(item).map_err(|e| format!("Failed to serialize to YAML: {}", e))
        }
    }
}

/// Format a list as a borderless table, or as JSON/YAML.
///
/// `empty` is printed in pretty mode when there are no rows.
pub fn format_table<T: Tabled + Serialize>(
    rows: &[T],
    format: OutputFormat,
    empty: &str,
) -> Result<String, String> {
    match format {
        OutputFormat::Pretty if rows.is_empty() => Ok(empty.to_string()),
        OutputFormat::Pretty => Ok(Table::new(rows).with(Style::empty()).to_string()),
        OutputFormat::Json => serde_json::to_string_pretty(rows)
            .map_err(|e| format!("Failed to serialize to JSON: {}", e)),
        OutputFormat::Yaml => {
            serde_yaml::to_string(rows).map_err(|e| format!("Failed to serialize to YAML: {}", e))
        }
    }
}

/// Print formatted output, exiting on serialization errors.
pub fn print_formatted(output: Result<String, String>) {
    match output {
        Ok(text) => println!("{}", text.trim_end()),
        Err(e) => {
            eprintln!("Error formatting output: {}", e);
            std::process::exit(1);
        }
    }
}

#[cfg(test)]
mod tests;
