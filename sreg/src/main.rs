use clap::{CommandFactory, Parser, Subcommand};
use std::path::PathBuf;

mod commands;
mod context;
mod format;

/// sreg - local registry client for container images
///
/// Push images to a storage backend, pull them back into a local cache and
/// search the containers recorded in the local database.
#[derive(Parser, Debug)]
#[command(name = "sreg")]
#[command(version, about, long_about = None)]
struct Cli {
    /// Verbose output (can be repeated: -v, -vv, -vvv)
    #[arg(short, long, global = true, action = clap::ArgAction::Count)]
    verbose: u8,

    /// Configuration file (defaults to SREGISTRY_CONFIG or the user config dir)
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    /// Storage backend: filesystem, google-drive, google-storage
    #[arg(long, global = true)]
    backend: Option<String>,

    /// Control colored output: auto, always, never
    #[arg(long, global = true, default_value = "auto")]
    color: String,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Display version information
    Version,
    /// Push a local image to the backend
    Push {
        /// Image file to push
        path: PathBuf,
        /// Image name: <collection>/<name>[:<tag>][@<version>]
        #[arg(short, long)]
        name: String,
        /// Tag, overriding one given in the name
        #[arg(short, long)]
        tag: Option<String>,
    },
    /// Pull an image into the local cache
    Pull {
        /// Image uri: <collection>/<name>[:<tag>][@<version>]
        uri: String,
    },
    /// Search known containers by name, uri or collection
    Search {
        /// Search term (lists everything when omitted)
        query: Option<String>,
        /// Output format: pretty, json, yaml
        #[arg(short, long, default_value = "pretty")]
        format: String,
    },
    /// Search known containers by label
    Labels {
        /// Label key (any key when omitted)
        #[arg(long)]
        key: Option<String>,
        /// Label value (any value when omitted)
        #[arg(long)]
        value: Option<String>,
        /// Output format: pretty, json, yaml
        #[arg(short, long, default_value = "pretty")]
        format: String,
    },
    /// Print the local image path of a known container
    Get {
        /// Image uri
        uri: String,
    },
    /// Show the full record of a known container
    Inspect {
        /// Image uri
        uri: String,
        /// Output format: pretty, json, yaml
        #[arg(short, long, default_value = "pretty")]
        format: String,
    },
    /// Manage collections in the local database
    Collection {
        #[command(subcommand)]
        command: CollectionCommands,
    },
    /// Manage the local image cache
    Cache {
        #[command(subcommand)]
        command: CacheCommands,
    },
    /// Generate shell completion scripts
    Completion {
        /// Shell to generate completion for
        #[arg(value_enum)]
        shell: clap_complete::Shell,
    },
}

#[derive(Subcommand, Debug)]
enum CollectionCommands {
    /// List collections
    #[command(visible_alias = "ls")]
    List {
        /// Output format: pretty, json, yaml
        #[arg(short, long, default_value = "pretty")]
        format: String,
    },
    /// Remove a collection and its containers from the local database
    #[command(visible_alias = "rm")]
    Remove {
        /// Collection name
        name: String,
        /// Skip confirmation prompt
        #[arg(short, long)]
        force: bool,
    },
}

#[derive(Subcommand, Debug)]
enum CacheCommands {
    /// Show cache statistics
    Stats {
        /// Output format: pretty, json, yaml
        #[arg(short, long, default_value = "pretty")]
        format: String,
    },
    /// Remove all pulled images
    Clear {
        /// Skip confirmation prompt
        #[arg(short, long)]
        force: bool,
    },
}

fn init_tracing(verbosity: context::VerbosityLevel) {
    use tracing_subscriber::{EnvFilter, fmt};

    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(verbosity.log_filter()));

    fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_target(false)
        .with_thread_ids(false)
        .with_file(false)
        .with_line_number(false)
        .init();
}

fn main() {
    let cli = Cli::parse();

    let verbosity = context::VerbosityLevel::from_count(cli.verbose);
    init_tracing(verbosity);

    if let Commands::Completion { shell } = cli.command {
        let mut cmd = Cli::command();
        let bin_name = cmd.get_name().to_string();
        clap_complete::generate(shell, &mut cmd, bin_name, &mut std::io::stdout());
        return;
    }
    if let Commands::Version = cli.command {
        commands::version::print_version();
        return;
    }

    // Build context with precedence: defaults > config file > env vars > CLI flags
    let ctx = match context::AppContext::build(
        cli.config.as_deref(),
        cli.backend.as_deref(),
        format::ColorChoice::from(cli.color.as_str()),
        verbosity,
    ) {
        Ok(ctx) => ctx,
        Err(e) => commands::exit_with(e),
    };

    match cli.command {
        Commands::Version | Commands::Completion { .. } => {}
        Commands::Push { path, name, tag } => {
            commands::image::handle_push(&ctx, &path, &name, tag.as_deref());
        }
        Commands::Pull { uri } => commands::image::handle_pull(&ctx, &uri),
        Commands::Search { query, format } => {
            let fmt = format::OutputFormat::from(format.as_str());
            commands::search::handle_search(&ctx, query.as_deref(), fmt);
        }
        Commands::Labels { key, value, format } => {
            let fmt = format::OutputFormat::from(format.as_str());
            commands::search::handle_labels(&ctx, key.as_deref(), value.as_deref(), fmt);
        }
        Commands::Get { uri } => commands::image::handle_get(&ctx, &uri),
        Commands::Inspect { uri, format } => {
            let fmt = format::OutputFormat::from(format.as_str());
            commands::image::handle_inspect(&ctx, &uri, fmt);
        }
        Commands::Collection { command } => match command {
            CollectionCommands::List { format } => {
                let fmt = format::OutputFormat::from(format.as_str());
                commands::collection::handle_collection_list(&ctx, fmt);
            }
            CollectionCommands::Remove { name, force } => {
                commands::collection::handle_collection_remove(&ctx, &name, force);
            }
        },
        Commands::Cache { command } => match command {
            CacheCommands::Stats { format } => {
                let fmt = format::OutputFormat::from(format.as_str());
                commands::cache::handle_cache_stats(&ctx, fmt);
            }
            CacheCommands::Clear { force } => commands::cache::handle_cache_clear(&ctx, force),
        },
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_cli_definition() {
        Cli::command().debug_assert();
    }

    #[test]
    fn test_parse_push() {
        let cli = Cli::parse_from(["sreg", "-vv", "push", "tool.sif", "--name", "labs/tool", "-t", "1.0"]);
        assert_eq!(cli.verbose, 2);
        match cli.command {
            Commands::Push { path, name, tag } => {
                assert_eq!(path, PathBuf::from("tool.sif"));
                assert_eq!(name, "labs/tool");
                assert_eq!(tag.as_deref(), Some("1.0"));
            }
            other => panic!("unexpected command: {:?}", other),
        }
    }

    #[test]
    fn test_parse_global_flags_after_subcommand() {
        let cli = Cli::parse_from(["sreg", "search", "--backend", "google-drive", "--config", "c.yaml"]);
        assert_eq!(cli.backend.as_deref(), Some("google-drive"));
        assert_eq!(cli.config, Some(PathBuf::from("c.yaml")));
        assert!(matches!(cli.command, Commands::Search { query: None, .. }));
    }

    #[test]
    fn test_parse_collection_rm_alias() {
        let cli = Cli::parse_from(["sreg", "collection", "rm", "labs", "--force"]);
        assert!(matches!(
            cli.command,
            Commands::Collection {
                command: CollectionCommands::Remove { force: true, .. }
            }
        ));
    }
}
