mod commands;
mod config;

use anyhow::Result;
use clap::{Parser, Subcommand};
use std::path::PathBuf;

use commands::extract::ExtractArgs;
use commands::probe::ProbeArgs;
use commands::vectors::{DEMO_COLLECTION, DEMO_VECTOR_SIZE};
use vectors::{Distance, DEFAULT_SCORE_THRESHOLD, DEFAULT_SEARCH_LIMIT};

#[derive(Parser)]
#[command(name = "kiln")]
#[command(about = "Vector store client, diagram extractor and JSON-RPC server probe")]
#[command(version)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Extract mermaid diagrams from a markdown file
    #[command(display_order = 1)]
    Extract {
        /// Markdown file to scan
        input: PathBuf,

        /// Directory for the extracted files
        output_dir: Option<PathBuf>,

        /// Fence tag to extract
        #[arg(long)]
        tag: Option<String>,

        /// Extension of the written files
        #[arg(long)]
        extension: Option<String>,
    },
    /// Run initialize, tools/list and tools/call against a tool server
    #[command(display_order = 2)]
    Probe {
        /// Server executable (replaces the configured command and args)
        #[arg(long)]
        command: Option<String>,

        /// Server argument, repeatable
        #[arg(long = "arg", allow_hyphen_values = true)]
        args: Vec<String>,

        /// Maximum startup wait in milliseconds
        #[arg(long)]
        settle_ms: Option<u64>,

        /// Maximum wait per response in milliseconds
        #[arg(long)]
        timeout_ms: Option<u64>,
    },
    /// Vector store operations
    #[command(display_order = 3)]
    Vectors {
        /// Vector store URL (overrides config and KILN_VECTORS_URL)
        #[arg(long, global = true)]
        url: Option<String>,

        #[command(subcommand)]
        action: VectorsAction,
    },
    /// Configuration management
    #[command(display_order = 4)]
    Config {
        #[command(subcommand)]
        action: ConfigAction,
    },
}

#[derive(Subcommand)]
enum VectorsAction {
    /// Check that the service is up
    Health,
    /// List collection names
    Collections,
    /// Create a collection
    Create {
        name: String,

        /// Vector dimensionality
        #[arg(short, long, default_value_t = DEMO_VECTOR_SIZE)]
        size: usize,

        /// cosine, euclidean or dot
        #[arg(short, long, default_value = "cosine")]
        distance: Distance,
    },
    /// Insert or replace points from a JSON file (`-` for stdin)
    Upsert { collection: String, points: String },
    /// Search for the nearest points
    Search {
        collection: String,

        /// Query vector: `0.1,0.2,...` or `value*dims`
        #[arg(long, allow_hyphen_values = true)]
        vector: String,

        /// Maximum results
        #[arg(short, long, default_value_t = DEFAULT_SEARCH_LIMIT)]
        limit: usize,

        /// Minimum score
        #[arg(short, long, default_value_t = DEFAULT_SCORE_THRESHOLD)]
        threshold: f32,
    },
    /// Walk through every operation with sample prompt vectors
    Demo {
        #[arg(long, default_value = DEMO_COLLECTION)]
        collection: String,

        #[arg(long, default_value_t = DEMO_VECTOR_SIZE)]
        size: usize,
    },
}

#[derive(Subcommand)]
enum ConfigAction {
    /// Show current configuration
    Show,
    /// Show configuration file path
    Path,
    /// Write the default configuration file
    Init,
}

fn main() -> Result<()> {
    let cli = Cli::parse();

    let rt = tokio::runtime::Runtime::new()?;
    rt.block_on(async_main(cli.command))
}

async fn async_main(command: Commands) -> Result<()> {
    // Default to WARN level for quiet CLI output
    // Use RUST_LOG=info or RUST_LOG=debug for verbose output
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::from_default_env()
                .add_directive(tracing::Level::WARN.into()),
        )
        .with_writer(std::io::stderr)
        .init();

    let cfg = config::load_config()?;

    match command {
        Commands::Extract {
            input,
            output_dir,
            tag,
            extension,
        } => commands::extract::handle_extract(
            ExtractArgs {
                input,
                output_dir,
                tag,
                extension,
            },
            &cfg.diagrams,
        ),
        Commands::Probe {
            command,
            args,
            settle_ms,
            timeout_ms,
        } => {
            commands::probe::handle_probe(
                ProbeArgs {
                    command,
                    args,
                    settle_ms,
                    timeout_ms,
                },
                &cfg.probe,
            )
            .await
        }
        Commands::Vectors { url, action } => handle_vectors(action, url, &cfg).await,
        Commands::Config { action } => handle_config(action),
    }
}

async fn handle_vectors(action: VectorsAction, url: Option<String>, cfg: &config::Config) -> Result<()> {
    use commands::vectors;

    let client = vectors::connect(&cfg.vectors, url)?;
    match action {
        VectorsAction::Health => vectors::handle_health(&client).await,
        VectorsAction::Collections => vectors::handle_collections(&client).await,
        VectorsAction::Create {
            name,
            size,
            distance,
        } => vectors::handle_create(&client, &name, size, distance).await,
        VectorsAction::Upsert { collection, points } => {
            vectors::handle_upsert(&client, &collection, &points).await
        }
        VectorsAction::Search {
            collection,
            vector,
            limit,
            threshold,
        } => vectors::handle_search(&client, &collection, &vector, limit, Some(threshold)).await,
        VectorsAction::Demo { collection, size } => {
            vectors::run_demo(&client, &collection, size).await
        }
    }
}

fn handle_config(action: ConfigAction) -> Result<()> {
    match action {
        ConfigAction::Show => {
            let cfg = config::load_config()?;
            let toml_str = toml::to_string_pretty(&cfg)?;
            println!("{}", toml_str);
            Ok(())
        }
        ConfigAction::Path => {
            let path = config::get_config_file()?;
            println!("{}", path.display());
            Ok(())
        }
        ConfigAction::Init => {
            let config_file = config::get_config_file()?;

            if config_file.exists() {
                println!("Config file already exists: {}", config_file.display());
                return Ok(());
            }

            let cfg = config::Config::default();
            config::save_config(&cfg)?;
            println!("Created config file: {}", config_file.display());

            println!();
            println!("Defaults:");
            println!("  Vector store: {}", cfg.vectors.url);
            println!("  Diagram output: {}", cfg.diagrams.output_dir.display());
            println!("  Probe command: {}", cfg.probe.command_line());
            Ok(())
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::CommandFactory;

    #[test]
    fn test_cli_definition() {
        Cli::command().debug_assert();
    }

    #[test]
    fn test_parse_extract() {
        let cli = Cli::try_parse_from(["kiln", "extract", "design.md", "out", "--tag", "plantuml"]).unwrap();
        match cli.command {
            Commands::Extract {
                input,
                output_dir,
                tag,
                extension,
            } => {
                assert_eq!(input, PathBuf::from("design.md"));
                assert_eq!(output_dir, Some(PathBuf::from("out")));
                assert_eq!(tag.as_deref(), Some("plantuml"));
                assert!(extension.is_none());
            }
            _ => panic!("expected extract"),
        }
    }

    #[test]
    fn test_parse_probe_args() {
        let cli = Cli::try_parse_from([
            "kiln", "probe", "--command", "node", "--arg", "server.js", "--arg=--stdio", "--settle-ms", "0",
        ])
        .unwrap();
        match cli.command {
            Commands::Probe {
                command,
                args,
                settle_ms,
                timeout_ms,
            } => {
                assert_eq!(command.as_deref(), Some("node"));
                assert_eq!(args, vec!["server.js".to_string(), "--stdio".to_string()]);
                assert_eq!(settle_ms, Some(0));
                assert!(timeout_ms.is_none());
            }
            _ => panic!("expected probe"),
        }
    }

    #[test]
    fn test_parse_vectors_search_defaults() {
        let cli = Cli::try_parse_from([
            "kiln", "vectors", "search", "docs", "--vector", "0.15*8", "--url", "http://qdrant:6333",
        ])
        .unwrap();
        match cli.command {
            Commands::Vectors {
                url,
                action:
                    VectorsAction::Search {
                        collection,
                        vector,
                        limit,
                        threshold,
                    },
            } => {
                assert_eq!(url.as_deref(), Some("http://qdrant:6333"));
                assert_eq!(collection, "docs");
                assert_eq!(vector, "0.15*8");
                assert_eq!(limit, 5);
                assert_eq!(threshold, 0.5);
            }
            _ => panic!("expected vectors search"),
        }
    }

    #[test]
    fn test_parse_create_distance() {
        let cli = Cli::try_parse_from(["kiln", "vectors", "create", "docs", "--size", "384", "--distance", "dot"]).unwrap();
        match cli.command {
            Commands::Vectors {
                action: VectorsAction::Create { name, size, distance },
                ..
            } => {
                assert_eq!(name, "docs");
                assert_eq!(size, 384);
                assert_eq!(distance, Distance::Dot);
            }
            _ => panic!("expected vectors create"),
        }
        assert!(Cli::try_parse_from(["kiln", "vectors", "create", "docs", "--distance", "manhattan"]).is_err());
    }
}
