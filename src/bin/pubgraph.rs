//! pubgraph CLI: build a publication graph from line-delimited JSON.
//!
//! Usage:
//!   pubgraph ingest <input.jsonl> [--db path | --neo4j-uri uri] [--rows N] [--no-index] [--batch] [--force]
//!   pubgraph stats [--db path | --neo4j-uri uri]

use clap::{Args, Parser, Subcommand};
use pubgraph::config::default_db_path;
use pubgraph::{Config, GraphStore, Ingestor, Label, OpenStore, RelType, SqliteStore, StoreConfig};
use std::path::PathBuf;
use std::sync::Arc;
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(
    name = "pubgraph",
    version,
    about = "Bibliographic metadata to property-graph ingestion"
)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
    /// YAML config file; flags override its values
    #[arg(long, global = true)]
    config: Option<PathBuf>,
}

#[derive(Subcommand)]
enum Commands {
    /// Ingest a line-delimited JSON file of publication records
    Ingest {
        /// Input file, one JSON record per line
        input: PathBuf,
        #[command(flatten)]
        store: StoreArgs,
        /// Only consume the first N records
        #[arg(long)]
        rows: Option<usize>,
        /// Skip identifier indexes and use direct property matches
        #[arg(long)]
        no_index: bool,
        /// Create nodes with the bulk loader
        #[arg(long)]
        batch: bool,
        /// Nodes per bulk statement
        #[arg(long)]
        chunk_size: Option<usize>,
        /// Wipe and rebuild even if the store looks populated
        #[arg(long)]
        force: bool,
    },
    /// Print node and relationship counts
    Stats {
        #[command(flatten)]
        store: StoreArgs,
    },
}

#[derive(Args)]
struct StoreArgs {
    /// Path to SQLite database file
    #[arg(long, conflicts_with = "neo4j_uri")]
    db: Option<PathBuf>,
    /// Neo4j Bolt URI (requires the `neo4j` feature)
    #[arg(long)]
    neo4j_uri: Option<String>,
    #[arg(long, requires = "neo4j_uri")]
    neo4j_user: Option<String>,
    #[arg(long, requires = "neo4j_uri")]
    neo4j_password: Option<String>,
}

impl StoreArgs {
    fn apply(self, store: &mut StoreConfig) {
        if let Some(path) = self.db {
            *store = StoreConfig::Sqlite { path: Some(path) };
        } else if let Some(uri) = self.neo4j_uri {
            let (user, password) = match store {
                StoreConfig::Neo4j { user, password, .. } => (user.clone(), password.clone()),
                StoreConfig::Sqlite { .. } => ("neo4j".to_string(), String::new()),
            };
            *store = StoreConfig::Neo4j {
                uri,
                user: self.neo4j_user.unwrap_or(user),
                password: self.neo4j_password.unwrap_or(password),
            };
        }
    }
}

fn load_config(path: Option<PathBuf>) -> Result<Config, String> {
    match path {
        Some(path) => Config::load(&path).map_err(|e| e.to_string()),
        None => Ok(Config::default()),
    }
}

async fn open_store(config: &StoreConfig) -> Result<Arc<dyn GraphStore>, String> {
    match config {
        StoreConfig::Sqlite { path } => {
            let path = path.clone().unwrap_or_else(default_db_path);
            let store = SqliteStore::open(&path).map_err(|e| format!("Failed to open database: {}", e))?;
            Ok(Arc::new(store))
        }
        #[cfg(feature = "neo4j")]
        StoreConfig::Neo4j { uri, user, password } => {
            let store = pubgraph::Neo4jStore::connect(uri, user, password)
                .await
                .map_err(|e| format!("Failed to connect to Neo4j: {}", e))?;
            Ok(Arc::new(store))
        }
        #[cfg(not(feature = "neo4j"))]
        StoreConfig::Neo4j { .. } => {
            Err("this build has no Neo4j support; rebuild with --features neo4j".to_string())
        }
    }
}

async fn cmd_ingest(mut config: Config, input: PathBuf) -> i32 {
    let store = match open_store(&config.store).await {
        Ok(s) => s,
        Err(e) => {
            eprintln!("Error: {}", e);
            return 1;
        }
    };
    let ingest = std::mem::take(&mut config.ingest);
    let ingestor = Ingestor::new(store, ingest);
    match ingestor.ingest_file(&input).await {
        Ok(report) => {
            print!("{}", report);
            0
        }
        Err(e) => {
            eprintln!("Error: {}", e);
            1
        }
    }
}

async fn cmd_stats(config: Config) -> i32 {
    let store = match open_store(&config.store).await {
        Ok(s) => s,
        Err(e) => {
            eprintln!("Error: {}", e);
            return 1;
        }
    };
    println!("{:<16}  {:>9}", "LABEL", "NODES");
    println!("{}", "-".repeat(27));
    for label in Label::ALL {
        match store.count_nodes_with_label(label).await {
            Ok(n) => println!("{:<16}  {:>9}", label.as_str(), n),
            Err(e) => {
                eprintln!("Error: {}", e);
                return 1;
            }
        }
    }
    println!();
    println!("{:<16}  {:>9}", "RELATIONSHIP", "EDGES");
    println!("{}", "-".repeat(27));
    for rel_type in RelType::ALL {
        match store.count_relationships(Some(rel_type)).await {
            Ok(n) => println!("{:<16}  {:>9}", rel_type.as_str(), n),
            Err(e) => {
                eprintln!("Error: {}", e);
                return 1;
            }
        }
    }
    0
}

#[tokio::main]
async fn main() {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();
    let mut config = match load_config(cli.config) {
        Ok(c) => c,
        Err(e) => {
            eprintln!("Error: {}", e);
            std::process::exit(1);
        }
    };

    let code = match cli.command {
        Commands::Ingest {
            input,
            store,
            rows,
            no_index,
            batch,
            chunk_size,
            force,
        } => {
            store.apply(&mut config.store);
            if rows.is_some() {
                config.ingest.row_cap = rows;
            }
            if no_index {
                config.ingest.use_index = false;
            }
            if batch {
                config.ingest.use_batch_insert = true;
            }
            if let Some(chunk_size) = chunk_size {
                config.ingest.chunk_size = chunk_size;
            }
            if force {
                config.ingest.force_rebuild = true;
            }
            cmd_ingest(config, input).await
        }
        Commands::Stats { store } => {
            store.apply(&mut config.store);
            cmd_stats(config).await
        }
    };
    std::process::exit(code);
}
