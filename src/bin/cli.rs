//! jsonkv CLI
//!
//! Command-line interface for inspecting and maintaining a store.

use std::fs;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use clap::{Parser, Subcommand};
use jsonkv::recovery::DocumentRecovery;
use jsonkv::sweep::{sweep_expired, ExpirySweeper};
use jsonkv::{Config, Row, StoreDefinition, StoreError, StoreRegistry};
use serde_json::Value;
use tracing_subscriber::{fmt, EnvFilter};

/// jsonkv CLI
#[derive(Parser, Debug)]
#[command(name = "jsonkv")]
#[command(about = "Inspect and maintain jsonkv document stores")]
#[command(version)]
struct Args {
    /// Store definition file (JSON)
    #[arg(short, long)]
    schema: PathBuf,

    /// Data directory for stores without an explicit file path
    #[arg(short, long, default_value = "./data")]
    data_dir: PathBuf,

    /// Skip fsync before replacing the document
    #[arg(long)]
    no_sync: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// List all keys
    Keys,

    /// List all rows
    List,

    /// Get a row by key
    Get {
        /// The key to get
        key: String,
    },

    /// Insert a row given as a JSON object
    Insert {
        /// The row, e.g. '{"code": 12345}'
        row: String,
    },

    /// Update columns of a row
    Update {
        /// The key to update
        key: String,

        /// Changed columns as a JSON object
        changes: String,

        /// Append to lists / merge into maps
        #[arg(long)]
        append: bool,

        /// Remove from lists / maps
        #[arg(long)]
        remove: bool,
    },

    /// Delete a row
    Del {
        /// The key to delete
        key: String,
    },

    /// Increment a numeric column
    Incr { key: String, column: String },

    /// Decrement a numeric column
    Decr { key: String, column: String },

    /// Fill newly declared columns into existing rows
    Migrate,

    /// Check that the document parses, without modifying it
    Verify,

    /// Delete expired rows
    Sweep {
        /// Integer expiry column (unix seconds)
        #[arg(long, default_value = "date_expire")]
        column: String,

        /// Keep sweeping on an interval instead of sweeping once
        #[arg(long)]
        watch: bool,

        /// Seconds between sweeps with --watch
        #[arg(long, default_value = "3600")]
        interval: u64,
    },
}

fn main() {
    // Initialize tracing/logging
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new("info,jsonkv=debug"));

    fmt()
        .with_env_filter(filter)
        .with_target(true)
        .with_writer(std::io::stderr)
        .init();

    let args = Args::parse();

    if let Err(e) = run(args) {
        tracing::error!("{}", e);
        std::process::exit(1);
    }
}

fn run(args: Args) -> jsonkv::Result<()> {
    let definition = StoreDefinition::from_json(&fs::read_to_string(&args.schema)?)?;

    let config = Config::builder()
        .data_dir(&args.data_dir)
        .sync_on_write(!args.no_sync)
        .build();

    // Opening the store would reset a corrupted document
    if let Commands::Verify = args.command {
        let path = definition.resolve_path(&config.data_dir);
        let rows = DocumentRecovery::verify(&path)?;
        println!("{}: ok, {} rows", path.display(), rows);
        return Ok(());
    }

    let registry = StoreRegistry::new(config);
    let store = registry.get_or_create(definition)?;

    match args.command {
        Commands::Keys => {
            for key in store.list_keys()? {
                println!("{}", key);
            }
        }
        Commands::List => {
            let rows: Row = store
                .list_all()?
                .into_iter()
                .map(|(key, row)| (key, Value::Object(row)))
                .collect();
            print_json(&Value::Object(rows))?;
        }
        Commands::Get { key } => print_json(&Value::Object(store.get(&key)?))?,
        Commands::Insert { row } => {
            let key = store.insert(&parse_object(&row)?)?;
            println!("{}", key);
        }
        Commands::Update {
            key,
            changes,
            append,
            remove,
        } => store.update_with_flags(&key, parse_object(&changes)?, append, remove)?,
        Commands::Del { key } => store.delete(&key)?,
        Commands::Incr { key, column } => println!("{}", store.increment(&key, &column)?),
        Commands::Decr { key, column } => println!("{}", store.decrement(&key, &column)?),
        Commands::Migrate => println!("{} rows changed", store.migrate()?),
        // Handled before the store is opened
        Commands::Verify => {}
        Commands::Sweep {
            column,
            watch,
            interval,
        } => {
            if watch {
                let _sweeper = ExpirySweeper::spawn(
                    Arc::clone(&store),
                    column.clone(),
                    Duration::from_secs(interval),
                )?;
                loop {
                    std::thread::park();
                }
            }
            let removed = sweep_expired(&store, &column, jsonkv::timestamp::now())?;
            println!("{} rows removed", removed.len());
        }
    }

    Ok(())
}

fn parse_object(json: &str) -> jsonkv::Result<Row> {
    match serde_json::from_str(json)? {
        Value::Object(row) => Ok(row),
        other => Err(StoreError::Serialization(format!(
            "expected a JSON object, got {}",
            other
        ))),
    }
}

fn print_json(value: &Value) -> jsonkv::Result<()> {
    println!("{}", serde_json::to_string_pretty(value)?);
    Ok(())
}
