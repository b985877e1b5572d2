use clap::{Parser, Subcommand, ValueEnum};
use resmanifest::config::parse_config;
use resmanifest::{ResourceStore, StoreConfig};
use std::path::PathBuf;
use std::process;

/// resmanifest CLI — inspect and edit an XML resource manifest
#[derive(Parser)]
#[command(name = "resmanifest", version, about)]
struct Cli {
    /// Path to the manifest file
    #[arg(long, default_value = "resources.xml")]
    file: PathBuf,

    /// Optional YAML config (root_tag, container, key_field)
    #[arg(long)]
    config: Option<PathBuf>,

    /// Output format
    #[arg(long, default_value = "yaml")]
    format: OutputFormat,

    #[command(subcommand)]
    command: Command,
}

#[derive(Clone, ValueEnum)]
enum OutputFormat {
    Yaml,
    Json,
}

#[derive(Subcommand)]
enum Command {
    /// Write an empty manifest
    Init {
        /// Overwrite an existing file
        #[arg(long)]
        force: bool,
    },

    /// Print the whole manifest tree
    Show,

    /// List the keys of a collection, or the collection names when omitted
    List {
        /// Collection name
        collection: Option<String>,
    },

    /// Add an entry to a collection
    Add {
        /// Collection name
        collection: String,
        /// Entry key (e.g. a resource path)
        key: String,
    },

    /// Remove an entry from a collection
    Remove {
        /// Collection name
        collection: String,
        /// Entry key
        key: String,
    },

    /// Rewrite the manifest in canonical layout
    Format,
}

fn main() {
    env_logger::init();
    let cli = Cli::parse();

    if let Err(e) = run(cli) {
        eprintln!("ERROR:{e}");
        process::exit(1);
    }
}

fn run(cli: Cli) -> Result<(), Box<dyn std::error::Error>> {
    let config = match &cli.config {
        Some(path) => parse_config(path)?,
        None => StoreConfig::default(),
    };
    let mut store = ResourceStore::with_config(config);

    match cli.command {
        Command::Init { force } => {
            if cli.file.exists() && !force {
                return Err(format!(
                    "{} already exists (use --force to overwrite)",
                    cli.file.display()
                )
                .into());
            }
            store.save(&cli.file)?;
            print_output(
                &serde_json::json!({ "ok": true, "created": cli.file.display().to_string() }),
                &cli.format,
            )?;
        }

        Command::Show => {
            store.load(&cli.file)?;
            let tree = serde_json::to_value(store.tree())?;
            print_output(&tree, &cli.format)?;
        }

        Command::List { collection } => {
            store.load(&cli.file)?;
            let items = match collection {
                Some(name) => store.entries(&name),
                None => store.collection_names(),
            };
            print_output(&serde_json::json!(items), &cli.format)?;
        }

        Command::Add { collection, key } => {
            store.load(&cli.file)?;
            store.add_entry(&collection, &key)?;
            store.save(&cli.file)?;
            log::info!("Added {collection}/{key} to {}", cli.file.display());
            print_output(
                &serde_json::json!({ "ok": true, "collection": collection, "added": key }),
                &cli.format,
            )?;
        }

        Command::Remove { collection, key } => {
            store.load(&cli.file)?;
            store.remove_entry(&collection, &key)?;
            store.save(&cli.file)?;
            log::info!("Removed {collection}/{key} from {}", cli.file.display());
            print_output(
                &serde_json::json!({ "ok": true, "collection": collection, "removed": key }),
                &cli.format,
            )?;
        }

        Command::Format => {
            store.load(&cli.file)?;
            store.save(&cli.file)?;
            print_output(&serde_json::json!({ "ok": true }), &cli.format)?;
        }
    }

    Ok(())
}

fn print_output(
    value: &serde_json::Value,
    format: &OutputFormat,
) -> Result<(), Box<dyn std::error::Error>> {
    match format {
        OutputFormat::Json => println!("{}", serde_json::to_string_pretty(value)?),
        OutputFormat::Yaml => print!("{}", serde_yaml::to_string(value)?),
    }
    Ok(())
}
