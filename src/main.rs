#![forbid(unsafe_code)]

use anyhow::{Context, Result, anyhow};
use clap::{Parser, Subcommand};
use std::path::PathBuf;
use tracing::{Level as TraceLevel, info, warn};
use tracing_subscriber::FmtSubscriber;

use option_profile::constants::config::LOG_LEVEL_ENV;
use option_profile::persistence::{self, DocumentFormat};
use option_profile::{IniError, OptionPath, ini};

/// Inspect and edit option profile documents
#[derive(Debug, Parser)]
#[command(version, about)]
struct Cli {
    /// Document to operate on (defaults to $OPTION_PROFILE_FILE or the config dir)
    #[arg(short, long, global = true)]
    file: Option<PathBuf>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Debug, Subcommand)]
enum Command {
    /// Print the document in text form (or as flattened JSON)
    Show {
        #[arg(long)]
        json: bool,
    },
    /// Print the value stored at a path such as `Volume:music/Enabled`
    Get { path: String },
    /// Store a value at a path, creating missing nodes
    Set { path: String, value: String },
    /// Remove the value stored at a path
    Unset { path: String },
    /// Sort and renumber the variants of the node at a path
    Renumber { path: String },
    /// Validate the document; text documents report each malformed line
    Check,
    /// Write the document to another file; the extension picks the format
    Convert { output: PathBuf },
}

fn init_logging() -> Result<()> {
    let log_level = match std::env::var(LOG_LEVEL_ENV)
        .unwrap_or_else(|_| "info".to_string())
        .to_lowercase()
        .as_str()
    {
        "trace" => TraceLevel::TRACE,
        "debug" => TraceLevel::DEBUG,
        "warn" => TraceLevel::WARN,
        "error" => TraceLevel::ERROR,
        _ => TraceLevel::INFO,
    };

    let subscriber = FmtSubscriber::builder()
        .with_max_level(log_level)
        .with_writer(std::io::stderr)
        .finish();
    tracing::subscriber::set_global_default(subscriber).context("Failed to install log subscriber")
}

fn parse_path(path: &str) -> Result<OptionPath> {
    path.parse()
        .with_context(|| format!("Invalid option path '{path}'"))
}

/// Per-line diagnostics for text documents; JSON documents either parse or fail
fn check_document(contents: &str, format: DocumentFormat) -> Result<Vec<IniError>> {
    match format {
        DocumentFormat::Ini => Ok(ini::decode(contents).diagnostics),
        DocumentFormat::Json => {
            persistence::parse_store(contents, format)?;
            Ok(Vec::new())
        }
    }
}

fn main() -> Result<()> {
    init_logging()?;

    let cli = Cli::parse();
    let file = cli.file.unwrap_or_else(persistence::default_path);
    info!(path = %file.display(), "Using document");

    match cli.command {
        Command::Show { json } => {
            let store = persistence::read_store(&file)?;
            let format = if json { DocumentFormat::Json } else { DocumentFormat::Ini };
            print!("{}", persistence::render_store(&store, format)?);
        }
        Command::Get { path } => {
            let store = persistence::read_store(&file)?;
            let node = store
                .find(&parse_path(&path)?)
                .ok_or_else(|| anyhow!("Nothing stored at '{path}'"))?;
            println!("{}", node.value().unwrap_or_default());
        }
        Command::Set { path, value } => {
            let mut store = persistence::read_store(&file)?;
            store.get_or_create(&parse_path(&path)?).set_value(value);
            persistence::save_if_dirty(&file, &mut store)?;
        }
        Command::Unset { path } => {
            let mut store = persistence::read_store(&file)?;
            match store.find_mut(&parse_path(&path)?) {
                Some(node) => node.clear_value(),
                None => warn!(path = %path, "Nothing stored at path"),
            }
            persistence::save_if_dirty(&file, &mut store)?;
        }
        Command::Renumber { path } => {
            let mut store = persistence::read_store(&file)?;
            store
                .find_mut(&parse_path(&path)?)
                .ok_or_else(|| anyhow!("Nothing stored at '{path}'"))?
                .renumber_variants_sequentially();
            persistence::save_if_dirty(&file, &mut store)?;
        }
        Command::Check => {
            let contents = std::fs::read_to_string(&file)
                .with_context(|| format!("Failed to read document from {:?}", file))?;
            let diagnostics = check_document(&contents, DocumentFormat::from_path(&file))?;
            for diagnostic in &diagnostics {
                println!("{diagnostic}");
            }
            if !diagnostics.is_empty() {
                return Err(anyhow!("{} malformed line(s)", diagnostics.len()));
            }
        }
        Command::Convert { output } => {
            let store = persistence::read_store(&file)?;
            persistence::write_store(&output, &store)?;
        }
    }
    Ok(())
}
