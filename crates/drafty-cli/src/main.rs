use miette::{IntoDiagnostic, Result};
use std::io::Read;
use std::path::PathBuf;

use clap::{Parser, Subcommand};

#[derive(Parser)]
#[command(version, about = "Drafty - render and preview Drafty rich-text documents", long_about = None)]
#[command(propagate_version = true)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Render a document as plain text
    Render {
        /// JSON document to read (stdin if omitted)
        input: Option<PathBuf>,
    },
    /// Shorten a document and print it as JSON
    Preview {
        /// JSON document to read (stdin if omitted)
        input: Option<PathBuf>,

        /// Maximum text length in codepoints
        #[arg(long, short = 'n', env = "DRAFTY_MAX_LENGTH", default_value_t = 128)]
        max_length: usize,

        /// Indent the JSON output
        #[arg(long)]
        pretty: bool,
    },
}

fn main() -> Result<()> {
    init_miette();
    init_tracing();

    let cli = Cli::parse();

    match cli.command {
        Commands::Render { input } => {
            let value = read_document(input.as_ref())?;
            let doc = drafty::validate(&value)?;
            println!("{}", drafty::render(&doc));
        }
        Commands::Preview {
            input,
            max_length,
            pretty,
        } => {
            let value = read_document(input.as_ref())?;
            let doc = drafty::validate(&value)?;
            let short = drafty::preview(&doc, max_length);
            let encoded = if pretty {
                serde_json::to_string_pretty(&short)
            } else {
                serde_json::to_string(&short)
            }
            .into_diagnostic()?;
            println!("{}", encoded);
        }
    }

    Ok(())
}

fn read_document(input: Option<&PathBuf>) -> Result<serde_json::Value> {
    let raw = match input {
        Some(path) => {
            tracing::debug!("Reading document: {}", path.display());
            std::fs::read_to_string(path)
                .into_diagnostic()
                .map_err(|err| err.wrap_err(format!("couldn't read {}", path.display())))?
        }
        None => {
            let mut raw = String::new();
            std::io::stdin()
                .read_to_string(&mut raw)
                .into_diagnostic()?;
            raw
        }
    };

    serde_json::from_str(&raw)
        .into_diagnostic()
        .map_err(|err| err.wrap_err("input is not valid JSON"))
}

fn init_tracing() {
    tracing_subscriber::fmt()
        .with_writer(std::io::stderr)
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("warn")),
        )
        .init();
}

fn init_miette() {
    miette::set_hook(Box::new(|_| {
        Box::new(
            miette::MietteHandlerOpts::new()
                .terminal_links(true)
                .with_cause_chain()
                .color(true)
                .tab_width(2)
                .break_words(true)
                .build(),
        )
    }))
    .expect("couldn't set the miette hook");
    miette::set_panic_hook();
}
