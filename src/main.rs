//! Command-line entry points for the form pipeline.
//!
//! `classify` prints exactly one label on stdout; `process` runs one phase of
//! the extract/fill cycle and prints nothing on success. Diagnostics go to
//! stderr so stdout stays a clean result channel.

use std::path::PathBuf;
use std::process;

use acrofill::{Classifier, FormConfig, FormProcessor, PdfDocument, ProcessOutcome, Result};
use clap::{Parser, Subcommand};
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;
use tracing_subscriber::EnvFilter;

/// acrofill - classify and fill PDF AcroForms
#[derive(Parser, Debug)]
#[command(name = "acrofill")]
#[command(version, about, long_about = None)]
struct Cli {
    /// Root directory of uploaded source forms
    #[arg(long, env = "ACROFILL_FORM_ROOT", default_value = "form-volt")]
    form_root: PathBuf,

    /// Root directory of intermediate and finalized field artifacts
    #[arg(long, env = "ACROFILL_WORK_ROOT", default_value = "temp-process")]
    work_root: PathBuf,

    /// Root directory of filled output forms
    #[arg(long, env = "ACROFILL_OUTPUT_ROOT", default_value = "filled-forms")]
    output_root: PathBuf,

    /// Log level when RUST_LOG is unset (trace, debug, info, warn, error)
    #[arg(long, default_value = "warn")]
    log_level: String,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Print MISSING, XFA_FOUND, RESTRICTED or OK for a user's form
    Classify {
        /// Owner of the form
        username: String,
        /// Form file name inside the user's form directory
        filename: String,
    },

    /// Extract field names, or fill the form once the finalized map exists
    Process {
        /// Owner of the form
        username: String,
        /// Form file name inside the user's form directory
        filename: String,

        /// Also remove the intermediate field-name list after a fill
        #[arg(long)]
        purge_intermediate: bool,
    },

    /// Show which phase the next `process` run would take
    Status {
        /// Owner of the form
        username: String,
        /// Form file name inside the user's form directory
        filename: String,
    },
}

fn main() {
    let cli = Cli::parse();
    init_logging(&cli.log_level);

    if let Err(e) = run(cli) {
        tracing::error!(error = %e, "command failed");
        eprintln!("acrofill: {e}");
        process::exit(1);
    }
}

fn init_logging(level: &str) {
    let filter = EnvFilter::try_from_default_env()
        .or_else(|_| EnvFilter::try_new(format!("acrofill={level}")))
        .unwrap_or_else(|_| EnvFilter::new("acrofill=warn"));

    tracing_subscriber::registry()
        .with(filter)
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .init();
}

fn run(cli: Cli) -> Result<()> {
    let mut config = FormConfig {
        form_root: cli.form_root,
        work_root: cli.work_root,
        output_root: cli.output_root,
        ..FormConfig::default()
    };

    match cli.command {
        Commands::Classify { username, filename } => {
            let verdict =
                Classifier::<PdfDocument>::classify_user_file(&config, &username, &filename)?;
            println!("{verdict}");
        }
        Commands::Process {
            username,
            filename,
            purge_intermediate,
        } => {
            config.purge_intermediate = purge_intermediate;
            let outcome = FormProcessor::<PdfDocument>::new(config).run(&username, &filename)?;
            match outcome {
                ProcessOutcome::Extracted { artifact, field_count } => {
                    tracing::info!(
                        artifact = %artifact.display(),
                        field_count,
                        "extract phase done"
                    );
                }
                ProcessOutcome::Filled { output, unmatched, .. } => {
                    for name in &unmatched {
                        tracing::debug!(field = %name, "no widget named in form");
                    }
                    tracing::info!(output = %output.display(), "fill phase done");
                }
            }
        }
        Commands::Status { username, filename } => {
            let status = FormProcessor::<PdfDocument>::new(config).status(&username, &filename)?;
            println!("{}", status.state);
            if status.output_exists {
                println!("{}", status.paths.output.display());
            }
            if status.claim_pending {
                tracing::warn!(
                    finalized = %status.paths.finalized.display(),
                    "a claimed finalized artifact is pending"
                );
            }
        }
    }

    Ok(())
}
