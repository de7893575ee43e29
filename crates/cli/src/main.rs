// taxreq - specimen taxonomy reconciliation against the GBIF backbone

mod exit_codes;
mod logging;
mod output;
mod run;

use std::path::PathBuf;
use std::process::ExitCode;

use clap::Parser;

use exit_codes::EXIT_SUCCESS;

#[derive(Parser)]
#[command(name = "taxreq")]
#[command(about = "Reconcile specimen taxonomy against the GBIF backbone and build a taxonomy request")]
#[command(long_version = long_version())]
#[command(version)]
#[command(after_help = "\
Outputs:
  {PREFIX}_taxonomy_request.tsv     resolved records, request columns first
  {PREFIX}_gbif_inconsistent.tsv    lookups that failed or matched no acceptance rule
  {PREFIX}_tax_validation_fails.csv matches whose order and class disagree with the record
  {PREFIX}.log                      run log

Examples:
  taxreq metadata.csv samples.tsv out/BGE_batch1
  taxreq metadata.csv samples.tsv out/batch1 --kingdom Animalia --json
  taxreq metadata.csv samples.tsv out/batch1 --config taxreq.toml")]
struct Cli {
    /// Specimen metadata table (CSV/TSV, delimiter detected)
    metadata: PathBuf,

    /// Samples table listing the Process IDs to include
    samples: PathBuf,

    /// Output path prefix
    prefix: String,

    /// TOML run configuration
    #[arg(long)]
    config: Option<PathBuf>,

    /// Backbone API base URL (overrides config)
    #[arg(long, env = "TAXREQ_BACKBONE_URL")]
    backbone_url: Option<String>,

    /// Kingdom attached to every backbone query (overrides config)
    #[arg(long)]
    kingdom: Option<String>,

    /// Log level when RUST_LOG is unset (error, warn, info, debug, trace)
    #[arg(long, default_value = "info")]
    log_level: String,

    /// Print the run summary as JSON on stdout
    #[arg(long)]
    json: bool,
}

fn long_version() -> &'static str {
    if cfg!(debug_assertions) {
        concat!(
            env!("CARGO_PKG_VERSION"),
            " (", env!("GIT_COMMIT_HASH"), ")",
            "\nbuild:   debug",
            "\ntarget:  ", env!("TARGET"),
        )
    } else {
        concat!(
            env!("CARGO_PKG_VERSION"),
            " (", env!("GIT_COMMIT_HASH"), ")",
            "\nbuild:   release",
            "\ntarget:  ", env!("TARGET"),
        )
    }
}

#[derive(Debug)]
pub struct CliError {
    pub code: u8,
    pub message: String,
    pub hint: Option<String>,
}

impl CliError {
    /// Add a hint to an existing error.
    pub fn with_hint(mut self, hint: impl Into<String>) -> Self {
        self.hint = Some(hint.into());
        self
    }
}

fn main() -> ExitCode {
    let cli = Cli::parse();

    let result = run::cmd_run(run::RunArgs {
        metadata: cli.metadata,
        samples: cli.samples,
        prefix: cli.prefix,
        config: cli.config,
        backbone_url: cli.backbone_url,
        kingdom: cli.kingdom,
        log_level: cli.log_level,
        json: cli.json,
    });

    match result {
        Ok(()) => ExitCode::from(EXIT_SUCCESS),
        Err(CliError { code, message, hint }) => {
            if !message.is_empty() {
                eprintln!("error: {}", message);
            }
            if let Some(hint) = hint {
                eprintln!("hint:  {}", hint);
            }
            ExitCode::from(code)
        }
    }
}
