//! `taxreq`: build a taxonomy request from specimen metadata.

use std::path::PathBuf;

use serde::Serialize;
use taxreq_backbone::{BackboneClient, BackboneError};
use taxreq_io::csv::read_delimited;
use taxreq_io::IoError;
use taxreq_recon::config::RunConfig;
use taxreq_recon::engine::{run, ReconInput, ReconMeta};
use taxreq_recon::ingest::{load_specimens, load_whitelist};
use taxreq_recon::summary::ReconSummary;
use taxreq_recon::ReconError;

use crate::exit_codes::{
    EXIT_EMPTY_WORKING_SET, EXIT_ERROR, EXIT_INPUT_READ, EXIT_INVALID_CONFIG, EXIT_OUTPUT_WRITE,
    EXIT_SCHEMA, EXIT_USAGE,
};
use crate::output::{write_outputs, OutputPaths};
use crate::CliError;

pub struct RunArgs {
    pub metadata: PathBuf,
    pub samples: PathBuf,
    pub prefix: String,
    pub config: Option<PathBuf>,
    pub backbone_url: Option<String>,
    pub kingdom: Option<String>,
    pub log_level: String,
    pub json: bool,
}

/// `--json` document.
#[derive(Serialize)]
struct RunReport<'a> {
    meta: &'a ReconMeta,
    summary: &'a ReconSummary,
    outputs: &'a OutputPaths,
}

fn err(code: u8, msg: impl Into<String>) -> CliError {
    CliError { code, message: msg.into(), hint: None }
}

impl From<ReconError> for CliError {
    fn from(e: ReconError) -> Self {
        match &e {
            ReconError::ConfigParse(_) | ReconError::ConfigValidation(_) => {
                err(EXIT_INVALID_CONFIG, e.to_string())
            }
            ReconError::MissingColumn { .. } => err(EXIT_SCHEMA, e.to_string())
                .with_hint("column names can be remapped in the [columns] section of --config"),
            ReconError::MissingJoinKey { .. } => err(EXIT_SCHEMA, e.to_string()),
            ReconError::EmptyWorkingSet => err(EXIT_EMPTY_WORKING_SET, e.to_string())
                .with_hint("check that the samples file lists Process IDs present in the metadata file"),
            ReconError::Parse { .. } => err(EXIT_INPUT_READ, e.to_string()),
        }
    }
}

impl From<IoError> for CliError {
    fn from(e: IoError) -> Self {
        match e {
            IoError::Read { .. } => err(EXIT_INPUT_READ, e.to_string()),
            IoError::Write { .. } => err(EXIT_OUTPUT_WRITE, e.to_string()),
        }
    }
}

impl From<BackboneError> for CliError {
    fn from(e: BackboneError) -> Self {
        err(EXIT_INVALID_CONFIG, e.to_string())
    }
}

/// Load the optional config file and apply flag overrides.
fn load_config(args: &RunArgs) -> Result<RunConfig, CliError> {
    let mut config = match &args.config {
        Some(path) => {
            let text = std::fs::read_to_string(path).map_err(|e| {
                err(EXIT_INVALID_CONFIG, format!("cannot read config {}: {e}", path.display()))
            })?;
            RunConfig::from_toml(&text)?
        }
        None => RunConfig::default(),
    };

    if let Some(url) = &args.backbone_url {
        config.backbone.base_url = url.clone();
    }
    if let Some(kingdom) = &args.kingdom {
        config.backbone.kingdom = Some(kingdom.clone());
    }
    config.validate()?;
    Ok(config)
}

pub fn cmd_run(args: RunArgs) -> Result<(), CliError> {
    if args.prefix.trim().is_empty() {
        return Err(err(EXIT_USAGE, "output prefix must not be empty"));
    }

    let config = load_config(&args)?;
    let paths = OutputPaths::from_prefix(&args.prefix);

    crate::logging::init(&args.log_level, &paths.log).map_err(|e| err(EXIT_OUTPUT_WRITE, e))?;
    tracing::info!("Metadata file: {}", args.metadata.display());
    tracing::info!("Samples file: {}", args.samples.display());
    tracing::info!("Backbone: {}", config.backbone.base_url);

    let store = {
        let text = read_delimited(&args.metadata)?;
        load_specimens(&text.content, text.delimiter, &config.columns)?
    };
    let whitelist = {
        let text = read_delimited(&args.samples)?;
        load_whitelist(&text.content, text.delimiter, &config.columns)?
    };

    let client = BackboneClient::new(&config.backbone)?;
    let result = run(&config, ReconInput { store, whitelist }, &client).map_err(|e| {
        tracing::error!("{e}");
        CliError::from(e)
    })?;

    write_outputs(&paths, &result.output)?;

    if args.json {
        let report = RunReport {
            meta: &result.meta,
            summary: &result.summary,
            outputs: &paths,
        };
        let json = serde_json::to_string_pretty(&report)
            .map_err(|e| err(EXIT_ERROR, format!("JSON serialization error: {e}")))?;
        println!("{json}");
    } else {
        print_summary(&result.summary, &paths);
    }

    Ok(())
}

fn print_summary(s: &ReconSummary, paths: &OutputPaths) {
    eprintln!(
        "{} records reconciled: {} resolved, {} inconsistent, {} rank-invalid ({} species-level skipped)",
        s.reconciled, s.resolved, s.inconsistent, s.rank_invalid, s.filter.species_level_skipped,
    );
    for path in [&paths.request, &paths.inconsistent, &paths.rank_invalid, &paths.log] {
        eprintln!("wrote {}", path.display());
    }
}
