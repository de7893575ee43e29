//! CLI Exit Code Registry
//!
//! This is the single source of truth for all CLI exit codes.
//! Exit codes are part of the shell contract; pipelines rely on them.
//!
//! # Exit Codes
//!
//! | Code | Meaning                                                   |
//! |------|-----------------------------------------------------------|
//! | 0    | Success (per-record lookup failures do not change this)   |
//! | 1    | General error (unspecified)                               |
//! | 2    | CLI usage error (bad args, wrong arity)                   |
//! | 3    | Input file missing, unreadable or malformed               |
//! | 4    | Schema error: required column or identifier column absent|
//! | 5    | No metadata rows left after applying the samples filter   |
//! | 6    | Invalid configuration file or flag value                  |
//! | 7    | Output or log file could not be written                   |
//!
//! # Adding New Exit Codes
//!
//! 1. Add the constant
//! 2. Document what triggers it
//! 3. Update the table above
//! 4. Wire it into `CliError` construction in `run.rs`

/// Success - all output files written.
pub const EXIT_SUCCESS: u8 = 0;

/// General error - unspecified failure.
/// Avoid using this; prefer a specific error code.
pub const EXIT_ERROR: u8 = 1;

/// Usage error - bad arguments. Clap exits with this code on parse errors.
pub const EXIT_USAGE: u8 = 2;

/// An input table could not be opened, decoded or parsed.
pub const EXIT_INPUT_READ: u8 = 3;

/// A required column, or every accepted identifier column, is missing.
pub const EXIT_SCHEMA: u8 = 4;

/// The samples whitelist shares no Process ID with the metadata.
pub const EXIT_EMPTY_WORKING_SET: u8 = 5;

/// Config file unreadable, unparseable, or failing validation.
pub const EXIT_INVALID_CONFIG: u8 = 6;

/// An output table or the run log could not be written.
pub const EXIT_OUTPUT_WRITE: u8 = 7;
