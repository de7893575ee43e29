use std::fmt;

#[derive(Debug)]
pub enum ReconError {
    /// TOML parse / deserialization error.
    ConfigParse(String),
    /// Config validation error (bad threshold, empty alias list, etc.).
    ConfigValidation(String),
    /// Required column absent from a source table.
    MissingColumn { source: String, column: String },
    /// None of the accepted identifier columns exist in a source table.
    MissingJoinKey { source: String, candidates: Vec<String> },
    /// Whitelist intersection left nothing to reconcile.
    EmptyWorkingSet,
    /// Malformed delimited input.
    Parse { source: String, message: String },
}

impl fmt::Display for ReconError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::ConfigParse(msg) => write!(f, "config parse error: {msg}"),
            Self::ConfigValidation(msg) => write!(f, "config validation error: {msg}"),
            Self::MissingColumn { source, column } => {
                write!(f, "{source}: missing required column '{column}'")
            }
            Self::MissingJoinKey { source, candidates } => {
                write!(
                    f,
                    "{source}: no identifier column found (looked for: {})",
                    candidates.join(", ")
                )
            }
            Self::EmptyWorkingSet => {
                write!(f, "no matching process IDs found between the metadata and samples files")
            }
            Self::Parse { source, message } => write!(f, "{source}: {message}"),
        }
    }
}

impl std::error::Error for ReconError {}
