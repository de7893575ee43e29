//! `taxreq-recon`: specimen taxonomy reconciliation engine.
//!
//! Pure engine crate: receives pre-loaded records and a backbone lookup,
//! returns the partitioned output streams. No CLI, HTTP or file IO.

pub mod classify;
pub mod config;
pub mod engine;
pub mod error;
pub mod ingest;
pub mod lookup;
pub mod merge;
pub mod model;
pub mod proposal;
pub mod store;
pub mod summary;

pub use config::RunConfig;
pub use engine::{run, ReconInput, ReconResult};
pub use error::ReconError;
pub use lookup::BackboneLookup;
pub use store::RecordStore;
