//! GBIF backbone client: the HTTP side of `BackboneLookup`.
//!
//! Blocking reqwest client (no Tokio runtime required). One endpoint:
//! `GET {base}/species/match`. Retries rate limits, 5xx and network errors
//! with exponential backoff; other 4xx fail on the first attempt.

mod client;
mod wire;

pub use client::{BackboneClient, BackboneError, USER_AGENT};
pub use wire::NameUsageMatch;
