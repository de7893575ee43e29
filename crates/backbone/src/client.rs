use std::thread;
use std::time::Duration;

use taxreq_recon::config::BackboneConfig;
use taxreq_recon::lookup::BackboneLookup;
use taxreq_recon::model::{BackboneMatch, LookupError, NameQuery};
use url::Url;

use crate::wire::NameUsageMatch;

pub const USER_AGENT: &str = concat!("taxreq/", env!("CARGO_PKG_VERSION"));

const MATCH_PATH: &str = "species/match";

/// Error type for backbone requests.
#[derive(Debug)]
pub enum BackboneError {
    /// Base URL could not be parsed or the client could not be built
    Config(String),
    /// Network error (connect, timeout, body read)
    Network(String),
    /// HTTP error with status code
    Http(u16, String),
    /// JSON parsing error
    Parse(String),
}

impl std::fmt::Display for BackboneError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            BackboneError::Config(msg) => write!(f, "Invalid backbone client config: {}", msg),
            BackboneError::Network(msg) => write!(f, "Network error: {}", msg),
            BackboneError::Http(code, msg) => write!(f, "HTTP {}: {}", code, msg),
            BackboneError::Parse(msg) => write!(f, "Parse error: {}", msg),
        }
    }
}

impl std::error::Error for BackboneError {}

impl From<BackboneError> for LookupError {
    fn from(err: BackboneError) -> Self {
        match err {
            BackboneError::Http(status, message) => LookupError::Http { status, message },
            BackboneError::Parse(msg) => LookupError::Decode(msg),
            BackboneError::Config(msg) | BackboneError::Network(msg) => LookupError::Transport(msg),
        }
    }
}

/// GBIF backbone client (blocking).
#[derive(Clone)]
pub struct BackboneClient {
    http: reqwest::blocking::Client,
    endpoint: Url,
    max_retries: u32,
    initial_backoff: Duration,
}

impl BackboneClient {
    pub fn new(config: &BackboneConfig) -> Result<Self, BackboneError> {
        let base = format!("{}/", config.base_url.trim_end_matches('/'));
        let endpoint = Url::parse(&base)
            .and_then(|u| u.join(MATCH_PATH))
            .map_err(|e| BackboneError::Config(format!("{}: {}", config.base_url, e)))?;

        let http = reqwest::blocking::Client::builder()
            .timeout(Duration::from_secs(config.timeout_secs))
            .user_agent(USER_AGENT)
            .build()
            .map_err(|e| BackboneError::Config(e.to_string()))?;

        Ok(Self {
            http,
            endpoint,
            max_retries: config.max_retries,
            initial_backoff: Duration::from_secs(1),
        })
    }

    /// Override the first retry delay (doubles on each further attempt).
    pub fn with_backoff(mut self, initial: Duration) -> Self {
        self.initial_backoff = initial;
        self
    }

    pub fn endpoint(&self) -> &Url {
        &self.endpoint
    }

    /// Full request URL for a query.
    pub fn match_url(&self, query: &NameQuery) -> Url {
        let mut url = self.endpoint.clone();
        {
            let mut pairs = url.query_pairs_mut();
            pairs.append_pair("name", &query.name);
            if let Some(rank) = &query.rank {
                pairs.append_pair("rank", rank.as_str());
            }
            if let Some(kingdom) = &query.kingdom {
                pairs.append_pair("kingdom", kingdom);
            }
            if let Some(family) = &query.family {
                pairs.append_pair("family", family);
            }
        }
        url
    }

    /// Resolve one name, retrying 429/5xx and network errors.
    pub fn match_usage(&self, query: &NameQuery) -> Result<NameUsageMatch, BackboneError> {
        let url = self.match_url(query);
        let mut backoff = self.initial_backoff;

        for attempt in 0..=self.max_retries {
            let last = attempt == self.max_retries;

            match self.http.get(url.clone()).send() {
                Ok(resp) => {
                    let status = resp.status().as_u16();

                    if status == 429 || status >= 500 {
                        if last {
                            return Err(BackboneError::Http(
                                status,
                                format!("giving up after {} attempts", attempt + 1),
                            ));
                        }
                        // Respect Retry-After for 429
                        let wait = if status == 429 {
                            resp.headers()
                                .get("retry-after")
                                .and_then(|v| v.to_str().ok())
                                .and_then(|v| v.parse::<u64>().ok())
                                .map(Duration::from_secs)
                                .unwrap_or(backoff)
                        } else {
                            backoff
                        };
                        tracing::warn!(
                            "Backbone retry {}/{} in {:?} (HTTP {}) for '{}'",
                            attempt + 1,
                            self.max_retries,
                            wait,
                            status,
                            query.name
                        );
                        thread::sleep(wait);
                        backoff *= 2;
                        continue;
                    }

                    if status >= 400 {
                        let body = resp.text().unwrap_or_default();
                        return Err(BackboneError::Http(status, error_message(&body, status)));
                    }

                    let text = resp
                        .text()
                        .map_err(|e| BackboneError::Network(format!("failed to read response body: {e}")))?;
                    return serde_json::from_str(text.trim_start_matches('\u{feff}')).map_err(|e| {
                        BackboneError::Parse(format!(
                            "{} (body: {})",
                            e,
                            text.chars().take(200).collect::<String>()
                        ))
                    });
                }
                Err(e) => {
                    if last {
                        return Err(BackboneError::Network(format!(
                            "{} (after {} attempts)",
                            e,
                            attempt + 1
                        )));
                    }
                    tracing::warn!(
                        "Backbone retry {}/{} in {:?} ({}) for '{}'",
                        attempt + 1,
                        self.max_retries,
                        backoff,
                        e,
                        query.name
                    );
                    thread::sleep(backoff);
                    backoff *= 2;
                }
            }
        }

        Err(BackboneError::Network("no request attempted".into()))
    }
}

impl BackboneLookup for BackboneClient {
    fn match_name(&self, query: &NameQuery) -> Result<BackboneMatch, LookupError> {
        Ok(self.match_usage(query)?.into_match())
    }
}

/// Best-effort message from an error body: JSON `message`/`error` field,
/// else the raw text, else the status code.
fn error_message(body: &str, status: u16) -> String {
    if let Ok(json) = serde_json::from_str::<serde_json::Value>(body) {
        for key in ["message", "error"] {
            if let Some(msg) = json.get(key).and_then(|v| v.as_str()) {
                return msg.to_string();
            }
        }
    }
    let flat = body.split_whitespace().collect::<Vec<_>>().join(" ");
    if flat.is_empty() {
        format!("request failed with status {status}")
    } else {
        flat.chars().take(200).collect()
    }
}
