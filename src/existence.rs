//! Process-lifetime memo of "does this remote URL host an image".
//!
//! Product illustrations are only shown when the asset server actually has
//! one; otherwise resolution falls back to a generic device-type drawing.
//! Asking the server costs a network round-trip, so every answer is cached
//! for as long as the [`ExistenceCache`] lives.
//!
//! ## Semantics
//!
//! - A hit never touches the network.
//! - A miss runs one blocking probe on the calling thread (a pipeline
//!   worker), then records the answer.
//! - Any probe failure (timeout, DNS, refused connection, malformed URL)
//!   counts as "does not exist" and is cached like any other answer. A
//!   transiently unavailable asset is therefore never re-checked.
//! - Two threads missing on the same URL both probe and both write. The
//!   write is idempotent, so the race is harmless.
//!
//! There is no expiry and no invalidation.

use crate::pipeline::PipelineEvent;
use std::collections::HashMap;
use std::sync::mpsc::Sender;
use std::sync::{Arc, PoisonError, RwLock};
use std::time::Duration;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum ProbeError {
    #[error("probe request failed: {0}")]
    Request(String),
}

/// A network check for a single URL.
pub trait Prober: Send + Sync {
    /// `Ok(true)` iff the server answered `200 OK`.
    fn probe(&self, url: &str) -> Result<bool, ProbeError>;
}

/// Default probe timeout.
pub const DEFAULT_PROBE_TIMEOUT: Duration = Duration::from_secs(5);

const USER_AGENT: &str = concat!("illustra/", env!("CARGO_PKG_VERSION"));

/// [`Prober`] issuing a blocking HTTP GET with a global timeout.
pub struct HttpProber {
    agent: ureq::Agent,
}

impl HttpProber {
    pub fn new(timeout: Duration) -> Self {
        let config = ureq::Agent::config_builder()
            .timeout_global(Some(timeout))
            .http_status_as_error(false)
            .build();
        Self {
            agent: config.into(),
        }
    }
}

impl Default for HttpProber {
    fn default() -> Self {
        Self::new(DEFAULT_PROBE_TIMEOUT)
    }
}

impl Prober for HttpProber {
    fn probe(&self, url: &str) -> Result<bool, ProbeError> {
        let response = self
            .agent
            .get(url)
            .header("User-Agent", USER_AGENT)
            .call()
            .map_err(|e| ProbeError::Request(e.to_string()))?;
        Ok(response.status().as_u16() == 200)
    }
}

/// Memoizing existence check in front of a [`Prober`].
pub struct ExistenceCache {
    entries: RwLock<HashMap<String, bool>>,
    prober: Arc<dyn Prober>,
    events: Option<Sender<PipelineEvent>>,
}

impl ExistenceCache {
    pub fn new(prober: Arc<dyn Prober>) -> Self {
        Self {
            entries: RwLock::new(HashMap::new()),
            prober,
            events: None,
        }
    }

    /// Report every probe (not every lookup) on `events`.
    pub fn with_events(mut self, events: Sender<PipelineEvent>) -> Self {
        self.events = Some(events);
        self
    }

    /// Whether `url` hosts an image. Probes at most once per URL per cache.
    pub fn exists(&self, url: &str) -> bool {
        if let Some(known) = self.cached(url) {
            return known;
        }

        let (exists, error) = match self.prober.probe(url) {
            Ok(exists) => (exists, None),
            Err(e) => (false, Some(e.to_string())),
        };

        self.entries
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .insert(url.to_string(), exists);

        if let Some(events) = &self.events {
            let _ = events.send(PipelineEvent::Probed {
                url: url.to_string(),
                exists,
                error,
            });
        }
        exists
    }

    /// The recorded answer for `url`, without probing.
    pub fn cached(&self, url: &str) -> Option<bool> {
        self.entries
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .get(url)
            .copied()
    }

    pub fn len(&self) -> usize {
        self.entries
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}
