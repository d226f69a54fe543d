use serde::{Deserialize, Serialize};

use crate::fetch::FetchError;

/// Decoded weather document as returned by the API (or a fixture file).
///
/// The core treats it as opaque; only the [`Renderer`](crate::render::Renderer)
/// interprets individual fields.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Forecast(pub serde_json::Value);

impl Forecast {
    /// Pretty-printed JSON for the status page.
    pub fn pretty(&self) -> String {
        serde_json::to_string_pretty(&self.0).unwrap_or_else(|_| self.0.to_string())
    }
}

/// Cloneable record of a failed fetch, kept in [`SharedContext`](crate::context::SharedContext).
///
/// The live [`FetchError`] is not `Clone`, so the stored copy keeps just the
/// rendered message plus the one classification bit the escalation policy
/// needs.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FetchFailure {
    pub message: String,
    pub dns_resolution: bool,
}

impl From<&FetchError> for FetchFailure {
    fn from(err: &FetchError) -> Self {
        Self { message: err.to_string(), dns_resolution: err.is_dns_resolution() }
    }
}

/// Most recent fetch outcome. Exactly one is retained at a time; every write
/// is a whole-value replacement.
#[derive(Debug, Clone, Default)]
pub enum FetchResult {
    /// No fetch attempt has completed yet.
    #[default]
    Pending,
    Ready(Forecast),
    Failed(FetchFailure),
}

impl FetchResult {
    pub fn is_ready(&self) -> bool {
        matches!(self, FetchResult::Ready(_))
    }

    /// True when the stored outcome is a failure classified as a DNS
    /// resolution error (the escalation class).
    pub fn is_dns_failure(&self) -> bool {
        matches!(self, FetchResult::Failed(f) if f.dns_resolution)
    }
}
