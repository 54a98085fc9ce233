//! Observability helpers for loader fetches.
//!
//! - Fetches run inside `tracing` spans named `monalytics_loader.fetch` with the `data_type`
//!   and `stage` fields.
//! - Enable `metrics` to increment the `monalytics_loader_fetch_total` counter for every
//!   attempt and outcome, labeled by `data_type` + `outcome`.

mod metrics;
mod tracing;

pub use self::{metrics::*, tracing::*};

// self
use crate::_prelude::*;

/// Outcome labels recorded for each `fetch_json` call.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum FetchOutcomeLabel {
	/// Entry to the pipeline.
	Attempt,
	/// Payload fetched from the network.
	Fresh,
	/// Payload served from a fresh cache entry.
	Cached,
	/// Fetch failed; an expired cache entry was served.
	StaleFallback,
	/// Fetch failed and nothing was cached.
	Failed,
}
impl FetchOutcomeLabel {
	/// Returns a stable label suitable for span or metric fields.
	pub const fn as_str(self) -> &'static str {
		match self {
			FetchOutcomeLabel::Attempt => "attempt",
			FetchOutcomeLabel::Fresh => "fresh",
			FetchOutcomeLabel::Cached => "cached",
			FetchOutcomeLabel::StaleFallback => "stale_fallback",
			FetchOutcomeLabel::Failed => "failed",
		}
	}
}
impl Display for FetchOutcomeLabel {
	fn fmt(&self, f: &mut Formatter) -> FmtResult {
		f.write_str(self.as_str())
	}
}
