// self
use crate::{_prelude::*, obs::FetchOutcomeLabel};

/// How a [`DataLoader::fetch_outcome`](crate::loader::DataLoader::fetch_outcome) call was
/// served.
#[derive(Debug)]
pub enum FetchOutcome {
	/// Fetched, validated, and sanitized from the network.
	Fresh(Value),
	/// Served from a cache entry younger than the TTL.
	Cached(Value),
	/// The pipeline failed; the last cached payload was served instead.
	StaleFallback {
		/// Cached payload, possibly past its TTL.
		data: Value,
		/// Failure that triggered the fallback.
		reason: Error,
	},
	/// The pipeline failed and nothing was cached.
	Failed(Error),
}
impl FetchOutcome {
	/// Payload served to the caller, if any.
	pub fn data(&self) -> Option<&Value> {
		match self {
			Self::Fresh(data) | Self::Cached(data) | Self::StaleFallback { data, .. } => Some(data),
			Self::Failed(_) => None,
		}
	}

	/// Consumes the outcome, keeping only the payload.
	pub fn into_data(self) -> Option<Value> {
		match self {
			Self::Fresh(data) | Self::Cached(data) | Self::StaleFallback { data, .. } => Some(data),
			Self::Failed(_) => None,
		}
	}

	/// Failure behind a fallback or failed outcome.
	pub fn error(&self) -> Option<&Error> {
		match self {
			Self::StaleFallback { reason, .. } | Self::Failed(reason) => Some(reason),
			Self::Fresh(_) | Self::Cached(_) => None,
		}
	}

	/// Observability label for this outcome.
	pub fn label(&self) -> FetchOutcomeLabel {
		match self {
			Self::Fresh(_) => FetchOutcomeLabel::Fresh,
			Self::Cached(_) => FetchOutcomeLabel::Cached,
			Self::StaleFallback { .. } => FetchOutcomeLabel::StaleFallback,
			Self::Failed(_) => FetchOutcomeLabel::Failed,
		}
	}
}
