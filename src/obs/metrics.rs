// self
use crate::obs::FetchOutcomeLabel;

/// Records a fetch outcome via the global metrics recorder (when enabled).
pub fn record_fetch_outcome(data_type: &str, outcome: FetchOutcomeLabel) {
	#[cfg(feature = "metrics")]
	{
		metrics::counter!(
			"monalytics_loader_fetch_total",
			"data_type" => data_type.to_owned(),
			"outcome" => outcome.as_str()
		)
		.increment(1);
	}

	#[cfg(not(feature = "metrics"))]
	{
		let _ = (data_type, outcome);
	}
}
