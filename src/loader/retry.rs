//! Bounded retry loop with linear backoff and per-attempt timeouts.

// self
use crate::{
	_prelude::*,
	clock,
	config::DataSource,
	error::{ContentError, TransportError},
	http::{DataHttpClient, DataRequest},
	id::DataType,
	loader::DataLoader,
};

impl<C> DataLoader<C>
where
	C: ?Sized + DataHttpClient,
{
	/// Fetches and parses the data file for `data_type`, retrying transport and content
	/// failures.
	///
	/// Makes at most `max_retries` attempts. After failed attempt `n` the loop sleeps
	/// `retry_delay * n` before attempt `n + 1`. Each attempt is aborted after
	/// `request_timeout`. The last error is returned once attempts are exhausted; the
	/// cache is neither read nor written.
	pub async fn fetch_with_retry(&self, data_type: &DataType) -> Result<Value> {
		let source = self.config.source(data_type)?;
		let max_attempts = self.config.max_retries.max(1);
		let mut attempt = 1;

		loop {
			match self.fetch_attempt(source, attempt).await {
				Ok(data) => return Ok(data),
				Err(err) if attempt < max_attempts && err.is_retryable() => {
					let delay = self.config.retry_delay_for(attempt);

					tracing::warn!(
						attempt,
						max_attempts,
						%delay,
						error = %err,
						"Fetch attempt failed; backing off."
					);
					tokio::time::sleep(clock::std_duration(delay)).await;

					attempt += 1;
				},
				Err(err) => {
					tracing::warn!(attempt, error = %err, "Fetch failed; giving up.");

					return Err(err);
				},
			}
		}
	}

	async fn fetch_attempt(&self, source: &DataSource, attempt: u32) -> Result<Value> {
		let url = self.config.endpoint(source, attempt, self.clock.now())?;
		let timeout = self.config.request_timeout;

		tracing::debug!(%url, attempt, "Requesting data file.");
		self.metrics.record_network_request();

		let request = self.http_client.get(DataRequest::new(url.clone(), attempt));
		let response = tokio::time::timeout(clock::std_duration(timeout), request)
			.await
			.map_err(|_| TransportError::Timeout { timeout })??;

		if !response.is_success() {
			return Err(TransportError::Status { status: response.status, url: url.into() }.into());
		}

		let data = response.json()?;

		if data.is_object() || data.is_array() { Ok(data) } else { Err(ContentError::NotAnObject.into()) }
	}
}
