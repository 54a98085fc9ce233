//! Secure fetch pipeline for Monalytics data files.
//!
//! [`DataLoader::fetch_json`] runs every request through the same ordered stages:
//! origin check, session rate limit, cache lookup, fetch with retry, schema
//! validation, sanitization, and cache store. Failures at any stage fall back to the
//! last cached payload for the data type (regardless of age) and otherwise resolve to
//! `None`; [`DataLoader::fetch_outcome`] exposes which of those paths was taken.
//!
//! With `coalesce_requests` enabled, a per-data-type singleflight guard lets
//! concurrent callers piggy-back on the first caller's network fetch.

mod metrics;
mod outcome;
mod retry;

pub use self::{metrics::FetchMetrics, outcome::FetchOutcome};

// self
use crate::{
	_prelude::*,
	cache::DataCache,
	clock::Clock,
	config::LoaderConfig,
	error::ConfigError,
	http::DataHttpClient,
	id::DataType,
	limiter::RateLimiter,
	obs::{self, FetchOutcomeLabel, FetchSpan},
	security::SecurityValidator,
	session::SessionIdProvider,
};
#[cfg(feature = "reqwest")]
use crate::{clock::SystemClock, http::ReqwestHttpClient, session::GeneratedSessionId};

#[cfg(feature = "reqwest")]
/// Loader specialized for the crate's default reqwest transport.
pub type ReqwestDataLoader = DataLoader<ReqwestHttpClient>;

type FlightGuards = Arc<Mutex<HashMap<DataType, Arc<AsyncMutex<()>>>>>;

/// Fetches, validates, sanitizes, and caches data files for one client session.
///
/// The loader owns shared handles to its rate limiter and cache so an application can
/// construct them once and inject the same instances into several loaders.
#[derive(Clone)]
pub struct DataLoader<C>
where
	C: ?Sized + DataHttpClient,
{
	/// HTTP client used for every outbound request.
	pub http_client: Arc<C>,
	/// Validated configuration.
	pub config: Arc<LoaderConfig>,
	/// Per-session request limiter.
	pub limiter: Arc<RateLimiter>,
	/// Payload cache.
	pub cache: Arc<DataCache>,
	/// Origin, schema, and sanitization checks.
	pub validator: SecurityValidator,
	/// Source of the rate-limit key.
	pub session: Arc<dyn SessionIdProvider>,
	/// Source of "now" for cache-busting parameters.
	pub clock: Arc<dyn Clock>,
	/// Counters describing how calls were served.
	pub metrics: Arc<FetchMetrics>,
	flight_guards: FlightGuards,
}
impl<C> DataLoader<C>
where
	C: ?Sized + DataHttpClient,
{
	/// Creates a loader around a caller-provided transport.
	///
	/// Validates `config` and builds a fresh limiter and cache driven by `clock`.
	pub fn with_http_client(
		config: LoaderConfig,
		session: Arc<dyn SessionIdProvider>,
		clock: Arc<dyn Clock>,
		http_client: impl Into<Arc<C>>,
	) -> Result<Self> {
		config.validate()?;

		let config = Arc::new(config);
		let limiter = RateLimiter::new(config.max_requests_per_minute, clock.clone())
			.with_user_agent(config.user_agent.clone());
		let cache = DataCache::new(config.cache_duration, clock.clone());

		Ok(Self {
			http_client: http_client.into(),
			validator: SecurityValidator::new(config.clone()),
			config,
			limiter: Arc::new(limiter),
			cache: Arc::new(cache),
			session,
			clock,
			metrics: Default::default(),
			flight_guards: Default::default(),
		})
	}

	/// Shares an existing rate limiter instead of the loader's own.
	pub fn with_limiter(mut self, limiter: Arc<RateLimiter>) -> Self {
		self.limiter = limiter;

		self
	}

	/// Shares an existing cache instead of the loader's own.
	pub fn with_cache(mut self, cache: Arc<DataCache>) -> Self {
		self.cache = cache;

		self
	}

	/// Fetches `data_type`, returning `None` when nothing could be served.
	pub async fn fetch_json(&self, data_type: &str) -> Option<Value> {
		self.fetch_outcome(data_type).await.into_data()
	}

	/// Fetches `data_type` and reports how the result was obtained. Never fails.
	pub async fn fetch_outcome(&self, data_type: &str) -> FetchOutcome {
		let span = FetchSpan::new(data_type, "fetch_json");

		obs::record_fetch_outcome(data_type, FetchOutcomeLabel::Attempt);
		self.metrics.record_call();

		let outcome = span
			.instrument(async move {
				let resolved = match DataType::new(data_type) {
					Ok(data_type) => self.resolve(&data_type).await,
					Err(err) => Err(ConfigError::from(err).into()),
				};

				match resolved {
					Ok(outcome) => outcome,
					Err(reason) => self.fall_back(data_type, reason),
				}
			})
			.await;

		obs::record_fetch_outcome(data_type, outcome.label());

		outcome
	}

	/// Fetches every registered data type in table order.
	pub async fn fetch_all(&self) -> BTreeMap<DataType, Option<Value>> {
		let mut results = BTreeMap::new();

		for data_type in self.config.sources.keys() {
			results.insert(data_type.clone(), self.fetch_json(data_type).await);
		}

		results
	}

	/// Drops every cached payload, stale fallbacks included.
	pub fn clear_cache(&self) {
		self.cache.clear();
	}

	/// Starts the periodic cache sweep using `cache_sweep_interval`.
	pub fn spawn_cache_sweeper(&self) -> tokio::task::JoinHandle<()> {
		self.cache.spawn_sweeper(self.config.cache_sweep_interval)
	}

	async fn resolve(&self, data_type: &DataType) -> Result<FetchOutcome> {
		if !self.validator.validate_origin() {
			return Err(Error::Unauthorized {
				host: self.config.page_host.clone().unwrap_or_default(),
			});
		}

		let session = self.session.session_id();

		if let Some(retry_at) = self.limiter.check(&session).retry_at() {
			return Err(Error::RateLimited { session, retry_at });
		}

		let guard =
			if self.config.coalesce_requests { Some(self.flight_guard(data_type)?) } else { None };
		let _singleflight = match &guard {
			Some(guard) => Some(guard.lock().await),
			None => None,
		};

		if let Some(cached) = self.cache.fresh(data_type) {
			tracing::debug!("Serving payload from cache.");
			self.metrics.record_cache_hit();

			return Ok(FetchOutcome::Cached(cached));
		}

		let data = self.fetch_with_retry(data_type).await?;

		self.validator.check_data_structure(data_type, &data)?;

		let data = SecurityValidator::sanitize(data);

		self.cache.set(data_type.clone(), data.clone());

		Ok(FetchOutcome::Fresh(data))
	}

	fn fall_back(&self, data_type: &str, reason: Error) -> FetchOutcome {
		match self.cache.stale(data_type) {
			Some(entry) => {
				tracing::warn!(
					error = %reason,
					stored_at = %entry.stored_at,
					"Fetch failed; serving stale cached payload."
				);
				self.metrics.record_stale_fallback();

				FetchOutcome::StaleFallback { data: entry.payload, reason }
			},
			None => {
				tracing::error!(error = %reason, "Fetch failed and no cached payload is available.");
				self.metrics.record_failure();

				FetchOutcome::Failed(reason)
			},
		}
	}

	/// Returns (and creates on demand) the singleflight guard for a registered data type.
	fn flight_guard(&self, data_type: &DataType) -> Result<Arc<AsyncMutex<()>>> {
		self.config.source(data_type)?;

		let mut guards = self.flight_guards.lock();

		Ok(guards.entry(data_type.clone()).or_insert_with(|| Arc::new(AsyncMutex::new(()))).clone())
	}
}
#[cfg(feature = "reqwest")]
impl DataLoader<ReqwestHttpClient> {
	/// Creates a loader with the default reqwest transport, the system clock, and a
	/// generated session identifier.
	pub fn new(config: LoaderConfig) -> Result<Self> {
		let clock: Arc<dyn Clock> = Arc::new(SystemClock);
		let session = Arc::new(GeneratedSessionId::new(clock.clone()));
		let mut builder = ReqwestClient::builder();

		if let Some(user_agent) = config.user_agent.as_deref() {
			builder = builder.user_agent(user_agent.to_owned());
		}

		let client = builder.build().map_err(ConfigError::http_client_build)?;

		Self::with_http_client(config, session, clock, ReqwestHttpClient::with_client(client))
	}
}
impl<C> Debug for DataLoader<C>
where
	C: ?Sized + DataHttpClient,
{
	fn fmt(&self, f: &mut Formatter) -> FmtResult {
		f.debug_struct("DataLoader")
			.field("base_url", &self.config.base_url)
			.field("session", &self.session.session_id())
			.field("limiter", &self.limiter)
			.field("cache", &self.cache)
			.finish()
	}
}
