//! Loader configuration: quotas, timeouts, retry policy, cache lifetime, and data sources.
//!
//! Every setting has a default matching the published site, so a configuration
//! document only needs the fields it overrides. Durations are expressed in
//! milliseconds when (de)serialized.

pub mod source;

pub use source::*;

// self
use crate::{_prelude::*, error::ConfigError, id::DataType};

/// Content host serving the data files.
pub const DEFAULT_BASE_URL: &str = "https://raw.githubusercontent.com/monalytics/monalytics.github.io";
/// Branch segment appended to the base URL.
pub const DEFAULT_BRANCH: &str = "main";
/// Host of the published site.
pub const DEFAULT_PAGE_HOST: &str = "monalytics.github.io";

const LOOPBACK_HOSTS: [&str; 3] = ["localhost", "127.0.0.1", "[::1]"];

/// Runtime configuration for a [`DataLoader`](crate::loader::DataLoader).
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct LoaderConfig {
	/// Base URL of the content host.
	pub base_url: String,
	/// Branch segment between the base URL and each source path; empty to omit.
	pub branch: String,
	/// Requests a session may issue per trailing minute.
	pub max_requests_per_minute: u32,
	/// Per-attempt timeout after which the request is aborted.
	#[serde(with = "duration_ms")]
	pub request_timeout: Duration,
	/// Total attempts per fetch, including the first.
	pub max_retries: u32,
	/// Base backoff; attempt `n` waits `retry_delay * n` before attempt `n + 1`.
	#[serde(with = "duration_ms")]
	pub retry_delay: Duration,
	/// Enables the page-host allow-list check.
	pub validate_origin: bool,
	/// Substrings, one of which must occur in the page host.
	pub allowed_domains: Vec<String>,
	/// Host the client runs under.
	pub page_host: Option<String>,
	/// Freshness window for cached payloads.
	#[serde(with = "duration_ms")]
	pub cache_duration: Duration,
	/// Period of the background sweep that empties the cache.
	#[serde(with = "duration_ms")]
	pub cache_sweep_interval: Duration,
	/// Enables required-key validation of fetched payloads.
	pub validate_data_structure: bool,
	/// Collapses concurrent fetches of the same data type into one request.
	pub coalesce_requests: bool,
	/// Client description included in suspicious-activity diagnostics.
	pub user_agent: Option<String>,
	/// Data type table.
	pub sources: BTreeMap<DataType, DataSource>,
}
impl LoaderConfig {
	/// Parses a JSON configuration document and validates it.
	///
	/// Deserialization failures report the path of the offending field.
	pub fn from_json_str(raw: &str) -> Result<Self, ConfigError> {
		let mut de = serde_json::Deserializer::from_str(raw);
		let config: Self = serde_path_to_error::deserialize(&mut de)?;

		config.validate()?;

		Ok(config)
	}

	/// Checks invariants the pipeline relies on.
	pub fn validate(&self) -> Result<(), ConfigError> {
		let base = self.parsed_base_url()?;
		let loopback = base.host_str().is_some_and(|host| LOOPBACK_HOSTS.contains(&host));

		if base.scheme() != "https" && !(base.scheme() == "http" && loopback) {
			return Err(ConfigError::InsecureBaseUrl { url: self.base_url.clone() });
		}
		if self.max_retries == 0 {
			return Err(ConfigError::ZeroRetries);
		}

		for (field, value) in [
			("request_timeout", self.request_timeout),
			("cache_duration", self.cache_duration),
			("cache_sweep_interval", self.cache_sweep_interval),
		] {
			if !value.is_positive() {
				return Err(ConfigError::NonPositiveDuration { field });
			}
		}
		if self.retry_delay.is_negative() {
			return Err(ConfigError::NonPositiveDuration { field: "retry_delay" });
		}

		Ok(())
	}

	/// Looks up the source registered for `data_type`.
	pub fn source(&self, data_type: &DataType) -> Result<&DataSource, ConfigError> {
		self.sources
			.get(data_type)
			.ok_or_else(|| ConfigError::UnknownDataType { data_type: data_type.clone() })
	}

	/// Builds the cache-busting URL for one attempt.
	pub fn endpoint(
		&self,
		source: &DataSource,
		attempt: u32,
		now: OffsetDateTime,
	) -> Result<Url, ConfigError> {
		let mut raw = self.base_url.trim_end_matches('/').to_owned();
		let branch = self.branch.trim_matches('/');

		if !branch.is_empty() {
			raw.push('/');
			raw.push_str(branch);
		}

		raw.push('/');
		raw.push_str(source.path.trim_start_matches('/'));

		let mut url =
			Url::parse(&raw).map_err(|source| ConfigError::InvalidUrl { url: raw.clone(), source })?;
		let millis = now.unix_timestamp_nanos() / 1_000_000;

		url.query_pairs_mut()
			.append_pair("t", &millis.to_string())
			.append_pair("attempt", &attempt.to_string());

		Ok(url)
	}

	/// Delay to wait after failed attempt `attempt` (1-based).
	pub fn retry_delay_for(&self, attempt: u32) -> Duration {
		self.retry_delay * attempt
	}

	/// Overrides the content host.
	pub fn with_base_url(mut self, base_url: impl Into<String>) -> Self {
		self.base_url = base_url.into();

		self
	}

	/// Overrides the branch segment.
	pub fn with_branch(mut self, branch: impl Into<String>) -> Self {
		self.branch = branch.into();

		self
	}

	/// Sets the host the client runs under.
	pub fn with_page_host(mut self, host: impl Into<String>) -> Self {
		self.page_host = Some(host.into());

		self
	}

	/// Replaces the allowed domain list.
	pub fn with_allowed_domains<I, S>(mut self, domains: I) -> Self
	where
		I: IntoIterator<Item = S>,
		S: Into<String>,
	{
		self.allowed_domains = domains.into_iter().map(Into::into).collect();

		self
	}

	/// Toggles the page-host check.
	pub fn with_origin_validation(mut self, enabled: bool) -> Self {
		self.validate_origin = enabled;

		self
	}

	/// Toggles required-key validation.
	pub fn with_structure_validation(mut self, enabled: bool) -> Self {
		self.validate_data_structure = enabled;

		self
	}

	/// Overrides the per-minute session quota.
	pub fn with_max_requests_per_minute(mut self, max: u32) -> Self {
		self.max_requests_per_minute = max;

		self
	}

	/// Overrides the per-attempt timeout.
	pub fn with_request_timeout(mut self, timeout: Duration) -> Self {
		self.request_timeout = timeout;

		self
	}

	/// Overrides the attempt budget and base backoff.
	pub fn with_retry(mut self, max_retries: u32, retry_delay: Duration) -> Self {
		self.max_retries = max_retries;
		self.retry_delay = retry_delay;

		self
	}

	/// Overrides the cache freshness window.
	pub fn with_cache_duration(mut self, ttl: Duration) -> Self {
		self.cache_duration = ttl;

		self
	}

	/// Toggles single-flight collapsing of concurrent same-type fetches.
	pub fn with_coalesced_requests(mut self, enabled: bool) -> Self {
		self.coalesce_requests = enabled;

		self
	}

	/// Sets the user agent reported in diagnostics.
	pub fn with_user_agent(mut self, user_agent: impl Into<String>) -> Self {
		self.user_agent = Some(user_agent.into());

		self
	}

	/// Registers or replaces a data source.
	pub fn with_source(mut self, data_type: DataType, source: DataSource) -> Self {
		self.sources.insert(data_type, source);

		self
	}

	fn parsed_base_url(&self) -> Result<Url, ConfigError> {
		Url::parse(&self.base_url)
			.map_err(|source| ConfigError::InvalidUrl { url: self.base_url.clone(), source })
	}
}
impl Default for LoaderConfig {
	fn default() -> Self {
		Self {
			base_url: DEFAULT_BASE_URL.into(),
			branch: DEFAULT_BRANCH.into(),
			max_requests_per_minute: 20,
			request_timeout: Duration::seconds(10),
			max_retries: 3,
			retry_delay: Duration::seconds(1),
			validate_origin: true,
			allowed_domains: vec![
				DEFAULT_PAGE_HOST.into(),
				"localhost".into(),
				"127.0.0.1".into(),
			],
			page_host: Some(DEFAULT_PAGE_HOST.into()),
			cache_duration: Duration::seconds(30),
			cache_sweep_interval: Duration::minutes(5),
			validate_data_structure: true,
			coalesce_requests: false,
			user_agent: None,
			sources: default_sources(),
		}
	}
}

mod duration_ms {
	// crates.io
	use serde::{Deserializer, Serializer};
	// self
	use crate::_prelude::*;

	pub fn serialize<S>(value: &Duration, serializer: S) -> Result<S::Ok, S::Error>
	where
		S: Serializer,
	{
		serializer.serialize_i64(i64::try_from(value.whole_milliseconds()).unwrap_or(i64::MAX))
	}

	pub fn deserialize<'de, D>(deserializer: D) -> Result<Duration, D::Error>
	where
		D: Deserializer<'de>,
	{
		let millis = u64::deserialize(deserializer)?;

		Ok(Duration::milliseconds(i64::try_from(millis).unwrap_or(i64::MAX)))
	}
}
