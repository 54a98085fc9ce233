//! Loader-level error types shared by the pipeline, validator, and transports.

// self
use crate::{
	_prelude::*,
	id::{DataType, IdentifierError, SessionId},
};

/// Loader-wide result type alias returning [`Error`] by default.
pub type Result<T, E = Error> = std::result::Result<T, E>;

type BoxError = Box<dyn std::error::Error + Send + Sync>;

/// Canonical loader error exposed by public APIs.
#[derive(Debug, ThisError)]
pub enum Error {
	/// Local configuration problem.
	#[error(transparent)]
	Config(#[from] ConfigError),
	/// Network failure, non-2xx status, or timeout; retried with backoff.
	#[error(transparent)]
	Transport(#[from] TransportError),
	/// Response body is not a usable JSON document; retried with backoff.
	#[error(transparent)]
	Content(#[from] ContentError),

	/// The page host is not covered by the allowed domain list.
	#[error("Host `{host}` is not allowed to load data.")]
	Unauthorized {
		/// Host that failed the check (empty when none was configured).
		host: String,
	},
	/// The session exceeded its request quota or is temporarily blocked.
	#[error("Session `{session}` is rate limited until {retry_at}.")]
	RateLimited {
		/// Session that was denied.
		session: SessionId,
		/// Instant after which the session is allowed again.
		retry_at: OffsetDateTime,
	},
	/// The fetched document lacks required top-level keys.
	#[error("Payload for `{data_type}` is missing required keys: {}.", .missing.join(", "))]
	Schema {
		/// Data type whose schema failed.
		data_type: DataType,
		/// Expected keys that were absent.
		missing: Vec<String>,
	},
}
impl Error {
	/// Returns true when another fetch attempt may succeed.
	pub fn is_retryable(&self) -> bool {
		matches!(self, Self::Transport(_) | Self::Content(_))
	}
}

/// Configuration and validation failures raised by the loader.
#[derive(Debug, ThisError)]
pub enum ConfigError {
	/// HTTP client could not be constructed.
	#[error("HTTP client could not be constructed.")]
	HttpClientBuild {
		/// Underlying transport builder failure.
		#[source]
		source: BoxError,
	},
	/// Configuration document could not be deserialized.
	#[error("Configuration is invalid at `{path}`.")]
	Parse {
		/// Dotted path of the offending field.
		path: String,
		/// Underlying deserialization failure.
		#[source]
		source: serde_json::Error,
	},
	/// A URL assembled from the configuration cannot be parsed.
	#[error("URL `{url}` is invalid.")]
	InvalidUrl {
		/// Raw URL string.
		url: String,
		/// Underlying parsing failure.
		#[source]
		source: url::ParseError,
	},
	/// Identifier validation failed.
	#[error(transparent)]
	InvalidIdentifier(#[from] IdentifierError),

	/// Base URL must use HTTPS outside loopback hosts.
	#[error("Base URL must use HTTPS: {url}.")]
	InsecureBaseUrl {
		/// Base URL that failed validation.
		url: String,
	},
	/// No data source is registered for the requested type.
	#[error("No data source is registered for `{data_type}`.")]
	UnknownDataType {
		/// Requested data type.
		data_type: DataType,
	},
	/// At least one attempt is required.
	#[error("The max_retries value must be at least 1.")]
	ZeroRetries,
	/// A duration setting must be strictly positive.
	#[error("The {field} value must be positive.")]
	NonPositiveDuration {
		/// Name of the offending setting.
		field: &'static str,
	},
}
impl ConfigError {
	/// Wraps a transport's builder failure inside [`ConfigError`].
	pub fn http_client_build(src: impl 'static + Send + Sync + std::error::Error) -> Self {
		Self::HttpClientBuild { source: Box::new(src) }
	}
}
impl From<serde_path_to_error::Error<serde_json::Error>> for ConfigError {
	fn from(e: serde_path_to_error::Error<serde_json::Error>) -> Self {
		let path = e.path().to_string();

		Self::Parse { path, source: e.into_inner() }
	}
}

/// Transport-level failures (network, status, timeout).
#[derive(Debug, ThisError)]
pub enum TransportError {
	/// Underlying HTTP client reported a network failure.
	#[error("Network error occurred while fetching data.")]
	Network {
		/// Transport-specific network error.
		#[source]
		source: BoxError,
	},
	/// Host answered with a non-2xx status.
	#[error("Data host returned HTTP {status} for {url}.")]
	Status {
		/// HTTP status code.
		status: u16,
		/// Requested URL.
		url: String,
	},
	/// Request did not complete before the configured timeout and was aborted.
	#[error("Request timed out after {timeout}.")]
	Timeout {
		/// Timeout that elapsed.
		timeout: Duration,
	},
}
impl TransportError {
	/// Wraps a transport-specific network error.
	pub fn network(src: impl 'static + Send + Sync + std::error::Error) -> Self {
		Self::Network { source: Box::new(src) }
	}
}
#[cfg(feature = "reqwest")]
impl From<ReqwestError> for TransportError {
	fn from(e: ReqwestError) -> Self {
		Self::network(e)
	}
}

/// Response bodies that cannot be turned into a JSON document.
#[derive(Debug, ThisError)]
pub enum ContentError {
	/// Body is not valid JSON.
	#[error("Response body is not valid JSON.")]
	Parse(#[source] serde_json::Error),
	/// Host served an HTML page (usually a 404 or error page) instead of data.
	#[error("Response is an HTML page (content type {content_type:?}).")]
	HtmlErrorPage {
		/// Declared content type, if any.
		content_type: Option<String>,
	},
	/// Parsed JSON is null or a scalar.
	#[error("Response JSON is not an object or array.")]
	NotAnObject,
}
