//! Transport primitives for fetching data files.
//!
//! The loader depends on an HTTP stack only through [`DataHttpClient`]. Implementations
//! perform a single `GET`, attach [`REQUEST_HEADERS`], and report the status, declared
//! content type, and raw body. Status handling, timeouts, and decoding stay in the
//! pipeline so every transport behaves the same way. Dropping the returned future must
//! abort the request; the pipeline relies on that to enforce its timeout.

// crates.io
#[cfg(feature = "reqwest")] use reqwest::header::CONTENT_TYPE;
// self
use crate::{
	_prelude::*,
	error::{ContentError, TransportError},
};

/// Headers sent with every request so intermediaries never serve a cached copy.
pub const REQUEST_HEADERS: [(&str, &str); 3] = [
	("accept", "application/json"),
	("cache-control", "no-cache, no-store"),
	("pragma", "no-cache"),
];

/// Boxed future returned by [`DataHttpClient::get`].
pub type HttpFuture<'a> =
	Pin<Box<dyn Future<Output = Result<DataResponse, TransportError>> + 'a + Send>>;

/// Abstraction over HTTP transports able to fetch a data file.
pub trait DataHttpClient
where
	Self: 'static + Send + Sync,
{
	/// Issues the request described by `request`.
	fn get(&self, request: DataRequest) -> HttpFuture<'_>;
}

/// One outbound attempt.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct DataRequest {
	/// Fully built, cache-busting URL.
	pub url: Url,
	/// 1-based attempt number within the retry loop.
	pub attempt: u32,
}
impl DataRequest {
	/// Creates a request for `url`.
	pub fn new(url: Url, attempt: u32) -> Self {
		Self { url, attempt }
	}
}

/// Raw response captured by a transport.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct DataResponse {
	/// HTTP status code.
	pub status: u16,
	/// Declared `Content-Type`, if any.
	pub content_type: Option<String>,
	/// Raw body bytes.
	pub body: Vec<u8>,
}
impl DataResponse {
	/// Builds a `200 application/json` response.
	pub fn ok_json(body: impl Into<Vec<u8>>) -> Self {
		Self { status: 200, content_type: Some("application/json".into()), body: body.into() }
	}

	/// Returns true for 2xx statuses.
	pub const fn is_success(&self) -> bool {
		self.status >= 200 && self.status < 300
	}

	/// Returns true when the content type declares JSON.
	pub fn declares_json(&self) -> bool {
		self.content_type
			.as_deref()
			.is_some_and(|value| value.to_ascii_lowercase().contains("application/json"))
	}

	/// Decodes the body as JSON.
	///
	/// Bodies without a JSON content type are read as text first; text that looks like
	/// an HTML document fails with [`ContentError::HtmlErrorPage`] instead of a parse error.
	pub fn json(&self) -> Result<Value, ContentError> {
		if self.declares_json() {
			return serde_json::from_slice(&self.body).map_err(ContentError::Parse);
		}

		let text = String::from_utf8_lossy(&self.body);

		if looks_like_html(&text) {
			return Err(ContentError::HtmlErrorPage { content_type: self.content_type.clone() });
		}

		serde_json::from_str(&text).map_err(ContentError::Parse)
	}
}

fn looks_like_html(text: &str) -> bool {
	text.contains("<!DOCTYPE") || text.contains("<html")
}

/// Thin wrapper around [`ReqwestClient`] so shared HTTP behavior lives in one place.
///
/// reqwest keeps no cookie store unless one is configured, so credentials are never sent.
#[cfg(feature = "reqwest")]
#[derive(Clone, Debug, Default)]
pub struct ReqwestHttpClient(pub ReqwestClient);
#[cfg(feature = "reqwest")]
impl ReqwestHttpClient {
	/// Wraps an existing reqwest [`ReqwestClient`].
	pub fn with_client(client: ReqwestClient) -> Self {
		Self(client)
	}
}
#[cfg(feature = "reqwest")]
impl AsRef<ReqwestClient> for ReqwestHttpClient {
	fn as_ref(&self) -> &ReqwestClient {
		&self.0
	}
}
#[cfg(feature = "reqwest")]
impl DataHttpClient for ReqwestHttpClient {
	fn get(&self, request: DataRequest) -> HttpFuture<'_> {
		let client = self.0.clone();

		Box::pin(async move {
			let mut builder = client.get(request.url);

			for (name, value) in REQUEST_HEADERS {
				builder = builder.header(name, value);
			}

			let response = builder.send().await?;
			let status = response.status().as_u16();
			let content_type = response
				.headers()
				.get(CONTENT_TYPE)
				.and_then(|value| value.to_str().ok())
				.map(str::to_owned);
			let body = response.bytes().await?.to_vec();

			Ok(DataResponse { status, content_type, body })
		})
	}
}
