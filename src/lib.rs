//! Secure data loader for Monalytics market data: per-session rate limiting, a TTL cache with
//! stale fallback, retrying JSON fetches, and payload validation in one crate.

#![deny(clippy::all, missing_docs, unused_crate_dependencies)]

pub mod cache;
pub mod clock;
pub mod config;
pub mod error;
pub mod http;
pub mod id;
pub mod limiter;
pub mod loader;
pub mod obs;
pub mod security;
pub mod session;
#[cfg(all(any(test, feature = "test"), feature = "reqwest"))]
pub mod _preludet {
	//! Convenience re-exports and helpers for integration tests against mock servers; enabled
	//! via `cfg(test)` or the `test` feature.

	pub use crate::_prelude::*;

	// crates.io
	use time::macros;
	// self
	use crate::{
		clock::ManualClock,
		config::LoaderConfig,
		http::ReqwestHttpClient,
		id::SessionId,
		loader::DataLoader,
		session::{SessionIdProvider, StaticSessionId},
	};

	/// Loader type alias used by reqwest-backed integration tests.
	pub type ReqwestTestLoader = DataLoader<ReqwestHttpClient>;

	/// Instant every test clock starts at.
	pub const TEST_START: OffsetDateTime = macros::datetime!(2026-01-05 13:00 UTC);

	/// Session key used by test loaders.
	pub fn test_session() -> SessionId {
		SessionId::new("session-test").expect("Test session identifier should be valid.")
	}

	/// Configuration pointing at a mock server, with short backoff for fast tests.
	pub fn test_config(base_url: &str) -> LoaderConfig {
		LoaderConfig::default()
			.with_base_url(base_url)
			.with_branch("main")
			.with_page_host("localhost")
			.with_retry(3, Duration::milliseconds(10))
			.with_request_timeout(Duration::seconds(2))
	}

	/// Constructs a reqwest-backed loader with a fixed session and a manual clock starting at
	/// [`TEST_START`].
	pub fn build_reqwest_test_loader(config: LoaderConfig) -> (ReqwestTestLoader, ManualClock) {
		let clock = ManualClock::new(TEST_START);
		let session: Arc<dyn SessionIdProvider> = Arc::new(StaticSessionId(test_session()));
		let loader = ReqwestTestLoader::with_http_client(
			config,
			session,
			Arc::new(clock.clone()),
			ReqwestHttpClient::default(),
		)
		.expect("Test loader configuration should validate.");

		(loader, clock)
	}
}

mod _prelude {
	pub use std::{
		collections::{BTreeMap, BTreeSet, HashMap},
		fmt::{Debug, Display, Formatter, Result as FmtResult},
		future::Future,
		pin::Pin,
		str::FromStr,
		sync::Arc,
	};

	pub use async_lock::Mutex as AsyncMutex;
	pub use parking_lot::{Mutex, RwLock};
	#[cfg(feature = "reqwest")]
	pub use reqwest::{Client as ReqwestClient, Error as ReqwestError};
	pub use serde::{Deserialize, Serialize};
	pub use serde_json::Value;
	pub use thiserror::Error as ThisError;
	pub use time::{Duration, OffsetDateTime};
	pub use url::Url;

	pub use crate::error::{Error, Result};
}

#[cfg(feature = "reqwest")] pub use reqwest;
pub use serde_json;
#[cfg(test)] use {color_eyre as _, httpmock as _};
