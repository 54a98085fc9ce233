//! Thread-safe in-memory TTL cache for fetched payloads, keyed by data type.
//!
//! [`DataCache::get`] enforces a hard TTL and evicts expired entries. The fetch
//! pipeline reads through two crate-internal paths instead: a non-evicting fresh
//! lookup, and a raw lookup that ignores the TTL and serves as the stale fallback
//! when a fetch fails. Entries therefore survive expiry until the periodic sweep or
//! an explicit [`DataCache::clear`].

// std
use std::time::Duration as StdDuration;
// crates.io
use tokio::task::JoinHandle;
// self
use crate::{
	_prelude::*,
	clock::{self, Clock},
	id::DataType,
};

/// Cached payload plus the instant it was stored.
#[derive(Clone, Debug, PartialEq)]
pub struct CacheEntry {
	/// Sanitized payload.
	pub payload: Value,
	/// Instant the payload was stored.
	pub stored_at: OffsetDateTime,
}

type CacheMap = RwLock<HashMap<DataType, CacheEntry>>;

/// In-process cache shared by loader instances.
pub struct DataCache {
	ttl: Duration,
	clock: Arc<dyn Clock>,
	entries: CacheMap,
}
impl DataCache {
	/// Creates an empty cache whose entries stay fresh for `ttl`.
	pub fn new(ttl: Duration, clock: Arc<dyn Clock>) -> Self {
		Self { ttl, clock, entries: Default::default() }
	}

	/// Freshness window applied by [`get`](Self::get).
	pub fn ttl(&self) -> Duration {
		self.ttl
	}

	/// Stores `payload` under `key`, replacing any previous entry.
	pub fn set(&self, key: DataType, payload: Value) {
		let entry = CacheEntry { payload, stored_at: self.clock.now() };

		self.entries.write().insert(key, entry);
	}

	/// Returns the payload if it is younger than the TTL; evicts it otherwise.
	pub fn get(&self, key: &str) -> Option<Value> {
		let now = self.clock.now();
		let mut entries = self.entries.write();
		let expired = now - entries.get(key)?.stored_at > self.ttl;

		if expired {
			entries.remove(key);

			return None;
		}

		entries.get(key).map(|entry| entry.payload.clone())
	}

	/// Removes every entry.
	pub fn clear(&self) {
		self.entries.write().clear();
	}

	/// Number of entries, expired ones included.
	pub fn len(&self) -> usize {
		self.entries.read().len()
	}

	/// Returns true when no entries are stored.
	pub fn is_empty(&self) -> bool {
		self.entries.read().is_empty()
	}

	/// Spawns a task that empties the cache every `every` until the cache is dropped.
	///
	/// Requires a running Tokio runtime. Abort the returned handle to stop early.
	pub fn spawn_sweeper(self: &Arc<Self>, every: Duration) -> JoinHandle<()> {
		let cache = Arc::downgrade(self);
		let period = clock::std_duration(every).max(StdDuration::from_millis(1));

		tokio::spawn(async move {
			let mut ticker = tokio::time::interval(period);

			// The first tick completes immediately.
			ticker.tick().await;

			loop {
				ticker.tick().await;

				let Some(cache) = cache.upgrade() else { break };
				let swept = cache.len();

				cache.clear();

				tracing::debug!(swept, "Periodic cache sweep cleared entries.");
			}
		})
	}

	/// Fresh payload without evicting expired entries.
	pub(crate) fn fresh(&self, key: &str) -> Option<Value> {
		let now = self.clock.now();

		self.entries
			.read()
			.get(key)
			.filter(|entry| now - entry.stored_at <= self.ttl)
			.map(|entry| entry.payload.clone())
	}

	/// Payload regardless of age, for the stale fallback path.
	pub(crate) fn stale(&self, key: &str) -> Option<CacheEntry> {
		self.entries.read().get(key).cloned()
	}
}
impl Debug for DataCache {
	fn fmt(&self, f: &mut Formatter) -> FmtResult {
		f.debug_struct("DataCache").field("ttl", &self.ttl).field("len", &self.len()).finish()
	}
}
