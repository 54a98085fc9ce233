//! Per-session sliding-window rate limiter with temporary blocking.
//!
//! Each session may issue `max_requests_per_minute` requests within any trailing
//! [`RATE_WINDOW`]. The request that would exceed the quota blocks the session for
//! [`BLOCK_DURATION`], measured from the moment the block started. Windows and
//! blocks are pruned lazily on the next check for the same session.

// self
use crate::{_prelude::*, clock::Clock, id::SessionId};

/// Trailing window over which requests are counted.
pub const RATE_WINDOW: Duration = Duration::minutes(1);
/// How long a session stays blocked after exceeding its quota.
pub const BLOCK_DURATION: Duration = Duration::minutes(1);

/// Result of a [`RateLimiter::check`].
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum RateLimitDecision {
	/// The request may proceed.
	Allow {
		/// Requests left in the current window after this one.
		remaining: u32,
	},
	/// The session is serving an earlier block.
	Blocked {
		/// Instant the block started.
		blocked_at: OffsetDateTime,
		/// Earliest instant the session is allowed again.
		retry_at: OffsetDateTime,
	},
	/// This request exceeded the quota and started a new block.
	QuotaExceeded {
		/// Requests already recorded in the window.
		recent: usize,
		/// Earliest instant the session is allowed again.
		retry_at: OffsetDateTime,
	},
}
impl RateLimitDecision {
	/// Returns true for [`RateLimitDecision::Allow`].
	pub fn is_allowed(&self) -> bool {
		matches!(self, Self::Allow { .. })
	}

	/// Earliest retry instant for denied requests.
	pub fn retry_at(&self) -> Option<OffsetDateTime> {
		match self {
			Self::Allow { .. } => None,
			Self::Blocked { retry_at, .. } | Self::QuotaExceeded { retry_at, .. } => Some(*retry_at),
		}
	}
}

#[derive(Debug, Default)]
struct LimiterState {
	windows: HashMap<SessionId, Vec<OffsetDateTime>>,
	blocks: HashMap<SessionId, OffsetDateTime>,
}

/// Thread-safe sliding-window limiter keyed by [`SessionId`].
pub struct RateLimiter {
	max_requests: u32,
	user_agent: Option<String>,
	clock: Arc<dyn Clock>,
	state: Mutex<LimiterState>,
}
impl RateLimiter {
	/// Creates a limiter allowing `max_requests` per [`RATE_WINDOW`].
	pub fn new(max_requests: u32, clock: Arc<dyn Clock>) -> Self {
		Self { max_requests, user_agent: None, clock, state: Default::default() }
	}

	/// Sets the user agent reported alongside suspicious-activity warnings.
	pub fn with_user_agent(mut self, user_agent: Option<String>) -> Self {
		self.user_agent = user_agent;

		self
	}

	/// Returns true when the session may issue another request.
	pub fn is_allowed(&self, key: &SessionId) -> bool {
		self.check(key).is_allowed()
	}

	/// Records a request for `key` and returns the detailed decision.
	pub fn check(&self, key: &SessionId) -> RateLimitDecision {
		let now = self.clock.now();
		let mut state = self.state.lock();

		if let Some(&blocked_at) = state.blocks.get(key) {
			if now - blocked_at <= BLOCK_DURATION {
				let retry_at = blocked_at + BLOCK_DURATION;

				tracing::warn!(session = %key, %retry_at, "Session is temporarily blocked.");

				return RateLimitDecision::Blocked { blocked_at, retry_at };
			}

			state.blocks.remove(key);
		}

		let mut recent = state
			.windows
			.remove(key)
			.unwrap_or_default()
			.into_iter()
			.filter(|&at| now - at < RATE_WINDOW)
			.collect::<Vec<_>>();
		let limit = usize::try_from(self.max_requests).unwrap_or(usize::MAX);

		if recent.len() >= limit {
			state.blocks.insert(key.clone(), now);

			// Every timestamp in the window predates the block, so none survives it.
			tracing::warn!(
				session = %key,
				count = recent.len(),
				timestamp = %now,
				user_agent = self.user_agent.as_deref().unwrap_or("unknown"),
				"Suspicious activity: request quota exceeded, blocking session."
			);

			return RateLimitDecision::QuotaExceeded {
				recent: recent.len(),
				retry_at: now + BLOCK_DURATION,
			};
		}

		recent.push(now);

		let remaining = limit.saturating_sub(recent.len());

		state.windows.insert(key.clone(), recent);

		RateLimitDecision::Allow { remaining: u32::try_from(remaining).unwrap_or(u32::MAX) }
	}

	/// Returns true while `key` is serving a block.
	pub fn is_blocked(&self, key: &SessionId) -> bool {
		let now = self.clock.now();

		self.state.lock().blocks.get(key).is_some_and(|&at| now - at <= BLOCK_DURATION)
	}

	/// Requests currently counted against `key`, without recording a new one.
	pub fn recent_requests(&self, key: &SessionId) -> usize {
		let now = self.clock.now();

		self.state
			.lock()
			.windows
			.get(key)
			.map_or(0, |window| window.iter().filter(|&&at| now - at < RATE_WINDOW).count())
	}
}
impl Debug for RateLimiter {
	fn fmt(&self, f: &mut Formatter) -> FmtResult {
		let state = self.state.lock();

		f.debug_struct("RateLimiter")
			.field("max_requests", &self.max_requests)
			.field("tracked_sessions", &state.windows.len())
			.field("blocked_sessions", &state.blocks.len())
			.finish()
	}
}
