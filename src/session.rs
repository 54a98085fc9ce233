//! Session identity used as the rate-limit key.
//!
//! The loader never looks up ambient storage itself; callers inject a
//! [`SessionIdProvider`] so tests can pin deterministic keys.

// std
use std::sync::OnceLock;
// crates.io
use base64::{Engine as _, engine::general_purpose::URL_SAFE_NO_PAD};
use rand::Rng;
// self
use crate::{_prelude::*, clock::Clock, id::SessionId};

const SESSION_ENTROPY_BYTES: usize = 12;

/// Capability returning the identifier of the current client session.
pub trait SessionIdProvider
where
	Self: Send + Sync,
{
	/// Returns the session identifier. Must be stable for the provider's lifetime.
	fn session_id(&self) -> SessionId;
}

/// Provider that always returns the same caller-supplied identifier.
#[derive(Clone, Debug)]
pub struct StaticSessionId(pub SessionId);
impl SessionIdProvider for StaticSessionId {
	fn session_id(&self) -> SessionId {
		self.0.clone()
	}
}

/// Provider that generates `session_<unix ms>_<random>` on first use and keeps it.
pub struct GeneratedSessionId {
	clock: Arc<dyn Clock>,
	id: OnceLock<SessionId>,
}
impl GeneratedSessionId {
	/// Creates a provider that stamps new identifiers with `clock`.
	pub fn new(clock: Arc<dyn Clock>) -> Self {
		Self { clock, id: OnceLock::new() }
	}

	fn generate(&self) -> SessionId {
		let mut entropy = [0_u8; SESSION_ENTROPY_BYTES];

		rand::rng().fill(&mut entropy);

		let millis = self.clock.now().unix_timestamp_nanos() / 1_000_000;

		// Base64 URL-safe output never contains whitespace.
		SessionId::try_from(format!("session_{millis}_{}", URL_SAFE_NO_PAD.encode(entropy)))
			.unwrap_or_else(|_| SessionId::from_static("session_fallback"))
	}
}
impl SessionIdProvider for GeneratedSessionId {
	fn session_id(&self) -> SessionId {
		self.id.get_or_init(|| self.generate()).clone()
	}
}
impl Debug for GeneratedSessionId {
	fn fmt(&self, f: &mut Formatter) -> FmtResult {
		f.debug_struct("GeneratedSessionId").field("id", &self.id.get()).finish()
	}
}

#[cfg(test)]
mod tests {
	// crates.io
	use time::macros;
	// self
	use super::*;
	use crate::clock::ManualClock;

	#[test]
	fn generated_id_is_stable_and_stamped() {
		let clock = ManualClock::new(macros::datetime!(2026-01-05 13:00 UTC));
		let provider = GeneratedSessionId::new(Arc::new(clock.clone()));
		let first = provider.session_id();

		clock.advance(Duration::minutes(10));

		assert_eq!(provider.session_id(), first);
		assert!(first.starts_with("session_1767618000000_"), "Unexpected session id: {first}.");
	}

	#[test]
	fn separate_providers_do_not_collide() {
		let clock: Arc<dyn Clock> =
			Arc::new(ManualClock::new(macros::datetime!(2026-01-05 13:00 UTC)));
		let a = GeneratedSessionId::new(clock.clone()).session_id();
		let b = GeneratedSessionId::new(clock).session_id();

		assert_ne!(a, b);
	}

	#[test]
	fn static_provider_returns_fixture() {
		let id = SessionId::new("session-fixed").expect("Session fixture should be valid.");

		assert_eq!(StaticSessionId(id.clone()).session_id(), id);
	}
}
