//! Origin allow-listing, shallow schema validation, and payload sanitization.

// self
use crate::{_prelude::*, config::LoaderConfig, id::DataType};

/// Object keys stripped from every payload at any depth.
pub const DENIED_KEYS: [&str; 3] = ["__proto__", "constructor", "prototype"];

/// Stateless checks applied around every fetch.
#[derive(Clone, Debug)]
pub struct SecurityValidator {
	config: Arc<LoaderConfig>,
}
impl SecurityValidator {
	/// Creates a validator reading its allow-list and schemas from `config`.
	pub fn new(config: Arc<LoaderConfig>) -> Self {
		Self { config }
	}

	/// Returns true when the page host contains one of the allowed domains.
	///
	/// Always true when origin validation is disabled. A missing page host fails.
	pub fn validate_origin(&self) -> bool {
		if !self.config.validate_origin {
			return true;
		}

		let Some(host) = self.config.page_host.as_deref() else {
			tracing::warn!("Origin validation is enabled but no page host is configured.");

			return false;
		};

		if self.config.allowed_domains.iter().any(|domain| host.contains(domain.as_str())) {
			return true;
		}

		tracing::warn!(
			host,
			allowed = ?self.config.allowed_domains,
			"Page host is not in the allowed domain list."
		);

		false
	}

	/// Returns true when `data` carries every key expected for `data_type`.
	pub fn validate_data_structure(&self, data_type: &DataType, data: &Value) -> bool {
		self.check_data_structure(data_type, data).is_ok()
	}

	/// Like [`validate_data_structure`](Self::validate_data_structure), reporting missing keys.
	///
	/// Unregistered data types pass with a warning.
	pub fn check_data_structure(&self, data_type: &DataType, data: &Value) -> Result<()> {
		if !self.config.validate_data_structure {
			return Ok(());
		}

		let Some(source) = self.config.sources.get(data_type) else {
			tracing::warn!(%data_type, "No schema registered; accepting payload unchecked.");

			return Ok(());
		};
		let missing = source.missing_keys(data);

		if missing.is_empty() {
			Ok(())
		} else {
			tracing::warn!(%data_type, ?missing, "Payload is missing required keys.");

			Err(Error::Schema { data_type: data_type.clone(), missing })
		}
	}

	/// Rebuilds `data` without any [`DENIED_KEYS`] entry, at any depth.
	pub fn sanitize(data: Value) -> Value {
		let mut dropped = 0;
		let clean = strip_denied(data, &mut dropped);

		if dropped > 0 {
			tracing::warn!(dropped, "Removed dangerous keys from payload.");
		}

		clean
	}
}

/// Returns true for keys that must never reach callers.
pub fn is_denied_key(key: &str) -> bool {
	DENIED_KEYS.contains(&key)
}

fn strip_denied(value: Value, dropped: &mut usize) -> Value {
	match value {
		Value::Object(map) => Value::Object(
			map.into_iter()
				.filter_map(|(key, value)| {
					if is_denied_key(&key) {
						*dropped += 1;

						None
					} else {
						Some((key, strip_denied(value, dropped)))
					}
				})
				.collect(),
		),
		Value::Array(items) =>
			Value::Array(items.into_iter().map(|item| strip_denied(item, dropped)).collect()),
		scalar => scalar,
	}
}
