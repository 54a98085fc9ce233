//! Data source table: where each data type lives and which keys it must carry.

// self
use crate::{_prelude::*, id::DataType};

/// Remote location and expected shape of one data type.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct DataSource {
	/// Path relative to `base_url/branch`.
	pub path: String,
	/// Top-level keys every payload must contain.
	pub expected_keys: BTreeSet<String>,
}
impl DataSource {
	/// Creates a source for `path` requiring `expected_keys`.
	pub fn new<I, S>(path: impl Into<String>, expected_keys: I) -> Self
	where
		I: IntoIterator<Item = S>,
		S: Into<String>,
	{
		Self { path: path.into(), expected_keys: expected_keys.into_iter().map(Into::into).collect() }
	}

	/// Returns the expected keys that are not own properties of `data`.
	///
	/// Non-object payloads miss every key.
	pub fn missing_keys(&self, data: &Value) -> Vec<String> {
		let object = data.as_object();

		self.expected_keys
			.iter()
			.filter(|key| !object.is_some_and(|map| map.contains_key(key.as_str())))
			.cloned()
			.collect()
	}
}

/// Built-in table for the files published by the site.
pub fn default_sources() -> BTreeMap<DataType, DataSource> {
	BTreeMap::from([
		(DataType::bolsa(), DataSource::new("data/bolsa.json", ["ultima_atualizacao", "acoes"])),
		(
			DataType::indicadores(),
			DataSource::new("data/indicadores.json", ["ultima_atualizacao", "indicadores"]),
		),
		(
			DataType::noticias(),
			DataSource::new("data/noticias.json", ["ultima_atualizacao", "noticias"]),
		),
	])
}
