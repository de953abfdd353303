//! In-memory [`ParameterStore`] used by tests and local tooling.

// self
use crate::{
	_prelude::*,
	config::{ParameterFuture, ParameterStore},
};

/// Thread-safe parameter map.
#[derive(Clone, Debug, Default)]
pub struct MemoryParameterStore(Arc<RwLock<HashMap<String, String>>>);
impl MemoryParameterStore {
	/// Sets or replaces a parameter value.
	pub fn insert(&self, name: impl Into<String>, value: impl Into<String>) {
		self.0.write().insert(name.into(), value.into());
	}

	/// Removes a parameter, returning its previous value.
	pub fn remove(&self, name: &str) -> Option<String> {
		self.0.write().remove(name)
	}
}
impl<K, V> FromIterator<(K, V)> for MemoryParameterStore
where
	K: Into<String>,
	V: Into<String>,
{
	fn from_iter<I>(iter: I) -> Self
	where
		I: IntoIterator<Item = (K, V)>,
	{
		let map = iter.into_iter().map(|(k, v)| (k.into(), v.into())).collect();

		Self(Arc::new(RwLock::new(map)))
	}
}
impl ParameterStore for MemoryParameterStore {
	fn get_parameters<'a>(
		&'a self,
		names: &'a [&'a str],
	) -> ParameterFuture<'a, HashMap<String, String>> {
		let values = {
			let guard = self.0.read();

			names
				.iter()
				.filter_map(|name| guard.get(*name).map(|value| ((*name).to_owned(), value.clone())))
				.collect()
		};

		Box::pin(async move { Ok(values) })
	}
}

#[cfg(test)]
mod tests {
	// crates.io
	use tokio::runtime::Runtime;
	// self
	use super::*;

	#[test]
	fn lookups_return_only_present_names_and_track_updates() {
		let rt = Runtime::new().expect("Failed to build Tokio runtime for parameter tests.");
		let store = MemoryParameterStore::from_iter([("/a", "1")]);
		let first = rt.block_on(store.get_parameters(&["/a", "/b"])).expect("Lookup should succeed.");

		assert_eq!(first.len(), 1);
		assert_eq!(first.get("/a").map(String::as_str), Some("1"));

		store.insert("/b", "2");
		store.remove("/a");

		let second =
			rt.block_on(store.get_parameters(&["/a", "/b"])).expect("Lookup should succeed.");

		assert!(!second.contains_key("/a"));
		assert_eq!(second.get("/b").map(String::as_str), Some("2"));
	}
}
