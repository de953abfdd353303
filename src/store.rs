//! Storage contracts and built-in session store implementations.

pub mod file;
pub mod memory;

pub use file::FileStore;
pub use memory::MemoryStore;

// self
use crate::{
	_prelude::*,
	auth::{SessionRecord, UserId, token},
};

/// Boxed future returned by [`SessionStore`] implementations.
pub type StoreFuture<'a, T> = Pin<Box<dyn Future<Output = Result<T, StoreError>> + 'a + Send>>;

/// Durable session storage keyed by principal with a unique secondary index on the access
/// token.
///
/// A single [`SessionStore::upsert`] is the atomic unit of a token rotation: once it returns,
/// the new access token resolves and the previous one does not.
pub trait SessionStore
where
	Self: Send + Sync,
{
	/// Fetches the record whose current access token equals `access_token`.
	///
	/// Fails with [`StoreError::NotFound`] when no record carries that token.
	fn find_by_access_token<'a>(&'a self, access_token: &'a str) -> StoreFuture<'a, SessionRecord>;

	/// Fetches the record stored for `user`.
	fn find_by_user<'a>(&'a self, user: &'a UserId) -> StoreFuture<'a, SessionRecord>;

	/// Writes the full record, replacing any record stored for the same user.
	fn upsert(&self, record: SessionRecord) -> StoreFuture<'_, ()>;
}

/// Error type produced by [`SessionStore`] implementations.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize, ThisError)]
pub enum StoreError {
	/// No record matched the lookup key.
	#[error("Session record was not found.")]
	NotFound,
	/// The access token is already indexed for a different principal.
	#[error("Access token is already bound to {owner}.")]
	IndexConflict {
		/// Principal currently owning the token.
		owner: UserId,
	},
	/// Serialization failures surfaced by the backend.
	#[error("Serialization error: {message}.")]
	Serialization {
		/// Human-readable error payload.
		message: String,
	},
	/// Backend-level failure for the storage engine.
	#[error("Backend failure: {message}.")]
	Backend {
		/// Human-readable error payload.
		message: String,
	},
}

/// Primary map plus fingerprint index, mutated together under one lock by the built-in
/// stores.
#[derive(Clone, Debug, Default)]
pub(crate) struct SessionTable {
	records: HashMap<UserId, SessionRecord>,
	by_fingerprint: HashMap<String, UserId>,
}
impl SessionTable {
	pub(crate) fn from_records(
		records: impl IntoIterator<Item = SessionRecord>,
	) -> Result<Self, StoreError> {
		let mut table = Self::default();

		for record in records {
			table.upsert(record)?;
		}

		Ok(table)
	}

	pub(crate) fn find_by_access_token(&self, access_token: &str) -> Result<SessionRecord, StoreError> {
		let user =
			self.by_fingerprint.get(&token::fingerprint(access_token)).ok_or(StoreError::NotFound)?;

		self.records
			.get(user)
			.filter(|record| record.access_token.expose() == access_token)
			.cloned()
			.ok_or(StoreError::NotFound)
	}

	pub(crate) fn find_by_user(&self, user: &UserId) -> Result<SessionRecord, StoreError> {
		self.records.get(user).cloned().ok_or(StoreError::NotFound)
	}

	pub(crate) fn upsert(&mut self, record: SessionRecord) -> Result<(), StoreError> {
		let fingerprint = record.access_fingerprint();

		match self.by_fingerprint.get(&fingerprint) {
			Some(owner) if owner != &record.user =>
				return Err(StoreError::IndexConflict { owner: owner.clone() }),
			_ => {},
		}

		if let Some(previous) = self.records.get(&record.user) {
			let stale = previous.access_fingerprint();

			if stale != fingerprint {
				self.by_fingerprint.remove(&stale);
			}
		}

		self.by_fingerprint.insert(fingerprint, record.user.clone());
		self.records.insert(record.user.clone(), record);

		Ok(())
	}

	pub(crate) fn records(&self) -> impl Iterator<Item = &SessionRecord> {
		self.records.values()
	}

	pub(crate) fn len(&self) -> usize {
		self.records.len()
	}
}
