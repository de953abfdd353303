//! Thread-safe in-memory [`SessionStore`] implementation for local development and tests.

// self
use crate::{
	_prelude::*,
	auth::{SessionRecord, UserId},
	store::{SessionStore, SessionTable, StoreError, StoreFuture},
};

/// Keeps session records in-process; the record map and token index share one lock.
#[derive(Clone, Debug, Default)]
pub struct MemoryStore(Arc<RwLock<SessionTable>>);
impl MemoryStore {
	/// Seeds a store with existing records.
	pub fn with_records(
		records: impl IntoIterator<Item = SessionRecord>,
	) -> Result<Self, StoreError> {
		Ok(Self(Arc::new(RwLock::new(SessionTable::from_records(records)?))))
	}

	/// Number of stored sessions.
	pub fn len(&self) -> usize {
		self.0.read().len()
	}

	/// Returns `true` when no session is stored.
	pub fn is_empty(&self) -> bool {
		self.len() == 0
	}

	/// Snapshot of every stored record.
	pub fn records(&self) -> Vec<SessionRecord> {
		self.0.read().records().cloned().collect()
	}
}
impl SessionStore for MemoryStore {
	fn find_by_access_token<'a>(&'a self, access_token: &'a str) -> StoreFuture<'a, SessionRecord> {
		let found = self.0.read().find_by_access_token(access_token);

		Box::pin(async move { found })
	}

	fn find_by_user<'a>(&'a self, user: &'a UserId) -> StoreFuture<'a, SessionRecord> {
		let found = self.0.read().find_by_user(user);

		Box::pin(async move { found })
	}

	fn upsert(&self, record: SessionRecord) -> StoreFuture<'_, ()> {
		let table = self.0.clone();

		Box::pin(async move { table.write().upsert(record) })
	}
}
