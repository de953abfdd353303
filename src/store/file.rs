//! Simple file-backed [`SessionStore`] for lightweight deployments.

// std
use std::{
	fs::{self, File},
	io::Write,
	path::{Path, PathBuf},
};
// self
use crate::{
	_prelude::*,
	auth::{SessionRecord, UserId},
	store::{SessionStore, SessionTable, StoreError, StoreFuture},
};

/// Persists session records to a JSON file after each write.
///
/// The snapshot is a JSON array of records; the token index is rebuilt on open. A write is
/// committed in memory only after the snapshot has been replaced on disk.
#[derive(Clone, Debug)]
pub struct FileStore {
	path: PathBuf,
	inner: Arc<RwLock<SessionTable>>,
}
impl FileStore {
	/// Opens (or creates) a store at the provided path, eagerly loading existing data.
	pub fn open(path: impl Into<PathBuf>) -> Result<Self, StoreError> {
		let path = path.into();

		ensure_parent_exists(&path)?;

		let table = SessionTable::from_records(load_snapshot(&path)?)?;

		Ok(Self { path, inner: Arc::new(RwLock::new(table)) })
	}

	/// Location of the JSON snapshot.
	pub fn path(&self) -> &Path {
		&self.path
	}

	fn persist(&self, table: &SessionTable) -> Result<(), StoreError> {
		ensure_parent_exists(&self.path)?;

		let mut snapshot = table.records().collect::<Vec<_>>();

		snapshot.sort_by(|a, b| a.user.cmp(&b.user));

		let serialized =
			serde_json::to_vec_pretty(&snapshot).map_err(|e| StoreError::Serialization {
				message: format!("Failed to serialize store snapshot: {e}"),
			})?;
		let mut tmp_path = self.path.clone();

		tmp_path.set_extension("tmp");

		{
			let mut file = File::create(&tmp_path).map_err(|e| StoreError::Backend {
				message: format!("Failed to create {}: {e}", tmp_path.display()),
			})?;

			file.write_all(&serialized).map_err(|e| StoreError::Backend {
				message: format!("Failed to write {}: {e}", tmp_path.display()),
			})?;
			file.sync_all().map_err(|e| StoreError::Backend {
				message: format!("Failed to sync {}: {e}", tmp_path.display()),
			})?;
		}

		fs::rename(&tmp_path, &self.path).map_err(|e| StoreError::Backend {
			message: format!("Failed to replace {}: {e}", self.path.display()),
		})
	}
}
impl SessionStore for FileStore {
	fn find_by_access_token<'a>(&'a self, access_token: &'a str) -> StoreFuture<'a, SessionRecord> {
		Box::pin(async move { self.inner.read().find_by_access_token(access_token) })
	}

	fn find_by_user<'a>(&'a self, user: &'a UserId) -> StoreFuture<'a, SessionRecord> {
		Box::pin(async move { self.inner.read().find_by_user(user) })
	}

	fn upsert(&self, record: SessionRecord) -> StoreFuture<'_, ()> {
		Box::pin(async move {
			let mut guard = self.inner.write();
			let mut next = guard.clone();

			next.upsert(record)?;
			self.persist(&next)?;

			*guard = next;

			Ok(())
		})
	}
}

fn load_snapshot(path: &Path) -> Result<Vec<SessionRecord>, StoreError> {
	if !path.exists() {
		return Ok(Vec::new());
	}

	let bytes = fs::read(path).map_err(|e| StoreError::Backend {
		message: format!("Failed to read {}: {e}", path.display()),
	})?;

	if bytes.is_empty() {
		return Ok(Vec::new());
	}

	serde_json::from_slice(&bytes).map_err(|e| StoreError::Serialization {
		message: format!("Failed to parse {}: {e}", path.display()),
	})
}

fn ensure_parent_exists(path: &Path) -> Result<(), StoreError> {
	if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
		fs::create_dir_all(parent).map_err(|e| StoreError::Backend {
			message: format!("Failed to create store directory {}: {e}", parent.display()),
		})?;
	}

	Ok(())
}

#[cfg(test)]
mod tests {
	// std
	use std::{env, process};
	// crates.io
	use tokio::runtime::Runtime;
	// self
	use super::*;

	fn temp_path(label: &str) -> PathBuf {
		let unique = format!(
			"oauth2_session_file_store_{label}_{}_{}.json",
			process::id(),
			OffsetDateTime::now_utc().unix_timestamp_nanos(),
		);

		env::temp_dir().join(unique)
	}

	fn build_record(access: &str) -> SessionRecord {
		SessionRecord::builder(UserId::new("alice").expect("Failed to build user fixture."))
			.access_token(access)
			.refresh_token("refresh1")
			.expires_in(Duration::hours(1))
			.build()
			.expect("Failed to build file-store test record.")
	}

	#[test]
	fn rotation_survives_reopen() {
		let path = temp_path("rotation");
		let store = FileStore::open(&path).expect("Failed to open file store snapshot.");
		let rt = Runtime::new().expect("Failed to build Tokio runtime for file store test.");

		rt.block_on(store.upsert(build_record("AT1")))
			.expect("Failed to save fixture record to file store.");
		rt.block_on(store.upsert(build_record("AT2")))
			.expect("Failed to rotate fixture record in file store.");
		drop(store);

		let reopened = FileStore::open(&path).expect("Failed to reopen file store snapshot.");

		assert_eq!(
			rt.block_on(reopened.find_by_access_token("AT1")),
			Err(StoreError::NotFound)
		);

		let fetched = rt
			.block_on(reopened.find_by_access_token("AT2"))
			.expect("File store lost rotated record after reopen.");

		assert_eq!(fetched.user.as_str(), "alice");
		assert_eq!(fetched.refresh_token.as_ref().map(|s| s.expose()), Some("refresh1"));

		fs::remove_file(&path).unwrap_or_else(|e| {
			panic!("Failed to remove temporary file store snapshot {}: {e}", path.display())
		});
	}

	#[test]
	fn rejected_writes_leave_disk_and_memory_untouched() {
		let path = temp_path("conflict");
		let store = FileStore::open(&path).expect("Failed to open file store snapshot.");
		let rt = Runtime::new().expect("Failed to build Tokio runtime for file store test.");

		rt.block_on(store.upsert(build_record("AT1"))).expect("Initial write should succeed.");

		let bob = SessionRecord::builder(UserId::new("bob").expect("Failed to build user fixture."))
			.access_token("AT1")
			.expires_in(Duration::hours(1))
			.build()
			.expect("Failed to build conflicting record.");
		let err = rt.block_on(store.upsert(bob)).expect_err("Conflicting token must be rejected.");

		assert!(matches!(err, StoreError::IndexConflict { .. }));

		let bob_id = UserId::new("bob").expect("Failed to build user fixture.");
		let reopened = FileStore::open(store.path()).expect("Failed to reopen file store snapshot.");

		assert_eq!(rt.block_on(reopened.find_by_user(&bob_id)), Err(StoreError::NotFound));
		assert_eq!(rt.block_on(store.find_by_user(&bob_id)), Err(StoreError::NotFound));

		fs::remove_file(&path).unwrap_or_else(|e| {
			panic!("Failed to remove temporary file store snapshot {}: {e}", path.display())
		});
	}

	#[test]
	fn corrupt_snapshots_fail_to_open() {
		let path = temp_path("corrupt");

		fs::write(&path, b"{not json").expect("Failed to write corrupt snapshot.");

		assert!(matches!(FileStore::open(&path), Err(StoreError::Serialization { .. })));

		fs::remove_file(&path).unwrap_or_else(|e| {
			panic!("Failed to remove temporary file store snapshot {}: {e}", path.display())
		});
	}
}
