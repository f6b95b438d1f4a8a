use std::collections::HashMap;
use std::path::Path;

use log::debug;
use redb::{Database, ReadableTable, TableDefinition};
use thiserror::Error;

/// Single table mapping formatted `"Kind:ID"` keys to the canonical hash of
/// the last representation Central acknowledged. Values use the engine's
/// fixed eight-byte integer encoding; iteration is ordered by key.
const DEDUPE_TABLE: TableDefinition<&str, u64> = TableDefinition::new("dedupe_state");

/// Errors surfaced by the write-ahead log, one variant per storage stage.
#[derive(Debug, Error)]
pub enum WalError {
	#[error("failed to open wal database: {0}")]
	Open(#[from] redb::DatabaseError),
	#[error("failed to begin wal transaction: {0}")]
	Transaction(#[from] redb::TransactionError),
	#[error("failed to open wal table: {0}")]
	Table(#[from] redb::TableError),
	#[error("wal storage failure: {0}")]
	Storage(#[from] redb::StorageError),
	#[error("failed to commit wal transaction: {0}")]
	Commit(#[from] redb::CommitError),
}

/// Durable `id -> hash` store remembering what was last communicated to (and
/// acknowledged by) Central, surviving process restarts.
///
/// Every mutation commits synchronously before returning. That cost is
/// acceptable here: the WAL sits off the network hot path and is only
/// written once Central acknowledges a sequence point, by which time the
/// writes arrive pre-batched from the acker.
pub struct DedupeWal {
	db: Database,
}

impl DedupeWal {
	/// Opens (or creates) the WAL at `path`. The table is created eagerly so
	/// a snapshot of a fresh WAL reads as empty rather than missing.
	pub fn open(path: impl AsRef<Path>) -> Result<Self, WalError> {
		let db = Database::create(path.as_ref())?;
		let txn = db.begin_write()?;
		{
			txn.open_table(DEDUPE_TABLE)?;
		}
		txn.commit()?;
		debug!("opened dedupe wal at {}", path.as_ref().display());
		Ok(Self { db })
	}

	/// Durably upserts `id -> hash`.
	pub fn insert(&self, id: &str, hash: u64) -> Result<(), WalError> {
		let txn = self.db.begin_write()?;
		{
			let mut table = txn.open_table(DEDUPE_TABLE)?;
			table.insert(id, hash)?;
		}
		txn.commit()?;
		Ok(())
	}

	/// Durably removes `id`. Removing an id that was never written is fine:
	/// an acked Remove may follow an Add that itself was never flushed.
	pub fn delete(&self, id: &str) -> Result<(), WalError> {
		let txn = self.db.begin_write()?;
		{
			let mut table = txn.open_table(DEDUPE_TABLE)?;
			table.remove(id)?;
		}
		txn.commit()?;
		Ok(())
	}

	/// Full snapshot of the persisted state. Called at startup to reseed the
	/// deduper cache and the reconciliation baseline.
	pub fn get_map(&self) -> Result<HashMap<String, u64>, WalError> {
		let txn = self.db.begin_read()?;
		let table = txn.open_table(DEDUPE_TABLE)?;
		let mut snapshot = HashMap::new();
		for entry in table.iter()? {
			let (key, value) = entry?;
			snapshot.insert(key.value().to_string(), value.value());
		}
		Ok(snapshot)
	}
}
