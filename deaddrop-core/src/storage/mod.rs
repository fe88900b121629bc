// SPDX-FileCopyrightText: 2026 Deaddrop Contributors
//
// SPDX-License-Identifier: GPL-3.0-or-later

//! Persistent Storage Module
//!
//! Owner-scoped SQLite tables for contacts, discussions and messages, plus
//! the sync bookkeeping tables (announcement cursor, board-read dedup
//! ledger, outbound envelope queue). `created_at`/`updated_at` are
//! maintained by the write paths; the message-insert + discussion-update
//! pair in [`Storage::add_message`] is the one cross-table transaction.

mod contacts;
mod discussions;
mod error;
mod messages;
pub mod migration;
mod sync_state;

pub use error::StorageError;
pub use sync_state::OutboundItem;

use std::path::Path;

use rusqlite::Connection;

/// SQLite-based storage implementation.
pub struct Storage {
    conn: Connection,
}

impl Storage {
    /// Opens or creates a storage database at the given path.
    pub fn open<P: AsRef<Path>>(path: P) -> Result<Self, StorageError> {
        let conn = Connection::open(path)?;
        let storage = Storage { conn };
        storage.run_migrations()?;
        Ok(storage)
    }

    /// Creates an in-memory storage (for testing).
    pub fn in_memory() -> Result<Self, StorageError> {
        let conn = Connection::open_in_memory()?;
        let storage = Storage { conn };
        storage.run_migrations()?;
        Ok(storage)
    }

    /// Runs all pending schema migrations.
    fn run_migrations(&self) -> Result<(), StorageError> {
        let migrations = migration::all_migrations();
        migration::MigrationRunner::run(&self.conn, &migrations)
    }

    /// Returns the current schema version.
    pub fn schema_version(&self) -> Result<u32, StorageError> {
        migration::MigrationRunner::current_version(&self.conn)
    }

    pub(crate) fn conn(&self) -> &Connection {
        &self.conn
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn in_memory_storage_is_migrated() {
        let storage = Storage::in_memory().unwrap();
        assert_eq!(storage.schema_version().unwrap(), 1);
    }

    #[test]
    fn reopening_is_idempotent() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("deaddrop.db");

        let storage = Storage::open(&path).unwrap();
        assert_eq!(storage.schema_version().unwrap(), 1);
        drop(storage);

        let storage = Storage::open(&path).unwrap();
        assert_eq!(storage.schema_version().unwrap(), 1);
    }
}
