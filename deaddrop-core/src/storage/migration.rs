// SPDX-FileCopyrightText: 2026 Deaddrop Contributors
//
// SPDX-License-Identifier: GPL-3.0-or-later

//! Database Schema Migration Framework
//!
//! Versioned schema migrations with transactional safety. Each migration has
//! a version number, name, and either SQL or a Rust callback. The runner
//! tracks applied versions in a `schema_version` table and runs pending
//! migrations in order within a single transaction.

use rusqlite::Connection;

use super::StorageError;

/// A single schema migration step.
pub struct Migration {
    /// Monotonically increasing version number (starting at 1).
    pub version: u32,
    /// Human-readable name for this migration.
    pub name: &'static str,
    /// The migration action: either SQL or a Rust callback.
    pub action: MigrationAction,
}

/// The action a migration performs.
pub enum MigrationAction {
    /// Pure SQL migration.
    Sql(&'static str),
    /// Rust callback migration (for data transformations).
    Callback(fn(&Connection) -> Result<(), StorageError>),
}

/// Runs schema migrations against a database connection.
pub struct MigrationRunner;

impl MigrationRunner {
    /// Runs all pending migrations in a transaction.
    ///
    /// Creates the `schema_version` table if it doesn't exist, then applies
    /// any migrations whose version is greater than the current schema
    /// version. If any migration fails, all changes are rolled back.
    pub fn run(conn: &Connection, migrations: &[Migration]) -> Result<(), StorageError> {
        // The schema_version table is created outside the transaction, since
        // we need to read it before starting the migration transaction.
        conn.execute_batch(
            "CREATE TABLE IF NOT EXISTS schema_version (
                version INTEGER PRIMARY KEY,
                applied_at INTEGER NOT NULL
            );",
        )?;

        let current_version = Self::current_version(conn)?;

        let pending: Vec<&Migration> = migrations
            .iter()
            .filter(|m| m.version > current_version)
            .collect();

        if pending.is_empty() {
            return Ok(());
        }

        for window in pending.windows(2) {
            if window[0].version >= window[1].version {
                return Err(StorageError::Migration(format!(
                    "Migrations are not in order: v{} before v{}",
                    window[0].version, window[1].version
                )));
            }
        }

        conn.execute_batch("BEGIN EXCLUSIVE TRANSACTION;")?;

        for migration in &pending {
            let applied = match &migration.action {
                MigrationAction::Sql(sql) => conn
                    .execute_batch(sql)
                    .map_err(|e| format!("Migration v{} '{}' failed: {}", migration.version, migration.name, e)),
                MigrationAction::Callback(cb) => cb(conn).map_err(|e| {
                    format!(
                        "Migration v{} '{}' callback failed: {}",
                        migration.version, migration.name, e
                    )
                }),
            };
            if let Err(message) = applied {
                conn.execute_batch("ROLLBACK;")?;
                return Err(StorageError::Migration(message));
            }

            let now = crate::clock::now_secs();
            if let Err(e) = conn.execute(
                "INSERT INTO schema_version (version, applied_at) VALUES (?1, ?2)",
                rusqlite::params![migration.version, now as i64],
            ) {
                conn.execute_batch("ROLLBACK;")?;
                return Err(StorageError::Migration(format!(
                    "Failed to record migration v{}: {}",
                    migration.version, e
                )));
            }
        }

        conn.execute_batch("COMMIT;")?;
        Ok(())
    }

    /// Returns the current schema version, or 0 if no migrations have run.
    pub fn current_version(conn: &Connection) -> Result<u32, StorageError> {
        let table_exists: bool = conn.query_row(
            "SELECT COUNT(*) > 0 FROM sqlite_master WHERE type='table' AND name='schema_version'",
            [],
            |row| row.get(0),
        )?;

        if !table_exists {
            return Ok(0);
        }

        let version: Option<u32> = conn
            .query_row("SELECT MAX(version) FROM schema_version", [], |row| {
                row.get(0)
            })
            .unwrap_or(None);

        Ok(version.unwrap_or(0))
    }
}

/// Returns all registered migrations in version order.
///
/// This is the single source of truth for the database schema.
/// New migrations are appended to the end of this list.
pub fn all_migrations() -> Vec<Migration> {
    vec![Migration {
        version: 1,
        name: "baseline_schema",
        action: MigrationAction::Sql(
            "
            CREATE TABLE contacts (
                owner_user_id TEXT NOT NULL,
                user_id TEXT NOT NULL,
                name TEXT NOT NULL,
                public_keys BLOB NOT NULL,
                is_online INTEGER NOT NULL DEFAULT 0,
                last_seen INTEGER,
                created_at INTEGER NOT NULL,
                updated_at INTEGER NOT NULL,
                PRIMARY KEY (owner_user_id, user_id)
            );

            CREATE UNIQUE INDEX idx_contacts_owner_name
                ON contacts (owner_user_id, name COLLATE NOCASE);

            CREATE TABLE discussions (
                owner_user_id TEXT NOT NULL,
                contact_user_id TEXT NOT NULL,
                direction TEXT NOT NULL
                    CHECK (direction IN ('initiated', 'received')),
                status TEXT NOT NULL
                    CHECK (status IN ('pending', 'active', 'closed')),
                next_seeker BLOB,
                initiation_announcement BLOB,
                announcement_broadcast_at INTEGER,
                last_sync_at INTEGER,
                last_message_content TEXT,
                last_message_at INTEGER,
                unread_count INTEGER NOT NULL DEFAULT 0
                    CHECK (unread_count >= 0),
                created_at INTEGER NOT NULL,
                updated_at INTEGER NOT NULL,
                PRIMARY KEY (owner_user_id, contact_user_id)
            );

            CREATE TABLE messages (
                id TEXT PRIMARY KEY,
                owner_user_id TEXT NOT NULL,
                contact_user_id TEXT NOT NULL,
                content TEXT NOT NULL,
                direction TEXT NOT NULL
                    CHECK (direction IN ('incoming', 'outgoing')),
                status TEXT NOT NULL
                    CHECK (status IN ('sending', 'sent', 'delivered', 'read', 'failed')),
                timestamp INTEGER NOT NULL,
                created_at INTEGER NOT NULL,
                updated_at INTEGER NOT NULL
            );

            CREATE INDEX idx_messages_owner_contact
                ON messages (owner_user_id, contact_user_id, timestamp);

            CREATE TABLE board_read_ledger (
                owner_user_id TEXT NOT NULL,
                seeker BLOB NOT NULL,
                ciphertext BLOB NOT NULL,
                processed_at INTEGER NOT NULL,
                PRIMARY KEY (owner_user_id, seeker, ciphertext)
            );

            CREATE TABLE outbound_queue (
                message_id TEXT PRIMARY KEY,
                owner_user_id TEXT NOT NULL,
                seeker BLOB NOT NULL,
                ciphertext BLOB NOT NULL,
                queued_at INTEGER NOT NULL
            );

            CREATE TABLE sync_state (
                owner_user_id TEXT PRIMARY KEY,
                announcement_cursor INTEGER NOT NULL DEFAULT 0
            );
            ",
        ),
    }]
}
