// SPDX-FileCopyrightText: 2026 Deaddrop Contributors
//
// SPDX-License-Identifier: GPL-3.0-or-later

//! Sync bookkeeping: announcement cursor, board-read dedup ledger and the
//! outbound envelope queue for writes deferred by transport failures.

use rusqlite::params;

use super::{Storage, StorageError};
use crate::engine::Seeker;
use crate::model::Message;

/// A prepared envelope whose bulletin-store write is still owed.
#[derive(Debug, Clone)]
pub struct OutboundItem {
    pub message_id: String,
    pub seeker: Seeker,
    pub ciphertext: Vec<u8>,
    pub queued_at: u64,
}

impl Storage {
    // === Announcement Cursor ===

    /// How many bulletin entries this owner has already processed.
    pub fn announcement_cursor(&self, owner_user_id: &str) -> Result<u64, StorageError> {
        let result = self.conn().query_row(
            "SELECT announcement_cursor FROM sync_state WHERE owner_user_id = ?1",
            params![owner_user_id],
            |row| row.get::<_, i64>(0),
        );
        match result {
            Ok(cursor) => Ok(cursor as u64),
            Err(rusqlite::Error::QueryReturnedNoRows) => Ok(0),
            Err(e) => Err(StorageError::Database(e)),
        }
    }

    /// Advances the cursor. Only called after a successful fetch.
    pub fn set_announcement_cursor(
        &self,
        owner_user_id: &str,
        cursor: u64,
    ) -> Result<(), StorageError> {
        self.conn().execute(
            "INSERT INTO sync_state (owner_user_id, announcement_cursor) VALUES (?1, ?2)
             ON CONFLICT(owner_user_id) DO UPDATE SET announcement_cursor = ?2",
            params![owner_user_id, cursor as i64],
        )?;
        Ok(())
    }

    // === Board-Read Dedup Ledger ===

    /// Whether a `(seeker, ciphertext)` pair has already been persisted.
    /// Checked before the entry is handed to the engine, which consumes
    /// the seeker.
    pub fn board_read_seen(
        &self,
        owner_user_id: &str,
        seeker: &Seeker,
        ciphertext: &[u8],
    ) -> Result<bool, StorageError> {
        let count: i64 = self.conn().query_row(
            "SELECT COUNT(*) FROM board_read_ledger
             WHERE owner_user_id = ?1 AND seeker = ?2 AND ciphertext = ?3",
            params![owner_user_id, seeker.as_bytes(), ciphertext],
            |row| row.get(0),
        )?;
        Ok(count > 0)
    }

    /// Persists one decrypted board read in a single transaction: the
    /// dedup-ledger row, the message (with the discussion's denormalized
    /// fields), the rotated next seeker and the contact's last-seen stamp.
    /// Either all of it commits or none of it does — a failed persist
    /// leaves no ledger row, so the entry is picked up again on the next
    /// cycle instead of being dropped. Returns `false` without writing
    /// anything when the `(seeker, ciphertext)` pair is already ledgered.
    pub fn persist_board_read(
        &self,
        owner_user_id: &str,
        seeker: &Seeker,
        ciphertext: &[u8],
        message: &Message,
        next_seeker: &Seeker,
        synced_at: u64,
    ) -> Result<bool, StorageError> {
        let now = crate::clock::now_secs() as i64;
        let tx = self.conn().unchecked_transaction()?;

        let inserted = tx.execute(
            "INSERT OR IGNORE INTO board_read_ledger
                 (owner_user_id, seeker, ciphertext, processed_at)
             VALUES (?1, ?2, ?3, ?4)",
            params![owner_user_id, seeker.as_bytes(), ciphertext, now],
        )?;
        if inserted == 0 {
            // Dropping the transaction rolls it back.
            return Ok(false);
        }

        super::messages::write_message(&tx, message)?;

        tx.execute(
            "UPDATE discussions SET next_seeker = ?1, last_sync_at = ?2, updated_at = ?3
             WHERE owner_user_id = ?4 AND contact_user_id = ?5",
            params![
                next_seeker.as_bytes(),
                synced_at as i64,
                now,
                owner_user_id,
                message.contact_user_id
            ],
        )?;
        tx.execute(
            "UPDATE contacts SET last_seen = ?1, updated_at = ?2
             WHERE owner_user_id = ?3 AND user_id = ?4",
            params![
                message.timestamp as i64,
                now,
                owner_user_id,
                message.contact_user_id
            ],
        )?;

        tx.commit()?;
        Ok(true)
    }

    // === Outbound Queue ===

    /// Parks an envelope whose network write failed; the sync cycle drains
    /// it. Re-queueing the same message overwrites the previous envelope.
    pub fn enqueue_outbound(
        &self,
        owner_user_id: &str,
        message_id: &str,
        seeker: &Seeker,
        ciphertext: &[u8],
    ) -> Result<(), StorageError> {
        self.conn().execute(
            "INSERT OR REPLACE INTO outbound_queue
                 (message_id, owner_user_id, seeker, ciphertext, queued_at)
             VALUES (?1, ?2, ?3, ?4, ?5)",
            params![
                message_id,
                owner_user_id,
                seeker.as_bytes(),
                ciphertext,
                crate::clock::now_secs() as i64
            ],
        )?;
        Ok(())
    }

    /// All queued envelopes for an owner, oldest first.
    pub fn list_outbound(&self, owner_user_id: &str) -> Result<Vec<OutboundItem>, StorageError> {
        let mut stmt = self.conn().prepare(
            "SELECT message_id, seeker, ciphertext, queued_at FROM outbound_queue
             WHERE owner_user_id = ?1 ORDER BY queued_at",
        )?;

        let rows = stmt.query_map(params![owner_user_id], |row| {
            Ok(OutboundItem {
                message_id: row.get(0)?,
                seeker: Seeker::new(row.get(1)?),
                ciphertext: row.get(2)?,
                queued_at: row.get::<_, i64>(3)? as u64,
            })
        })?;
        rows.collect::<Result<Vec<_>, _>>()
            .map_err(StorageError::Database)
    }

    /// Removes an envelope once its write succeeded.
    pub fn dequeue_outbound(&self, message_id: &str) -> Result<(), StorageError> {
        self.conn().execute(
            "DELETE FROM outbound_queue WHERE message_id = ?1",
            params![message_id],
        )?;
        Ok(())
    }
}
