// SPDX-FileCopyrightText: 2026 Deaddrop Contributors
//
// SPDX-License-Identifier: GPL-3.0-or-later

//! Discussion storage operations.

use rusqlite::params;

use super::{Storage, StorageError};
use crate::engine::Seeker;
use crate::model::{Discussion, DiscussionDirection, DiscussionStatus};

const DISCUSSION_COLUMNS: &str = "owner_user_id, contact_user_id, direction, status, next_seeker, \
     initiation_announcement, announcement_broadcast_at, last_sync_at, \
     last_message_content, last_message_at, unread_count, created_at, updated_at";

pub(super) fn read_discussion(row: &rusqlite::Row<'_>) -> Result<Discussion, rusqlite::Error> {
    let direction: String = row.get(2)?;
    let status: String = row.get(3)?;
    Ok(Discussion {
        owner_user_id: row.get(0)?,
        contact_user_id: row.get(1)?,
        direction: DiscussionDirection::parse(&direction).map_err(|e| {
            rusqlite::Error::FromSqlConversionFailure(
                2,
                rusqlite::types::Type::Text,
                Box::new(std::io::Error::new(std::io::ErrorKind::InvalidData, e)),
            )
        })?,
        status: DiscussionStatus::parse(&status).map_err(|e| {
            rusqlite::Error::FromSqlConversionFailure(
                3,
                rusqlite::types::Type::Text,
                Box::new(std::io::Error::new(std::io::ErrorKind::InvalidData, e)),
            )
        })?,
        next_seeker: row.get::<_, Option<Vec<u8>>>(4)?.map(Seeker::new),
        initiation_announcement: row.get(5)?,
        announcement_broadcast_at: row.get::<_, Option<i64>>(6)?.map(|v| v as u64),
        last_sync_at: row.get::<_, Option<i64>>(7)?.map(|v| v as u64),
        last_message_content: row.get(8)?,
        last_message_at: row.get::<_, Option<i64>>(9)?.map(|v| v as u64),
        unread_count: row.get::<_, i64>(10)? as u32,
        created_at: row.get::<_, i64>(11)? as u64,
        updated_at: row.get::<_, i64>(12)? as u64,
    })
}

impl Storage {
    // === Discussion Operations ===

    /// Creates a discussion row. Exactly one row may exist per
    /// `(owner_user_id, contact_user_id)`.
    pub fn create_discussion(&self, discussion: &Discussion) -> Result<(), StorageError> {
        if self
            .get_discussion(&discussion.owner_user_id, &discussion.contact_user_id)?
            .is_some()
        {
            return Err(StorageError::AlreadyExists(format!(
                "discussion with {}",
                discussion.contact_user_id
            )));
        }
        self.write_discussion(discussion, false)
    }

    /// Replaces an existing discussion row wholesale. Used only by the fresh
    /// announcement path that supersedes a closed discussion.
    pub fn replace_discussion(&self, discussion: &Discussion) -> Result<(), StorageError> {
        self.write_discussion(discussion, true)
    }

    fn write_discussion(&self, d: &Discussion, replace: bool) -> Result<(), StorageError> {
        let verb = if replace { "INSERT OR REPLACE" } else { "INSERT" };
        self.conn().execute(
            &format!(
                "{} INTO discussions ({})
                 VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11, ?12, ?13)",
                verb, DISCUSSION_COLUMNS
            ),
            params![
                d.owner_user_id,
                d.contact_user_id,
                d.direction.as_str(),
                d.status.as_str(),
                d.next_seeker.as_ref().map(|s| s.as_bytes().to_vec()),
                d.initiation_announcement,
                d.announcement_broadcast_at.map(|v| v as i64),
                d.last_sync_at.map(|v| v as i64),
                d.last_message_content,
                d.last_message_at.map(|v| v as i64),
                d.unread_count as i64,
                d.created_at as i64,
                d.updated_at as i64,
            ],
        )?;
        Ok(())
    }

    /// Loads one discussion of an owner.
    pub fn get_discussion(
        &self,
        owner_user_id: &str,
        contact_user_id: &str,
    ) -> Result<Option<Discussion>, StorageError> {
        let result = self.conn().query_row(
            &format!(
                "SELECT {} FROM discussions
                 WHERE owner_user_id = ?1 AND contact_user_id = ?2",
                DISCUSSION_COLUMNS
            ),
            params![owner_user_id, contact_user_id],
            read_discussion,
        );

        match result {
            Ok(discussion) => Ok(Some(discussion)),
            Err(rusqlite::Error::QueryReturnedNoRows) => Ok(None),
            Err(e) => Err(StorageError::Database(e)),
        }
    }

    /// Lists an owner's discussions, most recent activity first (falls back
    /// to creation time for discussions without messages).
    pub fn list_discussions(&self, owner_user_id: &str) -> Result<Vec<Discussion>, StorageError> {
        let mut stmt = self.conn().prepare(&format!(
            "SELECT {} FROM discussions WHERE owner_user_id = ?1
             ORDER BY COALESCE(last_message_at, created_at) DESC",
            DISCUSSION_COLUMNS
        ))?;

        let rows = stmt.query_map(params![owner_user_id], read_discussion)?;
        rows.collect::<Result<Vec<_>, _>>()
            .map_err(StorageError::Database)
    }

    /// Moves a discussion to a new lifecycle status.
    pub fn set_discussion_status(
        &self,
        owner_user_id: &str,
        contact_user_id: &str,
        status: DiscussionStatus,
    ) -> Result<(), StorageError> {
        let updated = self.conn().execute(
            "UPDATE discussions SET status = ?1, updated_at = ?2
             WHERE owner_user_id = ?3 AND contact_user_id = ?4",
            params![
                status.as_str(),
                crate::clock::now_secs() as i64,
                owner_user_id,
                contact_user_id
            ],
        )?;
        if updated == 0 {
            return Err(StorageError::NotFound(format!(
                "discussion with {}",
                contact_user_id
            )));
        }
        Ok(())
    }

    /// Closes a discussion and zeroes its unread count (the refuse path).
    pub fn close_discussion(
        &self,
        owner_user_id: &str,
        contact_user_id: &str,
    ) -> Result<(), StorageError> {
        let updated = self.conn().execute(
            "UPDATE discussions SET status = 'closed', unread_count = 0, updated_at = ?1
             WHERE owner_user_id = ?2 AND contact_user_id = ?3",
            params![
                crate::clock::now_secs() as i64,
                owner_user_id,
                contact_user_id
            ],
        )?;
        if updated == 0 {
            return Err(StorageError::NotFound(format!(
                "discussion with {}",
                contact_user_id
            )));
        }
        Ok(())
    }

    /// Refreshes the rotating seeker after an exchange.
    pub fn set_next_seeker(
        &self,
        owner_user_id: &str,
        contact_user_id: &str,
        seeker: &Seeker,
    ) -> Result<(), StorageError> {
        self.conn().execute(
            "UPDATE discussions SET next_seeker = ?1, updated_at = ?2
             WHERE owner_user_id = ?3 AND contact_user_id = ?4",
            params![
                seeker.as_bytes(),
                crate::clock::now_secs() as i64,
                owner_user_id,
                contact_user_id
            ],
        )?;
        Ok(())
    }

    /// Records that the initiation announcement reached the bulletin store.
    pub fn set_announcement_broadcast(
        &self,
        owner_user_id: &str,
        contact_user_id: &str,
        at: u64,
    ) -> Result<(), StorageError> {
        self.conn().execute(
            "UPDATE discussions SET announcement_broadcast_at = ?1, updated_at = ?2
             WHERE owner_user_id = ?3 AND contact_user_id = ?4",
            params![
                at as i64,
                crate::clock::now_secs() as i64,
                owner_user_id,
                contact_user_id
            ],
        )?;
        Ok(())
    }

    /// Initiated discussions whose announcement broadcast has not yet
    /// succeeded. The sync cycle re-broadcasts these.
    pub fn list_unsent_announcements(
        &self,
        owner_user_id: &str,
    ) -> Result<Vec<Discussion>, StorageError> {
        let mut stmt = self.conn().prepare(&format!(
            "SELECT {} FROM discussions
             WHERE owner_user_id = ?1
               AND direction = 'initiated'
               AND status != 'closed'
               AND announcement_broadcast_at IS NULL
               AND initiation_announcement IS NOT NULL
             ORDER BY created_at",
            DISCUSSION_COLUMNS
        ))?;

        let rows = stmt.query_map(params![owner_user_id], read_discussion)?;
        rows.collect::<Result<Vec<_>, _>>()
            .map_err(StorageError::Database)
    }

    /// Explicit read-mark: zeroes the unread counter and flips incoming
    /// messages to `read`, in one transaction.
    pub fn mark_discussion_read(
        &self,
        owner_user_id: &str,
        contact_user_id: &str,
    ) -> Result<(), StorageError> {
        let now = crate::clock::now_secs() as i64;
        let tx = self.conn().unchecked_transaction()?;
        tx.execute(
            "UPDATE discussions SET unread_count = 0, updated_at = ?1
             WHERE owner_user_id = ?2 AND contact_user_id = ?3",
            params![now, owner_user_id, contact_user_id],
        )?;
        tx.execute(
            "UPDATE messages SET status = 'read', updated_at = ?1
             WHERE owner_user_id = ?2 AND contact_user_id = ?3
               AND direction = 'incoming' AND status != 'read'",
            params![now, owner_user_id, contact_user_id],
        )?;
        tx.commit()?;
        Ok(())
    }
}
