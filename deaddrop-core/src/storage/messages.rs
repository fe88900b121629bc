// SPDX-FileCopyrightText: 2026 Deaddrop Contributors
//
// SPDX-License-Identifier: GPL-3.0-or-later

//! Message storage operations.
//!
//! Every message write runs a cross-table transaction: the message insert
//! and the owning discussion's denormalized last-message fields + unread
//! counter must never be observably inconsistent.

use rusqlite::{params, Connection};

use super::{Storage, StorageError};
use crate::model::{Discussion, Message, MessageDirection, MessageStatus};

const MESSAGE_COLUMNS: &str = "id, owner_user_id, contact_user_id, content, direction, status, \
     timestamp, created_at, updated_at";

fn read_message(row: &rusqlite::Row<'_>) -> Result<Message, rusqlite::Error> {
    let direction: String = row.get(4)?;
    let status: String = row.get(5)?;
    let bad_column = |idx: usize, e: String| {
        rusqlite::Error::FromSqlConversionFailure(
            idx,
            rusqlite::types::Type::Text,
            Box::new(std::io::Error::new(std::io::ErrorKind::InvalidData, e)),
        )
    };
    Ok(Message {
        id: row.get(0)?,
        owner_user_id: row.get(1)?,
        contact_user_id: row.get(2)?,
        content: row.get(3)?,
        direction: MessageDirection::parse(&direction).map_err(|e| bad_column(4, e))?,
        status: MessageStatus::parse(&status).map_err(|e| bad_column(5, e))?,
        timestamp: row.get::<_, i64>(6)? as u64,
        created_at: row.get::<_, i64>(7)? as u64,
        updated_at: row.get::<_, i64>(8)? as u64,
    })
}

/// Inserts a message and updates the owning discussion's denormalized
/// last-message fields + unread counter. Runs inside the caller's
/// transaction; `persist_board_read` shares this with `add_message`.
/// Creates the discussion row if a message arrives for a contact without
/// one (engine-confirmed session).
pub(super) fn write_message(conn: &Connection, message: &Message) -> Result<(), StorageError> {
    let now = crate::clock::now_secs() as i64;

    conn.execute(
        &format!(
            "INSERT INTO messages ({}) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9)",
            MESSAGE_COLUMNS
        ),
        params![
            message.id,
            message.owner_user_id,
            message.contact_user_id,
            message.content,
            message.direction.as_str(),
            message.status.as_str(),
            message.timestamp as i64,
            message.created_at as i64,
            message.updated_at as i64,
        ],
    )?;

    let unread_bump = match message.direction {
        MessageDirection::Incoming => 1i64,
        MessageDirection::Outgoing => 0i64,
    };

    let updated = conn.execute(
        "UPDATE discussions
         SET last_message_content = ?1,
             last_message_at = ?2,
             unread_count = unread_count + ?3,
             updated_at = ?4
         WHERE owner_user_id = ?5 AND contact_user_id = ?6",
        params![
            message.content,
            message.timestamp as i64,
            unread_bump,
            now,
            message.owner_user_id,
            message.contact_user_id
        ],
    )?;

    if updated == 0 {
        // Update-or-create: the engine vouched for the session, so the
        // row materializes as active.
        let mut discussion =
            Discussion::received(&message.owner_user_id, &message.contact_user_id);
        discussion.status = crate::model::DiscussionStatus::Active;
        discussion.last_message_content = Some(message.content.clone());
        discussion.last_message_at = Some(message.timestamp);
        discussion.unread_count = unread_bump as u32;
        conn.execute(
            "INSERT INTO discussions (owner_user_id, contact_user_id, direction, status,
                 next_seeker, initiation_announcement, announcement_broadcast_at,
                 last_sync_at, last_message_content, last_message_at, unread_count,
                 created_at, updated_at)
             VALUES (?1, ?2, ?3, ?4, NULL, NULL, NULL, NULL, ?5, ?6, ?7, ?8, ?9)",
            params![
                discussion.owner_user_id,
                discussion.contact_user_id,
                discussion.direction.as_str(),
                discussion.status.as_str(),
                discussion.last_message_content,
                discussion.last_message_at.map(|v| v as i64),
                discussion.unread_count as i64,
                discussion.created_at as i64,
                discussion.updated_at as i64,
            ],
        )?;
    }

    Ok(())
}

impl Storage {
    // === Message Operations ===

    /// Persists a message and updates the owning discussion in one atomic
    /// unit: denormalized last-message fields always, the unread counter
    /// only for incoming messages.
    pub fn add_message(&self, message: &Message) -> Result<(), StorageError> {
        let tx = self.conn().unchecked_transaction()?;
        write_message(&tx, message)?;
        tx.commit()?;
        Ok(())
    }

    /// Lists a discussion's messages in chronological order. Rowid breaks
    /// same-second ties, so bursts keep their insertion order.
    pub fn list_messages(
        &self,
        owner_user_id: &str,
        contact_user_id: &str,
    ) -> Result<Vec<Message>, StorageError> {
        let mut stmt = self.conn().prepare(&format!(
            "SELECT {} FROM messages
             WHERE owner_user_id = ?1 AND contact_user_id = ?2
             ORDER BY timestamp, created_at, rowid",
            MESSAGE_COLUMNS
        ))?;

        let rows = stmt.query_map(params![owner_user_id, contact_user_id], read_message)?;
        rows.collect::<Result<Vec<_>, _>>()
            .map_err(StorageError::Database)
    }

    /// Moves a message to a new delivery status.
    pub fn set_message_status(
        &self,
        message_id: &str,
        status: MessageStatus,
    ) -> Result<(), StorageError> {
        let updated = self.conn().execute(
            "UPDATE messages SET status = ?1, updated_at = ?2 WHERE id = ?3",
            params![
                status.as_str(),
                crate::clock::now_secs() as i64,
                message_id
            ],
        )?;
        if updated == 0 {
            return Err(StorageError::NotFound(format!("message {}", message_id)));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::{Contact, DiscussionStatus};

    fn seed(storage: &Storage) {
        storage
            .save_contact(&Contact::new("owner", "bob", "Bob", vec![1]))
            .unwrap();
        let mut discussion = Discussion::received("owner", "bob");
        discussion.status = DiscussionStatus::Active;
        storage.create_discussion(&discussion).unwrap();
    }

    #[test]
    fn incoming_message_bumps_unread_and_denorm() {
        let storage = Storage::in_memory().unwrap();
        seed(&storage);

        storage
            .add_message(&Message::incoming("owner", "bob", "hello", 42))
            .unwrap();

        let discussion = storage.get_discussion("owner", "bob").unwrap().unwrap();
        assert_eq!(discussion.unread_count, 1);
        assert_eq!(discussion.last_message_content.as_deref(), Some("hello"));
        assert_eq!(discussion.last_message_at, Some(42));
    }

    #[test]
    fn outgoing_message_does_not_bump_unread() {
        let storage = Storage::in_memory().unwrap();
        seed(&storage);

        storage
            .add_message(&Message::outgoing("owner", "bob", "hi"))
            .unwrap();

        let discussion = storage.get_discussion("owner", "bob").unwrap().unwrap();
        assert_eq!(discussion.unread_count, 0);
        assert_eq!(discussion.last_message_content.as_deref(), Some("hi"));
    }

    #[test]
    fn mark_read_resets_unread_and_message_status() {
        let storage = Storage::in_memory().unwrap();
        seed(&storage);
        storage
            .add_message(&Message::incoming("owner", "bob", "one", 1))
            .unwrap();
        storage
            .add_message(&Message::incoming("owner", "bob", "two", 2))
            .unwrap();

        storage.mark_discussion_read("owner", "bob").unwrap();

        let discussion = storage.get_discussion("owner", "bob").unwrap().unwrap();
        assert_eq!(discussion.unread_count, 0);
        let messages = storage.list_messages("owner", "bob").unwrap();
        assert!(messages.iter().all(|m| m.status == MessageStatus::Read));
    }

    #[test]
    fn message_without_discussion_creates_one() {
        let storage = Storage::in_memory().unwrap();

        storage
            .add_message(&Message::incoming("owner", "stranger", "hello", 7))
            .unwrap();

        let discussion = storage
            .get_discussion("owner", "stranger")
            .unwrap()
            .unwrap();
        assert_eq!(discussion.status, DiscussionStatus::Active);
        assert_eq!(discussion.unread_count, 1);
    }
}
