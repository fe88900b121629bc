// SPDX-FileCopyrightText: 2026 Deaddrop Contributors
//
// SPDX-License-Identifier: GPL-3.0-or-later

//! Typed entities owned by the local account.
//!
//! Everything here is scoped by `owner_user_id`: the store is multi-tenant
//! and every read/write is owner-filtered. External consumers only ever see
//! these types; seekers, announcements and engine state stay behind the
//! lifecycle controller.

use crate::clock;
use crate::engine::Seeker;

/// A known peer of the local account.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Contact {
    pub owner_user_id: String,
    pub user_id: String,
    pub name: String,
    /// Opaque key material, interpreted only by the Session Engine.
    pub public_keys: Vec<u8>,
    pub is_online: bool,
    pub last_seen: Option<u64>,
    pub created_at: u64,
    pub updated_at: u64,
}

impl Contact {
    pub fn new(owner_user_id: &str, user_id: &str, name: &str, public_keys: Vec<u8>) -> Self {
        let now = clock::now_secs();
        Contact {
            owner_user_id: owner_user_id.to_string(),
            user_id: user_id.to_string(),
            name: name.to_string(),
            public_keys,
            is_online: false,
            last_seen: None,
            created_at: now,
            updated_at: now,
        }
    }
}

/// Who opened the discussion.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DiscussionDirection {
    Initiated,
    Received,
}

impl DiscussionDirection {
    pub fn as_str(&self) -> &'static str {
        match self {
            DiscussionDirection::Initiated => "initiated",
            DiscussionDirection::Received => "received",
        }
    }

    pub fn parse(s: &str) -> Result<Self, String> {
        match s {
            "initiated" => Ok(DiscussionDirection::Initiated),
            "received" => Ok(DiscussionDirection::Received),
            other => Err(format!("unknown discussion direction: {}", other)),
        }
    }
}

/// Discussion lifecycle state. `Closed` is terminal: no local transition
/// leaves it, and only a fresh announcement cycle replaces the row.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DiscussionStatus {
    Pending,
    Active,
    Closed,
}

impl DiscussionStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            DiscussionStatus::Pending => "pending",
            DiscussionStatus::Active => "active",
            DiscussionStatus::Closed => "closed",
        }
    }

    pub fn parse(s: &str) -> Result<Self, String> {
        match s {
            "pending" => Ok(DiscussionStatus::Pending),
            "active" => Ok(DiscussionStatus::Active),
            "closed" => Ok(DiscussionStatus::Closed),
            other => Err(format!("unknown discussion status: {}", other)),
        }
    }
}

/// The local record of a pairwise conversation's lifecycle and sync state.
/// Exactly one row exists per `(owner_user_id, contact_user_id)`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Discussion {
    pub owner_user_id: String,
    pub contact_user_id: String,
    pub direction: DiscussionDirection,
    pub status: DiscussionStatus,
    /// Rotating lookup key, refreshed after each exchange.
    pub next_seeker: Option<Seeker>,
    /// The announcement we broadcast, kept for re-broadcast (initiated only).
    pub initiation_announcement: Option<Vec<u8>>,
    /// When the initiation broadcast succeeded; NULL means the next sync
    /// cycle retries it.
    pub announcement_broadcast_at: Option<u64>,
    pub last_sync_at: Option<u64>,
    /// Denormalized cache of the latest message, recomputed transactionally
    /// on every insert.
    pub last_message_content: Option<String>,
    pub last_message_at: Option<u64>,
    pub unread_count: u32,
    pub created_at: u64,
    pub updated_at: u64,
}

impl Discussion {
    /// A discussion we opened towards a contact.
    pub fn initiated(owner_user_id: &str, contact_user_id: &str, announcement: Vec<u8>) -> Self {
        let now = clock::now_secs();
        Discussion {
            owner_user_id: owner_user_id.to_string(),
            contact_user_id: contact_user_id.to_string(),
            direction: DiscussionDirection::Initiated,
            status: DiscussionStatus::Pending,
            next_seeker: None,
            initiation_announcement: Some(announcement),
            announcement_broadcast_at: None,
            last_sync_at: None,
            last_message_content: None,
            last_message_at: None,
            unread_count: 0,
            created_at: now,
            updated_at: now,
        }
    }

    /// A discussion opened towards us by a decrypted announcement.
    pub fn received(owner_user_id: &str, contact_user_id: &str) -> Self {
        let now = clock::now_secs();
        Discussion {
            owner_user_id: owner_user_id.to_string(),
            contact_user_id: contact_user_id.to_string(),
            direction: DiscussionDirection::Received,
            status: DiscussionStatus::Pending,
            next_seeker: None,
            initiation_announcement: None,
            announcement_broadcast_at: None,
            last_sync_at: None,
            last_message_content: None,
            last_message_at: None,
            unread_count: 0,
            created_at: now,
            updated_at: now,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MessageDirection {
    Incoming,
    Outgoing,
}

impl MessageDirection {
    pub fn as_str(&self) -> &'static str {
        match self {
            MessageDirection::Incoming => "incoming",
            MessageDirection::Outgoing => "outgoing",
        }
    }

    pub fn parse(s: &str) -> Result<Self, String> {
        match s {
            "incoming" => Ok(MessageDirection::Incoming),
            "outgoing" => Ok(MessageDirection::Outgoing),
            other => Err(format!("unknown message direction: {}", other)),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MessageStatus {
    Sending,
    Sent,
    Delivered,
    Read,
    Failed,
}

impl MessageStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            MessageStatus::Sending => "sending",
            MessageStatus::Sent => "sent",
            MessageStatus::Delivered => "delivered",
            MessageStatus::Read => "read",
            MessageStatus::Failed => "failed",
        }
    }

    pub fn parse(s: &str) -> Result<Self, String> {
        match s {
            "sending" => Ok(MessageStatus::Sending),
            "sent" => Ok(MessageStatus::Sent),
            "delivered" => Ok(MessageStatus::Delivered),
            "read" => Ok(MessageStatus::Read),
            "failed" => Ok(MessageStatus::Failed),
            other => Err(format!("unknown message status: {}", other)),
        }
    }
}

/// One message in a discussion. Never mutated after insert except for
/// status/read transitions.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Message {
    pub id: String,
    pub owner_user_id: String,
    pub contact_user_id: String,
    pub content: String,
    pub direction: MessageDirection,
    pub status: MessageStatus,
    pub timestamp: u64,
    pub created_at: u64,
    pub updated_at: u64,
}

impl Message {
    pub fn outgoing(owner_user_id: &str, contact_user_id: &str, content: &str) -> Self {
        let now = clock::now_secs();
        Message {
            id: uuid::Uuid::new_v4().to_string(),
            owner_user_id: owner_user_id.to_string(),
            contact_user_id: contact_user_id.to_string(),
            content: content.to_string(),
            direction: MessageDirection::Outgoing,
            status: MessageStatus::Sending,
            timestamp: now,
            created_at: now,
            updated_at: now,
        }
    }

    pub fn incoming(
        owner_user_id: &str,
        contact_user_id: &str,
        content: &str,
        timestamp: u64,
    ) -> Self {
        let now = clock::now_secs();
        Message {
            id: uuid::Uuid::new_v4().to_string(),
            owner_user_id: owner_user_id.to_string(),
            contact_user_id: contact_user_id.to_string(),
            content: content.to_string(),
            direction: MessageDirection::Incoming,
            status: MessageStatus::Delivered,
            timestamp,
            created_at: now,
            updated_at: now,
        }
    }
}
