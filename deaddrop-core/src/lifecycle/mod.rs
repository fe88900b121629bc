// SPDX-FileCopyrightText: 2026 Deaddrop Contributors
//
// SPDX-License-Identifier: GPL-3.0-or-later

//! Discussion Lifecycle Controller
//!
//! Orchestrates the discussion state machine — create/accept/refuse and
//! message exchange — against the Session Engine, the bulletin client and
//! the persistent store. The presentation layer only ever calls these
//! operations; it never touches seekers, announcements or engine state.
//!
//! User-initiated actions succeed locally even when the network broadcast
//! fails: announcements and message envelopes whose write was deferred are
//! retried by the sync cycle.

use tracing::{debug, warn};

use crate::api::{AccountContext, DeaddropError, DeaddropEvent, DeaddropResult, EventDispatcher};
use crate::clock;
use crate::engine::SessionUpdate;
use crate::model::{Contact, Discussion, DiscussionStatus, Message, MessageStatus};
use crate::storage::Storage;
use crate::transport::{BulletinApi, BulletinClient};

/// Controls contact and discussion lifecycle operations for one account.
pub struct DiscussionController<'a, T: BulletinApi> {
    storage: &'a Storage,
    client: &'a BulletinClient<T>,
    ctx: &'a mut AccountContext,
    events: &'a EventDispatcher,
}

impl<'a, T: BulletinApi> DiscussionController<'a, T> {
    pub fn new(
        storage: &'a Storage,
        client: &'a BulletinClient<T>,
        ctx: &'a mut AccountContext,
        events: &'a EventDispatcher,
    ) -> Self {
        DiscussionController {
            storage,
            client,
            ctx,
            events,
        }
    }

    /// Adds a contact for the current account. Uniqueness by contact id and
    /// by case-insensitive display name is enforced by the store and
    /// surfaced synchronously.
    pub fn create_contact(
        &mut self,
        user_id: &str,
        name: &str,
        public_keys: Vec<u8>,
    ) -> DeaddropResult<Contact> {
        let contact = Contact::new(self.ctx.owner_user_id(), user_id, name, public_keys);
        self.storage.save_contact(&contact)?;
        self.events.dispatch(DeaddropEvent::ContactAdded {
            contact_user_id: user_id.to_string(),
        });
        Ok(contact)
    }

    /// Opens an outgoing session: the engine produces an announcement, the
    /// discussion row is persisted `pending/initiated`, then the broadcast
    /// is attempted. A failed broadcast is not an error — the row keeps its
    /// announcement and the next sync cycle re-broadcasts it.
    pub fn start_discussion(&mut self, contact_user_id: &str) -> DeaddropResult<Discussion> {
        let owner = self.ctx.owner_user_id().to_string();
        let contact = self
            .storage
            .get_contact(&owner, contact_user_id)?
            .ok_or_else(|| DeaddropError::ContactNotFound(contact_user_id.to_string()))?;

        let existing = self.storage.get_discussion(&owner, contact_user_id)?;
        if let Some(d) = &existing {
            if d.status != DiscussionStatus::Closed {
                return Err(DeaddropError::InvalidState(format!(
                    "discussion with {} already exists",
                    contact_user_id
                )));
            }
        }

        let prefix = self.ctx.seeker_prefix().to_vec();
        let (engine, keys) = self.ctx.engine_and_keys();
        let announcement = engine.establish_outgoing_session(&contact.public_keys, keys, &prefix)?;

        let discussion = Discussion::initiated(&owner, contact_user_id, announcement.clone());
        if existing.is_some() {
            // Fresh announcement cycle supersedes the closed row.
            self.storage.replace_discussion(&discussion)?;
        } else {
            self.storage.create_discussion(&discussion)?;
        }

        match self.client.send_announcement(&announcement) {
            Ok(counter) => {
                debug!(contact = contact_user_id, counter = %counter, "announcement broadcast");
                self.storage
                    .set_announcement_broadcast(&owner, contact_user_id, clock::now_secs())?;
            }
            Err(e) => {
                warn!(contact = contact_user_id, error = %e,
                    "announcement broadcast deferred to next sync");
            }
        }

        self.storage
            .get_discussion(&owner, contact_user_id)?
            .ok_or_else(|| DeaddropError::DiscussionNotFound(contact_user_id.to_string()))
    }

    /// Accepts a pending discussion, optionally renaming the contact.
    /// Accepting an already-active discussion is a no-op.
    pub fn accept(
        &mut self,
        contact_user_id: &str,
        rename: Option<&str>,
    ) -> DeaddropResult<Discussion> {
        let owner = self.ctx.owner_user_id().to_string();
        let discussion = self
            .storage
            .get_discussion(&owner, contact_user_id)?
            .ok_or_else(|| DeaddropError::DiscussionNotFound(contact_user_id.to_string()))?;

        match discussion.status {
            DiscussionStatus::Closed => Err(DeaddropError::InvalidState(format!(
                "discussion with {} is closed",
                contact_user_id
            ))),
            DiscussionStatus::Active => Ok(discussion),
            DiscussionStatus::Pending => {
                if let Some(new_name) = rename {
                    self.storage.rename_contact(&owner, contact_user_id, new_name)?;
                }
                self.storage.set_discussion_status(
                    &owner,
                    contact_user_id,
                    DiscussionStatus::Active,
                )?;
                self.events.dispatch(DeaddropEvent::DiscussionActivated {
                    contact_user_id: contact_user_id.to_string(),
                });
                self.storage
                    .get_discussion(&owner, contact_user_id)?
                    .ok_or_else(|| DeaddropError::DiscussionNotFound(contact_user_id.to_string()))
            }
        }
    }

    /// Refuses a discussion. Requires explicit confirmation; irreversible —
    /// a new interaction needs a fresh announcement cycle. Refusing an
    /// already-closed discussion is a no-op.
    pub fn refuse(&mut self, contact_user_id: &str, confirmed: bool) -> DeaddropResult<()> {
        if !confirmed {
            return Err(DeaddropError::ConfirmationRequired);
        }

        let owner = self.ctx.owner_user_id().to_string();
        let discussion = self
            .storage
            .get_discussion(&owner, contact_user_id)?
            .ok_or_else(|| DeaddropError::DiscussionNotFound(contact_user_id.to_string()))?;

        if discussion.status == DiscussionStatus::Closed {
            return Ok(());
        }

        self.storage.close_discussion(&owner, contact_user_id)?;
        self.ctx.engine_mut().peer_discard(contact_user_id);
        self.events.dispatch(DeaddropEvent::DiscussionClosed {
            contact_user_id: contact_user_id.to_string(),
        });
        Ok(())
    }

    /// Sends a message in an active discussion. The message is persisted
    /// first; a failed bulletin write parks the envelope in the outbound
    /// queue for the next sync cycle.
    pub fn send_message(
        &mut self,
        contact_user_id: &str,
        content: &str,
    ) -> DeaddropResult<Message> {
        let owner = self.ctx.owner_user_id().to_string();
        let discussion = self
            .storage
            .get_discussion(&owner, contact_user_id)?
            .ok_or_else(|| DeaddropError::DiscussionNotFound(contact_user_id.to_string()))?;

        if discussion.status != DiscussionStatus::Active {
            return Err(DeaddropError::InvalidState(format!(
                "discussion with {} is {}",
                contact_user_id,
                discussion.status.as_str()
            )));
        }

        let envelope = match self.ctx.engine_mut().send_message(contact_user_id, content) {
            Some(envelope) => envelope,
            None => {
                // Discussion row says active, engine disagrees. The sync
                // cycle re-derives local state from the engine.
                warn!(
                    contact = contact_user_id,
                    "state inconsistency: engine has no active session"
                );
                return Err(DeaddropError::NoActiveSession(contact_user_id.to_string()));
            }
        };

        let mut message = Message::outgoing(&owner, contact_user_id, content);
        self.storage.add_message(&message)?;

        match self.client.send_message(&envelope.seeker, &envelope.ciphertext) {
            Ok(()) => {
                self.storage.set_message_status(&message.id, MessageStatus::Sent)?;
                self.storage
                    .set_next_seeker(&owner, contact_user_id, &envelope.seeker)?;
                message.status = MessageStatus::Sent;
                self.events.dispatch(DeaddropEvent::MessageDelivered {
                    contact_user_id: contact_user_id.to_string(),
                    message_id: message.id.clone(),
                });
            }
            Err(e) => {
                warn!(contact = contact_user_id, error = %e,
                    "message write deferred to next sync");
                self.storage.enqueue_outbound(
                    &owner,
                    &message.id,
                    &envelope.seeker,
                    &envelope.ciphertext,
                )?;
                self.events.dispatch(DeaddropEvent::MessageDeferred {
                    contact_user_id: contact_user_id.to_string(),
                    message_id: message.id.clone(),
                });
            }
        }

        Ok(message)
    }

    /// Explicit read-mark: the only operation that resets the unread count.
    pub fn mark_read(&mut self, contact_user_id: &str) -> DeaddropResult<()> {
        let owner = self.ctx.owner_user_id().to_string();
        self.storage.mark_discussion_read(&owner, contact_user_id)?;
        Ok(())
    }
}

/// Merges one decrypted announcement into the store (scheduler-facing).
///
/// Idempotent: announcements for contacts that already have a live
/// discussion change nothing. A fresh announcement over a closed row
/// replaces it — engine replay rejection guarantees the announcement is not
/// a re-delivery. Returns `true` when a pending/received row was created.
pub(crate) fn merge_announcement(
    storage: &Storage,
    events: &EventDispatcher,
    owner_user_id: &str,
    update: &SessionUpdate,
) -> DeaddropResult<bool> {
    if storage.get_contact(owner_user_id, &update.peer_id)?.is_none() {
        // Contacts are created by user action or import, never implicitly.
        debug!(peer = %update.peer_id, "announcement from unknown peer ignored");
        return Ok(false);
    }

    let existing = storage.get_discussion(owner_user_id, &update.peer_id)?;
    match existing {
        Some(d) if d.status != DiscussionStatus::Closed => return Ok(false),
        Some(_) => {
            let fresh = Discussion::received(owner_user_id, &update.peer_id);
            storage.replace_discussion(&fresh)?;
        }
        None => {
            let fresh = Discussion::received(owner_user_id, &update.peer_id);
            storage.create_discussion(&fresh)?;
        }
    }

    if let Some(greeting) = &update.greeting {
        let message = Message::incoming(owner_user_id, &update.peer_id, greeting, clock::now_secs());
        storage.add_message(&message)?;
    }

    events.dispatch(DeaddropEvent::DiscussionRequested {
        contact_user_id: update.peer_id.clone(),
    });
    Ok(true)
}
