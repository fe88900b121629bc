// SPDX-FileCopyrightText: 2026 Deaddrop Contributors
//
// SPDX-License-Identifier: GPL-3.0-or-later

//! Event System
//!
//! Callbacks for Deaddrop events.

use std::sync::Arc;

/// Events emitted by Deaddrop.
#[derive(Debug, Clone)]
pub enum DeaddropEvent {
    /// A contact was added.
    ContactAdded {
        /// The contact's user id.
        contact_user_id: String,
    },

    /// An incoming announcement merged a pending discussion.
    DiscussionRequested {
        /// The announcing contact.
        contact_user_id: String,
    },

    /// A discussion became active (local accept or engine confirmation).
    DiscussionActivated {
        contact_user_id: String,
    },

    /// A discussion was closed.
    DiscussionClosed {
        contact_user_id: String,
    },

    /// An incoming message was decrypted and persisted.
    MessageReceived {
        contact_user_id: String,
        message_id: String,
    },

    /// An outgoing message reached the bulletin store.
    MessageDelivered {
        contact_user_id: String,
        message_id: String,
    },

    /// An outgoing message could not be written; it is queued and retried
    /// on the next sync cycle.
    MessageDeferred {
        contact_user_id: String,
        message_id: String,
    },

    /// A sync cycle finished.
    SyncCompleted {
        messages_persisted: usize,
        discussions_merged: usize,
    },

    /// A sync cycle hit transport failures and deferred part of its work.
    SyncDeferred {
        error: String,
    },
}

/// Event handler trait.
///
/// Implement this trait to receive Deaddrop events.
pub trait EventHandler: Send + Sync {
    /// Called when an event occurs.
    fn on_event(&self, event: DeaddropEvent);
}

/// Simple callback-based event handler.
pub struct CallbackHandler<F>
where
    F: Fn(DeaddropEvent) + Send + Sync,
{
    callback: F,
}

impl<F> CallbackHandler<F>
where
    F: Fn(DeaddropEvent) + Send + Sync,
{
    /// Creates a new callback handler.
    pub fn new(callback: F) -> Self {
        CallbackHandler { callback }
    }
}

impl<F> EventHandler for CallbackHandler<F>
where
    F: Fn(DeaddropEvent) + Send + Sync,
{
    fn on_event(&self, event: DeaddropEvent) {
        (self.callback)(event);
    }
}

/// Event dispatcher for managing multiple handlers.
#[derive(Default)]
pub struct EventDispatcher {
    handlers: Vec<Arc<dyn EventHandler>>,
}

impl EventDispatcher {
    /// Creates a new event dispatcher.
    pub fn new() -> Self {
        EventDispatcher {
            handlers: Vec::new(),
        }
    }

    /// Adds an event handler.
    pub fn add_handler(&mut self, handler: Arc<dyn EventHandler>) {
        self.handlers.push(handler);
    }

    /// Removes all handlers.
    pub fn clear_handlers(&mut self) {
        self.handlers.clear();
    }

    /// Returns the number of registered handlers.
    pub fn handler_count(&self) -> usize {
        self.handlers.len()
    }

    /// Dispatches an event to all handlers.
    pub fn dispatch(&self, event: DeaddropEvent) {
        for handler in &self.handlers {
            handler.on_event(event.clone());
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};

    #[test]
    fn dispatch_reaches_every_handler() {
        let count = Arc::new(AtomicUsize::new(0));
        let mut dispatcher = EventDispatcher::new();
        for _ in 0..3 {
            let count = count.clone();
            dispatcher.add_handler(Arc::new(CallbackHandler::new(move |_| {
                count.fetch_add(1, Ordering::SeqCst);
            })));
        }

        dispatcher.dispatch(DeaddropEvent::ContactAdded {
            contact_user_id: "bob".into(),
        });
        assert_eq!(count.load(Ordering::SeqCst), 3);

        assert_eq!(dispatcher.handler_count(), 3);
        dispatcher.clear_handlers();
        assert_eq!(dispatcher.handler_count(), 0);

        // A cleared dispatcher drops events on the floor.
        dispatcher.dispatch(DeaddropEvent::ContactAdded {
            contact_user_id: "bob".into(),
        });
        assert_eq!(count.load(Ordering::SeqCst), 3);
    }
}
