//! Deaddrop Core Library
//!
//! Decentralized session establishment and mailbox synchronization over an
//! untrusted public bulletin store. The store only ever sees opaque byte
//! blobs filed under rotating lookup keys (seekers); all interpretation of
//! those blobs lives in an injected Session Engine.

pub mod api;
mod clock;
pub mod engine;
pub mod lifecycle;
pub mod model;
pub mod storage;
pub mod sync;
pub mod transport;

pub use api::{
    AccountContext, CallbackHandler, Deaddrop, DeaddropConfig, DeaddropError, DeaddropEvent,
    DeaddropResult, EventHandler, StorageLocation, SyncConfig,
};
pub use engine::{
    DecryptedMessage, EngineError, KeyRing, MockSessionEngine, OutboundEnvelope, PeerSessionStatus,
    Seeker, SessionEngine, SessionUpdate,
};
pub use lifecycle::DiscussionController;
pub use model::{
    Contact, Discussion, DiscussionDirection, DiscussionStatus, Message, MessageDirection,
    MessageStatus,
};
pub use storage::{Storage, StorageError};
pub use sync::{SyncReport, SyncScheduler, SyncTrigger};
pub use transport::{
    BoardEntry, BulletinApi, BulletinClient, MemoryBulletin, RetryPolicy, TransportError,
};
#[cfg(feature = "network")]
pub use transport::HttpBulletinApi;
