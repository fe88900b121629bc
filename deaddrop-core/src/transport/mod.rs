// SPDX-FileCopyrightText: 2026 Deaddrop Contributors
//
// SPDX-License-Identifier: GPL-3.0-or-later

//! Transport Layer
//!
//! Sends and receives opaque encrypted blobs against the public bulletin
//! store, the sole transport between parties. The layering:
//!
//! - **[`BulletinApi`] trait**: one method call = one attempt against the
//!   remote (REST binding or in-memory store).
//! - **[`BulletinClient`]**: retry, exponential backoff and structured
//!   failure on exhaustion. The only type the rest of the crate talks to.
//!
//! Payloads are never interpreted here; only the Session Engine understands
//! their contents.

mod api;
mod client;
mod error;
#[cfg(feature = "network")]
mod http;
mod memory;

pub use api::{BoardEntry, BulletinApi};
pub use client::{BulletinClient, RetryPolicy};
pub use error::TransportError;
#[cfg(feature = "network")]
pub use http::HttpBulletinApi;
pub use memory::MemoryBulletin;
