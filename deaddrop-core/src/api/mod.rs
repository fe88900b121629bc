// SPDX-FileCopyrightText: 2026 Deaddrop Contributors
//
// SPDX-License-Identifier: GPL-3.0-or-later

//! Public API surface: the [`Deaddrop`] facade, configuration, errors,
//! events and the per-account session context.

mod account;
mod config;
mod deaddrop;
mod error;
mod events;

pub use account::AccountContext;
pub use config::{DeaddropConfig, StorageLocation, SyncConfig};
pub use deaddrop::Deaddrop;
pub use error::{DeaddropError, DeaddropResult};
pub use events::{CallbackHandler, DeaddropEvent, EventDispatcher, EventHandler};
