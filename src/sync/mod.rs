//! Sync Module
//!
//! Events, strategies and the engine that keeps a handle's local store
//! eventually consistent with its peers.

mod engine;
mod event;
mod strategy;

pub use engine::{Applied, SyncEngine};
pub use event::{HandleId, SyncEvent, SyncEventKind};
pub use strategy::{SyncAction, SyncStrategy};
