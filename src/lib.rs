//! Near Cache - local caches kept in sync over a shared remote store
//!
//! A [`CacheHandle`] binds one named collection of a remote key-value store
//! to an in-process cache with TTL expiration and LRU eviction. Writes go
//! through to the remote store and are announced on the collection's event
//! channel; every other handle applies them per its [`SyncStrategy`].
//!
//! The crate also ships the remote side: [`MemoryRemote`] for in-process
//! use and an axum service (see [`api`]) reachable through [`HttpRemote`].

pub mod api;
pub mod cache;
pub mod config;
pub mod error;
pub mod handle;
pub mod models;
pub mod remote;
pub mod sync;
pub mod tasks;

pub use api::AppState;
pub use config::{HandleConfig, MissPolicy, ServerConfig};
pub use error::{CacheError, Result};
pub use handle::CacheHandle;
pub use remote::{HttpRemote, MemoryRemote, RemoteHandle, RemoteStore};
pub use sync::{SyncEvent, SyncEventKind, SyncStrategy};
pub use tasks::spawn_cleanup_task;
