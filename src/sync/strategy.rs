//! Synchronization strategies.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use super::SyncEventKind;
use crate::error::CacheError;

/// How a handle's local cache reacts to peer mutations.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SyncStrategy {
    /// Peer mutations are ignored; local entries live until TTL or eviction
    None,
    /// Peer mutations drop the local copy
    Invalidate,
    /// Peer updates replace the local copy, invalidations drop it
    Update,
}

/// What to do with the local entry a peer event refers to.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SyncAction {
    Ignore,
    Remove,
    Replace,
}

impl SyncStrategy {
    /// Maps an incoming event kind to a local action.
    ///
    /// | strategy   | update  | invalidate |
    /// |------------|---------|------------|
    /// | none       | ignore  | ignore     |
    /// | invalidate | remove  | remove     |
    /// | update     | replace | remove     |
    pub fn action_for(self, kind: SyncEventKind) -> SyncAction {
        match (self, kind) {
            (SyncStrategy::None, _) => SyncAction::Ignore,
            (SyncStrategy::Invalidate, _) => SyncAction::Remove,
            (SyncStrategy::Update, SyncEventKind::Update) => SyncAction::Replace,
            (SyncStrategy::Update, SyncEventKind::Invalidate) => SyncAction::Remove,
        }
    }

    /// Kind of event a handle using this strategy publishes for a write.
    ///
    /// Only `Update` handles pay for shipping values to peers.
    pub fn outgoing_kind(self) -> SyncEventKind {
        match self {
            SyncStrategy::Update => SyncEventKind::Update,
            SyncStrategy::None | SyncStrategy::Invalidate => SyncEventKind::Invalidate,
        }
    }

    /// Whether a handle needs to listen to the event channel at all.
    pub fn needs_subscription(self) -> bool {
        self != SyncStrategy::None
    }
}

impl FromStr for SyncStrategy {
    type Err = CacheError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "none" => Ok(SyncStrategy::None),
            "invalidate" => Ok(SyncStrategy::Invalidate),
            "update" => Ok(SyncStrategy::Update),
            other => Err(CacheError::Configuration(format!(
                "unknown sync strategy '{}'",
                other
            ))),
        }
    }
}

impl fmt::Display for SyncStrategy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            SyncStrategy::None => "none",
            SyncStrategy::Invalidate => "invalidate",
            SyncStrategy::Update => "update",
        };
        f.write_str(name)
    }
}
