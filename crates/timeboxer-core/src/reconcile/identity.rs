//! Stable identity for imported tasks.
//!
//! Each external event id resolves to exactly one internal task id, recorded
//! in a versioned [`IdentityMap`] persisted alongside the tasks. For
//! well-formed external ids the internal id is derived from the id's
//! fixed-width UUID suffix, so the very first resolution is already stable
//! across devices; malformed ids fall back to a fresh random id, and the map
//! entry keeps even those stable across later passes.

use std::collections::HashMap;

use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::error::MalformedExternalId;

/// Width of the UUID suffix expected at the end of an external event id.
pub const UUID_SUFFIX_LEN: usize = 36;

/// Current on-disk format version of the identity map.
pub const IDENTITY_MAP_VERSION: u32 = 1;

/// Derive a task id from an external event id's UUID suffix.
///
/// Deterministic for well-formed ids: repeated passes recognize the same
/// external event as the same task without consulting any state.
pub fn derive_task_id(external_id: &str) -> Result<Uuid, MalformedExternalId> {
    let suffix = external_id
        .len()
        .checked_sub(UUID_SUFFIX_LEN)
        .and_then(|at| external_id.get(at..))
        .ok_or_else(|| MalformedExternalId(external_id.to_string()))?;
    Uuid::parse_str(suffix).map_err(|_| MalformedExternalId(external_id.to_string()))
}

/// Persisted external-id -> task-id mapping.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct IdentityMap {
    /// Format version, for forward migration.
    #[serde(default = "current_version")]
    pub version: u32,
    /// Resolved identities.
    #[serde(default)]
    entries: HashMap<String, Uuid>,
}

fn current_version() -> u32 {
    IDENTITY_MAP_VERSION
}

impl Default for IdentityMap {
    fn default() -> Self {
        IdentityMap::new()
    }
}

impl IdentityMap {
    /// Create an empty map at the current format version.
    pub fn new() -> Self {
        IdentityMap {
            version: IDENTITY_MAP_VERSION,
            entries: HashMap::new(),
        }
    }

    /// Resolve an external id to its task id, deriving and recording one on
    /// first sight.
    pub fn resolve(&mut self, external_id: &str) -> Uuid {
        if let Some(id) = self.entries.get(external_id) {
            return *id;
        }
        let id = match derive_task_id(external_id) {
            Ok(id) => id,
            Err(err) => {
                tracing::warn!(%err, "assigning fresh random identity to external event");
                Uuid::new_v4()
            }
        };
        self.entries.insert(external_id.to_string(), id);
        id
    }

    /// Look up a previously resolved identity without recording anything.
    pub fn get(&self, external_id: &str) -> Option<Uuid> {
        self.entries.get(external_id).copied()
    }

    /// Number of recorded identities.
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Whether the map holds no identities.
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Drop entries whose external id no longer exists upstream.
    pub fn retain<F: FnMut(&str) -> bool>(&mut self, mut keep: F) {
        self.entries.retain(|external_id, _| keep(external_id));
    }
}
