//! Persisted per-cable disabled-side bitmasks.
//!
//! Each entry maps a [`CableKey`] to a 6-bit mask where bit `n` set means
//! the face with direction index `n` is disabled. Cables with no disabled
//! face are not stored. The store is loaded once at startup and saved
//! after toggles; a missing file is an empty store.
//!
//! On disk the store is a JSON array of `{ "cable": {..}, "mask": n }`
//! objects, ordered by cable key.

use std::collections::BTreeMap;
use std::path::Path;

use conduit_network::SideOverride;
use conduit_types::{CableKey, Direction};
use serde::{Deserialize, Serialize};
use tracing::{debug, info};

use crate::error::StoreError;

/// Bits that correspond to a valid direction index.
const VALID_MASK: u8 = 0b0011_1111;

#[derive(Debug, Serialize, Deserialize)]
struct Entry {
    cable: CableKey,
    mask: u8,
}

/// Disabled-side bitmasks keyed by cable.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct DisabledSideStore {
    masks: BTreeMap<CableKey, u8>,
}

impl DisabledSideStore {
    /// Create an empty store.
    pub const fn new() -> Self {
        Self {
            masks: BTreeMap::new(),
        }
    }

    /// Load the store from `path`. A missing file yields an empty store.
    ///
    /// Unknown mask bits are dropped, as are entries left with no
    /// disabled face.
    pub fn load(path: &Path) -> Result<Self, StoreError> {
        let contents = match std::fs::read_to_string(path) {
            Ok(contents) => contents,
            Err(source) if source.kind() == std::io::ErrorKind::NotFound => {
                debug!(path = %path.display(), "No side store on disk; starting empty");
                return Ok(Self::new());
            }
            Err(source) => {
                return Err(StoreError::Io {
                    path: path.to_path_buf(),
                    source,
                });
            }
        };
        let store = Self::from_json(&contents)?;
        info!(path = %path.display(), cables = store.len(), "Side store loaded");
        Ok(store)
    }

    /// Parse the on-disk JSON representation.
    pub fn from_json(json: &str) -> Result<Self, StoreError> {
        let entries: Vec<Entry> = serde_json::from_str(json)?;
        let masks = entries
            .into_iter()
            .filter_map(|entry| {
                let mask = entry.mask & VALID_MASK;
                (mask != 0).then_some((entry.cable, mask))
            })
            .collect();
        Ok(Self { masks })
    }

    /// Render the on-disk JSON representation.
    pub fn to_json(&self) -> Result<String, StoreError> {
        let entries: Vec<Entry> = self
            .masks
            .iter()
            .map(|(cable, mask)| Entry {
                cable: cable.clone(),
                mask: *mask,
            })
            .collect();
        Ok(serde_json::to_string_pretty(&entries)?)
    }

    /// Write the store to `path`.
    pub fn save(&self, path: &Path) -> Result<(), StoreError> {
        let json = self.to_json()?;
        std::fs::write(path, json).map_err(|source| StoreError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        debug!(path = %path.display(), cables = self.len(), "Side store saved");
        Ok(())
    }

    /// Number of cables with at least one disabled face.
    pub fn len(&self) -> usize {
        self.masks.len()
    }

    /// Whether no cable has a disabled face.
    pub fn is_empty(&self) -> bool {
        self.masks.is_empty()
    }

    /// Raw mask for `key` (0 when absent).
    pub fn mask(&self, key: &CableKey) -> u8 {
        self.masks.get(key).copied().unwrap_or(0)
    }

    /// Disabled faces of `key` in direction order.
    pub fn disabled_sides(&self, key: &CableKey) -> Vec<Direction> {
        let mask = self.mask(key);
        Direction::ALL
            .into_iter()
            .filter(|side| mask & side.mask_bit() != 0)
            .collect()
    }

    /// Flip one face. Returns `true` if the face is now disabled.
    pub fn toggle(&mut self, key: &CableKey, side: Direction) -> bool {
        let disabled = self.mask(key) & side.mask_bit() == 0;
        self.set(key, side, disabled);
        disabled
    }

    /// Enable or disable one face.
    pub fn set(&mut self, key: &CableKey, side: Direction, disabled: bool) {
        let mask = self.mask(key);
        let updated = if disabled {
            mask | side.mask_bit()
        } else {
            mask & !side.mask_bit()
        };
        if updated == 0 {
            self.masks.remove(key);
        } else {
            self.masks.insert(key.clone(), updated);
        }
    }

    /// Forget every disabled face of `key`. Returns `true` if any existed.
    pub fn clear_cable(&mut self, key: &CableKey) -> bool {
        self.masks.remove(key).is_some()
    }
}

impl SideOverride for DisabledSideStore {
    fn is_side_disabled(&self, key: &CableKey, side: Direction) -> bool {
        self.mask(key) & side.mask_bit() != 0
    }
}
