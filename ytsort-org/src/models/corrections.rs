//! Correction sets produced by verification

use super::{EntryId, ItemId};
use serde::{Deserialize, Serialize};

/// Desired item absent from the live collection
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AddCorrection {
    pub item_id: ItemId,
    pub title: String,
    /// Index in the desired sequence
    pub position: usize,
}

/// Live entry that should not be there (surplus or extra occurrence)
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RemoveCorrection {
    pub item_id: ItemId,
    pub title: String,
    pub entry_id: EntryId,
    pub position: usize,
}

/// Item present live at the wrong index
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MoveCorrection {
    pub item_id: ItemId,
    pub title: String,
    pub entry_id: EntryId,
    pub desired_position: usize,
    pub live_position: usize,
}

/// Differences between a desired sequence and the live collection
///
/// An item never appears in both `add` and `remove`, and `moves` only
/// references items that are present live.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct CorrectionSet {
    pub add: Vec<AddCorrection>,
    pub remove: Vec<RemoveCorrection>,
    #[serde(rename = "move")]
    pub moves: Vec<MoveCorrection>,
}

impl CorrectionSet {
    pub fn total(&self) -> usize {
        self.add.len() + self.remove.len() + self.moves.len()
    }

    pub fn is_empty(&self) -> bool {
        self.total() == 0
    }
}
