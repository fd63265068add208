//! Domain records: items, collection entries, desired state and correction sets

pub mod corrections;
pub mod desired;
pub mod entry;
pub mod item;

pub use corrections::{AddCorrection, CorrectionSet, MoveCorrection, RemoveCorrection};
pub use desired::{CollectionRole, CollectionTarget, DesiredState};
pub use entry::{CollectionEntry, Entry, Provenance};
pub use item::{Item, Membership, MembershipRecord, ValidityWindow};

/// Remote-assigned item identifier (video id)
pub type ItemId = String;

/// Remote collection identifier (playlist id)
pub type CollectionId = String;

/// Opaque remote identifier of one (item, position) pairing inside a collection
pub type EntryId = String;

/// Identifier of the source an item was published by (channel id)
pub type SourceId = String;
