//! Pure scheduling logic shared by registration and the scheduling side.
//!
//! Every time comparison goes through [`interval::overlaps`]; nothing in
//! here touches storage.

pub mod alternatives;
pub mod conflict;
pub mod interval;

pub use alternatives::{DayPart, SlotRequest, SlotSuggestion, suggest_alternatives};
pub use conflict::{Conflict, ConflictKind, Placement, conflicts_against, detect_conflicts};
pub use interval::{Meeting, overlap_window, overlapping_pairs, overlaps};
