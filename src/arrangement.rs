//! Arrangement validation
//!
//! A board wins when the six slot strings, joined in slot order, equal one of
//! the puzzle set's symmetry-equivalent arrangements.

use crate::board::Placed;
use crate::puzzle::PuzzleSet;

/// Concatenate a slot's fragments in stored (sort key) order.
/// Adjacent copies of the same fragment count once.
pub fn slot_string(slot: &[Placed]) -> String {
    let mut out = String::new();
    let mut previous: Option<&str> = None;
    for placed in slot {
        if previous != Some(placed.fragment.as_str()) {
            out.push_str(&placed.fragment);
        }
        previous = Some(placed.fragment.as_str());
    }
    out
}

/// Comma-joined slot strings, or `None` while any slot is empty
pub fn render<S: AsRef<[Placed]>>(slots: &[S]) -> Option<String> {
    let mut parts = Vec::with_capacity(slots.len());
    for slot in slots {
        let text = slot_string(slot.as_ref());
        if text.is_empty() {
            return None;
        }
        parts.push(text);
    }
    Some(parts.join(","))
}

/// True when the slots spell one of the set's valid arrangements
pub fn is_solved<S: AsRef<[Placed]>>(slots: &[S], set: &PuzzleSet) -> bool {
    let Some(current) = render(slots) else {
        return false;
    };
    tracing::debug!(set = set.index, current = %current, "Checking arrangement");
    set.valid_arrangements().iter().any(|a| *a == current)
}
