//! Change-detection checksum over a reminder's syncable fields.
//!
//! Not a security primitive: collisions only cause a missed update.

use crate::model::{Due, ReminderItem};

/// ASCII unit separator; does not occur in hand-written text.
const FIELD_SEPARATOR: char = '\u{1f}';
const NULL_DUE: &str = "null";

const FNV_OFFSET_BASIS: u64 = 0xcbf29ce484222325;
const FNV_PRIME: u64 = 0x100000001b3;

/// Checksum of a (title, due, completed) triple.
pub fn checksum(title: &str, due: Option<&Due>, completed: bool) -> String {
    let due = due.map(Due::to_iso);
    let canonical = format!(
        "{}{sep}{}{sep}{}",
        title.trim(),
        due.as_deref().unwrap_or(NULL_DUE),
        completed,
        sep = FIELD_SEPARATOR
    );
    fnv1a(&canonical)
}

/// Checksum of a reminder in its current state.
pub fn item_checksum(item: &ReminderItem) -> String {
    checksum(&item.title, item.due.as_ref(), item.completed)
}

fn fnv1a(input: &str) -> String {
    let mut hash = FNV_OFFSET_BASIS;
    for byte in input.as_bytes() {
        hash ^= *byte as u64;
        hash = hash.wrapping_mul(FNV_PRIME);
    }
    format!("{:016x}", hash)
}
