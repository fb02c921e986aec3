//! Validity filter: classifies a raw ledger entry as countable or noise.
//!
//! All call sites go through [`is_countable`] with an explicit policy —
//! never inline note-matching heuristics at the point of use. The forward
//! scoring path and the repair path share one policy instance (built from
//! `EngineConfig`) so they cannot drift apart.

use serde::{Deserialize, Serialize};

use crate::types::LedgerEntry;

/// Whether a pure check-in entry (no monetary amount) counts toward scoring.
///
/// The engine standardizes on `IncludeCheckins`: a zero-amount check-in is
/// still a deliberate daily action and keeps the streak alive.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum CheckinPolicy {
    IncludeCheckins,
    ExcludeCheckins,
}

/// The full set of validity rules applied to one entry.
#[derive(Debug, Clone)]
pub struct ValidityPolicy {
    pub checkin: CheckinPolicy,
    /// Entries whose note contains this marker are synthetic test data.
    /// An empty marker disables the rule.
    pub synthetic_marker: String,
}

/// Rules, applied in order: voided never counts; synthetic test data never
/// counts; a zero-amount check-in counts only under `IncludeCheckins`.
pub fn is_countable(entry: &LedgerEntry, policy: &ValidityPolicy) -> bool {
    if entry.voided {
        return false;
    }

    if !policy.synthetic_marker.is_empty() {
        if let Some(note) = &entry.note {
            if note.contains(&policy.synthetic_marker) {
                return false;
            }
        }
    }

    if entry.amount == 0.0 {
        return policy.checkin == CheckinPolicy::IncludeCheckins;
    }

    true
}
