//! Shared type definitions for the scoring and reconciliation engine.

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// One atomic activity record from the ledger.
///
/// The ledger is append-only from the engine's perspective: entries are
/// created and voided elsewhere, the engine only reads them.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LedgerEntry {
    pub id: String,
    pub user_id: String,
    pub day: NaiveDate,
    pub amount: f64,
    pub kind: String,
    pub note: Option<String>,
    pub voided: bool,
}

impl LedgerEntry {
    /// Build a fresh entry with a generated id.
    pub fn new(user_id: &str, day: NaiveDate, amount: f64, kind: &str) -> Self {
        Self {
            id: Uuid::new_v4().to_string(),
            user_id: user_id.to_string(),
            day,
            amount,
            kind: kind.to_string(),
            note: None,
            voided: false,
        }
    }
}

/// One milestone bonus awarded on a specific day.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BonusDetail {
    pub label: String,
    pub amount: i64,
}

/// One row per (user, day) in the score store.
///
/// Derived state: always rebuildable from ledger history plus the milestone
/// table, which is what makes delete-and-recompute repair safe. Exactly one
/// row may exist per (user, day) — duplicates are a detectable error state.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DailyScoreRecord {
    pub id: String,
    pub user_id: String,
    pub day: NaiveDate,
    pub base_score: i64,
    pub streak_score: i64,
    pub bonus_score: i64,
    /// Invariant: always base + streak + bonus.
    pub total_score: i64,
    /// Consecutive countable-day count ending at `day`.
    pub current_streak: i64,
    /// Bonuses awarded exactly on this day, in rule order.
    pub bonus_details: Vec<BonusDetail>,
    pub updated_at: String,
}

impl DailyScoreRecord {
    /// Deterministic row id so recomputing a user's history is stable.
    pub fn record_id(user_id: &str, day: NaiveDate) -> String {
        format!("{}:{}", user_id, day.format("%Y-%m-%d"))
    }

    /// True when the stored totals hold together.
    pub fn totals_consistent(&self) -> bool {
        self.total_score == self.base_score + self.streak_score + self.bonus_score
    }
}

/// Immutable milestone configuration: exact-match streak threshold → bonus.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MilestoneRule {
    pub streak_days: i64,
    pub bonus_score: i64,
    pub label: String,
}

/// A distinct calendar day with at least one countable entry.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CountableDay {
    pub day: NaiveDate,
    /// True when at least one countable entry that day carried a non-zero amount.
    pub has_amount: bool,
}

/// Classification of a divergence between computed-expected and stored state.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum IssueKind {
    MissingScore,
    DuplicateScore,
    CalculationMismatch,
    ImplausibleStreak,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum IssueSeverity {
    Low,
    Medium,
    High,
}

/// One detected divergence. Ephemeral — never persisted.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ReconciliationIssue {
    pub user_id: String,
    pub day: Option<NaiveDate>,
    pub kind: IssueKind,
    pub severity: IssueSeverity,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub observed: Option<serde_json::Value>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub expected: Option<serde_json::Value>,
}

/// Report from one detector pass over the recent window.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DetectionReport {
    pub missing: Vec<ReconciliationIssue>,
    pub duplicates: Vec<ReconciliationIssue>,
    pub implausible: Vec<ReconciliationIssue>,
    pub scanned_users: usize,
    pub window_days: i64,
    pub scanned_at: String,
}

impl DetectionReport {
    /// Distinct user ids that need repair (missing or duplicate rows).
    /// Implausible streaks are review-only and excluded on purpose.
    pub fn users_needing_repair(&self) -> Vec<String> {
        let mut users: Vec<String> = self
            .missing
            .iter()
            .chain(self.duplicates.iter())
            .map(|i| i.user_id.clone())
            .collect();
        users.sort();
        users.dedup();
        users
    }
}

/// Result of repairing a single user.
#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RepairOutcome {
    /// Rows that existed in expected but not in the store.
    pub created: usize,
    /// Rows whose stored values diverged from expected.
    pub corrected: usize,
    /// Orphan rows and extra duplicate rows deleted.
    pub removed: usize,
}

impl RepairOutcome {
    pub fn changed(&self) -> bool {
        self.created + self.corrected + self.removed > 0
    }
}

/// One per-user failure captured during a batch repair.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RepairFailure {
    pub user_id: String,
    pub error: String,
}

/// Aggregate summary of a batch repair run.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BatchRepairSummary {
    /// Users whose stored history changed.
    pub repaired: usize,
    /// Users already correct (repair was a no-op).
    pub unchanged: usize,
    /// Users skipped because the deadline expired before they were scheduled.
    pub skipped: usize,
    pub failed: Vec<RepairFailure>,
}

/// Engine configuration. One instance is shared by the forward-scoring and
/// repair paths so the validity policy cannot diverge between them.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct EngineConfig {
    /// Entries whose note contains this marker never count (test data).
    pub synthetic_note_marker: String,
    /// Whether zero-amount check-in entries count toward scoring.
    pub checkin_policy: crate::validity::CheckinPolicy,
    /// How far back the issue detector scans.
    pub detection_window_days: i64,
    /// Stored streaks above this are flagged for human review.
    pub implausible_streak_threshold: i64,
    /// Worker pool size for batch repair.
    pub batch_concurrency: usize,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            synthetic_note_marker: "#synthetic".to_string(),
            checkin_policy: crate::validity::CheckinPolicy::IncludeCheckins,
            detection_window_days: 30,
            implausible_streak_threshold: 1000,
            batch_concurrency: 4,
        }
    }
}

impl EngineConfig {
    /// The validity policy both scoring paths must share.
    pub fn validity_policy(&self) -> crate::validity::ValidityPolicy {
        crate::validity::ValidityPolicy {
            checkin: self.checkin_policy,
            synthetic_marker: self.synthetic_note_marker.clone(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn issue_wire_casing_is_camel_case() {
        let issue = ReconciliationIssue {
            user_id: "u1".to_string(),
            day: NaiveDate::from_ymd_opt(2025, 1, 1),
            kind: IssueKind::MissingScore,
            severity: IssueSeverity::High,
            observed: None,
            expected: None,
        };
        let json = serde_json::to_value(&issue).expect("encode");
        assert_eq!(json["kind"], "missingScore");
        assert_eq!(json["severity"], "high");
        assert_eq!(json["userId"], "u1");
    }
}
