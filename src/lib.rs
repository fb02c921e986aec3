//! dayscore — daily activity scoring and reconciliation engine.
//!
//! Converts a user's ledger history into daily score records (base +
//! streak + one-time milestone bonuses) and keeps stored rows honest:
//! the detector finds drift (missing rows, duplicates, implausible
//! streaks), reconciliation recomputes expected state from the ledger,
//! and repair atomically replaces stored history with the recomputed
//! truth. Score rows are derived state — the ledger is the only
//! authority, which is what makes delete-and-recompute repair safe.

pub mod db;
pub mod detector;
pub mod engine;
pub mod error;
mod migrations;
pub mod milestones;
pub mod reconcile;
pub mod repair;
pub mod score;
pub mod store;
pub mod streak;
pub mod types;
pub mod validity;

pub use db::ScoreDb;
pub use engine::Engine;
pub use error::EngineError;
pub use reconcile::Reconciliation;
pub use repair::repair_batch;
pub use types::{
    BatchRepairSummary, DailyScoreRecord, DetectionReport, EngineConfig, LedgerEntry,
    MilestoneRule, ReconciliationIssue, RepairOutcome,
};
pub use validity::CheckinPolicy;
