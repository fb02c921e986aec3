//! Store traits consumed by the engine.
//!
//! The engine holds no global state and opens no connections of its own:
//! whatever implements these traits is injected at construction time.
//! `crate::db::ScoreDb` implements all three over SQLite.

use chrono::NaiveDate;

use crate::db::DbError;
use crate::types::{CountableDay, DailyScoreRecord, MilestoneRule};
use crate::validity::ValidityPolicy;

/// Read-only view of the ledger: distinct countable days per user.
pub trait LedgerReader {
    /// Distinct countable days for one user, ascending, optionally limited
    /// to `floor..` for windowed scans.
    fn list_countable_days(
        &self,
        user_id: &str,
        policy: &ValidityPolicy,
        floor: Option<NaiveDate>,
    ) -> Result<Vec<CountableDay>, DbError>;

    /// Full-history variant — streak state depends on the complete past,
    /// so reconciliation never applies a date floor.
    fn list_countable_days_all(
        &self,
        user_id: &str,
        policy: &ValidityPolicy,
    ) -> Result<Vec<CountableDay>, DbError> {
        self.list_countable_days(user_id, policy, None)
    }

    /// Users with any non-voided ledger activity on or after `floor`.
    fn list_active_users(&self, floor: NaiveDate) -> Result<Vec<String>, DbError>;
}

/// Read/write access to stored score rows, keyed by (user, day).
pub trait ScoreRepository {
    fn get(&self, user_id: &str, day: NaiveDate) -> Result<Option<DailyScoreRecord>, DbError>;

    fn list_range(
        &self,
        user_id: &str,
        from: NaiveDate,
        to: NaiveDate,
    ) -> Result<Vec<DailyScoreRecord>, DbError>;

    fn list_all(&self, user_id: &str) -> Result<Vec<DailyScoreRecord>, DbError>;

    /// Insert or update by (user, day). Updating a duplicated day touches
    /// every duplicate row; only repair removes the extras.
    fn upsert(&self, record: &DailyScoreRecord) -> Result<(), DbError>;

    fn delete_range(&self, user_id: &str, from: NaiveDate, to: NaiveDate)
        -> Result<usize, DbError>;

    /// Atomically replace the user's entire stored history with `records`.
    /// A crash mid-repair must never leave a partially-replaced history.
    fn replace_all(&self, user_id: &str, records: &[DailyScoreRecord]) -> Result<(), DbError>;
}

/// Source of milestone rules. Expected to change rarely; the engine caches
/// the table per invocation.
pub trait MilestoneSource {
    fn list_rules(&self) -> Result<Vec<MilestoneRule>, DbError>;
}

/// Everything the engine needs from one store handle.
pub trait Store: LedgerReader + ScoreRepository + MilestoneSource {}
impl<T: LedgerReader + ScoreRepository + MilestoneSource> Store for T {}
