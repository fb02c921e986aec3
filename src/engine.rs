//! Engine entry point: ties the filter, streak calculator, milestone table,
//! and composer to an injected store.

use chrono::NaiveDate;

use crate::error::EngineError;
use crate::milestones::MilestoneTable;
use crate::score::compose_record;
use crate::store::Store;
use crate::streak::streak_values;
use crate::types::{DailyScoreRecord, EngineConfig};

/// The scoring & reconciliation engine for one store handle.
///
/// Holds no long-lived state beyond its configuration; every operation is
/// a front-to-back sequence of load → compute → (diff) → write. Callers
/// must route a given user's work to at most one in-flight operation at a
/// time — the engine does not lock per user.
pub struct Engine<S> {
    store: S,
    config: EngineConfig,
}

impl<S: Store> Engine<S> {
    pub fn new(store: S, config: EngineConfig) -> Self {
        Self { store, config }
    }

    pub fn config(&self) -> &EngineConfig {
        &self.config
    }

    /// Borrow the injected store, mainly for callers that need direct
    /// repository access around engine operations.
    pub fn store(&self) -> &S {
        &self.store
    }

    pub(crate) fn validate_user_id(user_id: &str) -> Result<(), EngineError> {
        if user_id.trim().is_empty() {
            return Err(EngineError::Validation("empty user id".to_string()));
        }
        Ok(())
    }

    /// Cache the milestone table for one invocation.
    pub(crate) fn milestone_table(&self) -> Result<MilestoneTable, EngineError> {
        Ok(MilestoneTable::new(self.store.list_rules()?))
    }

    /// Recompute the full expected score sequence for one user from raw
    /// ledger history. Pure read: the single source of truth shared by the
    /// forward-scoring path, reconciliation, and repair.
    pub(crate) fn expected_records(
        &self,
        user_id: &str,
    ) -> Result<Vec<DailyScoreRecord>, EngineError> {
        Self::validate_user_id(user_id)?;
        let policy = self.config.validity_policy();

        // Full history: streak state depends on the complete past.
        let countable = self.store.list_countable_days_all(user_id, &policy)?;
        if countable.is_empty() {
            // Zero history is not an error.
            return Ok(Vec::new());
        }

        let days: Vec<NaiveDate> = countable.iter().map(|c| c.day).collect();
        let table = self.milestone_table()?;

        Ok(streak_values(&days)
            .into_iter()
            .map(|(day, streak)| compose_record(user_id, day, true, streak, &table))
            .collect())
    }

    /// Forward-scoring path: after new ledger activity, recompute and store
    /// the record for one day. Returns `None` when the day has no countable
    /// entry (which is not the same as a zero score).
    ///
    /// A backdated entry that fills a gap changes the streaks of every
    /// later day, so the whole expected suffix from `day` onward is
    /// upserted — not just the scored day.
    pub fn score_user_day(
        &self,
        user_id: &str,
        day: NaiveDate,
    ) -> Result<Option<DailyScoreRecord>, EngineError> {
        let expected = self.expected_records(user_id)?;
        let Some(pos) = expected.iter().position(|r| r.day == day) else {
            return Ok(None);
        };

        for record in &expected[pos..] {
            self.store.upsert(record)?;
        }

        let record = expected[pos].clone();
        log::debug!(
            "scored {} {}: total={} streak={} ({} later days refreshed)",
            user_id,
            day,
            record.total_score,
            record.current_streak,
            expected.len() - pos - 1
        );
        Ok(Some(record))
    }
}
