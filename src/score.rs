//! Score composer: one (user, day, streak) → one `DailyScoreRecord`.

use chrono::{NaiveDate, Utc};

use crate::milestones::MilestoneTable;
use crate::types::DailyScoreRecord;

/// Compose the score record for one user-day.
///
/// `has_entry` is whether the day has at least one countable entry;
/// `current_streak` is the value from the streak calculator for that day.
/// `total_score = base + streak + bonus` holds by construction — the
/// debug assertion documents that a violation is a programming defect,
/// not a data anomaly.
pub fn compose_record(
    user_id: &str,
    day: NaiveDate,
    has_entry: bool,
    current_streak: i64,
    table: &MilestoneTable,
) -> DailyScoreRecord {
    let base_score = if has_entry { 1 } else { 0 };
    let streak_score = if has_entry && current_streak > 1 { 1 } else { 0 };
    let (bonus_score, bonus_details) = if has_entry {
        table.bonus_for(current_streak)
    } else {
        (0, Vec::new())
    };

    let record = DailyScoreRecord {
        id: DailyScoreRecord::record_id(user_id, day),
        user_id: user_id.to_string(),
        day,
        base_score,
        streak_score,
        bonus_score,
        total_score: base_score + streak_score + bonus_score,
        current_streak: if has_entry { current_streak } else { 0 },
        bonus_details,
        updated_at: Utc::now().to_rfc3339(),
    };
    debug_assert!(record.totals_consistent());
    record
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::MilestoneRule;

    fn d(y: i32, m: u32, day: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, day).unwrap()
    }

    fn table() -> MilestoneTable {
        MilestoneTable::new(vec![MilestoneRule {
            streak_days: 3,
            bonus_score: 2,
            label: "三天".to_string(),
        }])
    }

    #[test]
    fn first_day_scores_base_only() {
        let rec = compose_record("u1", d(2025, 1, 1), true, 1, &table());
        assert_eq!(rec.base_score, 1);
        assert_eq!(rec.streak_score, 0);
        assert_eq!(rec.bonus_score, 0);
        assert_eq!(rec.total_score, 1);
        assert_eq!(rec.current_streak, 1);
    }

    #[test]
    fn second_day_adds_streak_score() {
        let rec = compose_record("u1", d(2025, 1, 2), true, 2, &table());
        assert_eq!(rec.total_score, 2);
        assert!(rec.bonus_details.is_empty());
    }

    #[test]
    fn milestone_day_adds_bonus() {
        // Scenario A, day 3: 1 base + 1 streak + 2 bonus = 4.
        let rec = compose_record("u1", d(2025, 1, 3), true, 3, &table());
        assert_eq!(rec.base_score, 1);
        assert_eq!(rec.streak_score, 1);
        assert_eq!(rec.bonus_score, 2);
        assert_eq!(rec.total_score, 4);
        assert_eq!(rec.bonus_details.len(), 1);
        assert_eq!(rec.bonus_details[0].label, "三天");
        assert!(rec.totals_consistent());
    }

    #[test]
    fn day_without_entry_is_all_zero() {
        let rec = compose_record("u1", d(2025, 1, 4), false, 5, &table());
        assert_eq!(rec.total_score, 0);
        assert_eq!(rec.current_streak, 0);
        assert!(rec.bonus_details.is_empty());
    }

    #[test]
    fn record_id_is_deterministic() {
        let a = compose_record("u1", d(2025, 1, 3), true, 3, &table());
        let b = compose_record("u1", d(2025, 1, 3), true, 3, &table());
        assert_eq!(a.id, b.id);
        assert_eq!(a.id, "u1:2025-01-03");
    }
}
