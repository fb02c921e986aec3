//! Score repository: stored `DailyScoreRecord` rows.
//!
//! `daily_scores` deliberately carries no UNIQUE(user_id, day) constraint —
//! the legacy store had none, and duplicate rows are an observed drift
//! state the detector must be able to find. `replace_all` is the one
//! operation that guarantees a clean per-day history afterward.

use chrono::NaiveDate;
use rusqlite::{params, Row};

use super::{day_from_sql, day_to_sql, DbError, ScoreDb};
use crate::store::ScoreRepository;
use crate::types::{BonusDetail, DailyScoreRecord};

fn record_from_row(row: &Row) -> rusqlite::Result<(DailyScoreRecord, String)> {
    let day: String = row.get(2)?;
    let details: String = row.get(9)?;
    Ok((
        DailyScoreRecord {
            id: row.get(0)?,
            user_id: row.get(1)?,
            day: NaiveDate::default(), // patched by the caller after day parsing
            base_score: row.get(3)?,
            streak_score: row.get(4)?,
            bonus_score: row.get(5)?,
            total_score: row.get(6)?,
            current_streak: row.get(7)?,
            bonus_details: serde_json::from_str::<Vec<BonusDetail>>(&details)
                .unwrap_or_default(),
            updated_at: row.get(8)?,
        },
        day,
    ))
}

const SELECT_COLUMNS: &str = "id, user_id, day, base_score, streak_score, bonus_score, \
     total_score, current_streak, updated_at, bonus_details";

impl ScoreDb {
    fn collect_records(
        &self,
        sql: &str,
        params: impl rusqlite::Params,
    ) -> Result<Vec<DailyScoreRecord>, DbError> {
        let mut stmt = self.conn.prepare(sql)?;
        let mapped = stmt.query_map(params, record_from_row)?;

        let mut records = Vec::new();
        for row in mapped {
            let (mut record, day) = row?;
            record.day = day_from_sql(&day)?;
            records.push(record);
        }
        Ok(records)
    }

    fn insert_record(&self, record: &DailyScoreRecord) -> Result<(), DbError> {
        let details = serde_json::to_string(&record.bonus_details)
            .map_err(|e| DbError::Corrupt(format!("bonus details encode: {e}")))?;
        self.conn.execute(
            "INSERT INTO daily_scores
                 (id, user_id, day, base_score, streak_score, bonus_score,
                  total_score, current_streak, bonus_details, updated_at)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10)",
            params![
                record.id,
                record.user_id,
                day_to_sql(record.day),
                record.base_score,
                record.streak_score,
                record.bonus_score,
                record.total_score,
                record.current_streak,
                details,
                record.updated_at,
            ],
        )?;
        Ok(())
    }
}

impl ScoreRepository for ScoreDb {
    fn get(&self, user_id: &str, day: NaiveDate) -> Result<Option<DailyScoreRecord>, DbError> {
        let records = self.collect_records(
            &format!(
                "SELECT {SELECT_COLUMNS} FROM daily_scores
                 WHERE user_id = ?1 AND day = ?2
                 ORDER BY updated_at DESC LIMIT 1"
            ),
            params![user_id, day_to_sql(day)],
        )?;
        Ok(records.into_iter().next())
    }

    fn list_range(
        &self,
        user_id: &str,
        from: NaiveDate,
        to: NaiveDate,
    ) -> Result<Vec<DailyScoreRecord>, DbError> {
        self.collect_records(
            &format!(
                "SELECT {SELECT_COLUMNS} FROM daily_scores
                 WHERE user_id = ?1 AND day >= ?2 AND day <= ?3
                 ORDER BY day ASC"
            ),
            params![user_id, day_to_sql(from), day_to_sql(to)],
        )
    }

    fn list_all(&self, user_id: &str) -> Result<Vec<DailyScoreRecord>, DbError> {
        self.collect_records(
            &format!(
                "SELECT {SELECT_COLUMNS} FROM daily_scores
                 WHERE user_id = ?1
                 ORDER BY day ASC"
            ),
            params![user_id],
        )
    }

    fn upsert(&self, record: &DailyScoreRecord) -> Result<(), DbError> {
        let details = serde_json::to_string(&record.bonus_details)
            .map_err(|e| DbError::Corrupt(format!("bonus details encode: {e}")))?;
        let changed = self.conn.execute(
            "UPDATE daily_scores
             SET base_score = ?3, streak_score = ?4, bonus_score = ?5,
                 total_score = ?6, current_streak = ?7, bonus_details = ?8,
                 updated_at = ?9
             WHERE user_id = ?1 AND day = ?2",
            params![
                record.user_id,
                day_to_sql(record.day),
                record.base_score,
                record.streak_score,
                record.bonus_score,
                record.total_score,
                record.current_streak,
                details,
                record.updated_at,
            ],
        )?;
        if changed == 0 {
            self.insert_record(record)?;
        }
        Ok(())
    }

    fn delete_range(
        &self,
        user_id: &str,
        from: NaiveDate,
        to: NaiveDate,
    ) -> Result<usize, DbError> {
        let deleted = self.conn.execute(
            "DELETE FROM daily_scores WHERE user_id = ?1 AND day >= ?2 AND day <= ?3",
            params![user_id, day_to_sql(from), day_to_sql(to)],
        )?;
        Ok(deleted)
    }

    fn replace_all(&self, user_id: &str, records: &[DailyScoreRecord]) -> Result<(), DbError> {
        // Delete-all-insert-all inside one transaction: a crash mid-repair
        // leaves the previous history intact, never a partial mix.
        self.with_transaction(|db| {
            db.conn.execute(
                "DELETE FROM daily_scores WHERE user_id = ?1",
                params![user_id],
            )?;
            for record in records {
                db.insert_record(record)?;
            }
            Ok(())
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::test_utils::{d, test_db};
    use crate::types::BonusDetail;

    fn record(user: &str, day: NaiveDate, streak: i64, total: i64) -> DailyScoreRecord {
        DailyScoreRecord {
            id: DailyScoreRecord::record_id(user, day),
            user_id: user.to_string(),
            day,
            base_score: 1,
            streak_score: if streak > 1 { 1 } else { 0 },
            bonus_score: total - 1 - if streak > 1 { 1 } else { 0 },
            total_score: total,
            current_streak: streak,
            bonus_details: Vec::new(),
            updated_at: chrono::Utc::now().to_rfc3339(),
        }
    }

    #[test]
    fn upsert_then_get_round_trip() {
        let db = test_db();
        let mut rec = record("u1", d(2025, 1, 3), 3, 4);
        rec.bonus_details = vec![BonusDetail {
            label: "三天".to_string(),
            amount: 2,
        }];
        db.upsert(&rec).expect("upsert");

        let got = db.get("u1", d(2025, 1, 3)).expect("get").expect("present");
        assert_eq!(got.total_score, 4);
        assert_eq!(got.current_streak, 3);
        assert_eq!(got.bonus_details.len(), 1);
        assert_eq!(got.bonus_details[0].label, "三天");
    }

    #[test]
    fn upsert_updates_in_place() {
        let db = test_db();
        db.upsert(&record("u1", d(2025, 1, 1), 1, 1)).expect("insert");
        db.upsert(&record("u1", d(2025, 1, 1), 2, 2)).expect("update");

        let all = db.list_all("u1").expect("list");
        assert_eq!(all.len(), 1, "upsert must not duplicate the day");
        assert_eq!(all[0].current_streak, 2);
    }

    #[test]
    fn list_range_is_inclusive_and_ordered() {
        let db = test_db();
        for day in [d(2025, 1, 1), d(2025, 1, 2), d(2025, 1, 5)] {
            db.upsert(&record("u1", day, 1, 1)).expect("upsert");
        }

        let rows = db
            .list_range("u1", d(2025, 1, 2), d(2025, 1, 5))
            .expect("range");
        let days: Vec<NaiveDate> = rows.iter().map(|r| r.day).collect();
        assert_eq!(days, vec![d(2025, 1, 2), d(2025, 1, 5)]);
    }

    #[test]
    fn delete_range_counts_rows() {
        let db = test_db();
        for day in [d(2025, 1, 1), d(2025, 1, 2), d(2025, 1, 3)] {
            db.upsert(&record("u2", day, 1, 1)).expect("upsert");
        }
        let deleted = db
            .delete_range("u2", d(2025, 1, 1), d(2025, 1, 2))
            .expect("delete");
        assert_eq!(deleted, 2);
        assert_eq!(db.list_all("u2").expect("list").len(), 1);
    }

    #[test]
    fn replace_all_swaps_entire_history() {
        let db = test_db();
        db.upsert(&record("u1", d(2025, 1, 1), 1, 1)).expect("old row");
        db.upsert(&record("u1", d(2025, 2, 1), 1, 1)).expect("old row");
        // Another user's rows must be untouched.
        db.upsert(&record("u2", d(2025, 1, 1), 1, 1)).expect("other");

        let fresh = vec![record("u1", d(2025, 3, 1), 1, 1)];
        db.replace_all("u1", &fresh).expect("replace");

        let all = db.list_all("u1").expect("list");
        assert_eq!(all.len(), 1);
        assert_eq!(all[0].day, d(2025, 3, 1));
        assert_eq!(db.list_all("u2").expect("list").len(), 1);
    }

    #[test]
    fn replace_all_collapses_duplicates() {
        let db = test_db();
        // Simulate drift: two rows for the same day, inserted directly.
        let rec = record("u1", d(2025, 1, 1), 1, 1);
        db.insert_record(&rec).expect("first");
        let mut dup = rec.clone();
        dup.id = "dup-row".to_string();
        db.insert_record(&dup).expect("second");
        assert_eq!(db.list_all("u1").expect("list").len(), 2);

        db.replace_all("u1", std::slice::from_ref(&rec)).expect("replace");
        assert_eq!(db.list_all("u1").expect("list").len(), 1);
    }
}
