//! Ledger reader queries.
//!
//! Rows are filtered through the validity module in Rust rather than with
//! inline SQL heuristics, so the countability rules live in exactly one
//! place regardless of caller.

use std::collections::BTreeMap;

use chrono::NaiveDate;
use rusqlite::params;

use super::{day_from_sql, day_to_sql, DbError, ScoreDb};
use crate::store::LedgerReader;
use crate::types::{CountableDay, LedgerEntry};
use crate::validity::{self, ValidityPolicy};

impl ScoreDb {
    /// Insert one ledger entry. The engine treats the ledger as append-only;
    /// this exists for ingestion tooling and tests.
    pub fn insert_entry(&self, entry: &LedgerEntry) -> Result<(), DbError> {
        self.conn.execute(
            "INSERT INTO ledger_entries (id, user_id, day, amount, kind, note, voided)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7)",
            params![
                entry.id,
                entry.user_id,
                day_to_sql(entry.day),
                entry.amount,
                entry.kind,
                entry.note,
                entry.voided as i64,
            ],
        )?;
        Ok(())
    }

    /// Mark an entry voided. Voided entries never count toward scoring.
    pub fn void_entry(&self, entry_id: &str) -> Result<bool, DbError> {
        let changed = self.conn.execute(
            "UPDATE ledger_entries SET voided = 1 WHERE id = ?1",
            params![entry_id],
        )?;
        Ok(changed > 0)
    }

    fn load_entries(
        &self,
        user_id: &str,
        floor: Option<NaiveDate>,
    ) -> Result<Vec<LedgerEntry>, DbError> {
        let floor_sql = floor.map(day_to_sql).unwrap_or_default();
        let mut stmt = self.conn.prepare(
            "SELECT id, user_id, day, amount, kind, note, voided
             FROM ledger_entries
             WHERE user_id = ?1 AND (?2 = '' OR day >= ?2)
             ORDER BY day ASC",
        )?;
        let mapped = stmt.query_map(params![user_id, floor_sql], |row| {
            Ok((
                row.get::<_, String>(0)?,
                row.get::<_, String>(1)?,
                row.get::<_, String>(2)?,
                row.get::<_, f64>(3)?,
                row.get::<_, String>(4)?,
                row.get::<_, Option<String>>(5)?,
                row.get::<_, i64>(6)?,
            ))
        })?;

        let mut entries = Vec::new();
        for row in mapped {
            let (id, user_id, day, amount, kind, note, voided) = row?;
            entries.push(LedgerEntry {
                id,
                user_id,
                day: day_from_sql(&day)?,
                amount,
                kind,
                note,
                voided: voided != 0,
            });
        }
        Ok(entries)
    }
}

impl LedgerReader for ScoreDb {
    fn list_countable_days(
        &self,
        user_id: &str,
        policy: &ValidityPolicy,
        floor: Option<NaiveDate>,
    ) -> Result<Vec<CountableDay>, DbError> {
        let entries = self.load_entries(user_id, floor)?;

        // Multiple entries on one calendar day collapse to a single day.
        let mut days: BTreeMap<NaiveDate, bool> = BTreeMap::new();
        for entry in entries
            .iter()
            .filter(|e| validity::is_countable(e, policy))
        {
            let has_amount = days.entry(entry.day).or_insert(false);
            *has_amount = *has_amount || entry.amount != 0.0;
        }

        Ok(days
            .into_iter()
            .map(|(day, has_amount)| CountableDay { day, has_amount })
            .collect())
    }

    fn list_active_users(&self, floor: NaiveDate) -> Result<Vec<String>, DbError> {
        let mut stmt = self.conn.prepare(
            "SELECT DISTINCT user_id FROM ledger_entries
             WHERE voided = 0 AND day >= ?1
             ORDER BY user_id ASC",
        )?;
        let mapped = stmt.query_map(params![day_to_sql(floor)], |row| row.get::<_, String>(0))?;

        let mut users = Vec::new();
        for row in mapped {
            users.push(row?);
        }
        Ok(users)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::test_utils::{d, seed_entry, test_db};
    use crate::validity::CheckinPolicy;

    fn policy() -> ValidityPolicy {
        ValidityPolicy {
            checkin: CheckinPolicy::IncludeCheckins,
            synthetic_marker: "#synthetic".to_string(),
        }
    }

    #[test]
    fn same_day_entries_collapse() {
        let db = test_db();
        seed_entry(&db, "u1", d(2025, 1, 1), 10.0);
        seed_entry(&db, "u1", d(2025, 1, 1), -3.5);
        seed_entry(&db, "u1", d(2025, 1, 2), 7.0);

        let days = db.list_countable_days_all("u1", &policy()).expect("list");
        assert_eq!(days.len(), 2);
        assert_eq!(days[0].day, d(2025, 1, 1));
        assert!(days[0].has_amount);
    }

    #[test]
    fn voided_and_synthetic_are_noise() {
        let db = test_db();
        seed_entry(&db, "u1", d(2025, 1, 1), 10.0);

        let mut voided = LedgerEntry::new("u1", d(2025, 1, 2), 5.0, "expense");
        voided.voided = true;
        db.insert_entry(&voided).expect("insert voided");

        let mut synthetic = LedgerEntry::new("u1", d(2025, 1, 3), 5.0, "expense");
        synthetic.note = Some("#synthetic seed".to_string());
        db.insert_entry(&synthetic).expect("insert synthetic");

        let days = db.list_countable_days_all("u1", &policy()).expect("list");
        assert_eq!(days.len(), 1);
        assert_eq!(days[0].day, d(2025, 1, 1));
    }

    #[test]
    fn checkin_day_has_no_amount() {
        let db = test_db();
        db.insert_entry(&LedgerEntry::new("u1", d(2025, 1, 1), 0.0, "checkin"))
            .expect("insert checkin");

        let days = db.list_countable_days_all("u1", &policy()).expect("list");
        assert_eq!(days.len(), 1);
        assert!(!days[0].has_amount);

        // Excluding check-ins drops the day entirely.
        let exclude = ValidityPolicy {
            checkin: CheckinPolicy::ExcludeCheckins,
            synthetic_marker: String::new(),
        };
        let days = db.list_countable_days_all("u1", &exclude).expect("list");
        assert!(days.is_empty());
    }

    #[test]
    fn floor_limits_the_window() {
        let db = test_db();
        seed_entry(&db, "u1", d(2025, 1, 1), 1.0);
        seed_entry(&db, "u1", d(2025, 2, 1), 1.0);

        let days = db
            .list_countable_days("u1", &policy(), Some(d(2025, 1, 15)))
            .expect("list");
        assert_eq!(days.len(), 1);
        assert_eq!(days[0].day, d(2025, 2, 1));
    }

    #[test]
    fn active_users_are_distinct_and_windowed() {
        let db = test_db();
        seed_entry(&db, "u1", d(2025, 1, 10), 1.0);
        seed_entry(&db, "u1", d(2025, 1, 11), 1.0);
        seed_entry(&db, "u2", d(2024, 6, 1), 1.0);

        let users = db.list_active_users(d(2025, 1, 1)).expect("users");
        assert_eq!(users, vec!["u1".to_string()]);
    }

    #[test]
    fn void_entry_removes_day() {
        let db = test_db();
        let entry = LedgerEntry::new("u1", d(2025, 1, 1), 9.0, "expense");
        db.insert_entry(&entry).expect("insert");
        assert!(db.void_entry(&entry.id).expect("void"));

        let days = db.list_countable_days_all("u1", &policy()).expect("list");
        assert!(days.is_empty());
    }
}
