//! Milestone rule source.

use rusqlite::params;

use super::{DbError, ScoreDb};
use crate::store::MilestoneSource;
use crate::types::MilestoneRule;

impl ScoreDb {
    /// Replace the configured rule set. Admin-side operation; the engine
    /// itself only reads rules.
    pub fn set_milestone_rules(&self, rules: &[MilestoneRule]) -> Result<(), DbError> {
        self.with_transaction(|db| {
            db.conn.execute("DELETE FROM milestone_rules", [])?;
            for (i, rule) in rules.iter().enumerate() {
                db.conn.execute(
                    "INSERT INTO milestone_rules (id, streak_days, bonus_score, label)
                     VALUES (?1, ?2, ?3, ?4)",
                    params![
                        format!("ms-{:03}", i),
                        rule.streak_days,
                        rule.bonus_score,
                        rule.label,
                    ],
                )?;
            }
            Ok(())
        })
    }
}

impl MilestoneSource for ScoreDb {
    fn list_rules(&self) -> Result<Vec<MilestoneRule>, DbError> {
        let mut stmt = self.conn.prepare(
            "SELECT streak_days, bonus_score, label
             FROM milestone_rules
             ORDER BY streak_days ASC",
        )?;
        let mapped = stmt.query_map([], |row| {
            Ok(MilestoneRule {
                streak_days: row.get(0)?,
                bonus_score: row.get(1)?,
                label: row.get(2)?,
            })
        })?;

        let mut rules = Vec::new();
        for row in mapped {
            rules.push(row?);
        }
        Ok(rules)
    }
}
