//! Milestone table: exact-match streak bonuses.
//!
//! Lookup is by exact equality of the streak value to `streak_days`, not
//! "streak >= threshold". A user whose history skips a threshold day (first
//! record lands on streak 8 with no streak-7 day) never receives that bonus
//! retroactively. Load-bearing behavior — changing it would silently alter
//! historical totals.

use crate::types::{BonusDetail, MilestoneRule};

/// Static ordered rule list, cached per engine invocation.
#[derive(Debug, Clone)]
pub struct MilestoneTable {
    rules: Vec<MilestoneRule>,
}

impl MilestoneTable {
    pub fn new(mut rules: Vec<MilestoneRule>) -> Self {
        rules.sort_by_key(|r| r.streak_days);
        Self { rules }
    }

    /// Sum of bonuses for rules matching this exact streak value, plus the
    /// matched labels in rule order. No state, safe to call repeatedly.
    pub fn bonus_for(&self, streak: i64) -> (i64, Vec<BonusDetail>) {
        let mut total = 0;
        let mut details = Vec::new();
        for rule in self.rules.iter().filter(|r| r.streak_days == streak) {
            total += rule.bonus_score;
            details.push(BonusDetail {
                label: rule.label.clone(),
                amount: rule.bonus_score,
            });
        }
        (total, details)
    }

    pub fn rules(&self) -> &[MilestoneRule] {
        &self.rules
    }
}
