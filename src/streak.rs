//! Streak calculator: consecutive countable-day counts.
//!
//! Works on whole calendar days only. Date arithmetic goes through
//! `NaiveDate::signed_duration_since(..).num_days()` — never elapsed
//! wall-clock hours — so boundaries can't produce off-by-one streaks.
//!
//! The calculator only emits values for days that actually have entries.
//! "No entry on day X" and "streak 0 on day X" are different statements;
//! callers must not read an absent day as a zero.

use chrono::NaiveDate;

/// Compute the streak value as of each day in `days`.
///
/// `days` must be the distinct countable days for one user, sorted
/// ascending (the ledger reader produces exactly that). The first day is
/// streak 1; each day exactly one day after its predecessor extends the
/// streak; any larger gap resets to 1 — never 0, the day itself counts.
pub fn streak_values(days: &[NaiveDate]) -> Vec<(NaiveDate, i64)> {
    let mut out = Vec::with_capacity(days.len());
    let mut streak: i64 = 0;
    let mut prev: Option<NaiveDate> = None;

    for &day in days {
        streak = match prev {
            Some(p) if day.signed_duration_since(p).num_days() == 1 => streak + 1,
            _ => 1,
        };
        out.push((day, streak));
        prev = Some(day);
    }

    out
}
