//! Issue detector: read-only scan of a bounded recent window across users.
//!
//! Three independent checks — missing score rows, duplicate rows, and
//! implausible streak values. No side effects; safe to run frequently.

use std::collections::BTreeMap;

use chrono::{NaiveDate, Utc};
use serde_json::json;

use crate::engine::Engine;
use crate::error::EngineError;
use crate::store::Store;
use crate::types::{DetectionReport, IssueKind, IssueSeverity, ReconciliationIssue};

impl<S: Store> Engine<S> {
    /// Scan the configured window ending today.
    pub fn detect_issues(&self) -> Result<DetectionReport, EngineError> {
        self.detect_issues_ending(Utc::now().date_naive())
    }

    /// Scan the configured window ending at `today` (injected for tests and
    /// backdated sweeps).
    pub fn detect_issues_ending(&self, today: NaiveDate) -> Result<DetectionReport, EngineError> {
        let window = self.config().detection_window_days;
        if window <= 0 {
            return Err(EngineError::Validation(format!(
                "detection window must be positive, got {window}"
            )));
        }
        let floor = today - chrono::Duration::days(window - 1);
        let policy = self.config().validity_policy();
        let threshold = self.config().implausible_streak_threshold;

        let users = self.store().list_active_users(floor)?;
        let mut report = DetectionReport {
            scanned_users: users.len(),
            window_days: window,
            scanned_at: Utc::now().to_rfc3339(),
            ..Default::default()
        };

        for user_id in &users {
            let countable = self
                .store()
                .list_countable_days(user_id, &policy, Some(floor))?;
            let stored = self.store().list_range(user_id, floor, today)?;

            let mut rows_per_day: BTreeMap<NaiveDate, usize> = BTreeMap::new();
            for record in &stored {
                *rows_per_day.entry(record.day).or_insert(0) += 1;
            }

            for countable_day in &countable {
                if countable_day.day > today {
                    continue;
                }
                if !rows_per_day.contains_key(&countable_day.day) {
                    report.missing.push(ReconciliationIssue {
                        user_id: user_id.clone(),
                        day: Some(countable_day.day),
                        kind: IssueKind::MissingScore,
                        severity: IssueSeverity::Medium,
                        observed: None,
                        expected: Some(json!({ "countableDay": countable_day.day })),
                    });
                }
            }

            for (day, count) in rows_per_day {
                if count > 1 {
                    // The data model disallows this outright.
                    report.duplicates.push(ReconciliationIssue {
                        user_id: user_id.clone(),
                        day: Some(day),
                        kind: IssueKind::DuplicateScore,
                        severity: IssueSeverity::High,
                        observed: Some(json!({ "rowCount": count })),
                        expected: Some(json!({ "rowCount": 1 })),
                    });
                }
            }

            for record in &stored {
                if record.current_streak > threshold {
                    // Flag for human review only: very long real streaks are
                    // legitimate, so this is never auto-repaired.
                    report.implausible.push(ReconciliationIssue {
                        user_id: user_id.clone(),
                        day: Some(record.day),
                        kind: IssueKind::ImplausibleStreak,
                        severity: IssueSeverity::Low,
                        observed: Some(json!({ "currentStreak": record.current_streak })),
                        expected: Some(json!({ "maxPlausible": threshold })),
                    });
                }
            }
        }

        log::info!(
            "detector: {} users scanned, {} missing, {} duplicate, {} implausible",
            report.scanned_users,
            report.missing.len(),
            report.duplicates.len(),
            report.implausible.len()
        );
        Ok(report)
    }
}
