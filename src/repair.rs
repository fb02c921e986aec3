//! Repair executor: apply a reconciliation result to the store.
//!
//! Single-user repair atomically replaces the user's stored history with
//! the recomputed expected sequence. Batch repair fans single-user repairs
//! out over a fixed-size worker pool; each user is independent and
//! failure-isolated.

use std::collections::{HashSet, VecDeque};
use std::sync::{Arc, Mutex};

use crate::engine::Engine;
use crate::error::EngineError;
use crate::store::Store;
use crate::types::{
    BatchRepairSummary, EngineConfig, IssueKind, RepairFailure, RepairOutcome,
};

impl<S: Store> Engine<S> {
    /// Recompute the expected history for one user and atomically replace
    /// the stored rows with it. Idempotent: a second run against the same
    /// ledger state reports zero changes and writes nothing.
    pub fn repair_user(&self, user_id: &str) -> Result<RepairOutcome, EngineError> {
        let recon = self.reconcile_user(user_id)?;

        let created = recon
            .issues
            .iter()
            .filter(|i| i.kind == IssueKind::MissingScore)
            .count();
        let corrected = recon
            .issues
            .iter()
            .filter(|i| i.kind == IssueKind::CalculationMismatch)
            .count();
        let removed = recon.orphan_days.len() + recon.duplicate_rows;
        let outcome = RepairOutcome {
            created,
            corrected,
            removed,
        };

        if !outcome.changed() {
            log::debug!("repair {}: already correct", user_id);
            return Ok(outcome);
        }

        self.store().replace_all(user_id, &recon.expected)?;
        self.verify_repaired(user_id)?;

        log::info!(
            "repaired {}: created={} corrected={} removed={}",
            user_id,
            outcome.created,
            outcome.corrected,
            outcome.removed
        );
        Ok(outcome)
    }

    /// Post-repair check: one row per day, totals consistent. A failure
    /// here is a defect in the engine, not a data anomaly.
    fn verify_repaired(&self, user_id: &str) -> Result<(), EngineError> {
        let after = self.store().list_all(user_id)?;
        let mut seen = HashSet::new();
        for record in &after {
            if !seen.insert(record.day) {
                log::error!("repair {}: duplicate row for {} survived", user_id, record.day);
                return Err(EngineError::Invariant(format!(
                    "duplicate score row for {} on {} after repair",
                    user_id, record.day
                )));
            }
            if !record.totals_consistent() {
                log::error!("repair {}: inconsistent totals on {}", user_id, record.day);
                return Err(EngineError::Invariant(format!(
                    "total_score mismatch for {} on {}",
                    user_id, record.day
                )));
            }
        }
        Ok(())
    }
}

enum WorkerResult {
    Done(RepairOutcome),
    Failed(String, String),
}

/// Fan single-user repairs out over `config.batch_concurrency` workers.
///
/// Each worker opens its own store handle via `make_store` and drains a
/// shared queue, so no two workers ever touch the same user. One user's
/// failure is captured in the summary and never aborts the rest. When
/// `deadline` passes, workers stop taking new users; in-flight repairs
/// finish (atomicity is the store's job, not the scheduler's) and the
/// remainder is reported as skipped.
pub async fn repair_batch<S, F>(
    make_store: F,
    config: EngineConfig,
    user_ids: Vec<String>,
    deadline: Option<tokio::time::Instant>,
) -> BatchRepairSummary
where
    S: Store + Send + 'static,
    F: Fn() -> Result<S, EngineError> + Send + Sync + 'static,
{
    let total = user_ids.len();
    let concurrency = config.batch_concurrency.max(1).min(total.max(1));
    let queue = Arc::new(Mutex::new(VecDeque::from(user_ids)));
    let make_store = Arc::new(make_store);

    let mut handles = Vec::with_capacity(concurrency);
    for _ in 0..concurrency {
        let queue = Arc::clone(&queue);
        let make_store = Arc::clone(&make_store);
        let config = config.clone();

        handles.push(tokio::spawn(async move {
            let mut results = Vec::new();
            loop {
                if let Some(deadline) = deadline {
                    if tokio::time::Instant::now() >= deadline {
                        break;
                    }
                }

                let user_id = queue.lock().ok().and_then(|mut q| q.pop_front());
                let Some(user_id) = user_id else { break };

                let make_store = Arc::clone(&make_store);
                let config = config.clone();
                let task_user = user_id.clone();
                let joined = tokio::task::spawn_blocking(move || {
                    let store = make_store()?;
                    Engine::new(store, config).repair_user(&task_user)
                })
                .await;

                results.push(match joined {
                    Ok(Ok(outcome)) => WorkerResult::Done(outcome),
                    Ok(Err(e)) => WorkerResult::Failed(user_id, e.to_string()),
                    Err(e) => WorkerResult::Failed(user_id, format!("repair task panicked: {e}")),
                });
            }
            results
        }));
    }

    let mut summary = BatchRepairSummary::default();
    for handle in handles {
        let results = match handle.await {
            Ok(results) => results,
            Err(e) => {
                log::error!("batch repair worker panicked: {e}");
                continue;
            }
        };
        for result in results {
            match result {
                WorkerResult::Done(outcome) if outcome.changed() => summary.repaired += 1,
                WorkerResult::Done(_) => summary.unchanged += 1,
                WorkerResult::Failed(user_id, error) => {
                    log::warn!("repair failed for {}: {}", user_id, error);
                    summary.failed.push(RepairFailure { user_id, error });
                }
            }
        }
    }

    summary.skipped = queue.lock().map(|q| q.len()).unwrap_or(0);
    log::info!(
        "batch repair: {} repaired, {} unchanged, {} failed, {} skipped of {}",
        summary.repaired,
        summary.unchanged,
        summary.failed.len(),
        summary.skipped,
        total
    );
    summary
}
