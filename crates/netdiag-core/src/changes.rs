// ── Change workflow engine ──
//
// Preview, apply and revert configuration changes derived from an
// analysis job's findings. Every change this process learns about, from an
// apply call or from the service's history, is kept in an insertion-ordered
// ledger. The ledger is what makes revert safe: dry runs are never sent to
// the service for revert, and a change is marked reverted exactly once.

use std::sync::Arc;

use chrono::{DateTime, Utc};
use indexmap::IndexMap;
use parking_lot::RwLock;
use tracing::{debug, info, warn};

use crate::error::CoreError;
use crate::model::{
    ApplyOutcome, ApplyStatus, ChangeHistoryEntry, ChangePreview, ChangeResult, ChangeState,
    RevertOutcome,
};
use crate::normalize;
use crate::session::SessionManager;

// ── Ledger ───────────────────────────────────────────────────────────

/// Local record of every known change, keyed by ledger change id.
#[derive(Debug, Default)]
struct ChangeLedger {
    entries: RwLock<IndexMap<String, ChangeResult>>,
}

impl ChangeLedger {
    /// Insert `change` unless its key is already present. Returns whether
    /// it was inserted.
    fn record(&self, change: ChangeResult) -> bool {
        let mut entries = self.entries.write();
        if entries.contains_key(&change.change_id) {
            debug!(change_id = %change.change_id, "change already in ledger, keeping first entry");
            return false;
        }
        entries.insert(change.change_id.clone(), change);
        true
    }

    /// Look a change up by ledger key or service id.
    fn find(&self, id: &str) -> Option<ChangeResult> {
        let entries = self.entries.read();
        entries
            .get(id)
            .or_else(|| entries.values().find(|c| c.matches_id(id)))
            .cloned()
    }

    /// Set `reverted`/`reverted_at` on an applied change. Returns the
    /// updated entry, or `None` if the change is unknown or cannot move to
    /// reverted (already reverted included).
    fn mark_reverted(&self, id: &str, at: DateTime<Utc>) -> Option<ChangeResult> {
        let mut entries = self.entries.write();
        let key = Self::key_of(&entries, id)?;
        let entry = entries.get_mut(&key)?;
        if !entry.state().can_transition_to(ChangeState::Reverted) || entry.dry_run {
            return None;
        }
        entry.reverted = true;
        entry.reverted_at = Some(at);
        Some(entry.clone())
    }

    /// Fold a service-side history row into the ledger.
    ///
    /// A known change keeps its local fields; the only thing the service
    /// can add is the revert, and a revert is never undone.
    fn merge_remote(&self, remote: ChangeResult) -> ChangeResult {
        let mut entries = self.entries.write();

        let key = Self::key_of(&entries, &remote.change_id).or_else(|| {
            remote
                .real_change_id
                .as_deref()
                .and_then(|id| Self::key_of(&entries, id))
        });

        if let Some(local) = key.as_deref().and_then(|k| entries.get_mut(k)) {
            if remote.reverted && !local.reverted && !local.dry_run {
                local.reverted = true;
                local.reverted_at = remote.reverted_at.or_else(|| Some(Utc::now()));
            }
            return local.clone();
        }

        entries.insert(remote.change_id.clone(), remote.clone());
        remote
    }

    fn snapshot(&self) -> Vec<ChangeResult> {
        self.entries.read().values().cloned().collect()
    }

    fn key_of(entries: &IndexMap<String, ChangeResult>, id: &str) -> Option<String> {
        if entries.contains_key(id) {
            return Some(id.to_owned());
        }
        entries
            .values()
            .find(|c| c.matches_id(id))
            .map(|c| c.change_id.clone())
    }
}

// ── ChangeWorkflow ───────────────────────────────────────────────────

#[derive(Debug, Clone)]
pub struct ChangeWorkflow {
    session: SessionManager,
    ledger: Arc<ChangeLedger>,
}

impl ChangeWorkflow {
    pub fn new(session: &SessionManager) -> Self {
        Self {
            session: session.clone(),
            ledger: Arc::new(ChangeLedger::default()),
        }
    }

    /// Describe what applying `recommendation_ids` from `job_id` would do.
    pub async fn preview(
        &self,
        job_id: &str,
        recommendation_ids: &[u32],
    ) -> Result<Vec<ChangePreview>, CoreError> {
        let resp = self
            .session
            .authorized_api()?
            .preview_changes(job_id, recommendation_ids)
            .await?;

        Ok(resp
            .previews
            .iter()
            .map(|entry| normalize::preview(entry, job_id))
            .collect())
    }

    /// Apply recommendations. Partial failure is reported per change and
    /// nothing is rolled back.
    pub async fn apply(
        &self,
        job_id: &str,
        recommendation_ids: &[u32],
        dry_run: bool,
    ) -> Result<ApplyOutcome, CoreError> {
        let resp = self
            .session
            .authorized_api()?
            .apply_changes(job_id, recommendation_ids, dry_run)
            .await?;

        let now = Utc::now();
        let results: Vec<ChangeResult> = resp
            .results
            .iter()
            .enumerate()
            .map(|(position, row)| {
                // Rows without an index are taken to follow request order.
                let fallback = recommendation_ids.get(position).copied().unwrap_or_default();
                normalize::change_result(row, job_id, fallback, dry_run, now)
            })
            .collect();

        for result in &results {
            self.ledger.record(result.clone());
        }

        let summary = normalize::apply_summary(&results, resp.summary.as_ref(), dry_run);
        info!(
            job_id,
            applied = summary.applied,
            failed = summary.failed,
            skipped = summary.skipped,
            dry_run = summary.dry_run,
            "changes applied"
        );

        Ok(ApplyOutcome { results, summary })
    }

    /// Revert one change.
    ///
    /// Known changes are checked against the ledger first: a second revert
    /// is a no-op, and dry-run or unapplied changes are refused without
    /// contacting the service. Unknown ids are looked up in the service's
    /// history, then forwarded as-is.
    pub async fn revert(&self, change_id: &str) -> Result<RevertOutcome, CoreError> {
        let api = self.session.authorized_api()?;

        let known = match self.ledger.find(change_id) {
            Some(entry) => Some(entry),
            None => {
                debug!(change_id, "change not in ledger, refreshing history");
                self.history().await?;
                self.ledger.find(change_id)
            }
        };

        if let Some(entry) = &known {
            if entry.reverted {
                debug!(change_id, "change already reverted");
                return Ok(RevertOutcome::AlreadyReverted(entry.clone()));
            }
            if !entry.can_revert() {
                return Err(CoreError::NotRevertible {
                    change_id: change_id.to_owned(),
                    reason: not_revertible_reason(entry).into(),
                });
            }
        }

        let remote_id = known
            .as_ref()
            .and_then(|e| e.real_change_id.clone())
            .unwrap_or_else(|| change_id.to_owned());

        let resp = api.revert_change(&remote_id).await?;
        let now = Utc::now();

        if !resp.reverted {
            let reason = resp
                .reason()
                .unwrap_or("service declined to revert the change")
                .to_owned();
            warn!(change_id = %remote_id, %reason, "revert refused");
            let mut failed = known.unwrap_or_else(|| unknown_change(&remote_id, now));
            failed.success = false;
            failed.error = Some(reason);
            return Ok(RevertOutcome::Failed(failed));
        }

        if let Some(updated) = self.ledger.mark_reverted(&remote_id, now) {
            info!(change_id = %remote_id, "change reverted");
            return Ok(RevertOutcome::Reverted(updated));
        }

        // Another caller finished the same revert first.
        if let Some(existing) = self.ledger.find(&remote_id).filter(|e| e.reverted) {
            return Ok(RevertOutcome::AlreadyReverted(existing));
        }

        let mut entry = unknown_change(&remote_id, now);
        entry.reverted = true;
        entry.reverted_at = Some(now);
        self.ledger.record(entry.clone());
        info!(change_id = %remote_id, "untracked change reverted");
        Ok(RevertOutcome::Reverted(entry))
    }

    /// Every change the service has recorded, merged with local knowledge.
    ///
    /// Returns the whole ledger afterwards, so local-only rows such as dry
    /// runs are included.
    pub async fn history(&self) -> Result<Vec<ChangeHistoryEntry>, CoreError> {
        let resp = self
            .session
            .authorized_api()?
            .change_history()
            .await?;

        let now = Utc::now();
        for raw in &resp.changes {
            let entry = normalize::history_entry(raw, now);
            if entry.change_id.is_empty() {
                debug!("skipping history row without a change id");
                continue;
            }
            self.ledger.merge_remote(entry);
        }

        Ok(self.ledger.snapshot())
    }

    /// Changes that can still be reverted, per the service and the ledger.
    pub async fn revertable(&self) -> Result<Vec<ChangeHistoryEntry>, CoreError> {
        let resp = self
            .session
            .authorized_api()?
            .revertable_changes()
            .await?;

        let now = Utc::now();
        Ok(resp
            .changes
            .iter()
            .map(|raw| normalize::history_entry(raw, now))
            .filter(|entry| !entry.change_id.is_empty())
            .map(|entry| self.ledger.merge_remote(entry))
            .filter(ChangeResult::can_revert)
            .collect())
    }

    /// Local snapshot of every known change, in the order first seen.
    pub fn ledger(&self) -> Vec<ChangeHistoryEntry> {
        self.ledger.snapshot()
    }
}

fn not_revertible_reason(entry: &ChangeResult) -> &'static str {
    if entry.dry_run {
        "it was a dry run"
    } else {
        match entry.status {
            ApplyStatus::Failed => "it failed to apply",
            ApplyStatus::Skipped => "it was skipped",
            ApplyStatus::Applied => "the service did not assign it a revertible id",
        }
    }
}

/// Ledger row for a change this process never saw applied.
fn unknown_change(change_id: &str, observed_at: DateTime<Utc>) -> ChangeResult {
    ChangeResult {
        change_id: change_id.to_owned(),
        real_change_id: Some(change_id.to_owned()),
        job_id: None,
        recommendation_index: None,
        status: ApplyStatus::Applied,
        success: true,
        dry_run: false,
        applied_at: observed_at,
        revertible: true,
        error: None,
        reverted: false,
        reverted_at: None,
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    fn change(id: &str, dry_run: bool) -> ChangeResult {
        ChangeResult {
            change_id: id.into(),
            real_change_id: (!dry_run).then(|| id.to_owned()),
            job_id: Some("job-1".into()),
            recommendation_index: Some(0),
            status: ApplyStatus::Applied,
            success: true,
            dry_run,
            applied_at: Utc::now(),
            revertible: !dry_run,
            error: None,
            reverted: false,
            reverted_at: None,
        }
    }

    #[test]
    fn record_keeps_first_entry() {
        let ledger = ChangeLedger::default();
        assert!(ledger.record(change("a", false)));

        let mut second = change("a", false);
        second.error = Some("later".into());
        assert!(!ledger.record(second));

        assert_eq!(ledger.find("a").unwrap().error, None);
    }

    #[test]
    fn mark_reverted_happens_once() {
        let ledger = ChangeLedger::default();
        ledger.record(change("a", false));

        let first = ledger.mark_reverted("a", Utc::now()).unwrap();
        assert!(first.reverted);
        assert!(ledger.mark_reverted("a", Utc::now()).is_none());
        assert_eq!(ledger.find("a").unwrap().reverted_at, first.reverted_at);
    }

    #[test]
    fn dry_run_never_marked_reverted() {
        let ledger = ChangeLedger::default();
        ledger.record(change("job-1:0:dry-run", true));
        assert!(ledger.mark_reverted("job-1:0:dry-run", Utc::now()).is_none());
    }

    #[test]
    fn merge_keeps_local_dry_run_state() {
        let ledger = ChangeLedger::default();
        let mut local = change("a", true);
        local.real_change_id = Some("a".into());
        ledger.record(local);

        let mut remote = change("a", false);
        remote.reverted = true;
        let merged = ledger.merge_remote(remote);

        assert!(merged.dry_run);
        assert!(!merged.reverted);
    }

    #[test]
    fn merge_never_unreverts() {
        let ledger = ChangeLedger::default();
        ledger.record(change("a", false));
        ledger.mark_reverted("a", Utc::now());

        let merged = ledger.merge_remote(change("a", false));
        assert!(merged.reverted);
    }

    #[test]
    fn snapshot_preserves_insertion_order() {
        let ledger = ChangeLedger::default();
        for id in ["c", "a", "b"] {
            ledger.record(change(id, false));
        }
        let ids: Vec<_> = ledger.snapshot().into_iter().map(|c| c.change_id).collect();
        assert_eq!(ids, vec!["c", "a", "b"]);
    }
}
