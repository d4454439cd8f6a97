// ── Change workflow domain types ──

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use strum::{Display, EnumString};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Display, EnumString)]
#[serde(rename_all = "snake_case")]
#[strum(serialize_all = "snake_case")]
pub enum RiskLevel {
    Low,
    Medium,
    High,
}

/// Lifecycle of a single change.
///
/// `Proposed -> Previewed -> Applied | Skipped | Failed`, and
/// `Applied -> Reverted`. Nothing else is reachable.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Display)]
#[serde(rename_all = "snake_case")]
#[strum(serialize_all = "snake_case")]
pub enum ChangeState {
    Proposed,
    Previewed,
    Applied,
    Skipped,
    Failed,
    Reverted,
}

impl ChangeState {
    pub fn can_transition_to(self, next: Self) -> bool {
        matches!(
            (self, next),
            (Self::Proposed, Self::Previewed | Self::Applied | Self::Skipped | Self::Failed)
                | (Self::Previewed, Self::Applied | Self::Skipped | Self::Failed)
                | (Self::Applied, Self::Reverted)
        )
    }
}

/// Outcome the service reported for one change in an apply call.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Display)]
#[serde(rename_all = "snake_case")]
#[strum(serialize_all = "snake_case")]
pub enum ApplyStatus {
    Applied,
    Skipped,
    Failed,
}

/// What applying one recommendation would do. Never persisted.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ChangePreview {
    pub change_id: String,
    pub recommendation_index: u32,
    pub description: String,
    pub device_name: String,
    /// Human label of the setting being changed.
    pub setting: String,
    pub current_value: Value,
    pub proposed_value: Value,
    pub risk: RiskLevel,
}

/// One applied (or attempted) change.
///
/// Created once per apply; afterwards only `reverted` and `reverted_at`
/// may change, and only from unset to set.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ChangeResult {
    /// Key in the local ledger. Equal to `real_change_id` when the service
    /// assigned one, except on dry runs, which keep a synthetic key.
    pub change_id: String,
    /// Identifier the service knows the change by. Only used for revert
    /// when the change is revertible.
    pub real_change_id: Option<String>,
    pub job_id: Option<String>,
    pub recommendation_index: Option<u32>,
    pub status: ApplyStatus,
    pub success: bool,
    pub dry_run: bool,
    pub applied_at: DateTime<Utc>,
    pub revertible: bool,
    pub error: Option<String>,
    pub reverted: bool,
    pub reverted_at: Option<DateTime<Utc>>,
}

/// History rows are the same shape as apply results.
pub type ChangeHistoryEntry = ChangeResult;

impl ChangeResult {
    pub fn state(&self) -> ChangeState {
        if self.reverted {
            return ChangeState::Reverted;
        }
        match self.status {
            ApplyStatus::Applied => ChangeState::Applied,
            ApplyStatus::Skipped => ChangeState::Skipped,
            ApplyStatus::Failed => ChangeState::Failed,
        }
    }

    /// Whether a revert may still be attempted.
    pub fn can_revert(&self) -> bool {
        self.revertible && !self.dry_run && self.state().can_transition_to(ChangeState::Reverted)
    }

    /// Does `id` name this change, either by ledger key or service id?
    pub fn matches_id(&self, id: &str) -> bool {
        self.change_id == id || self.real_change_id.as_deref() == Some(id)
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ApplySummary {
    pub applied: u32,
    pub failed: u32,
    pub skipped: u32,
    pub dry_run: bool,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ApplyOutcome {
    pub results: Vec<ChangeResult>,
    pub summary: ApplySummary,
}

/// Result of a revert request.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "outcome", content = "change", rename_all = "snake_case")]
pub enum RevertOutcome {
    /// The service reverted the change and the ledger now records it.
    Reverted(ChangeResult),
    /// The change was already reverted; nothing was sent.
    AlreadyReverted(ChangeResult),
    /// The service refused; `error` carries its reason.
    Failed(ChangeResult),
}

impl RevertOutcome {
    pub fn change(&self) -> &ChangeResult {
        match self {
            Self::Reverted(c) | Self::AlreadyReverted(c) | Self::Failed(c) => c,
        }
    }

    pub fn is_success(&self) -> bool {
        !matches!(self, Self::Failed(_))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn applied(dry_run: bool) -> ChangeResult {
        ChangeResult {
            change_id: "chg-1".into(),
            real_change_id: Some("chg-1".into()),
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
    fn only_applied_changes_revert() {
        assert!(ChangeState::Applied.can_transition_to(ChangeState::Reverted));
        assert!(!ChangeState::Failed.can_transition_to(ChangeState::Reverted));
        assert!(!ChangeState::Skipped.can_transition_to(ChangeState::Reverted));
        assert!(!ChangeState::Reverted.can_transition_to(ChangeState::Applied));
    }

    #[test]
    fn dry_run_is_never_revertible() {
        assert!(applied(false).can_revert());
        let mut dry = applied(true);
        dry.revertible = true;
        assert!(!dry.can_revert());
    }

    #[test]
    fn reverted_change_cannot_revert_again() {
        let mut change = applied(false);
        change.reverted = true;
        assert_eq!(change.state(), ChangeState::Reverted);
        assert!(!change.can_revert());
    }
}
