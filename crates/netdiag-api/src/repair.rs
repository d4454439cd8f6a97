// Repair endpoints
//
// Preview, apply (optionally dry run) and revert configuration changes
// derived from an analysis job's recommendations, plus the service-side
// change history.

use tracing::debug;

use crate::client::ApiClient;
use crate::error::Error;
use crate::models::{
    ApplyResponse, ChangesResponse, PreviewResponse, RepairRequest, RevertRequest, RevertResponse,
};

impl ApiClient {
    /// Describe the changes a set of recommendations would make.
    ///
    /// `POST /api/repair/preview?job_id=` with `{"recommendation_ids": [...]}`
    pub async fn preview_changes(
        &self,
        job_id: &str,
        recommendation_ids: &[u32],
    ) -> Result<PreviewResponse, Error> {
        debug!(job_id, ?recommendation_ids, "previewing changes");
        let body = RepairRequest {
            recommendation_ids,
            dry_run: None,
        };
        self.post("api/repair/preview", &[("job_id", job_id.to_owned())], &body)
            .await
    }

    /// Apply a set of recommendations.
    ///
    /// `POST /api/repair/apply?job_id=` with
    /// `{"recommendation_ids": [...], "dry_run": bool}`
    pub async fn apply_changes(
        &self,
        job_id: &str,
        recommendation_ids: &[u32],
        dry_run: bool,
    ) -> Result<ApplyResponse, Error> {
        debug!(job_id, ?recommendation_ids, dry_run, "applying changes");
        let body = RepairRequest {
            recommendation_ids,
            dry_run: Some(dry_run),
        };
        self.post("api/repair/apply", &[("job_id", job_id.to_owned())], &body)
            .await
    }

    /// Revert a previously applied change.
    ///
    /// `POST /api/repair/revert` with `{"change_id": "..."}`
    pub async fn revert_change(&self, change_id: &str) -> Result<RevertResponse, Error> {
        debug!(change_id, "reverting change");
        self.post("api/repair/revert", &[], &RevertRequest { change_id })
            .await
    }

    /// Every change the service has recorded, any status.
    ///
    /// `GET /api/repair/history`
    pub async fn change_history(&self) -> Result<ChangesResponse, Error> {
        self.get("api/repair/history").await
    }

    /// Changes the service reports as still revertible.
    ///
    /// `GET /api/repair/revertable`
    pub async fn revertable_changes(&self) -> Result<ChangesResponse, Error> {
        self.get("api/repair/revertable").await
    }
}
