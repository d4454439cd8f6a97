// Analysis job endpoints
//
// Job payloads are returned as raw JSON: identifier keys, status words and
// the nested result layout differ between backend versions, and mapping
// them is the core crate's job.

use serde_json::{Value, json};
use tracing::debug;

use crate::client::ApiClient;
use crate::error::Error;

impl ApiClient {
    /// Start a new analysis job.
    ///
    /// `POST /api/analysis/run` with `{}`
    pub async fn run_analysis(&self) -> Result<Value, Error> {
        debug!("submitting analysis job");
        self.post("api/analysis/run", &[], &json!({})).await
    }

    /// Fetch a status snapshot for a job.
    ///
    /// `GET /api/analysis/status/{job_id}`
    pub async fn analysis_status(&self, job_id: &str) -> Result<Value, Error> {
        self.get(&format!("api/analysis/status/{}", encode_segment(job_id)))
            .await
    }

    /// Fetch the final results of a completed job.
    ///
    /// `GET /api/analysis/results/{job_id}`
    pub async fn analysis_results(&self, job_id: &str) -> Result<Value, Error> {
        debug!(job_id, "fetching analysis results");
        self.get(&format!("api/analysis/results/{}", encode_segment(job_id)))
            .await
    }
}

/// Percent-encode a caller-supplied id for use as a single path segment.
fn encode_segment(raw: &str) -> String {
    url::form_urlencoded::byte_serialize(raw.as_bytes()).collect()
}
