// ── Local analysis history types ──

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::analysis::AnalysisResult;

/// Summary row persisted by the history cache.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AnalysisHistoryRecord {
    pub id: i64,
    pub job_id: String,
    pub timestamp: DateTime<Utc>,
    pub health_score: f64,
    pub ap_count: u32,
    pub client_count: u32,
    pub summary: String,
}

/// A record before the cache assigns it an id.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NewHistoryRecord {
    pub job_id: String,
    pub timestamp: DateTime<Utc>,
    pub health_score: f64,
    pub ap_count: u32,
    pub client_count: u32,
    pub summary: String,
}

impl NewHistoryRecord {
    /// Summary row for a completed analysis.
    pub fn from_result(result: &AnalysisResult) -> Self {
        Self {
            job_id: result.job_id.clone(),
            timestamp: result.timestamp,
            health_score: result.health.overall,
            ap_count: result.ap_count,
            client_count: result.client_count,
            summary: result.summary.clone(),
        }
    }
}
