// ── Analysis result domain types ──

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use strum::{Display, EnumString};

/// Per-dimension health scores. Missing dimensions are reported as 0.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct HealthScores {
    pub overall: f64,
    pub wireless: f64,
    pub wired: f64,
    pub latency: f64,
    pub coverage: f64,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Display, EnumString)]
#[serde(rename_all = "snake_case")]
#[strum(serialize_all = "snake_case")]
pub enum Severity {
    Critical,
    Warning,
    Info,
}

/// One access point as seen by the analysis.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ApAnalysis {
    pub name: String,
    pub mac: Option<String>,
    pub model: Option<String>,
    pub channel: Option<u32>,
    pub band: Option<String>,
    /// Channel utilization, percent.
    pub utilization: f64,
    pub client_count: u32,
    pub score: f64,
}

/// One wireless client as seen by the analysis.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ClientAnalysis {
    pub mac: Option<String>,
    pub hostname: String,
    pub ap_name: Option<String>,
    pub signal_dbm: Option<f64>,
    pub score: f64,
}

/// A single recommendation produced by an analysis.
///
/// `index` is the position in the backend's recommendation list; it is the
/// id the repair endpoints expect.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Finding {
    pub index: u32,
    pub id: String,
    pub severity: Severity,
    pub category: String,
    pub title: String,
    pub description: String,
    pub affected_devices: Vec<String>,
}

/// Normalized output of a completed analysis job.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AnalysisResult {
    pub job_id: String,
    pub timestamp: DateTime<Utc>,
    pub health: HealthScores,
    pub ap_count: u32,
    pub client_count: u32,
    pub aps: Vec<ApAnalysis>,
    pub clients: Vec<ClientAnalysis>,
    pub findings: Vec<Finding>,
    pub summary: String,
}

impl AnalysisResult {
    pub fn count_by_severity(&self, severity: Severity) -> usize {
        self.findings
            .iter()
            .filter(|f| f.severity == severity)
            .count()
    }
}
