// ── Payload normalization ──
//
// Analysis and change payloads differ between service versions: the same
// attribute may sit under a different key or at a different depth. Every
// target attribute below has an explicit, ordered list of dotted candidate
// paths; the first candidate holding a usable value wins, and a neutral
// default (0, empty string, empty list) applies when none does. Nothing in
// this module can fail.

use chrono::{DateTime, NaiveDateTime, Utc};
use serde_json::Value;

use netdiag_api::models::{ApplySummaryWire, PreviewEntry};

use crate::model::{
    AnalysisJob, AnalysisResult, ApAnalysis, ApplyStatus, ApplySummary, ChangeHistoryEntry,
    ChangePreview, ChangeResult, ClientAnalysis, DiscoveredDevice, Finding, HealthScores,
    JobStatus, RiskLevel, Severity,
};

// ── Candidate paths ──────────────────────────────────────────────────

/// Ordered source paths for each normalized attribute.
pub mod fields {
    macro_rules! health_paths {
        ($key:literal) => {
            &[
                concat!("health_score.", $key),
                concat!("health_score.", $key, "_score"),
                concat!("health_score.components.", $key),
                concat!("results.health_score.", $key),
                concat!("results.health_score.components.", $key),
                concat!("health.", $key),
                concat!($key, "_score"),
            ]
        };
    }

    // Jobs
    pub const JOB_ID: &[&str] = &["job_id", "jobId", "id", "job.job_id", "job.jobId", "job.id"];
    pub const JOB_STATUS: &[&str] = &["status", "state", "job.status"];
    pub const JOB_PROGRESS: &[&str] = &["progress", "percent_complete", "job.progress"];
    pub const JOB_STARTED_AT: &[&str] = &["started_at", "startedAt", "created_at", "job.started_at"];
    pub const JOB_COMPLETED_AT: &[&str] = &[
        "completed_at",
        "completedAt",
        "finished_at",
        "job.completed_at",
    ];
    pub const JOB_ERROR: &[&str] = &["error", "error_message", "job.error"];
    /// Only read for failed jobs; running jobs often carry a progress message.
    pub const JOB_FAILURE_MESSAGE: &[&str] = &["message", "detail"];

    // Results
    pub const RESULT_TIMESTAMP: &[&str] = &[
        "timestamp",
        "completed_at",
        "completedAt",
        "results.timestamp",
        "created_at",
    ];
    pub const HEALTH_OVERALL: &[&str] = &[
        "health_score.overall",
        "health_score.overall_score",
        "health_score.score",
        "results.health_score.overall",
        "results.health_score.overall_score",
        "health.overall",
        "overall_score",
        "health_score",
    ];
    pub const HEALTH_WIRELESS: &[&str] = health_paths!("wireless");
    pub const HEALTH_WIRED: &[&str] = health_paths!("wired");
    pub const HEALTH_LATENCY: &[&str] = health_paths!("latency");
    pub const HEALTH_COVERAGE: &[&str] = health_paths!("coverage");
    pub const APS: &[&str] = &[
        "ap_analysis.aps",
        "ap_analysis.access_points",
        "results.ap_analysis.aps",
        "ap_analysis",
        "results.ap_analysis",
        "aps",
        "access_points",
    ];
    pub const AP_COUNT: &[&str] = &[
        "ap_analysis.total_aps",
        "ap_analysis.ap_count",
        "ap_analysis.count",
        "results.ap_analysis.total_aps",
        "ap_count",
        "apCount",
        "total_aps",
    ];
    pub const CLIENTS: &[&str] = &[
        "client_analysis.clients",
        "results.client_analysis.clients",
        "client_analysis",
        "results.client_analysis",
        "clients",
    ];
    pub const CLIENT_COUNT: &[&str] = &[
        "client_analysis.total_clients",
        "client_analysis.client_count",
        "client_analysis.count",
        "results.client_analysis.total_clients",
        "client_count",
        "clientCount",
        "total_clients",
    ];
    pub const FINDINGS: &[&str] = &[
        "recommendations",
        "results.recommendations",
        "findings",
        "results.findings",
        "issues",
    ];
    pub const SUMMARY: &[&str] = &[
        "summary",
        "results.summary",
        "health_score.summary",
        "message",
    ];

    // Per access point
    pub const AP_NAME: &[&str] = &["name", "ap_name", "device_name", "hostname"];
    pub const AP_MAC: &[&str] = &["mac", "mac_address"];
    pub const AP_MODEL: &[&str] = &["model", "model_name"];
    pub const AP_CHANNEL: &[&str] = &["channel", "radio.channel", "current_channel"];
    pub const AP_BAND: &[&str] = &["band", "radio.band", "radio"];
    pub const AP_UTILIZATION: &[&str] = &[
        "channel_utilization",
        "utilization",
        "cu_total",
        "radio.utilization",
    ];
    pub const AP_CLIENT_COUNT: &[&str] = &["num_clients", "client_count", "num_sta", "clients"];
    pub const AP_SCORE: &[&str] = &["health_score", "score", "health"];

    // Per client
    pub const CLIENT_MAC: &[&str] = &["mac", "mac_address"];
    pub const CLIENT_HOSTNAME: &[&str] = &["hostname", "name", "display_name", "mac"];
    pub const CLIENT_AP: &[&str] = &["ap_name", "ap", "connected_ap", "ap_mac"];
    pub const CLIENT_SIGNAL: &[&str] = &["signal", "rssi", "signal_strength", "signal_dbm"];
    pub const CLIENT_SCORE: &[&str] = &["health_score", "score", "experience", "satisfaction"];

    // Per finding
    pub const FINDING_ID: &[&str] = &["id", "recommendation_id"];
    pub const FINDING_SEVERITY: &[&str] = &["severity", "priority", "level"];
    pub const FINDING_CATEGORY: &[&str] = &["category", "type"];
    pub const FINDING_TITLE: &[&str] = &["title", "issue", "name"];
    pub const FINDING_DESCRIPTION: &[&str] = &[
        "description",
        "details",
        "message",
        "recommendation",
    ];
    pub const FINDING_AFFECTED: &[&str] = &[
        "affected_devices",
        "devices",
        "device_names",
        "device_name",
        "ap_name",
        "device",
    ];

    // Change history entries
    pub const CHANGE_ID: &[&str] = &["change_id", "changeId", "id"];
    pub const CHANGE_JOB_ID: &[&str] = &["job_id", "jobId"];
    pub const CHANGE_INDEX: &[&str] = &["recommendation_index", "index"];
    pub const CHANGE_STATUS: &[&str] = &["status", "state"];
    pub const CHANGE_SUCCESS: &[&str] = &["success"];
    pub const CHANGE_DRY_RUN: &[&str] = &["dry_run", "dryRun"];
    pub const CHANGE_APPLIED_AT: &[&str] = &["applied_at", "appliedAt", "timestamp", "created_at"];
    pub const CHANGE_REVERTIBLE: &[&str] = &["revertible", "revertable", "can_revert"];
    pub const CHANGE_REVERTED: &[&str] = &["reverted"];
    pub const CHANGE_REVERTED_AT: &[&str] = &["reverted_at", "revertedAt"];
    pub const CHANGE_ERROR: &[&str] = &["error", "message"];

    // Discovered devices
    pub const DEVICE_IP: &[&str] = &["ip", "ip_address", "address"];
    pub const DEVICE_MAC: &[&str] = &["mac", "mac_address"];
    pub const DEVICE_HOSTNAME: &[&str] = &["hostname", "name"];
    pub const DEVICE_MODEL: &[&str] = &["model"];
    pub const DEVICE_TYPE: &[&str] = &["type", "device_type"];
    pub const DEVICE_VERSION: &[&str] = &["version", "firmware"];
}

// ── Resolution primitives ────────────────────────────────────────────

/// Follow a dotted path through nested objects.
pub fn lookup<'a>(value: &'a Value, path: &str) -> Option<&'a Value> {
    path.split('.')
        .try_fold(value, |current, key| current.get(key))
}

/// First candidate whose value `convert` accepts.
fn first<'a, T>(
    value: &'a Value,
    candidates: &[&str],
    convert: impl Fn(&'a Value) -> Option<T>,
) -> Option<T> {
    candidates
        .iter()
        .filter_map(|path| lookup(value, path))
        .find_map(convert)
}

fn as_number(value: &Value) -> Option<f64> {
    match value {
        Value::Number(n) => n.as_f64(),
        Value::String(s) => s.trim().parse::<f64>().ok(),
        _ => None,
    }
    .filter(|n| n.is_finite())
}

fn as_text(value: &Value) -> Option<String> {
    match value {
        Value::String(s) if !s.trim().is_empty() => Some(s.trim().to_owned()),
        Value::Number(n) => Some(n.to_string()),
        _ => None,
    }
}

fn as_bool(value: &Value) -> Option<bool> {
    match value {
        Value::Bool(b) => Some(*b),
        Value::Number(n) => n.as_i64().map(|n| n != 0),
        Value::String(s) => match s.trim().to_ascii_lowercase().as_str() {
            "true" | "yes" | "1" => Some(true),
            "false" | "no" | "0" => Some(false),
            _ => None,
        },
        _ => None,
    }
}

#[allow(clippy::as_conversions, clippy::cast_possible_truncation, clippy::cast_sign_loss)]
fn as_count(value: &Value) -> Option<u32> {
    let n = as_number(value)?;
    (n >= 0.0 && n <= f64::from(u32::MAX)).then(|| n.round() as u32)
}

/// RFC 3339, naive ISO-8601 (read as UTC), or epoch seconds/milliseconds.
fn as_datetime(value: &Value) -> Option<DateTime<Utc>> {
    match value {
        Value::String(s) => parse_datetime(s),
        Value::Number(n) => {
            let raw = n.as_i64()?;
            if raw > 100_000_000_000 {
                DateTime::from_timestamp_millis(raw)
            } else {
                DateTime::from_timestamp(raw, 0)
            }
        }
        _ => None,
    }
}

fn parse_datetime(raw: &str) -> Option<DateTime<Utc>> {
    let raw = raw.trim();
    DateTime::parse_from_rfc3339(raw)
        .map(|dt| dt.with_timezone(&Utc))
        .ok()
        .or_else(|| {
            NaiveDateTime::parse_from_str(raw, "%Y-%m-%dT%H:%M:%S%.f")
                .ok()
                .map(|naive| naive.and_utc())
        })
}

/// Numeric attribute; defaults to `0.0`.
pub fn resolve_f64(value: &Value, candidates: &[&str]) -> f64 {
    first(value, candidates, as_number).unwrap_or(0.0)
}

pub fn resolve_count(value: &Value, candidates: &[&str]) -> Option<u32> {
    first(value, candidates, as_count)
}

pub fn resolve_text(value: &Value, candidates: &[&str]) -> Option<String> {
    first(value, candidates, as_text)
}

/// Text attribute; defaults to the empty string.
pub fn resolve_string(value: &Value, candidates: &[&str]) -> String {
    resolve_text(value, candidates).unwrap_or_default()
}

pub fn resolve_bool(value: &Value, candidates: &[&str]) -> Option<bool> {
    first(value, candidates, as_bool)
}

pub fn resolve_datetime(value: &Value, candidates: &[&str]) -> Option<DateTime<Utc>> {
    first(value, candidates, as_datetime)
}

/// List attribute; defaults to an empty slice.
pub fn resolve_list<'a>(value: &'a Value, candidates: &[&str]) -> &'a [Value] {
    first(value, candidates, Value::as_array)
        .map(Vec::as_slice)
        .unwrap_or_default()
}

/// A list of names, or a single name promoted to a one-element list.
pub fn resolve_string_list(value: &Value, candidates: &[&str]) -> Vec<String> {
    first(value, candidates, |v| match v {
        Value::Array(items) => Some(
            items
                .iter()
                .filter_map(|item| as_text(item).or_else(|| item.get("name").and_then(as_text)))
                .collect(),
        ),
        other => as_text(other).map(|s| vec![s]),
    })
    .unwrap_or_default()
}

fn len_u32(len: usize) -> u32 {
    u32::try_from(len).unwrap_or(u32::MAX)
}

// ── Word tables ──────────────────────────────────────────────────────

pub fn job_status_from_word(word: &str) -> JobStatus {
    match word.trim().to_ascii_lowercase().as_str() {
        "running" | "in_progress" | "in-progress" | "processing" | "started" | "analyzing" => {
            JobStatus::Running
        }
        "completed" | "complete" | "done" | "success" | "succeeded" | "finished" => {
            JobStatus::Completed
        }
        "failed" | "failure" | "error" | "errored" | "cancelled" | "canceled" => {
            JobStatus::Failed
        }
        // pending, queued, and anything unrecognized
        _ => JobStatus::Pending,
    }
}

pub fn severity_from_word(word: &str) -> Severity {
    match word.trim().to_ascii_lowercase().as_str() {
        "critical" | "high" | "error" | "severe" | "urgent" => Severity::Critical,
        "warning" | "warn" | "medium" | "moderate" => Severity::Warning,
        _ => Severity::Info,
    }
}

pub fn risk_from_word(word: &str) -> RiskLevel {
    match word.trim().to_ascii_lowercase().as_str() {
        "low" | "minimal" | "none" => RiskLevel::Low,
        "high" | "critical" | "severe" => RiskLevel::High,
        _ => RiskLevel::Medium,
    }
}

/// Backend repair action codes and the setting each one changes.
const ACTION_LABELS: &[(&str, &str)] = &[
    ("change_channel", "Channel"),
    ("channel_change", "Channel"),
    ("set_channel", "Channel"),
    ("change_channel_width", "Channel Width"),
    ("channel_width", "Channel Width"),
    ("adjust_power", "Transmit Power"),
    ("power_change", "Transmit Power"),
    ("tx_power", "Transmit Power"),
    ("enable_band_steering", "Band Steering"),
    ("band_steering", "Band Steering"),
    ("set_min_rssi", "Minimum RSSI"),
    ("min_rssi", "Minimum RSSI"),
    ("enable_fast_roaming", "Fast Roaming (802.11r)"),
    ("fast_roaming", "Fast Roaming (802.11r)"),
    ("set_dtim", "DTIM Period"),
    ("dtim", "DTIM Period"),
    ("disable_legacy_rates", "Minimum Data Rate"),
];

/// Human label for an action code; unknown codes are shown as-is.
pub fn setting_label(action: &str) -> String {
    let code = action.trim().to_ascii_lowercase();
    ACTION_LABELS
        .iter()
        .find(|(known, _)| *known == code)
        .map_or_else(|| action.trim().to_owned(), |(_, label)| (*label).to_owned())
}

// ── Analysis jobs ────────────────────────────────────────────────────

#[allow(clippy::as_conversions, clippy::cast_possible_truncation, clippy::cast_sign_loss)]
fn clamp_progress(raw: f64) -> u8 {
    raw.clamp(0.0, 100.0).round() as u8
}

/// Status snapshot from a run/status payload.
///
/// A completed job with no reported progress is shown at 100.
pub fn job(value: &Value, observed_at: DateTime<Utc>) -> AnalysisJob {
    let status = resolve_text(value, fields::JOB_STATUS)
        .map_or(JobStatus::Pending, |word| job_status_from_word(&word));

    let progress = first(value, fields::JOB_PROGRESS, as_number).unwrap_or(
        if status == JobStatus::Completed {
            100.0
        } else {
            0.0
        },
    );

    let error = resolve_text(value, fields::JOB_ERROR).or_else(|| {
        (status == JobStatus::Failed)
            .then(|| resolve_text(value, fields::JOB_FAILURE_MESSAGE))
            .flatten()
    });

    AnalysisJob {
        job_id: resolve_string(value, fields::JOB_ID),
        status,
        progress: clamp_progress(progress),
        started_at: resolve_datetime(value, fields::JOB_STARTED_AT).unwrap_or(observed_at),
        completed_at: resolve_datetime(value, fields::JOB_COMPLETED_AT),
        error,
    }
}

// ── Analysis results ─────────────────────────────────────────────────

/// Full result from a results payload. `requested_job_id` is used when the
/// payload does not echo the job id back.
pub fn analysis_result(
    value: &Value,
    requested_job_id: &str,
    observed_at: DateTime<Utc>,
) -> AnalysisResult {
    let aps: Vec<ApAnalysis> = resolve_list(value, fields::APS).iter().map(ap).collect();
    let clients: Vec<ClientAnalysis> = resolve_list(value, fields::CLIENTS)
        .iter()
        .map(client)
        .collect();
    let findings: Vec<Finding> = resolve_list(value, fields::FINDINGS)
        .iter()
        .enumerate()
        .map(|(i, f)| finding(f, len_u32(i)))
        .collect();

    AnalysisResult {
        job_id: resolve_text(value, fields::JOB_ID).unwrap_or_else(|| requested_job_id.to_owned()),
        timestamp: resolve_datetime(value, fields::RESULT_TIMESTAMP).unwrap_or(observed_at),
        health: HealthScores {
            overall: resolve_f64(value, fields::HEALTH_OVERALL),
            wireless: resolve_f64(value, fields::HEALTH_WIRELESS),
            wired: resolve_f64(value, fields::HEALTH_WIRED),
            latency: resolve_f64(value, fields::HEALTH_LATENCY),
            coverage: resolve_f64(value, fields::HEALTH_COVERAGE),
        },
        ap_count: resolve_count(value, fields::AP_COUNT).unwrap_or_else(|| len_u32(aps.len())),
        client_count: resolve_count(value, fields::CLIENT_COUNT)
            .unwrap_or_else(|| len_u32(clients.len())),
        aps,
        clients,
        findings,
        summary: resolve_string(value, fields::SUMMARY),
    }
}

pub fn ap(value: &Value) -> ApAnalysis {
    ApAnalysis {
        name: resolve_string(value, fields::AP_NAME),
        mac: resolve_text(value, fields::AP_MAC),
        model: resolve_text(value, fields::AP_MODEL),
        channel: resolve_count(value, fields::AP_CHANNEL),
        band: resolve_text(value, fields::AP_BAND),
        utilization: resolve_f64(value, fields::AP_UTILIZATION),
        client_count: resolve_count(value, fields::AP_CLIENT_COUNT).unwrap_or(0),
        score: resolve_f64(value, fields::AP_SCORE),
    }
}

pub fn client(value: &Value) -> ClientAnalysis {
    ClientAnalysis {
        mac: resolve_text(value, fields::CLIENT_MAC),
        hostname: resolve_string(value, fields::CLIENT_HOSTNAME),
        ap_name: resolve_text(value, fields::CLIENT_AP),
        signal_dbm: first(value, fields::CLIENT_SIGNAL, as_number),
        score: resolve_f64(value, fields::CLIENT_SCORE),
    }
}

/// A recommendation entry. Bare strings become a title-only finding.
pub fn finding(value: &Value, index: u32) -> Finding {
    if let Some(text) = value.as_str() {
        return Finding {
            index,
            id: index.to_string(),
            severity: Severity::Info,
            category: String::new(),
            title: text.trim().to_owned(),
            description: String::new(),
            affected_devices: Vec::new(),
        };
    }

    Finding {
        index,
        id: resolve_text(value, fields::FINDING_ID).unwrap_or_else(|| index.to_string()),
        severity: resolve_text(value, fields::FINDING_SEVERITY)
            .map_or(Severity::Info, |word| severity_from_word(&word)),
        category: resolve_string(value, fields::FINDING_CATEGORY),
        title: resolve_string(value, fields::FINDING_TITLE),
        description: resolve_string(value, fields::FINDING_DESCRIPTION),
        affected_devices: resolve_string_list(value, fields::FINDING_AFFECTED),
    }
}

// ── Changes ──────────────────────────────────────────────────────────

/// Ledger key for a change the service did not assign an id to.
pub fn synthetic_change_id(job_id: &str, index: u32, dry_run: bool) -> String {
    if dry_run {
        format!("{job_id}:{index}:dry-run")
    } else {
        format!("{job_id}:{index}")
    }
}

pub fn preview(entry: &PreviewEntry, job_id: &str) -> ChangePreview {
    let setting = setting_label(entry.action.as_deref().unwrap_or_default());
    let device_name = entry.device_name.clone().unwrap_or_default();
    let impact = entry.impact.as_ref();

    let description = impact
        .and_then(|i| i.reason.clone())
        .filter(|r| !r.trim().is_empty())
        .unwrap_or_else(|| {
            if device_name.is_empty() {
                format!("Change {setting}")
            } else {
                format!("Change {setting} on {device_name}")
            }
        });

    ChangePreview {
        change_id: synthetic_change_id(job_id, entry.index, false),
        recommendation_index: entry.index,
        description,
        device_name,
        setting,
        current_value: entry.current_value.clone(),
        proposed_value: entry.new_value.clone(),
        risk: impact
            .and_then(|i| i.risk_level.as_deref())
            .map_or(RiskLevel::Medium, risk_from_word),
    }
}

fn apply_status(word: &str, has_error: bool) -> ApplyStatus {
    match word.to_ascii_lowercase().as_str() {
        "applied" | "success" | "succeeded" | "completed" | "dry_run" | "dry-run" | "would_apply"
        | "simulated" => ApplyStatus::Applied,
        "failed" | "failure" | "error" => ApplyStatus::Failed,
        "skipped" | "not_applicable" | "no_change" | "unchanged" => ApplyStatus::Skipped,
        _ if has_error => ApplyStatus::Failed,
        _ => ApplyStatus::Skipped,
    }
}

/// One result row of an apply call.
///
/// `fallback_index` stands in when the row does not say which
/// recommendation it belongs to. A dry-run row is keyed by a synthetic id;
/// any id the service returned for it is kept as `real_change_id` so later
/// history rows still match it, but the row is never revertible.
pub fn change_result(
    value: &Value,
    job_id: &str,
    fallback_index: u32,
    dry_run: bool,
    observed_at: DateTime<Utc>,
) -> ChangeResult {
    let error = resolve_text(value, fields::CHANGE_ERROR);
    let status = apply_status(
        &resolve_string(value, fields::CHANGE_STATUS),
        error.is_some(),
    );
    let success = status == ApplyStatus::Applied;
    let error = error.filter(|_| !success);
    let index = resolve_count(value, fields::CHANGE_INDEX).unwrap_or(fallback_index);
    let real_change_id = resolve_text(value, fields::CHANGE_ID);
    let change_id = match &real_change_id {
        Some(id) if !dry_run => id.clone(),
        _ => synthetic_change_id(job_id, index, dry_run),
    };

    ChangeResult {
        change_id,
        revertible: success && !dry_run && real_change_id.is_some(),
        real_change_id,
        job_id: Some(job_id.to_owned()),
        recommendation_index: Some(index),
        status,
        success,
        dry_run,
        applied_at: resolve_datetime(value, fields::CHANGE_APPLIED_AT).unwrap_or(observed_at),
        error,
        reverted: false,
        reverted_at: None,
    }
}

/// Apply totals: the service's own counts where given, otherwise counted
/// from the per-change results.
pub fn apply_summary(
    results: &[ChangeResult],
    wire: Option<&ApplySummaryWire>,
    dry_run: bool,
) -> ApplySummary {
    let count = |status: ApplyStatus| len_u32(results.iter().filter(|r| r.status == status).count());

    ApplySummary {
        applied: wire
            .and_then(|w| w.applied)
            .unwrap_or_else(|| count(ApplyStatus::Applied)),
        failed: wire
            .and_then(|w| w.failed)
            .unwrap_or_else(|| count(ApplyStatus::Failed)),
        skipped: wire
            .and_then(|w| w.skipped)
            .unwrap_or_else(|| count(ApplyStatus::Skipped)),
        dry_run: wire.and_then(|w| w.dry_run).unwrap_or(dry_run),
    }
}

/// One row of the service's change history or revertable list.
///
/// Entries without any id come back with an empty `change_id`.
pub fn history_entry(value: &Value, observed_at: DateTime<Utc>) -> ChangeHistoryEntry {
    let real_change_id = resolve_text(value, fields::CHANGE_ID);
    let word = resolve_string(value, fields::CHANGE_STATUS).to_ascii_lowercase();

    let reverted = resolve_bool(value, fields::CHANGE_REVERTED).unwrap_or(word == "reverted");
    let dry_run = resolve_bool(value, fields::CHANGE_DRY_RUN).unwrap_or(false);
    let success = resolve_bool(value, fields::CHANGE_SUCCESS).unwrap_or_else(|| {
        matches!(
            word.as_str(),
            "applied" | "success" | "succeeded" | "completed" | "reverted"
        )
    });
    let status = if success {
        ApplyStatus::Applied
    } else if word == "skipped" {
        ApplyStatus::Skipped
    } else {
        ApplyStatus::Failed
    };
    let revertible = resolve_bool(value, fields::CHANGE_REVERTIBLE)
        .unwrap_or(success && !reverted)
        && success
        && !dry_run
        && real_change_id.is_some();

    ChangeHistoryEntry {
        change_id: real_change_id.clone().unwrap_or_default(),
        real_change_id,
        job_id: resolve_text(value, fields::CHANGE_JOB_ID),
        recommendation_index: resolve_count(value, fields::CHANGE_INDEX),
        status,
        success,
        dry_run,
        applied_at: resolve_datetime(value, fields::CHANGE_APPLIED_AT).unwrap_or(observed_at),
        revertible,
        error: resolve_text(value, fields::CHANGE_ERROR).filter(|_| !success),
        reverted,
        reverted_at: resolve_datetime(value, fields::CHANGE_REVERTED_AT)
            .or_else(|| reverted.then_some(observed_at)),
    }
}

// ── Discovery ────────────────────────────────────────────────────────

/// One device row of a discovery scan; `None` when it carries no address.
pub fn discovered_device(value: &Value) -> Option<DiscoveredDevice> {
    Some(DiscoveredDevice {
        ip: resolve_text(value, fields::DEVICE_IP)?,
        mac: resolve_text(value, fields::DEVICE_MAC),
        hostname: resolve_text(value, fields::DEVICE_HOSTNAME),
        model: resolve_text(value, fields::DEVICE_MODEL),
        device_type: resolve_text(value, fields::DEVICE_TYPE),
        version: resolve_text(value, fields::DEVICE_VERSION),
    })
}
