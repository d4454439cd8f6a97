// ── Domain model ──
//
// Canonical types the rest of the workspace works with. Everything here is
// produced by `normalize` from loosely shaped service payloads, so fields
// are always populated (with neutral defaults when the service omitted
// them).

pub mod analysis;
pub mod change;
pub mod discovery;
pub mod history;
pub mod job;
pub mod session;

pub use analysis::{AnalysisResult, ApAnalysis, ClientAnalysis, Finding, HealthScores, Severity};
pub use change::{
    ApplyOutcome, ApplyStatus, ApplySummary, ChangeHistoryEntry, ChangePreview, ChangeResult,
    ChangeState, RevertOutcome, RiskLevel,
};
pub use discovery::{DiscoveredDevice, DiscoveryReport};
pub use history::{AnalysisHistoryRecord, NewHistoryRecord};
pub use job::{AnalysisJob, JobStatus};
pub use session::{CachedCredentials, LoginCredentials, Session};
