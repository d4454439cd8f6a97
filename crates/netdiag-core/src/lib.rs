//! Client-side orchestration for the netdiag analysis service.
//!
//! This crate owns the business logic between `netdiag-api` (raw HTTP) and
//! the CLI:
//!
//! - **[`SessionManager`]**: login, logout, token validation and restore.
//!   It is registered as the api client's 401 interceptor, so a rejected
//!   token anywhere tears the session down exactly once.
//!
//! - **[`DiscoveryService`]**: subnet scan for candidate controllers.
//!
//! - **[`AnalysisOrchestrator`]**: submits analysis jobs, reads status
//!   snapshots (never backwards), exposes a lazy, timer-free poll stream,
//!   and fetches normalized results.
//!
//! - **[`ChangeWorkflow`]**: preview, apply (optionally as a dry run) and
//!   revert configuration changes, backed by a local ledger that keeps
//!   reverts idempotent and dry runs unrevertible.
//!
//! - **[`HistoryCache`]**: SQLite store of past analysis summaries.
//!
//! - **[`normalize`]**: pure mapping from the service's loosely shaped JSON
//!   into the domain [`model`].

pub mod analysis;
pub mod cache;
pub mod changes;
pub mod config;
pub mod discovery;
pub mod error;
pub mod model;
pub mod normalize;
pub mod session;

// ── Primary re-exports ──────────────────────────────────────────────
pub use analysis::{AnalysisOrchestrator, JobPoll};
pub use cache::HistoryCache;
pub use changes::ChangeWorkflow;
pub use config::{ClientConfig, TlsVerification};
pub use discovery::DiscoveryService;
pub use error::CoreError;
pub use session::{MemorySessionStore, SessionManager, SessionStore, StoredToken};

// Re-export model types at the crate root for ergonomics.
pub use model::{
    AnalysisHistoryRecord, AnalysisJob, AnalysisResult, ApAnalysis, ApplyOutcome, ApplyStatus,
    ApplySummary, CachedCredentials, ChangeHistoryEntry, ChangePreview, ChangeResult, ChangeState,
    ClientAnalysis, DiscoveredDevice, DiscoveryReport, Finding, HealthScores, JobStatus,
    LoginCredentials, NewHistoryRecord, RevertOutcome, RiskLevel, Session, Severity,
};
