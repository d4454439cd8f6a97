//! Analysis job handlers: run, status, wait, results.

use std::fmt::Write as _;
use std::time::Duration;

use futures_util::StreamExt;
use tabled::Tabled;

use netdiag_core::{
    AnalysisJob, AnalysisOrchestrator, AnalysisResult, ApAnalysis, ClientAnalysis, Finding,
    JobStatus, NewHistoryRecord, Severity,
};

use crate::cli::{AnalyzeArgs, AnalyzeCommand, GlobalOpts, OutputFormat, PollArgs};
use crate::error::CliError;
use crate::output;

use super::{Context, util};

// ── Table rows ──────────────────────────────────────────────────────

#[derive(Tabled)]
struct FindingRow {
    #[tabled(rename = "#")]
    index: u32,
    #[tabled(rename = "Severity")]
    severity: String,
    #[tabled(rename = "Category")]
    category: String,
    #[tabled(rename = "Finding")]
    title: String,
    #[tabled(rename = "Devices")]
    devices: String,
}

impl FindingRow {
    fn new(f: &Finding, color: bool) -> Self {
        Self {
            index: f.index,
            severity: output::severity(f.severity, color),
            category: f.category.clone(),
            title: f.title.clone(),
            devices: f.affected_devices.join(", "),
        }
    }
}

#[derive(Tabled)]
struct ApRow {
    #[tabled(rename = "Name")]
    name: String,
    #[tabled(rename = "Model")]
    model: String,
    #[tabled(rename = "Band")]
    band: String,
    #[tabled(rename = "Channel")]
    channel: String,
    #[tabled(rename = "Util %")]
    utilization: String,
    #[tabled(rename = "Clients")]
    clients: u32,
    #[tabled(rename = "Score")]
    score: String,
}

impl ApRow {
    fn new(ap: &ApAnalysis, color: bool) -> Self {
        Self {
            name: ap.name.clone(),
            model: util::or_dash(ap.model.as_deref()),
            band: util::or_dash(ap.band.as_deref()),
            channel: ap.channel.map_or_else(|| "-".into(), |c| c.to_string()),
            utilization: format!("{:.0}", ap.utilization),
            clients: ap.client_count,
            score: output::score(ap.score, color),
        }
    }
}

#[derive(Tabled)]
struct ClientRow {
    #[tabled(rename = "Client")]
    hostname: String,
    #[tabled(rename = "MAC")]
    mac: String,
    #[tabled(rename = "AP")]
    ap: String,
    #[tabled(rename = "Signal")]
    signal: String,
    #[tabled(rename = "Score")]
    score: String,
}

impl ClientRow {
    fn new(c: &ClientAnalysis, color: bool) -> Self {
        Self {
            hostname: c.hostname.clone(),
            mac: util::or_dash(c.mac.as_deref()),
            ap: util::or_dash(c.ap_name.as_deref()),
            signal: c
                .signal_dbm
                .map_or_else(|| "-".into(), |s| format!("{s:.0} dBm")),
            score: output::score(c.score, color),
        }
    }
}

// ── Detail views ────────────────────────────────────────────────────

fn job_detail(job: &AnalysisJob) -> String {
    let mut out = format!(
        "Job:       {}\nStatus:    {}\nProgress:  {}%\nStarted:   {}",
        job.job_id,
        job.status,
        job.progress,
        util::format_time(job.started_at)
    );
    if let Some(done) = job.completed_at {
        let _ = write!(
            out,
            "\nFinished:  {} (took {})",
            util::format_time(done),
            util::format_elapsed(done - job.started_at)
        );
    }
    if let Some(ref err) = job.error {
        let _ = write!(out, "\nError:     {err}");
    }
    out
}

fn result_detail(result: &AnalysisResult, detail: bool, color: bool) -> String {
    let h = &result.health;
    let mut out = String::new();
    let _ = writeln!(out, "Job:       {}", result.job_id);
    let _ = writeln!(out, "Analyzed:  {}", util::format_time(result.timestamp));
    let _ = writeln!(
        out,
        "Health:    {} (wireless {}, wired {}, latency {}, coverage {})",
        output::score(h.overall, color),
        output::score(h.wireless, color),
        output::score(h.wired, color),
        output::score(h.latency, color),
        output::score(h.coverage, color),
    );
    let _ = writeln!(
        out,
        "Devices:   {} access points, {} clients",
        result.ap_count, result.client_count
    );
    let _ = writeln!(
        out,
        "Findings:  {} critical, {} warning, {} info",
        result.count_by_severity(Severity::Critical),
        result.count_by_severity(Severity::Warning),
        result.count_by_severity(Severity::Info),
    );
    if !result.summary.is_empty() {
        let _ = writeln!(out, "\n{}", result.summary);
    }

    if !result.findings.is_empty() {
        let rows: Vec<FindingRow> = result
            .findings
            .iter()
            .map(|f| FindingRow::new(f, color))
            .collect();
        let _ = write!(out, "\n{}", output::render_table(&rows));
    }

    if detail {
        if !result.aps.is_empty() {
            let rows: Vec<ApRow> = result.aps.iter().map(|a| ApRow::new(a, color)).collect();
            let _ = write!(out, "\n\nAccess points\n{}", output::render_table(&rows));
        }
        if !result.clients.is_empty() {
            let rows: Vec<ClientRow> = result
                .clients
                .iter()
                .map(|c| ClientRow::new(c, color))
                .collect();
            let _ = write!(out, "\n\nClients\n{}", output::render_table(&rows));
        }
        for f in result.findings.iter().filter(|f| !f.description.is_empty()) {
            let _ = write!(out, "\n\n[{}] {}\n{}", f.index, f.title, f.description);
        }
    }

    out.trim_end().to_owned()
}

// ── Waiting ─────────────────────────────────────────────────────────

/// Drive the orchestrator's poll stream until the job finishes.
async fn wait_for_job(
    ctx: &Context,
    orchestrator: &AnalysisOrchestrator,
    job_id: &str,
    poll: &PollArgs,
    global: &GlobalOpts,
) -> Result<AnalysisJob, CliError> {
    let defaults = &ctx.config.defaults;
    let interval = Duration::from_secs(
        poll.interval
            .unwrap_or(defaults.poll_interval_secs)
            .max(1),
    );
    let max_attempts = poll.max_attempts.unwrap_or(defaults.max_poll_attempts).max(1);

    let spinner = util::spinner(&format!("Waiting for job {job_id}..."), global.quiet);
    let mut stream = orchestrator.poll(job_id, max_attempts);
    let mut last = None;
    let mut attempts = 0;

    while let Some(snapshot) = stream.next().await {
        attempts += 1;
        let job = match snapshot {
            Ok(job) => job,
            Err(e) => {
                spinner.finish_and_clear();
                return Err(e.into());
            }
        };
        spinner.set_message(format!("Job {job_id}: {} ({}%)", job.status, job.progress));
        let terminal = job.status.is_terminal();
        last = Some(job);
        if terminal {
            break;
        }
        if attempts < max_attempts {
            tokio::time::sleep(interval).await;
        }
    }
    spinner.finish_and_clear();

    match last {
        Some(job) if job.status == JobStatus::Completed => Ok(job),
        Some(job) if job.status == JobStatus::Failed => Err(CliError::JobFailed {
            job_id: job_id.into(),
            message: job.error.unwrap_or_else(|| "no reason given".into()),
        }),
        _ => Err(CliError::JobStillRunning {
            job_id: job_id.into(),
            attempts: max_attempts,
        }),
    }
}

/// Fetch, print and optionally save the results of a job.
async fn show_results(
    orchestrator: &AnalysisOrchestrator,
    job_id: &str,
    save: bool,
    detail: bool,
    global: &GlobalOpts,
) -> Result<(), CliError> {
    let result = orchestrator.get_results(job_id).await?;
    let color = output::should_color(&global.color);

    let out = match global.output {
        OutputFormat::Table => result_detail(&result, detail, color),
        _ => output::render_single(&global.output, &result, |_| String::new(), |r| {
            format!("{:.0}", r.health.overall)
        }),
    };
    output::print_output(&out, global.quiet);

    if save {
        let record = util::open_history()?.save(&NewHistoryRecord::from_result(&result))?;
        output::note(&format!("Saved to history as #{}", record.id), global.quiet);
    }
    Ok(())
}

// ── Handler ─────────────────────────────────────────────────────────

pub async fn handle(ctx: &Context, args: AnalyzeArgs, global: &GlobalOpts) -> Result<(), CliError> {
    util::require_session(&ctx.session).await?;
    let orchestrator = AnalysisOrchestrator::new(&ctx.session);

    match args.command {
        AnalyzeCommand::Run { wait, save, poll } => {
            let job = orchestrator.run_analysis().await?;

            if !(wait || save) {
                let out = output::render_single(&global.output, &job, job_detail, |j| {
                    j.job_id.clone()
                });
                output::print_output(&out, global.quiet);
                return Ok(());
            }

            output::note(&format!("Started analysis job {}", job.job_id), global.quiet);
            wait_for_job(ctx, &orchestrator, &job.job_id, &poll, global).await?;
            show_results(&orchestrator, &job.job_id, save, false, global).await
        }

        AnalyzeCommand::Status { job_id } => {
            let job = orchestrator.get_status(&job_id).await?;
            let out = output::render_single(&global.output, &job, job_detail, |j| {
                j.status.to_string()
            });
            output::print_output(&out, global.quiet);
            Ok(())
        }

        AnalyzeCommand::Wait { job_id, poll } => {
            let job = wait_for_job(ctx, &orchestrator, &job_id, &poll, global).await?;
            let out = output::render_single(&global.output, &job, job_detail, |j| {
                j.status.to_string()
            });
            output::print_output(&out, global.quiet);
            Ok(())
        }

        AnalyzeCommand::Results {
            job_id,
            save,
            detail,
        } => show_results(&orchestrator, &job_id, save, detail, global).await,
    }
}
