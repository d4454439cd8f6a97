//! Local analysis history handlers.

use tabled::Tabled;

use netdiag_core::AnalysisHistoryRecord;

use crate::cli::{GlobalOpts, HistoryArgs, HistoryCommand};
use crate::error::CliError;
use crate::output;

use super::util;

// ── Table row ───────────────────────────────────────────────────────

#[derive(Tabled)]
struct HistoryRow {
    #[tabled(rename = "ID")]
    id: i64,
    #[tabled(rename = "When")]
    when: String,
    #[tabled(rename = "Job")]
    job_id: String,
    #[tabled(rename = "Health")]
    health: String,
    #[tabled(rename = "APs")]
    aps: u32,
    #[tabled(rename = "Clients")]
    clients: u32,
}

impl HistoryRow {
    fn new(r: &AnalysisHistoryRecord, color: bool) -> Self {
        Self {
            id: r.id,
            when: util::format_time(r.timestamp),
            job_id: r.job_id.clone(),
            health: output::score(r.health_score, color),
            aps: r.ap_count,
            clients: r.client_count,
        }
    }
}

fn record_detail(r: &AnalysisHistoryRecord, color: bool) -> String {
    let mut out = format!(
        "ID:        {}\nJob:       {}\nWhen:      {}\nHealth:    {}\nDevices:   {} access points, {} clients",
        r.id,
        r.job_id,
        util::format_time(r.timestamp),
        output::score(r.health_score, color),
        r.ap_count,
        r.client_count
    );
    if !r.summary.is_empty() {
        out.push_str("\n\n");
        out.push_str(&r.summary);
    }
    out
}

fn not_found(id: i64) -> CliError {
    CliError::NotFound {
        resource_type: "history entry".into(),
        identifier: id.to_string(),
        list_command: "history list".into(),
    }
}

// ── Handler ─────────────────────────────────────────────────────────

pub fn handle(args: HistoryArgs, global: &GlobalOpts) -> Result<(), CliError> {
    let cache = util::open_history()?;
    let color = output::should_color(&global.color);

    match args.command {
        HistoryCommand::List { limit } => {
            let mut records = cache.list()?;
            if let Some(limit) = limit {
                records.truncate(limit);
            }
            let out = output::render_list(
                &global.output,
                &records,
                |r| HistoryRow::new(r, color),
                |r| r.id.to_string(),
            );
            output::print_output(&out, global.quiet);
            Ok(())
        }

        HistoryCommand::Show { id } => {
            let record = cache.get(id)?.ok_or_else(|| not_found(id))?;
            let out = output::render_single(
                &global.output,
                &record,
                |r| record_detail(r, color),
                |r| r.job_id.clone(),
            );
            output::print_output(&out, global.quiet);
            Ok(())
        }

        HistoryCommand::Delete { id } => {
            if !util::confirm(&format!("Delete history entry #{id}?"), global.yes)? {
                return Ok(());
            }
            if !cache.delete(id)? {
                return Err(not_found(id));
            }
            output::note(&format!("Deleted history entry #{id}"), global.quiet);
            Ok(())
        }
    }
}
