//! Change workflow handlers: preview, apply, revert, history.

use serde_json::Value;
use tabled::Tabled;

use netdiag_core::{ChangePreview, ChangeResult, ChangeWorkflow, RevertOutcome};

use crate::cli::{ChangesArgs, ChangesCommand, GlobalOpts, OutputFormat};
use crate::error::CliError;
use crate::output;

use super::{Context, util};

// ── Table rows ──────────────────────────────────────────────────────

#[derive(Tabled)]
struct PreviewRow {
    #[tabled(rename = "#")]
    index: u32,
    #[tabled(rename = "Device")]
    device: String,
    #[tabled(rename = "Setting")]
    setting: String,
    #[tabled(rename = "Current")]
    current: String,
    #[tabled(rename = "Proposed")]
    proposed: String,
    #[tabled(rename = "Risk")]
    risk: String,
}

impl PreviewRow {
    fn new(p: &ChangePreview, color: bool) -> Self {
        Self {
            index: p.recommendation_index,
            device: if p.device_name.is_empty() {
                "-".into()
            } else {
                p.device_name.clone()
            },
            setting: p.setting.clone(),
            current: setting_value(&p.current_value),
            proposed: setting_value(&p.proposed_value),
            risk: output::risk(p.risk, color),
        }
    }
}

#[derive(Tabled)]
struct ChangeRow {
    #[tabled(rename = "Change")]
    change_id: String,
    #[tabled(rename = "Job")]
    job_id: String,
    #[tabled(rename = "#")]
    index: String,
    #[tabled(rename = "State")]
    state: String,
    #[tabled(rename = "Applied")]
    applied_at: String,
    #[tabled(rename = "Revertible")]
    revertible: String,
    #[tabled(rename = "Note")]
    note: String,
}

impl From<&ChangeResult> for ChangeRow {
    fn from(c: &ChangeResult) -> Self {
        let mut state = c.state().to_string();
        if c.dry_run {
            state.push_str(" (dry run)");
        }
        Self {
            change_id: c.change_id.clone(),
            job_id: util::or_dash(c.job_id.as_deref()),
            index: c
                .recommendation_index
                .map_or_else(|| "-".into(), |i| i.to_string()),
            state,
            applied_at: util::format_time(c.applied_at),
            revertible: if c.can_revert() { "yes" } else { "no" }.into(),
            note: c
                .error
                .clone()
                .or_else(|| c.reverted_at.map(|at| format!("reverted {}", util::format_time(at))))
                .unwrap_or_default(),
        }
    }
}

/// Setting values arrive as JSON scalars; show strings without quotes.
fn setting_value(value: &Value) -> String {
    match value {
        Value::Null => "-".into(),
        Value::String(s) => s.clone(),
        other => other.to_string(),
    }
}

fn render_changes(changes: &[ChangeResult], global: &GlobalOpts) {
    let out = output::render_list(&global.output, changes, |c| ChangeRow::from(c), |c| {
        c.change_id.clone()
    });
    output::print_output(&out, global.quiet);
}

// ── Handler ─────────────────────────────────────────────────────────

pub async fn handle(ctx: &Context, args: ChangesArgs, global: &GlobalOpts) -> Result<(), CliError> {
    util::require_session(&ctx.session).await?;
    let workflow = ChangeWorkflow::new(&ctx.session);
    let color = output::should_color(&global.color);

    match args.command {
        ChangesCommand::Preview { job_id, ids } => {
            let previews = workflow.preview(&job_id, &ids).await?;
            let out = output::render_list(
                &global.output,
                &previews,
                |p| PreviewRow::new(p, color),
                |p| p.change_id.clone(),
            );
            output::print_output(&out, global.quiet);
            if matches!(global.output, OutputFormat::Table) {
                for p in previews.iter().filter(|p| !p.description.is_empty()) {
                    output::note(
                        &format!("[{}] {}", p.recommendation_index, p.description),
                        global.quiet,
                    );
                }
            }
            Ok(())
        }

        ChangesCommand::Apply {
            job_id,
            ids,
            dry_run,
        } => {
            if !dry_run
                && !util::confirm(
                    &format!(
                        "Apply {} recommendation(s) from job {job_id} to the network?",
                        ids.len()
                    ),
                    global.yes,
                )?
            {
                return Ok(());
            }

            let outcome = workflow.apply(&job_id, &ids, dry_run).await?;
            match global.output {
                OutputFormat::Table | OutputFormat::Plain => {
                    render_changes(&outcome.results, global);
                }
                _ => {
                    let out = output::render_single(
                        &global.output,
                        &outcome,
                        |_| String::new(),
                        |_| String::new(),
                    );
                    output::print_output(&out, global.quiet);
                }
            }

            let s = outcome.summary;
            output::note(
                &format!(
                    "{}{} applied, {} failed, {} skipped",
                    if s.dry_run { "Dry run: " } else { "" },
                    s.applied,
                    s.failed,
                    s.skipped
                ),
                global.quiet,
            );
            Ok(())
        }

        ChangesCommand::Revert { change_id } => {
            if !util::confirm(&format!("Revert change {change_id}?"), global.yes)? {
                return Ok(());
            }

            let outcome = workflow.revert(&change_id).await?;
            let out = output::render_single(
                &global.output,
                &outcome,
                |o| match o {
                    RevertOutcome::Reverted(c) => format!("Change {} reverted", c.change_id),
                    RevertOutcome::AlreadyReverted(c) => {
                        format!("Change {} was already reverted", c.change_id)
                    }
                    RevertOutcome::Failed(c) => format!(
                        "Change {} was not reverted: {}",
                        c.change_id,
                        c.error.as_deref().unwrap_or("unknown reason")
                    ),
                },
                |o| o.change().change_id.clone(),
            );
            output::print_output(&out, global.quiet);

            if let RevertOutcome::Failed(c) = outcome {
                return Err(CliError::ApiError {
                    status: None,
                    message: c
                        .error
                        .unwrap_or_else(|| format!("revert of {} was refused", c.change_id)),
                });
            }
            Ok(())
        }

        ChangesCommand::History => {
            let changes = workflow.history().await?;
            render_changes(&changes, global);
            Ok(())
        }

        ChangesCommand::Revertable => {
            let changes = workflow.revertable().await?;
            render_changes(&changes, global);
            Ok(())
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn setting_values_are_unquoted() {
        assert_eq!(setting_value(&json!("auto")), "auto");
        assert_eq!(setting_value(&json!(11)), "11");
        assert_eq!(setting_value(&Value::Null), "-");
    }
}
