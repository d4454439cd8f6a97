//! Discovery handler.

use tabled::Tabled;

use netdiag_core::{DiscoveredDevice, DiscoveryService};

use crate::cli::{DiscoverArgs, GlobalOpts};
use crate::error::CliError;
use crate::output;

use super::{Context, util};

// ── Table row ───────────────────────────────────────────────────────

#[derive(Tabled)]
struct DeviceRow {
    #[tabled(rename = "IP")]
    ip: String,
    #[tabled(rename = "Name")]
    name: String,
    #[tabled(rename = "Type")]
    device_type: String,
    #[tabled(rename = "Model")]
    model: String,
    #[tabled(rename = "MAC")]
    mac: String,
    #[tabled(rename = "Version")]
    version: String,
}

impl From<&DiscoveredDevice> for DeviceRow {
    fn from(d: &DiscoveredDevice) -> Self {
        Self {
            ip: d.ip.clone(),
            name: d.label().to_owned(),
            device_type: util::or_dash(d.device_type.as_deref()),
            model: util::or_dash(d.model.as_deref()),
            mac: util::or_dash(d.mac.as_deref()),
            version: util::or_dash(d.version.as_deref()),
        }
    }
}

// ── Handler ─────────────────────────────────────────────────────────

pub async fn handle(ctx: &Context, args: DiscoverArgs, global: &GlobalOpts) -> Result<(), CliError> {
    let spinner = util::spinner("Scanning for controllers...", global.quiet);
    let result = DiscoveryService::new(&ctx.session)
        .discover(args.subnet.as_deref())
        .await;
    spinner.finish_and_clear();
    let report = result?;

    let out = output::render_list(
        &global.output,
        &report.devices,
        |d| DeviceRow::from(d),
        |d| d.ip.clone(),
    );
    output::print_output(&out, global.quiet);
    output::note(
        &format!(
            "{} device(s) found in {} ms",
            report.devices.len(),
            report.scan_duration_ms
        ),
        global.quiet,
    );
    Ok(())
}
