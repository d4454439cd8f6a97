// ── Discovery service ──
//
// Stateless subnet scan for candidate controllers. Works with or without a
// session; the token is attached when one is held.

use tracing::info;

use crate::error::CoreError;
use crate::model::{DiscoveredDevice, DiscoveryReport};
use crate::normalize;
use crate::session::SessionManager;

#[derive(Debug, Clone)]
pub struct DiscoveryService {
    session: SessionManager,
}

impl DiscoveryService {
    pub fn new(session: &SessionManager) -> Self {
        Self {
            session: session.clone(),
        }
    }

    /// Scan `subnet` (or the service's default range) for controllers.
    ///
    /// An empty scan is an empty report, never an error. Rows without an
    /// address are dropped.
    pub async fn discover(&self, subnet: Option<&str>) -> Result<DiscoveryReport, CoreError> {
        let resp = self.session.api().discover(subnet).await?;

        let devices: Vec<DiscoveredDevice> = resp
            .devices
            .iter()
            .filter_map(normalize::discovered_device)
            .collect();

        info!(
            count = devices.len(),
            scan_duration_ms = resp.scan_duration_ms,
            "discovery scan finished"
        );

        Ok(DiscoveryReport {
            devices,
            scan_duration_ms: resp.scan_duration_ms,
        })
    }
}
