//! JSON leaderboard writer.

use crate::domain::error::BetbenchError;
use crate::domain::leaderboard::Leaderboard;
use crate::ports::report_port::ReportPort;
use std::fs;
use std::path::Path;
use tracing::info;

pub struct JsonReportAdapter;

impl ReportPort for JsonReportAdapter {
    fn write_leaderboard(
        &self,
        leaderboard: &Leaderboard,
        output_path: &str,
    ) -> Result<(), BetbenchError> {
        let json = serde_json::to_string_pretty(leaderboard)?;
        if let Some(parent) = Path::new(output_path).parent().filter(|p| !p.as_os_str().is_empty()) {
            fs::create_dir_all(parent)?;
        }
        fs::write(output_path, json)?;
        info!(path = output_path, entries = leaderboard.entries.len(), "leaderboard written");
        Ok(())
    }
}
