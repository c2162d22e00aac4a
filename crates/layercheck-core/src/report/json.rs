use std::path::Path;

use super::RunReport;

pub const REPORT_SCHEMA_VERSION: u32 = 1;

pub fn to_json(run: &RunReport) -> serde_json::Value {
    serde_json::json!({
        "schema_version": REPORT_SCHEMA_VERSION,
        "fixtures": run.fixtures,
        "totals": run.totals,
        "avg_inversion_rate": run.totals.avg_inversion_rate(),
    })
}

pub fn write_json(run: &RunReport, out: &Path) -> anyhow::Result<()> {
    if let Some(parent) = out.parent().filter(|p| !p.as_os_str().is_empty()) {
        std::fs::create_dir_all(parent)?;
    }
    std::fs::write(out, serde_json::to_string_pretty(&to_json(run))?)?;
    Ok(())
}
