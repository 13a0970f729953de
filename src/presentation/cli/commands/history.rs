use std::fmt::Write;

use anyhow::anyhow;

use crate::application::services::monitor::MonitorContext;
use crate::domain::value_objects::history::{HistoricalMetric, HistoricalPoint, TimeRange};

/// Aligned `timestamp [field] value` lines.
#[must_use]
pub fn format_points(points: &[HistoricalPoint]) -> String {
    let mut out = String::new();
    for point in points {
        let time = point.timestamp.format("%Y-%m-%d %H:%M:%S");
        let _ = match &point.field {
            Some(field) => writeln!(out, "{time}  {field:<14} {:>10.2}", point.value),
            None => writeln!(out, "{time}  {:>10.2}", point.value),
        };
    }
    out
}

/// # Errors
///
/// Returns an error for an unknown metric or a malformed range, or if JSON
/// serialization fails.
pub async fn run_history(
    context: &MonitorContext,
    metric: &str,
    range: Option<&str>,
    json: bool,
) -> anyhow::Result<()> {
    let parsed: HistoricalMetric = metric.parse().map_err(|e| anyhow!("{e}"))?;
    let range = range.unwrap_or(TimeRange::DEFAULT);
    range.parse::<TimeRange>().map_err(|e| anyhow!("{e}"))?;

    let points = context.historical_data(parsed.as_str(), range).await;

    if json {
        println!("{}", serde_json::to_string_pretty(&points)?);
        return Ok(());
    }
    if points.is_empty() {
        println!("No samples for {metric} in the last {range}");
        return Ok(());
    }
    println!("{metric} — last {range} ({} samples)", points.len());
    print!("{}", format_points(&points));
    Ok(())
}
