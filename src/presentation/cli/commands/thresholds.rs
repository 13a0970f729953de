use anyhow::bail;
use serde_json::{Map, Number, Value};

use crate::application::services::monitor::MonitorContext;
use crate::domain::value_objects::thresholds::ThresholdSet;

/// Parses `KEY=VALUE` arguments into a partial update. Numeric values
/// become JSON numbers; anything else is passed through as a string and
/// rejected later by validation.
///
/// # Errors
///
/// Returns an error when an argument has no `=`.
pub fn parse_assignments(args: &[String]) -> anyhow::Result<Map<String, Value>> {
    let mut update = Map::new();
    for arg in args {
        let Some((key, raw)) = arg.split_once('=') else {
            bail!("Expected KEY=VALUE, got '{arg}'");
        };
        let raw = raw.trim();
        let value = raw
            .parse::<f64>()
            .ok()
            .and_then(Number::from_f64)
            .map_or_else(|| Value::String(raw.to_string()), Value::Number);
        update.insert(key.trim().to_string(), value);
    }
    Ok(update)
}

fn print_thresholds(thresholds: &ThresholdSet, json: bool) -> anyhow::Result<()> {
    if json {
        println!("{}", serde_json::to_string_pretty(thresholds)?);
    } else {
        for (key, limit) in thresholds.iter() {
            println!("{:<20} {limit}{}", key.as_str(), key.unit());
        }
    }
    Ok(())
}

/// Prints the current thresholds, or applies `updates` first when given.
///
/// # Errors
///
/// Returns an error for malformed arguments or if JSON serialization fails.
pub fn run_thresholds(context: &MonitorContext, updates: &[String], json: bool) -> anyhow::Result<()> {
    if updates.is_empty() {
        return print_thresholds(&context.thresholds(), json);
    }

    let update = parse_assignments(updates)?;
    let outcome = context.update_thresholds(&update);
    for key in &outcome.rejected {
        eprintln!("Rejected: {key}");
    }
    if !json {
        println!(
            "{}",
            if outcome.changed {
                "Thresholds updated:"
            } else {
                "Thresholds unchanged:"
            }
        );
    }
    print_thresholds(&outcome.thresholds, json)
}
