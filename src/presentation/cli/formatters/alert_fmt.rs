use std::fmt::Write;

use colored::Colorize;

use crate::domain::entities::alert::Alert;
use crate::domain::value_objects::severity::Severity;

fn severity_badge(severity: Severity) -> String {
    let label = format!(" {} ", severity.as_str().to_uppercase());
    match severity {
        Severity::Critical => format!("{}", label.on_red().white().bold()),
        Severity::Warning => format!("{}", label.on_yellow().black().bold()),
    }
}

/// One line per alert, or a healthy notice when there are none.
#[must_use]
pub fn render_alerts(alerts: &[Alert]) -> String {
    if alerts.is_empty() {
        return format!("{}\n", "No threshold breached".green().bold());
    }
    let mut out = String::new();
    for alert in alerts {
        let _ = writeln!(out, "{} {}", severity_badge(alert.severity), alert.message);
    }
    out
}

#[cfg(test)]
#[allow(clippy::expect_used)]
mod tests {
    use super::*;
    use crate::domain::value_objects::metric_key::MetricKey;
    use chrono::Utc;
    use colored::control;

    #[test]
    fn renders_one_line_per_alert() {
        control::set_override(false);
        let alerts = vec![
            Alert::breach(MetricKey::CpuUsage, 85.0, 80.0, Utc::now()),
            Alert::breach(MetricKey::DiskUsage, 99.0, 80.0, Utc::now()),
        ];
        let text = render_alerts(&alerts);
        let lines: Vec<&str> = text.lines().collect();
        assert_eq!(lines.len(), 2);
        assert!(lines[0].starts_with(" WARNING "));
        assert!(lines[1].starts_with(" CRITICAL "));
        assert!(lines[1].contains("DISK USAGE is 99.00%"));
    }

    #[test]
    fn empty_alerts_render_healthy_notice() {
        control::set_override(false);
        assert_eq!(render_alerts(&[]), "No threshold breached\n");
    }
}
