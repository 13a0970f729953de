use std::fmt::Write;

use colored::{ColoredString, Colorize};

use crate::domain::entities::snapshot::{Snapshot, TopProcess};
use crate::domain::value_objects::metric_key::MetricKey;
use crate::domain::value_objects::severity::CRITICAL_FACTOR;
use crate::domain::value_objects::thresholds::ThresholdSet;

const BYTES_PER_MB: f64 = 1_048_576.0;

/// Horizontal gauge of a percentage, colored against `limit` when one is
/// configured.
#[must_use]
pub fn usage_bar(value: f64, limit: Option<f64>, width: usize) -> String {
    let ratio = (value / 100.0).clamp(0.0, 1.0);
    #[allow(
        clippy::cast_precision_loss,
        clippy::cast_possible_truncation,
        clippy::cast_sign_loss
    )]
    let filled = (ratio * width as f64).round() as usize;
    let empty = width.saturating_sub(filled);

    let bar = paint("█".repeat(filled), value, limit);
    format!("{bar}{}", "░".repeat(empty))
}

/// `value` formatted as a percentage: red above the critical level, yellow
/// above the limit, green otherwise. Without a limit, 70/90 are used.
#[must_use]
pub fn colorize_percent(value: f64, limit: Option<f64>) -> ColoredString {
    paint(format!("{value:.1}%"), value, limit)
}

fn paint(text: String, value: f64, limit: Option<f64>) -> ColoredString {
    let (warn, critical) = limit.map_or((70.0, 90.0), |l| (l, l * CRITICAL_FACTOR));
    if value > critical {
        text.red().bold()
    } else if value > warn {
        text.yellow()
    } else {
        text.green()
    }
}

fn section(out: &mut String, title: &str) {
    let _ = writeln!(out, "\n{}", title.bold().cyan());
    let _ = writeln!(out, "{}", "─".repeat(title.chars().count()).cyan());
}

/// Human-readable rate, e.g. `1.5 MB/s`.
#[must_use]
pub fn format_rate(bytes_per_sec: f64) -> String {
    if bytes_per_sec >= BYTES_PER_MB {
        format!("{:.1} MB/s", bytes_per_sec / BYTES_PER_MB)
    } else if bytes_per_sec >= 1024.0 {
        format!("{:.1} KB/s", bytes_per_sec / 1024.0)
    } else {
        format!("{bytes_per_sec:.0} B/s")
    }
}

/// Top processes by CPU as an aligned table.
#[must_use]
#[allow(clippy::cast_precision_loss)]
pub fn format_top_processes(processes: &[TopProcess]) -> String {
    let header = format!("  {:<24} {:>7} {:>10}", "NAME", "CPU%", "RAM(MB)");
    let mut rows = vec![header.clone(), format!("  {}", "─".repeat(header.len() - 2))];
    for p in processes {
        let name: String = p.name.chars().take(23).collect();
        rows.push(format!(
            "  {:<24} {:>7.1} {:>10.0}",
            name,
            p.cpu,
            p.memory as f64 / BYTES_PER_MB
        ));
    }
    rows.join("\n")
}

/// Full text report of a snapshot.
#[must_use]
pub fn render_snapshot(snapshot: &Snapshot, thresholds: &ThresholdSet) -> String {
    let m = &snapshot.metrics;
    let d = &snapshot.details;
    let mut out = String::new();

    let _ = writeln!(
        out,
        "{} {}",
        "hostpulse —".bold().cyan(),
        d.system.hostname.bold()
    );
    let _ = writeln!(
        out,
        "{} {} ({}) · kernel {} · up {:.1} h",
        d.system.distro, d.system.arch, d.system.platform, d.system.kernel, d.system.uptime_hours
    );

    section(&mut out, "CPU");
    let cpu_limit = thresholds.limit(MetricKey::CpuUsage);
    let _ = writeln!(
        out,
        "  {} {}  ({} cores @ {:.2} GHz)",
        usage_bar(m.cpu_usage, cpu_limit, 30),
        colorize_percent(m.cpu_usage, cpu_limit),
        d.cpu_details.cores,
        d.cpu_details.speed_ghz
    );
    let _ = writeln!(
        out,
        "  user {:.1}% · system {:.1}% · idle {:.1}% · iowait {:.1}%",
        d.cpu_details.user_percent,
        d.cpu_details.system_percent,
        d.cpu_details.idle_percent,
        d.cpu_details.iowait_percent
    );
    let _ = writeln!(
        out,
        "  Load average: {:.2} / {:.2} / {:.2}",
        d.system_load.one, d.system_load.five, d.system_load.fifteen
    );

    section(&mut out, "Memory");
    let mem_limit = thresholds.limit(MetricKey::MemoryUsage);
    let _ = writeln!(
        out,
        "  {} {}",
        usage_bar(m.memory_usage, mem_limit, 30),
        colorize_percent(m.memory_usage, mem_limit)
    );
    let _ = writeln!(
        out,
        "  Used {:.2} GB / {:.2} GB (available {:.2} GB)",
        d.memory.used_gb, d.memory.total_gb, d.memory.available_gb
    );

    section(&mut out, "Disk");
    let disk_limit = thresholds.limit(MetricKey::DiskUsage);
    let _ = writeln!(
        out,
        "  {} {} {}",
        d.disk.mount,
        usage_bar(m.disk_usage, disk_limit, 20),
        colorize_percent(m.disk_usage, disk_limit)
    );
    let _ = writeln!(
        out,
        "  Used {:.2} GB / {:.2} GB · {:.0} reads/s · {:.0} writes/s",
        d.disk.used_gb, d.disk.total_gb, snapshot.rates.disk_read_rate, snapshot.rates.disk_write_rate
    );

    section(&mut out, "Network");
    let _ = writeln!(
        out,
        "  {} ↓ {} ↑ {}  ({} errors, {} dropped)",
        d.network.interface,
        format_rate(snapshot.rates.network_rx_rate),
        format_rate(snapshot.rates.network_tx_rate),
        d.network.rx_errors + d.network.tx_errors,
        d.network.rx_dropped + d.network.tx_dropped
    );
    let _ = writeln!(
        out,
        "  {} connections ({} established, {} listening)",
        d.network_connections.count,
        d.network_connections.tcp_established,
        d.network_connections.tcp_listening
    );

    section(&mut out, "Processes");
    let _ = writeln!(
        out,
        "  {} total · {} running · {} sleeping",
        d.processes.count, d.processes.running, d.processes.sleeping
    );
    if !d.processes.top_cpu.is_empty() {
        let _ = writeln!(out, "{}", format_top_processes(&d.processes.top_cpu));
    }

    if let Some(battery) = &d.battery {
        section(&mut out, "Battery");
        let state = if battery.charging {
            "charging".to_string()
        } else if battery.time_remaining > 0.0 {
            format!("{:.0} min left", battery.time_remaining)
        } else {
            "discharging".to_string()
        };
        let _ = writeln!(out, "  {:.0}% · {state}", battery.percent);
    }

    if d.services.total > 0 {
        section(&mut out, "Services");
        let _ = writeln!(
            out,
            "  {} running · {} stopped",
            d.services.running, d.services.stopped
        );
    }

    out
}

#[cfg(test)]
#[allow(clippy::expect_used)]
mod tests {
    use super::*;
    use crate::domain::entities::snapshot::BatteryDetails;
    use crate::domain::services::snapshot_builder;
    use chrono::Utc;
    use colored::control;

    fn disable_colors() {
        control::set_override(false);
    }

    #[test]
    fn usage_bar_bounds() {
        disable_colors();
        assert_eq!(usage_bar(0.0, None, 10), "░".repeat(10));
        assert_eq!(usage_bar(100.0, None, 10), "█".repeat(10));
        assert_eq!(usage_bar(150.0, None, 10), "█".repeat(10));
        let half = usage_bar(50.0, Some(80.0), 10);
        assert!(half.starts_with("█████"));
        assert!(half.ends_with("░░░░░"));
    }

    #[test]
    fn colorize_percent_formats_one_decimal() {
        disable_colors();
        assert_eq!(colorize_percent(42.345, None).to_string(), "42.3%");
    }

    #[test]
    fn rates_scale_units() {
        assert_eq!(format_rate(512.0), "512 B/s");
        assert_eq!(format_rate(2048.0), "2.0 KB/s");
        assert_eq!(format_rate(3.0 * 1_048_576.0), "3.0 MB/s");
    }

    #[test]
    fn top_process_table_truncates_names() {
        let table = format_top_processes(&[TopProcess {
            name: "a-very-long-process-name-that-overflows".to_string(),
            cpu: 12.5,
            memory: 104_857_600,
        }]);
        let lines: Vec<&str> = table.lines().collect();
        assert_eq!(lines.len(), 3);
        assert!(lines[2].contains("a-very-long-process-nam"));
        assert!(!lines[2].contains("overflows"));
        assert!(lines[2].contains("12.5"));
        assert!(lines[2].contains("100"));
    }

    #[test]
    fn render_includes_sections() {
        disable_colors();
        let mut snapshot = snapshot_builder::placeholder(Utc::now());
        snapshot.metrics.cpu_usage = 55.0;
        snapshot.details.battery = Some(BatteryDetails {
            percent: 64.0,
            charging: false,
            time_remaining: 90.0,
        });
        let text = render_snapshot(&snapshot, &ThresholdSet::default());
        for title in ["CPU", "Memory", "Disk", "Network", "Processes", "Battery"] {
            assert!(text.contains(title), "missing section {title}");
        }
        assert!(text.contains("55.0%"));
        assert!(text.contains("90 min left"));
        assert!(!text.contains("Services"));
    }
}
