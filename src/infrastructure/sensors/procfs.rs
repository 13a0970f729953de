//! Readings the `sysinfo` crate does not expose: TCP connection states,
//! disk operation counters, the CPU time split, interface drop counters,
//! battery and systemd services.
//!
//! Parsers take file contents so they can be tested anywhere; the readers
//! touching `/proc` and `/sys` are Linux-only and report an error elsewhere.

use crate::domain::entities::reading::{BatteryReading, ConnectionReading, ServiceReading};

/// Kernel TCP state codes from `include/net/tcp_states.h`.
fn tcp_state_name(code: &str) -> &'static str {
    match code {
        "01" => "ESTABLISHED",
        "02" => "SYN_SENT",
        "03" => "SYN_RECV",
        "04" => "FIN_WAIT1",
        "05" => "FIN_WAIT2",
        "06" => "TIME_WAIT",
        "07" => "CLOSE",
        "08" => "CLOSE_WAIT",
        "09" => "LAST_ACK",
        "0A" => "LISTEN",
        "0B" => "CLOSING",
        _ => "UNKNOWN",
    }
}

/// Parses `/proc/net/tcp` or `/proc/net/tcp6`.
#[must_use]
pub fn parse_tcp_table(content: &str) -> Vec<ConnectionReading> {
    content
        .lines()
        .skip(1)
        .filter_map(|line| line.split_whitespace().nth(3))
        .map(|code| ConnectionReading {
            state: tcp_state_name(&code.to_ascii_uppercase()).to_string(),
        })
        .collect()
}

/// Completed read and write operations summed over whole disks.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct DiskOps {
    pub reads: u64,
    pub writes: u64,
}

/// Parses `/proc/diskstats`, keeping only devices accepted by `is_disk`
/// so partitions are not counted twice.
pub fn parse_diskstats(content: &str, is_disk: impl Fn(&str) -> bool) -> DiskOps {
    content
        .lines()
        .filter_map(|line| {
            let fields: Vec<&str> = line.split_whitespace().collect();
            let name = *fields.get(2)?;
            if !is_disk(name) {
                return None;
            }
            let reads = fields.get(3)?.parse::<u64>().ok()?;
            let writes = fields.get(7)?.parse::<u64>().ok()?;
            Some(DiskOps { reads, writes })
        })
        .fold(DiskOps::default(), |acc, ops| DiskOps {
            reads: acc.reads.saturating_add(ops.reads),
            writes: acc.writes.saturating_add(ops.writes),
        })
}

/// Virtual block devices that never represent real disk traffic.
#[must_use]
pub fn is_virtual_block_device(name: &str) -> bool {
    name.starts_with("loop") || name.starts_with("ram") || name.starts_with("zram")
}

/// Aggregate CPU jiffies from the first line of `/proc/stat`.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct CpuTimes {
    pub user: u64,
    pub nice: u64,
    pub system: u64,
    pub idle: u64,
    pub iowait: u64,
    pub irq: u64,
    pub softirq: u64,
    pub steal: u64,
}

impl CpuTimes {
    fn total(&self) -> u64 {
        self.user
            + self.nice
            + self.system
            + self.idle
            + self.iowait
            + self.irq
            + self.softirq
            + self.steal
    }
}

#[must_use]
pub fn parse_cpu_times(content: &str) -> Option<CpuTimes> {
    let line = content.lines().find(|l| l.starts_with("cpu "))?;
    let values: Vec<u64> = line
        .split_whitespace()
        .skip(1)
        .map(str::parse)
        .collect::<Result<_, _>>()
        .ok()?;
    let at = |i: usize| values.get(i).copied().unwrap_or(0);
    Some(CpuTimes {
        user: at(0),
        nice: at(1),
        system: at(2),
        idle: at(3),
        iowait: at(4),
        irq: at(5),
        softirq: at(6),
        steal: at(7),
    })
}

/// Share of CPU time per category between two samples, in percent.
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct CpuSplit {
    pub user: f64,
    pub system: f64,
    pub idle: f64,
    pub iowait: f64,
}

#[must_use]
#[allow(clippy::cast_precision_loss)]
pub fn cpu_split(previous: &CpuTimes, current: &CpuTimes) -> CpuSplit {
    let total = current.total().saturating_sub(previous.total());
    if total == 0 {
        return CpuSplit::default();
    }
    let pct = |now: u64, before: u64| now.saturating_sub(before) as f64 / total as f64 * 100.0;
    CpuSplit {
        user: pct(current.user + current.nice, previous.user + previous.nice),
        system: pct(
            current.system + current.irq + current.softirq,
            previous.system + previous.irq + previous.softirq,
        ),
        idle: pct(current.idle, previous.idle),
        iowait: pct(current.iowait, previous.iowait),
    }
}

/// Parses `systemctl list-units --type=service --all --no-legend --plain`.
#[must_use]
pub fn parse_service_units(output: &str) -> Vec<ServiceReading> {
    output
        .lines()
        .filter_map(|line| {
            let mut cols = line.split_whitespace();
            let unit = cols.next()?;
            let sub = cols.nth(2)?;
            Some(ServiceReading {
                name: unit.trim_end_matches(".service").to_string(),
                running: sub == "running",
            })
        })
        .collect()
}

/// Builds a battery reading from the `capacity`, `status` and optional
/// `energy_now`/`power_now` attributes of a power supply.
#[must_use]
#[allow(clippy::cast_precision_loss)]
pub fn battery_from_attrs(
    capacity: &str,
    status: &str,
    energy_now: Option<&str>,
    power_now: Option<&str>,
) -> Option<BatteryReading> {
    let percent: f64 = capacity.trim().parse().ok()?;
    let charging = status.trim().eq_ignore_ascii_case("charging");
    let energy = energy_now.and_then(|v| v.trim().parse::<u64>().ok());
    let power = power_now.and_then(|v| v.trim().parse::<u64>().ok());
    let time_remaining = match (charging, energy, power) {
        (false, Some(energy), Some(power)) if power > 0 => {
            (energy as f64 / power as f64 * 60.0).round()
        }
        _ => 0.0,
    };
    Some(BatteryReading {
        percent,
        charging,
        time_remaining,
    })
}

#[cfg(target_os = "linux")]
mod linux {
    use std::path::Path;
    use std::process::Command;

    use super::{
        BatteryReading, ConnectionReading, CpuTimes, DiskOps, ServiceReading, battery_from_attrs,
        is_virtual_block_device, parse_cpu_times, parse_diskstats, parse_service_units,
        parse_tcp_table,
    };

    fn read(path: impl AsRef<Path>) -> Result<String, String> {
        let path = path.as_ref();
        std::fs::read_to_string(path).map_err(|e| format!("{}: {e}", path.display()))
    }

    fn read_opt(path: impl AsRef<Path>) -> Option<String> {
        std::fs::read_to_string(path).ok()
    }

    pub fn connections() -> Result<Vec<ConnectionReading>, String> {
        let mut all = parse_tcp_table(&read("/proc/net/tcp")?);
        if let Some(v6) = read_opt("/proc/net/tcp6") {
            all.extend(parse_tcp_table(&v6));
        }
        Ok(all)
    }

    pub fn disk_ops() -> Result<DiskOps, String> {
        let content = read("/proc/diskstats")?;
        let disks: Vec<String> = std::fs::read_dir("/sys/block")
            .map_err(|e| format!("/sys/block: {e}"))?
            .filter_map(Result::ok)
            .map(|entry| entry.file_name().to_string_lossy().into_owned())
            .filter(|name| !is_virtual_block_device(name))
            .collect();
        Ok(parse_diskstats(&content, |name| {
            disks.iter().any(|d| d == name)
        }))
    }

    pub fn cpu_times() -> Result<CpuTimes, String> {
        parse_cpu_times(&read("/proc/stat")?).ok_or_else(|| "/proc/stat: no cpu line".to_string())
    }

    pub fn interface_drops(name: &str) -> (u64, u64) {
        let counter = |file: &str| {
            read_opt(format!("/sys/class/net/{name}/statistics/{file}"))
                .and_then(|v| v.trim().parse().ok())
                .unwrap_or(0)
        };
        (counter("rx_dropped"), counter("tx_dropped"))
    }

    pub fn battery() -> Result<Option<BatteryReading>, String> {
        let Ok(entries) = std::fs::read_dir("/sys/class/power_supply") else {
            return Ok(None);
        };
        let mut supplies: Vec<_> = entries
            .filter_map(Result::ok)
            .map(|entry| entry.path())
            .filter(|path| {
                path.file_name()
                    .is_some_and(|n| n.to_string_lossy().starts_with("BAT"))
            })
            .collect();
        supplies.sort();
        let Some(dir) = supplies.first() else {
            return Ok(None);
        };
        let capacity = read(dir.join("capacity"))?;
        let status = read_opt(dir.join("status")).unwrap_or_default();
        let energy = read_opt(dir.join("energy_now"));
        let power = read_opt(dir.join("power_now"));
        Ok(battery_from_attrs(
            &capacity,
            &status,
            energy.as_deref(),
            power.as_deref(),
        ))
    }

    pub fn services() -> Result<Vec<ServiceReading>, String> {
        let output = Command::new("systemctl")
            .args([
                "list-units",
                "--type=service",
                "--all",
                "--no-legend",
                "--plain",
                "--no-pager",
            ])
            .output()
            .map_err(|e| format!("systemctl: {e}"))?;
        if !output.status.success() {
            return Err(format!("systemctl exited with {}", output.status));
        }
        Ok(parse_service_units(&String::from_utf8_lossy(&output.stdout)))
    }
}

#[cfg(not(target_os = "linux"))]
mod linux {
    use super::{BatteryReading, ConnectionReading, CpuTimes, DiskOps, ServiceReading};

    const UNSUPPORTED: &str = "not supported on this platform";

    pub fn connections() -> Result<Vec<ConnectionReading>, String> {
        Err(UNSUPPORTED.to_string())
    }

    pub fn disk_ops() -> Result<DiskOps, String> {
        Err(UNSUPPORTED.to_string())
    }

    pub fn cpu_times() -> Result<CpuTimes, String> {
        Err(UNSUPPORTED.to_string())
    }

    pub fn interface_drops(_name: &str) -> (u64, u64) {
        (0, 0)
    }

    pub fn battery() -> Result<Option<BatteryReading>, String> {
        Err(UNSUPPORTED.to_string())
    }

    pub fn services() -> Result<Vec<ServiceReading>, String> {
        Err(UNSUPPORTED.to_string())
    }
}

pub use linux::{battery, connections, cpu_times, disk_ops, interface_drops, services};
