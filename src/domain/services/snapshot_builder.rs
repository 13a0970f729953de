use std::cmp::Ordering;

use chrono::{DateTime, Utc};

use crate::domain::entities::reading::{
    FilesystemReading, InterfaceReading, NormalizedReadings, ProcessReading,
};
use crate::domain::entities::snapshot::{
    BatteryDetails, ConnectionDetails, CpuDetails, Details, DiskDetails, DiskIoDetails,
    HeadlineMetrics, MemoryDetails, NetworkDetails, ProcessDetails, Rates, ServiceDetails,
    Snapshot, SystemDetails, SystemLoad, TopProcess,
};

use super::rate_tracker::CycleRates;

const BYTES_PER_GB: f64 = 1_073_741_824.0;
/// Bytes assumed per disk operation when estimating throughput.
const DISK_BLOCK_BYTES: f64 = 4096.0;
const TOP_PROCESSES: usize = 5;
const ROOT_MOUNTS: &[&str] = &["/", "C:", "C:\\"];

fn round2(value: f64) -> f64 {
    (value * 100.0).round() / 100.0
}

#[allow(clippy::cast_precision_loss)]
fn to_gb(bytes: u64) -> f64 {
    round2(bytes as f64 / BYTES_PER_GB)
}

fn count<T>(items: &[T], pred: impl Fn(&T) -> bool) -> u64 {
    items.iter().filter(|item| pred(*item)).count() as u64
}

/// Primary interface: the first non-loopback interface in reported order,
/// else the first interface reported.
#[must_use]
pub fn primary_interface(interfaces: &[InterfaceReading]) -> Option<&InterfaceReading> {
    interfaces
        .iter()
        .find(|iface| !iface.is_loopback())
        .or_else(|| interfaces.first())
}

/// Filesystem mounted at the root, else the first one reported.
#[must_use]
pub fn root_filesystem(filesystems: &[FilesystemReading]) -> Option<&FilesystemReading> {
    filesystems
        .iter()
        .find(|fs| ROOT_MOUNTS.contains(&fs.mount.as_str()))
        .or_else(|| filesystems.first())
}

fn top_by_cpu(processes: &[ProcessReading]) -> Vec<TopProcess> {
    let mut sorted: Vec<&ProcessReading> = processes.iter().collect();
    sorted.sort_by(|a, b| {
        b.cpu_percent
            .partial_cmp(&a.cpu_percent)
            .unwrap_or(Ordering::Equal)
    });
    sorted
        .into_iter()
        .take(TOP_PROCESSES)
        .map(|p| TopProcess {
            name: p.name.clone(),
            cpu: p.cpu_percent,
            memory: p.memory_bytes,
        })
        .collect()
}

#[allow(clippy::cast_precision_loss)]
fn memory_details(readings: &NormalizedReadings) -> (f64, MemoryDetails) {
    let mem = &readings.memory;
    let usage = (mem.used_bytes as f64 / mem.total_bytes.max(1) as f64 * 10_000.0).round() / 100.0;
    let details = MemoryDetails {
        total_gb: to_gb(mem.total_bytes),
        used_gb: to_gb(mem.used_bytes),
        free_gb: to_gb(mem.total_bytes.saturating_sub(mem.used_bytes)),
        available_gb: to_gb(mem.available_bytes),
    };
    (usage, details)
}

#[allow(clippy::cast_precision_loss)]
fn disk_details(readings: &NormalizedReadings) -> DiskDetails {
    let Some(root) = root_filesystem(&readings.filesystems) else {
        return DiskDetails::default();
    };
    let usage = (root.used_bytes as f64 / root.size_bytes.max(1) as f64 * 100.0).round();
    let available_gb = if root.size_bytes > 0 && root.used_bytes > 0 {
        to_gb(root.size_bytes.saturating_sub(root.used_bytes))
    } else {
        0.0
    };
    DiskDetails {
        usage_percent: usage,
        total_gb: to_gb(root.size_bytes),
        used_gb: to_gb(root.used_bytes),
        available_gb,
        mount: root.mount.clone(),
    }
}

fn network_details(readings: &NormalizedReadings) -> NetworkDetails {
    primary_interface(&readings.interfaces).map_or_else(NetworkDetails::default, |iface| {
        NetworkDetails {
            interface: iface.name.clone(),
            rx_bytes: iface.rx_bytes,
            tx_bytes: iface.tx_bytes,
            rx_errors: iface.rx_errors,
            tx_errors: iface.tx_errors,
            rx_dropped: iface.rx_dropped,
            tx_dropped: iface.tx_dropped,
        }
    })
}

/// Builds the cycle's snapshot. Pure: the same inputs always give the same
/// snapshot.
#[must_use]
#[allow(clippy::cast_precision_loss)]
pub fn build(readings: &NormalizedReadings, rates: &CycleRates, now: DateTime<Utc>) -> Snapshot {
    let cpu = &readings.cpu;
    let (memory_usage, memory) = memory_details(readings);
    let disk = disk_details(readings);
    let network = network_details(readings);
    let processes = &readings.processes;
    let connections = &readings.connections;
    let os = &readings.os;

    let metrics = HeadlineMetrics {
        cpu_usage: round2(cpu.load_percent),
        memory_usage,
        disk_usage: disk.usage_percent,
        load_average_1m: cpu.load_average[0],
        network_rx_bytes: network.rx_bytes,
        network_tx_bytes: network.tx_bytes,
        process_count: processes.total as u64,
        connection_count: connections.len() as u64,
        uptime_seconds: os.uptime_seconds,
    };

    let details = Details {
        memory,
        disk,
        network,
        disk_io: DiskIoDetails {
            read_ops_ps: readings.disk_io.read_ops_per_sec,
            write_ops_ps: readings.disk_io.write_ops_per_sec,
            read_bytes_ps: readings.disk_io.read_ops_per_sec * DISK_BLOCK_BYTES,
            write_bytes_ps: readings.disk_io.write_ops_per_sec * DISK_BLOCK_BYTES,
        },
        cpu_details: CpuDetails {
            cores: cpu.cores as u64,
            per_core_load: cpu.per_core_load.clone(),
            speed_ghz: round2(cpu.speed_mhz as f64 / 1000.0),
            user_percent: cpu.user_percent,
            system_percent: cpu.system_percent,
            idle_percent: cpu.idle_percent,
            iowait_percent: cpu.iowait_percent,
        },
        system_load: SystemLoad {
            one: cpu.load_average[0],
            five: cpu.load_average[1],
            fifteen: cpu.load_average[2],
        },
        processes: ProcessDetails {
            count: processes.total as u64,
            running: count(&processes.list, |p| p.state == "running"),
            sleeping: count(&processes.list, |p| p.state == "sleeping"),
            top_cpu: top_by_cpu(&processes.list),
        },
        network_connections: ConnectionDetails {
            count: connections.len() as u64,
            tcp_established: count(connections, |c| c.state == "ESTABLISHED"),
            tcp_listening: count(connections, |c| c.state == "LISTEN"),
        },
        system: SystemDetails {
            platform: os.platform.clone(),
            hostname: os.hostname.clone(),
            uptime_hours: round2(os.uptime_seconds as f64 / 3600.0),
            arch: os.arch.clone(),
            kernel: os.kernel.clone(),
            distro: os.distro.clone(),
        },
        battery: readings.battery.as_ref().map(|b| BatteryDetails {
            percent: b.percent,
            charging: b.charging,
            time_remaining: b.time_remaining,
        }),
        services: ServiceDetails {
            total: readings.services.len() as u64,
            running: count(&readings.services, |s| s.running),
            stopped: count(&readings.services, |s| !s.running),
        },
    };

    Snapshot {
        timestamp: now,
        metrics,
        rates: Rates {
            network_rx_rate: rates.network.inbound.round(),
            network_tx_rate: rates.network.outbound.round(),
            disk_read_rate: rates.disk.inbound.round(),
            disk_write_rate: rates.disk.outbound.round(),
        },
        details,
    }
}

/// Snapshot served before the first cycle completes.
#[must_use]
pub fn placeholder(now: DateTime<Utc>) -> Snapshot {
    build(&NormalizedReadings::default(), &CycleRates::default(), now)
}

#[cfg(test)]
#[allow(clippy::expect_used)]
mod tests {
    use super::*;
    use crate::domain::entities::reading::{
        BatteryReading, ConnectionReading, CpuReading, DiskIoReading, MemoryReading, OsReading,
        ProcessListReading, ServiceReading,
    };
    use crate::domain::services::rate_tracker::RatePair;

    const GB: u64 = 1_073_741_824;

    fn now() -> DateTime<Utc> {
        DateTime::from_timestamp(1_700_000_000, 0).expect("timestamp")
    }

    fn iface(name: &str, rx: u64) -> InterfaceReading {
        InterfaceReading {
            name: name.to_string(),
            rx_bytes: rx,
            tx_bytes: rx / 2,
            ..InterfaceReading::default()
        }
    }

    fn process(name: &str, cpu: f64, state: &str) -> ProcessReading {
        ProcessReading {
            pid: 1,
            name: name.to_string(),
            cpu_percent: cpu,
            memory_bytes: 4096,
            state: state.to_string(),
        }
    }

    fn full_readings() -> NormalizedReadings {
        NormalizedReadings {
            cpu: CpuReading {
                load_percent: 42.4567,
                per_core_load: vec![40.0, 45.0],
                user_percent: 30.0,
                system_percent: 12.0,
                idle_percent: 57.5,
                iowait_percent: 0.5,
                cores: 2,
                speed_mhz: 2_496,
                load_average: [1.25, 1.0, 0.75],
            },
            memory: MemoryReading {
                total_bytes: 16 * GB,
                used_bytes: 6 * GB,
                available_bytes: 9 * GB,
            },
            filesystems: vec![
                FilesystemReading {
                    mount: "/boot".to_string(),
                    fs_type: "vfat".to_string(),
                    size_bytes: GB,
                    used_bytes: GB / 2,
                },
                FilesystemReading {
                    mount: "/".to_string(),
                    fs_type: "ext4".to_string(),
                    size_bytes: 100 * GB,
                    used_bytes: 45 * GB,
                },
            ],
            interfaces: vec![iface("lo", 99), iface("eth0", 2_000), iface("wlan0", 10)],
            disk_io: DiskIoReading {
                read_ops: 1_000,
                write_ops: 2_000,
                read_ops_per_sec: 2.0,
                write_ops_per_sec: 3.0,
            },
            processes: ProcessListReading {
                total: 7,
                list: vec![
                    process("a", 1.0, "sleeping"),
                    process("b", 50.0, "running"),
                    process("c", 10.0, "sleeping"),
                    process("d", 10.0, "running"),
                    process("e", 0.0, "idle"),
                    process("f", 30.0, "sleeping"),
                    process("g", 5.0, "zombie"),
                ],
            },
            connections: vec![
                ConnectionReading {
                    state: "ESTABLISHED".to_string(),
                },
                ConnectionReading {
                    state: "LISTEN".to_string(),
                },
                ConnectionReading {
                    state: "TIME_WAIT".to_string(),
                },
            ],
            os: OsReading {
                platform: "linux".to_string(),
                hostname: "box".to_string(),
                arch: "x86_64".to_string(),
                kernel: "6.1.0".to_string(),
                distro: "Debian GNU/Linux 12".to_string(),
                uptime_seconds: 5_400,
            },
            battery: Some(BatteryReading {
                percent: 77.0,
                charging: false,
                time_remaining: 120.0,
            }),
            services: vec![
                ServiceReading {
                    name: "sshd".to_string(),
                    running: true,
                },
                ServiceReading {
                    name: "cups".to_string(),
                    running: false,
                },
            ],
        }
    }

    #[test]
    fn headline_metrics() {
        let snapshot = build(&full_readings(), &CycleRates::default(), now());
        assert!((snapshot.metrics.cpu_usage - 42.46).abs() < 1e-9);
        assert!((snapshot.metrics.memory_usage - 37.5).abs() < 1e-9);
        assert!((snapshot.metrics.disk_usage - 45.0).abs() < 1e-9);
        assert!((snapshot.metrics.load_average_1m - 1.25).abs() < 1e-9);
        assert_eq!(snapshot.metrics.network_rx_bytes, 2_000);
        assert_eq!(snapshot.metrics.process_count, 7);
        assert_eq!(snapshot.metrics.connection_count, 3);
        assert_eq!(snapshot.metrics.uptime_seconds, 5_400);
        assert_eq!(snapshot.timestamp, now());
    }

    #[test]
    fn details_sections() {
        let snapshot = build(&full_readings(), &CycleRates::default(), now());
        let d = &snapshot.details;
        assert!((d.memory.total_gb - 16.0).abs() < 1e-9);
        assert!((d.memory.free_gb - 10.0).abs() < 1e-9);
        assert!((d.memory.available_gb - 9.0).abs() < 1e-9);
        assert_eq!(d.disk.mount, "/");
        assert!((d.disk.available_gb - 55.0).abs() < 1e-9);
        assert_eq!(d.network.interface, "eth0");
        assert!((d.disk_io.read_bytes_ps - 8_192.0).abs() < 1e-9);
        assert!((d.disk_io.write_bytes_ps - 12_288.0).abs() < 1e-9);
        assert!((d.cpu_details.speed_ghz - 2.5).abs() < 1e-9);
        assert_eq!(d.cpu_details.cores, 2);
        assert!((d.system_load.fifteen - 0.75).abs() < 1e-9);
        assert_eq!(d.processes.running, 2);
        assert_eq!(d.processes.sleeping, 3);
        assert_eq!(d.network_connections.tcp_established, 1);
        assert_eq!(d.network_connections.tcp_listening, 1);
        assert!((d.system.uptime_hours - 1.5).abs() < 1e-9);
        assert_eq!(d.system.distro, "Debian GNU/Linux 12");
        assert_eq!(d.battery.as_ref().map(|b| b.charging), Some(false));
        assert_eq!(d.services.total, 2);
        assert_eq!(d.services.running, 1);
        assert_eq!(d.services.stopped, 1);
    }

    #[test]
    fn top_processes_are_stable_and_capped() {
        let snapshot = build(&full_readings(), &CycleRates::default(), now());
        let names: Vec<&str> = snapshot
            .details
            .processes
            .top_cpu
            .iter()
            .map(|p| p.name.as_str())
            .collect();
        assert_eq!(names, vec!["b", "f", "c", "d", "g"]);
    }

    #[test]
    fn rates_are_rounded() {
        let rates = CycleRates {
            network: RatePair {
                inbound: 1_023.6,
                outbound: 0.4,
            },
            disk: RatePair {
                inbound: 2.5,
                outbound: 7.49,
            },
        };
        let snapshot = build(&full_readings(), &rates, now());
        assert!((snapshot.rates.network_rx_rate - 1_024.0).abs() < f64::EPSILON);
        assert_eq!(snapshot.rates.network_tx_rate, 0.0);
        assert!((snapshot.rates.disk_read_rate - 3.0).abs() < f64::EPSILON);
        assert!((snapshot.rates.disk_write_rate - 7.0).abs() < f64::EPSILON);
    }

    #[test]
    fn zero_memory_total_gives_zero_usage() {
        let mut readings = full_readings();
        readings.memory = MemoryReading::default();
        let snapshot = build(&readings, &CycleRates::default(), now());
        assert_eq!(snapshot.metrics.memory_usage, 0.0);
    }

    #[test]
    fn disk_available_needs_size_and_used() {
        let mut readings = full_readings();
        readings.filesystems = vec![FilesystemReading {
            mount: "/data".to_string(),
            fs_type: "xfs".to_string(),
            size_bytes: 10 * GB,
            used_bytes: 0,
        }];
        let snapshot = build(&readings, &CycleRates::default(), now());
        assert_eq!(snapshot.details.disk.mount, "/data");
        assert_eq!(snapshot.details.disk.available_gb, 0.0);
        assert_eq!(snapshot.metrics.disk_usage, 0.0);
    }

    #[test]
    fn windows_drive_counts_as_root() {
        let fs = vec![
            FilesystemReading {
                mount: "D:".to_string(),
                ..FilesystemReading::default()
            },
            FilesystemReading {
                mount: "C:\\".to_string(),
                ..FilesystemReading::default()
            },
        ];
        assert_eq!(root_filesystem(&fs).map(|f| f.mount.as_str()), Some("C:\\"));
    }

    #[test]
    fn primary_interface_keeps_reported_order() {
        let ifaces = vec![iface("lo", 1), iface("wlan0", 10), iface("eth0", 20)];
        assert_eq!(
            primary_interface(&ifaces).map(|i| i.name.as_str()),
            Some("wlan0")
        );

        let readings = NormalizedReadings {
            interfaces: ifaces,
            ..NormalizedReadings::default()
        };
        let snapshot = build(&readings, &CycleRates::default(), now());
        assert_eq!(snapshot.details.network.interface, "wlan0");
        assert_eq!(snapshot.metrics.network_rx_bytes, 10);
    }

    #[test]
    fn primary_interface_falls_back_to_loopback_then_none() {
        let only_lo = vec![iface("lo", 5)];
        assert_eq!(
            primary_interface(&only_lo).map(|i| i.name.as_str()),
            Some("lo")
        );
        assert!(primary_interface(&[]).is_none());
    }

    #[test]
    fn placeholder_is_all_defaults() {
        let snapshot = placeholder(now());
        assert_eq!(snapshot.metrics.cpu_usage, 0.0);
        assert_eq!(snapshot.metrics.memory_usage, 0.0);
        assert_eq!(snapshot.details.network.interface, "unknown");
        assert_eq!(snapshot.details.disk.mount, "unknown");
        assert_eq!(snapshot.details.system.hostname, "unknown");
        assert!(snapshot.details.battery.is_none());
        assert!(snapshot.details.processes.top_cpu.is_empty());
    }
}
