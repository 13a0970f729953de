use std::sync::{Arc, Mutex, MutexGuard};
use std::time::Instant;

use async_trait::async_trait;
use sysinfo::{Disks, Networks, System};

use super::procfs::{self, CpuTimes, DiskOps};
use crate::domain::entities::reading::{
    CpuReading, DiskIoReading, FilesystemReading, InterfaceReading, MemoryReading, OsReading,
    ProcessListReading, ProcessReading, SensorUnavailable, Subsystem,
};
use crate::domain::ports::sensor::{SensorSource, SubsystemData};

/// Filesystem types to exclude from filesystem readings.
const PSEUDO_FILESYSTEMS: &[&str] = &[
    "tmpfs",
    "devtmpfs",
    "sysfs",
    "proc",
    "cgroup2",
    "overlay",
    "squashfs",
    "efivarfs",
    "bpf",
    "hugetlbfs",
    "mqueue",
    "pstore",
    "securityfs",
    "debugfs",
    "tracefs",
    "fusectl",
    "rpc_pipefs",
];

/// Returns the arithmetic mean of `per_core`, or `0.0` when the slice is empty.
#[allow(clippy::cast_precision_loss)]
fn avg_cpu_usage(per_core: &[f64]) -> f64 {
    if per_core.is_empty() {
        0.0
    } else {
        per_core.iter().sum::<f64>() / per_core.len() as f64
    }
}

/// Host sensors backed by the `sysinfo` crate, completed with `/proc` and
/// `/sys` readings on Linux.
///
/// `sysinfo` needs `&mut` to refresh, so every handle sits behind a
/// `Mutex`. Each fetch runs on the blocking pool.
pub struct SysinfoSource {
    inner: Arc<Inner>,
}

struct Inner {
    sys: Mutex<System>,
    processes: Mutex<System>,
    disks: Mutex<Disks>,
    networks: Mutex<Networks>,
    cpu_times: Mutex<Option<CpuTimes>>,
    disk_ops: Mutex<Option<(DiskOps, Instant)>>,
}

impl SysinfoSource {
    /// Creates a source with pre-refreshed system data.
    #[must_use]
    pub fn new() -> Self {
        let mut sys = System::new();
        sys.refresh_cpu_all();
        sys.refresh_memory();
        let mut processes = System::new_all();
        processes.refresh_all();

        Self {
            inner: Arc::new(Inner {
                sys: Mutex::new(sys),
                processes: Mutex::new(processes),
                disks: Mutex::new(Disks::new_with_refreshed_list()),
                networks: Mutex::new(Networks::new_with_refreshed_list()),
                cpu_times: Mutex::new(procfs::cpu_times().ok()),
                disk_ops: Mutex::new(None),
            }),
        }
    }
}

impl Default for SysinfoSource {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl SensorSource for SysinfoSource {
    async fn fetch(&self, subsystem: Subsystem) -> Result<SubsystemData, SensorUnavailable> {
        let inner = Arc::clone(&self.inner);
        tokio::task::spawn_blocking(move || inner.read(subsystem))
            .await
            .map_err(|e| SensorUnavailable::new(subsystem, format!("sensor task failed: {e}")))?
    }
}

/// A panic during an earlier read leaves the sysinfo state usable, so a
/// poisoned lock is recovered rather than failing every later cycle.
fn lock<T>(mutex: &Mutex<T>, subsystem: Subsystem) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(|poisoned| {
        tracing::warn!("Recovering poisoned {subsystem} sensor lock");
        mutex.clear_poison();
        poisoned.into_inner()
    })
}

impl Inner {
    fn read(&self, subsystem: Subsystem) -> Result<SubsystemData, SensorUnavailable> {
        let unavailable = |reason: String| SensorUnavailable::new(subsystem, reason);
        match subsystem {
            Subsystem::Cpu => Ok(SubsystemData::Cpu(self.cpu())),
            Subsystem::Memory => Ok(SubsystemData::Memory(self.memory())),
            Subsystem::Filesystems => Ok(SubsystemData::Filesystems(self.filesystems())),
            Subsystem::Network => Ok(SubsystemData::Network(self.interfaces())),
            Subsystem::DiskIo => self.disk_io().map(SubsystemData::DiskIo),
            Subsystem::Processes => Ok(SubsystemData::Processes(self.process_list())),
            Subsystem::Connections => procfs::connections()
                .map(SubsystemData::Connections)
                .map_err(unavailable),
            Subsystem::Os => Ok(SubsystemData::Os(os())),
            Subsystem::Battery => procfs::battery()
                .map(SubsystemData::Battery)
                .map_err(unavailable),
            Subsystem::Services => procfs::services()
                .map(SubsystemData::Services)
                .map_err(unavailable),
        }
    }

    fn cpu(&self) -> CpuReading {
        let mut sys = lock(&self.sys, Subsystem::Cpu);
        sys.refresh_cpu_all();
        let per_core_load: Vec<f64> = sys
            .cpus()
            .iter()
            .map(|cpu| f64::from(cpu.cpu_usage()))
            .collect();
        let speed_mhz = sys.cpus().first().map_or(0, sysinfo::Cpu::frequency);
        drop(sys);

        let split = self.cpu_split();
        let load = System::load_average();

        CpuReading {
            load_percent: avg_cpu_usage(&per_core_load),
            cores: per_core_load.len(),
            per_core_load,
            user_percent: split.user,
            system_percent: split.system,
            idle_percent: split.idle,
            iowait_percent: split.iowait,
            speed_mhz,
            load_average: [load.one, load.five, load.fifteen],
        }
    }

    /// Time split since the previous CPU fetch. Zero when `/proc/stat` is
    /// unreadable or on the first sample.
    fn cpu_split(&self) -> procfs::CpuSplit {
        let mut previous = lock(&self.cpu_times, Subsystem::Cpu);
        let Ok(current) = procfs::cpu_times() else {
            return procfs::CpuSplit::default();
        };
        let split = previous
            .as_ref()
            .map(|before| procfs::cpu_split(before, &current))
            .unwrap_or_default();
        *previous = Some(current);
        split
    }

    fn memory(&self) -> MemoryReading {
        let mut sys = lock(&self.sys, Subsystem::Memory);
        sys.refresh_memory();
        MemoryReading {
            total_bytes: sys.total_memory(),
            used_bytes: sys.used_memory(),
            available_bytes: sys.available_memory(),
        }
    }

    fn filesystems(&self) -> Vec<FilesystemReading> {
        let mut disks = lock(&self.disks, Subsystem::Filesystems);
        disks.refresh_list();

        disks
            .iter()
            .filter(|d| {
                let fs = d.file_system().to_string_lossy();
                !PSEUDO_FILESYSTEMS.iter().any(|&pseudo| fs == pseudo) && d.total_space() > 0
            })
            .map(|disk| {
                let size = disk.total_space();
                FilesystemReading {
                    mount: disk.mount_point().to_string_lossy().to_string(),
                    fs_type: disk.file_system().to_string_lossy().to_string(),
                    size_bytes: size,
                    used_bytes: size.saturating_sub(disk.available_space()),
                }
            })
            .collect()
    }

    fn interfaces(&self) -> Vec<InterfaceReading> {
        let mut networks = lock(&self.networks, Subsystem::Network);
        networks.refresh();

        let mut interfaces: Vec<InterfaceReading> = networks
            .iter()
            .map(|(name, data)| {
                let (rx_dropped, tx_dropped) = procfs::interface_drops(name);
                InterfaceReading {
                    name: name.clone(),
                    rx_bytes: data.total_received(),
                    tx_bytes: data.total_transmitted(),
                    rx_errors: data.total_errors_on_received(),
                    tx_errors: data.total_errors_on_transmitted(),
                    rx_dropped,
                    tx_dropped,
                }
            })
            .collect();
        interfaces.sort_by(|a, b| a.name.cmp(&b.name));
        interfaces
    }

    /// Cumulative operation counts plus rates against the previous fetch.
    #[allow(clippy::cast_precision_loss)]
    fn disk_io(&self) -> Result<DiskIoReading, SensorUnavailable> {
        let ops = procfs::disk_ops().map_err(|e| SensorUnavailable::new(Subsystem::DiskIo, e))?;
        let now = Instant::now();
        let mut previous = lock(&self.disk_ops, Subsystem::DiskIo);

        let (read_ops_per_sec, write_ops_per_sec) = match previous.as_ref() {
            Some((before, at)) => {
                let secs = now.duration_since(*at).as_secs_f64();
                if secs > 0.0 {
                    (
                        ops.reads.saturating_sub(before.reads) as f64 / secs,
                        ops.writes.saturating_sub(before.writes) as f64 / secs,
                    )
                } else {
                    (0.0, 0.0)
                }
            }
            None => (0.0, 0.0),
        };
        *previous = Some((ops, now));

        Ok(DiskIoReading {
            read_ops: ops.reads,
            write_ops: ops.writes,
            read_ops_per_sec,
            write_ops_per_sec,
        })
    }

    fn process_list(&self) -> ProcessListReading {
        let mut sys = lock(&self.processes, Subsystem::Processes);
        sys.refresh_all();

        let mut list: Vec<ProcessReading> = sys
            .processes()
            .values()
            .map(|process| ProcessReading {
                pid: process.pid().as_u32(),
                name: process.name().to_string_lossy().to_string(),
                cpu_percent: f64::from(process.cpu_usage()),
                memory_bytes: process.memory(),
                state: map_process_status(process.status()).to_string(),
            })
            .collect();
        list.sort_by_key(|p| p.pid);

        ProcessListReading {
            total: list.len(),
            list,
        }
    }
}

fn os() -> OsReading {
    let fallback = OsReading::default();
    OsReading {
        platform: std::env::consts::OS.to_string(),
        hostname: System::host_name().unwrap_or(fallback.hostname),
        arch: std::env::consts::ARCH.to_string(),
        kernel: System::kernel_version().unwrap_or(fallback.kernel),
        distro: System::long_os_version()
            .or_else(System::name)
            .unwrap_or(fallback.distro),
        uptime_seconds: System::uptime(),
    }
}

const fn map_process_status(status: sysinfo::ProcessStatus) -> &'static str {
    match status {
        sysinfo::ProcessStatus::Run => "running",
        sysinfo::ProcessStatus::Sleep
        | sysinfo::ProcessStatus::Idle
        | sysinfo::ProcessStatus::UninterruptibleDiskSleep
        | sysinfo::ProcessStatus::Parked
        | sysinfo::ProcessStatus::Waking
        | sysinfo::ProcessStatus::Wakekill => "sleeping",
        sysinfo::ProcessStatus::Zombie => "zombie",
        sysinfo::ProcessStatus::Stop | sysinfo::ProcessStatus::Tracing => "stopped",
        sysinfo::ProcessStatus::Dead => "dead",
        _ => "unknown",
    }
}
