use std::collections::HashMap;

use chrono::{DateTime, Utc};

use crate::domain::entities::reading::NormalizedReadings;

use super::snapshot_builder::primary_interface;

/// Counter stream a rate is derived from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum RateKey {
    Network,
    DiskIo,
}

/// Cumulative counters in both directions.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct CounterPair {
    pub inbound: u64,
    pub outbound: u64,
}

/// Per-second rates in both directions, never negative.
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct RatePair {
    pub inbound: f64,
    pub outbound: f64,
}

/// Rates derived in one cycle.
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct CycleRates {
    /// Bytes per second on the primary interface.
    pub network: RatePair,
    /// Operations per second, read as inbound and write as outbound.
    pub disk: RatePair,
}

/// Remembers the previous counters per key and turns consecutive samples
/// into per-second rates.
#[derive(Debug, Default)]
pub struct RateTracker {
    previous: HashMap<RateKey, (CounterPair, DateTime<Utc>)>,
}

#[allow(clippy::cast_precision_loss)]
fn per_second(current: u64, previous: u64, elapsed_secs: f64) -> f64 {
    if current <= previous {
        return 0.0;
    }
    ((current - previous) as f64 / elapsed_secs).max(0.0)
}

impl RateTracker {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    #[must_use]
    pub fn has_previous(&self, key: RateKey) -> bool {
        self.previous.contains_key(&key)
    }

    /// Records `current` for `key` and returns the rate since the previous
    /// record. The first record yields zero; a counter that went backwards
    /// yields zero for that direction; a non-positive elapsed time is
    /// treated as one second.
    #[allow(clippy::cast_precision_loss)]
    pub fn update(&mut self, key: RateKey, current: CounterPair, now: DateTime<Utc>) -> RatePair {
        let rate = match self.previous.get(&key) {
            None => RatePair::default(),
            Some((previous, at)) => {
                let elapsed_ms = (now - *at).num_milliseconds();
                let elapsed = if elapsed_ms <= 0 {
                    1.0
                } else {
                    elapsed_ms as f64 / 1000.0
                };
                RatePair {
                    inbound: per_second(current.inbound, previous.inbound, elapsed),
                    outbound: per_second(current.outbound, previous.outbound, elapsed),
                }
            }
        };
        self.previous.insert(key, (current, now));
        rate
    }

    /// Derives this cycle's rates.
    ///
    /// Network rates are computed from the primary interface's byte
    /// counters. Disk rates come straight from the sensor's own per-second
    /// values, but only once a previous disk sample was recorded, so the
    /// first cycle reports zero. Disk counters are recorded every cycle.
    pub fn observe_cycle(&mut self, readings: &NormalizedReadings, now: DateTime<Utc>) -> CycleRates {
        let net_counters = primary_interface(&readings.interfaces)
            .map(|iface| CounterPair {
                inbound: iface.rx_bytes,
                outbound: iface.tx_bytes,
            })
            .unwrap_or_default();
        let network = self.update(RateKey::Network, net_counters, now);

        let had_disk_sample = self.has_previous(RateKey::DiskIo);
        let disk_counters = CounterPair {
            inbound: readings.disk_io.read_ops,
            outbound: readings.disk_io.write_ops,
        };
        self.update(RateKey::DiskIo, disk_counters, now);
        let disk = if had_disk_sample {
            RatePair {
                inbound: readings.disk_io.read_ops_per_sec.max(0.0),
                outbound: readings.disk_io.write_ops_per_sec.max(0.0),
            }
        } else {
            RatePair::default()
        };

        CycleRates { network, disk }
    }
}
