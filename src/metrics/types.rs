use crate::actuator::types::Reading;
use serde::{Deserialize, Serialize};

/// Heap and non-heap readings are divided by this before being cached.
/// The inputs are bytes but the divisor is 8 MiB, so one reported unit is
/// 8,388,608 bytes; existing consumers depend on this scale.
pub const MEMORY_UNIT_DIVISOR: u64 = 8 * 1024 * 1024;

pub const TAG_LIVE: &str = "LIVE";
pub const TAG_DAEMON: &str = "DAEMON";
pub const TAG_PEAK: &str = "PEAK";
pub const TAG_USED: &str = "used";
pub const TAG_SIZE: &str = "size";
pub const TAG_METASPACE: &str = "metaspace";

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MetricSample {
    pub tag: String,
    pub value: u64,
    pub timestamp: String,
}

impl MetricSample {
    pub fn new(tag: &str, value: u64, timestamp: &str) -> Self {
        Self {
            tag: tag.to_string(),
            value,
            timestamp: timestamp.to_string(),
        }
    }

    fn count(tag: &str, reading: Reading, timestamp: &str) -> Self {
        Self::new(tag, reading.value() as u64, timestamp)
    }

    fn memory(tag: &str, reading: Reading, timestamp: &str) -> Self {
        Self::new(tag, to_reported_units(reading.value()), timestamp)
    }
}

/// Truncates the raw reading and scales it by [`MEMORY_UNIT_DIVISOR`].
pub fn to_reported_units(raw: f64) -> u64 {
    (raw as u64) / MEMORY_UNIT_DIVISOR
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ThreadSnapshot {
    pub live: MetricSample,
    pub daemon: MetricSample,
    pub peak: MetricSample,
}

impl ThreadSnapshot {
    pub fn from_readings(live: Reading, daemon: Reading, peak: Reading, timestamp: &str) -> Self {
        Self {
            live: MetricSample::count(TAG_LIVE, live, timestamp),
            daemon: MetricSample::count(TAG_DAEMON, daemon, timestamp),
            peak: MetricSample::count(TAG_PEAK, peak, timestamp),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct HeapSnapshot {
    pub used: MetricSample,
    pub size: MetricSample,
}

impl HeapSnapshot {
    pub fn from_readings(used: Reading, committed: Reading, timestamp: &str) -> Self {
        Self {
            used: MetricSample::memory(TAG_USED, used, timestamp),
            size: MetricSample::memory(TAG_SIZE, committed, timestamp),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NonHeapSnapshot {
    pub used: MetricSample,
    pub size: MetricSample,
    pub metaspace: MetricSample,
}

impl NonHeapSnapshot {
    pub fn from_readings(
        used: Reading,
        committed: Reading,
        metaspace: Reading,
        timestamp: &str,
    ) -> Self {
        Self {
            used: MetricSample::memory(TAG_USED, used, timestamp),
            size: MetricSample::memory(TAG_SIZE, committed, timestamp),
            metaspace: MetricSample::memory(TAG_METASPACE, metaspace, timestamp),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn test_memory_unit_conversion() {
        assert_eq!(to_reported_units(8_388_608.0), 1);
        assert_eq!(to_reported_units(8_388_607.0), 0);
        assert_eq!(to_reported_units(3.0 * 8_388_608.0 + 5.0), 3);
        assert_eq!(to_reported_units(0.0), 0);
        assert_eq!(to_reported_units(-1.0), 0);
        assert_eq!(to_reported_units(f64::NAN), 0);
    }

    #[test]
    fn test_heap_snapshot_uses_same_divisor() {
        let heap = HeapSnapshot::from_readings(
            Reading::Measured(16_777_216.0),
            Reading::Measured(8_388_608.0),
            "10:15:00",
        );

        assert_eq!(heap.used, MetricSample::new("used", 2, "10:15:00"));
        assert_eq!(heap.size, MetricSample::new("size", 1, "10:15:00"));
    }

    #[test]
    fn test_thread_snapshot_truncates_counts() {
        let threads = ThreadSnapshot::from_readings(
            Reading::Measured(31.0),
            Reading::Measured(12.9),
            Reading::Fallback,
            "10:15:00",
        );

        assert_eq!(threads.live.value, 31);
        assert_eq!(threads.live.tag, "LIVE");
        assert_eq!(threads.daemon.value, 12);
        assert_eq!(threads.peak.value, 0);
    }

    #[test]
    fn test_non_heap_fallbacks_are_zero() {
        let non_heap = NonHeapSnapshot::from_readings(
            Reading::Fallback,
            Reading::Fallback,
            Reading::Measured(83_886_080.0),
            "10:15:00",
        );

        assert_eq!(non_heap.used.value, 0);
        assert_eq!(non_heap.size.value, 0);
        assert_eq!(non_heap.metaspace, MetricSample::new("metaspace", 10, "10:15:00"));
    }
}
