use crate::error::Result;
use serde::Deserialize;
use serde_json::Value;

pub const THREADS_LIVE: &str = "/actuator/metrics/jvm.threads.live";
pub const THREADS_DAEMON: &str = "/actuator/metrics/jvm.threads.daemon";
pub const THREADS_PEAK: &str = "/actuator/metrics/jvm.threads.peak";

pub const HEAP_USED: &str = "/actuator/metrics/jvm.memory.used?tag=area:heap";
pub const HEAP_COMMITTED: &str = "/actuator/metrics/jvm.memory.committed?tag=area:heap";

pub const NON_HEAP_USED: &str = "/actuator/metrics/jvm.memory.used?tag=area:nonheap";
pub const NON_HEAP_COMMITTED: &str = "/actuator/metrics/jvm.memory.committed?tag=area:nonheap";
pub const METASPACE_USED: &str =
    "/actuator/metrics/jvm.memory.used?tag=area:nonheap&tag=id:Metaspace";

pub const BIZ_STATE: &str = "bizState";

const SUCCESS: &str = "SUCCESS";

#[derive(Debug, Deserialize)]
pub struct MetricResponse {
    #[serde(default)]
    pub name: Option<String>,
    pub measurements: Vec<Measurement>,
}

#[derive(Debug, Deserialize)]
pub struct Measurement {
    #[serde(default)]
    pub statistic: Option<String>,
    #[serde(default)]
    pub value: Value,
}

/// Outcome of reading one metric. Anything short of a numeric first
/// measurement is a [`Reading::Fallback`], which reports as zero.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Reading {
    Measured(f64),
    Fallback,
}

impl Reading {
    pub fn from_response(response: Result<Value>) -> Self {
        let Ok(body) = response else {
            return Reading::Fallback;
        };

        serde_json::from_value::<MetricResponse>(body)
            .ok()
            .and_then(|metric| metric.measurements.into_iter().next())
            .and_then(|first| first.value.as_f64())
            .map(Reading::Measured)
            .unwrap_or(Reading::Fallback)
    }

    pub fn value(self) -> f64 {
        match self {
            Reading::Measured(value) => value,
            Reading::Fallback => 0.0,
        }
    }

    pub fn is_fallback(self) -> bool {
        matches!(self, Reading::Fallback)
    }
}

/// Picks the state of `biz_name`/`biz_version` out of a `bizState` response.
/// Returns an empty string when the response is unsuccessful or the module is
/// not listed.
pub fn parse_biz_state(body: &Value, biz_name: &str, biz_version: &str) -> String {
    if body.get("code").and_then(Value::as_str) != Some(SUCCESS) {
        return String::new();
    }

    let Some(entries) = body.get("data").and_then(Value::as_array) else {
        return String::new();
    };

    entries
        .iter()
        .find(|entry| {
            entry.get("bizName").and_then(Value::as_str) == Some(biz_name)
                && entry.get("bizVersion").and_then(Value::as_str) == Some(biz_version)
        })
        .and_then(|entry| entry.get("bizState"))
        .map(|state| match state {
            Value::Null => String::new(),
            Value::String(s) => s.clone(),
            other => other.to_string(),
        })
        .unwrap_or_default()
}
