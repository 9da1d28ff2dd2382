use serde::{Deserialize, Serialize};
use std::time::Duration;

/// Tuning knobs for a [`ThreadSeparatedHost`](crate::ThreadSeparatedHost).
///
/// None of these values carry meaning beyond their effect on scheduling: the measure
/// timeout only bounds how long the parent thread waits for the hosted element.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct HostConfig {
    /// Upper bound on how long a measure pass waits for the hosted thread
    #[serde(with = "millis")]
    pub measure_timeout: Duration,
    /// Raise the hosted thread's scheduling priority where the platform allows it
    pub elevate_priority: bool,
    /// Name given to the hosted element thread
    pub thread_name: String,
}

pub const DEFAULT_MEASURE_TIMEOUT: Duration = Duration::from_millis(50);

impl Default for HostConfig {
    fn default() -> Self {
        Self {
            measure_timeout: DEFAULT_MEASURE_TIMEOUT,
            elevate_priority: true,
            thread_name: "hosted-element".to_string(),
        }
    }
}

impl HostConfig {
    pub fn with_measure_timeout(mut self, timeout: Duration) -> Self {
        self.measure_timeout = timeout;
        self
    }

    pub fn with_thread_name(mut self, name: impl Into<String>) -> Self {
        self.thread_name = name.into();
        self
    }
}

mod millis {
    use serde::{Deserialize, Deserializer, Serializer};
    use std::time::Duration;

    pub fn serialize<S: Serializer>(value: &Duration, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_u64(value.as_millis() as u64)
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(deserializer: D) -> Result<Duration, D::Error> {
        u64::deserialize(deserializer).map(Duration::from_millis)
    }
}
