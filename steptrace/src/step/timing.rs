//! Wall-clock bounds of an action step.
//!
//! An [`ActionStep`](super::ActionStep) is stamped when its cycle starts and
//! again when it finishes. Exports carry the bounds as `start_time` and
//! `end_time` (RFC 3339) plus `duration` in float seconds, each `null` until
//! known.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value, json};

use crate::json::to_json_safe;

/// Start and end stamps of one reasoning/acting cycle.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Timing {
    /// When the cycle started.
    pub start_time: DateTime<Utc>,
    /// When the cycle finished; `None` while it is still running.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub end_time: Option<DateTime<Utc>>,
}

impl Timing {
    /// Stamp the start of a cycle at the current instant.
    #[must_use]
    pub fn start_now() -> Self {
        Self::starting_at(Utc::now())
    }

    /// Stamp the start of a cycle at `start_time`.
    #[must_use]
    pub const fn starting_at(start_time: DateTime<Utc>) -> Self {
        Self {
            start_time,
            end_time: None,
        }
    }

    /// Stamp the end of the cycle at the current instant.
    pub fn complete(&mut self) {
        self.complete_at(Utc::now());
    }

    /// Stamp the end of the cycle at `end_time`.
    pub const fn complete_at(&mut self, end_time: DateTime<Utc>) {
        self.end_time = Some(end_time);
    }

    /// Whether the cycle has finished.
    #[must_use]
    pub const fn is_complete(&self) -> bool {
        self.end_time.is_some()
    }

    /// Seconds the cycle took, at millisecond resolution.
    #[must_use]
    pub fn duration_secs(&self) -> Option<f64> {
        self.end_time
            .map(|end| (end - self.start_time).num_milliseconds() as f64 / 1000.0)
    }

    /// Write `start_time`, `end_time` and `duration` into a step export.
    ///
    /// Unstamped steps export all three keys as `null`.
    pub fn export_into(timing: Option<&Self>, map: &mut Map<String, Value>) {
        map.insert(
            "start_time".into(),
            to_json_safe(&timing.map(|t| t.start_time)),
        );
        map.insert(
            "end_time".into(),
            to_json_safe(&timing.and_then(|t| t.end_time)),
        );
        map.insert(
            "duration".into(),
            json!(timing.and_then(Self::duration_secs)),
        );
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeDelta;

    #[test]
    fn test_duration_requires_end() {
        let start = Utc::now();
        let mut timing = Timing::starting_at(start);
        assert!(!timing.is_complete());
        assert_eq!(timing.duration_secs(), None);

        timing.complete_at(start + TimeDelta::milliseconds(2500));
        assert!(timing.is_complete());
        assert_eq!(timing.duration_secs(), Some(2.5));
    }

    #[test]
    fn test_export_keys() {
        let mut map = Map::new();
        Timing::export_into(None, &mut map);
        assert_eq!(map["start_time"], Value::Null);
        assert_eq!(map["end_time"], Value::Null);
        assert_eq!(map["duration"], Value::Null);

        let start = Utc::now();
        let mut timing = Timing::starting_at(start);
        timing.complete_at(start + TimeDelta::seconds(3));
        let mut map = Map::new();
        Timing::export_into(Some(&timing), &mut map);
        assert_eq!(map["duration"], json!(3.0));
        assert_eq!(map["start_time"], serde_json::to_value(start).unwrap());
        assert!(map["end_time"].is_string());
    }
}
