//! Registry value types.

use std::fmt;

use serde::{Deserialize, Serialize};

/// The global default state, seeded from configuration.
///
/// `metric_name` and `target_size` never change after startup; `active`
/// and `metric_value` are overwritten by events that carry no object name.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DefaultStatus {
    pub metric_name: String,
    #[serde(default = "default_target_size")]
    pub target_size: i64,
    #[serde(default)]
    pub active: bool,
    #[serde(default)]
    pub metric_value: i64,
}

fn default_target_size() -> i64 {
    1
}

impl DefaultStatus {
    /// Create a default state that starts inactive with a zero metric.
    pub fn new(metric_name: impl Into<String>, target_size: i64) -> Self {
        Self {
            metric_name: metric_name.into(),
            target_size,
            active: false,
            metric_value: 0,
        }
    }

    pub fn activation(&self) -> ActivationStatus {
        ActivationStatus {
            active: self.active,
            metric_value: self.metric_value,
        }
    }

    pub fn metric_spec(&self) -> MetricSpec {
        MetricSpec {
            metric_name: self.metric_name.clone(),
            target_size: self.target_size,
        }
    }
}

/// Activation flag plus metric value for one object (or the default).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct ActivationStatus {
    pub active: bool,
    pub metric_value: i64,
}

/// Statically configured metric reported by `GetMetricSpec`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MetricSpec {
    pub metric_name: String,
    pub target_size: i64,
}

/// Identity of one `register` call.
///
/// Two sessions for the same object name carry different ids, which lets
/// a superseded session deregister without removing its successor.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct SessionId(pub u64);

impl fmt::Display for SessionId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "session-{}", self.0)
    }
}

/// What `StatusStore::apply_event` did with an event.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ApplyOutcome {
    /// The event had no object name; the global default was overwritten.
    DefaultUpdated,
    /// The object's entry was updated. `notified` is false when the
    /// notification slot was already full and the update was coalesced.
    ObjectUpdated { notified: bool },
    /// No session is registered for the object; the event was discarded.
    Unregistered,
}

impl ApplyOutcome {
    /// Short label used in API responses and logs.
    pub fn label(&self) -> &'static str {
        match self {
            ApplyOutcome::DefaultUpdated => "default_updated",
            ApplyOutcome::ObjectUpdated { notified: true } => "object_updated",
            ApplyOutcome::ObjectUpdated { notified: false } => "coalesced",
            ApplyOutcome::Unregistered => "unregistered",
        }
    }

    pub fn is_applied(&self) -> bool {
        !matches!(self, ApplyOutcome::Unregistered)
    }
}
