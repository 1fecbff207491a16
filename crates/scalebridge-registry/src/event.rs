//! Update events and their parsing from query-string input.

use crate::error::{EventError, EventResult};

/// A transient state change for one object, or for the global default
/// when `object_name` is empty.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UpdateEvent {
    pub object_name: String,
    pub active: bool,
    pub metric_value: i64,
}

impl UpdateEvent {
    pub fn new(object_name: impl Into<String>, active: bool, metric_value: i64) -> Self {
        Self {
            object_name: object_name.into(),
            active,
            metric_value,
        }
    }

    /// An event that targets the global default.
    pub fn global(active: bool, metric_value: i64) -> Self {
        Self::new(String::new(), active, metric_value)
    }

    pub fn is_global(&self) -> bool {
        self.object_name.is_empty()
    }

    /// Build an event from raw submission parameters.
    ///
    /// `name` may be absent (global update). `active` and `value` are
    /// required; a missing parameter fails the same way as an unparseable one.
    pub fn parse(
        name: Option<&str>,
        active: Option<&str>,
        value: Option<&str>,
    ) -> EventResult<Self> {
        let active_raw = active.unwrap_or_default();
        let active = parse_bool(active_raw).ok_or_else(|| EventError::InvalidActive {
            value: active_raw.to_string(),
        })?;

        let value_raw = value.unwrap_or_default();
        let metric_value = value_raw
            .parse::<i64>()
            .map_err(|e| EventError::InvalidValue {
                value: value_raw.to_string(),
                reason: e.to_string(),
            })?;

        Ok(Self::new(name.unwrap_or_default(), active, metric_value))
    }
}

/// Boolean grammar accepted on the submission interface.
fn parse_bool(s: &str) -> Option<bool> {
    match s {
        "1" | "t" | "T" | "TRUE" | "true" | "True" => Some(true),
        "0" | "f" | "F" | "FALSE" | "false" | "False" => Some(false),
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parse_global_event() {
        let ev = UpdateEvent::parse(None, Some("true"), Some("5")).unwrap();
        assert!(ev.is_global());
        assert!(ev.active);
        assert_eq!(ev.metric_value, 5);
    }

    #[test]
    fn parse_named_event() {
        let ev = UpdateEvent::parse(Some("job-1"), Some("0"), Some("-42")).unwrap();
        assert_eq!(ev, UpdateEvent::new("job-1", false, -42));
    }

    #[test]
    fn empty_name_is_global() {
        let ev = UpdateEvent::parse(Some(""), Some("F"), Some("0")).unwrap();
        assert!(ev.is_global());
    }

    #[test]
    fn bool_grammar() {
        for s in ["1", "t", "T", "TRUE", "true", "True"] {
            assert_eq!(parse_bool(s), Some(true), "{s}");
        }
        for s in ["0", "f", "F", "FALSE", "false", "False"] {
            assert_eq!(parse_bool(s), Some(false), "{s}");
        }
        for s in ["", "yes", "tRuE", " true", "2"] {
            assert_eq!(parse_bool(s), None, "{s}");
        }
    }

    #[test]
    fn invalid_active_is_reported() {
        let err = UpdateEvent::parse(Some("a"), Some("maybe"), Some("1")).unwrap_err();
        assert_eq!(err.parameter(), "active");
        assert!(err.to_string().contains("maybe"));
    }

    #[test]
    fn missing_active_is_invalid() {
        let err = UpdateEvent::parse(Some("a"), None, Some("1")).unwrap_err();
        assert_eq!(
            err,
            EventError::InvalidActive {
                value: String::new()
            }
        );
    }

    #[test]
    fn invalid_value_is_reported() {
        let err = UpdateEvent::parse(None, Some("true"), Some("1.5")).unwrap_err();
        assert_eq!(err.parameter(), "value");

        let err = UpdateEvent::parse(None, Some("true"), Some("9223372036854775808")).unwrap_err();
        assert_eq!(err.parameter(), "value");

        let err = UpdateEvent::parse(None, Some("true"), None).unwrap_err();
        assert_eq!(err.parameter(), "value");
    }

    #[test]
    fn value_accepts_i64_bounds() {
        let ev = UpdateEvent::parse(None, Some("true"), Some("9223372036854775807")).unwrap();
        assert_eq!(ev.metric_value, i64::MAX);
        let ev = UpdateEvent::parse(None, Some("true"), Some("+3")).unwrap();
        assert_eq!(ev.metric_value, 3);
    }
}
