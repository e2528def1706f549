//! Staleness threshold configuration.
//!
//! The threshold decides how long an entity may stay silent before it is
//! hidden from the fleet view entirely.

use std::fmt;
use std::time::Duration;

use serde::{Deserialize, Serialize};
use tracing::debug;

use super::duration::parse_duration;

/// Raw staleness threshold as configured by the user.
///
/// Accepts either whole seconds or a human duration expression.
///
/// # Example
///
/// ```
/// use std::time::Duration;
/// use fleetwatch::StalenessInput;
///
/// assert_eq!(StalenessInput::Seconds(60).threshold(), Some(Duration::from_secs(60)));
/// assert_eq!(StalenessInput::from("1m").threshold(), Some(Duration::from_secs(60)));
/// assert_eq!(StalenessInput::from("whenever").threshold(), None);
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum StalenessInput {
    Seconds(u64),
    Expression(String),
}

impl StalenessInput {
    /// Resolve the configured threshold.
    ///
    /// An expression that cannot be parsed disables the threshold; the
    /// failure is only logged.
    pub fn threshold(&self) -> Option<Duration> {
        match self {
            StalenessInput::Seconds(secs) => Some(Duration::from_secs(*secs)),
            StalenessInput::Expression(expr) => match parse_duration(expr) {
                Ok(d) => Some(d),
                Err(e) => {
                    debug!("Ignoring staleness threshold '{}': {}", expr, e);
                    None
                }
            },
        }
    }
}

impl From<u64> for StalenessInput {
    fn from(secs: u64) -> Self {
        StalenessInput::Seconds(secs)
    }
}

impl From<&str> for StalenessInput {
    fn from(expr: &str) -> Self {
        StalenessInput::Expression(expr.to_string())
    }
}

impl From<String> for StalenessInput {
    fn from(expr: String) -> Self {
        StalenessInput::Expression(expr)
    }
}

impl fmt::Display for StalenessInput {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            StalenessInput::Seconds(secs) => write!(f, "{}s", secs),
            StalenessInput::Expression(expr) => f.write_str(expr),
        }
    }
}

/// Resolved threshold for the merge pipeline.
///
/// `None` keeps every entity regardless of age.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct Staleness {
    threshold: Option<Duration>,
}

impl Staleness {
    /// Keep every entity.
    pub const fn disabled() -> Self {
        Self { threshold: None }
    }

    pub const fn after(threshold: Duration) -> Self {
        Self {
            threshold: Some(threshold),
        }
    }

    pub fn from_input(input: Option<&StalenessInput>) -> Self {
        Self {
            threshold: input.and_then(StalenessInput::threshold),
        }
    }

    pub fn threshold(&self) -> Option<Duration> {
        self.threshold
    }

    /// Whether a report `age_secs` old should be hidden.
    ///
    /// Exactly at the threshold is still shown.
    pub fn is_stale(&self, age_secs: i64) -> bool {
        match self.threshold {
            Some(threshold) if age_secs > 0 => Duration::from_secs(age_secs as u64) > threshold,
            _ => false,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_seconds_and_expression_agree() {
        let int = Staleness::from_input(Some(&StalenessInput::Seconds(60)));
        let expr = Staleness::from_input(Some(&StalenessInput::from("1m")));
        assert_eq!(int, expr);
        for age in [0, 59, 60, 61, 600] {
            assert_eq!(int.is_stale(age), expr.is_stale(age));
        }
    }

    #[test]
    fn test_boundary_is_exclusive() {
        let staleness = Staleness::after(Duration::from_secs(60));
        assert!(!staleness.is_stale(59));
        assert!(!staleness.is_stale(60));
        assert!(staleness.is_stale(61));
    }

    #[test]
    fn test_unparsable_disables() {
        let staleness = Staleness::from_input(Some(&StalenessInput::from("later")));
        assert_eq!(staleness.threshold(), None);
        assert!(!staleness.is_stale(1_000_000));
    }

    #[test]
    fn test_disabled_keeps_everything() {
        assert!(!Staleness::disabled().is_stale(i64::MAX));
        assert!(!Staleness::from_input(None).is_stale(i64::MAX));
    }

    #[test]
    fn test_deserialize_untagged() {
        let int: StalenessInput = serde_json::from_str("90").unwrap();
        assert_eq!(int, StalenessInput::Seconds(90));

        let expr: StalenessInput = serde_json::from_str("\"1h30m\"").unwrap();
        assert_eq!(expr.threshold(), Some(Duration::from_secs(5_400)));
    }
}
