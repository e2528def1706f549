//! Runtime settings.
//!
//! Settings come from an optional config file (any format the `config` crate
//! understands, usually TOML), then `FLEETWATCH_*` environment variables.
//! The binary applies its command-line flags on top.
//!
//! ```toml
//! fleet_file = "/var/lib/fleetwatch/fleet.json"
//! refresh_interval = "10s"
//! ignore_after = "2m"
//! upstream_timeout = 5
//! log = "fleetwatch=debug"
//! ```

use std::path::{Path, PathBuf};
use std::time::Duration;

use config::{Config, Environment, File};
use serde::{Deserialize, Serialize};

use crate::data::duration::parse_duration;
use crate::data::{Staleness, StalenessInput};
use crate::error::Result;

/// Prefix of environment variables read into [`Settings`].
pub const ENV_PREFIX: &str = "FLEETWATCH";

/// A duration given as whole seconds or a human expression.
///
/// Unlike a staleness threshold, an invalid value is an error.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum DurationValue {
    Seconds(u64),
    Expression(String),
}

impl DurationValue {
    pub fn resolve(&self) -> Result<Duration> {
        match self {
            DurationValue::Seconds(secs) => Ok(Duration::from_secs(*secs)),
            DurationValue::Expression(expr) => parse_duration(expr),
        }
    }
}

impl From<&str> for DurationValue {
    fn from(expr: &str) -> Self {
        DurationValue::Expression(expr.to_string())
    }
}

/// Everything the binary needs to run.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Settings {
    /// Fleet file read by the bundled file source.
    pub fleet_file: PathBuf,
    pub refresh_interval: DurationValue,
    /// Hide entities silent for longer than this. Unset shows everything.
    pub ignore_after: Option<StalenessInput>,
    pub upstream_timeout: DurationValue,
    /// `tracing` filter directive.
    pub log: String,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            fleet_file: PathBuf::from("fleet.json"),
            refresh_interval: DurationValue::from("5s"),
            ignore_after: None,
            upstream_timeout: DurationValue::from("10s"),
            log: "info".to_string(),
        }
    }
}

impl Settings {
    /// Load settings from an optional file and the environment.
    pub fn load(path: Option<&Path>) -> Result<Self> {
        Self::load_with_prefix(path, ENV_PREFIX)
    }

    fn load_with_prefix(path: Option<&Path>, prefix: &str) -> Result<Self> {
        let mut builder = Config::builder();
        if let Some(path) = path {
            builder = builder.add_source(File::from(path));
        }

        let settings = builder
            .add_source(Environment::with_prefix(prefix))
            .build()?
            .try_deserialize()?;
        Ok(settings)
    }

    pub fn refresh_interval(&self) -> Result<Duration> {
        self.refresh_interval.resolve()
    }

    pub fn upstream_timeout(&self) -> Result<Duration> {
        self.upstream_timeout.resolve()
    }

    pub fn staleness(&self) -> Staleness {
        Staleness::from_input(self.ignore_after.as_ref())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::Error;
    use std::io::Write;
    use tempfile::Builder;

    fn toml_file(content: &str) -> tempfile::NamedTempFile {
        let mut file = Builder::new().suffix(".toml").tempfile().unwrap();
        write!(file, "{}", content).unwrap();
        file
    }

    #[test]
    fn test_defaults() {
        let settings = Settings::load_with_prefix(None, "FLEETWATCH_TEST_DEFAULTS").unwrap();

        assert_eq!(settings, Settings::default());
        assert_eq!(settings.refresh_interval().unwrap(), Duration::from_secs(5));
        assert_eq!(settings.upstream_timeout().unwrap(), Duration::from_secs(10));
        assert_eq!(settings.staleness(), Staleness::disabled());
    }

    #[test]
    fn test_load_from_file() {
        let file = toml_file(
            r#"
            fleet_file = "/srv/fleet.json"
            refresh_interval = 30
            ignore_after = "1m"
            "#,
        );

        let settings =
            Settings::load_with_prefix(Some(file.path()), "FLEETWATCH_TEST_FILE").unwrap();

        assert_eq!(settings.fleet_file, PathBuf::from("/srv/fleet.json"));
        assert_eq!(settings.refresh_interval().unwrap(), Duration::from_secs(30));
        assert_eq!(
            settings.staleness(),
            Staleness::after(Duration::from_secs(60))
        );
        assert_eq!(settings.log, "info");
    }

    #[test]
    fn test_environment_overrides_file() {
        let file = toml_file("log = \"warn\"\nignore_after = 10\n");
        std::env::set_var("FLEETWATCH_TEST_ENV_LOG", "debug");
        std::env::set_var("FLEETWATCH_TEST_ENV_IGNORE_AFTER", "90");

        let settings =
            Settings::load_with_prefix(Some(file.path()), "FLEETWATCH_TEST_ENV").unwrap();

        assert_eq!(settings.log, "debug");
        assert_eq!(
            settings.staleness().threshold(),
            Some(Duration::from_secs(90))
        );
    }

    #[test]
    fn test_invalid_interval_is_an_error() {
        let file = toml_file("refresh_interval = \"soonish\"\n");

        let settings =
            Settings::load_with_prefix(Some(file.path()), "FLEETWATCH_TEST_INVALID").unwrap();

        assert!(matches!(settings.refresh_interval(), Err(Error::Duration(_))));
    }

    #[test]
    fn test_missing_file_is_an_error() {
        let err = Settings::load_with_prefix(
            Some(Path::new("/nonexistent/fleetwatch.toml")),
            "FLEETWATCH_TEST_MISSING",
        )
        .unwrap_err();

        assert!(matches!(err, Error::Config(_)));
    }
}
