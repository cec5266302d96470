//! Configuration loading and management.

use crate::error::{ConfigError, ConfigResult};
use reqwest::Url;
use serde::{Deserialize, Serialize};
use std::path::Path;
use std::time::Duration;

pub const DEFAULT_VIRTUAL_USERS: u32 = 100;
pub const DEFAULT_DURATION: Duration = Duration::from_secs(60);
pub const DEFAULT_REQUEST_TIMEOUT: Duration = Duration::from_secs(30);

/// Parameters for a single run. Validated once, then owned by the runner.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RunConfig {
    pub name: String,
    pub target_url: String,
    pub virtual_users: u32,
    pub duration: Duration,
    pub request_timeout: Duration,
    /// Pause between iterations of one virtual user. Zero disables it.
    pub inter_iteration_delay: Duration,
}

impl RunConfig {
    /// Config with default load parameters against `target_url`.
    pub fn new(target_url: impl Into<String>) -> Self {
        Self {
            name: "default".to_string(),
            target_url: target_url.into(),
            virtual_users: DEFAULT_VIRTUAL_USERS,
            duration: DEFAULT_DURATION,
            request_timeout: DEFAULT_REQUEST_TIMEOUT,
            inter_iteration_delay: Duration::ZERO,
        }
    }

    /// Validate configuration, returning the parsed target URL.
    pub fn validate(&self) -> ConfigResult<Url> {
        if self.virtual_users == 0 {
            return Err(ConfigError::ZeroVirtualUsers);
        }
        if self.duration.is_zero() {
            return Err(ConfigError::ZeroDuration { field: "duration" });
        }
        if self.request_timeout.is_zero() {
            return Err(ConfigError::ZeroDuration {
                field: "request_timeout",
            });
        }
        parse_target_url(&self.target_url)
    }
}

fn parse_target_url(raw: &str) -> ConfigResult<Url> {
    let raw = raw.trim();
    if raw.is_empty() {
        return Err(ConfigError::MissingTargetUrl);
    }
    let url = Url::parse(raw).map_err(|e| ConfigError::InvalidTargetUrl {
        url: raw.to_string(),
        reason: e.to_string(),
    })?;
    match url.scheme() {
        "http" | "https" => {}
        other => return Err(ConfigError::UnsupportedScheme(other.to_string())),
    }
    if url.host_str().is_none() {
        return Err(ConfigError::InvalidTargetUrl {
            url: raw.to_string(),
            reason: "missing host".to_string(),
        });
    }
    Ok(url)
}

/// A duration as written in a scenario file: `60` or `"60s"`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum DurationSpec {
    Seconds(i64),
    Text(String),
}

impl DurationSpec {
    fn resolve(&self, field: &'static str) -> ConfigResult<Duration> {
        match self {
            DurationSpec::Seconds(secs) if *secs >= 0 => Ok(Duration::from_secs(*secs as u64)),
            DurationSpec::Seconds(secs) => Err(ConfigError::InvalidDuration {
                field,
                value: secs.to_string(),
            }),
            DurationSpec::Text(text) => parse_duration(field, text),
        }
    }
}

/// Parse `"500ms"`, `"30s"`, `"2m"`, `"1h"` or a bare number of seconds.
pub fn parse_duration(field: &'static str, s: &str) -> ConfigResult<Duration> {
    let s = s.trim();
    let invalid = || ConfigError::InvalidDuration {
        field,
        value: s.to_string(),
    };

    let split = s.find(|c: char| !c.is_ascii_digit()).unwrap_or(s.len());
    let (digits, unit) = s.split_at(split);
    if digits.is_empty() {
        return Err(invalid());
    }
    let value: u64 = digits.parse().map_err(|_| invalid())?;

    let duration = match unit.trim() {
        "" | "s" => Duration::from_secs(value),
        "ms" => Duration::from_millis(value),
        "m" => Duration::from_secs(value.checked_mul(60).ok_or_else(invalid)?),
        "h" => Duration::from_secs(value.checked_mul(3600).ok_or_else(invalid)?),
        _ => return Err(invalid()),
    };
    Ok(duration)
}

/// Scenario file loaded from YAML.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Scenario {
    pub name: String,
    #[serde(default)]
    pub description: String,
    #[serde(default)]
    pub target_url: Option<String>,
    #[serde(default)]
    pub virtual_users: Option<u32>,
    #[serde(default)]
    pub duration: Option<DurationSpec>,
    #[serde(default)]
    pub request_timeout: Option<DurationSpec>,
    #[serde(default)]
    pub inter_iteration_delay: Option<DurationSpec>,
}

impl Scenario {
    /// Load a scenario from a YAML file.
    pub fn from_file(path: impl AsRef<Path>) -> ConfigResult<Self> {
        let path = path.as_ref();
        let content = std::fs::read_to_string(path).map_err(|source| ConfigError::ScenarioRead {
            path: path.to_path_buf(),
            source,
        })?;
        serde_yaml::from_str(&content).map_err(|source| ConfigError::ScenarioParse {
            path: path.to_path_buf(),
            source,
        })
    }

    /// Resolve into a run config, filling unset fields with defaults.
    ///
    /// The result is not validated; overrides may still be applied to it.
    pub fn to_run_config(&self) -> ConfigResult<RunConfig> {
        let mut config = RunConfig::new(self.target_url.clone().unwrap_or_default());
        config.name = self.name.clone();
        if let Some(vus) = self.virtual_users {
            config.virtual_users = vus;
        }
        if let Some(ref d) = self.duration {
            config.duration = d.resolve("duration")?;
        }
        if let Some(ref d) = self.request_timeout {
            config.request_timeout = d.resolve("request_timeout")?;
        }
        if let Some(ref d) = self.inter_iteration_delay {
            config.inter_iteration_delay = d.resolve("inter_iteration_delay")?;
        }
        Ok(config)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let config = RunConfig::new("http://localhost:8080/public/index.html");
        assert_eq!(config.virtual_users, 100);
        assert_eq!(config.duration, Duration::from_secs(60));
        assert_eq!(config.request_timeout, Duration::from_secs(30));
        assert!(config.inter_iteration_delay.is_zero());
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_validate_zero_virtual_users() {
        let mut config = RunConfig::new("http://localhost:8080/");
        config.virtual_users = 0;
        assert!(matches!(
            config.validate(),
            Err(ConfigError::ZeroVirtualUsers)
        ));
    }

    #[test]
    fn test_validate_zero_duration() {
        let mut config = RunConfig::new("http://localhost:8080/");
        config.duration = Duration::ZERO;
        let err = config.validate().unwrap_err();
        assert_eq!(err.field(), "duration");
    }

    #[test]
    fn test_validate_zero_request_timeout() {
        let mut config = RunConfig::new("http://localhost:8080/");
        config.request_timeout = Duration::ZERO;
        let err = config.validate().unwrap_err();
        assert_eq!(err.field(), "request_timeout");
    }

    #[test]
    fn test_validate_target_url() {
        assert!(matches!(
            RunConfig::new("").validate(),
            Err(ConfigError::MissingTargetUrl)
        ));
        assert!(matches!(
            RunConfig::new("not a url").validate(),
            Err(ConfigError::InvalidTargetUrl { .. })
        ));
        assert!(matches!(
            RunConfig::new("ftp://localhost/file").validate(),
            Err(ConfigError::UnsupportedScheme(s)) if s == "ftp"
        ));

        let url = RunConfig::new("http://host.docker.internal:8080/public/index.html")
            .validate()
            .unwrap();
        assert_eq!(url.host_str(), Some("host.docker.internal"));
        assert_eq!(url.port(), Some(8080));
    }

    #[test]
    fn test_parse_duration() {
        assert_eq!(parse_duration("d", "60s").unwrap(), Duration::from_secs(60));
        assert_eq!(parse_duration("d", "60").unwrap(), Duration::from_secs(60));
        assert_eq!(
            parse_duration("d", "250ms").unwrap(),
            Duration::from_millis(250)
        );
        assert_eq!(parse_duration("d", "2m").unwrap(), Duration::from_secs(120));
        assert_eq!(parse_duration("d", "1h").unwrap(), Duration::from_secs(3600));
        assert_eq!(parse_duration("d", "0s").unwrap(), Duration::ZERO);

        for bad in ["", "s", "-5s", "1.5s", "10x", "ten"] {
            let err = parse_duration("duration", bad).unwrap_err();
            assert_eq!(err.field(), "duration", "input {:?}", bad);
        }
    }

    #[test]
    fn test_scenario_from_yaml() {
        let yaml = r#"
name: docker
description: Static index page through the container network
target_url: http://host.docker.internal:8080/public/index.html
virtual_users: 100
duration: 60s
request_timeout: 10
inter_iteration_delay: 100ms
"#;
        let scenario: Scenario = serde_yaml::from_str(yaml).unwrap();
        let config = scenario.to_run_config().unwrap();
        assert_eq!(config.name, "docker");
        assert_eq!(config.virtual_users, 100);
        assert_eq!(config.duration, Duration::from_secs(60));
        assert_eq!(config.request_timeout, Duration::from_secs(10));
        assert_eq!(config.inter_iteration_delay, Duration::from_millis(100));
    }

    #[test]
    fn test_scenario_defaults_and_negative_duration() {
        let scenario: Scenario = serde_yaml::from_str("name: minimal\n").unwrap();
        let config = scenario.to_run_config().unwrap();
        assert_eq!(config.virtual_users, DEFAULT_VIRTUAL_USERS);
        assert!(matches!(
            config.validate(),
            Err(ConfigError::MissingTargetUrl)
        ));

        let scenario: Scenario = serde_yaml::from_str("name: neg\nduration: -5\n").unwrap();
        let err = scenario.to_run_config().unwrap_err();
        assert_eq!(err.field(), "duration");
    }
}
