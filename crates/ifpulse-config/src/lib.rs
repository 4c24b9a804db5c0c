//! YAML configuration for ifpulse.
//!
//! Loads a monitoring profile (figment: YAML file + `IFPULSE_` env
//! overrides), validates it, and translates it into the typed
//! [`MonitorConfig`] the core consumes. The core never reads files.
//!
//! ```yaml
//! community: "lab"
//! version: "2c"
//! interval: 10s
//! timeout: 5s
//! port: 161
//! max_history: 60
//!
//! groups:
//!   - name: "Aggregation"
//!     targets:
//!       - host: "172.17.1.128"
//!         label: "agg1.iad1"
//!         interfaces:
//!           - "Ethernet1"
//!           - "Ethernet2"
//! ```
//!
//! SNMPv3, globally or per target (partial per-target blocks inherit
//! the remaining fields from the global block at resolution time):
//!
//! ```yaml
//! version: "3"
//! snmpv3:
//!   username: "monitor"
//!   auth_protocol: "sha"
//!   auth_password: "authpass"
//!   priv_protocol: "aes128"
//!   priv_password: "privpass"
//! ```

use std::path::Path;
use std::time::Duration;

use figment::{
    Figment,
    providers::{Env, Format, Yaml},
};
use secrecy::SecretString;
use serde::{Deserialize, Serialize};
use thiserror::Error;

use ifpulse_core::{
    AuthProtocol, CredentialSpec, GlobalDefaults, GroupSpec, InterfaceSpec, MonitorConfig,
    PrivProtocol, RatePolicy, SnmpVersion, TargetSpec,
};

// ── Error ───────────────────────────────────────────────────────────

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("config file not found: {path}")]
    NotFound { path: String },

    #[error("invalid {field}: {reason}")]
    Validation { field: String, reason: String },

    #[error("config loading failed: {0}")]
    Figment(Box<figment::Error>),
}

impl From<figment::Error> for ConfigError {
    fn from(err: figment::Error) -> Self {
        Self::Figment(Box::new(err))
    }
}

fn invalid(field: &str, reason: impl Into<String>) -> ConfigError {
    ConfigError::Validation {
        field: field.to_owned(),
        reason: reason.into(),
    }
}

// ── Raw YAML schema ─────────────────────────────────────────────────

/// A duration as it appears in YAML: bare seconds or a humantime
/// string like `10s` / `1.5m`.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(untagged)]
pub enum RawDuration {
    Seconds(f64),
    Text(String),
}

impl RawDuration {
    fn parse(&self, field: &str) -> Result<Duration, ConfigError> {
        match self {
            Self::Seconds(secs) if *secs > 0.0 => Ok(Duration::from_secs_f64(*secs)),
            Self::Seconds(secs) => Err(invalid(field, format!("must be positive, got {secs}"))),
            Self::Text(text) => humantime::parse_duration(text.trim())
                .map_err(|e| invalid(field, format!("{e} in {text:?}"))),
        }
    }
}

/// An interface as it appears in YAML: a name to resolve against the
/// device tables, or an ifIndex (bare integer or all-digit string).
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(untagged)]
pub enum RawInterface {
    Index(u32),
    Name(String),
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct RawCredentials {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub username: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub auth_protocol: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub auth_password: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub priv_protocol: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub priv_password: Option<String>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct RawTarget {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub host: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub label: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub community: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub port: Option<u16>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub version: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub snmpv3: Option<RawCredentials>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub interfaces: Vec<RawInterface>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct RawGroup {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub targets: Vec<RawTarget>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct RawRatePolicy {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub max_rate_bps: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub reorder_guard_fraction: Option<f64>,
}

/// Top-level YAML profile.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct RawConfig {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub community: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub version: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub port: Option<u16>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub interval: Option<RawDuration>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub timeout: Option<RawDuration>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub max_history: Option<usize>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub snmpv3: Option<RawCredentials>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub rate_policy: Option<RawRatePolicy>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub groups: Vec<RawGroup>,
}

// ── Loading ─────────────────────────────────────────────────────────

/// Load and validate a monitoring profile.
///
/// Environment variables prefixed `IFPULSE_` override file values
/// (nested fields split on `__`, e.g. `IFPULSE_COMMUNITY=lab`).
pub fn load(path: impl AsRef<Path>) -> Result<MonitorConfig, ConfigError> {
    let path = path.as_ref();
    if !path.exists() {
        return Err(ConfigError::NotFound {
            path: path.display().to_string(),
        });
    }

    let raw: RawConfig = Figment::new()
        .merge(Yaml::file(path))
        .merge(Env::prefixed("IFPULSE_").ignore(&["config"]).split("__"))
        .extract()?;

    raw.into_monitor_config()
}

impl RawConfig {
    /// Validate and translate into the core's typed structure.
    pub fn into_monitor_config(self) -> Result<MonitorConfig, ConfigError> {
        if self.groups.is_empty() {
            return Err(invalid("groups", "at least one group is required"));
        }

        let mut defaults = GlobalDefaults {
            version: parse_version(self.version.as_deref(), "version")?,
            community: non_empty(self.community),
            port: self.port,
            credentials: self.snmpv3.map(parse_credentials).transpose()?,
            ..GlobalDefaults::default()
        };
        if let Some(interval) = &self.interval {
            defaults.interval = interval.parse("interval")?;
        }
        if let Some(timeout) = &self.timeout {
            defaults.timeout = timeout.parse("timeout")?;
        }
        if let Some(max_history) = self.max_history {
            if max_history == 0 {
                return Err(invalid("max_history", "must be at least 1"));
            }
            defaults.max_history = max_history;
        }

        let mut rate_policy = RatePolicy::default();
        if let Some(raw) = self.rate_policy {
            if let Some(ceiling) = raw.max_rate_bps {
                if ceiling <= 0.0 {
                    return Err(invalid("rate_policy.max_rate_bps", "must be positive"));
                }
                rate_policy.max_rate_bps = ceiling;
            }
            if let Some(fraction) = raw.reorder_guard_fraction {
                if !(0.0..1.0).contains(&fraction) {
                    return Err(invalid(
                        "rate_policy.reorder_guard_fraction",
                        "must be in [0, 1)",
                    ));
                }
                rate_policy.reorder_guard_fraction = fraction;
            }
        }

        let mut groups = Vec::with_capacity(self.groups.len());
        for (group_idx, raw_group) in self.groups.into_iter().enumerate() {
            let name = non_empty(raw_group.name).unwrap_or_else(|| "Default".to_owned());

            let mut targets = Vec::with_capacity(raw_group.targets.len());
            for raw_target in raw_group.targets {
                let host = non_empty(raw_target.host).ok_or_else(|| {
                    invalid(
                        &format!("groups[{group_idx}].targets"),
                        "every target needs a host",
                    )
                })?;
                if raw_target.interfaces.is_empty() {
                    return Err(invalid(
                        &format!("target {host}"),
                        "at least one interface is required",
                    ));
                }

                targets.push(TargetSpec {
                    version: parse_version(
                        raw_target.version.as_deref(),
                        &format!("target {host} version"),
                    )?,
                    label: non_empty(raw_target.label),
                    community: non_empty(raw_target.community),
                    port: raw_target.port,
                    credentials: raw_target.snmpv3.map(parse_credentials).transpose()?,
                    interfaces: raw_target
                        .interfaces
                        .into_iter()
                        .map(parse_interface)
                        .collect(),
                    host,
                });
            }

            groups.push(GroupSpec { name, targets });
        }

        Ok(MonitorConfig {
            defaults,
            groups,
            rate_policy,
        })
    }
}

// ── Field parsing helpers ───────────────────────────────────────────

/// Empty strings in YAML mean "unset" — normalize them away so the
/// resolution cascade in the core never sees them.
fn non_empty(value: Option<String>) -> Option<String> {
    value.filter(|s| !s.trim().is_empty())
}

fn parse_version(raw: Option<&str>, field: &str) -> Result<Option<SnmpVersion>, ConfigError> {
    match raw {
        None => Ok(None),
        Some(s) if s.trim().is_empty() => Ok(None),
        Some(s) => s
            .trim()
            .parse::<SnmpVersion>()
            .map(Some)
            .map_err(|_| invalid(field, format!("unknown SNMP version {s:?} (use 1, 2c, or 3)"))),
    }
}

fn parse_credentials(raw: RawCredentials) -> Result<CredentialSpec, ConfigError> {
    let auth_protocol = match non_empty(raw.auth_protocol) {
        None => None,
        Some(s) => Some(s.parse::<AuthProtocol>().map_err(|_| {
            invalid("snmpv3.auth_protocol", format!("unknown protocol {s:?} (use sha or md5)"))
        })?),
    };
    let priv_protocol = match non_empty(raw.priv_protocol) {
        None => None,
        Some(s) => Some(s.parse::<PrivProtocol>().map_err(|_| {
            invalid(
                "snmpv3.priv_protocol",
                format!("unknown protocol {s:?} (use aes128 or des)"),
            )
        })?),
    };

    Ok(CredentialSpec {
        username: non_empty(raw.username),
        auth_protocol,
        auth_secret: non_empty(raw.auth_password).map(SecretString::from),
        priv_protocol,
        priv_secret: non_empty(raw.priv_password).map(SecretString::from),
    })
}

fn parse_interface(raw: RawInterface) -> InterfaceSpec {
    match raw {
        RawInterface::Index(idx) => InterfaceSpec::Index(idx),
        RawInterface::Name(name) => {
            let trimmed = name.trim();
            // All-digit strings are ifIndexes too ("49" quoting is easy
            // to end up with in YAML).
            match trimmed.parse::<u32>() {
                Ok(idx) if !trimmed.is_empty() => InterfaceSpec::Index(idx),
                _ => InterfaceSpec::Name(trimmed.to_owned()),
            }
        }
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use std::io::Write;

    use pretty_assertions::assert_eq;
    use secrecy::ExposeSecret;

    use super::*;

    fn load_yaml(yaml: &str) -> Result<MonitorConfig, ConfigError> {
        let mut file = tempfile::NamedTempFile::with_suffix(".yaml").unwrap();
        file.write_all(yaml.as_bytes()).unwrap();
        load(file.path())
    }

    const MINIMAL: &str = r#"
community: "lab"
version: "2c"
interval: 10s
timeout: 5s
port: 161
max_history: 30

groups:
  - name: "Aggregation"
    targets:
      - host: "172.17.1.128"
        label: "agg1.iad1"
        interfaces:
          - "Ethernet1"
          - "49"
"#;

    #[test]
    fn minimal_profile_loads() {
        let config = load_yaml(MINIMAL).unwrap();

        assert_eq!(config.defaults.community.as_deref(), Some("lab"));
        assert_eq!(config.defaults.version, Some(SnmpVersion::V2c));
        assert_eq!(config.defaults.interval, Duration::from_secs(10));
        assert_eq!(config.defaults.timeout, Duration::from_secs(5));
        assert_eq!(config.defaults.max_history, 30);

        assert_eq!(config.groups.len(), 1);
        let target = &config.groups[0].targets[0];
        assert_eq!(target.host, "172.17.1.128");
        assert_eq!(target.label.as_deref(), Some("agg1.iad1"));
        assert_eq!(
            target.interfaces,
            vec![
                InterfaceSpec::Name("Ethernet1".into()),
                InterfaceSpec::Index(49),
            ]
        );
    }

    #[test]
    fn durations_accept_bare_seconds_and_humantime() {
        let config = load_yaml(
            r#"
interval: 30
timeout: 2500ms
groups:
  - targets:
      - host: "r1"
        interfaces: [1]
"#,
        )
        .unwrap();
        assert_eq!(config.defaults.interval, Duration::from_secs(30));
        assert_eq!(config.defaults.timeout, Duration::from_millis(2500));
    }

    #[test]
    fn snmpv3_blocks_parse_with_secrets() {
        let config = load_yaml(
            r#"
version: "3"
snmpv3:
  username: "monitor"
  auth_protocol: "sha"
  auth_password: "authpass"
  priv_protocol: "aes"
  priv_password: "privpass"
groups:
  - targets:
      - host: "r1"
        interfaces: ["Ethernet1"]
        snmpv3:
          auth_password: "other"
"#,
        )
        .unwrap();

        let global = config.defaults.credentials.as_ref().unwrap();
        assert_eq!(global.username.as_deref(), Some("monitor"));
        assert_eq!(global.auth_protocol, Some(AuthProtocol::Sha));
        assert_eq!(global.priv_protocol, Some(PrivProtocol::Aes128));
        assert_eq!(global.auth_secret.as_ref().unwrap().expose_secret(), "authpass");

        // Per-target block carries only its override.
        let local = config.groups[0].targets[0].credentials.as_ref().unwrap();
        assert_eq!(local.username, None);
        assert_eq!(local.auth_secret.as_ref().unwrap().expose_secret(), "other");
    }

    #[test]
    fn empty_strings_mean_unset() {
        let config = load_yaml(
            r#"
community: ""
groups:
  - targets:
      - host: "r1"
        community: ""
        interfaces: [1]
"#,
        )
        .unwrap();
        assert_eq!(config.defaults.community, None);
        assert_eq!(config.groups[0].targets[0].community, None);
    }

    #[test]
    fn unknown_version_is_rejected() {
        let err = load_yaml(
            r#"
version: "4"
groups:
  - targets:
      - host: "r1"
        interfaces: [1]
"#,
        )
        .unwrap_err();
        assert!(matches!(err, ConfigError::Validation { .. }), "{err}");
    }

    #[test]
    fn missing_groups_is_rejected() {
        let err = load_yaml("community: lab\n").unwrap_err();
        assert!(matches!(err, ConfigError::Validation { .. }));
    }

    #[test]
    fn target_without_interfaces_is_rejected() {
        let err = load_yaml(
            r#"
groups:
  - targets:
      - host: "r1"
        interfaces: []
"#,
        )
        .unwrap_err();
        assert!(err.to_string().contains("interface"));
    }

    #[test]
    fn missing_file_is_a_distinct_error() {
        let err = load("/nonexistent/ifpulse.yaml").unwrap_err();
        assert!(matches!(err, ConfigError::NotFound { .. }));
    }

    #[test]
    fn rate_policy_overrides_apply() {
        let config = load_yaml(
            r#"
rate_policy:
  max_rate_bps: 10000000000
  reorder_guard_fraction: 0.0001
groups:
  - targets:
      - host: "r1"
        interfaces: [1]
"#,
        )
        .unwrap();
        assert!((config.rate_policy.max_rate_bps - 1e10).abs() < 1.0);
        assert!((config.rate_policy.reorder_guard_fraction - 1e-4).abs() < 1e-12);
    }
}
