//! Explicit configuration for s3sync.
//!
//! Settings are layered with [`figment`]: a config file (TOML, YAML or
//! JSON, picked by extension) and then `S3SYNC_`-prefixed environment
//! variables. Anything missing from both falls back to [`Config::default()`].
//!
//! The older INI format is not read. To move an existing `config.ini`
//! across, drop its `[Settings]` header and save the `key = value` lines as
//! `config.toml`, quoting the string values. The old key names
//! (`aws_access_key`, `aws_secret_key`, `bucket_name`, `computer_id`) are
//! accepted as aliases, so nothing needs renaming:
//!
//! ```toml
//! aws_access_key = "AKIA..."
//! aws_secret_key = "..."
//! bucket_name = "my-bucket"
//! computer_id = "desktop"
//! interval = 1
//! interval_unit = "Hours"
//! ```

pub mod error;

use crate::error::{ErrorKind, Result, UnknownUnit};
use derive_more::Display;
use directories::ProjectDirs;
use exn::ResultExt;
use figment::Figment;
use figment::providers::{Env, Format, Json, Toml, Yaml};
use serde::{Deserialize, Deserializer, Serialize, de};
use std::path::{Path, PathBuf};
use std::str::FromStr;
use std::time::Duration;

/// Environment variables with this prefix override file settings.
pub const ENV_PREFIX: &str = "S3SYNC_";
/// Name of the config file looked up in the platform config directory.
pub const CONFIG_FILE_NAME: &str = "config.toml";

#[derive(Debug, Display, Clone, Copy, Default, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum IntervalUnit {
    #[display("seconds")]
    Seconds,
    #[default]
    #[display("minutes")]
    Minutes,
    #[display("hours")]
    Hours,
    #[display("days")]
    Days,
}
impl IntervalUnit {
    pub fn seconds(&self) -> u64 {
        match self {
            Self::Seconds => 1,
            Self::Minutes => 60,
            Self::Hours => 60 * 60,
            Self::Days => 24 * 60 * 60,
        }
    }
}
impl FromStr for IntervalUnit {
    type Err = UnknownUnit;
    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "s" | "sec" | "secs" | "second" | "seconds" => Ok(Self::Seconds),
            "m" | "min" | "mins" | "minute" | "minutes" => Ok(Self::Minutes),
            "h" | "hour" | "hours" => Ok(Self::Hours),
            "d" | "day" | "days" => Ok(Self::Days),
            _ => Err(UnknownUnit(s.to_string())),
        }
    }
}
// Config files and the environment accept the same spellings as the CLI.
impl<'de> Deserialize<'de> for IntervalUnit {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> std::result::Result<Self, D::Error> {
        let unit = String::deserialize(deserializer)?;
        unit.parse().map_err(de::Error::custom)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    #[serde(alias = "aws_access_key")]
    pub access_key: String,
    #[serde(alias = "aws_secret_key")]
    pub secret_key: String,
    #[serde(alias = "bucket_name")]
    pub bucket: String,
    pub region: String,
    /// Custom endpoint for S3-compatible services (MinIO, R2, ...)
    pub endpoint: Option<String>,
    /// Every namespace lives under this prefix
    pub prefix: String,
    /// Usually one per machine
    #[serde(alias = "computer_id")]
    pub namespace: String,
    pub backup_dir: Option<PathBuf>,
    pub restore_dir: Option<PathBuf>,
    pub interval: u64,
    pub interval_unit: IntervalUnit,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            access_key: String::new(),
            secret_key: String::new(),
            bucket: String::new(),
            region: "us-east-1".to_string(),
            endpoint: None,
            prefix: "backup".to_string(),
            namespace: "Default".to_string(),
            backup_dir: None,
            restore_dir: None,
            interval: 60,
            interval_unit: IntervalUnit::Minutes,
        }
    }
}

impl Config {
    /// Load settings from `path` (or the default config file, if there is
    /// one) and the environment.
    ///
    /// An explicit `path` must exist; the default location is optional.
    pub fn load(path: Option<&Path>) -> Result<Self> {
        Self::from_figment(Self::figment(path)?)
    }

    /// The layered sources, before extraction.
    pub fn figment(path: Option<&Path>) -> Result<Figment> {
        let figment = match path {
            Some(path) => {
                if !path.is_file() {
                    exn::bail!(ErrorKind::NotFound(path.to_path_buf()));
                }
                with_file(Figment::new(), path)?
            },
            None => match default_path() {
                Some(path) if path.is_file() => with_file(Figment::new(), &path)?,
                _ => Figment::new(),
            },
        };
        Ok(figment.merge(Env::prefixed(ENV_PREFIX)))
    }

    pub fn from_figment(figment: Figment) -> Result<Self> {
        let config: Self = figment.extract().or_raise(|| ErrorKind::Load)?;
        tracing::debug!(bucket = %config.bucket, namespace = %config.namespace, "Configuration loaded");
        Ok(config)
    }

    /// Reject blank credentials or bucket before anything talks to the
    /// network.
    pub fn validate_credentials(&self) -> Result<()> {
        let required = [
            ("access_key", &self.access_key),
            ("secret_key", &self.secret_key),
            ("bucket", &self.bucket),
        ];
        for (name, value) in required {
            if value.trim().is_empty() {
                exn::bail!(ErrorKind::Missing(name));
            }
        }
        Ok(())
    }

    /// Time between two recurring backups.
    pub fn schedule(&self) -> Result<Duration> {
        if self.interval == 0 {
            exn::bail!(ErrorKind::ZeroInterval);
        }
        Ok(Duration::from_secs(self.interval.saturating_mul(self.interval_unit.seconds())))
    }
}

/// `config.toml` in the platform's config directory, e.g.
/// `~/.config/s3sync/config.toml` on Linux.
pub fn default_path() -> Option<PathBuf> {
    ProjectDirs::from("", "", "s3sync").map(|dirs| dirs.config_dir().join(CONFIG_FILE_NAME))
}

fn with_file(figment: Figment, path: &Path) -> Result<Figment> {
    let extension = path.extension().and_then(|e| e.to_str()).map(str::to_ascii_lowercase);
    let figment = match extension.as_deref() {
        Some("toml") => figment.merge(Toml::file(path)),
        Some("yaml" | "yml") => figment.merge(Yaml::file(path)),
        Some("json") => figment.merge(Json::file(path)),
        _ => exn::bail!(ErrorKind::UnknownFormat(path.to_path_buf())),
    };
    tracing::debug!(path = %path.display(), "Reading config file");
    Ok(figment)
}

#[cfg(test)]
mod tests {
    use super::*;
    use figment::Jail;
    use rstest::rstest;

    #[test]
    fn test_defaults() {
        Jail::expect_with(|jail| {
            jail.create_file("empty.toml", "")?;
            let config = Config::load(Some(Path::new("empty.toml"))).unwrap();
            assert_eq!(config, Config::default());
            assert_eq!(config.region, "us-east-1");
            assert_eq!(config.namespace, "Default");
            assert_eq!(config.schedule().unwrap(), Duration::from_secs(60 * 60));
            Ok(())
        });
    }

    #[test]
    fn test_toml_file() {
        Jail::expect_with(|jail| {
            jail.create_file(
                "s3sync.toml",
                r#"
                access_key = "AKIA"
                secret_key = "secret"
                bucket = "my-bucket"
                endpoint = "http://localhost:9000"
                namespace = "laptop"
                backup_dir = "/home/me/Documents"
                interval = 2
                interval_unit = "hours"
                "#,
            )?;
            let config = Config::load(Some(Path::new("s3sync.toml"))).unwrap();
            assert_eq!(config.bucket, "my-bucket");
            assert_eq!(config.endpoint.as_deref(), Some("http://localhost:9000"));
            assert_eq!(config.namespace, "laptop");
            assert_eq!(config.backup_dir, Some(PathBuf::from("/home/me/Documents")));
            assert_eq!(config.schedule().unwrap(), Duration::from_secs(2 * 60 * 60));
            assert!(config.validate_credentials().is_ok());
            Ok(())
        });
    }

    #[test]
    fn test_legacy_key_names() {
        Jail::expect_with(|jail| {
            jail.create_file(
                "legacy.yaml",
                "aws_access_key: AKIA\naws_secret_key: secret\nbucket_name: old-bucket\ncomputer_id: desktop\ninterval_unit: Days\n",
            )?;
            let config = Config::load(Some(Path::new("legacy.yaml"))).unwrap();
            assert_eq!(config.access_key, "AKIA");
            assert_eq!(config.secret_key, "secret");
            assert_eq!(config.bucket, "old-bucket");
            assert_eq!(config.namespace, "desktop");
            assert_eq!(config.interval_unit, IntervalUnit::Days);
            Ok(())
        });
    }

    #[test]
    fn test_converted_ini_file() {
        Jail::expect_with(|jail| {
            jail.create_file(
                "config.toml",
                r#"
                aws_access_key = "AKIA"
                aws_secret_key = "secret"
                bucket_name = "old-bucket"
                computer_id = "desktop"
                interval = 1
                interval_unit = "Hours"
                "#,
            )?;
            let config = Config::load(Some(Path::new("config.toml"))).unwrap();
            assert_eq!(config.bucket, "old-bucket");
            assert_eq!(config.namespace, "desktop");
            assert_eq!(config.schedule().unwrap(), Duration::from_secs(60 * 60));
            assert!(config.validate_credentials().is_ok());
            Ok(())
        });
    }

    #[rstest]
    #[case("HOURS", IntervalUnit::Hours)]
    #[case("h", IntervalUnit::Hours)]
    #[case("Sec", IntervalUnit::Seconds)]
    fn test_file_unit_any_case(#[case] unit: &str, #[case] expected: IntervalUnit) {
        Jail::expect_with(|jail| {
            jail.create_file("config.toml", &format!("interval_unit = \"{unit}\""))?;
            let config = Config::load(Some(Path::new("config.toml"))).unwrap();
            assert_eq!(config.interval_unit, expected);
            Ok(())
        });
    }

    #[rstest]
    #[case("h", IntervalUnit::Hours)]
    #[case("DAYS", IntervalUnit::Days)]
    fn test_environment_unit_any_case(#[case] unit: &str, #[case] expected: IntervalUnit) {
        Jail::expect_with(|jail| {
            jail.create_file("config.toml", "")?;
            jail.set_env("S3SYNC_INTERVAL_UNIT", unit);
            let config = Config::load(Some(Path::new("config.toml"))).unwrap();
            assert_eq!(config.interval_unit, expected);
            Ok(())
        });
    }

    #[test]
    fn test_file_unknown_unit() {
        Jail::expect_with(|jail| {
            jail.create_file("config.toml", "interval_unit = \"fortnights\"")?;
            let err = Config::load(Some(Path::new("config.toml"))).unwrap_err();
            assert!(matches!(&*err, ErrorKind::Load));
            Ok(())
        });
    }

    #[test]
    fn test_environment_overrides_file() {
        Jail::expect_with(|jail| {
            jail.create_file("config.json", r#"{"bucket": "from-file", "region": "eu-west-2"}"#)?;
            jail.set_env("S3SYNC_BUCKET", "from-env");
            jail.set_env("S3SYNC_INTERVAL", "15");
            let config = Config::load(Some(Path::new("config.json"))).unwrap();
            assert_eq!(config.bucket, "from-env");
            assert_eq!(config.region, "eu-west-2");
            assert_eq!(config.interval, 15);
            Ok(())
        });
    }

    #[test]
    fn test_missing_or_unknown_file() {
        Jail::expect_with(|jail| {
            let err = Config::load(Some(Path::new("nope.toml"))).unwrap_err();
            assert!(matches!(&*err, ErrorKind::NotFound(_)));
            jail.create_file("config.ini", "[Settings]\n")?;
            let err = Config::load(Some(Path::new("config.ini"))).unwrap_err();
            assert!(matches!(&*err, ErrorKind::UnknownFormat(_)));
            Ok(())
        });
    }

    #[test]
    fn test_invalid_value() {
        Jail::expect_with(|jail| {
            jail.create_file("config.toml", "interval = \"soon\"")?;
            let err = Config::load(Some(Path::new("config.toml"))).unwrap_err();
            assert!(matches!(&*err, ErrorKind::Load));
            Ok(())
        });
    }

    #[rstest]
    #[case("", "secret", "bucket", "access_key")]
    #[case("AKIA", "  ", "bucket", "secret_key")]
    #[case("AKIA", "secret", "", "bucket")]
    fn test_validate_credentials(
        #[case] access_key: &str,
        #[case] secret_key: &str,
        #[case] bucket: &str,
        #[case] missing: &str,
    ) {
        let config = Config {
            access_key: access_key.to_string(),
            secret_key: secret_key.to_string(),
            bucket: bucket.to_string(),
            ..Config::default()
        };
        let err = config.validate_credentials().unwrap_err();
        assert!(matches!(&*err, ErrorKind::Missing(name) if *name == missing));
    }

    #[test]
    fn test_zero_interval() {
        let config = Config { interval: 0, ..Config::default() };
        let err = config.schedule().unwrap_err();
        assert!(matches!(&*err, ErrorKind::ZeroInterval));
    }

    #[rstest]
    #[case("seconds", IntervalUnit::Seconds)]
    #[case("Minutes", IntervalUnit::Minutes)]
    #[case("h", IntervalUnit::Hours)]
    #[case("DAYS", IntervalUnit::Days)]
    fn test_parse_unit(#[case] input: &str, #[case] expected: IntervalUnit) {
        assert_eq!(input.parse::<IntervalUnit>().unwrap(), expected);
    }

    #[test]
    fn test_parse_unknown_unit() {
        assert!("fortnights".parse::<IntervalUnit>().is_err());
    }
}
