// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Dispatcher configuration.
//
// Layered with figment: built-in defaults, then an optional TOML file, then
// `SPOOLGATE_`-prefixed environment variables (`__` separates sections),
// then the bare `BOOTSTRAP_SERVERS` variable for the queue address.

use std::path::{Path, PathBuf};
use std::time::Duration;

use figment::Figment;
use figment::providers::{Env, Format, Serialized, Toml};
use serde::{Deserialize, Serialize};

use crate::error::{DispatchError, Result};

/// Environment variable carrying the queue bootstrap address.
pub const BOOTSTRAP_ENV: &str = "BOOTSTRAP_SERVERS";

/// When the intake loop marks a message as consumed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CommitPolicy {
    /// Advance past every message, whatever the job outcome.
    Always,
    /// Advance a partition only while its jobs reach `Done`. The first
    /// failed job freezes that partition's position until restart.
    AfterSuccess,
}

/// Inbound message stream settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct StreamConfig {
    pub topic: String,
    pub group_id: String,
    /// Comma-separated broker list. No default; normally set from
    /// `BOOTSTRAP_SERVERS`.
    pub bootstrap_servers: Option<String>,
    /// Offset reset policy for a consumer group with no committed offset.
    pub auto_offset_reset: String,
    pub commit_policy: CommitPolicy,
}

impl Default for StreamConfig {
    fn default() -> Self {
        Self {
            topic: "PrintJobs".into(),
            group_id: "print_group".into(),
            bootstrap_servers: None,
            auto_offset_reset: "earliest".into(),
            commit_policy: CommitPolicy::Always,
        }
    }
}

/// Target spooler settings. The printer is fixed per deployment, never taken
/// from the job message.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct PrinterConfig {
    pub name: String,
    /// Base URI of the CUPS server.
    pub cups_uri: String,
    /// `job-name` shown in the spooler queue.
    pub job_title: String,
}

impl Default for PrinterConfig {
    fn default() -> Self {
        Self {
            name: "HP_LaserJet_Professional_M1136_MFP".into(),
            cups_uri: "ipp://localhost:631".into(),
            job_title: "Print Job".into(),
        }
    }
}

/// Per-job pipeline settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct PipelineConfig {
    /// Pause between jobs, protecting the printer from bursts.
    pub job_delay_ms: u64,
    /// Directory for transient documents. `None` means the system temp dir.
    pub temp_dir: Option<PathBuf>,
    pub temp_suffix: String,
    pub download_timeout_secs: u64,
    pub spooler_timeout_secs: u64,
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self {
            job_delay_ms: 1000,
            temp_dir: None,
            temp_suffix: ".pdf".into(),
            download_timeout_secs: 60,
            spooler_timeout_secs: 30,
        }
    }
}

impl PipelineConfig {
    pub fn job_delay(&self) -> Duration {
        Duration::from_millis(self.job_delay_ms)
    }

    pub fn download_timeout(&self) -> Duration {
        Duration::from_secs(self.download_timeout_secs)
    }

    pub fn spooler_timeout(&self) -> Duration {
        Duration::from_secs(self.spooler_timeout_secs)
    }

    /// Resolved directory for transient documents.
    pub fn temp_dir(&self) -> PathBuf {
        self.temp_dir.clone().unwrap_or_else(std::env::temp_dir)
    }
}

/// Complete dispatcher configuration.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct DispatcherConfig {
    pub stream: StreamConfig,
    pub printer: PrinterConfig,
    pub pipeline: PipelineConfig,
}

impl DispatcherConfig {
    /// Load configuration from defaults, an optional TOML file, and the
    /// environment.
    pub fn load(path: Option<&Path>) -> Result<Self> {
        let mut figment = Figment::from(Serialized::defaults(Self::default()));

        if let Some(path) = path {
            if !path.exists() {
                return Err(DispatchError::Config(format!(
                    "config file not found: {}",
                    path.display()
                )));
            }
            figment = figment.merge(Toml::file(path));
        }

        let config: Self = figment
            .merge(Env::prefixed("SPOOLGATE_").split("__"))
            .merge(
                Env::raw()
                    .only(&[BOOTSTRAP_ENV])
                    .map(|_| "stream.bootstrap_servers".into()),
            )
            .extract()
            .map_err(|e| DispatchError::Config(e.to_string()))?;

        config.validate()?;
        Ok(config)
    }

    /// Parse configuration from a TOML string over the defaults. No
    /// environment lookup.
    pub fn from_toml_str(toml: &str) -> Result<Self> {
        let config: Self = Figment::from(Serialized::defaults(Self::default()))
            .merge(Toml::string(toml))
            .extract()
            .map_err(|e| DispatchError::Config(e.to_string()))?;

        config.validate()?;
        Ok(config)
    }

    /// Checks that apply to every mode of operation.
    pub fn validate(&self) -> Result<()> {
        if self.printer.name.trim().is_empty() {
            return Err(DispatchError::Config("printer.name must not be empty".into()));
        }
        if !self.printer.cups_uri.starts_with("ipp://")
            && !self.printer.cups_uri.starts_with("ipps://")
        {
            return Err(DispatchError::Config(format!(
                "printer.cups_uri must be an ipp:// or ipps:// URI, got '{}'",
                self.printer.cups_uri
            )));
        }
        if self.pipeline.download_timeout_secs == 0 || self.pipeline.spooler_timeout_secs == 0 {
            return Err(DispatchError::Config("timeouts must be at least 1 second".into()));
        }
        if self.pipeline.temp_suffix.is_empty() {
            return Err(DispatchError::Config("pipeline.temp_suffix must not be empty".into()));
        }
        if let Some(dir) = &self.pipeline.temp_dir
            && !dir.is_dir()
        {
            return Err(DispatchError::Config(format!(
                "pipeline.temp_dir {} is not an existing directory",
                dir.display()
            )));
        }
        Ok(())
    }

    /// Extra checks for the queue-driven mode. Returns the bootstrap address.
    pub fn validate_stream(&self) -> Result<&str> {
        if self.stream.topic.trim().is_empty() {
            return Err(DispatchError::Config("stream.topic must not be empty".into()));
        }
        match self.stream.bootstrap_servers.as_deref() {
            Some(servers) if !servers.trim().is_empty() => Ok(servers),
            _ => Err(DispatchError::Config(format!(
                "no bootstrap servers configured; set {BOOTSTRAP_ENV}"
            ))),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;
    use tempfile::NamedTempFile;

    #[test]
    fn defaults_match_the_deployed_dispatcher() {
        let config = DispatcherConfig::default();
        assert_eq!(config.stream.topic, "PrintJobs");
        assert_eq!(config.stream.group_id, "print_group");
        assert_eq!(config.stream.auto_offset_reset, "earliest");
        assert_eq!(config.stream.commit_policy, CommitPolicy::Always);
        assert_eq!(config.printer.name, "HP_LaserJet_Professional_M1136_MFP");
        assert_eq!(config.pipeline.job_delay(), Duration::from_secs(1));
        assert!(config.validate().is_ok());
    }

    #[test]
    fn partial_toml_keeps_other_defaults() {
        let config = DispatcherConfig::from_toml_str(
            r#"
[printer]
name = "Office_Laser"

[stream]
commit_policy = "after_success"
"#,
        )
        .unwrap();
        assert_eq!(config.printer.name, "Office_Laser");
        assert_eq!(config.printer.cups_uri, "ipp://localhost:631");
        assert_eq!(config.stream.commit_policy, CommitPolicy::AfterSuccess);
        assert_eq!(config.stream.topic, "PrintJobs");
    }

    #[test]
    fn empty_printer_name_is_rejected() {
        let result = DispatcherConfig::from_toml_str("[printer]\nname = \"\"\n");
        assert!(matches!(result, Err(DispatchError::Config(_))));
    }

    #[test]
    fn zero_timeout_is_rejected() {
        let result = DispatcherConfig::from_toml_str("[pipeline]\nspooler_timeout_secs = 0\n");
        assert!(matches!(result, Err(DispatchError::Config(_))));
    }

    #[test]
    fn stream_mode_requires_bootstrap_servers() {
        let mut config = DispatcherConfig::default();
        assert!(config.validate_stream().is_err());

        config.stream.bootstrap_servers = Some("broker-1:9092".into());
        assert_eq!(config.validate_stream().unwrap(), "broker-1:9092");
    }

    #[test]
    fn missing_config_file_is_an_error() {
        let result = DispatcherConfig::load(Some(Path::new("/nonexistent/spoolgate.toml")));
        assert!(matches!(result, Err(DispatchError::Config(_))));
    }

    #[test]
    fn loads_from_file() {
        let spool_dir = tempfile::tempdir().unwrap();
        let mut file = NamedTempFile::new().unwrap();
        writeln!(
            file,
            r#"
[pipeline]
job_delay_ms = 250
temp_dir = "{}"
"#,
            spool_dir.path().display()
        )
        .unwrap();

        let config = DispatcherConfig::load(Some(file.path())).unwrap();
        assert_eq!(config.pipeline.job_delay(), Duration::from_millis(250));
        assert_eq!(config.pipeline.temp_dir(), spool_dir.path());
    }

    #[test]
    fn missing_temp_dir_is_rejected_at_startup() {
        let result = DispatcherConfig::from_toml_str(
            "[pipeline]\ntemp_dir = \"/nonexistent/spoolgate-spool\"\n",
        );
        assert!(matches!(result, Err(DispatchError::Config(msg)) if msg.contains("temp_dir")));
    }

    #[test]
    fn temp_dir_must_be_a_directory() {
        let file = NamedTempFile::new().unwrap();
        let mut config = DispatcherConfig::default();
        config.pipeline.temp_dir = Some(file.path().to_path_buf());
        assert!(matches!(config.validate(), Err(DispatchError::Config(_))));
    }
}
