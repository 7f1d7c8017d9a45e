//! Runtime configuration, read from an optional RON file and overridden by flags.

use std::fs;
use std::path::Path;
use std::time::Duration;

use anyhow::Context;
use serde::{Deserialize, Serialize};
use vmbox_core::{
    CoreConfig, DEFAULT_CREDENTIAL_FIELD, DEFAULT_ERROR_MARKER, DEFAULT_FORM_NAME,
    DEFAULT_MAX_POLL_ATTEMPTS, DEFAULT_POLL_INTERVAL,
};
use vmbox_engine::ClientSettings;

use super::cli::Cli;

pub const DEFAULT_REGION: &str = "scenario_sidebar";

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct AppConfig {
    pub poll_interval_ms: u64,
    pub max_poll_attempts: Option<u32>,
    pub form_name: String,
    pub credential_field: String,
    pub error_marker: String,
    pub region: String,
    pub connect_timeout_secs: u64,
    pub request_timeout_secs: u64,
    pub max_body_bytes: u64,
    pub cookies: Vec<String>,
}

impl Default for AppConfig {
    fn default() -> Self {
        let client = ClientSettings::default();
        Self {
            poll_interval_ms: DEFAULT_POLL_INTERVAL.as_millis() as u64,
            max_poll_attempts: Some(DEFAULT_MAX_POLL_ATTEMPTS),
            form_name: DEFAULT_FORM_NAME.to_string(),
            credential_field: DEFAULT_CREDENTIAL_FIELD.to_string(),
            error_marker: DEFAULT_ERROR_MARKER.to_string(),
            region: DEFAULT_REGION.to_string(),
            connect_timeout_secs: client.connect_timeout.as_secs(),
            request_timeout_secs: client.request_timeout.as_secs(),
            max_body_bytes: client.max_body_bytes,
            cookies: Vec::new(),
        }
    }
}

impl AppConfig {
    /// Reads `path` if given; no path means defaults.
    pub fn load(path: Option<&Path>) -> anyhow::Result<Self> {
        let Some(path) = path else {
            return Ok(Self::default());
        };
        let content = fs::read_to_string(path)
            .with_context(|| format!("reading config file {}", path.display()))?;
        ron::from_str(&content).with_context(|| format!("parsing config file {}", path.display()))
    }

    pub fn apply_cli(&mut self, cli: &Cli) {
        if let Some(region) = &cli.region {
            self.region = region.clone();
        }
        if let Some(interval) = cli.poll_interval_ms {
            self.poll_interval_ms = interval;
        }
        if cli.unbounded {
            self.max_poll_attempts = None;
        } else if let Some(limit) = cli.max_attempts {
            self.max_poll_attempts = Some(limit);
        }
        self.cookies.extend(cli.cookies.iter().cloned());
    }

    pub fn core_config(&self) -> CoreConfig {
        CoreConfig {
            poll_interval: Duration::from_millis(self.poll_interval_ms),
            max_poll_attempts: self.max_poll_attempts,
            form_name: self.form_name.clone(),
            credential_field: self.credential_field.clone(),
            error_marker: self.error_marker.clone(),
        }
    }

    pub fn client_settings(&self) -> ClientSettings {
        ClientSettings {
            connect_timeout: Duration::from_secs(self.connect_timeout_secs),
            request_timeout: Duration::from_secs(self.request_timeout_secs),
            max_body_bytes: self.max_body_bytes,
            credential_field: self.credential_field.clone(),
            ..ClientSettings::default()
        }
    }
}

#[cfg(test)]
mod tests {
    use std::io::Write;
    use std::time::Duration;

    use clap::Parser;
    use pretty_assertions::assert_eq;
    use tempfile::NamedTempFile;

    use super::{AppConfig, Cli};

    #[test]
    fn missing_path_gives_defaults() {
        let config = AppConfig::load(None).unwrap();
        assert_eq!(config, AppConfig::default());
        assert_eq!(config.core_config().poll_interval, Duration::from_millis(1500));
        assert_eq!(config.core_config().max_poll_attempts, Some(400));
    }

    #[test]
    fn partial_file_keeps_other_defaults() {
        let mut file = NamedTempFile::new().unwrap();
        writeln!(
            file,
            r#"(poll_interval_ms: 250, max_poll_attempts: None, region: "dynamic_content", cookies: ["sessionid=x"])"#
        )
        .unwrap();

        let config = AppConfig::load(Some(file.path())).unwrap();
        assert_eq!(config.poll_interval_ms, 250);
        assert_eq!(config.max_poll_attempts, None);
        assert_eq!(config.region, "dynamic_content");
        assert_eq!(config.cookies, vec!["sessionid=x".to_string()]);
        assert_eq!(config.form_name, "vmbox_form");
        assert_eq!(config.client_settings().credential_field, "csrfmiddlewaretoken");
    }

    #[test]
    fn unreadable_or_invalid_files_are_errors() {
        let missing = AppConfig::load(Some(std::path::Path::new("/nonexistent/vmbox.ron")));
        assert!(missing.is_err());

        let mut file = NamedTempFile::new().unwrap();
        writeln!(file, "(poll_interval_ms: \"soon\")").unwrap();
        let err = AppConfig::load(Some(file.path())).unwrap_err();
        assert!(format!("{err:#}").contains("parsing config file"));
    }

    #[test]
    fn flags_override_file_values() {
        let cli = Cli::try_parse_from([
            "vmbox",
            "--page",
            "http://lab.example/",
            "--region",
            "sidebar",
            "--poll-interval-ms",
            "100",
            "--unbounded",
            "--cookie",
            "csrftoken=c",
        ])
        .unwrap();
        let mut config = AppConfig {
            cookies: vec!["sessionid=s".to_string()],
            ..AppConfig::default()
        };
        config.apply_cli(&cli);

        assert_eq!(config.region, "sidebar");
        assert_eq!(config.poll_interval_ms, 100);
        assert_eq!(config.max_poll_attempts, None);
        assert_eq!(
            config.cookies,
            vec!["sessionid=s".to_string(), "csrftoken=c".to_string()]
        );
    }
}
