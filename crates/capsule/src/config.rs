//! Orchestrator configuration.
//!
//! Settings come from `~/.capsule.toml` when present, then from the
//! environment (`DOCKER_HOST`, `CAPSULE_HOST_OVERRIDE`,
//! `CAPSULE_STOP_TIMEOUT_SECS`), then from explicit builder calls.

use std::path::Path;
use std::time::Duration;

use capsule_common::{CapsuleError, CapsuleResult};
use serde::Deserialize;

/// Orchestrator configuration options.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct OrchestratorConfig {
    /// Docker endpoint (`unix:///var/run/docker.sock`, `tcp://host:2375`).
    /// The platform default is used when unset.
    pub docker_host: Option<String>,
    /// Host reported for published ports, overriding the one derived from
    /// the endpoint.
    pub host_override: Option<String>,
    /// Grace period before a stopping container is killed (seconds).
    pub stop_timeout_secs: u64,
    /// Timeout for requests to the daemon (seconds).
    pub connect_timeout_secs: u64,
}

impl Default for OrchestratorConfig {
    fn default() -> Self {
        Self {
            docker_host: None,
            host_override: None,
            stop_timeout_secs: 10,
            connect_timeout_secs: 120,
        }
    }
}

impl OrchestratorConfig {
    /// Name of the per-user configuration file in the home directory.
    pub const FILE_NAME: &'static str = ".capsule.toml";

    /// Load configuration from the user's file and the process environment.
    ///
    /// # Errors
    ///
    /// Returns an error if the configuration file exists but cannot be read
    /// or parsed.
    pub fn load() -> CapsuleResult<Self> {
        let config = match dirs::home_dir() {
            Some(home) => Self::from_file(home.join(Self::FILE_NAME))?,
            None => Self::default(),
        };
        config.apply_env(|key| std::env::var(key).ok())
    }

    /// Load configuration from a TOML file. A missing file yields defaults.
    ///
    /// # Errors
    ///
    /// Returns an error if the file cannot be read or parsed.
    pub fn from_file(path: impl AsRef<Path>) -> CapsuleResult<Self> {
        let path = path.as_ref();
        if !path.exists() {
            return Ok(Self::default());
        }

        let contents = std::fs::read_to_string(path)?;
        let config = Self::from_toml(&contents).map_err(|e| CapsuleError::Config {
            message: format!("{}: {e}", path.display()),
        })?;

        tracing::debug!(path = %path.display(), "Loaded configuration file");
        Ok(config)
    }

    /// Parse configuration from TOML text.
    ///
    /// # Errors
    ///
    /// Returns an error if the text is not valid configuration.
    pub fn from_toml(contents: &str) -> CapsuleResult<Self> {
        toml::from_str(contents).map_err(|e| CapsuleError::Config {
            message: e.to_string(),
        })
    }

    /// Apply environment overrides read through `lookup`.
    ///
    /// # Errors
    ///
    /// Returns an error if `CAPSULE_STOP_TIMEOUT_SECS` is not a number.
    pub fn apply_env(mut self, lookup: impl Fn(&str) -> Option<String>) -> CapsuleResult<Self> {
        if let Some(host) = lookup("DOCKER_HOST").filter(|v| !v.is_empty()) {
            self.docker_host = Some(host);
        }
        if let Some(host) = lookup("CAPSULE_HOST_OVERRIDE").filter(|v| !v.is_empty()) {
            self.host_override = Some(host);
        }
        if let Some(secs) = lookup("CAPSULE_STOP_TIMEOUT_SECS") {
            self.stop_timeout_secs = secs.parse().map_err(|_| CapsuleError::Config {
                message: format!("CAPSULE_STOP_TIMEOUT_SECS is not a number: {secs}"),
            })?;
        }
        Ok(self)
    }

    /// Set the Docker endpoint.
    #[must_use]
    pub fn with_docker_host(mut self, host: impl Into<String>) -> Self {
        self.docker_host = Some(host.into());
        self
    }

    /// Set the host reported for published ports.
    #[must_use]
    pub fn with_host_override(mut self, host: impl Into<String>) -> Self {
        self.host_override = Some(host.into());
        self
    }

    /// Set the stop grace period.
    #[must_use]
    pub fn with_stop_timeout(mut self, timeout: Duration) -> Self {
        self.stop_timeout_secs = timeout.as_secs();
        self
    }

    /// Set the daemon request timeout.
    #[must_use]
    pub fn with_connect_timeout(mut self, timeout: Duration) -> Self {
        self.connect_timeout_secs = timeout.as_secs();
        self
    }

    /// Stop grace period.
    #[must_use]
    pub const fn stop_timeout(&self) -> Duration {
        Duration::from_secs(self.stop_timeout_secs)
    }

    /// Host through which published ports are reachable.
    ///
    /// `host_override` wins; a TCP endpoint yields its host; local sockets
    /// yield `localhost`.
    #[must_use]
    pub fn daemon_host(&self) -> String {
        if let Some(host) = &self.host_override {
            return host.clone();
        }

        let Some(endpoint) = &self.docker_host else {
            return "localhost".to_string();
        };

        let Some(authority) = ["tcp://", "http://", "https://"]
            .iter()
            .find_map(|scheme| endpoint.strip_prefix(scheme))
        else {
            return "localhost".to_string();
        };

        let host = if let Some(bracketed) = authority.strip_prefix('[') {
            bracketed.split(']').next().unwrap_or_default()
        } else {
            authority.split([':', '/']).next().unwrap_or_default()
        };

        if host.is_empty() {
            "localhost".to_string()
        } else {
            host.to_string()
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    #[test]
    fn default_config() {
        let config = OrchestratorConfig::default();
        assert!(config.docker_host.is_none());
        assert_eq!(config.stop_timeout(), Duration::from_secs(10));
        assert_eq!(config.daemon_host(), "localhost");
    }

    #[test]
    fn builder_pattern() {
        let config = OrchestratorConfig::default()
            .with_docker_host("tcp://10.1.2.3:2375")
            .with_stop_timeout(Duration::from_secs(3))
            .with_connect_timeout(Duration::from_secs(30));

        assert_eq!(config.stop_timeout_secs, 3);
        assert_eq!(config.connect_timeout_secs, 30);
        assert_eq!(config.daemon_host(), "10.1.2.3");
    }

    #[test]
    fn daemon_host_from_endpoint() {
        let host = |endpoint: &str| {
            OrchestratorConfig::default()
                .with_docker_host(endpoint)
                .daemon_host()
        };
        assert_eq!(host("unix:///var/run/docker.sock"), "localhost");
        assert_eq!(host("tcp://docker.internal:2376"), "docker.internal");
        assert_eq!(host("http://[::1]:2375"), "::1");
        assert_eq!(
            OrchestratorConfig::default()
                .with_docker_host("tcp://10.0.0.1:2375")
                .with_host_override("gateway")
                .daemon_host(),
            "gateway"
        );
    }

    #[test]
    fn from_file_reads_toml() {
        let temp = tempfile::tempdir().unwrap();
        let path = temp.path().join("capsule.toml");
        std::fs::write(
            &path,
            "docker_host = \"tcp://127.0.0.1:2375\"\nstop_timeout_secs = 2\n",
        )
        .unwrap();

        let config = OrchestratorConfig::from_file(&path).unwrap();
        assert_eq!(config.docker_host.as_deref(), Some("tcp://127.0.0.1:2375"));
        assert_eq!(config.stop_timeout_secs, 2);
        assert_eq!(config.connect_timeout_secs, 120);
    }

    #[test]
    fn missing_file_yields_defaults() {
        let temp = tempfile::tempdir().unwrap();
        let config = OrchestratorConfig::from_file(temp.path().join("absent.toml")).unwrap();
        assert_eq!(config, OrchestratorConfig::default());
    }

    #[test]
    fn unknown_keys_are_rejected() {
        let err = OrchestratorConfig::from_toml("dockr_host = \"x\"").unwrap_err();
        assert!(matches!(err, CapsuleError::Config { .. }));
    }

    #[test]
    fn environment_overrides_file() {
        let env: HashMap<&str, &str> = HashMap::from([
            ("DOCKER_HOST", "tcp://remote:2375"),
            ("CAPSULE_HOST_OVERRIDE", "proxy"),
            ("CAPSULE_STOP_TIMEOUT_SECS", "1"),
        ]);
        let config = OrchestratorConfig::from_toml("docker_host = \"unix:///tmp/d.sock\"")
            .unwrap()
            .apply_env(|key| env.get(key).map(ToString::to_string))
            .unwrap();

        assert_eq!(config.docker_host.as_deref(), Some("tcp://remote:2375"));
        assert_eq!(config.daemon_host(), "proxy");
        assert_eq!(config.stop_timeout_secs, 1);
    }

    #[test]
    fn bad_stop_timeout_is_a_config_error() {
        let err = OrchestratorConfig::default()
            .apply_env(|key| (key == "CAPSULE_STOP_TIMEOUT_SECS").then(|| "soon".to_string()))
            .unwrap_err();
        assert!(matches!(err, CapsuleError::Config { .. }));
    }
}
