//! SSH settings for the remote configuration step.
//!
//! Configuration is loaded via `ortho-config`, which merges defaults,
//! configuration files, and environment variables (`BEACHHEAD_` prefix).

use std::str::FromStr;

use ortho_config::OrthoConfig;
use serde::Deserialize;
use thiserror::Error;

use super::RemoteError;

/// Host-key verification stance for the ssh session.
///
/// The reference workflow targets freshly provisioned hosts whose keys are
/// unknown by definition, so the default skips verification. `accept-new`
/// records the key on first contact; `strict` requires it to be known
/// already.
#[derive(Clone, Copy, Debug, Default, Eq, PartialEq)]
pub enum HostKeyPolicy {
    /// Require the host key to be present in the known-hosts file.
    Strict,
    /// Trust and record the key on first contact.
    AcceptNew,
    /// Skip verification entirely.
    #[default]
    Off,
}

impl HostKeyPolicy {
    /// Value passed to ssh's `StrictHostKeyChecking` option.
    #[must_use]
    pub(crate) const fn ssh_option(self) -> &'static str {
        match self {
            Self::Strict => "yes",
            Self::AcceptNew => "accept-new",
            Self::Off => "no",
        }
    }
}

impl FromStr for HostKeyPolicy {
    type Err = RemoteError;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        match value {
            "strict" => Ok(Self::Strict),
            "accept-new" => Ok(Self::AcceptNew),
            "off" => Ok(Self::Off),
            other => Err(RemoteError::UnknownHostKeyPolicy {
                value: other.to_owned(),
            }),
        }
    }
}

/// SSH settings loaded via `ortho-config`.
#[derive(Clone, Debug, Deserialize, OrthoConfig, PartialEq, Eq)]
#[ortho_config(prefix = "BEACHHEAD")]
pub struct RemoteConfig {
    /// Path to the `ssh` executable.
    #[ortho_config(default = "ssh".to_owned())]
    pub ssh_bin: String,
    /// Remote user baked into the target image.
    #[ortho_config(default = "kali".to_owned())]
    pub ssh_user: String,
    /// Whether to force batch mode so ssh never prompts for a password.
    #[ortho_config(default = true)]
    pub ssh_batch_mode: bool,
    /// Host-key verification policy: `off`, `accept-new`, or `strict`.
    #[ortho_config(default = "off".to_owned())]
    pub host_key_policy: String,
    /// Known-hosts override; `/dev/null` keeps ephemeral hosts out of the
    /// operator's real known-hosts file.
    #[ortho_config(default = "/dev/null".to_owned())]
    pub ssh_known_hosts_file: String,
}

impl RemoteConfig {
    /// Loads configuration from defaults, configuration files, and
    /// environment variables without consuming CLI arguments.
    ///
    /// # Errors
    ///
    /// Returns [`RemoteConfigLoadError::Parse`] when merging sources fails.
    pub fn load_without_cli_args() -> Result<Self, RemoteConfigLoadError> {
        Self::load_from_iter([std::ffi::OsString::from("beachhead")])
            .map_err(|err| RemoteConfigLoadError::Parse(err.to_string()))
    }

    /// Ensures configuration values are present and the policy is known.
    ///
    /// # Errors
    ///
    /// Returns [`RemoteError::InvalidConfig`] for empty fields and
    /// [`RemoteError::UnknownHostKeyPolicy`] for an unrecognised policy.
    pub fn validate(&self) -> Result<(), RemoteError> {
        Self::require_value(&self.ssh_bin, "ssh_bin")?;
        Self::require_value(&self.ssh_user, "ssh_user")?;
        self.host_key_policy.parse::<HostKeyPolicy>()?;
        Ok(())
    }

    /// Parsed host-key policy, falling back to the default when the
    /// configured value is unknown. [`RemoteConfig::validate`] rejects that
    /// case up front.
    #[must_use]
    pub fn policy(&self) -> HostKeyPolicy {
        self.host_key_policy.parse().unwrap_or_default()
    }

    fn require_value(value: &str, field: &str) -> Result<(), RemoteError> {
        if value.trim().is_empty() {
            return Err(RemoteError::InvalidConfig {
                field: field.to_owned(),
            });
        }
        Ok(())
    }
}

/// Errors raised when loading the remote configuration from layered sources.
#[derive(Debug, Error, Eq, PartialEq)]
pub enum RemoteConfigLoadError {
    /// Indicates that parsing or merging configuration layers failed.
    #[error("remote configuration parsing failed: {0}")]
    Parse(String),
}
