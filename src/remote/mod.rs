//! Remote configuration of a built instance over the system `ssh` client.
//!
//! The session is the ssh child process: it is spawned for the one compound
//! install command and reaped on every path, so no connection outlives the
//! configure call.

use std::ffi::OsString;
use std::net::IpAddr;

use camino::Utf8Path;
use shell_escape::unix::escape;
use thiserror::Error;
use tracing::info;

mod config;
mod types;

pub use config::{HostKeyPolicy, RemoteConfig, RemoteConfigLoadError};
pub use types::{CommandOutput, CommandRunner, ProcessCommandRunner, StreamingCommandRunner};

use crate::cli::FrameworkArg;

const DEFAULT_SSH_PORT: u16 = 22;

/// C2 frameworks the configurator can install.
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum Framework {
    /// PowerShell Empire post-exploitation framework.
    PowershellEmpire,
    /// PoshC2 proxy-aware C2 framework.
    PoshC2,
}

impl Framework {
    /// Package name as published in the target image's repositories.
    #[must_use]
    pub const fn package(self) -> &'static str {
        match self {
            Self::PowershellEmpire => "powershell-empire",
            Self::PoshC2 => "poshc2",
        }
    }
}

impl std::fmt::Display for Framework {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.package())
    }
}

impl From<FrameworkArg> for Framework {
    fn from(value: FrameworkArg) -> Self {
        match value {
            FrameworkArg::PowershellEmpire => Self::PowershellEmpire,
            FrameworkArg::Poshc2 => Self::PoshC2,
        }
    }
}

/// Errors surfaced while configuring an instance remotely.
#[derive(Clone, Debug, Error, Eq, PartialEq)]
pub enum RemoteError {
    /// Raised when a configuration value fails validation.
    #[error("invalid remote configuration: {field}")]
    InvalidConfig {
        /// Name of the missing or invalid field.
        field: String,
    },
    /// Raised when the policy string is not one of the known values.
    #[error("unknown host key policy '{value}' (expected off, accept-new, or strict)")]
    UnknownHostKeyPolicy {
        /// Value that failed to parse.
        value: String,
    },
    /// Raised when the ssh client cannot be started or reaped.
    #[error("failed to run {program}: {message}")]
    Spawn {
        /// Program that failed (typically `ssh`).
        program: String,
        /// Underlying error message.
        message: String,
    },
}

/// Output of the remote install, with the remote exit status preserved.
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct RemoteCommandOutput {
    /// Exit status reported by the remote command, if any.
    pub exit_code: Option<i32>,
    /// Captured standard output.
    pub stdout: String,
    /// Captured standard error.
    pub stderr: String,
}

/// Runs the fixed install sequence on a freshly built instance.
#[derive(Clone, Debug)]
pub struct RemoteConfigurator<R: CommandRunner> {
    config: RemoteConfig,
    runner: R,
}

impl RemoteConfigurator<StreamingCommandRunner> {
    /// Wires the streaming runner so remote output reaches the console live.
    ///
    /// # Errors
    ///
    /// Returns [`RemoteError`] when configuration validation fails.
    pub fn with_streaming_runner(config: RemoteConfig) -> Result<Self, RemoteError> {
        Self::new(config, StreamingCommandRunner)
    }
}

impl<R: CommandRunner> RemoteConfigurator<R> {
    /// Creates a configurator using the provided runner and configuration.
    ///
    /// # Errors
    ///
    /// Returns [`RemoteError`] when configuration validation fails.
    pub fn new(config: RemoteConfig, runner: R) -> Result<Self, RemoteError> {
        config.validate()?;
        Ok(Self { config, runner })
    }

    /// Installs `framework` on the instance at `host` over ssh.
    ///
    /// One ssh invocation carries the whole sequence: refresh the package
    /// index, then install the framework package. A pseudo-terminal is
    /// forced so apt's progress output behaves as it would interactively.
    /// The remote exit status is returned, not interpreted.
    ///
    /// # Errors
    ///
    /// Returns [`RemoteError::Spawn`] when the ssh client cannot be started.
    pub fn configure(
        &self,
        framework: Framework,
        host: IpAddr,
        key_file: &Utf8Path,
    ) -> Result<RemoteCommandOutput, RemoteError> {
        let command = install_command(framework);
        info!(%host, package = framework.package(), "starting remote configuration");

        let args = self.ssh_args(host, key_file, &command);
        let output = self.runner.run(&self.config.ssh_bin, &args)?;

        Ok(RemoteCommandOutput {
            exit_code: output.code,
            stdout: output.stdout,
            stderr: output.stderr,
        })
    }

    fn ssh_args(&self, host: IpAddr, key_file: &Utf8Path, remote_command: &str) -> Vec<OsString> {
        let mut args = vec![
            OsString::from("-i"),
            OsString::from(key_file.as_str()),
            OsString::from("-p"),
            OsString::from(DEFAULT_SSH_PORT.to_string()),
            OsString::from("-tt"),
        ];

        if self.config.ssh_batch_mode {
            args.push(OsString::from("-o"));
            args.push(OsString::from("BatchMode=yes"));
        }

        args.push(OsString::from("-o"));
        args.push(OsString::from(format!(
            "StrictHostKeyChecking={}",
            self.config.policy().ssh_option()
        )));

        if !self.config.ssh_known_hosts_file.trim().is_empty() {
            args.push(OsString::from("-o"));
            args.push(OsString::from(format!(
                "UserKnownHostsFile={}",
                self.config.ssh_known_hosts_file
            )));
        }

        args.push(OsString::from(format!("{}@{host}", self.config.ssh_user)));
        args.push(OsString::from(remote_command));
        args
    }
}

/// Builds the two-step install sequence executed on the target.
fn install_command(framework: Framework) -> String {
    let package = escape(framework.package().into());
    format!("sudo apt-get update && sudo apt-get install -y {package}")
}
