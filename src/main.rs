//! Binary entry point for the `beachhead` CLI.

use std::io::{self, Write};
use std::process;
use std::time::Duration;

use camino::Utf8PathBuf;
use clap::Parser;
use thiserror::Error;
use tokio::time::sleep;

use beachhead::cli::Cli;
use beachhead::ec2::{self, Ec2Provider};
use beachhead::keypair::{KeyPairError, KeyPairManager, KeyPairOutcome};
use beachhead::lifecycle::{InstanceLifecycle, LifecycleError, PollPolicy};
use beachhead::provider::{LaunchSpec, ProviderError};
use beachhead::remote::{Framework, RemoteConfig, RemoteConfigurator, RemoteError};
use beachhead::security::SecurityPolicy;
use beachhead::status::StatusReporter;

/// Pause after a build so first-boot initialisation can finish before any
/// configure step dials in.
const POST_BUILD_DELAY: Duration = Duration::from_secs(10);

#[derive(Debug, Error)]
enum CliError {
    #[error("configuration error: {0}")]
    Config(String),
    #[error(transparent)]
    KeyPair(#[from] KeyPairError),
    #[error(transparent)]
    Provider(#[from] ProviderError),
    #[error(transparent)]
    Lifecycle(#[from] LifecycleError),
    #[error(transparent)]
    Remote(#[from] RemoteError),
    #[error("remote configuration terminated without an exit status")]
    MissingExitCode,
    #[error(transparent)]
    Io(#[from] io::Error),
}

#[tokio::main]
async fn main() {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .with_writer(io::stderr)
        .init();

    let cli = Cli::parse();
    let exit_code = match dispatch(cli).await {
        Ok(code) => code,
        Err(err) => {
            report_error(&err);
            1
        }
    };

    process::exit(exit_code);
}

/// Runs the requested operations in the fixed order: create-key, build,
/// configure, then the read-only and teardown flags. Returns the process
/// exit code; a non-zero remote install status is passed through.
async fn dispatch(cli: Cli) -> Result<i32, CliError> {
    let sdk_config = ec2::load_sdk_config(&cli.region).await;
    let provider = Ec2Provider::new(&sdk_config);
    let mut exit_code = 0;

    if cli.createkey {
        let manager = KeyPairManager::new(provider.clone());
        match manager.ensure(&cli.keyname).await? {
            KeyPairOutcome::Created { key_file } => {
                operator_line(format!(
                    "Successfully generated key pair; private key written to {key_file}"
                ))?;
            }
            KeyPairOutcome::AlreadyPresent => {
                operator_line(format!(
                    "Key pair {} already exists, nothing to create",
                    cli.keyname
                ))?;
            }
        }
    }

    if cli.build {
        SecurityPolicy::new(provider.clone()).ensure(&cli.group).await?;

        let spec = LaunchSpec::builder()
            .ami(&cli.ami)
            .key_name(&cli.keyname)
            .group_name(&cli.group)
            .instance_type(&cli.instance_type)
            .build()?;

        operator_line("Build command issued, waiting for the instance to reach running.")?;
        let instance = lifecycle_from(&cli, provider.clone()).build(&spec).await?;
        operator_line(format!(
            "You can now log in to the machine with ssh at the following IP address: {}",
            instance.public_ip
        ))?;

        operator_line("Allowing the instance to finalise initialisation.")?;
        sleep(POST_BUILD_DELAY).await;
    }

    if cli.config {
        let (Some(framework), Some(ip)) = (cli.framework, cli.ip) else {
            return Err(CliError::Config(String::from(
                "--config requires --framework and --ip",
            )));
        };

        let remote_config = RemoteConfig::load_without_cli_args()
            .map_err(|err| CliError::Config(err.to_string()))?;
        let configurator = RemoteConfigurator::with_streaming_runner(remote_config)?;
        let key_file = Utf8PathBuf::from(format!("{}.pem", cli.keyname));

        operator_line("Configuring instance")?;
        let output = configurator.configure(Framework::from(framework), ip, &key_file)?;
        let status = output.exit_code.ok_or(CliError::MissingExitCode)?;
        if status != 0 {
            exit_code = status;
        }
    }

    if cli.status {
        StatusReporter::new(provider.clone())
            .report(io::stdout().lock())
            .await?;
    }

    if let Some(instance_id) = cli.terminate.as_deref() {
        operator_line("Terminating instance")?;
        lifecycle_from(&cli, provider.clone())
            .terminate(instance_id)
            .await?;
    }

    if cli.deletekey {
        KeyPairManager::new(provider).delete(&cli.keyname).await?;
        operator_line("Successfully removed key pair")?;
    }

    Ok(exit_code)
}

fn lifecycle_from(cli: &Cli, provider: Ec2Provider) -> InstanceLifecycle<Ec2Provider> {
    let mut poll = PollPolicy::default();
    if let Some(secs) = cli.build_timeout {
        poll.deadline = Some(Duration::from_secs(secs));
    }
    InstanceLifecycle::new(provider).with_poll_policy(poll)
}

fn operator_line(message: impl AsRef<str>) -> io::Result<()> {
    let mut stdout = io::stdout().lock();
    writeln!(stdout, "{}", message.as_ref())
}

fn report_error(err: &CliError) {
    let mut stderr = io::stderr().lock();
    writeln!(stderr, "{err}").ok();
}
