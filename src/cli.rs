//! Command-line interface definitions for the `beachhead` binary.
//!
//! This module isolates the clap parser structures so the build script can
//! reuse them when generating the manual page. It therefore depends only on
//! `clap` and the standard library.

use std::net::IpAddr;

use clap::{Parser, ValueEnum};

/// Flag-driven CLI covering the operator workflow: create the key pair,
/// build the instance, then configure it over SSH. Flags compose; when
/// several are set they run in that order.
#[derive(Debug, Parser)]
#[command(
    name = "beachhead",
    about = "Provisions and configures AWS EC2 instances for on-demand C2 testing",
    arg_required_else_help = true
)]
pub struct Cli {
    /// AWS region for deployment.
    #[arg(short = 'r', long, default_value = "us-east-1", value_name = "REGION")]
    pub region: String,

    /// AMI image id to launch.
    #[arg(
        short = 'i',
        long,
        default_value = "ami-06fd113e1286dd166",
        value_name = "AMI"
    )]
    pub ami: String,

    /// SSH key-pair name; `--config` reads `<keyname>.pem` from the working
    /// directory.
    #[arg(short = 'k', long, default_value = "aws_c2", value_name = "NAME")]
    pub keyname: String,

    /// Create the SSH key pair if it does not exist yet.
    #[arg(short = 'n', long)]
    pub createkey: bool,

    /// Security group to ensure and attach to the instance.
    #[arg(short = 'g', long, default_value = "aws_c2", value_name = "NAME")]
    pub group: String,

    /// Build the instance using the other specified parameters.
    #[arg(short = 'b', long)]
    pub build: bool,

    /// Instance size passed to the run request.
    #[arg(long, default_value = "t2.micro", value_name = "TYPE")]
    pub instance_type: String,

    /// Configure the built instance over SSH using the key pair.
    #[arg(short = 'c', long, requires = "framework", requires = "ip")]
    pub config: bool,

    /// C2 framework to install on the instance.
    #[arg(short = 'f', long, value_enum, value_name = "FRAMEWORK")]
    pub framework: Option<FrameworkArg>,

    /// Public address of the instance to configure.
    #[arg(long, value_name = "ADDR")]
    pub ip: Option<IpAddr>,

    /// Print running instances and their addresses.
    #[arg(short = 's', long)]
    pub status: bool,

    /// Terminate the instance with the given id.
    #[arg(short = 't', long, value_name = "INSTANCE_ID")]
    pub terminate: Option<String>,

    /// Delete the key pair named by --keyname.
    #[arg(short = 'd', long)]
    pub deletekey: bool,

    /// Optional bound, in seconds, on the build wait loop. Without it the
    /// wait blocks until the instance reports running.
    #[arg(long, value_name = "SECS")]
    pub build_timeout: Option<u64>,
}

/// Framework choices accepted by `--framework`.
#[derive(Clone, Copy, Debug, Eq, PartialEq, ValueEnum)]
pub enum FrameworkArg {
    /// PowerShell Empire.
    #[value(name = "powershell-empire")]
    PowershellEmpire,
    /// PoshC2.
    #[value(name = "poshc2")]
    Poshc2,
}
