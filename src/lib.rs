//! Provision-and-configure workflow for disposable EC2 C2 test instances.
//!
//! The crate wires a thin orchestration layer over two collaborators: the
//! EC2 control plane (via [`ec2::Ec2Provider`]) and the system `ssh` client
//! (via [`remote::RemoteConfigurator`]). The managers are generic over the
//! [`provider::Provider`] seam so the control plane can be scripted in
//! tests.

pub mod cli;
pub mod ec2;
pub mod keypair;
pub mod lifecycle;
pub mod provider;
pub mod remote;
pub mod security;
pub mod status;
pub mod test_support;

pub use ec2::Ec2Provider;
pub use keypair::{KeyPairError, KeyPairManager, KeyPairOutcome};
pub use lifecycle::{InstanceLifecycle, LifecycleError, PollPolicy, RunningInstance};
pub use provider::{
    IngressRule, InstanceSnapshot, InstanceState, KeyPairHandle, KeyPairMaterial, LaunchSpec,
    LaunchSpecBuilder, Provider, ProviderError, ProviderFuture, SecurityGroupHandle,
};
pub use remote::{
    CommandOutput, CommandRunner, Framework, HostKeyPolicy, ProcessCommandRunner,
    RemoteCommandOutput, RemoteConfig, RemoteConfigLoadError, RemoteConfigurator, RemoteError,
    StreamingCommandRunner,
};
pub use security::{GROUP_DESCRIPTION, INGRESS_RULES, SecurityPolicy};
pub use status::StatusReporter;
