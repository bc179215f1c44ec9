//! Provider seam over the EC2 control plane.
//!
//! Every control-plane call the tool makes goes through the [`Provider`]
//! trait so the managers can be exercised against scripted doubles. The one
//! production implementation lives in [`crate::ec2`].

use std::future::Future;
use std::pin::Pin;

use thiserror::Error;

/// Instance size requested when the caller does not pick one.
pub const DEFAULT_INSTANCE_TYPE: &str = "t2.micro";

/// Single ingress rule appended to a security group.
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct IngressRule {
    /// TCP port opened by the rule.
    pub port: i32,
    /// Source CIDR the rule admits.
    pub cidr: &'static str,
    /// Short description recorded on the rule.
    pub description: &'static str,
}

/// Parameters for a single run-instances request (always count 1).
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct LaunchSpec {
    /// Machine image reference to launch.
    pub ami: String,
    /// Key-pair name attached for SSH access.
    pub key_name: String,
    /// Security group the instance joins.
    pub group_name: String,
    /// Instance size, for example `t2.micro`.
    pub instance_type: String,
}

impl LaunchSpec {
    /// Starts a builder for a [`LaunchSpec`].
    #[must_use]
    pub fn builder() -> LaunchSpecBuilder {
        LaunchSpecBuilder::default()
    }

    /// Validates the spec, returning a descriptive error when a required
    /// field is missing.
    ///
    /// # Errors
    ///
    /// Returns [`ProviderError::Validation`] when any field is empty.
    pub fn validate(&self) -> Result<(), ProviderError> {
        if self.ami.is_empty() {
            return Err(ProviderError::Validation("ami".to_owned()));
        }
        if self.key_name.is_empty() {
            return Err(ProviderError::Validation("key_name".to_owned()));
        }
        if self.group_name.is_empty() {
            return Err(ProviderError::Validation("group_name".to_owned()));
        }
        if self.instance_type.is_empty() {
            return Err(ProviderError::Validation("instance_type".to_owned()));
        }
        Ok(())
    }
}

/// Builder for [`LaunchSpec`] that defers trimming and validation to
/// construction.
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct LaunchSpecBuilder {
    ami: String,
    key_name: String,
    group_name: String,
    instance_type: String,
}

impl Default for LaunchSpecBuilder {
    fn default() -> Self {
        Self {
            ami: String::new(),
            key_name: String::new(),
            group_name: String::new(),
            instance_type: String::from(DEFAULT_INSTANCE_TYPE),
        }
    }
}

impl LaunchSpecBuilder {
    /// Sets the machine image reference.
    #[must_use]
    pub fn ami(mut self, value: impl Into<String>) -> Self {
        self.ami = value.into();
        self
    }

    /// Sets the key-pair name.
    #[must_use]
    pub fn key_name(mut self, value: impl Into<String>) -> Self {
        self.key_name = value.into();
        self
    }

    /// Sets the security-group name.
    #[must_use]
    pub fn group_name(mut self, value: impl Into<String>) -> Self {
        self.group_name = value.into();
        self
    }

    /// Sets the instance size.
    #[must_use]
    pub fn instance_type(mut self, value: impl Into<String>) -> Self {
        self.instance_type = value.into();
        self
    }

    /// Builds and validates the [`LaunchSpec`], trimming string inputs.
    ///
    /// # Errors
    ///
    /// Returns [`ProviderError::Validation`] when any required field is empty.
    pub fn build(self) -> Result<LaunchSpec, ProviderError> {
        let spec = LaunchSpec {
            ami: self.ami.trim().to_owned(),
            key_name: self.key_name.trim().to_owned(),
            group_name: self.group_name.trim().to_owned(),
            instance_type: self.instance_type.trim().to_owned(),
        };
        spec.validate()?;
        Ok(spec)
    }
}

/// Key pair as reported by a lookup.
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct KeyPairHandle {
    /// Key-pair name as registered with the provider.
    pub name: String,
    /// Provider-computed fingerprint, when reported.
    pub fingerprint: Option<String>,
}

/// Freshly created key pair, including its private half.
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct KeyPairMaterial {
    /// Key-pair name as registered with the provider.
    pub name: String,
    /// PEM-encoded private key returned exactly once at creation.
    pub material: String,
}

/// Security group as reported by a lookup or creation.
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct SecurityGroupHandle {
    /// Provider-assigned group id.
    pub id: String,
    /// Group name.
    pub name: String,
}

/// Lifecycle states the tool distinguishes.
#[derive(Clone, Debug, Eq, PartialEq)]
pub enum InstanceState {
    /// Launch accepted, instance not yet running.
    Pending,
    /// Instance is up and addressable.
    Running,
    /// Termination in progress.
    ShuttingDown,
    /// Stop in progress.
    Stopping,
    /// Instance stopped.
    Stopped,
    /// Instance terminated.
    Terminated,
    /// Any state this tool has no behaviour for.
    Other(String),
}

impl InstanceState {
    /// Provider wire name of the state.
    #[must_use]
    pub fn as_str(&self) -> &str {
        match self {
            Self::Pending => "pending",
            Self::Running => "running",
            Self::ShuttingDown => "shutting-down",
            Self::Stopping => "stopping",
            Self::Stopped => "stopped",
            Self::Terminated => "terminated",
            Self::Other(name) => name,
        }
    }

    /// Whether the instance is in the one state the build wait targets.
    #[must_use]
    pub const fn is_running(&self) -> bool {
        matches!(self, Self::Running)
    }
}

impl From<&str> for InstanceState {
    fn from(value: &str) -> Self {
        match value {
            "pending" => Self::Pending,
            "running" => Self::Running,
            "shutting-down" => Self::ShuttingDown,
            "stopping" => Self::Stopping,
            "stopped" => Self::Stopped,
            "terminated" => Self::Terminated,
            other => Self::Other(other.to_owned()),
        }
    }
}

/// Point-in-time view of one instance.
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct InstanceSnapshot {
    /// Provider-assigned instance id.
    pub id: String,
    /// Lifecycle state at query time.
    pub state: InstanceState,
    /// Public IPv4 address, once assigned.
    pub public_ip: Option<String>,
    /// Private IPv4 address, once assigned.
    pub private_ip: Option<String>,
}

/// Errors raised by providers.
#[derive(Clone, Debug, Error, Eq, PartialEq)]
pub enum ProviderError {
    /// The named resource does not exist. Managers treat this as the signal
    /// to create it; every other error propagates unchanged.
    #[error("{resource} '{name}' not found")]
    NotFound {
        /// Kind of resource probed, for example `key pair`.
        resource: &'static str,
        /// Name used for the probe.
        name: String,
    },
    /// The resource or rule already exists.
    #[error("{resource} '{name}' already exists")]
    AlreadyExists {
        /// Kind of resource, for example `ingress rule`.
        resource: &'static str,
        /// Name the provider rejected as duplicate.
        name: String,
    },
    /// A request was missing a required field.
    #[error("missing or empty field: {0}")]
    Validation(String),
    /// The provider answered without data the caller needs.
    #[error("provider response missing {0}")]
    MissingData(&'static str),
    /// Any other control-plane failure, carried unchanged.
    #[error("provider error: {message}")]
    Api {
        /// Provider error code, when one was reported.
        code: Option<String>,
        /// Message returned by the provider.
        message: String,
    },
}

impl ProviderError {
    /// Whether this is an expected-absence answer rather than a failure.
    #[must_use]
    pub const fn is_not_found(&self) -> bool {
        matches!(self, Self::NotFound { .. })
    }

    /// Whether the provider rejected a create as already present.
    #[must_use]
    pub const fn is_already_exists(&self) -> bool {
        matches!(self, Self::AlreadyExists { .. })
    }
}

/// Future returned by provider operations.
pub type ProviderFuture<'a, T> =
    Pin<Box<dyn Future<Output = Result<T, ProviderError>> + Send + 'a>>;

/// Minimal interface over the EC2 control plane.
pub trait Provider {
    /// Looks up a key pair by name; absence surfaces as
    /// [`ProviderError::NotFound`].
    fn lookup_key_pair<'a>(&'a self, name: &'a str) -> ProviderFuture<'a, KeyPairHandle>;

    /// Creates a key pair and returns its private material.
    fn create_key_pair<'a>(&'a self, name: &'a str) -> ProviderFuture<'a, KeyPairMaterial>;

    /// Requests deletion of a key pair; provider rejections propagate.
    fn delete_key_pair<'a>(&'a self, name: &'a str) -> ProviderFuture<'a, ()>;

    /// Looks up a security group by name; absence surfaces as
    /// [`ProviderError::NotFound`].
    fn lookup_security_group<'a>(
        &'a self,
        name: &'a str,
    ) -> ProviderFuture<'a, SecurityGroupHandle>;

    /// Creates a security group with the given description.
    fn create_security_group<'a>(
        &'a self,
        name: &'a str,
        description: &'a str,
    ) -> ProviderFuture<'a, SecurityGroupHandle>;

    /// Appends one ingress rule to the named group.
    fn authorize_ingress<'a>(
        &'a self,
        group_name: &'a str,
        rule: &'a IngressRule,
    ) -> ProviderFuture<'a, ()>;

    /// Issues a single run-instances request with count 1.
    fn launch_instance<'a>(&'a self, spec: &'a LaunchSpec) -> ProviderFuture<'a, InstanceSnapshot>;

    /// Lists instances attached to the named security group, flattened
    /// across reservations.
    fn instances_in_group<'a>(
        &'a self,
        group_name: &'a str,
    ) -> ProviderFuture<'a, Vec<InstanceSnapshot>>;

    /// Lists instances currently in the running state, flattened across
    /// reservations.
    fn running_instances(&self) -> ProviderFuture<'_, Vec<InstanceSnapshot>>;

    /// Requests termination of one instance.
    fn terminate_instance<'a>(&'a self, instance_id: &'a str) -> ProviderFuture<'a, ()>;
}
