//! Security-group provisioning with the fixed C2 ingress rule set.

use tracing::{debug, info};

use crate::provider::{IngressRule, Provider, ProviderError, SecurityGroupHandle};

/// Description recorded on the group when this tool creates it.
pub const GROUP_DESCRIPTION: &str = "AWS Red Team C2 testing";

const ANYWHERE: &str = "0.0.0.0/0";

/// Ingress rules opened on a freshly created group: SSH for operator access,
/// HTTP/HTTPS for hosting files and comms, 8080 for proxy tunnelling.
pub const INGRESS_RULES: [IngressRule; 4] = [
    IngressRule {
        port: 22,
        cidr: ANYWHERE,
        description: "SSH access to the C2 server",
    },
    IngressRule {
        port: 80,
        cidr: ANYWHERE,
        description: "HTTP for hosting files and comms",
    },
    IngressRule {
        port: 443,
        cidr: ANYWHERE,
        description: "HTTPS for hosting files and comms",
    },
    IngressRule {
        port: 8080,
        cidr: ANYWHERE,
        description: "HTTP proxy for tunnelling",
    },
];

/// Ensures the named security group exists with the fixed ingress rules.
#[derive(Clone, Debug)]
pub struct SecurityPolicy<P> {
    provider: P,
}

impl<P: Provider> SecurityPolicy<P> {
    /// Creates a policy manager over the given provider.
    #[must_use]
    pub const fn new(provider: P) -> Self {
        Self { provider }
    }

    /// Ensures `group_name` exists with the [`INGRESS_RULES`] attached.
    ///
    /// Idempotent: an existing group is success, and a duplicate-rule answer
    /// while appending is success. Only the provider's not-found answer
    /// triggers creation; every other probe error propagates unchanged.
    ///
    /// # Errors
    ///
    /// Returns [`ProviderError`] for any unexpected provider failure during
    /// the probe, the create, or the rule appends.
    pub async fn ensure(&self, group_name: &str) -> Result<SecurityGroupHandle, ProviderError> {
        match self.provider.lookup_security_group(group_name).await {
            Ok(existing) => {
                info!(group = group_name, id = %existing.id, "security group already present");
                Ok(existing)
            }
            Err(err) if err.is_not_found() => {
                let created = self
                    .provider
                    .create_security_group(group_name, GROUP_DESCRIPTION)
                    .await?;

                for rule in &INGRESS_RULES {
                    match self.provider.authorize_ingress(group_name, rule).await {
                        Ok(()) => {}
                        Err(err) if err.is_already_exists() => {
                            debug!(group = group_name, port = rule.port, "ingress rule already present");
                        }
                        Err(other) => return Err(other),
                    }
                }

                info!(group = group_name, id = %created.id, "created security group with C2 ingress rules");
                Ok(created)
            }
            Err(other) => Err(other),
        }
    }
}
