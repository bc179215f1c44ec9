//! EC2-backed implementation of the provider seam.
//!
//! Credentials and region are resolved once into an [`SdkConfig`] and passed
//! in explicitly; nothing here reads the process environment ad hoc.

mod error;

use aws_config::{BehaviorVersion, Region, SdkConfig};
use aws_sdk_ec2::Client;
use aws_sdk_ec2::types::{Filter, InstanceStateName, InstanceType, IpPermission, IpRange};

use crate::provider::{
    IngressRule, InstanceSnapshot, InstanceState, KeyPairHandle, KeyPairMaterial, LaunchSpec,
    Provider, ProviderError, ProviderFuture, SecurityGroupHandle,
};
use error::classify;

/// Loads the shared AWS configuration for `region`.
///
/// This resolves credentials through the SDK default chain (environment,
/// profile files, instance roles) exactly once; every client is built from
/// the returned value.
pub async fn load_sdk_config(region: &str) -> SdkConfig {
    aws_config::defaults(BehaviorVersion::latest())
        .region(Region::new(region.to_owned()))
        .load()
        .await
}

/// Provider backed by the EC2 control plane.
#[derive(Clone, Debug)]
pub struct Ec2Provider {
    client: Client,
}

impl Ec2Provider {
    /// Builds a provider from a pre-loaded SDK configuration.
    #[must_use]
    pub fn new(config: &SdkConfig) -> Self {
        Self {
            client: Client::new(config),
        }
    }
}

impl From<&InstanceStateName> for InstanceState {
    fn from(value: &InstanceStateName) -> Self {
        Self::from(value.as_str())
    }
}

fn snapshot_from(instance: &aws_sdk_ec2::types::Instance) -> InstanceSnapshot {
    let state = instance
        .state()
        .and_then(|state| state.name())
        .map_or_else(|| InstanceState::Other(String::from("unknown")), Into::into);
    InstanceSnapshot {
        id: instance.instance_id().unwrap_or_default().to_owned(),
        state,
        public_ip: instance.public_ip_address().map(str::to_owned),
        private_ip: instance.private_ip_address().map(str::to_owned),
    }
}

impl Provider for Ec2Provider {
    fn lookup_key_pair<'a>(&'a self, name: &'a str) -> ProviderFuture<'a, KeyPairHandle> {
        Box::pin(async move {
            let output = self
                .client
                .describe_key_pairs()
                .key_names(name)
                .send()
                .await
                .map_err(|err| classify("key pair", name, &err))?;

            let key = output
                .key_pairs()
                .first()
                .ok_or_else(|| ProviderError::NotFound {
                    resource: "key pair",
                    name: name.to_owned(),
                })?;

            Ok(KeyPairHandle {
                name: key.key_name().unwrap_or(name).to_owned(),
                fingerprint: key.key_fingerprint().map(str::to_owned),
            })
        })
    }

    fn create_key_pair<'a>(&'a self, name: &'a str) -> ProviderFuture<'a, KeyPairMaterial> {
        Box::pin(async move {
            let output = self
                .client
                .create_key_pair()
                .key_name(name)
                .send()
                .await
                .map_err(|err| classify("key pair", name, &err))?;

            let material = output
                .key_material()
                .ok_or(ProviderError::MissingData("key material"))?;

            Ok(KeyPairMaterial {
                name: output.key_name().unwrap_or(name).to_owned(),
                material: material.to_owned(),
            })
        })
    }

    fn delete_key_pair<'a>(&'a self, name: &'a str) -> ProviderFuture<'a, ()> {
        Box::pin(async move {
            self.client
                .delete_key_pair()
                .key_name(name)
                .send()
                .await
                .map_err(|err| classify("key pair", name, &err))?;
            Ok(())
        })
    }

    fn lookup_security_group<'a>(
        &'a self,
        name: &'a str,
    ) -> ProviderFuture<'a, SecurityGroupHandle> {
        Box::pin(async move {
            let output = self
                .client
                .describe_security_groups()
                .group_names(name)
                .send()
                .await
                .map_err(|err| classify("security group", name, &err))?;

            let group = output
                .security_groups()
                .first()
                .ok_or_else(|| ProviderError::NotFound {
                    resource: "security group",
                    name: name.to_owned(),
                })?;

            Ok(SecurityGroupHandle {
                id: group.group_id().unwrap_or_default().to_owned(),
                name: group.group_name().unwrap_or(name).to_owned(),
            })
        })
    }

    fn create_security_group<'a>(
        &'a self,
        name: &'a str,
        description: &'a str,
    ) -> ProviderFuture<'a, SecurityGroupHandle> {
        Box::pin(async move {
            let output = self
                .client
                .create_security_group()
                .group_name(name)
                .description(description)
                .send()
                .await
                .map_err(|err| classify("security group", name, &err))?;

            let id = output
                .group_id()
                .ok_or(ProviderError::MissingData("security group id"))?;

            Ok(SecurityGroupHandle {
                id: id.to_owned(),
                name: name.to_owned(),
            })
        })
    }

    fn authorize_ingress<'a>(
        &'a self,
        group_name: &'a str,
        rule: &'a IngressRule,
    ) -> ProviderFuture<'a, ()> {
        Box::pin(async move {
            let permission = IpPermission::builder()
                .ip_protocol("tcp")
                .from_port(rule.port)
                .to_port(rule.port)
                .ip_ranges(
                    IpRange::builder()
                        .cidr_ip(rule.cidr)
                        .description(rule.description)
                        .build(),
                )
                .build();

            self.client
                .authorize_security_group_ingress()
                .group_name(group_name)
                .ip_permissions(permission)
                .send()
                .await
                .map_err(|err| classify("ingress rule", group_name, &err))?;
            Ok(())
        })
    }

    fn launch_instance<'a>(&'a self, spec: &'a LaunchSpec) -> ProviderFuture<'a, InstanceSnapshot> {
        Box::pin(async move {
            let instance_type: InstanceType = spec.instance_type.parse().map_err(|_| {
                ProviderError::Validation(format!("instance type '{}'", spec.instance_type))
            })?;

            let output = self
                .client
                .run_instances()
                .image_id(&spec.ami)
                .key_name(&spec.key_name)
                .security_groups(&spec.group_name)
                .instance_type(instance_type)
                .min_count(1)
                .max_count(1)
                .send()
                .await
                .map_err(|err| classify("instance", &spec.ami, &err))?;

            let instance = output
                .instances()
                .first()
                .ok_or(ProviderError::MissingData("launched instance"))?;

            Ok(snapshot_from(instance))
        })
    }

    fn instances_in_group<'a>(
        &'a self,
        group_name: &'a str,
    ) -> ProviderFuture<'a, Vec<InstanceSnapshot>> {
        Box::pin(async move {
            let output = self
                .client
                .describe_instances()
                .filters(
                    Filter::builder()
                        .name("network-interface.group-name")
                        .values(group_name)
                        .build(),
                )
                .send()
                .await
                .map_err(|err| classify("security group", group_name, &err))?;

            Ok(output
                .reservations()
                .iter()
                .flat_map(|reservation| reservation.instances())
                .map(snapshot_from)
                .collect())
        })
    }

    fn running_instances(&self) -> ProviderFuture<'_, Vec<InstanceSnapshot>> {
        Box::pin(async move {
            let output = self
                .client
                .describe_instances()
                .filters(
                    Filter::builder()
                        .name("instance-state-name")
                        .values("running")
                        .build(),
                )
                .send()
                .await
                .map_err(|err| classify("instance", "running", &err))?;

            Ok(output
                .reservations()
                .iter()
                .flat_map(|reservation| reservation.instances())
                .map(snapshot_from)
                .collect())
        })
    }

    fn terminate_instance<'a>(&'a self, instance_id: &'a str) -> ProviderFuture<'a, ()> {
        Box::pin(async move {
            self.client
                .terminate_instances()
                .instance_ids(instance_id)
                .send()
                .await
                .map_err(|err| classify("instance", instance_id, &err))?;
            Ok(())
        })
    }
}
