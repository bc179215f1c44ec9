//! Instance build, wait-for-running, and termination.

use std::time::{Duration, Instant};

use thiserror::Error;
use tokio::time::sleep;
use tracing::{info, warn};

use crate::provider::{InstanceSnapshot, LaunchSpec, Provider, ProviderError};

/// Interval between re-queries while waiting for the running state.
pub const DEFAULT_POLL_INTERVAL: Duration = Duration::from_secs(30);

/// Grace period after a terminate request before returning to the operator.
pub const DEFAULT_TEARDOWN_DELAY: Duration = Duration::from_secs(15);

/// Polling behaviour for the build wait loop.
///
/// The default carries no deadline: the loop blocks until the instance
/// reports `running`. Supply a deadline to bound the wait instead; an
/// instance that never launches otherwise keeps the loop polling.
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub struct PollPolicy {
    /// Delay between re-queries.
    pub interval: Duration,
    /// Optional upper bound on total waiting time.
    pub deadline: Option<Duration>,
}

impl Default for PollPolicy {
    fn default() -> Self {
        Self {
            interval: DEFAULT_POLL_INTERVAL,
            deadline: None,
        }
    }
}

/// A built instance that has reached `running`.
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct RunningInstance {
    /// Provider-assigned instance id.
    pub id: String,
    /// Public IPv4 address the operator can reach.
    pub public_ip: String,
}

/// Errors surfaced while building or terminating instances.
#[derive(Clone, Debug, Error, Eq, PartialEq)]
pub enum LifecycleError {
    /// The instance did not reach `running` before the configured deadline.
    #[error("timed out waiting for instance {instance_id} to reach running")]
    Timeout {
        /// Provider instance identifier.
        instance_id: String,
    },
    /// The instance reported `running` without a public address.
    #[error("instance {instance_id} is running but has no public IPv4 address")]
    MissingPublicIp {
        /// Provider instance identifier.
        instance_id: String,
    },
    /// Control-plane failure, carried unchanged.
    #[error(transparent)]
    Provider(#[from] ProviderError),
}

/// Launches, waits for, and terminates instances.
#[derive(Clone, Debug)]
pub struct InstanceLifecycle<P> {
    provider: P,
    poll: PollPolicy,
    teardown_delay: Duration,
}

impl<P: Provider> InstanceLifecycle<P> {
    /// Creates a lifecycle manager with the default polling policy.
    #[must_use]
    pub fn new(provider: P) -> Self {
        Self {
            provider,
            poll: PollPolicy::default(),
            teardown_delay: DEFAULT_TEARDOWN_DELAY,
        }
    }

    /// Overrides the wait-loop polling policy.
    #[must_use]
    pub const fn with_poll_policy(mut self, poll: PollPolicy) -> Self {
        self.poll = poll;
        self
    }

    /// Overrides the post-terminate grace period.
    #[must_use]
    pub const fn with_teardown_delay(mut self, delay: Duration) -> Self {
        self.teardown_delay = delay;
        self
    }

    /// Issues a single run-instances request (count 1) and blocks until the
    /// instance reports `running`.
    ///
    /// Each poll sleeps the configured interval, then re-queries instances
    /// by security-group membership, flattened across reservations, and
    /// refreshes the snapshot from the entry matching the launched id. An
    /// instance not yet visible in the query keeps the previous snapshot.
    ///
    /// # Errors
    ///
    /// Returns [`LifecycleError::Timeout`] once a configured deadline
    /// passes, [`LifecycleError::MissingPublicIp`] when the running instance
    /// has no public address, and [`LifecycleError::Provider`] for any
    /// control-plane failure.
    pub async fn build(&self, spec: &LaunchSpec) -> Result<RunningInstance, LifecycleError> {
        spec.validate()?;
        let mut instance = self.provider.launch_instance(spec).await?;
        info!(
            instance = %instance.id,
            state = instance.state.as_str(),
            "run request accepted, waiting for running state"
        );

        let started = Instant::now();
        while !instance.state.is_running() {
            if let Some(deadline) = self.poll.deadline
                && started.elapsed() >= deadline
            {
                return Err(LifecycleError::Timeout {
                    instance_id: instance.id,
                });
            }

            sleep(self.poll.interval).await;
            let members = self.provider.instances_in_group(&spec.group_name).await?;
            match members.into_iter().find(|member| member.id == instance.id) {
                Some(updated) => instance = updated,
                None => {
                    warn!(instance = %instance.id, "instance not yet visible in group query");
                }
            }
        }

        let InstanceSnapshot { id, public_ip, .. } = instance;
        let Some(public_ip) = public_ip else {
            return Err(LifecycleError::MissingPublicIp { instance_id: id });
        };

        info!(instance = %id, address = %public_ip, "instance running");
        Ok(RunningInstance { id, public_ip })
    }

    /// Requests termination of one instance, then pauses briefly so the
    /// provider can begin teardown. The terminal state is not polled.
    ///
    /// # Errors
    ///
    /// Returns [`LifecycleError::Provider`] when the terminate request is
    /// rejected.
    pub async fn terminate(&self, instance_id: &str) -> Result<(), LifecycleError> {
        self.provider.terminate_instance(instance_id).await?;
        info!(instance = instance_id, "termination requested");
        sleep(self.teardown_delay).await;
        Ok(())
    }
}

#[cfg(test)]
mod tests;
