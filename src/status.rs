//! Read-only report of running instances.

use std::io::{self, Write};

use tracing::warn;

use crate::provider::Provider;

/// Prints running instances to an output sink.
#[derive(Clone, Debug)]
pub struct StatusReporter<P> {
    provider: P,
}

impl<P: Provider> StatusReporter<P> {
    /// Creates a reporter over the given provider.
    #[must_use]
    pub const fn new(provider: P) -> Self {
        Self { provider }
    }

    /// Writes one line per running instance: id, public IP, private IP.
    ///
    /// Instances are gathered across all reservations. Query failures are
    /// reported on the sink and swallowed; only sink write failures surface
    /// as errors.
    ///
    /// # Errors
    ///
    /// Returns an error when writing to `out` fails.
    pub async fn report(&self, mut out: impl Write) -> io::Result<()> {
        let instances = match self.provider.running_instances().await {
            Ok(instances) => instances,
            Err(err) => {
                warn!(error = %err, "running-instance query failed");
                return writeln!(out, "failed to query running instances: {err}");
            }
        };

        writeln!(out, "INSTANCE ID\tPUBLIC IP\tPRIVATE IP")?;
        for instance in instances {
            writeln!(
                out,
                "{}\t{}\t{}",
                instance.id,
                instance.public_ip.as_deref().unwrap_or("-"),
                instance.private_ip.as_deref().unwrap_or("-"),
            )?;
        }
        Ok(())
    }
}
