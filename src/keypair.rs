//! Key-pair provisioning and local persistence of the private half.

use camino::{Utf8Path, Utf8PathBuf};
use cap_std::{ambient_authority, fs_utf8::Dir};
use thiserror::Error;
use tracing::info;

use crate::provider::{Provider, ProviderError};

/// Result of an idempotent ensure call.
#[derive(Clone, Debug, Eq, PartialEq)]
pub enum KeyPairOutcome {
    /// The key pair was created and its private half written to `key_file`.
    Created {
        /// Path of the pem file holding the private key material.
        key_file: Utf8PathBuf,
    },
    /// A key pair with this name already exists; nothing was written.
    AlreadyPresent,
}

/// Errors raised while provisioning key pairs.
#[derive(Clone, Debug, Error, Eq, PartialEq)]
pub enum KeyPairError {
    /// Raised when the pem file cannot be written.
    #[error("failed to write {path}: {message}")]
    Write {
        /// Destination that could not be written.
        path: Utf8PathBuf,
        /// Underlying error message.
        message: String,
    },
    /// Control-plane failure, carried unchanged.
    #[error(transparent)]
    Provider(#[from] ProviderError),
}

/// Creates and deletes the SSH key pair used to reach instances.
#[derive(Clone, Debug)]
pub struct KeyPairManager<P> {
    provider: P,
    key_dir: Utf8PathBuf,
}

impl<P: Provider> KeyPairManager<P> {
    /// Creates a manager that writes pem files into the working directory.
    #[must_use]
    pub fn new(provider: P) -> Self {
        Self {
            provider,
            key_dir: Utf8PathBuf::from("."),
        }
    }

    /// Overrides the directory receiving pem files.
    #[must_use]
    pub fn with_key_dir(mut self, dir: impl Into<Utf8PathBuf>) -> Self {
        self.key_dir = dir.into();
        self
    }

    /// Ensures a key pair named `name` exists, writing `<name>.pem` when the
    /// provider creates one.
    ///
    /// The provider is probed first and an existing key is left untouched;
    /// only the provider's not-found answer triggers creation. The private
    /// material is written exactly once, at creation.
    ///
    /// # Errors
    ///
    /// Returns [`KeyPairError::Provider`] for any probe or create failure
    /// other than the expected not-found answer, and [`KeyPairError::Write`]
    /// when persisting the pem file fails.
    pub async fn ensure(&self, name: &str) -> Result<KeyPairOutcome, KeyPairError> {
        match self.provider.lookup_key_pair(name).await {
            Ok(existing) => {
                info!(key = %existing.name, "key pair already present, skipping creation");
                Ok(KeyPairOutcome::AlreadyPresent)
            }
            Err(err) if err.is_not_found() => {
                let material = self.provider.create_key_pair(name).await?;
                let key_file = self.key_dir.join(format!("{name}.pem"));
                write_private_key(&key_file, &material.material)?;
                info!(key = name, file = %key_file, "generated key pair");
                Ok(KeyPairOutcome::Created { key_file })
            }
            Err(other) => Err(other.into()),
        }
    }

    /// Requests deletion of the key pair unconditionally.
    ///
    /// Provider-side absence is not special-cased: a rejection propagates to
    /// the caller. The local pem file, if any, is left in place.
    ///
    /// # Errors
    ///
    /// Returns [`KeyPairError::Provider`] when the provider rejects the
    /// deletion.
    pub async fn delete(&self, name: &str) -> Result<(), KeyPairError> {
        self.provider.delete_key_pair(name).await?;
        info!(key = name, "removed key pair");
        Ok(())
    }
}

/// Writes the private key next to the operator with owner-only permissions,
/// since ssh refuses group- or world-readable identity files.
fn write_private_key(path: &Utf8Path, material: &str) -> Result<(), KeyPairError> {
    let write_err = |message: String| KeyPairError::Write {
        path: path.to_path_buf(),
        message,
    };

    let parent = match path.parent() {
        Some(parent) if !parent.as_str().is_empty() => parent,
        _ => Utf8Path::new("."),
    };
    let file_name = path
        .file_name()
        .ok_or_else(|| write_err(String::from("path has no file name")))?;

    let dir = Dir::open_ambient_dir(parent, ambient_authority())
        .map_err(|err| write_err(err.to_string()))?;
    dir.write(file_name, material)
        .map_err(|err| write_err(err.to_string()))?;

    #[cfg(unix)]
    {
        use std::os::unix::fs::PermissionsExt;

        let permissions =
            cap_std::fs::Permissions::from_std(std::fs::Permissions::from_mode(0o600));
        dir.set_permissions(file_name, permissions)
            .map_err(|err| write_err(err.to_string()))?;
    }

    Ok(())
}

#[cfg(test)]
mod tests;
