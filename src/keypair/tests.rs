//! Unit tests for key-pair provisioning and pem persistence.

use camino::Utf8PathBuf;

use crate::provider::{KeyPairHandle, KeyPairMaterial, ProviderError};
use crate::test_support::{FAKE_KEY_MATERIAL, ProviderCall, ScriptedProvider};

use super::{KeyPairManager, KeyPairOutcome};

fn not_found(name: &str) -> ProviderError {
    ProviderError::NotFound {
        resource: "key pair",
        name: name.to_owned(),
    }
}

fn handle(name: &str) -> KeyPairHandle {
    KeyPairHandle {
        name: name.to_owned(),
        fingerprint: Some(String::from("aa:bb:cc")),
    }
}

fn manager_in(dir: &tempfile::TempDir, provider: ScriptedProvider) -> KeyPairManager<ScriptedProvider> {
    let dir_path = Utf8PathBuf::from_path_buf(dir.path().to_path_buf())
        .expect("temp dir path should be utf-8");
    KeyPairManager::new(provider).with_key_dir(dir_path)
}

fn creations(provider: &ScriptedProvider) -> usize {
    provider
        .calls()
        .iter()
        .filter(|call| matches!(call, ProviderCall::CreateKeyPair(_)))
        .count()
}

#[tokio::test]
async fn absent_key_is_created_and_pem_written_once() {
    let dir = tempfile::tempdir().expect("temp dir");
    let provider = ScriptedProvider::new();
    provider.push_key_lookup(Err(not_found("test1")));
    provider.push_key_creation(Ok(KeyPairMaterial {
        name: String::from("test1"),
        material: FAKE_KEY_MATERIAL.to_owned(),
    }));

    let outcome = manager_in(&dir, provider.clone())
        .ensure("test1")
        .await
        .expect("ensure should succeed");

    let KeyPairOutcome::Created { key_file } = outcome else {
        panic!("expected a creation, got {outcome:?}");
    };
    assert_eq!(key_file.file_name(), Some("test1.pem"));
    let written = std::fs::read_to_string(key_file.as_std_path()).expect("pem should exist");
    assert_eq!(written, FAKE_KEY_MATERIAL);
    assert_eq!(creations(&provider), 1);
}

#[cfg(unix)]
#[tokio::test]
async fn pem_is_owner_readable_only() {
    use std::os::unix::fs::PermissionsExt;

    let dir = tempfile::tempdir().expect("temp dir");
    let provider = ScriptedProvider::new();
    provider.push_key_lookup(Err(not_found("test1")));

    let outcome = manager_in(&dir, provider)
        .ensure("test1")
        .await
        .expect("ensure should succeed");
    let KeyPairOutcome::Created { key_file } = outcome else {
        panic!("expected a creation");
    };

    let mode = std::fs::metadata(key_file.as_std_path())
        .expect("pem metadata")
        .permissions()
        .mode();
    assert_eq!(mode & 0o777, 0o600, "ssh requires owner-only key files");
}

#[tokio::test]
async fn existing_key_writes_nothing() {
    let dir = tempfile::tempdir().expect("temp dir");
    let provider = ScriptedProvider::new();
    provider.push_key_lookup(Ok(handle("test1")));

    let outcome = manager_in(&dir, provider.clone())
        .ensure("test1")
        .await
        .expect("ensure should succeed");

    assert_eq!(outcome, KeyPairOutcome::AlreadyPresent);
    assert_eq!(creations(&provider), 0);
    assert!(
        !dir.path().join("test1.pem").exists(),
        "no pem file should be written for an existing key"
    );
}

#[tokio::test]
async fn second_ensure_after_creation_is_a_no_op() {
    let dir = tempfile::tempdir().expect("temp dir");
    let provider = ScriptedProvider::new();
    provider.push_key_lookup(Err(not_found("test1")));
    provider.push_key_lookup(Ok(handle("test1")));

    let manager = manager_in(&dir, provider.clone());
    let first = manager.ensure("test1").await.expect("first ensure");
    assert!(matches!(first, KeyPairOutcome::Created { .. }));

    let second = manager.ensure("test1").await.expect("second ensure");
    assert_eq!(second, KeyPairOutcome::AlreadyPresent);
    assert_eq!(creations(&provider), 1);
}

#[tokio::test]
async fn unexpected_probe_error_propagates_unchanged() {
    let dir = tempfile::tempdir().expect("temp dir");
    let provider = ScriptedProvider::new();
    let opaque = ProviderError::Api {
        code: Some(String::from("AuthFailure")),
        message: String::from("credentials rejected"),
    };
    provider.push_key_lookup(Err(opaque.clone()));

    let err = manager_in(&dir, provider.clone())
        .ensure("test1")
        .await
        .expect_err("opaque errors must propagate");

    assert_eq!(err, super::KeyPairError::Provider(opaque));
    assert_eq!(creations(&provider), 0);
}

#[tokio::test]
async fn delete_propagates_provider_rejection() {
    let provider = ScriptedProvider::new();
    provider.push_key_deletion(Err(ProviderError::Api {
        code: Some(String::from("AuthFailure")),
        message: String::from("credentials rejected"),
    }));

    let manager = KeyPairManager::new(provider);
    let err = manager
        .delete("test1")
        .await
        .expect_err("rejections must surface");
    assert!(matches!(err, super::KeyPairError::Provider(_)));
}

#[tokio::test]
async fn delete_requests_exactly_one_removal() {
    let provider = ScriptedProvider::new();

    KeyPairManager::new(provider.clone())
        .delete("test1")
        .await
        .expect("delete should succeed");

    assert_eq!(
        provider.calls(),
        vec![ProviderCall::DeleteKeyPair(String::from("test1"))]
    );
}
