//! Classification of EC2 control-plane errors by error code.
//!
//! The managers key their create-on-absence behaviour off typed errors, so
//! the SDK's error metadata is classified here using the `.code()` values
//! rather than string matching on the Debug format.

use aws_sdk_ec2::error::{ProvideErrorMetadata, SdkError};

use crate::provider::ProviderError;

/// Codes whose absence-semantics the managers honour.
const NOT_FOUND_CODES: &[&str] = &[
    "InvalidKeyPair.NotFound",
    "InvalidGroup.NotFound",
    "InvalidInstanceID.NotFound",
];

/// Codes the managers treat as "already present".
const ALREADY_EXISTS_CODES: &[&str] = &[
    "InvalidKeyPair.Duplicate",
    "InvalidGroup.Duplicate",
    "InvalidPermission.Duplicate",
];

/// Maps an SDK operation error onto the provider error taxonomy.
pub(crate) fn classify<E>(resource: &'static str, name: &str, err: &SdkError<E>) -> ProviderError
where
    E: ProvideErrorMetadata,
{
    let meta = ProvideErrorMetadata::meta(err);
    from_code(resource, name, meta.code(), meta.message())
}

/// Code-level classification, split out so it can be tested without
/// constructing SDK errors.
pub(crate) fn from_code(
    resource: &'static str,
    name: &str,
    code: Option<&str>,
    message: Option<&str>,
) -> ProviderError {
    match code {
        Some(code) if NOT_FOUND_CODES.contains(&code) => ProviderError::NotFound {
            resource,
            name: name.to_owned(),
        },
        Some(code) if ALREADY_EXISTS_CODES.contains(&code) => ProviderError::AlreadyExists {
            resource,
            name: name.to_owned(),
        },
        _ => ProviderError::Api {
            code: code.map(str::to_owned),
            message: message.unwrap_or("unspecified provider error").to_owned(),
        },
    }
}

#[cfg(test)]
mod tests {
    use rstest::rstest;

    use super::*;

    #[test]
    fn expected_absence_code_maps_to_not_found() {
        let err = from_code(
            "key pair",
            "aws_c2",
            Some("InvalidKeyPair.NotFound"),
            Some("does not exist"),
        );
        assert_eq!(
            err,
            ProviderError::NotFound {
                resource: "key pair",
                name: "aws_c2".to_owned(),
            }
        );
    }

    #[rstest]
    #[case("InvalidPermission.Duplicate")]
    #[case("InvalidGroup.Duplicate")]
    fn duplicate_codes_map_to_already_exists(#[case] code: &str) {
        let err = from_code("ingress rule", "aws_c2", Some(code), None);
        assert!(err.is_already_exists(), "unexpected mapping: {err:?}");
    }

    #[test]
    fn unrelated_not_found_code_stays_opaque() {
        let err = from_code(
            "key pair",
            "aws_c2",
            Some("InvalidAMIID.NotFound"),
            Some("no such image"),
        );
        assert_eq!(
            err,
            ProviderError::Api {
                code: Some("InvalidAMIID.NotFound".to_owned()),
                message: "no such image".to_owned(),
            }
        );
    }

    #[test]
    fn missing_code_stays_opaque() {
        let err = from_code("instance", "i-123", None, None);
        assert!(
            matches!(err, ProviderError::Api { code: None, .. }),
            "unexpected mapping: {err:?}"
        );
    }
}
