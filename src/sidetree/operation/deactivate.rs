use serde::{Deserialize, Serialize};

use crate::sidetree::{DIDSuffix, PublicKeyJwk, Sidetree};

use super::{
    ensure_reveal_value, operation_hash, verify_signed_data, SidetreeOperation, ValidationError,
};

/// Sidetree DID Deactivate operation
///
/// ### References
/// - [Sidetree §11.4 Deactivate](https://identity.foundation/sidetree/spec/v1.0.0/#deactivate)
/// - [Sidetree REST API §1.2.4 Deactivate](https://identity.foundation/sidetree/api/#deactivate)
#[derive(Debug, Serialize, Deserialize, Clone, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
#[serde(deny_unknown_fields)]
pub struct DeactivateOperation {
    pub did_suffix: DIDSuffix,
    /// Output of [Sidetree::reveal_value]
    pub reveal_value: String,
    /// Compact JWS (RFC 7515) of [DeactivateClaims]
    ///
    /// <https://identity.foundation/sidetree/spec/v1.0.0/#deactivate-signed-data-object>
    pub signed_data: String,
}

impl SidetreeOperation for DeactivateOperation {
    type PartiallyVerifiedForm = PartiallyVerifiedDeactivateOperation;

    /// Partially verify a [DeactivateOperation]
    ///
    /// Unlike Update and Recover, the signed payload covers the DID suffix, which must match
    /// the one in the request.
    fn partial_verify<S: Sidetree>(
        self,
    ) -> Result<PartiallyVerifiedDeactivateOperation, ValidationError> {
        let operation_hash = operation_hash::<S, _>("deactivate", &self)?;
        let claims: DeactivateClaims =
            verify_signed_data::<S, _>(&self.signed_data, |claims: &DeactivateClaims| {
                &claims.recovery_key
            })?;
        ensure_reveal_value::<S>(&self.reveal_value, &claims.recovery_key)?;
        if self.did_suffix != claims.did_suffix {
            return Err(ValidationError::DidSuffixMismatch);
        }
        Ok(PartiallyVerifiedDeactivateOperation {
            did_suffix: self.did_suffix,
            reveal_value: self.reveal_value,
            recovery_key: claims.recovery_key,
            operation_hash,
        })
    }
}

/// Partially verified DID Deactivate operation
///
/// Converted from [DeactivateOperation].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PartiallyVerifiedDeactivateOperation {
    pub did_suffix: DIDSuffix,
    pub reveal_value: String,
    pub recovery_key: PublicKeyJwk,
    pub operation_hash: String,
}

/// Payload object for JWS in [DeactivateOperation]
#[derive(Debug, Serialize, Deserialize, Clone)]
#[serde(rename_all = "camelCase")]
#[serde(deny_unknown_fields)]
pub struct DeactivateClaims {
    pub did_suffix: DIDSuffix,
    /// Key matching previous Recovery Commitment
    pub recovery_key: PublicKeyJwk,
}
