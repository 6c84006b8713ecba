use serde::{Deserialize, Serialize};

use crate::sidetree::{DIDSuffix, PublicKeyJwk, Sidetree};

use super::{
    ensure_delta_hash, ensure_reveal_value, operation_hash, validate, verify_signed_data, Delta,
    SidetreeOperation, ValidationError,
};

/// Sidetree DID Recover operation
///
/// ### References
/// - [Sidetree §11.3 Recover](https://identity.foundation/sidetree/spec/v1.0.0/#recover)
/// - [Sidetree REST API §1.2.3 Recover](https://identity.foundation/sidetree/api/#recover)
#[derive(Debug, Serialize, Deserialize, Clone, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
#[serde(deny_unknown_fields)]
pub struct RecoverOperation {
    pub did_suffix: DIDSuffix,
    /// Output of [Sidetree::reveal_value]
    pub reveal_value: String,
    pub delta: Delta,
    /// Compact JWS (RFC 7515) of [RecoveryClaims]
    ///
    /// <https://identity.foundation/sidetree/spec/v1.0.0/#recover-signed-data-object>
    pub signed_data: String,
}

impl SidetreeOperation for RecoverOperation {
    type PartiallyVerifiedForm = PartiallyVerifiedRecoverOperation;

    /// Partially verify a [RecoverOperation]
    fn partial_verify<S: Sidetree>(
        self,
    ) -> Result<PartiallyVerifiedRecoverOperation, ValidationError> {
        let operation_hash = operation_hash::<S, _>("recover", &self)?;
        // Verify JWS against public key in payload.
        // Then check public key against its hash (reveal value).
        let claims: RecoveryClaims =
            verify_signed_data::<S, _>(&self.signed_data, |claims: &RecoveryClaims| {
                &claims.recovery_key
            })?;
        ensure_reveal_value::<S>(&self.reveal_value, &claims.recovery_key)?;
        validate::check_hash_str::<S>(&claims.recovery_commitment, "recoveryCommitment")?;
        ensure_delta_hash::<S>(&self.delta, &claims.delta_hash)?;
        Ok(PartiallyVerifiedRecoverOperation {
            did_suffix: self.did_suffix,
            reveal_value: self.reveal_value,
            delta: self.delta,
            recovery_commitment: claims.recovery_commitment,
            recovery_key: claims.recovery_key,
            anchor_origin: claims.anchor_origin,
            operation_hash,
        })
    }
}

/// Partially verified DID Recovery operation
///
/// Converted from [RecoverOperation].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PartiallyVerifiedRecoverOperation {
    pub did_suffix: DIDSuffix,
    pub reveal_value: String,
    pub delta: Delta,
    /// New recovery commitment, from the signed payload
    pub recovery_commitment: String,
    pub recovery_key: PublicKeyJwk,
    pub anchor_origin: Option<String>,
    pub operation_hash: String,
}

/// Payload object for JWS in [RecoverOperation]
#[derive(Debug, Serialize, Deserialize, Clone)]
#[serde(rename_all = "camelCase")]
pub struct RecoveryClaims {
    /// [Recovery commitment](https://identity.foundation/sidetree/spec/v1.0.0/#recovery-commitment)
    ///
    /// Generated in step 9 of the [Recover](https://identity.foundation/sidetree/spec/v1.0.0/#recover) process.
    pub recovery_commitment: String,

    /// Key matching previous Recovery Commitment
    pub recovery_key: PublicKeyJwk,

    /// [Hash](Sidetree::hash) of canonicalized [Recover Operation Delta Object](Delta).
    pub delta_hash: String,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub anchor_origin: Option<String>,
}
