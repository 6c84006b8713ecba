use serde::{Deserialize, Serialize};

use crate::sidetree::{DIDSuffix, PublicKeyJwk, Sidetree};

use super::{
    ensure_delta_hash, ensure_reveal_value, operation_hash, verify_signed_data, Delta,
    SidetreeOperation, ValidationError,
};

/// Sidetree DID Update operation
///
/// ### References
/// - [Sidetree §11.2 Update](https://identity.foundation/sidetree/spec/v1.0.0/#update)
/// - [Sidetree REST API §1.2.2 Update](https://identity.foundation/sidetree/api/#update)
#[derive(Debug, Serialize, Deserialize, Clone, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
#[serde(deny_unknown_fields)]
pub struct UpdateOperation {
    pub did_suffix: DIDSuffix,
    /// Output of [Sidetree::reveal_value]
    pub reveal_value: String,
    pub delta: Delta,
    /// Compact JWS (RFC 7515) of [UpdateClaims]
    ///
    /// <https://identity.foundation/sidetree/spec/v1.0.0/#update-signed-data-object>
    pub signed_data: String,
}

/// Partially verified DID Update operation
///
/// Converted from [UpdateOperation].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PartiallyVerifiedUpdateOperation {
    pub did_suffix: DIDSuffix,
    pub reveal_value: String,
    pub delta: Delta,
    pub update_key: PublicKeyJwk,
    pub operation_hash: String,
}

impl SidetreeOperation for UpdateOperation {
    type PartiallyVerifiedForm = PartiallyVerifiedUpdateOperation;

    /// Partially verify an [UpdateOperation]
    ///
    /// Specifically, the following is done:
    /// - The operation's [signed data](UpdateOperation::signed_data) is verified against the
    ///   revealed [public key](UpdateClaims::update_key) that it must contain;
    /// - the revealed public key is verified against the operation's
    ///   [reveal value](UpdateOperation::reveal_value); and
    /// - the operation's [delta object](UpdateOperation::delta) is verified against the
    ///   [delta hash](UpdateClaims::delta_hash) in the signed data payload.
    ///
    /// Whether the reveal value satisfies the DID's current update commitment is left to the
    /// resolver.
    fn partial_verify<S: Sidetree>(
        self,
    ) -> Result<PartiallyVerifiedUpdateOperation, ValidationError> {
        let operation_hash = operation_hash::<S, _>("update", &self)?;
        let claims: UpdateClaims =
            verify_signed_data::<S, _>(&self.signed_data, |claims: &UpdateClaims| {
                &claims.update_key
            })?;
        ensure_reveal_value::<S>(&self.reveal_value, &claims.update_key)?;
        ensure_delta_hash::<S>(&self.delta, &claims.delta_hash)?;
        Ok(PartiallyVerifiedUpdateOperation {
            did_suffix: self.did_suffix,
            reveal_value: self.reveal_value,
            delta: self.delta,
            update_key: claims.update_key,
            operation_hash,
        })
    }
}

/// Payload object for JWS in [UpdateOperation]
#[derive(Debug, Serialize, Deserialize, Clone)]
#[serde(rename_all = "camelCase")]
pub struct UpdateClaims {
    /// Key matching previous Update Commitment
    pub update_key: PublicKeyJwk,

    /// [Hash](Sidetree::hash) of canonicalized [Update Operation Delta Object](Delta).
    pub delta_hash: String,
}
