use std::marker::PhantomData;

use serde::{Deserialize, Serialize};

use crate::sidetree::{json_canonicalization_scheme, DIDSuffix, Sidetree, SidetreeDID};

use super::{ensure_delta_hash, operation_hash, validate, Delta, SidetreeOperation, ValidationError};

/// Sidetree DID Create operation
///
/// ### References
/// - [Sidetree §11.1 Create](https://identity.foundation/sidetree/spec/v1.0.0/#create)
/// - [Sidetree REST API §1.2.1 Create](https://identity.foundation/sidetree/api/#create)
#[derive(Debug, Serialize, Deserialize, Clone, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
#[serde(deny_unknown_fields)]
pub struct CreateOperation {
    pub suffix_data: SuffixData,
    pub delta: Delta,
}

impl CreateOperation {
    /// Construct a [Long-Form Sidetree DID][lfdu] from a [Create Operation][CreateOperation]
    ///
    /// [lfdu]: https://identity.foundation/sidetree/spec/v1.0.0/#long-form-did-uris
    pub fn to_sidetree_did<S: Sidetree>(&self) -> Result<SidetreeDID<S>, serde_json::Error> {
        let op_json = json_canonicalization_scheme(self)?;
        let op_string = S::data_encoding_scheme(op_json.as_bytes());
        let did_suffix = S::serialize_suffix_data(&self.suffix_data)?;
        Ok(SidetreeDID::Long {
            did_suffix,
            create_operation_data: op_string,
            _marker: PhantomData,
        })
    }
}

impl SidetreeOperation for CreateOperation {
    type PartiallyVerifiedForm = PartiallyVerifiedCreateOperation;

    /// Partially verify a [CreateOperation]
    ///
    /// The DID suffix is derived here, from the suffix data, and never recomputed afterwards.
    fn partial_verify<S: Sidetree>(
        self,
    ) -> Result<PartiallyVerifiedCreateOperation, ValidationError> {
        let operation_hash = operation_hash::<S, _>("create", &self)?;
        let did_suffix = S::serialize_suffix_data(&self.suffix_data)?;
        validate::check_hash_str::<S>(&self.suffix_data.recovery_commitment, "recoveryCommitment")?;
        validate::check_hash_str::<S>(&self.delta.update_commitment, "updateCommitment")?;
        ensure_delta_hash::<S>(&self.delta, &self.suffix_data.delta_hash)?;

        Ok(PartiallyVerifiedCreateOperation {
            did_suffix,
            r#type: self.suffix_data.r#type,
            recovery_commitment: self.suffix_data.recovery_commitment,
            anchor_origin: self.suffix_data.anchor_origin,
            delta: self.delta,
            operation_hash,
        })
    }
}

/// Partially verified DID Create operation
///
/// Converted from [CreateOperation].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PartiallyVerifiedCreateOperation {
    pub did_suffix: DIDSuffix,
    pub r#type: Option<String>,
    pub recovery_commitment: String,
    pub anchor_origin: Option<String>,
    pub delta: Delta,
    pub operation_hash: String,
}

/// [Create Operation Suffix Data Object][data]
///
/// [data]: https://identity.foundation/sidetree/spec/v1.0.0/#create-suffix-data-object
#[derive(Debug, Serialize, Deserialize, Clone, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
#[serde(deny_unknown_fields)]
pub struct SuffixData {
    /// Implementation-defined type property
    #[serde(skip_serializing_if = "Option::is_none")]
    pub r#type: Option<String>,

    /// Delta Hash
    ///
    /// [Hash](Sidetree::hash) of canonicalized [Create Operation Delta Object](Delta).
    pub delta_hash: String,

    /// [Recovery commitment](https://identity.foundation/sidetree/spec/v1.0.0/#recovery-commitment)
    ///
    /// Generated in step 2 of the [Create](https://identity.foundation/sidetree/spec/v1.0.0/#create) process.
    pub recovery_commitment: String,

    /// Anchor Origin
    ///
    /// Implementation-defined identifier for most recent anchor for the DID
    #[serde(skip_serializing_if = "Option::is_none")]
    pub anchor_origin: Option<String>,
}
