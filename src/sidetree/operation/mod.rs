mod create;
mod deactivate;
mod recover;
mod update;
mod validate;

pub use create::*;
pub use deactivate::*;
pub use recover::*;
pub use update::*;
pub use validate::validate_delta;

use serde::{de::DeserializeOwned, Deserialize, Serialize};

use super::{
    commitment, json_canonicalization_scheme, jws, DIDStatePatch, DIDSuffix, PatchError,
    PublicKeyJwk, Sidetree,
};

/// Sidetree DID operation
///
/// ### References
/// - <https://identity.foundation/sidetree/spec/v1.0.0/#did-operations>
/// - <https://identity.foundation/sidetree/spec/v1.0.0/#sidetree-operations>
/// - <https://identity.foundation/sidetree/api/#sidetree-operations>
#[derive(Debug, Serialize, Deserialize, Clone, PartialEq, Eq)]
#[serde(tag = "type")]
#[serde(rename_all = "camelCase")]
pub enum Operation {
    Create(CreateOperation),
    Update(UpdateOperation),
    Recover(RecoverOperation),
    Deactivate(DeactivateOperation),
}

/// Create/Update/Recover Delta Object
///
/// ### References
/// - [Sidetree §11.1 Create - Create Operation Delta Object][codo]
/// - [Sidetree §11.2 Update - Update Operation Delta Object][uodo]
/// - [Sidetree §11.3 Recover - Recover Operation Delta Object][rodo]
///
/// [codo]: https://identity.foundation/sidetree/spec/v1.0.0/#create-delta-object
/// [uodo]: https://identity.foundation/sidetree/spec/v1.0.0/#update-delta-object
/// [rodo]: https://identity.foundation/sidetree/spec/v1.0.0/#recover-delta-object
#[derive(Debug, Serialize, Deserialize, Clone, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
#[serde(deny_unknown_fields)]
pub struct Delta {
    /// DID state patches to apply.
    pub patches: Vec<DIDStatePatch>,

    /// Update commitment generated as part of a Sidetree Create, Update or Recover operation.
    pub update_commitment: String,
}

impl Delta {
    /// [Hash](Sidetree::hash) of the canonicalized delta, as committed to by `deltaHash`.
    pub fn hash<S: Sidetree>(&self) -> Result<String, serde_json::Error> {
        let delta_string = json_canonicalization_scheme(self)?;
        Ok(S::hash(delta_string.as_bytes()))
    }
}

/// Error rejecting an operation request at parse time
#[derive(Debug, thiserror::Error)]
pub enum ValidationError {
    #[error("operation is not a JSON object")]
    NotAnObject,

    #[error("operation type unknown or missing")]
    OperationTypeUnknownOrMissing,

    #[error("`{field}` is not an object")]
    InputIsNotAnObject { field: &'static str },

    #[error("missing property `{field}`")]
    MissingProperty { field: &'static str },

    #[error("unknown property `{field}`")]
    UnknownProperty { field: String },

    #[error("`{field}` must be {expected}")]
    InvalidType {
        field: &'static str,
        expected: &'static str,
    },

    #[error("`{field}` exceeds maximum size ({size} > {max})")]
    ExceedsMaxSize {
        field: &'static str,
        size: usize,
        max: usize,
    },

    #[error("`{field}` is not valid base64url")]
    InvalidEncoding { field: &'static str },

    #[error("`{field}` is not an encoded multihash of the expected algorithm")]
    InvalidHash { field: &'static str },

    #[error("invalid patch: {0}")]
    InvalidPatch(#[from] PatchError),

    #[error("invalid `{field}`: {reason}")]
    InvalidJws { field: &'static str, reason: String },

    #[error("invalid signature algorithm")]
    InvalidSignatureAlgorithm,

    #[error("signing key not valid for this method")]
    InvalidKey,

    #[error("signature verification failed")]
    SignatureInvalid,

    #[error("reveal value mismatch (computed: {computed:?}, found: {found:?})")]
    RevealValueMismatch { computed: String, found: String },

    #[error("delta hash mismatch")]
    DeltaHashMismatch,

    #[error("DID suffix mismatch")]
    DidSuffixMismatch,

    #[error("malformed operation: {0}")]
    Malformed(#[source] serde_json::Error),

    #[error("unable to canonicalize: {0}")]
    Canonicalization(#[from] serde_json::Error),
}

impl ValidationError {
    /// Name of the offending property, when the error concerns one.
    pub fn field(&self) -> Option<&str> {
        match self {
            Self::InputIsNotAnObject { field }
            | Self::MissingProperty { field }
            | Self::InvalidType { field, .. }
            | Self::ExceedsMaxSize { field, .. }
            | Self::InvalidEncoding { field }
            | Self::InvalidHash { field }
            | Self::InvalidJws { field, .. } => Some(*field),
            Self::UnknownProperty { field } => Some(field.as_str()),
            Self::InvalidPatch(_) => Some("patches"),
            Self::RevealValueMismatch { .. } => Some("revealValue"),
            Self::DidSuffixMismatch => Some("didSuffix"),
            Self::InvalidSignatureAlgorithm | Self::InvalidKey | Self::SignatureInvalid => {
                Some("signedData")
            },
            _ => None,
        }
    }
}

/// Parse and partially verify a raw operation request.
///
/// Every check is a hard gate, in order: request size, JSON object, `type`, per-type structure
/// and size ceilings, delta and patches, then signature, reveal value and delta hash. Checks
/// relative to the DID's current state are left to the resolver.
pub fn parse_operation<S: Sidetree>(
    bytes: &[u8],
) -> Result<PartiallyVerifiedOperation, ValidationError> {
    if bytes.len() > S::MAX_OPERATION_SIZE {
        log::debug!("rejected operation request of {} bytes", bytes.len());
        return Err(ValidationError::ExceedsMaxSize {
            field: "operation",
            size: bytes.len(),
            max: S::MAX_OPERATION_SIZE,
        });
    }
    let value: serde_json::Value =
        serde_json::from_slice(bytes).map_err(|_| ValidationError::NotAnObject)?;
    parse_operation_value::<S>(value)
}

/// Parse and partially verify an already-decoded operation request.
pub fn parse_operation_value<S: Sidetree>(
    value: serde_json::Value,
) -> Result<PartiallyVerifiedOperation, ValidationError> {
    let object = value.as_object().ok_or(ValidationError::NotAnObject)?;
    validate::validate_request::<S>(object).inspect_err(|err| {
        log::debug!("rejected malformed operation: {err}");
    })?;
    let operation: Operation =
        serde_json::from_value(value).map_err(ValidationError::Malformed)?;
    operation.partial_verify::<S>().inspect_err(|err| {
        log::debug!("rejected operation failing verification: {err}");
    })
}

/// Partially verified Sidetree DID operation
///
/// Converted from [Operation].
///
/// Operation verification is described in [Sidetree §10.2.1 Operation Verification][ov].
///
/// [ov]: https://identity.foundation/sidetree/spec/v1.0.0/#operation-verification
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PartiallyVerifiedOperation {
    Create(PartiallyVerifiedCreateOperation),
    Update(PartiallyVerifiedUpdateOperation),
    Recover(PartiallyVerifiedRecoverOperation),
    Deactivate(PartiallyVerifiedDeactivateOperation),
}

/// A Sidetree operation
///
/// See also the enum [Operation] which implements this trait.
pub trait SidetreeOperation {
    /// The result of [partially verifying][Self::partial_verify] the operation.
    type PartiallyVerifiedForm;

    /// Partially verify the operation.
    ///
    /// Operation verification is described in [Sidetree §10.2.1 Operation Verification][ov].
    ///
    /// This function verifies the internal consistency (including signatures and hashes) of the operation,
    /// and returns the integrity-verified data.
    /// Public key commitment values are not checked; that is, the signature is verified, but
    /// whether the public key is the correct reveal value is not checked, since that depends on
    /// what the previous operation was. The DID suffix is also not checked, except for a Create
    /// operation, since it is otherwise in reference to an earlier (Create) opeation.
    ///
    /// [ov]: https://identity.foundation/sidetree/spec/v1.0.0/#operation-verification
    fn partial_verify<S: Sidetree>(self) -> Result<Self::PartiallyVerifiedForm, ValidationError>;
}

impl SidetreeOperation for Operation {
    type PartiallyVerifiedForm = PartiallyVerifiedOperation;

    fn partial_verify<S: Sidetree>(self) -> Result<Self::PartiallyVerifiedForm, ValidationError> {
        match self {
            Operation::Create(op) => op
                .partial_verify::<S>()
                .map(PartiallyVerifiedOperation::Create),
            Operation::Update(op) => op
                .partial_verify::<S>()
                .map(PartiallyVerifiedOperation::Update),
            Operation::Recover(op) => op
                .partial_verify::<S>()
                .map(PartiallyVerifiedOperation::Recover),
            Operation::Deactivate(op) => op
                .partial_verify::<S>()
                .map(PartiallyVerifiedOperation::Deactivate),
        }
    }
}

impl PartiallyVerifiedOperation {
    /// Wire `type` of the operation
    pub fn operation_type(&self) -> &'static str {
        match self {
            Self::Create(_) => "create",
            Self::Update(_) => "update",
            Self::Recover(_) => "recover",
            Self::Deactivate(_) => "deactivate",
        }
    }

    /// Suffix of the DID the operation applies to (derived, for a Create operation).
    pub fn did_suffix(&self) -> &DIDSuffix {
        match self {
            Self::Create(create) => &create.did_suffix,
            Self::Update(update) => &update.did_suffix,
            Self::Recover(recover) => &recover.did_suffix,
            Self::Deactivate(deactivate) => &deactivate.did_suffix,
        }
    }

    /// Hash of the canonicalized operation request
    pub fn operation_hash(&self) -> &str {
        match self {
            Self::Create(create) => &create.operation_hash,
            Self::Update(update) => &update.operation_hash,
            Self::Recover(recover) => &recover.operation_hash,
            Self::Deactivate(deactivate) => &deactivate.operation_hash,
        }
    }

    pub fn reveal_value(&self) -> Option<&str> {
        match self {
            Self::Create(_) => None,
            Self::Update(update) => Some(&update.reveal_value),
            Self::Recover(recover) => Some(&recover.reveal_value),
            Self::Deactivate(deactivate) => Some(&deactivate.reveal_value),
        }
    }

    /// Update commitment installed by the operation
    pub fn update_commitment(&self) -> Option<&str> {
        match self {
            Self::Create(create) => Some(&create.delta.update_commitment),
            Self::Update(update) => Some(&update.delta.update_commitment),
            Self::Recover(recover) => Some(&recover.delta.update_commitment),
            Self::Deactivate(_) => None,
        }
    }

    /// Recovery commitment installed by the operation
    pub fn recovery_commitment(&self) -> Option<&str> {
        match self {
            Self::Create(create) => Some(&create.recovery_commitment),
            Self::Update(_) => None,
            Self::Recover(recover) => Some(&recover.recovery_commitment),
            Self::Deactivate(_) => None,
        }
    }
}

/// Hash of a canonicalized operation request, including its `type`.
fn operation_hash<S: Sidetree, T: Serialize>(
    r#type: &str,
    operation: &T,
) -> Result<String, ValidationError> {
    let mut value = serde_json::to_value(operation)?;
    if let Some(object) = value.as_object_mut() {
        object.insert("type".to_string(), serde_json::Value::String(r#type.to_string()));
    }
    let canonicalized = json_canonicalization_scheme(&value)?;
    Ok(S::hash(canonicalized.as_bytes()))
}

/// Decode the compact JWS in `signedData` and verify it against the public key found in its
/// own payload.
fn verify_signed_data<S: Sidetree, Claims: DeserializeOwned>(
    signed_data: &str,
    get_key: impl FnOnce(&Claims) -> &PublicKeyJwk,
) -> Result<Claims, ValidationError> {
    use jws::JWSDecodeVerifyError as E;
    jws::jws_decode_verify_inner::<S, Claims>(signed_data, get_key).map_err(|err| match err {
        E::SplitJWS(_) | E::DecodeJWSParts(_) | E::DeserializeJWSPayload(_) => {
            ValidationError::InvalidJws {
                field: "signedData",
                reason: err.to_string(),
            }
        }
        E::UnexpectedAlgorithm(_) => ValidationError::InvalidSignatureAlgorithm,
        E::JWKFromPublicKeyJwk(_) | E::InvalidKey => ValidationError::InvalidKey,
        E::VerifyJWS(err) => {
            log::debug!("signature verification failed: {err}");
            ValidationError::SignatureInvalid
        }
    })
}

/// Check that the revealed public key hashes to the operation's reveal value.
fn ensure_reveal_value<S: Sidetree>(
    reveal_value: &str,
    public_key: &PublicKeyJwk,
) -> Result<(), ValidationError> {
    let computed = commitment::reveal_value::<S>(public_key)?;
    if computed != reveal_value {
        return Err(ValidationError::RevealValueMismatch {
            computed,
            found: reveal_value.to_string(),
        });
    }
    Ok(())
}

fn ensure_delta_hash<S: Sidetree>(delta: &Delta, delta_hash: &str) -> Result<(), ValidationError> {
    if delta.hash::<S>()? != delta_hash {
        return Err(ValidationError::DeltaHashMismatch);
    }
    Ok(())
}
