//! Structural checks on a decoded operation request, run before any typed deserialization or
//! cryptographic work.
use serde_json::{Map, Value};

use super::{Delta, ValidationError};
use crate::sidetree::{json_canonicalization_scheme, DIDStatePatch, InvalidHash, Sidetree};

type Object = Map<String, Value>;

/// Check the shape of an operation request, dispatching on its `type`.
pub(super) fn validate_request<S: Sidetree>(object: &Object) -> Result<(), ValidationError> {
    match object.get("type").and_then(Value::as_str) {
        Some("create") => {
            check_properties(object, &["type", "suffixData", "delta"], &[])?;
            let suffix_data = object_property(object, "suffixData")?;
            check_properties(
                suffix_data,
                &["deltaHash", "recoveryCommitment"],
                &["type", "anchorOrigin"],
            )?;
            check_hash::<S>(suffix_data, "deltaHash")?;
            check_hash::<S>(suffix_data, "recoveryCommitment")?;
            for optional in ["type", "anchorOrigin"] {
                if suffix_data.contains_key(optional) {
                    string_property(suffix_data, optional)?;
                }
            }
            validate_delta::<S>(&object["delta"])?;
        }
        Some(kind @ ("update" | "recover")) => {
            check_properties(
                object,
                &["type", "didSuffix", "revealValue", "delta", "signedData"],
                &[],
            )?;
            check_signed_request::<S>(object)?;
            log::trace!("{kind} request well-formed, checking delta");
            validate_delta::<S>(&object["delta"])?;
        }
        Some("deactivate") => {
            check_properties(
                object,
                &["type", "didSuffix", "revealValue", "signedData"],
                &[],
            )?;
            check_signed_request::<S>(object)?;
        }
        _ => return Err(ValidationError::OperationTypeUnknownOrMissing),
    }
    Ok(())
}

/// Validate a delta object and its patches.
///
/// Size ceilings are checked before patches are parsed.
pub fn validate_delta<S: Sidetree>(delta: &Value) -> Result<Delta, ValidationError> {
    let object = delta
        .as_object()
        .ok_or(ValidationError::InputIsNotAnObject { field: "delta" })?;
    check_properties(object, &["patches", "updateCommitment"], &[])?;
    let size = json_canonicalization_scheme(delta)?.len();
    if size > S::MAX_DELTA_SIZE {
        return Err(ValidationError::ExceedsMaxSize {
            field: "delta",
            size,
            max: S::MAX_DELTA_SIZE,
        });
    }
    let patches = object["patches"]
        .as_array()
        .ok_or(ValidationError::InvalidType {
            field: "patches",
            expected: "array",
        })?;
    if patches.len() > S::MAX_PATCHES_PER_DELTA {
        return Err(ValidationError::ExceedsMaxSize {
            field: "patches",
            size: patches.len(),
            max: S::MAX_PATCHES_PER_DELTA,
        });
    }
    let update_commitment = check_hash::<S>(object, "updateCommitment")?;
    let patches = patches
        .iter()
        .map(DIDStatePatch::from_value::<S>)
        .collect::<Result<Vec<_>, _>>()?;
    Ok(Delta {
        patches,
        update_commitment: update_commitment.to_string(),
    })
}

fn check_signed_request<S: Sidetree>(object: &Object) -> Result<(), ValidationError> {
    check_hash::<S>(object, "didSuffix")?;
    check_hash::<S>(object, "revealValue")?;
    let signed_data = string_property(object, "signedData")?;
    if signed_data.len() > S::MAX_SIGNED_DATA_LENGTH {
        return Err(ValidationError::ExceedsMaxSize {
            field: "signedData",
            size: signed_data.len(),
            max: S::MAX_SIGNED_DATA_LENGTH,
        });
    }
    Ok(())
}

fn check_properties(
    object: &Object,
    required: &[&'static str],
    optional: &[&'static str],
) -> Result<(), ValidationError> {
    if let Some(field) = required.iter().find(|name| !object.contains_key(**name)) {
        return Err(ValidationError::MissingProperty { field: *field });
    }
    let known = |key: &str| required.iter().chain(optional).any(|name| *name == key);
    match object.keys().find(|key| !known(key)) {
        Some(key) => Err(ValidationError::UnknownProperty { field: key.clone() }),
        None => Ok(()),
    }
}

fn object_property<'a>(object: &'a Object, field: &'static str) -> Result<&'a Object, ValidationError> {
    object
        .get(field)
        .ok_or(ValidationError::MissingProperty { field })?
        .as_object()
        .ok_or(ValidationError::InputIsNotAnObject { field })
}

fn string_property<'a>(object: &'a Object, field: &'static str) -> Result<&'a str, ValidationError> {
    object
        .get(field)
        .ok_or(ValidationError::MissingProperty { field })?
        .as_str()
        .ok_or(ValidationError::InvalidType {
            field,
            expected: "string",
        })
}

/// Check that a property holds an encoded multihash, returning it.
pub(super) fn check_hash<'a, S: Sidetree>(
    object: &'a Object,
    field: &'static str,
) -> Result<&'a str, ValidationError> {
    let value = string_property(object, field)?;
    check_hash_str::<S>(value, field)?;
    Ok(value)
}

pub(super) fn check_hash_str<S: Sidetree>(
    value: &str,
    field: &'static str,
) -> Result<(), ValidationError> {
    match S::decode_hash(value) {
        Ok(_) => Ok(()),
        Err(InvalidHash::TooLong { length, max }) => Err(ValidationError::ExceedsMaxSize {
            field,
            size: length,
            max,
        }),
        Err(InvalidHash::Base64) => Err(ValidationError::InvalidEncoding { field }),
        Err(_) => Err(ValidationError::InvalidHash { field }),
    }
}
