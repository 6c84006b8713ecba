//! [DID State Patches][dsp] and the engine applying them to a [`DidDocument`].
//!
//! Patches are validated once, when the delta carrying them is parsed. Application is pure:
//! [`apply_patches`] takes a document snapshot and returns a new one, in patch order, so later
//! patches of a delta see the result of earlier ones.
//!
//! [dsp]: https://identity.foundation/sidetree/spec/v1.0.0/#did-state-patches
use std::collections::{BTreeMap, BTreeSet};

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use super::{DidDocument, PublicKeyJwk, Sidetree};

const PUBLIC_KEY_PROPERTIES: &[&str] = &[
    "id",
    "type",
    "controller",
    "publicKeyJwk",
    "publicKeyMultibase",
    "purposes",
];
const SERVICE_PROPERTIES: &[&str] = &["id", "type", "serviceEndpoint"];
const DOCUMENT_PROPERTIES: &[&str] = &["publicKeys", "services"];

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum PatchError {
    #[error("patch is not an object")]
    NotAnObject,

    #[error("missing patch action")]
    MissingAction,

    #[error("unknown patch action `{0}`")]
    UnknownAction(String),

    #[error("unknown property `{0}`")]
    UnknownProperty(String),

    #[error("malformed patch: {0}")]
    Malformed(String),

    #[error("invalid id `{0}`: must be non-empty base64url characters")]
    InvalidId(String),

    #[error("id `{id}` exceeds {max} characters")]
    IdTooLong { id: String, max: usize },

    #[error("duplicate id `{0}` in patch")]
    DuplicateId(String),

    #[error("duplicate purpose in public key `{0}`")]
    DuplicatePurpose(String),

    #[error("invalid public key `{id}`: {reason}")]
    InvalidPublicKey { id: String, reason: &'static str },

    #[error("invalid service `{id}`: {reason}")]
    InvalidService { id: String, reason: &'static str },

    #[error("`{id}` already exists in the document")]
    AlreadyExists { id: String },
}

/// Public key as JWK or Multibase
///
/// Property of a public key / verification method containing public key data,
/// as part of a [PublicKeyEntry][].
///
/// per [Sidetree §12.1.1 `add-public-keys`: Step 4][apk].
///
/// [apk]: https://identity.foundation/sidetree/spec/v1.0.0/#add-public-keys
#[derive(Debug, Serialize, Deserialize, Clone, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub enum PublicKey {
    /// [`publicKeyJwk`](https://www.w3.org/TR/did-core/#dfn-publickeyjwk) as defined in DID Core.
    PublicKeyJwk(PublicKeyJwk),

    /// [`publicKeyMultibase`](https://www.w3.org/TR/did-core/#dfn-publickeymultibase) as defined in DID Core.
    ///
    /// Maximum length may be set in [Sidetree::MAX_PKMB_LENGTH].
    PublicKeyMultibase(String),
}

/// [Verification relationship](https://www.w3.org/TR/did-core/#verification-relationships)
/// of a public key
#[derive(Debug, Serialize, Deserialize, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
#[serde(rename_all = "camelCase")]
pub enum KeyPurpose {
    Authentication,
    AssertionMethod,
    CapabilityInvocation,
    CapabilityDelegation,
    KeyAgreement,
}

/// Public Key Entry
///
/// Used by the [`add-public-keys`](DIDStatePatch::AddPublicKeys) and
/// [`replace`](DIDStatePatch::Replace) DID state patch actions.
///
/// Specified in [Sidetree §12.1.1 `add-public-keys`][apk].
///
/// [apk]: https://identity.foundation/sidetree/spec/v1.0.0/#add-public-keys
#[derive(Debug, Serialize, Deserialize, Clone, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct PublicKeyEntry {
    /// `id` property
    ///
    /// Maximum length: [Sidetree::MAX_ID_LENGTH] in Base64url
    pub id: String,

    /// Verification method type
    pub r#type: String,

    /// Verification method controller (DID)
    ///
    /// Maximum length may be set in [Sidetree::MAX_CONTROLLER_LENGTH].
    #[serde(skip_serializing_if = "Option::is_none")]
    pub controller: Option<String>,

    /// `publicKeyJwk` or `publicKeyMultibase` property
    #[serde(flatten)]
    pub public_key: PublicKey,

    /// Verification relationships
    #[serde(skip_serializing_if = "Option::is_none")]
    pub purposes: Option<Vec<KeyPurpose>>,
}

/// Service endpoint: a URI, or a JSON object
#[derive(Debug, Serialize, Deserialize, Clone, PartialEq, Eq)]
#[serde(untagged)]
pub enum ServiceEndpoint {
    Uri(String),
    Map(Map<String, Value>),
}

/// Service Endpoint Entry
///
/// Used by the [`add-services`](DIDStatePatch::AddServices) and
/// [`replace`](DIDStatePatch::Replace) DID state patch actions.
///
/// Specified in [Sidetree §12.1.3 `add-services`][as].
///
/// [as]: https://identity.foundation/sidetree/spec/v1.0.0/#add-services
#[derive(Debug, Serialize, Deserialize, Clone, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct ServiceEndpointEntry {
    /// `id` property
    ///
    /// Maximum length: [Sidetree::MAX_ID_LENGTH] in Base64Url
    pub id: String,

    /// Service type
    ///
    /// Maximum length: [Sidetree::MAX_SERVICE_TYPE_LENGTH] in Base64Url
    pub r#type: String,

    /// Service endpoint URL or object
    pub service_endpoint: ServiceEndpoint,
}

/// DID PKI metadata state
///
/// Used by the [`replace`](DIDStatePatch::Replace) DID state patch.
#[derive(Debug, Serialize, Deserialize, Clone, Default, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct DocumentState {
    /// Public key entries
    #[serde(skip_serializing_if = "Option::is_none")]
    pub public_keys: Option<Vec<PublicKeyEntry>>,

    /// Services
    #[serde(skip_serializing_if = "Option::is_none")]
    pub services: Option<Vec<ServiceEndpointEntry>>,
}

/// [DID State Patch][dsp] using a [Sidetree Standard Patch action][spa]
///
/// [dsp]: https://identity.foundation/sidetree/spec/v1.0.0/#did-state-patches
/// [spa]: https://identity.foundation/sidetree/spec/v1.0.0/#standard-patch-actions
#[derive(Debug, Serialize, Deserialize, Clone, PartialEq, Eq)]
#[serde(tag = "action")]
#[serde(rename_all = "kebab-case")]
pub enum DIDStatePatch {
    /// [`add-public-keys`][apk] Patch Action
    ///
    /// [apk]: https://identity.foundation/sidetree/spec/v1.0.0/#add-public-keys
    AddPublicKeys {
        /// Keys to add. Ids must not already exist in the document.
        #[serde(rename = "publicKeys")]
        public_keys: Vec<PublicKeyEntry>,
    },

    /// [`remove-public-keys`][rpk] Patch Action
    ///
    /// [rpk]: https://identity.foundation/sidetree/spec/v1.0.0/#remove-public-keys
    RemovePublicKeys {
        /// IDs of keys to remove
        ids: Vec<String>,
    },

    /// [`add-services`][as] Patch Action
    ///
    /// [as]: https://identity.foundation/sidetree/spec/v1.0.0/#add-services
    AddServices {
        /// Service entries to add
        services: Vec<ServiceEndpointEntry>,
    },

    /// [`remove-services`][rs] Patch Action
    ///
    /// [rs]: https://identity.foundation/sidetree/spec/v1.0.0/#remove-services
    RemoveServices {
        /// IDs of service endpoints to remove
        ids: Vec<String>,
    },

    /// [`replace`][r] Patch Action
    ///
    /// [r]: https://identity.foundation/sidetree/spec/v1.0.0/#replace
    Replace {
        /// Reset DID state
        document: DocumentState,
    },
}

impl DIDStatePatch {
    /// Parse and validate a patch object from a delta.
    pub fn from_value<S: Sidetree>(value: &Value) -> Result<Self, PatchError> {
        let object = value.as_object().ok_or(PatchError::NotAnObject)?;
        let action = object
            .get("action")
            .and_then(Value::as_str)
            .ok_or(PatchError::MissingAction)?;
        match action {
            "add-public-keys" => {
                check_properties(object, &["action", "publicKeys"])?;
                check_entries(object.get("publicKeys"), PUBLIC_KEY_PROPERTIES)?;
            }
            "remove-public-keys" | "remove-services" => {
                check_properties(object, &["action", "ids"])?;
            }
            "add-services" => {
                check_properties(object, &["action", "services"])?;
                check_entries(object.get("services"), SERVICE_PROPERTIES)?;
            }
            "replace" => {
                check_properties(object, &["action", "document"])?;
                if let Some(document) = object.get("document").and_then(Value::as_object) {
                    check_properties(document, DOCUMENT_PROPERTIES)?;
                    check_entries(document.get("publicKeys"), PUBLIC_KEY_PROPERTIES)?;
                    check_entries(document.get("services"), SERVICE_PROPERTIES)?;
                }
            }
            other => return Err(PatchError::UnknownAction(other.to_string())),
        }
        let patch: DIDStatePatch = serde_json::from_value(value.clone())
            .map_err(|err| PatchError::Malformed(err.to_string()))?;
        patch.validate::<S>()?;
        Ok(patch)
    }

    /// Check the patch content against the method's limits.
    pub fn validate<S: Sidetree>(&self) -> Result<(), PatchError> {
        match self {
            DIDStatePatch::AddPublicKeys { public_keys } => validate_public_keys::<S>(public_keys),
            DIDStatePatch::RemovePublicKeys { ids } | DIDStatePatch::RemoveServices { ids } => {
                ids.iter().try_for_each(|id| validate_id::<S>(id))
            }
            DIDStatePatch::AddServices { services } => validate_services::<S>(services),
            DIDStatePatch::Replace { document } => {
                if let Some(public_keys) = &document.public_keys {
                    validate_public_keys::<S>(public_keys)?;
                }
                if let Some(services) = &document.services {
                    validate_services::<S>(services)?;
                }
                Ok(())
            }
        }
    }

    /// Apply the patch to a document snapshot, producing the next snapshot.
    pub fn apply(&self, mut document: DidDocument) -> Result<DidDocument, PatchError> {
        match self {
            DIDStatePatch::AddPublicKeys { public_keys } => {
                for entry in public_keys {
                    insert_new(&mut document.public_keys, &entry.id, entry)?;
                }
            }
            DIDStatePatch::RemovePublicKeys { ids } => {
                // Removing an absent id is a no-op.
                for id in ids {
                    document.public_keys.remove(id);
                }
            }
            DIDStatePatch::AddServices { services } => {
                for entry in services {
                    insert_new(&mut document.services, &entry.id, entry)?;
                }
            }
            DIDStatePatch::RemoveServices { ids } => {
                for id in ids {
                    document.services.remove(id);
                }
            }
            DIDStatePatch::Replace { document: state } => {
                let mut replaced = DidDocument::default();
                for entry in state.public_keys.iter().flatten() {
                    insert_new(&mut replaced.public_keys, &entry.id, entry)?;
                }
                for entry in state.services.iter().flatten() {
                    insert_new(&mut replaced.services, &entry.id, entry)?;
                }
                document = replaced;
            }
        }
        Ok(document)
    }
}

/// Apply patches in order to a document snapshot.
///
/// The input document is left untouched. The first failing patch fails the whole list.
pub fn apply_patches(
    document: &DidDocument,
    patches: &[DIDStatePatch],
) -> Result<DidDocument, PatchError> {
    patches
        .iter()
        .try_fold(document.clone(), |document, patch| patch.apply(document))
}

fn insert_new<T: Clone>(
    map: &mut BTreeMap<String, T>,
    id: &str,
    entry: &T,
) -> Result<(), PatchError> {
    if map.contains_key(id) {
        return Err(PatchError::AlreadyExists { id: id.to_string() });
    }
    map.insert(id.to_string(), entry.clone());
    Ok(())
}

fn check_properties(object: &Map<String, Value>, allowed: &[&str]) -> Result<(), PatchError> {
    match object.keys().find(|key| !allowed.contains(&key.as_str())) {
        Some(key) => Err(PatchError::UnknownProperty(key.clone())),
        None => Ok(()),
    }
}

fn check_entries(entries: Option<&Value>, allowed: &[&str]) -> Result<(), PatchError> {
    let Some(Value::Array(entries)) = entries else {
        return Ok(());
    };
    entries
        .iter()
        .filter_map(Value::as_object)
        .try_for_each(|entry| check_properties(entry, allowed))
}

fn validate_id<S: Sidetree>(id: &str) -> Result<(), PatchError> {
    if id.len() > S::MAX_ID_LENGTH {
        return Err(PatchError::IdTooLong {
            id: id.to_string(),
            max: S::MAX_ID_LENGTH,
        });
    }
    let base64url = |c: char| c.is_ascii_alphanumeric() || c == '-' || c == '_';
    if id.is_empty() || !id.chars().all(base64url) {
        return Err(PatchError::InvalidId(id.to_string()));
    }
    Ok(())
}

fn validate_public_keys<S: Sidetree>(public_keys: &[PublicKeyEntry]) -> Result<(), PatchError> {
    let mut ids = BTreeSet::new();
    for entry in public_keys {
        validate_id::<S>(&entry.id)?;
        if !ids.insert(entry.id.as_str()) {
            return Err(PatchError::DuplicateId(entry.id.clone()));
        }
        let invalid = |reason| PatchError::InvalidPublicKey {
            id: entry.id.clone(),
            reason,
        };
        if entry.r#type.is_empty() {
            return Err(invalid("missing type"));
        }
        if let (Some(controller), Some(max)) = (&entry.controller, S::MAX_CONTROLLER_LENGTH) {
            if controller.len() > max {
                return Err(invalid("controller too long"));
            }
        }
        match &entry.public_key {
            PublicKey::PublicKeyJwk(jwk) if jwk.is_private() => {
                return Err(invalid("private key parameters"));
            }
            PublicKey::PublicKeyMultibase(pkmb) => {
                if matches!(S::MAX_PKMB_LENGTH, Some(max) if pkmb.len() > max) {
                    return Err(invalid("publicKeyMultibase too long"));
                }
            }
            PublicKey::PublicKeyJwk(_) => {}
        }
        if let Some(purposes) = &entry.purposes {
            let unique: BTreeSet<_> = purposes.iter().collect();
            if unique.len() != purposes.len() {
                return Err(PatchError::DuplicatePurpose(entry.id.clone()));
            }
        }
    }
    Ok(())
}

fn validate_services<S: Sidetree>(services: &[ServiceEndpointEntry]) -> Result<(), PatchError> {
    let mut ids = BTreeSet::new();
    for entry in services {
        validate_id::<S>(&entry.id)?;
        if !ids.insert(entry.id.as_str()) {
            return Err(PatchError::DuplicateId(entry.id.clone()));
        }
        let invalid = |reason| PatchError::InvalidService {
            id: entry.id.clone(),
            reason,
        };
        if entry.r#type.is_empty() || entry.r#type.len() > S::MAX_SERVICE_TYPE_LENGTH {
            return Err(invalid("type must be 1 to MAX_SERVICE_TYPE_LENGTH characters"));
        }
        let length = match &entry.service_endpoint {
            ServiceEndpoint::Uri(uri) => {
                if !is_uri(uri) {
                    return Err(invalid("endpoint is not a URI"));
                }
                uri.len()
            }
            ServiceEndpoint::Map(map) => serde_json::to_string(map)
                .map_err(|_| invalid("endpoint is not serializable"))?
                .len(),
        };
        if length > S::MAX_SERVICE_ENDPOINT_LENGTH {
            return Err(invalid("endpoint too long"));
        }
    }
    Ok(())
}

/// Loose RFC 3986 check: a scheme, a colon, and no whitespace.
fn is_uri(value: &str) -> bool {
    let Some((scheme, rest)) = value.split_once(':') else {
        return false;
    };
    let mut chars = scheme.chars();
    matches!(chars.next(), Some(c) if c.is_ascii_alphabetic())
        && chars.all(|c| c.is_ascii_alphanumeric() || matches!(c, '+' | '-' | '.'))
        && !rest.is_empty()
        && !value.chars().any(char::is_whitespace)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ION;
    use serde_json::json;

    fn key_entry(id: &str) -> Value {
        json!({
            "id": id,
            "type": "EcdsaSecp256k1VerificationKey2019",
            "publicKeyJwk": {
                "kty": "EC",
                "crv": "secp256k1",
                "x": "aN75CTjy3VCgGAJDNJHbcb55hO8CobEKzgCNrUeOwAY",
                "y": "K9FhCEpa_jG09pB6qriXrgSvKzXm6xtxBvZzIoXXWm4"
            },
            "purposes": ["authentication"]
        })
    }

    fn service_entry(id: &str) -> Value {
        json!({ "id": id, "type": "LinkedDomains", "serviceEndpoint": "https://example.com" })
    }

    fn parse(value: Value) -> Result<DIDStatePatch, PatchError> {
        DIDStatePatch::from_value::<ION>(&value)
    }

    fn apply(document: &DidDocument, patches: Vec<Value>) -> Result<DidDocument, PatchError> {
        let patches: Vec<_> = patches.into_iter().map(|p| parse(p).unwrap()).collect();
        apply_patches(document, &patches)
    }

    #[test]
    fn add_then_remove_keys() {
        let doc = apply(
            &DidDocument::default(),
            vec![json!({ "action": "add-public-keys", "publicKeys": [key_entry("key1"), key_entry("key2")] })],
        )
        .unwrap();
        assert_eq!(doc.public_keys.len(), 2);

        let doc = apply(
            &doc,
            vec![json!({ "action": "remove-public-keys", "ids": ["key1", "missing"] })],
        )
        .unwrap();
        assert!(doc.public_keys.contains_key("key2"));
        assert!(!doc.public_keys.contains_key("key1"));
    }

    #[test]
    fn add_existing_key_rejected() {
        let doc = apply(
            &DidDocument::default(),
            vec![json!({ "action": "add-public-keys", "publicKeys": [key_entry("key1")] })],
        )
        .unwrap();
        let err = apply(
            &doc,
            vec![json!({ "action": "add-public-keys", "publicKeys": [key_entry("key1")] })],
        )
        .unwrap_err();
        assert_eq!(
            err,
            PatchError::AlreadyExists {
                id: "key1".to_string()
            }
        );
        // The original snapshot is untouched.
        assert_eq!(doc.public_keys.len(), 1);
    }

    #[test]
    fn later_patches_see_earlier_ones() {
        let doc = apply(
            &DidDocument::default(),
            vec![
                json!({ "action": "add-services", "services": [service_entry("s1")] }),
                json!({ "action": "remove-services", "ids": ["s1"] }),
                json!({ "action": "add-services", "services": [service_entry("s1")] }),
            ],
        )
        .unwrap();
        assert_eq!(doc.services.len(), 1);
    }

    #[test]
    fn replace_discards_existing_content() {
        let doc = apply(
            &DidDocument::default(),
            vec![
                json!({ "action": "add-public-keys", "publicKeys": [key_entry("old")] }),
                json!({ "action": "add-services", "services": [service_entry("oldService")] }),
            ],
        )
        .unwrap();
        let doc = apply(
            &doc,
            vec![json!({ "action": "replace", "document": { "publicKeys": [key_entry("new")] } })],
        )
        .unwrap();
        assert_eq!(doc.public_keys.keys().collect::<Vec<_>>(), vec!["new"]);
        assert!(doc.services.is_empty());
    }

    #[test]
    fn unknown_action_rejected() {
        assert_eq!(
            parse(json!({ "action": "ietf-json-patch", "patches": [] })),
            Err(PatchError::UnknownAction("ietf-json-patch".to_string()))
        );
        assert_eq!(parse(json!({ "ids": [] })), Err(PatchError::MissingAction));
        assert_eq!(parse(json!("replace")), Err(PatchError::NotAnObject));
    }

    #[test]
    fn unknown_properties_rejected() {
        let mut entry = key_entry("key1");
        entry["extra"] = json!(true);
        assert_eq!(
            parse(json!({ "action": "add-public-keys", "publicKeys": [entry] })),
            Err(PatchError::UnknownProperty("extra".to_string()))
        );
        assert_eq!(
            parse(json!({ "action": "remove-services", "ids": [], "services": [] })),
            Err(PatchError::UnknownProperty("services".to_string()))
        );
    }

    #[test]
    fn invalid_ids_rejected() {
        assert_eq!(
            parse(json!({ "action": "remove-public-keys", "ids": ["has space"] })),
            Err(PatchError::InvalidId("has space".to_string()))
        );
        let long = "a".repeat(ION::MAX_ID_LENGTH + 1);
        assert!(matches!(
            parse(json!({ "action": "remove-services", "ids": [long] })),
            Err(PatchError::IdTooLong { .. })
        ));
        assert_eq!(
            parse(json!({ "action": "add-services", "services": [service_entry("s"), service_entry("s")] })),
            Err(PatchError::DuplicateId("s".to_string()))
        );
    }

    #[test]
    fn private_key_rejected() {
        let mut entry = key_entry("key1");
        entry["publicKeyJwk"]["d"] = json!("secret");
        assert!(matches!(
            parse(json!({ "action": "add-public-keys", "publicKeys": [entry] })),
            Err(PatchError::InvalidPublicKey { .. })
        ));
    }

    #[test]
    fn duplicate_purpose_rejected() {
        let mut entry = key_entry("key1");
        entry["purposes"] = json!(["authentication", "authentication"]);
        assert_eq!(
            parse(json!({ "action": "add-public-keys", "publicKeys": [entry] })),
            Err(PatchError::DuplicatePurpose("key1".to_string()))
        );
    }

    #[test]
    fn service_endpoint_checked() {
        let mut entry = service_entry("s1");
        entry["serviceEndpoint"] = json!("not a uri");
        assert!(matches!(
            parse(json!({ "action": "add-services", "services": [entry] })),
            Err(PatchError::InvalidService { .. })
        ));
        let mut entry = service_entry("s1");
        entry["serviceEndpoint"] = json!({ "origins": ["https://example.com"] });
        parse(json!({ "action": "add-services", "services": [entry] })).unwrap();
        let mut entry = service_entry("s1");
        entry["type"] = json!("t".repeat(ION::MAX_SERVICE_TYPE_LENGTH + 1));
        assert!(matches!(
            parse(json!({ "action": "add-services", "services": [entry] })),
            Err(PatchError::InvalidService { .. })
        ));
    }

    #[test]
    fn round_trips_losslessly() {
        let value = json!({ "action": "add-public-keys", "publicKeys": [key_entry("key1")] });
        let patch = parse(value.clone()).unwrap();
        assert_eq!(serde_json::to_value(&patch).unwrap(), value);
    }
}
