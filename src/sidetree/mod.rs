use base64::Engine;
use serde::{Deserialize, Serialize};
use ssi_jwk::{Algorithm, JWK};

mod builder;
pub mod commitment;
mod did;
mod document;
pub mod jws;
mod operation;
pub mod patch;
mod resolver;

#[cfg(test)]
pub(crate) mod test_utils;

pub use builder::*;
pub use did::*;
pub use document::*;
pub use jws::{SignError, Signer};
pub use operation::*;
pub use patch::{
    apply_patches, DIDStatePatch, DocumentState, KeyPurpose, PatchError, PublicKey,
    PublicKeyEntry, ServiceEndpoint, ServiceEndpointEntry,
};
pub use resolver::*;

const MULTIHASH_SHA2_256_PREFIX: &[u8] = &[0x12];
const MULTIHASH_SHA2_256_SIZE: &[u8] = &[0x20];

/// Parameters of a Sidetree-based DID method
///
/// This trait consists of the subset of parameters defined in [Sidetree §5. Default
/// Parameters][default-params] that are needed to parse, verify and resolve Sidetree
/// operations. Implementers are zero-sized marker types (see [`crate::ION`]); every parsing and
/// resolution entry point of this crate is generic over it.
///
/// Hashing and signature verification are the two primitives the operation layer consumes.
/// Both have default implementations (SHA-256, and JWS verification through `ssi-jws`) and may
/// be overridden.
///
/// [default-params]: https://identity.foundation/sidetree/spec/v1.0.0/#default-parameters
pub trait Sidetree {
    /// [`HASH_PROTOCOL`](https://identity.foundation/sidetree/spec/v1.0.0/#hash-protocol)
    ///
    /// Default implementation calls [hash_protocol_algorithm] and returns the concatenation of the
    /// prefix and hash.
    ///
    /// [hash_protocol_algorithm]: Self::hash_protocol_algorithm
    fn hash_protocol(data: &[u8]) -> Vec<u8> {
        let (prefix, hash) = Self::hash_protocol_algorithm(data);
        [prefix, hash].concat()
    }

    /// [`HASH_ALGORITHM`](https://identity.foundation/sidetree/spec/v1.0.0/#hash-algorithm)
    ///
    /// Default implementation calls [hash_protocol_algorithm] and returns the hash, discarding the
    /// prefix.
    ///
    /// [hash_protocol_algorithm]: Self::hash_protocol_algorithm
    fn hash_algorithm(data: &[u8]) -> Vec<u8> {
        let (_prefix, hash) = Self::hash_protocol_algorithm(data);
        hash
    }

    /// Combination of [hash_protocol] and [hash_algorithm]
    ///
    /// Returns multihash prefix and hash.
    ///
    /// Default implementation: SHA-256 (`sha2-256`)
    ///
    /// Implementers overriding the hash function should override this function together with
    /// [hash_prefix], so that encoded hashes can be recognized when decoding.
    ///
    /// [hash_protocol]: Self::hash_protocol
    /// [hash_algorithm]: Self::hash_algorithm
    /// [hash_prefix]: Self::hash_prefix
    fn hash_protocol_algorithm(data: &[u8]) -> (Vec<u8>, Vec<u8>) {
        use sha2::{Digest, Sha256};
        let mut hasher = Sha256::new();
        hasher.update(data);
        let hash = hasher.finalize().to_vec();
        (Self::hash_prefix(), hash)
    }

    /// Multihash prefix (algorithm code and digest size) of [hash_protocol] output
    ///
    /// [hash_protocol]: Self::hash_protocol
    fn hash_prefix() -> Vec<u8> {
        [MULTIHASH_SHA2_256_PREFIX, MULTIHASH_SHA2_256_SIZE].concat()
    }

    /// [`DATA_ENCODING_SCHEME`](https://identity.foundation/sidetree/spec/v1.0.0/#data-encoding-scheme)
    fn data_encoding_scheme(data: &[u8]) -> String {
        base64::prelude::BASE64_URL_SAFE_NO_PAD.encode(data)
    }

    /// Inverse of [data_encoding_scheme](Self::data_encoding_scheme)
    fn data_decoding_scheme(data: &str) -> Result<Vec<u8>, base64::DecodeError> {
        base64::prelude::BASE64_URL_SAFE_NO_PAD.decode(data)
    }

    /// Ensure that a public key is valid for this Sidetree DID Method
    ///
    /// Check that the key uses this Sidetree DID method's [KEY_ALGORITHM][ka].
    ///
    /// [ka]: https://identity.foundation/sidetree/spec/v1.0.0/#key-algorithm
    fn validate_key(key: &JWK) -> bool;

    /// [`SIGNATURE_ALGORITHM`](https://identity.foundation/sidetree/spec/v1.0.0/#sig-algorithm) (JWS alg)
    const SIGNATURE_ALGORITHM: Algorithm;

    /// Verify a JWS signature over `signing_input` with the given public key.
    fn verify_signature(
        algorithm: Algorithm,
        signing_input: &[u8],
        signature: &[u8],
        key: &JWK,
    ) -> Result<(), ssi_jws::Error> {
        ssi_jws::verify_bytes(algorithm, signing_input, key, signature)
    }

    /// [`REVEAL_VALUE`](https://identity.foundation/sidetree/spec/v1.0.0/#reveal-value)
    fn reveal_value(commitment_value: &[u8]) -> String {
        // Sidetree §6.2.1: REVEAL_VALUE is the HASH_PROTOCOL of the canonicalized public key.
        // https://identity.foundation/sidetree/spec/v1.0.0/#public-key-commitment-scheme
        let hash = Self::hash_protocol(commitment_value);
        Self::data_encoding_scheme(&hash)
    }

    /// [`MAX_OPERATION_HASH_LENGTH`](https://identity.foundation/sidetree/spec/v1.0.0/#max-operation-hash-length)
    ///
    /// Applies to every encoded hash: DID suffixes, delta hashes, commitments and reveal values.
    const MAX_OPERATION_HASH_LENGTH: usize = 100;

    /// Maximum size in bytes of a raw operation request
    const MAX_OPERATION_SIZE: usize = 2500;

    /// [`MAX_DELTA_SIZE`](https://identity.foundation/sidetree/spec/v1.0.0/#max-delta-size),
    /// measured on the canonicalized delta object
    const MAX_DELTA_SIZE: usize = 1000;

    /// Maximum number of patches in a single delta object
    const MAX_PATCHES_PER_DELTA: usize = 100;

    /// Maximum length of the compact JWS in `signedData`
    const MAX_SIGNED_DATA_LENGTH: usize = 1000;

    /// Maximum length of public key and service ids
    ///
    /// Reference: [Sidetree §12.1.1 `add-public-keys`](https://identity.foundation/sidetree/spec/v1.0.0/#add-public-keys)
    const MAX_ID_LENGTH: usize = 50;

    /// Maximum length of service `type` property
    ///
    /// Reference: [Sidetree §12.1.3 `add-services`](https://identity.foundation/sidetree/spec/v1.0.0/#add-services)
    const MAX_SERVICE_TYPE_LENGTH: usize = 30;

    /// Maximum length of a service endpoint, as a URI string or serialized object
    const MAX_SERVICE_ENDPOINT_LENGTH: usize = 1000;

    /// Method name for Sidetree-based DID
    ///
    /// Mentioned in [Sidetree §9. DID URI Composition](https://identity.foundation/sidetree/spec/v1.0.0/#did-uri-composition)
    const METHOD: &'static str;

    /// Network instance
    ///
    /// Additional segment after the method-id (METHOD), as a prefix for the method-specific-id
    /// (DID Suffix), identifiying a network instance. e.g. "testnet"
    ///
    /// Mentioned in [Note 1](https://identity.foundation/sidetree/spec/v1.0.0/#note-1)
    const NETWORK: Option<&'static str> = None;

    /// Maximum length of `controller` property
    ///
    /// Reference: [Sidetree §12.1.1 `add-public-keys`](https://identity.foundation/sidetree/spec/v1.0.0/#add-public-keys)
    const MAX_CONTROLLER_LENGTH: Option<usize> = None;

    /// Maximum length of `publicKeyMultibase` property
    ///
    /// Reference: [Sidetree §12.1.1 `add-public-keys`](https://identity.foundation/sidetree/spec/v1.0.0/#add-public-keys)
    const MAX_PKMB_LENGTH: Option<usize> = None;

    /// Hash and encode data
    ///
    /// [Sidetree §6.1 Hashing Process](https://identity.foundation/sidetree/spec/#hashing-process)
    fn hash(data: &[u8]) -> String {
        let hash = Self::hash_protocol(data);
        Self::data_encoding_scheme(&hash)
    }

    /// Decode an encoded multihash produced by [hash](Self::hash), returning the bare digest.
    ///
    /// The length limit is checked before anything is decoded.
    fn decode_hash(encoded: &str) -> Result<Vec<u8>, InvalidHash> {
        if encoded.len() > Self::MAX_OPERATION_HASH_LENGTH {
            return Err(InvalidHash::TooLong {
                length: encoded.len(),
                max: Self::MAX_OPERATION_HASH_LENGTH,
            });
        }
        let bytes = Self::data_decoding_scheme(encoded).map_err(|_| InvalidHash::Base64)?;
        let prefix = Self::hash_prefix();
        let expected_len = Self::hash_protocol(&[]).len();
        if bytes.len() != expected_len {
            return Err(InvalidHash::Length(bytes.len()));
        }
        if !bytes.starts_with(&prefix) {
            return Err(InvalidHash::Prefix);
        }
        Ok(bytes[prefix.len()..].to_vec())
    }

    /// Serialize and hash [Suffix Data][SuffixData], to generate a [Short-Form Sidetree
    /// DID][SidetreeDID::Short] ([`DIDSuffix`]).
    ///
    /// Reference: <https://identity.foundation/sidetree/spec/v1.0.0/#did-uri-composition>
    fn serialize_suffix_data(suffix_data: &SuffixData) -> Result<DIDSuffix, serde_json::Error> {
        let string = json_canonicalization_scheme(suffix_data)?;
        let hash = Self::hash(string.as_bytes());
        Ok(DIDSuffix(hash))
    }

    /// Check that a DID Suffix looks valid
    fn validate_did_suffix(suffix: &DIDSuffix) -> Result<(), InvalidHash> {
        Self::decode_hash(&suffix.0).map(|_| ())
    }
}

/// [`JSON_CANONICALIZATION_SCHEME`](https://identity.foundation/sidetree/spec/v1.0.0/#json-canonicalization-scheme)
pub fn json_canonicalization_scheme<T: Serialize + ?Sized>(
    value: &T,
) -> Result<String, serde_json::Error> {
    serde_jcs::to_string(value)
}

/// Error decoding an encoded multihash
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum InvalidHash {
    #[error("encoded hash too long ({length} > {max})")]
    TooLong { length: usize, max: usize },

    #[error("invalid base64")]
    Base64,

    #[error("unexpected hash length ({0})")]
    Length(usize),

    #[error("unexpected hash algorithm prefix")]
    Prefix,
}

/// Public Key JWK (JSON Web Key)
///
/// Wraps [ssi_jwk::JWK] as the JSON object it was published as, while allowing a `nonce`
/// property, and disallowing private key properties ("d"). Commitments and reveal values are
/// computed over this exact object.
///
/// Sidetree may allow a `nonce` property in public key JWKs ([§6.2.2 JWK Nonce][jwkn]).
///
/// [jwkn]: https://identity.foundation/sidetree/spec/#jwk-nonce
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct PublicKeyJwk {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub nonce: Option<String>,
    #[serde(flatten)]
    jwk: serde_json::Value,
}

/// Error resulting from [converting a JSON value to PublicKeyJwk][PublicKeyJwk::try_from]
#[derive(thiserror::Error, Debug, Clone, PartialEq, Eq)]
pub enum PublicKeyJwkFromValueError {
    /// Public Key JWK must be a JSON object
    #[error("Public Key JWK must be an object")]
    NotAnObject,

    /// Public Key JWK must not contain private key parameters (e.g. "d")
    #[error("Public Key JWK must not contain private key parameters")]
    PrivateKeyParameters,

    /// `nonce` must be a string
    #[error("Public Key JWK nonce must be a string")]
    InvalidNonce,
}

impl TryFrom<serde_json::Value> for PublicKeyJwk {
    type Error = PublicKeyJwkFromValueError;

    fn try_from(value: serde_json::Value) -> Result<Self, Self::Error> {
        let serde_json::Value::Object(mut object) = value else {
            return Err(PublicKeyJwkFromValueError::NotAnObject);
        };
        if object.contains_key("d") {
            return Err(PublicKeyJwkFromValueError::PrivateKeyParameters);
        }
        let nonce = match object.remove("nonce") {
            None => None,
            Some(serde_json::Value::String(nonce)) => Some(nonce),
            Some(_) => return Err(PublicKeyJwkFromValueError::InvalidNonce),
        };
        Ok(Self {
            nonce,
            jwk: serde_json::Value::Object(object),
        })
    }
}

impl PublicKeyJwk {
    /// Whether the JWK carries private key material.
    pub fn is_private(&self) -> bool {
        self.jwk.get("d").is_some()
    }
}

/// Error resulting from attempting to convert [PublicKeyJwk] to JWK
#[derive(thiserror::Error, Debug)]
pub enum JWKFromPublicKeyJwkError {
    /// Unable to convert [`serde_json::Value`] to JWK
    #[error("Unable to convert Value to JWK")]
    FromValue(#[from] serde_json::Error),
}

impl TryFrom<JWK> for PublicKeyJwk {
    type Error = PublicKeyJwkFromValueError;

    fn try_from(jwk: JWK) -> Result<Self, Self::Error> {
        let value =
            serde_json::to_value(jwk).map_err(|_| PublicKeyJwkFromValueError::NotAnObject)?;
        Self::try_from(value)
    }
}

/// Convert [PublicKeyJwk] to [JWK].
///
/// Note: `nonce` property is dropped.
impl TryFrom<PublicKeyJwk> for JWK {
    type Error = JWKFromPublicKeyJwkError;

    fn try_from(pkjwk: PublicKeyJwk) -> Result<Self, Self::Error> {
        Ok(serde_json::from_value(pkjwk.jwk)?)
    }
}
