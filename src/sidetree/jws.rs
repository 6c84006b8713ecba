//! Compact JWS (RFC 7515) as used in the `signedData` property of Sidetree operations.
//!
//! Decoding and verification go through `ssi-jws`. Signing goes through an external
//! [`Signer`], so that private keys stay with the caller.
use serde::{de::DeserializeOwned, Serialize};
use ssi_jwk::{Algorithm, JWK};

use super::{JWKFromPublicKeyJwkError, PublicKeyJwk, Sidetree};

/// Error producing a signature
#[derive(Debug, thiserror::Error)]
pub enum SignError {
    #[error("unable to serialize JWS: {0}")]
    Serialize(#[from] serde_json::Error),

    #[error(transparent)]
    Jws(#[from] ssi_jws::Error),

    #[error("signer failed: {0}")]
    Signer(String),
}

/// Signing capability held by the caller.
///
/// The crate never generates or stores private keys; building an operation that needs a
/// signature goes through this trait.
pub trait Signer {
    /// Public key matching the signing key.
    fn public_key(&self) -> PublicKeyJwk;

    /// Sign `signing_input` with `algorithm`, returning the raw JWS signature bytes.
    fn sign(&self, algorithm: Algorithm, signing_input: &[u8]) -> Result<Vec<u8>, SignError>;
}

/// Sign claims into a compact JWS using the method's signature algorithm.
pub fn encode_sign<S: Sidetree, Claims: Serialize>(
    claims: &Claims,
    signer: &impl Signer,
) -> Result<String, SignError> {
    let header = ssi_jws::Header {
        algorithm: S::SIGNATURE_ALGORITHM,
        ..Default::default()
    };
    let header_b64 = S::data_encoding_scheme(&serde_json::to_vec(&header)?);
    let payload_b64 = S::data_encoding_scheme(&serde_json::to_vec(claims)?);
    let signing_input = format!("{header_b64}.{payload_b64}");
    let signature = signer.sign(S::SIGNATURE_ALGORITHM, signing_input.as_bytes())?;
    Ok(format!(
        "{signing_input}.{}",
        S::data_encoding_scheme(&signature)
    ))
}

/// An error resulting from [jws_decode_verify_inner]
#[derive(thiserror::Error, Debug)]
pub enum JWSDecodeVerifyError {
    /// Unable to split JWS
    #[error("Unable to split JWS")]
    SplitJWS(#[source] ssi_jws::Error),

    /// Unable to decode JWS parts
    #[error("Unable to decode JWS parts")]
    DecodeJWSParts(#[source] ssi_jws::Error),

    /// Deserialize JWS payload
    #[error("Deserialize JWS payload")]
    DeserializeJWSPayload(#[source] serde_json::Error),

    /// JWS header names another algorithm than the method's
    #[error("Unexpected JWS algorithm {0:?}")]
    UnexpectedAlgorithm(Algorithm),

    /// Unable to convert PublicKeyJwk to JWK
    #[error("Unable to convert PublicKeyJwk to JWK")]
    JWKFromPublicKeyJwk(#[source] JWKFromPublicKeyJwkError),

    /// Key in the payload is not acceptable to the method
    #[error("Key not valid for this method")]
    InvalidKey,

    /// Unable to verify JWS
    #[error("Unable to verify JWS")]
    VerifyJWS(#[source] ssi_jws::Error),
}

/// Decode and verify JWS with public key inside payload
///
/// The deserialized claims are passed to `get_key`, and the signature is verified against the
/// public key it returns. The header must name [`Sidetree::SIGNATURE_ALGORITHM`] and the key
/// must pass [`Sidetree::validate_key`].
pub fn jws_decode_verify_inner<S: Sidetree, Claims: DeserializeOwned>(
    jws: &str,
    get_key: impl FnOnce(&Claims) -> &PublicKeyJwk,
) -> Result<Claims, JWSDecodeVerifyError> {
    use ssi_jws::{decode_jws_parts, split_jws, DecodedJws, DecodedSigningBytes};
    let (header_b64, payload_enc, signature_b64) =
        split_jws(jws).map_err(JWSDecodeVerifyError::SplitJWS)?;
    let DecodedJws {
        signing_bytes:
            DecodedSigningBytes {
                bytes: signing_bytes,
                header,
                payload,
            },
        signature,
    } = decode_jws_parts(header_b64, payload_enc.as_bytes(), signature_b64)
        .map_err(JWSDecodeVerifyError::DecodeJWSParts)?;
    if header.algorithm != S::SIGNATURE_ALGORITHM {
        return Err(JWSDecodeVerifyError::UnexpectedAlgorithm(header.algorithm));
    }
    let claims: Claims =
        serde_json::from_slice(&payload).map_err(JWSDecodeVerifyError::DeserializeJWSPayload)?;
    let pk = JWK::try_from(get_key(&claims).clone())
        .map_err(JWSDecodeVerifyError::JWKFromPublicKeyJwk)?;
    if !S::validate_key(&pk) {
        return Err(JWSDecodeVerifyError::InvalidKey);
    }
    S::verify_signature(header.algorithm, &signing_bytes, &signature, &pk)
        .map_err(JWSDecodeVerifyError::VerifyJWS)?;
    Ok(claims)
}
