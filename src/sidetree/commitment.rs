//! [Public Key Commitment Scheme (Sidetree §6.2.1)][pkcs]
//!
//! A commitment is the double hash of a canonicalized public key. The operation that later
//! uses the key publishes the single hash of it as its reveal value; hashing the reveal value's
//! digest once more must give back the commitment, byte for byte.
//!
//! [pkcs]: https://identity.foundation/sidetree/spec/v1.0.0/#public-key-commitment-scheme
use super::{json_canonicalization_scheme, InvalidHash, PublicKeyJwk, Sidetree};

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum CommitmentError {
    #[error("reveal value exceeds maximum size ({size} > {max})")]
    ExceedsMaxSize { size: usize, max: usize },

    #[error("reveal value is not valid base64url")]
    InvalidEncoding,

    #[error("reveal value does not use the expected hash algorithm")]
    UnsupportedHashAlgorithm,

    #[error("reveal value does not match commitment")]
    Mismatch,
}

impl From<InvalidHash> for CommitmentError {
    fn from(value: InvalidHash) -> Self {
        match value {
            InvalidHash::TooLong { length, max } => Self::ExceedsMaxSize { size: length, max },
            InvalidHash::Base64 => Self::InvalidEncoding,
            InvalidHash::Length(_) | InvalidHash::Prefix => Self::UnsupportedHashAlgorithm,
        }
    }
}

/// Compute the commitment value for a public key.
pub fn commit<S: Sidetree>(public_key: &PublicKeyJwk) -> Result<String, serde_json::Error> {
    let canonicalized_public_key = json_canonicalization_scheme(public_key)?;
    // Note: hash_algorithm called here instead of reveal_value, since the underlying hash is
    // used, not the encoded/prefixed one.
    let reveal_digest = S::hash_algorithm(canonicalized_public_key.as_bytes());
    Ok(S::hash(&reveal_digest))
}

/// Compute the reveal value an operation publishes for a public key.
pub fn reveal_value<S: Sidetree>(public_key: &PublicKeyJwk) -> Result<String, serde_json::Error> {
    let canonicalized_public_key = json_canonicalization_scheme(public_key)?;
    Ok(S::reveal_value(canonicalized_public_key.as_bytes()))
}

/// Compute the commitment a reveal value satisfies.
///
/// Oversized reveal values are rejected before any hashing takes place.
pub fn reveal<S: Sidetree>(reveal_value: &str) -> Result<String, CommitmentError> {
    let digest = S::decode_hash(reveal_value)?;
    Ok(S::hash(&digest))
}

/// Check a reveal value against a previously published commitment.
pub fn verify_reveal<S: Sidetree>(reveal_value: &str, commitment: &str) -> Result<(), CommitmentError> {
    let computed = reveal::<S>(reveal_value)?;
    if computed.as_bytes() != commitment.as_bytes() {
        return Err(CommitmentError::Mismatch);
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::sidetree::test_utils::TestSigner;
    use crate::sidetree::Signer;
    use crate::ION;

    #[test]
    fn reveal_matches_commitment() {
        let key = TestSigner::from_seed(7).public_key();
        let commitment = commit::<ION>(&key).unwrap();
        let reveal = reveal_value::<ION>(&key).unwrap();
        assert_ne!(commitment, reveal);
        verify_reveal::<ION>(&reveal, &commitment).unwrap();
    }

    #[test]
    fn other_key_does_not_match() {
        let key = TestSigner::from_seed(7).public_key();
        let other = TestSigner::from_seed(8).public_key();
        let commitment = commit::<ION>(&key).unwrap();
        let reveal = reveal_value::<ION>(&other).unwrap();
        assert_eq!(
            verify_reveal::<ION>(&reveal, &commitment),
            Err(CommitmentError::Mismatch)
        );
    }

    #[test]
    fn commitment_is_not_its_own_reveal_value() {
        let key = TestSigner::from_seed(7).public_key();
        let commitment = commit::<ION>(&key).unwrap();
        assert_eq!(
            verify_reveal::<ION>(&commitment, &commitment),
            Err(CommitmentError::Mismatch)
        );
    }

    #[test]
    fn oversized_reveal_value_rejected() {
        let oversized = "E".repeat(ION::MAX_OPERATION_HASH_LENGTH + 1);
        assert_eq!(
            reveal::<ION>(&oversized),
            Err(CommitmentError::ExceedsMaxSize {
                size: ION::MAX_OPERATION_HASH_LENGTH + 1,
                max: ION::MAX_OPERATION_HASH_LENGTH
            })
        );
    }

    #[test]
    fn malformed_reveal_value_rejected() {
        assert_eq!(
            reveal::<ION>("not base64!"),
            Err(CommitmentError::InvalidEncoding)
        );
        // right length, wrong multihash prefix
        let bare = ION::data_encoding_scheme(&[0u8; 34]);
        assert_eq!(
            reveal::<ION>(&bare),
            Err(CommitmentError::UnsupportedHashAlgorithm)
        );
    }
}
