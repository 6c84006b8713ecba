use ssi_jwk::{Algorithm, ECParams, Params, JWK};

use super::{PublicKeyJwk, SignError, Signer};

/// Deterministic secp256k1 signer for tests.
pub struct TestSigner {
    key: JWK,
}

impl TestSigner {
    pub fn from_seed(seed: u8) -> Self {
        let secret = k256::SecretKey::from_slice(&[seed; 32]).expect("valid secp256k1 scalar");
        Self {
            key: JWK::from(Params::EC(ECParams::from(&secret))),
        }
    }
}

impl Signer for TestSigner {
    fn public_key(&self) -> PublicKeyJwk {
        PublicKeyJwk::try_from(self.key.to_public()).expect("public JWK")
    }

    fn sign(&self, algorithm: Algorithm, signing_input: &[u8]) -> Result<Vec<u8>, SignError> {
        Ok(ssi_jws::sign_bytes(algorithm, signing_input, &self.key)?)
    }
}
