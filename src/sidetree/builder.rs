//! Construction of operation requests from caller-held keys.
//!
//! Nothing here generates or stores key material: public keys are passed in, and signatures are
//! produced by the caller's [`Signer`].
use super::{
    commitment, jws, CreateOperation, DIDStatePatch, DIDSuffix, DeactivateClaims,
    DeactivateOperation, Delta, Operation, PublicKeyJwk, RecoverOperation, RecoveryClaims,
    Sidetree, Signer, SuffixData, UpdateClaims, UpdateOperation,
};
use ssi_jwk::JWK;

#[derive(Debug, thiserror::Error)]
pub enum CreateError {
    #[error("same update and recovery keys")]
    SameUpdateAndRecoveryKeys,

    #[error("invalid update key")]
    InvalidUpdateKey,

    #[error("invalid recovery key")]
    InvalidRecoveryKey,

    #[error(transparent)]
    Serialization(#[from] serde_json::Error),
}

#[derive(Debug, thiserror::Error)]
pub enum UpdateError {
    #[error("invalid update key")]
    InvalidUpdateKey,

    #[error("update key unchanged")]
    UpdateKeyUnchanged,

    #[error("signature failed: {0}")]
    SignatureFailed(#[from] jws::SignError),

    #[error(transparent)]
    Serialization(#[from] serde_json::Error),
}

#[derive(Debug, thiserror::Error)]
pub enum RecoverError {
    #[error("invalid recovery key")]
    InvalidRecoveryKey,

    #[error("recovery key unchanged")]
    RecoveryKeyUnchanged,

    #[error("signature failed: {0}")]
    SignatureFailed(#[from] jws::SignError),

    #[error(transparent)]
    Serialization(#[from] serde_json::Error),
}

#[derive(Debug, thiserror::Error)]
pub enum DeactivateError {
    #[error("invalid recovery key")]
    InvalidRecoveryKey,

    #[error("signature failed: {0}")]
    SignatureFailed(#[from] jws::SignError),

    #[error(transparent)]
    Serialization(#[from] serde_json::Error),
}

/// Convert a public key to [JWK] and check it with [`Sidetree::validate_key`].
fn valid_key<S: Sidetree>(pk: &PublicKeyJwk) -> bool {
    JWK::try_from(pk.clone()).map_or(false, |jwk| S::validate_key(&jwk))
}

/// Create a Sidetree-based DID using existing keys
///
/// Construct a [Create Operation][create] whose update and recovery commitments are derived
/// from the given public keys.
///
/// [create]: https://identity.foundation/sidetree/spec/v1.0.0/#create
pub fn create_existing<S: Sidetree>(
    update_pk: &PublicKeyJwk,
    recovery_pk: &PublicKeyJwk,
    patches: Vec<DIDStatePatch>,
) -> Result<Operation, CreateError> {
    if update_pk == recovery_pk {
        return Err(CreateError::SameUpdateAndRecoveryKeys);
    }
    if !valid_key::<S>(update_pk) {
        return Err(CreateError::InvalidUpdateKey);
    }
    if !valid_key::<S>(recovery_pk) {
        return Err(CreateError::InvalidRecoveryKey);
    }

    let create_operation_delta_object = Delta {
        patches,
        update_commitment: commitment::commit::<S>(update_pk)?,
    };
    let delta_hash = create_operation_delta_object.hash::<S>()?;

    let create_operation_suffix_data_object = SuffixData {
        r#type: None,
        delta_hash,
        recovery_commitment: commitment::commit::<S>(recovery_pk)?,
        anchor_origin: None,
    };

    Ok(Operation::Create(CreateOperation {
        suffix_data: create_operation_suffix_data_object,
        delta: create_operation_delta_object,
    }))
}

/// Update a Sidetree-based DID
///
/// Construct an [Update Operation][update], signed with the current update key through
/// `update_signer`. `new_update_pk` is committed to for the next update.
///
/// [update]: https://identity.foundation/sidetree/spec/v1.0.0/#update
pub fn update<S: Sidetree>(
    did_suffix: DIDSuffix,
    update_signer: &impl Signer,
    new_update_pk: &PublicKeyJwk,
    patches: Vec<DIDStatePatch>,
) -> Result<Operation, UpdateError> {
    let update_pk = update_signer.public_key();
    if !valid_key::<S>(&update_pk) || !valid_key::<S>(new_update_pk) {
        return Err(UpdateError::InvalidUpdateKey);
    }
    if new_update_pk == &update_pk {
        return Err(UpdateError::UpdateKeyUnchanged);
    }

    let update_operation_delta_object = Delta {
        patches,
        update_commitment: commitment::commit::<S>(new_update_pk)?,
    };
    let claims = UpdateClaims {
        delta_hash: update_operation_delta_object.hash::<S>()?,
        update_key: update_pk,
    };
    let signed_data = jws::encode_sign::<S, _>(&claims, update_signer)?;

    Ok(Operation::Update(UpdateOperation {
        did_suffix,
        reveal_value: commitment::reveal_value::<S>(&claims.update_key)?,
        delta: update_operation_delta_object,
        signed_data,
    }))
}

/// Recover a Sidetree-based DID using existing keys
///
/// Construct a [Recover Operation][recover] signed with the current recovery key through
/// `recovery_signer`. The new update and recovery public keys are committed to.
///
/// [recover]: https://identity.foundation/sidetree/spec/v1.0.0/#recover
pub fn recover_existing<S: Sidetree>(
    did_suffix: DIDSuffix,
    recovery_signer: &impl Signer,
    new_update_pk: &PublicKeyJwk,
    new_recovery_pk: &PublicKeyJwk,
    patches: Vec<DIDStatePatch>,
) -> Result<Operation, RecoverError> {
    let recovery_pk = recovery_signer.public_key();
    if !valid_key::<S>(&recovery_pk) || !valid_key::<S>(new_recovery_pk) {
        return Err(RecoverError::InvalidRecoveryKey);
    }
    if new_recovery_pk == &recovery_pk {
        return Err(RecoverError::RecoveryKeyUnchanged);
    }

    let recover_operation_delta_object = Delta {
        patches,
        update_commitment: commitment::commit::<S>(new_update_pk)?,
    };
    let claims = RecoveryClaims {
        recovery_commitment: commitment::commit::<S>(new_recovery_pk)?,
        delta_hash: recover_operation_delta_object.hash::<S>()?,
        recovery_key: recovery_pk,
        anchor_origin: None,
    };
    let signed_data = jws::encode_sign::<S, _>(&claims, recovery_signer)?;

    Ok(Operation::Recover(RecoverOperation {
        did_suffix,
        reveal_value: commitment::reveal_value::<S>(&claims.recovery_key)?,
        delta: recover_operation_delta_object,
        signed_data,
    }))
}

/// Deactivate a Sidetree-based DID
///
/// Construct a [Deactivate Operation][deactivate] signed with the current recovery key through
/// `recovery_signer`.
///
/// [deactivate]: https://identity.foundation/sidetree/spec/v1.0.0/#deactivate
pub fn deactivate<S: Sidetree>(
    did_suffix: DIDSuffix,
    recovery_signer: &impl Signer,
) -> Result<Operation, DeactivateError> {
    let recovery_pk = recovery_signer.public_key();
    if !valid_key::<S>(&recovery_pk) {
        return Err(DeactivateError::InvalidRecoveryKey);
    }
    let reveal_value = commitment::reveal_value::<S>(&recovery_pk)?;
    let claims = DeactivateClaims {
        did_suffix: did_suffix.clone(),
        recovery_key: recovery_pk,
    };
    let signed_data = jws::encode_sign::<S, _>(&claims, recovery_signer)?;
    Ok(Operation::Deactivate(DeactivateOperation {
        did_suffix,
        reveal_value,
        signed_data,
    }))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::sidetree::{test_utils::TestSigner, PartiallyVerifiedOperation, SidetreeOperation};
    use crate::ION;

    #[test]
    fn built_operations_verify() {
        let update_signer = TestSigner::from_seed(1);
        let recovery_signer = TestSigner::from_seed(2);
        let create = create_existing::<ION>(
            &update_signer.public_key(),
            &recovery_signer.public_key(),
            vec![],
        )
        .unwrap()
        .partial_verify::<ION>()
        .unwrap();
        let suffix = create.did_suffix().clone();

        let next_update = TestSigner::from_seed(3).public_key();
        let op = update::<ION>(suffix.clone(), &update_signer, &next_update, vec![]).unwrap();
        let PartiallyVerifiedOperation::Update(verified) = op.partial_verify::<ION>().unwrap()
        else {
            panic!("expected update");
        };
        assert_eq!(verified.did_suffix, suffix);
        commitment::verify_reveal::<ION>(
            &verified.reveal_value,
            create.update_commitment().unwrap(),
        )
        .unwrap();

        let op = deactivate::<ION>(suffix, &recovery_signer).unwrap();
        op.partial_verify::<ION>().unwrap();
    }

    #[test]
    fn same_keys_rejected() {
        let key = TestSigner::from_seed(1).public_key();
        assert!(matches!(
            create_existing::<ION>(&key, &key, vec![]),
            Err(CreateError::SameUpdateAndRecoveryKeys)
        ));
    }

    #[test]
    fn unchanged_keys_rejected() {
        let signer = TestSigner::from_seed(1);
        let suffix = DIDSuffix("EiDyOQbbZAa3aiRzeCkV7LOx3SERjjH93EXoIM3UoN4oWg".to_string());
        assert!(matches!(
            update::<ION>(suffix.clone(), &signer, &signer.public_key(), vec![]),
            Err(UpdateError::UpdateKeyUnchanged)
        ));
        let other = TestSigner::from_seed(2).public_key();
        assert!(matches!(
            recover_existing::<ION>(suffix, &signer, &other, &signer.public_key(), vec![]),
            Err(RecoverError::RecoveryKeyUnchanged)
        ));
    }
}
