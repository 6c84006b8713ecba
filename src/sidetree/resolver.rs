use std::collections::BTreeMap;
use std::marker::PhantomData;

use serde::{Deserialize, Serialize};

use super::{
    apply_patches, commitment::verify_reveal, commitment::CommitmentError, parse_operation,
    DIDSuffix, DidDocument, DidState, PartiallyVerifiedOperation, PatchError, Sidetree,
    SidetreeDID, ValidationError,
};

/// Position of an operation in the anchoring system's total order
///
/// Supplied by the external observer. Operations compare by transaction time, then by
/// transaction number within the same time.
#[derive(
    Debug, Clone, Copy, Default, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize,
)]
#[serde(rename_all = "camelCase")]
pub struct AnchorPoint {
    pub transaction_time: u64,
    pub transaction_number: u64,
}

impl AnchorPoint {
    pub fn new(transaction_time: u64, transaction_number: u64) -> Self {
        Self {
            transaction_time,
            transaction_number,
        }
    }
}

/// A parsed operation together with where it was anchored
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AnchoredOperation {
    pub anchor: AnchorPoint,
    pub operation: PartiallyVerifiedOperation,
}

impl AnchoredOperation {
    pub fn new(anchor: AnchorPoint, operation: PartiallyVerifiedOperation) -> Self {
        Self { anchor, operation }
    }
}

/// Resolved state of a DID suffix
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Resolution {
    /// No valid Create operation has been seen.
    Unseen,
    Active(DidState),
    /// Terminal. The state has no keys, services or commitments.
    Deactivated(DidState),
}

impl Resolution {
    pub fn state(&self) -> Option<&DidState> {
        match self {
            Self::Unseen => None,
            Self::Active(state) | Self::Deactivated(state) => Some(state),
        }
    }

    pub fn is_deactivated(&self) -> bool {
        matches!(self, Self::Deactivated(_))
    }
}

/// Reason an operation was not applied during resolution
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum Rejection {
    #[error("operation targets {found}, not {expected}")]
    SuffixMismatch {
        expected: DIDSuffix,
        found: DIDSuffix,
    },

    #[error("DID has not been created")]
    NotCreated,

    #[error("DID already created")]
    AlreadyCreated,

    #[error("DID is deactivated")]
    Deactivated,

    #[error("no commitment to reveal against")]
    MissingCommitment,

    #[error("new commitment repeats the one just revealed")]
    CommitmentReused,

    #[error(transparent)]
    Commitment(#[from] CommitmentError),

    #[error(transparent)]
    Patch(#[from] PatchError),
}

/// Apply one operation to the current resolution of `did_suffix`, producing the next one.
///
/// The current resolution is not modified. A rejected operation leaves it as it was.
pub fn apply_operation<S: Sidetree>(
    did_suffix: &DIDSuffix,
    current: &Resolution,
    operation: &PartiallyVerifiedOperation,
) -> Result<Resolution, Rejection> {
    if operation.did_suffix() != did_suffix {
        return Err(Rejection::SuffixMismatch {
            expected: did_suffix.clone(),
            found: operation.did_suffix().clone(),
        });
    }
    let state = match current {
        Resolution::Deactivated(_) => return Err(Rejection::Deactivated),
        Resolution::Unseen => {
            let PartiallyVerifiedOperation::Create(create) = operation else {
                return Err(Rejection::NotCreated);
            };
            let document = apply_patches(&DidDocument::default(), &create.delta.patches)?;
            return Ok(Resolution::Active(DidState {
                document,
                recovery_commitment: Some(create.recovery_commitment.clone()),
                update_commitment: Some(create.delta.update_commitment.clone()),
                last_operation_hash: create.operation_hash.clone(),
                deactivated: false,
            }));
        }
        Resolution::Active(state) => state,
    };
    match operation {
        PartiallyVerifiedOperation::Create(_) => Err(Rejection::AlreadyCreated),
        PartiallyVerifiedOperation::Update(update) => {
            let update_commitment = state
                .update_commitment
                .as_deref()
                .ok_or(Rejection::MissingCommitment)?;
            verify_reveal::<S>(&update.reveal_value, update_commitment)?;
            if update.delta.update_commitment == update_commitment {
                return Err(Rejection::CommitmentReused);
            }
            let document = apply_patches(&state.document, &update.delta.patches)?;
            Ok(Resolution::Active(DidState {
                document,
                recovery_commitment: state.recovery_commitment.clone(),
                update_commitment: Some(update.delta.update_commitment.clone()),
                last_operation_hash: update.operation_hash.clone(),
                deactivated: false,
            }))
        }
        PartiallyVerifiedOperation::Recover(recover) => {
            let recovery_commitment = state
                .recovery_commitment
                .as_deref()
                .ok_or(Rejection::MissingCommitment)?;
            verify_reveal::<S>(&recover.reveal_value, recovery_commitment)?;
            if recover.recovery_commitment == recovery_commitment
                || recover.delta.update_commitment == recovery_commitment
            {
                return Err(Rejection::CommitmentReused);
            }
            let document = apply_patches(&state.document, &recover.delta.patches)?;
            Ok(Resolution::Active(DidState {
                document,
                recovery_commitment: Some(recover.recovery_commitment.clone()),
                update_commitment: Some(recover.delta.update_commitment.clone()),
                last_operation_hash: recover.operation_hash.clone(),
                deactivated: false,
            }))
        }
        PartiallyVerifiedOperation::Deactivate(deactivate) => {
            let recovery_commitment = state
                .recovery_commitment
                .as_deref()
                .ok_or(Rejection::MissingCommitment)?;
            verify_reveal::<S>(&deactivate.reveal_value, recovery_commitment)?;
            Ok(Resolution::Deactivated(DidState {
                document: DidDocument::default(),
                recovery_commitment: None,
                update_commitment: None,
                last_operation_hash: deactivate.operation_hash.clone(),
                deactivated: true,
            }))
        }
    }
}

#[derive(Debug, thiserror::Error)]
pub enum ResolveDidError {
    #[error("long-form DID data is not valid base64url")]
    InvalidEncoding,

    #[error("long-form DID data is not a JSON object")]
    NotAnObject,

    #[error("invalid long-form create operation: {0}")]
    InvalidCreateOperation(#[from] ValidationError),

    #[error("long-form create operation derives {found}, not {expected}")]
    SuffixMismatch {
        expected: DIDSuffix,
        found: DIDSuffix,
    },
}

/// Operation chain resolver
///
/// Replays the operations of a DID suffix in anchoring order. Ties at the same anchor point
/// are broken by operation hash. Operations that cannot be applied are dropped and logged.
/// Resolution is deterministic: the same set of operations always gives the same state,
/// whatever order they are passed in.
#[derive(Debug, Clone, Copy, Default)]
pub struct SidetreeResolver<S: Sidetree> {
    _marker: PhantomData<S>,
}

impl<S: Sidetree> SidetreeResolver<S> {
    pub fn new() -> Self {
        Self {
            _marker: PhantomData,
        }
    }

    /// Resolve the current state of `did_suffix` from its anchored operations.
    pub fn resolve(
        &self,
        did_suffix: &DIDSuffix,
        operations: impl IntoIterator<Item = AnchoredOperation>,
    ) -> Resolution {
        self.fold(did_suffix, operations, |_| ())
    }

    /// Resolve `did_suffix`, returning every state produced along the way, oldest first.
    ///
    /// The last entry is the current state. Empty if the DID was never created.
    pub fn resolve_with_history(
        &self,
        did_suffix: &DIDSuffix,
        operations: impl IntoIterator<Item = AnchoredOperation>,
    ) -> Vec<DidState> {
        let mut history = Vec::new();
        self.fold(did_suffix, operations, |resolution| {
            if let Some(state) = resolution.state() {
                history.push(state.clone());
            }
        });
        history
    }

    /// Resolve every DID suffix appearing in `operations`.
    ///
    /// Suffixes are independent of each other.
    pub fn resolve_all(
        &self,
        operations: impl IntoIterator<Item = AnchoredOperation>,
    ) -> BTreeMap<DIDSuffix, Resolution> {
        let mut by_suffix: BTreeMap<DIDSuffix, Vec<AnchoredOperation>> = BTreeMap::new();
        for anchored in operations {
            by_suffix
                .entry(anchored.operation.did_suffix().clone())
                .or_default()
                .push(anchored);
        }
        by_suffix
            .into_iter()
            .map(|(did_suffix, operations)| {
                let resolution = self.resolve(&did_suffix, operations);
                (did_suffix, resolution)
            })
            .collect()
    }

    /// Resolve a short or long-form DID.
    ///
    /// For a long-form DID, the embedded create operation is verified against the DID suffix
    /// and used as the chain root when no anchored create operation is present.
    pub fn resolve_did(
        &self,
        did: &SidetreeDID<S>,
        operations: impl IntoIterator<Item = AnchoredOperation>,
    ) -> Result<Resolution, ResolveDidError> {
        let did_suffix = did.did_suffix();
        let mut operations: Vec<AnchoredOperation> = operations.into_iter().collect();
        if let Some(data) = did.create_operation_data() {
            let create = Self::parse_long_form(data)?;
            if create.did_suffix() != did_suffix {
                return Err(ResolveDidError::SuffixMismatch {
                    expected: did_suffix.clone(),
                    found: create.did_suffix().clone(),
                });
            }
            let anchored_create = operations.iter().any(|anchored| {
                anchored.operation.did_suffix() == did_suffix
                    && matches!(anchored.operation, PartiallyVerifiedOperation::Create(_))
            });
            if !anchored_create {
                log::trace!("using long-form create operation for {did_suffix}");
                operations.push(AnchoredOperation::new(AnchorPoint::default(), create));
            }
        }
        Ok(self.resolve(did_suffix, operations))
    }

    fn parse_long_form(data: &str) -> Result<PartiallyVerifiedOperation, ResolveDidError> {
        let bytes = S::data_decoding_scheme(data).map_err(|_| ResolveDidError::InvalidEncoding)?;
        let mut value: serde_json::Value =
            serde_json::from_slice(&bytes).map_err(|_| ResolveDidError::NotAnObject)?;
        let object = value.as_object_mut().ok_or(ResolveDidError::NotAnObject)?;
        object.insert("type".to_string(), "create".into());
        let request = serde_json::to_vec(&value).map_err(ValidationError::Canonicalization)?;
        Ok(parse_operation::<S>(&request)?)
    }

    fn fold(
        &self,
        did_suffix: &DIDSuffix,
        operations: impl IntoIterator<Item = AnchoredOperation>,
        mut on_transition: impl FnMut(&Resolution),
    ) -> Resolution {
        let mut operations: Vec<AnchoredOperation> = operations.into_iter().collect();
        operations.sort_by(|a, b| {
            a.anchor
                .cmp(&b.anchor)
                .then_with(|| a.operation.operation_hash().cmp(b.operation.operation_hash()))
        });
        let mut resolution = Resolution::Unseen;
        for AnchoredOperation { anchor, operation } in &operations {
            match apply_operation::<S>(did_suffix, &resolution, operation) {
                Ok(next) => {
                    log::trace!(
                        "applied {} {} to {did_suffix} at {anchor:?}",
                        operation.operation_type(),
                        operation.operation_hash()
                    );
                    resolution = next;
                    on_transition(&resolution);
                }
                Err(rejection) => {
                    log::debug!(
                        "dropped {} {} for {did_suffix} at {anchor:?}: {rejection}",
                        operation.operation_type(),
                        operation.operation_hash()
                    );
                }
            }
        }
        resolution
    }
}
