use core::fmt;
use std::{marker::PhantomData, str::FromStr};

use serde::{Deserialize, Serialize};

use super::{InvalidHash, Sidetree};

/// A Sidetree-based DID
///
/// Reference: [Sidetree §9. DID URI Composition][duc]
///
/// [duc]: https://identity.foundation/sidetree/spec/v1.0.0/#did-uri-composition
pub enum SidetreeDID<S: Sidetree> {
    /// Short-form Sidetree DID
    ///
    /// Reference: [§9. DID URI Composition](https://identity.foundation/sidetree/spec/v1.0.0/#short-form-did)
    Short { did_suffix: DIDSuffix },

    /// Long-form Sidetree DID
    ///
    /// Reference: [§9.1 Long-Form DID URIs](https://identity.foundation/sidetree/spec/v1.0.0/#long-form-did-uris)
    Long {
        did_suffix: DIDSuffix,
        create_operation_data: String,
        _marker: PhantomData<S>,
    },
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum InvalidSidetreeDID {
    #[error("invalid URI scheme")]
    InvalidURIScheme,

    #[error("DID method mismatch")]
    DIDMethodMismatch,

    #[error("Sidetree network mismatch")]
    SidetreeNetworkMismatch,

    #[error("missing sidetree DID suffix")]
    MissingSidetreeDIDSuffix,

    #[error("invalid sidetree DID suffix: {0}")]
    InvalidSidetreeDIDSuffix(#[from] InvalidHash),

    #[error("unexpected data after Sidetree Long-Form DID")]
    UnexpectedData,
}

impl<S: Sidetree> SidetreeDID<S> {
    /// The DID suffix, for both short and long form.
    pub fn did_suffix(&self) -> &DIDSuffix {
        match self {
            Self::Short { did_suffix } => did_suffix,
            Self::Long { did_suffix, .. } => did_suffix,
        }
    }

    /// Encoded create operation of a long-form DID.
    pub fn create_operation_data(&self) -> Option<&str> {
        match self {
            Self::Short { .. } => None,
            Self::Long {
                create_operation_data,
                ..
            } => Some(create_operation_data),
        }
    }
}

impl<S: Sidetree> FromStr for SidetreeDID<S> {
    type Err = InvalidSidetreeDID;

    fn from_str(did: &str) -> Result<Self, Self::Err> {
        let mut parts = did.split(':');

        if parts.next() != Some("did") {
            return Err(InvalidSidetreeDID::InvalidURIScheme);
        }

        if parts.next() != Some(S::METHOD) {
            return Err(InvalidSidetreeDID::DIDMethodMismatch);
        }

        if let Some(network) = S::NETWORK {
            if parts.next() != Some(network) {
                return Err(InvalidSidetreeDID::SidetreeNetworkMismatch);
            }
        }

        let did_suffix_str = parts
            .next()
            .ok_or(InvalidSidetreeDID::MissingSidetreeDIDSuffix)?;
        let did_suffix = DIDSuffix(did_suffix_str.to_string());
        S::validate_did_suffix(&did_suffix)?;
        let create_operation_data_opt = parts.next();
        if parts.next().is_some() {
            return Err(InvalidSidetreeDID::UnexpectedData);
        }
        Ok(match create_operation_data_opt {
            None => Self::Short { did_suffix },
            Some(data) => Self::Long {
                did_suffix,
                create_operation_data: data.to_string(),
                _marker: PhantomData,
            },
        })
    }
}

impl<S: Sidetree> fmt::Display for SidetreeDID<S> {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "did:{}:", S::METHOD)?;
        if let Some(network) = S::NETWORK {
            write!(f, "{}:", network)?;
        }
        match self {
            Self::Short { did_suffix } => f.write_str(&did_suffix.0),
            Self::Long {
                did_suffix,
                create_operation_data,
                _marker,
            } => write!(f, "{}:{}", did_suffix.0, create_operation_data),
        }
    }
}

/// [DID Suffix](https://identity.foundation/sidetree/spec/v1.0.0/#did-suffix)
///
/// Unique identifier string within a Sidetree DID (short or long-form). Derived once from the
/// Create operation's suffix data.
#[derive(Debug, Serialize, Deserialize, Clone, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct DIDSuffix(pub String);

impl fmt::Display for DIDSuffix {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl<S: Sidetree> From<SidetreeDID<S>> for DIDSuffix {
    fn from(did: SidetreeDID<S>) -> DIDSuffix {
        match did {
            SidetreeDID::Short { did_suffix } => did_suffix,
            SidetreeDID::Long { did_suffix, .. } => did_suffix,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ION;

    static SHORTFORM_DID: &str = "did:ion:EiDyOQbbZAa3aiRzeCkV7LOx3SERjjH93EXoIM3UoN4oWg";

    #[test]
    fn short_form_round_trips() {
        let did = SidetreeDID::<ION>::from_str(SHORTFORM_DID).unwrap();
        assert!(did.create_operation_data().is_none());
        assert_eq!(
            did.did_suffix().0,
            "EiDyOQbbZAa3aiRzeCkV7LOx3SERjjH93EXoIM3UoN4oWg"
        );
        assert_eq!(did.to_string(), SHORTFORM_DID);
    }

    #[test]
    fn rejects_wrong_method() {
        let err = SidetreeDID::<ION>::from_str(
            "did:sidetree:EiDyOQbbZAa3aiRzeCkV7LOx3SERjjH93EXoIM3UoN4oWg",
        )
        .err();
        assert_eq!(err, Some(InvalidSidetreeDID::DIDMethodMismatch));
    }

    #[test]
    fn rejects_bad_suffix() {
        let err = SidetreeDID::<ION>::from_str("did:ion:EiDyOQ").err();
        assert!(matches!(
            err,
            Some(InvalidSidetreeDID::InvalidSidetreeDIDSuffix(_))
        ));
        let err = SidetreeDID::<ION>::from_str("did:ion:a:b:c").err();
        assert!(matches!(
            err,
            Some(InvalidSidetreeDID::InvalidSidetreeDIDSuffix(_))
        ));
    }

    #[test]
    fn rejects_trailing_segments() {
        let did = format!("{SHORTFORM_DID}:data:more");
        assert_eq!(
            SidetreeDID::<ION>::from_str(&did).err(),
            Some(InvalidSidetreeDID::UnexpectedData)
        );
    }
}
