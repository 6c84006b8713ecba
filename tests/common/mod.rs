#![allow(dead_code)]

use did_sidetree::{
    AnchorPoint, AnchoredOperation, Operation, PartiallyVerifiedOperation, PublicKeyJwk,
    SignError, Signer, ION,
};

#[path = "../../src/sidetree/test_utils.rs"]
mod test_utils;

pub use test_utils::TestSigner;

/// Serialize a built operation and run it through the request parser.
pub fn parse(operation: &Operation) -> PartiallyVerifiedOperation {
    let bytes = serde_json::to_vec(operation).unwrap();
    did_sidetree::parse_operation::<ION>(&bytes).unwrap()
}

pub fn anchored(time: u64, operation: &PartiallyVerifiedOperation) -> AnchoredOperation {
    AnchoredOperation::new(AnchorPoint::new(time, 0), operation.clone())
}
