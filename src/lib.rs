//! Operation layer of the [Sidetree][sidetree] DID protocol.
//!
//! Sidetree DIDs are mutated by four kinds of operations (Create, Update, Recover, Deactivate)
//! that are anchored to an external ledger. Each operation reveals the pre-image of a commitment
//! published by its predecessor, which links the operations of a DID into a hash chain. This
//! crate provides:
//!
//! - parsing and validation of raw operation requests ([`parse_operation`]);
//! - the public key [commitment scheme](sidetree::commitment);
//! - the [patch engine](sidetree::patch) deriving DID documents from deltas;
//! - the [resolver](SidetreeResolver) folding anchored operations into the current DID state,
//!   resolving forks deterministically.
//!
//! Ledger anchoring, content-addressable storage and transport are left to the caller.
//!
//! ```
//! use did_sidetree::{parse_operation, AnchorPoint, AnchoredOperation, Resolution, ION};
//! # fn run(bytes: &[u8]) -> Result<(), did_sidetree::ValidationError> {
//! let operation = parse_operation::<ION>(bytes)?;
//! let suffix = operation.did_suffix().clone();
//! let anchored = AnchoredOperation::new(AnchorPoint::new(1, 0), operation);
//! let resolution = did_sidetree::DIDION::new().resolve(&suffix, vec![anchored]);
//! assert!(matches!(resolution, Resolution::Active(_)));
//! # Ok(())
//! # }
//! ```
//!
//! [sidetree]: https://identity.foundation/sidetree/spec/v1.0.0/
mod ion;
pub mod sidetree;

pub use ion::ION;
pub use sidetree::*;

/// Resolver for did:ion operations
pub type DIDION = SidetreeResolver<ION>;
