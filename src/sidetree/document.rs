use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use super::{DocumentState, PublicKeyEntry, ServiceEndpointEntry};

/// Resolved DID document content: public keys and services, keyed by id.
///
/// Ids are unique within each collection. Map ordering keeps serialization deterministic.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DidDocument {
    pub public_keys: BTreeMap<String, PublicKeyEntry>,
    pub services: BTreeMap<String, ServiceEndpointEntry>,
}

impl DidDocument {
    pub fn public_key(&self, id: &str) -> Option<&PublicKeyEntry> {
        self.public_keys.get(id)
    }

    pub fn service(&self, id: &str) -> Option<&ServiceEndpointEntry> {
        self.services.get(id)
    }

    pub fn is_empty(&self) -> bool {
        self.public_keys.is_empty() && self.services.is_empty()
    }

    /// Express the document as the content of a `replace` patch.
    pub fn to_document_state(&self) -> DocumentState {
        DocumentState {
            public_keys: Some(self.public_keys.values().cloned().collect()),
            services: Some(self.services.values().cloned().collect()),
        }
    }
}

/// State of a DID after applying a chain of operations.
///
/// Commitments are `None` once the DID is deactivated. `last_operation_hash` identifies the
/// most recently applied operation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DidState {
    pub document: DidDocument,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub recovery_commitment: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub update_commitment: Option<String>,
    pub last_operation_hash: String,
    pub deactivated: bool,
}
