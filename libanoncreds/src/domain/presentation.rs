use std::collections::BTreeMap;

use crate::cl::Proof;
use crate::identifiers::{CredentialDefinitionId, RevocationRegistryId, SchemaId};
use crate::utils::validation::{Validatable, ValidationError};

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Presentation {
    pub proof: Proof,
    pub requested_proof: RequestedProof,
    pub identifiers: Vec<Identifier>,
}

impl Validatable for Presentation {
    fn validate(&self) -> std::result::Result<(), ValidationError> {
        if self.proof.proofs.len() != self.identifiers.len() {
            return Err(invalid!(
                "Presentation has {} sub-proofs but {} identifiers",
                self.proof.proofs.len(),
                self.identifiers.len()
            ));
        }
        for identifier in &self.identifiers {
            identifier.schema_id.validate()?;
            identifier.cred_def_id.validate()?;
        }
        Ok(())
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, Default)]
pub struct RequestedProof {
    pub revealed_attrs: BTreeMap<String, RevealedAttributeInfo>,
    pub predicates: BTreeMap<String, SubProofReferent>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RevealedAttributeInfo {
    pub sub_proof_index: u32,
    pub raw: String,
    pub encoded: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SubProofReferent {
    pub sub_proof_index: u32,
}

/// Which credential definition each sub-proof was built from.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Identifier {
    pub schema_id: SchemaId,
    pub cred_def_id: CredentialDefinitionId,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub rev_reg_id: Option<RevocationRegistryId>,
}
