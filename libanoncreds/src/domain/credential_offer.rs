use crate::cl::{CredentialKeyCorrectnessProof, Nonce};
use crate::identifiers::{CredentialDefinitionId, SchemaId};
use crate::utils::validation::{Validatable, ValidationError};

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CredentialOffer {
    pub schema_id: SchemaId,
    pub cred_def_id: CredentialDefinitionId,
    pub key_correctness_proof: CredentialKeyCorrectnessProof,
    pub nonce: Nonce,
}

impl Validatable for CredentialOffer {
    fn validate(&self) -> std::result::Result<(), ValidationError> {
        self.schema_id.validate()?;
        self.cred_def_id.validate()
    }
}
