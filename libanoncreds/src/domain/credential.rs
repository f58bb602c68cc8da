use std::collections::BTreeMap;

use crate::cl::{CredentialSignature, SignatureCorrectnessProof};
use crate::identifiers::{CredentialDefinitionId, RevocationRegistryId, SchemaId};
use crate::utils::validation::{Validatable, ValidationError};

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Credential {
    pub schema_id: SchemaId,
    pub cred_def_id: CredentialDefinitionId,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub rev_reg_id: Option<RevocationRegistryId>,
    pub values: CredentialValues,
    pub signature: CredentialSignature,
    pub signature_correctness_proof: SignatureCorrectnessProof,
    /// Opaque revocation state; carried, never interpreted.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub rev_reg: Option<serde_json::Value>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub witness: Option<serde_json::Value>,
}

impl Validatable for Credential {
    fn validate(&self) -> std::result::Result<(), ValidationError> {
        self.schema_id.validate()?;
        self.cred_def_id.validate()?;
        self.values.validate()
    }
}

/// Raw attribute values together with their deterministic integer
/// encodings.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(transparent)]
pub struct CredentialValues(pub BTreeMap<String, AttributeValues>);

impl Validatable for CredentialValues {
    fn validate(&self) -> std::result::Result<(), ValidationError> {
        if self.0.is_empty() {
            return Err(invalid!("Credential values must not be empty"));
        }
        Ok(())
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AttributeValues {
    pub raw: String,
    pub encoded: String,
}
