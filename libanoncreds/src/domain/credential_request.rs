use crate::cl::{
    BlindedCredentialSecrets, BlindedCredentialSecretsCorrectnessProof,
    CredentialSecretsBlindingFactors, Nonce,
};
use crate::identifiers::CredentialDefinitionId;
use crate::utils::validation::{Validatable, ValidationError};

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CredentialRequest {
    /// Holder-chosen entropy mixed into the credential context.
    pub entropy: String,
    pub cred_def_id: CredentialDefinitionId,
    pub blinded_ms: BlindedCredentialSecrets,
    pub blinded_ms_correctness_proof: BlindedCredentialSecretsCorrectnessProof,
    pub nonce: Nonce,
}

impl Validatable for CredentialRequest {
    fn validate(&self) -> std::result::Result<(), ValidationError> {
        if self.entropy.is_empty() {
            return Err(invalid!("Credential request entropy must not be empty"));
        }
        self.cred_def_id.validate()
    }
}

/// Kept by the holder; never sent to the issuer.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CredentialRequestMetadata {
    pub link_secret_blinding_data: CredentialSecretsBlindingFactors,
    pub nonce: Nonce,
    pub link_secret_name: String,
}
