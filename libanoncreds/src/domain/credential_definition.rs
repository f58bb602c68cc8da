use crate::cl::{CredentialKeyCorrectnessProof, CredentialPrimaryPrivateKey, CredentialPrimaryPublicKey};
use crate::identifiers::{IssuerId, SchemaId};
use crate::utils::validation::{Validatable, ValidationError};

pub const CL_SIGNATURE_TYPE: &str = "CL";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum SignatureType {
    #[serde(rename = "CL")]
    CL,
}

impl SignatureType {
    pub fn from_str(value: &str) -> std::result::Result<SignatureType, ValidationError> {
        match value {
            CL_SIGNATURE_TYPE => Ok(SignatureType::CL),
            _ => Err(invalid!("Unsupported signature type: {}", value)),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CredentialDefinitionData {
    pub primary: CredentialPrimaryPublicKey,
    /// Opaque revocation key material; not interpreted by this crate.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub revocation: Option<serde_json::Value>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CredentialDefinition {
    pub issuer_id: IssuerId,
    pub schema_id: SchemaId,
    #[serde(rename = "type")]
    pub signature_type: SignatureType,
    pub tag: String,
    pub value: CredentialDefinitionData,
}

impl Validatable for CredentialDefinition {
    fn validate(&self) -> std::result::Result<(), ValidationError> {
        self.issuer_id.validate()?;
        self.schema_id.validate()?;
        if self.tag.is_empty() {
            return Err(invalid!("Credential definition tag must not be empty"));
        }
        if self.value.primary.r.is_empty() {
            return Err(invalid!(
                "Credential definition public key has no attribute bases"
            ));
        }
        Ok(())
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CredentialDefinitionPrivate {
    pub value: CredentialPrimaryPrivateKey,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct CredentialDefinitionConfig {
    pub support_revocation: bool,
}

pub type KeyCorrectnessProof = CredentialKeyCorrectnessProof;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn signature_type_parses_only_cl() {
        assert_eq!(SignatureType::from_str("CL").unwrap(), SignatureType::CL);
        assert!(SignatureType::from_str("BBS+").is_err());
    }

    #[test]
    fn signature_type_serializes_as_string() {
        assert_eq!(
            serde_json::to_string(&SignatureType::CL).unwrap(),
            "\"CL\""
        );
    }
}
