use std::collections::BTreeMap;

use crate::cl::{Nonce, PredicateType};
use crate::identifiers::{CredentialDefinitionId, IssuerId, SchemaId};
use crate::utils::validation::{Validatable, ValidationError};

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PresentationRequest {
    pub name: String,
    pub version: String,
    pub nonce: Nonce,
    #[serde(default)]
    pub requested_attributes: BTreeMap<String, AttributeInfo>,
    #[serde(default)]
    pub requested_predicates: BTreeMap<String, PredicateInfo>,
}

impl Validatable for PresentationRequest {
    fn validate(&self) -> std::result::Result<(), ValidationError> {
        if self.requested_attributes.is_empty() && self.requested_predicates.is_empty() {
            return Err(invalid!(
                "Presentation request must ask for at least one attribute or predicate"
            ));
        }
        for info in self.requested_attributes.values() {
            if info.name.is_empty() {
                return Err(invalid!("Requested attribute name must not be empty"));
            }
        }
        for info in self.requested_predicates.values() {
            if info.name.is_empty() {
                return Err(invalid!("Requested predicate name must not be empty"));
            }
        }
        Ok(())
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AttributeInfo {
    pub name: String,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub restrictions: Vec<AttributeRestriction>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PredicateInfo {
    pub name: String,
    pub p_type: PredicateType,
    pub p_value: i32,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub restrictions: Vec<AttributeRestriction>,
}

/// Closed set of credential restrictions; a candidate credential must
/// satisfy every restriction listed for a referent.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum AttributeRestriction {
    #[serde(rename = "cred_def_id")]
    CredDefId(CredentialDefinitionId),
    #[serde(rename = "schema_id")]
    SchemaId(SchemaId),
    #[serde(rename = "issuer_id")]
    IssuerId(IssuerId),
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::math::BigNumber;

    #[test]
    fn empty_request_is_rejected() {
        let request = PresentationRequest {
            name: "proof".to_owned(),
            version: "1.0".to_owned(),
            nonce: Nonce(BigNumber::from_u32(1)),
            requested_attributes: BTreeMap::new(),
            requested_predicates: BTreeMap::new(),
        };
        assert!(request.validate().is_err());
    }

    #[test]
    fn restrictions_serialize_as_tagged_values() {
        let restriction =
            AttributeRestriction::CredDefId(CredentialDefinitionId::from("issuer:3:CL:1:tag"));
        let json = serde_json::to_value(&restriction).unwrap();
        assert_eq!(json["cred_def_id"], "issuer:3:CL:1:tag");
    }

    #[test]
    fn predicate_types_round_trip() {
        let info = PredicateInfo {
            name: "age".to_owned(),
            p_type: PredicateType::GE,
            p_value: 18,
            restrictions: vec![],
        };
        let json = serde_json::to_string(&info).unwrap();
        assert!(json.contains("\">=\""));
        let back: PredicateInfo = serde_json::from_str(&json).unwrap();
        assert_eq!(back, info);
    }
}
