use std::fmt;
use std::str::FromStr;

use regex::Regex;

use crate::utils::validation::{Validatable, ValidationError};

lazy_static! {
    // accepts both legacy indy identifiers and URI-style identifiers
    static ref VALID_IDENTIFIER: Regex =
        Regex::new(r"^[a-zA-Z0-9][a-zA-Z0-9:\-_./=#]*$").unwrap();
}

macro_rules! identifier {
    ($ident:ident) => {
        #[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
        #[serde(transparent)]
        pub struct $ident(pub String);

        impl $ident {
            pub fn new(value: &str) -> Self {
                $ident(value.to_owned())
            }
        }

        impl Validatable for $ident {
            fn validate(&self) -> Result<(), ValidationError> {
                if self.0.is_empty() {
                    return Err(invalid!("{} cannot be empty", stringify!($ident)));
                }
                if !VALID_IDENTIFIER.is_match(&self.0) {
                    return Err(invalid!(
                        "{} contains invalid characters: {}",
                        stringify!($ident),
                        self.0
                    ));
                }
                Ok(())
            }
        }

        impl fmt::Display for $ident {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                f.write_str(&self.0)
            }
        }

        impl FromStr for $ident {
            type Err = ValidationError;

            fn from_str(value: &str) -> Result<Self, ValidationError> {
                let id = $ident(value.to_owned());
                id.validate()?;
                Ok(id)
            }
        }

        impl From<&str> for $ident {
            fn from(value: &str) -> Self {
                $ident(value.to_owned())
            }
        }

        impl From<String> for $ident {
            fn from(value: String) -> Self {
                $ident(value)
            }
        }
    };
}

identifier!(IssuerId);
identifier!(SchemaId);
identifier!(CredentialDefinitionId);
identifier!(RevocationRegistryId);

impl SchemaId {
    /// Derive the legacy-style schema identifier for an issuer.
    pub fn from_parts(issuer_id: &IssuerId, name: &str, version: &str) -> SchemaId {
        SchemaId(format!("{}:2:{}:{}", issuer_id.0, name, version))
    }
}

impl CredentialDefinitionId {
    /// Derive the legacy-style credential definition identifier.
    pub fn from_parts(
        issuer_id: &IssuerId,
        schema_id: &SchemaId,
        signature_type: &str,
        tag: &str,
    ) -> CredentialDefinitionId {
        CredentialDefinitionId(format!(
            "{}:3:{}:{}:{}",
            issuer_id.0, signature_type, schema_id.0, tag
        ))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn identifier_validation_works() {
        assert!(IssuerId::from_str("mock:uri").is_ok());
        assert!(IssuerId::from_str("NcYxiDXkpYi6ov5FcYDi1e").is_ok());
        assert!(IssuerId::from_str("").is_err());
        assert!(IssuerId::from_str("spaces are invalid").is_err());
    }

    #[test]
    fn legacy_identifiers_are_derived() {
        let issuer = IssuerId::new("NcYxiDXkpYi6ov5FcYDi1e");
        let schema_id = SchemaId::from_parts(&issuer, "gvt", "1.0");
        assert_eq!(schema_id.0, "NcYxiDXkpYi6ov5FcYDi1e:2:gvt:1.0");

        let cred_def_id = CredentialDefinitionId::from_parts(&issuer, &schema_id, "CL", "tag");
        assert_eq!(
            cred_def_id.0,
            "NcYxiDXkpYi6ov5FcYDi1e:3:CL:NcYxiDXkpYi6ov5FcYDi1e:2:gvt:1.0:tag"
        );
        assert!(cred_def_id.validate().is_ok());
    }
}
