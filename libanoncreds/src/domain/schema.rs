use std::collections::HashSet;
use std::iter::FromIterator;

use crate::cl::constants::MAX_ATTRIBUTES_COUNT;
use crate::identifiers::IssuerId;
use crate::utils::validation::{Validatable, ValidationError};

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Schema {
    pub name: String,
    pub version: String,
    pub issuer_id: IssuerId,
    pub attr_names: AttributeNames,
}

impl Validatable for Schema {
    fn validate(&self) -> std::result::Result<(), ValidationError> {
        if self.name.is_empty() {
            return Err(invalid!("Schema name must not be empty"));
        }
        if self.version.is_empty() {
            return Err(invalid!("Schema version must not be empty"));
        }
        self.issuer_id.validate()?;
        self.attr_names.validate()
    }
}

/// Ordered list of attribute names; unique, non-empty, bounded.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(transparent)]
pub struct AttributeNames(pub Vec<String>);

impl AttributeNames {
    pub fn iter(&self) -> std::slice::Iter<'_, String> {
        self.0.iter()
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

impl From<Vec<String>> for AttributeNames {
    fn from(attrs: Vec<String>) -> Self {
        AttributeNames(attrs)
    }
}

impl From<&[&str]> for AttributeNames {
    fn from(attrs: &[&str]) -> Self {
        AttributeNames(attrs.iter().map(|a| (*a).to_owned()).collect())
    }
}

impl FromIterator<String> for AttributeNames {
    fn from_iter<I: IntoIterator<Item = String>>(iter: I) -> Self {
        AttributeNames(iter.into_iter().collect())
    }
}

impl Validatable for AttributeNames {
    fn validate(&self) -> std::result::Result<(), ValidationError> {
        if self.0.is_empty() {
            return Err(invalid!("Schema must have at least one attribute"));
        }
        if self.0.len() > MAX_ATTRIBUTES_COUNT {
            return Err(invalid!(
                "Schema has {} attributes, the maximum is {}",
                self.0.len(),
                MAX_ATTRIBUTES_COUNT
            ));
        }
        let unique: HashSet<&str> = self.0.iter().map(String::as_str).collect();
        if unique.len() != self.0.len() {
            return Err(invalid!("Schema attribute names must be unique"));
        }
        if self.0.iter().any(|a| a.is_empty()) {
            return Err(invalid!("Schema attribute names must not be empty"));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn schema() -> Schema {
        Schema {
            name: "demo".to_owned(),
            version: "1.0".to_owned(),
            issuer_id: IssuerId::from("mock:issuer:1"),
            attr_names: AttributeNames::from(&["name", "age"][..]),
        }
    }

    #[test]
    fn valid_schema_passes_validation() {
        schema().validate().unwrap();
    }

    #[test]
    fn duplicate_attribute_names_are_rejected() {
        let mut schema = schema();
        schema.attr_names = AttributeNames::from(&["name", "name"][..]);
        assert!(schema.validate().is_err());
    }

    #[test]
    fn empty_attribute_list_is_rejected() {
        let mut schema = schema();
        schema.attr_names = AttributeNames(vec![]);
        assert!(schema.validate().is_err());
    }

    #[test]
    fn serializes_with_camel_case_fields() {
        let json = serde_json::to_value(schema()).unwrap();
        assert!(json.get("issuerId").is_some());
        assert!(json.get("attrNames").is_some());
    }
}
