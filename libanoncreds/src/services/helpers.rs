use std::str::FromStr;

use crate::cl::{
    CredentialSchema, CredentialSchemaBuilder, CredentialValues as ClCredentialValues,
    CredentialValuesBuilder, NonCredentialSchema, NonCredentialSchemaBuilder, LINK_SECRET_NAME,
};
use crate::common::error::prelude::*;
use crate::domain::credential::CredentialValues;
use crate::domain::link_secret::LinkSecret;
use crate::domain::schema::AttributeNames;
use crate::math::hash::sha256;
use crate::math::BigNumber;

/// Deterministic integer encoding of a raw attribute value: a value
/// that parses as `i32` encodes as itself, anything else as the SHA-256
/// digest of its UTF-8 bytes read as a big-endian unsigned integer.
/// Identical on the issuer, holder and verifier sides.
pub fn encode_credential_attribute(raw: &str) -> String {
    match i32::from_str(raw) {
        Ok(value) => value.to_string(),
        Err(_) => BigNumber::from_bytes(&sha256(raw.as_bytes())).to_dec(),
    }
}

/// The credential context `m2`, binding a credential to the holder's
/// entropy and (when revoked credentials are in play) a registry index.
pub fn credential_context(entropy: &str, rev_idx: Option<i32>) -> BigNumber {
    let idx = rev_idx.unwrap_or(-1);
    let mut data = Vec::with_capacity(entropy.len() + 4);
    data.extend_from_slice(entropy.as_bytes());
    data.extend_from_slice(&idx.to_be_bytes());
    BigNumber::from_bytes(&sha256(&data))
}

pub fn build_credential_schema(attr_names: &AttributeNames) -> CredentialSchema {
    let mut builder = CredentialSchemaBuilder::new();
    for attr in attr_names.iter() {
        builder.add_attr(attr);
    }
    builder.finalize()
}

pub fn build_non_credential_schema() -> NonCredentialSchema {
    let mut builder = NonCredentialSchemaBuilder::new();
    builder.add_attr(LINK_SECRET_NAME);
    builder.finalize()
}

/// Converts domain values into protocol values. The encoded values are
/// signed in the clear; the link secret, when present, rides along as
/// the hidden attribute.
pub fn build_credential_values(
    values: &CredentialValues,
    link_secret: Option<&LinkSecret>,
) -> Result<ClCredentialValues> {
    let mut builder = CredentialValuesBuilder::new();
    for (attr, attr_values) in &values.0 {
        builder.add_dec_known(attr, &attr_values.encoded)?;
    }
    if let Some(link_secret) = link_secret {
        builder.add_value_hidden(LINK_SECRET_NAME, link_secret.value().clone());
    }
    Ok(builder.finalize())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn integer_values_encode_as_themselves() {
        assert_eq!(encode_credential_attribute("28"), "28");
        assert_eq!(encode_credential_attribute("-5"), "-5");
        assert_eq!(encode_credential_attribute("0"), "0");
    }

    #[test]
    fn non_integer_values_encode_as_digests() {
        let encoded = encode_credential_attribute("Alex");
        assert_ne!(encoded, "Alex");
        // the digest encoding is deterministic
        assert_eq!(encoded, encode_credential_attribute("Alex"));
        assert_ne!(encoded, encode_credential_attribute("alex"));
        // 256-bit digest as a decimal number
        assert!(encoded.len() > 70);
    }

    #[test]
    fn out_of_range_integers_are_hashed() {
        let raw = "2147483648"; // i32::MAX + 1
        assert_ne!(encode_credential_attribute(raw), raw);
    }

    #[test]
    fn credential_context_depends_on_entropy_and_index() {
        let a = credential_context("prover-1", None);
        let b = credential_context("prover-2", None);
        let c = credential_context("prover-1", Some(7));
        assert_ne!(a, b);
        assert_ne!(a, c);
        assert_eq!(a, credential_context("prover-1", None));
    }
}
