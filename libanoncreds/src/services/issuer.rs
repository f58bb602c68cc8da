use rand::{CryptoRng, Rng};

use super::helpers::{
    build_credential_schema, build_credential_values, build_non_credential_schema,
    credential_context, encode_credential_attribute,
};
use crate::cl::issuer::Issuer as ClIssuer;
use crate::cl::{Nonce, LINK_SECRET_NAME};
use crate::common::error::prelude::*;
use crate::domain::credential::{AttributeValues, Credential, CredentialValues};
use crate::domain::credential_definition::{
    CredentialDefinition, CredentialDefinitionConfig, CredentialDefinitionData,
    CredentialDefinitionPrivate, KeyCorrectnessProof, SignatureType,
};
use crate::domain::credential_offer::CredentialOffer;
use crate::domain::credential_request::CredentialRequest;
use crate::domain::schema::{AttributeNames, Schema};
use crate::identifiers::{CredentialDefinitionId, IssuerId, SchemaId};
use crate::utils::validation::Validatable;

/// Issuer role: schemas, credential definitions, offers, credentials.
pub struct Issuer {}

impl Issuer {
    pub fn new_schema(
        name: &str,
        version: &str,
        issuer_id: IssuerId,
        attr_names: AttributeNames,
    ) -> Result<Schema> {
        trace!("Issuer::new_schema: >>> name: {}, version: {}", name, version);
        let schema = Schema {
            name: name.to_owned(),
            version: version.to_owned(),
            issuer_id,
            attr_names,
        };
        schema.validate()?;
        Ok(schema)
    }

    pub fn new_credential_definition<R: Rng + CryptoRng>(
        schema_id: &SchemaId,
        schema: &Schema,
        issuer_id: IssuerId,
        tag: &str,
        signature_type: SignatureType,
        config: CredentialDefinitionConfig,
        rng: &mut R,
    ) -> Result<(
        CredentialDefinition,
        CredentialDefinitionPrivate,
        KeyCorrectnessProof,
    )> {
        trace!(
            "Issuer::new_credential_definition: >>> schema_id: {}, tag: {}",
            schema_id,
            tag
        );
        schema.validate()?;
        if config.support_revocation {
            return Err(input_err(
                "Revocation-enabled credential definitions are not supported",
            ));
        }

        let credential_schema = build_credential_schema(&schema.attr_names);
        let non_credential_schema = build_non_credential_schema();
        let (p_pub_key, p_priv_key, key_correctness_proof) =
            ClIssuer::new_credential_def(&credential_schema, &non_credential_schema, rng)?;

        let cred_def = CredentialDefinition {
            issuer_id,
            schema_id: schema_id.clone(),
            signature_type,
            tag: tag.to_owned(),
            value: CredentialDefinitionData {
                primary: p_pub_key,
                revocation: None,
            },
        };
        cred_def.validate()?;
        let cred_def_private = CredentialDefinitionPrivate { value: p_priv_key };

        trace!("Issuer::new_credential_definition: <<<");
        Ok((cred_def, cred_def_private, key_correctness_proof))
    }

    pub fn new_credential_offer<R: Rng + CryptoRng>(
        schema_id: &SchemaId,
        cred_def_id: &CredentialDefinitionId,
        correctness_proof: &KeyCorrectnessProof,
        rng: &mut R,
    ) -> Result<CredentialOffer> {
        let offer = CredentialOffer {
            schema_id: schema_id.clone(),
            cred_def_id: cred_def_id.clone(),
            key_correctness_proof: correctness_proof.clone(),
            nonce: Nonce::new(rng),
        };
        offer.validate()?;
        Ok(offer)
    }

    /// Encodes the raw attribute values, verifies the request's blinding
    /// proof against the offer nonce and produces the blind-signed
    /// credential.
    pub fn new_credential<R: Rng + CryptoRng>(
        cred_def: &CredentialDefinition,
        cred_def_private: &CredentialDefinitionPrivate,
        cred_offer: &CredentialOffer,
        cred_request: &CredentialRequest,
        raw_values: &[(&str, &str)],
        rng: &mut R,
    ) -> Result<Credential> {
        trace!(
            "Issuer::new_credential: >>> cred_def_id: {}, values: {:?}",
            cred_offer.cred_def_id,
            secret!(raw_values)
        );
        cred_request.validate()?;
        if cred_request.cred_def_id != cred_offer.cred_def_id {
            return Err(input_err(
                "Credential request does not match the credential offer",
            ));
        }
        if raw_values.is_empty() {
            return Err(input_err("No credential values provided"));
        }

        // the provided attributes must cover the schema exactly; the
        // link secret base is signed blindly and never takes a value here
        let schema_attrs: Vec<&str> = cred_def
            .value
            .primary
            .r
            .keys()
            .map(String::as_str)
            .filter(|attr| *attr != LINK_SECRET_NAME)
            .collect();
        let mut values = CredentialValues::default();
        for (attr, raw) in raw_values {
            if *attr == LINK_SECRET_NAME {
                return Err(input_err(format!(
                    "Attribute name '{}' is reserved",
                    LINK_SECRET_NAME
                )));
            }
            if !schema_attrs.contains(attr) {
                return Err(input_err(format!(
                    "Attribute '{}' is not part of the credential definition",
                    attr
                )));
            }
            values.0.insert(
                (*attr).to_owned(),
                AttributeValues {
                    raw: (*raw).to_owned(),
                    encoded: encode_credential_attribute(raw),
                },
            );
        }
        let missing: Vec<&str> = schema_attrs
            .iter()
            .filter(|attr| !values.0.contains_key(**attr))
            .copied()
            .collect();
        if !missing.is_empty() {
            return Err(input_err(format!(
                "Missing values for schema attributes: {}",
                missing.join(", ")
            )));
        }

        let m_2 = credential_context(&cred_request.entropy, None);
        let cl_values = build_credential_values(&values, None)?;
        let (signature, signature_correctness_proof) = ClIssuer::sign_credential(
            &m_2,
            &cred_request.blinded_ms,
            &cred_request.blinded_ms_correctness_proof,
            &cred_offer.nonce,
            &cred_request.nonce,
            &cl_values,
            &cred_def.value.primary,
            &cred_def_private.value,
            rng,
        )?;

        let credential = Credential {
            schema_id: cred_offer.schema_id.clone(),
            cred_def_id: cred_offer.cred_def_id.clone(),
            rev_reg_id: None,
            values,
            signature,
            signature_correctness_proof,
            rev_reg: None,
            witness: None,
        };
        trace!("Issuer::new_credential: <<<");
        Ok(credential)
    }
}
