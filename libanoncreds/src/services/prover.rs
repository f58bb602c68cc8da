use std::collections::HashMap;

use rand::{CryptoRng, Rng};

use super::helpers::{
    build_credential_schema, build_credential_values, build_non_credential_schema,
};
use crate::cl::prover::{ProofBuilder, Prover as ClProver};
use crate::cl::{Nonce, SubProofRequestBuilder, LINK_SECRET_NAME};
use crate::common::error::prelude::*;
use crate::domain::credential::Credential;
use crate::domain::credential_definition::CredentialDefinition;
use crate::domain::credential_offer::CredentialOffer;
use crate::domain::credential_request::{CredentialRequest, CredentialRequestMetadata};
use crate::domain::link_secret::LinkSecret;
use crate::domain::presentation::{
    Identifier, Presentation, RequestedProof, RevealedAttributeInfo, SubProofReferent,
};
use crate::domain::presentation_request::{AttributeRestriction, PresentationRequest};
use crate::domain::schema::Schema;
use crate::identifiers::{CredentialDefinitionId, SchemaId};
use crate::utils::validation::Validatable;

/// Holder role: link secret, credential requests, credential
/// processing, presentations.
pub struct Prover {}

impl Prover {
    pub fn new_link_secret<R: Rng + CryptoRng>(rng: &mut R) -> LinkSecret {
        LinkSecret::new(rng)
    }

    /// Checks the offer's key correctness proof, blinds the link secret
    /// under the issuer's key and assembles the request plus the
    /// metadata the holder must keep for processing.
    pub fn new_credential_request<R: Rng + CryptoRng>(
        entropy: &str,
        cred_def: &CredentialDefinition,
        link_secret: &LinkSecret,
        link_secret_id: &str,
        cred_offer: &CredentialOffer,
        rng: &mut R,
    ) -> Result<(CredentialRequest, CredentialRequestMetadata)> {
        trace!(
            "Prover::new_credential_request: >>> cred_def_id: {}",
            cred_offer.cred_def_id
        );
        cred_def.validate()?;
        cred_offer.validate()?;
        if entropy.is_empty() {
            return Err(input_err("Entropy must not be empty"));
        }

        ClProver::check_credential_key_correctness_proof(
            &cred_def.value.primary,
            &cred_offer.key_correctness_proof,
        )?;

        let mut builder = crate::cl::CredentialValuesBuilder::new();
        builder.add_value_hidden(LINK_SECRET_NAME, link_secret.value().clone());
        let blinding_values = builder.finalize();

        let (blinded_ms, blinding_factors, blinded_ms_correctness_proof) =
            ClProver::blind_credential_secrets(
                &cred_def.value.primary,
                &blinding_values,
                &cred_offer.nonce,
                rng,
            )?;

        let request_nonce = Nonce::new(rng);
        let cred_request = CredentialRequest {
            entropy: entropy.to_owned(),
            cred_def_id: cred_offer.cred_def_id.clone(),
            blinded_ms,
            blinded_ms_correctness_proof,
            nonce: request_nonce.clone(),
        };
        let cred_request_metadata = CredentialRequestMetadata {
            link_secret_blinding_data: blinding_factors,
            nonce: request_nonce,
            link_secret_name: link_secret_id.to_owned(),
        };

        trace!("Prover::new_credential_request: <<<");
        Ok((cred_request, cred_request_metadata))
    }

    /// Unblinds the signature and verifies it against the credential
    /// values and the issuer's signature correctness proof. The
    /// returned credential is the one to store; the input stays blinded.
    pub fn process_credential(
        mut credential: Credential,
        cred_request_metadata: &CredentialRequestMetadata,
        link_secret: &LinkSecret,
        cred_def: &CredentialDefinition,
    ) -> Result<Credential> {
        trace!(
            "Prover::process_credential: >>> cred_def_id: {}",
            credential.cred_def_id
        );
        credential.validate()?;
        let cl_values = build_credential_values(&credential.values, Some(link_secret))?;
        ClProver::process_credential_signature(
            &mut credential.signature,
            &cl_values,
            &credential.signature_correctness_proof,
            &cred_request_metadata.link_secret_blinding_data,
            &cred_def.value.primary,
            &cred_request_metadata.nonce,
        )?;
        trace!("Prover::process_credential: <<<");
        Ok(credential)
    }

    /// Builds a presentation for the request. Every referent is served
    /// by the first provided credential that carries the attribute and
    /// satisfies the referent's restrictions; an unservable referent
    /// fails with `UnsatisfiableRequest`.
    pub fn new_presentation<R: Rng + CryptoRng>(
        pres_request: &PresentationRequest,
        credentials: &[Credential],
        link_secret: &LinkSecret,
        schemas: &HashMap<SchemaId, Schema>,
        cred_defs: &HashMap<CredentialDefinitionId, CredentialDefinition>,
        rng: &mut R,
    ) -> Result<Presentation> {
        trace!("Prover::new_presentation: >>> request: {}", pres_request.name);
        pres_request.validate()?;

        // referent -> credential index, grouped per credential
        let mut selection: Vec<usize> = Vec::new();
        let mut builders: HashMap<usize, SubProofRequestBuilder> = HashMap::new();
        let mut revealed_refs: Vec<(String, usize, String)> = Vec::new();
        let mut predicate_refs: Vec<(String, usize)> = Vec::new();

        for (referent, info) in &pres_request.requested_attributes {
            let idx = Self::select_credential(
                credentials,
                cred_defs,
                &info.name,
                &info.restrictions,
            )
            .ok_or_else(|| {
                err_msg(
                    ErrorKind::UnsatisfiableRequest,
                    format!("No credential satisfies requested attribute '{}'", referent),
                )
            })?;
            if !selection.contains(&idx) {
                selection.push(idx);
            }
            builders
                .entry(idx)
                .or_insert_with(SubProofRequestBuilder::new)
                .add_revealed_attr(&info.name);
            revealed_refs.push((referent.clone(), idx, info.name.clone()));
        }

        for (referent, info) in &pres_request.requested_predicates {
            let idx = Self::select_credential(
                credentials,
                cred_defs,
                &info.name,
                &info.restrictions,
            )
            .ok_or_else(|| {
                err_msg(
                    ErrorKind::UnsatisfiableRequest,
                    format!("No credential satisfies requested predicate '{}'", referent),
                )
            })?;
            if !selection.contains(&idx) {
                selection.push(idx);
            }
            builders
                .entry(idx)
                .or_insert_with(SubProofRequestBuilder::new)
                .add_predicate(&info.name, info.p_type, info.p_value);
            predicate_refs.push((referent.clone(), idx));
        }

        let mut proof_builder = ProofBuilder::new();
        proof_builder.add_common_attribute(LINK_SECRET_NAME, rng);

        let non_credential_schema = build_non_credential_schema();
        let mut identifiers = Vec::with_capacity(selection.len());
        let mut sub_proof_index: HashMap<usize, u32> = HashMap::new();

        for (position, &idx) in selection.iter().enumerate() {
            let credential = &credentials[idx];
            let schema = schemas.get(&credential.schema_id).ok_or_else(|| {
                input_err(format!("Missing schema '{}'", credential.schema_id))
            })?;
            let cred_def = cred_defs.get(&credential.cred_def_id).ok_or_else(|| {
                input_err(format!(
                    "Missing credential definition '{}'",
                    credential.cred_def_id
                ))
            })?;
            let sub_proof_request = builders
                .remove(&idx)
                .map(SubProofRequestBuilder::finalize)
                .ok_or_else(|| err_msg(ErrorKind::Unexpected, "Lost sub-proof request"))?;

            let credential_schema = build_credential_schema(&schema.attr_names);
            let cl_values = build_credential_values(&credential.values, Some(link_secret))?;
            proof_builder.add_sub_proof_request(
                &sub_proof_request,
                &credential_schema,
                &non_credential_schema,
                &credential.signature,
                &cl_values,
                &cred_def.value.primary,
                rng,
            )?;

            sub_proof_index.insert(idx, position as u32);
            identifiers.push(Identifier {
                schema_id: credential.schema_id.clone(),
                cred_def_id: credential.cred_def_id.clone(),
                rev_reg_id: credential.rev_reg_id.clone(),
            });
        }

        let proof = proof_builder.finalize(&pres_request.nonce)?;

        let mut requested_proof = RequestedProof::default();
        for (referent, idx, attr_name) in revealed_refs {
            let attr_values = credentials[idx]
                .values
                .0
                .get(&attr_name)
                .ok_or_else(|| {
                    err_msg(
                        ErrorKind::Unexpected,
                        format!("Lost attribute '{}' during selection", attr_name),
                    )
                })?;
            requested_proof.revealed_attrs.insert(
                referent,
                RevealedAttributeInfo {
                    sub_proof_index: sub_proof_index[&idx],
                    raw: attr_values.raw.clone(),
                    encoded: attr_values.encoded.clone(),
                },
            );
        }
        for (referent, idx) in predicate_refs {
            requested_proof.predicates.insert(
                referent,
                SubProofReferent {
                    sub_proof_index: sub_proof_index[&idx],
                },
            );
        }

        trace!("Prover::new_presentation: <<<");
        Ok(Presentation {
            proof,
            requested_proof,
            identifiers,
        })
    }

    fn select_credential(
        credentials: &[Credential],
        cred_defs: &HashMap<CredentialDefinitionId, CredentialDefinition>,
        attr_name: &str,
        restrictions: &[AttributeRestriction],
    ) -> Option<usize> {
        credentials.iter().position(|credential| {
            if !credential.values.0.contains_key(attr_name) {
                return false;
            }
            restrictions.iter().all(|restriction| match restriction {
                AttributeRestriction::CredDefId(id) => credential.cred_def_id == *id,
                AttributeRestriction::SchemaId(id) => credential.schema_id == *id,
                AttributeRestriction::IssuerId(id) => cred_defs
                    .get(&credential.cred_def_id)
                    .map(|cred_def| cred_def.issuer_id == *id)
                    .unwrap_or(false),
            })
        })
    }
}
