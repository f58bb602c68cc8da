use std::collections::{BTreeMap, HashMap};

use rand::{CryptoRng, Rng};

use super::helpers::{build_credential_schema, build_non_credential_schema, encode_credential_attribute};
use crate::cl::verifier::ProofVerifier;
use crate::cl::{Nonce, SubProofRequestBuilder};
use crate::common::error::prelude::*;
use crate::domain::credential_definition::CredentialDefinition;
use crate::domain::presentation::Presentation;
use crate::domain::presentation_request::{
    AttributeInfo, AttributeRestriction, PredicateInfo, PresentationRequest,
};
use crate::domain::schema::Schema;
use crate::identifiers::{CredentialDefinitionId, SchemaId};
use crate::math::BigNumber;
use crate::utils::validation::Validatable;

/// Verifier role: presentation requests and proof verification.
pub struct Verifier {}

impl Verifier {
    pub fn new_presentation_request<R: Rng + CryptoRng>(
        name: &str,
        version: &str,
        requested_attributes: BTreeMap<String, AttributeInfo>,
        requested_predicates: BTreeMap<String, PredicateInfo>,
        rng: &mut R,
    ) -> Result<PresentationRequest> {
        let request = PresentationRequest {
            name: name.to_owned(),
            version: version.to_owned(),
            nonce: Nonce::new(rng),
            requested_attributes,
            requested_predicates,
        };
        request.validate()?;
        Ok(request)
    }

    /// All-or-nothing verification. `Ok(false)` whenever any disclosed
    /// value, restriction or proof component fails to check out; `Err`
    /// only for structurally malformed input.
    pub fn verify_presentation(
        presentation: &Presentation,
        pres_request: &PresentationRequest,
        schemas: &HashMap<SchemaId, Schema>,
        cred_defs: &HashMap<CredentialDefinitionId, CredentialDefinition>,
    ) -> Result<bool> {
        trace!(
            "Verifier::verify_presentation: >>> request: {}",
            pres_request.name
        );
        pres_request.validate()?;
        presentation.validate()?;

        let sub_proof_count = presentation.proof.proofs.len();
        let mut sub_requests: Vec<SubProofRequestBuilder> = (0..sub_proof_count)
            .map(|_| SubProofRequestBuilder::new())
            .collect();

        // every requested attribute must be answered and disclosed
        // consistently with the proof itself
        for (referent, info) in &pres_request.requested_attributes {
            let revealed = presentation
                .requested_proof
                .revealed_attrs
                .get(referent)
                .ok_or_else(|| {
                    input_err(format!(
                        "Presentation does not answer requested attribute '{}'",
                        referent
                    ))
                })?;
            let idx = revealed.sub_proof_index as usize;
            if idx >= sub_proof_count {
                return Err(input_err(format!(
                    "Sub-proof index {} out of range for attribute '{}'",
                    idx, referent
                )));
            }
            if !Self::check_restrictions(
                &presentation.identifiers[idx],
                cred_defs,
                &info.restrictions,
            ) {
                trace!(
                    "Verifier::verify_presentation: <<< restriction mismatch for '{}'",
                    referent
                );
                return Ok(false);
            }
            // the disclosed raw value must match both the encoding rule
            // and the value the proof commits to
            if encode_credential_attribute(&revealed.raw) != revealed.encoded {
                return Ok(false);
            }
            let committed = presentation.proof.proofs[idx]
                .primary_proof
                .eq_proof
                .revealed_attrs
                .get(&info.name);
            match committed {
                Some(value) if *value == BigNumber::from_dec(&revealed.encoded)? => {}
                _ => return Ok(false),
            }
            sub_requests[idx].add_revealed_attr(&info.name);
        }

        for (referent, info) in &pres_request.requested_predicates {
            let answered = presentation
                .requested_proof
                .predicates
                .get(referent)
                .ok_or_else(|| {
                    input_err(format!(
                        "Presentation does not answer requested predicate '{}'",
                        referent
                    ))
                })?;
            let idx = answered.sub_proof_index as usize;
            if idx >= sub_proof_count {
                return Err(input_err(format!(
                    "Sub-proof index {} out of range for predicate '{}'",
                    idx, referent
                )));
            }
            if !Self::check_restrictions(
                &presentation.identifiers[idx],
                cred_defs,
                &info.restrictions,
            ) {
                return Ok(false);
            }
            sub_requests[idx].add_predicate(&info.name, info.p_type, info.p_value);
        }

        let mut proof_verifier = ProofVerifier::new();
        let non_credential_schema = build_non_credential_schema();
        for (idx, builder) in sub_requests.into_iter().enumerate() {
            let identifier = &presentation.identifiers[idx];
            let schema = schemas.get(&identifier.schema_id).ok_or_else(|| {
                input_err(format!("Missing schema '{}'", identifier.schema_id))
            })?;
            let cred_def = cred_defs.get(&identifier.cred_def_id).ok_or_else(|| {
                input_err(format!(
                    "Missing credential definition '{}'",
                    identifier.cred_def_id
                ))
            })?;
            proof_verifier.add_sub_proof_request(
                &builder.finalize(),
                &build_credential_schema(&schema.attr_names),
                &non_credential_schema,
                &cred_def.value.primary,
            );
        }

        let valid = proof_verifier.verify(&presentation.proof, &pres_request.nonce)?;
        trace!("Verifier::verify_presentation: <<< valid: {}", valid);
        Ok(valid)
    }

    fn check_restrictions(
        identifier: &crate::domain::presentation::Identifier,
        cred_defs: &HashMap<CredentialDefinitionId, CredentialDefinition>,
        restrictions: &[AttributeRestriction],
    ) -> bool {
        restrictions.iter().all(|restriction| match restriction {
            AttributeRestriction::CredDefId(id) => identifier.cred_def_id == *id,
            AttributeRestriction::SchemaId(id) => identifier.schema_id == *id,
            AttributeRestriction::IssuerId(id) => cred_defs
                .get(&identifier.cred_def_id)
                .map(|cred_def| cred_def.issuer_id == *id)
                .unwrap_or(false),
        })
    }
}
