use std::collections::BTreeMap;

use super::constants::*;
use super::helpers::{calc_teq, calc_tge, get_hash_as_int, ITERATION};
use super::*;
use crate::common::error::prelude::*;
use crate::math::BigNumber;

/// Verifier-side recomputation of the aggregate challenge. One
/// `add_sub_proof_request` call per sub-proof, in sub-proof order, then
/// a single `verify`.
pub struct ProofVerifier {
    sub_proof_requests: Vec<SubProofVerifyEntry>,
}

struct SubProofVerifyEntry {
    sub_proof_request: SubProofRequest,
    credential_schema: CredentialSchema,
    non_credential_schema: NonCredentialSchema,
    p_pub_key: CredentialPrimaryPublicKey,
}

impl ProofVerifier {
    pub fn new() -> ProofVerifier {
        ProofVerifier {
            sub_proof_requests: Vec::new(),
        }
    }

    pub fn add_sub_proof_request(
        &mut self,
        sub_proof_request: &SubProofRequest,
        credential_schema: &CredentialSchema,
        non_credential_schema: &NonCredentialSchema,
        p_pub_key: &CredentialPrimaryPublicKey,
    ) {
        self.sub_proof_requests.push(SubProofVerifyEntry {
            sub_proof_request: sub_proof_request.clone(),
            credential_schema: credential_schema.clone(),
            non_credential_schema: non_credential_schema.clone(),
            p_pub_key: p_pub_key.clone(),
        });
    }

    /// Recomputes every tau value from the responses and the carried
    /// challenge, rebuilds the commitment list, and compares the
    /// resulting hash. Returns `Ok(false)` on any mismatch.
    pub fn verify(self, proof: &Proof, nonce: &Nonce) -> Result<bool> {
        trace!("ProofVerifier::verify: >>> nonce: {:?}", nonce);
        if proof.proofs.len() != self.sub_proof_requests.len() {
            return Err(input_err(format!(
                "Proof has {} sub-proofs but {} were requested",
                proof.proofs.len(),
                self.sub_proof_requests.len()
            )));
        }

        let c_hash = &proof.aggregated_proof.c_hash;
        let mut tau_list: Vec<Vec<u8>> = Vec::new();
        let mut c_list: Vec<Vec<u8>> = Vec::new();

        for (entry, sub_proof) in self.sub_proof_requests.iter().zip(proof.proofs.iter()) {
            let primary = &sub_proof.primary_proof;

            Self::check_sub_proof_shape(entry, primary)?;

            tau_list.extend(Self::verify_eq_proof(entry, &primary.eq_proof, c_hash)?);
            for ge_proof in &primary.ge_proofs {
                // the inequality response must be the same response the
                // equality proof gives for the predicate attribute,
                // otherwise the range proof is about an unrelated value
                match primary.eq_proof.m.get(&ge_proof.predicate.attr_name) {
                    Some(m) if *m == ge_proof.mj => {}
                    _ => {
                        trace!(
                            "ProofVerifier::verify: <<< predicate response for '{}' \
                             is not tied to the signature proof",
                            ge_proof.predicate.attr_name
                        );
                        return Ok(false);
                    }
                }
                tau_list.extend(Self::verify_ge_proof(
                    &entry.p_pub_key,
                    ge_proof,
                    c_hash,
                )?);
            }

            // rebuild the commitment list from the sub-proof contents
            c_list.push(primary.eq_proof.a_prime.to_bytes());
            for ge_proof in &primary.ge_proofs {
                for i in 0..ITERATION {
                    let t = ge_proof.t.get(&i.to_string()).ok_or_else(|| {
                        input_err(format!("Value by key '{}' not found in proof.t", i))
                    })?;
                    c_list.push(t.to_bytes());
                }
                let t_delta = ge_proof
                    .t
                    .get("DELTA")
                    .ok_or_else(|| input_err("Value by key 'DELTA' not found in proof.t"))?;
                c_list.push(t_delta.to_bytes());
            }
        }

        if c_list != proof.aggregated_proof.c_list {
            trace!("ProofVerifier::verify: <<< commitment list mismatch");
            return Ok(false);
        }

        let mut values = tau_list;
        values.extend(c_list);
        values.push(nonce.as_bignum().to_bytes());
        let c_hver = get_hash_as_int(&values);

        let valid = c_hver == *c_hash;
        trace!("ProofVerifier::verify: <<< valid: {}", valid);
        Ok(valid)
    }

    /// Structural checks that distinguish malformed input from a failing
    /// proof: every requested attribute and predicate must be present.
    fn check_sub_proof_shape(
        entry: &SubProofVerifyEntry,
        primary: &PrimaryProof,
    ) -> Result<()> {
        for attr in &entry.sub_proof_request.revealed_attrs {
            if !primary.eq_proof.revealed_attrs.contains_key(attr) {
                return Err(input_err(format!(
                    "Requested attribute '{}' is not revealed in the proof",
                    attr
                )));
            }
        }
        for predicate in &entry.sub_proof_request.predicates {
            if !primary
                .ge_proofs
                .iter()
                .any(|ge| ge.predicate == *predicate)
            {
                return Err(input_err(format!(
                    "Requested predicate over '{}' is not present in the proof",
                    predicate.attr_name
                )));
            }
        }
        Ok(())
    }

    fn verify_eq_proof(
        entry: &SubProofVerifyEntry,
        eq_proof: &PrimaryEqualProof,
        c_hash: &BigNumber,
    ) -> Result<Vec<Vec<u8>>> {
        let p_pub_key = &entry.p_pub_key;
        let n = &p_pub_key.n;

        let mut unrevealed_attrs: Vec<String> = entry
            .credential_schema
            .attrs
            .iter()
            .chain(entry.non_credential_schema.attrs.iter())
            .filter(|attr| !eq_proof.revealed_attrs.contains_key(*attr))
            .cloned()
            .collect();
        unrevealed_attrs.sort();

        let t1 = calc_teq(
            p_pub_key,
            &eq_proof.a_prime,
            &eq_proof.e,
            &eq_proof.v,
            &eq_proof.m,
            &eq_proof.m2,
            &unrevealed_attrs,
        )?;

        // rar = a'^(2^596) * prod r_i^m_i over the revealed values
        let mut rar = eq_proof
            .a_prime
            .mod_exp(&BigNumber::pow_of_two(LARGE_E_START), n)?;
        for (attr, value) in &eq_proof.revealed_attrs {
            let cur_r = p_pub_key.r.get(attr).ok_or_else(|| {
                input_err(format!("Attribute '{}' is not part of the public key", attr))
            })?;
            rar = rar.mod_mul(&cur_r.mod_exp(value, n)?, n)?;
        }
        let neg_c = BigNumber::zero().sub(c_hash);
        let t2 = p_pub_key.z.mod_div(&rar, n)?.mod_exp(&neg_c, n)?;

        let t = t1.mod_mul(&t2, n)?;
        Ok(vec![t.to_bytes()])
    }

    fn verify_ge_proof(
        p_pub_key: &CredentialPrimaryPublicKey,
        ge_proof: &PrimaryPredicateInequalityProof,
        c_hash: &BigNumber,
    ) -> Result<Vec<Vec<u8>>> {
        let n = &p_pub_key.n;
        let neg_c = BigNumber::zero().sub(c_hash);
        let is_less = ge_proof.predicate.is_less();

        let mut tau_list = calc_tge(
            p_pub_key,
            &ge_proof.u,
            &ge_proof.r,
            &ge_proof.mj,
            &ge_proof.alpha,
            &ge_proof.t,
            is_less,
        )?;

        for i in 0..ITERATION {
            let cur_t = ge_proof.t.get(&i.to_string()).ok_or_else(|| {
                input_err(format!("Value by key '{}' not found in proof.t", i))
            })?;
            let tau = cur_t.mod_exp(&neg_c, n)?.mod_mul(&tau_list[i], n)?;
            tau_list[i] = tau;
        }

        let t_delta = ge_proof
            .t
            .get("DELTA")
            .ok_or_else(|| input_err("Value by key 'DELTA' not found in proof.t"))?;
        let delta_prime = BigNumber::from_i32(ge_proof.predicate.get_delta_prime());
        // for upper bounds the delta commitment enters inverted
        let t_delta_signed = if is_less {
            t_delta.inverse(n)?
        } else {
            t_delta.clone()
        };
        let tau_delta_base = p_pub_key
            .z
            .mod_exp(&delta_prime, n)?
            .mod_mul(&t_delta_signed, n)?;
        let tau_delta = tau_delta_base
            .mod_exp(&neg_c, n)?
            .mod_mul(&tau_list[ITERATION], n)?;
        tau_list[ITERATION] = tau_delta;

        let q = t_delta
            .mod_exp(&neg_c, n)?
            .mod_mul(&tau_list[ITERATION + 1], n)?;
        tau_list[ITERATION + 1] = q;

        Ok(tau_list.iter().map(BigNumber::to_bytes).collect())
    }
}

impl Default for ProofVerifier {
    fn default() -> Self {
        ProofVerifier::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cl::issuer::Issuer;
    use crate::cl::mocks;
    use crate::cl::prover::{ProofBuilder, Prover};
    use rand::rngs::StdRng;
    use rand::SeedableRng;

    fn issue_with_values(
        rng: &mut StdRng,
        values: &CredentialValues,
    ) -> (CredentialPrimaryPublicKey, CredentialSignature) {
        let (p_pub_key, p_priv_key, key_proof) = mocks::credential_def();
        Prover::check_credential_key_correctness_proof(&p_pub_key, &key_proof).unwrap();

        let offer_nonce = Nonce::new(rng);
        let (blinded, factors, blinded_proof) =
            Prover::blind_credential_secrets(&p_pub_key, values, &offer_nonce, rng).unwrap();
        let request_nonce = Nonce::new(rng);
        let m_2 = BigNumber::rand(LARGE_LINK_SECRET, rng);
        let (mut signature, sig_proof) = Issuer::sign_credential(
            &m_2,
            &blinded,
            &blinded_proof,
            &offer_nonce,
            &request_nonce,
            values,
            &p_pub_key,
            &p_priv_key,
            rng,
        )
        .unwrap();
        Prover::process_credential_signature(
            &mut signature,
            values,
            &sig_proof,
            &factors,
            &p_pub_key,
            &request_nonce,
        )
        .unwrap();
        (p_pub_key, signature)
    }

    fn issue_credential(
        rng: &mut StdRng,
    ) -> (
        CredentialPrimaryPublicKey,
        CredentialSignature,
        CredentialValues,
    ) {
        let link_secret = Prover::new_link_secret(rng);
        let values = mocks::credential_values(&link_secret);
        let (p_pub_key, signature) = issue_with_values(rng, &values);
        (p_pub_key, signature, values)
    }

    fn demo_sub_proof_request() -> SubProofRequest {
        let mut builder = SubProofRequestBuilder::new();
        builder.add_revealed_attr("name");
        builder.add_predicate("age", PredicateType::GE, 18);
        builder.finalize()
    }

    fn build_proof(
        rng: &mut StdRng,
        p_pub_key: &CredentialPrimaryPublicKey,
        signature: &CredentialSignature,
        values: &CredentialValues,
        sub_proof_request: &SubProofRequest,
        nonce: &Nonce,
    ) -> Proof {
        let mut proof_builder = ProofBuilder::new();
        proof_builder.add_common_attribute(LINK_SECRET_NAME, rng);
        proof_builder
            .add_sub_proof_request(
                sub_proof_request,
                &mocks::credential_schema(),
                &mocks::non_credential_schema(),
                signature,
                values,
                p_pub_key,
                rng,
            )
            .unwrap();
        proof_builder.finalize(nonce).unwrap()
    }

    #[test]
    fn proof_with_disclosure_and_predicate_verifies() {
        let mut rng = StdRng::seed_from_u64(31);
        let (p_pub_key, signature, values) = issue_credential(&mut rng);
        let sub_proof_request = demo_sub_proof_request();
        let nonce = Nonce::new(&mut rng);
        let proof = build_proof(
            &mut rng,
            &p_pub_key,
            &signature,
            &values,
            &sub_proof_request,
            &nonce,
        );

        let mut verifier = ProofVerifier::new();
        verifier.add_sub_proof_request(
            &sub_proof_request,
            &mocks::credential_schema(),
            &mocks::non_credential_schema(),
            &p_pub_key,
        );
        assert!(verifier.verify(&proof, &nonce).unwrap());
    }

    #[test]
    fn all_predicate_types_verify() {
        let mut rng = StdRng::seed_from_u64(32);
        let (p_pub_key, signature, values) = issue_credential(&mut rng);
        // mock credential has age = 28
        let cases = [
            (PredicateType::GE, 18),
            (PredicateType::GT, 27),
            (PredicateType::LE, 30),
            (PredicateType::LT, 29),
        ];
        for (p_type, value) in cases {
            let mut builder = SubProofRequestBuilder::new();
            builder.add_predicate("age", p_type, value);
            let sub_proof_request = builder.finalize();
            let nonce = Nonce::new(&mut rng);
            let proof = build_proof(
                &mut rng,
                &p_pub_key,
                &signature,
                &values,
                &sub_proof_request,
                &nonce,
            );
            let mut verifier = ProofVerifier::new();
            verifier.add_sub_proof_request(
                &sub_proof_request,
                &mocks::credential_schema(),
                &mocks::non_credential_schema(),
                &p_pub_key,
            );
            assert!(
                verifier.verify(&proof, &nonce).unwrap(),
                "{:?} {} failed",
                p_type,
                value
            );
        }
    }

    #[test]
    fn tampered_revealed_value_fails() {
        let mut rng = StdRng::seed_from_u64(33);
        let (p_pub_key, signature, values) = issue_credential(&mut rng);
        let sub_proof_request = demo_sub_proof_request();
        let nonce = Nonce::new(&mut rng);
        let mut proof = build_proof(
            &mut rng,
            &p_pub_key,
            &signature,
            &values,
            &sub_proof_request,
            &nonce,
        );
        let tampered = proof.proofs[0]
            .primary_proof
            .eq_proof
            .revealed_attrs
            .get_mut("name")
            .unwrap();
        *tampered = tampered.add(&BigNumber::one());

        let mut verifier = ProofVerifier::new();
        verifier.add_sub_proof_request(
            &sub_proof_request,
            &mocks::credential_schema(),
            &mocks::non_credential_schema(),
            &p_pub_key,
        );
        assert!(!verifier.verify(&proof, &nonce).unwrap());
    }

    #[test]
    fn replayed_proof_fails_against_fresh_nonce() {
        let mut rng = StdRng::seed_from_u64(34);
        let (p_pub_key, signature, values) = issue_credential(&mut rng);
        let sub_proof_request = demo_sub_proof_request();
        let nonce = Nonce::new(&mut rng);
        let proof = build_proof(
            &mut rng,
            &p_pub_key,
            &signature,
            &values,
            &sub_proof_request,
            &nonce,
        );

        let fresh_nonce = Nonce::new(&mut rng);
        let mut verifier = ProofVerifier::new();
        verifier.add_sub_proof_request(
            &sub_proof_request,
            &mocks::credential_schema(),
            &mocks::non_credential_schema(),
            &p_pub_key,
        );
        assert!(!verifier.verify(&proof, &fresh_nonce).unwrap());
    }

    // A complete proof with an honest equality part over the signed
    // values, but an inequality part constructed over a self-chosen
    // value with its own response nonce. Every tau equation balances
    // individually, so only the tie between `mj` and the equality
    // response can reject it.
    #[test]
    fn predicate_response_detached_from_signature_fails() {
        use crate::cl::helpers::four_squares;

        let mut rng = StdRng::seed_from_u64(36);
        // the signed age is 16; the forged inequality part claims 20
        let link_secret = Prover::new_link_secret(&mut rng);
        let mut values_builder = CredentialValuesBuilder::new();
        values_builder.add_value_hidden(LINK_SECRET_NAME, link_secret.clone());
        values_builder
            .add_dec_known("name", "1139481716457488690172217916278103335")
            .unwrap();
        values_builder.add_dec_known("age", "16").unwrap();
        let values = values_builder.finalize();
        let (p_pub_key, signature) = issue_with_values(&mut rng, &values);

        let p_cred = &signature.p_credential;
        let n = &p_pub_key.n;
        let nonce = Nonce::new(&mut rng);
        let predicate = Predicate {
            attr_name: "age".to_owned(),
            p_type: PredicateType::GE,
            value: 18,
        };

        // honest equality commitment over the real values
        let r = BigNumber::rand(LARGE_VPRIME, &mut rng);
        let a_prime = p_cred
            .a
            .mod_mul(&p_pub_key.s.mod_exp(&r, n).unwrap(), n)
            .unwrap();
        let v_prime = p_cred.v.sub(&p_cred.e.mul(&r));
        let e_prime = p_cred.e.sub(&BigNumber::pow_of_two(LARGE_E_START));
        let e_tilde = BigNumber::rand(LARGE_ETILDE, &mut rng);
        let v_tilde = BigNumber::rand(LARGE_VTILDE, &mut rng);
        let m2_tilde = BigNumber::rand(LARGE_M2_TILDE, &mut rng);
        let unrevealed: Vec<String> = vec![
            "age".to_owned(),
            LINK_SECRET_NAME.to_owned(),
            "name".to_owned(),
        ];
        let mut m_tilde = BTreeMap::new();
        for attr in &unrevealed {
            m_tilde.insert(attr.clone(), BigNumber::rand(LARGE_MTILDE, &mut rng));
        }
        let t_eq = calc_teq(
            &p_pub_key,
            &a_prime,
            &e_tilde,
            &v_tilde,
            &m_tilde,
            &m2_tilde,
            &unrevealed,
        )
        .unwrap();

        // inequality commitments over the fabricated value, with a
        // response nonce independent of the equality proof's
        let forged_delta = 20 - predicate.value;
        let u_roots = four_squares(forged_delta).unwrap();
        let mut u = BTreeMap::new();
        let mut r_ge = BTreeMap::new();
        let mut t = BTreeMap::new();
        for (i, root) in u_roots.iter().enumerate() {
            let key = i.to_string();
            let cur_u = BigNumber::from_dec(&root.to_string()).unwrap();
            let cur_r = BigNumber::rand(LARGE_VPRIME, &mut rng);
            let cur_t = p_pub_key
                .z
                .mod_exp(&cur_u, n)
                .unwrap()
                .mod_mul(&p_pub_key.s.mod_exp(&cur_r, n).unwrap(), n)
                .unwrap();
            u.insert(key.clone(), cur_u);
            r_ge.insert(key.clone(), cur_r);
            t.insert(key, cur_t);
        }
        let r_delta = BigNumber::rand(LARGE_VPRIME, &mut rng);
        let t_delta = p_pub_key
            .z
            .mod_exp(&BigNumber::from_i32(forged_delta), n)
            .unwrap()
            .mod_mul(&p_pub_key.s.mod_exp(&r_delta, n).unwrap(), n)
            .unwrap();
        r_ge.insert("DELTA".to_owned(), r_delta);
        t.insert("DELTA".to_owned(), t_delta.clone());

        let mut u_tilde = BTreeMap::new();
        let mut r_tilde = BTreeMap::new();
        for i in 0..ITERATION {
            u_tilde.insert(i.to_string(), BigNumber::rand(LARGE_UTILDE, &mut rng));
            r_tilde.insert(i.to_string(), BigNumber::rand(LARGE_RTILDE, &mut rng));
        }
        r_tilde.insert("DELTA".to_owned(), BigNumber::rand(LARGE_RTILDE, &mut rng));
        let alpha_tilde = BigNumber::rand(LARGE_ALPHATILDE, &mut rng);
        let mj_tilde = BigNumber::rand(LARGE_MTILDE, &mut rng);
        let tau_ge = calc_tge(
            &p_pub_key,
            &u_tilde,
            &r_tilde,
            &mj_tilde,
            &alpha_tilde,
            &t,
            false,
        )
        .unwrap();

        // one aggregate challenge over the combined transcript
        let mut c_list: Vec<Vec<u8>> = vec![a_prime.to_bytes()];
        for i in 0..ITERATION {
            c_list.push(t[&i.to_string()].to_bytes());
        }
        c_list.push(t_delta.to_bytes());
        let mut hash_values = vec![t_eq.to_bytes()];
        hash_values.extend(tau_ge.iter().map(BigNumber::to_bytes));
        hash_values.extend(c_list.iter().cloned());
        hash_values.push(nonce.as_bignum().to_bytes());
        let c_hash = get_hash_as_int(&hash_values);

        let mut m = BTreeMap::new();
        for attr in &unrevealed {
            let value = values.attrs_values[attr].value();
            m.insert(attr.clone(), m_tilde[attr].add(&c_hash.mul(value)));
        }
        let eq_proof = PrimaryEqualProof {
            revealed_attrs: BTreeMap::new(),
            a_prime,
            e: e_tilde.add(&c_hash.mul(&e_prime)),
            v: v_tilde.add(&c_hash.mul(&v_prime)),
            m,
            m2: m2_tilde.add(&c_hash.mul(&p_cred.m_2)),
        };

        let mut u_resp = BTreeMap::new();
        let mut r_resp = BTreeMap::new();
        let mut urproduct = BigNumber::zero();
        for i in 0..ITERATION {
            let key = i.to_string();
            u_resp.insert(key.clone(), u_tilde[&key].add(&c_hash.mul(&u[&key])));
            r_resp.insert(key.clone(), r_tilde[&key].add(&c_hash.mul(&r_ge[&key])));
            urproduct = urproduct.add(&u[&key].mul(&r_ge[&key]));
        }
        r_resp.insert(
            "DELTA".to_owned(),
            r_tilde["DELTA"].add(&c_hash.mul(&r_ge["DELTA"])),
        );
        let alpha = alpha_tilde.add(&c_hash.mul(&r_ge["DELTA"].sub(&urproduct)));
        let ge_proof = PrimaryPredicateInequalityProof {
            u: u_resp,
            r: r_resp,
            mj: mj_tilde.add(&c_hash.mul(&BigNumber::from_i32(20))),
            alpha,
            t,
            predicate,
        };

        let proof = Proof {
            proofs: vec![SubProof {
                primary_proof: PrimaryProof {
                    eq_proof,
                    ge_proofs: vec![ge_proof],
                },
            }],
            aggregated_proof: AggregatedProof { c_hash, c_list },
        };

        let mut builder = SubProofRequestBuilder::new();
        builder.add_predicate("age", PredicateType::GE, 18);
        let mut verifier = ProofVerifier::new();
        verifier.add_sub_proof_request(
            &builder.finalize(),
            &mocks::credential_schema(),
            &mocks::non_credential_schema(),
            &p_pub_key,
        );
        assert!(!verifier.verify(&proof, &nonce).unwrap());
    }

    #[test]
    fn verification_is_idempotent() {
        let mut rng = StdRng::seed_from_u64(35);
        let (p_pub_key, signature, values) = issue_credential(&mut rng);
        let sub_proof_request = demo_sub_proof_request();
        let nonce = Nonce::new(&mut rng);
        let proof = build_proof(
            &mut rng,
            &p_pub_key,
            &signature,
            &values,
            &sub_proof_request,
            &nonce,
        );

        for _ in 0..2 {
            let mut verifier = ProofVerifier::new();
            verifier.add_sub_proof_request(
                &sub_proof_request,
                &mocks::credential_schema(),
                &mocks::non_credential_schema(),
                &p_pub_key,
            );
            assert!(verifier.verify(&proof, &nonce).unwrap());
        }
    }
}
