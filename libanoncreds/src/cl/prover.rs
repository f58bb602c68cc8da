use std::collections::BTreeMap;
use std::str::FromStr;

use rand::{CryptoRng, Rng};

use super::constants::*;
use super::helpers::{calc_teq, calc_tge, four_squares, get_hash_as_int, ITERATION};
use super::*;
use crate::common::error::prelude::*;
use crate::math::BigNumber;

/// Holder-side protocol operations.
pub struct Prover {}

impl Prover {
    pub fn new_link_secret<R: Rng + CryptoRng>(rng: &mut R) -> BigNumber {
        BigNumber::rand(LARGE_LINK_SECRET, rng)
    }

    /// Verifies the issuer's proof of knowledge of the discrete logs
    /// behind the public key. Must be checked before blinding anything
    /// under that key.
    pub fn check_credential_key_correctness_proof(
        p_pub_key: &CredentialPrimaryPublicKey,
        proof: &CredentialKeyCorrectnessProof,
    ) -> Result<()> {
        trace!(
            "Prover::check_credential_key_correctness_proof: >>> p_pub_key: {:?}",
            p_pub_key
        );
        let n = &p_pub_key.n;

        let proof_r: BTreeMap<&String, &BigNumber> =
            proof.xr_cap.iter().map(|(attr, cap)| (attr, cap)).collect();
        if proof_r.len() != p_pub_key.r.len()
            || !p_pub_key.r.keys().all(|attr| proof_r.contains_key(attr))
        {
            return Err(err_msg(
                ErrorKind::PublicKeyMalformed,
                "Key correctness proof does not cover the key's attributes",
            ));
        }

        let neg_c = BigNumber::zero().sub(&proof.c);
        let z_cap = p_pub_key
            .z
            .mod_exp(&neg_c, n)?
            .mod_mul(&p_pub_key.s.mod_exp(&proof.xz_cap, n)?, n)?;
        let rctxt_cap = p_pub_key
            .rctxt
            .mod_exp(&neg_c, n)?
            .mod_mul(&p_pub_key.s.mod_exp(&proof.xrctxt_cap, n)?, n)?;
        let mut r_caps = BTreeMap::new();
        for (attr, r) in &p_pub_key.r {
            let xr_cap = proof_r[attr];
            let r_cap = r
                .mod_exp(&neg_c, n)?
                .mod_mul(&p_pub_key.s.mod_exp(xr_cap, n)?, n)?;
            r_caps.insert(attr.clone(), r_cap);
        }

        let mut values = Vec::new();
        values.push(p_pub_key.z.to_bytes());
        values.push(p_pub_key.rctxt.to_bytes());
        for r in p_pub_key.r.values() {
            values.push(r.to_bytes());
        }
        values.push(z_cap.to_bytes());
        values.push(rctxt_cap.to_bytes());
        for r in r_caps.values() {
            values.push(r.to_bytes());
        }
        let c = get_hash_as_int(&values);

        if c != proof.c {
            return Err(err_msg(
                ErrorKind::PublicKeyMalformed,
                "Credential key correctness proof does not verify",
            ));
        }
        Ok(())
    }

    /// Commits to the hidden attribute values under the issuer's key and
    /// proves knowledge of the opening, bound to the offer nonce.
    pub fn blind_credential_secrets<R: Rng + CryptoRng>(
        p_pub_key: &CredentialPrimaryPublicKey,
        credential_values: &CredentialValues,
        offer_nonce: &Nonce,
        rng: &mut R,
    ) -> Result<(
        BlindedCredentialSecrets,
        CredentialSecretsBlindingFactors,
        BlindedCredentialSecretsCorrectnessProof,
    )> {
        trace!("Prover::blind_credential_secrets: >>>");
        let n = &p_pub_key.n;

        let v_prime = BigNumber::rand(LARGE_VPRIME, rng);
        let mut u = p_pub_key.s.mod_exp(&v_prime, n)?;
        let mut hidden_attributes = std::collections::BTreeSet::new();
        for (attr, value) in &credential_values.attrs_values {
            if !value.is_hidden() {
                continue;
            }
            let cur_r = p_pub_key.r.get(attr).ok_or_else(|| {
                input_err(format!("Attribute '{}' is not part of the public key", attr))
            })?;
            u = u.mod_mul(&cur_r.mod_exp(value.value(), n)?, n)?;
            hidden_attributes.insert(attr.clone());
        }

        let v_dash_tilde = BigNumber::rand(LARGE_VPRIME_TILDE, rng);
        let mut m_tildes = BTreeMap::new();
        let mut u_tilde = p_pub_key.s.mod_exp(&v_dash_tilde, n)?;
        for attr in &hidden_attributes {
            let m_tilde = BigNumber::rand(LARGE_MTILDE, rng);
            u_tilde = u_tilde.mod_mul(&p_pub_key.r[attr].mod_exp(&m_tilde, n)?, n)?;
            m_tildes.insert(attr.clone(), m_tilde);
        }

        let c = get_hash_as_int(&[
            u.to_bytes(),
            u_tilde.to_bytes(),
            offer_nonce.as_bignum().to_bytes(),
        ]);

        let v_dash_cap = v_dash_tilde.add(&c.mul(&v_prime));
        let mut m_caps = BTreeMap::new();
        for (attr, m_tilde) in &m_tildes {
            let value = credential_values.attrs_values[attr].value();
            m_caps.insert(attr.clone(), m_tilde.add(&c.mul(value)));
        }

        Ok((
            BlindedCredentialSecrets {
                u,
                hidden_attributes,
            },
            CredentialSecretsBlindingFactors { v_prime },
            BlindedCredentialSecretsCorrectnessProof {
                c,
                v_dash_cap,
                m_caps,
            },
        ))
    }

    /// Unblinds the issuer's signature and verifies it, together with
    /// the signature correctness proof, against the full set of
    /// credential values.
    pub fn process_credential_signature(
        signature: &mut CredentialSignature,
        credential_values: &CredentialValues,
        proof: &SignatureCorrectnessProof,
        blinding_factors: &CredentialSecretsBlindingFactors,
        p_pub_key: &CredentialPrimaryPublicKey,
        request_nonce: &Nonce,
    ) -> Result<()> {
        trace!("Prover::process_credential_signature: >>>");
        // remove the blinding factor from v
        signature.p_credential.v = signature.p_credential.v.add(&blinding_factors.v_prime);

        Self::check_signature_correctness_proof(
            &signature.p_credential,
            credential_values,
            proof,
            p_pub_key,
            request_nonce,
        )
    }

    fn check_signature_correctness_proof(
        p_cred_sig: &PrimaryCredentialSignature,
        credential_values: &CredentialValues,
        proof: &SignatureCorrectnessProof,
        p_pub_key: &CredentialPrimaryPublicKey,
        request_nonce: &Nonce,
    ) -> Result<()> {
        let n = &p_pub_key.n;

        if !crate::math::prime::is_prime(&p_cred_sig.e, &mut rand::rngs::OsRng) {
            return Err(err_msg(
                ErrorKind::ProcessingMismatch,
                "Signature component 'e' is not prime",
            ));
        }

        // q = z / (s^v * rctxt^m2 * prod r_i^m_i) over every value, the
        // hidden ones now unblinded
        let mut denominator = p_pub_key.s.mod_exp(&p_cred_sig.v, n)?;
        denominator =
            denominator.mod_mul(&p_pub_key.rctxt.mod_exp(&p_cred_sig.m_2, n)?, n)?;
        for (attr, value) in &credential_values.attrs_values {
            let cur_r = p_pub_key.r.get(attr).ok_or_else(|| {
                input_err(format!("Attribute '{}' is not part of the public key", attr))
            })?;
            denominator = denominator.mod_mul(&cur_r.mod_exp(value.value(), n)?, n)?;
        }
        let q = p_pub_key.z.mod_div(&denominator, n)?;

        let expected_q = p_cred_sig.a.mod_exp(&p_cred_sig.e, n)?;
        if q != expected_q {
            return Err(err_msg(
                ErrorKind::ProcessingMismatch,
                "Credential signature does not match the signed values",
            ));
        }

        let a_cap = q
            .mod_exp(&proof.se, n)?
            .mod_mul(&p_cred_sig.a.mod_exp(&proof.c, n)?, n)?;
        let c = get_hash_as_int(&[
            q.to_bytes(),
            p_cred_sig.a.to_bytes(),
            a_cap.to_bytes(),
            request_nonce.as_bignum().to_bytes(),
        ]);

        if c != proof.c {
            return Err(err_msg(
                ErrorKind::ProcessingMismatch,
                "Signature correctness proof does not verify",
            ));
        }
        Ok(())
    }
}

/// Accumulates one sub-proof per credential and emits a single proof
/// bound to the verifier's nonce.
pub struct ProofBuilder {
    common_attributes: BTreeMap<String, BigNumber>,
    init_proofs: Vec<ProofBuilderEntry>,
    c_list: Vec<Vec<u8>>,
    tau_list: Vec<Vec<u8>>,
}

struct ProofBuilderEntry {
    init_proof: PrimaryInitProof,
    credential_values: CredentialValues,
    sub_proof_request: SubProofRequest,
}

impl ProofBuilder {
    pub fn new() -> ProofBuilder {
        ProofBuilder {
            common_attributes: BTreeMap::new(),
            init_proofs: Vec::new(),
            c_list: Vec::new(),
            tau_list: Vec::new(),
        }
    }

    /// Registers an attribute whose blinded value must be proven equal
    /// across all sub-proofs (the link secret, typically). Must be
    /// called before any `add_sub_proof_request`.
    pub fn add_common_attribute<R: Rng + CryptoRng>(&mut self, attr_name: &str, rng: &mut R) {
        self.common_attributes
            .insert(attr_name.to_owned(), BigNumber::rand(LARGE_MTILDE, rng));
    }

    #[allow(clippy::too_many_arguments)]
    pub fn add_sub_proof_request<R: Rng + CryptoRng>(
        &mut self,
        sub_proof_request: &SubProofRequest,
        credential_schema: &CredentialSchema,
        non_credential_schema: &NonCredentialSchema,
        credential_signature: &CredentialSignature,
        credential_values: &CredentialValues,
        p_pub_key: &CredentialPrimaryPublicKey,
        rng: &mut R,
    ) -> Result<()> {
        trace!(
            "ProofBuilder::add_sub_proof_request: >>> sub_proof_request: {:?}",
            sub_proof_request
        );
        let mut unrevealed_attrs: Vec<String> = credential_schema
            .attrs
            .iter()
            .chain(non_credential_schema.attrs.iter())
            .filter(|attr| !sub_proof_request.revealed_attrs.contains(*attr))
            .cloned()
            .collect();
        unrevealed_attrs.sort();

        for attr in &sub_proof_request.revealed_attrs {
            if !credential_values.attrs_values.contains_key(attr) {
                return Err(input_err(format!(
                    "Requested attribute '{}' is not in the credential",
                    attr
                )));
            }
        }

        let eq_proof = self.init_eq_proof(
            &credential_signature.p_credential,
            p_pub_key,
            &unrevealed_attrs,
            rng,
        )?;

        let mut ge_proofs = Vec::new();
        for predicate in &sub_proof_request.predicates {
            let ge_proof = Self::init_ge_proof(
                p_pub_key,
                &eq_proof,
                credential_values,
                predicate,
                rng,
            )?;
            ge_proofs.push(ge_proof);
        }

        let init_proof = PrimaryInitProof {
            eq_proof,
            ge_proofs,
        };
        self.c_list.extend(init_proof.as_c_list());
        self.tau_list.extend(init_proof.as_tau_list());
        self.init_proofs.push(ProofBuilderEntry {
            init_proof,
            credential_values: credential_values.clone(),
            sub_proof_request: sub_proof_request.clone(),
        });
        Ok(())
    }

    /// Computes the aggregate Fiat-Shamir challenge over all commitments
    /// and closes every sub-proof with its responses.
    pub fn finalize(self, nonce: &Nonce) -> Result<Proof> {
        trace!("ProofBuilder::finalize: >>> nonce: {:?}", nonce);
        let mut values = self.tau_list.clone();
        values.extend(self.c_list.iter().cloned());
        values.push(nonce.as_bignum().to_bytes());
        let c_hash = get_hash_as_int(&values);

        let mut proofs = Vec::with_capacity(self.init_proofs.len());
        for entry in &self.init_proofs {
            let eq_proof = Self::finalize_eq_proof(
                &entry.init_proof.eq_proof,
                &c_hash,
                &entry.credential_values,
                &entry.sub_proof_request,
            )?;
            let mut ge_proofs = Vec::new();
            for ge_init in &entry.init_proof.ge_proofs {
                ge_proofs.push(Self::finalize_ge_proof(ge_init, &c_hash, &eq_proof)?);
            }
            proofs.push(SubProof {
                primary_proof: PrimaryProof {
                    eq_proof,
                    ge_proofs,
                },
            });
        }

        Ok(Proof {
            proofs,
            aggregated_proof: AggregatedProof {
                c_hash,
                c_list: self.c_list,
            },
        })
    }

    fn init_eq_proof<R: Rng + CryptoRng>(
        &self,
        p_cred_sig: &PrimaryCredentialSignature,
        p_pub_key: &CredentialPrimaryPublicKey,
        unrevealed_attrs: &[String],
        rng: &mut R,
    ) -> Result<PrimaryEqualInitProof> {
        let n = &p_pub_key.n;

        let r = BigNumber::rand(LARGE_VPRIME, rng);
        let a_prime = p_cred_sig
            .a
            .mod_mul(&p_pub_key.s.mod_exp(&r, n)?, n)?;
        // v' and e' may be negative; responses are computed over signed
        // integers
        let v_prime = p_cred_sig.v.sub(&p_cred_sig.e.mul(&r));
        let e_prime = p_cred_sig.e.sub(&BigNumber::pow_of_two(LARGE_E_START));

        let e_tilde = BigNumber::rand(LARGE_ETILDE, rng);
        let v_tilde = BigNumber::rand(LARGE_VTILDE, rng);
        let m2_tilde = BigNumber::rand(LARGE_M2_TILDE, rng);
        let mut m_tilde = BTreeMap::new();
        for attr in unrevealed_attrs {
            let tilde = match self.common_attributes.get(attr) {
                Some(common) => common.clone(),
                None => BigNumber::rand(LARGE_MTILDE, rng),
            };
            m_tilde.insert(attr.clone(), tilde);
        }

        let t = calc_teq(
            p_pub_key,
            &a_prime,
            &e_tilde,
            &v_tilde,
            &m_tilde,
            &m2_tilde,
            unrevealed_attrs,
        )?;

        Ok(PrimaryEqualInitProof {
            a_prime,
            t,
            e_tilde,
            e_prime,
            v_tilde,
            v_prime,
            m_tilde,
            m2_tilde,
            m2: p_cred_sig.m_2.clone(),
        })
    }

    fn init_ge_proof<R: Rng + CryptoRng>(
        p_pub_key: &CredentialPrimaryPublicKey,
        eq_proof: &PrimaryEqualInitProof,
        credential_values: &CredentialValues,
        predicate: &Predicate,
        rng: &mut R,
    ) -> Result<PrimaryPredicateInequalityInitProof> {
        let n = &p_pub_key.n;

        let attr_value = credential_values
            .attrs_values
            .get(&predicate.attr_name)
            .ok_or_else(|| {
                input_err(format!(
                    "Predicate attribute '{}' is not in the credential",
                    predicate.attr_name
                ))
            })?;
        let attr_value = i32::from_str(&attr_value.value().to_dec()).map_input_err(|| {
            format!(
                "Attribute '{}' is not a 32-bit integer, cannot prove a predicate over it",
                predicate.attr_name
            )
        })?;
        let delta = predicate.get_delta(attr_value);
        if delta < 0 {
            return Err(input_err("Predicate is not satisfied"));
        }

        let u_roots = four_squares(delta)?;
        let mut u = BTreeMap::new();
        let mut r = BTreeMap::new();
        let mut t = BTreeMap::new();
        let mut c_list = Vec::with_capacity(ITERATION + 1);
        for (i, root) in u_roots.iter().enumerate() {
            let key = i.to_string();
            let cur_u = BigNumber::from_dec(&root.to_string())?;
            let cur_r = BigNumber::rand(LARGE_VPRIME, rng);
            let cur_t = p_pub_key
                .z
                .mod_exp(&cur_u, n)?
                .mod_mul(&p_pub_key.s.mod_exp(&cur_r, n)?, n)?;
            c_list.push(cur_t.clone());
            u.insert(key.clone(), cur_u);
            r.insert(key.clone(), cur_r);
            t.insert(key, cur_t);
        }
        let r_delta = BigNumber::rand(LARGE_VPRIME, rng);
        let t_delta = p_pub_key
            .z
            .mod_exp(&BigNumber::from_i32(delta), n)?
            .mod_mul(&p_pub_key.s.mod_exp(&r_delta, n)?, n)?;
        c_list.push(t_delta.clone());
        r.insert("DELTA".to_owned(), r_delta);
        t.insert("DELTA".to_owned(), t_delta);

        let mut u_tilde = BTreeMap::new();
        let mut r_tilde = BTreeMap::new();
        for i in 0..ITERATION {
            u_tilde.insert(i.to_string(), BigNumber::rand(LARGE_UTILDE, rng));
            r_tilde.insert(i.to_string(), BigNumber::rand(LARGE_RTILDE, rng));
        }
        r_tilde.insert("DELTA".to_owned(), BigNumber::rand(LARGE_RTILDE, rng));
        let alpha_tilde = BigNumber::rand(LARGE_ALPHATILDE, rng);

        let mj_tilde = eq_proof.m_tilde.get(&predicate.attr_name).ok_or_else(|| {
            input_err(format!(
                "Predicate attribute '{}' must not be revealed in the same sub-proof",
                predicate.attr_name
            ))
        })?;

        let tau_list = calc_tge(
            p_pub_key,
            &u_tilde,
            &r_tilde,
            mj_tilde,
            &alpha_tilde,
            &t,
            predicate.is_less(),
        )?;

        Ok(PrimaryPredicateInequalityInitProof {
            c_list,
            tau_list,
            u,
            u_tilde,
            r,
            r_tilde,
            alpha_tilde,
            predicate: predicate.clone(),
            t,
        })
    }

    fn finalize_eq_proof(
        init_proof: &PrimaryEqualInitProof,
        c_hash: &BigNumber,
        credential_values: &CredentialValues,
        sub_proof_request: &SubProofRequest,
    ) -> Result<PrimaryEqualProof> {
        let e = init_proof.e_tilde.add(&c_hash.mul(&init_proof.e_prime));
        let v = init_proof.v_tilde.add(&c_hash.mul(&init_proof.v_prime));

        let mut m = BTreeMap::new();
        for (attr, m_tilde) in &init_proof.m_tilde {
            let value = credential_values
                .attrs_values
                .get(attr)
                .ok_or_else(|| {
                    input_err(format!("Attribute '{}' is not in the credential", attr))
                })?
                .value();
            m.insert(attr.clone(), m_tilde.add(&c_hash.mul(value)));
        }
        let m2 = init_proof.m2_tilde.add(&c_hash.mul(&init_proof.m2));

        let mut revealed_attrs = BTreeMap::new();
        for attr in &sub_proof_request.revealed_attrs {
            let value = credential_values
                .attrs_values
                .get(attr)
                .ok_or_else(|| {
                    input_err(format!("Attribute '{}' is not in the credential", attr))
                })?
                .value();
            revealed_attrs.insert(attr.clone(), value.clone());
        }

        Ok(PrimaryEqualProof {
            revealed_attrs,
            a_prime: init_proof.a_prime.clone(),
            e,
            v,
            m,
            m2,
        })
    }

    fn finalize_ge_proof(
        init_proof: &PrimaryPredicateInequalityInitProof,
        c_hash: &BigNumber,
        eq_proof: &PrimaryEqualProof,
    ) -> Result<PrimaryPredicateInequalityProof> {
        let mut u = BTreeMap::new();
        let mut r = BTreeMap::new();
        let mut urproduct = BigNumber::zero();
        for i in 0..ITERATION {
            let key = i.to_string();
            let cur_u = &init_proof.u[&key];
            let cur_r = &init_proof.r[&key];
            u.insert(key.clone(), init_proof.u_tilde[&key].add(&c_hash.mul(cur_u)));
            r.insert(key.clone(), init_proof.r_tilde[&key].add(&c_hash.mul(cur_r)));
            urproduct = urproduct.add(&cur_u.mul(cur_r));
        }
        let r_delta = &init_proof.r["DELTA"];
        r.insert(
            "DELTA".to_owned(),
            init_proof.r_tilde["DELTA"].add(&c_hash.mul(r_delta)),
        );

        let alpha = init_proof
            .alpha_tilde
            .add(&c_hash.mul(&r_delta.sub(&urproduct)));

        let mj = eq_proof
            .m
            .get(&init_proof.predicate.attr_name)
            .ok_or_else(|| {
                input_err(format!(
                    "No equality response for predicate attribute '{}'",
                    init_proof.predicate.attr_name
                ))
            })?
            .clone();

        Ok(PrimaryPredicateInequalityProof {
            u,
            r,
            mj,
            alpha,
            t: init_proof.t.clone(),
            predicate: init_proof.predicate.clone(),
        })
    }
}

impl Default for ProofBuilder {
    fn default() -> Self {
        ProofBuilder::new()
    }
}
