use std::collections::BTreeMap;

use rand::{CryptoRng, Rng};

use super::constants::*;
use super::helpers::get_hash_as_int;
use super::*;
use crate::common::error::prelude::*;
use crate::math::prime::{generate_prime_in_range, generate_safe_prime, is_safe_prime};
use crate::math::BigNumber;

/// Issuer-side protocol operations.
pub struct Issuer {}

impl Issuer {
    /// Generates a fresh CL key pair over new 1024-bit safe primes,
    /// together with the proof that every public base was derived from
    /// the quadratic residue generator.
    pub fn new_credential_def<R: Rng + CryptoRng>(
        credential_schema: &CredentialSchema,
        non_credential_schema: &NonCredentialSchema,
        rng: &mut R,
    ) -> Result<(
        CredentialPrimaryPublicKey,
        CredentialPrimaryPrivateKey,
        CredentialKeyCorrectnessProof,
    )> {
        trace!(
            "Issuer::new_credential_def: >>> credential_schema: {:?}",
            credential_schema
        );
        let p_safe = generate_safe_prime(LARGE_PRIME, rng)?;
        let mut q_safe = generate_safe_prime(LARGE_PRIME, rng)?;
        while p_safe == q_safe {
            q_safe = generate_safe_prime(LARGE_PRIME, rng)?;
        }
        Self::new_credential_def_from_primes(
            credential_schema,
            non_credential_schema,
            &p_safe,
            &q_safe,
            rng,
        )
    }

    /// Key generation over caller-supplied safe primes, for test
    /// fixtures and externally managed prime material.
    pub fn new_credential_def_from_primes<R: Rng + CryptoRng>(
        credential_schema: &CredentialSchema,
        non_credential_schema: &NonCredentialSchema,
        p_safe: &BigNumber,
        q_safe: &BigNumber,
        rng: &mut R,
    ) -> Result<(
        CredentialPrimaryPublicKey,
        CredentialPrimaryPrivateKey,
        CredentialKeyCorrectnessProof,
    )> {
        if credential_schema.attrs.is_empty() {
            return Err(input_err("Credential schema has no attributes"));
        }
        if credential_schema.attrs.len() + non_credential_schema.attrs.len()
            > MAX_ATTRIBUTES_COUNT
        {
            return Err(input_err(format!(
                "The number of attributes exceeds the maximum of {}",
                MAX_ATTRIBUTES_COUNT
            )));
        }
        if !is_safe_prime(p_safe, rng) || !is_safe_prime(q_safe, rng) {
            return Err(err_msg(
                ErrorKind::KeyGeneration,
                "Provided moduli factors are not safe primes",
            ));
        }

        let n = p_safe.mul(q_safe);
        // Sophie Germain halves; their product is the order of the
        // quadratic residue group mod n
        let one = BigNumber::one();
        let p = p_safe.sub(&one).rshift1();
        let q = q_safe.sub(&one).rshift1();
        let order = p.mul(&q);

        let s = BigNumber::rand_range(&n, rng)?.mod_exp(&BigNumber::from_u32(2), &n)?;

        let xz = gen_x(&order, rng)?;
        let z = s.mod_exp(&xz, &n)?;
        let xrctxt = gen_x(&order, rng)?;
        let rctxt = s.mod_exp(&xrctxt, &n)?;

        let mut xr = BTreeMap::new();
        let mut r = BTreeMap::new();
        for attr in credential_schema
            .attrs
            .iter()
            .chain(non_credential_schema.attrs.iter())
        {
            let x = gen_x(&order, rng)?;
            r.insert(attr.clone(), s.mod_exp(&x, &n)?);
            xr.insert(attr.clone(), x);
        }

        let p_pub_key = CredentialPrimaryPublicKey { n, s, r, rctxt, z };
        let p_priv_key = CredentialPrimaryPrivateKey { p, q };
        let metadata = CredentialKeyMetadata { xz, xr, xrctxt };
        let proof = Self::new_key_correctness_proof(&p_pub_key, &metadata, &order, rng)?;

        trace!(
            "Issuer::new_credential_def_from_primes: <<< p_pub_key: {:?}",
            p_pub_key
        );
        Ok((p_pub_key, p_priv_key, proof))
    }

    /// Fiat-Shamir proof of knowledge of the exponents behind `z`,
    /// `rctxt` and each attribute base. Hash input order is fixed:
    /// public values first, then the commitments, in `z, rctxt, r_i`
    /// order with `r_i` iterated by attribute name.
    fn new_key_correctness_proof<R: Rng + CryptoRng>(
        p_pub_key: &CredentialPrimaryPublicKey,
        metadata: &CredentialKeyMetadata,
        order: &BigNumber,
        rng: &mut R,
    ) -> Result<CredentialKeyCorrectnessProof> {
        let n = &p_pub_key.n;

        let xz_tilde = gen_x(order, rng)?;
        let xrctxt_tilde = gen_x(order, rng)?;
        let mut xr_tildes = BTreeMap::new();
        for attr in p_pub_key.r.keys() {
            xr_tildes.insert(attr.clone(), gen_x(order, rng)?);
        }

        let z_tilde = p_pub_key.s.mod_exp(&xz_tilde, n)?;
        let rctxt_tilde = p_pub_key.s.mod_exp(&xrctxt_tilde, n)?;
        let mut r_tildes = BTreeMap::new();
        for (attr, x) in &xr_tildes {
            r_tildes.insert(attr.clone(), p_pub_key.s.mod_exp(x, n)?);
        }

        let mut values = Vec::new();
        values.push(p_pub_key.z.to_bytes());
        values.push(p_pub_key.rctxt.to_bytes());
        for r in p_pub_key.r.values() {
            values.push(r.to_bytes());
        }
        values.push(z_tilde.to_bytes());
        values.push(rctxt_tilde.to_bytes());
        for r in r_tildes.values() {
            values.push(r.to_bytes());
        }
        let c = get_hash_as_int(&values);

        let xz_cap = xz_tilde.add(&c.mul(&metadata.xz));
        let xrctxt_cap = xrctxt_tilde.add(&c.mul(&metadata.xrctxt));
        let mut xr_cap = Vec::with_capacity(p_pub_key.r.len());
        for (attr, xr_tilde) in &xr_tildes {
            let x = metadata.xr.get(attr).ok_or_else(|| {
                err_msg(
                    ErrorKind::Unexpected,
                    format!("Missing key metadata for attribute '{}'", attr),
                )
            })?;
            xr_cap.push((attr.clone(), xr_tilde.add(&c.mul(x))));
        }

        Ok(CredentialKeyCorrectnessProof {
            c,
            xz_cap,
            xrctxt_cap,
            xr_cap,
        })
    }

    /// Checks the holder's blinding proof and produces the blind
    /// signature plus its correctness proof.
    ///
    /// `m_2` is the credential context, signed under `rctxt`.
    /// `offer_nonce` bound the blinding proof; `request_nonce` binds the
    /// signature correctness proof for the holder.
    #[allow(clippy::too_many_arguments)]
    pub fn sign_credential<R: Rng + CryptoRng>(
        m_2: &BigNumber,
        blinded_secrets: &BlindedCredentialSecrets,
        blinded_secrets_proof: &BlindedCredentialSecretsCorrectnessProof,
        offer_nonce: &Nonce,
        request_nonce: &Nonce,
        credential_values: &CredentialValues,
        p_pub_key: &CredentialPrimaryPublicKey,
        p_priv_key: &CredentialPrimaryPrivateKey,
        rng: &mut R,
    ) -> Result<(CredentialSignature, SignatureCorrectnessProof)> {
        trace!(
            "Issuer::sign_credential: >>> blinded_secrets: {:?}, values: {:?}",
            blinded_secrets,
            secret!(credential_values)
        );

        Self::check_blinded_secrets_proof(
            blinded_secrets,
            blinded_secrets_proof,
            offer_nonce,
            p_pub_key,
        )?;

        let n = &p_pub_key.n;
        let order = p_priv_key.p.mul(&p_priv_key.q);

        let e_start = BigNumber::pow_of_two(LARGE_E_START);
        let e = generate_prime_in_range(&e_start, LARGE_E_END_RANGE, rng)?;
        let mut v = BigNumber::rand(LARGE_VPRIME_PRIME, rng);
        v.set_bit(LARGE_VPRIME_PRIME - 1);

        // q = z / (u * s^v * rctxt^m2 * prod r_i^m_i) over the known values;
        // the hidden values are already inside u
        let mut denominator = blinded_secrets
            .u
            .mod_mul(&p_pub_key.s.mod_exp(&v, n)?, n)?;
        denominator = denominator.mod_mul(&p_pub_key.rctxt.mod_exp(m_2, n)?, n)?;
        for (attr, value) in &credential_values.attrs_values {
            if !value.is_known() {
                continue;
            }
            let cur_r = p_pub_key.r.get(attr).ok_or_else(|| {
                input_err(format!("Attribute '{}' is not part of the public key", attr))
            })?;
            denominator = denominator.mod_mul(&cur_r.mod_exp(value.value(), n)?, n)?;
        }
        let q = p_pub_key.z.mod_div(&denominator, n)?;

        let e_inverse = e.inverse(&order)?;
        let a = q.mod_exp(&e_inverse, n)?;

        // signature correctness proof, bound to the holder's nonce
        let r = BigNumber::rand_range(&order, rng)?;
        let a_cap = q.mod_exp(&r, n)?;
        let c = get_hash_as_int(&[
            q.to_bytes(),
            a.to_bytes(),
            a_cap.to_bytes(),
            request_nonce.as_bignum().to_bytes(),
        ]);
        let se = r.sub(&c.mul(&e_inverse)).modulus(&order)?;

        let signature = CredentialSignature {
            p_credential: PrimaryCredentialSignature {
                m_2: m_2.clone(),
                a,
                e,
                v,
            },
        };
        let proof = SignatureCorrectnessProof { se, c };

        trace!("Issuer::sign_credential: <<< signature: {:?}", secret!(&signature));
        Ok((signature, proof))
    }

    /// Verifies the holder's proof of correct blinding against the
    /// nonce from the credential offer.
    fn check_blinded_secrets_proof(
        blinded_secrets: &BlindedCredentialSecrets,
        proof: &BlindedCredentialSecretsCorrectnessProof,
        offer_nonce: &Nonce,
        p_pub_key: &CredentialPrimaryPublicKey,
    ) -> Result<()> {
        let n = &p_pub_key.n;

        let neg_c = BigNumber::zero().sub(&proof.c);
        let mut u_cap = blinded_secrets
            .u
            .mod_exp(&neg_c, n)?
            .mod_mul(&p_pub_key.s.mod_exp(&proof.v_dash_cap, n)?, n)?;
        for attr in &blinded_secrets.hidden_attributes {
            let cur_r = p_pub_key.r.get(attr).ok_or_else(|| {
                input_err(format!("Attribute '{}' is not part of the public key", attr))
            })?;
            let m_cap = proof.m_caps.get(attr).ok_or_else(|| {
                err_msg(
                    ErrorKind::InvalidRequestProof,
                    format!("Missing response for hidden attribute '{}'", attr),
                )
            })?;
            u_cap = u_cap.mod_mul(&cur_r.mod_exp(m_cap, n)?, n)?;
        }

        let c = get_hash_as_int(&[
            blinded_secrets.u.to_bytes(),
            u_cap.to_bytes(),
            offer_nonce.as_bignum().to_bytes(),
        ]);

        if c != proof.c {
            return Err(err_msg(
                ErrorKind::InvalidRequestProof,
                "Blinded credential secrets correctness proof does not verify",
            ));
        }
        Ok(())
    }
}

/// Random exponent in [2, order); used for every discrete log the key
/// generation draws.
pub(super) fn gen_x<R: Rng + CryptoRng>(order: &BigNumber, rng: &mut R) -> Result<BigNumber> {
    let two = BigNumber::from_u32(2);
    let range = order.sub(&two);
    Ok(BigNumber::rand_range(&range, rng)?.add(&two))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cl::mocks;
    use crate::cl::prover::Prover;
    use rand::rngs::StdRng;
    use rand::SeedableRng;

    #[test]
    fn key_generation_produces_bases_for_all_attributes() {
        let (p_pub_key, p_priv_key, _) = mocks::credential_def();
        assert_eq!(
            p_pub_key.n,
            BigNumber::from_dec(mocks::SAFE_PRIME_1024_A)
                .unwrap()
                .mul(&BigNumber::from_dec(mocks::SAFE_PRIME_1024_B).unwrap())
        );
        assert!(p_pub_key.r.contains_key("name"));
        assert!(p_pub_key.r.contains_key("age"));
        assert!(p_pub_key.r.contains_key(LINK_SECRET_NAME));
        // private key holds the Sophie Germain halves
        let two = BigNumber::from_u32(2);
        assert_eq!(
            p_priv_key.p.mul(&two).add(&BigNumber::one()),
            BigNumber::from_dec(mocks::SAFE_PRIME_1024_A).unwrap()
        );
    }

    #[test]
    fn key_correctness_proof_verifies() {
        let (p_pub_key, _, proof) = mocks::credential_def();
        Prover::check_credential_key_correctness_proof(&p_pub_key, &proof).unwrap();
    }

    #[test]
    fn key_correctness_proof_rejects_mutated_component() {
        let (mut p_pub_key, _, proof) = mocks::credential_def();
        p_pub_key.z = p_pub_key.z.add(&BigNumber::one());
        assert_kind!(
            ErrorKind::PublicKeyMalformed,
            Prover::check_credential_key_correctness_proof(&p_pub_key, &proof)
        );
    }

    #[test]
    fn key_correctness_proof_rejects_mutated_response() {
        let (p_pub_key, _, mut proof) = mocks::credential_def();
        proof.xz_cap = proof.xz_cap.add(&BigNumber::one());
        assert_kind!(
            ErrorKind::PublicKeyMalformed,
            Prover::check_credential_key_correctness_proof(&p_pub_key, &proof)
        );
    }

    #[test]
    fn rejects_empty_schema() {
        let mut rng = StdRng::seed_from_u64(5);
        let schema = CredentialSchemaBuilder::new().finalize();
        let result = Issuer::new_credential_def_from_primes(
            &schema,
            &mocks::non_credential_schema(),
            &BigNumber::from_dec(mocks::SAFE_PRIME_256_A).unwrap(),
            &BigNumber::from_dec(mocks::SAFE_PRIME_256_B).unwrap(),
            &mut rng,
        );
        assert_kind!(ErrorKind::Input, result);
    }

    #[test]
    fn rejects_unsafe_primes() {
        let mut rng = StdRng::seed_from_u64(6);
        let result = Issuer::new_credential_def_from_primes(
            &mocks::credential_schema(),
            &mocks::non_credential_schema(),
            &BigNumber::from_dec("104729").unwrap(),
            &BigNumber::from_dec(mocks::SAFE_PRIME_256_B).unwrap(),
            &mut rng,
        );
        assert_kind!(ErrorKind::KeyGeneration, result);
    }

    #[test]
    fn sign_rejects_wrong_blinding_nonce() {
        let mut rng = StdRng::seed_from_u64(7);
        let (p_pub_key, p_priv_key, _) = mocks::credential_def();
        let link_secret = BigNumber::rand(LARGE_LINK_SECRET, &mut rng);
        let offer_nonce = Nonce::new(&mut rng);
        let (blinded, _factors, blinded_proof) = Prover::blind_credential_secrets(
            &p_pub_key,
            &mocks::credential_values(&link_secret),
            &offer_nonce,
            &mut rng,
        )
        .unwrap();
        let wrong_nonce = Nonce::new(&mut rng);
        let result = Issuer::sign_credential(
            &BigNumber::rand(LARGE_LINK_SECRET, &mut rng),
            &blinded,
            &blinded_proof,
            &wrong_nonce,
            &Nonce::new(&mut rng),
            &mocks::credential_values(&link_secret),
            &p_pub_key,
            &p_priv_key,
            &mut rng,
        );
        assert_kind!(ErrorKind::InvalidRequestProof, result);
    }
}
