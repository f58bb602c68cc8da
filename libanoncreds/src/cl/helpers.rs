use std::collections::BTreeMap;

use super::CredentialPrimaryPublicKey;
use crate::common::error::prelude::*;
use crate::math::hash::hash_list_to_bignum;
use crate::math::BigNumber;

pub const ITERATION: usize = 4;

/// Challenge hash shared by every Fiat-Shamir step.
pub fn get_hash_as_int(values: &[Vec<u8>]) -> BigNumber {
    hash_list_to_bignum(values)
}

/// t-value of the equality proof:
/// `a'^e * Π r_j^m_j (unrevealed) * s^v * rctxt^m2 mod n`.
///
/// The prover calls this with tilde values to commit, the verifier with
/// cap values to check.
pub fn calc_teq(
    p_pub_key: &CredentialPrimaryPublicKey,
    a_prime: &BigNumber,
    e: &BigNumber,
    v: &BigNumber,
    m_tilde: &BTreeMap<String, BigNumber>,
    m2_tilde: &BigNumber,
    unrevealed_attrs: &[String],
) -> Result<BigNumber> {
    let mut result = a_prime.mod_exp(e, &p_pub_key.n)?;

    for attr in unrevealed_attrs {
        let cur_r = p_pub_key.r.get(attr).ok_or_else(|| {
            input_err(format!("Value by key '{}' not found in pk.r", attr))
        })?;
        let cur_m = m_tilde.get(attr).ok_or_else(|| {
            input_err(format!("Value by key '{}' not found in m_tilde", attr))
        })?;
        result = result.mod_mul(&cur_r.mod_exp(cur_m, &p_pub_key.n)?, &p_pub_key.n)?;
    }

    result = result.mod_mul(&p_pub_key.s.mod_exp(v, &p_pub_key.n)?, &p_pub_key.n)?;
    result = result.mod_mul(&p_pub_key.rctxt.mod_exp(m2_tilde, &p_pub_key.n)?, &p_pub_key.n)?;
    Ok(result)
}

/// tau-values of an inequality proof, in the order
/// `[tau_0..tau_3, tau_delta, Q]`:
///
/// - `tau_i     = z^u_i * s^r_i mod n`
/// - `tau_delta = z^mj * s^(±r_delta) mod n` (negative for `<=`/`<`)
/// - `Q         = s^alpha * Π t_i^u_i mod n`
pub fn calc_tge(
    p_pub_key: &CredentialPrimaryPublicKey,
    u: &BTreeMap<String, BigNumber>,
    r: &BTreeMap<String, BigNumber>,
    mj: &BigNumber,
    alpha: &BigNumber,
    t: &BTreeMap<String, BigNumber>,
    is_less: bool,
) -> Result<Vec<BigNumber>> {
    let mut tau_list = Vec::with_capacity(ITERATION + 2);

    for i in 0..ITERATION {
        let key = i.to_string();
        let cur_u = u
            .get(&key)
            .ok_or_else(|| input_err(format!("Value by key '{}' not found in u", key)))?;
        let cur_r = r
            .get(&key)
            .ok_or_else(|| input_err(format!("Value by key '{}' not found in r", key)))?;
        let t_tau = p_pub_key
            .z
            .mod_exp(cur_u, &p_pub_key.n)?
            .mod_mul(&p_pub_key.s.mod_exp(cur_r, &p_pub_key.n)?, &p_pub_key.n)?;
        tau_list.push(t_tau);
    }

    let delta = r
        .get("DELTA")
        .ok_or_else(|| input_err("Value by key 'DELTA' not found in r"))?;
    let delta_predicate = if is_less {
        BigNumber::zero().sub(delta)
    } else {
        delta.clone()
    };
    let t_tau = p_pub_key
        .z
        .mod_exp(mj, &p_pub_key.n)?
        .mod_mul(&p_pub_key.s.mod_exp(&delta_predicate, &p_pub_key.n)?, &p_pub_key.n)?;
    tau_list.push(t_tau);

    let mut q = p_pub_key.s.mod_exp(alpha, &p_pub_key.n)?;
    for i in 0..ITERATION {
        let key = i.to_string();
        let cur_t = t
            .get(&key)
            .ok_or_else(|| input_err(format!("Value by key '{}' not found in t", key)))?;
        let cur_u = u
            .get(&key)
            .ok_or_else(|| input_err(format!("Value by key '{}' not found in u", key)))?;
        q = cur_t.mod_exp(cur_u, &p_pub_key.n)?.mod_mul(&q, &p_pub_key.n)?;
    }
    tau_list.push(q);

    Ok(tau_list)
}

fn isqrt(n: u64) -> u64 {
    let mut x = (n as f64).sqrt() as u64;
    while x.checked_mul(x).map_or(true, |sq| sq > n) {
        x -= 1;
    }
    while (x + 1).checked_mul(x + 1).map_or(false, |sq| sq <= n) {
        x += 1;
    }
    x
}

/// Lagrange four-square decomposition of a non-negative delta. Searching
/// from the largest admissible root down terminates quickly for the
/// predicate gaps seen in practice.
pub fn four_squares(delta: i32) -> Result<[u64; 4]> {
    if delta < 0 {
        return Err(input_err(format!(
            "Cannot express a negative number as sum of four squares: {}",
            delta
        )));
    }
    let d = delta as u64;
    for a in (0..=isqrt(d)).rev() {
        let r1 = d - a * a;
        for b in (0..=isqrt(r1)).rev() {
            let r2 = r1 - b * b;
            for c in (0..=isqrt(r2)).rev() {
                let r3 = r2 - c * c;
                let e = isqrt(r3);
                if e * e == r3 {
                    return Ok([a, b, c, e]);
                }
            }
        }
    }
    Err(err_msg(
        ErrorKind::Unexpected,
        format!("Four-square decomposition failed for {}", delta),
    ))
}
