use num_bigint::{BigUint, RandBigInt};
use num_integer::Integer;
use num_traits::{One, Zero};
use rand::{CryptoRng, Rng};

use super::bignum::BigNumber;
use crate::common::error::prelude::*;

const MILLER_RABIN_ROUNDS: usize = 40;
// finding a 1024-bit safe prime takes on the order of 1e5 candidates
const SAFE_PRIME_ATTEMPTS: usize = 2_000_000;

lazy_static! {
    static ref SMALL_PRIMES: Vec<u32> = {
        // odd primes below 2000, found by trial division
        let mut primes = vec![3u32];
        let mut candidate = 5u32;
        while candidate < 2000 {
            if primes.iter().all(|p| candidate % p != 0) {
                primes.push(candidate);
            }
            candidate += 2;
        }
        primes
    };
}

fn passes_small_prime_sieve(n: &BigUint) -> bool {
    SMALL_PRIMES
        .iter()
        .all(|p| !(n % p).is_zero() || n == &BigUint::from(*p))
}

fn miller_rabin<R: Rng + CryptoRng>(n: &BigUint, rounds: usize, rng: &mut R) -> bool {
    let one = BigUint::one();
    let two = &one + &one;
    if n < &BigUint::from(4u32) {
        return n == &two || n == &BigUint::from(3u32);
    }
    if n.is_even() {
        return false;
    }
    let n_minus_one = n - &one;
    // n - 1 = 2^s * d with d odd
    let s = n_minus_one.trailing_zeros().unwrap_or(0);
    let d = &n_minus_one >> s;
    'witness: for _ in 0..rounds {
        let a = rng.gen_biguint_range(&two, &n_minus_one);
        let mut x = a.modpow(&d, n);
        if x == one || x == n_minus_one {
            continue;
        }
        for _ in 1..s {
            x = x.modpow(&two, n);
            if x == n_minus_one {
                continue 'witness;
            }
        }
        return false;
    }
    true
}

pub fn is_prime<R: Rng + CryptoRng>(n: &BigNumber, rng: &mut R) -> bool {
    if n.is_negative() {
        return false;
    }
    let n = BigUint::from_bytes_be(&n.to_bytes());
    if !passes_small_prime_sieve(&n) && n.bits() > 11 {
        return false;
    }
    miller_rabin(&n, MILLER_RABIN_ROUNDS, rng)
}

/// Random prime of exactly `bits` bits.
pub fn generate_prime<R: Rng + CryptoRng>(bits: u64, rng: &mut R) -> Result<BigNumber> {
    for _ in 0..SAFE_PRIME_ATTEMPTS {
        let mut candidate = rng.gen_biguint(bits);
        candidate.set_bit(bits - 1, true);
        candidate.set_bit(0, true);
        if !passes_small_prime_sieve(&candidate) {
            continue;
        }
        if miller_rabin(&candidate, MILLER_RABIN_ROUNDS, rng) {
            return Ok(BigNumber::from_bytes(&candidate.to_bytes_be()));
        }
    }
    Err(err_msg(
        ErrorKind::KeyGeneration,
        format!("Unable to generate a {}-bit prime", bits),
    ))
}

/// Random safe prime p = 2q + 1 of exactly `bits` bits, with q prime.
pub fn generate_safe_prime<R: Rng + CryptoRng>(bits: u64, rng: &mut R) -> Result<BigNumber> {
    let one = BigUint::one();
    for _ in 0..SAFE_PRIME_ATTEMPTS {
        // sample the Sophie Germain candidate q and derive p = 2q + 1
        let mut q = rng.gen_biguint(bits - 1);
        q.set_bit(bits - 2, true);
        q.set_bit(0, true);
        let p = (&q << 1u32) + &one;
        if !passes_small_prime_sieve(&q) || !passes_small_prime_sieve(&p) {
            continue;
        }
        if miller_rabin(&q, MILLER_RABIN_ROUNDS, rng) && miller_rabin(&p, MILLER_RABIN_ROUNDS, rng)
        {
            return Ok(BigNumber::from_bytes(&p.to_bytes_be()));
        }
    }
    Err(err_msg(
        ErrorKind::KeyGeneration,
        format!("Unable to generate a {}-bit safe prime", bits),
    ))
}

/// Random prime in [start, start + 2^range_bits).
pub fn generate_prime_in_range<R: Rng + CryptoRng>(
    start: &BigNumber,
    range_bits: u64,
    rng: &mut R,
) -> Result<BigNumber> {
    if start.is_negative() {
        return Err(err_msg(
            ErrorKind::KeyGeneration,
            "Prime range start must be non-negative",
        ));
    }
    let start_uint = BigUint::from_bytes_be(&start.to_bytes());
    for _ in 0..SAFE_PRIME_ATTEMPTS {
        let mut candidate = &start_uint + rng.gen_biguint(range_bits);
        candidate.set_bit(0, true);
        if !passes_small_prime_sieve(&candidate) {
            continue;
        }
        if miller_rabin(&candidate, MILLER_RABIN_ROUNDS, rng) {
            return Ok(BigNumber::from_bytes(&candidate.to_bytes_be()));
        }
    }
    Err(err_msg(
        ErrorKind::KeyGeneration,
        "Unable to generate a prime in the requested range",
    ))
}

pub fn is_safe_prime<R: Rng + CryptoRng>(p: &BigNumber, rng: &mut R) -> bool {
    if !is_prime(p, rng) {
        return false;
    }
    let q = BigUint::from_bytes_be(&p.sub(&BigNumber::one()).to_bytes()) >> 1u32;
    is_prime(&BigNumber::from_bytes(&q.to_bytes_be()), rng)
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::rngs::StdRng;
    use rand::SeedableRng;

    #[test]
    fn recognizes_known_primes() {
        let mut rng = StdRng::seed_from_u64(11);
        assert!(is_prime(&BigNumber::from_u32(104729), &mut rng));
        assert!(!is_prime(&BigNumber::from_u32(104730), &mut rng));
        assert!(is_prime(
            &BigNumber::from_dec("190766607836256563787680866036037599313").unwrap(),
            &mut rng
        ));
    }

    #[test]
    fn generates_primes_of_requested_size() {
        let mut rng = StdRng::seed_from_u64(12);
        let p = generate_prime(128, &mut rng).unwrap();
        assert_eq!(p.bits(), 128);
        assert!(is_prime(&p, &mut rng));
    }

    #[test]
    fn generates_safe_primes() {
        let mut rng = StdRng::seed_from_u64(13);
        let p = generate_safe_prime(128, &mut rng).unwrap();
        assert_eq!(p.bits(), 128);
        assert!(is_safe_prime(&p, &mut rng));
    }

    #[test]
    fn prime_in_range_stays_in_range() {
        let mut rng = StdRng::seed_from_u64(14);
        let start = BigNumber::pow_of_two(100);
        let p = generate_prime_in_range(&start, 40, &mut rng).unwrap();
        assert!(p >= start);
        assert!(p < start.add(&BigNumber::pow_of_two(40)));
        assert!(is_prime(&p, &mut rng));
    }
}
