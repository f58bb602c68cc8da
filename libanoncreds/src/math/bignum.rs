use std::fmt;
use std::str::FromStr;

use num_bigint::{BigInt, BigUint, RandBigInt, Sign};
use num_traits::{One, Signed, Zero};
use rand::{CryptoRng, Rng};
use serde::{de, Deserialize, Deserializer, Serialize, Serializer};

use crate::common::error::prelude::*;

/// Arbitrary-precision signed integer used throughout the CL protocol
/// engine. Serializes to and from decimal strings so that signature and
/// proof components survive JSON without precision loss.
#[derive(Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Default)]
pub struct BigNumber {
    value: BigInt,
}

impl BigNumber {
    pub fn zero() -> BigNumber {
        BigNumber {
            value: BigInt::zero(),
        }
    }

    pub fn one() -> BigNumber {
        BigNumber {
            value: BigInt::one(),
        }
    }

    pub fn from_u32(value: u32) -> BigNumber {
        BigNumber {
            value: BigInt::from(value),
        }
    }

    pub fn from_i32(value: i32) -> BigNumber {
        BigNumber {
            value: BigInt::from(value),
        }
    }

    pub fn from_dec(value: &str) -> Result<BigNumber> {
        let value = BigInt::from_str(value.trim())
            .map_input_err(|| format!("Invalid decimal big number: {:?}", value))?;
        Ok(BigNumber { value })
    }

    /// Interprets `bytes` as an unsigned big-endian integer.
    pub fn from_bytes(bytes: &[u8]) -> BigNumber {
        BigNumber {
            value: BigInt::from_bytes_be(Sign::Plus, bytes),
        }
    }

    pub fn to_dec(&self) -> String {
        self.value.to_str_radix(10)
    }

    /// Big-endian bytes of the magnitude. All protocol values hashed or
    /// transmitted this way are non-negative.
    pub fn to_bytes(&self) -> Vec<u8> {
        self.value.magnitude().to_bytes_be()
    }

    pub fn bits(&self) -> u64 {
        self.value.bits()
    }

    pub fn is_zero(&self) -> bool {
        self.value.is_zero()
    }

    pub fn is_negative(&self) -> bool {
        self.value.is_negative()
    }

    pub fn set_bit(&mut self, index: u64) {
        self.value.set_bit(index, true)
    }

    pub fn add(&self, other: &BigNumber) -> BigNumber {
        BigNumber {
            value: &self.value + &other.value,
        }
    }

    pub fn sub(&self, other: &BigNumber) -> BigNumber {
        BigNumber {
            value: &self.value - &other.value,
        }
    }

    pub fn mul(&self, other: &BigNumber) -> BigNumber {
        BigNumber {
            value: &self.value * &other.value,
        }
    }

    /// Arithmetic right shift by one bit.
    pub fn rshift1(&self) -> BigNumber {
        BigNumber {
            value: &self.value >> 1u32,
        }
    }

    /// 2^exp as a big number.
    pub fn pow_of_two(exp: u64) -> BigNumber {
        BigNumber {
            value: BigInt::one() << (exp as usize),
        }
    }

    /// Euclidean remainder: always in [0, modulus).
    pub fn modulus(&self, modulus: &BigNumber) -> Result<BigNumber> {
        if modulus.value.is_zero() || modulus.value.is_negative() {
            return Err(input_err("Modulus must be positive"));
        }
        let mut rem = &self.value % &modulus.value;
        if rem.is_negative() {
            rem += &modulus.value;
        }
        Ok(BigNumber { value: rem })
    }

    /// Modular exponentiation. A negative exponent inverts the base first,
    /// so proof verification can raise commitments to `-c` directly.
    pub fn mod_exp(&self, exp: &BigNumber, modulus: &BigNumber) -> Result<BigNumber> {
        if modulus.value.is_zero() || modulus.value.is_negative() {
            return Err(input_err("Modulus must be positive"));
        }
        let base = self.modulus(modulus)?;
        if exp.value.is_negative() {
            let inverse = base.inverse(modulus)?;
            let abs_exp = BigNumber {
                value: exp.value.abs(),
            };
            return inverse.mod_exp(&abs_exp, modulus);
        }
        Ok(BigNumber {
            value: base.value.modpow(&exp.value, &modulus.value),
        })
    }

    pub fn mod_mul(&self, other: &BigNumber, modulus: &BigNumber) -> Result<BigNumber> {
        BigNumber {
            value: &self.value * &other.value,
        }
        .modulus(modulus)
    }

    /// self * other^-1 mod modulus
    pub fn mod_div(&self, other: &BigNumber, modulus: &BigNumber) -> Result<BigNumber> {
        self.mod_mul(&other.inverse(modulus)?, modulus)
    }

    pub fn inverse(&self, modulus: &BigNumber) -> Result<BigNumber> {
        if modulus.value.is_zero() || modulus.value.is_negative() {
            return Err(input_err("Modulus must be positive"));
        }
        self.value
            .modinv(&modulus.value)
            .map(|value| BigNumber { value })
            .ok_or_else(|| input_err("No modular inverse exists"))
    }

    /// Uniformly random value of at most `bits` bits.
    pub fn rand<R: Rng + CryptoRng>(bits: u64, rng: &mut R) -> BigNumber {
        BigNumber {
            value: BigInt::from(rng.gen_biguint(bits)),
        }
    }

    /// Uniformly random value in [0, limit).
    pub fn rand_range<R: Rng + CryptoRng>(limit: &BigNumber, rng: &mut R) -> Result<BigNumber> {
        let limit_uint: &BigUint = limit.value.magnitude();
        if limit.value.is_negative() || limit_uint.is_zero() {
            return Err(input_err("Random range limit must be positive"));
        }
        Ok(BigNumber {
            value: BigInt::from(rng.gen_biguint_below(limit_uint)),
        })
    }
}

impl fmt::Debug for BigNumber {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.to_dec())
    }
}

impl fmt::Display for BigNumber {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.to_dec())
    }
}

impl Serialize for BigNumber {
    fn serialize<S>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        serializer.serialize_str(&self.to_dec())
    }
}

impl<'de> Deserialize<'de> for BigNumber {
    fn deserialize<D>(deserializer: D) -> std::result::Result<Self, D::Error>
    where
        D: Deserializer<'de>,
    {
        let raw = String::deserialize(deserializer)?;
        BigNumber::from_dec(&raw).map_err(de::Error::custom)
    }
}

impl From<u32> for BigNumber {
    fn from(value: u32) -> Self {
        BigNumber::from_u32(value)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::rngs::StdRng;
    use rand::SeedableRng;

    #[test]
    fn dec_round_trip() {
        let n = BigNumber::from_dec("123456789012345678901234567890").unwrap();
        assert_eq!(n.to_dec(), "123456789012345678901234567890");
        assert!(BigNumber::from_dec("not a number").is_err());
    }

    #[test]
    fn serde_uses_decimal_strings() {
        let n = BigNumber::from_dec("98765432109876543210").unwrap();
        let json = serde_json::to_string(&n).unwrap();
        assert_eq!(json, "\"98765432109876543210\"");
        let back: BigNumber = serde_json::from_str(&json).unwrap();
        assert_eq!(back, n);
    }

    #[test]
    fn mod_exp_handles_negative_exponents() {
        let n = BigNumber::from_u32(101);
        let base = BigNumber::from_u32(7);
        let exp = BigNumber::from_u32(13);
        let pos = base.mod_exp(&exp, &n).unwrap();
        let neg_exp = BigNumber::zero().sub(&exp);
        let neg = base.mod_exp(&neg_exp, &n).unwrap();
        assert_eq!(pos.mod_mul(&neg, &n).unwrap(), BigNumber::one());
    }

    #[test]
    fn modulus_is_non_negative() {
        let n = BigNumber::from_u32(13);
        let v = BigNumber::from_i32(-5);
        assert_eq!(v.modulus(&n).unwrap(), BigNumber::from_u32(8));
    }

    #[test]
    fn inverse_round_trips() {
        let n = BigNumber::from_dec("104729").unwrap();
        let v = BigNumber::from_dec("12345").unwrap();
        let inv = v.inverse(&n).unwrap();
        assert_eq!(v.mod_mul(&inv, &n).unwrap(), BigNumber::one());
    }

    #[test]
    fn rand_range_stays_below_limit() {
        let mut rng = StdRng::seed_from_u64(7);
        let limit = BigNumber::from_u32(1000);
        for _ in 0..100 {
            let v = BigNumber::rand_range(&limit, &mut rng).unwrap();
            assert!(v < limit);
            assert!(!v.is_negative());
        }
    }

    #[test]
    fn bytes_round_trip() {
        let n = BigNumber::from_dec("340282366920938463463374607431768211455").unwrap();
        assert_eq!(BigNumber::from_bytes(&n.to_bytes()), n);
    }
}
