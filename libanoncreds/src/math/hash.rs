use sha2::{Digest, Sha256};

use super::bignum::BigNumber;

/// SHA-256 over the concatenation of the big-endian encodings of the
/// given values, interpreted as an unsigned integer. This is the single
/// challenge-hash primitive used by every Fiat-Shamir step in the
/// protocol, so provers and verifiers must feed it values in the same
/// order.
pub fn hash_list_to_bignum(values: &[Vec<u8>]) -> BigNumber {
    let mut hasher = Sha256::new();
    for value in values {
        hasher.update(value);
    }
    BigNumber::from_bytes(&hasher.finalize())
}

pub fn sha256(data: &[u8]) -> Vec<u8> {
    Sha256::digest(data).to_vec()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn hash_is_order_sensitive() {
        let a = vec![1u8, 2, 3];
        let b = vec![4u8, 5, 6];
        let h1 = hash_list_to_bignum(&[a.clone(), b.clone()]);
        let h2 = hash_list_to_bignum(&[b, a]);
        assert_ne!(h1, h2);
    }

    #[test]
    fn hash_matches_flat_digest() {
        // splitting the input across list entries must not change the digest
        let joined = hash_list_to_bignum(&[vec![1u8, 2, 3, 4]]);
        let split = hash_list_to_bignum(&[vec![1u8, 2], vec![3u8, 4]]);
        assert_eq!(joined, split);
        assert_eq!(joined, BigNumber::from_bytes(&sha256(&[1, 2, 3, 4])));
    }
}
