use rand::{CryptoRng, Rng};

use crate::cl::prover::Prover;
use crate::math::BigNumber;

/// Holder-private value binding all of a holder's credentials to one
/// identity. Generated once, never transmitted.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct LinkSecret {
    pub value: BigNumber,
}

impl LinkSecret {
    pub fn new<R: Rng + CryptoRng>(rng: &mut R) -> LinkSecret {
        LinkSecret {
            value: Prover::new_link_secret(rng),
        }
    }

    pub fn value(&self) -> &BigNumber {
        &self.value
    }
}
