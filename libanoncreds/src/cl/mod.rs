//! CL signature protocol core: value types shared between the issuer,
//! prover and verifier roles, plus the per-role operation modules.
//!
//! Everything here works over [`BigNumber`] values. Maps are `BTreeMap`s
//! so that challenge hashes see attribute bases and responses in one
//! deterministic order on both sides of the protocol.

use std::collections::{BTreeMap, BTreeSet};

use rand::{CryptoRng, Rng};

use crate::common::error::prelude::*;
use crate::math::BigNumber;

pub mod constants;
pub mod helpers;
pub mod issuer;
pub mod prover;
pub mod verifier;

pub use constants::LINK_SECRET_NAME;

/// 80-bit freshness value binding Fiat-Shamir challenges to one
/// protocol exchange.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Nonce(pub BigNumber);

impl Nonce {
    pub fn new<R: Rng + CryptoRng>(rng: &mut R) -> Nonce {
        Nonce(BigNumber::rand(constants::LARGE_NONCE, rng))
    }

    pub fn as_bignum(&self) -> &BigNumber {
        &self.0
    }
}

/// The attribute names a credential definition signs over.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CredentialSchema {
    pub attrs: BTreeSet<String>,
}

#[derive(Debug, Default)]
pub struct CredentialSchemaBuilder {
    attrs: BTreeSet<String>,
}

impl CredentialSchemaBuilder {
    pub fn new() -> CredentialSchemaBuilder {
        CredentialSchemaBuilder::default()
    }

    pub fn add_attr(&mut self, attr: &str) {
        self.attrs.insert(attr.to_owned());
    }

    pub fn finalize(self) -> CredentialSchema {
        CredentialSchema { attrs: self.attrs }
    }
}

/// Attributes signed blindly on the holder's behalf, currently just the
/// link secret.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NonCredentialSchema {
    pub attrs: BTreeSet<String>,
}

#[derive(Debug, Default)]
pub struct NonCredentialSchemaBuilder {
    attrs: BTreeSet<String>,
}

impl NonCredentialSchemaBuilder {
    pub fn new() -> NonCredentialSchemaBuilder {
        NonCredentialSchemaBuilder::default()
    }

    pub fn add_attr(&mut self, attr: &str) {
        self.attrs.insert(attr.to_owned());
    }

    pub fn finalize(self) -> NonCredentialSchema {
        NonCredentialSchema { attrs: self.attrs }
    }
}

/// A single attribute value as the protocol sees it: `Known` values are
/// signed in the clear, `Hidden` values only ever appear inside blinded
/// commitments.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CredentialValue {
    Known { value: BigNumber },
    Hidden { value: BigNumber },
}

impl CredentialValue {
    pub fn value(&self) -> &BigNumber {
        match self {
            CredentialValue::Known { value } => value,
            CredentialValue::Hidden { value } => value,
        }
    }

    pub fn is_known(&self) -> bool {
        matches!(self, CredentialValue::Known { .. })
    }

    pub fn is_hidden(&self) -> bool {
        matches!(self, CredentialValue::Hidden { .. })
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CredentialValues {
    pub attrs_values: BTreeMap<String, CredentialValue>,
}

#[derive(Debug, Default)]
pub struct CredentialValuesBuilder {
    attrs_values: BTreeMap<String, CredentialValue>,
}

impl CredentialValuesBuilder {
    pub fn new() -> CredentialValuesBuilder {
        CredentialValuesBuilder::default()
    }

    pub fn add_value_known(&mut self, attr: &str, value: BigNumber) {
        self.attrs_values
            .insert(attr.to_owned(), CredentialValue::Known { value });
    }

    pub fn add_value_hidden(&mut self, attr: &str, value: BigNumber) {
        self.attrs_values
            .insert(attr.to_owned(), CredentialValue::Hidden { value });
    }

    pub fn add_dec_known(&mut self, attr: &str, dec_value: &str) -> Result<()> {
        self.add_value_known(attr, BigNumber::from_dec(dec_value)?);
        Ok(())
    }

    pub fn add_dec_hidden(&mut self, attr: &str, dec_value: &str) -> Result<()> {
        self.add_value_hidden(attr, BigNumber::from_dec(dec_value)?);
        Ok(())
    }

    pub fn finalize(self) -> CredentialValues {
        CredentialValues {
            attrs_values: self.attrs_values,
        }
    }
}

/// Public half of an issuer's CL signing key.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CredentialPrimaryPublicKey {
    pub n: BigNumber,
    pub s: BigNumber,
    pub r: BTreeMap<String, BigNumber>,
    pub rctxt: BigNumber,
    pub z: BigNumber,
}

/// Private half. `p` and `q` are the Sophie Germain halves of the safe
/// primes forming `n`, so the group order of quadratic residues is `p*q`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CredentialPrimaryPrivateKey {
    pub p: BigNumber,
    pub q: BigNumber,
}

/// Per-key metadata the issuer keeps to prove the public key was formed
/// from a quadratic residue generator.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CredentialKeyMetadata {
    pub xz: BigNumber,
    pub xr: BTreeMap<String, BigNumber>,
    pub xrctxt: BigNumber,
}

/// Proof of knowledge of the discrete logs of `z`, `rctxt` and every
/// attribute base with respect to `s`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CredentialKeyCorrectnessProof {
    pub c: BigNumber,
    pub xz_cap: BigNumber,
    pub xrctxt_cap: BigNumber,
    pub xr_cap: Vec<(String, BigNumber)>,
}

/// Holder's commitment to their hidden attributes under an issuer key.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BlindedCredentialSecrets {
    pub u: BigNumber,
    pub hidden_attributes: BTreeSet<String>,
}

/// The blinding factor matching a [`BlindedCredentialSecrets`]; kept by
/// the holder, never transmitted.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CredentialSecretsBlindingFactors {
    pub v_prime: BigNumber,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BlindedCredentialSecretsCorrectnessProof {
    pub c: BigNumber,
    pub v_dash_cap: BigNumber,
    pub m_caps: BTreeMap<String, BigNumber>,
}

/// The blind CL signature triple plus the credential context `m_2`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PrimaryCredentialSignature {
    pub m_2: BigNumber,
    pub a: BigNumber,
    pub e: BigNumber,
    pub v: BigNumber,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CredentialSignature {
    pub p_credential: PrimaryCredentialSignature,
}

/// Issuer's proof that `a` was computed as the correct root of `q`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SignatureCorrectnessProof {
    pub se: BigNumber,
    pub c: BigNumber,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
pub enum PredicateType {
    #[serde(rename = ">=")]
    GE,
    #[serde(rename = "<=")]
    LE,
    #[serde(rename = ">")]
    GT,
    #[serde(rename = "<")]
    LT,
}

/// A numeric comparison to prove about a hidden attribute.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
pub struct Predicate {
    pub attr_name: String,
    pub p_type: PredicateType,
    pub value: i32,
}

impl Predicate {
    /// The non-negative gap proven by the inequality proof. Negative
    /// means the attribute does not satisfy the predicate.
    pub fn get_delta(&self, attr_value: i32) -> i32 {
        match self.p_type {
            PredicateType::GE => attr_value - self.value,
            PredicateType::GT => attr_value - self.value - 1,
            PredicateType::LE => self.value - attr_value,
            PredicateType::LT => self.value - 1 - attr_value,
        }
    }

    /// The public threshold the verifier plugs into the tau_delta
    /// equation.
    pub fn get_delta_prime(&self) -> i32 {
        match self.p_type {
            PredicateType::GE | PredicateType::LE => self.value,
            PredicateType::GT => self.value + 1,
            PredicateType::LT => self.value - 1,
        }
    }

    /// Upper-bound comparators flip the sign of the delta commitment.
    pub fn is_less(&self) -> bool {
        matches!(self.p_type, PredicateType::LE | PredicateType::LT)
    }
}

/// What a single credential must reveal or prove in a presentation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SubProofRequest {
    pub revealed_attrs: BTreeSet<String>,
    pub predicates: BTreeSet<Predicate>,
}

#[derive(Debug, Default)]
pub struct SubProofRequestBuilder {
    revealed_attrs: BTreeSet<String>,
    predicates: BTreeSet<Predicate>,
}

impl SubProofRequestBuilder {
    pub fn new() -> SubProofRequestBuilder {
        SubProofRequestBuilder::default()
    }

    pub fn add_revealed_attr(&mut self, attr: &str) {
        self.revealed_attrs.insert(attr.to_owned());
    }

    pub fn add_predicate(&mut self, attr: &str, p_type: PredicateType, value: i32) {
        self.predicates.insert(Predicate {
            attr_name: attr.to_owned(),
            p_type,
            value,
        });
    }

    pub fn finalize(self) -> SubProofRequest {
        SubProofRequest {
            revealed_attrs: self.revealed_attrs,
            predicates: self.predicates,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PrimaryEqualProof {
    pub revealed_attrs: BTreeMap<String, BigNumber>,
    pub a_prime: BigNumber,
    pub e: BigNumber,
    pub v: BigNumber,
    pub m: BTreeMap<String, BigNumber>,
    pub m2: BigNumber,
}

/// Inequality sub-proof. Map keys "0".."3" are the four-squares terms
/// and "DELTA" the gap commitment.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PrimaryPredicateInequalityProof {
    pub u: BTreeMap<String, BigNumber>,
    pub r: BTreeMap<String, BigNumber>,
    pub mj: BigNumber,
    pub alpha: BigNumber,
    pub t: BTreeMap<String, BigNumber>,
    pub predicate: Predicate,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PrimaryProof {
    pub eq_proof: PrimaryEqualProof,
    pub ge_proofs: Vec<PrimaryPredicateInequalityProof>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SubProof {
    pub primary_proof: PrimaryProof,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AggregatedProof {
    pub c_hash: BigNumber,
    pub c_list: Vec<Vec<u8>>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Proof {
    pub proofs: Vec<SubProof>,
    pub aggregated_proof: AggregatedProof,
}

/// Prover-side state between committing to an eq-proof and receiving
/// the aggregate challenge. Never serialized.
#[derive(Debug)]
pub struct PrimaryEqualInitProof {
    pub a_prime: BigNumber,
    pub t: BigNumber,
    pub e_tilde: BigNumber,
    pub e_prime: BigNumber,
    pub v_tilde: BigNumber,
    pub v_prime: BigNumber,
    pub m_tilde: BTreeMap<String, BigNumber>,
    pub m2_tilde: BigNumber,
    pub m2: BigNumber,
}

impl PrimaryEqualInitProof {
    pub fn as_c_list(&self) -> Vec<Vec<u8>> {
        vec![self.a_prime.to_bytes()]
    }

    pub fn as_tau_list(&self) -> Vec<Vec<u8>> {
        vec![self.t.to_bytes()]
    }
}

#[derive(Debug)]
pub struct PrimaryPredicateInequalityInitProof {
    pub c_list: Vec<BigNumber>,
    pub tau_list: Vec<BigNumber>,
    pub u: BTreeMap<String, BigNumber>,
    pub u_tilde: BTreeMap<String, BigNumber>,
    pub r: BTreeMap<String, BigNumber>,
    pub r_tilde: BTreeMap<String, BigNumber>,
    pub alpha_tilde: BigNumber,
    pub predicate: Predicate,
    pub t: BTreeMap<String, BigNumber>,
}

impl PrimaryPredicateInequalityInitProof {
    pub fn as_c_list(&self) -> Vec<Vec<u8>> {
        self.c_list.iter().map(BigNumber::to_bytes).collect()
    }

    pub fn as_tau_list(&self) -> Vec<Vec<u8>> {
        self.tau_list.iter().map(BigNumber::to_bytes).collect()
    }
}

#[derive(Debug)]
pub struct PrimaryInitProof {
    pub eq_proof: PrimaryEqualInitProof,
    pub ge_proofs: Vec<PrimaryPredicateInequalityInitProof>,
}

impl PrimaryInitProof {
    pub fn as_c_list(&self) -> Vec<Vec<u8>> {
        let mut c_list = self.eq_proof.as_c_list();
        for ge_proof in &self.ge_proofs {
            c_list.extend(ge_proof.as_c_list());
        }
        c_list
    }

    pub fn as_tau_list(&self) -> Vec<Vec<u8>> {
        let mut tau_list = self.eq_proof.as_tau_list();
        for ge_proof in &self.ge_proofs {
            tau_list.extend(ge_proof.as_tau_list());
        }
        tau_list
    }
}

#[cfg(test)]
pub mod mocks {
    //! Fixed safe primes so key-dependent tests avoid the cost of prime
    //! search. Both 1024-bit values are verified safe primes.

    use super::*;
    use crate::cl::issuer::Issuer;
    use rand::rngs::StdRng;
    use rand::SeedableRng;

    pub const SAFE_PRIME_1024_A: &str = "108900442682296815953957798039638798025094984989532608647178125740624215563087941855258896485714921174257162730910611177199729419103013763856265898514875161225456205000028168773775851831388019990897467132136806395603757796990823581522291074611748071305575017370092823691545692368127914289985135337607357740947";
    pub const SAFE_PRIME_1024_B: &str = "110183042886261806505662528499053872435390798403081748684354202390266918431678966606187520618094589578904941752057343389251336966691868180267088711712061458098956866837268064460569420656559889594534316898576893567355742383558460725615728456554564917986717994391387287779320015055455727860281092857598424652103";
    pub const SAFE_PRIME_256_A: &str =
        "72143764556143717037359489069663557754494628786598224977814095945032076071027";
    pub const SAFE_PRIME_256_B: &str =
        "107369694808397609838176758700489099244217849428702565963488144944359495415783";

    pub fn credential_schema() -> CredentialSchema {
        let mut builder = CredentialSchemaBuilder::new();
        builder.add_attr("name");
        builder.add_attr("age");
        builder.finalize()
    }

    pub fn non_credential_schema() -> NonCredentialSchema {
        let mut builder = NonCredentialSchemaBuilder::new();
        builder.add_attr(LINK_SECRET_NAME);
        builder.finalize()
    }

    pub fn credential_values(link_secret: &BigNumber) -> CredentialValues {
        let mut builder = CredentialValuesBuilder::new();
        builder.add_value_hidden(LINK_SECRET_NAME, link_secret.clone());
        builder.add_dec_known("name", "1139481716457488690172217916278103335").unwrap();
        builder.add_dec_known("age", "28").unwrap();
        builder.finalize()
    }

    pub type CredentialDefParts = (
        CredentialPrimaryPublicKey,
        CredentialPrimaryPrivateKey,
        CredentialKeyCorrectnessProof,
    );

    /// Deterministic credential definition over the fixed 1024-bit safe
    /// primes, shared by the tests in this module tree.
    pub fn credential_def() -> CredentialDefParts {
        lazy_static! {
            static ref CRED_DEF: CredentialDefParts = {
                let mut rng = StdRng::seed_from_u64(1024);
                Issuer::new_credential_def_from_primes(
                    &credential_schema(),
                    &non_credential_schema(),
                    &BigNumber::from_dec(SAFE_PRIME_1024_A).unwrap(),
                    &BigNumber::from_dec(SAFE_PRIME_1024_B).unwrap(),
                    &mut rng,
                )
                .unwrap()
            };
        }
        CRED_DEF.clone()
    }
}
