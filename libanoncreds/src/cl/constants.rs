/// Bit lengths for the CL signature scheme. These track the published
/// parameterization of the Idemix/AnonCreds primary credential protocol;
/// changing any of them breaks interoperability with existing
/// credentials and proofs.

pub const LARGE_PRIME: u64 = 1024;
pub const LARGE_LINK_SECRET: u64 = 256;
pub const LARGE_NONCE: u64 = 80;

pub const LARGE_VPRIME: u64 = 2128;
pub const LARGE_VPRIME_PRIME: u64 = 2724;
pub const LARGE_E_START: u64 = 596;
pub const LARGE_E_END_RANGE: u64 = 119;

pub const LARGE_ETILDE: u64 = 456;
pub const LARGE_VTILDE: u64 = 3060;
pub const LARGE_MTILDE: u64 = 593;
pub const LARGE_M2_TILDE: u64 = 593;
pub const LARGE_VPRIME_TILDE: u64 = 673;

pub const LARGE_UTILDE: u64 = 592;
pub const LARGE_RTILDE: u64 = 672;
pub const LARGE_ALPHATILDE: u64 = 2787;

/// Upper bound on schema attributes for a single credential definition.
pub const MAX_ATTRIBUTES_COUNT: usize = 125;

pub const LINK_SECRET_NAME: &str = "link_secret";
