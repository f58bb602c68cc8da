pub mod bignum;
pub mod hash;
pub mod prime;

pub use bignum::BigNumber;
