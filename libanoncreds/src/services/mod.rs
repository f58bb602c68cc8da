//! High-level role APIs over the protocol core, working in terms of the
//! domain value objects.

pub mod helpers;
pub mod issuer;
pub mod prover;
pub mod verifier;
