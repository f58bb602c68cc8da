//! Serializable value objects exchanged between the issuer, holder and
//! verifier roles, with the canonical JSON field names.

pub mod credential;
pub mod credential_definition;
pub mod credential_offer;
pub mod credential_request;
pub mod link_secret;
pub mod presentation;
pub mod presentation_request;
pub mod schema;
