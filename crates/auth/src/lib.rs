//! Session token handling: claim decoding, expiry arithmetic and the renewal
//! endpoint client.
//!
//! Tokens are JWTs issued by the chat backend. The client never verifies the
//! signature (it has no key); it only reads `exp` to decide when to renew.

pub mod claims;
pub mod errors;
pub mod renewal;

pub use {
    claims::{Claims, decode_claims, now_secs},
    errors::AuthError,
    renewal::TokenRenewer,
};
