//! HTTP gateway: every backend call goes through [`HttpGateway`].
//!
//! Outbound, the gateway attaches the session's bearer token and, when that
//! token is close to expiry, starts a renewal in the background. Inbound, it
//! sorts failures into auth failures (which the navigation layer turns into a
//! login redirect) and plain rejections the caller handles itself.
//!
//! The gateway never navigates. Redirect decisions travel back as
//! [`GatewayError::Unauthorized`] and renewal outcomes as [`SessionEvent`]s.

pub mod client;
pub mod error;
pub mod events;
pub mod inbound;

pub use {
    client::HttpGateway,
    error::GatewayError,
    events::{SessionEvent, SessionEvents},
    inbound::{InboundVerdict, classify},
};
