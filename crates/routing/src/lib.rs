//! Client-side routing: route table, the auth guard run before each
//! navigation, and the [`Navigator`] that performs redirects.

pub mod guard;
pub mod location;
pub mod navigator;
pub mod routes;

pub use {
    guard::{GuardDecision, RouteGuard, SessionCheck},
    location::Location,
    navigator::{Dialog, LogDialog, NavigationOutcome, Navigator},
    routes::{RouteRecord, RouteTable},
};
