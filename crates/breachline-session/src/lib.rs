//! Identity seam for Breachline.
//!
//! Breachline does not own accounts or credentials. The identity provider
//! does, and all the core needs from it is "which user is behind this
//! token". That question is the [`Authenticator`] trait.
//!
//! [`TokenAuthenticator`] is the in-process implementation used by tests
//! and the reference server: a table of issued bearer tokens, with an
//! optional development mode that accepts the token itself as the uid.

#![allow(async_fn_in_trait)]

mod auth;
mod error;

pub use auth::{Authenticator, TokenAuthenticator};
pub use error::SessionError;
