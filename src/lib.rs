//! # Folio (Leaf Health Portal)
//!
//! `folio` is a small web portal: users register and log in, upload a leaf
//! photo and get a binary Defective/Healthy verdict from an externally hosted
//! scoring model, and recover forgotten passwords through emailed one-time
//! codes.
//!
//! ## Layout
//!
//! Modules follow the request path:
//!
//! - [`cli`] parses configuration, initializes telemetry and boots the server.
//! - [`api`] wires the routes and renders the form pages.
//! - [`flow`] drives the register/login/forgot/verify/reset state machine.
//! - [`store`] is the credential repository (flat file in production, an
//!   in-memory fake for tests and local hacking).
//! - [`session`] keeps per-client identity and pending-reset state behind an
//!   opaque cookie token.
//! - [`mail`] dispatches one-time codes through a relay, or logs them when no
//!   relay is configured.
//! - [`classify`] preprocesses uploads and thresholds the score returned by
//!   the remote model.
//!
//! ## Hardening vs the classic flat-file portal
//!
//! Passwords are stored as Argon2id hashes, store mutations are serialized
//! behind a writer lock, and fields that would corrupt the line format are
//! rejected at the boundary. Everything else (verbatim OTP comparison, no
//! session expiry, full-file rewrite on reset) matches the classic behavior.

pub mod api;
pub mod classify;
pub mod cli;
pub mod error;
pub mod flow;
pub mod mail;
pub mod session;
pub mod store;

#[allow(clippy::doc_markdown, clippy::needless_raw_string_hashes)]
pub mod built_info {
    include!(concat!(env!("OUT_DIR"), "/built.rs"));
}

pub const GIT_COMMIT_HASH: &str = match built_info::GIT_COMMIT_HASH {
    Some(hash) => hash,
    None => "unknown",
};

pub const APP_USER_AGENT: &str = concat!(env!("CARGO_PKG_NAME"), "/", env!("CARGO_PKG_VERSION"),);
