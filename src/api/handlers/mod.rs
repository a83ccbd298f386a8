//! Request handlers for the portal routes.
//!
//! Every handler resolves the caller's session first so the cookie is
//! issued on first contact, then hands the decision to [`crate::flow`] or
//! [`crate::classify`] and renders the outcome.

use axum::http::{HeaderValue, header::SET_COOKIE};
use axum::response::Response;

pub mod health;
pub mod index;
pub mod login;
pub mod logout;
pub mod register;
pub mod reset;

/// Attach a freshly minted session cookie, when one was issued.
fn with_session_cookie(mut response: Response, cookie: Option<HeaderValue>) -> Response {
    if let Some(cookie) = cookie {
        response.headers_mut().insert(SET_COOKIE, cookie);
    }

    response
}
