//! Per-client session state behind an opaque cookie token.
//!
//! A session carries the authenticated username plus the transient reset
//! state (pending OTP and the email it was sent to). Tokens are UUIDs handed
//! out in a `HttpOnly` cookie and trusted on later requests; there is no
//! server-side expiry beyond process lifetime.

use axum::http::{
    HeaderMap, HeaderValue,
    header::{COOKIE, InvalidHeaderValue},
};
use std::collections::HashMap;
use tokio::sync::RwLock;
use uuid::Uuid;

pub const SESSION_COOKIE_NAME: &str = "folio_session";

#[derive(Debug, Default, Clone)]
pub struct Session {
    pub username: Option<String>,
    pub otp: Option<String>,
    pub reset_email: Option<String>,
}

pub struct SessionStore {
    sessions: RwLock<HashMap<Uuid, Session>>,
    secure_cookies: bool,
}

impl SessionStore {
    #[must_use]
    pub fn new(secure_cookies: bool) -> Self {
        Self {
            sessions: RwLock::new(HashMap::new()),
            secure_cookies,
        }
    }

    /// Resolve the client's session, creating one when the cookie is missing,
    /// malformed, or references a session this process does not know.
    /// Returns the session id and, for fresh sessions, the `Set-Cookie` value
    /// the response must carry.
    pub async fn resolve(&self, headers: &HeaderMap) -> (Uuid, Option<HeaderValue>) {
        if let Some(id) = extract_session_token(headers) {
            if self.sessions.read().await.contains_key(&id) {
                return (id, None);
            }
        }

        let id = Uuid::new_v4();
        self.sessions.write().await.insert(id, Session::default());
        (id, session_cookie(id, self.secure_cookies).ok())
    }

    pub async fn login(&self, id: Uuid, username: &str) {
        if let Some(session) = self.sessions.write().await.get_mut(&id) {
            session.username = Some(username.to_string());
        }
    }

    /// Clears the identity only; any pending reset state stays untouched.
    pub async fn logout(&self, id: Uuid) {
        if let Some(session) = self.sessions.write().await.get_mut(&id) {
            session.username = None;
        }
    }

    pub async fn current_user(&self, id: Uuid) -> Option<String> {
        self.sessions
            .read()
            .await
            .get(&id)
            .and_then(|session| session.username.clone())
    }

    pub async fn is_authenticated(&self, id: Uuid) -> bool {
        self.current_user(id).await.is_some()
    }

    pub async fn begin_reset(&self, id: Uuid, email: &str, otp: &str) {
        if let Some(session) = self.sessions.write().await.get_mut(&id) {
            session.reset_email = Some(email.to_string());
            session.otp = Some(otp.to_string());
        }
    }

    /// Verbatim string comparison against the stored code. Does not mutate
    /// the session; the code stays valid until the reset completes.
    pub async fn verify_otp(&self, id: Uuid, candidate: &str) -> bool {
        self.sessions
            .read()
            .await
            .get(&id)
            .and_then(|session| session.otp.as_deref())
            .is_some_and(|otp| otp == candidate)
    }

    pub async fn otp_pending(&self, id: Uuid) -> bool {
        self.sessions
            .read()
            .await
            .get(&id)
            .is_some_and(|session| session.otp.is_some())
    }

    pub async fn pending_reset_email(&self, id: Uuid) -> Option<String> {
        self.sessions
            .read()
            .await
            .get(&id)
            .and_then(|session| session.reset_email.clone())
    }

    pub async fn complete_reset(&self, id: Uuid) {
        if let Some(session) = self.sessions.write().await.get_mut(&id) {
            session.otp = None;
            session.reset_email = None;
        }
    }
}

fn extract_session_token(headers: &HeaderMap) -> Option<Uuid> {
    let header = headers.get(COOKIE)?;
    let value = header.to_str().ok()?;
    for pair in value.split(';') {
        let trimmed = pair.trim();
        let mut parts = trimmed.splitn(2, '=');
        let Some(key) = parts.next() else { continue };
        let Some(val) = parts.next() else { continue };
        if key.trim() == SESSION_COOKIE_NAME {
            return Uuid::parse_str(val.trim()).ok();
        }
    }
    None
}

/// Build the `HttpOnly` cookie carrying the session token.
fn session_cookie(id: Uuid, secure: bool) -> Result<HeaderValue, InvalidHeaderValue> {
    let mut cookie = format!("{SESSION_COOKIE_NAME}={id}; Path=/; HttpOnly; SameSite=Lax");
    if secure {
        cookie.push_str("; Secure");
    }
    HeaderValue::from_str(&cookie)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn headers_with_cookie(value: &str) -> HeaderMap {
        let mut headers = HeaderMap::new();
        headers.insert(COOKIE, HeaderValue::from_str(value).expect("cookie value"));
        headers
    }

    #[tokio::test]
    async fn test_resolve_creates_session_and_cookie() {
        let store = SessionStore::new(false);
        let (id, cookie) = store.resolve(&HeaderMap::new()).await;

        let cookie = cookie.expect("fresh session sets a cookie");
        let cookie = cookie.to_str().expect("ascii cookie");
        assert!(cookie.starts_with(&format!("{SESSION_COOKIE_NAME}={id}")));
        assert!(cookie.contains("HttpOnly"));
        assert!(cookie.contains("SameSite=Lax"));
        assert!(!cookie.contains("Secure"));
    }

    #[tokio::test]
    async fn test_secure_flag_present_when_configured() {
        let store = SessionStore::new(true);
        let (_, cookie) = store.resolve(&HeaderMap::new()).await;
        let cookie = cookie.expect("fresh session sets a cookie");
        assert!(cookie.to_str().expect("ascii cookie").contains("; Secure"));
    }

    #[tokio::test]
    async fn test_resolve_reuses_known_session() {
        let store = SessionStore::new(false);
        let (id, _) = store.resolve(&HeaderMap::new()).await;

        let headers = headers_with_cookie(&format!("{SESSION_COOKIE_NAME}={id}"));
        let (resolved, cookie) = store.resolve(&headers).await;
        assert_eq!(resolved, id);
        assert!(cookie.is_none());
    }

    #[tokio::test]
    async fn test_unknown_token_gets_a_fresh_session() {
        let store = SessionStore::new(false);
        let stranger = Uuid::new_v4();
        let headers = headers_with_cookie(&format!("{SESSION_COOKIE_NAME}={stranger}"));

        let (resolved, cookie) = store.resolve(&headers).await;
        assert_ne!(resolved, stranger);
        assert!(cookie.is_some());
    }

    #[tokio::test]
    async fn test_malformed_token_gets_a_fresh_session() {
        let store = SessionStore::new(false);
        let headers = headers_with_cookie(&format!("{SESSION_COOKIE_NAME}=not-a-uuid"));
        let (_, cookie) = store.resolve(&headers).await;
        assert!(cookie.is_some());
    }

    #[tokio::test]
    async fn test_cookie_found_among_other_cookies() {
        let store = SessionStore::new(false);
        let (id, _) = store.resolve(&HeaderMap::new()).await;

        let headers =
            headers_with_cookie(&format!("theme=dark; {SESSION_COOKIE_NAME}={id}; lang=eo"));
        let (resolved, _) = store.resolve(&headers).await;
        assert_eq!(resolved, id);
    }

    #[tokio::test]
    async fn test_login_logout_transitions() {
        let store = SessionStore::new(false);
        let (id, _) = store.resolve(&HeaderMap::new()).await;

        assert!(!store.is_authenticated(id).await);
        store.login(id, "alice").await;
        assert_eq!(store.current_user(id).await, Some("alice".to_string()));

        store.logout(id).await;
        assert!(!store.is_authenticated(id).await);
    }

    #[tokio::test]
    async fn test_verify_otp_is_exact_match_only() {
        let store = SessionStore::new(false);
        let (id, _) = store.resolve(&HeaderMap::new()).await;
        store.begin_reset(id, "a@x.com", "042137").await;

        assert!(store.verify_otp(id, "042137").await);
        assert!(!store.verify_otp(id, "42137").await);
        assert!(!store.verify_otp(id, " 042137").await);
        assert!(!store.verify_otp(id, "000000").await);
    }

    #[tokio::test]
    async fn test_verify_without_pending_otp_is_false() {
        let store = SessionStore::new(false);
        let (id, _) = store.resolve(&HeaderMap::new()).await;
        assert!(!store.verify_otp(id, "123456").await);
    }

    #[tokio::test]
    async fn test_verify_does_not_consume_the_code() {
        let store = SessionStore::new(false);
        let (id, _) = store.resolve(&HeaderMap::new()).await;
        store.begin_reset(id, "a@x.com", "123456").await;

        assert!(store.verify_otp(id, "123456").await);
        assert!(store.verify_otp(id, "123456").await);
        assert!(store.otp_pending(id).await);
    }

    #[tokio::test]
    async fn test_complete_reset_clears_reset_state() {
        let store = SessionStore::new(false);
        let (id, _) = store.resolve(&HeaderMap::new()).await;
        store.login(id, "alice").await;
        store.begin_reset(id, "a@x.com", "123456").await;

        store.complete_reset(id).await;
        assert!(!store.otp_pending(id).await);
        assert!(store.pending_reset_email(id).await.is_none());
        // Identity is not part of the reset state.
        assert!(store.is_authenticated(id).await);
    }

    #[tokio::test]
    async fn test_logout_preserves_pending_reset() {
        let store = SessionStore::new(false);
        let (id, _) = store.resolve(&HeaderMap::new()).await;
        store.login(id, "alice").await;
        store.begin_reset(id, "a@x.com", "123456").await;

        store.logout(id).await;
        assert!(store.otp_pending(id).await);
        assert_eq!(
            store.pending_reset_email(id).await,
            Some("a@x.com".to_string())
        );
    }
}
