//! Clear the signed-in user from the session.

use crate::session::SessionStore;
use axum::{
    extract::Extension,
    http::HeaderMap,
    response::{IntoResponse, Redirect, Response},
};
use std::sync::Arc;
use tracing::info;

pub async fn logout(headers: HeaderMap, sessions: Extension<Arc<SessionStore>>) -> Response {
    let (session_id, cookie) = sessions.resolve(&headers).await;

    if let Some(username) = sessions.current_user(session_id).await {
        info!(username, "user logged out");
    }

    // Clears only the signed-in user; a pending reset survives.
    sessions.logout(session_id).await;

    super::with_session_cookie(Redirect::to("/login").into_response(), cookie)
}
