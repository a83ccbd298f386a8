//! Sign-in form and submission.

use crate::api::pages;
use crate::error::AppError;
use crate::flow;
use crate::session::SessionStore;
use crate::store::UserStore;
use axum::{
    Form,
    extract::Extension,
    http::{HeaderMap, StatusCode},
    response::{Html, IntoResponse, Redirect, Response},
};
use serde::Deserialize;
use std::sync::Arc;
use tracing::error;

#[derive(Deserialize)]
pub struct LoginForm {
    #[serde(default)]
    username: String,
    #[serde(default)]
    password: String,
}

pub async fn page(headers: HeaderMap, sessions: Extension<Arc<SessionStore>>) -> Response {
    let (_, cookie) = sessions.resolve(&headers).await;

    super::with_session_cookie(Html(pages::login(None)).into_response(), cookie)
}

pub async fn submit(
    headers: HeaderMap,
    store: Extension<Arc<dyn UserStore>>,
    sessions: Extension<Arc<SessionStore>>,
    Form(form): Form<LoginForm>,
) -> Response {
    let (session_id, cookie) = sessions.resolve(&headers).await;

    let response = match flow::login(store.as_ref(), &form.username, &form.password).await {
        Ok(()) => {
            sessions.login(session_id, &form.username).await;

            Redirect::to("/").into_response()
        }

        Err(err @ AppError::Internal(_)) => {
            error!("Login failed: {err}");

            (
                StatusCode::INTERNAL_SERVER_ERROR,
                Html(pages::internal_error()),
            )
                .into_response()
        }

        Err(err) => Html(pages::login(Some(&err.user_message()))).into_response(),
    };

    super::with_session_cookie(response, cookie)
}
