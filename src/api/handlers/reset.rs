//! Password recovery: request a code, verify it, set a new password.
//!
//! The three steps share one session. `/verify_otp` is reachable only
//! while a code is pending and `/reset_password` only while the target
//! email is pending; anything else bounces back to `/forgot`.

use crate::api::pages;
use crate::error::AppError;
use crate::flow;
use crate::mail::OtpMailer;
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
pub struct ForgotForm {
    #[serde(default)]
    email: String,
}

#[derive(Deserialize)]
pub struct VerifyOtpForm {
    #[serde(default)]
    otp: String,
}

#[derive(Deserialize)]
pub struct ResetPasswordForm {
    #[serde(default)]
    new_password: String,
    #[serde(default)]
    confirm_password: String,
}

pub async fn forgot_page(headers: HeaderMap, sessions: Extension<Arc<SessionStore>>) -> Response {
    let (_, cookie) = sessions.resolve(&headers).await;

    super::with_session_cookie(Html(pages::forgot(None)).into_response(), cookie)
}

pub async fn forgot_submit(
    headers: HeaderMap,
    store: Extension<Arc<dyn UserStore>>,
    mailer: Extension<Arc<dyn OtpMailer>>,
    sessions: Extension<Arc<SessionStore>>,
    Form(form): Form<ForgotForm>,
) -> Response {
    let (session_id, cookie) = sessions.resolve(&headers).await;

    let result = flow::request_reset(store.as_ref(), mailer.as_ref(), &form.email).await;

    let response = match result {
        Ok(code) => {
            // The code must be in the session before the redirect leaves.
            sessions.begin_reset(session_id, &form.email, &code).await;

            Redirect::to("/verify_otp").into_response()
        }

        Err(err @ AppError::Internal(_)) => {
            error!("Reset request failed: {err}");

            (
                StatusCode::INTERNAL_SERVER_ERROR,
                Html(pages::internal_error()),
            )
                .into_response()
        }

        Err(err) => Html(pages::forgot(Some(&err.user_message()))).into_response(),
    };

    super::with_session_cookie(response, cookie)
}

pub async fn verify_otp_page(
    headers: HeaderMap,
    sessions: Extension<Arc<SessionStore>>,
) -> Response {
    let (session_id, cookie) = sessions.resolve(&headers).await;

    if !sessions.otp_pending(session_id).await {
        return super::with_session_cookie(Redirect::to("/forgot").into_response(), cookie);
    }

    super::with_session_cookie(Html(pages::verify_otp(None)).into_response(), cookie)
}

pub async fn verify_otp_submit(
    headers: HeaderMap,
    sessions: Extension<Arc<SessionStore>>,
    Form(form): Form<VerifyOtpForm>,
) -> Response {
    let (session_id, cookie) = sessions.resolve(&headers).await;

    if !sessions.otp_pending(session_id).await {
        return super::with_session_cookie(Redirect::to("/forgot").into_response(), cookie);
    }

    let response = if sessions.verify_otp(session_id, &form.otp).await {
        Redirect::to("/reset_password").into_response()
    } else {
        let message = AppError::InvalidOtp.user_message();
        Html(pages::verify_otp(Some(&message))).into_response()
    };

    super::with_session_cookie(response, cookie)
}

pub async fn reset_password_page(
    headers: HeaderMap,
    sessions: Extension<Arc<SessionStore>>,
) -> Response {
    let (session_id, cookie) = sessions.resolve(&headers).await;

    if sessions.pending_reset_email(session_id).await.is_none() {
        return super::with_session_cookie(Redirect::to("/forgot").into_response(), cookie);
    }

    super::with_session_cookie(Html(pages::reset_password(None)).into_response(), cookie)
}

pub async fn reset_password_submit(
    headers: HeaderMap,
    store: Extension<Arc<dyn UserStore>>,
    sessions: Extension<Arc<SessionStore>>,
    Form(form): Form<ResetPasswordForm>,
) -> Response {
    let (session_id, cookie) = sessions.resolve(&headers).await;

    let Some(email) = sessions.pending_reset_email(session_id).await else {
        return super::with_session_cookie(Redirect::to("/forgot").into_response(), cookie);
    };

    let result = flow::reset_password(
        store.as_ref(),
        &email,
        &form.new_password,
        &form.confirm_password,
    )
    .await;

    let response = match result {
        Ok(()) => {
            sessions.complete_reset(session_id).await;

            Redirect::to("/login").into_response()
        }

        Err(err @ AppError::Internal(_)) => {
            error!("Password reset failed: {err}");

            (
                StatusCode::INTERNAL_SERVER_ERROR,
                Html(pages::internal_error()),
            )
                .into_response()
        }

        Err(err) => Html(pages::reset_password(Some(&err.user_message()))).into_response(),
    };

    super::with_session_cookie(response, cookie)
}
