//! Landing page and leaf upload.
//!
//! Both routes require a signed-in session; anonymous callers are sent to
//! `/login` before any upload byte is looked at.

use crate::api::pages;
use crate::classify::{Classifier, Label};
use crate::error::AppError;
use crate::session::SessionStore;
use axum::{
    body::Bytes,
    extract::{Extension, Multipart},
    http::{HeaderMap, StatusCode},
    response::{Html, IntoResponse, Redirect, Response},
};
use std::sync::Arc;
use tracing::{error, info, warn};

const UPLOAD_FIELD: &str = "leaf_image";

pub async fn page(headers: HeaderMap, sessions: Extension<Arc<SessionStore>>) -> Response {
    let (session_id, cookie) = sessions.resolve(&headers).await;

    let Some(username) = sessions.current_user(session_id).await else {
        warn!("unauthenticated index access");
        return super::with_session_cookie(Redirect::to("/login").into_response(), cookie);
    };

    let page = pages::index(&username, None, None);

    super::with_session_cookie(Html(page).into_response(), cookie)
}

pub async fn upload(
    headers: HeaderMap,
    classifier: Extension<Classifier>,
    sessions: Extension<Arc<SessionStore>>,
    mut multipart: Multipart,
) -> Response {
    let (session_id, cookie) = sessions.resolve(&headers).await;

    let Some(username) = sessions.current_user(session_id).await else {
        warn!("unauthenticated upload attempt");
        return super::with_session_cookie(Redirect::to("/login").into_response(), cookie);
    };

    let response = match classify_upload(&classifier, &mut multipart).await {
        Ok(label) => {
            info!(username, label = label.as_str(), "image classified");

            Html(pages::index(&username, Some(label.as_str()), None)).into_response()
        }

        Err(err @ AppError::Internal(_)) => {
            error!("Classification failed: {err}");

            (
                StatusCode::INTERNAL_SERVER_ERROR,
                Html(pages::internal_error()),
            )
                .into_response()
        }

        Err(err) => {
            let message = err.user_message();
            Html(pages::index(&username, None, Some(&message))).into_response()
        }
    };

    super::with_session_cookie(response, cookie)
}

async fn classify_upload(
    classifier: &Classifier,
    multipart: &mut Multipart,
) -> Result<Label, AppError> {
    let bytes = leaf_image_bytes(multipart).await?;

    classifier.classify(&bytes).await
}

/// Pull the upload out of the multipart body.
///
/// A missing or empty `leaf_image` field counts as an unreadable image.
async fn leaf_image_bytes(multipart: &mut Multipart) -> Result<Bytes, AppError> {
    while let Some(field) = multipart.next_field().await.map_err(|err| {
        warn!("Unreadable multipart body: {err}");
        AppError::InvalidImage
    })? {
        if field.name() != Some(UPLOAD_FIELD) {
            continue;
        }

        let bytes = field.bytes().await.map_err(|err| {
            warn!("Unreadable upload field: {err}");
            AppError::InvalidImage
        })?;

        if bytes.is_empty() {
            break;
        }

        return Ok(bytes);
    }

    Err(AppError::InvalidImage)
}
