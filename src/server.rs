use std::{net::SocketAddr, sync::Arc};

use anyhow::Context;
use axum::{
    Json, Router,
    body::Bytes,
    extract::{
        DefaultBodyLimit, Multipart, State,
        multipart::{MultipartError, MultipartRejection},
    },
    http::StatusCode,
    response::{IntoResponse, Response},
    routing::post,
};
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::{config::NO_GESTURE_TEXT, recognizer::Recognizer, types::Frame};

const IMAGE_FIELD: &str = "image";
pub const MAX_UPLOAD_BYTES: usize = 16 * 1024 * 1024;

#[derive(Debug, Serialize, Deserialize)]
pub struct SignResponse {
    pub sign_text: String,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct ErrorResponse {
    pub error: String,
}

#[derive(Error, Debug)]
enum PredictError {
    #[error("Invalid image: {0}")]
    InvalidImage(#[from] image::ImageError),

    #[error("{0:#}")]
    Recognition(anyhow::Error),
}

fn error_response(status: StatusCode, error: impl Into<String>) -> Response {
    (
        status,
        Json(ErrorResponse {
            error: error.into(),
        }),
    )
        .into_response()
}

pub fn router(recognizer: Arc<Recognizer>) -> Router {
    router_with_limit(recognizer, MAX_UPLOAD_BYTES)
}

/// Same as [`router`] with a custom request body limit in bytes.
pub fn router_with_limit(recognizer: Arc<Recognizer>, max_upload_bytes: usize) -> Router {
    Router::new()
        .route("/predict-sign", post(predict_sign))
        .layer(DefaultBodyLimit::max(max_upload_bytes))
        .with_state(recognizer)
}

/// Oversized bodies become a 413; any other malformed body reads as "no
/// image".
fn multipart_failure(err: MultipartError) -> Result<Option<Bytes>, Response> {
    let status = err.status();
    if status == StatusCode::PAYLOAD_TOO_LARGE {
        log::warn!("rejected oversized upload: {err}");
        return Err(error_response(status, format!("Image too large: {err}")));
    }
    log::debug!("malformed multipart body: {err}");
    Ok(None)
}

/// Bytes of the first non-empty `image` field, if any.
async fn read_image_field(mut multipart: Multipart) -> Result<Option<Bytes>, Response> {
    loop {
        let field = match multipart.next_field().await {
            Ok(Some(field)) => field,
            Ok(None) => return Ok(None),
            Err(err) => return multipart_failure(err),
        };
        if field.name() != Some(IMAGE_FIELD) {
            continue;
        }
        return match field.bytes().await {
            Ok(bytes) if !bytes.is_empty() => Ok(Some(bytes)),
            Ok(_) => Ok(None),
            Err(err) => multipart_failure(err),
        };
    }
}

fn decode_and_recognize(
    recognizer: &Recognizer,
    bytes: &[u8],
) -> Result<Option<String>, PredictError> {
    let image = image::load_from_memory(bytes)?;
    let frame = Frame::from_rgba_image(image.to_rgba8());
    recognizer
        .recognize(&frame)
        .map_err(PredictError::Recognition)
}

async fn predict_sign(
    State(recognizer): State<Arc<Recognizer>>,
    multipart: Result<Multipart, MultipartRejection>,
) -> Response {
    let bytes = match multipart {
        Ok(multipart) => match read_image_field(multipart).await {
            Ok(bytes) => bytes,
            Err(response) => return response,
        },
        Err(rejection) => {
            log::debug!("request is not multipart: {rejection}");
            None
        }
    };
    let Some(bytes) = bytes else {
        return error_response(StatusCode::BAD_REQUEST, "No image uploaded");
    };

    let result =
        tokio::task::spawn_blocking(move || decode_and_recognize(&recognizer, &bytes)).await;
    match result {
        Ok(Ok(label)) => {
            let sign_text = label.unwrap_or_else(|| NO_GESTURE_TEXT.to_string());
            log::debug!("predicted {sign_text:?}");
            Json(SignResponse { sign_text }).into_response()
        }
        Ok(Err(err @ PredictError::InvalidImage(_))) => {
            error_response(StatusCode::BAD_REQUEST, err.to_string())
        }
        Ok(Err(err)) => {
            log::error!("gesture recognition failed: {err}");
            error_response(StatusCode::INTERNAL_SERVER_ERROR, err.to_string())
        }
        Err(err) => {
            log::error!("recognition task failed: {err}");
            error_response(StatusCode::INTERNAL_SERVER_ERROR, "recognition task failed")
        }
    }
}

pub async fn serve(addr: SocketAddr, recognizer: Arc<Recognizer>) -> anyhow::Result<()> {
    let listener = tokio::net::TcpListener::bind(addr)
        .await
        .with_context(|| format!("failed to bind {addr}"))?;
    log::info!("serving gesture predictions on http://{addr}/predict-sign");
    axum::serve(listener, router(recognizer))
        .await
        .context("server stopped unexpectedly")
}
