use std::{io::Cursor, sync::Arc};

use anyhow::{Result, bail};
use axum::{
    body::{Body, to_bytes},
    http::{Request, StatusCode, header},
};
use gesture_signs::{
    features::LandmarkVector,
    gesture::GestureClassifier,
    pipeline::HandDetector,
    recognizer::Recognizer,
    server::{router, router_with_limit},
    types::{FEATURE_LEN, Frame},
};
use image::{ImageFormat, Rgba, RgbaImage};
use serde_json::Value;
use tower::ServiceExt;

const BOUNDARY: &str = "gesture-test-boundary";

/// Finds a hand only in images whose top-left pixel is white.
struct BrightPixelDetector;

impl HandDetector for BrightPixelDetector {
    fn detect(&mut self, frame: &Frame) -> Result<Option<LandmarkVector>> {
        if frame.rgba[0] == 255 {
            Ok(Some(LandmarkVector::from_values(&[0.5; FEATURE_LEN])?))
        } else {
            Ok(None)
        }
    }
}

struct BrokenDetector;

impl HandDetector for BrokenDetector {
    fn detect(&mut self, _frame: &Frame) -> Result<Option<LandmarkVector>> {
        bail!("session crashed")
    }
}

struct FixedClassifier;

impl GestureClassifier for FixedClassifier {
    fn classify(&self, _features: &LandmarkVector) -> Result<String> {
        Ok("peace".to_string())
    }
}

fn app_with(detector: impl HandDetector + 'static) -> axum::Router {
    router(Arc::new(Recognizer::new(
        Box::new(detector),
        Box::new(FixedClassifier),
    )))
}

fn png(value: u8) -> Vec<u8> {
    let image = RgbaImage::from_pixel(8, 8, Rgba([value, value, value, 255]));
    let mut bytes = Cursor::new(Vec::new());
    image.write_to(&mut bytes, ImageFormat::Png).unwrap();
    bytes.into_inner()
}

fn multipart_request(field: &str, payload: &[u8]) -> Request<Body> {
    let mut body = Vec::new();
    body.extend_from_slice(
        format!(
            "--{BOUNDARY}\r\nContent-Disposition: form-data; name=\"{field}\"; filename=\"hand.png\"\r\nContent-Type: image/png\r\n\r\n"
        )
        .as_bytes(),
    );
    body.extend_from_slice(payload);
    body.extend_from_slice(format!("\r\n--{BOUNDARY}--\r\n").as_bytes());

    Request::builder()
        .method("POST")
        .uri("/predict-sign")
        .header(
            header::CONTENT_TYPE,
            format!("multipart/form-data; boundary={BOUNDARY}"),
        )
        .body(Body::from(body))
        .unwrap()
}

async fn send(app: axum::Router, request: Request<Body>) -> (StatusCode, Value) {
    let response = app.oneshot(request).await.unwrap();
    let status = response.status();
    let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
    (status, serde_json::from_slice(&bytes).unwrap())
}

#[tokio::test]
async fn missing_image_field_is_a_bad_request() {
    let (status, body) = send(
        app_with(BrightPixelDetector),
        multipart_request("photo", &png(255)),
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["error"], "No image uploaded");
}

#[tokio::test]
async fn non_multipart_body_is_a_bad_request() {
    let request = Request::builder()
        .method("POST")
        .uri("/predict-sign")
        .body(Body::empty())
        .unwrap();
    let (status, body) = send(app_with(BrightPixelDetector), request).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert!(body.get("error").is_some());
}

#[tokio::test]
async fn empty_upload_counts_as_missing() {
    let (status, body) = send(app_with(BrightPixelDetector), multipart_request("image", &[])).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["error"], "No image uploaded");
}

#[tokio::test]
async fn image_without_a_hand_reports_no_gesture() {
    let (status, body) = send(
        app_with(BrightPixelDetector),
        multipart_request("image", &png(0)),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["sign_text"], "No gesture detected");
}

#[tokio::test]
async fn image_with_a_hand_reports_its_gesture() {
    let (status, body) = send(
        app_with(BrightPixelDetector),
        multipart_request("image", &png(255)),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["sign_text"], "peace");
}

#[tokio::test]
async fn undecodable_image_is_rejected() {
    let (status, body) = send(
        app_with(BrightPixelDetector),
        multipart_request("image", b"definitely not a png"),
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert!(
        body["error"]
            .as_str()
            .is_some_and(|e| e.starts_with("Invalid image"))
    );
}

#[tokio::test]
async fn detector_failures_are_server_errors() {
    let (status, body) = send(app_with(BrokenDetector), multipart_request("image", &png(255))).await;
    assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
    assert!(
        body["error"]
            .as_str()
            .is_some_and(|e| e.contains("session crashed"))
    );
}

#[tokio::test]
async fn oversized_upload_is_payload_too_large() {
    let app = router_with_limit(
        Arc::new(Recognizer::new(
            Box::new(BrightPixelDetector),
            Box::new(FixedClassifier),
        )),
        1024,
    );
    let (status, body) = send(app, multipart_request("image", &[7u8; 4096])).await;
    assert_eq!(status, StatusCode::PAYLOAD_TOO_LARGE);
    assert!(
        body["error"]
            .as_str()
            .is_some_and(|e| e.starts_with("Image too large"))
    );
}
