/*
[INPUT]:  Mock image service (wiremock) + real ImageClient
[OUTPUT]: End-to-end verification of the upload-then-process workflow
[POS]:    Integration tests - session over HTTP
[UPDATE]: When the wire protocol or session workflow changes
*/

use std::sync::Arc;
use std::time::Duration;

use imgpress_adapter::{ClientConfig, ImageClient, ImageUpload};
use imgpress_orchestrator::{
    FailureKind, ProcessSettings, ProcessState, Session, StateView, UploadSettings, UploadState,
};
use serde_json::json;
use tokio::time::timeout;
use wiremock::matchers::{body_json, method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

fn session_for(server: &MockServer) -> Session<ImageClient> {
    let client =
        ImageClient::with_config(ClientConfig::default(), &server.uri()).expect("client init");
    Session::new(
        Arc::new(client),
        UploadSettings {
            progress_tick: Duration::from_millis(5),
            ..UploadSettings::default()
        },
        ProcessSettings {
            poll_interval: Duration::from_millis(20),
            max_poll_duration: Duration::from_secs(5),
        },
    )
}

fn photo_upload() -> ImageUpload {
    ImageUpload::new("photo.jpg", "image/jpeg", vec![0xFF; 2 * 1024 * 1024])
}

async fn mount_upload(server: &MockServer) {
    Mock::given(method("POST"))
        .and(path("/images"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "id": "img_1",
            "original_name": "photo.jpg",
            "file_size": 2 * 1024 * 1024,
            "width": 1920,
            "height": 1080,
            "format": "jpeg"
        })))
        .expect(1)
        .mount(server)
        .await;
}

fn processed_json() -> serde_json::Value {
    json!({
        "processed_id": "proc_1",
        "processed_size": 800000,
        "processed_width": 960,
        "processed_height": 540,
        "compression_ratio": 58.3
    })
}

async fn upload_and_process(session: &Session<ImageClient>) -> ProcessState {
    session.start_upload(photo_upload()).expect("start upload");
    let uploaded = timeout(Duration::from_secs(5), session.wait_for_upload())
        .await
        .expect("upload settled");
    assert!(matches!(uploaded, UploadState::Succeeded(_)), "{uploaded:?}");

    let mut form = session.options_form().expect("form");
    form.set_width(960).expect("width");
    session.start_processing(&form.build()).expect("start processing");

    timeout(Duration::from_secs(5), session.wait_for_processing())
        .await
        .expect("processing settled")
}

#[tokio::test]
async fn test_immediate_processing_over_http() {
    let server = MockServer::start().await;
    mount_upload(&server).await;
    Mock::given(method("POST"))
        .and(path("/images/img_1/process"))
        .and(body_json(json!({
            "compression": { "quality": 80 },
            "resize": { "width": 960, "height": 540, "keep_aspect_ratio": true }
        })))
        .respond_with(ResponseTemplate::new(200).set_body_json(processed_json()))
        .expect(1)
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path("/images/img_1/status"))
        .respond_with(ResponseTemplate::new(200))
        .expect(0)
        .mount(&server)
        .await;

    let session = session_for(&server);
    let state = upload_and_process(&session).await;

    let result = state.result().expect("succeeded");
    assert_eq!(result.processed_id, "proc_1");
    assert_eq!((result.processed_width, result.processed_height), (960, 540));

    let url = session.download_url().expect("url").expect("processed");
    assert_eq!(
        url.as_str(),
        format!("{}/images/proc_1/download", server.uri())
    );
}

#[tokio::test]
async fn test_deferred_processing_over_http() {
    let server = MockServer::start().await;
    mount_upload(&server).await;
    Mock::given(method("POST"))
        .and(path("/images/img_1/process"))
        .respond_with(ResponseTemplate::new(202))
        .expect(1)
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path("/images/img_1/status"))
        .respond_with(
            ResponseTemplate::new(200).set_body_json(json!({ "status": "processing", "progress": 40 })),
        )
        .up_to_n_times(2)
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path("/images/img_1/status"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "status": "completed",
            "progress": 100,
            "result": processed_json()
        })))
        .expect(1)
        .mount(&server)
        .await;

    let session = session_for(&server);
    let state = upload_and_process(&session).await;

    assert_eq!(state.progress(), 100);
    assert_eq!(
        session.processed_image().map(|image| image.processed_id),
        Some("proc_1".to_string())
    );
    assert!(!session.process().is_polling());

    // No polling after completion.
    tokio::time::sleep(Duration::from_millis(100)).await;
    let status_calls = server
        .received_requests()
        .await
        .expect("recording enabled")
        .iter()
        .filter(|request| request.url.path().ends_with("/status"))
        .count();
    assert_eq!(status_calls, 3);
}

#[tokio::test]
async fn test_backend_failure_over_http() {
    let server = MockServer::start().await;
    mount_upload(&server).await;
    Mock::given(method("POST"))
        .and(path("/images/img_1/process"))
        .respond_with(ResponseTemplate::new(202))
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path("/images/img_1/status"))
        .respond_with(
            ResponseTemplate::new(200)
                .set_body_json(json!({ "status": "failed", "progress": 0, "message": "decode error" })),
        )
        .expect(1)
        .mount(&server)
        .await;

    let session = session_for(&server);
    let state = upload_and_process(&session).await;

    let failure = state.failure().expect("failed");
    assert_eq!(failure.kind, FailureKind::Processing);
    assert_eq!(failure.message, "decode error");
    assert_eq!(session.download_url().expect("no error"), None);
}

#[tokio::test]
async fn test_rejected_upload_never_reaches_server() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/images"))
        .respond_with(ResponseTemplate::new(200))
        .expect(0)
        .mount(&server)
        .await;

    let session = session_for(&server);
    let err = session
        .start_upload(ImageUpload::new("scan.tiff", "image/tiff", vec![0; 16]))
        .unwrap_err();

    assert!(err.is_validation());
    assert_eq!(session.upload().state(), UploadState::Idle);
}
