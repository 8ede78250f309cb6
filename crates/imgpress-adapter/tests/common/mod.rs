/*
[INPUT]:  Test configuration and mock server requirements
[OUTPUT]: Shared test utilities, fixtures, and mock helpers
[POS]:    Test infrastructure - shared across all test modules
[UPDATE]: When adding new test patterns or fixtures
*/

//! Common test utilities for imgpress-adapter tests

use imgpress_adapter::{ClientConfig, ImageClient};
use wiremock::MockServer;

/// Setup a mock HTTP server for testing
pub async fn setup_mock_server() -> MockServer {
    MockServer::start().await
}

/// Client pointed at the mock server
pub fn client_for(server: &MockServer) -> ImageClient {
    ImageClient::with_config(ClientConfig::default(), &server.uri()).expect("client init")
}

/// Upload response for the 1920x1080 sample photo
pub fn uploaded_photo_json() -> serde_json::Value {
    serde_json::json!({
        "id": "img_1",
        "original_name": "photo.jpg",
        "file_size": 2 * 1024 * 1024,
        "width": 1920,
        "height": 1080,
        "format": "jpeg"
    })
}

/// Processed result for the sample photo resized to 960x540
pub fn processed_photo_json() -> serde_json::Value {
    serde_json::json!({
        "processed_id": "proc_1",
        "processed_size": 800000,
        "processed_width": 960,
        "processed_height": 540,
        "compression_ratio": 58.3
    })
}
