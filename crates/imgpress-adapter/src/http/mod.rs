/*
[INPUT]:  HTTP client configuration and API endpoints
[OUTPUT]: HTTP responses and typed API results
[POS]:    HTTP layer - REST API communication
[UPDATE]: When adding new endpoints or changing client behavior
*/

pub mod client;
pub mod error;
pub mod images;
pub mod service;

pub use error::{ImgpressError, Result};
pub use service::ImageService;

pub use client::{ClientConfig, DEFAULT_BASE_URL, ImageClient};
