/*
[INPUT]:  Crate modules and public type definitions
[OUTPUT]: Public imgpress adapter crate surface
[POS]:    Crate root - module wiring
[UPDATE]: When public modules or exports change
*/

pub mod http;
pub mod types;

// Re-export commonly used types from http
pub use http::{
    ClientConfig,
    DEFAULT_BASE_URL,
    ImageClient,
    ImageService,
    ImgpressError,
    Result,
};

pub use reqwest::Url;

// Re-export all types
pub use types::*;
