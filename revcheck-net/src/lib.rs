// revcheck-net/src/lib.rs
pub mod http;
pub mod validation;

pub use http::{build_http_client, download_file, fetch_text};
pub use revcheck_common::error::{Result, RevcheckError};
pub use validation::{validate_url, UrlKind};
