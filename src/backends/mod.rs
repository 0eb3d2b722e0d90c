/// Coaching API over HTTP.
pub mod http;

/// In-process rules, for offline sessions and tests.
pub mod local;

pub use http::HttpBackend;
pub use local::LocalBackend;
