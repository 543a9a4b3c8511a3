//! Infrastructure Layer

pub mod http;

pub use self::http::HttpTransport;
