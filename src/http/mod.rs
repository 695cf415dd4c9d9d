//! HTTP boundary between the scenario engine and the service under test

pub mod client;
pub mod protocol;

pub use client::{ReqwestTransport, Transport};
pub use protocol::{HttpMethod, HttpRequest, HttpResponse, RequestBody};
