pub mod circuit;
pub mod client;
pub mod endpoint;
pub mod transport;

pub use circuit::{CircuitBreaker, CircuitState, Permit};
pub use client::RemoteProvider;
pub use endpoint::normalize_endpoint;
pub use transport::{HttpReply, HttpTransport, ReqwestTransport, build_http_client};
