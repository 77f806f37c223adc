pub mod schema;

pub use schema::{LocalConfig, ObservabilityConfig, RemoteConfig, StopgateConfig};
