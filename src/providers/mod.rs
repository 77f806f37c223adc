pub mod local;
pub mod remote;
pub mod scrub;
pub mod traits;

pub use local::LocalProvider;
pub use remote::RemoteProvider;
pub use scrub::{redact_credential, sanitize_api_error, scrub_secret_patterns};
pub use traits::DirectiveProvider;
