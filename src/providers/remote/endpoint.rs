use crate::error::{ClarifyError, Result};
use url::{Host, Url};

pub const BLUEPRINTS_PATH: &str = "/v1/inquiry/blueprints";
pub const FEEDBACK_PATH: &str = "/v1/feedback/instances";

fn is_loopback(url: &Url) -> bool {
    match url.host() {
        Some(Host::Domain(domain)) => domain.eq_ignore_ascii_case("localhost"),
        Some(Host::Ipv4(ip)) => ip.is_loopback(),
        Some(Host::Ipv6(ip)) => ip.is_loopback(),
        None => false,
    }
}

/// Normalise a configured endpoint to an `https` base URL without a
/// trailing slash.
///
/// A missing scheme becomes `https`. A plain `http` scheme is upgraded, except
/// for loopback hosts, which stay reachable for local servers.
pub fn normalize_endpoint(raw: &str) -> Result<String> {
    let trimmed = raw.trim();
    if trimmed.is_empty() {
        return Err(ClarifyError::Configuration(
            "remote endpoint is required".into(),
        ));
    }

    let with_scheme = if trimmed.contains("://") {
        trimmed.to_string()
    } else {
        format!("https://{trimmed}")
    };

    let mut url = Url::parse(&with_scheme)
        .map_err(|e| ClarifyError::Configuration(format!("invalid remote endpoint: {e}")))?;

    match url.scheme() {
        "https" => {}
        "http" if is_loopback(&url) => {}
        "http" => {
            url.set_scheme("https").map_err(|()| {
                ClarifyError::Configuration("could not upgrade endpoint to https".into())
            })?;
            tracing::debug!(host = ?url.host_str(), "Upgraded remote endpoint to https");
        }
        other => {
            return Err(ClarifyError::Configuration(format!(
                "unsupported endpoint scheme `{other}`"
            )));
        }
    }

    Ok(url.as_str().trim_end_matches('/').to_string())
}
