use std::borrow::Cow;

const MAX_API_ERROR_CHARS: usize = 200;
const REDACTED: &str = "[REDACTED]";

fn is_secret_char(c: char) -> bool {
    c.is_ascii_alphanumeric() || matches!(c, '-' | '_' | '.' | ':' | '+' | '/' | '=')
}

fn token_end(input: &str, from: usize) -> usize {
    input[from..]
        .char_indices()
        .find(|&(_, c)| !is_secret_char(c))
        .map_or(input.len(), |(i, _)| from + i)
}

fn redact_after(scrubbed: &mut String, marker: &str) {
    let mut cursor = 0;
    while let Some(rel) = scrubbed[cursor..].find(marker) {
        let token_start = cursor + rel + marker.len();
        let token_stop = token_end(scrubbed, token_start);
        if token_stop > token_start {
            scrubbed.replace_range(token_start..token_stop, REDACTED);
            cursor = token_start + REDACTED.len();
        } else {
            cursor = token_start;
        }
    }
}

const MARKER_PATTERNS: [&str; 14] = [
    "Authorization: Bearer ",
    "authorization: bearer ",
    "authorization: Bearer ",
    "\"authorization\":\"Bearer ",
    "\"authorization\":\"bearer ",
    "Bearer ",
    "api_key=",
    "access_token=",
    "token=",
    "\"api_key\":\"",
    "\"apiKey\":\"",
    "\"access_token\":\"",
    "\"token\":\"",
    "\"secret\":\"",
];

/// Scrub credential-bearing markers from remote error text.
///
/// Redacts the token that follows a known marker, e.g. `Bearer ...`,
/// `api_key=...`, `"token":"..."`. The marker itself is kept so the reader
/// can see what was removed.
pub fn scrub_secret_patterns(input: &str) -> Cow<'_, str> {
    if !MARKER_PATTERNS.iter().any(|marker| input.contains(marker)) {
        return Cow::Borrowed(input);
    }

    let mut scrubbed = input.to_string();
    for marker in MARKER_PATTERNS {
        redact_after(&mut scrubbed, marker);
    }
    Cow::Owned(scrubbed)
}

/// Replace every verbatim occurrence of `credential` in `input`.
pub fn redact_credential<'a>(input: &'a str, credential: &str) -> Cow<'a, str> {
    if credential.is_empty() || !input.contains(credential) {
        return Cow::Borrowed(input);
    }
    Cow::Owned(input.replace(credential, REDACTED))
}

/// Sanitize a service error body: scrub markers, drop the credential, truncate.
pub fn sanitize_api_error(input: &str, credential: &str) -> String {
    let scrubbed = scrub_secret_patterns(input);
    let scrubbed = redact_credential(&scrubbed, credential).into_owned();

    if scrubbed.chars().count() <= MAX_API_ERROR_CHARS {
        return scrubbed;
    }

    let cut = scrubbed
        .char_indices()
        .nth(MAX_API_ERROR_CHARS)
        .map_or(scrubbed.len(), |(i, _)| i);
    format!("{}...", &scrubbed[..cut])
}
