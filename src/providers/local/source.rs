use crate::error::{ClarifyError, Result};
use crate::protocol::{Directive, parse_directive};
use crate::providers::remote::build_http_client;
use std::path::{Path, PathBuf};
use std::time::Duration;
use tracing::{info, warn};

const URL_FETCH_TIMEOUT: Duration = Duration::from_secs(30);

/// Where the local provider loads its directives from.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DirectiveSource {
    /// Directory of `*.json` files, one directive per file.
    Directory(PathBuf),
    /// URL answering a GET with one directive object or an array of them.
    Url(String),
}

impl DirectiveSource {
    /// Directory wins when both are set. `~` in a directory is expanded.
    pub fn from_settings(directory: Option<&str>, url: Option<&str>) -> Option<Self> {
        if let Some(dir) = directory.map(str::trim).filter(|d| !d.is_empty()) {
            let expanded = shellexpand::tilde(dir).into_owned();
            return Some(Self::Directory(PathBuf::from(expanded)));
        }
        url.map(str::trim)
            .filter(|u| !u.is_empty())
            .map(|u| Self::Url(u.to_string()))
    }

    pub async fn load(&self) -> Result<Vec<Directive>> {
        match self {
            Self::Directory(dir) => load_directory(dir).await,
            Self::Url(url) => load_url(url).await,
        }
    }
}

fn source_error(context: impl std::fmt::Display, err: impl std::fmt::Display) -> ClarifyError {
    ClarifyError::Source(format!("{context}: {err}"))
}

async fn load_directory(dir: &Path) -> Result<Vec<Directive>> {
    let mut entries = tokio::fs::read_dir(dir)
        .await
        .map_err(|e| source_error(format!("cannot read directive directory {}", dir.display()), e))?;

    let mut files = Vec::new();
    while let Some(entry) = entries
        .next_entry()
        .await
        .map_err(|e| source_error(format!("cannot list {}", dir.display()), e))?
    {
        let path = entry.path();
        let hidden = path
            .file_name()
            .and_then(|n| n.to_str())
            .is_some_and(|n| n.starts_with('.'));
        let is_json = path.extension().is_some_and(|ext| ext == "json");
        if hidden || !is_json {
            continue;
        }
        let is_file = tokio::fs::metadata(&path)
            .await
            .is_ok_and(|meta| meta.is_file());
        if is_file {
            files.push(path);
        }
    }
    files.sort();

    let mut directives = Vec::with_capacity(files.len());
    let mut skipped = 0usize;
    for path in &files {
        match read_directive_file(path).await {
            Ok(directive) => directives.push(directive),
            Err(e) => {
                skipped += 1;
                warn!(file = %path.display(), error = %e, "Skipping invalid directive file");
            }
        }
    }

    if !files.is_empty() && directives.is_empty() {
        return Err(ClarifyError::Source(format!(
            "no valid directives in {} ({skipped} invalid files)",
            dir.display()
        )));
    }
    info!(
        dir = %dir.display(),
        loaded = directives.len(),
        skipped,
        "Loaded local directives"
    );
    Ok(directives)
}

async fn read_directive_file(path: &Path) -> Result<Directive> {
    let raw = tokio::fs::read_to_string(path)
        .await
        .map_err(|e| source_error("read failed", e))?;
    let value: serde_json::Value =
        serde_json::from_str(&raw).map_err(|e| source_error("invalid JSON", e))?;
    parse_directive(value)
}

async fn load_url(url: &str) -> Result<Vec<Directive>> {
    let response = build_http_client()
        .get(url)
        .timeout(URL_FETCH_TIMEOUT)
        .send()
        .await
        .map_err(|e| source_error(format!("cannot fetch directives from {url}"), e))?;

    let status = response.status();
    if !status.is_success() {
        return Err(ClarifyError::Source(format!(
            "directive url {url} answered {}",
            status.as_u16()
        )));
    }

    let body: serde_json::Value = response
        .json()
        .await
        .map_err(|e| source_error(format!("invalid JSON from {url}"), e))?;

    let items = match body {
        serde_json::Value::Array(items) => items,
        single @ serde_json::Value::Object(_) => vec![single],
        _ => {
            return Err(ClarifyError::Source(format!(
                "directive url {url} returned neither an object nor an array"
            )));
        }
    };
    if items.is_empty() {
        return Err(ClarifyError::Source(format!(
            "directive url {url} returned an empty array"
        )));
    }

    let total = items.len();
    let mut directives = Vec::with_capacity(total);
    for (index, item) in items.into_iter().enumerate() {
        match parse_directive(item) {
            Ok(directive) => directives.push(directive),
            Err(e) => warn!(index, error = %e, "Skipping invalid directive from url"),
        }
    }
    if directives.is_empty() {
        return Err(ClarifyError::Source(format!(
            "no valid directives from {url} ({total} invalid entries)"
        )));
    }
    info!(
        loaded = directives.len(),
        skipped = total - directives.len(),
        "Loaded directives from url"
    );
    Ok(directives)
}
