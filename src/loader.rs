//! Document loading from files, strings, and HTTP URLs.
//!
//! OpenAPI documents come as JSON or YAML. Files are parsed by extension;
//! strings and HTTP bodies are tried as JSON first, then as YAML.

use std::path::Path;

use serde_json::Value;

use crate::error::LoadError;

#[cfg(feature = "remote")]
use std::time::Duration;

/// Default timeout for HTTP requests (10 seconds).
#[cfg(feature = "remote")]
const HTTP_TIMEOUT: Duration = Duration::from_secs(10);

/// Load a document from a file path.
///
/// `.yaml` and `.yml` files are parsed as YAML, everything else as JSON.
///
/// # Errors
///
/// Returns `LoadError::FileNotFound` if the file doesn't exist, or a parse
/// error for the file's format.
pub fn load_document(path: &Path) -> Result<Value, LoadError> {
    if !path.exists() {
        return Err(LoadError::FileNotFound {
            path: path.to_path_buf(),
        });
    }

    let content = std::fs::read_to_string(path).map_err(|source| LoadError::ReadError {
        path: path.to_path_buf(),
        source,
    })?;

    if is_yaml_path(path) {
        parse_yaml(&content)
    } else {
        serde_json::from_str(&content).map_err(|source| LoadError::InvalidJson { source })
    }
}

/// Load a document from a JSON or YAML string.
///
/// # Errors
///
/// Returns `LoadError::InvalidJson` if the content looks like JSON (starts
/// with `{` or `[`) but doesn't parse, otherwise `LoadError::InvalidYaml`.
pub fn load_document_str(content: &str) -> Result<Value, LoadError> {
    match serde_json::from_str(content) {
        Ok(value) => Ok(value),
        Err(source) if looks_like_json(content) => Err(LoadError::InvalidJson { source }),
        Err(_) => parse_yaml(content),
    }
}

/// Load a document from an HTTP/HTTPS URL.
///
/// Requires the `remote` feature (enabled by default).
///
/// # Errors
///
/// Returns `LoadError::NetworkError` if the request fails or the server
/// answers with an error status, or a parse error for the body.
#[cfg(feature = "remote")]
pub fn load_document_url(url: &str) -> Result<Value, LoadError> {
    let network = |source: reqwest::Error| LoadError::NetworkError {
        url: url.to_string(),
        source,
    };

    let client = reqwest::blocking::Client::builder()
        .timeout(HTTP_TIMEOUT)
        .build()
        .map_err(network)?;

    let body = client
        .get(url)
        .send()
        .and_then(|response| response.error_for_status())
        .and_then(|response| response.text())
        .map_err(network)?;

    load_document_str(&body)
}

/// Check if a string looks like a URL (starts with http:// or https://).
pub fn is_url(s: &str) -> bool {
    s.starts_with("http://") || s.starts_with("https://")
}

/// Navigate a JSON Pointer fragment (e.g. "#/components/schemas/Pet").
///
/// The fragment may omit the leading '#'. `~1` and `~0` are unescaped.
///
/// # Errors
///
/// Returns `LoadError::FragmentNotFound` if any segment is missing.
pub fn navigate_fragment(document: &Value, fragment: &str) -> Result<Value, LoadError> {
    let path = fragment.trim_start_matches('#').trim_start_matches('/');
    if path.is_empty() {
        return Ok(document.clone());
    }

    let mut current = document;
    for part in path.split('/') {
        let key = part.replace("~1", "/").replace("~0", "~");
        let next = match current {
            Value::Array(items) => key.parse::<usize>().ok().and_then(|i| items.get(i)),
            _ => current.get(&key),
        };
        current = next.ok_or_else(|| LoadError::FragmentNotFound {
            fragment: fragment.to_string(),
        })?;
    }
    Ok(current.clone())
}

/// Load a document from a file path or URL.
///
/// Automatically detects whether the source is a URL or file path.
/// URL loading requires the `remote` feature.
///
/// # Errors
///
/// Returns appropriate errors based on the source type.
pub fn load_document_auto(source: &str) -> Result<Value, LoadError> {
    if is_url(source) {
        #[cfg(feature = "remote")]
        {
            load_document_url(source)
        }
        #[cfg(not(feature = "remote"))]
        {
            Err(LoadError::FileNotFound {
                path: std::path::PathBuf::from(source),
            })
        }
    } else {
        load_document(Path::new(source))
    }
}

/// Whether a path has a document extension (`.json`, `.yaml`, `.yml`).
pub(crate) fn is_document_path(path: &Path) -> bool {
    path.extension()
        .and_then(|e| e.to_str())
        .is_some_and(|e| matches!(e, "json" | "yaml" | "yml"))
}

fn is_yaml_path(path: &Path) -> bool {
    path.extension()
        .and_then(|e| e.to_str())
        .is_some_and(|e| matches!(e, "yaml" | "yml"))
}

fn looks_like_json(content: &str) -> bool {
    matches!(content.trim_start().chars().next(), Some('{' | '['))
}

fn parse_yaml(content: &str) -> Result<Value, LoadError> {
    serde_yaml::from_str(content).map_err(|source| LoadError::InvalidYaml { source })
}
