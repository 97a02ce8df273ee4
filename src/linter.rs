//! Document linting - static analysis of OpenAPI files.
//!
//! Checks each document for:
//! - JSON/YAML syntax errors
//! - Local $ref anchors that don't resolve
//! - Schemas whose composition fails or leaves no alternatives
//! - A missing `openapi` version field

use std::path::{Path, PathBuf};

use serde::Serialize;
use serde_json::Value;
use tracing::debug;

use crate::document::{compose_document, ComposeDiagnostic, Severity};
use crate::loader::{is_document_path, is_url, load_document, navigate_fragment};
use crate::types::{ComposeOptions, ErrorPolicy};

/// A single diagnostic message from linting.
#[derive(Debug, Clone, Serialize)]
pub struct Diagnostic {
    pub severity: Severity,
    pub code: String,
    pub file: PathBuf,
    /// JSON pointer to the issue (e.g., "#/components/schemas/Pet")
    pub path: String,
    pub message: String,
}

/// Result of linting a single file.
#[derive(Debug, Clone, Serialize)]
pub struct FileResult {
    pub file: PathBuf,
    pub status: FileStatus,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub diagnostics: Vec<Diagnostic>,
}

/// Status of a linted file.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum FileStatus {
    Ok,
    Error,
    Warning,
}

/// Result of linting a directory or set of files.
#[derive(Debug, Clone, Serialize)]
pub struct LintResult {
    pub path: PathBuf,
    pub files_checked: usize,
    pub passed: usize,
    pub failed: usize,
    pub errors: usize,
    pub warnings: usize,
    pub results: Vec<FileResult>,
}

impl LintResult {
    /// Returns true if all files passed (no errors).
    pub fn is_ok(&self) -> bool {
        self.errors == 0
    }
}

/// Lint a file or directory.
///
/// If path is a directory, recursively finds all .json, .yaml and .yml
/// files. If `strict` is true, warnings are treated as errors.
pub fn lint(path: &Path, strict: bool) -> LintResult {
    let files = collect_document_files(path);
    let results: Vec<FileResult> = files.iter().map(|file| lint_file(file, path)).collect();

    let count = |severity: Severity| -> usize {
        results
            .iter()
            .flat_map(|r| &r.diagnostics)
            .filter(|d| d.severity == severity)
            .count()
    };
    let errors = count(Severity::Error);
    let warnings = count(Severity::Warning);

    let failed = results
        .iter()
        .filter(|r| {
            if strict {
                r.status != FileStatus::Ok
            } else {
                r.status == FileStatus::Error
            }
        })
        .count();

    LintResult {
        path: path.to_path_buf(),
        files_checked: files.len(),
        passed: files.len() - failed,
        failed,
        errors,
        warnings,
        results,
    }
}

/// Lint a single document file.
pub fn lint_file(file: &Path, base_path: &Path) -> FileResult {
    let mut diagnostics = Vec::new();
    let display = file.strip_prefix(base_path).unwrap_or(file).to_path_buf();

    let document = match load_document(file) {
        Ok(d) => d,
        Err(e) => {
            diagnostics.push(Diagnostic {
                severity: Severity::Error,
                code: "E001".to_string(),
                file: file.to_path_buf(),
                path: "#".to_string(),
                message: format!("syntax error: {}", e),
            });
            return FileResult {
                file: display,
                status: FileStatus::Error,
                diagnostics,
            };
        }
    };

    check_refs(&document, file, "#", &document, &mut diagnostics);

    if document.get("openapi").is_none() {
        diagnostics.push(Diagnostic {
            severity: Severity::Warning,
            code: "W002".to_string(),
            file: file.to_path_buf(),
            path: "#".to_string(),
            message: "document missing openapi version field".to_string(),
        });
    }

    // Broken anchors would resurface as E010 on every schema using them.
    if !diagnostics.iter().any(|d| d.code == "E003") {
        check_composition(&document, file, &mut diagnostics);
    }

    let has_errors = diagnostics.iter().any(|d| d.severity == Severity::Error);
    let has_warnings = diagnostics.iter().any(|d| d.severity == Severity::Warning);

    let status = if has_errors {
        FileStatus::Error
    } else if has_warnings {
        FileStatus::Warning
    } else {
        FileStatus::Ok
    };

    FileResult {
        file: display,
        status,
        diagnostics,
    }
}

/// Recursively check local $ref values in a document.
fn check_refs(
    value: &Value,
    file: &Path,
    path: &str,
    root: &Value,
    diagnostics: &mut Vec<Diagnostic>,
) {
    match value {
        Value::Object(map) => {
            if let Some(Value::String(ref_val)) = map.get("$ref") {
                check_single_ref(ref_val, file, path, root, diagnostics);
            }

            for (key, val) in map {
                let child_path = format!("{}/{}", path, key.replace('~', "~0").replace('/', "~1"));
                check_refs(val, file, &child_path, root, diagnostics);
            }
        }
        Value::Array(arr) => {
            for (i, item) in arr.iter().enumerate() {
                let child_path = format!("{}/{}", path, i);
                check_refs(item, file, &child_path, root, diagnostics);
            }
        }
        _ => {}
    }
}

/// Check a single $ref value.
///
/// Only local anchors are checked; external files and URLs are skipped.
fn check_single_ref(
    ref_val: &str,
    file: &Path,
    path: &str,
    root: &Value,
    diagnostics: &mut Vec<Diagnostic>,
) {
    if is_url(ref_val) || !ref_val.starts_with('#') || ref_val == "#" {
        return;
    }

    if navigate_fragment(root, ref_val).is_err() {
        diagnostics.push(Diagnostic {
            severity: Severity::Error,
            code: "E003".to_string(),
            file: file.to_path_buf(),
            path: path.to_string(),
            message: format!("anchor not found: {}", ref_val),
        });
    }
}

/// Compose the whole document and report what failed.
fn check_composition(document: &Value, file: &Path, diagnostics: &mut Vec<Diagnostic>) {
    let options = ComposeOptions::new().policy(ErrorPolicy::Skip);
    match compose_document(document, &options) {
        Ok(report) => {
            debug!(file = %file.display(), composed = report.composed, "composition checked");
            diagnostics.extend(
                report
                    .diagnostics
                    .into_iter()
                    .map(|d| from_compose(d, file)),
            );
        }
        Err(e) => diagnostics.push(Diagnostic {
            severity: Severity::Error,
            code: "E010".to_string(),
            file: file.to_path_buf(),
            path: e.path.clone(),
            message: e.source.to_string(),
        }),
    }
}

fn from_compose(diagnostic: ComposeDiagnostic, file: &Path) -> Diagnostic {
    Diagnostic {
        severity: diagnostic.severity,
        code: diagnostic.code,
        file: file.to_path_buf(),
        path: diagnostic.path,
        message: diagnostic.message,
    }
}

/// Collect all document files in a path (file or directory).
fn collect_document_files(path: &Path) -> Vec<PathBuf> {
    if path.is_file() {
        if is_document_path(path) {
            return vec![path.to_path_buf()];
        }
        return vec![];
    }

    let mut files = Vec::new();
    collect_files_recursive(path, &mut files);
    files.sort();
    files
}

fn collect_files_recursive(dir: &Path, files: &mut Vec<PathBuf>) {
    let Ok(entries) = std::fs::read_dir(dir) else {
        return;
    };

    for entry in entries.flatten() {
        let path = entry.path();
        if path.is_dir() {
            collect_files_recursive(&path, files);
        } else if is_document_path(&path) {
            files.push(path);
        }
    }
}
