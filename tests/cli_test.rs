//! CLI integration tests for openapi-compose binary.

use assert_cmd::Command;
use predicates::prelude::*;
use std::fs;
use tempfile::TempDir;

fn cmd() -> Command {
    Command::new(assert_cmd::cargo::cargo_bin!("openapi-compose"))
}

// Helper to create a temp document file
fn write_temp_file(dir: &TempDir, name: &str, content: &str) -> std::path::PathBuf {
    let path = dir.path().join(name);
    fs::write(&path, content).unwrap();
    path
}

const PETSTORE: &str = r##"{
    "openapi": "3.0.3",
    "info": { "title": "Pets", "version": "1" },
    "paths": {},
    "components": {
        "schemas": {
            "Named": {
                "type": "object",
                "properties": { "name": { "type": "string" } },
                "required": ["name"]
            },
            "Pet": {
                "allOf": [
                    { "$ref": "#/components/schemas/Named" },
                    { "type": "object", "properties": { "age": { "type": "integer" } } }
                ]
            }
        }
    }
}"##;

const CONFLICTING: &str = r#"{
    "openapi": "3.0.3",
    "components": {
        "schemas": {
            "Id": { "allOf": [{ "type": "string" }, { "type": "integer" }] },
            "Count": { "allOf": [{ "type": "integer" }, { "minimum": 0 }] }
        }
    }
}"#;

mod compose_command {
    use super::*;

    #[test]
    fn basic_compose() {
        let dir = TempDir::new().unwrap();
        let document = write_temp_file(&dir, "openapi.json", PETSTORE);

        cmd()
            .args(["compose", document.to_str().unwrap()])
            .assert()
            .success()
            .stdout(predicate::str::contains("allOf").not())
            .stdout(predicate::str::contains(
                r#""age":{"type":"integer"}"#,
            ));
    }

    #[test]
    fn compose_yaml_document() {
        let dir = TempDir::new().unwrap();
        let document = write_temp_file(
            &dir,
            "openapi.yaml",
            "openapi: 3.0.3\ncomponents:\n  schemas:\n    Code:\n      allOf:\n        - type: string\n        - maxLength: 4\n",
        );

        cmd()
            .args(["compose", document.to_str().unwrap()])
            .assert()
            .success()
            .stdout(predicate::str::contains(
                r#""Code":{"type":"string","maxLength":4}"#,
            ));
    }

    #[test]
    fn compose_with_pointer() {
        let dir = TempDir::new().unwrap();
        let document = write_temp_file(&dir, "openapi.json", PETSTORE);

        cmd()
            .args([
                "compose",
                document.to_str().unwrap(),
                "--pointer",
                "#/components/schemas/Pet",
            ])
            .assert()
            .success()
            .stdout(predicate::str::starts_with(r#"{"type":"object""#))
            .stdout(predicate::str::contains("openapi").not());
    }

    #[test]
    fn compose_with_pretty() {
        let dir = TempDir::new().unwrap();
        let document = write_temp_file(&dir, "openapi.json", PETSTORE);

        cmd()
            .args(["compose", document.to_str().unwrap(), "--pretty"])
            .assert()
            .success()
            .stdout(predicate::str::contains("{\n"));
    }

    #[test]
    fn compose_with_output_file() {
        let dir = TempDir::new().unwrap();
        let document = write_temp_file(&dir, "openapi.json", PETSTORE);
        let output = dir.path().join("composed.json");

        cmd()
            .args([
                "compose",
                document.to_str().unwrap(),
                "--output",
                output.to_str().unwrap(),
            ])
            .assert()
            .success()
            .stdout(predicate::str::is_empty());

        let content = fs::read_to_string(&output).unwrap();
        assert!(content.contains(r#""required":["name"]"#));
    }

    #[test]
    fn conflict_exits_with_2() {
        let dir = TempDir::new().unwrap();
        let document = write_temp_file(&dir, "openapi.json", CONFLICTING);

        cmd()
            .args(["compose", document.to_str().unwrap()])
            .assert()
            .code(2)
            .stderr(predicate::str::contains("#/components/schemas/Id"))
            .stderr(predicate::str::contains("type conflict"));
    }

    #[test]
    fn keep_going_reports_and_continues() {
        let dir = TempDir::new().unwrap();
        let document = write_temp_file(&dir, "openapi.json", CONFLICTING);

        cmd()
            .args(["compose", document.to_str().unwrap(), "--keep-going"])
            .assert()
            .code(2)
            .stdout(predicate::str::contains(
                r#""Count":{"type":"integer","minimum":0}"#,
            ))
            .stderr(predicate::str::contains("error[E010]"));
    }

    #[test]
    fn missing_file_exits_with_3() {
        cmd()
            .args(["compose", "/nonexistent/openapi.json"])
            .assert()
            .code(3)
            .stderr(predicate::str::contains("file not found"));
    }

    #[test]
    fn invalid_json_exits_with_2() {
        let dir = TempDir::new().unwrap();
        let document = write_temp_file(&dir, "openapi.json", "{ not json");

        cmd()
            .args(["compose", document.to_str().unwrap()])
            .assert()
            .code(2)
            .stderr(predicate::str::contains("invalid JSON"));
    }

    #[test]
    fn verbose_logs_to_stderr() {
        let dir = TempDir::new().unwrap();
        let document = write_temp_file(&dir, "openapi.json", PETSTORE);

        cmd()
            .env_remove("RUST_LOG")
            .args(["--verbose", "compose", document.to_str().unwrap()])
            .assert()
            .success()
            .stderr(predicate::str::contains("composed schema"));
    }
}

#[cfg(feature = "remote")]
mod remote {
    use super::*;

    #[test]
    fn compose_from_url() {
        let mut server = mockito::Server::new();
        let _mock = server
            .mock("GET", "/openapi.json")
            .with_status(200)
            .with_body(PETSTORE)
            .create();

        cmd()
            .args(["compose", &format!("{}/openapi.json", server.url())])
            .assert()
            .success()
            .stdout(predicate::str::contains(r#""required":["name"]"#));
    }
}

mod lint_command {
    use super::*;

    #[test]
    fn lint_valid_document() {
        let dir = TempDir::new().unwrap();
        let document = write_temp_file(&dir, "openapi.json", PETSTORE);

        cmd()
            .args(["lint", document.to_str().unwrap()])
            .assert()
            .success()
            .stdout(predicate::str::contains("all passed"));
    }

    #[test]
    fn lint_conflict_fails() {
        let dir = TempDir::new().unwrap();
        write_temp_file(&dir, "openapi.json", CONFLICTING);

        cmd()
            .args(["lint", dir.path().to_str().unwrap()])
            .assert()
            .code(1)
            .stdout(predicate::str::contains("E010"));
    }

    #[test]
    fn lint_json_format() {
        let dir = TempDir::new().unwrap();
        write_temp_file(&dir, "openapi.json", CONFLICTING);

        let output = cmd()
            .args(["lint", dir.path().to_str().unwrap(), "--format", "json"])
            .assert()
            .code(1)
            .get_output()
            .stdout
            .clone();

        let result: serde_json::Value = serde_json::from_slice(&output).unwrap();
        assert_eq!(result["files_checked"], 1);
        assert_eq!(result["errors"], 1);
        assert_eq!(result["results"][0]["diagnostics"][0]["code"], "E010");
        assert_eq!(result["results"][0]["diagnostics"][0]["severity"], "error");
    }

    #[test]
    fn lint_strict_fails_on_warning() {
        let dir = TempDir::new().unwrap();
        write_temp_file(&dir, "api.json", r#"{"paths": {}}"#);

        cmd()
            .args(["lint", dir.path().to_str().unwrap()])
            .assert()
            .success();

        cmd()
            .args(["lint", dir.path().to_str().unwrap(), "--strict"])
            .assert()
            .code(1)
            .stdout(predicate::str::contains("W002"));
    }

    #[test]
    fn lint_quiet_hides_passing_files() {
        let dir = TempDir::new().unwrap();
        write_temp_file(&dir, "good.json", PETSTORE);

        cmd()
            .args(["lint", dir.path().to_str().unwrap(), "--quiet"])
            .assert()
            .success()
            .stdout(predicate::str::contains("good.json").not())
            .stdout(predicate::str::contains("Linting").not());
    }

    #[test]
    fn lint_missing_path() {
        cmd()
            .args(["lint", "/nonexistent/dir"])
            .assert()
            .code(2)
            .stderr(predicate::str::contains("path not found"));
    }
}
