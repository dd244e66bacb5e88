// validateコマンドのテスト

mod common;

use common::{blog_snapshot, malformed_snapshot, users_snapshot, TestProject};
use pgshift::cli::commands::validate::{ValidateCommand, ValidateCommandHandler};
use pgshift::cli::OutputFormat;
use pgshift::core::config::DatabaseConfig;
use pgshift::services::config_serializer::ConfigSerializer;
use std::path::PathBuf;

fn validate_command(project: &TestProject, to: PathBuf) -> ValidateCommand {
    ValidateCommand {
        project_path: project.project_path.clone(),
        config_path: None,
        to,
        from: None,
        format: OutputFormat::Text,
    }
}

#[test]
fn test_validate_valid_snapshot_without_config() {
    colored::control::set_override(false);
    let project = TestProject::new();
    let to = project.write_snapshot("schema.json", &blog_snapshot());

    let output = ValidateCommandHandler::new()
        .execute(&validate_command(&project, to))
        .unwrap();

    assert!(output.contains("=== Snapshot Validation Results ==="));
    assert!(output.contains("Tables: 2"));
    assert!(output.contains("Relations: 1"));
    assert!(output.contains("Validation complete. No errors found."));
}

#[test]
fn test_validate_yaml_snapshot() {
    colored::control::set_override(false);
    let project = TestProject::new();
    let to = project.write_file(
        "schema.yaml",
        r#"
schemas:
  app:
    tables:
      User:
        columns:
          id:
            kind: physical
            type: uuid
        constraints:
          User_pkey:
            type: primaryKey
            columns: [id]
"#,
    );

    let output = ValidateCommandHandler::new()
        .execute(&validate_command(&project, to))
        .unwrap();

    assert!(output.contains("Schemas: 1"));
    assert!(output.contains("Columns: 1"));
    assert!(output.contains("Constraints: 1"));
}

#[test]
fn test_validate_malformed_relation_fails() {
    colored::control::set_override(false);
    let project = TestProject::new();
    let to = project.write_snapshot("broken.json", &malformed_snapshot());

    let error = ValidateCommandHandler::new()
        .execute(&validate_command(&project, to))
        .unwrap_err()
        .to_string();

    assert!(error.contains("Malformed relation"));
    assert!(error.contains("Validation complete. 1 error(s) found."));
}

#[test]
fn test_validate_json_output() {
    let project = TestProject::new();
    let to = project.write_snapshot("schema.json", &users_snapshot());

    let mut command = validate_command(&project, to);
    command.format = OutputFormat::Json;
    let output = ValidateCommandHandler::new().execute(&command).unwrap();

    let json: serde_json::Value = serde_json::from_str(&output).unwrap();
    assert_eq!(json["valid"], true);
    assert_eq!(json["statistics"]["tables"], 1);
    assert_eq!(json["statistics"]["columns"], 2);
}

#[test]
fn test_validate_reads_explicit_config() {
    colored::control::set_override(false);
    let project = TestProject::new();
    let mut config = ConfigSerializer::initial_config(
        "development",
        DatabaseConfig {
            database: "app_dev".to_string(),
            ..Default::default()
        },
    );
    config.views.enabled = false;
    let config_path = project.write_config_file(&config);
    let to = project.write_snapshot("schema.json", &users_snapshot());

    let mut command = validate_command(&project, to);
    command.config_path = Some(config_path);
    let output = ValidateCommandHandler::new().execute(&command).unwrap();

    assert!(output.contains("Tables: 1"));
}

#[test]
fn test_validate_missing_custom_config_fails() {
    let project = TestProject::new();
    let to = project.write_snapshot("schema.json", &users_snapshot());

    let mut command = validate_command(&project, to);
    command.config_path = Some(project.path("missing.yaml"));

    assert!(ValidateCommandHandler::new().execute(&command).is_err());
}
