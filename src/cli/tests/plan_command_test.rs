// planコマンドのテスト（--from 指定、DB接続なし）

mod common;

use common::{blog_snapshot, malformed_snapshot, users_snapshot, TestProject};
use pgshift::cli::commands::plan::{PlanCommand, PlanCommandHandler};
use pgshift::cli::OutputFormat;
use pgshift::core::db_meta::DbMeta;
use std::path::PathBuf;

fn plan_command(project: &TestProject, from: PathBuf, to: PathBuf) -> PlanCommand {
    PlanCommand {
        project_path: project.project_path.clone(),
        config_path: None,
        to,
        from: Some(from),
        env: "development".to_string(),
        seed: None,
        output: None,
        format: OutputFormat::Text,
    }
}

#[tokio::test]
async fn test_plan_from_empty_tree() {
    colored::control::set_override(false);
    let project = TestProject::new();
    let from = project.write_snapshot("empty.json", &DbMeta::new());
    let to = project.write_snapshot("schema.json", &users_snapshot());

    let output = PlanCommandHandler::new()
        .execute(&plan_command(&project, from, to))
        .await
        .unwrap();

    assert!(output.contains("=== Migration Plan ==="));
    assert!(output.contains("From: snapshot file"));
    assert!(output.contains(r#"CREATE SCHEMA IF NOT EXISTS "app";"#));
    assert!(output.contains(r#"CREATE TABLE IF NOT EXISTS "app"."User"();"#));
    assert!(output.contains("Errors: 0"));
}

#[tokio::test]
async fn test_plan_without_changes() {
    colored::control::set_override(false);
    let project = TestProject::new();
    let from = project.write_snapshot("old.json", &users_snapshot());
    let to = project.write_snapshot("new.yaml", &users_snapshot());

    let output = PlanCommandHandler::new()
        .execute(&plan_command(&project, from, to))
        .await
        .unwrap();

    assert!(output.contains("-- No changes"));
    assert!(output.contains("Statements: 0"));
}

#[tokio::test]
async fn test_plan_json_output() {
    let project = TestProject::new();
    let from = project.write_snapshot("old.json", &users_snapshot());
    let to = project.write_snapshot("new.json", &blog_snapshot());

    let mut command = plan_command(&project, from, to);
    command.format = OutputFormat::Json;
    let output = PlanCommandHandler::new().execute(&command).await.unwrap();

    let json: serde_json::Value = serde_json::from_str(&output).unwrap();
    assert_eq!(json["source"], "file");
    assert_eq!(json["errors"].as_array().unwrap().len(), 0);
    let commands = json["commands"].as_array().unwrap();
    assert!(commands.iter().any(|c| c
        .as_str()
        .unwrap()
        .contains(r#"CREATE TABLE IF NOT EXISTS "app"."Post"();"#)));
    assert!(commands
        .iter()
        .any(|c| c.as_str().unwrap().contains("FOREIGN KEY")));
    assert!(json.get("output_file").is_none());
}

#[tokio::test]
async fn test_plan_writes_sql_file() {
    colored::control::set_override(false);
    let project = TestProject::new();
    let from = project.write_snapshot("empty.json", &DbMeta::new());
    let to = project.write_snapshot("schema.json", &users_snapshot());

    let mut command = plan_command(&project, from, to);
    command.output = Some(PathBuf::from("migration.sql"));
    let output = PlanCommandHandler::new().execute(&command).await.unwrap();

    let sql = project.read(&project.path("migration.sql"));
    assert!(sql.starts_with("-- Generated by pgshift\n"));
    assert!(sql.contains(r#"CREATE TABLE IF NOT EXISTS "app"."User"();"#));
    assert!(output.contains("statement(s) to"));
    assert!(!output.contains("--- SQL ---"));
}

#[tokio::test]
async fn test_plan_appends_seed_statements() {
    let project = TestProject::new();
    let from = project.write_snapshot("empty.json", &DbMeta::new());
    let to = project.write_snapshot("schema.json", &users_snapshot());
    let seed = project.write_file(
        "seed.sql",
        "INSERT INTO \"app\".\"User\" (\"id\", \"email\") VALUES ('00000000-0000-0000-0000-000000000001', 'a;b');\n",
    );

    let mut command = plan_command(&project, from, to);
    command.seed = Some(seed);
    command.format = OutputFormat::Json;
    let output = PlanCommandHandler::new().execute(&command).await.unwrap();

    let json: serde_json::Value = serde_json::from_str(&output).unwrap();
    let commands = json["commands"].as_array().unwrap();
    let last = commands.last().unwrap().as_str().unwrap();
    assert!(last.starts_with("INSERT INTO"));
    assert!(last.contains("'a;b'"));
}

#[tokio::test]
async fn test_plan_reports_structural_errors() {
    colored::control::set_override(false);
    let project = TestProject::new();
    let from = project.write_snapshot("empty.json", &DbMeta::new());
    let to = project.write_snapshot("broken.json", &malformed_snapshot());

    let output = PlanCommandHandler::new()
        .execute(&plan_command(&project, from, to))
        .await
        .unwrap();

    assert!(output.contains("--- Errors ---"));
    assert!(output.contains("Malformed relation"));
    assert!(output.contains("Errors: 1"));
}

#[tokio::test]
async fn test_plan_missing_snapshot() {
    let project = TestProject::new();
    let from = project.write_snapshot("empty.json", &DbMeta::new());

    let result = PlanCommandHandler::new()
        .execute(&plan_command(&project, from, project.path("missing.json")))
        .await;

    assert!(result.is_err());
}
