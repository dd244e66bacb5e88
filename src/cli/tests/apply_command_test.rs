// apply / status コマンドのE2Eテスト
//
// Docker必須のテストは #[ignore] でマークされています。
// 実行するには: `cargo test --test apply_command_test -- --ignored`

mod common;

use common::{blog_snapshot, malformed_snapshot, users_snapshot, TestProject};
use pgshift::cli::commands::apply::{ApplyCommand, ApplyCommandHandler};
use pgshift::cli::commands::plan::{PlanCommand, PlanCommandHandler};
use pgshift::cli::commands::status::{StatusCommand, StatusCommandHandler};
use pgshift::cli::OutputFormat;
use pgshift::core::config::DatabaseConfig;
use std::path::PathBuf;
use testcontainers::{runners::AsyncRunner, ContainerAsync, ImageExt};
use testcontainers_modules::postgres::Postgres;

async fn start_postgres() -> (ContainerAsync<Postgres>, u16) {
    let container = Postgres::default().with_tag("16-alpine").start().await.unwrap();
    let port = container.get_host_port_ipv4(5432).await.unwrap();
    (container, port)
}

fn project_for(port: u16) -> TestProject {
    let project = TestProject::new();
    project.write_config(DatabaseConfig {
        host: "127.0.0.1".to_string(),
        port: Some(port),
        database: "postgres".to_string(),
        user: Some("postgres".to_string()),
        password: Some("postgres".to_string()),
        ..Default::default()
    });
    project
}

fn apply_command(project: &TestProject, to: PathBuf) -> ApplyCommand {
    ApplyCommand {
        project_path: project.project_path.clone(),
        config_path: None,
        to,
        env: "development".to_string(),
        dry_run: false,
        timeout: Some(30),
        seed: None,
        allow_errors: false,
        format: OutputFormat::Text,
    }
}

fn status_command(project: &TestProject, to: Option<PathBuf>) -> StatusCommand {
    StatusCommand {
        project_path: project.project_path.clone(),
        config_path: None,
        env: "development".to_string(),
        to,
        format: OutputFormat::Json,
    }
}

#[tokio::test]
#[ignore] // Docker必須
async fn test_apply_records_baseline_and_skips_rerun() {
    colored::control::set_override(false);
    let (_container, port) = start_postgres().await;
    let project = project_for(port);
    let to = project.write_snapshot("schema.json", &users_snapshot());
    let handler = ApplyCommandHandler::new();

    let output = handler.execute(&apply_command(&project, to.clone())).await.unwrap();
    assert!(output.contains("Applied"), "{}", output);

    let output = handler.execute(&apply_command(&project, to.clone())).await.unwrap();
    assert!(output.contains("Nothing to apply"), "{}", output);

    let status = StatusCommandHandler::new()
        .execute(&status_command(&project, Some(to)))
        .await
        .unwrap();
    let json: serde_json::Value = serde_json::from_str(&status).unwrap();
    assert_eq!(json["baseline_count"], 1);
    assert_eq!(json["baseline"]["tables"], 1);
    assert_eq!(json["target"]["up_to_date"], true);
    assert_eq!(json["target"]["pending_statements"], 0);
}

#[tokio::test]
#[ignore] // Docker必須
async fn test_plan_against_recorded_baseline() {
    colored::control::set_override(false);
    let (_container, port) = start_postgres().await;
    let project = project_for(port);
    let users = project.write_snapshot("users.json", &users_snapshot());
    let blog = project.write_snapshot("blog.json", &blog_snapshot());

    let command = PlanCommand {
        project_path: project.project_path.clone(),
        config_path: None,
        to: users.clone(),
        from: None,
        env: "development".to_string(),
        seed: None,
        output: None,
        format: OutputFormat::Text,
    };
    let output = PlanCommandHandler::new().execute(&command).await.unwrap();
    assert!(output.contains("From: empty database"));

    ApplyCommandHandler::new()
        .execute(&apply_command(&project, users))
        .await
        .unwrap();

    let output = PlanCommandHandler::new()
        .execute(&PlanCommand { to: blog, ..command })
        .await
        .unwrap();
    assert!(output.contains("From: recorded baseline"));
    assert!(output.contains(r#"CREATE TABLE IF NOT EXISTS "app"."Post"();"#));
    assert!(!output.contains(r#"CREATE TABLE IF NOT EXISTS "app"."User"();"#));
}

#[tokio::test]
#[ignore] // Docker必須
async fn test_apply_dry_run_leaves_database_untouched() {
    colored::control::set_override(false);
    let (_container, port) = start_postgres().await;
    let project = project_for(port);
    let to = project.write_snapshot("schema.json", &blog_snapshot());

    let mut command = apply_command(&project, to);
    command.dry_run = true;
    let output = ApplyCommandHandler::new().execute(&command).await.unwrap();
    assert!(output.contains("FOREIGN KEY"), "{}", output);

    let status = StatusCommandHandler::new()
        .execute(&status_command(&project, None))
        .await
        .unwrap();
    let json: serde_json::Value = serde_json::from_str(&status).unwrap();
    assert_eq!(json["baseline_count"], 0);
    assert!(json.get("baseline").is_none());
}

#[tokio::test]
#[ignore] // Docker必須
async fn test_apply_refuses_structural_errors() {
    let (_container, port) = start_postgres().await;
    let project = project_for(port);
    let to = project.write_snapshot("broken.json", &malformed_snapshot());

    let error = ApplyCommandHandler::new()
        .execute(&apply_command(&project, to.clone()))
        .await
        .unwrap_err();
    assert!(format!("{:#}", error).contains("--allow-errors"));

    let mut command = apply_command(&project, to);
    command.allow_errors = true;
    let output = ApplyCommandHandler::new().execute(&command).await.unwrap();
    assert!(output.contains("Applied"), "{}", output);
}

#[tokio::test]
#[ignore] // Docker必須
async fn test_apply_rolls_back_failed_seed() {
    let (_container, port) = start_postgres().await;
    let project = project_for(port);
    let to = project.write_snapshot("schema.json", &users_snapshot());
    let seed = project.write_file("seed.sql", "INSERT INTO \"app\".\"Missing\" VALUES (1);\n");

    let mut command = apply_command(&project, to);
    command.seed = Some(seed);
    let error = ApplyCommandHandler::new().execute(&command).await.unwrap_err();
    assert!(format!("{:#}", error).contains("Failed statement"));

    let status = StatusCommandHandler::new()
        .execute(&status_command(&project, None))
        .await
        .unwrap();
    let json: serde_json::Value = serde_json::from_str(&status).unwrap();
    assert_eq!(json["baseline_count"], 0);
}
