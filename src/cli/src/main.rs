use anyhow::{Context, Result};
use clap::Parser;
use colored::control as color_control;
use pgshift::cli::commands::apply::{ApplyCommand, ApplyCommandHandler};
use pgshift::cli::commands::init::{InitCommand, InitCommandHandler};
use pgshift::cli::commands::plan::{PlanCommand, PlanCommandHandler};
use pgshift::cli::commands::status::{StatusCommand, StatusCommandHandler};
use pgshift::cli::commands::validate::{ValidateCommand, ValidateCommandHandler};
use pgshift::cli::{Cli, Commands};
use std::env;
use std::path::PathBuf;
use std::process;
use tracing_subscriber::EnvFilter;

fn main() {
    // CLIをパースして実行
    let cli = Cli::parse();

    init_tracing(cli.verbose);

    // 非同期ランタイムを作成して実行
    let runtime = tokio::runtime::Runtime::new()
        .context("Failed to create Tokio runtime")
        .unwrap_or_else(|e| {
            eprintln!("Error: {:#}", e);
            process::exit(1);
        });

    let result = runtime.block_on(run_command(cli));

    match result {
        Ok(output) => {
            if !output.is_empty() {
                println!("{}", output);
            }
        }
        Err(e) => {
            eprintln!("Error: {:#}", e);
            process::exit(1);
        }
    }
}

/// ログ出力を初期化する
///
/// `--verbose` はdebug、それ以外は `RUST_LOG`（未設定ならwarn）に従う。
fn init_tracing(verbose: bool) {
    let filter = if verbose {
        EnvFilter::new("debug")
    } else {
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn"))
    };

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_target(false)
        .init();
}

/// コマンドを実行する
async fn run_command(cli: Cli) -> Result<String> {
    // --no-color フラグの処理
    if cli.no_color {
        color_control::set_override(false);
    }

    // プロジェクトのルートパスを取得
    let project_path = env::current_dir()?;

    // --config フラグの処理（絶対パスに変換）
    let config_path: Option<PathBuf> = cli.config.map(|p| {
        if p.is_absolute() {
            p
        } else {
            project_path.join(p)
        }
    });

    let format = cli.format;

    match cli.command {
        Commands::Init {
            env,
            database,
            host,
            port,
            user,
            force,
        } => {
            let handler = InitCommandHandler::new();
            let command = InitCommand {
                project_path,
                config_path,
                env,
                database,
                host,
                port,
                user,
                force,
            };
            let path = handler.execute(&command)?;
            Ok(format!("Created {}", path.display()))
        }

        Commands::Plan {
            to,
            from,
            env,
            seed,
            output,
        } => {
            let handler = PlanCommandHandler::new();
            let command = PlanCommand {
                project_path,
                config_path,
                to,
                from,
                env,
                seed,
                output,
                format,
            };
            handler.execute(&command).await
        }

        Commands::Apply {
            to,
            env,
            dry_run,
            timeout,
            seed,
            allow_errors,
        } => {
            let handler = ApplyCommandHandler::new();
            let command = ApplyCommand {
                project_path,
                config_path,
                to,
                env,
                dry_run,
                timeout,
                seed,
                allow_errors,
                format,
            };
            handler.execute(&command).await
        }

        Commands::Validate { to, from } => {
            let handler = ValidateCommandHandler::new();
            let command = ValidateCommand {
                project_path,
                config_path,
                to,
                from,
                format,
            };
            handler.execute(&command)
        }

        Commands::Status { env, to } => {
            let handler = StatusCommandHandler::new();
            let command = StatusCommand {
                project_path,
                config_path,
                env,
                to,
                format,
            };
            handler.execute(&command).await
        }
    }
}
