// applyコマンドハンドラー
//
// マイグレーションの適用機能を実装します。
// - データベース接続と記録済みベースラインの読み込み
// - 目標ツリーとの差分からSQLを計算
// - 構造エラーがあれば中断（--allow-errors で続行）
// - 1つのトランザクションで実行し、ベースラインを更新

use crate::cli::command_context::CommandContext;
use crate::cli::commands::migration_report::MigrationReportFormatter;
use crate::cli::commands::{render_output, CommandOutput};
use crate::cli::OutputFormat;
use crate::core::db_meta::DbMeta;
use crate::core::delta::DeltaSummary;
use crate::core::migration::MigrationResult;
use anyhow::{anyhow, Context, Result};
use colored::Colorize;
use serde::Serialize;
use std::path::PathBuf;
use tracing::{debug, info, warn};

/// applyコマンドの出力構造体
#[derive(Debug, Clone, Serialize)]
pub struct ApplyOutput {
    /// Dry runモードかどうか
    pub dry_run: bool,
    /// 実行した文の数
    pub executed: usize,
    /// ベースラインを更新したか
    pub baseline_updated: bool,
    /// 目標ツリーのチェックサム
    #[serde(skip_serializing_if = "Option::is_none")]
    pub checksum: Option<String>,
    /// 実行時間（ミリ秒）
    pub duration_ms: i64,
    /// Dry run時の文
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub commands: Vec<String>,
    /// 警告メッセージ
    pub warnings: Vec<String>,
    /// メッセージ
    #[serde(skip)]
    pub message: String,
}

impl CommandOutput for ApplyOutput {
    fn to_text(&self) -> String {
        self.message.clone()
    }
}

/// applyコマンドの入力パラメータ
#[derive(Debug, Clone)]
pub struct ApplyCommand {
    /// プロジェクトのルートパス
    pub project_path: PathBuf,
    /// カスタム設定ファイルパス
    pub config_path: Option<PathBuf>,
    /// 目標ツリー
    pub to: PathBuf,
    /// 対象環境
    pub env: String,
    /// Dry run - 実行せずにSQLを表示
    pub dry_run: bool,
    /// 文単位タイムアウト（秒）
    pub timeout: Option<u64>,
    /// シードSQLファイル
    pub seed: Option<PathBuf>,
    /// 構造エラーがあっても適用する
    pub allow_errors: bool,
    /// 出力フォーマット
    pub format: OutputFormat,
}

/// applyコマンドハンドラー
#[derive(Debug, Default)]
pub struct ApplyCommandHandler {}

impl ApplyCommandHandler {
    /// 新しいApplyCommandHandlerを作成
    pub fn new() -> Self {
        Self {}
    }

    /// applyコマンドを実行
    ///
    /// # Returns
    ///
    /// 成功時は適用結果の概要、失敗時はエラーメッセージ
    pub async fn execute(&self, command: &ApplyCommand) -> Result<String> {
        let context = CommandContext::load_with_config(
            command.project_path.clone(),
            command.config_path.clone(),
        )?;

        let target = context.load_snapshot(&command.to)?;
        let seed = context.load_seed(command.seed.as_deref())?;
        let db_config = context.database_config(&command.env)?;

        let (pool, baseline) = context.connect_and_load_baseline(&command.env).await?;
        let from = baseline
            .map(|record| record.state)
            .unwrap_or_else(DbMeta::new);

        let compiled = context.compile(&from, &target, seed)?;
        let result = compiled.result;
        let warnings: Vec<String> = result.warnings.iter().map(|w| w.format()).collect();

        if !result.is_valid() {
            if command.allow_errors {
                warn!(errors = result.errors.len(), "Applying despite structural errors");
            } else {
                pool.close().await;
                return Err(anyhow!(
                    "Migration has {} structural error(s):\n{}\n\nFix the target snapshot or rerun with --allow-errors",
                    result.errors.len(),
                    result.errors_to_string()
                ));
            }
        }

        if command.dry_run {
            pool.close().await;
            let output = ApplyOutput {
                dry_run: true,
                executed: 0,
                baseline_updated: false,
                checksum: None,
                duration_ms: 0,
                message: self.format_dry_run(&result, &compiled.summary),
                commands: result.commands,
                warnings,
            };
            return render_output(&output, &command.format);
        }

        let statement_timeout = command.timeout.or(db_config.statement_timeout);
        debug!(
            statements = result.commands.len(),
            statement_timeout = ?statement_timeout,
            "Applying migration"
        );

        let applied = context
            .applier()
            .apply(&pool, &result.commands, &target, statement_timeout)
            .await;
        pool.close().await;

        let report = applied.map_err(|e| match e.failed_sql() {
            Some(sql) => anyhow!("{}\nFailed statement: {}", e, sql),
            None => anyhow!(e),
        })
        .with_context(|| format!("Failed to apply migration to '{}'", command.env))?;

        info!(executed = report.executed, env = %command.env, "Apply finished");

        let message = if report.baseline_updated {
            format!(
                "{} Applied {} statement(s) in {}ms\nBaseline: {}",
                "✓".green(),
                report.executed,
                report.duration_ms,
                report.checksum
            )
        } else {
            "Database is up to date. Nothing to apply.".to_string()
        };

        let output = ApplyOutput {
            dry_run: false,
            executed: report.executed,
            baseline_updated: report.baseline_updated,
            checksum: Some(report.checksum),
            duration_ms: report.duration_ms,
            commands: Vec::new(),
            warnings,
            message: self.append_warnings(message, &result),
        };
        render_output(&output, &command.format)
    }

    /// Dry run時の表示
    pub fn format_dry_run(&self, result: &MigrationResult, summary: &DeltaSummary) -> String {
        let mut text = String::new();
        MigrationReportFormatter::append_header(&mut text, "Dry Run: Migration Preview");
        MigrationReportFormatter::append_errors(&mut text, &result.errors);
        MigrationReportFormatter::append_warnings(&mut text, &result.warnings);
        MigrationReportFormatter::append_statements(&mut text, &result.commands);
        MigrationReportFormatter::append_summary(
            &mut text,
            summary,
            &result.commands,
            result.errors.len(),
            result.warnings.len(),
        );
        text
    }

    fn append_warnings(&self, mut message: String, result: &MigrationResult) -> String {
        if result.warnings.is_empty() {
            return message;
        }
        message.push_str("\n\n");
        MigrationReportFormatter::append_warnings(&mut message, &result.warnings);
        message.trim_end().to_string()
    }
}
