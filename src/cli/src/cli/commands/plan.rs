// planコマンドハンドラー
//
// 2つのツリーからマイグレーションSQLを計算して表示します。
// - 開始ツリーはファイル、または記録済みベースラインから取得
// - 構造エラーと警告の表示
// - SQLのハイライト表示、またはファイルへの書き出し

use crate::cli::command_context::CommandContext;
use crate::cli::commands::migration_report::{count_destructive, MigrationReportFormatter};
use crate::cli::commands::{render_output, CommandOutput};
use crate::cli::OutputFormat;
use crate::core::db_meta::DbMeta;
use crate::core::delta::DeltaSummary;
use crate::core::error::{MigrationError, MigrationWarning};
use crate::core::naming::APP_NAME;
use anyhow::{Context, Result};
use serde::Serialize;
use std::fs;
use std::path::PathBuf;
use tracing::debug;

/// 開始ツリーの取得元
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum PlanSource {
    /// `--from` で指定したファイル
    File,
    /// 記録済みベースライン
    Baseline,
    /// ベースライン未記録（空のツリー）
    Empty,
}

/// planコマンドの出力構造体
#[derive(Debug, Clone, Serialize)]
pub struct PlanOutput {
    pub source: PlanSource,
    pub commands: Vec<String>,
    pub errors: Vec<MigrationError>,
    pub warnings: Vec<MigrationWarning>,
    pub summary: DeltaSummary,
    pub destructive: usize,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub output_file: Option<String>,
    /// テキスト出力メッセージ
    #[serde(skip)]
    pub text_message: String,
}

impl CommandOutput for PlanOutput {
    fn to_text(&self) -> String {
        self.text_message.clone()
    }
}

/// planコマンドの入力パラメータ
#[derive(Debug, Clone)]
pub struct PlanCommand {
    /// プロジェクトのルートパス
    pub project_path: PathBuf,
    /// カスタム設定ファイルパス
    pub config_path: Option<PathBuf>,
    /// 目標ツリー
    pub to: PathBuf,
    /// 開始ツリー（省略時はベースライン）
    pub from: Option<PathBuf>,
    /// ベースラインを読む環境
    pub env: String,
    /// シードSQLファイル
    pub seed: Option<PathBuf>,
    /// SQLの書き出し先
    pub output: Option<PathBuf>,
    /// 出力フォーマット
    pub format: OutputFormat,
}

/// planコマンドハンドラー
#[derive(Debug, Default)]
pub struct PlanCommandHandler {}

impl PlanCommandHandler {
    /// 新しいPlanCommandHandlerを作成
    pub fn new() -> Self {
        Self {}
    }

    /// planコマンドを実行
    ///
    /// # Returns
    ///
    /// 成功時は計算結果の表示、失敗時はエラーメッセージ
    pub async fn execute(&self, command: &PlanCommand) -> Result<String> {
        // --from 指定時はDBに接続しないため設定ファイルは任意
        let context = match &command.from {
            Some(_) => CommandContext::load_or_default(
                command.project_path.clone(),
                command.config_path.clone(),
            )?,
            None => CommandContext::load_with_config(
                command.project_path.clone(),
                command.config_path.clone(),
            )?,
        };

        let to = context.load_snapshot(&command.to)?;
        let (from, source) = self.load_from(&context, command).await?;
        let seed = context.load_seed(command.seed.as_deref())?;
        debug!(source = ?source, seed = seed.len(), "Loaded migration inputs");

        let compiled = context.compile(&from, &to, seed)?;
        let result = compiled.result;

        let output_file = match &command.output {
            Some(path) => {
                let path = context.resolve_path(path);
                fs::write(&path, self.format_sql_file(&result.commands))
                    .with_context(|| format!("Failed to write SQL file: {:?}", path))?;
                Some(path.display().to_string())
            }
            None => None,
        };

        let mut output = PlanOutput {
            source,
            destructive: count_destructive(&result.commands),
            commands: result.commands,
            errors: result.errors,
            warnings: result.warnings,
            summary: compiled.summary,
            output_file,
            text_message: String::new(),
        };
        output.text_message = self.format_plan(&output);

        render_output(&output, &command.format)
    }

    /// 開始ツリーを読み込む
    async fn load_from(
        &self,
        context: &CommandContext,
        command: &PlanCommand,
    ) -> Result<(DbMeta, PlanSource)> {
        if let Some(path) = &command.from {
            return Ok((context.load_snapshot(path)?, PlanSource::File));
        }

        let (pool, baseline) = context.connect_and_load_baseline(&command.env).await?;
        pool.close().await;

        Ok(match baseline {
            Some(record) => (record.state, PlanSource::Baseline),
            None => (DbMeta::new(), PlanSource::Empty),
        })
    }

    /// 書き出し用のSQLファイル内容
    pub fn format_sql_file(&self, commands: &[String]) -> String {
        let mut content = format!("-- Generated by {}\n", APP_NAME);
        for command in commands {
            content.push_str(command);
            content.push('\n');
        }
        content
    }

    /// テキスト出力を組み立てる
    pub fn format_plan(&self, output: &PlanOutput) -> String {
        let mut text = String::new();
        MigrationReportFormatter::append_header(&mut text, "Migration Plan");

        let source = match output.source {
            PlanSource::File => "snapshot file",
            PlanSource::Baseline => "recorded baseline",
            PlanSource::Empty => "empty database (no baseline recorded)",
        };
        text.push_str(&format!("From: {}\n\n", source));

        MigrationReportFormatter::append_errors(&mut text, &output.errors);
        MigrationReportFormatter::append_warnings(&mut text, &output.warnings);

        match &output.output_file {
            Some(path) => text.push_str(&format!(
                "Wrote {} statement(s) to {}\n\n",
                output.commands.len(),
                path
            )),
            None => MigrationReportFormatter::append_statements(&mut text, &output.commands),
        }

        MigrationReportFormatter::append_summary(
            &mut text,
            &output.summary,
            &output.commands,
            output.errors.len(),
            output.warnings.len(),
        );
        text
    }
}
