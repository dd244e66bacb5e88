// validateコマンドハンドラー
//
// 目標ツリーを計算パイプラインに通し、構造エラーとポリシー警告を報告します。
// データベースには接続しません。

use crate::cli::command_context::CommandContext;
use crate::cli::commands::migration_report::MigrationReportFormatter;
use crate::cli::commands::{render_output, CommandOutput};
use crate::cli::OutputFormat;
use crate::core::db_meta::DbMeta;
use crate::core::error::{MigrationError, MigrationWarning};
use anyhow::{anyhow, Result};
use colored::Colorize;
use serde::Serialize;
use std::path::PathBuf;

/// validateコマンドの出力構造体
#[derive(Debug, Clone, Serialize)]
pub struct ValidateOutput {
    pub valid: bool,
    pub errors: Vec<MigrationError>,
    pub warnings: Vec<MigrationWarning>,
    pub statistics: SnapshotStatistics,
    /// テキスト出力メッセージ
    #[serde(skip)]
    pub text_message: String,
}

/// 目標ツリーの統計
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct SnapshotStatistics {
    pub schemas: usize,
    pub tables: usize,
    pub columns: usize,
    pub constraints: usize,
    pub enums: usize,
    pub relations: usize,
}

impl SnapshotStatistics {
    pub fn from_meta(meta: &DbMeta) -> Self {
        Self {
            schemas: meta.schemas.len(),
            tables: meta.tables().count(),
            columns: meta.tables().map(|t| t.columns.len()).sum(),
            constraints: meta.tables().map(|t| t.constraints.len()).sum(),
            enums: meta.enums.len(),
            relations: meta.relations.len(),
        }
    }
}

impl CommandOutput for ValidateOutput {
    fn to_text(&self) -> String {
        self.text_message.clone()
    }
}

/// validateコマンドの入力パラメータ
#[derive(Debug, Clone)]
pub struct ValidateCommand {
    /// プロジェクトのルートパス
    pub project_path: PathBuf,
    /// カスタム設定ファイルパス
    pub config_path: Option<PathBuf>,
    /// 目標ツリー
    pub to: PathBuf,
    /// 開始ツリー（省略時は空）
    pub from: Option<PathBuf>,
    /// 出力フォーマット
    pub format: OutputFormat,
}

/// validateコマンドハンドラー
#[derive(Debug, Default)]
pub struct ValidateCommandHandler {}

impl ValidateCommandHandler {
    /// 新しいValidateCommandHandlerを作成
    pub fn new() -> Self {
        Self {}
    }

    /// validateコマンドを実行
    ///
    /// # Returns
    ///
    /// 構造エラーがなければ検証結果、あればエラーとして検証結果を返す
    pub fn execute(&self, command: &ValidateCommand) -> Result<String> {
        let context = CommandContext::load_or_default(
            command.project_path.clone(),
            command.config_path.clone(),
        )?;

        let to = context.load_snapshot(&command.to)?;
        let from = match &command.from {
            Some(path) => context.load_snapshot(path)?,
            None => DbMeta::new(),
        };

        let result = context.compile(&from, &to, Vec::new())?.result;

        let mut output = ValidateOutput {
            valid: result.is_valid(),
            errors: result.errors,
            warnings: result.warnings,
            statistics: SnapshotStatistics::from_meta(&to),
            text_message: String::new(),
        };
        output.text_message = self.format_validation(&output);

        let rendered = render_output(&output, &command.format)?;
        if output.valid {
            Ok(rendered)
        } else {
            Err(anyhow!(rendered))
        }
    }

    /// テキスト出力を組み立てる
    pub fn format_validation(&self, output: &ValidateOutput) -> String {
        let mut text = String::new();
        MigrationReportFormatter::append_header(&mut text, "Snapshot Validation Results");
        MigrationReportFormatter::append_errors(&mut text, &output.errors);
        MigrationReportFormatter::append_warnings(&mut text, &output.warnings);

        let stats = &output.statistics;
        text.push_str("=== Statistics ===\n");
        text.push_str(&format!("Schemas: {}\n", stats.schemas));
        text.push_str(&format!("Tables: {}\n", stats.tables));
        text.push_str(&format!("Columns: {}\n", stats.columns));
        text.push_str(&format!("Constraints: {}\n", stats.constraints));
        text.push_str(&format!("Enums: {}\n", stats.enums));
        text.push_str(&format!("Relations: {}\n", stats.relations));

        text.push_str("\n=== Result ===\n");
        if output.valid {
            text.push_str(&format!(
                "{} Validation complete. No errors found.\n",
                "✓".green()
            ));
        } else {
            text.push_str(&format!(
                "{} Validation complete. {} error(s) found.\n",
                "✗".red(),
                output.errors.len()
            ));
        }
        text
    }
}
