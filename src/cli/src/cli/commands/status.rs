// statusコマンドハンドラー
//
// 記録済みベースラインの状態を表示します。
// - 最新ベースラインのID・チェックサム・記録日時
// - 記録件数
// - --to 指定時は目標ツリーとの差分の有無と未適用の文の数

use crate::cli::command_context::CommandContext;
use crate::cli::commands::{render_output, CommandOutput};
use crate::cli::OutputFormat;
use crate::core::db_meta::DbMeta;
use crate::core::migration::BaselineRecord;
use crate::services::baseline_checksum::BaselineChecksumService;
use anyhow::{Context, Result};
use chrono::{DateTime, Utc};
use colored::Colorize;
use serde::Serialize;
use std::path::PathBuf;
use tracing::debug;

/// statusコマンドの出力構造体
#[derive(Debug, Clone, Serialize)]
pub struct StatusOutput {
    /// 環境名
    pub environment: String,
    /// 最新ベースライン
    #[serde(skip_serializing_if = "Option::is_none")]
    pub baseline: Option<BaselineSummary>,
    /// 記録件数
    pub baseline_count: i64,
    /// 目標ツリーとの比較
    #[serde(skip_serializing_if = "Option::is_none")]
    pub target: Option<TargetStatus>,
    /// テキスト出力メッセージ
    #[serde(skip)]
    pub text_message: String,
}

/// ベースラインの概要
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct BaselineSummary {
    pub id: i64,
    pub checksum: String,
    pub created_at: DateTime<Utc>,
    pub tables: usize,
}

impl BaselineSummary {
    fn from_record(record: &BaselineRecord) -> Self {
        Self {
            id: record.id,
            checksum: record.checksum.clone(),
            created_at: record.created_at,
            tables: record.state.tables().count(),
        }
    }
}

/// 目標ツリーとの比較結果
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct TargetStatus {
    pub checksum: String,
    pub up_to_date: bool,
    pub pending_statements: usize,
    pub errors: usize,
}

impl CommandOutput for StatusOutput {
    fn to_text(&self) -> String {
        self.text_message.clone()
    }
}

/// statusコマンドの入力パラメータ
#[derive(Debug, Clone)]
pub struct StatusCommand {
    /// プロジェクトのルートパス
    pub project_path: PathBuf,
    /// カスタム設定ファイルパス
    pub config_path: Option<PathBuf>,
    /// 環境名
    pub env: String,
    /// 比較する目標ツリー
    pub to: Option<PathBuf>,
    /// 出力フォーマット
    pub format: OutputFormat,
}

/// statusコマンドハンドラー
#[derive(Debug, Default)]
pub struct StatusCommandHandler {}

impl StatusCommandHandler {
    /// 新しいStatusCommandHandlerを作成
    pub fn new() -> Self {
        Self {}
    }

    /// statusコマンドを実行
    pub async fn execute(&self, command: &StatusCommand) -> Result<String> {
        let context = CommandContext::load_with_config(
            command.project_path.clone(),
            command.config_path.clone(),
        )?;

        let target = match &command.to {
            Some(path) => Some(context.load_snapshot(path)?),
            None => None,
        };

        let (pool, baseline) = context.connect_and_load_baseline(&command.env).await?;
        let baseline_count = context
            .applier()
            .count_baselines(&pool)
            .await
            .with_context(|| "Failed to count recorded baselines");
        pool.close().await;
        let baseline_count = baseline_count?;
        debug!(count = baseline_count, "Loaded baseline status");

        let target = match target {
            Some(target) => Some(self.compare_target(&context, baseline.as_ref(), &target)?),
            None => None,
        };

        let mut output = StatusOutput {
            environment: command.env.clone(),
            baseline: baseline.as_ref().map(BaselineSummary::from_record),
            baseline_count,
            target,
            text_message: String::new(),
        };
        output.text_message = self.format_status(&output);

        render_output(&output, &command.format)
    }

    /// 目標ツリーとベースラインを比較
    fn compare_target(
        &self,
        context: &CommandContext,
        baseline: Option<&BaselineRecord>,
        target: &DbMeta,
    ) -> Result<TargetStatus> {
        let checksum_service = BaselineChecksumService::new();
        let checksum = checksum_service.calculate_checksum(target);
        let empty = DbMeta::new();
        let from = baseline.map(|record| &record.state).unwrap_or(&empty);

        let result = context.compile(from, target, Vec::new())?.result;
        let up_to_date = baseline.is_some_and(|record| {
            checksum_service.compare_checksums(&record.checksum, &checksum)
        }) && result.commands.is_empty();

        Ok(TargetStatus {
            checksum,
            up_to_date,
            pending_statements: result.commands.len(),
            errors: result.errors.len(),
        })
    }

    /// テキスト出力を組み立てる
    pub fn format_status(&self, output: &StatusOutput) -> String {
        let mut text = String::new();
        text.push_str(&format!("=== Baseline Status ({}) ===\n\n", output.environment));

        match &output.baseline {
            Some(baseline) => {
                text.push_str(&format!("{:<16} {}\n", "Baseline ID:", baseline.id));
                text.push_str(&format!("{:<16} {}\n", "Checksum:", baseline.checksum));
                text.push_str(&format!(
                    "{:<16} {}\n",
                    "Recorded at:",
                    baseline.created_at.format("%Y-%m-%d %H:%M:%S UTC")
                ));
                text.push_str(&format!("{:<16} {}\n", "Tables:", baseline.tables));
                text.push_str(&format!("{:<16} {}\n", "History:", output.baseline_count));
            }
            None => {
                text.push_str("No baseline recorded yet.\n");
                text.push_str("\nUse the `apply` command to record the first baseline.\n");
            }
        }

        if let Some(target) = &output.target {
            text.push('\n');
            if target.up_to_date {
                text.push_str(&format!("{} Target snapshot is applied.\n", "✓".green()));
            } else {
                text.push_str(&format!(
                    "{} Target snapshot differs from the baseline: {} pending statement(s).\n",
                    "⚠".yellow(),
                    target.pending_statements
                ));
            }
            if target.errors > 0 {
                text.push_str(&format!(
                    "{}\n",
                    format!("Target has {} structural error(s). Run `pgshift validate`.", target.errors)
                        .red()
                ));
            }
        }

        text
    }
}
