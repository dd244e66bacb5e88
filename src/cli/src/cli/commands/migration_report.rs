// マイグレーション結果のテキスト整形
//
// plan / apply --dry-run / validate で共通の表示を組み立てる。

use crate::cli::commands::sql_highlighter::{highlight_statement, is_destructive};
use crate::core::delta::DeltaSummary;
use crate::core::error::{MigrationError, MigrationWarning};
use colored::Colorize;
use std::fmt::Write;

/// マイグレーション結果のテキスト整形
pub struct MigrationReportFormatter;

impl MigrationReportFormatter {
    /// 見出し
    pub fn append_header(output: &mut String, title: &str) {
        let _ = writeln!(output, "{}", format!("=== {} ===", title).bold());
        output.push('\n');
    }

    /// 構造エラーの一覧
    pub fn append_errors(output: &mut String, errors: &[MigrationError]) {
        if errors.is_empty() {
            return;
        }

        let _ = writeln!(output, "{}", "--- Errors ---".red().bold());
        for (i, error) in errors.iter().enumerate() {
            let _ = writeln!(output, "{}. {}", i + 1, error.to_string().red());
            if let Some(suggestion) = error.suggestion() {
                let _ = writeln!(output, "   Suggestion: {}", suggestion);
            }
        }
        output.push('\n');
    }

    /// ポリシー警告の一覧
    pub fn append_warnings(output: &mut String, warnings: &[MigrationWarning]) {
        if warnings.is_empty() {
            return;
        }

        let _ = writeln!(output, "{}", "--- Warnings ---".yellow().bold());
        for warning in warnings {
            let _ = writeln!(output, "  {} {}", "⚠".yellow(), warning.format().yellow());
        }
        output.push('\n');
    }

    /// SQL文の一覧
    pub fn append_statements(output: &mut String, commands: &[String]) {
        let _ = writeln!(output, "{}", "--- SQL ---".bold());
        if commands.is_empty() {
            let _ = writeln!(output, "-- No changes");
        }
        for command in commands {
            let _ = writeln!(output, "{}", highlight_statement(command));
        }
        output.push('\n');
    }

    /// 件数のサマリー
    pub fn append_summary(
        output: &mut String,
        summary: &DeltaSummary,
        commands: &[String],
        errors: usize,
        warnings: usize,
    ) {
        let destructive = count_destructive(commands);

        let _ = writeln!(output, "{}", "=== Summary ===".bold());
        let _ = writeln!(
            output,
            "Changes: {} added, {} removed, {} renamed, {} changed",
            summary.added, summary.removed, summary.renamed, summary.changed
        );
        let _ = writeln!(output, "Statements: {}", commands.len());
        if destructive > 0 {
            let _ = writeln!(
                output,
                "{}",
                format!("Destructive statements: {}", destructive).red().bold()
            );
        }
        if errors > 0 {
            let _ = writeln!(output, "{}", format!("Errors: {}", errors).red().bold());
        } else {
            let _ = writeln!(output, "{}", "Errors: 0".green());
        }
        if warnings > 0 {
            let _ = writeln!(output, "{}", format!("Warnings: {}", warnings).yellow());
        }
    }
}

/// データを失う可能性のある文の数
pub fn count_destructive(commands: &[String]) -> usize {
    commands.iter().filter(|c| is_destructive(c)).count()
}
