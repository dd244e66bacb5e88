// コマンドハンドラー層
// 各CLIコマンドの実装

pub mod apply;
pub mod init;
pub mod migration_report;
pub mod plan;
pub mod sql_highlighter;
pub mod status;
pub mod validate;

use crate::cli::OutputFormat;
use anyhow::{Context, Result};
use serde::Serialize;

/// テキストとJSONの両方で出力できるコマンド結果
pub trait CommandOutput: Serialize {
    /// テキスト形式の出力
    fn to_text(&self) -> String;
}

/// 出力フォーマットに応じてコマンド結果を文字列化
pub fn render_output<T: CommandOutput>(output: &T, format: &OutputFormat) -> Result<String> {
    match format {
        OutputFormat::Text => Ok(output.to_text()),
        OutputFormat::Json => {
            serde_json::to_string_pretty(output).with_context(|| "Failed to serialize output")
        }
    }
}

/// SQLファイルの内容を文に分割
///
/// 引用符内・ドル引用内のセミコロンでは分割しない。
/// 返す文は前後の空白と終端のセミコロンを除いたもの。
pub(crate) fn split_sql_statements(sql: &str) -> Vec<String> {
    let mut statements = Vec::new();
    let mut current = String::new();
    let mut quote: Option<char> = None;
    let mut dollar_tag: Option<String> = None;
    let mut rest = sql;

    while let Some(c) = rest.chars().next() {
        let len = c.len_utf8();

        if let Some(tag) = dollar_tag.as_deref() {
            if rest.starts_with(tag) {
                current.push_str(tag);
                rest = &rest[tag.len()..];
                dollar_tag = None;
            } else {
                current.push(c);
                rest = &rest[len..];
            }
            continue;
        }

        if let Some(q) = quote {
            current.push(c);
            rest = &rest[len..];
            if c == q {
                // 二重化された引用符はリテラルの一部
                if rest.starts_with(q) {
                    current.push(q);
                    rest = &rest[q.len_utf8()..];
                } else {
                    quote = None;
                }
            }
            continue;
        }

        match c {
            '\'' | '"' => {
                quote = Some(c);
                current.push(c);
                rest = &rest[len..];
            }
            '$' => match dollar_quote_tag(rest) {
                Some(tag) => {
                    current.push_str(tag);
                    rest = &rest[tag.len()..];
                    dollar_tag = Some(tag.to_string());
                }
                None => {
                    current.push(c);
                    rest = &rest[len..];
                }
            },
            ';' => {
                push_statement(&mut statements, &current);
                current.clear();
                rest = &rest[len..];
            }
            _ => {
                current.push(c);
                rest = &rest[len..];
            }
        }
    }

    push_statement(&mut statements, &current);
    statements
}

/// `$tag$` 形式の開始タグ
fn dollar_quote_tag(input: &str) -> Option<&str> {
    let end = input[1..].find('$')? + 1;
    let inner = &input[1..end];
    inner
        .chars()
        .all(|ch| ch.is_ascii_alphanumeric() || ch == '_')
        .then(|| &input[..=end])
}

fn push_statement(statements: &mut Vec<String>, current: &str) {
    let trimmed = current.trim();
    if !trimmed.is_empty() {
        statements.push(trimmed.to_string());
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_split_simple_statements() {
        let statements = split_sql_statements("SELECT 1;\n\nSELECT 2;  ");
        assert_eq!(statements, vec!["SELECT 1", "SELECT 2"]);
    }

    #[test]
    fn test_split_respects_quotes() {
        let statements =
            split_sql_statements(r#"INSERT INTO "a;b" VALUES ('x;''y'); SELECT 1"#);
        assert_eq!(
            statements,
            vec![r#"INSERT INTO "a;b" VALUES ('x;''y')"#, "SELECT 1"]
        );
    }

    #[test]
    fn test_split_respects_dollar_quotes() {
        let sql = "CREATE FUNCTION f() RETURNS void AS $body$ BEGIN PERFORM 1; END; $body$ LANGUAGE plpgsql; SELECT 1;";
        let statements = split_sql_statements(sql);
        assert_eq!(statements.len(), 2);
        assert!(statements[0].ends_with("$body$ LANGUAGE plpgsql"));
    }

    #[test]
    fn test_split_dollar_without_tag() {
        let statements = split_sql_statements("SELECT $1; SELECT 2");
        assert_eq!(statements, vec!["SELECT $1", "SELECT 2"]);
    }
}
