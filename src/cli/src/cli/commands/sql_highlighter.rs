// SQLハイライト
//
// 生成された文を先頭の動詞で色分けする。データを失う文は赤で表示する。

use colored::Colorize;
use regex::Regex;
use std::sync::LazyLock;

/// データを失う可能性のある文
static DESTRUCTIVE_SQL_REGEX: LazyLock<Option<Regex>> = LazyLock::new(|| {
    Regex::new(
        r#"(?i)^\s*(DROP\s+(TABLE|SCHEMA|TYPE)\b|TRUNCATE\b)|\bDROP\s+COLUMN\b|\bRENAME\s+(COLUMN\s+"[^"]*"\s+)?TO\s+"_deleted:"#,
    )
    .ok()
});

/// 先頭の動詞
static LEADING_VERB_REGEX: LazyLock<Option<Regex>> =
    LazyLock::new(|| Regex::new(r"(?i)^\s*(CREATE|ALTER|DROP|COMMENT|INSERT|UPDATE|DELETE)\b").ok());

/// 文がデータを失う可能性があるか
pub fn is_destructive(statement: &str) -> bool {
    DESTRUCTIVE_SQL_REGEX
        .as_ref()
        .is_some_and(|re| re.is_match(statement))
}

/// 1文をハイライト
pub fn highlight_statement(statement: &str) -> String {
    if is_destructive(statement) {
        return statement.red().bold().to_string();
    }

    let verb = LEADING_VERB_REGEX
        .as_ref()
        .and_then(|re| re.captures(statement))
        .and_then(|caps| caps.get(1))
        .map(|m| m.as_str().to_ascii_uppercase());

    match verb.as_deref() {
        Some("CREATE") | Some("INSERT") => statement.green().to_string(),
        Some("ALTER") | Some("UPDATE") => statement.yellow().to_string(),
        Some("DROP") | Some("DELETE") => statement.red().to_string(),
        Some("COMMENT") => statement.dimmed().to_string(),
        _ => statement.to_string(),
    }
}
