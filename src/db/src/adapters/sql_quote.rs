// SQLクォートユーティリティ
//
// PostgreSQLの識別子・文字列リテラル・型名の出力規則をまとめた共有モジュール。
// SQL生成器とベースライン管理の両方から使用される。

use crate::core::db_meta::{DataType, DefaultValue};

/// 識別子クォート（ダブルクォート）
///
/// 識別子内のダブルクォートは二重にエスケープします。
///
/// # Examples
/// ```
/// use pgshift_db::adapters::sql_quote::quote_identifier;
/// assert_eq!(quote_identifier("users"), r#""users""#);
/// assert_eq!(quote_identifier(r#"table"name"#), r#""table""name""#);
/// ```
pub fn quote_identifier(name: &str) -> String {
    format!("\"{}\"", name.replace('"', "\"\""))
}

/// カラム名リストをクォートしてカンマ区切りで結合
pub fn quote_columns(columns: &[String]) -> String {
    columns
        .iter()
        .map(|c| quote_identifier(c))
        .collect::<Vec<_>>()
        .join(", ")
}

/// スキーマ修飾付きの名前（`"schema"."name"`）
pub fn qualified(schema_name: &str, name: &str) -> String {
    format!("{}.{}", quote_identifier(schema_name), quote_identifier(name))
}

/// 文字列リテラル（シングルクォート）
///
/// # Examples
/// ```
/// use pgshift_db::adapters::sql_quote::quote_literal;
/// assert_eq!(quote_literal("it's"), "'it''s'");
/// ```
pub fn quote_literal(value: &str) -> String {
    format!("'{}'", value.replace('\'', "''"))
}

/// カラム型の出力
///
/// 組み込み型はそのまま、ENUM型はクォートした識別子として出力します。
pub fn render_type(data_type: &DataType) -> String {
    match data_type {
        DataType::Builtin(name) => name.clone(),
        DataType::Custom { custom_type } => quote_identifier(custom_type),
    }
}

/// デフォルト値の出力
///
/// リテラル値は文字列リテラルとして、式はそのまま出力します。
pub fn render_default(default_value: &DefaultValue) -> String {
    match default_value {
        DefaultValue::Expression(expression) => expression.clone(),
        DefaultValue::Value(serde_json::Value::String(s)) => quote_literal(s),
        DefaultValue::Value(serde_json::Value::Null) => "NULL".to_string(),
        DefaultValue::Value(other) => quote_literal(&other.to_string()),
    }
}
