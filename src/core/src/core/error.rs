// エラー型定義
//
// アプリケーション全体で使用されるカスタムエラー型を提供します。
// thiserrorを使用して、MigrationError, DatabaseError, ConfigError, IoError を定義します。

use serde::Serialize;
use thiserror::Error;

/// マイグレーション計算時の構造エラー
///
/// 差分計算を中断せずに収集され、適用を止めるかどうかは呼び出し側が判断します。
#[derive(Debug, Clone, PartialEq, Error, Serialize)]
#[serde(tag = "kind", rename_all = "camelCase")]
pub enum MigrationError {
    /// Malformed relation
    #[error("Malformed relation: {message}{}", format_location_opt(.location))]
    MalformedRelation {
        /// エラーメッセージ
        message: String,
        /// エラー発生位置
        #[serde(skip_serializing_if = "Option::is_none")]
        location: Option<ErrorLocation>,
        /// 修正提案
        #[serde(skip_serializing_if = "Option::is_none")]
        suggestion: Option<String>,
    },

    /// Unresolved reference
    #[error("Unresolved reference: {message}{}", format_location_opt(.location))]
    UnresolvedReference {
        /// エラーメッセージ
        message: String,
        /// エラー発生位置
        #[serde(skip_serializing_if = "Option::is_none")]
        location: Option<ErrorLocation>,
        /// 修正提案
        #[serde(skip_serializing_if = "Option::is_none")]
        suggestion: Option<String>,
    },

    /// Duplicate constraint name
    #[error("Duplicate constraint: {message}{}", format_location_opt(.location))]
    DuplicateConstraint {
        /// エラーメッセージ
        message: String,
        /// エラー発生位置
        #[serde(skip_serializing_if = "Option::is_none")]
        location: Option<ErrorLocation>,
        /// 修正提案
        #[serde(skip_serializing_if = "Option::is_none")]
        suggestion: Option<String>,
    },

    /// Unknown directive (extension block without a registered handler)
    #[error("Unknown directive: {message}{}", format_location_opt(.location))]
    UnknownDirective {
        /// エラーメッセージ
        message: String,
        /// エラー発生位置
        #[serde(skip_serializing_if = "Option::is_none")]
        location: Option<ErrorLocation>,
        /// 修正提案
        #[serde(skip_serializing_if = "Option::is_none")]
        suggestion: Option<String>,
    },

    /// Empty target tree
    #[error("Empty target: {message}")]
    EmptyTarget {
        /// エラーメッセージ
        message: String,
        /// 修正提案
        #[serde(skip_serializing_if = "Option::is_none")]
        suggestion: Option<String>,
    },
}

impl MigrationError {
    /// 不正なリレーションかどうか
    pub fn is_malformed_relation(&self) -> bool {
        matches!(self, MigrationError::MalformedRelation { .. })
    }

    /// 未解決の参照かどうか
    pub fn is_unresolved_reference(&self) -> bool {
        matches!(self, MigrationError::UnresolvedReference { .. })
    }

    /// 制約名の重複かどうか
    pub fn is_duplicate_constraint(&self) -> bool {
        matches!(self, MigrationError::DuplicateConstraint { .. })
    }

    /// 未知のディレクティブかどうか
    pub fn is_unknown_directive(&self) -> bool {
        matches!(self, MigrationError::UnknownDirective { .. })
    }

    /// 空のターゲットかどうか
    pub fn is_empty_target(&self) -> bool {
        matches!(self, MigrationError::EmptyTarget { .. })
    }

    /// エラー発生位置を取得
    pub fn location(&self) -> Option<&ErrorLocation> {
        match self {
            MigrationError::MalformedRelation { location, .. }
            | MigrationError::UnresolvedReference { location, .. }
            | MigrationError::DuplicateConstraint { location, .. }
            | MigrationError::UnknownDirective { location, .. } => location.as_ref(),
            MigrationError::EmptyTarget { .. } => None,
        }
    }

    /// 修正提案を取得
    pub fn suggestion(&self) -> Option<&str> {
        match self {
            MigrationError::MalformedRelation { suggestion, .. }
            | MigrationError::UnresolvedReference { suggestion, .. }
            | MigrationError::DuplicateConstraint { suggestion, .. }
            | MigrationError::UnknownDirective { suggestion, .. }
            | MigrationError::EmptyTarget { suggestion, .. } => suggestion.as_deref(),
        }
    }
}

/// マイグレーション計算時のポリシー警告
///
/// 推奨されないパターンを表します。適用を止めることはありません。
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct MigrationWarning {
    /// 警告メッセージ
    pub message: String,
    /// 警告発生位置
    #[serde(skip_serializing_if = "Option::is_none")]
    pub location: Option<ErrorLocation>,
    /// 警告の種類
    pub kind: WarningKind,
}

/// 警告の種類
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub enum WarningKind {
    /// 結合テーブルを使わないMANY:MANYリレーション
    ManyToManyRelation,
    /// ONE:ONEリレーション
    OneToOneRelation,
    /// 確認できなかったリネームヒント
    RenameHintIgnored,
}

impl MigrationWarning {
    /// 新しい警告を作成
    pub fn new(message: String, location: Option<ErrorLocation>, kind: WarningKind) -> Self {
        Self {
            message,
            location,
            kind,
        }
    }

    /// MANY:MANYリレーションの警告を作成
    pub fn many_to_many(message: String, location: Option<ErrorLocation>) -> Self {
        Self::new(message, location, WarningKind::ManyToManyRelation)
    }

    /// ONE:ONEリレーションの警告を作成
    pub fn one_to_one(message: String, location: Option<ErrorLocation>) -> Self {
        Self::new(message, location, WarningKind::OneToOneRelation)
    }

    /// 無視されたリネームヒントの警告を作成
    pub fn rename_hint_ignored(message: String, location: Option<ErrorLocation>) -> Self {
        Self::new(message, location, WarningKind::RenameHintIgnored)
    }

    /// 位置情報をフォーマット
    pub fn format(&self) -> String {
        let location_str = self
            .location
            .as_ref()
            .map_or(String::new(), |loc| loc.format());
        format!("Warning: {}{}", self.message, location_str)
    }
}

/// エラー発生位置
///
/// メタデータツリー内の位置を表現します。
#[derive(Debug, Clone, PartialEq, Default, Serialize)]
pub struct ErrorLocation {
    /// スキーマ名
    #[serde(skip_serializing_if = "Option::is_none")]
    pub schema: Option<String>,
    /// テーブル名
    #[serde(skip_serializing_if = "Option::is_none")]
    pub table: Option<String>,
    /// カラム名
    #[serde(skip_serializing_if = "Option::is_none")]
    pub column: Option<String>,
    /// リレーション名
    #[serde(skip_serializing_if = "Option::is_none")]
    pub relation: Option<String>,
}

impl ErrorLocation {
    /// 新しいエラー位置を作成
    pub fn new() -> Self {
        Self::default()
    }

    /// スキーマ名とテーブル名を指定してエラー位置を作成
    pub fn with_table(schema: &str, table: &str) -> Self {
        Self {
            schema: Some(schema.to_string()),
            table: Some(table.to_string()),
            ..Default::default()
        }
    }

    /// スキーマ名・テーブル名・カラム名を指定してエラー位置を作成
    pub fn with_column(schema: &str, table: &str, column: &str) -> Self {
        Self {
            column: Some(column.to_string()),
            ..Self::with_table(schema, table)
        }
    }

    /// リレーション名を指定してエラー位置を作成
    pub fn with_relation(relation: &str) -> Self {
        Self {
            relation: Some(relation.to_string()),
            ..Default::default()
        }
    }

    /// 位置情報をフォーマット
    pub fn format(&self) -> String {
        let mut parts = Vec::new();

        if let Some(schema) = &self.schema {
            parts.push(format!("schema: {}", schema));
        }
        if let Some(table) = &self.table {
            parts.push(format!("table: {}", table));
        }
        if let Some(column) = &self.column {
            parts.push(format!("column: {}", column));
        }
        if let Some(relation) = &self.relation {
            parts.push(format!("relation: {}", relation));
        }

        if parts.is_empty() {
            String::new()
        } else {
            format!(" ({})", parts.join(", "))
        }
    }
}

/// 位置情報をフォーマットするヘルパー関数
fn format_location_opt(location: &Option<ErrorLocation>) -> String {
    location.as_ref().map_or(String::new(), |loc| loc.format())
}

/// データベースエラー
///
/// データベース操作時に発生するエラーを表現します。
#[derive(Debug, Error)]
pub enum DatabaseError {
    /// Connection error
    #[error("Database connection error: {message} (cause: {cause})")]
    Connection {
        /// エラーメッセージ
        message: String,
        /// エラー原因
        cause: String,
    },

    /// Query execution error
    #[error("Query execution error: {message}")]
    Query {
        /// エラーメッセージ
        message: String,
        /// 失敗したSQL
        sql: Option<String>,
    },

    /// Transaction error
    #[error("Transaction error: {message}")]
    Transaction {
        /// エラーメッセージ
        message: String,
    },

    /// Baseline decode error
    #[error("Baseline error: {message}")]
    Baseline {
        /// エラーメッセージ
        message: String,
    },
}

impl DatabaseError {
    /// クエリエラーかどうか
    pub fn is_query(&self) -> bool {
        matches!(self, DatabaseError::Query { .. })
    }

    /// 失敗したSQLを取得
    pub fn failed_sql(&self) -> Option<&str> {
        match self {
            DatabaseError::Query { sql, .. } => sql.as_deref(),
            _ => None,
        }
    }
}

/// 設定エラー
///
/// 設定ファイルの読み込み・検証時に発生するエラーを表現します。
#[derive(Debug, Error)]
pub enum ConfigError {
    /// バージョン未指定
    #[error("Config file version is not specified")]
    MissingVersion,

    /// 環境設定なし
    #[error("At least one environment configuration is required")]
    NoEnvironments,

    /// 環境が見つからない
    #[error("Environment '{name}' not found. Available environments: {available:?}")]
    EnvironmentNotFound {
        /// 指定された環境名
        name: String,
        /// 利用可能な環境名リスト
        available: Vec<String>,
    },

    /// データベース名未指定
    #[error("Database name is not specified")]
    MissingDatabaseName,

    /// 空の識別子
    #[error("'{field}' must not be empty")]
    EmptyIdentifier {
        /// 設定項目名
        field: String,
    },

    /// 環境別設定の検証エラー
    #[error("Invalid config for environment '{environment}': {source}")]
    InvalidEnvironment {
        /// 環境名
        environment: String,
        /// 原因
        #[source]
        source: Box<ConfigError>,
    },
}

/// I/Oエラー
///
/// ファイル操作時に発生するエラーを表現します。
#[derive(Debug, Error)]
pub enum IoError {
    /// File not found
    #[error("File not found: {path}")]
    FileNotFound {
        /// ファイルパス
        path: String,
    },

    /// File read error
    #[error("Failed to read file: {path} (cause: {cause})")]
    FileRead {
        /// ファイルパス
        path: String,
        /// エラー原因
        cause: String,
    },

    /// File write error
    #[error("Failed to write file: {path} (cause: {cause})")]
    FileWrite {
        /// ファイルパス
        path: String,
        /// エラー原因
        cause: String,
    },

    /// Parse error
    #[error("Failed to parse file: {path} (cause: {cause})")]
    Parse {
        /// ファイルパス
        path: String,
        /// エラー原因
        cause: String,
    },
}

impl IoError {
    /// ファイルが見つからないエラーかどうか
    pub fn is_file_not_found(&self) -> bool {
        matches!(self, IoError::FileNotFound { .. })
    }

    /// パースエラーかどうか
    pub fn is_parse(&self) -> bool {
        matches!(self, IoError::Parse { .. })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_migration_error_matchers() {
        let error = MigrationError::MalformedRelation {
            message: "relation 'author' must have exactly two sides".to_string(),
            location: Some(ErrorLocation::with_relation("author")),
            suggestion: None,
        };

        assert!(error.is_malformed_relation());
        assert!(!error.is_unresolved_reference());
        assert_eq!(
            error.location().and_then(|l| l.relation.as_deref()),
            Some("author")
        );
    }

    #[test]
    fn test_migration_error_display_includes_location() {
        let error = MigrationError::UnresolvedReference {
            message: "table not found".to_string(),
            location: Some(ErrorLocation::with_column("app", "Post", "authorId")),
            suggestion: Some("Define the table".to_string()),
        };

        let text = error.to_string();
        assert!(text.starts_with("Unresolved reference: table not found"));
        assert!(text.contains("schema: app"));
        assert!(text.contains("column: authorId"));
        assert_eq!(error.suggestion(), Some("Define the table"));
    }

    #[test]
    fn test_migration_error_serializes_kind() {
        let error = MigrationError::EmptyTarget {
            message: "empty".to_string(),
            suggestion: None,
        };
        let json = serde_json::to_value(&error).unwrap();
        assert_eq!(json["kind"], "emptyTarget");
        assert_eq!(json["message"], "empty");
    }

    #[test]
    fn test_warning_format() {
        let warning = MigrationWarning::many_to_many(
            "Create a join table instead".to_string(),
            Some(ErrorLocation::with_relation("tags")),
        );
        assert_eq!(warning.kind, WarningKind::ManyToManyRelation);
        assert_eq!(
            warning.format(),
            "Warning: Create a join table instead (relation: tags)"
        );
    }

    #[test]
    fn test_empty_location_formats_to_empty_string() {
        assert_eq!(ErrorLocation::new().format(), "");
    }

    #[test]
    fn test_database_error_failed_sql() {
        let error = DatabaseError::Query {
            message: "syntax error".to_string(),
            sql: Some("DROP TABLE x".to_string()),
        };
        assert!(error.is_query());
        assert_eq!(error.failed_sql(), Some("DROP TABLE x"));
    }

    #[test]
    fn test_config_error_nesting() {
        let error = ConfigError::InvalidEnvironment {
            environment: "production".to_string(),
            source: Box::new(ConfigError::MissingDatabaseName),
        };
        assert!(error.to_string().contains("production"));
        assert!(error.to_string().contains("Database name is not specified"));
    }
}
