// 設定ファイル管理
//
// プロジェクトの設定ファイル（YAML形式）の読み込み、検証、
// マイグレーション計算のポリシーと環境別のデータベース接続設定を扱います。

use crate::core::error::ConfigError;
use crate::core::naming::{DEFAULT_BASELINE_SCHEMA, DEFAULT_BASELINE_TABLE, DEFAULT_VIEW_PREFIX};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;

/// SSL接続モード
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SslMode {
    Disable,
    #[serde(rename = "prefer")]
    Prefer,
    Require,
    #[serde(rename = "verify-ca")]
    VerifyCa,
    #[serde(rename = "verify-full")]
    VerifyFull,
}

impl std::fmt::Display for SslMode {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            SslMode::Disable => write!(f, "disable"),
            SslMode::Prefer => write!(f, "prefer"),
            SslMode::Require => write!(f, "require"),
            SslMode::VerifyCa => write!(f, "verify-ca"),
            SslMode::VerifyFull => write!(f, "verify-full"),
        }
    }
}

/// プロジェクト設定
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    /// 設定ファイルのバージョン
    pub version: String,

    /// 削除の代わりに `_deleted:` へリネームするか
    #[serde(default = "default_true")]
    pub rename_instead_of_drop: bool,

    /// 差分計算から除外するスキーマ
    #[serde(default)]
    pub ignored_schemas: Vec<String>,

    /// 直接アクセス用ビューの設定
    #[serde(default)]
    pub views: ViewConfig,

    /// ベースラインの保存先
    #[serde(default)]
    pub baseline: BaselineConfig,

    /// 環境別のデータベース設定
    pub environments: HashMap<String, DatabaseConfig>,
}

fn default_true() -> bool {
    true
}

impl Default for Config {
    fn default() -> Self {
        Self {
            version: "1.0".to_string(),
            rename_instead_of_drop: true,
            ignored_schemas: Vec::new(),
            views: ViewConfig::default(),
            baseline: BaselineConfig::default(),
            environments: HashMap::new(),
        }
    }
}

impl Config {
    /// デフォルトの設定ファイルパス
    pub const DEFAULT_CONFIG_PATH: &'static str = crate::core::naming::CONFIG_FILE;

    /// 指定された環境のデータベース設定を取得
    pub fn get_database_config(&self, environment: &str) -> Result<DatabaseConfig, ConfigError> {
        self.environments.get(environment).cloned().ok_or_else(|| {
            let mut available: Vec<String> = self.environments.keys().cloned().collect();
            available.sort();
            ConfigError::EnvironmentNotFound {
                name: environment.to_string(),
                available,
            }
        })
    }

    /// マイグレーション計算のオプションを取得
    pub fn compiler_options(&self) -> CompilerOptions {
        CompilerOptions {
            rename_instead_of_drop: self.rename_instead_of_drop,
            ignored_schemas: self.ignored_schemas.clone(),
            views: self.views.clone(),
        }
    }

    /// 設定の妥当性を検証
    pub fn validate(&self) -> Result<(), ConfigError> {
        // バージョンチェック
        if self.version.is_empty() {
            return Err(ConfigError::MissingVersion);
        }

        // 環境設定チェック
        if self.environments.is_empty() {
            return Err(ConfigError::NoEnvironments);
        }

        self.baseline.validate()?;

        if self.views.enabled && self.views.admin_check.trim().is_empty() {
            return Err(ConfigError::EmptyIdentifier {
                field: "views.admin_check".to_string(),
            });
        }

        // 各環境のデータベース設定を検証
        for (env_name, db_config) in &self.environments {
            db_config
                .validate()
                .map_err(|source| ConfigError::InvalidEnvironment {
                    environment: env_name.clone(),
                    source: Box::new(source),
                })?;
        }

        Ok(())
    }
}

/// マイグレーション計算のオプション
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CompilerOptions {
    /// 削除の代わりに `_deleted:` へリネームするか
    pub rename_instead_of_drop: bool,
    /// 差分計算から除外するスキーマ
    pub ignored_schemas: Vec<String>,
    /// 直接アクセス用ビューの設定
    pub views: ViewConfig,
}

impl Default for CompilerOptions {
    fn default() -> Self {
        Self {
            rename_instead_of_drop: true,
            ignored_schemas: Vec::new(),
            views: ViewConfig::default(),
        }
    }
}

impl CompilerOptions {
    /// 削除ポリシーを指定
    pub fn with_rename_instead_of_drop(mut self, enabled: bool) -> Self {
        self.rename_instead_of_drop = enabled;
        self
    }

    /// ビュー生成の有無を指定
    pub fn with_views(mut self, enabled: bool) -> Self {
        self.views.enabled = enabled;
        self
    }
}

/// 直接アクセス用ビューの設定
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ViewConfig {
    /// ビューを生成するか
    #[serde(default = "default_true")]
    pub enabled: bool,

    /// 行アクセスを許可する条件式
    #[serde(default = "default_admin_check")]
    pub admin_check: String,

    /// ビュー名のプレフィックス
    #[serde(default = "default_view_prefix")]
    pub name_prefix: String,
}

fn default_admin_check() -> String {
    "_auth.is_admin() = true".to_string()
}

fn default_view_prefix() -> String {
    DEFAULT_VIEW_PREFIX.to_string()
}

impl Default for ViewConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            admin_check: default_admin_check(),
            name_prefix: default_view_prefix(),
        }
    }
}

/// ベースラインの保存先
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BaselineConfig {
    /// 保存先スキーマ
    #[serde(default = "default_baseline_schema")]
    pub schema: String,

    /// 保存先テーブル
    #[serde(default = "default_baseline_table")]
    pub table: String,
}

fn default_baseline_schema() -> String {
    DEFAULT_BASELINE_SCHEMA.to_string()
}

fn default_baseline_table() -> String {
    DEFAULT_BASELINE_TABLE.to_string()
}

impl Default for BaselineConfig {
    fn default() -> Self {
        Self {
            schema: default_baseline_schema(),
            table: default_baseline_table(),
        }
    }
}

impl BaselineConfig {
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.schema.trim().is_empty() {
            return Err(ConfigError::EmptyIdentifier {
                field: "baseline.schema".to_string(),
            });
        }
        if self.table.trim().is_empty() {
            return Err(ConfigError::EmptyIdentifier {
                field: "baseline.table".to_string(),
            });
        }
        Ok(())
    }
}

/// データベース接続設定
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DatabaseConfig {
    /// ホスト名
    #[serde(default = "default_host")]
    pub host: String,

    /// ポート番号（Noneの場合は5432）
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub port: Option<u16>,

    /// データベース名
    pub database: String,

    /// ユーザー名
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub user: Option<String>,

    /// パスワード
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub password: Option<String>,

    /// 接続タイムアウト（秒）
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub timeout: Option<u64>,

    /// 適用時の文単位タイムアウト（秒）
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub statement_timeout: Option<u64>,

    /// SSL接続モード
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub ssl_mode: Option<SslMode>,

    /// 最大コネクション数
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub max_connections: Option<u32>,

    /// 追加接続オプション（クエリパラメータとして付与）
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub options: Option<HashMap<String, String>>,
}

fn default_host() -> String {
    "localhost".to_string()
}

impl Default for DatabaseConfig {
    fn default() -> Self {
        Self {
            host: default_host(),
            port: None,
            database: String::new(),
            user: None,
            password: None,
            timeout: None,
            statement_timeout: None,
            ssl_mode: None,
            max_connections: None,
            options: None,
        }
    }
}

impl DatabaseConfig {
    /// PostgreSQLの既定ポート
    pub const DEFAULT_PORT: u16 = 5432;

    /// 解決済みポート番号を取得
    pub fn resolved_port(&self) -> u16 {
        self.port.unwrap_or(Self::DEFAULT_PORT)
    }

    /// Validate database configuration
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.database.is_empty() {
            return Err(ConfigError::MissingDatabaseName);
        }

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn config_with_env() -> Config {
        let mut environments = HashMap::new();
        environments.insert(
            "development".to_string(),
            DatabaseConfig {
                database: "app_dev".to_string(),
                ..Default::default()
            },
        );
        Config {
            version: "1.0".to_string(),
            rename_instead_of_drop: true,
            ignored_schemas: vec![],
            views: ViewConfig::default(),
            baseline: BaselineConfig::default(),
            environments,
        }
    }

    #[test]
    fn test_resolved_port() {
        let config = DatabaseConfig {
            database: "test".to_string(),
            ..Default::default()
        };
        assert_eq!(config.resolved_port(), 5432);

        let config = DatabaseConfig {
            port: Some(5433),
            ..config
        };
        assert_eq!(config.resolved_port(), 5433);
    }

    #[test]
    fn test_validate_ok() {
        assert!(config_with_env().validate().is_ok());
    }

    #[test]
    fn test_validate_missing_version() {
        let config = Config {
            version: String::new(),
            ..config_with_env()
        };
        assert!(matches!(config.validate(), Err(ConfigError::MissingVersion)));
    }

    #[test]
    fn test_validate_empty_baseline_table() {
        let mut config = config_with_env();
        config.baseline.table = " ".to_string();
        assert!(matches!(
            config.validate(),
            Err(ConfigError::EmptyIdentifier { .. })
        ));
    }

    #[test]
    fn test_environment_not_found_lists_available() {
        let config = config_with_env();
        match config.get_database_config("production") {
            Err(ConfigError::EnvironmentNotFound { name, available }) => {
                assert_eq!(name, "production");
                assert_eq!(available, vec!["development".to_string()]);
            }
            other => panic!("unexpected result: {:?}", other),
        }
    }

    #[test]
    fn test_yaml_defaults() {
        let yaml = r#"
version: "1.0"
environments:
  development:
    database: app_dev
"#;
        let config: Config = serde_saphyr::from_str(yaml).unwrap();
        assert!(config.rename_instead_of_drop);
        assert!(config.views.enabled);
        assert_eq!(config.views.name_prefix, "A");
        assert_eq!(config.baseline.schema, "_meta");
        assert_eq!(config.baseline.table, "migrations");

        let options = config.compiler_options();
        assert!(options.rename_instead_of_drop);
        assert!(options.ignored_schemas.is_empty());
    }

    #[test]
    fn test_compiler_options_builders() {
        let options = CompilerOptions::default()
            .with_rename_instead_of_drop(false)
            .with_views(false);
        assert!(!options.rename_instead_of_drop);
        assert!(!options.views.enabled);
    }
}
