// データベース設定の解決サービス
//
// 環境変数による上書きをCLI/サービス層で扱い、coreは純粋な構造体に保つ。

use crate::core::config::{Config, DatabaseConfig};
use anyhow::Result;
use tracing::debug;

/// 上書きに使う環境変数
pub const ENV_OVERRIDES: [&str; 5] = ["DB_HOST", "DB_PORT", "DB_DATABASE", "DB_USER", "DB_PASSWORD"];

/// データベース設定の解決ユーティリティ
#[derive(Debug, Clone, Default)]
pub struct DatabaseConfigResolver;

impl DatabaseConfigResolver {
    /// 環境名から接続設定を取得し、環境変数による上書きを適用
    pub fn resolve(config: &Config, environment: &str) -> Result<DatabaseConfig> {
        let base = config.get_database_config(environment)?;
        let resolved = Self::apply_env_overrides(&base);
        resolved.validate()?;

        debug!(
            environment = environment,
            host = %resolved.host,
            database = %resolved.database,
            "Resolved database config"
        );
        Ok(resolved)
    }

    /// 環境変数による上書きを適用
    ///
    /// 数値として解釈できない `DB_PORT` は無視する。
    pub fn apply_env_overrides(base: &DatabaseConfig) -> DatabaseConfig {
        let mut config = base.clone();

        if let Ok(host) = std::env::var("DB_HOST") {
            config.host = host;
        }
        if let Some(port) = std::env::var("DB_PORT")
            .ok()
            .and_then(|port| port.parse::<u16>().ok())
        {
            config.port = Some(port);
        }
        if let Ok(database) = std::env::var("DB_DATABASE") {
            config.database = database;
        }
        if let Ok(user) = std::env::var("DB_USER") {
            config.user = Some(user);
        }
        if let Ok(password) = std::env::var("DB_PASSWORD") {
            config.password = Some(password);
        }

        config
    }
}
