// PostgreSQL接続プール
//
// apply / plan / status が使う接続プールを設定から作る。

use crate::adapters::connection_string::build_connection_string;
use crate::core::config::DatabaseConfig;
use crate::core::error::DatabaseError;
use sqlx::postgres::{PgPool, PgPoolOptions};
use std::time::Duration;
use tracing::debug;

/// 既定の最大接続数
const DEFAULT_MAX_CONNECTIONS: u32 = 5;

/// 既定の接続取得タイムアウト（秒）
const DEFAULT_ACQUIRE_TIMEOUT_SECS: u64 = 30;

/// データベース接続サービス
#[derive(Debug, Clone, Default)]
pub struct DatabaseConnectionService {}

impl DatabaseConnectionService {
    pub fn new() -> Self {
        Self {}
    }

    /// 接続プールを作成
    ///
    /// 接続に失敗した場合は接続先を含む `DatabaseError::Connection` を返す。
    /// パスワードはメッセージに含めない。
    pub async fn create_pool(&self, config: &DatabaseConfig) -> Result<PgPool, DatabaseError> {
        let options = self.pool_options(config);
        debug!(
            host = %config.host,
            port = config.resolved_port(),
            database = %config.database,
            max_connections = options.get_max_connections(),
            "Connecting to PostgreSQL"
        );

        options
            .connect(&build_connection_string(config))
            .await
            .map_err(|e| DatabaseError::Connection {
                message: format!(
                    "Failed to connect to {}:{}/{}",
                    config.host,
                    config.resolved_port(),
                    config.database
                ),
                cause: e.to_string(),
            })
    }

    /// プール設定（未指定なら最大5接続、取得タイムアウト30秒）
    pub fn pool_options(&self, config: &DatabaseConfig) -> PgPoolOptions {
        PgPoolOptions::new()
            .max_connections(config.max_connections.unwrap_or(DEFAULT_MAX_CONNECTIONS))
            .acquire_timeout(Duration::from_secs(
                config.timeout.unwrap_or(DEFAULT_ACQUIRE_TIMEOUT_SECS),
            ))
    }
}
