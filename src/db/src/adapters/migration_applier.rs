// マイグレーション適用サービス
//
// 順序付け済みのSQL文を1つのSERIALIZABLEトランザクションで実行し、
// コミット前に変更後ツリーを新しいベースラインとして保存します。

use crate::adapters::sql_quote::{qualified, quote_identifier};
use crate::core::config::BaselineConfig;
use crate::core::db_meta::DbMeta;
use crate::core::error::DatabaseError;
use crate::core::migration::{ApplyReport, BaselineRecord};
use crate::services::baseline_checksum::BaselineChecksumService;
use chrono::{DateTime, Utc};
use sqlx::postgres::PgPool;
use sqlx::Row;
use std::time::Instant;
use tracing::{debug, info, warn};

/// マイグレーション適用サービス
///
/// ベースライン保存テーブルの管理とトランザクション制御を提供します。
#[derive(Debug, Clone)]
pub struct MigrationApplierService {
    baseline: BaselineConfig,
    checksum: BaselineChecksumService,
}

impl MigrationApplierService {
    /// 新しいMigrationApplierServiceを作成
    ///
    /// # Arguments
    ///
    /// * `baseline` - ベースラインの保存先
    pub fn new(baseline: &BaselineConfig) -> Self {
        Self {
            baseline: baseline.clone(),
            checksum: BaselineChecksumService::new(),
        }
    }

    fn baseline_table(&self) -> String {
        qualified(&self.baseline.schema, &self.baseline.table)
    }

    /// ベースライン保存テーブル作成SQLを生成
    ///
    /// # Returns
    ///
    /// CREATE SCHEMA文とCREATE TABLE文
    pub fn generate_create_baseline_table_sql(&self) -> Vec<String> {
        vec![
            format!(
                "CREATE SCHEMA IF NOT EXISTS {};",
                quote_identifier(&self.baseline.schema)
            ),
            format!(
                r#"CREATE TABLE IF NOT EXISTS {} (
    id BIGSERIAL PRIMARY KEY,
    checksum VARCHAR(64) NOT NULL,
    state JSONB NOT NULL,
    created_at TIMESTAMPTZ NOT NULL DEFAULT NOW()
);"#,
                self.baseline_table()
            ),
        ]
    }

    /// ベースライン保存テーブルを作成
    pub async fn create_baseline_table(&self, pool: &PgPool) -> Result<(), DatabaseError> {
        for sql in self.generate_create_baseline_table_sql() {
            sqlx::query(&sql)
                .execute(pool)
                .await
                .map_err(|e| DatabaseError::Query {
                    message: format!("Failed to create baseline table: {}", e),
                    sql: Some(sql.clone()),
                })?;
        }
        Ok(())
    }

    /// 最新ベースライン取得のSELECT SQLを生成
    pub fn generate_load_latest_sql(&self) -> String {
        format!(
            "SELECT id, checksum, state, created_at FROM {} ORDER BY created_at DESC, id DESC LIMIT 1",
            self.baseline_table()
        )
    }

    /// ベースライン件数取得のSELECT SQLを生成
    pub fn generate_count_baselines_sql(&self) -> String {
        format!("SELECT COUNT(*) AS count FROM {}", self.baseline_table())
    }

    /// ベースライン保存のINSERT SQLを生成（チェックサムと状態はバインド）
    pub fn generate_insert_baseline_sql(&self) -> String {
        format!(
            "INSERT INTO {} (checksum, state) VALUES ($1, $2)",
            self.baseline_table()
        )
    }

    /// 最新のベースラインを取得
    ///
    /// # Returns
    ///
    /// 記録がなければ `None`
    pub async fn load_latest(&self, pool: &PgPool) -> Result<Option<BaselineRecord>, DatabaseError> {
        let sql = self.generate_load_latest_sql();

        let row = sqlx::query(&sql)
            .fetch_optional(pool)
            .await
            .map_err(|e| DatabaseError::Query {
                message: format!("Failed to load baseline: {}", e),
                sql: Some(sql.clone()),
            })?;

        let Some(row) = row else {
            debug!(table = %self.baseline_table(), "No baseline recorded yet");
            return Ok(None);
        };

        let decode_error = |e: sqlx::Error| DatabaseError::Baseline {
            message: format!("Failed to decode baseline row: {}", e),
        };
        let id: i64 = row.try_get("id").map_err(decode_error)?;
        let checksum: String = row.try_get("checksum").map_err(decode_error)?;
        let state: serde_json::Value = row.try_get("state").map_err(decode_error)?;
        let created_at: DateTime<Utc> = row.try_get("created_at").map_err(decode_error)?;

        let state = serde_json::from_value::<DbMeta>(state)
            .map_err(|e| DatabaseError::Baseline {
                message: format!("Baseline {} is not a valid metadata tree: {}", id, e),
            })?
            .normalize();

        Ok(Some(BaselineRecord {
            id,
            checksum,
            state,
            created_at,
        }))
    }

    /// 保存済みベースラインの件数を取得
    pub async fn count_baselines(&self, pool: &PgPool) -> Result<i64, DatabaseError> {
        let sql = self.generate_count_baselines_sql();

        let row = sqlx::query(&sql)
            .fetch_one(pool)
            .await
            .map_err(|e| DatabaseError::Query {
                message: format!("Failed to count baselines: {}", e),
                sql: Some(sql.clone()),
            })?;

        row.try_get("count").map_err(|e| DatabaseError::Baseline {
            message: format!("Failed to decode baseline count: {}", e),
        })
    }

    /// 適用が必要かどうか
    ///
    /// 実行すべき文があるか、保存済みチェックサムと異なる場合に適用します。
    pub fn needs_apply(&self, commands: &[String], stored: Option<&str>, checksum: &str) -> bool {
        !commands.is_empty()
            || stored.is_none_or(|stored| !self.checksum.compare_checksums(stored, checksum))
    }

    /// トランザクション設定SQLを生成
    pub fn generate_transaction_settings_sql(&self, statement_timeout: Option<u64>) -> Vec<String> {
        let mut statements = vec!["SET TRANSACTION ISOLATION LEVEL SERIALIZABLE".to_string()];
        if let Some(seconds) = statement_timeout {
            statements.push(format!("SET LOCAL statement_timeout = '{}s'", seconds));
        }
        statements
    }

    /// 文を実行し、ベースラインを更新
    ///
    /// すべての文とベースラインのINSERTは1つのトランザクションで実行されます。
    /// いずれかが失敗した場合はロールバックし、失敗した文を含むエラーを返します。
    ///
    /// # Arguments
    ///
    /// * `pool` - データベース接続プール
    /// * `commands` - 順序付け済みのSQL文
    /// * `target` - 新しいベースラインとして保存するツリー
    /// * `statement_timeout` - 文単位タイムアウト（秒）
    pub async fn apply(
        &self,
        pool: &PgPool,
        commands: &[String],
        target: &DbMeta,
        statement_timeout: Option<u64>,
    ) -> Result<ApplyReport, DatabaseError> {
        let checksum = self.checksum.calculate_checksum(target);

        self.create_baseline_table(pool).await?;
        let stored = self.load_latest(pool).await?;
        let stored_checksum = stored.as_ref().map(|record| record.checksum.as_str());

        if !self.needs_apply(commands, stored_checksum, &checksum) {
            info!(checksum = %checksum, "Baseline is up to date, nothing to apply");
            return Ok(ApplyReport::skipped(checksum));
        }

        let state = serde_json::to_value(target).map_err(|e| DatabaseError::Baseline {
            message: format!("Failed to serialize target tree: {}", e),
        })?;

        let started = Instant::now();
        let mut tx = pool.begin().await.map_err(|e| DatabaseError::Transaction {
            message: format!("Failed to begin transaction: {}", e),
        })?;

        for sql in self.generate_transaction_settings_sql(statement_timeout) {
            sqlx::query(&sql)
                .execute(&mut *tx)
                .await
                .map_err(|e| DatabaseError::Query {
                    message: format!("Failed to configure transaction: {}", e),
                    sql: Some(sql.clone()),
                })?;
        }

        for (index, sql) in commands.iter().enumerate() {
            debug!(index, sql = %sql, "Executing statement");
            if let Err(e) = sqlx::query(sql).execute(&mut *tx).await {
                warn!(index, error = %e, "Statement failed, rolling back");
                rollback(tx).await;
                return Err(DatabaseError::Query {
                    message: format!("Statement {} failed: {}", index + 1, e),
                    sql: Some(sql.clone()),
                });
            }
        }

        let insert = self.generate_insert_baseline_sql();
        if let Err(e) = sqlx::query(&insert)
            .bind(&checksum)
            .bind(&state)
            .execute(&mut *tx)
            .await
        {
            rollback(tx).await;
            return Err(DatabaseError::Query {
                message: format!("Failed to record baseline: {}", e),
                sql: Some(insert),
            });
        }

        tx.commit().await.map_err(|e| DatabaseError::Transaction {
            message: format!("Failed to commit transaction: {}", e),
        })?;

        let duration_ms = i64::try_from(started.elapsed().as_millis()).unwrap_or(i64::MAX);
        info!(
            executed = commands.len(),
            checksum = %checksum,
            duration_ms,
            "Migration applied"
        );

        Ok(ApplyReport {
            executed: commands.len(),
            baseline_updated: true,
            checksum,
            duration_ms,
        })
    }
}

async fn rollback(tx: sqlx::Transaction<'_, sqlx::Postgres>) {
    if let Err(e) = tx.rollback().await {
        warn!(error = %e, "Rollback failed");
    }
}
