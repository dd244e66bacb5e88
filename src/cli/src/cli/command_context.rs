// コマンド共通コンテキスト
//
// 設定ファイル読み込み、スナップショットのパス解決、DB接続の重複をCLI層で集約する。

use crate::adapters::database::DatabaseConnectionService;
use crate::adapters::extension_registry::ExtensionRegistry;
use crate::adapters::migration_applier::MigrationApplierService;
use crate::cli::commands::split_sql_statements;
use crate::core::config::{Config, DatabaseConfig};
use crate::core::db_meta::DbMeta;
use crate::core::migration::BaselineRecord;
use crate::services::config_loader::ConfigLoader;
use crate::services::database_config_resolver::DatabaseConfigResolver;
use crate::services::migration_pipeline::{CompiledMigration, MigrationPipeline};
use crate::services::snapshot_io::SnapshotIo;
use anyhow::{anyhow, Context, Result};
use sqlx::postgres::PgPool;
use std::path::{Path, PathBuf};
use tracing::debug;

/// CLIコマンド共通の実行コンテキスト
#[derive(Debug, Clone)]
pub struct CommandContext {
    pub project_path: PathBuf,
    pub config_path: PathBuf,
    pub config: Config,
}

impl CommandContext {
    /// プロジェクトルートから設定を読み込んでコンテキストを作成
    pub fn load(project_path: PathBuf) -> Result<Self> {
        Self::load_with_config(project_path, None)
    }

    /// カスタム設定ファイルパスを指定してコンテキストを作成
    pub fn load_with_config(
        project_path: PathBuf,
        custom_config_path: Option<PathBuf>,
    ) -> Result<Self> {
        let config_path = custom_config_path
            .unwrap_or_else(|| project_path.join(Config::DEFAULT_CONFIG_PATH));

        let config =
            ConfigLoader::from_file(&config_path).with_context(|| "Failed to read config file")?;

        Ok(Self {
            project_path,
            config_path,
            config,
        })
    }

    /// 設定ファイルなしのコンテキスト（オフラインのコマンド用）
    pub fn load_or_default(
        project_path: PathBuf,
        custom_config_path: Option<PathBuf>,
    ) -> Result<Self> {
        let config_path = custom_config_path
            .clone()
            .unwrap_or_else(|| project_path.join(Config::DEFAULT_CONFIG_PATH));

        if custom_config_path.is_none() && !config_path.exists() {
            debug!(path = %config_path.display(), "No config file, using defaults");
            return Ok(Self {
                project_path,
                config_path,
                config: Config::default(),
            });
        }

        Self::load_with_config(project_path, custom_config_path)
    }

    /// プロジェクトルートからの相対パスを解決
    pub fn resolve_path(&self, path: &Path) -> PathBuf {
        if path.is_absolute() {
            path.to_path_buf()
        } else {
            self.project_path.join(path)
        }
    }

    /// スナップショットファイルを読み込む
    pub fn load_snapshot(&self, path: &Path) -> Result<DbMeta> {
        let path = self.resolve_path(path);
        SnapshotIo::load(&path).with_context(|| format!("Failed to load snapshot: {:?}", path))
    }

    /// シードSQLファイルを文に分割して読み込む
    pub fn load_seed(&self, path: Option<&Path>) -> Result<Vec<String>> {
        let Some(path) = path else {
            return Ok(Vec::new());
        };
        let path = self.resolve_path(path);
        let content = std::fs::read_to_string(&path)
            .with_context(|| format!("Failed to read seed file: {:?}", path))?;

        Ok(split_sql_statements(&content)
            .into_iter()
            .map(|statement| format!("{};", statement))
            .collect())
    }

    /// マイグレーションを計算
    pub fn compile(&self, from: &DbMeta, to: &DbMeta, seed: Vec<String>) -> Result<CompiledMigration> {
        MigrationPipeline::new(from, to)
            .with_options(self.config.compiler_options())
            .with_extensions(ExtensionRegistry::new())
            .with_seed(seed)
            .compile_with_summary()
            .map_err(|e| anyhow!(e))
    }

    /// 環境に応じたデータベース設定を取得（環境変数上書き込み）
    pub fn database_config(&self, env: &str) -> Result<DatabaseConfig> {
        DatabaseConfigResolver::resolve(&self.config, env)
    }

    /// 接続プールを作成
    pub async fn connect_pool(&self, env: &str) -> Result<PgPool> {
        let db_config = self.database_config(env)?;
        DatabaseConnectionService::new()
            .create_pool(&db_config)
            .await
            .with_context(|| "Failed to connect to database")
    }

    /// ベースラインを扱う適用サービス
    pub fn applier(&self) -> MigrationApplierService {
        MigrationApplierService::new(&self.config.baseline)
    }

    /// DB接続を確立し、ベースライン保存テーブルを作成（未作成の場合）、最新のベースラインを取得
    pub async fn connect_and_load_baseline(
        &self,
        env: &str,
    ) -> Result<(PgPool, Option<BaselineRecord>)> {
        let pool = self.connect_pool(env).await?;

        let applier = self.applier();
        applier
            .create_baseline_table(&pool)
            .await
            .with_context(|| "Failed to create baseline table")?;

        let baseline = applier
            .load_latest(&pool)
            .await
            .with_context(|| "Failed to load the recorded baseline")?;

        Ok((pool, baseline))
    }
}
