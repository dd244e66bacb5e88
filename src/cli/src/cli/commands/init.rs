// initコマンドハンドラー
//
// 設定ファイル（pgshift.yaml）を生成します。
// - 初期化済みの検出と --force による上書き
// - .gitignore に設定ファイルが含まれていない場合の警告

use crate::core::config::{Config, DatabaseConfig};
use crate::services::config_serializer::ConfigSerializer;
use anyhow::{anyhow, Context, Result};
use std::fs;
use std::path::{Path, PathBuf};
use tracing::debug;

/// initコマンドの入力パラメータ
#[derive(Debug, Clone)]
pub struct InitCommand {
    /// プロジェクトのルートパス
    pub project_path: PathBuf,
    /// カスタム設定ファイルパス
    pub config_path: Option<PathBuf>,
    /// 環境名
    pub env: String,
    /// データベース名
    pub database: String,
    /// ホスト名
    pub host: Option<String>,
    /// ポート番号
    pub port: Option<u16>,
    /// ユーザー名
    pub user: Option<String>,
    /// 既存の設定を上書き
    pub force: bool,
}

/// initコマンドハンドラー
#[derive(Debug, Default)]
pub struct InitCommandHandler {}

impl InitCommandHandler {
    /// 新しいInitCommandHandlerを作成
    pub fn new() -> Self {
        Self {}
    }

    /// initコマンドを実行
    ///
    /// # Returns
    ///
    /// 成功時は作成した設定ファイルのパス
    pub fn execute(&self, command: &InitCommand) -> Result<PathBuf> {
        let config_path = self.config_path(command);

        if config_path.exists() && !command.force {
            return Err(anyhow!(
                "Config file already exists: {:?}. Use --force to overwrite it.",
                config_path
            ));
        }

        let config = self.build_config(command);
        config
            .validate()
            .with_context(|| "Refusing to write an invalid config")?;

        let yaml = ConfigSerializer::to_yaml(&config)?;
        fs::write(&config_path, yaml)
            .with_context(|| format!("Failed to write config file: {:?}", config_path))?;
        debug!(path = %config_path.display(), "Wrote config file");

        self.warn_gitignore(&command.project_path, &config_path);

        Ok(config_path)
    }

    fn config_path(&self, command: &InitCommand) -> PathBuf {
        match &command.config_path {
            Some(path) => path.clone(),
            None => command.project_path.join(Config::DEFAULT_CONFIG_PATH),
        }
    }

    /// 引数から初期設定を組み立てる
    pub fn build_config(&self, command: &InitCommand) -> Config {
        let database = DatabaseConfig {
            host: command
                .host
                .clone()
                .unwrap_or_else(|| "localhost".to_string()),
            port: command.port,
            database: command.database.clone(),
            user: command.user.clone(),
            ..Default::default()
        };
        ConfigSerializer::initial_config(&command.env, database)
    }

    /// .gitignoreに設定ファイルが含まれているかチェックし、警告を出力
    fn warn_gitignore(&self, project_path: &Path, config_path: &Path) {
        let Some(config_file_name) = config_path.file_name().and_then(|n| n.to_str()) else {
            return;
        };

        if self.is_ignored(project_path, config_file_name) {
            return;
        }

        eprintln!(
            "Warning: '{}' is not listed in .gitignore. The config file may contain database credentials. Consider ignoring it or supplying the password through DB_PASSWORD.",
            config_file_name
        );
    }

    /// 設定ファイルが .gitignore に含まれているか
    pub fn is_ignored(&self, project_path: &Path, config_file_name: &str) -> bool {
        let Ok(content) = fs::read_to_string(project_path.join(".gitignore")) else {
            return false;
        };
        content.lines().any(|line| {
            let trimmed = line.trim();
            trimmed == config_file_name || trimmed == format!("/{}", config_file_name)
        })
    }
}
