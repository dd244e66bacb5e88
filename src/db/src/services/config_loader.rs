// 設定ファイル読み込みサービス
//
// core::config の純粋性を保つため、ファイルI/Oはこのサービスに集約する。
// 読み込んだ設定は返す前に必ず検証する。

use crate::core::config::Config;
use crate::core::error::IoError;
use anyhow::{Context, Result};
use std::path::Path;
use tracing::debug;

/// 設定ファイル読み込みサービス
#[derive(Debug, Clone, Default)]
pub struct ConfigLoader;

impl ConfigLoader {
    /// YAMLファイルから設定を読み込んで検証する
    pub fn from_file(path: &Path) -> Result<Config> {
        if !path.exists() {
            return Err(IoError::FileNotFound {
                path: path.display().to_string(),
            })
            .with_context(|| "Run `pgshift init` to create a config file");
        }

        let content = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read config file: {:?}", path))?;
        let config = Self::from_yaml(&content)
            .with_context(|| format!("Invalid config file: {:?}", path))?;

        debug!(path = %path.display(), environments = config.environments.len(), "Loaded config");
        Ok(config)
    }

    /// YAML文字列から設定を読み込んで検証する
    pub fn from_yaml(content: &str) -> Result<Config> {
        let config: Config =
            serde_saphyr::from_str(content).with_context(|| "Failed to parse config file")?;
        config.validate()?;
        Ok(config)
    }
}
