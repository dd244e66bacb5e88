// 設定ファイル書き出しサービス
//
// core::config の純粋性を保つため、YAMLへの直列化はこのサービスに集約する。

use crate::core::config::{BaselineConfig, Config, DatabaseConfig, ViewConfig};
use anyhow::{Context, Result};
use std::collections::HashMap;

/// 設定ファイル書き出しサービス
#[derive(Debug, Clone, Default)]
pub struct ConfigSerializer;

impl ConfigSerializer {
    /// ConfigをYAML文字列に変換
    pub fn to_yaml(config: &Config) -> Result<String> {
        serde_saphyr::to_string(config).with_context(|| "Failed to serialize config file")
    }

    /// `init` で作成する初期設定
    pub fn initial_config(environment: &str, database: DatabaseConfig) -> Config {
        let mut environments = HashMap::new();
        environments.insert(environment.to_string(), database);

        Config {
            version: "1.0".to_string(),
            rename_instead_of_drop: true,
            ignored_schemas: Vec::new(),
            views: ViewConfig::default(),
            baseline: BaselineConfig::default(),
            environments,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::services::config_loader::ConfigLoader;

    #[test]
    fn test_initial_config_round_trips_through_loader() {
        let config = ConfigSerializer::initial_config(
            "development",
            DatabaseConfig {
                database: "app_dev".to_string(),
                user: Some("postgres".to_string()),
                ..Default::default()
            },
        );

        let yaml = ConfigSerializer::to_yaml(&config).unwrap();
        let loaded = ConfigLoader::from_yaml(&yaml).unwrap();

        assert_eq!(loaded.version, "1.0");
        assert!(loaded.rename_instead_of_drop);
        assert_eq!(loaded.baseline, BaselineConfig::default());
        assert_eq!(
            loaded.get_database_config("development").unwrap().database,
            "app_dev"
        );
    }
}
