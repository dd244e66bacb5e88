// スナップショット入出力サービス
//
// メタデータツリーをファイルから読み込み、ファイルへ書き出す。
// 拡張子が .yaml / .yml ならYAML、それ以外はJSONとして扱う。

use crate::core::db_meta::DbMeta;
use crate::core::error::IoError;
use std::fs;
use std::path::Path;
use tracing::debug;

/// スナップショットの形式
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SnapshotFormat {
    Json,
    Yaml,
}

impl SnapshotFormat {
    /// ファイル拡張子から形式を判定
    pub fn from_path(path: &Path) -> Self {
        match path.extension().and_then(|e| e.to_str()) {
            Some("yaml") | Some("yml") => SnapshotFormat::Yaml,
            _ => SnapshotFormat::Json,
        }
    }
}

/// スナップショット入出力サービス
#[derive(Debug, Clone, Default)]
pub struct SnapshotIo;

impl SnapshotIo {
    /// ファイルからツリーを読み込む
    ///
    /// マップのキーからノード名を補完した状態で返します。
    pub fn load(path: &Path) -> Result<DbMeta, IoError> {
        let display = path.display().to_string();
        if !path.exists() {
            return Err(IoError::FileNotFound { path: display });
        }

        let content = fs::read_to_string(path).map_err(|e| IoError::FileRead {
            path: display.clone(),
            cause: e.to_string(),
        })?;

        let meta = Self::parse(&content, SnapshotFormat::from_path(path)).map_err(|cause| {
            IoError::Parse {
                path: display.clone(),
                cause,
            }
        })?;

        debug!(path = %path.display(), tables = meta.tables().count(), "Loaded snapshot");
        Ok(meta)
    }

    /// 文字列からツリーを読み込む
    pub fn parse(content: &str, format: SnapshotFormat) -> Result<DbMeta, String> {
        let meta: DbMeta = match format {
            SnapshotFormat::Json => serde_json::from_str(content).map_err(|e| e.to_string())?,
            SnapshotFormat::Yaml => serde_saphyr::from_str(content).map_err(|e| e.to_string())?,
        };
        Ok(meta.normalize())
    }

    /// ツリーをファイルへ書き出す
    pub fn save(meta: &DbMeta, path: &Path) -> Result<(), IoError> {
        let display = path.display().to_string();
        let content = match SnapshotFormat::from_path(path) {
            SnapshotFormat::Json => serde_json::to_string_pretty(meta).map_err(|e| e.to_string()),
            SnapshotFormat::Yaml => serde_saphyr::to_string(meta).map_err(|e| e.to_string()),
        }
        .map_err(|cause| IoError::FileWrite {
            path: display.clone(),
            cause,
        })?;

        fs::write(path, content).map_err(|e| IoError::FileWrite {
            path: display,
            cause: e.to_string(),
        })
    }
}
