// マイグレーション結果モデル
//
// マイグレーション計算の出力（SQL文、エラー、警告）と、
// 適用後に保存されるベースライン記録を表現します。

use crate::core::db_meta::DbMeta;
use crate::core::error::{MigrationError, MigrationWarning};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// マイグレーション計算の結果
///
/// `commands` はそのまま順に実行できるSQL文のリストです。
#[derive(Debug, Clone, PartialEq, Default, Serialize)]
pub struct MigrationResult {
    /// 順序付け・重複排除済みのSQL文
    pub commands: Vec<String>,
    /// 構造エラー
    pub errors: Vec<MigrationError>,
    /// ポリシー警告
    pub warnings: Vec<MigrationWarning>,
}

impl MigrationResult {
    /// 空の結果を作成
    pub fn new() -> Self {
        Self::default()
    }

    /// エラーを追加
    pub fn add_error(&mut self, error: MigrationError) {
        self.errors.push(error);
    }

    /// 警告を追加
    pub fn add_warning(&mut self, warning: MigrationWarning) {
        self.warnings.push(warning);
    }

    /// エラーがないかどうか
    pub fn is_valid(&self) -> bool {
        self.errors.is_empty()
    }

    /// 実行すべきSQLがあるかどうか
    pub fn has_commands(&self) -> bool {
        !self.commands.is_empty()
    }

    /// 全エラーを改行区切りの文字列に変換
    pub fn errors_to_string(&self) -> String {
        self.errors
            .iter()
            .map(|e| e.to_string())
            .collect::<Vec<_>>()
            .join("\n")
    }
}

/// 保存済みベースライン
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BaselineRecord {
    /// 記録ID
    pub id: i64,
    /// メタデータツリーのチェックサム（SHA-256）
    pub checksum: String,
    /// 記録されたメタデータツリー
    pub state: DbMeta,
    /// 記録日時
    pub created_at: DateTime<Utc>,
}

/// 適用結果
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ApplyReport {
    /// 実行した文の数
    pub executed: usize,
    /// ベースラインを更新したか
    pub baseline_updated: bool,
    /// 新しいベースラインのチェックサム
    pub checksum: String,
    /// 実行時間（ミリ秒）
    pub duration_ms: i64,
}

impl ApplyReport {
    /// 何も実行しなかった結果
    pub fn skipped(checksum: String) -> Self {
        Self {
            executed: 0,
            baseline_updated: false,
            checksum,
            duration_ms: 0,
        }
    }
}
