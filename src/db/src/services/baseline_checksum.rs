// ベースラインチェックサム計算サービス
//
// メタデータツリーの正規化JSONからSHA-256ハッシュを計算する。
// すべてのマップは順序付きのため、同じツリーは常に同じ文字列になる。

use crate::core::db_meta::DbMeta;
use sha2::{Digest, Sha256};

/// ベースラインチェックサムサービス
#[derive(Debug, Clone)]
pub struct BaselineChecksumService {}

impl BaselineChecksumService {
    /// 新しいBaselineChecksumServiceを作成
    pub fn new() -> Self {
        Self {}
    }

    /// ツリーのチェックサムを計算
    ///
    /// # Returns
    ///
    /// SHA-256ハッシュ（64文字の16進数文字列）
    pub fn calculate_checksum(&self, meta: &DbMeta) -> String {
        let canonical = self.canonical_json(meta);

        let mut hasher = Sha256::new();
        hasher.update(canonical.as_bytes());
        format!("{:x}", hasher.finalize())
    }

    /// 正規化されたJSON文字列
    ///
    /// serde_json の Value::Object もキー順に並ぶため、拡張ブロックの順序にも依存しない。
    pub fn canonical_json(&self, meta: &DbMeta) -> String {
        serde_json::to_value(meta)
            .map(|value| value.to_string())
            .unwrap_or_default()
    }

    /// 2つのチェックサムを比較
    pub fn compare_checksums(&self, checksum1: &str, checksum2: &str) -> bool {
        checksum1.eq_ignore_ascii_case(checksum2)
    }
}

impl Default for BaselineChecksumService {
    fn default() -> Self {
        Self::new()
    }
}
