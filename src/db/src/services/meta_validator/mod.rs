// メタデータ検証サービス
//
// 目標ツリーの構造エラーとポリシー警告を収集する。
// エラーがあっても差分計算は中断せず、不正なリレーションだけを出力対象から外す。

mod constraint_validator;
mod directive_validator;
mod relation_validator;

use crate::adapters::extension_registry::ExtensionRegistry;
use crate::core::db_meta::DbMeta;
use crate::core::delta::DbDelta;
use crate::core::error::{MigrationError, MigrationWarning};
use std::collections::BTreeSet;
use tracing::debug;

/// 検証結果
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ValidationReport {
    /// 構造エラー
    pub errors: Vec<MigrationError>,
    /// ポリシー警告
    pub warnings: Vec<MigrationWarning>,
    /// 出力から除外するリレーション名
    pub rejected_relations: BTreeSet<String>,
}

impl ValidationReport {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn is_valid(&self) -> bool {
        self.errors.is_empty()
    }

    /// 別の検証結果をマージ
    pub fn merge(&mut self, other: ValidationReport) {
        self.errors.extend(other.errors);
        self.warnings.extend(other.warnings);
        self.rejected_relations.extend(other.rejected_relations);
    }

    /// 不正なリレーションを差分から取り除く
    pub fn strip_rejected(&self, delta: &mut DbDelta) {
        delta
            .relations
            .retain(|name, _| !self.rejected_relations.contains(name));
    }
}

/// メタデータ検証サービス
#[derive(Debug, Clone)]
pub struct MetaValidatorService {
    extensions: ExtensionRegistry,
}

impl MetaValidatorService {
    /// 新しいMetaValidatorServiceを作成
    pub fn new() -> Self {
        Self {
            extensions: ExtensionRegistry::new(),
        }
    }

    /// 登録済み拡張を指定（未知のディレクティブ判定に使用）
    pub fn with_extensions(mut self, extensions: &ExtensionRegistry) -> Self {
        self.extensions = extensions.clone();
        self
    }

    /// 目標ツリーを検証
    ///
    /// # Arguments
    ///
    /// * `from` - 現在デプロイ済みとみなすツリー
    /// * `to` - 目標のツリー
    /// * `delta` - 解決済みの差分（警告は差分に現れるリレーションだけが対象）
    pub fn validate(&self, from: &DbMeta, to: &DbMeta, delta: &DbDelta) -> ValidationReport {
        let mut report = ValidationReport::new();

        if to.is_empty() && !from.is_empty() {
            report.errors.push(MigrationError::EmptyTarget {
                message: "target tree is empty but the deployed tree is not".to_string(),
                suggestion: Some(
                    "Check the schema source; an empty target would remove every table".to_string(),
                ),
            });
            return report;
        }

        report.merge(relation_validator::validate_relations(to, delta));
        report.merge(constraint_validator::validate_constraint_names(to));
        report.merge(directive_validator::validate_directives(to, &self.extensions));

        debug!(
            errors = report.errors.len(),
            warnings = report.warnings.len(),
            rejected = report.rejected_relations.len(),
            "Validated target tree"
        );

        report
    }
}

impl Default for MetaValidatorService {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::db_meta::{SchemaNode, TableNode};
    use crate::core::delta::RelationDelta;

    fn meta_with_table() -> DbMeta {
        DbMeta::new().with_schema(SchemaNode::new("app").with_table(TableNode::new("app", "User")))
    }

    #[test]
    fn test_empty_target_replacing_non_empty_tree() {
        let service = MetaValidatorService::new();
        let report = service.validate(&meta_with_table(), &DbMeta::new(), &DbDelta::new());

        assert_eq!(report.errors.len(), 1);
        assert!(report.errors[0].is_empty_target());
    }

    #[test]
    fn test_empty_to_empty_is_valid() {
        let service = MetaValidatorService::new();
        let report = service.validate(&DbMeta::new(), &DbMeta::new(), &DbDelta::new());
        assert!(report.is_valid());
    }

    #[test]
    fn test_strip_rejected() {
        let mut delta = DbDelta::new();
        for name in ["author", "tags"] {
            delta.relations.insert(
                name.to_string(),
                RelationDelta {
                    name: name.to_string(),
                    ..Default::default()
                },
            );
        }
        let mut report = ValidationReport::new();
        report.rejected_relations.insert("tags".to_string());

        report.strip_rejected(&mut delta);

        assert!(delta.relations.contains_key("author"));
        assert!(!delta.relations.contains_key("tags"));
    }
}
