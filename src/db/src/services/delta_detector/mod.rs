// 差分検出サービス
//
// 2つのメタデータツリーを型付きで再帰的に比較し、差分ツリーを生成する。
// 入力ツリーは変更しない。すべてのマップは順序付きのため出力は決定的。

mod column_comparator;
mod constraint_comparator;
mod enum_comparator;
mod relation_comparator;
mod table_comparator;

use crate::core::db_meta::DbMeta;
use crate::core::delta::{Action, DbDelta, ExtensionDelta};
use std::collections::{BTreeMap, BTreeSet};
use tracing::debug;

/// 差分検出サービス
#[derive(Debug, Clone)]
pub struct DeltaDetectorService {}

impl DeltaDetectorService {
    /// 新しいDeltaDetectorServiceを作成
    pub fn new() -> Self {
        Self {}
    }

    /// 差分ツリーを検出
    ///
    /// # Arguments
    ///
    /// * `from` - 現在デプロイ済みとみなすツリー
    /// * `to` - 目標のツリー
    ///
    /// # Returns
    ///
    /// 変更のないノードを取り除いた差分ツリー
    pub fn detect_delta(&self, from: &DbMeta, to: &DbMeta) -> DbDelta {
        let mut delta = DbDelta::new();

        self.detect_enum_delta(from, to, &mut delta);
        self.detect_schema_delta(from, to, &mut delta);
        self.detect_relation_delta(from, to, &mut delta);

        debug!(
            schemas = delta.schemas.len(),
            enums = delta.enums.len(),
            relations = delta.relations.len(),
            "Detected delta"
        );

        delta
    }

    /// 拡張ブロックの差分
    pub(crate) fn compare_extensions(
        &self,
        from: &BTreeMap<String, serde_json::Value>,
        to: &BTreeMap<String, serde_json::Value>,
    ) -> BTreeMap<String, ExtensionDelta> {
        let mut deltas = BTreeMap::new();

        for name in union_keys(from, to) {
            let (action, from_value, to_value) = match (from.get(name), to.get(name)) {
                (None, Some(t)) => (Action::Added, None, Some(t.clone())),
                (Some(f), None) => (Action::Removed, Some(f.clone()), None),
                (Some(f), Some(t)) if f != t => (Action::Changed, Some(f.clone()), Some(t.clone())),
                _ => continue,
            };
            deltas.insert(
                name.clone(),
                ExtensionDelta {
                    name: name.clone(),
                    action,
                    from: from_value,
                    to: to_value,
                },
            );
        }

        deltas
    }
}

impl Default for DeltaDetectorService {
    fn default() -> Self {
        Self::new()
    }
}

/// 2つのマップのキーの和集合（名前順）
pub(crate) fn union_keys<'a, A, B>(
    a: &'a BTreeMap<String, A>,
    b: &'a BTreeMap<String, B>,
) -> BTreeSet<&'a String> {
    a.keys().chain(b.keys()).collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::db_meta::{
        ColumnNode, ConstraintNode, DefaultValue, EnumTypeNode, RelationNode, RelationReference,
        RelationSide, RelationType, SchemaNode, TableNode,
    };
    use serde_json::json;

    fn user_table() -> TableNode {
        TableNode::new("app", "User")
            .with_column(ColumnNode::physical("id", "uuid"))
            .with_column(ColumnNode::physical("name", "varchar"))
            .with_constraint(ConstraintNode::primary_key("User_pkey", ["id"]))
    }

    fn meta_with(table: TableNode) -> DbMeta {
        DbMeta::new().with_schema(SchemaNode::new("app").with_table(table))
    }

    // ==========================================
    // 同一ツリー
    // ==========================================

    #[test]
    fn test_identical_trees_yield_empty_delta() {
        let detector = DeltaDetectorService::new();
        let meta = meta_with(user_table());

        assert!(detector.detect_delta(&meta, &meta).is_empty());
        assert!(detector
            .detect_delta(&DbMeta::new(), &DbMeta::new())
            .is_empty());
    }

    #[test]
    fn test_rename_hint_alone_is_not_a_change() {
        let detector = DeltaDetectorService::new();
        let from = meta_with(user_table());
        let to = meta_with(user_table().with_old_name("Person"));

        assert!(detector.detect_delta(&from, &to).is_empty());
    }

    // ==========================================
    // 追加・削除
    // ==========================================

    #[test]
    fn test_added_schema_marks_nested_nodes_added() {
        let detector = DeltaDetectorService::new();
        let delta = detector.detect_delta(&DbMeta::new(), &meta_with(user_table()));

        let schema = &delta.schemas["app"];
        assert_eq!(schema.action, Action::Added);
        let table = &schema.tables["User"];
        assert_eq!(table.action, Action::Added);
        assert_eq!(table.columns.len(), 2);
        assert!(table.columns.values().all(|c| c.action.is_added()));
        assert!(table.constraints["User_pkey"].action.is_added());
    }

    #[test]
    fn test_removed_table_is_marked_removed() {
        let detector = DeltaDetectorService::new();
        let from = DbMeta::new().with_schema(
            SchemaNode::new("app")
                .with_table(user_table())
                .with_table(TableNode::new("app", "Post")),
        );
        let to = meta_with(user_table());

        let delta = detector.detect_delta(&from, &to);
        let schema = &delta.schemas["app"];
        assert_eq!(schema.action, Action::Changed);
        assert_eq!(schema.tables.len(), 1);
        assert_eq!(schema.tables["Post"].action, Action::Removed);
    }

    // ==========================================
    // 変更
    // ==========================================

    #[test]
    fn test_changed_column_type_and_default() {
        let detector = DeltaDetectorService::new();
        let from = meta_with(user_table());
        let to = meta_with(
            user_table().with_column(
                ColumnNode::physical("name", "text")
                    .with_default(DefaultValue::Value(json!("anonymous"))),
            ),
        );

        let delta = detector.detect_delta(&from, &to);
        let table = delta.get_table("app", "User").unwrap();
        assert_eq!(table.action, Action::Changed);
        let column = &table.columns["name"];
        assert_eq!(column.action, Action::Changed);
        assert!(column.type_changed);
        assert_eq!(column.default_action, Action::Added);
    }

    #[test]
    fn test_unique_condition_change_is_tracked_separately() {
        let detector = DeltaDetectorService::new();
        let from = meta_with(
            user_table().with_constraint(ConstraintNode::unique("User_name_key", ["name"])),
        );
        let to = meta_with(user_table().with_constraint(
            ConstraintNode::unique("User_name_key", ["name"]).with_condition("name IS NOT NULL"),
        ));

        let delta = detector.detect_delta(&from, &to);
        let constraint = &delta.get_table("app", "User").unwrap().constraints["User_name_key"];
        assert_eq!(constraint.action, Action::Changed);
        assert!(!constraint.definition_changed);
        assert_eq!(constraint.condition_action, Action::Added);
    }

    #[test]
    fn test_extension_blocks_are_compared() {
        let detector = DeltaDetectorService::new();
        let from = meta_with(user_table());
        let to = meta_with(user_table().with_extension("audit", json!({"enabled": true})));

        let delta = detector.detect_delta(&from, &to);
        let table = delta.get_table("app", "User").unwrap();
        assert_eq!(table.extensions["audit"].action, Action::Added);
        assert!(table.columns.is_empty());
    }

    #[test]
    fn test_enum_value_change_marks_changed_with_usages() {
        let detector = DeltaDetectorService::new();
        let table = user_table().with_column(ColumnNode::enumerated("status", "Status"));
        let from = meta_with(table.clone()).with_enum(EnumTypeNode::new("Status", ["a", "b"]));
        let to = meta_with(table).with_enum(EnumTypeNode::new("Status", ["a", "b", "c"]));

        let delta = detector.detect_delta(&from, &to);
        let enum_delta = &delta.enums["Status"];
        assert_eq!(enum_delta.action, Action::Changed);
        assert_eq!(enum_delta.from_columns.len(), 1);
        assert_eq!(enum_delta.to_columns.len(), 1);
    }

    #[test]
    fn test_enum_back_references_are_not_physical() {
        let detector = DeltaDetectorService::new();
        let from = DbMeta::new().with_enum(EnumTypeNode::new("Status", ["a", "b"]));
        let to = DbMeta::new().with_enum(
            EnumTypeNode::new("Status", ["a", "b"])
                .with_column_ref(crate::core::db_meta::EnumColumnRef::new("app", "User", "status")),
        );

        let delta = detector.detect_delta(&from, &to);
        assert!(delta.enums.is_empty());
    }

    #[test]
    fn test_relation_side_changes_are_per_side() {
        let detector = DeltaDetectorService::new();
        let side = RelationSide::new(
            "app",
            "Post",
            RelationType::One,
            RelationReference::new("app", "User", Some("id")),
        )
        .with_column("authorId");
        let other = RelationSide::new(
            "app",
            "User",
            RelationType::Many,
            RelationReference::new("app", "Post", None),
        );
        let from = DbMeta::new().with_relation(
            RelationNode::new("author")
                .with_side(side.clone())
                .with_side(other.clone()),
        );
        let to = DbMeta::new().with_relation(
            RelationNode::new("author")
                .with_side(
                    side.with_on_delete(crate::core::db_meta::ReferentialAction::Cascade)
                        .with_on_update(crate::core::db_meta::ReferentialAction::Restrict),
                )
                .with_side(other),
        );

        let delta = detector.detect_delta(&from, &to);
        let relation = &delta.relations["author"];
        assert_eq!(relation.action, Action::Changed);
        assert_eq!(relation.sides.len(), 1);
        assert_eq!(relation.sides["app.Post"].action, Action::Changed);
    }

    #[test]
    fn test_detection_is_deterministic() {
        let detector = DeltaDetectorService::new();
        let from = meta_with(user_table());
        let to = meta_with(
            user_table()
                .with_column(ColumnNode::physical("email", "varchar"))
                .with_column(ColumnNode::physical("age", "int4")),
        );

        let first = detector.detect_delta(&from, &to);
        let second = detector.detect_delta(&from, &to);
        assert_eq!(first, second);
        let names: Vec<&String> = first.get_table("app", "User").unwrap().columns.keys().collect();
        assert_eq!(names, vec!["age", "email"]);
    }
}
