// 差分ツリー
//
// 2つのメタデータツリー間の差分を表現する型。
// すべてのノードはちょうど1つのアクションタグを持つ。

use crate::core::db_meta::{
    ColumnNode, ConstraintNode, EnumColumnRef, EnumTypeNode, RelationNode, RelationSide,
};
use crate::core::naming::table_key;
use serde::Serialize;
use std::collections::BTreeMap;

/// ノードに対するアクション
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize)]
#[serde(tag = "action", rename_all = "camelCase")]
pub enum Action {
    /// 変更なし
    #[default]
    Unchanged,
    /// `to` にのみ存在
    Added,
    /// `from` にのみ存在
    Removed,
    /// リネーム（旧名を保持）
    #[serde(rename_all = "camelCase")]
    Renamed { old_name: String },
    /// 両方に存在し内容が異なる
    Changed,
}

impl Action {
    pub fn is_added(&self) -> bool {
        matches!(self, Action::Added)
    }

    pub fn is_removed(&self) -> bool {
        matches!(self, Action::Removed)
    }

    pub fn is_renamed(&self) -> bool {
        matches!(self, Action::Renamed { .. })
    }

    pub fn is_changed(&self) -> bool {
        matches!(self, Action::Changed)
    }

    /// リネーム元の名前
    pub fn old_name(&self) -> Option<&str> {
        match self {
            Action::Renamed { old_name } => Some(old_name.as_str()),
            _ => None,
        }
    }
}

/// 差分ツリーのルート
#[derive(Debug, Clone, PartialEq, Default, Serialize)]
pub struct DbDelta {
    pub schemas: BTreeMap<String, SchemaDelta>,
    pub enums: BTreeMap<String, EnumDelta>,
    pub relations: BTreeMap<String, RelationDelta>,
}

impl DbDelta {
    pub fn new() -> Self {
        Self::default()
    }

    /// 差分が空かどうか
    pub fn is_empty(&self) -> bool {
        self.schemas.is_empty() && self.enums.is_empty() && self.relations.is_empty()
    }

    /// テーブル差分を取得
    pub fn get_table(&self, schema_name: &str, table_name: &str) -> Option<&TableDelta> {
        self.schemas
            .get(schema_name)
            .and_then(|schema| schema.tables.get(table_name))
    }

    /// 全テーブル差分を名前順に走査
    pub fn tables(&self) -> impl Iterator<Item = &TableDelta> {
        self.schemas.values().flat_map(|schema| schema.tables.values())
    }

    /// アクション種別ごとの件数（テーブル・カラム・制約・ENUM・リレーション）
    pub fn summary(&self) -> DeltaSummary {
        let mut summary = DeltaSummary::default();
        for table in self.tables() {
            summary.count(&table.action);
            for column in table.columns.values() {
                summary.count(&column.action);
            }
            for constraint in table.constraints.values() {
                summary.count(&constraint.action);
            }
        }
        for enum_delta in self.enums.values() {
            summary.count(&enum_delta.action);
        }
        for relation in self.relations.values() {
            summary.count(&relation.action);
        }
        summary
    }
}

/// アクション種別ごとの件数
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize)]
pub struct DeltaSummary {
    pub added: usize,
    pub removed: usize,
    pub renamed: usize,
    pub changed: usize,
}

impl DeltaSummary {
    fn count(&mut self, action: &Action) {
        match action {
            Action::Unchanged => {}
            Action::Added => self.added += 1,
            Action::Removed => self.removed += 1,
            Action::Renamed { .. } => self.renamed += 1,
            Action::Changed => self.changed += 1,
        }
    }
}

/// スキーマ差分
#[derive(Debug, Clone, PartialEq, Default, Serialize)]
pub struct SchemaDelta {
    pub name: String,
    pub action: Action,
    pub tables: BTreeMap<String, TableDelta>,
}

/// テーブル差分
///
/// `Changed` は「子ノードに変更を持つコンテナ」を意味します。
#[derive(Debug, Clone, PartialEq, Default, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct TableDelta {
    pub name: String,
    pub schema_name: String,
    pub action: Action,
    /// スキーマ移動を伴うリネームの移動元
    #[serde(skip_serializing_if = "Option::is_none")]
    pub old_schema_name: Option<String>,
    pub columns: BTreeMap<String, ColumnDelta>,
    pub constraints: BTreeMap<String, ConstraintDelta>,
    pub extensions: BTreeMap<String, ExtensionDelta>,
}

impl TableDelta {
    /// 子ノードに差分がないかどうか
    pub fn has_no_children(&self) -> bool {
        self.columns.is_empty() && self.constraints.is_empty() && self.extensions.is_empty()
    }

    /// 変更前のスキーマ名
    pub fn schema_name_down(&self) -> &str {
        self.old_schema_name.as_deref().unwrap_or(&self.schema_name)
    }

    /// 変更前のテーブル名
    pub fn name_down(&self) -> &str {
        self.action.old_name().unwrap_or(&self.name)
    }
}

/// カラム差分
#[derive(Debug, Clone, PartialEq, Default, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ColumnDelta {
    pub name: String,
    pub action: Action,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub from: Option<ColumnNode>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub to: Option<ColumnNode>,
    /// 種類・型が変化したか
    pub type_changed: bool,
    /// デフォルト値のアクション
    pub default_action: Action,
    pub extensions: BTreeMap<String, ExtensionDelta>,
}

/// 制約差分
#[derive(Debug, Clone, PartialEq, Default, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ConstraintDelta {
    pub name: String,
    pub action: Action,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub from: Option<ConstraintNode>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub to: Option<ConstraintNode>,
    /// 種類・対象カラム・式が変化したか（部分条件は除く）
    pub definition_changed: bool,
    /// UNIQUE部分条件のアクション
    pub condition_action: Action,
}

/// 拡張ブロック差分
#[derive(Debug, Clone, PartialEq, Default, Serialize)]
pub struct ExtensionDelta {
    pub name: String,
    pub action: Action,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub from: Option<serde_json::Value>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub to: Option<serde_json::Value>,
}

/// ENUM型差分
#[derive(Debug, Clone, PartialEq, Default, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct EnumDelta {
    pub name: String,
    pub action: Action,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub from: Option<EnumTypeNode>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub to: Option<EnumTypeNode>,
    /// 変更前ツリーでこの型を使うカラム
    pub from_columns: Vec<EnumColumnRef>,
    /// 変更後ツリーでこの型を使うカラム
    pub to_columns: Vec<EnumColumnRef>,
}

/// リレーション差分
#[derive(Debug, Clone, PartialEq, Default, Serialize)]
pub struct RelationDelta {
    pub name: String,
    pub action: Action,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub from: Option<RelationNode>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub to: Option<RelationNode>,
    /// サイド差分（`schema.table` -> RelationSideDelta）
    pub sides: BTreeMap<String, RelationSideDelta>,
}

impl RelationDelta {
    /// サイド種別の組み合わせが変わったかどうか（ONE↔MANY）
    pub fn kind_changed(&self) -> bool {
        match (&self.from, &self.to) {
            (Some(from), Some(to)) => {
                let mut from_types = from.side_types();
                let mut to_types = to.side_types();
                from_types.sort();
                to_types.sort();
                from_types != to_types
            }
            _ => false,
        }
    }
}

/// 確定したテーブルリネーム
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct TableRename {
    pub old_schema_name: String,
    pub old_name: String,
    pub schema_name: String,
    pub name: String,
}

impl TableRename {
    /// 旧 `schema.table` キー
    pub fn old_key(&self) -> String {
        table_key(&self.old_schema_name, &self.old_name)
    }

    /// 新 `schema.table` キー
    pub fn new_key(&self) -> String {
        table_key(&self.schema_name, &self.name)
    }
}

/// 確定したカラムリネーム（テーブルは変更後の名前）
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ColumnRename {
    pub schema_name: String,
    pub table_name: String,
    pub old_name: String,
    pub name: String,
}

/// 確定したリネームの対応表
///
/// テーブルリネームの旧スキーマ名はスキーマリネーム適用後の名前で持つ。
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize)]
pub struct RenameMap {
    /// スキーマ（旧名 -> 新名）
    pub schemas: BTreeMap<String, String>,
    pub tables: Vec<TableRename>,
    pub columns: Vec<ColumnRename>,
}

impl RenameMap {
    pub fn is_empty(&self) -> bool {
        self.schemas.is_empty() && self.tables.is_empty() && self.columns.is_empty()
    }

    /// スキーマリネームのみを適用したスキーマ名
    pub fn map_schema<'a>(&'a self, schema_name: &'a str) -> &'a str {
        self.schemas
            .get(schema_name)
            .map_or(schema_name, String::as_str)
    }

    /// 変更前ツリーのテーブルの変更後の (スキーマ名, テーブル名)
    pub fn map_table(&self, schema_name: &str, table_name: &str) -> (String, String) {
        let schema_name = self.map_schema(schema_name);
        match self
            .tables
            .iter()
            .find(|r| r.old_schema_name == schema_name && r.old_name == table_name)
        {
            Some(rename) => (rename.schema_name.clone(), rename.name.clone()),
            None => (schema_name.to_string(), table_name.to_string()),
        }
    }

    /// 変更前ツリーのカラム参照を変更後の名前に写す
    pub fn map_column(&self, column: &EnumColumnRef) -> EnumColumnRef {
        let (schema_name, table_name) = self.map_table(&column.schema_name, &column.table_name);
        let column_name = self
            .columns
            .iter()
            .find(|r| {
                r.schema_name == schema_name
                    && r.table_name == table_name
                    && r.old_name == column.column_name
            })
            .map_or(column.column_name.as_str(), |r| r.name.as_str());
        EnumColumnRef::new(&schema_name, &table_name, column_name)
    }
}

/// リレーションサイド差分
#[derive(Debug, Clone, PartialEq, Default, Serialize)]
pub struct RelationSideDelta {
    pub key: String,
    pub action: Action,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub from: Option<RelationSide>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub to: Option<RelationSide>,
}
