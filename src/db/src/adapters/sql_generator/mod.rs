// SQL生成アダプター
//
// 解決済みの差分ツリーから、ノードごとの up / down 文リストを生成するアダプター層。
// 生成結果（MigrationSqlPlan）は順序付けサービスで1本の文リストに平坦化される。

mod columns;
mod constraints;
mod enums;
pub mod postgres;
mod relations;
mod views;

pub use postgres::PostgresSqlGenerator;

use std::collections::BTreeMap;

/// 1ノード分のSQL文
///
/// `up` は変更を適用する文、`down` は `up` より前に実行すべき準備・撤去の文。
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct StatementBundle {
    pub up: Vec<String>,
    pub down: Vec<String>,
}

impl StatementBundle {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn is_empty(&self) -> bool {
        self.up.is_empty() && self.down.is_empty()
    }

    /// 別のバンドルを後ろに連結
    pub fn extend(&mut self, other: StatementBundle) {
        self.up.extend(other.up);
        self.down.extend(other.down);
    }
}

/// 差分ツリー全体のSQL
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct MigrationSqlPlan {
    /// ENUM型（名前順にまとめたもの）
    pub enums: StatementBundle,
    /// スキーマ単位のSQL
    pub schemas: BTreeMap<String, SchemaSqlPlan>,
    /// リレーション単位のSQL
    pub relations: BTreeMap<String, StatementBundle>,
    /// 拡張や呼び出し側が追加するCRUD文
    pub crud: StatementBundle,
}

impl MigrationSqlPlan {
    /// スキーマのSQLを取得（なければ作成）
    pub(crate) fn schema_mut(&mut self, schema_name: &str) -> &mut SchemaSqlPlan {
        self.schemas.entry(schema_name.to_string()).or_default()
    }

    /// テーブルのSQLを取得（なければ作成）
    pub(crate) fn table_mut(&mut self, schema_name: &str, table_name: &str) -> &mut TableSqlPlan {
        self.schema_mut(schema_name)
            .tables
            .entry(table_name.to_string())
            .or_default()
    }

    /// 生成された文の総数
    pub fn statement_count(&self) -> usize {
        let bundle_len = |b: &StatementBundle| b.up.len() + b.down.len();
        bundle_len(&self.enums)
            + bundle_len(&self.crud)
            + self.relations.values().map(bundle_len).sum::<usize>()
            + self
                .schemas
                .values()
                .map(|schema| {
                    bundle_len(&schema.schema)
                        + schema.views.values().map(bundle_len).sum::<usize>()
                        + schema
                            .tables
                            .values()
                            .map(|table| {
                                bundle_len(&table.table)
                                    + bundle_len(&table.constraints)
                                    + table.columns.values().map(bundle_len).sum::<usize>()
                            })
                            .sum::<usize>()
                })
                .sum::<usize>()
    }
}

/// スキーマ単位のSQL
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SchemaSqlPlan {
    /// スキーマ自体（リネームは up、削除は down）
    pub schema: StatementBundle,
    /// テーブル単位のSQL（テーブル名順）
    pub tables: BTreeMap<String, TableSqlPlan>,
    /// テーブルごとの直接アクセス用ビュー
    pub views: BTreeMap<String, StatementBundle>,
}

/// テーブル単位のSQL
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct TableSqlPlan {
    /// テーブル自体とテーブル拡張
    pub table: StatementBundle,
    /// カラム単位のSQL（カラム名順）
    pub columns: BTreeMap<String, StatementBundle>,
    /// テーブル内の全制約
    pub constraints: StatementBundle,
}
