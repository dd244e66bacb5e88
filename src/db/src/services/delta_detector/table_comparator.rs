// スキーマ・テーブル差分検出

use crate::core::db_meta::{DbMeta, SchemaNode, TableNode};
use crate::core::delta::{Action, DbDelta, SchemaDelta, TableDelta};
use std::collections::BTreeMap;

use super::{union_keys, DeltaDetectorService};

impl DeltaDetectorService {
    pub(crate) fn detect_schema_delta(&self, from: &DbMeta, to: &DbMeta, delta: &mut DbDelta) {
        for name in union_keys(&from.schemas, &to.schemas) {
            let schema_delta = match (from.schemas.get(name), to.schemas.get(name)) {
                (None, Some(to_schema)) => self.added_schema(to_schema),
                (Some(from_schema), None) => self.removed_schema(from_schema),
                (Some(from_schema), Some(to_schema)) => {
                    let tables = self.compare_schema_tables(from_schema, to_schema);
                    if tables.is_empty() {
                        continue;
                    }
                    SchemaDelta {
                        name: name.clone(),
                        action: Action::Changed,
                        tables,
                    }
                }
                (None, None) => continue,
            };
            delta.schemas.insert(name.clone(), schema_delta);
        }
    }

    fn added_schema(&self, schema: &SchemaNode) -> SchemaDelta {
        SchemaDelta {
            name: schema.name.clone(),
            action: Action::Added,
            tables: schema
                .tables
                .iter()
                .map(|(name, table)| (name.clone(), self.added_table(table)))
                .collect(),
        }
    }

    fn removed_schema(&self, schema: &SchemaNode) -> SchemaDelta {
        SchemaDelta {
            name: schema.name.clone(),
            action: Action::Removed,
            tables: schema
                .tables
                .iter()
                .map(|(name, table)| (name.clone(), self.removed_table(table)))
                .collect(),
        }
    }

    /// 2つのスキーマ配下のテーブル差分（変更のないテーブルは含まない）
    pub(crate) fn compare_schema_tables(
        &self,
        from: &SchemaNode,
        to: &SchemaNode,
    ) -> BTreeMap<String, TableDelta> {
        let mut tables = BTreeMap::new();

        for name in union_keys(&from.tables, &to.tables) {
            let table_delta = match (from.tables.get(name), to.tables.get(name)) {
                (None, Some(to_table)) => self.added_table(to_table),
                (Some(from_table), None) => self.removed_table(from_table),
                (Some(from_table), Some(to_table)) => {
                    let table_delta = self.diff_table(from_table, to_table);
                    if table_delta.has_no_children() {
                        continue;
                    }
                    table_delta
                }
                (None, None) => continue,
            };
            tables.insert(name.clone(), table_delta);
        }

        tables
    }

    pub(crate) fn added_table(&self, table: &TableNode) -> TableDelta {
        TableDelta {
            name: table.name.clone(),
            schema_name: table.schema_name.clone(),
            action: Action::Added,
            old_schema_name: None,
            columns: table
                .columns
                .values()
                .map(|c| (c.name.clone(), self.added_column(c)))
                .collect(),
            constraints: table
                .constraints
                .values()
                .map(|c| (c.name.clone(), self.added_constraint(c)))
                .collect(),
            extensions: self.compare_extensions(&BTreeMap::new(), &table.extensions),
        }
    }

    pub(crate) fn removed_table(&self, table: &TableNode) -> TableDelta {
        TableDelta {
            name: table.name.clone(),
            schema_name: table.schema_name.clone(),
            action: Action::Removed,
            old_schema_name: None,
            columns: table
                .columns
                .values()
                .map(|c| (c.name.clone(), self.removed_column(c)))
                .collect(),
            constraints: table
                .constraints
                .values()
                .map(|c| (c.name.clone(), self.removed_constraint(c)))
                .collect(),
            extensions: self.compare_extensions(&table.extensions, &BTreeMap::new()),
        }
    }

    /// 2つのテーブルの差分（アクションは `Changed`、子ノードが空なら変更なし）
    ///
    /// リネーム確定時にも旧テーブルと新テーブルの比較に使われます。
    pub(crate) fn diff_table(&self, from: &TableNode, to: &TableNode) -> TableDelta {
        let mut columns = BTreeMap::new();
        for name in union_keys(&from.columns, &to.columns) {
            let column_delta = match (from.columns.get(name), to.columns.get(name)) {
                (None, Some(c)) => self.added_column(c),
                (Some(c), None) => self.removed_column(c),
                (Some(f), Some(t)) => match self.compare_columns(f, t) {
                    Some(column_delta) => column_delta,
                    None => continue,
                },
                (None, None) => continue,
            };
            columns.insert(name.clone(), column_delta);
        }

        let mut constraints = BTreeMap::new();
        for name in union_keys(&from.constraints, &to.constraints) {
            let constraint_delta = match (from.constraints.get(name), to.constraints.get(name)) {
                (None, Some(c)) => self.added_constraint(c),
                (Some(c), None) => self.removed_constraint(c),
                (Some(f), Some(t)) => match self.compare_constraints(f, t) {
                    Some(constraint_delta) => constraint_delta,
                    None => continue,
                },
                (None, None) => continue,
            };
            constraints.insert(name.clone(), constraint_delta);
        }

        TableDelta {
            name: to.name.clone(),
            schema_name: to.schema_name.clone(),
            action: Action::Changed,
            old_schema_name: None,
            columns,
            constraints,
            extensions: self.compare_extensions(&from.extensions, &to.extensions),
        }
    }
}
