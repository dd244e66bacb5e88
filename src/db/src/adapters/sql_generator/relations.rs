// リレーションのSQL
//
// ONE:MANY / ONE:ONE は外部キー制約、MANY:MANY は両側の uuid[] カラムとして表現する。
// どちらもリレーション定義のJSONをコメントとして保持する。

use super::{MigrationSqlPlan, PostgresSqlGenerator, StatementBundle};
use crate::adapters::sql_quote::{qualified, quote_identifier, quote_literal};
use crate::core::db_meta::{RelationNode, RelationSide, RelationType};
use crate::core::delta::{Action, RelationDelta, RelationSideDelta};
use crate::core::naming::{deleted_name, foreign_key_name, is_deleted_name};
use serde::Serialize;
use tracing::debug;

/// 参照先カラムの既定値
const DEFAULT_REFERENCE_COLUMN: &str = "id";

/// サイドに対する操作
enum SideChange<'s> {
    Add(&'s RelationSide),
    Remove(&'s RelationSide),
    Update {
        from: &'s RelationSide,
        to: &'s RelationSide,
    },
}

impl PostgresSqlGenerator<'_> {
    pub(crate) fn generate_relation(&self, relation: &RelationDelta, plan: &mut MigrationSqlPlan) {
        let mut bundle = StatementBundle::new();

        if relation.kind_changed() {
            debug!(relation = %relation.name, "Relation kind changed, recreating");
            // 旧リレーションをすべて撤去してから新リレーションを作成
            if let Some(from) = &relation.from {
                for side in from.sides.values() {
                    self.generate_side(relation, from, SideChange::Remove(side), &mut bundle, plan);
                }
            }
            if let Some(to) = &relation.to {
                for side in to.sides.values() {
                    self.generate_side(relation, to, SideChange::Add(side), &mut bundle, plan);
                }
            }
        } else {
            for side in relation.sides.values() {
                self.generate_side_delta(relation, side, &mut bundle, plan);
            }
        }

        if !bundle.is_empty() {
            plan.relations
                .entry(relation.name.clone())
                .or_default()
                .extend(bundle);
        }
    }

    fn generate_side_delta(
        &self,
        relation: &RelationDelta,
        side: &RelationSideDelta,
        bundle: &mut StatementBundle,
        plan: &mut MigrationSqlPlan,
    ) {
        let change = match (&side.action, &side.from, &side.to) {
            (Action::Added, _, Some(to)) => SideChange::Add(to),
            (Action::Removed, Some(from), _) => SideChange::Remove(from),
            (Action::Changed | Action::Renamed { .. }, Some(from), Some(to)) => {
                SideChange::Update { from, to }
            }
            _ => return,
        };

        let node = match &change {
            SideChange::Remove(_) => relation.from.as_ref(),
            SideChange::Add(_) | SideChange::Update { .. } => relation.to.as_ref(),
        };
        if let Some(node) = node {
            self.generate_side(relation, node, change, bundle, plan);
        }
    }

    /// `node` は操作対象サイドが属するリレーション（撤去なら変更前、それ以外は変更後）
    fn generate_side(
        &self,
        relation: &RelationDelta,
        node: &RelationNode,
        change: SideChange<'_>,
        bundle: &mut StatementBundle,
        plan: &mut MigrationSqlPlan,
    ) {
        if node.is_many_to_many() {
            self.generate_many_to_many_side(change, bundle, plan);
            return;
        }

        match change {
            SideChange::Add(side) => match side.relation_type {
                RelationType::One => self.push_foreign_key(&relation.name, side, node, bundle),
                RelationType::Many => {}
            },
            SideChange::Remove(side) => {
                if side.relation_type == RelationType::One {
                    self.push_foreign_key_removal(&relation.name, side, plan, bundle);
                }
            }
            SideChange::Update { from, to } => {
                let column_moved = from.column_name != to.column_name;
                if from.relation_type == RelationType::One
                    && (to.relation_type != RelationType::One || column_moved)
                {
                    self.push_foreign_key_removal(&relation.name, from, plan, bundle);
                }

                match to.relation_type {
                    RelationType::One => self.push_foreign_key(&relation.name, to, node, bundle),
                    RelationType::Many => {
                        // ONE側に差分がなければ既存の外部キーのコメントだけを更新する
                        let one_side_untouched = node
                            .sides
                            .values()
                            .filter(|s| s.relation_type == RelationType::One)
                            .all(|s| !relation.sides.contains_key(&s.key()));
                        if !relation.action.is_added() && one_side_untouched {
                            bundle.up.push(format!(
                                "COMMENT ON CONSTRAINT {} ON {} IS {};",
                                quote_identifier(&foreign_key_name(&relation.name)),
                                qualified(&to.reference.schema_name, &to.reference.table_name),
                                quote_literal(&descriptor(node))
                            ));
                        }
                    }
                }
            }
        }
    }

    /// ONEサイドの外部キーカラムと制約を作成
    ///
    /// 既存の制約は ON DELETE / ON UPDATE を反映するため作り直す。
    fn push_foreign_key(
        &self,
        relation_name: &str,
        side: &RelationSide,
        node: &RelationNode,
        bundle: &mut StatementBundle,
    ) {
        let Some(column_name) = &side.column_name else {
            return;
        };
        let quoted_table = qualified(&side.schema_name, &side.table_name);
        let constraint_name = quote_identifier(&foreign_key_name(relation_name));
        let reference_column = side
            .reference
            .column_name
            .as_deref()
            .unwrap_or(DEFAULT_REFERENCE_COLUMN);

        bundle.up.push(format!(
            "ALTER TABLE {} ADD COLUMN IF NOT EXISTS {} uuid;",
            quoted_table,
            quote_identifier(column_name)
        ));
        bundle.up.push(format!(
            "ALTER TABLE {} DROP CONSTRAINT IF EXISTS {} CASCADE;",
            quoted_table, constraint_name
        ));

        let mut foreign_key = format!(
            "ALTER TABLE {} ADD CONSTRAINT {} FOREIGN KEY ({}) REFERENCES {}({})",
            quoted_table,
            constraint_name,
            quote_identifier(column_name),
            qualified(&side.reference.schema_name, &side.reference.table_name),
            quote_identifier(reference_column)
        );
        if let Some(on_delete) = side.on_delete {
            foreign_key.push_str(&format!(" ON DELETE {}", on_delete));
        }
        if let Some(on_update) = side.on_update {
            foreign_key.push_str(&format!(" ON UPDATE {}", on_update));
        }
        foreign_key.push(';');
        bundle.up.push(foreign_key);

        bundle.up.push(format!(
            "COMMENT ON CONSTRAINT {} ON {} IS {};",
            constraint_name,
            quoted_table,
            quote_literal(&descriptor(node))
        ));
    }

    /// ONEサイドの外部キー制約とカラムを撤去
    ///
    /// リネームされたテーブル上のサイドは、そのテーブルの制約撤去文として新しい名前で出力する。
    fn push_foreign_key_removal(
        &self,
        relation_name: &str,
        side: &RelationSide,
        plan: &mut MigrationSqlPlan,
        bundle: &mut StatementBundle,
    ) {
        let renamed = self.renamed_table(side);
        let (schema_name, table_name) = renamed
            .clone()
            .unwrap_or_else(|| (side.schema_name.clone(), side.table_name.clone()));
        let quoted_table = qualified(&schema_name, &table_name);

        let mut statements = vec![format!(
            "ALTER TABLE {} DROP CONSTRAINT IF EXISTS {} CASCADE;",
            quoted_table,
            quote_identifier(&foreign_key_name(relation_name))
        )];
        if let Some(column_name) = &side.column_name {
            statements.extend(self.column_removal(&quoted_table, column_name));
        }

        match renamed {
            Some(_) => {
                // 制約の撤去文は逆順で実行される
                let constraints = &mut plan.table_mut(&schema_name, &table_name).constraints;
                constraints.down.extend(statements.into_iter().rev());
            }
            None => bundle.down.extend(statements),
        }
    }

    fn generate_many_to_many_side(
        &self,
        change: SideChange<'_>,
        bundle: &mut StatementBundle,
        plan: &mut MigrationSqlPlan,
    ) {
        match change {
            SideChange::Add(side) => {
                let Some(column_name) = &side.column_name else {
                    return;
                };
                bundle.up.push(format!(
                    "ALTER TABLE {} ADD COLUMN IF NOT EXISTS {} uuid[];",
                    qualified(&side.schema_name, &side.table_name),
                    quote_identifier(column_name)
                ));
                bundle.up.push(column_comment(side, column_name));
            }
            SideChange::Remove(side) => {
                let Some(column_name) = &side.column_name else {
                    return;
                };
                match self.renamed_table(side) {
                    Some((schema_name, table_name)) => {
                        let quoted_table = qualified(&schema_name, &table_name);
                        let statements = self.column_removal(&quoted_table, column_name);
                        plan.table_mut(&schema_name, &table_name)
                            .constraints
                            .down
                            .extend(statements.into_iter().rev());
                    }
                    None => {
                        let quoted_table = qualified(&side.schema_name, &side.table_name);
                        bundle
                            .down
                            .extend(self.column_removal(&quoted_table, column_name));
                    }
                }
            }
            SideChange::Update { from, to } => {
                let Some(column_name) = &to.column_name else {
                    return;
                };
                match &from.column_name {
                    Some(old_name) if old_name != column_name => {
                        bundle.up.push(format!(
                            "ALTER TABLE {} RENAME COLUMN {} TO {};",
                            qualified(&to.schema_name, &to.table_name),
                            quote_identifier(old_name),
                            quote_identifier(column_name)
                        ));
                    }
                    Some(_) => {}
                    None => {
                        bundle.up.push(format!(
                            "ALTER TABLE {} ADD COLUMN IF NOT EXISTS {} uuid[];",
                            qualified(&to.schema_name, &to.table_name),
                            quote_identifier(column_name)
                        ));
                    }
                }
                bundle.up.push(column_comment(to, column_name));
            }
        }
    }

    /// サイドのテーブルがリネームされていれば変更後の (スキーマ名, テーブル名)
    fn renamed_table(&self, side: &RelationSide) -> Option<(String, String)> {
        let mapped = self.renames.map_table(&side.schema_name, &side.table_name);
        (mapped.0 != side.schema_name || mapped.1 != side.table_name).then_some(mapped)
    }

    /// 削除ポリシーに従ったカラム撤去文
    fn column_removal(&self, quoted_table: &str, column_name: &str) -> Vec<String> {
        if !self.is_rename_instead_of_drop() {
            vec![format!(
                "ALTER TABLE {} DROP COLUMN IF EXISTS {} CASCADE;",
                quoted_table,
                quote_identifier(column_name)
            )]
        } else if is_deleted_name(column_name) {
            Vec::new()
        } else {
            vec![format!(
                "ALTER TABLE {} RENAME COLUMN {} TO {};",
                quoted_table,
                quote_identifier(column_name),
                quote_identifier(&deleted_name(column_name))
            )]
        }
    }
}

fn column_comment(side: &RelationSide, column_name: &str) -> String {
    format!(
        "COMMENT ON COLUMN {}.{} IS {};",
        qualified(&side.schema_name, &side.table_name),
        quote_identifier(column_name),
        quote_literal(&descriptor(side))
    )
}

/// コメントに埋め込むJSON
fn descriptor<T: Serialize>(value: &T) -> String {
    serde_json::to_string(value).unwrap_or_default()
}
