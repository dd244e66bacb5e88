// 制約のSQL
//
// 撤去文は列リネームより前に実行されるため変更前のカラム名を使い、
// 追加文は変更後のカラム名を使う。テーブル名は常に変更後。

use super::{MigrationSqlPlan, PostgresSqlGenerator, StatementBundle};
use crate::adapters::sql_quote::{qualified, quote_columns, quote_identifier};
use crate::core::db_meta::{ConstraintKind, ConstraintNode};
use crate::core::delta::{Action, ConstraintDelta};

impl PostgresSqlGenerator<'_> {
    pub(crate) fn generate_constraint(
        &self,
        schema_name: &str,
        table_name: &str,
        constraint: &ConstraintDelta,
        plan: &mut MigrationSqlPlan,
    ) {
        let location = ConstraintLocation {
            schema_name,
            quoted_table: qualified(schema_name, table_name),
        };
        let mut bundle = StatementBundle::new();

        match (&constraint.action, &constraint.from, &constraint.to) {
            (Action::Added, _, Some(to)) => {
                location.push_add(to, &mut bundle);
            }
            (Action::Removed, Some(from), _) => {
                location.push_drop(from, &mut bundle);
            }
            (Action::Renamed { old_name }, Some(from), Some(to)) => {
                if constraint.definition_changed || constraint.condition_action != Action::Unchanged {
                    location.push_drop(from, &mut bundle);
                    location.push_add(to, &mut bundle);
                } else {
                    location.push_rename(old_name, to, &mut bundle);
                }
            }
            (Action::Changed, Some(from), Some(to)) => {
                if from.kind == ConstraintKind::NotNull && to.kind == ConstraintKind::NotNull {
                    location.push_not_null_change(from, to, &mut bundle);
                } else {
                    location.push_drop(from, &mut bundle);
                    location.push_add(to, &mut bundle);
                }
            }
            _ => {}
        }

        if !bundle.is_empty() {
            plan.table_mut(schema_name, table_name)
                .constraints
                .extend(bundle);
        }
    }
}

/// 制約が属するテーブル
struct ConstraintLocation<'a> {
    schema_name: &'a str,
    quoted_table: String,
}

impl ConstraintLocation<'_> {
    fn push_add(&self, constraint: &ConstraintNode, bundle: &mut StatementBundle) {
        let name = quote_identifier(&constraint.name);
        let columns = quote_columns(&constraint.columns);

        match &constraint.kind {
            ConstraintKind::NotNull => {
                for column in &constraint.columns {
                    bundle.up.push(format!(
                        "ALTER TABLE {} ALTER COLUMN {} SET NOT NULL;",
                        self.quoted_table,
                        quote_identifier(column)
                    ));
                }
            }
            ConstraintKind::PrimaryKey => {
                bundle.up.push(format!(
                    "ALTER TABLE {} ADD CONSTRAINT {} PRIMARY KEY ({});",
                    self.quoted_table, name, columns
                ));
            }
            ConstraintKind::Unique { condition: None } => {
                bundle.up.push(format!(
                    "ALTER TABLE {} ADD CONSTRAINT {} UNIQUE ({});",
                    self.quoted_table, name, columns
                ));
            }
            // 部分UNIQUEは制約ではなくインデックスとして作成する
            ConstraintKind::Unique {
                condition: Some(condition),
            } => {
                bundle.up.push(format!(
                    "CREATE UNIQUE INDEX IF NOT EXISTS {} ON {}({}) WHERE ({});",
                    name, self.quoted_table, columns, condition
                ));
            }
            ConstraintKind::Check { expression } => {
                bundle.up.push(format!(
                    "ALTER TABLE {} ADD CONSTRAINT {} CHECK ({});",
                    self.quoted_table, name, expression
                ));
            }
        }
    }

    fn push_drop(&self, constraint: &ConstraintNode, bundle: &mut StatementBundle) {
        let name = quote_identifier(&constraint.name);

        match &constraint.kind {
            ConstraintKind::NotNull => {
                for column in &constraint.columns {
                    bundle.down.push(format!(
                        "ALTER TABLE {} ALTER COLUMN {} DROP NOT NULL;",
                        self.quoted_table,
                        quote_identifier(column)
                    ));
                }
            }
            ConstraintKind::Unique {
                condition: Some(_),
            } => {
                bundle.down.push(format!(
                    "DROP INDEX IF EXISTS {};",
                    qualified(self.schema_name, &constraint.name)
                ));
                bundle.down.push(format!(
                    "ALTER TABLE {} DROP CONSTRAINT IF EXISTS {} CASCADE;",
                    self.quoted_table, name
                ));
            }
            ConstraintKind::PrimaryKey
            | ConstraintKind::Unique { condition: None }
            | ConstraintKind::Check { .. } => {
                bundle.down.push(format!(
                    "ALTER TABLE {} DROP CONSTRAINT IF EXISTS {} CASCADE;",
                    self.quoted_table, name
                ));
            }
        }
    }

    /// 定義が同じ制約の名前変更
    ///
    /// PRIMARY KEY / UNIQUE は裏側のインデックスをリネームする。
    /// NOT NULL と CHECK は物理的な操作を必要としない。
    fn push_rename(&self, old_name: &str, constraint: &ConstraintNode, bundle: &mut StatementBundle) {
        match &constraint.kind {
            ConstraintKind::PrimaryKey | ConstraintKind::Unique { .. } => {
                bundle.up.push(format!(
                    "ALTER INDEX {} RENAME TO {};",
                    qualified(self.schema_name, old_name),
                    quote_identifier(&constraint.name)
                ));
            }
            ConstraintKind::NotNull | ConstraintKind::Check { .. } => {}
        }
    }

    /// NOT NULL の対象カラム変更（カラム単位の差分）
    fn push_not_null_change(&self, from: &ConstraintNode, to: &ConstraintNode, bundle: &mut StatementBundle) {
        for column in from.columns.iter().filter(|c| !to.columns.contains(c)) {
            bundle.down.push(format!(
                "ALTER TABLE {} ALTER COLUMN {} DROP NOT NULL;",
                self.quoted_table,
                quote_identifier(column)
            ));
        }
        for column in to.columns.iter().filter(|c| !from.columns.contains(c)) {
            bundle.up.push(format!(
                "ALTER TABLE {} ALTER COLUMN {} SET NOT NULL;",
                self.quoted_table,
                quote_identifier(column)
            ));
        }
    }
}
