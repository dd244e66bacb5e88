// ENUM型のSQL
//
// 削除・変更時は依存カラムを varchar に逃がしてから型を削除する。
// これらは down に入り、順序付けで up（作成）より先に実行される。
// down はスキーマのリネーム後、テーブル・カラムのリネーム前に実行される。

use super::{MigrationSqlPlan, PostgresSqlGenerator};
use crate::adapters::sql_quote::{qualified, quote_identifier, quote_literal};
use crate::core::db_meta::{EnumColumnRef, EnumTypeNode};
use crate::core::delta::{Action, EnumDelta};

impl PostgresSqlGenerator<'_> {
    pub(crate) fn generate_enum(&self, enum_delta: &EnumDelta, plan: &mut MigrationSqlPlan) {
        match &enum_delta.action {
            Action::Added => {
                if let Some(to) = &enum_delta.to {
                    plan.enums.up.push(create_type(to));
                }
            }
            Action::Removed => {
                self.push_enum_drop(enum_delta, plan);
            }
            Action::Changed | Action::Renamed { .. } => {
                self.push_enum_drop(enum_delta, plan);
                if let Some(to) = &enum_delta.to {
                    plan.enums.up.push(create_type(to));
                    // 変更前後の両方に存在するカラム（リネームを含む）を新しい型に戻す
                    let kept: Vec<EnumColumnRef> = enum_delta
                        .from_columns
                        .iter()
                        .map(|c| self.renames.map_column(c))
                        .collect();
                    for column in enum_delta.to_columns.iter().filter(|c| kept.contains(c)) {
                        plan.table_mut(&column.schema_name, &column.table_name)
                            .columns
                            .entry(column.column_name.clone())
                            .or_default()
                            .up
                            .push(cast_to_enum(column, &to.name));
                    }
                }
            }
            Action::Unchanged => {}
        }
    }

    fn push_enum_drop(&self, enum_delta: &EnumDelta, plan: &mut MigrationSqlPlan) {
        let name = enum_delta
            .from
            .as_ref()
            .map_or(enum_delta.name.as_str(), |from| from.name.as_str());

        for column in &enum_delta.from_columns {
            let schema_name = self.renames.map_schema(&column.schema_name);
            plan.enums.down.push(cast_to_varchar(schema_name, column));
        }
        plan.enums
            .down
            .push(format!("DROP TYPE {};", quote_identifier(name)));
    }
}

fn create_type(enum_type: &EnumTypeNode) -> String {
    let values = enum_type
        .values
        .iter()
        .map(|v| quote_literal(v))
        .collect::<Vec<_>>()
        .join(", ");
    format!(
        "CREATE TYPE {} AS ENUM ({});",
        quote_identifier(&enum_type.name),
        values
    )
}

fn cast_to_varchar(schema_name: &str, column: &EnumColumnRef) -> String {
    let quoted_column = quote_identifier(&column.column_name);
    format!(
        "ALTER TABLE {} ALTER COLUMN {} TYPE varchar USING {}::varchar;",
        qualified(schema_name, &column.table_name),
        quoted_column,
        quoted_column
    )
}

/// カラム型変更と同じ文面にして重複排除の対象にする
fn cast_to_enum(column: &EnumColumnRef, enum_name: &str) -> String {
    let quoted_column = quote_identifier(&column.column_name);
    let quoted_type = quote_identifier(enum_name);
    format!(
        "ALTER TABLE {} ALTER COLUMN {} TYPE {} USING {}::{};",
        qualified(&column.schema_name, &column.table_name),
        quoted_column,
        quoted_type,
        quoted_column,
        quoted_type
    )
}
