// カラムのSQL

use super::{MigrationSqlPlan, PostgresSqlGenerator, StatementBundle};
use crate::adapters::extension_registry::ColumnExtensionContext;
use crate::adapters::sql_quote::{qualified, quote_identifier, render_default, render_type};
use crate::core::db_meta::{ColumnNode, DataType};
use crate::core::delta::{Action, ColumnDelta};
use crate::core::naming::{deleted_name, is_deleted_name};

impl PostgresSqlGenerator<'_> {
    pub(crate) fn generate_column(
        &self,
        schema_name: &str,
        table_name: &str,
        column: &ColumnDelta,
        plan: &mut MigrationSqlPlan,
    ) {
        let quoted_table = qualified(schema_name, table_name);
        let mut bundle = StatementBundle::new();

        let was_physical = column.from.as_ref().is_some_and(ColumnNode::is_physical);
        let is_physical = column.to.as_ref().is_some_and(ColumnNode::is_physical);

        match &column.action {
            Action::Added if is_physical => {
                self.push_add_column(&quoted_table, column, &mut bundle);
            }
            Action::Removed if was_physical => {
                self.push_remove_column(&quoted_table, &column.name, &mut bundle);
            }
            Action::Renamed { old_name } if was_physical && is_physical => {
                bundle.up.push(format!(
                    "ALTER TABLE {} RENAME COLUMN {} TO {};",
                    quoted_table,
                    quote_identifier(old_name),
                    quote_identifier(&column.name)
                ));
                self.push_column_details(&quoted_table, column, &mut bundle);
            }
            Action::Renamed { old_name } if was_physical => {
                self.push_remove_column(&quoted_table, old_name, &mut bundle);
            }
            Action::Changed | Action::Renamed { .. } => {
                if is_physical && !was_physical {
                    self.push_add_column(&quoted_table, column, &mut bundle);
                } else if was_physical && !is_physical {
                    self.push_remove_column(&quoted_table, &column.name, &mut bundle);
                } else if is_physical {
                    self.push_column_details(&quoted_table, column, &mut bundle);
                }
            }
            _ => {}
        }

        let context = ColumnExtensionContext {
            schema_name,
            table_name,
            column_name: &column.name,
            column_action: &column.action,
        };
        for extension in column.extensions.values() {
            if let Some(additional) = self.extensions.run_column(extension, &context) {
                bundle.extend(additional.table);
                plan.crud.extend(additional.crud);
            }
        }

        if !bundle.is_empty() {
            plan.table_mut(schema_name, table_name)
                .columns
                .entry(column.name.clone())
                .or_default()
                .extend(bundle);
        }
    }

    fn push_add_column(&self, quoted_table: &str, column: &ColumnDelta, bundle: &mut StatementBundle) {
        bundle.up.push(format!(
            "ALTER TABLE {} ADD COLUMN IF NOT EXISTS {} varchar;",
            quoted_table,
            quote_identifier(&column.name)
        ));
        // 追加直後のカラムは varchar として型変換する
        let added = ColumnDelta {
            from: None,
            type_changed: true,
            ..column.clone()
        };
        self.push_column_details(quoted_table, &added, bundle);
    }

    fn push_remove_column(&self, quoted_table: &str, column_name: &str, bundle: &mut StatementBundle) {
        if !self.is_rename_instead_of_drop() {
            bundle.down.push(format!(
                "ALTER TABLE {} DROP COLUMN IF EXISTS {} CASCADE;",
                quoted_table,
                quote_identifier(column_name)
            ));
        } else if !is_deleted_name(column_name) {
            bundle.down.push(format!(
                "ALTER TABLE {} RENAME COLUMN {} TO {};",
                quoted_table,
                quote_identifier(column_name),
                quote_identifier(&deleted_name(column_name))
            ));
        }
    }

    /// 型とデフォルト値の変更
    fn push_column_details(&self, quoted_table: &str, column: &ColumnDelta, bundle: &mut StatementBundle) {
        let Some(to) = &column.to else {
            return;
        };
        let quoted_column = quote_identifier(&column.name);

        if column.type_changed {
            if let Some(data_type) = to.data_type() {
                let source_is_array = column
                    .from
                    .as_ref()
                    .and_then(ColumnNode::data_type)
                    .is_some_and(DataType::is_array);
                bundle.up.push(format!(
                    "ALTER TABLE {} ALTER COLUMN {} TYPE {} USING {};",
                    quoted_table,
                    quoted_column,
                    render_type(data_type),
                    cast_expression(&quoted_column, data_type, source_is_array)
                ));
            }
        }

        match (&column.default_action, &to.default_value) {
            (Action::Added | Action::Changed, Some(default_value)) => {
                bundle.up.push(format!(
                    "ALTER TABLE {} ALTER COLUMN {} SET DEFAULT {};",
                    quoted_table,
                    quoted_column,
                    render_default(default_value)
                ));
            }
            (Action::Removed, _) => {
                bundle.down.push(format!(
                    "ALTER TABLE {} ALTER COLUMN {} DROP DEFAULT;",
                    quoted_table, quoted_column
                ));
            }
            _ => {}
        }
    }
}

/// USING句の変換式
///
/// 非配列から配列型への変換は `string_to_array` を経由します。
fn cast_expression(quoted_column: &str, data_type: &DataType, source_is_array: bool) -> String {
    let rendered = render_type(data_type);
    if data_type.is_array() && !source_is_array {
        format!(
            "string_to_array({}::text, ''::text)::{}",
            quoted_column, rendered
        )
    } else {
        format!("{}::{}", quoted_column, rendered)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::adapters::extension_registry::{AdditionalStatements, ExtensionRegistry};
    use crate::core::config::CompilerOptions;
    use crate::core::db_meta::DefaultValue;
    use crate::core::delta::ExtensionDelta;
    use serde_json::json;
    use std::collections::BTreeMap;

    fn generate_with(
        column: ColumnDelta,
        options: CompilerOptions,
        registry: &ExtensionRegistry,
    ) -> MigrationSqlPlan {
        let generator = PostgresSqlGenerator::new(&options, registry);
        let mut plan = MigrationSqlPlan::default();
        generator.generate_column("app", "User", &column, &mut plan);
        plan
    }

    fn generate(column: ColumnDelta) -> StatementBundle {
        let name = column.name.clone();
        let plan = generate_with(column, CompilerOptions::default(), &ExtensionRegistry::new());
        plan.schemas
            .get("app")
            .and_then(|s| s.tables.get("User"))
            .and_then(|t| t.columns.get(&name))
            .cloned()
            .unwrap_or_default()
    }

    fn added(column: ColumnNode) -> ColumnDelta {
        ColumnDelta {
            name: column.name.clone(),
            action: Action::Added,
            to: Some(column),
            type_changed: true,
            ..Default::default()
        }
    }

    #[test]
    fn test_added_column_with_type() {
        let bundle = generate(added(ColumnNode::physical("id", "uuid")));

        assert_eq!(
            bundle.up,
            vec![
                r#"ALTER TABLE "app"."User" ADD COLUMN IF NOT EXISTS "id" varchar;"#.to_string(),
                r#"ALTER TABLE "app"."User" ALTER COLUMN "id" TYPE uuid USING "id"::uuid;"#
                    .to_string(),
            ]
        );
    }

    #[test]
    fn test_added_array_column_uses_string_to_array() {
        let bundle = generate(added(ColumnNode::physical("tags", "text[]")));

        assert_eq!(
            bundle.up[1],
            r#"ALTER TABLE "app"."User" ALTER COLUMN "tags" TYPE text[] USING string_to_array("tags"::text, ''::text)::text[];"#
        );
    }

    #[test]
    fn test_added_enum_column_quotes_type() {
        let bundle = generate(added(ColumnNode::enumerated("status", "Status")));

        assert_eq!(
            bundle.up[1],
            r#"ALTER TABLE "app"."User" ALTER COLUMN "status" TYPE "Status" USING "status"::"Status";"#
        );
    }

    #[test]
    fn test_added_column_with_defaults() {
        let mut column = added(
            ColumnNode::physical("createdAt", "timestamptz")
                .with_default(DefaultValue::Expression("now()".to_string())),
        );
        column.default_action = Action::Added;
        let bundle = generate(column);
        assert_eq!(
            bundle.up[2],
            r#"ALTER TABLE "app"."User" ALTER COLUMN "createdAt" SET DEFAULT now();"#
        );

        let mut column = added(
            ColumnNode::physical("role", "varchar")
                .with_default(DefaultValue::Value(json!("o'neil"))),
        );
        column.default_action = Action::Added;
        let bundle = generate(column);
        assert_eq!(
            bundle.up[2],
            r#"ALTER TABLE "app"."User" ALTER COLUMN "role" SET DEFAULT 'o''neil';"#
        );
    }

    #[test]
    fn test_removed_default_goes_to_down() {
        let from = ColumnNode::physical("role", "varchar")
            .with_default(DefaultValue::Value(json!("user")));
        let to = ColumnNode::physical("role", "varchar");
        let bundle = generate(ColumnDelta {
            name: "role".to_string(),
            action: Action::Changed,
            from: Some(from),
            to: Some(to),
            type_changed: false,
            default_action: Action::Removed,
            extensions: BTreeMap::new(),
        });

        assert!(bundle.up.is_empty());
        assert_eq!(
            bundle.down,
            vec![r#"ALTER TABLE "app"."User" ALTER COLUMN "role" DROP DEFAULT;"#.to_string()]
        );
    }

    #[test]
    fn test_removed_column_policies() {
        let removed = ColumnDelta {
            name: "age".to_string(),
            action: Action::Removed,
            from: Some(ColumnNode::physical("age", "int4")),
            ..Default::default()
        };

        let bundle = generate(removed.clone());
        assert_eq!(
            bundle.down,
            vec![r#"ALTER TABLE "app"."User" RENAME COLUMN "age" TO "_deleted:age";"#.to_string()]
        );

        let plan = generate_with(
            removed,
            CompilerOptions::default().with_rename_instead_of_drop(false),
            &ExtensionRegistry::new(),
        );
        assert_eq!(
            plan.schemas["app"].tables["User"].columns["age"].down,
            vec![r#"ALTER TABLE "app"."User" DROP COLUMN IF EXISTS "age" CASCADE;"#.to_string()]
        );
    }

    #[test]
    fn test_renamed_column_with_type_change() {
        let bundle = generate(ColumnDelta {
            name: "fullName".to_string(),
            action: Action::Renamed {
                old_name: "name".to_string(),
            },
            from: Some(ColumnNode::physical("name", "varchar")),
            to: Some(ColumnNode::physical("fullName", "text")),
            type_changed: true,
            ..Default::default()
        });

        assert_eq!(
            bundle.up,
            vec![
                r#"ALTER TABLE "app"."User" RENAME COLUMN "name" TO "fullName";"#.to_string(),
                r#"ALTER TABLE "app"."User" ALTER COLUMN "fullName" TYPE text USING "fullName"::text;"#
                    .to_string(),
            ]
        );
    }

    #[test]
    fn test_array_to_array_change_uses_plain_cast() {
        let bundle = generate(ColumnDelta {
            name: "ids".to_string(),
            action: Action::Changed,
            from: Some(ColumnNode::physical("ids", "text[]")),
            to: Some(ColumnNode::physical("ids", "uuid[]")),
            type_changed: true,
            ..Default::default()
        });

        assert_eq!(
            bundle.up,
            vec![r#"ALTER TABLE "app"."User" ALTER COLUMN "ids" TYPE uuid[] USING "ids"::uuid[];"#
                .to_string()]
        );
    }

    #[test]
    fn test_virtual_columns_emit_nothing() {
        let column = ColumnNode::new("fullName", crate::core::db_meta::ColumnKind::Computed);
        let bundle = generate(added(column));
        assert!(bundle.is_empty());
    }

    #[test]
    fn test_column_extension_runs() {
        let registry = ExtensionRegistry::new().with_column_extension("fileTrigger", |_, ctx| {
            let mut table = StatementBundle::new();
            table.up.push(format!("-- trigger for {}", ctx.column_name));
            AdditionalStatements::new().with_table(table)
        });
        let mut column = added(ColumnNode::physical("avatar", "uuid"));
        column.extensions.insert(
            "fileTrigger".to_string(),
            ExtensionDelta {
                name: "fileTrigger".to_string(),
                action: Action::Added,
                from: None,
                to: Some(json!({})),
            },
        );

        let plan = generate_with(column, CompilerOptions::default(), &registry);
        let bundle = &plan.schemas["app"].tables["User"].columns["avatar"];
        assert_eq!(bundle.up.last().unwrap(), "-- trigger for avatar");
    }
}
