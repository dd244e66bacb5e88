// 直接アクセス用ビューのSQL
//
// テーブル構造が変わるたびにビューを作り直す。ビュー自体の差分は取らない。
// 変更・削除されるENUM型を使うテーブルのビューも、型の退避の前に外して作り直す。

use super::{MigrationSqlPlan, PostgresSqlGenerator, StatementBundle};
use crate::adapters::sql_quote::qualified;
use crate::core::db_meta::ColumnNode;
use crate::core::delta::{Action, ColumnDelta, DbDelta, TableDelta};

impl PostgresSqlGenerator<'_> {
    pub(crate) fn generate_view(&self, table: &TableDelta, plan: &mut MigrationSqlPlan) {
        if !self.options.views.enabled {
            return;
        }

        let (drop_view, create_view) = match &table.action {
            Action::Added => (false, true),
            Action::Removed => (true, false),
            Action::Renamed { .. } => (true, true),
            Action::Changed => {
                let regenerate = !table.constraints.is_empty()
                    || !table.extensions.is_empty()
                    || table.columns.values().any(affects_view);
                (regenerate, regenerate)
            }
            Action::Unchanged => (false, false),
        };

        let mut bundle = StatementBundle::new();
        if drop_view {
            bundle
                .down
                .push(self.drop_view(table.schema_name_down(), table.name_down()));
        }
        if create_view {
            bundle
                .up
                .push(self.create_view(&table.schema_name, &table.name));
        }

        if !bundle.is_empty() {
            plan.schema_mut(&table.schema_name)
                .views
                .insert(table.name.clone(), bundle);
        }
    }

    /// 変更・削除されるENUM型を使うテーブルのビューを作り直す
    ///
    /// テーブル自体の差分で作り直しが決まっているもの（削除・リネーム・構造変更）はそのまま使う。
    pub(crate) fn refresh_enum_views(&self, delta: &DbDelta, plan: &mut MigrationSqlPlan) {
        if !self.options.views.enabled {
            return;
        }

        let columns = delta
            .enums
            .values()
            .filter(|e| !e.action.is_added())
            .flat_map(|e| e.from_columns.iter());
        for column in columns {
            let (schema_name, table_name) =
                self.renames.map_table(&column.schema_name, &column.table_name);
            let handled = plan
                .schemas
                .get(&schema_name)
                .is_some_and(|schema| schema.views.contains_key(&table_name));
            let removed = delta
                .get_table(&schema_name, &table_name)
                .is_some_and(|t| t.action.is_removed());
            if handled || removed {
                continue;
            }

            let bundle = StatementBundle {
                up: vec![self.create_view(&schema_name, &table_name)],
                down: vec![self.drop_view(&schema_name, &table_name)],
            };
            plan.schema_mut(&schema_name).views.insert(table_name, bundle);
        }
    }

    fn drop_view(&self, schema_name: &str, table_name: &str) -> String {
        let view_name = format!("{}{}", self.options.views.name_prefix, table_name);
        format!("DROP VIEW IF EXISTS {};", qualified(schema_name, &view_name))
    }

    fn create_view(&self, schema_name: &str, table_name: &str) -> String {
        let views = &self.options.views;
        let view_name = format!("{}{}", views.name_prefix, table_name);
        format!(
            "CREATE OR REPLACE VIEW {} AS SELECT * FROM {} WHERE {} WITH LOCAL CHECK OPTION;",
            qualified(schema_name, &view_name),
            qualified(schema_name, table_name),
            views.admin_check
        )
    }
}

/// computed / customResolver カラムはビューに影響しない
fn affects_view(column: &ColumnDelta) -> bool {
    let node = column.to.as_ref().or(column.from.as_ref());
    !node.is_some_and(ColumnNode::is_virtual)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::adapters::extension_registry::ExtensionRegistry;
    use crate::core::config::CompilerOptions;
    use crate::core::db_meta::{ColumnKind, EnumColumnRef};
    use crate::core::delta::EnumDelta;

    fn generate(table: &TableDelta, options: CompilerOptions) -> StatementBundle {
        let registry = ExtensionRegistry::new();
        let generator = PostgresSqlGenerator::new(&options, &registry);
        let mut plan = MigrationSqlPlan::default();
        generator.generate_view(table, &mut plan);
        plan.schemas
            .get(&table.schema_name)
            .and_then(|schema| schema.views.get(&table.name))
            .cloned()
            .unwrap_or_default()
    }

    fn table(action: Action) -> TableDelta {
        TableDelta {
            name: "User".to_string(),
            schema_name: "app".to_string(),
            action,
            ..Default::default()
        }
    }

    fn column(name: &str, node: ColumnNode) -> ColumnDelta {
        ColumnDelta {
            name: name.to_string(),
            action: Action::Added,
            to: Some(node),
            ..Default::default()
        }
    }

    #[test]
    fn test_added_table_creates_view_only() {
        let bundle = generate(&table(Action::Added), CompilerOptions::default());
        assert!(bundle.down.is_empty());
        assert_eq!(
            bundle.up,
            vec![r#"CREATE OR REPLACE VIEW "app"."AUser" AS SELECT * FROM "app"."User" WHERE _auth.is_admin() = true WITH LOCAL CHECK OPTION;"#
                .to_string()]
        );
    }

    #[test]
    fn test_removed_table_drops_view_only() {
        let bundle = generate(&table(Action::Removed), CompilerOptions::default());
        assert!(bundle.up.is_empty());
        assert_eq!(
            bundle.down,
            vec![r#"DROP VIEW IF EXISTS "app"."AUser";"#.to_string()]
        );
    }

    #[test]
    fn test_renamed_table_drops_old_view() {
        let mut delta = table(Action::Renamed {
            old_name: "Person".to_string(),
        });
        delta.old_schema_name = Some("legacy".to_string());

        let bundle = generate(&delta, CompilerOptions::default());

        assert_eq!(
            bundle.down,
            vec![r#"DROP VIEW IF EXISTS "legacy"."APerson";"#.to_string()]
        );
        assert_eq!(bundle.up.len(), 1);
        assert!(bundle.up[0].starts_with(r#"CREATE OR REPLACE VIEW "app"."AUser""#));
    }

    #[test]
    fn test_computed_column_does_not_regenerate() {
        let mut delta = table(Action::Changed);
        delta.columns.insert(
            "fullName".to_string(),
            column("fullName", ColumnNode::new("fullName", ColumnKind::Computed)),
        );
        assert!(generate(&delta, CompilerOptions::default()).is_empty());

        delta.columns.insert(
            "email".to_string(),
            column("email", ColumnNode::physical("email", "varchar")),
        );
        let bundle = generate(&delta, CompilerOptions::default());
        assert_eq!(bundle.down.len(), 1);
        assert_eq!(bundle.up.len(), 1);
    }

    #[test]
    fn test_views_disabled() {
        let bundle = generate(
            &table(Action::Added),
            CompilerOptions::default().with_views(false),
        );
        assert!(bundle.is_empty());
    }

    #[test]
    fn test_custom_prefix_and_admin_check() {
        let mut options = CompilerOptions::default();
        options.views.name_prefix = "v_".to_string();
        options.views.admin_check = "current_user = 'admin'".to_string();

        let bundle = generate(&table(Action::Added), options);

        assert_eq!(
            bundle.up,
            vec![r#"CREATE OR REPLACE VIEW "app"."v_User" AS SELECT * FROM "app"."User" WHERE current_user = 'admin' WITH LOCAL CHECK OPTION;"#
                .to_string()]
        );
    }

    #[test]
    fn test_enum_change_refreshes_view_of_untouched_table() {
        let mut delta = DbDelta::new();
        delta.enums.insert(
            "Status".to_string(),
            EnumDelta {
                name: "Status".to_string(),
                action: Action::Changed,
                from_columns: vec![EnumColumnRef::new("app", "User", "status")],
                ..Default::default()
            },
        );
        let registry = ExtensionRegistry::new();

        let mut plan = MigrationSqlPlan::default();
        PostgresSqlGenerator::new(&CompilerOptions::default(), &registry)
            .refresh_enum_views(&delta, &mut plan);
        let bundle = &plan.schemas["app"].views["User"];
        assert_eq!(
            bundle.down,
            vec![r#"DROP VIEW IF EXISTS "app"."AUser";"#.to_string()]
        );
        assert!(bundle.up[0].starts_with(r#"CREATE OR REPLACE VIEW "app"."AUser""#));

        let mut plan = MigrationSqlPlan::default();
        PostgresSqlGenerator::new(&CompilerOptions::default().with_views(false), &registry)
            .refresh_enum_views(&delta, &mut plan);
        assert!(plan.schemas.is_empty());
    }
}
