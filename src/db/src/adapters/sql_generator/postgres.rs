// PostgreSQL用SQLジェネレーター
//
// 解決済みの差分ツリーからPostgreSQL用のDDL文を生成します。
// スキーマとテーブルはこのファイル、その他のノード種別は同階層の各ファイルで扱います。

use super::{MigrationSqlPlan, TableSqlPlan};
use crate::adapters::extension_registry::{ExtensionRegistry, TableExtensionContext};
use crate::adapters::sql_quote::{qualified, quote_identifier};
use crate::core::config::CompilerOptions;
use crate::core::delta::{Action, DbDelta, RenameMap, SchemaDelta, TableDelta};
use crate::core::naming::{deleted_name, is_deleted_name};
use tracing::debug;

/// PostgreSQLが既定で持つスキーマ
const DEFAULT_SCHEMA: &str = "public";

/// PostgreSQL用SQLジェネレーター
#[derive(Debug, Clone)]
pub struct PostgresSqlGenerator<'a> {
    pub(crate) options: CompilerOptions,
    pub(crate) extensions: &'a ExtensionRegistry,
    pub(crate) renames: RenameMap,
}

impl<'a> PostgresSqlGenerator<'a> {
    /// 新しいPostgresSqlGeneratorを作成
    pub fn new(options: &CompilerOptions, extensions: &'a ExtensionRegistry) -> Self {
        Self {
            options: options.clone(),
            extensions,
            renames: RenameMap::default(),
        }
    }

    /// 確定済みリネームを指定
    ///
    /// リネームされたテーブル上のリレーション撤去文やENUMカラムの型戻しを
    /// 新しい名前で生成するために使います。
    pub fn with_renames(mut self, renames: &RenameMap) -> Self {
        self.renames = renames.clone();
        self
    }

    /// 差分ツリー全体のSQLを生成
    pub fn generate(&self, delta: &DbDelta) -> MigrationSqlPlan {
        let mut plan = MigrationSqlPlan::default();

        for schema in delta.schemas.values() {
            self.generate_schema(schema, &mut plan);
            for table in schema.tables.values() {
                self.generate_table(table, &mut plan);
            }
        }

        // 型戻しはカラムのリネームより後に置く
        for enum_delta in delta.enums.values() {
            self.generate_enum(enum_delta, &mut plan);
        }
        self.refresh_enum_views(delta, &mut plan);

        for relation in delta.relations.values() {
            self.generate_relation(relation, &mut plan);
        }

        debug!(statements = plan.statement_count(), "Generated SQL plan");

        plan
    }

    /// 削除ポリシーに従ったリネーム先
    pub(crate) fn is_rename_instead_of_drop(&self) -> bool {
        self.options.rename_instead_of_drop
    }

    /// スキーマ自体のSQL
    ///
    /// 追加はテーブル作成時に暗黙に行われるため何も出力しません。
    /// 既定の `public` スキーマは作成も削除もしません。
    fn generate_schema(&self, schema: &SchemaDelta, plan: &mut MigrationSqlPlan) {
        if schema.name == DEFAULT_SCHEMA && !schema.action.is_renamed() {
            return;
        }
        let quoted = quote_identifier(&schema.name);
        let bundle = &mut plan.schema_mut(&schema.name).schema;

        match &schema.action {
            Action::Removed => {
                if !self.is_rename_instead_of_drop() {
                    bundle
                        .down
                        .push(format!("DROP SCHEMA IF EXISTS {};", quoted));
                } else if !is_deleted_name(&schema.name) {
                    bundle.down.push(format!(
                        "ALTER SCHEMA {} RENAME TO {};",
                        quoted,
                        quote_identifier(&deleted_name(&schema.name))
                    ));
                }
            }
            Action::Renamed { old_name } => {
                bundle.up.push(format!(
                    "ALTER SCHEMA {} RENAME TO {};",
                    quote_identifier(old_name),
                    quoted
                ));
            }
            Action::Added | Action::Changed | Action::Unchanged => {}
        }
    }

    /// テーブルと配下のノードのSQL
    ///
    /// 削除されたテーブルの配下ノードは出力しません。
    fn generate_table(&self, table: &TableDelta, plan: &mut MigrationSqlPlan) {
        let schema_name = table.schema_name.as_str();
        let quoted_table = qualified(schema_name, &table.name);

        {
            let table_plan = plan.table_mut(schema_name, &table.name);
            match &table.action {
                Action::Added => {
                    table_plan.table.up.push(format!(
                        "CREATE SCHEMA IF NOT EXISTS {};",
                        quote_identifier(schema_name)
                    ));
                    table_plan
                        .table
                        .up
                        .push(format!("CREATE TABLE IF NOT EXISTS {}();", quoted_table));
                }
                Action::Removed => self.generate_table_removal(table, table_plan),
                Action::Renamed { old_name } => {
                    let old_schema_name = table.schema_name_down();
                    if old_schema_name != schema_name {
                        table_plan.table.up.push(format!(
                            "CREATE SCHEMA IF NOT EXISTS {};",
                            quote_identifier(schema_name)
                        ));
                        table_plan.table.up.push(format!(
                            "ALTER TABLE {} SET SCHEMA {};",
                            qualified(old_schema_name, old_name),
                            quote_identifier(schema_name)
                        ));
                    }
                    if old_name != &table.name {
                        table_plan.table.up.push(format!(
                            "ALTER TABLE {} RENAME TO {};",
                            qualified(schema_name, old_name),
                            quote_identifier(&table.name)
                        ));
                    }
                }
                Action::Changed | Action::Unchanged => {}
            }
        }

        self.generate_view(table, plan);

        if !table.action.is_removed() {
            for column in table.columns.values() {
                self.generate_column(schema_name, &table.name, column, plan);
            }
            for constraint in table.constraints.values() {
                self.generate_constraint(schema_name, &table.name, constraint, plan);
            }
        }

        self.generate_table_extensions(table, plan);
    }

    fn generate_table_removal(&self, table: &TableDelta, table_plan: &mut TableSqlPlan) {
        let quoted_table = qualified(&table.schema_name, &table.name);
        if !self.is_rename_instead_of_drop() {
            table_plan
                .table
                .down
                .push(format!("DROP TABLE IF EXISTS {};", quoted_table));
        } else if !is_deleted_name(&table.name) {
            table_plan.table.down.push(format!(
                "ALTER TABLE {} RENAME TO {};",
                quoted_table,
                quote_identifier(&deleted_name(&table.name))
            ));
        }
    }

    /// テーブル拡張の呼び出し
    fn generate_table_extensions(&self, table: &TableDelta, plan: &mut MigrationSqlPlan) {
        let context = TableExtensionContext {
            schema_name: &table.schema_name,
            table_name_down: table.name_down(),
            table_name: &table.name,
            table_action: &table.action,
        };

        for extension in table.extensions.values() {
            let Some(additional) = self.extensions.run_table(extension, &context) else {
                continue;
            };
            plan.table_mut(&table.schema_name, &table.name)
                .table
                .extend(additional.table);
            plan.crud.extend(additional.crud);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::adapters::extension_registry::AdditionalStatements;
    use crate::adapters::sql_generator::StatementBundle;
    use crate::core::delta::ExtensionDelta;
    use serde_json::json;
    use std::collections::BTreeMap;

    fn table_delta(action: Action) -> TableDelta {
        TableDelta {
            name: "User".to_string(),
            schema_name: "app".to_string(),
            action,
            ..Default::default()
        }
    }

    fn generate(delta: DbDelta, options: CompilerOptions) -> MigrationSqlPlan {
        let registry = ExtensionRegistry::new();
        PostgresSqlGenerator::new(&options, &registry).generate(&delta)
    }

    fn single_table(table: TableDelta) -> DbDelta {
        let mut tables = BTreeMap::new();
        tables.insert(table.name.clone(), table);
        let mut delta = DbDelta::new();
        delta.schemas.insert(
            "app".to_string(),
            SchemaDelta {
                name: "app".to_string(),
                action: Action::Changed,
                tables,
            },
        );
        delta
    }

    // ==========================================
    // テーブル
    // ==========================================

    #[test]
    fn test_added_table() {
        let plan = generate(
            single_table(table_delta(Action::Added)),
            CompilerOptions::default(),
        );
        let table = &plan.schemas["app"].tables["User"];

        assert_eq!(
            table.table.up,
            vec![
                r#"CREATE SCHEMA IF NOT EXISTS "app";"#.to_string(),
                r#"CREATE TABLE IF NOT EXISTS "app"."User"();"#.to_string(),
            ]
        );
        assert!(table.table.down.is_empty());
    }

    #[test]
    fn test_removed_table_soft_rename() {
        let plan = generate(
            single_table(table_delta(Action::Removed)),
            CompilerOptions::default(),
        );
        assert_eq!(
            plan.schemas["app"].tables["User"].table.down,
            vec![r#"ALTER TABLE "app"."User" RENAME TO "_deleted:User";"#.to_string()]
        );
    }

    #[test]
    fn test_removed_table_already_prefixed_is_skipped() {
        let mut table = table_delta(Action::Removed);
        table.name = "_deleted:User".to_string();
        let plan = generate(single_table(table), CompilerOptions::default());

        assert!(plan.schemas["app"].tables["_deleted:User"]
            .table
            .is_empty());
    }

    #[test]
    fn test_removed_table_drop() {
        let plan = generate(
            single_table(table_delta(Action::Removed)),
            CompilerOptions::default().with_rename_instead_of_drop(false),
        );
        assert_eq!(
            plan.schemas["app"].tables["User"].table.down,
            vec![r#"DROP TABLE IF EXISTS "app"."User";"#.to_string()]
        );
    }

    #[test]
    fn test_renamed_table_across_schemas() {
        let mut table = table_delta(Action::Renamed {
            old_name: "Person".to_string(),
        });
        table.old_schema_name = Some("legacy".to_string());
        let plan = generate(single_table(table), CompilerOptions::default());

        assert_eq!(
            plan.schemas["app"].tables["User"].table.up,
            vec![
                r#"CREATE SCHEMA IF NOT EXISTS "app";"#.to_string(),
                r#"ALTER TABLE "legacy"."Person" SET SCHEMA "app";"#.to_string(),
                r#"ALTER TABLE "app"."Person" RENAME TO "User";"#.to_string(),
            ]
        );
    }

    // ==========================================
    // スキーマ
    // ==========================================

    #[test]
    fn test_schema_removal_and_rename() {
        let mut delta = DbDelta::new();
        delta.schemas.insert(
            "old".to_string(),
            SchemaDelta {
                name: "old".to_string(),
                action: Action::Removed,
                tables: BTreeMap::new(),
            },
        );
        delta.schemas.insert(
            "crm".to_string(),
            SchemaDelta {
                name: "crm".to_string(),
                action: Action::Renamed {
                    old_name: "sales".to_string(),
                },
                tables: BTreeMap::new(),
            },
        );

        let plan = generate(delta.clone(), CompilerOptions::default());
        assert_eq!(
            plan.schemas["old"].schema.down,
            vec![r#"ALTER SCHEMA "old" RENAME TO "_deleted:old";"#.to_string()]
        );
        assert_eq!(
            plan.schemas["crm"].schema.up,
            vec![r#"ALTER SCHEMA "sales" RENAME TO "crm";"#.to_string()]
        );

        let plan = generate(delta, CompilerOptions::default().with_rename_instead_of_drop(false));
        assert_eq!(
            plan.schemas["old"].schema.down,
            vec![r#"DROP SCHEMA IF EXISTS "old";"#.to_string()]
        );
    }

    #[test]
    fn test_public_schema_is_never_dropped() {
        let mut delta = DbDelta::new();
        delta.schemas.insert(
            "public".to_string(),
            SchemaDelta {
                name: "public".to_string(),
                action: Action::Removed,
                tables: BTreeMap::new(),
            },
        );

        for options in [
            CompilerOptions::default(),
            CompilerOptions::default().with_rename_instead_of_drop(false),
        ] {
            let plan = generate(delta.clone(), options);
            assert_eq!(plan.statement_count(), 0);
        }
    }

    // ==========================================
    // 拡張
    // ==========================================

    #[test]
    fn test_table_extension_statements_are_collected() {
        let mut table = table_delta(Action::Changed);
        table.extensions.insert(
            "audit".to_string(),
            ExtensionDelta {
                name: "audit".to_string(),
                action: Action::Added,
                from: None,
                to: Some(json!(true)),
            },
        );
        let registry = ExtensionRegistry::new().with_table_extension("audit", |_, ctx| {
            let mut table = StatementBundle::new();
            table.up.push(format!("SELECT audit_enable('{}');", ctx.table_name));
            let mut crud = StatementBundle::new();
            crud.up.push("INSERT INTO audit_log DEFAULT VALUES;".to_string());
            AdditionalStatements::new().with_table(table).with_crud(crud)
        });

        let plan = PostgresSqlGenerator::new(&CompilerOptions::default(), &registry)
            .generate(&single_table(table));

        assert_eq!(
            plan.schemas["app"].tables["User"].table.up,
            vec!["SELECT audit_enable('User');".to_string()]
        );
        assert_eq!(
            plan.crud.up,
            vec!["INSERT INTO audit_log DEFAULT VALUES;".to_string()]
        );
    }
}
