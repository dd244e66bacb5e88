// 制約名の重複検証
//
// PostgreSQLでは制約・インデックス名がスキーマ単位の名前空間を共有する。
// 外部キー制約名（fk_<relation>）も同じ名前空間に含める。

use super::ValidationReport;
use crate::core::db_meta::{ConstraintKind, DbMeta, RelationType};
use crate::core::error::{ErrorLocation, MigrationError};
use crate::core::naming::foreign_key_name;
use std::collections::BTreeMap;

/// スキーマ内の制約名の重複を検証
pub fn validate_constraint_names(to: &DbMeta) -> ValidationReport {
    let mut report = ValidationReport::new();
    // スキーマ名 -> (制約名 -> 最初に定義したテーブル)
    let mut seen: BTreeMap<&str, BTreeMap<String, &str>> = BTreeMap::new();

    for table in to.tables() {
        let names = seen.entry(table.schema_name.as_str()).or_default();
        for constraint in table.constraints.values() {
            // NOT NULL は名前付きのオブジェクトにならない
            if constraint.kind == ConstraintKind::NotNull {
                continue;
            }
            register(
                names,
                constraint.name.clone(),
                &table.schema_name,
                &table.name,
                &mut report,
            );
        }
    }

    for relation in to.relations.values() {
        if relation.is_many_to_many() {
            continue;
        }
        for side in relation.sides.values() {
            if side.relation_type != RelationType::One {
                continue;
            }
            let names = seen.entry(side.schema_name.as_str()).or_default();
            register(
                names,
                foreign_key_name(&relation.name),
                &side.schema_name,
                &side.table_name,
                &mut report,
            );
        }
    }

    report
}

fn register<'a>(
    names: &mut BTreeMap<String, &'a str>,
    name: String,
    schema_name: &str,
    table_name: &'a str,
    report: &mut ValidationReport,
) {
    match names.get(&name) {
        Some(first_table) => report.errors.push(MigrationError::DuplicateConstraint {
            message: format!(
                "constraint name '{}' is used by both '{}' and '{}' in schema '{}'",
                name, first_table, table_name, schema_name
            ),
            location: Some(ErrorLocation::with_table(schema_name, table_name)),
            suggestion: Some("Rename one of the constraints".to_string()),
        }),
        None => {
            names.insert(name, table_name);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::db_meta::{ConstraintNode, SchemaNode, TableNode};

    #[test]
    fn test_duplicate_across_tables_in_schema() {
        let to = DbMeta::new().with_schema(
            SchemaNode::new("app")
                .with_table(
                    TableNode::new("app", "User")
                        .with_constraint(ConstraintNode::unique("email_key", ["email"])),
                )
                .with_table(
                    TableNode::new("app", "Admin")
                        .with_constraint(ConstraintNode::unique("email_key", ["email"])),
                ),
        );

        let report = validate_constraint_names(&to);

        assert_eq!(report.errors.len(), 1);
        assert!(report.errors[0].is_duplicate_constraint());
    }

    #[test]
    fn test_same_name_in_different_schemas_is_allowed() {
        let to = DbMeta::new()
            .with_schema(SchemaNode::new("app").with_table(
                TableNode::new("app", "User").with_constraint(ConstraintNode::primary_key("pk", ["id"])),
            ))
            .with_schema(SchemaNode::new("audit").with_table(
                TableNode::new("audit", "User").with_constraint(ConstraintNode::primary_key("pk", ["id"])),
            ));

        assert!(validate_constraint_names(&to).is_valid());
    }

    #[test]
    fn test_not_null_names_are_ignored() {
        let to = DbMeta::new().with_schema(
            SchemaNode::new("app")
                .with_table(TableNode::new("app", "User").with_constraint(ConstraintNode::not_null("nn", "id")))
                .with_table(TableNode::new("app", "Post").with_constraint(ConstraintNode::not_null("nn", "id"))),
        );

        assert!(validate_constraint_names(&to).is_valid());
    }
}
