// リレーションの検証

use super::ValidationReport;
use crate::core::db_meta::{DbMeta, RelationNode, RelationSide, RelationType};
use crate::core::delta::DbDelta;
use crate::core::error::{ErrorLocation, MigrationError, MigrationWarning};

/// 目標ツリーのリレーションを検証
///
/// 構造エラーのあるリレーションは `rejected_relations` に入る。
/// 警告は差分に現れるリレーションだけに出す。
pub fn validate_relations(to: &DbMeta, delta: &DbDelta) -> ValidationReport {
    let mut report = ValidationReport::new();

    for (name, relation) in &to.relations {
        let errors = relation_errors(name, relation, to);
        if !errors.is_empty() {
            report.errors.extend(errors);
            report.rejected_relations.insert(name.clone());
            continue;
        }

        if !delta.relations.contains_key(name) {
            continue;
        }
        if relation.is_many_to_many() {
            report.warnings.push(MigrationWarning::many_to_many(
                format!(
                    "Relation '{}' is MANY:MANY without a join table. Create a join table instead",
                    name
                ),
                Some(ErrorLocation::with_relation(name)),
            ));
        } else if relation.is_one_to_one() {
            report.warnings.push(MigrationWarning::one_to_one(
                format!("Relation '{}' is ONE:ONE. Try to avoid one to one relations", name),
                Some(ErrorLocation::with_relation(name)),
            ));
        }
    }

    report
}

fn relation_errors(name: &str, relation: &RelationNode, to: &DbMeta) -> Vec<MigrationError> {
    if relation.sides.len() != 2 {
        return vec![MigrationError::MalformedRelation {
            message: format!(
                "relation '{}' must have exactly two sides, found {}",
                name,
                relation.sides.len()
            ),
            location: Some(ErrorLocation::with_relation(name)),
            suggestion: Some("Define both sides of the relation".to_string()),
        }];
    }

    let many_to_many = relation.is_many_to_many();
    let mut errors = Vec::new();
    for side in relation.sides.values() {
        errors.extend(side_errors(name, side, many_to_many, to));
    }
    errors
}

fn side_errors(
    name: &str,
    side: &RelationSide,
    many_to_many: bool,
    to: &DbMeta,
) -> Vec<MigrationError> {
    let mut errors = Vec::new();

    let owns_column = many_to_many || side.relation_type == RelationType::One;
    if owns_column && side.column_name.is_none() {
        errors.push(MigrationError::MalformedRelation {
            message: format!(
                "relation '{}' side '{}' has no owning column",
                name,
                side.key()
            ),
            location: Some(ErrorLocation::with_table(&side.schema_name, &side.table_name)),
            suggestion: Some("Specify columnName for the side".to_string()),
        });
    }

    if to.get_table(&side.schema_name, &side.table_name).is_none() {
        errors.push(MigrationError::UnresolvedReference {
            message: format!(
                "relation '{}' side table '{}' does not exist",
                name,
                side.key()
            ),
            location: Some(ErrorLocation::with_relation(name)),
            suggestion: Some(format!("Define table '{}'", side.key())),
        });
    }

    let reference = &side.reference;
    match to.get_table(&reference.schema_name, &reference.table_name) {
        None => errors.push(MigrationError::UnresolvedReference {
            message: format!(
                "relation '{}' references table '{}' which does not exist",
                name,
                reference.key()
            ),
            location: Some(ErrorLocation::with_relation(name)),
            suggestion: Some(format!("Define table '{}'", reference.key())),
        }),
        Some(table) => {
            if let Some(column_name) = &reference.column_name {
                if !table.columns.contains_key(column_name) {
                    errors.push(MigrationError::UnresolvedReference {
                        message: format!(
                            "relation '{}' references column '{}' which does not exist",
                            name, column_name
                        ),
                        location: Some(ErrorLocation::with_column(
                            &reference.schema_name,
                            &reference.table_name,
                            column_name,
                        )),
                        suggestion: Some(format!("Define column '{}'", column_name)),
                    });
                }
            }
        }
    }

    errors
}
