// 拡張ブロックの検証

use super::ValidationReport;
use crate::adapters::extension_registry::ExtensionRegistry;
use crate::core::db_meta::DbMeta;
use crate::core::error::{ErrorLocation, MigrationError};

/// 登録されていない拡張ブロックを検出
pub fn validate_directives(to: &DbMeta, extensions: &ExtensionRegistry) -> ValidationReport {
    let mut report = ValidationReport::new();

    for table in to.tables() {
        for name in table.extensions.keys() {
            if !extensions.has_table_extension(name) {
                report.errors.push(MigrationError::UnknownDirective {
                    message: format!("table extension '{}' has no registered handler", name),
                    location: Some(ErrorLocation::with_table(&table.schema_name, &table.name)),
                    suggestion: Some(format!("Register a table extension named '{}'", name)),
                });
            }
        }

        for column in table.columns.values() {
            for name in column.extensions.keys() {
                if !extensions.has_column_extension(name) {
                    report.errors.push(MigrationError::UnknownDirective {
                        message: format!("column extension '{}' has no registered handler", name),
                        location: Some(ErrorLocation::with_column(
                            &table.schema_name,
                            &table.name,
                            &column.name,
                        )),
                        suggestion: Some(format!("Register a column extension named '{}'", name)),
                    });
                }
            }
        }
    }

    report
}
