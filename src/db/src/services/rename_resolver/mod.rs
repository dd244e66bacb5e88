// リネーム解決サービス
//
// 差分ツリー上の「削除 + 追加」の組のうち、追加側が旧名ヒントを持ち
// 同じ階層に旧名の削除ノードが存在するものを1つのリネームに統合する。
// スキーマ、テーブル、カラム、制約の各階層に同じ規則を適用する。

mod constraint_matcher;
mod relation_linker;

use crate::core::db_meta::{DbMeta, TableNode};
use crate::core::delta::{
    Action, ColumnRename, DbDelta, RenameMap, SchemaDelta, TableDelta, TableRename,
};
use crate::core::error::{ErrorLocation, MigrationWarning};
use crate::services::delta_detector::DeltaDetectorService;
use std::collections::BTreeMap;
use tracing::debug;

/// リネーム解決の結果
#[derive(Debug, Clone, Default)]
pub struct ResolvedDelta {
    /// 解決済みの差分ツリー
    pub delta: DbDelta,
    /// 確定したスキーマ・テーブル・カラムのリネーム
    pub renames: RenameMap,
    /// 確認できなかったヒントなどの警告
    pub warnings: Vec<MigrationWarning>,
}

/// リネーム解決サービス
#[derive(Debug, Clone)]
pub struct RenameResolverService {
    detector: DeltaDetectorService,
}

impl RenameResolverService {
    /// 新しいRenameResolverServiceを作成
    pub fn new() -> Self {
        Self {
            detector: DeltaDetectorService::new(),
        }
    }

    /// 差分ツリーのリネームを解決
    ///
    /// # Arguments
    ///
    /// * `delta` - 差分検出サービスの出力
    /// * `from` - 削除ノードの内容を参照するための変更前ツリー
    /// * `to` - 旧名ヒントを参照するための変更後ツリー
    pub fn resolve(&self, delta: DbDelta, from: &DbMeta, to: &DbMeta) -> ResolvedDelta {
        let mut resolved = ResolvedDelta {
            delta,
            ..Default::default()
        };

        self.resolve_schema_renames(&mut resolved, from, to);
        self.resolve_table_renames(&mut resolved, from, to);
        self.resolve_nested_renames(&mut resolved, from, to);
        self.link_relation_sides(&mut resolved);
        prune_unchanged(&mut resolved.delta);

        debug!(
            schema_renames = resolved.renames.schemas.len(),
            table_renames = resolved.renames.tables.len(),
            column_renames = resolved.renames.columns.len(),
            warnings = resolved.warnings.len(),
            "Resolved renames"
        );

        resolved
    }

    fn resolve_schema_renames(&self, resolved: &mut ResolvedDelta, from: &DbMeta, to: &DbMeta) {
        let candidates: Vec<(String, String)> = resolved
            .delta
            .schemas
            .values()
            .filter(|s| s.action.is_added())
            .filter_map(|s| {
                let old_name = to.schemas.get(&s.name)?.old_name.clone()?;
                Some((s.name.clone(), old_name))
            })
            .collect();

        for (name, old_name) in candidates {
            let confirmed = resolved
                .delta
                .schemas
                .get(&old_name)
                .is_some_and(|s| s.action.is_removed());
            let (Some(from_schema), Some(to_schema), true) =
                (from.schemas.get(&old_name), to.schemas.get(&name), confirmed)
            else {
                resolved.warnings.push(MigrationWarning::rename_hint_ignored(
                    format!(
                        "Schema '{}' declares old name '{}', but no such schema is being removed; treating it as new",
                        name, old_name
                    ),
                    Some(ErrorLocation {
                        schema: Some(name.clone()),
                        ..Default::default()
                    }),
                ));
                continue;
            };

            debug!(old = %old_name, new = %name, "Confirmed schema rename");
            let mut tables = self.detector.compare_schema_tables(from_schema, to_schema);
            // リネーム後のスキーマ上で操作する
            for table in tables.values_mut() {
                table.schema_name = name.clone();
            }
            resolved.delta.schemas.remove(&old_name);
            resolved.renames.schemas.insert(old_name.clone(), name.clone());
            resolved.delta.schemas.insert(
                name.clone(),
                SchemaDelta {
                    name: name.clone(),
                    action: Action::Renamed { old_name },
                    tables,
                },
            );
        }
    }

    fn resolve_table_renames(&self, resolved: &mut ResolvedDelta, from: &DbMeta, to: &DbMeta) {
        let schema_renames = schema_renames(&resolved.delta);
        let candidates: Vec<&TableNode> = resolved
            .delta
            .tables()
            .filter(|t| t.action.is_added())
            .filter_map(|t| to.get_table(&t.schema_name, &t.name))
            .filter(|t| t.old_name.is_some() || t.old_schema_name.is_some())
            .collect();

        let mut confirmed_renames = Vec::new();
        for to_table in candidates {
            let old_name = to_table.old_name.clone().unwrap_or_else(|| to_table.name.clone());
            // from側のスキーマ名と差分ツリー上のスキーマ名
            let (from_schema_name, delta_schema_name) = match &to_table.old_schema_name {
                Some(old_schema) => (
                    old_schema.clone(),
                    schema_renames
                        .iter()
                        .find(|(_, old)| *old == old_schema)
                        .map_or_else(|| old_schema.clone(), |(new, _)| new.clone()),
                ),
                None => (
                    schema_renames
                        .get(&to_table.schema_name)
                        .cloned()
                        .unwrap_or_else(|| to_table.schema_name.clone()),
                    to_table.schema_name.clone(),
                ),
            };

            let removed = resolved
                .delta
                .get_table(&delta_schema_name, &old_name)
                .is_some_and(|t| t.action.is_removed());
            match from.get_table(&from_schema_name, &old_name) {
                Some(from_table) if removed => {
                    confirmed_renames.push((from_table, to_table, delta_schema_name));
                }
                _ => resolved.warnings.push(MigrationWarning::rename_hint_ignored(
                    format!(
                        "Table '{}' declares old name '{}.{}', but no such table is being removed; treating it as new",
                        to_table.name, from_schema_name, old_name
                    ),
                    Some(ErrorLocation::with_table(&to_table.schema_name, &to_table.name)),
                )),
            }
        }

        for (from_table, to_table, delta_schema_name) in confirmed_renames {
            debug!(
                old = %from_table.key(),
                new = %to_table.key(),
                "Confirmed table rename"
            );

            if let Some(old_schema) = resolved.delta.schemas.get_mut(&delta_schema_name) {
                old_schema.tables.remove(&from_table.name);
            }

            let mut table_delta = self.detector.diff_table(from_table, to_table);
            table_delta.action = Action::Renamed {
                old_name: from_table.name.clone(),
            };
            if delta_schema_name != to_table.schema_name {
                table_delta.old_schema_name = Some(delta_schema_name.clone());
            }

            if let Some(schema) = resolved.delta.schemas.get_mut(&to_table.schema_name) {
                schema.tables.insert(to_table.name.clone(), table_delta);
            }

            resolved.renames.tables.push(TableRename {
                old_schema_name: delta_schema_name,
                old_name: from_table.name.clone(),
                schema_name: to_table.schema_name.clone(),
                name: to_table.name.clone(),
            });
        }
    }

    /// 既存テーブル（変更・リネーム）内のカラムと制約のリネームを解決
    fn resolve_nested_renames(&self, resolved: &mut ResolvedDelta, from: &DbMeta, to: &DbMeta) {
        let schema_renames = schema_renames(&resolved.delta);
        let mut warnings = Vec::new();
        let mut column_renames = Vec::new();

        for table in resolved
            .delta
            .schemas
            .values_mut()
            .flat_map(|schema| schema.tables.values_mut())
        {
            if !(table.action.is_changed() || table.action.is_renamed()) {
                continue;
            }
            let schema_name_down = table.schema_name_down();
            let from_schema_name = schema_renames
                .get(schema_name_down)
                .map_or(schema_name_down, String::as_str)
                .to_string();
            let (Some(from_table), Some(to_table)) = (
                from.get_table(&from_schema_name, table.name_down()),
                to.get_table(&table.schema_name, &table.name),
            ) else {
                continue;
            };

            let renamed_columns =
                self.resolve_column_renames(table, from_table, to_table, &mut warnings);
            self.resolve_constraint_hints(table, from_table, to_table, &mut warnings);
            self.match_constraints_structurally(table, from_table, &renamed_columns);

            column_renames.extend(renamed_columns.into_iter().map(|(old_name, name)| {
                ColumnRename {
                    schema_name: table.schema_name.clone(),
                    table_name: table.name.clone(),
                    old_name,
                    name,
                }
            }));
        }

        resolved.warnings.extend(warnings);
        resolved.renames.columns.extend(column_renames);
    }

    /// カラムのリネームを解決し、確定した (旧名, 新名) の組を返す
    fn resolve_column_renames(
        &self,
        table: &mut TableDelta,
        from_table: &TableNode,
        to_table: &TableNode,
        warnings: &mut Vec<MigrationWarning>,
    ) -> Vec<(String, String)> {
        let candidates: Vec<(String, String)> = table
            .columns
            .values()
            .filter(|c| c.action.is_added())
            .filter_map(|c| {
                let old_name = to_table.columns.get(&c.name)?.old_name.clone()?;
                Some((c.name.clone(), old_name))
            })
            .collect();

        let mut renames = Vec::new();
        for (name, old_name) in candidates {
            let removed = table
                .columns
                .get(&old_name)
                .is_some_and(|c| c.action.is_removed());
            let (Some(from_column), Some(to_column), true) = (
                from_table.columns.get(&old_name),
                to_table.columns.get(&name),
                removed,
            ) else {
                warnings.push(MigrationWarning::rename_hint_ignored(
                    format!(
                        "Column '{}' declares old name '{}', but no such column is being removed; treating it as new",
                        name, old_name
                    ),
                    Some(ErrorLocation::with_column(&table.schema_name, &table.name, &name)),
                ));
                continue;
            };

            let mut column_delta = self.detector.diff_column(from_column, to_column);
            column_delta.action = Action::Renamed {
                old_name: old_name.clone(),
            };
            table.columns.remove(&old_name);
            table.columns.insert(name.clone(), column_delta);
            renames.push((old_name, name));
        }

        renames
    }

    /// 旧名ヒントによる制約のリネームを解決
    fn resolve_constraint_hints(
        &self,
        table: &mut TableDelta,
        from_table: &TableNode,
        to_table: &TableNode,
        warnings: &mut Vec<MigrationWarning>,
    ) {
        let candidates: Vec<(String, String)> = table
            .constraints
            .values()
            .filter(|c| c.action.is_added())
            .filter_map(|c| {
                let old_name = to_table.constraints.get(&c.name)?.old_name.clone()?;
                Some((c.name.clone(), old_name))
            })
            .collect();

        for (name, old_name) in candidates {
            let removed = table
                .constraints
                .get(&old_name)
                .is_some_and(|c| c.action.is_removed());
            let (Some(from_constraint), Some(to_constraint), true) = (
                from_table.constraints.get(&old_name),
                to_table.constraints.get(&name),
                removed,
            ) else {
                warnings.push(MigrationWarning::rename_hint_ignored(
                    format!(
                        "Constraint '{}' declares old name '{}', but no such constraint is being removed; treating it as new",
                        name, old_name
                    ),
                    Some(ErrorLocation::with_table(&table.schema_name, &table.name)),
                ));
                continue;
            };

            let mut constraint_delta = self.detector.diff_constraint(from_constraint, to_constraint);
            constraint_delta.action = Action::Renamed {
                old_name: old_name.clone(),
            };
            table.constraints.remove(&old_name);
            table.constraints.insert(name, constraint_delta);
        }
    }
}

impl Default for RenameResolverService {
    fn default() -> Self {
        Self::new()
    }
}

/// 確定済みスキーマリネーム（新名 -> 旧名）
fn schema_renames(delta: &DbDelta) -> BTreeMap<String, String> {
    delta
        .schemas
        .values()
        .filter_map(|s| Some((s.name.clone(), s.action.old_name()?.to_string())))
        .collect()
}

/// 子ノードを失ったコンテナを取り除く
fn prune_unchanged(delta: &mut DbDelta) {
    for schema in delta.schemas.values_mut() {
        schema
            .tables
            .retain(|_, t| !(t.action.is_changed() && t.has_no_children()));
    }
    delta
        .schemas
        .retain(|_, s| !(s.action.is_changed() && s.tables.is_empty()));
    delta
        .relations
        .retain(|_, r| !(r.action.is_changed() && r.sides.is_empty()));
}
