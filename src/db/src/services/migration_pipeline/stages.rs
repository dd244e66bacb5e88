// パイプラインの各ステージ

use super::{MigrationPipeline, PipelineStageError};
use crate::adapters::sql_generator::{MigrationSqlPlan, PostgresSqlGenerator};
use crate::core::db_meta::DbMeta;
use crate::core::delta::DbDelta;
use crate::services::delta_detector::DeltaDetectorService;
use crate::services::meta_validator::{MetaValidatorService, ValidationReport};
use crate::services::rename_resolver::{RenameResolverService, ResolvedDelta};
use crate::services::statement_sequencer::StatementSequencerService;
use tracing::debug;

impl MigrationPipeline<'_> {
    /// ステージ1: オプションを検証し、除外スキーマを取り除いたツリーを返す
    pub(super) fn stage_prepare(&self) -> Result<(DbMeta, DbMeta), PipelineStageError> {
        let views = &self.options.views;
        if views.enabled && views.name_prefix.is_empty() {
            return Err(PipelineStageError {
                stage: "prepare".to_string(),
                message: "View name prefix must not be empty while views are enabled".to_string(),
            });
        }
        if views.enabled && views.admin_check.trim().is_empty() {
            return Err(PipelineStageError {
                stage: "prepare".to_string(),
                message: "View admin check must not be empty while views are enabled".to_string(),
            });
        }

        let ignored = &self.options.ignored_schemas;
        if !ignored.is_empty() {
            debug!(ignored = ?ignored, "Stripping ignored schemas");
        }
        Ok((
            self.from.without_schemas(ignored),
            self.to.without_schemas(ignored),
        ))
    }

    /// ステージ2: 差分ツリーを検出
    pub(super) fn stage_diff(&self, from: &DbMeta, to: &DbMeta) -> DbDelta {
        DeltaDetectorService::new().detect_delta(from, to)
    }

    /// ステージ3: リネームを解決
    pub(super) fn stage_resolve(&self, delta: DbDelta, from: &DbMeta, to: &DbMeta) -> ResolvedDelta {
        RenameResolverService::new().resolve(delta, from, to)
    }

    /// ステージ4: 検証し、不正なリレーションを差分から除外
    pub(super) fn stage_validate(
        &self,
        mut resolved: ResolvedDelta,
        from: &DbMeta,
        to: &DbMeta,
    ) -> (ResolvedDelta, ValidationReport) {
        let report = MetaValidatorService::new()
            .with_extensions(&self.extensions)
            .validate(from, to, &resolved.delta);
        report.strip_rejected(&mut resolved.delta);
        (resolved, report)
    }

    /// ステージ5: ノードごとのSQLを生成
    pub(super) fn stage_emit(&self, resolved: &ResolvedDelta) -> Result<MigrationSqlPlan, PipelineStageError> {
        let plan = PostgresSqlGenerator::new(&self.options, &self.extensions)
            .with_renames(&resolved.renames)
            .generate(&resolved.delta);

        if let Some(statement) = plan_statements(&plan).find(|s| s.trim().is_empty()) {
            return Err(PipelineStageError {
                stage: "emit".to_string(),
                message: format!("Generated an empty statement: {:?}", statement),
            });
        }

        Ok(plan)
    }

    /// ステージ6: 順序付けと重複排除
    pub(super) fn stage_sequence(&self, plan: &MigrationSqlPlan) -> Result<Vec<String>, PipelineStageError> {
        let commands = StatementSequencerService::new().sequence(plan, &self.seed);

        // 生成された文はすべて順序付け後にも残っていなければならない
        let expected = plan_statements(plan)
            .chain(self.seed.iter())
            .collect::<std::collections::HashSet<_>>()
            .len();
        if commands.len() != expected {
            return Err(PipelineStageError {
                stage: "sequence".to_string(),
                message: format!(
                    "Sequenced {} statements but {} distinct statements were generated",
                    commands.len(),
                    expected
                ),
            });
        }

        Ok(commands)
    }
}

/// プラン内の全文（順序は問わない）
fn plan_statements(plan: &MigrationSqlPlan) -> impl Iterator<Item = &String> {
    let bundles = std::iter::once(&plan.enums)
        .chain(std::iter::once(&plan.crud))
        .chain(plan.relations.values())
        .chain(plan.schemas.values().flat_map(|schema| {
            std::iter::once(&schema.schema)
                .chain(schema.views.values())
                .chain(schema.tables.values().flat_map(|table| {
                    std::iter::once(&table.table)
                        .chain(std::iter::once(&table.constraints))
                        .chain(table.columns.values())
                }))
        }));
    bundles.flat_map(|bundle| bundle.up.iter().chain(bundle.down.iter()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::adapters::sql_generator::StatementBundle;

    #[test]
    fn test_plan_statements_covers_every_bundle() {
        let mut plan = MigrationSqlPlan::default();
        plan.enums.up.push("a".to_string());
        plan.crud.down.push("b".to_string());
        plan.relations.insert(
            "r".to_string(),
            StatementBundle {
                up: vec!["c".to_string()],
                down: Vec::new(),
            },
        );
        let table = plan.table_mut("app", "User");
        table.constraints.down.push("d".to_string());
        table
            .columns
            .entry("id".to_string())
            .or_default()
            .up
            .push("e".to_string());
        plan.schema_mut("app")
            .views
            .entry("User".to_string())
            .or_default()
            .up
            .push("f".to_string());

        let mut statements: Vec<&String> = plan_statements(&plan).collect();
        statements.sort();
        assert_eq!(statements, ["a", "b", "c", "d", "e", "f"]);
    }
}
