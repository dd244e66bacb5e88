// マイグレーションパイプラインサービス
//
// 2つのメタデータツリーから実行順のSQL文リストを計算する共通パイプライン。
// 各ステージはメソッドとして stages.rs に置く。

mod stages;

use crate::adapters::extension_registry::ExtensionRegistry;
use crate::core::config::CompilerOptions;
use crate::core::db_meta::DbMeta;
use crate::core::delta::DeltaSummary;
use crate::core::migration::MigrationResult;
use tracing::info;

/// パイプラインステージでのエラー
#[derive(Debug, Clone)]
pub struct PipelineStageError {
    /// エラーが発生したステージ名
    pub stage: String,
    /// エラーメッセージ
    pub message: String,
}

impl std::fmt::Display for PipelineStageError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "[{}] {}", self.stage, self.message)
    }
}

impl std::error::Error for PipelineStageError {}

/// パイプラインの出力
#[derive(Debug, Clone, PartialEq)]
pub struct CompiledMigration {
    /// SQL文・エラー・警告
    pub result: MigrationResult,
    /// 解決済み差分の件数
    pub summary: DeltaSummary,
}

/// マイグレーション計算パイプライン
///
/// パイプラインは以下のステージで構成される:
/// 1. prepare - オプション検証、除外スキーマの除去
/// 2. diff - 差分ツリーの検出
/// 3. resolve - リネームの解決
/// 4. validate - 構造エラーとポリシー警告の収集、不正なリレーションの除外
/// 5. emit - ノードごとの up / down 文の生成
/// 6. sequence - 順序付けと重複排除
pub struct MigrationPipeline<'a> {
    from: &'a DbMeta,
    to: &'a DbMeta,
    options: CompilerOptions,
    extensions: ExtensionRegistry,
    seed: Vec<String>,
}

impl<'a> MigrationPipeline<'a> {
    /// 新しいパイプラインを作成
    ///
    /// # Arguments
    ///
    /// * `from` - 現在デプロイ済みとみなすツリー
    /// * `to` - 目標のツリー
    pub fn new(from: &'a DbMeta, to: &'a DbMeta) -> Self {
        Self {
            from,
            to,
            options: CompilerOptions::default(),
            extensions: ExtensionRegistry::new(),
            seed: Vec::new(),
        }
    }

    /// 計算オプションを設定
    pub fn with_options(mut self, options: CompilerOptions) -> Self {
        self.options = options;
        self
    }

    /// 拡張レジストリを設定
    pub fn with_extensions(mut self, extensions: ExtensionRegistry) -> Self {
        self.extensions = extensions;
        self
    }

    /// 最後に実行する追加の文を設定
    pub fn with_seed<I, S>(mut self, statements: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.seed = statements.into_iter().map(Into::into).collect();
        self
    }

    /// マイグレーションを計算
    pub fn compile(&self) -> Result<MigrationResult, PipelineStageError> {
        self.compile_with_summary().map(|compiled| compiled.result)
    }

    /// マイグレーションを計算（差分の件数付き）
    pub fn compile_with_summary(&self) -> Result<CompiledMigration, PipelineStageError> {
        // ステージ1: prepare
        let (from, to) = self.stage_prepare()?;

        // ステージ2: diff
        let delta = self.stage_diff(&from, &to);

        // ステージ3: resolve
        let resolved = self.stage_resolve(delta, &from, &to);

        // ステージ4: validate
        let (resolved, report) = self.stage_validate(resolved, &from, &to);

        // ステージ5: emit
        let plan = self.stage_emit(&resolved)?;

        // ステージ6: sequence
        let commands = self.stage_sequence(&plan)?;

        let mut result = MigrationResult::new();
        result.commands = commands;
        result.errors = report.errors;
        result.warnings = resolved.warnings;
        result.warnings.extend(report.warnings);

        info!(
            commands = result.commands.len(),
            errors = result.errors.len(),
            warnings = result.warnings.len(),
            "Compiled migration"
        );

        Ok(CompiledMigration {
            summary: resolved.delta.summary(),
            result,
        })
    }
}
