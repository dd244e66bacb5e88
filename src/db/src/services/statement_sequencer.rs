// 文の順序付けサービス
//
// ノードごとの up / down 文を依存関係を満たす1本のリストに平坦化する。
// 同一テキストの文は最初の1回だけ残す。

use crate::adapters::sql_generator::{MigrationSqlPlan, StatementBundle, TableSqlPlan};
use std::collections::HashSet;
use tracing::debug;

/// 文の順序付けサービス
#[derive(Debug, Clone)]
pub struct StatementSequencerService {}

impl StatementSequencerService {
    /// 新しいStatementSequencerServiceを作成
    pub fn new() -> Self {
        Self {}
    }

    /// 実行順に並べた文のリストを返す
    ///
    /// 1. スキーマのリネーム
    /// 2. ビューの削除
    /// 3. ENUM型（down → up）
    /// 4. スキーマごとに各テーブル
    /// 5. ビューの作成
    /// 6. まだ出力していないリレーションの撤去
    /// 7. リレーションの作成
    /// 8. スキーマの削除
    /// 9. CRUD文（down → up）
    ///
    /// # Arguments
    ///
    /// * `plan` - ノード単位のSQL
    /// * `seed` - 呼び出し側が追加する文（CRUD文の最後に置く）
    pub fn sequence(&self, plan: &MigrationSqlPlan, seed: &[String]) -> Vec<String> {
        let mut output = StatementList::default();

        for schema in plan.schemas.values() {
            output.extend(&schema.schema.up);
        }

        // ENUMカラムの型変更はビューが残っていると失敗する
        for view in plan.schemas.values().flat_map(|schema| schema.views.values()) {
            output.extend(&view.down);
        }

        output.extend(&plan.enums.down);
        output.extend(&plan.enums.up);

        let mut relations_dropped = false;
        for table in plan.schemas.values().flat_map(|schema| schema.tables.values()) {
            output.extend(&table.table.up);

            // テーブル構造を変える前に外部キーをすべて外す
            if !relations_dropped {
                for relation in plan.relations.values() {
                    output.extend(&relation.down);
                }
                relations_dropped = true;
            }

            self.sequence_table_body(table, &mut output);
            output.extend(&table.table.down);
        }

        for view in plan.schemas.values().flat_map(|schema| schema.views.values()) {
            output.extend(&view.up);
        }

        if !relations_dropped {
            for relation in plan.relations.values() {
                output.extend(&relation.down);
            }
        }

        for relation in plan.relations.values() {
            output.extend(&relation.up);
        }

        for schema in plan.schemas.values() {
            output.extend(&schema.schema.down);
        }

        output.extend(&plan.crud.down);
        output.extend(&plan.crud.up);
        output.extend(seed);

        debug!(
            statements = output.statements.len(),
            duplicates = output.duplicates,
            "Sequenced statements"
        );

        output.statements
    }

    /// テーブル内: 制約の撤去（逆順）、カラム、制約の作成
    fn sequence_table_body(&self, table: &TableSqlPlan, output: &mut StatementList) {
        output.extend_reversed(&table.constraints.down);

        for column in table.columns.values() {
            self.sequence_column(column, output);
        }

        output.extend(&table.constraints.up);
    }

    fn sequence_column(&self, column: &StatementBundle, output: &mut StatementList) {
        output.extend(&column.up);
        output.extend_reversed(&column.down);
    }
}

impl Default for StatementSequencerService {
    fn default() -> Self {
        Self::new()
    }
}

/// 重複を除きながら文を積むリスト
#[derive(Debug, Default)]
struct StatementList {
    statements: Vec<String>,
    seen: HashSet<String>,
    duplicates: usize,
}

impl StatementList {
    fn push(&mut self, statement: &str) {
        if self.seen.insert(statement.to_string()) {
            self.statements.push(statement.to_string());
        } else {
            self.duplicates += 1;
        }
    }

    fn extend<'s>(&mut self, statements: impl IntoIterator<Item = &'s String>) {
        for statement in statements {
            self.push(statement);
        }
    }

    fn extend_reversed(&mut self, statements: &[String]) {
        self.extend(statements.iter().rev());
    }
}
