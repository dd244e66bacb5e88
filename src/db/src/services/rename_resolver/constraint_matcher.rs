// 制約の構造的な同一性判定
//
// テーブル名やカラム名のリネームに伴って名前だけが変わった制約を、
// 削除と追加ではなくリネームとして扱う。

use crate::core::db_meta::{ConstraintNode, TableNode};
use crate::core::delta::{Action, TableDelta};

use super::RenameResolverService;

impl RenameResolverService {
    /// 名前の置換規則で対応が取れる削除・追加の組をリネームに統合
    ///
    /// 置換規則は「旧テーブル名 -> 新テーブル名」と確定済みカラムリネーム。
    /// 旧制約名の最初の出現だけを置換する。
    pub(crate) fn match_constraints_structurally(
        &self,
        table: &mut TableDelta,
        from_table: &TableNode,
        column_renames: &[(String, String)],
    ) {
        let mut substitutions: Vec<(&str, &str)> = Vec::new();
        if from_table.name != table.name {
            substitutions.push((from_table.name.as_str(), table.name.as_str()));
        }
        substitutions.extend(
            column_renames
                .iter()
                .map(|(old, new)| (old.as_str(), new.as_str())),
        );

        let removed: Vec<ConstraintNode> = table
            .constraints
            .values()
            .filter(|c| c.action.is_removed())
            .filter_map(|c| c.from.clone())
            .collect();

        for from_constraint in removed {
            let expected_name = substitute_name(&from_constraint.name, &substitutions);
            let mapped = map_columns(&from_constraint, column_renames);

            let Some(added) = table.constraints.get_mut(&expected_name) else {
                continue;
            };
            let matches = added.action.is_added()
                && added.to.as_ref().is_some_and(|to| to.same_definition(&mapped));
            if !matches {
                continue;
            }

            added.action = Action::Renamed {
                old_name: from_constraint.name.clone(),
            };
            added.from = Some(from_constraint.clone());
            added.definition_changed = false;
            table.constraints.remove(&from_constraint.name);
        }

        // カラムリネームだけで説明できる変更は取り除く
        table.constraints.retain(|_, c| {
            if !c.action.is_changed() {
                return true;
            }
            match (&c.from, &c.to) {
                (Some(from), Some(to)) => !map_columns(from, column_renames).same_definition(to),
                _ => true,
            }
        });
    }
}

/// 置換規則を順に適用（各規則は最初の出現のみ）
fn substitute_name(name: &str, substitutions: &[(&str, &str)]) -> String {
    substitutions
        .iter()
        .fold(name.to_string(), |acc, (old, new)| acc.replacen(old, new, 1))
}

/// 対象カラムをリネーム後の名前に置き換えた制約
fn map_columns(constraint: &ConstraintNode, column_renames: &[(String, String)]) -> ConstraintNode {
    let columns = constraint
        .columns
        .iter()
        .map(|column| {
            column_renames
                .iter()
                .find(|(old, _)| old == column)
                .map_or_else(|| column.clone(), |(_, new)| new.clone())
        })
        .collect();
    ConstraintNode {
        columns,
        ..constraint.clone()
    }
}
