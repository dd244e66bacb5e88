// リレーションサイドの再接続
//
// スキーマ・テーブルのリネームにより `schema.table` キーが変わったサイドを、
// 削除と追加ではなく同一サイドのリネームとして扱う。
// リネームされたサイドは追加と同じ経路で外部キーとコメントを作り直す。

use crate::core::db_meta::RelationSide;
use crate::core::delta::{Action, RenameMap};

use super::ResolvedDelta;

impl super::RenameResolverService {
    pub(crate) fn link_relation_sides(&self, resolved: &mut ResolvedDelta) {
        let renames = &resolved.renames;
        if renames.schemas.is_empty() && renames.tables.is_empty() {
            return;
        }

        for relation in resolved.delta.relations.values_mut() {
            let removed: Vec<String> = relation
                .sides
                .values()
                .filter(|s| s.action.is_removed())
                .map(|s| s.key.clone())
                .collect();

            for old_key in removed {
                let Some(from) = relation.sides.get(&old_key).and_then(|s| s.from.clone()) else {
                    continue;
                };
                let new_key = follow_renames(&from, renames).key();
                let added = relation
                    .sides
                    .get(&new_key)
                    .is_some_and(|s| s.action.is_added());
                if new_key == old_key || !added {
                    continue;
                }

                relation.sides.remove(&old_key);
                if let Some(side) = relation.sides.get_mut(&new_key) {
                    side.action = Action::Renamed { old_name: old_key };
                    side.from = Some(from);
                }
            }
        }
    }
}

/// リネームを適用したサイド
fn follow_renames(side: &RelationSide, renames: &RenameMap) -> RelationSide {
    let mut side = side.clone();
    (side.schema_name, side.table_name) = renames.map_table(&side.schema_name, &side.table_name);
    (side.reference.schema_name, side.reference.table_name) =
        renames.map_table(&side.reference.schema_name, &side.reference.table_name);
    side
}
