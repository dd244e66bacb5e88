// リレーション差分検出

use crate::core::db_meta::{DbMeta, RelationNode};
use crate::core::delta::{Action, DbDelta, RelationDelta, RelationSideDelta};
use std::collections::BTreeMap;

use super::{union_keys, DeltaDetectorService};

impl DeltaDetectorService {
    /// リレーションの差分をサイド単位で検出
    pub(crate) fn detect_relation_delta(&self, from: &DbMeta, to: &DbMeta, delta: &mut DbDelta) {
        for name in union_keys(&from.relations, &to.relations) {
            let from_relation = from.relations.get(name);
            let to_relation = to.relations.get(name);

            let action = match (from_relation, to_relation) {
                (None, Some(_)) => Action::Added,
                (Some(_), None) => Action::Removed,
                (Some(f), Some(t)) if f != t => Action::Changed,
                _ => continue,
            };

            let sides = self.compare_relation_sides(from_relation, to_relation);
            if sides.is_empty() {
                continue;
            }

            delta.relations.insert(
                name.clone(),
                RelationDelta {
                    name: name.clone(),
                    action,
                    from: from_relation.cloned(),
                    to: to_relation.cloned(),
                    sides,
                },
            );
        }
    }

    fn compare_relation_sides(
        &self,
        from: Option<&RelationNode>,
        to: Option<&RelationNode>,
    ) -> BTreeMap<String, RelationSideDelta> {
        let empty = BTreeMap::new();
        let from_sides = from.map_or(&empty, |r| &r.sides);
        let to_sides = to.map_or(&empty, |r| &r.sides);

        let mut sides = BTreeMap::new();
        for key in union_keys(from_sides, to_sides) {
            let action = match (from_sides.get(key), to_sides.get(key)) {
                (None, Some(_)) => Action::Added,
                (Some(_), None) => Action::Removed,
                (Some(f), Some(t)) if f != t => Action::Changed,
                _ => continue,
            };
            sides.insert(
                key.clone(),
                RelationSideDelta {
                    key: key.clone(),
                    action,
                    from: from_sides.get(key).cloned(),
                    to: to_sides.get(key).cloned(),
                },
            );
        }
        sides
    }
}
