// ENUM差分検出

use crate::core::db_meta::DbMeta;
use crate::core::delta::{Action, DbDelta, EnumDelta};

use super::{union_keys, DeltaDetectorService};

impl DeltaDetectorService {
    /// ENUM型の差分を検出
    ///
    /// 値の並びが変わった場合のみ `Changed` とします。逆参照の変化は物理的な変更を伴いません。
    pub(crate) fn detect_enum_delta(&self, from: &DbMeta, to: &DbMeta, delta: &mut DbDelta) {
        for name in union_keys(&from.enums, &to.enums) {
            let (action, from_enum, to_enum) = match (from.enums.get(name), to.enums.get(name)) {
                (None, Some(t)) => (Action::Added, None, Some(t.clone())),
                (Some(f), None) => (Action::Removed, Some(f.clone()), None),
                (Some(f), Some(t)) if f.values != t.values => {
                    (Action::Changed, Some(f.clone()), Some(t.clone()))
                }
                _ => continue,
            };

            let from_columns = if from_enum.is_some() {
                from.enum_usages(name)
            } else {
                Vec::new()
            };
            let to_columns = if to_enum.is_some() {
                to.enum_usages(name)
            } else {
                Vec::new()
            };

            delta.enums.insert(
                name.clone(),
                EnumDelta {
                    name: name.clone(),
                    action,
                    from: from_enum,
                    to: to_enum,
                    from_columns,
                    to_columns,
                },
            );
        }
    }
}
