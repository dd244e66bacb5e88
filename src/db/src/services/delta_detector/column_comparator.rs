// カラム差分検出

use crate::core::db_meta::{ColumnNode, DefaultValue};
use crate::core::delta::{Action, ColumnDelta};
use std::collections::BTreeMap;

use super::DeltaDetectorService;

impl DeltaDetectorService {
    pub(crate) fn added_column(&self, column: &ColumnNode) -> ColumnDelta {
        ColumnDelta {
            name: column.name.clone(),
            action: Action::Added,
            from: None,
            to: Some(column.clone()),
            type_changed: true,
            default_action: default_action(None, column.default_value.as_ref()),
            extensions: self.compare_extensions(&BTreeMap::new(), &column.extensions),
        }
    }

    pub(crate) fn removed_column(&self, column: &ColumnNode) -> ColumnDelta {
        ColumnDelta {
            name: column.name.clone(),
            action: Action::Removed,
            from: Some(column.clone()),
            to: None,
            type_changed: false,
            default_action: Action::Unchanged,
            extensions: self.compare_extensions(&column.extensions, &BTreeMap::new()),
        }
    }

    /// 同名カラムを比較（リネームヒントは比較しない）
    pub(crate) fn compare_columns(&self, from: &ColumnNode, to: &ColumnNode) -> Option<ColumnDelta> {
        if from.without_hints() == to.without_hints() {
            return None;
        }
        Some(self.diff_column(from, to))
    }

    /// 2つのカラムの差分（アクションは `Changed`）
    pub(crate) fn diff_column(&self, from: &ColumnNode, to: &ColumnNode) -> ColumnDelta {
        ColumnDelta {
            name: to.name.clone(),
            action: Action::Changed,
            from: Some(from.clone()),
            to: Some(to.clone()),
            type_changed: from.kind != to.kind,
            default_action: default_action(from.default_value.as_ref(), to.default_value.as_ref()),
            extensions: self.compare_extensions(&from.extensions, &to.extensions),
        }
    }
}

fn default_action(from: Option<&DefaultValue>, to: Option<&DefaultValue>) -> Action {
    match (from, to) {
        (None, Some(_)) => Action::Added,
        (Some(_), None) => Action::Removed,
        (Some(f), Some(t)) if f != t => Action::Changed,
        _ => Action::Unchanged,
    }
}
