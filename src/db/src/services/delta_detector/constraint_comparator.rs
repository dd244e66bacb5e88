// 制約差分検出

use crate::core::db_meta::{ConstraintKind, ConstraintNode};
use crate::core::delta::{Action, ConstraintDelta};

use super::DeltaDetectorService;

impl DeltaDetectorService {
    pub(crate) fn added_constraint(&self, constraint: &ConstraintNode) -> ConstraintDelta {
        ConstraintDelta {
            name: constraint.name.clone(),
            action: Action::Added,
            from: None,
            to: Some(constraint.clone()),
            definition_changed: true,
            condition_action: condition_action(None, constraint.condition()),
        }
    }

    pub(crate) fn removed_constraint(&self, constraint: &ConstraintNode) -> ConstraintDelta {
        ConstraintDelta {
            name: constraint.name.clone(),
            action: Action::Removed,
            from: Some(constraint.clone()),
            to: None,
            definition_changed: true,
            condition_action: condition_action(constraint.condition(), None),
        }
    }

    /// 同名制約を比較（リネームヒントは比較しない）
    pub(crate) fn compare_constraints(
        &self,
        from: &ConstraintNode,
        to: &ConstraintNode,
    ) -> Option<ConstraintDelta> {
        if from.without_hints() == to.without_hints() {
            return None;
        }
        Some(self.diff_constraint(from, to))
    }

    /// 2つの制約の差分（アクションは `Changed`）
    pub(crate) fn diff_constraint(&self, from: &ConstraintNode, to: &ConstraintNode) -> ConstraintDelta {
        ConstraintDelta {
            name: to.name.clone(),
            action: Action::Changed,
            from: Some(from.clone()),
            to: Some(to.clone()),
            definition_changed: kind_without_condition(&from.kind)
                != kind_without_condition(&to.kind)
                || from.columns != to.columns,
            condition_action: condition_action(from.condition(), to.condition()),
        }
    }
}

/// 部分条件を取り除いた制約種別
fn kind_without_condition(kind: &ConstraintKind) -> ConstraintKind {
    match kind {
        ConstraintKind::Unique { .. } => ConstraintKind::Unique { condition: None },
        other => other.clone(),
    }
}

fn condition_action(from: Option<&str>, to: Option<&str>) -> Action {
    match (from, to) {
        (None, Some(_)) => Action::Added,
        (Some(_), None) => Action::Removed,
        (Some(f), Some(t)) if f != t => Action::Changed,
        _ => Action::Unchanged,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_column_change_is_definition_change() {
        let detector = DeltaDetectorService::new();
        let from = ConstraintNode::unique("u", ["a"]);
        let to = ConstraintNode::unique("u", ["a", "b"]);

        let delta = detector.compare_constraints(&from, &to).unwrap();
        assert!(delta.definition_changed);
        assert_eq!(delta.condition_action, Action::Unchanged);
    }

    #[test]
    fn test_condition_removed() {
        let detector = DeltaDetectorService::new();
        let from = ConstraintNode::unique("u", ["a"]).with_condition("a > 0");
        let to = ConstraintNode::unique("u", ["a"]);

        let delta = detector.compare_constraints(&from, &to).unwrap();
        assert!(!delta.definition_changed);
        assert_eq!(delta.condition_action, Action::Removed);
    }

    #[test]
    fn test_check_expression_change() {
        let detector = DeltaDetectorService::new();
        let from = ConstraintNode::check("age_check", "age > 0");
        let to = ConstraintNode::check("age_check", "age >= 0");

        assert!(detector.compare_constraints(&from, &to).unwrap().definition_changed);
        assert!(detector.compare_constraints(&from, &from).is_none());
    }
}
