//! Side-effect-free queries over a derivation forest.
//!
//! Every consumer addresses nodes through [`StepPath`]; nothing here keeps
//! state between calls, so the same forest always yields the same answer.

use crate::api::*;

/// One entry of the pre-order linearization.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FlatEntry<'a> {
    pub step: &'a DerivationStep,
    /// Number of ancestors; roots have depth 0.
    pub depth: usize,
}

/// Pre-order traversal with the originating path kept per entry.
pub fn flatten_with_paths(forest: &[DerivationStep]) -> Vec<(StepPath, FlatEntry<'_>)> {
    fn walk<'a>(
        step: &'a DerivationStep,
        path: StepPath,
        out: &mut Vec<(StepPath, FlatEntry<'a>)>,
    ) {
        let depth = path.depth() - 1;
        out.push((path.clone(), FlatEntry { step, depth }));
        for (i, child) in step.children.iter().enumerate() {
            walk(child, path.child(i), out);
        }
    }

    let mut out = Vec::with_capacity(node_count(forest));
    for (i, root) in forest.iter().enumerate() {
        walk(root, StepPath::root(i), &mut out);
    }
    out
}

/// Pre-order linearization: each root followed by its whole subtree.
pub fn flatten(forest: &[DerivationStep]) -> Vec<&DerivationStep> {
    flatten_with_paths(forest)
        .into_iter()
        .map(|(_, entry)| entry.step)
        .collect()
}

/// Walk `path` through the forest; `None` if any index is out of range or
/// the path is empty.
pub fn resolve<'a>(forest: &'a [DerivationStep], path: &StepPath) -> Option<&'a DerivationStep> {
    let (first, rest) = path.indices().split_first()?;
    let mut current = forest.get(*first)?;
    for &index in rest {
        current = current.children.get(index)?;
    }
    Some(current)
}

pub fn paths_equal(a: &StepPath, b: &StepPath) -> bool {
    a.indices().len() == b.indices().len()
        && a.indices().iter().zip(b.indices()).all(|(x, y)| x == y)
}

pub fn node_count(forest: &[DerivationStep]) -> usize {
    forest.iter().map(DerivationStep::size).sum()
}

/// Whether any step in the forest applies `rule_id`.
pub fn rule_used(forest: &[DerivationStep], rule_id: &str) -> bool {
    forest
        .iter()
        .any(|step| step.rule_id == rule_id || rule_used(&step.children, rule_id))
}

/// Paths of every step applying `rule_id`, in pre-order.
pub fn paths_with_rule(forest: &[DerivationStep], rule_id: &str) -> Vec<StepPath> {
    flatten_with_paths(forest)
        .into_iter()
        .filter(|(_, entry)| entry.step.rule_id == rule_id)
        .map(|(path, _)| path)
        .collect()
}

/// Deepest level present, counting roots as depth 1. Empty forests have
/// depth 0.
pub fn max_depth(forest: &[DerivationStep]) -> usize {
    forest
        .iter()
        .map(|step| 1 + max_depth(&step.children))
        .max()
        .unwrap_or(0)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample() -> Vec<DerivationStep> {
        vec![
            DerivationStep::new("App", "a")
                .child(DerivationStep::new("Lam", "b").child(DerivationStep::new("Var", "c")))
                .child(DerivationStep::new("Lit", "d")),
            DerivationStep::new("Var", "e"),
        ]
    }

    #[test]
    fn flatten_is_preorder() {
        let forest = sample();
        let exprs: Vec<&str> = flatten(&forest).iter().map(|s| s.expression.as_str()).collect();
        assert_eq!(exprs, vec!["a", "b", "c", "d", "e"]);
    }

    #[test]
    fn flatten_keeps_origin_paths() {
        let forest = sample();
        let paths: Vec<String> = flatten_with_paths(&forest)
            .into_iter()
            .map(|(p, _)| p.to_string())
            .collect();
        assert_eq!(paths, vec!["0", "0.0", "0.0.0", "0.1", "1"]);
    }

    #[test]
    fn resolve_rejects_out_of_range_and_empty_paths() {
        let forest = sample();
        assert!(resolve(&forest, &StepPath(vec![0, 2])).is_none());
        assert!(resolve(&forest, &StepPath(vec![2])).is_none());
        assert!(resolve(&forest, &StepPath::default()).is_none());
        assert_eq!(
            resolve(&forest, &StepPath(vec![0, 0, 0])).map(|s| s.expression.as_str()),
            Some("c")
        );
    }

    #[test]
    fn depth_counts_levels() {
        assert_eq!(max_depth(&sample()), 3);
        assert_eq!(max_depth(&[]), 0);
    }
}
