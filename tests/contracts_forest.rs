mod common;

use common::fixtures::{arb_forest, branching_forest, manual_paths, manual_walk};
use infer_playground::api::*;
use infer_playground::runtime::forest::{
    flatten, flatten_with_paths, max_depth, node_count, paths_equal, paths_with_rule, resolve,
    rule_used,
};
use proptest::prelude::*;

proptest! {
    #[test]
    fn prop_resolve_matches_manual_walk(forest in arb_forest()) {
        for path in manual_paths(&forest) {
            let resolved = resolve(&forest, &path);
            let walked = manual_walk(&forest, &path);
            prop_assert!(resolved.is_some());
            prop_assert!(std::ptr::eq(resolved.unwrap(), walked.unwrap()));
        }
    }

    #[test]
    fn prop_flatten_counts_every_node_in_preorder(forest in arb_forest()) {
        let total: usize = forest.iter().map(DerivationStep::size).sum();
        let flat = flatten_with_paths(&forest);
        prop_assert_eq!(flat.len(), total);
        prop_assert_eq!(flatten(&forest).len(), node_count(&forest));

        for (i, (path, entry)) in flat.iter().enumerate() {
            // The entry's whole subtree follows it contiguously.
            let size = entry.step.size();
            for (descendant, _) in &flat[i + 1..i + size] {
                prop_assert!(descendant.is_descendant_of(path));
            }
            if !entry.step.is_leaf() {
                prop_assert_eq!(&flat[i + 1].0, &path.child(0));
            }
            prop_assert_eq!(entry.depth + 1, path.depth());
        }
    }

    #[test]
    fn prop_flatten_is_deterministic(forest in arb_forest()) {
        let first: Vec<*const DerivationStep> = flatten(&forest).into_iter().map(|s| s as *const _).collect();
        let second: Vec<*const DerivationStep> = flatten(&forest).into_iter().map(|s| s as *const _).collect();
        prop_assert_eq!(first, second);
    }

    #[test]
    fn prop_out_of_range_paths_do_not_resolve(forest in arb_forest(), tail in 0usize..4) {
        let beyond = StepPath(vec![forest.len() + tail]);
        prop_assert!(resolve(&forest, &beyond).is_none());
        for path in manual_paths(&forest) {
            let step = resolve(&forest, &path).unwrap();
            let past_children = path.child(step.children.len() + tail);
            prop_assert!(resolve(&forest, &past_children).is_none());
        }
    }
}

#[test]
fn empty_forest_is_inert() {
    let forest: Vec<DerivationStep> = Vec::new();
    assert!(flatten(&forest).is_empty());
    assert!(resolve(&forest, &StepPath::root(0)).is_none());
    assert!(!rule_used(&forest, "Var"));
    assert_eq!(max_depth(&forest), 0);
}

#[test]
fn empty_path_resolves_to_nothing() {
    assert!(resolve(&branching_forest(), &StepPath::default()).is_none());
}

#[test]
fn path_equality_is_componentwise() {
    assert!(paths_equal(&StepPath::default(), &StepPath::default()));
    assert!(paths_equal(&StepPath(vec![0, 1]), &StepPath(vec![0, 1])));
    assert!(!paths_equal(&StepPath(vec![0]), &StepPath(vec![0, 0])));
    assert!(!paths_equal(&StepPath(vec![1, 0]), &StepPath(vec![0, 1])));
}

#[test]
fn missing_children_and_empty_children_are_both_leaves() {
    let value = serde_json::json!({
        "success": true,
        "derivation": [
            {"ruleId": "Var", "expression": "x"},
            {"ruleId": "Var", "expression": "y", "children": []}
        ]
    });
    let result = infer_playground::runtime::normalize::normalize_result(
        infer_playground::runtime::normalize::EnginePayload::Structured(value),
    );
    let flat = flatten_with_paths(&result.derivation);
    assert_eq!(flat.len(), 2);
    assert!(flat.iter().all(|(_, e)| e.step.is_leaf()));
}

#[test]
fn rule_search_descends_into_subtrees() {
    let forest = branching_forest();
    assert!(rule_used(&forest, "LitInt"));
    let vars: Vec<String> = paths_with_rule(&forest, "Var")
        .iter()
        .map(StepPath::to_string)
        .collect();
    assert_eq!(vars, vec!["0.0.0", "0.1", "1.1"]);
}

#[test]
fn step_paths_round_trip_through_dotted_text() {
    let path: StepPath = "0.12.3".parse().unwrap();
    assert_eq!(path, StepPath(vec![0, 12, 3]));
    assert_eq!(path.to_string(), "0.12.3");
    assert!("0.x".parse::<StepPath>().is_err());
}
