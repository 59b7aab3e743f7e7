mod common;

use std::time::Instant;

use common::engines::{ScriptedLoader, ScriptedModule, local};
use common::fixtures::{
    arb_forest, arb_rule_id, branching_forest, catalog, identity_forest, manual_paths,
};
use infer_playground::api::*;
use infer_playground::runtime::forest::{paths_with_rule, resolve, rule_used};
use infer_playground::runtime::render::{TreeView, linear_rows, rule_badges};
use infer_playground::runtime::{Playground, PlaygroundConfig, Selection, SelectionEvent};
use proptest::prelude::*;

fn highlighted(forest: &[DerivationStep], selection: &Selection) -> Vec<StepPath> {
    linear_rows(forest, selection)
        .into_iter()
        .filter(|row| row.active)
        .map(|row| row.path)
        .collect()
}

proptest! {
    #[test]
    fn prop_rule_selection_highlights_exactly_its_steps(
        forest in arb_forest(),
        rule in arb_rule_id(),
    ) {
        let selection = Selection::Idle.apply(&SelectionEvent::ClickRule(rule.clone()), &forest);
        if rule_used(&forest, &rule) {
            prop_assert_eq!(highlighted(&forest, &selection), paths_with_rule(&forest, &rule));
        } else {
            prop_assert!(selection.is_idle());
            prop_assert!(highlighted(&forest, &selection).is_empty());
        }
    }

    #[test]
    fn prop_step_selection_highlights_only_itself(forest in arb_forest()) {
        for path in manual_paths(&forest) {
            let selection =
                Selection::Idle.apply(&SelectionEvent::ClickStep(path.clone()), &forest);
            prop_assert_eq!(highlighted(&forest, &selection), vec![path.clone()]);
            let step = resolve(&forest, &path).unwrap();
            prop_assert_eq!(selection.active_rule(), Some(step.rule_id.as_str()));
        }
    }

    #[test]
    fn prop_second_click_returns_to_idle(forest in arb_forest(), rule in arb_rule_id()) {
        let mut selection = Selection::Idle;
        selection.click_rule(&rule, &forest);
        selection.click_rule(&rule, &forest);
        prop_assert!(selection.is_idle());

        for path in manual_paths(&forest) {
            let mut selection = Selection::Idle;
            selection.click_step(&path, &forest);
            selection.click_step(&path, &forest);
            prop_assert!(selection.is_idle());
        }
    }

    #[test]
    fn prop_reset_always_idles(forest in arb_forest(), rule in arb_rule_id()) {
        let selection = Selection::RuleActive(rule);
        prop_assert!(selection.apply(&SelectionEvent::Reset, &forest).is_idle());
    }
}

#[test]
fn step_selection_lights_its_rule_badge_but_not_sibling_steps() {
    let forest = branching_forest();
    let mut selection = Selection::Idle;
    selection.click_step(&StepPath(vec![0, 1]), &forest);

    assert_eq!(highlighted(&forest, &selection), vec![StepPath(vec![0, 1])]);
    let catalog = catalog();
    let badges = rule_badges(&catalog, "W", None, &selection, &forest);
    let active: Vec<&str> = badges
        .iter()
        .filter(|b| b.active)
        .map(|b| b.id.as_str())
        .collect();
    assert_eq!(active, vec!["Var"]);
}

#[test]
fn tree_and_linear_views_agree_on_highlight() {
    let forest = branching_forest();
    let mut selection = Selection::Idle;
    selection.click_rule("Var", &forest);

    let tree: Vec<StepPath> = TreeView::default()
        .rows(&forest, &selection)
        .into_iter()
        .filter(|row| row.active)
        .map(|row| row.path)
        .collect();
    assert_eq!(tree, highlighted(&forest, &selection));
}

#[test]
fn clicking_an_unused_rule_does_nothing() {
    let forest = identity_forest();
    let mut selection = Selection::Idle;
    selection.click_rule("Let", &forest);
    assert!(selection.is_idle());
}

#[test]
fn step_without_rule_implies_no_badge() {
    let forest = vec![DerivationStep::new("", "hole")];
    let mut selection = Selection::Idle;
    selection.click_step(&StepPath::root(0), &forest);
    assert_eq!(
        selection,
        Selection::StepActive {
            path: StepPath::root(0),
            rule: None
        }
    );
    assert_eq!(selection.active_rule(), None);
}

#[test]
fn identity_session_walks_through_every_selection_state() {
    let loader = ScriptedLoader::new(ScriptedModule::fake_engine());
    let client = loader.client(local("infer.wasm"));
    let mut playground = Playground::new(Box::new(client), &PlaygroundConfig::default());
    playground.load_catalog().unwrap();
    assert_eq!(playground.algorithm(), Some("W"));

    playground.expression_edited("\\x. x", Instant::now());
    let result = playground.run_current().unwrap().clone();
    assert!(result.success);
    assert_eq!(result.final_type.as_deref(), Some("a -> a"));
    assert_eq!(result.derivation.len(), 1);
    assert_eq!(result.derivation[0].rule_id, "Lam");
    assert_eq!(result.derivation[0].children[0].rule_id, "Var");

    playground.click_rule("Var");
    assert_eq!(playground.selection(), &Selection::RuleActive("Var".to_string()));

    playground.click_step(&StepPath(vec![0]));
    assert_eq!(
        playground.selection(),
        &Selection::StepActive {
            path: StepPath(vec![0]),
            rule: Some("Lam".to_string())
        }
    );
    let active: Vec<String> = playground
        .badges()
        .into_iter()
        .filter(|b| b.active)
        .map(|b| b.id)
        .collect();
    assert_eq!(active, vec!["Lam".to_string()]);

    playground.click_step(&StepPath(vec![0]));
    assert!(playground.selection().is_idle());

    playground.click_rule("Var");
    assert!(!playground.selection().is_idle());
    playground.expression_edited("\\y. y", Instant::now());
    playground.run_current();
    assert!(playground.selection().is_idle());
}
