#![allow(dead_code)]

use infer_playground::api::*;
use proptest::prelude::*;

/// `\x. x` under algorithm W: one `Lam` root with a single `Var` child.
pub fn identity_forest() -> Vec<DerivationStep> {
    vec![
        DerivationStep::new("Lam", "\\vdash \\lambda x.\\, x : a \\to a")
            .with_type("a -> a")
            .child(DerivationStep::new("Var", "x : a \\vdash x : a").with_type("a")),
    ]
}

/// Two roots; the first has a nested `Var` reused at several depths.
pub fn branching_forest() -> Vec<DerivationStep> {
    vec![
        DerivationStep::new("App", "f x")
            .child(
                DerivationStep::new("Lam", "\\lambda y. y")
                    .child(DerivationStep::new("Var", "y")),
            )
            .child(DerivationStep::new("Var", "x")),
        DerivationStep::new("Let", "let z = 1 in z")
            .child(DerivationStep::new("LitInt", "1"))
            .child(DerivationStep::new("Var", "z")),
    ]
}

pub fn rule(id: &str) -> TypingRule {
    TypingRule {
        id: id.to_string(),
        name: id.to_string(),
        ..TypingRule::default()
    }
}

pub fn algorithm_w() -> AlgorithmDescriptor {
    AlgorithmDescriptor {
        id: "W".to_string(),
        name: "Algorithm W".to_string(),
        labels: vec!["Hindley-Milner".to_string()],
        mode: AlgorithmMode::Inference,
        rules: ["Var", "Lam", "App", "Let"].into_iter().map(rule).collect(),
        ..AlgorithmDescriptor::default()
    }
}

pub fn algorithm_dk() -> AlgorithmDescriptor {
    AlgorithmDescriptor {
        id: "DK".to_string(),
        name: "Dunfield-Krishnaswami".to_string(),
        mode: AlgorithmMode::Subtyping,
        rules: ["Refl", "Top", "Bot", "Arrow"].into_iter().map(rule).collect(),
        variants: vec![AlgorithmVariant {
            id: "fsub".to_string(),
            name: "Bounded quantification".to_string(),
            rules: vec![rule("Refl"), rule("Forall")],
            ..AlgorithmVariant::default()
        }],
        default_variant: None,
        ..AlgorithmDescriptor::default()
    }
}

pub fn catalog() -> RuleCatalog {
    RuleCatalog::new(vec![algorithm_w(), algorithm_dk()])
}

/// Every valid path of `forest`, found by walking `children` directly.
pub fn manual_paths(forest: &[DerivationStep]) -> Vec<StepPath> {
    fn walk(steps: &[DerivationStep], prefix: &[usize], out: &mut Vec<StepPath>) {
        for (i, step) in steps.iter().enumerate() {
            let mut path = prefix.to_vec();
            path.push(i);
            out.push(StepPath(path.clone()));
            walk(&step.children, &path, out);
        }
    }
    let mut out = Vec::new();
    walk(forest, &[], &mut out);
    out
}

/// Follow `path` by hand: forest index first, then `children` indices.
pub fn manual_walk<'a>(forest: &'a [DerivationStep], path: &StepPath) -> Option<&'a DerivationStep> {
    let (first, rest) = path.indices().split_first()?;
    let mut node = forest.get(*first)?;
    for &i in rest {
        node = node.children.get(i)?;
    }
    Some(node)
}

pub const RULE_POOL: [&str; 5] = ["Var", "Lam", "App", "Let", "Sub"];

fn arb_rule() -> impl Strategy<Value = String> {
    prop::sample::select(RULE_POOL.to_vec()).prop_map(str::to_string)
}

pub fn arb_step() -> impl Strategy<Value = DerivationStep> {
    let leaf = (arb_rule(), "[a-z]{1,4}").prop_map(|(r, e)| DerivationStep::new(r, e));
    leaf.prop_recursive(4, 48, 3, |inner| {
        (arb_rule(), "[a-z]{1,4}", prop::collection::vec(inner, 0..4)).prop_map(
            |(r, e, children)| {
                let mut step = DerivationStep::new(r, e);
                step.children = children;
                step
            },
        )
    })
}

pub fn arb_forest() -> impl Strategy<Value = Vec<DerivationStep>> {
    prop::collection::vec(arb_step(), 0..4)
}

pub fn arb_rule_id() -> impl Strategy<Value = String> {
    arb_rule()
}
