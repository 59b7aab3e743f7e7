#![allow(dead_code)]

use serde_json::{Value, json};

pub fn identity_success() -> Value {
    json!({
        "success": true,
        "finalType": "a -> a",
        "derivation": [{
            "ruleId": "Lam",
            "expression": "\\vdash \\lambda x.\\, x : a \\to a",
            "type": "a -> a",
            "children": [{
                "ruleId": "Var",
                "expression": "x : a \\vdash x : a",
                "type": "a"
            }]
        }]
    })
}

pub fn unification_failure() -> Value {
    json!({
        "success": false,
        "error": "cannot unify \\mathsf{Int} with \\mathsf{Bool}",
        "errorLatex": true,
        "derivation": [{"ruleId": "App", "expression": "1 true", "children": []}]
    })
}

pub fn subtyping_success(left: &str, right: &str) -> Value {
    json!({
        "success": true,
        "finalType": format!("{left} <: {right}"),
        "derivation": [{"ruleId": "Top", "expression": format!("{left} <: {right}")}]
    })
}

pub fn meta() -> Value {
    json!([
        {
            "id": "W",
            "name": "Algorithm W",
            "labels": ["Hindley-Milner"],
            "mode": "inference",
            "rules": [
                {"id": "Var", "name": "Var", "premises": ["x : a \\in \\Gamma"], "conclusion": "\\Gamma \\vdash x : a"},
                {"id": "Lam", "name": "Abs", "premises": [], "conclusion": "\\Gamma \\vdash \\lambda x. e : a \\to b"}
            ]
        },
        {
            "id": "DK",
            "name": "Dunfield-Krishnaswami",
            "mode": "subtyping",
            "rules": [{"id": "Refl"}, {"id": "Top"}],
            "variants": [{"id": "fsub", "name": "F-sub", "rules": [{"id": "Refl"}, {"id": "Forall"}]}],
            "defaultVariant": "fsub"
        }
    ])
}

/// Pretty-printed so one payload spans many output lines.
pub fn as_lines(value: &Value) -> Vec<String> {
    serde_json::to_string_pretty(value)
        .unwrap()
        .lines()
        .map(str::to_string)
        .collect()
}
