//! Stand-in derivations for when the engine cannot be loaded.
//!
//! Only a handful of textbook shapes are recognized. Every result produced
//! here is tagged [`ResultSource::LocalFallback`] so it is never mistaken for
//! an engine answer.

use tracing::{debug, warn};

use super::syntax::{Expr, TypeExpr, parse_expression, parse_type};
use crate::api::*;

/// Engine result, or a local stand-in if the engine is unavailable.
///
/// Any other error is folded into a failed result unchanged.
pub fn run_with_fallback(runner: &dyn AlgorithmRunner, request: &AlgorithmRequest) -> AlgorithmResult {
    match runner.run(request) {
        Ok(result) => result,
        Err(err) if err.kind == ErrorKind::Engine => {
            warn!(error = %err, algorithm = request.algorithm(), "engine unavailable; using local fallback");
            generate(request).unwrap_or_else(|| unsupported(request))
        }
        Err(err) => err.into_failed_result(),
    }
}

pub fn generate(request: &AlgorithmRequest) -> Option<AlgorithmResult> {
    let result = match request {
        AlgorithmRequest::Inference(r) => infer(&r.expression),
        AlgorithmRequest::Subtyping(r) => subtype(&r.left_type, &r.right_type),
    };
    debug!(input = %request.input(), matched = result.is_some(), "fallback pattern lookup");
    result.map(|r| r.with_source(ResultSource::LocalFallback))
}

fn unsupported(request: &AlgorithmRequest) -> AlgorithmResult {
    PlaygroundError::unsupported(format!(
        "engine unavailable and no local derivation for '{}'",
        request.input()
    ))
    .into_failed_result()
    .with_source(ResultSource::LocalFallback)
}

fn judgment(context: &str, term: &str, ty: &str) -> String {
    if context.is_empty() {
        format!("\\vdash {term} : {ty}")
    } else {
        format!("{context} \\vdash {term} : {ty}")
    }
}

fn literal(expr: &Expr) -> Option<(DerivationStep, &'static str)> {
    let (rule, term, ty) = match expr {
        Expr::Int(n) => ("LitInt", n.to_string(), "Int"),
        Expr::Bool(b) => ("LitBool", b.to_string(), "Bool"),
        Expr::Unit => ("LitUnit", "()".to_string(), "Unit"),
        _ => return None,
    };
    let step = DerivationStep::new(rule, judgment("", &term, &format!("\\mathsf{{{ty}}}")))
        .with_type(ty);
    Some((step, ty))
}

/// `\x. x` at type `ty -> ty`.
fn identity(param: &str, ty: &str) -> DerivationStep {
    let arrow = format!("{ty} -> {ty}");
    DerivationStep::new(
        "Lam",
        judgment("", &format!("\\lambda {param}.\\, {param}"), &format!("{ty} \\to {ty}")),
    )
    .with_type(arrow)
    .child(
        DerivationStep::new("Var", judgment(&format!("{param} : {ty}"), param, ty))
            .with_type(ty)
            .with_explanation(format!("{param} is bound by the enclosing lambda")),
    )
}

fn is_identity(expr: &Expr) -> Option<&str> {
    match expr {
        Expr::Lambda {
            param,
            annotation: None,
            body,
        } if matches!(body.as_ref(), Expr::Var(v) if v == param) => Some(param.as_str()),
        _ => None,
    }
}

fn infer(source: &str) -> Option<AlgorithmResult> {
    let expr = parse_expression(source).ok()?;

    if let Some((step, ty)) = literal(&expr) {
        return Some(AlgorithmResult::success(Some(ty.to_string()), vec![step]));
    }

    if let Some(param) = is_identity(&expr) {
        return Some(AlgorithmResult::success(
            Some("a -> a".to_string()),
            vec![identity(param, "a")],
        ));
    }

    if let Expr::Lambda {
        param: x,
        annotation: None,
        body,
    } = &expr
        && let Expr::Lambda {
            param: y,
            annotation: None,
            body: inner,
        } = body.as_ref()
        && matches!(inner.as_ref(), Expr::Var(v) if v == x)
        && x != y
    {
        let context = format!("{x} : a, {y} : b");
        let step = DerivationStep::new(
            "Lam",
            judgment("", &format!("\\lambda {x}.\\, \\lambda {y}.\\, {x}"), "a \\to b \\to a"),
        )
        .with_type("a -> b -> a")
        .child(
            DerivationStep::new(
                "Lam",
                judgment(&format!("{x} : a"), &format!("\\lambda {y}.\\, {x}"), "b \\to a"),
            )
            .with_type("b -> a")
            .child(DerivationStep::new("Var", judgment(&context, x, "a")).with_type("a")),
        );
        return Some(AlgorithmResult::success(
            Some("a -> b -> a".to_string()),
            vec![step],
        ));
    }

    if let Expr::App { function, argument } = &expr
        && let Some(param) = is_identity(function)
        && let Some((arg_step, ty)) = literal(argument)
    {
        let step = DerivationStep::new("App", judgment("", &expr.to_string(), ty))
            .with_type(ty)
            .child(identity(param, ty))
            .child(arg_step);
        return Some(AlgorithmResult::success(Some(ty.to_string()), vec![step]));
    }

    None
}

fn same_type(left: &str, right: &str) -> bool {
    match (parse_type(left), parse_type(right)) {
        (Ok(l), Ok(r)) => l == r,
        _ => left.split_whitespace().eq(right.split_whitespace()),
    }
}

fn subtype(left: &str, right: &str) -> Option<AlgorithmResult> {
    let rule = if same_type(left, right) {
        "Refl"
    } else if parse_type(right).is_ok_and(|t| t == TypeExpr::Top) {
        "Top"
    } else if parse_type(left).is_ok_and(|t| t == TypeExpr::Bot) {
        "Bot"
    } else {
        return None;
    };
    let step = DerivationStep::new(rule, format!("\\vdash {left} <: {right}"));
    Some(AlgorithmResult::success(
        Some(format!("{left}{SUBTYPING_SEPARATOR}{right}")),
        vec![step],
    ))
}
