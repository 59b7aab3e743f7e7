//! Shareable links.
//!
//! Single view: `algorithm`, `program` (or `expression` on decode), optional
//! `variant`. Comparison view: comma-joined `algorithms` and `expressions`;
//! each expression is percent-encoded before joining so commas inside it
//! survive.

use tracing::debug;

use crate::api::*;

const PARAM_ALGORITHM: &str = "algorithm";
const PARAM_PROGRAM: &str = "program";
const PARAM_EXPRESSION: &str = "expression";
const PARAM_VARIANT: &str = "variant";
const PARAM_ALGORITHMS: &str = "algorithms";
const PARAM_EXPRESSIONS: &str = "expressions";

const OWNED_PARAMS: [&str; 6] = [
    PARAM_ALGORITHM,
    PARAM_PROGRAM,
    PARAM_EXPRESSION,
    PARAM_VARIANT,
    PARAM_ALGORITHMS,
    PARAM_EXPRESSIONS,
];

pub fn percent_encode(text: &str) -> String {
    urlencoding::encode(text).into_owned()
}

/// Decode one query value. `+` is a space; every `%` must start a two-digit
/// hex escape.
pub fn percent_decode(text: &str) -> Result<String, PlaygroundError> {
    let bytes = text.as_bytes();
    if let Some(offset) = bytes.iter().enumerate().position(|(i, &b)| {
        b == b'%' && !bytes.get(i + 1..i + 3).is_some_and(|h| h.iter().all(u8::is_ascii_hexdigit))
    }) {
        return Err(PlaygroundError::parsing(format!(
            "bad percent escape at offset {offset}"
        )));
    }
    urlencoding::decode(&text.replace('+', " "))
        .map(|decoded| decoded.into_owned())
        .map_err(|_| PlaygroundError::parsing("shared link is not valid UTF-8"))
}

fn join_query(base: &str, params: &[(&str, String)]) -> String {
    let query: Vec<String> = params.iter().map(|(k, v)| format!("{k}={v}")).collect();
    let sep = if base.contains('?') { '&' } else { '?' };
    format!("{base}{sep}{}", query.join("&"))
}

pub fn encode_single(base: &str, state: &ShareState) -> String {
    let mut params = vec![
        (PARAM_ALGORITHM, percent_encode(&state.algorithm)),
        (PARAM_PROGRAM, percent_encode(&state.expression)),
    ];
    if let Some(variant) = &state.variant {
        params.push((PARAM_VARIANT, percent_encode(variant)));
    }
    join_query(base, &params)
}

pub fn encode_comparison(base: &str, share: &ComparisonShare) -> String {
    let algorithms: Vec<String> = share.algorithms.iter().map(|a| percent_encode(a)).collect();
    let expressions: Vec<String> = share.expressions.iter().map(|e| percent_encode(e)).collect();
    join_query(
        base,
        &[
            (PARAM_ALGORITHMS, algorithms.join(",")),
            (PARAM_EXPRESSIONS, expressions.join(",")),
        ],
    )
}

pub fn encode(base: &str, view: &SharedView) -> String {
    match view {
        SharedView::Single(state) => encode_single(base, state),
        SharedView::Comparison(share) => encode_comparison(base, share),
    }
}

/// A decoded link plus the URL with the playground's own parameters removed.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DecodedLink {
    pub view: Option<SharedView>,
    pub clean_url: String,
}

fn split_list(raw: &str) -> Result<Vec<String>, PlaygroundError> {
    raw.split(',')
        .filter(|part| !part.is_empty())
        .map(percent_decode)
        .collect()
}

pub fn decode(url: &str) -> Result<DecodedLink, PlaygroundError> {
    let (without_fragment, fragment) = match url.split_once('#') {
        Some((head, frag)) => (head, Some(frag)),
        None => (url, None),
    };
    let Some((base, query)) = without_fragment.split_once('?') else {
        return Ok(DecodedLink {
            view: None,
            clean_url: url.to_string(),
        });
    };

    let mut ours: Vec<(&str, &str)> = Vec::new();
    let mut foreign: Vec<&str> = Vec::new();
    for pair in query.split('&').filter(|p| !p.is_empty()) {
        let (key, value) = pair.split_once('=').unwrap_or((pair, ""));
        if OWNED_PARAMS.contains(&key) {
            ours.push((key, value));
        } else {
            foreign.push(pair);
        }
    }
    let lookup = |name: &str| ours.iter().rev().find(|(k, _)| *k == name).map(|(_, v)| *v);

    let view = if let Some(algorithms) = lookup(PARAM_ALGORITHMS) {
        Some(SharedView::Comparison(ComparisonShare {
            algorithms: split_list(algorithms)?,
            expressions: lookup(PARAM_EXPRESSIONS)
                .map(split_list)
                .transpose()?
                .unwrap_or_default(),
        }))
    } else if let Some(algorithm) = lookup(PARAM_ALGORITHM) {
        let expression = lookup(PARAM_PROGRAM)
            .or_else(|| lookup(PARAM_EXPRESSION))
            .map(percent_decode)
            .transpose()?
            .unwrap_or_default();
        Some(SharedView::Single(ShareState {
            algorithm: percent_decode(algorithm)?,
            expression,
            variant: lookup(PARAM_VARIANT)
                .filter(|v| !v.is_empty())
                .map(percent_decode)
                .transpose()?,
        }))
    } else {
        None
    };

    let mut clean_url = base.to_string();
    if !foreign.is_empty() {
        clean_url.push('?');
        clean_url.push_str(&foreign.join("&"));
    }
    if let Some(fragment) = fragment {
        clean_url.push('#');
        clean_url.push_str(fragment);
    }
    debug!(decoded = view.is_some(), clean_url = %clean_url, "shared link decoded");
    Ok(DecodedLink { view, clean_url })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn encoding_escapes_reserved_characters() {
        assert_eq!(percent_encode("\\x. x"), "%5Cx.%20x");
        assert_eq!(percent_encode("a,b"), "a%2Cb");
    }

    #[test]
    fn malformed_escape_is_a_parsing_error() {
        let err = percent_decode("%G1").unwrap_err();
        assert_eq!(err.kind, ErrorKind::Parsing);
    }

    #[test]
    fn foreign_parameters_survive_stripping() {
        let decoded = decode("https://host/play?theme=dark&algorithm=W&program=x#top").unwrap();
        assert_eq!(decoded.clean_url, "https://host/play?theme=dark#top");
    }

    #[test]
    fn legacy_expression_key_is_accepted() {
        let decoded = decode("https://host/?algorithm=W&expression=1").unwrap();
        match decoded.view {
            Some(SharedView::Single(state)) => assert_eq!(state.expression, "1"),
            other => panic!("unexpected view: {other:?}"),
        }
    }
}
