//! Best-effort syntax checks for the object language.
//!
//! The engine is the authority on what parses. This module only catches input
//! that is broken beyond doubt (empty text, unbalanced delimiters, a lambda
//! with no body) so it can be reported without an engine round trip, and
//! builds a small AST for the local fallback generator.

use std::fmt;

use crate::api::*;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Expr {
    Var(String),
    Int(i64),
    Bool(bool),
    Unit,
    Lambda {
        param: String,
        annotation: Option<TypeExpr>,
        body: Box<Expr>,
    },
    App {
        function: Box<Expr>,
        argument: Box<Expr>,
    },
    Let {
        name: String,
        value: Box<Expr>,
        body: Box<Expr>,
    },
    Annot {
        expr: Box<Expr>,
        ty: TypeExpr,
    },
    Tuple(Vec<Expr>),
    List(Vec<Expr>),
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TypeExpr {
    Named(String),
    Top,
    Bot,
    Arrow(Box<TypeExpr>, Box<TypeExpr>),
    Forall(Vec<String>, Box<TypeExpr>),
    App(Box<TypeExpr>, Box<TypeExpr>),
    Tuple(Vec<TypeExpr>),
    List(Box<TypeExpr>),
}

impl fmt::Display for Expr {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Expr::Var(name) => write!(f, "{name}"),
            Expr::Int(n) => write!(f, "{n}"),
            Expr::Bool(b) => write!(f, "{b}"),
            Expr::Unit => write!(f, "()"),
            Expr::Lambda {
                param,
                annotation: Some(ty),
                body,
            } => write!(f, "\\({param} : {ty}). {body}"),
            Expr::Lambda { param, body, .. } => write!(f, "\\{param}. {body}"),
            Expr::App { function, argument } => write!(f, "({function} {argument})"),
            Expr::Let { name, value, body } => write!(f, "let {name} = {value} in {body}"),
            Expr::Annot { expr, ty } => write!(f, "({expr} : {ty})"),
            Expr::Tuple(items) => {
                let parts: Vec<String> = items.iter().map(Expr::to_string).collect();
                write!(f, "({})", parts.join(", "))
            }
            Expr::List(items) => {
                let parts: Vec<String> = items.iter().map(Expr::to_string).collect();
                write!(f, "[{}]", parts.join(", "))
            }
        }
    }
}

impl fmt::Display for TypeExpr {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            TypeExpr::Named(name) => write!(f, "{name}"),
            TypeExpr::Top => write!(f, "Top"),
            TypeExpr::Bot => write!(f, "Bot"),
            TypeExpr::Arrow(from, to) => match from.as_ref() {
                TypeExpr::Arrow(..) | TypeExpr::Forall(..) => write!(f, "({from}) -> {to}"),
                _ => write!(f, "{from} -> {to}"),
            },
            TypeExpr::Forall(vars, body) => write!(f, "forall {}. {body}", vars.join(" ")),
            TypeExpr::App(head, arg) => match arg.as_ref() {
                TypeExpr::App(..) | TypeExpr::Arrow(..) | TypeExpr::Forall(..) => {
                    write!(f, "{head} ({arg})")
                }
                _ => write!(f, "{head} {arg}"),
            },
            TypeExpr::Tuple(items) => {
                let parts: Vec<String> = items.iter().map(TypeExpr::to_string).collect();
                write!(f, "({})", parts.join(", "))
            }
            TypeExpr::List(inner) => write!(f, "[{inner}]"),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
struct PToken {
    text: String,
    span: Span,
}

/// Tokens the grammar below knows about. Input using anything else is left
/// for the engine to judge.
fn is_known_token(text: &str) -> bool {
    is_identifier(text)
        || text.chars().all(|c| c.is_ascii_digit())
        || matches!(
            text,
            "\\" | "." | "(" | ")" | "[" | "]" | "," | ":" | "->" | "="
        )
}

fn is_identifier_start(ch: char) -> bool {
    ch == '_' || unicode_ident::is_xid_start(ch)
}

fn is_identifier_continue(ch: char) -> bool {
    ch == '\'' || unicode_ident::is_xid_continue(ch)
}

fn is_identifier(s: &str) -> bool {
    let mut chars = s.chars();
    let Some(first) = chars.next() else {
        return false;
    };
    is_identifier_start(first) && chars.all(is_identifier_continue)
}

fn is_reserved(s: &str) -> bool {
    matches!(s, "let" | "in" | "forall" | "true" | "false")
}

fn tokenize(source: &str) -> Vec<PToken> {
    let mut out = Vec::new();
    let mut chars = source.char_indices().peekable();
    while let Some((start, ch)) = chars.next() {
        if ch.is_whitespace() {
            continue;
        }
        if is_identifier_start(ch) && ch != '\u{03BB}' {
            let mut end = start + ch.len_utf8();
            while let Some((i, c)) = chars.peek().copied() {
                if is_identifier_continue(c) {
                    end = i + c.len_utf8();
                    chars.next();
                } else {
                    break;
                }
            }
            out.push(PToken {
                text: source[start..end].to_string(),
                span: Span { start, end },
            });
            continue;
        }
        if ch.is_ascii_digit() {
            let mut end = start + 1;
            while let Some((i, c)) = chars.peek().copied() {
                if c.is_ascii_digit() {
                    end = i + 1;
                    chars.next();
                } else {
                    break;
                }
            }
            out.push(PToken {
                text: source[start..end].to_string(),
                span: Span { start, end },
            });
            continue;
        }
        let end = start + ch.len_utf8();
        let (text, end) = match ch {
            '-' if matches!(chars.peek(), Some((_, '>'))) => {
                chars.next();
                ("->".to_string(), end + 1)
            }
            '<' if matches!(chars.peek(), Some((_, ':'))) => {
                chars.next();
                ("<:".to_string(), end + 1)
            }
            '\u{03BB}' => ("\\".to_string(), end),
            '\u{2192}' => ("->".to_string(), end),
            '\u{2200}' => ("forall".to_string(), end),
            '\u{22A4}' => ("Top".to_string(), end),
            '\u{22A5}' => ("Bot".to_string(), end),
            other => (other.to_string(), end),
        };
        out.push(PToken {
            text,
            span: Span { start, end },
        });
    }
    out
}

fn parse_error(source: &str, kind: ErrorKind, message: String, span: Span) -> PlaygroundError {
    PlaygroundError::new(kind, message)
        .with_location(SourceLocation::from_span(source, span))
        .with_context(ErrorContext {
            expression: Some(source.to_string()),
            ..ErrorContext::default()
        })
}

#[derive(Debug)]
struct ExprParser<'s> {
    source: &'s str,
    tokens: Vec<PToken>,
    pos: usize,
}

impl<'s> ExprParser<'s> {
    fn new(source: &'s str) -> Self {
        Self {
            source,
            tokens: tokenize(source),
            pos: 0,
        }
    }

    fn finish<T>(&mut self, value: T) -> Result<T, PlaygroundError> {
        if !self.is_eof() {
            return Err(self.error(format!("unexpected token '{}'", self.peek_text())));
        }
        Ok(value)
    }

    fn parse_expression(&mut self) -> Result<Expr, PlaygroundError> {
        if self.eat("let") {
            return self.parse_let();
        }
        if self.eat("\\") {
            return self.parse_lambda();
        }
        let expr = self.parse_application()?;
        if self.eat(":") {
            let ty = self.parse_type()?;
            return Ok(Expr::Annot {
                expr: Box::new(expr),
                ty,
            });
        }
        Ok(expr)
    }

    fn parse_let(&mut self) -> Result<Expr, PlaygroundError> {
        let name = self.expect_identifier("let binding")?;
        self.expect("=")?;
        let value = self.parse_expression_until("in")?;
        if !self.eat("in") {
            return Err(self.error("let-expression must include 'in'".to_string()));
        }
        let body = self.parse_expression()?;
        Ok(Expr::Let {
            name,
            value: Box::new(value),
            body: Box::new(body),
        })
    }

    /// `\x y. e`, `\(x : T). e`, `\x : T. e` or `\x -> e`.
    fn parse_lambda(&mut self) -> Result<Expr, PlaygroundError> {
        let mut binders: Vec<(String, Option<TypeExpr>)> = Vec::new();
        while !self.is_eof() && !self.check(".") && !self.check("->") && !self.check(":") {
            if self.eat("(") {
                let name = self.expect_identifier("lambda binder")?;
                self.expect(":")?;
                let ty = self.parse_type()?;
                self.expect(")")?;
                binders.push((name, Some(ty)));
            } else {
                binders.push((self.expect_identifier("lambda binder")?, None));
            }
        }
        if binders.is_empty() {
            return Err(self.error("lambda needs at least one binder".to_string()));
        }
        if self.eat(":") {
            let ty = self.parse_type()?;
            if let Some((_, annotation @ None)) = binders.last_mut() {
                *annotation = Some(ty);
            }
        }
        if !self.eat("->") {
            self.expect(".")?;
        }
        if self.is_eof() || self.check(")") || self.check(",") {
            return Err(self.error("lambda is missing its body".to_string()));
        }
        let body = self.parse_expression()?;
        Ok(binders
            .into_iter()
            .rev()
            .fold(body, |acc, (param, annotation)| Expr::Lambda {
                param,
                annotation,
                body: Box::new(acc),
            }))
    }

    fn parse_expression_until(&mut self, stop: &str) -> Result<Expr, PlaygroundError> {
        let start = self.pos;
        let mut depth = 0usize;
        let mut nested_lets = 0usize;
        let mut end = self.pos;
        while end < self.tokens.len() {
            match self.tokens[end].text.as_str() {
                "(" | "[" => depth += 1,
                ")" | "]" => depth = depth.saturating_sub(1),
                "let" if depth == 0 => nested_lets += 1,
                t if t == stop && depth == 0 && nested_lets > 0 => nested_lets -= 1,
                t if t == stop && depth == 0 => break,
                _ => {}
            }
            end += 1;
        }
        let slice = self.tokens[start..end].to_vec();
        let saved = std::mem::replace(&mut self.tokens, slice);
        let saved_pos = std::mem::replace(&mut self.pos, 0);
        let parsed = self.parse_expression().and_then(|e| self.finish(e));
        self.tokens = saved;
        self.pos = saved_pos + (end - start);
        parsed
    }

    fn parse_application(&mut self) -> Result<Expr, PlaygroundError> {
        let mut expr = self.parse_atom()?;
        while self.starts_argument() {
            let argument = if self.eat("\\") {
                self.parse_lambda()?
            } else {
                self.parse_atom()?
            };
            expr = Expr::App {
                function: Box::new(expr),
                argument: Box::new(argument),
            };
        }
        Ok(expr)
    }

    fn parse_atom(&mut self) -> Result<Expr, PlaygroundError> {
        if self.eat("true") {
            return Ok(Expr::Bool(true));
        }
        if self.eat("false") {
            return Ok(Expr::Bool(false));
        }
        if self.check_number() {
            let span = self.peek_span();
            let text = self.next_text();
            return text.parse::<i64>().map(Expr::Int).map_err(|_| {
                parse_error(
                    self.source,
                    ErrorKind::Parsing,
                    format!("integer literal '{text}' is out of range"),
                    span,
                )
            });
        }
        if self.eat("(") {
            if self.eat(")") {
                return Ok(Expr::Unit);
            }
            let first = self.parse_expression()?;
            if self.eat(":") {
                let ty = self.parse_type()?;
                self.expect(")")?;
                return Ok(Expr::Annot {
                    expr: Box::new(first),
                    ty,
                });
            }
            let mut items = vec![first];
            while self.eat(",") {
                items.push(self.parse_expression()?);
            }
            self.expect(")")?;
            return Ok(if items.len() == 1 {
                items.remove(0)
            } else {
                Expr::Tuple(items)
            });
        }
        if self.eat("[") {
            let mut items = Vec::new();
            if !self.check("]") {
                items.push(self.parse_expression()?);
                while self.eat(",") {
                    items.push(self.parse_expression()?);
                }
            }
            self.expect("]")?;
            return Ok(Expr::List(items));
        }
        if self.check_identifier() {
            return Ok(Expr::Var(self.next_text()));
        }
        if self.is_eof() {
            return Err(self.error("expression ends unexpectedly".to_string()));
        }
        Err(self.error(format!("unexpected token '{}'", self.peek_text())))
    }

    fn parse_type(&mut self) -> Result<TypeExpr, PlaygroundError> {
        if self.eat("forall") {
            let mut vars = Vec::new();
            while self.check_identifier() {
                vars.push(self.next_text());
            }
            if vars.is_empty() {
                return Err(self.error("forall needs at least one type variable".to_string()));
            }
            self.expect(".")?;
            let body = self.parse_type()?;
            return Ok(TypeExpr::Forall(vars, Box::new(body)));
        }
        let from = self.parse_type_application()?;
        if self.eat("->") {
            let to = self.parse_type()?;
            return Ok(TypeExpr::Arrow(Box::new(from), Box::new(to)));
        }
        Ok(from)
    }

    fn parse_type_application(&mut self) -> Result<TypeExpr, PlaygroundError> {
        let mut ty = self.parse_type_atom()?;
        while self.check_identifier() || self.check("(") || self.check("[") {
            let arg = self.parse_type_atom()?;
            ty = TypeExpr::App(Box::new(ty), Box::new(arg));
        }
        Ok(ty)
    }

    fn parse_type_atom(&mut self) -> Result<TypeExpr, PlaygroundError> {
        if self.eat("Top") {
            return Ok(TypeExpr::Top);
        }
        if self.eat("Bot") {
            return Ok(TypeExpr::Bot);
        }
        if self.eat("[") {
            let inner = self.parse_type()?;
            self.expect("]")?;
            return Ok(TypeExpr::List(Box::new(inner)));
        }
        if self.eat("(") {
            let first = self.parse_type()?;
            let mut items = vec![first];
            while self.eat(",") {
                items.push(self.parse_type()?);
            }
            self.expect(")")?;
            return Ok(if items.len() == 1 {
                items.remove(0)
            } else {
                TypeExpr::Tuple(items)
            });
        }
        if self.check_identifier() {
            return Ok(TypeExpr::Named(self.next_text()));
        }
        Err(self.error(format!("expected a type, found '{}'", self.peek_text())))
    }

    fn starts_argument(&self) -> bool {
        !self.is_eof()
            && (self.check_identifier()
                || self.check_number()
                || self.check("(")
                || self.check("[")
                || self.check("\\")
                || self.check("true")
                || self.check("false"))
    }

    fn error(&self, message: String) -> PlaygroundError {
        parse_error(self.source, ErrorKind::Syntax, message, self.peek_span())
    }

    fn expect(&mut self, sym: &str) -> Result<(), PlaygroundError> {
        if self.eat(sym) {
            Ok(())
        } else {
            Err(self.error(format!("expected '{sym}', found '{}'", self.peek_text())))
        }
    }

    fn expect_identifier(&mut self, context: &str) -> Result<String, PlaygroundError> {
        if self.check_identifier() {
            Ok(self.next_text())
        } else {
            Err(self.error(format!("expected identifier for {context}")))
        }
    }

    fn peek_text(&self) -> &str {
        self.tokens
            .get(self.pos)
            .map(|t| t.text.as_str())
            .unwrap_or("<eof>")
    }

    fn next_text(&mut self) -> String {
        let text = self.peek_text().to_string();
        self.pos += 1;
        text
    }

    fn is_eof(&self) -> bool {
        self.pos >= self.tokens.len()
    }

    fn check(&self, s: &str) -> bool {
        self.peek_text() == s
    }

    fn eat(&mut self, s: &str) -> bool {
        if self.check(s) {
            self.pos += 1;
            true
        } else {
            false
        }
    }

    fn check_identifier(&self) -> bool {
        self.tokens.get(self.pos).is_some_and(|t| {
            is_identifier(&t.text) && !is_reserved(&t.text) && t.text != "Top" && t.text != "Bot"
        })
    }

    fn check_number(&self) -> bool {
        self.tokens
            .get(self.pos)
            .is_some_and(|t| t.text.chars().all(|c| c.is_ascii_digit()))
    }

    fn peek_span(&self) -> Span {
        match self.tokens.get(self.pos) {
            Some(t) => t.span,
            None => {
                let end = self.source.len();
                let start = self
                    .source
                    .char_indices()
                    .last()
                    .map_or(0, |(i, _)| i);
                Span { start, end }
            }
        }
    }
}

fn check_not_empty(source: &str) -> Result<(), PlaygroundError> {
    if source.trim().is_empty() {
        return Err(PlaygroundError::parsing("expression is empty")
            .with_suggestion("type an expression such as \\x. x"));
    }
    Ok(())
}

fn check_delimiters(source: &str) -> Result<(), PlaygroundError> {
    let mut stack: Vec<(char, usize)> = Vec::new();
    for (i, ch) in source.char_indices() {
        match ch {
            '(' | '[' | '{' => stack.push((ch, i)),
            ')' | ']' | '}' => {
                let expected = match ch {
                    ')' => '(',
                    ']' => '[',
                    _ => '{',
                };
                match stack.pop() {
                    Some((open, _)) if open == expected => {}
                    _ => {
                        return Err(parse_error(
                            source,
                            ErrorKind::Parsing,
                            format!("unmatched '{ch}'"),
                            Span {
                                start: i,
                                end: i + 1,
                            },
                        ));
                    }
                }
            }
            _ => {}
        }
    }
    if let Some((open, i)) = stack.pop() {
        return Err(parse_error(
            source,
            ErrorKind::Parsing,
            format!("'{open}' is never closed"),
            Span {
                start: i,
                end: i + 1,
            },
        ));
    }
    Ok(())
}

/// Reject only input that is certainly malformed.
///
/// Structural errors (empty, unbalanced) always fail. Grammar errors fail
/// only when every token is one this parser understands; anything else is
/// passed through to the engine.
pub fn validate_expression(source: &str) -> Result<(), PlaygroundError> {
    check_not_empty(source)?;
    check_delimiters(source)?;
    let mut parser = ExprParser::new(source);
    if !parser.tokens.iter().all(|t| is_known_token(&t.text)) {
        return Ok(());
    }
    parser.parse_expression().and_then(|e| parser.finish(e))?;
    Ok(())
}

pub fn validate_type(source: &str) -> Result<(), PlaygroundError> {
    check_not_empty(source)?;
    check_delimiters(source)?;
    let mut parser = ExprParser::new(source);
    if !parser.tokens.iter().all(|t| is_known_token(&t.text)) {
        return Ok(());
    }
    parser.parse_type().and_then(|t| parser.finish(t))?;
    Ok(())
}

pub fn parse_expression(source: &str) -> Result<Expr, PlaygroundError> {
    check_not_empty(source)?;
    let mut parser = ExprParser::new(source);
    let expr = parser.parse_expression()?;
    parser.finish(expr)
}

pub fn parse_type(source: &str) -> Result<TypeExpr, PlaygroundError> {
    check_not_empty(source)?;
    let mut parser = ExprParser::new(source);
    let ty = parser.parse_type()?;
    parser.finish(ty)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn multi_binder_lambda_nests() {
        let expr = parse_expression("\\x y. x").unwrap();
        assert_eq!(expr.to_string(), "\\x. \\y. x");
    }

    #[test]
    fn unicode_lambda_is_accepted() {
        assert_eq!(
            parse_expression("\u{03BB}x. x").unwrap(),
            parse_expression("\\x. x").unwrap()
        );
    }

    #[test]
    fn application_is_left_associative() {
        let expr = parse_expression("f a b").unwrap();
        assert_eq!(expr.to_string(), "((f a) b)");
    }

    #[test]
    fn unknown_operators_are_left_to_the_engine() {
        assert!(validate_expression("1 + + 2").is_ok());
    }

    #[test]
    fn lambda_without_body_is_rejected() {
        let err = validate_expression("\\x.").unwrap_err();
        assert_eq!(err.kind, ErrorKind::Syntax);
    }

    #[test]
    fn unclosed_paren_reports_position() {
        let err = validate_expression("(\\x. x").unwrap_err();
        assert_eq!(err.kind, ErrorKind::Parsing);
        assert_eq!(err.location.map(|l| l.column), Some(1));
    }

    #[test]
    fn types_parse_with_arrows_and_quantifiers() {
        let ty = parse_type("forall a. a -> List a").unwrap();
        assert_eq!(ty.to_string(), "forall a. a -> List a");
        assert!(validate_type("Int -> ").is_err());
    }
}
