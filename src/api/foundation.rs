use std::fmt;

use thiserror::Error;

use super::derivation::AlgorithmResult;

/// Failure categories surfaced to the user.
///
/// `Parsing` and `Syntax` come from local validation and never reach the
/// engine. `Type`, `Unification` and `Scope` are only authoritative when the
/// engine reports them. `Engine` and `Timeout` describe the transport.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ErrorKind {
    Parsing,
    Type,
    Syntax,
    Unification,
    Scope,
    UnsupportedFeature,
    Runtime,
    Engine,
    Timeout,
}

impl ErrorKind {
    pub fn code(&self) -> &'static str {
        match self {
            ErrorKind::Parsing => "parsing_error",
            ErrorKind::Type => "type_error",
            ErrorKind::Syntax => "syntax_error",
            ErrorKind::Unification => "unification_error",
            ErrorKind::Scope => "scope_error",
            ErrorKind::UnsupportedFeature => "unsupported_feature",
            ErrorKind::Runtime => "runtime_error",
            ErrorKind::Engine => "engine_error",
            ErrorKind::Timeout => "timeout_error",
        }
    }

    /// Local validation failures are reported before any engine call.
    pub fn is_local(&self) -> bool {
        matches!(self, ErrorKind::Parsing | ErrorKind::Syntax)
    }

    /// Errors that mean the engine could not be reached at all.
    pub fn is_transport(&self) -> bool {
        matches!(self, ErrorKind::Engine | ErrorKind::Timeout)
    }

    fn default_suggestions(&self) -> &'static [&'static str] {
        match self {
            ErrorKind::Parsing | ErrorKind::Syntax => &[
                "check that every '(' has a matching ')'",
                "lambdas are written as \\x. body",
            ],
            ErrorKind::Type | ErrorKind::Unification => {
                &["add a type annotation to narrow down the mismatch"]
            }
            ErrorKind::Scope => &["bind the variable with a lambda or let before using it"],
            ErrorKind::UnsupportedFeature => {
                &["try another algorithm", "load the engine module for full support"]
            }
            ErrorKind::Runtime => &["re-run the request; the engine may have crashed"],
            ErrorKind::Engine => &[
                "check the engine source configuration",
                "make sure a WASI runner is installed",
            ],
            ErrorKind::Timeout => &["simplify the expression or raise the timeout"],
        }
    }
}

impl fmt::Display for ErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let label = match self {
            ErrorKind::Parsing => "ParsingError",
            ErrorKind::Type => "TypeError",
            ErrorKind::Syntax => "SyntaxError",
            ErrorKind::Unification => "UnificationError",
            ErrorKind::Scope => "ScopeError",
            ErrorKind::UnsupportedFeature => "UnsupportedFeature",
            ErrorKind::Runtime => "RuntimeError",
            ErrorKind::Engine => "EngineError",
            ErrorKind::Timeout => "TimeoutError",
        };
        f.write_str(label)
    }
}

/// One-based line/column plus the length of the offending region.
///
/// `offset` is the byte offset of the region's start in the whole source.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SourceLocation {
    pub line: u32,
    pub column: u32,
    pub length: u32,
    pub offset: usize,
}

impl SourceLocation {
    /// Locate a byte span inside `source`.
    pub fn from_span(source: &str, span: Span) -> Self {
        let mut start = span.start.min(source.len());
        while !source.is_char_boundary(start) {
            start -= 1;
        }
        let before = &source[..start];
        let line = before.matches('\n').count() as u32 + 1;
        let column = match before.rfind('\n') {
            Some(newline) => before[newline + 1..].chars().count() as u32 + 1,
            None => before.chars().count() as u32 + 1,
        };
        let length = span.end.saturating_sub(span.start).max(1) as u32;
        Self {
            line,
            column,
            length,
            offset: start,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct ErrorContext {
    pub expression: Option<String>,
    pub expected_type: Option<String>,
    pub actual_type: Option<String>,
    pub conflicting_types: Option<(String, String)>,
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("{kind}: {message}")]
pub struct PlaygroundError {
    pub kind: ErrorKind,
    pub message: String,
    pub location: Option<SourceLocation>,
    pub context: Option<ErrorContext>,
    pub suggestions: Vec<String>,
}

impl PlaygroundError {
    pub fn new(kind: ErrorKind, message: impl Into<String>) -> Self {
        Self {
            kind,
            message: message.into(),
            location: None,
            context: None,
            suggestions: Vec::new(),
        }
    }

    pub fn parsing(message: impl Into<String>) -> Self {
        Self::new(ErrorKind::Parsing, message)
    }

    pub fn syntax(message: impl Into<String>) -> Self {
        Self::new(ErrorKind::Syntax, message)
    }

    pub fn engine(message: impl Into<String>) -> Self {
        Self::new(ErrorKind::Engine, message)
    }

    pub fn timeout(message: impl Into<String>) -> Self {
        Self::new(ErrorKind::Timeout, message)
    }

    pub fn runtime(message: impl Into<String>) -> Self {
        Self::new(ErrorKind::Runtime, message)
    }

    pub fn unsupported(message: impl Into<String>) -> Self {
        Self::new(ErrorKind::UnsupportedFeature, message)
    }

    pub fn with_location(mut self, location: SourceLocation) -> Self {
        self.location = Some(location);
        self
    }

    pub fn with_context(mut self, context: ErrorContext) -> Self {
        self.context = Some(context);
        self
    }

    pub fn with_suggestion(mut self, suggestion: impl Into<String>) -> Self {
        self.suggestions.push(suggestion.into());
        self
    }

    /// Explicit suggestions when present, otherwise the kind's defaults.
    pub fn suggest(&self) -> Vec<String> {
        if !self.suggestions.is_empty() {
            return self.suggestions.clone();
        }
        self.kind
            .default_suggestions()
            .iter()
            .map(|s| s.to_string())
            .collect()
    }

    /// Fold the error into a failed result so rendering only ever sees
    /// normalized results.
    pub fn into_failed_result(self) -> AlgorithmResult {
        AlgorithmResult::failure(self.message)
    }

    pub fn into_diagnostics(self) -> DiagnosticBundle {
        let span = self.location.map(|loc| Span {
            start: loc.offset,
            end: loc.offset + loc.length as usize,
        });
        DiagnosticBundle {
            diagnostics: vec![Diagnostic {
                code: self.kind.code().to_string(),
                category: self.kind.to_string(),
                severity: Severity::Error,
                message: self.message.clone(),
                span,
                suggestions: self.suggest(),
            }],
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Severity {
    Error,
    Warning,
    Info,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Span {
    pub start: usize,
    pub end: usize,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Diagnostic {
    pub code: String,
    pub category: String,
    pub severity: Severity,
    pub message: String,
    pub span: Option<Span>,
    pub suggestions: Vec<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct DiagnosticBundle {
    pub diagnostics: Vec<Diagnostic>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn location_counts_lines_and_columns_from_one() {
        let source = "let x = 1 in\n  (x";
        let loc = SourceLocation::from_span(source, Span { start: 15, end: 16 });
        assert_eq!(
            loc,
            SourceLocation {
                line: 2,
                column: 3,
                length: 1,
                offset: 15
            }
        );
    }

    #[test]
    fn span_inside_a_multibyte_char_snaps_back() {
        let loc = SourceLocation::from_span("1 \u{03BB}", Span { start: 3, end: 4 });
        assert_eq!((loc.line, loc.column, loc.offset), (1, 3, 2));
    }

    #[test]
    fn diagnostic_span_uses_the_byte_offset() {
        let source = "let x = 1 in\n  (x";
        let err = PlaygroundError::parsing("'(' is never closed")
            .with_location(SourceLocation::from_span(source, Span { start: 15, end: 16 }));
        let bundle = err.into_diagnostics();
        assert_eq!(bundle.diagnostics[0].span, Some(Span { start: 15, end: 16 }));
    }

    #[test]
    fn explicit_suggestions_replace_defaults() {
        let err = PlaygroundError::engine("no module").with_suggestion("set --engine");
        assert_eq!(err.suggest(), vec!["set --engine".to_string()]);
        assert!(!PlaygroundError::engine("no module").suggest().is_empty());
    }

    #[test]
    fn failed_result_keeps_message() {
        let result = PlaygroundError::timeout("took too long").into_failed_result();
        assert!(!result.success);
        assert_eq!(result.error.as_deref(), Some("took too long"));
    }
}
