use std::path::PathBuf;

use serde::{Deserialize, Serialize};

use super::foundation::{ErrorContext, PlaygroundError, SourceLocation, Span};

/// Separator between the two sides of a subtyping query.
pub const SUBTYPING_SEPARATOR: &str = " <: ";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RequestOptions {
    pub show_steps: bool,
    pub max_depth: usize,
}

impl Default for RequestOptions {
    fn default() -> Self {
        Self {
            show_steps: true,
            max_depth: 100,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct InferenceRequest {
    pub algorithm: String,
    pub variant: Option<String>,
    pub expression: String,
    pub options: RequestOptions,
}

impl InferenceRequest {
    pub fn new(algorithm: impl Into<String>, expression: impl Into<String>) -> Self {
        Self {
            algorithm: algorithm.into(),
            variant: None,
            expression: expression.into(),
            options: RequestOptions::default(),
        }
    }

    pub fn with_variant(mut self, variant: Option<String>) -> Self {
        self.variant = variant;
        self
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SubtypingRequest {
    pub algorithm: String,
    pub variant: Option<String>,
    pub left_type: String,
    pub right_type: String,
    pub options: RequestOptions,
}

impl SubtypingRequest {
    /// Split `"<left> <: <right>"` into a request.
    ///
    /// Input that does not split into exactly two non-empty sides is rejected
    /// here and never reaches the engine.
    pub fn parse(
        algorithm: impl Into<String>,
        variant: Option<String>,
        input: &str,
    ) -> Result<Self, PlaygroundError> {
        let parts: Vec<&str> = input.split(SUBTYPING_SEPARATOR).collect();
        if parts.len() != 2 {
            let found = parts.len().saturating_sub(1);
            return Err(PlaygroundError::syntax(format!(
                "subtyping input must have the form '<left> <: <right>' (found {found} separators)"
            ))
            .with_location(SourceLocation::from_span(
                input,
                Span {
                    start: 0,
                    end: input.len(),
                },
            ))
            .with_context(ErrorContext {
                expression: Some(input.to_string()),
                ..ErrorContext::default()
            })
            .with_suggestion("separate the two types with ' <: ' (spaces included)"));
        }
        let (left, right) = (parts[0].trim(), parts[1].trim());
        if left.is_empty() || right.is_empty() {
            return Err(PlaygroundError::syntax(
                "both sides of a subtyping query must be non-empty",
            )
            .with_context(ErrorContext {
                expression: Some(input.to_string()),
                ..ErrorContext::default()
            }));
        }
        Ok(Self {
            algorithm: algorithm.into(),
            variant,
            left_type: left.to_string(),
            right_type: right.to_string(),
            options: RequestOptions::default(),
        })
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AlgorithmRequest {
    Inference(InferenceRequest),
    Subtyping(SubtypingRequest),
}

impl AlgorithmRequest {
    pub fn algorithm(&self) -> &str {
        match self {
            AlgorithmRequest::Inference(r) => &r.algorithm,
            AlgorithmRequest::Subtyping(r) => &r.algorithm,
        }
    }

    pub fn variant(&self) -> Option<&str> {
        match self {
            AlgorithmRequest::Inference(r) => r.variant.as_deref(),
            AlgorithmRequest::Subtyping(r) => r.variant.as_deref(),
        }
    }

    pub fn options(&self) -> RequestOptions {
        match self {
            AlgorithmRequest::Inference(r) => r.options,
            AlgorithmRequest::Subtyping(r) => r.options,
        }
    }

    /// The user-facing input text this request was built from.
    pub fn input(&self) -> String {
        match self {
            AlgorithmRequest::Inference(r) => r.expression.clone(),
            AlgorithmRequest::Subtyping(r) => {
                format!("{}{SUBTYPING_SEPARATOR}{}", r.left_type, r.right_type)
            }
        }
    }
}

/// Positional argument list for the engine's command entry point.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EngineInvocation {
    pub argv: Vec<String>,
}

/// Everything one invocation printed, in emission order.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct EngineOutput {
    pub exit_code: i32,
    pub lines: Vec<String>,
}

impl EngineOutput {
    pub fn text(&self) -> String {
        self.lines.join("\n")
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(tag = "method", rename_all = "camelCase")]
pub enum AuthMethod {
    #[default]
    None,
    Bearer {
        token: String,
    },
    Basic {
        username: String,
        password: String,
    },
}

/// Where the engine module comes from. Any field change requires the
/// module to be loaded again.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "camelCase")]
pub enum WasmSource {
    Local {
        path: PathBuf,
    },
    Remote {
        url: String,
        #[serde(default)]
        auth: AuthMethod,
    },
}

impl WasmSource {
    /// Interpret a command-line/env value: `http(s)://` means remote,
    /// anything else is a local path.
    pub fn from_location(location: &str) -> Self {
        if location.starts_with("http://") || location.starts_with("https://") {
            WasmSource::Remote {
                url: location.to_string(),
                auth: AuthMethod::None,
            }
        } else {
            WasmSource::Local {
                path: PathBuf::from(location),
            }
        }
    }

    pub fn describe(&self) -> String {
        match self {
            WasmSource::Local { path } => path.display().to_string(),
            WasmSource::Remote { url, .. } => url.clone(),
        }
    }
}

impl Default for WasmSource {
    fn default() -> Self {
        WasmSource::Local {
            path: PathBuf::from("infer.wasm"),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ListAxis {
    Algorithms,
    Expressions,
}

/// User intents, decoupled from whatever key binding or gesture raised them.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Intent {
    RunInference,
    ClearInput,
    FocusInput,
    Share,
    ToggleCompare,
    Reorder {
        axis: ListAxis,
        from: usize,
        to: usize,
    },
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Effect {
    None,
    FocusInput,
    ShareLink(String),
    Ran,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ShareState {
    pub algorithm: String,
    pub expression: String,
    pub variant: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ComparisonShare {
    pub algorithms: Vec<String>,
    pub expressions: Vec<String>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SharedView {
    Single(ShareState),
    Comparison(ComparisonShare),
}
