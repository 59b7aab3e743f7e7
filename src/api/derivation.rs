use std::fmt;
use std::str::FromStr;

use serde::Serialize;

use super::foundation::PlaygroundError;

/// One rule application inside a derivation forest.
///
/// A step has no identity beyond its position: it owns its children and is
/// never shared between parents. An empty `children` vector is a leaf.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct DerivationStep {
    pub rule_id: String,
    /// Math markup for the judgment at this step.
    pub expression: String,
    #[serde(rename = "type", skip_serializing_if = "Option::is_none")]
    pub ty: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub explanation: Option<String>,
    pub children: Vec<DerivationStep>,
}

impl DerivationStep {
    pub fn new(rule_id: impl Into<String>, expression: impl Into<String>) -> Self {
        Self {
            rule_id: rule_id.into(),
            expression: expression.into(),
            ty: None,
            explanation: None,
            children: Vec::new(),
        }
    }

    pub fn with_type(mut self, ty: impl Into<String>) -> Self {
        self.ty = Some(ty.into());
        self
    }

    pub fn with_explanation(mut self, explanation: impl Into<String>) -> Self {
        self.explanation = Some(explanation.into());
        self
    }

    pub fn child(mut self, step: DerivationStep) -> Self {
        self.children.push(step);
        self
    }

    pub fn is_leaf(&self) -> bool {
        self.children.is_empty()
    }

    /// Number of steps in this subtree, including `self`.
    pub fn size(&self) -> usize {
        1 + self.children.iter().map(DerivationStep::size).sum::<usize>()
    }
}

/// Zero-based indices descending from the forest roots.
///
/// `[1, 0, 2]` is the second root's first child's third child. Paths are only
/// meaningful for the forest they were taken from.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Default, Serialize)]
pub struct StepPath(pub Vec<usize>);

impl StepPath {
    pub fn root(index: usize) -> Self {
        Self(vec![index])
    }

    pub fn indices(&self) -> &[usize] {
        &self.0
    }

    pub fn depth(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn child(&self, index: usize) -> Self {
        let mut indices = self.0.clone();
        indices.push(index);
        Self(indices)
    }

    /// True when `self` lies strictly below `other`.
    pub fn is_descendant_of(&self, other: &StepPath) -> bool {
        self.0.len() > other.0.len() && self.0.starts_with(&other.0)
    }
}

impl From<Vec<usize>> for StepPath {
    fn from(value: Vec<usize>) -> Self {
        Self(value)
    }
}

impl From<&[usize]> for StepPath {
    fn from(value: &[usize]) -> Self {
        Self(value.to_vec())
    }
}

impl fmt::Display for StepPath {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let parts: Vec<String> = self.0.iter().map(usize::to_string).collect();
        f.write_str(&parts.join("."))
    }
}

impl FromStr for StepPath {
    type Err = PlaygroundError;

    /// Parses the dotted form printed by `Display`, e.g. `0.1.2`.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let trimmed = s.trim();
        if trimmed.is_empty() {
            return Ok(StepPath::default());
        }
        trimmed
            .split('.')
            .map(|part| {
                part.trim().parse::<usize>().map_err(|_| {
                    PlaygroundError::parsing(format!("invalid step path segment '{part}'"))
                })
            })
            .collect::<Result<Vec<_>, _>>()
            .map(StepPath)
    }
}

/// Where a result came from. Only `Engine` results are authoritative.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize)]
#[serde(rename_all = "camelCase")]
pub enum ResultSource {
    #[default]
    Engine,
    /// The engine printed plain text instead of a JSON payload.
    EngineText,
    LocalFallback,
}

impl ResultSource {
    pub fn is_authoritative(&self) -> bool {
        !matches!(self, ResultSource::LocalFallback)
    }
}

/// Normalized outcome of one (algorithm, expression) run.
///
/// `success` decides which optional field is meaningful: `final_type` on
/// success, `error` on failure. `derivation` may hold a partial trace either
/// way.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct AlgorithmResult {
    pub success: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub final_type: Option<String>,
    pub derivation: Vec<DerivationStep>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
    pub error_latex: bool,
    pub source: ResultSource,
}

pub type InferenceResult = AlgorithmResult;
pub type SubtypingResult = AlgorithmResult;

impl AlgorithmResult {
    pub fn success(final_type: Option<String>, derivation: Vec<DerivationStep>) -> Self {
        Self {
            success: true,
            final_type,
            derivation,
            error: None,
            error_latex: false,
            source: ResultSource::Engine,
        }
    }

    pub fn failure(error: impl Into<String>) -> Self {
        Self {
            success: false,
            final_type: None,
            derivation: Vec::new(),
            error: Some(error.into()),
            error_latex: false,
            source: ResultSource::Engine,
        }
    }

    pub fn with_source(mut self, source: ResultSource) -> Self {
        self.source = source;
        self
    }

    pub fn is_authoritative(&self) -> bool {
        self.source.is_authoritative()
    }
}
