//! Algorithm × expression comparison grid.
//!
//! Cells are keyed by `(algorithm, expression)`. Editing either list prunes
//! cells whose key left the list and queues the pairs that have no result
//! yet; cells that already hold a result are kept as they are.

use std::collections::HashMap;

use tracing::{debug, info};

use super::engine::marshal;
use super::syntax::{validate_expression, validate_type};
use crate::api::*;

#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct ComparisonCell {
    pub result: Option<AlgorithmResult>,
    pub loading: bool,
}

impl ComparisonCell {
    pub fn is_terminal(&self) -> bool {
        !self.loading && self.result.is_some()
    }
}

pub type CellKey = (String, String);

#[derive(Debug, Clone, Default)]
pub struct ComparisonGrid {
    algorithms: Vec<String>,
    expressions: Vec<String>,
    cells: HashMap<CellKey, ComparisonCell>,
}

fn dedup_in_order(items: Vec<String>) -> Vec<String> {
    let mut seen = std::collections::HashSet::new();
    items
        .into_iter()
        .filter(|item| seen.insert(item.clone()))
        .collect()
}

fn move_item(items: &mut Vec<String>, from: usize, to: usize) -> bool {
    if from >= items.len() || to >= items.len() || from == to {
        return false;
    }
    let item = items.remove(from);
    items.insert(to, item);
    true
}

impl ComparisonGrid {
    pub fn new(algorithms: Vec<String>, expressions: Vec<String>) -> Self {
        let mut grid = Self::default();
        grid.set_algorithms(algorithms);
        grid.set_expressions(expressions);
        grid
    }

    pub fn algorithms(&self) -> &[String] {
        &self.algorithms
    }

    pub fn expressions(&self) -> &[String] {
        &self.expressions
    }

    pub fn set_algorithms(&mut self, algorithms: Vec<String>) {
        self.algorithms = dedup_in_order(algorithms);
        self.prune();
    }

    pub fn set_expressions(&mut self, expressions: Vec<String>) {
        self.expressions = dedup_in_order(expressions);
        self.prune();
    }

    pub fn add_algorithm(&mut self, algorithm: impl Into<String>) {
        let algorithm = algorithm.into();
        if !self.algorithms.contains(&algorithm) {
            self.algorithms.push(algorithm);
        }
    }

    pub fn add_expression(&mut self, expression: impl Into<String>) {
        let expression = expression.into();
        if !self.expressions.contains(&expression) {
            self.expressions.push(expression);
        }
    }

    pub fn remove_algorithm(&mut self, algorithm: &str) {
        self.algorithms.retain(|a| a != algorithm);
        self.prune();
    }

    pub fn remove_expression(&mut self, expression: &str) {
        self.expressions.retain(|e| e != expression);
        self.prune();
    }

    /// Move an entry within one list. Ordering is presentational only, so no
    /// cell is touched.
    pub fn reorder(&mut self, axis: ListAxis, from: usize, to: usize) -> bool {
        match axis {
            ListAxis::Algorithms => move_item(&mut self.algorithms, from, to),
            ListAxis::Expressions => move_item(&mut self.expressions, from, to),
        }
    }

    fn prune(&mut self) {
        let before = self.cells.len();
        let (algorithms, expressions) = (&self.algorithms, &self.expressions);
        self.cells
            .retain(|(a, e), _| algorithms.contains(a) && expressions.contains(e));
        let pruned = before - self.cells.len();
        if pruned > 0 {
            debug!(pruned, remaining = self.cells.len(), "comparison cells pruned");
        }
    }

    pub fn cell(&self, algorithm: &str, expression: &str) -> Option<&ComparisonCell> {
        self.cells
            .get(&(algorithm.to_string(), expression.to_string()))
    }

    pub fn cell_count(&self) -> usize {
        self.cells.len()
    }

    /// Every pair of the cross product, row-major by algorithm.
    pub fn pairs(&self) -> Vec<CellKey> {
        self.algorithms
            .iter()
            .flat_map(|a| self.expressions.iter().map(move |e| (a.clone(), e.clone())))
            .collect()
    }

    /// Pairs with neither a result nor a call in flight.
    pub fn pending_pairs(&self) -> Vec<CellKey> {
        self.pairs()
            .into_iter()
            .filter(|key| {
                self.cells
                    .get(key)
                    .is_none_or(|cell| !cell.loading && cell.result.is_none())
            })
            .collect()
    }

    pub fn begin(&mut self, key: &CellKey) {
        let cell = self.cells.entry(key.clone()).or_default();
        cell.loading = true;
        debug!(algorithm = %key.0, expression = %key.1, "comparison cell loading");
    }

    /// Store a terminal result. Results for pairs no longer in the grid are
    /// dropped.
    pub fn complete(&mut self, key: &CellKey, result: AlgorithmResult) {
        if !self.algorithms.contains(&key.0) || !self.expressions.contains(&key.1) {
            debug!(algorithm = %key.0, expression = %key.1, "discarding result for removed pair");
            return;
        }
        debug!(
            algorithm = %key.0,
            expression = %key.1,
            success = result.success,
            "comparison cell complete"
        );
        self.cells.insert(
            key.clone(),
            ComparisonCell {
                result: Some(result),
                loading: false,
            },
        );
    }

    /// Run every pending pair through `runner`. Errors become failed cells;
    /// one cell failing never stops the others.
    pub fn run_pending(&mut self, runner: &dyn AlgorithmRunner, catalog: &RuleCatalog) -> usize {
        let pending = self.pending_pairs();
        if pending.is_empty() {
            return 0;
        }
        info!(pairs = pending.len(), "running comparison");
        for key in &pending {
            self.begin(key);
        }
        for key in &pending {
            let result = match build_request(catalog, &key.0, &key.1) {
                Ok(request) => {
                    debug!(argv = ?marshal(&request).argv, "comparison invocation");
                    runner
                        .run(&request)
                        .unwrap_or_else(PlaygroundError::into_failed_result)
                }
                Err(err) => err.into_failed_result(),
            };
            self.complete(key, result);
        }
        pending.len()
    }
}

/// Request for one cell with the algorithm's default variant.
pub fn build_request(
    catalog: &RuleCatalog,
    algorithm: &str,
    input: &str,
) -> Result<AlgorithmRequest, PlaygroundError> {
    let variant = catalog
        .get(algorithm)
        .and_then(|a| a.default_variant.clone());
    prepare_request(catalog, algorithm, variant, input, RequestOptions::default())
}

/// Validate `input` locally and shape it for the algorithm's mode.
///
/// For algorithms missing from the catalog the mode is guessed from the
/// input: a `<:` separator means subtyping.
pub fn prepare_request(
    catalog: &RuleCatalog,
    algorithm: &str,
    variant: Option<String>,
    input: &str,
    options: RequestOptions,
) -> Result<AlgorithmRequest, PlaygroundError> {
    let mode = catalog.mode_of(algorithm).unwrap_or_else(|| {
        if input.contains(SUBTYPING_SEPARATOR) {
            AlgorithmMode::Subtyping
        } else {
            AlgorithmMode::Inference
        }
    });
    match mode {
        AlgorithmMode::Inference => {
            validate_expression(input)?;
            let mut request = InferenceRequest::new(algorithm, input.trim()).with_variant(variant);
            request.options = options;
            Ok(AlgorithmRequest::Inference(request))
        }
        AlgorithmMode::Subtyping => {
            let mut request = SubtypingRequest::parse(algorithm, variant, input)?;
            validate_type(&request.left_type)?;
            validate_type(&request.right_type)?;
            request.options = options;
            Ok(AlgorithmRequest::Subtyping(request))
        }
    }
}
