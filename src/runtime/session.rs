//! The playground session: one input, one algorithm, one result, and the
//! view state around them.
//!
//! State only changes through the named events and [`Intent`]s below; each
//! event that invalidates what is on screen resets the selection and the
//! tree's expansion state explicitly.

use std::time::{Duration, Instant};

use tracing::{debug, info, warn};

use super::comparison::{ComparisonGrid, prepare_request};
use super::config::PlaygroundConfig;
use super::fallback::run_with_fallback;
use super::render::{RuleBadge, TreeView, ViewMode, render_result_text, rule_badges};
use super::selection::Selection;
use super::share;
use super::store::remember;
use crate::api::*;

/// Delays an action until input has been quiet for `delay`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Debouncer {
    delay: Duration,
    deadline: Option<Instant>,
}

impl Debouncer {
    pub fn new(delay: Duration) -> Self {
        Self {
            delay,
            deadline: None,
        }
    }

    /// (Re)start the quiet period at `now`.
    pub fn schedule(&mut self, now: Instant) {
        self.deadline = Some(now + self.delay);
    }

    pub fn cancel(&mut self) {
        self.deadline = None;
    }

    pub fn is_pending(&self) -> bool {
        self.deadline.is_some()
    }

    /// True once per schedule, when `now` has reached the deadline.
    pub fn fire(&mut self, now: Instant) -> bool {
        match self.deadline {
            Some(deadline) if now >= deadline => {
                self.deadline = None;
                true
            }
            _ => false,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub enum ResultState {
    #[default]
    Waiting,
    Ready(AlgorithmResult),
}

pub struct Playground {
    runner: Box<dyn AlgorithmRunner>,
    catalog: RuleCatalog,
    algorithm: Option<String>,
    variant: Option<String>,
    input: String,
    result: ResultState,
    /// Local validation failure behind the current result, kept for its
    /// location and suggestions.
    last_error: Option<PlaygroundError>,
    selection: Selection,
    tree: TreeView,
    view: ViewMode,
    comparison: Option<ComparisonGrid>,
    debouncer: Debouncer,
    history: Vec<String>,
    history_limit: usize,
    options: RequestOptions,
    share_base: String,
}

impl std::fmt::Debug for Playground {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Playground")
            .field("algorithm", &self.algorithm)
            .field("variant", &self.variant)
            .field("input", &self.input)
            .field("result", &self.result)
            .field("selection", &self.selection)
            .field("view", &self.view)
            .field("comparing", &self.comparison.is_some())
            .finish_non_exhaustive()
    }
}

impl Playground {
    pub fn new(runner: Box<dyn AlgorithmRunner>, config: &PlaygroundConfig) -> Self {
        Self {
            runner,
            catalog: RuleCatalog::default(),
            algorithm: None,
            variant: None,
            input: String::new(),
            result: ResultState::Waiting,
            last_error: None,
            selection: Selection::Idle,
            tree: TreeView::new(config.expansion),
            view: ViewMode::Tree,
            comparison: None,
            debouncer: Debouncer::new(config.debounce()),
            history: Vec::new(),
            history_limit: config.history_limit,
            options: config.request_options(),
            share_base: config.share_base.clone(),
        }
    }

    /// Fetch the algorithm catalog from the runner. On failure the catalog
    /// stays as it was and the error is returned for display.
    pub fn load_catalog(&mut self) -> Result<(), PlaygroundError> {
        let algorithms = self.runner.fetch_catalog()?;
        info!(algorithms = algorithms.len(), "algorithm catalog loaded");
        self.set_catalog(RuleCatalog::new(algorithms));
        Ok(())
    }

    pub fn set_catalog(&mut self, catalog: RuleCatalog) {
        self.catalog = catalog;
        let keep = self
            .algorithm
            .as_deref()
            .is_some_and(|id| self.catalog.get(id).is_some());
        if !keep && let Some(first) = self.catalog.algorithms().first() {
            self.algorithm = Some(first.id.clone());
            self.variant = first.default_variant.clone();
        }
    }

    pub fn catalog(&self) -> &RuleCatalog {
        &self.catalog
    }

    pub fn algorithm(&self) -> Option<&str> {
        self.algorithm.as_deref()
    }

    pub fn variant(&self) -> Option<&str> {
        self.variant.as_deref()
    }

    pub fn input(&self) -> &str {
        &self.input
    }

    pub fn result_state(&self) -> &ResultState {
        &self.result
    }

    pub fn result(&self) -> Option<&AlgorithmResult> {
        match &self.result {
            ResultState::Waiting => None,
            ResultState::Ready(result) => Some(result),
        }
    }

    pub fn last_error(&self) -> Option<&PlaygroundError> {
        self.last_error.as_ref()
    }

    pub fn selection(&self) -> &Selection {
        &self.selection
    }

    pub fn tree(&self) -> &TreeView {
        &self.tree
    }

    pub fn view(&self) -> ViewMode {
        self.view
    }

    pub fn comparison(&self) -> Option<&ComparisonGrid> {
        self.comparison.as_ref()
    }

    pub fn history(&self) -> &[String] {
        &self.history
    }

    pub fn set_history(&mut self, mut history: Vec<String>) {
        history.truncate(self.history_limit);
        self.history = history;
    }

    pub fn is_run_scheduled(&self) -> bool {
        self.debouncer.is_pending()
    }

    /// The forest the views actually show: empty unless the current result
    /// succeeded.
    pub fn shown_forest(&self) -> &[DerivationStep] {
        match self.result() {
            Some(result) if result.success => &result.derivation,
            _ => &[],
        }
    }

    fn reset_view_state(&mut self) {
        self.selection.reset();
        self.tree.forest_replaced(false);
    }

    // ---- named events ----

    /// The input text changed; an automatic run is scheduled.
    pub fn expression_edited(&mut self, text: impl Into<String>, now: Instant) {
        self.input = text.into();
        if self.input.trim().is_empty() {
            self.debouncer.cancel();
        } else {
            self.debouncer.schedule(now);
        }
    }

    /// Fire the scheduled run if the input has been quiet long enough.
    pub fn tick(&mut self, now: Instant) -> bool {
        if !self.debouncer.fire(now) {
            return false;
        }
        debug!("debounced run firing");
        self.run_current();
        true
    }

    pub fn algorithm_changed(&mut self, algorithm: &str) -> Result<(), PlaygroundError> {
        if !self.catalog.is_empty() && self.catalog.get(algorithm).is_none() {
            return Err(PlaygroundError::runtime(format!("unknown algorithm '{algorithm}'"))
                .with_suggestion("list the available algorithms with the `meta` command"));
        }
        info!(algorithm, "algorithm changed");
        self.algorithm = Some(algorithm.to_string());
        self.variant = self
            .catalog
            .get(algorithm)
            .and_then(|a| a.default_variant.clone());
        self.rerun_after_reset();
        Ok(())
    }

    pub fn variant_changed(&mut self, variant: Option<&str>) -> Result<(), PlaygroundError> {
        if let (Some(id), Some(descriptor)) =
            (variant, self.algorithm.as_deref().and_then(|a| self.catalog.get(a)))
            && descriptor.variant(id).is_none()
        {
            return Err(PlaygroundError::runtime(format!(
                "algorithm '{}' has no variant '{id}'",
                descriptor.id
            )));
        }
        info!(variant = ?variant, "variant changed");
        self.variant = variant.map(str::to_string);
        self.rerun_after_reset();
        Ok(())
    }

    fn rerun_after_reset(&mut self) {
        self.reset_view_state();
        self.result = ResultState::Waiting;
        self.last_error = None;
        if !self.input.trim().is_empty() {
            self.run_current();
        }
    }

    /// A new result replaces whatever was shown.
    pub fn result_received(&mut self, result: AlgorithmResult) {
        debug!(
            success = result.success,
            steps = result.derivation.len(),
            source = ?result.source,
            "result received"
        );
        self.result = ResultState::Ready(result);
        self.reset_view_state();
    }

    /// Validate and run the current input now.
    pub fn run_current(&mut self) -> Option<&AlgorithmResult> {
        self.debouncer.cancel();
        self.reset_view_state();
        let input = self.input.trim().to_string();
        let result = match self.prepare() {
            Ok(request) => {
                self.last_error = None;
                remember(&mut self.history, &input, self.history_limit);
                run_with_fallback(self.runner.as_ref(), &request)
            }
            Err(err) => {
                warn!(error = %err, "request rejected before reaching the engine");
                let result = err.clone().into_failed_result();
                self.last_error = Some(err);
                result
            }
        };
        self.result_received(result);
        self.result()
    }

    fn prepare(&self) -> Result<AlgorithmRequest, PlaygroundError> {
        let algorithm = self.algorithm.as_deref().ok_or_else(|| {
            PlaygroundError::runtime("no algorithm selected")
                .with_suggestion("pick one with --algorithm or :algo")
        })?;
        prepare_request(
            &self.catalog,
            algorithm,
            self.variant.clone(),
            &self.input,
            self.options,
        )
    }

    // ---- selection and view ----

    pub fn click_rule(&mut self, rule: &str) {
        let mut selection = self.selection.clone();
        selection.click_rule(rule, self.shown_forest());
        self.selection = selection;
    }

    pub fn click_step(&mut self, path: &StepPath) {
        let mut selection = self.selection.clone();
        selection.click_step(path, self.shown_forest());
        self.selection = selection;
    }

    pub fn toggle_node(&mut self, path: &StepPath) {
        self.tree.toggle(path);
    }

    pub fn set_view(&mut self, view: ViewMode) {
        self.view = view;
    }

    pub fn badges(&self) -> Vec<RuleBadge> {
        match self.algorithm.as_deref() {
            Some(algorithm) => rule_badges(
                &self.catalog,
                algorithm,
                self.variant.as_deref(),
                &self.selection,
                self.shown_forest(),
            ),
            None => Vec::new(),
        }
    }

    pub fn render_text(&self) -> String {
        render_result_text(self.result(), self.view, &self.tree, &self.selection)
    }

    // ---- comparison ----

    /// Replace the algorithm list and run every pair that lacks a result.
    pub fn set_comparison_algorithms(&mut self, algorithms: Vec<String>) -> usize {
        self.comparison
            .get_or_insert_with(ComparisonGrid::default)
            .set_algorithms(algorithms);
        self.run_comparison()
    }

    pub fn set_comparison_expressions(&mut self, expressions: Vec<String>) -> usize {
        self.comparison
            .get_or_insert_with(ComparisonGrid::default)
            .set_expressions(expressions);
        self.run_comparison()
    }

    pub fn remove_comparison_algorithm(&mut self, algorithm: &str) {
        if let Some(grid) = self.comparison.as_mut() {
            grid.remove_algorithm(algorithm);
        }
    }

    pub fn remove_comparison_expression(&mut self, expression: &str) {
        if let Some(grid) = self.comparison.as_mut() {
            grid.remove_expression(expression);
        }
    }

    /// Run every comparison pair that has no result yet.
    pub fn run_comparison(&mut self) -> usize {
        match self.comparison.as_mut() {
            Some(grid) => grid.run_pending(self.runner.as_ref(), &self.catalog),
            None => 0,
        }
    }

    // ---- sharing ----

    pub fn share_view(&self) -> SharedView {
        match &self.comparison {
            Some(grid) => SharedView::Comparison(ComparisonShare {
                algorithms: grid.algorithms().to_vec(),
                expressions: grid.expressions().to_vec(),
            }),
            None => SharedView::Single(ShareState {
                algorithm: self.algorithm.clone().unwrap_or_default(),
                expression: self.input.clone(),
                variant: self.variant.clone(),
            }),
        }
    }

    pub fn share_link(&self) -> String {
        share::encode(&self.share_base, &self.share_view())
    }

    /// Restore the state a link describes. Nothing is run.
    pub fn apply_shared(&mut self, view: SharedView) -> Result<(), PlaygroundError> {
        match view {
            SharedView::Single(state) => {
                self.comparison = None;
                if !state.algorithm.is_empty() {
                    if !self.catalog.is_empty() && self.catalog.get(&state.algorithm).is_none() {
                        return Err(PlaygroundError::runtime(format!(
                            "shared link names unknown algorithm '{}'",
                            state.algorithm
                        )));
                    }
                    self.algorithm = Some(state.algorithm);
                }
                self.variant = state.variant;
                self.input = state.expression;
            }
            SharedView::Comparison(share) => {
                let mut grid = ComparisonGrid::default();
                grid.set_algorithms(share.algorithms);
                grid.set_expressions(share.expressions);
                self.comparison = Some(grid);
            }
        }
        self.result = ResultState::Waiting;
        self.last_error = None;
        self.reset_view_state();
        Ok(())
    }

    // ---- intents ----

    pub fn dispatch(&mut self, intent: Intent) -> Effect {
        debug!(?intent, "dispatch");
        match intent {
            Intent::RunInference => {
                if self.comparison.is_some() {
                    self.run_comparison();
                } else {
                    self.run_current();
                }
                Effect::Ran
            }
            Intent::ClearInput => {
                self.input.clear();
                self.debouncer.cancel();
                self.result = ResultState::Waiting;
                self.last_error = None;
                self.reset_view_state();
                Effect::FocusInput
            }
            Intent::FocusInput => Effect::FocusInput,
            Intent::Share => Effect::ShareLink(self.share_link()),
            Intent::ToggleCompare => {
                if self.comparison.take().is_none() {
                    let mut grid = ComparisonGrid::default();
                    grid.set_algorithms(self.algorithm.iter().cloned().collect());
                    let input = self.input.trim();
                    if !input.is_empty() {
                        grid.set_expressions(vec![input.to_string()]);
                    }
                    self.comparison = Some(grid);
                    self.run_comparison();
                }
                Effect::None
            }
            Intent::Reorder { axis, from, to } => {
                if let Some(grid) = self.comparison.as_mut() {
                    grid.reorder(axis, from, to);
                }
                Effect::None
            }
        }
    }
}
