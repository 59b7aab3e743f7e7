//! Selection state shared by the tree view, the linear view and the rule
//! badges.

use tracing::trace;

use super::forest::{resolve, rule_used};
use crate::api::*;

#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub enum Selection {
    #[default]
    Idle,
    /// A rule badge was clicked; every step applying the rule is highlighted.
    RuleActive(String),
    /// A single step was clicked. `rule` is implied for badge highlighting
    /// only.
    StepActive {
        path: StepPath,
        rule: Option<String>,
    },
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SelectionEvent {
    ClickRule(String),
    ClickStep(StepPath),
    /// New expression, new run, or algorithm/variant change.
    Reset,
}

impl Selection {
    /// Pure transition function; `forest` is the derivation currently shown.
    pub fn apply(&self, event: &SelectionEvent, forest: &[DerivationStep]) -> Selection {
        let next = match event {
            SelectionEvent::Reset => Selection::Idle,
            SelectionEvent::ClickRule(rule) => match self {
                Selection::RuleActive(active) if active == rule => Selection::Idle,
                _ if rule_used(forest, rule) => Selection::RuleActive(rule.clone()),
                _ => Selection::Idle,
            },
            SelectionEvent::ClickStep(path) => match self {
                Selection::StepActive { path: active, .. } if active == path => Selection::Idle,
                _ => match resolve(forest, path) {
                    Some(step) => Selection::StepActive {
                        path: path.clone(),
                        rule: (!step.rule_id.is_empty()).then(|| step.rule_id.clone()),
                    },
                    None => self.clone(),
                },
            },
        };
        trace!(?event, from = ?self, to = ?next, "selection transition");
        next
    }

    pub fn click_rule(&mut self, rule: &str, forest: &[DerivationStep]) {
        *self = self.apply(&SelectionEvent::ClickRule(rule.to_string()), forest);
    }

    pub fn click_step(&mut self, path: &StepPath, forest: &[DerivationStep]) {
        *self = self.apply(&SelectionEvent::ClickStep(path.clone()), forest);
    }

    pub fn reset(&mut self) {
        *self = Selection::Idle;
    }

    pub fn is_idle(&self) -> bool {
        matches!(self, Selection::Idle)
    }

    pub fn active_path(&self) -> Option<&StepPath> {
        match self {
            Selection::StepActive { path, .. } => Some(path),
            _ => None,
        }
    }

    /// The rule shown as active on badges: either clicked directly or
    /// implied by the selected step.
    pub fn active_rule(&self) -> Option<&str> {
        match self {
            Selection::Idle => None,
            Selection::RuleActive(rule) => Some(rule),
            Selection::StepActive { rule, .. } => rule.as_deref(),
        }
    }

    /// Whether the step at `path` is drawn highlighted.
    ///
    /// A directly selected rule lights up every step applying it; a selected
    /// step lights up only itself.
    pub fn is_step_active(&self, path: &StepPath, step: &DerivationStep) -> bool {
        match self {
            Selection::Idle => false,
            Selection::RuleActive(rule) => &step.rule_id == rule,
            Selection::StepActive { path: active, .. } => active == path,
        }
    }

    pub fn is_badge_active(&self, rule_id: &str) -> bool {
        self.active_rule() == Some(rule_id)
    }
}
