//! Tree and linear projections of one derivation forest.
//!
//! Both views read the same [`Selection`] and emit [`StepPath`]s for clicks,
//! so they never disagree about what is highlighted. Expansion state belongs
//! to the tree view alone and never touches the selection.

use std::collections::HashMap;
use std::fmt::Write as _;

use serde::{Deserialize, Serialize};

use super::forest::{flatten_with_paths, rule_used};
use super::selection::Selection;
use crate::api::*;

const GUIDE_VERTICAL: &str = "\u{2502}   ";
const GUIDE_BRANCH: &str = "\u{251C}\u{2500}\u{2500} ";
const GUIDE_LAST: &str = "\u{2514}\u{2500}\u{2500} ";
const GUIDE_SPACE: &str = "    ";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum ExpansionPolicy {
    #[default]
    ExpandAll,
    CollapseAll,
    /// Steps at depth `n` or shallower start expanded (roots are depth 1).
    Depth(usize),
}

impl ExpansionPolicy {
    fn expanded_by_default(&self, path: &StepPath) -> bool {
        match self {
            ExpansionPolicy::ExpandAll => true,
            ExpansionPolicy::CollapseAll => false,
            ExpansionPolicy::Depth(n) => path.depth() <= *n,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ViewMode {
    #[default]
    Tree,
    Linear,
}

impl ViewMode {
    pub fn toggled(self) -> Self {
        match self {
            ViewMode::Tree => ViewMode::Linear,
            ViewMode::Linear => ViewMode::Tree,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TreeRow {
    pub path: StepPath,
    pub depth: usize,
    pub rule_id: String,
    pub expression: String,
    pub ty: Option<String>,
    pub has_children: bool,
    pub expanded: bool,
    pub active: bool,
    /// Box-drawing prefix for text output.
    pub guide: String,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LinearRow {
    /// 1-based pre-order position; display only.
    pub number: usize,
    pub path: StepPath,
    pub depth: usize,
    pub rule_id: String,
    pub expression: String,
    pub ty: Option<String>,
    pub active: bool,
}

/// Per-node expand/collapse state for the tree view.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct TreeView {
    policy: ExpansionPolicy,
    overrides: HashMap<StepPath, bool>,
}

impl TreeView {
    pub fn new(policy: ExpansionPolicy) -> Self {
        Self {
            policy,
            overrides: HashMap::new(),
        }
    }

    pub fn policy(&self) -> ExpansionPolicy {
        self.policy
    }

    pub fn is_expanded(&self, path: &StepPath) -> bool {
        self.overrides
            .get(path)
            .copied()
            .unwrap_or_else(|| self.policy.expanded_by_default(path))
    }

    pub fn toggle(&mut self, path: &StepPath) {
        let expanded = self.is_expanded(path);
        self.overrides.insert(path.clone(), !expanded);
    }

    pub fn set_policy(&mut self, policy: ExpansionPolicy) {
        self.policy = policy;
        self.overrides.clear();
    }

    /// A different forest arrived. Paths from the old one mean nothing now,
    /// so per-node state is dropped unless the caller asks to keep it.
    pub fn forest_replaced(&mut self, preserve: bool) {
        if !preserve {
            self.overrides.clear();
        }
    }

    /// Visible rows, descending only into expanded steps.
    pub fn rows(&self, forest: &[DerivationStep], selection: &Selection) -> Vec<TreeRow> {
        let mut rows = Vec::new();
        for (i, root) in forest.iter().enumerate() {
            self.push_rows(root, StepPath::root(i), String::new(), None, selection, &mut rows);
        }
        rows
    }

    fn push_rows(
        &self,
        step: &DerivationStep,
        path: StepPath,
        prefix: String,
        is_last: Option<bool>,
        selection: &Selection,
        rows: &mut Vec<TreeRow>,
    ) {
        let expanded = self.is_expanded(&path);
        let guide = match is_last {
            None => String::new(),
            Some(true) => format!("{prefix}{GUIDE_LAST}"),
            Some(false) => format!("{prefix}{GUIDE_BRANCH}"),
        };
        rows.push(TreeRow {
            depth: path.depth() - 1,
            rule_id: step.rule_id.clone(),
            expression: step.expression.clone(),
            ty: step.ty.clone(),
            has_children: !step.is_leaf(),
            expanded,
            active: selection.is_step_active(&path, step),
            guide,
            path: path.clone(),
        });
        if !expanded {
            return;
        }
        let child_prefix = match is_last {
            None => String::new(),
            Some(true) => format!("{prefix}{GUIDE_SPACE}"),
            Some(false) => format!("{prefix}{GUIDE_VERTICAL}"),
        };
        let count = step.children.len();
        for (i, child) in step.children.iter().enumerate() {
            self.push_rows(
                child,
                path.child(i),
                child_prefix.clone(),
                Some(i + 1 == count),
                selection,
                rows,
            );
        }
    }
}

/// Numbered pre-order rows; each keeps the path it came from so a click can
/// be resolved against the forest.
pub fn linear_rows(forest: &[DerivationStep], selection: &Selection) -> Vec<LinearRow> {
    flatten_with_paths(forest)
        .into_iter()
        .enumerate()
        .map(|(i, (path, entry))| LinearRow {
            number: i + 1,
            active: selection.is_step_active(&path, entry.step),
            depth: entry.depth,
            rule_id: entry.step.rule_id.clone(),
            expression: entry.step.expression.clone(),
            ty: entry.step.ty.clone(),
            path,
        })
        .collect()
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RuleBadge {
    pub id: String,
    pub name: String,
    pub active: bool,
    /// The rule occurs somewhere in the shown derivation; clicking an unused
    /// badge does nothing.
    pub used: bool,
}

pub fn rule_badges(
    catalog: &RuleCatalog,
    algorithm: &str,
    variant: Option<&str>,
    selection: &Selection,
    forest: &[DerivationStep],
) -> Vec<RuleBadge> {
    catalog
        .rules_for(algorithm, variant)
        .into_iter()
        .map(|rule| RuleBadge {
            active: selection.is_badge_active(&rule.id),
            used: rule_used(forest, &rule.id),
            name: if rule.name.is_empty() {
                rule.id.clone()
            } else {
                rule.name.clone()
            },
            id: rule.id.clone(),
        })
        .collect()
}

pub fn render_badges_text(badges: &[RuleBadge]) -> String {
    badges
        .iter()
        .map(|b| match (b.active, b.used) {
            (true, _) => format!("[*{}]", b.id),
            (false, true) => format!("[{}]", b.id),
            (false, false) => format!("({})", b.id),
        })
        .collect::<Vec<_>>()
        .join(" ")
}

/// What the result area shows, decided once for both views.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ResultPanel<'a> {
    Waiting,
    /// Partial derivations are not shown on failure.
    Failed {
        message: &'a str,
        latex: bool,
    },
    Derivation {
        forest: &'a [DerivationStep],
        final_type: Option<&'a str>,
        source: ResultSource,
    },
}

pub fn result_panel(result: Option<&AlgorithmResult>) -> ResultPanel<'_> {
    match result {
        None => ResultPanel::Waiting,
        Some(r) if !r.success => ResultPanel::Failed {
            message: r.error.as_deref().unwrap_or("unknown error"),
            latex: r.error_latex,
        },
        Some(r) => ResultPanel::Derivation {
            forest: &r.derivation,
            final_type: r.final_type.as_deref(),
            source: r.source,
        },
    }
}

fn step_label(rule_id: &str, expression: &str, ty: Option<&str>) -> String {
    match ty {
        Some(ty) => format!("[{rule_id}] {expression} : {ty}"),
        None => format!("[{rule_id}] {expression}"),
    }
}

pub fn render_tree_text(rows: &[TreeRow]) -> String {
    let mut out = String::new();
    for row in rows {
        let marker = if row.active { "*" } else { " " };
        let fold = match (row.has_children, row.expanded) {
            (false, _) => " ",
            (true, true) => "\u{25BE}",
            (true, false) => "\u{25B8}",
        };
        let _ = writeln!(
            out,
            "{marker}{}{fold} {}",
            row.guide,
            step_label(&row.rule_id, &row.expression, row.ty.as_deref())
        );
    }
    out
}

pub fn render_linear_text(rows: &[LinearRow]) -> String {
    let width = rows.len().to_string().len();
    let mut out = String::new();
    for row in rows {
        let marker = if row.active { "*" } else { " " };
        let _ = writeln!(
            out,
            "{marker}{:>width$}. {}{}",
            row.number,
            "  ".repeat(row.depth),
            step_label(&row.rule_id, &row.expression, row.ty.as_deref())
        );
    }
    out
}

/// Full text for the result area in the given view mode.
pub fn render_result_text(
    result: Option<&AlgorithmResult>,
    mode: ViewMode,
    tree: &TreeView,
    selection: &Selection,
) -> String {
    match result_panel(result) {
        ResultPanel::Waiting => "waiting for input\n".to_string(),
        ResultPanel::Failed { message, latex } => {
            if latex {
                format!("error: ${message}$\n")
            } else {
                format!("error: {message}\n")
            }
        }
        ResultPanel::Derivation {
            forest,
            final_type,
            source,
        } => {
            let mut out = match mode {
                ViewMode::Tree => render_tree_text(&tree.rows(forest, selection)),
                ViewMode::Linear => render_linear_text(&linear_rows(forest, selection)),
            };
            if let Some(ty) = final_type {
                let _ = writeln!(out, "result: {ty}");
            }
            match source {
                ResultSource::Engine => {}
                ResultSource::EngineText => out.push_str("(unstructured engine output)\n"),
                ResultSource::LocalFallback => {
                    out.push_str("(local approximation; engine unavailable)\n")
                }
            }
            out
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn forest() -> Vec<DerivationStep> {
        vec![
            DerivationStep::new("App", "e1 e2")
                .child(DerivationStep::new("Lam", "\\x. x").child(DerivationStep::new("Var", "x")))
                .child(DerivationStep::new("Int", "1")),
        ]
    }

    #[test]
    fn guides_mark_last_children() {
        let rows = TreeView::default().rows(&forest(), &Selection::Idle);
        let guides: Vec<&str> = rows.iter().map(|r| r.guide.as_str()).collect();
        let nested = format!("{GUIDE_VERTICAL}{GUIDE_LAST}");
        assert_eq!(guides, vec!["", GUIDE_BRANCH, nested.as_str(), GUIDE_LAST]);
    }

    #[test]
    fn depth_policy_limits_initial_expansion() {
        let view = TreeView::new(ExpansionPolicy::Depth(1));
        let rows = view.rows(&forest(), &Selection::Idle);
        let paths: Vec<String> = rows.iter().map(|r| r.path.to_string()).collect();
        assert_eq!(paths, vec!["0", "0.0", "0.1"]);
    }

    #[test]
    fn linear_text_numbers_from_one() {
        let text = render_linear_text(&linear_rows(&forest(), &Selection::Idle));
        assert!(text.lines().next().is_some_and(|l| l.contains("1. [App]")));
        assert!(text.lines().nth(3).is_some_and(|l| l.contains("4. ")));
    }
}
