use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

/// Catalog entry for one typing or subtyping rule.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct TypingRule {
    pub id: String,
    pub name: String,
    pub premises: Vec<String>,
    pub conclusion: String,
    /// Single-line alternative to premises/conclusion for reduction-style
    /// calculi.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub reduction: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct RuleSection {
    pub id: String,
    pub name: String,
    pub description: String,
    pub formula: String,
    pub rules: Vec<TypingRule>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AlgorithmMode {
    #[default]
    Inference,
    Subtyping,
}

#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct AlgorithmVariant {
    pub id: String,
    pub name: String,
    pub description: String,
    /// Replaces the algorithm's rule list when non-empty.
    pub rules: Vec<TypingRule>,
    pub rule_groups: Vec<RuleSection>,
}

#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct AlgorithmDescriptor {
    pub id: String,
    pub name: String,
    pub labels: Vec<String>,
    pub mode: AlgorithmMode,
    pub rules: Vec<TypingRule>,
    pub rule_groups: Vec<RuleSection>,
    pub variants: Vec<AlgorithmVariant>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub default_variant: Option<String>,
}

impl AlgorithmDescriptor {
    pub fn variant(&self, id: &str) -> Option<&AlgorithmVariant> {
        self.variants.iter().find(|v| v.id == id)
    }

    /// Flat rule list: explicit rules first, then rules only listed in
    /// sections.
    pub fn all_rules(&self) -> Vec<&TypingRule> {
        collect_rules(&self.rules, &self.rule_groups)
    }
}

fn collect_rules<'a>(rules: &'a [TypingRule], sections: &'a [RuleSection]) -> Vec<&'a TypingRule> {
    let mut out: Vec<&TypingRule> = rules.iter().collect();
    for rule in sections.iter().flat_map(|s| s.rules.iter()) {
        if !out.iter().any(|r| r.id == rule.id) {
            out.push(rule);
        }
    }
    out
}

/// Immutable index of algorithm descriptors as reported by `--meta`.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct RuleCatalog {
    algorithms: Vec<AlgorithmDescriptor>,
    by_id: BTreeMap<String, usize>,
}

impl RuleCatalog {
    pub fn new(algorithms: Vec<AlgorithmDescriptor>) -> Self {
        let by_id = algorithms
            .iter()
            .enumerate()
            .map(|(i, a)| (a.id.clone(), i))
            .collect();
        Self { algorithms, by_id }
    }

    pub fn algorithms(&self) -> &[AlgorithmDescriptor] {
        &self.algorithms
    }

    pub fn is_empty(&self) -> bool {
        self.algorithms.is_empty()
    }

    pub fn get(&self, id: &str) -> Option<&AlgorithmDescriptor> {
        self.by_id.get(id).map(|&i| &self.algorithms[i])
    }

    pub fn mode_of(&self, id: &str) -> Option<AlgorithmMode> {
        self.get(id).map(|a| a.mode)
    }

    /// Rules shown for `algorithm`, preferring the variant's own list when
    /// it declares one.
    pub fn rules_for(&self, algorithm: &str, variant: Option<&str>) -> Vec<&TypingRule> {
        let Some(descriptor) = self.get(algorithm) else {
            return Vec::new();
        };
        if let Some(v) = variant.and_then(|id| descriptor.variant(id))
            && (!v.rules.is_empty() || !v.rule_groups.is_empty())
        {
            return collect_rules(&v.rules, &v.rule_groups);
        }
        descriptor.all_rules()
    }
}
