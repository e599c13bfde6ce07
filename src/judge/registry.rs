use crate::config::types::{CodeboxError, Result};
use crate::judge::languages;
use crate::judge::plan::LanguagePlan;
use std::collections::{BTreeMap, HashMap};

const BUILTIN_ALIASES: &[(&str, &str)] = &[
    ("py", "python"),
    ("python3", "python"),
    ("js", "javascript"),
    ("node", "javascript"),
    ("c++", "cpp"),
    ("cxx", "cpp"),
];

/// Read-only map from language identifier to plan.
///
/// Built once at startup and shared by reference; lookups are
/// case-insensitive, stored ids are canonical lowercase.
#[derive(Debug, Clone)]
pub struct PlanRegistry {
    plans: BTreeMap<&'static str, LanguagePlan>,
    aliases: HashMap<&'static str, &'static str>,
}

impl PlanRegistry {
    /// Registry with the five built-in plans and their aliases.
    pub fn builtin() -> Self {
        let plans = languages::builtin()
            .into_iter()
            .map(|plan| (plan.id(), plan))
            .collect();
        let aliases = BUILTIN_ALIASES.iter().copied().collect();
        Self { plans, aliases }
    }

    /// Registry from an explicit plan set, without aliases.
    pub fn with_plans(plans: Vec<LanguagePlan>) -> Result<Self> {
        let mut map = BTreeMap::new();
        for plan in plans {
            let id = plan.id();
            if id.is_empty() || id != id.to_lowercase() {
                return Err(CodeboxError::Config(format!(
                    "language id must be non-empty lowercase: {:?}",
                    id
                )));
            }
            if map.insert(id, plan).is_some() {
                return Err(CodeboxError::Config(format!(
                    "language '{}' registered twice",
                    id
                )));
            }
        }
        Ok(Self {
            plans: map,
            aliases: HashMap::new(),
        })
    }

    pub fn resolve(&self, language: &str) -> Option<&LanguagePlan> {
        let key = language.trim().to_lowercase();
        let canonical = self
            .aliases
            .get(key.as_str())
            .copied()
            .unwrap_or(key.as_str());
        self.plans.get(canonical)
    }

    /// Canonical ids in sorted order.
    pub fn languages(&self) -> Vec<&'static str> {
        self.plans.keys().copied().collect()
    }

    pub fn plans(&self) -> impl Iterator<Item = &LanguagePlan> {
        self.plans.values()
    }

    pub fn len(&self) -> usize {
        self.plans.len()
    }

    pub fn is_empty(&self) -> bool {
        self.plans.is_empty()
    }
}

impl Default for PlanRegistry {
    fn default() -> Self {
        Self::builtin()
    }
}
