use anyhow::{Context, Result};
use serde::Deserialize;
use std::{
    collections::HashMap,
    fs,
    path::{Path, PathBuf},
};

/// Coarse grouping of inspectors, used to gate whole rule classes before any
/// per-node work happens.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum StrictnessCategory {
    ControlFlow,
    ProbableBugs,
    Security,
    Performance,
}

impl StrictnessCategory {
    pub fn as_str(&self) -> &'static str {
        match self {
            StrictnessCategory::ControlFlow => "control-flow",
            StrictnessCategory::ProbableBugs => "probable-bugs",
            StrictnessCategory::Security => "security",
            StrictnessCategory::Performance => "performance",
        }
    }
}

/// Per-category and per-rule toggles. Passed into every dispatch pass so a
/// pass's behavior is fully determined by its inputs; nothing is read from
/// ambient state.
#[derive(Clone, Debug, Deserialize, Default)]
#[serde(default)]
pub struct InspectionSettings {
    pub categories: HashMap<StrictnessCategory, bool>,
    pub rules: HashMap<String, bool>,
}

impl InspectionSettings {
    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let content = fs::read_to_string(path)
            .with_context(|| format!("failed to read settings {}", path.display()))?;
        let settings = serde_yaml::from_str(&content)
            .with_context(|| format!("failed to parse {}", path.display()))?;
        Ok(settings)
    }

    pub fn find_config(path: Option<PathBuf>, root: &Path) -> Option<PathBuf> {
        if let Some(path) = path {
            return Some(path);
        }

        for candidate in ["php_inspect.yaml", "php_inspect.yml"] {
            let candidate_path = root.join(candidate);
            if candidate_path.is_file() {
                return Some(candidate_path);
            }
        }

        None
    }

    /// Categories default to enabled unless switched off.
    pub fn category_enabled(&self, category: StrictnessCategory) -> bool {
        self.categories.get(&category).copied().unwrap_or(true)
    }

    /// Rule toggles fall back through `/`-separated prefixes, so
    /// `security: false` disables `security/bypassed_path_traversal`.
    pub fn rule_enabled(&self, rule_name: &str) -> bool {
        let mut candidate = rule_name;
        loop {
            if let Some(enabled) = self.rules.get(candidate) {
                return *enabled;
            }

            match candidate.rfind('/') {
                Some(idx) => candidate = &candidate[..idx],
                None => break,
            }
        }

        true
    }
}
