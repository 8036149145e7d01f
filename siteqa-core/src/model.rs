use serde::{Deserialize, Serialize};
use std::fmt;

/// Testing category an issue is filed under.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Category {
    Functional,
    Smoke,
    Regression,
    Unit,
    Boundary,
}

impl Category {
    pub fn as_str(&self) -> &'static str {
        match self {
            Category::Functional => "functional",
            Category::Smoke => "smoke",
            Category::Regression => "regression",
            Category::Unit => "unit",
            Category::Boundary => "boundary",
        }
    }

    pub fn label(&self) -> &'static str {
        match self {
            Category::Functional => "Functional",
            Category::Smoke => "Smoke",
            Category::Regression => "Regression",
            Category::Unit => "Unit",
            Category::Boundary => "Boundary",
        }
    }
}

impl fmt::Display for Category {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Severity {
    Critical,
    Major,
    Minor,
    Info,
}

impl Severity {
    pub fn as_str(&self) -> &'static str {
        match self {
            Severity::Critical => "critical",
            Severity::Major => "major",
            Severity::Minor => "minor",
            Severity::Info => "info",
        }
    }
}

impl fmt::Display for Severity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// One finding emitted by the rule engine for one page.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Issue {
    pub category: Category,
    pub severity: Severity,
    pub title: String,
    pub description: String,
    pub location: String,
    pub mitigation: String,
}
