// Pattern rules run against the content of every crawled page

use crate::model::{Category, Issue, Severity};
use regex::Regex;
use siteqa_scanner::result::CrawledPage;
use std::sync::LazyLock;

/// Condition under which a rule fires for a page's content.
pub enum Trigger {
    /// Case-sensitive substring match on any of the needles.
    ContainsAny(&'static [&'static str]),
    /// Pattern is present.
    Matches(Regex),
    /// Pattern is absent.
    Lacks(Regex),
    /// `present` matches and `absent` does not.
    MatchesWithout { present: Regex, absent: Regex },
}

impl Trigger {
    pub fn fires(&self, content: &str) -> bool {
        match self {
            Trigger::ContainsAny(needles) => needles.iter().any(|n| content.contains(n)),
            Trigger::Matches(pattern) => pattern.is_match(content),
            Trigger::Lacks(pattern) => !pattern.is_match(content),
            Trigger::MatchesWithout { present, absent } => {
                present.is_match(content) && !absent.is_match(content)
            }
        }
    }
}

pub struct Rule {
    pub category: Category,
    pub severity: Severity,
    pub title: &'static str,
    pub description: &'static str,
    pub mitigation: &'static str,
    pub trigger: Trigger,
}

impl Rule {
    pub fn check(&self, content: &str, location: &str) -> Option<Issue> {
        self.trigger.fires(content).then(|| Issue {
            category: self.category,
            severity: self.severity,
            title: self.title.to_string(),
            description: self.description.to_string(),
            location: location.to_string(),
            mitigation: self.mitigation.to_string(),
        })
    }
}

/// Case-insensitive, with `.` stopping at `\r` as well as `\n`.
fn pattern(re: &str) -> Regex {
    Regex::new(&format!("(?iR){}", re)).expect("rule patterns are hardcoded and valid")
}

/// The fixed rule set, in evaluation order.
pub static RULES: LazyLock<Vec<Rule>> = LazyLock::new(|| {
    vec![
        Rule {
            category: Category::Functional,
            severity: Severity::Major,
            title: "Broken Links or Missing Pages",
            description: "Found error pages or broken functionality",
            mitigation: "Check routing configuration and ensure all links are properly implemented",
            trigger: Trigger::ContainsAny(&["404", "error", "not found"]),
        },
        Rule {
            category: Category::Functional,
            severity: Severity::Minor,
            title: "Incomplete Form Implementation",
            description: "Forms found without proper submit buttons",
            mitigation: "Ensure all forms have proper submit buttons and validation",
            trigger: Trigger::MatchesWithout {
                present: pattern("form"),
                absent: pattern("submit|button"),
            },
        },
        Rule {
            category: Category::Smoke,
            severity: Severity::Critical,
            title: "Missing Navigation",
            description: "No navigation elements found on the page",
            mitigation: "Add proper navigation menu to ensure users can navigate the site",
            trigger: Trigger::Lacks(pattern("navigation|nav|menu")),
        },
        Rule {
            category: Category::Smoke,
            severity: Severity::Major,
            title: "Missing Page Title/Header",
            description: "Page lacks proper title or header structure",
            mitigation: "Add descriptive titles and headers for better user experience",
            trigger: Trigger::Lacks(pattern("title|h1|header")),
        },
        Rule {
            category: Category::Regression,
            severity: Severity::Minor,
            title: "Debug Code in Production",
            description: "Found debug or test code that should be removed",
            mitigation: "Remove debug statements and test code from production",
            trigger: Trigger::Matches(pattern(r"console\.error|debug|test")),
        },
        Rule {
            category: Category::Unit,
            severity: Severity::Minor,
            title: "Missing Error Handling",
            description: "JavaScript code found without proper error handling",
            mitigation: "Implement proper error handling in JavaScript functions",
            trigger: Trigger::MatchesWithout {
                present: pattern("javascript|script"),
                absent: pattern("error handling|try.*catch"),
            },
        },
        Rule {
            category: Category::Boundary,
            severity: Severity::Minor,
            title: "Input Validation Needed",
            description: "Numeric inputs found that may need boundary validation",
            mitigation: "Implement proper input validation for min/max values and edge cases",
            trigger: Trigger::Matches(pattern("input.*number|input.*range")),
        },
        Rule {
            category: Category::Boundary,
            severity: Severity::Major,
            title: "Missing Input Validation",
            description: "Sensitive inputs found without proper validation",
            mitigation: "Add client and server-side validation for sensitive input fields",
            trigger: Trigger::MatchesWithout {
                present: pattern("password|email"),
                absent: pattern("validation|required"),
            },
        },
    ]
});

/// Apply every rule to a single page's content.
pub fn evaluate_content(content: &str, location: &str) -> Vec<Issue> {
    RULES
        .iter()
        .filter_map(|rule| rule.check(content, location))
        .collect()
}

/// Apply the rule set to every page, in page order then rule order.
///
/// Pages without a URL are labelled `Page N` (1-based).
pub fn evaluate(pages: &[CrawledPage]) -> Vec<Issue> {
    pages
        .iter()
        .enumerate()
        .flat_map(|(index, page)| {
            let location = page
                .url()
                .map(str::to_string)
                .unwrap_or_else(|| format!("Page {}", index + 1));
            evaluate_content(page.content(), &location)
        })
        .collect()
}
