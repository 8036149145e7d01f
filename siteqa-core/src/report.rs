// Scan report aggregation and output formats

use crate::model::{Category, Issue, Severity};
use chrono::{DateTime, Utc};
use colored::Colorize;
use serde::{Deserialize, Serialize};
use std::fs::File;
use std::io::Write;
use std::path::Path;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ReportFormat {
    Text,
    Json,
    Markdown,
}

impl ReportFormat {
    pub fn from_str(s: &str) -> Option<Self> {
        match s.to_lowercase().as_str() {
            "text" => Some(ReportFormat::Text),
            "json" => Some(ReportFormat::Json),
            "markdown" | "md" => Some(ReportFormat::Markdown),
            _ => None,
        }
    }
}

/// Issues sharing one category, in their original relative order.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct IssueGroup<'a> {
    pub category: Category,
    pub issues: Vec<&'a Issue>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SeverityCounts {
    pub critical: usize,
    pub major: usize,
    pub minor: usize,
    pub info: usize,
}

impl SeverityCounts {
    pub fn total(&self) -> usize {
        self.critical + self.major + self.minor + self.info
    }
}

/// Outcome of one completed scan.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ScanReport {
    pub url: String,
    pub pages_scanned: usize,
    pub issues: Vec<Issue>,
    pub started_at: DateTime<Utc>,
    pub finished_at: DateTime<Utc>,
}

impl ScanReport {
    pub fn new(
        url: impl Into<String>,
        pages_scanned: usize,
        issues: Vec<Issue>,
        started_at: DateTime<Utc>,
    ) -> Self {
        Self {
            url: url.into(),
            pages_scanned,
            issues,
            started_at,
            finished_at: Utc::now(),
        }
    }

    pub fn groups(&self) -> Vec<IssueGroup<'_>> {
        group_by_category(&self.issues)
    }

    pub fn severity_counts(&self) -> SeverityCounts {
        let mut counts = SeverityCounts::default();
        for issue in &self.issues {
            match issue.severity {
                Severity::Critical => counts.critical += 1,
                Severity::Major => counts.major += 1,
                Severity::Minor => counts.minor += 1,
                Severity::Info => counts.info += 1,
            }
        }
        counts
    }

    pub fn summary(&self) -> String {
        format!("Found {} potential issues", self.issues.len())
    }
}

/// Group issues by category, keeping categories in first-seen order.
pub fn group_by_category(issues: &[Issue]) -> Vec<IssueGroup<'_>> {
    let mut groups: Vec<IssueGroup<'_>> = Vec::new();

    for issue in issues {
        match groups.iter_mut().find(|g| g.category == issue.category) {
            Some(group) => group.issues.push(issue),
            None => groups.push(IssueGroup {
                category: issue.category,
                issues: vec![issue],
            }),
        }
    }

    groups
}

pub fn render(report: &ScanReport, format: ReportFormat) -> Result<String, serde_json::Error> {
    match format {
        ReportFormat::Text => Ok(generate_text_report(report)),
        ReportFormat::Json => generate_json_report(report),
        ReportFormat::Markdown => Ok(generate_markdown_report(report)),
    }
}

fn colored_severity(severity: Severity) -> String {
    let badge = format!("[{}]", severity.as_str().to_uppercase());
    match severity {
        Severity::Critical => badge.red().bold().to_string(),
        Severity::Major => badge.yellow().bold().to_string(),
        Severity::Minor => badge.blue().to_string(),
        Severity::Info => badge.dimmed().to_string(),
    }
}

pub fn generate_text_report(report: &ScanReport) -> String {
    let rule = "━".repeat(72);
    let mut out = String::new();

    out.push_str(&format!("{}\n", rule));
    out.push_str(&format!("{}\n", "  SITEQA SCAN RESULTS".bold()));
    out.push_str(&format!("{}\n\n", rule));
    out.push_str(&format!("Target:       {}\n", report.url));
    out.push_str(&format!("Pages:        {}\n", report.pages_scanned));
    out.push_str(&format!(
        "Scan Date:    {}\n",
        report.started_at.format("%Y-%m-%d %H:%M:%S UTC")
    ));
    let duration = report.finished_at - report.started_at;
    out.push_str(&format!("Duration:     {} seconds\n\n", duration.num_seconds()));

    if report.issues.is_empty() {
        out.push_str("No issues found. Every page passed the rule checks.\n");
        return out;
    }

    let counts = report.severity_counts();
    out.push_str(&format!("{} Issues Found\n", report.issues.len()));
    for (severity, count) in [
        (Severity::Critical, counts.critical),
        (Severity::Major, counts.major),
        (Severity::Minor, counts.minor),
        (Severity::Info, counts.info),
    ] {
        if count > 0 {
            out.push_str(&format!("  {:<20} {}\n", colored_severity(severity), count));
        }
    }
    out.push('\n');

    for group in report.groups() {
        out.push_str(&format!("{}\n", rule));
        out.push_str(&format!(
            "{} Testing Issues ({})\n",
            group.category.label().bold(),
            group.issues.len()
        ));
        out.push_str(&format!("{}\n\n", rule));

        for issue in group.issues {
            out.push_str(&format!(
                "{} {}\n",
                colored_severity(issue.severity),
                issue.title.bold()
            ));
            out.push_str(&format!("  Location:    {}\n", issue.location.underline()));
            out.push_str(&format!("  Description: {}\n", issue.description));
            out.push_str(&format!("  Suggested Mitigation: {}\n\n", issue.mitigation));
        }
    }

    out.push_str(&format!("{}\n", report.summary()));
    out
}

pub fn generate_json_report(report: &ScanReport) -> Result<String, serde_json::Error> {
    let groups: Vec<serde_json::Value> = report
        .groups()
        .iter()
        .map(|group| {
            serde_json::json!({
                "category": group.category,
                "count": group.issues.len(),
                "issues": group.issues,
            })
        })
        .collect();

    let json_report = serde_json::json!({
        "metadata": {
            "generator": "SiteQA",
            "version": env!("CARGO_PKG_VERSION"),
            "generated_at": Utc::now().to_rfc3339(),
        },
        "target": report.url,
        "pages_scanned": report.pages_scanned,
        "started_at": report.started_at.to_rfc3339(),
        "finished_at": report.finished_at.to_rfc3339(),
        "summary": {
            "total_issues": report.issues.len(),
            "severity_breakdown": report.severity_counts(),
        },
        "issues": report.issues,
        "groups": groups,
    });

    serde_json::to_string_pretty(&json_report)
}

pub fn generate_markdown_report(report: &ScanReport) -> String {
    let mut out = String::new();

    out.push_str("# SiteQA Scan Results\n\n");
    out.push_str(&format!("- **Target:** {}\n", report.url));
    out.push_str(&format!("- **Pages scanned:** {}\n", report.pages_scanned));
    out.push_str(&format!(
        "- **Scan date:** {}\n",
        report.started_at.format("%Y-%m-%d %H:%M:%S UTC")
    ));
    out.push_str(&format!("- **Issues found:** {}\n\n", report.issues.len()));

    for group in report.groups() {
        out.push_str(&format!(
            "## {} Testing Issues ({})\n\n",
            group.category.label(),
            group.issues.len()
        ));
        out.push_str("| Severity | Title | Location | Suggested Mitigation |\n");
        out.push_str("|----------|-------|----------|----------------------|\n");
        for issue in group.issues {
            out.push_str(&format!(
                "| {} | {} | {} | {} |\n",
                issue.severity,
                escape_cell(&issue.title),
                escape_cell(&issue.location),
                escape_cell(&issue.mitigation)
            ));
        }
        out.push('\n');
    }

    out
}

fn escape_cell(text: &str) -> String {
    text.replace('|', "\\|")
}

pub fn save_report(content: &str, path: &Path) -> std::io::Result<()> {
    let mut file = File::create(path)?;
    file.write_all(content.as_bytes())?;
    Ok(())
}
