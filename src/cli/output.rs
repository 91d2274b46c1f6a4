//! Output formatting for command results
//!
//! JSON and YAML render the result types directly through serde. Human output
//! is a short framed summary per command.

use anyhow::{Context, Result};
use serde::Serialize;

use crate::deploy::PublishResult;
use crate::files::FileSet;
use crate::service::{RefineOutcome, SiteOutcome};
use crate::workspace::MaterializeReport;

const RULE: &str = "\u{2501}\u{2501}\u{2501}\u{2501}\u{2501}\u{2501}\u{2501}\u{2501}\u{2501}\u{2501}\u{2501}\u{2501}\u{2501}\u{2501}\u{2501}\u{2501}\u{2501}\u{2501}\u{2501}\u{2501}\u{2501}\u{2501}\u{2501}\u{2501}\u{2501}\u{2501}\u{2501}\u{2501}\u{2501}\u{2501}";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OutputFormat {
    Json,
    Yaml,
    /// Framed summary for terminals
    Human,
}

pub struct OutputFormatter {
    format: OutputFormat,
}

impl OutputFormatter {
    pub fn new(format: OutputFormat) -> Self {
        Self { format }
    }

    pub fn format_site(&self, outcome: &SiteOutcome) -> Result<String> {
        match self.format {
            OutputFormat::Human => Ok(human_site(outcome)),
            _ => self.structured(outcome, "site result"),
        }
    }

    pub fn format_refinement(&self, outcome: &RefineOutcome) -> Result<String> {
        match self.format {
            OutputFormat::Human => Ok(human_refinement(outcome)),
            _ => self.structured(outcome, "refinement result"),
        }
    }

    pub fn format_publish(&self, result: &PublishResult) -> Result<String> {
        match self.format {
            OutputFormat::Human => Ok(human_publish(result)),
            _ => self.structured(result, "publish result"),
        }
    }

    /// Human output prints each file with its content.
    pub fn format_files(&self, files: &FileSet) -> Result<String> {
        match self.format {
            OutputFormat::Human => Ok(human_files(files)),
            _ => self.structured(files, "file set"),
        }
    }

    fn structured<T: Serialize>(&self, value: &T, what: &str) -> Result<String> {
        match self.format {
            OutputFormat::Yaml => {
                serde_yaml::to_string(value).with_context(|| format!("Failed to serialize {} to YAML", what))
            }
            _ => serde_json::to_string_pretty(value)
                .with_context(|| format!("Failed to serialize {} to JSON", what)),
        }
    }
}

fn header(output: &mut String, title: &str) {
    output.push_str(&format!("\u{2713} {}\n{}\n\n", title, RULE));
}

fn push_report(output: &mut String, report: &MaterializeReport) {
    output.push_str(&format!(
        "Workspace: {}\nFiles:     {} ({} bytes)\n",
        report.root.display(),
        report.files.len(),
        report.total_bytes()
    ));
    for (i, file) in report.files.iter().enumerate() {
        let connector = if i == report.files.len() - 1 {
            "\u{2514}"
        } else {
            "\u{251C}"
        };
        output.push_str(&format!(
            "{}\u{2500} {} ({} bytes{})\n",
            connector,
            file.path,
            file.bytes,
            if file.canonicalized { ", formatted" } else { "" }
        ));
    }
}

fn human_site(outcome: &SiteOutcome) -> String {
    let mut output = String::new();
    header(&mut output, "Site Generated");

    output.push_str(&format!("Project:   {}\n", outcome.project_id));
    push_report(&mut output, &outcome.files);

    match &outcome.publish {
        Some(publish) => {
            output.push('\n');
            output.push_str(&format!(
                "Published: {}\n\u{2514}\u{2500} via {} ({})\n",
                publish.identifier, publish.stage, publish.strategy
            ));
        }
        None => output.push_str("\nPublished: (skipped)\n"),
    }

    output.push_str(&format!("\nCompleted in {}ms\n", outcome.duration_ms));
    output
}

fn human_refinement(outcome: &RefineOutcome) -> String {
    let mut output = String::new();
    header(&mut output, "Refinement");

    output.push_str(&format!("Project: {}\n", outcome.project_id));
    if outcome.files.is_empty() {
        output.push_str("No changes suggested.\n");
        return output;
    }

    output.push_str(&format!("Changed files: {}\n", outcome.files.len()));
    for path in outcome.files.paths() {
        output.push_str(&format!("  - {}\n", path));
    }

    if let Some(report) = &outcome.applied {
        output.push('\n');
        push_report(&mut output, report);
    }
    output
}

fn human_publish(result: &PublishResult) -> String {
    let mut output = String::new();
    header(&mut output, "Published");
    output.push_str(&format!("Identifier: {}\n", result.identifier));
    output.push_str(&format!("Stage:      {}\n", result.stage));
    output.push_str(&format!("Matched by: {}\n", result.strategy));
    output.push_str(&format!("At:         {}\n", result.published_at.to_rfc3339()));
    output
}

fn human_files(files: &FileSet) -> String {
    let mut output = String::new();
    for file in files {
        output.push_str(&format!("--- {} [{}] ---\n", file.path, file.effective_kind()));
        output.push_str(&file.content);
        if !file.content.ends_with('\n') {
            output.push('\n');
        }
    }
    output
}
