//! Terminal rendering for answers, hits and diagnostics

use colored::*;

use crate::doctor::{HealthCheck, HealthStatus};
use crate::errors::RagError;
use crate::ingest::IngestReport;
use crate::rag::RagAnswer;
use crate::types::SearchHit;

const RULE_WIDTH: usize = 64;

/// Answer block, then the ranked hits as numbered cards
pub fn render_answer(result: &RagAnswer) -> String {
    let mut out = String::new();

    match (&result.answer, &result.generation_error) {
        (Some(answer), _) => {
            out.push_str(&format!("{}\n", "Answer".bold().cyan()));
            out.push_str(answer.trim());
            out.push('\n');
        }
        (None, error) => {
            out.push_str(&format!("{}\n", "Answer unavailable".bold().yellow()));
            if let Some(error) = error {
                out.push_str(&format!("{}\n", error.dimmed()));
            }
        }
    }

    out.push('\n');
    if result.hits.is_empty() {
        out.push_str(&format!("{}\n", "No matching patents.".dimmed()));
        return out;
    }

    out.push_str(&format!(
        "{}\n",
        format!("Top {} patents", result.hits.len()).bold().cyan()
    ));
    out.push_str(&format!("{}\n", "=".repeat(RULE_WIDTH).cyan()));
    for (idx, hit) in result.hits.iter().enumerate() {
        out.push_str(&render_hit(idx + 1, hit));
        out.push('\n');
    }
    out
}

/// One numbered card: title, url, abstract
pub fn render_hit(rank: usize, hit: &SearchHit) -> String {
    let mut card = format!(
        "{} {}  {}\n",
        format!("{}.", rank).bold(),
        hit.title.bold(),
        format!("(score: {:.3})", hit.score).dimmed()
    );
    if !hit.url.is_empty() {
        card.push_str(&format!("   {}\n", hit.url.blue().underline()));
    }
    card.push_str(&format!("   {}\n", hit.abstract_text));
    card
}

/// Ingestion summary line
pub fn render_ingest_report(report: &IngestReport, index_name: &str) -> String {
    let schema = if report.schema_created {
        "created"
    } else {
        "existing"
    };
    format!(
        "{} Indexed {} patents into {} index '{}' in {:.1}s",
        "✓".green(),
        report.records_indexed,
        schema,
        index_name,
        report.duration.as_secs_f64()
    )
}

/// Diagnostics table
pub fn render_health_checks(checks: &[HealthCheck]) -> String {
    let mut out = format!("\n{}\n\n", "PatentWhisperer Diagnostics".bold().cyan());
    out.push_str(&format!("{:<20} {}\n", "Check", "Status"));
    out.push_str(&format!("{}\n", "=".repeat(50)));

    for check in checks {
        let status = match &check.status {
            HealthStatus::Pass => "PASS".green().to_string(),
            HealthStatus::Warn(msg) => format!("{} {}", "WARN:".yellow(), msg),
            HealthStatus::Fail(msg) => format!("{} {}", "FAIL:".red(), msg),
        };
        out.push_str(&format!("{:<20} {}\n", check.name, status));
    }
    out
}

/// Error line for stderr
pub fn render_error(message: &str) -> String {
    format!("{} {}", "Error:".red().bold(), message)
}

/// Prefix retrieval-stage failures so they read apart from generation or input errors
pub fn label_error(err: Option<&RagError>, message: String) -> String {
    match err {
        Some(err) if err.is_retrieval_error() => format!("Retrieval failed: {}", message),
        _ => message,
    }
}
