//! Report rendering
//!
//! A report aggregates one tide's sessions, energy samples, and task links
//! into the representation the caller asked for: structured JSON, a
//! human-readable summary, or a fixed-width table.

use serde_json::{json, Value};
use tides_domain::{ReportFormat, TideReport};

/// Render an aggregated report in the requested format.
pub fn render_report(report: &TideReport, format: ReportFormat) -> Value {
    match format {
        ReportFormat::Json => serde_json::to_value(report).unwrap_or_else(|_| Value::Null),
        ReportFormat::Text => json!({
            "format": "text",
            "content": render_text(report),
        }),
        ReportFormat::Table => json!({
            "format": "table",
            "content": render_table(report),
        }),
    }
}

fn render_text(report: &TideReport) -> String {
    let tide = &report.tide;
    let mut out = format!(
        "Tide '{}' ({}, {})\n",
        tide.name,
        tide.flow_type,
        tide.status.as_str()
    );
    if let (Some(start), Some(end)) = (&tide.start_date, &tide.end_date) {
        out.push_str(&format!("Covers {start} to {end}\n"));
    }
    out.push_str(&format!(
        "{} session(s), {} minute(s) total\n",
        report.session_count, report.total_session_minutes
    ));
    match report.average_energy {
        Some(avg) => out.push_str(&format!(
            "{} energy sample(s), average {avg:.1}/10\n",
            report.energy_sample_count
        )),
        None => out.push_str("No energy samples recorded\n"),
    }
    for link in &report.task_links {
        out.push_str(&format!("Linked: {} ({})\n", link.task_title, link.task_url));
    }
    out
}

fn render_table(report: &TideReport) -> String {
    let mut out = String::from("metric               | value\n---------------------|------\n");
    let mut row = |name: &str, value: String| {
        out.push_str(&format!("{name:<21}| {value}\n"));
    };
    row("tide", report.tide.name.clone());
    row("flow_type", report.tide.flow_type.to_string());
    row("status", report.tide.status.as_str().to_string());
    row("sessions", report.session_count.to_string());
    row("session_minutes", report.total_session_minutes.to_string());
    row("energy_samples", report.energy_sample_count.to_string());
    row(
        "average_energy",
        report
            .average_energy
            .map_or_else(|| "-".to_string(), |avg| format!("{avg:.1}")),
    );
    row("task_links", report.task_links.len().to_string());
    out
}
