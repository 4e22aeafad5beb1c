//! Box-drawn table of agent records for `agentnet agents`.

use agentnet_types::agent::{AgentRecord, AgentStatus};
use chrono::{DateTime, Utc};
use colored::Colorize;

const HEADERS: [&str; 6] = ["ID", "KIND", "STATUS", "ENDPOINT", "CAPABILITIES", "LAST SEEN"];

/// Cell text for one record, in [`HEADERS`] order.
fn cells(record: &AgentRecord, now: DateTime<Utc>) -> [String; 6] {
    let seen = (now - record.last_heartbeat_at).num_seconds().max(0);
    let capabilities: Vec<&str> = record.capabilities.iter().map(String::as_str).collect();
    [
        record.id.clone(),
        record.kind.clone(),
        record.status.to_string(),
        record.endpoint.clone(),
        capabilities.join(","),
        format!("{seen}s ago"),
    ]
}

fn widths(rows: &[[String; 6]]) -> [usize; 6] {
    let mut widths = HEADERS.map(str::len);
    for row in rows {
        for (width, cell) in widths.iter_mut().zip(row) {
            *width = (*width).max(cell.chars().count());
        }
    }
    widths
}

fn border(widths: &[usize; 6], left: char, mid: char, right: char) -> String {
    let segments: Vec<String> = widths.iter().map(|w| "\u{2500}".repeat(w + 2)).collect();
    format!("{left}{}{right}", segments.join(&mid.to_string()))
}

fn line(cells: &[String; 6], widths: &[usize; 6], status_col: Option<AgentStatus>) -> String {
    let rendered: Vec<String> = cells
        .iter()
        .zip(widths)
        .enumerate()
        .map(|(i, (cell, &width))| {
            let padded = format!("{cell:<width$}");
            match (i, status_col) {
                (2, Some(AgentStatus::Active)) => format!(" {} ", padded.as_str().green()),
                (2, Some(_)) => format!(" {} ", padded.as_str().yellow()),
                _ => format!(" {padded} "),
            }
        })
        .collect();
    format!("\u{2502}{}\u{2502}", rendered.join("\u{2502}"))
}

/// Render records as a table, ages relative to `now`.
pub fn render(records: &[AgentRecord], now: DateTime<Utc>) -> String {
    let rows: Vec<[String; 6]> = records.iter().map(|r| cells(r, now)).collect();
    let widths = widths(&rows);
    let headers = HEADERS.map(String::from);

    let mut lines = vec![
        border(&widths, '\u{250c}', '\u{252c}', '\u{2510}'),
        line(&headers, &widths, None),
        border(&widths, '\u{251c}', '\u{253c}', '\u{2524}'),
    ];
    for (row, record) in rows.iter().zip(records) {
        lines.push(line(row, &widths, Some(record.status)));
    }
    lines.push(border(&widths, '\u{2514}', '\u{2534}', '\u{2518}'));
    lines.join("\n")
}
