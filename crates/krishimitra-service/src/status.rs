//! Text rendering for the `status` and `advisories` commands.

use std::fmt::Write;

use time::format_description::well_known::Rfc3339;

use krishimitra_store::StoreSummary;
use krishimitra_types::{Advisory, Timestamp, to_datetime};

/// Format an epoch-millisecond timestamp as RFC 3339, or the raw number if
/// it is out of range.
pub fn format_timestamp(timestamp: Timestamp) -> String {
    to_datetime(timestamp)
        .and_then(|dt| dt.format(&Rfc3339).ok())
        .unwrap_or_else(|| timestamp.to_string())
}

/// Rough age of `timestamp` relative to `now` ("just now", "5 min ago").
pub fn format_age(timestamp: Timestamp, now: Timestamp) -> String {
    let secs = (now - timestamp).max(0) / 1000;
    match secs {
        0..60 => "just now".to_string(),
        60..3600 => format!("{} min ago", secs / 60),
        3600..86400 => format!("{} h ago", secs / 3600),
        _ => format!("{} d ago", secs / 86400),
    }
}

/// Multi-line status summary.
pub fn render_summary(summary: &StoreSummary, now: Timestamp) -> String {
    let mut out = String::new();
    let last_sync = match summary.last_sync {
        Some(ts) => format!("{} ({})", format_timestamp(ts), format_age(ts, now)),
        None => "never".to_string(),
    };
    let _ = writeln!(out, "Last sync:        {}", last_sync);
    let _ = writeln!(out, "Pending actions:  {}", summary.pending_actions);
    let _ = writeln!(out, "Weather records:  {}", summary.weather);
    let _ = writeln!(out, "Soil records:     {}", summary.soil_history);
    let _ = writeln!(
        out,
        "Advisories:       {} ({} unread)",
        summary.advisories, summary.unread_advisories
    );
    out
}

/// One line per advisory, unread ones marked with `*`.
pub fn render_advisories(advisories: &[Advisory], now: Timestamp) -> String {
    if advisories.is_empty() {
        return "No advisories\n".to_string();
    }
    let mut out = String::new();
    for advisory in advisories {
        let _ = writeln!(
            out,
            "{} {:<24} [{}] {} ({})",
            if advisory.is_read { " " } else { "*" },
            advisory.id,
            advisory.category,
            advisory.title,
            format_age(advisory.timestamp, now)
        );
    }
    out
}
