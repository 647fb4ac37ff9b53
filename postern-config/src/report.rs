//! Human-facing diagnostics
//!
//! Renders a [`ConfigError`] against the text it came from:
//!
//! ```text
//! Error: unexpected directive: hostnme
//!    ╭─[ postern.conf:3:5 ]
//!    │
//!  3 │     hostnme mx.example.org
//!    │     ───────────┬──────────
//!    │                ╰──────────── unexpected directive: hostnme
//! ───╯
//! ```

use ariadne::{Config, Label, Report, ReportKind, Source};
use std::ops::Range;

use crate::error::ConfigError;

/// Render `error` with the offending line of `source`.
///
/// Errors without a location, or whose line is not in `source`, are
/// rendered as their plain message.
pub fn render(error: &ConfigError, source: &str) -> String {
    let Some(location) = error.location() else {
        return error.to_string();
    };
    let Some(span) = line_span(source, location.line) else {
        return error.to_string();
    };

    let file = location.file.as_str();
    let detail = error.detail();

    let report = Report::build(ReportKind::Error, (file, span.clone()))
        .with_config(Config::default().with_color(false))
        .with_message(&detail)
        .with_label(Label::new((file, span)).with_message(&detail))
        .finish();

    let mut out = Vec::new();
    match report.write((file, Source::from(source)), &mut out) {
        Ok(()) => String::from_utf8_lossy(&out).into_owned(),
        Err(_) => error.to_string(),
    }
}

/// Character range of the text on 1-based `line`, without surrounding
/// whitespace
fn line_span(source: &str, line: usize) -> Option<Range<usize>> {
    let mut offset = 0;

    for (index, text) in source.split('\n').enumerate() {
        let length = text.chars().count();
        if index + 1 == line {
            let leading = text.chars().take_while(|c| c.is_whitespace()).count();
            let trimmed = text.trim().chars().count();
            let start = offset + leading;
            return Some(start..start + trimmed.max(1));
        }
        offset += length + 1;
    }

    None
}
