//! Result cards: one per outcome, in response order.
//!
//! Two renderings are offered. The text card is what the `ebcup` binary
//! prints; the HTML card reproduces the web tool's `result-card` markup so a
//! host page can drop it straight into its results container.

use crate::output::FileOutcome;
use std::fmt::Write;

pub const DOWNLOAD_LABEL: &str = "Download UTF + Report (ZIP)";

/// Plain-text card for one outcome.
pub fn text_card(outcome: &FileOutcome) -> String {
    let mut out = String::new();
    match outcome {
        FileOutcome::Converted(r) => {
            let _ = writeln!(out, "{}", r.filename);
            let _ = writeln!(out, "  Detected Source Encoding: {}", r.used_encoding);
            let _ = writeln!(out, "  Destination Encoding:     {}", r.dest_encoding);
            let _ = writeln!(out, "  Replacement Characters:   {}", r.replacement_count);
            let _ = writeln!(out, "  {}: {}", DOWNLOAD_LABEL, r.zip_download);
        }
        FileOutcome::Rejected { filename, error } => {
            let _ = writeln!(out, "{}", filename);
            let _ = writeln!(out, "  Error: {}", error);
        }
    }
    out
}

/// All cards, separated by a blank line.
pub fn render_text(outcomes: &[FileOutcome]) -> String {
    outcomes
        .iter()
        .map(text_card)
        .collect::<Vec<_>>()
        .join("\n")
}

/// `result-card` markup for one outcome. All server values are escaped.
pub fn html_card(outcome: &FileOutcome) -> String {
    match outcome {
        FileOutcome::Converted(r) => format!(
            "<div class=\"result-card\">\n\
             \x20 <h3>{}</h3>\n\
             \x20 <p>Detected Source Encoding: <strong>{}</strong></p>\n\
             \x20 <p>Destination Encoding: <strong>{}</strong></p>\n\
             \x20 <p>Replacement Characters: {}</p>\n\
             \x20 <div class=\"download-buttons\">\n\
             \x20   <a href=\"{}\" class=\"btn download\">{}</a>\n\
             \x20 </div>\n\
             </div>\n",
            escape_html(&r.filename),
            escape_html(&r.used_encoding),
            escape_html(&r.dest_encoding),
            r.replacement_count,
            escape_html(&r.zip_download),
            DOWNLOAD_LABEL,
        ),
        FileOutcome::Rejected { filename, error } => format!(
            "<div class=\"result-card error\">\n\
             \x20 <h3>{}</h3>\n\
             \x20 <p>{}</p>\n\
             </div>\n",
            escape_html(filename),
            escape_html(error),
        ),
    }
}

/// Cards for every outcome, concatenated in order.
pub fn render_html(outcomes: &[FileOutcome]) -> String {
    outcomes.iter().map(html_card).collect()
}

fn escape_html(s: &str) -> String {
    let mut out = String::with_capacity(s.len());
    for c in s.chars() {
        match c {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            '"' => out.push_str("&quot;"),
            '\'' => out.push_str("&#39;"),
            _ => out.push(c),
        }
    }
    out
}
