//! Reply composition: merge routed sections into one carrier-bounded message.

use crate::router::RouterOutput;

/// Appended when a reply is cut at the carrier limit.
pub const TRUNCATION_MARKER: &str = "...";

/// Clamp text to `max_chars` Unicode scalar values. Longer input is cut to
/// exactly `max_chars` and ends with the truncation marker, so a cut is always
/// visible to the recipient.
pub fn truncate_reply(text: &str, max_chars: usize) -> String {
    if text.chars().count() <= max_chars {
        return text.to_string();
    }
    let marker: String = TRUNCATION_MARKER.chars().take(max_chars).collect();
    let keep = max_chars - marker.chars().count();
    let mut out: String = text.chars().take(keep).collect();
    out.push_str(&marker);
    out
}

/// Merge the router's output into one reply no longer than `max_chars`.
/// Sections are joined with newlines, each prefixed by its intent label;
/// fallback text passes through unlabeled.
pub fn compose_reply(output: &RouterOutput, max_chars: usize) -> String {
    let text = match output {
        RouterOutput::Fallback(text) => text.clone(),
        RouterOutput::Sections(sections) => sections
            .iter()
            .map(|s| format!("{}: {}", s.intent.label(), s.text))
            .collect::<Vec<_>>()
            .join("\n"),
    };
    truncate_reply(&text, max_chars)
}
