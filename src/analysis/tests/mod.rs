//! Aggregation engine tests.
//!
//! Archives are written as JSON and run through the real archive parser, so the
//! tolerant field handling is exercised together with the statistics.

mod counts;
mod temporal;

use chrono_tz::Tz;

use super::ConversationAnalysis;
use crate::archive::parse_archive_str;
use crate::logging;

// ============================================================================
// Timestamps (UTC)
// ============================================================================

/// 2024-01-15T00:00:00Z
pub const JAN_15: f64 = 1_705_276_800.0;
pub const HOUR: f64 = 3600.0;
pub const DAY: f64 = 86_400.0;

// ============================================================================
// Test Helpers
// ============================================================================

pub fn analyze(json: &str) -> ConversationAnalysis {
    analyze_in(json, Tz::UTC)
}

pub fn analyze_in(json: &str, tz: Tz) -> ConversationAnalysis {
    logging::init_test();
    let records = parse_archive_str(json).expect("test archive parses");
    ConversationAnalysis::new(records, tz)
}

pub fn archive(conversations: &[String]) -> String {
    format!("[{}]", conversations.join(", "))
}

/// A conversation whose messages form one chain under a message-less root.
///
/// `fields` is extra top-level JSON (without braces), e.g. `"id": "c1"`.
pub fn conversation(fields: &str, messages: &[String]) -> String {
    let first_child = if messages.is_empty() { "[]" } else { r#"["m0"]"# };
    let mut mapping = vec![format!(
        r#""root": {{"id": "root", "message": null, "parent": null, "children": {first_child}}}"#
    )];
    for (i, message) in messages.iter().enumerate() {
        let parent = if i == 0 {
            "root".to_string()
        } else {
            format!("m{}", i - 1)
        };
        let children = if i + 1 < messages.len() {
            format!(r#"["m{}"]"#, i + 1)
        } else {
            "[]".to_string()
        };
        mapping.push(format!(
            r#""m{i}": {{"id": "m{i}", "parent": "{parent}", "children": {children}, "message": {message}}}"#
        ));
    }

    let separator = if fields.is_empty() { "" } else { ", " };
    format!(
        r#"{{{fields}{separator}"mapping": {{{}}}}}"#,
        mapping.join(", ")
    )
}

/// A message from `role`. `extra` is additional JSON fields, e.g. `"metadata": {...}`.
pub fn message(role: &str, create_time: Option<f64>, extra: &str) -> String {
    authored(&format!(r#"{{"role": "{role}"}}"#), create_time, extra)
}

/// A tool message from the named tool.
pub fn tool(name: &str, create_time: Option<f64>, extra: &str) -> String {
    authored(
        &format!(r#"{{"role": "tool", "name": "{name}"}}"#),
        create_time,
        extra,
    )
}

fn authored(author: &str, create_time: Option<f64>, extra: &str) -> String {
    let time = create_time.map_or_else(|| "null".to_string(), |t| t.to_string());
    let separator = if extra.is_empty() { "" } else { ", " };
    format!(r#"{{"author": {author}, "create_time": {time}{separator}{extra}}}"#)
}

/// A message with a single text part.
pub fn text(role: &str, create_time: Option<f64>, text: &str) -> String {
    message(
        role,
        create_time,
        &format!(r#""content": {{"content_type": "text", "parts": ["{text}"]}}"#),
    )
}

/// A message with a single text part and the given metadata object body.
pub fn with_metadata(role: &str, create_time: Option<f64>, metadata: &str) -> String {
    message(
        role,
        create_time,
        &format!(
            r#""content": {{"content_type": "text", "parts": ["x"]}}, "metadata": {{{metadata}}}"#
        ),
    )
}
