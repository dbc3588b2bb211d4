//! Prompt corpus extraction from pasted or uploaded text.

use simd_json::OwnedValue;
use simd_json::prelude::*;

const FLAT_KEYS: [&str; 4] = ["content", "text", "message", "prompt"];

/// Pull prompt strings out of `input`.
///
/// Accepted JSON shapes:
/// - an array of strings;
/// - an array whose items are strings, objects with `messages[]`, or objects with
///   any of the keys `content`, `text`, `message`, `prompt`;
/// - an object with `conversations[]`, each holding `messages[]`.
///
/// A message contributes its `content` string, or its `content.parts` strings
/// joined by a space. Anything else, including invalid JSON, is read as one
/// prompt per non-blank line.
pub fn parse_prompts(input: &str) -> Vec<String> {
    if input.is_empty() {
        return Vec::new();
    }

    let mut bytes = input.as_bytes().to_vec();
    if let Ok(value) = simd_json::from_slice::<OwnedValue>(&mut bytes)
        && let Some(prompts) = prompts_from_json(&value)
    {
        return prompts;
    }

    split_lines(input)
}

fn prompts_from_json(value: &OwnedValue) -> Option<Vec<String>> {
    if let Some(items) = value.as_array() {
        if items.iter().all(|item| item.as_str().is_some()) {
            return Some(
                items
                    .iter()
                    .filter_map(|item| item.as_str().map(str::to_string))
                    .collect(),
            );
        }

        let mut prompts = Vec::new();
        for item in items {
            if let Some(text) = item.as_str() {
                if !text.is_empty() {
                    prompts.push(text.to_string());
                }
                continue;
            }
            if let Some(messages) = item.get("messages").and_then(|m| m.as_array()) {
                prompts.extend(messages.iter().filter_map(message_text));
            } else if item.as_object().is_some() {
                prompts.extend(
                    FLAT_KEYS
                        .iter()
                        .filter_map(|key| item.get(*key).and_then(|v| v.as_str()))
                        .map(str::to_string),
                );
            }
        }
        return Some(prompts);
    }

    let conversations = value.get("conversations").and_then(|c| c.as_array())?;
    let prompts = conversations
        .iter()
        .filter_map(|conversation| conversation.get("messages").and_then(|m| m.as_array()))
        .flatten()
        .filter_map(message_text)
        .collect();
    Some(prompts)
}

fn message_text(message: &OwnedValue) -> Option<String> {
    let content = message.get("content")?;
    if let Some(text) = content.as_str() {
        return Some(text.to_string());
    }
    let parts = content.get("parts").and_then(|p| p.as_array())?;
    let texts: Vec<&str> = parts.iter().filter_map(|part| part.as_str()).collect();
    Some(texts.join(" "))
}

fn split_lines(input: &str) -> Vec<String> {
    input
        .lines()
        .map(str::trim)
        .filter(|line| !line.is_empty())
        .map(str::to_string)
        .collect()
}
