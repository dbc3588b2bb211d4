//! Canvas accelerator usage.
//!
//! Sub-categories are found by exact prompt text through [`ACCELERATOR_PROMPTS`].
//! A prompt missing from the table still counts towards its category total.

use std::collections::BTreeMap;

use phf::phf_map;
use serde::Serialize;

use super::{ConversationAnalysis, Counts, bump};
use crate::types::{CanvasMetadata, Message, Role};

const COMMENT_TOOL: &str = "canmore.comment_textdoc";
const DOCUMENT_CANVAS: &str = "document";
const CODE_CANVAS_PREFIX: &str = "code/";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AcceleratorTag {
    EmojiWords,
    EmojiSections,
    EmojiLists,
    EmojiRemove,
    ReadingGraduate,
    ReadingCollege,
    ReadingHighSchool,
    ReadingMiddleSchool,
    ReadingKindergarten,
    LengthLongest,
    LengthLonger,
    LengthShorter,
    LengthShortest,
    PortPhp,
    PortCpp,
    PortPython,
    PortJavascript,
    PortTypescript,
    PortJava,
}

static ACCELERATOR_PROMPTS: phf::Map<&'static str, AcceleratorTag> = phf_map! {
    "Replace as many words as possible with emojis." => AcceleratorTag::EmojiWords,
    "Add three emojis at the start or end of every major section or paragraph to give subtle decoration. Do not change the structure of the original text. Do not add emojis to lists." => AcceleratorTag::EmojiSections,
    "Add emojis to lists for visual flair. Do not change the structure of the original text." => AcceleratorTag::EmojiLists,
    "Remove emojis" => AcceleratorTag::EmojiRemove,
    "Rewrite this text at the reading level of a doctoral writer in this subject. You may reply that you adjusted the text to reflect a graduate school reading level, but do not mention the prompt." => AcceleratorTag::ReadingGraduate,
    // No trailing period in the product's template.
    "Rewrite this text at the reading level of a college student majoring in this subject" => AcceleratorTag::ReadingCollege,
    "Rewrite this text at the reading level of a high school student who has taken a couple of classes in this subject." => AcceleratorTag::ReadingHighSchool,
    "Rewrite this text at the reading level of a middle schooler." => AcceleratorTag::ReadingMiddleSchool,
    "Rewrite this text at the reading level of a kindergartener." => AcceleratorTag::ReadingKindergarten,
    "Make this text 75% longer." => AcceleratorTag::LengthLongest,
    "Make this text 50% longer." => AcceleratorTag::LengthLonger,
    "Make this text 50% shorter." => AcceleratorTag::LengthShorter,
    "Make this text 75% shorter." => AcceleratorTag::LengthShortest,
    "Create a new document that rewrites the code in PHP" => AcceleratorTag::PortPhp,
    "Create a new document that rewrites the code in C++" => AcceleratorTag::PortCpp,
    "Create a new document that rewrites the code in Python" => AcceleratorTag::PortPython,
    "Create a new document that rewrites the code in JavaScript" => AcceleratorTag::PortJavascript,
    "Create a new document that rewrites the code in TypeScript" => AcceleratorTag::PortTypescript,
    "Create a new document that rewrites the code in Java" => AcceleratorTag::PortJava,
};

/// Sub-category for a known accelerator prompt.
pub fn classify_prompt(prompt: &str) -> Option<AcceleratorTag> {
    ACCELERATOR_PROMPTS.get(prompt).copied()
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct EmojiStats {
    pub total: u64,
    pub words: u64,
    pub sections: u64,
    pub lists: u64,
    pub remove: u64,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SuggestEditStats {
    pub total_suggest_edits: u64,
    pub total_comments_added: u64,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ReadingLevelStats {
    pub total: u64,
    pub graduate: u64,
    pub college: u64,
    pub high_school: u64,
    pub middle_school: u64,
    pub kindergarten: u64,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct LengthStats {
    pub total: u64,
    pub longest: u64,
    pub longer: u64,
    pub shorter: u64,
    pub shortest: u64,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct DocumentCanvasStats {
    pub emoji: EmojiStats,
    pub suggest_edits: SuggestEditStats,
    pub polish: u64,
    pub reading_level: ReadingLevelStats,
    pub length: LengthStats,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct LanguageCounts {
    pub total: u64,
    pub languages: Counts,
}

impl LanguageCounts {
    fn add(&mut self, language: &str) {
        self.total += 1;
        bump(&mut self.languages, language);
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct ReviewCounts {
    pub reviews: u64,
    pub comments: u64,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct CodeReviewStats {
    pub total: ReviewCounts,
    pub languages: BTreeMap<String, ReviewCounts>,
}

impl CodeReviewStats {
    fn language(&mut self, language: &str) -> &mut ReviewCounts {
        self.languages.entry(language.to_string()).or_default()
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct PortStats {
    pub total: u64,
    pub php: u64,
    pub cpp: u64,
    pub python: u64,
    pub javascript: u64,
    pub typescript: u64,
    pub java: u64,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CodeCanvasStats {
    pub comments: LanguageCounts,
    pub logs: LanguageCounts,
    pub fix_bugs: LanguageCounts,
    pub review: CodeReviewStats,
    pub port: PortStats,
}

/// Accelerator prompt on a user message, when the accelerator has id `id`.
fn user_prompt<'a>(message: &Message, canvas: &'a CanvasMetadata, id: &str) -> Option<&'a str> {
    if *message.role() != Role::User || canvas.accelerator_id() != Some(id) {
        return None;
    }
    canvas.accelerator_prompt()
}

fn is_user_accelerator(message: &Message, canvas: &CanvasMetadata, id: &str) -> bool {
    *message.role() == Role::User && canvas.accelerator_id() == Some(id)
}

/// Comments a `canmore.comment_textdoc` tool call added.
fn tool_comments(message: &Message, canvas: &CanvasMetadata) -> Option<u64> {
    if *message.role() != Role::Tool || message.author_name() != Some(COMMENT_TOOL) {
        return None;
    }
    canvas.comment_count.map(|count| count as u64)
}

impl ConversationAnalysis {
    fn canvas_messages(&self) -> impl Iterator<Item = (&Message, &CanvasMetadata)> {
        self.messages()
            .filter_map(|m| m.metadata.canvas.as_ref().map(|canvas| (m, canvas)))
    }

    pub fn document_canvas_stats(&self) -> DocumentCanvasStats {
        let mut stats = DocumentCanvasStats::default();

        for (message, canvas) in self
            .canvas_messages()
            .filter(|(_, c)| c.textdoc_type.as_deref() == Some(DOCUMENT_CANVAS))
        {
            if let Some(prompt) = user_prompt(message, canvas, "emoji") {
                let emoji = &mut stats.emoji;
                emoji.total += 1;
                match classify_prompt(prompt) {
                    Some(AcceleratorTag::EmojiWords) => emoji.words += 1,
                    Some(AcceleratorTag::EmojiSections) => emoji.sections += 1,
                    Some(AcceleratorTag::EmojiLists) => emoji.lists += 1,
                    Some(AcceleratorTag::EmojiRemove) => emoji.remove += 1,
                    _ => {}
                }
            }

            if is_user_accelerator(message, canvas, "suggest") {
                stats.suggest_edits.total_suggest_edits += 1;
            }
            if let Some(comments) = tool_comments(message, canvas) {
                stats.suggest_edits.total_comments_added += comments;
            }

            if is_user_accelerator(message, canvas, "polish") {
                stats.polish += 1;
            }

            if let Some(prompt) = user_prompt(message, canvas, "reading-level") {
                let level = &mut stats.reading_level;
                level.total += 1;
                match classify_prompt(prompt) {
                    Some(AcceleratorTag::ReadingGraduate) => level.graduate += 1,
                    Some(AcceleratorTag::ReadingCollege) => level.college += 1,
                    Some(AcceleratorTag::ReadingHighSchool) => level.high_school += 1,
                    Some(AcceleratorTag::ReadingMiddleSchool) => level.middle_school += 1,
                    Some(AcceleratorTag::ReadingKindergarten) => level.kindergarten += 1,
                    _ => {}
                }
            }

            if let Some(prompt) = user_prompt(message, canvas, "length") {
                let length = &mut stats.length;
                length.total += 1;
                match classify_prompt(prompt) {
                    Some(AcceleratorTag::LengthLongest) => length.longest += 1,
                    Some(AcceleratorTag::LengthLonger) => length.longer += 1,
                    Some(AcceleratorTag::LengthShorter) => length.shorter += 1,
                    Some(AcceleratorTag::LengthShortest) => length.shortest += 1,
                    _ => {}
                }
            }
        }

        stats
    }

    pub fn code_canvas_stats(&self) -> CodeCanvasStats {
        let mut stats = CodeCanvasStats::default();

        for (message, canvas) in self.canvas_messages() {
            let Some(language) = canvas.code_language() else {
                continue;
            };

            if is_user_accelerator(message, canvas, "comments") {
                stats.comments.add(language);
            }
            if is_user_accelerator(message, canvas, "logs") {
                stats.logs.add(language);
            }
            if is_user_accelerator(message, canvas, "bugs") {
                stats.fix_bugs.add(language);
            }

            if is_user_accelerator(message, canvas, "review") {
                stats.review.total.reviews += 1;
                stats.review.language(language).reviews += 1;
            }
            if let Some(comments) = tool_comments(message, canvas) {
                stats.review.total.comments += comments;
                stats.review.language(language).comments += comments;
            }

            if let Some(prompt) = user_prompt(message, canvas, "port") {
                let port = &mut stats.port;
                port.total += 1;
                match classify_prompt(prompt) {
                    Some(AcceleratorTag::PortPhp) => port.php += 1,
                    Some(AcceleratorTag::PortCpp) => port.cpp += 1,
                    Some(AcceleratorTag::PortPython) => port.python += 1,
                    Some(AcceleratorTag::PortJavascript) => port.javascript += 1,
                    Some(AcceleratorTag::PortTypescript) => port.typescript += 1,
                    Some(AcceleratorTag::PortJava) => port.java += 1,
                    _ => {}
                }
            }
        }

        stats
    }

    /// Code documents written by the canvas tool, in total and per language.
    pub fn canvas_code_block_count(&self) -> LanguageCounts {
        let mut counts = LanguageCounts::default();
        for (_, canvas) in self
            .canvas_messages()
            .filter(|(m, _)| *m.role() == Role::Tool)
        {
            let Some(textdoc_type) = canvas.textdoc_type.as_deref() else {
                continue;
            };
            if !textdoc_type.starts_with(CODE_CANVAS_PREFIX) {
                continue;
            }
            // A bare `code/` still counts towards the total.
            counts.total += 1;
            if let Some(language) = canvas.code_language() {
                bump(&mut counts.languages, language);
            }
        }
        counts
    }
}
