//! Generated image counts.

use super::ConversationAnalysis;
use crate::types::{ContentPart, Message, Role};

/// Gizmo id of the built-in image-generation GPT.
const DALLE_GIZMO_ID: &str = "g-2fkFE8rbu";
const DALLE_TOOL: &str = "dalle.text2im";
/// Tool name used by the second-generation image model.
const PICTURE_V2_TOOL: &str = "t2uay3k.sj1i4kz";
const IMAGE_ASSET_POINTER: &str = "image_asset_pointer";

fn is_tool_call(message: &Message, tool: &str) -> bool {
    *message.role() == Role::Tool && message.author_name() == Some(tool)
}

impl ConversationAnalysis {
    /// Assistant replies from the image GPT that quote their generation prompt.
    pub fn gizmo_image_count(&self) -> u64 {
        self.messages()
            .filter(|m| {
                *m.role() == Role::Assistant
                    && m.metadata.gizmo_id.as_deref() == Some(DALLE_GIZMO_ID)
            })
            .filter(|m| {
                m.content
                    .text_parts()
                    .any(|text| text.to_lowercase().contains("prompt"))
            })
            .count() as u64
    }

    /// `dalle.text2im` results carrying both a generation id and a prompt.
    pub fn tool_image_count(&self) -> u64 {
        self.messages()
            .filter(|m| is_tool_call(m, DALLE_TOOL))
            .filter(|m| {
                m.content.parts.iter().any(|part| match part {
                    ContentPart::Structured(part) => part
                        .dalle
                        .as_ref()
                        .is_some_and(|d| d.gen_id.is_some() && d.prompt.is_some()),
                    _ => false,
                })
            })
            .count() as u64
    }

    /// Gizmo and tool image counts together. The two select disjoint roles.
    pub fn total_images_generated(&self) -> u64 {
        self.gizmo_image_count() + self.tool_image_count()
    }

    /// Image parts produced by the second-generation image tool.
    pub fn picture_v2_image_count(&self) -> u64 {
        self.messages()
            .filter(|m| is_tool_call(m, PICTURE_V2_TOOL))
            .flat_map(|m| &m.content.parts)
            .filter(|part| match part {
                ContentPart::Structured(part) => {
                    part.content_type.as_deref() == Some(IMAGE_ASSET_POINTER)
                        && (part.dalle.is_some() || part.generation)
                }
                _ => false,
            })
            .count() as u64
    }
}
