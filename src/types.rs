use std::collections::HashMap;

use simd_json::OwnedValue;
use simd_json::prelude::*;

/// Template/gizmo id prefix that marks a custom agent ("GPT") conversation.
pub const CUSTOM_AGENT_PREFIX: &str = "g-";

#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum Role {
    System,
    User,
    Assistant,
    Tool,
    Other(String),
    /// The author carried no usable role.
    Unknown,
}

impl Role {
    pub fn parse(role: &str) -> Self {
        match role {
            "system" => Role::System,
            "user" => Role::User,
            "assistant" => Role::Assistant,
            "tool" => Role::Tool,
            "" => Role::Unknown,
            other => Role::Other(other.to_string()),
        }
    }

    pub fn as_str(&self) -> &str {
        match self {
            Role::System => "system",
            Role::User => "user",
            Role::Assistant => "assistant",
            Role::Tool => "tool",
            Role::Other(role) => role,
            Role::Unknown => "unknown",
        }
    }
}

#[derive(Debug, Clone)]
pub struct Author {
    pub role: Role,
    pub name: Option<String>,
}

#[derive(Debug, Clone, Default)]
pub struct DalleMetadata {
    pub gen_id: Option<String>,
    pub prompt: Option<String>,
}

/// A non-text content part (image pointers, tool payloads, ...).
#[derive(Debug, Clone, Default)]
pub struct StructuredPart {
    pub content_type: Option<String>,
    pub dalle: Option<DalleMetadata>,
    pub generation: bool,
}

#[derive(Debug, Clone)]
pub enum ContentPart {
    Text(String),
    Structured(StructuredPart),
    /// null or a bare scalar; kept so part counts match the export.
    Other,
}

#[derive(Debug, Clone, Default)]
pub struct Content {
    pub content_type: Option<String>,
    pub parts: Vec<ContentPart>,
}

impl Content {
    pub fn has_parts(&self) -> bool {
        !self.parts.is_empty()
    }

    pub fn text_parts(&self) -> impl Iterator<Item = &str> {
        self.parts.iter().filter_map(|part| match part {
            ContentPart::Text(text) => Some(text.as_str()),
            _ => None,
        })
    }

    /// String parts joined by a single space.
    pub fn joined_text(&self) -> String {
        self.text_parts().collect::<Vec<_>>().join(" ")
    }
}

#[derive(Debug, Clone, Default)]
pub struct Attachment {
    pub name: Option<String>,
    pub mime_type: Option<String>,
    pub size: Option<u64>,
}

#[derive(Debug, Clone, Default)]
pub struct Accelerator {
    pub id: Option<String>,
    pub prompt: Option<String>,
}

#[derive(Debug, Clone, Default)]
pub struct CanvasMetadata {
    pub textdoc_type: Option<String>,
    pub accelerator: Option<Accelerator>,
    /// Length of `comment_ids`, when it is an array.
    pub comment_count: Option<usize>,
}

impl CanvasMetadata {
    pub fn accelerator_id(&self) -> Option<&str> {
        self.accelerator.as_ref().and_then(|a| a.id.as_deref())
    }

    pub fn accelerator_prompt(&self) -> Option<&str> {
        self.accelerator.as_ref().and_then(|a| a.prompt.as_deref())
    }

    /// Language of a `code/<language>` canvas.
    pub fn code_language(&self) -> Option<&str> {
        let textdoc_type = self.textdoc_type.as_deref()?;
        if !textdoc_type.starts_with("code/") {
            return None;
        }
        textdoc_type.rsplit('/').next().filter(|lang| !lang.is_empty())
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ReferenceKind {
    Webpage,
    GroupedWebpages,
    WebpageExtended,
    Other(String),
}

impl ReferenceKind {
    fn parse(kind: &str) -> Self {
        match kind {
            "webpage" => ReferenceKind::Webpage,
            "grouped_webpages" => ReferenceKind::GroupedWebpages,
            "webpage_extended" => ReferenceKind::WebpageExtended,
            other => ReferenceKind::Other(other.to_string()),
        }
    }

    pub fn is_webpage(&self) -> bool {
        !matches!(self, ReferenceKind::Other(_))
    }
}

/// Citation lists from both export generations. Both may appear in one archive.
#[derive(Debug, Clone, Default)]
pub struct Citations {
    /// `_cite_metadata.metadata_list[].type`
    pub legacy: Vec<ReferenceKind>,
    /// `content_references[].type`
    pub content_references: Vec<ReferenceKind>,
}

const KNOWN_METADATA_KEYS: &[&str] = &[
    "model_slug",
    "requested_model_slug",
    "default_model_slug",
    "gizmo_id",
    "model_adjustments",
    "finish_details",
    "voice_mode_message",
    "attachments",
    "request_id",
    "is_user_system_message",
    "targeted_reply",
    "system_hints",
    "canvas",
    "_cite_metadata",
    "content_references",
];

#[derive(Debug, Clone, Default)]
pub struct MessageMetadata {
    pub model_slug: Option<String>,
    pub requested_model_slug: Option<String>,
    pub default_model_slug: Option<String>,
    pub gizmo_id: Option<String>,
    pub model_adjustments: Vec<String>,
    pub finish_details_type: Option<String>,
    pub voice_mode_message: bool,
    pub attachments: Vec<Attachment>,
    pub request_id: Option<String>,
    pub is_user_system_message: bool,
    pub targeted_reply: bool,
    pub system_hints: Vec<String>,
    pub canvas: Option<CanvasMetadata>,
    pub citations: Citations,
    /// Keys this crate does not interpret.
    pub unrecognized: Vec<String>,
}

#[derive(Debug, Clone)]
pub struct Message {
    pub id: Option<String>,
    pub author: Author,
    pub create_time: Option<f64>,
    pub update_time: Option<f64>,
    pub content: Content,
    pub metadata: MessageMetadata,
    pub status: Option<String>,
    pub recipient: Option<String>,
    pub channel: Option<String>,
}

impl Message {
    pub fn role(&self) -> &Role {
        &self.author.role
    }

    pub fn author_name(&self) -> Option<&str> {
        self.author.name.as_deref()
    }
}

#[derive(Debug, Clone)]
pub struct ConversationNode {
    pub id: String,
    pub parent: Option<String>,
    pub children: Vec<String>,
    pub message: Option<Message>,
}

/// One exported conversation. Nodes live in an arena indexed by their mapping key.
///
/// Arena order is a depth-first walk from the root nodes (sorted by key), visiting
/// children in their listed order. It does not depend on the order of the
/// `mapping` object, which the JSON parser does not preserve.
#[derive(Debug, Clone, Default)]
pub struct ConversationRecord {
    pub id: Option<String>,
    pub title: Option<String>,
    pub create_time: Option<f64>,
    pub update_time: Option<f64>,
    pub conversation_template_id: Option<String>,
    pub gizmo_id: Option<String>,
    pub is_archived: bool,
    pub default_model_slug: Option<String>,
    pub voice: Option<String>,
    nodes: Vec<ConversationNode>,
    index: HashMap<String, usize>,
}

impl ConversationRecord {
    /// Build a record from one element of the export array.
    ///
    /// Returns `None` only when the element is not an object. Every nested field is
    /// optional: anything missing or of the wrong type is treated as absent.
    pub fn from_value(value: &OwnedValue) -> Option<Self> {
        value.as_object()?;

        let mut record = ConversationRecord {
            id: string_field(value, "id"),
            title: string_field(value, "title"),
            create_time: number_field(value, "create_time"),
            update_time: number_field(value, "update_time"),
            conversation_template_id: string_field(value, "conversation_template_id"),
            gizmo_id: string_field(value, "gizmo_id"),
            is_archived: value.get("is_archived").and_then(|v| v.as_bool()) == Some(true),
            default_model_slug: string_field(value, "default_model_slug"),
            voice: string_field(value, "voice"),
            ..Default::default()
        };

        if let Some(mapping) = value.get("mapping").and_then(|v| v.as_object()) {
            let mut pending: HashMap<String, ConversationNode> = mapping
                .iter()
                .map(|(key, node)| (key.to_string(), ConversationNode::from_value(key, node)))
                .collect();

            let mut roots: Vec<String> = pending
                .iter()
                .filter(|(_, node)| {
                    node.parent
                        .as_ref()
                        .is_none_or(|parent| !pending.contains_key(parent))
                })
                .map(|(key, _)| key.clone())
                .collect();
            roots.sort();

            record.nodes.reserve(pending.len());
            for root in roots {
                record.push_subtree(root, &mut pending);
            }

            // Nodes only reachable through a cycle.
            let mut rest: Vec<String> = pending.keys().cloned().collect();
            rest.sort();
            for key in rest {
                record.push_subtree(key, &mut pending);
            }
        }

        Some(record)
    }

    /// Move `root` and its descendants into the arena, depth first in `children` order.
    fn push_subtree(&mut self, root: String, pending: &mut HashMap<String, ConversationNode>) {
        let mut stack = vec![root];
        while let Some(key) = stack.pop() {
            let Some(node) = pending.remove(&key) else {
                continue;
            };
            stack.extend(node.children.as_slice().iter().rev().cloned());
            self.index.insert(key, self.nodes.len());
            self.nodes.push(node);
        }
    }

    pub fn is_custom_agent(&self) -> bool {
        [&self.conversation_template_id, &self.gizmo_id]
            .into_iter()
            .flatten()
            .any(|id| id.starts_with(CUSTOM_AGENT_PREFIX))
    }

    pub fn nodes(&self) -> &[ConversationNode] {
        &self.nodes
    }

    pub fn node(&self, id: &str) -> Option<&ConversationNode> {
        self.index.get(id).map(|&i| &self.nodes[i])
    }

    /// Messages of every node that carries one, in arena order.
    pub fn messages(&self) -> impl Iterator<Item = &Message> {
        self.nodes.iter().filter_map(|node| node.message.as_ref())
    }

    pub fn message_count(&self) -> usize {
        self.messages().count()
    }

    /// Message of the node's first child, if any.
    pub fn first_child_message(&self, node: &ConversationNode) -> Option<&Message> {
        let child = node.children.first()?;
        self.node(child)?.message.as_ref()
    }
}

impl ConversationNode {
    fn from_value(key: &str, value: &OwnedValue) -> Self {
        let children = value
            .get("children")
            .and_then(|v| v.as_array())
            .map(|children| {
                children
                    .iter()
                    .filter_map(|c| c.as_str().map(str::to_string))
                    .collect()
            })
            .unwrap_or_default();

        ConversationNode {
            id: string_field(value, "id").unwrap_or_else(|| key.to_string()),
            parent: string_field(value, "parent"),
            children,
            message: value.get("message").and_then(Message::from_value),
        }
    }
}

impl Message {
    fn from_value(value: &OwnedValue) -> Option<Self> {
        value.as_object()?;

        let author = value.get("author");
        let role = author
            .and_then(|a| a.get("role"))
            .and_then(|r| r.as_str())
            .map(Role::parse)
            .unwrap_or(Role::Unknown);

        Some(Message {
            id: string_field(value, "id"),
            author: Author {
                role,
                name: author.and_then(|a| string_field(a, "name")),
            },
            create_time: number_field(value, "create_time"),
            update_time: number_field(value, "update_time"),
            content: value.get("content").map(Content::from_value).unwrap_or_default(),
            metadata: value
                .get("metadata")
                .map(MessageMetadata::from_value)
                .unwrap_or_default(),
            status: value.get("status").and_then(scalar_to_string),
            recipient: value.get("recipient").and_then(scalar_to_string),
            channel: value.get("channel").and_then(scalar_to_string),
        })
    }
}

impl Content {
    fn from_value(value: &OwnedValue) -> Self {
        let parts = value
            .get("parts")
            .and_then(|v| v.as_array())
            .map(|parts| parts.iter().map(ContentPart::from_value).collect())
            .unwrap_or_default();

        Content {
            content_type: string_field(value, "content_type"),
            parts,
        }
    }
}

impl ContentPart {
    fn from_value(value: &OwnedValue) -> Self {
        if let Some(text) = value.as_str() {
            return ContentPart::Text(text.to_string());
        }
        if value.as_object().is_none() {
            return ContentPart::Other;
        }

        let metadata = value.get("metadata").filter(|m| m.as_object().is_some());
        let dalle = metadata
            .and_then(|m| m.get("dalle"))
            .filter(|d| d.as_object().is_some())
            .map(|d| DalleMetadata {
                gen_id: truthy_string(d, "gen_id"),
                prompt: truthy_string(d, "prompt"),
            });
        let generation = metadata
            .and_then(|m| m.get("generation"))
            .is_some_and(is_truthy);

        ContentPart::Structured(StructuredPart {
            content_type: string_field(value, "content_type"),
            dalle,
            generation,
        })
    }
}

impl MessageMetadata {
    fn from_value(value: &OwnedValue) -> Self {
        let Some(object) = value.as_object() else {
            return MessageMetadata::default();
        };

        let attachments = array_field(value, "attachments")
            .map(|items| {
                items
                    .iter()
                    .filter(|item| item.as_object().is_some())
                    .map(|item| Attachment {
                        name: string_field(item, "name"),
                        mime_type: string_field(item, "mime_type"),
                        size: item.get("size").and_then(|s| s.as_u64()),
                    })
                    .collect()
            })
            .unwrap_or_default();

        let canvas = value
            .get("canvas")
            .filter(|c| c.as_object().is_some())
            .map(|canvas| CanvasMetadata {
                textdoc_type: string_field(canvas, "textdoc_type"),
                accelerator: canvas
                    .get("accelerator_metadata")
                    .filter(|a| a.as_object().is_some())
                    .map(|a| Accelerator {
                        id: string_field(a, "id"),
                        prompt: string_field(a, "prompt"),
                    }),
                comment_count: array_field(canvas, "comment_ids").map(|ids| ids.len()),
            });

        let legacy = value
            .get("_cite_metadata")
            .and_then(|c| array_field(c, "metadata_list"))
            .map(|items| reference_kinds(items))
            .unwrap_or_default();
        let content_references = array_field(value, "content_references")
            .map(|items| reference_kinds(items))
            .unwrap_or_default();

        let unrecognized = object
            .keys()
            .filter(|key| !KNOWN_METADATA_KEYS.contains(&key.as_str()))
            .map(|key| key.to_string())
            .collect();

        MessageMetadata {
            model_slug: string_field(value, "model_slug"),
            requested_model_slug: truthy_string(value, "requested_model_slug"),
            default_model_slug: string_field(value, "default_model_slug"),
            gizmo_id: string_field(value, "gizmo_id"),
            model_adjustments: string_list(value, "model_adjustments"),
            finish_details_type: value
                .get("finish_details")
                .and_then(|f| string_field(f, "type")),
            voice_mode_message: value.get("voice_mode_message").is_some_and(is_truthy),
            attachments,
            request_id: string_field(value, "request_id"),
            is_user_system_message: value
                .get("is_user_system_message")
                .and_then(|v| v.as_bool())
                == Some(true),
            targeted_reply: value.get("targeted_reply").is_some_and(is_truthy),
            system_hints: string_list(value, "system_hints"),
            canvas,
            citations: Citations {
                legacy,
                content_references,
            },
            unrecognized,
        }
    }
}

fn reference_kinds(items: &[OwnedValue]) -> Vec<ReferenceKind> {
    items
        .iter()
        .filter_map(|item| item.get("type").and_then(|t| t.as_str()))
        .map(ReferenceKind::parse)
        .collect()
}

fn string_field(value: &OwnedValue, key: &str) -> Option<String> {
    value.get(key).and_then(|v| v.as_str()).map(str::to_string)
}

/// Like `string_field`, but an empty string counts as absent.
fn truthy_string(value: &OwnedValue, key: &str) -> Option<String> {
    string_field(value, key).filter(|s| !s.is_empty())
}

fn number_field(value: &OwnedValue, key: &str) -> Option<f64> {
    value.get(key).and_then(as_number)
}

fn array_field<'a>(value: &'a OwnedValue, key: &str) -> Option<&'a Vec<OwnedValue>> {
    value.get(key).and_then(|v| v.as_array())
}

fn string_list(value: &OwnedValue, key: &str) -> Vec<String> {
    array_field(value, key)
        .map(|items| {
            items
                .iter()
                .filter_map(|item| item.as_str().map(str::to_string))
                .collect()
        })
        .unwrap_or_default()
}

fn as_number(value: &OwnedValue) -> Option<f64> {
    value
        .as_f64()
        .or_else(|| value.as_i64().map(|n| n as f64))
        .or_else(|| value.as_u64().map(|n| n as f64))
}

/// Loose JSON truthiness: null, false, 0 and "" are false.
pub(crate) fn is_truthy(value: &OwnedValue) -> bool {
    if value.is_null() {
        return false;
    }
    if let Some(flag) = value.as_bool() {
        return flag;
    }
    if let Some(text) = value.as_str() {
        return !text.is_empty();
    }
    if let Some(number) = as_number(value) {
        return number != 0.0 && !number.is_nan();
    }
    true
}

fn scalar_to_string(value: &OwnedValue) -> Option<String> {
    if value.is_null() {
        return None;
    }
    match value.as_str() {
        Some(text) => Some(text.to_string()),
        None => simd_json::to_string(value).ok(),
    }
}
