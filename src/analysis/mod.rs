//! Aggregate statistics over a parsed export archive.
//!
//! Every query is a read-only pass over all records. Records are visited in archive
//! order and nodes in arena order (depth first through each conversation tree, see
//! [`ConversationRecord`]), so results that depend on encounter order, such as ties
//! in [`ConversationAnalysis::most_chatty_day`], are the same on every run.

mod canvas;
mod media;

use std::collections::{BTreeMap, HashMap};
use std::sync::LazyLock;

use chrono::{DateTime, NaiveDate, Timelike, Utc};
use chrono_tz::Tz;
use regex::Regex;
use serde::Serialize;

use crate::types::{ConversationRecord, Message, ReferenceKind, Role};
use crate::usage::{MonthlyUsage, monthly_model_token_usage};
use crate::utils::{resolve_timezone, round2, timestamp_to_utc};

pub use canvas::{
    AcceleratorTag, CodeCanvasStats, CodeReviewStats, DocumentCanvasStats, EmojiStats,
    LanguageCounts, LengthStats, PortStats, ReadingLevelStats, ReviewCounts, SuggestEditStats,
    classify_prompt,
};

/// Key → occurrence count.
pub type Counts = BTreeMap<String, u64>;

/// Credit for composing the first message of a conversation.
const FIRST_MESSAGE_SECONDS: f64 = 30.0;
/// Credit for reading a final assistant reply.
const LAST_REPLY_SECONDS: f64 = 45.0;
/// Assistant → user gaps longer than this are treated as idle time.
const MAX_GAP_SECONDS: f64 = 1800.0;

static CODE_FENCE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"```([A-Za-z0-9_]+)").expect("valid code fence regex"));

fn bump(counts: &mut Counts, key: &str) {
    match counts.get_mut(key) {
        Some(count) => *count += 1,
        None => {
            counts.insert(key.to_string(), 1);
        }
    }
}

/// A value kept separately for user and assistant messages.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct ByRole<T> {
    pub user: T,
    pub assistant: T,
}

impl<T> ByRole<T> {
    fn get_mut(&mut self, role: &Role) -> Option<&mut T> {
        match role {
            Role::User => Some(&mut self.user),
            Role::Assistant => Some(&mut self.assistant),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct RoleMessageData {
    pub overall: Counts,
    pub gpts: Counts,
    pub voice: ByRole<u64>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct ChattyDay {
    /// `None` when no message has a usable timestamp.
    pub date: Option<NaiveDate>,
    pub count: u64,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Shift {
    Morning,
    Afternoon,
    Evening,
    Night,
}

impl Shift {
    pub fn from_hour(hour: u32) -> Self {
        match hour {
            6..=11 => Shift::Morning,
            12..=16 => Shift::Afternoon,
            17..=20 => Shift::Evening,
            _ => Shift::Night,
        }
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct ShiftCounts {
    pub morning: u64,
    pub afternoon: u64,
    pub evening: u64,
    pub night: u64,
    pub unspecified: u64,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ShiftReport {
    pub shifts: ShiftCounts,
    /// Messages placed in a shift; excludes `unspecified`.
    pub total_shift_messages: u64,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize)]
pub struct TimeSpent {
    pub seconds: f64,
    pub hours: f64,
    pub days: f64,
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct FirstAndLastUsed {
    pub first_used: DateTime<Utc>,
    pub last_used: DateTime<Utc>,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct DayActivity {
    pub total_messages: u64,
    pub total_conversations: u64,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct LongestConversation {
    pub id: String,
    pub title: String,
    pub message_count: u64,
    pub role_distribution: Counts,
    pub first_used: DateTime<Utc>,
    pub last_used: DateTime<Utc>,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ModelSelectionCount {
    /// Messages sent with the `auto` model picker.
    pub default_model_count: u64,
    /// Messages sent with an explicitly chosen model.
    pub specific_model_count: u64,
}

/// Every statistic in one serializable value.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct DashboardSummary {
    pub total_conversations: u64,
    pub total_gpts_conversations: u64,
    pub total_messages: u64,
    pub total_gpts_messages: u64,
    pub role_based_message_data: RoleMessageData,
    pub most_chatty_day: ChattyDay,
    pub shift_wise_message_count: ShiftReport,
    pub time_spent: TimeSpent,
    pub average_daily_message_count: f64,
    pub model_wise_message_count: Counts,
    pub first_and_last_used: FirstAndLastUsed,
    pub date_wise_activity: BTreeMap<NaiveDate, DayActivity>,
    pub total_archived_conversations: u64,
    pub default_model_slug_count: Counts,
    pub model_adjustments_count: Counts,
    pub status_count: ByRole<Counts>,
    pub finish_details_type_count: Counts,
    pub total_voice_messages: u64,
    pub total_images_generated: u64,
    pub gizmo_image_count: u64,
    pub tool_image_count: u64,
    pub picture_v2_image_count: u64,
    pub user_attachment_mime_type_count: Counts,
    pub tool_name_count: Counts,
    pub recipient_count: Counts,
    pub channel_count: Counts,
    pub location_codes: ByRole<Counts>,
    pub requested_model_count: Counts,
    pub assistant_code_block_count: Counts,
    pub custom_instruction_message_count: u64,
    pub user_targeted_reply_count: u64,
    pub user_system_hints_count: Counts,
    pub webpage_count: u64,
    pub longest_conversation: Option<LongestConversation>,
    pub document_canvas_stats: DocumentCanvasStats,
    pub code_canvas_stats: CodeCanvasStats,
    pub canvas_code_block_count: LanguageCounts,
    pub default_and_specific_model_message_count: ModelSelectionCount,
    pub unrecognized_metadata_keys: Counts,
    pub monthly_model_token_usage: MonthlyUsage,
}

/// Read-only statistics engine over one archive.
///
/// Calendar-based queries (days, shifts, months) use `tz`.
#[derive(Debug, Clone)]
pub struct ConversationAnalysis {
    records: Vec<ConversationRecord>,
    tz: Tz,
}

impl ConversationAnalysis {
    pub fn new(records: Vec<ConversationRecord>, tz: Tz) -> Self {
        Self { records, tz }
    }

    /// Bucket calendar data in the machine's own time zone.
    pub fn with_system_timezone(records: Vec<ConversationRecord>) -> Self {
        Self::new(records, resolve_timezone(None))
    }

    pub fn records(&self) -> &[ConversationRecord] {
        &self.records
    }

    pub fn timezone(&self) -> Tz {
        self.tz
    }

    fn messages(&self) -> impl Iterator<Item = &Message> {
        self.records.iter().flat_map(ConversationRecord::messages)
    }

    fn gpts_records(&self) -> impl Iterator<Item = &ConversationRecord> {
        self.records.iter().filter(|r| r.is_custom_agent())
    }

    fn local_date(&self, timestamp: f64) -> Option<NaiveDate> {
        timestamp_to_utc(timestamp).map(|dt| dt.with_timezone(&self.tz).date_naive())
    }

    pub fn total_conversations(&self) -> u64 {
        self.records.len() as u64
    }

    pub fn total_gpts_conversations(&self) -> u64 {
        self.gpts_records().count() as u64
    }

    pub fn total_messages(&self) -> u64 {
        self.messages().count() as u64
    }

    pub fn total_gpts_messages(&self) -> u64 {
        self.gpts_records().map(|r| r.message_count() as u64).sum()
    }

    pub fn role_based_message_count(&self) -> Counts {
        role_counts(self.messages())
    }

    pub fn role_based_gpts_message_count(&self) -> Counts {
        role_counts(self.gpts_records().flat_map(ConversationRecord::messages))
    }

    /// Voice-mode messages per role. Both keys are always present.
    pub fn role_based_voice_message_count(&self) -> ByRole<u64> {
        let mut counts = ByRole::default();
        for message in self.messages().filter(|m| m.metadata.voice_mode_message) {
            if let Some(count) = counts.get_mut(message.role()) {
                *count += 1;
            }
        }
        counts
    }

    pub fn role_based_message_data(&self) -> RoleMessageData {
        RoleMessageData {
            overall: self.role_based_message_count(),
            gpts: self.role_based_gpts_message_count(),
            voice: self.role_based_voice_message_count(),
        }
    }

    /// Local date with the most messages. Ties go to the date seen first.
    pub fn most_chatty_day(&self) -> ChattyDay {
        // date → (count, first-seen order)
        let mut days: HashMap<NaiveDate, (u64, usize)> = HashMap::new();
        for date in self
            .messages()
            .filter_map(|m| m.create_time)
            .filter_map(|t| self.local_date(t))
        {
            let seen = days.len();
            days.entry(date).or_insert((0, seen)).0 += 1;
        }

        days.into_iter()
            .max_by(|(_, (a_count, a_seen)), (_, (b_count, b_seen))| {
                a_count.cmp(b_count).then(b_seen.cmp(a_seen))
            })
            .map(|(date, (count, _))| ChattyDay {
                date: Some(date),
                count,
            })
            .unwrap_or_default()
    }

    pub fn shift_wise_message_count(&self) -> ShiftReport {
        let mut report = ShiftReport::default();
        for message in self.messages() {
            let local = message
                .create_time
                .and_then(timestamp_to_utc)
                .map(|dt| dt.with_timezone(&self.tz));
            let Some(local) = local else {
                report.shifts.unspecified += 1;
                continue;
            };

            let bucket = match Shift::from_hour(local.hour()) {
                Shift::Morning => &mut report.shifts.morning,
                Shift::Afternoon => &mut report.shifts.afternoon,
                Shift::Evening => &mut report.shifts.evening,
                Shift::Night => &mut report.shifts.night,
            };
            *bucket += 1;
            report.total_shift_messages += 1;
        }
        report
    }

    /// Estimated active time.
    ///
    /// Per conversation: 30 s for the first message, every assistant → user gap of
    /// at most 30 minutes, and 45 s when the assistant has the last word.
    pub fn time_spent(&self) -> TimeSpent {
        let mut total = 0.0;

        for record in &self.records {
            let mut timeline: Vec<(f64, &Role)> = record
                .messages()
                .filter(|m| *m.role() != Role::System && m.content.has_parts())
                .filter_map(|m| {
                    let time = m.create_time.filter(|t| *t != 0.0 && !t.is_nan())?;
                    Some((time, m.role()))
                })
                .collect();
            if timeline.is_empty() {
                continue;
            }
            timeline.sort_by(|a, b| a.0.total_cmp(&b.0));

            total += FIRST_MESSAGE_SECONDS;
            for pair in timeline.windows(2) {
                let ((from_time, from_role), (to_time, to_role)) = (pair[0], pair[1]);
                if *from_role == Role::Assistant && *to_role == Role::User {
                    let gap = to_time - from_time;
                    if gap > 0.0 && gap <= MAX_GAP_SECONDS {
                        total += gap;
                    }
                }
            }
            if let Some((_, Role::Assistant)) = timeline.last() {
                total += LAST_REPLY_SECONDS;
            }
        }

        TimeSpent {
            seconds: round2(total),
            hours: round2(total / 3600.0),
            days: round2(total / 86400.0),
        }
    }

    /// Messages per active day (days with no messages are not counted).
    pub fn average_daily_message_count(&self) -> f64 {
        let mut days: HashMap<NaiveDate, u64> = HashMap::new();
        for date in self
            .messages()
            .filter_map(|m| m.create_time)
            .filter_map(|t| self.local_date(t))
        {
            *days.entry(date).or_default() += 1;
        }
        if days.is_empty() {
            return 0.0;
        }
        days.values().sum::<u64>() as f64 / days.len() as f64
    }

    pub fn model_wise_message_count(&self) -> Counts {
        let mut counts = Counts::new();
        for message in self.messages() {
            if matches!(message.role(), Role::Assistant | Role::Tool) && message.content.has_parts() {
                let model = message
                    .metadata
                    .model_slug
                    .as_deref()
                    .filter(|m| !m.is_empty())
                    .unwrap_or("unknown");
                bump(&mut counts, model);
            }
        }
        counts
    }

    /// Earliest and latest message timestamps; both "now" when there are none.
    pub fn first_and_last_used(&self) -> FirstAndLastUsed {
        let range = self
            .messages()
            .filter_map(|m| m.create_time)
            .filter_map(timestamp_to_utc)
            .fold(None, |range: Option<(DateTime<Utc>, DateTime<Utc>)>, t| {
                Some(match range {
                    Some((first, last)) => (first.min(t), last.max(t)),
                    None => (t, t),
                })
            });

        let (first_used, last_used) = range.unwrap_or_else(|| {
            let now = Utc::now();
            (now, now)
        });
        FirstAndLastUsed {
            first_used,
            last_used,
        }
    }

    /// Per local date: conversations started and messages sent.
    pub fn date_wise_activity(&self) -> BTreeMap<NaiveDate, DayActivity> {
        let mut activity: BTreeMap<NaiveDate, DayActivity> = BTreeMap::new();
        for record in &self.records {
            if let Some(date) = record.create_time.and_then(|t| self.local_date(t)) {
                activity.entry(date).or_default().total_conversations += 1;
            }
            for date in record
                .messages()
                .filter_map(|m| m.create_time)
                .filter_map(|t| self.local_date(t))
            {
                activity.entry(date).or_default().total_messages += 1;
            }
        }
        activity
    }

    pub fn total_archived_conversations(&self) -> u64 {
        self.records.iter().filter(|r| r.is_archived).count() as u64
    }

    pub fn default_model_slug_count(&self) -> Counts {
        let mut counts = Counts::new();
        for record in &self.records {
            bump(
                &mut counts,
                record.default_model_slug.as_deref().unwrap_or("unknown"),
            );
        }
        counts
    }

    pub fn model_adjustments_count(&self) -> Counts {
        let mut counts = Counts::new();
        for message in self.messages_from(Role::Assistant) {
            for adjustment in &message.metadata.model_adjustments {
                bump(&mut counts, adjustment);
            }
        }
        counts
    }

    /// Message status per role, user and assistant only.
    pub fn status_count(&self) -> ByRole<Counts> {
        let mut counts: ByRole<Counts> = ByRole::default();
        for message in self.messages() {
            let Some(status) = message.status.as_deref().filter(|s| !s.is_empty()) else {
                continue;
            };
            if let Some(role_counts) = counts.get_mut(message.role()) {
                bump(role_counts, status);
            }
        }
        counts
    }

    pub fn finish_details_type_count(&self) -> Counts {
        let mut counts = Counts::new();
        for finish in self
            .messages()
            .filter_map(|m| m.metadata.finish_details_type.as_deref())
        {
            bump(&mut counts, finish);
        }
        counts
    }

    pub fn total_voice_messages(&self) -> u64 {
        self.messages()
            .filter(|m| m.metadata.voice_mode_message)
            .count() as u64
    }

    pub fn user_attachment_mime_type_count(&self) -> Counts {
        let mut counts = Counts::new();
        for message in self.messages_from(Role::User) {
            for mime in message
                .metadata
                .attachments
                .iter()
                .filter_map(|a| a.mime_type.as_deref())
                .filter(|mime| !mime.is_empty())
            {
                bump(&mut counts, mime);
            }
        }
        counts
    }

    pub fn tool_name_count(&self) -> Counts {
        let mut counts = Counts::new();
        for name in self
            .messages_from(Role::Tool)
            .filter_map(Message::author_name)
        {
            bump(&mut counts, name);
        }
        counts
    }

    pub fn recipient_count(&self) -> Counts {
        let mut counts = Counts::new();
        for message in self.messages() {
            bump(&mut counts, message.recipient.as_deref().unwrap_or("unknown"));
        }
        counts
    }

    pub fn channel_count(&self) -> Counts {
        let mut counts = Counts::new();
        for message in self.messages() {
            bump(&mut counts, message.channel.as_deref().unwrap_or("unknown"));
        }
        counts
    }

    /// Three-letter edge location taken from the tail of each `request_id`.
    pub fn location_codes(&self) -> ByRole<Counts> {
        let mut counts: ByRole<Counts> = ByRole::default();
        for message in self.messages() {
            let Some(code) = message
                .metadata
                .request_id
                .as_deref()
                .and_then(location_code)
            else {
                continue;
            };
            if let Some(role_counts) = counts.get_mut(message.role()) {
                bump(role_counts, code);
            }
        }
        counts
    }

    pub fn requested_model_count(&self) -> Counts {
        let mut counts = Counts::new();
        for model in self
            .messages_from(Role::Assistant)
            .filter_map(|m| m.metadata.requested_model_slug.as_deref())
        {
            bump(&mut counts, model);
        }
        counts
    }

    /// Fenced code blocks in assistant text, keyed by the fence's language tag.
    pub fn assistant_code_block_count(&self) -> Counts {
        let mut counts = Counts::new();
        for text in self
            .messages_from(Role::Assistant)
            .flat_map(|m| m.content.text_parts())
        {
            for capture in CODE_FENCE.captures_iter(text) {
                if let Some(language) = capture.get(1) {
                    bump(&mut counts, language.as_str());
                }
            }
        }
        counts
    }

    pub fn custom_instruction_message_count(&self) -> u64 {
        self.messages_from(Role::User)
            .filter(|m| m.metadata.is_user_system_message)
            .count() as u64
    }

    pub fn user_targeted_reply_count(&self) -> u64 {
        self.messages_from(Role::User)
            .filter(|m| m.metadata.targeted_reply)
            .count() as u64
    }

    pub fn user_system_hints_count(&self) -> Counts {
        let mut counts = Counts::new();
        for message in self.messages_from(Role::User) {
            for hint in &message.metadata.system_hints {
                bump(&mut counts, hint);
            }
        }
        counts
    }

    /// Web citations across both export generations.
    ///
    /// Legacy `_cite_metadata` lists only count on tool messages; `content_references`
    /// count on any message.
    pub fn webpage_count(&self) -> u64 {
        let mut total = 0;
        for message in self.messages() {
            let citations = &message.metadata.citations;
            if *message.role() == Role::Tool {
                total += citations
                    .legacy
                    .iter()
                    .filter(|kind| **kind == ReferenceKind::Webpage)
                    .count();
            }
            total += citations
                .content_references
                .iter()
                .filter(|kind| kind.is_webpage())
                .count();
        }
        total as u64
    }

    /// Conversation with the most messages that has at least one usable timestamp.
    ///
    /// Only a strictly larger count replaces the current leader.
    pub fn longest_conversation(&self) -> Option<LongestConversation> {
        let mut longest: Option<LongestConversation> = None;

        for record in &self.records {
            let message_count = record.message_count() as u64;
            if message_count == 0 {
                continue;
            }
            if longest
                .as_ref()
                .is_some_and(|l| message_count <= l.message_count)
            {
                continue;
            }

            let range = record
                .messages()
                .flat_map(|m| [m.create_time, m.update_time])
                .flatten()
                .filter_map(timestamp_to_utc)
                .fold(None, |range: Option<(DateTime<Utc>, DateTime<Utc>)>, t| {
                    Some(match range {
                        Some((first, last)) => (first.min(t), last.max(t)),
                        None => (t, t),
                    })
                });
            let Some((first_used, last_used)) = range else {
                continue;
            };

            longest = Some(LongestConversation {
                id: record.id.clone().unwrap_or_else(|| "unknown".to_string()),
                title: record
                    .title
                    .clone()
                    .filter(|t| !t.is_empty())
                    .unwrap_or_else(|| "Untitled".to_string()),
                message_count,
                role_distribution: role_counts(record.messages()),
                first_used,
                last_used,
            });
        }

        longest
    }

    /// Messages tagged with the model picker state: `auto` vs. an explicit model.
    pub fn default_and_specific_model_message_count(&self) -> ModelSelectionCount {
        let mut counts = ModelSelectionCount::default();
        for slug in self
            .messages()
            .filter_map(|m| m.metadata.default_model_slug.as_deref())
        {
            if slug == "auto" {
                counts.default_model_count += 1;
            } else {
                counts.specific_model_count += 1;
            }
        }
        counts
    }

    /// Metadata keys this crate does not interpret, for spotting export format drift.
    pub fn unrecognized_metadata_keys(&self) -> Counts {
        let mut counts = Counts::new();
        for key in self.messages().flat_map(|m| &m.metadata.unrecognized) {
            bump(&mut counts, key);
        }
        counts
    }

    pub fn monthly_model_token_usage(&self) -> MonthlyUsage {
        monthly_model_token_usage(&self.records, &self.tz)
    }

    pub fn summary(&self) -> DashboardSummary {
        let summary = DashboardSummary {
            total_conversations: self.total_conversations(),
            total_gpts_conversations: self.total_gpts_conversations(),
            total_messages: self.total_messages(),
            total_gpts_messages: self.total_gpts_messages(),
            role_based_message_data: self.role_based_message_data(),
            most_chatty_day: self.most_chatty_day(),
            shift_wise_message_count: self.shift_wise_message_count(),
            time_spent: self.time_spent(),
            average_daily_message_count: self.average_daily_message_count(),
            model_wise_message_count: self.model_wise_message_count(),
            first_and_last_used: self.first_and_last_used(),
            date_wise_activity: self.date_wise_activity(),
            total_archived_conversations: self.total_archived_conversations(),
            default_model_slug_count: self.default_model_slug_count(),
            model_adjustments_count: self.model_adjustments_count(),
            status_count: self.status_count(),
            finish_details_type_count: self.finish_details_type_count(),
            total_voice_messages: self.total_voice_messages(),
            total_images_generated: self.total_images_generated(),
            gizmo_image_count: self.gizmo_image_count(),
            tool_image_count: self.tool_image_count(),
            picture_v2_image_count: self.picture_v2_image_count(),
            user_attachment_mime_type_count: self.user_attachment_mime_type_count(),
            tool_name_count: self.tool_name_count(),
            recipient_count: self.recipient_count(),
            channel_count: self.channel_count(),
            location_codes: self.location_codes(),
            requested_model_count: self.requested_model_count(),
            assistant_code_block_count: self.assistant_code_block_count(),
            custom_instruction_message_count: self.custom_instruction_message_count(),
            user_targeted_reply_count: self.user_targeted_reply_count(),
            user_system_hints_count: self.user_system_hints_count(),
            webpage_count: self.webpage_count(),
            longest_conversation: self.longest_conversation(),
            document_canvas_stats: self.document_canvas_stats(),
            code_canvas_stats: self.code_canvas_stats(),
            canvas_code_block_count: self.canvas_code_block_count(),
            default_and_specific_model_message_count: self
                .default_and_specific_model_message_count(),
            unrecognized_metadata_keys: self.unrecognized_metadata_keys(),
            monthly_model_token_usage: self.monthly_model_token_usage(),
        };

        tracing::debug!(
            conversations = summary.total_conversations,
            messages = summary.total_messages,
            "Computed dashboard summary"
        );
        summary
    }

    fn messages_from(&self, role: Role) -> impl Iterator<Item = &Message> {
        self.messages().filter(move |m| *m.role() == role)
    }
}

fn role_counts<'a>(messages: impl Iterator<Item = &'a Message>) -> Counts {
    let mut counts = Counts::new();
    for message in messages {
        bump(&mut counts, message.role().as_str());
    }
    counts
}

/// Segment after the last `-`, if it is exactly three UTF-16 code units long.
fn location_code(request_id: &str) -> Option<&str> {
    request_id
        .rsplit('-')
        .next()
        .filter(|code| code.encode_utf16().count() == 3)
}

#[cfg(test)]
mod tests;
