//! Monthly token usage per model, and its cost under a [`PricingTable`].

use std::collections::BTreeMap;
use std::fmt;

use chrono::Datelike;
use chrono_tz::Tz;
use serde::{Serialize, Serializer};

use crate::pricing::PricingTable;
use crate::tokens::count_tokens;
use crate::types::{ConversationNode, ConversationRecord, Message, Role};
use crate::utils::timestamp_to_utc;

const MONTH_NAMES: [&str; 12] = [
    "Jan", "Feb", "Mar", "Apr", "May", "Jun", "Jul", "Aug", "Sep", "Oct", "Nov", "Dec",
];

/// Calendar month in the analysis time zone. Orders chronologically, prints as `Jan-24`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct MonthKey {
    pub year: i32,
    /// 1-12
    pub month: u32,
}

impl fmt::Display for MonthKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = MONTH_NAMES
            .get(self.month.saturating_sub(1) as usize)
            .copied()
            .unwrap_or("???");
        write!(f, "{}-{:02}", name, self.year.rem_euclid(100))
    }
}

impl Serialize for MonthKey {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_str(self)
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct TokenUsage {
    pub user_tokens: u64,
    pub assistant_tokens: u64,
}

impl TokenUsage {
    pub fn is_empty(&self) -> bool {
        self.user_tokens == 0 && self.assistant_tokens == 0
    }
}

/// `{month → {model → usage}}`
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
#[serde(transparent)]
pub struct MonthlyUsage(pub BTreeMap<MonthKey, BTreeMap<String, TokenUsage>>);

#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CostBreakdown {
    pub user_tokens: u64,
    pub assistant_tokens: u64,
    pub input_cost: f64,
    pub output_cost: f64,
    pub total_cost: f64,
}

impl CostBreakdown {
    fn add(&mut self, model: &str, usage: &TokenUsage, pricing: &PricingTable) {
        let input_cost = pricing.input_cost(model, usage.user_tokens);
        let output_cost = pricing.output_cost(model, usage.assistant_tokens);
        self.user_tokens += usage.user_tokens;
        self.assistant_tokens += usage.assistant_tokens;
        self.input_cost += input_cost;
        self.output_cost += output_cost;
        self.total_cost += input_cost + output_cost;
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CostReport {
    pub months: BTreeMap<MonthKey, CostBreakdown>,
    pub models: BTreeMap<String, CostBreakdown>,
    pub totals: CostBreakdown,
}

impl MonthlyUsage {
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn get(&self, month: MonthKey, model: &str) -> Option<&TokenUsage> {
        self.0.get(&month)?.get(model)
    }

    fn add(&mut self, month: MonthKey, model: String, role: &Role, tokens: u64) {
        let usage = self.0.entry(month).or_default().entry(model).or_default();
        match role {
            Role::User => usage.user_tokens += tokens,
            Role::Assistant => usage.assistant_tokens += tokens,
            _ => {}
        }
    }

    fn prune(&mut self) {
        for models in self.0.values_mut() {
            models.retain(|_, usage| !usage.is_empty());
        }
        self.0.retain(|_, models| !models.is_empty());
    }

    /// Cost per month, per model and overall.
    pub fn costs(&self, pricing: &PricingTable) -> CostReport {
        let mut report = CostReport::default();
        for (month, models) in &self.0 {
            let month_cost = report.months.entry(*month).or_default();
            for (model, usage) in models {
                month_cost.add(model, usage, pricing);
                report
                    .models
                    .entry(model.clone())
                    .or_default()
                    .add(model, usage, pricing);
                report.totals.add(model, usage, pricing);
            }
        }
        report
    }

    /// Overall tokens and cost.
    pub fn totals(&self, pricing: &PricingTable) -> CostBreakdown {
        let mut totals = CostBreakdown::default();
        for models in self.0.values() {
            for (model, usage) in models {
                totals.add(model, usage, pricing);
            }
        }
        totals
    }
}

/// Bucket estimated user/assistant tokens by local calendar month and model.
///
/// Only user and assistant messages with a timestamp and at least one non-empty
/// text part count. User turns carry no model tag, so they are attributed to the
/// model of their first reply.
pub fn monthly_model_token_usage(records: &[ConversationRecord], tz: &Tz) -> MonthlyUsage {
    let mut usage = MonthlyUsage::default();

    for record in records {
        for node in record.nodes() {
            let Some(message) = &node.message else {
                continue;
            };
            let role = message.role();
            if !matches!(role, Role::User | Role::Assistant) {
                continue;
            }
            let Some(create_time) = message.create_time.filter(|t| *t != 0.0) else {
                continue;
            };

            let tokens = count_tokens(&message.content.joined_text());
            if tokens == 0 {
                continue;
            }

            let Some(date) = timestamp_to_utc(create_time).map(|dt| dt.with_timezone(tz)) else {
                continue;
            };
            let month = MonthKey {
                year: date.year(),
                month: date.month(),
            };

            usage.add(month, model_for(record, node, message), role, tokens);
        }
    }

    usage.prune();
    usage
}

fn model_for(record: &ConversationRecord, node: &ConversationNode, message: &Message) -> String {
    if let Some(model) = &message.metadata.model_slug {
        return model.clone();
    }
    if *message.role() == Role::User
        && let Some(model) = record
            .first_child_message(node)
            .and_then(|reply| reply.metadata.model_slug.as_ref())
    {
        return model.clone();
    }
    "unknown".to_string()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::archive::parse_archive_str;

    // 2024-01-15T12:00:00Z
    const JAN_15: f64 = 1_705_320_000.0;
    // 2024-02-10T12:00:00Z
    const FEB_10: f64 = 1_707_566_400.0;

    const JAN: MonthKey = MonthKey {
        year: 2024,
        month: 1,
    };
    const FEB: MonthKey = MonthKey {
        year: 2024,
        month: 2,
    };

    fn fixture() -> Vec<ConversationRecord> {
        let json = format!(
            r#"[{{
                "id": "c1",
                "mapping": {{
                    "root": {{"id": "root", "message": null, "children": ["u1"]}},
                    "u1": {{"id": "u1", "parent": "root", "children": ["a1"], "message": {{
                        "author": {{"role": "user"}},
                        "create_time": {JAN_15},
                        "content": {{"content_type": "text", "parts": ["abcdefgh"]}},
                        "metadata": {{}}
                    }}}},
                    "a1": {{"id": "a1", "parent": "u1", "children": ["u2"], "message": {{
                        "author": {{"role": "assistant"}},
                        "create_time": {JAN_15},
                        "content": {{"content_type": "text", "parts": ["abcd", "efgh"]}},
                        "metadata": {{"model_slug": "gpt-4o"}}
                    }}}},
                    "u2": {{"id": "u2", "parent": "a1", "children": [], "message": {{
                        "author": {{"role": "user"}},
                        "create_time": {FEB_10},
                        "content": {{"content_type": "text", "parts": ["orphan question"]}},
                        "metadata": {{}}
                    }}}},
                    "t1": {{"id": "t1", "children": [], "message": {{
                        "author": {{"role": "tool", "name": "browser"}},
                        "create_time": {FEB_10},
                        "content": {{"content_type": "text", "parts": ["tool output is ignored"]}},
                        "metadata": {{"model_slug": "gpt-4o"}}
                    }}}},
                    "e1": {{"id": "e1", "children": [], "message": {{
                        "author": {{"role": "assistant"}},
                        "create_time": {FEB_10},
                        "content": {{"content_type": "text", "parts": [""]}},
                        "metadata": {{"model_slug": "o3"}}
                    }}}},
                    "n1": {{"id": "n1", "children": [], "message": {{
                        "author": {{"role": "assistant"}},
                        "create_time": null,
                        "content": {{"content_type": "text", "parts": ["no timestamp"]}},
                        "metadata": {{"model_slug": "o3"}}
                    }}}}
                }}
            }}]"#
        );
        parse_archive_str(&json).expect("fixture parses")
    }

    #[test]
    fn buckets_tokens_by_month_and_model() {
        let usage = monthly_model_token_usage(&fixture(), &Tz::UTC);

        // User turn inherits the reply's model; 8 chars → 2 tokens.
        // Assistant parts join with a space: 9 chars → 3 tokens.
        assert_eq!(
            usage.get(JAN, "gpt-4o"),
            Some(&TokenUsage {
                user_tokens: 2,
                assistant_tokens: 3,
            })
        );
        // Leaf user turn has no reply to borrow a model from.
        assert_eq!(
            usage.get(FEB, "unknown"),
            Some(&TokenUsage {
                user_tokens: 4,
                assistant_tokens: 0,
            })
        );
        // Tool output and empty text never create entries.
        assert_eq!(usage.get(FEB, "gpt-4o"), None);
        assert_eq!(usage.get(FEB, "o3"), None);
        assert_eq!(usage.0.len(), 2);
    }

    #[test]
    fn month_keys_sort_chronologically_and_print_short() {
        let dec = MonthKey {
            year: 2023,
            month: 12,
        };
        assert!(dec < JAN);
        assert!(JAN < FEB);
        assert_eq!(JAN.to_string(), "Jan-24");
        assert_eq!(dec.to_string(), "Dec-23");
    }

    #[test]
    fn month_follows_analysis_time_zone() {
        // 2024-01-31T23:30:00Z is already February in Stockholm.
        let json = r#"[{"mapping": {"a": {"message": {
            "author": {"role": "assistant"},
            "create_time": 1706743800,
            "content": {"parts": ["abcd"]},
            "metadata": {"model_slug": "gpt-4o"}
        }}}}]"#;
        let records = parse_archive_str(json).expect("parses");

        let utc = monthly_model_token_usage(&records, &Tz::UTC);
        assert!(utc.get(JAN, "gpt-4o").is_some());

        let stockholm = monthly_model_token_usage(&records, &chrono_tz::Europe::Stockholm);
        assert!(stockholm.get(FEB, "gpt-4o").is_some());
    }

    #[test]
    fn costs_use_input_price_for_user_and_output_price_for_assistant() {
        let mut usage = MonthlyUsage::default();
        usage.add(JAN, "gpt-4o".into(), &Role::User, 1_000_000);
        usage.add(JAN, "gpt-4o".into(), &Role::Assistant, 1_000_000);
        usage.add(FEB, "mystery".into(), &Role::User, 5_000);

        let report = usage.costs(&PricingTable::builtin());
        let jan = report.months[&JAN];
        assert!((jan.input_cost - 2.5).abs() < 1e-9);
        assert!((jan.output_cost - 10.0).abs() < 1e-9);
        assert!((jan.total_cost - 12.5).abs() < 1e-9);

        assert_eq!(report.months[&FEB].total_cost, 0.0);
        assert_eq!(report.models["mystery"].user_tokens, 5_000);
        assert_eq!(report.totals.user_tokens, 1_005_000);
        assert!((report.totals.total_cost - 12.5).abs() < 1e-9);
    }

    #[test]
    fn empty_archive_has_no_usage() {
        let usage = monthly_model_token_usage(&[], &Tz::UTC);
        assert!(usage.is_empty());
        assert_eq!(usage.costs(&PricingTable::builtin()).totals, CostBreakdown::default());
    }
}
