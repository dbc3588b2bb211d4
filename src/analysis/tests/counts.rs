//! Conversation, message and role totals.

use super::*;
use crate::analysis::Counts;

fn counts(pairs: &[(&str, u64)]) -> Counts {
    pairs.iter().map(|(k, v)| (k.to_string(), *v)).collect()
}

#[test]
fn test_single_exchange_totals() {
    let json = archive(&[conversation(
        r#""id": "c1", "title": "Hello""#,
        &[
            text("user", Some(JAN_15), "hi"),
            text("assistant", Some(JAN_15 + 10.0), "hello"),
        ],
    )]);
    let analysis = analyze(&json);

    assert_eq!(analysis.total_conversations(), 1);
    assert_eq!(analysis.total_messages(), 2);
    assert_eq!(
        analysis.role_based_message_count(),
        counts(&[("user", 1), ("assistant", 1)])
    );
}

#[test]
fn test_role_counts_sum_to_total_messages() {
    let json = archive(&[
        conversation(
            r#""id": "a""#,
            &[
                text("system", None, ""),
                text("user", Some(JAN_15), "q"),
                tool("browser", Some(JAN_15 + 1.0), ""),
                text("assistant", Some(JAN_15 + 2.0), "a"),
                text("critic", None, "odd role"),
                // No author at all.
                r#"{"content": {"parts": ["orphan"]}}"#.to_string(),
            ],
        ),
        conversation(r#""id": "b", "gizmo_id": "g-123""#, &[text("user", None, "x")]),
        // Mapping missing entirely.
        r#"{"id": "c", "title": "empty"}"#.to_string(),
    ]);
    let analysis = analyze(&json);

    let roles = analysis.role_based_message_count();
    assert_eq!(roles.values().sum::<u64>(), analysis.total_messages());
    assert_eq!(analysis.total_messages(), 7);
    assert_eq!(roles.get("critic"), Some(&1));
    assert_eq!(roles.get("unknown"), Some(&1));
    assert_eq!(analysis.total_conversations(), 3);
}

#[test]
fn test_null_and_missing_messages_are_structural() {
    let json = r#"[{"mapping": {
        "root": {"id": "root", "message": null, "children": ["a"]},
        "a": {"id": "a", "parent": "root", "children": ["b"]},
        "b": {"id": "b", "parent": "a", "children": [], "message": {"author": {"role": "user"}}}
    }}]"#;
    let analysis = analyze(json);

    assert_eq!(analysis.total_messages(), 1);
    assert_eq!(analysis.recipient_count(), counts(&[("unknown", 1)]));
}

#[test]
fn test_gpts_counts() {
    let json = archive(&[
        conversation(
            r#""conversation_template_id": "g-abc""#,
            &[text("user", None, "a"), text("assistant", None, "b")],
        ),
        conversation(r#""gizmo_id": "g-def""#, &[text("user", None, "c")]),
        // Prefix must be at the start.
        conversation(r#""gizmo_id": "xg-1""#, &[text("user", None, "d")]),
        conversation("", &[text("user", None, "e")]),
    ]);
    let analysis = analyze(&json);

    assert_eq!(analysis.total_gpts_conversations(), 2);
    assert_eq!(analysis.total_gpts_messages(), 3);
    assert!(analysis.total_gpts_messages() <= analysis.total_messages());
    assert_eq!(
        analysis.role_based_gpts_message_count(),
        counts(&[("user", 2), ("assistant", 1)])
    );
}

#[test]
fn test_no_gpts_without_prefix() {
    let json = archive(&[
        conversation(r#""gizmo_id": null"#, &[text("user", None, "a")]),
        conversation(r#""conversation_template_id": 5"#, &[text("user", None, "b")]),
    ]);
    let analysis = analyze(&json);

    assert_eq!(analysis.total_gpts_conversations(), 0);
    assert_eq!(analysis.total_gpts_messages(), 0);
    assert!(analysis.role_based_gpts_message_count().is_empty());
}

#[test]
fn test_voice_counts_always_have_both_roles() {
    let voice = r#""content": {"parts": ["x"]}, "metadata": {"voice_mode_message": true}"#;
    let json = archive(&[conversation(
        "",
        &[
            message("user", None, voice),
            message("user", None, voice),
            message("tool", None, voice),
            text("assistant", None, "not voice"),
        ],
    )]);
    let analysis = analyze(&json);

    let data = analysis.role_based_message_data();
    assert_eq!(data.voice.user, 2);
    assert_eq!(data.voice.assistant, 0);
    assert_eq!(analysis.total_voice_messages(), 3);
    assert_eq!(data.overall, analysis.role_based_message_count());

    let empty = analyze("[]").role_based_voice_message_count();
    assert_eq!((empty.user, empty.assistant), (0, 0));
}

#[test]
fn test_model_wise_message_count() {
    let json = archive(&[conversation(
        "",
        &[
            with_metadata("assistant", None, r#""model_slug": "gpt-4o""#),
            with_metadata("assistant", None, r#""model_slug": "gpt-4o""#),
            with_metadata("tool", None, ""),
            with_metadata("assistant", None, r#""model_slug": """#),
            // Empty parts are not counted.
            message("assistant", None, r#""content": {"parts": []}, "metadata": {"model_slug": "o3"}"#),
            with_metadata("user", None, r#""model_slug": "gpt-4o""#),
        ],
    )]);

    assert_eq!(
        analyze(&json).model_wise_message_count(),
        counts(&[("gpt-4o", 2), ("unknown", 2)])
    );
}

#[test]
fn test_tool_recipient_and_channel_counts() {
    let json = archive(&[conversation(
        "",
        &[
            message("user", None, r#""recipient": "all", "channel": null"#),
            tool("python", None, r#""recipient": "all", "channel": "final""#),
            tool("python", None, ""),
            tool("dalle.text2im", None, ""),
        ],
    )]);
    let analysis = analyze(&json);

    assert_eq!(
        analysis.tool_name_count(),
        counts(&[("python", 2), ("dalle.text2im", 1)])
    );
    assert_eq!(
        analysis.recipient_count(),
        counts(&[("all", 2), ("unknown", 2)])
    );
    assert_eq!(
        analysis.channel_count(),
        counts(&[("final", 1), ("unknown", 3)])
    );
}

#[test]
fn test_conversation_level_counts() {
    let json = archive(&[
        conversation(r#""is_archived": true, "default_model_slug": "gpt-4o""#, &[]),
        conversation(r#""is_archived": "yes", "default_model_slug": "gpt-4o""#, &[]),
        conversation(r#""default_model_slug": null"#, &[]),
    ]);
    let analysis = analyze(&json);

    assert_eq!(analysis.total_archived_conversations(), 1);
    assert_eq!(
        analysis.default_model_slug_count(),
        counts(&[("gpt-4o", 2), ("unknown", 1)])
    );
}

#[test]
fn test_empty_archive_is_all_zero() {
    let analysis = analyze("[]");
    assert_eq!(analysis.total_conversations(), 0);
    assert_eq!(analysis.total_messages(), 0);
    assert!(analysis.role_based_message_count().is_empty());
    assert!(analysis.longest_conversation().is_none());
    assert_eq!(analysis.average_daily_message_count(), 0.0);

    let summary = analysis.summary();
    assert_eq!(summary.total_messages, 0);
    assert!(summary.monthly_model_token_usage.is_empty());
}

#[test]
fn test_summary_serializes() {
    let json = archive(&[conversation(
        r#""id": "c1", "create_time": 1705276800"#,
        &[
            text("user", Some(JAN_15), "hello there"),
            with_metadata("assistant", Some(JAN_15 + 5.0), r#""model_slug": "gpt-4o""#),
        ],
    )]);
    let summary = analyze(&json).summary();
    assert_eq!(summary.total_messages, 2);

    let out = simd_json::to_string(&summary).unwrap();
    assert!(out.contains(r#""totalConversations":1"#));
    assert!(out.contains(r#""2024-01-15""#));
    assert!(out.contains(r#""Jan-24""#));
    assert!(out.contains(r#""mostChattyDay""#));
}
