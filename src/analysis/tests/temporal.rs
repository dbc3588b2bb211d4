//! Date, shift and time-spent statistics.

use chrono::{NaiveDate, TimeZone, Utc};

use super::*;
use crate::analysis::{DayActivity, Shift};

fn date(y: i32, m: u32, d: u32) -> NaiveDate {
    NaiveDate::from_ymd_opt(y, m, d).unwrap()
}

#[test]
fn test_shift_boundaries() {
    assert_eq!(Shift::from_hour(0), Shift::Night);
    assert_eq!(Shift::from_hour(5), Shift::Night);
    assert_eq!(Shift::from_hour(6), Shift::Morning);
    assert_eq!(Shift::from_hour(11), Shift::Morning);
    assert_eq!(Shift::from_hour(12), Shift::Afternoon);
    assert_eq!(Shift::from_hour(16), Shift::Afternoon);
    assert_eq!(Shift::from_hour(17), Shift::Evening);
    assert_eq!(Shift::from_hour(20), Shift::Evening);
    assert_eq!(Shift::from_hour(21), Shift::Night);
    assert_eq!(Shift::from_hour(23), Shift::Night);
}

#[test]
fn test_morning_and_night_messages() {
    let json = archive(&[conversation(
        "",
        &[
            text("user", Some(JAN_15 + 8.5 * HOUR), "08:30"),
            text("user", Some(JAN_15 + 23.0 * HOUR), "23:00"),
        ],
    )]);
    let report = analyze(&json).shift_wise_message_count();

    assert_eq!(report.shifts.morning, 1);
    assert_eq!(report.shifts.night, 1);
    assert_eq!(report.total_shift_messages, 2);
}

#[test]
fn test_shifts_use_analysis_time_zone() {
    // 07:30 UTC is 08:30 in Stockholm in January.
    let json = archive(&[conversation(
        "",
        &[text("user", Some(JAN_15 + 7.5 * HOUR), "x")],
    )]);

    let utc = analyze(&json).shift_wise_message_count();
    assert_eq!(utc.shifts.morning, 1);

    let json = archive(&[conversation(
        "",
        &[text("user", Some(JAN_15 + 5.5 * HOUR), "x")],
    )]);
    assert_eq!(analyze(&json).shift_wise_message_count().shifts.night, 1);
    let stockholm = analyze_in(&json, chrono_tz::Europe::Stockholm).shift_wise_message_count();
    assert_eq!(stockholm.shifts.morning, 1);
}

#[test]
fn test_shifts_partition_every_message() {
    let mut messages: Vec<String> = (0..24)
        .map(|h| text("user", Some(JAN_15 + h as f64 * HOUR + 59.0), "x"))
        .collect();
    messages.push(text("user", None, "no time"));
    // Out of chrono's range.
    messages.push(text("user", Some(1e20), "bad time"));
    let analysis = analyze(&archive(&[conversation("", &messages)]));

    let report = analysis.shift_wise_message_count();
    let shifts = report.shifts;
    assert_eq!(
        shifts.morning + shifts.afternoon + shifts.evening + shifts.night,
        report.total_shift_messages
    );
    assert_eq!(report.total_shift_messages, 24);
    assert_eq!(shifts.unspecified, 2);
    assert_eq!(
        report.total_shift_messages + shifts.unspecified,
        analysis.total_messages()
    );
    assert_eq!(
        (shifts.morning, shifts.afternoon, shifts.evening, shifts.night),
        (6, 5, 4, 9)
    );
}

#[test]
fn test_most_chatty_day() {
    let json = archive(&[conversation(
        "",
        &[
            text("user", Some(JAN_15), "a"),
            text("user", Some(JAN_15 + DAY), "b"),
            text("user", Some(JAN_15 + DAY + HOUR), "c"),
            text("user", None, "d"),
        ],
    )]);
    let day = analyze(&json).most_chatty_day();

    assert_eq!(day.date, Some(date(2024, 1, 16)));
    assert_eq!(day.count, 2);
}

#[test]
fn test_most_chatty_day_tie_goes_to_first_seen() {
    let json = archive(&[
        conversation(
            "",
            &[
                text("user", Some(JAN_15 + 3.0 * DAY), "later day"),
                text("user", Some(JAN_15 + 3.0 * DAY + 1.0), "later day"),
            ],
        ),
        conversation(
            "",
            &[
                text("user", Some(JAN_15), "earlier day"),
                text("user", Some(JAN_15 + 1.0), "earlier day"),
            ],
        ),
    ]);
    let day = analyze(&json).most_chatty_day();

    assert_eq!(day.date, Some(date(2024, 1, 18)));
    assert_eq!(day.count, 2);
}

#[test]
fn test_most_chatty_day_tie_follows_conversation_order_in_large_trees() {
    // 42 messages on 42 different days: every day ties at one message.
    let mut messages = vec![
        text("user", Some(JAN_15 + 5.0 * DAY), "first"),
        text("assistant", Some(JAN_15), "second"),
    ];
    messages.extend((0..40).map(|i| text("user", Some(JAN_15 + (10.0 + f64::from(i)) * DAY), "more")));
    let json = archive(&[conversation("", &messages)]);

    for _ in 0..4 {
        let day = analyze(&json).most_chatty_day();
        assert_eq!(day.date, Some(date(2024, 1, 20)));
        assert_eq!(day.count, 1);
    }
}

#[test]
fn test_most_chatty_day_empty() {
    let day = analyze("[]").most_chatty_day();
    assert_eq!(day.date, None);
    assert_eq!(day.count, 0);
}

#[test]
fn test_time_spent_single_exchange() {
    // user → assistant is not an engagement gap: only the composing and reading credits apply.
    let json = archive(&[conversation(
        "",
        &[
            text("user", Some(JAN_15), "q"),
            text("assistant", Some(JAN_15 + 10.0), "a"),
        ],
    )]);
    let spent = analyze(&json).time_spent();

    assert_eq!(spent.seconds, 75.0);
    assert_eq!(spent.hours, 0.02);
    assert_eq!(spent.days, 0.0);
}

#[test]
fn test_time_spent_counts_short_assistant_to_user_gaps() {
    let json = archive(&[
        conversation(
            "",
            &[
                text("user", Some(JAN_15), "q1"),
                text("assistant", Some(JAN_15 + 10.0), "a1"),
                text("user", Some(JAN_15 + 70.0), "q2"),
                text("assistant", Some(JAN_15 + 80.0), "a2"),
            ],
        ),
        // Idle gap over 30 minutes, ends on a user turn.
        conversation(
            "",
            &[
                text("assistant", Some(JAN_15), "a"),
                text("user", Some(JAN_15 + 1801.0), "q"),
            ],
        ),
    ]);

    // (30 + 60 + 45) + 30
    assert_eq!(analyze(&json).time_spent().seconds, 165.0);
}

#[test]
fn test_time_spent_sorts_and_filters_messages() {
    let json = archive(&[
        // Chain order is not time order.
        conversation(
            "",
            &[
                text("user", Some(JAN_15 + 100.0), "q2"),
                text("assistant", Some(JAN_15 + 50.0), "a1"),
                text("user", Some(JAN_15), "q1"),
            ],
        ),
        conversation(
            "",
            &[
                text("system", Some(JAN_15), "sys"),
                message("user", Some(JAN_15), r#""content": {"parts": []}"#),
                text("user", None, "untimed"),
                text("user", Some(0.0), "zero time"),
            ],
        ),
    ]);

    // 30 + (100 - 50); the second conversation has nothing usable.
    assert_eq!(analyze(&json).time_spent().seconds, 80.0);
}

#[test]
fn test_average_daily_message_count() {
    let json = archive(&[conversation(
        "",
        &[
            text("user", Some(JAN_15), "a"),
            text("user", Some(JAN_15 + 60.0), "b"),
            text("user", Some(JAN_15 + 120.0), "c"),
            text("user", Some(JAN_15 + 5.0 * DAY), "d"),
            text("user", None, "e"),
        ],
    )]);

    // Four timed messages over two active days; the empty days in between do not count.
    assert_eq!(analyze(&json).average_daily_message_count(), 2.0);
}

#[test]
fn test_date_wise_activity() {
    let json = archive(&[
        conversation(
            &format!(r#""create_time": {JAN_15}"#),
            &[
                text("user", Some(JAN_15 + 60.0), "a"),
                text("assistant", Some(JAN_15 + DAY), "b"),
            ],
        ),
        conversation(r#""create_time": null"#, &[text("user", None, "c")]),
    ]);
    let activity = analyze(&json).date_wise_activity();

    assert_eq!(activity.len(), 2);
    assert_eq!(
        activity[&date(2024, 1, 15)],
        DayActivity {
            total_messages: 1,
            total_conversations: 1,
        }
    );
    assert_eq!(
        activity[&date(2024, 1, 16)],
        DayActivity {
            total_messages: 1,
            total_conversations: 0,
        }
    );
}

#[test]
fn test_first_and_last_used() {
    let json = archive(&[
        conversation("", &[text("user", Some(JAN_15 + 500.0), "mid")]),
        conversation(
            "",
            &[
                text("user", Some(JAN_15 + 1000.0), "last"),
                text("user", Some(JAN_15), "first"),
                text("user", None, "untimed"),
            ],
        ),
    ]);
    let used = analyze(&json).first_and_last_used();

    assert_eq!(used.first_used, Utc.timestamp_opt(JAN_15 as i64, 0).unwrap());
    assert_eq!(
        used.last_used,
        Utc.timestamp_opt(JAN_15 as i64 + 1000, 0).unwrap()
    );
}

#[test]
fn test_first_and_last_used_defaults_to_now() {
    let before = Utc::now();
    let used = analyze("[]").first_and_last_used();
    assert_eq!(used.first_used, used.last_used);
    assert!(used.first_used >= before);
}

#[test]
fn test_longest_conversation() {
    let json = archive(&[
        conversation(
            r#""id": "winner", "title": "Big""#,
            &[
                text("user", Some(JAN_15 + 10.0), "a"),
                message(
                    "assistant",
                    Some(JAN_15 + 20.0),
                    &format!(r#""update_time": {}, "content": {{"parts": ["b"]}}"#, JAN_15 + 900.0),
                ),
                text("user", Some(JAN_15), "c"),
            ],
        ),
        // Same size: does not replace the first.
        conversation(
            r#""id": "tie""#,
            &[
                text("user", Some(JAN_15), "a"),
                text("assistant", Some(JAN_15), "b"),
                text("user", Some(JAN_15), "c"),
            ],
        ),
        // Larger but has no usable timestamp.
        conversation(
            r#""id": "untimed""#,
            &(0..5).map(|_| text("user", None, "x")).collect::<Vec<_>>(),
        ),
    ]);
    let longest = analyze(&json).longest_conversation().unwrap();

    assert_eq!(longest.id, "winner");
    assert_eq!(longest.title, "Big");
    assert_eq!(longest.message_count, 3);
    assert_eq!(longest.role_distribution.get("user"), Some(&2));
    assert_eq!(longest.role_distribution.get("assistant"), Some(&1));
    assert_eq!(longest.first_used.timestamp(), JAN_15 as i64);
    assert_eq!(longest.last_used.timestamp(), JAN_15 as i64 + 900);
}

#[test]
fn test_longest_conversation_defaults() {
    let json = archive(&[conversation(
        r#""title": """#,
        &[text("user", Some(JAN_15), "a")],
    )]);
    let longest = analyze(&json).longest_conversation().unwrap();

    assert_eq!(longest.id, "unknown");
    assert_eq!(longest.title, "Untitled");
}
