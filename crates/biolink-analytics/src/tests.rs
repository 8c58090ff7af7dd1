//! Unit tests for the analytics engine.

use biolink_types::{DateRange, Dimension, EventType, PageRequest, RetentionPolicy};
use chrono::{DateTime, Duration, NaiveDate, Utc};
use proptest::prelude::*;
use rusqlite::{params, Connection};

use crate::event::{AggregationQuery, Bucket, NewEvent, Totals};
use crate::report::{aggregate, daily_counts, totals};
use crate::retention::{sweep_expired, SWEEP_BATCH_SIZE};
use crate::store::{list_activity, record_event};

/// Creates an in-memory SQLite database with migrations applied.
fn test_db() -> Connection {
    let conn = Connection::open_in_memory().expect("should open in-memory db");
    biolink_db::run_migrations(&conn).expect("migrations should succeed");
    conn
}

fn seed_user(conn: &Connection, id: &str) {
    conn.execute(
        "INSERT INTO users (id, email) VALUES (?1, ?2)",
        params![id, format!("{id}@example.com")],
    )
    .expect("should insert user");
}

fn at(s: &str) -> DateTime<Utc> {
    DateTime::parse_from_rfc3339(s)
        .expect("valid timestamp")
        .with_timezone(&Utc)
}

fn view_from(user: &str, country: Option<&str>) -> NewEvent {
    NewEvent {
        country: country.map(str::to_string),
        ..NewEvent::new(user, EventType::ProfileView)
    }
}

fn click_from(user: &str, referrer: Option<&str>) -> NewEvent {
    NewEvent {
        referrer: referrer.map(str::to_string),
        ..NewEvent::new(user, EventType::LinkClick)
    }
}

fn record(conn: &Connection, event: NewEvent, now: DateTime<Utc>) {
    record_event(conn, &event, now)
        .expect("record should succeed")
        .expect("user should exist");
}

fn by(user: &str, event_type: EventType, dimension: Dimension) -> AggregationQuery {
    AggregationQuery {
        user_id: user.to_string(),
        event_type,
        dimension,
        range: None,
    }
}

fn bucket(value: &str, count: i64) -> Bucket {
    Bucket {
        dimension_value: value.to_string(),
        count,
    }
}

fn event_count(conn: &Connection) -> i64 {
    conn.query_row("SELECT COUNT(*) FROM events", [], |row| row.get(0))
        .expect("should count events")
}

// ── record_event ─────────────────────────────────────────────────────

#[test]
fn record_event_assigns_server_timestamp() {
    let conn = test_db();
    seed_user(&conn, "u1");

    let now = at("2024-05-01T12:00:00.250Z");
    let event = record_event(&conn, &view_from("u1", Some("US")), now)
        .unwrap()
        .unwrap();

    assert_eq!(event.timestamp, now);
    assert_eq!(event.event_type, "profile_view");
    assert_eq!(event.country.as_deref(), Some("US"));
}

#[test]
fn record_event_for_unknown_user_inserts_nothing() {
    let conn = test_db();
    let result = record_event(&conn, &view_from("ghost", None), Utc::now()).unwrap();
    assert!(result.is_none());
    assert_eq!(event_count(&conn), 0);
}

#[test]
fn timestamps_never_go_backwards() {
    let conn = test_db();
    seed_user(&conn, "u1");

    let later = at("2024-05-01T12:00:00Z");
    record(&conn, view_from("u1", None), later);
    let second = record_event(&conn, &view_from("u1", None), at("2024-05-01T11:00:00Z"))
        .unwrap()
        .unwrap();

    assert_eq!(second.timestamp, later);
}

#[test]
fn blank_dimensions_are_stored_as_null() {
    let conn = test_db();
    seed_user(&conn, "u1");

    let event = record_event(&conn, &click_from("u1", Some("   ")), Utc::now())
        .unwrap()
        .unwrap();
    assert_eq!(event.referrer, None);
}

#[test]
fn event_serializes_with_type_and_camel_case() {
    let conn = test_db();
    seed_user(&conn, "u1");
    let mut new_event = click_from("u1", Some("instagram.com"));
    new_event.link_id = Some("link-7".to_string());
    let event = record_event(&conn, &new_event, at("2024-05-01T12:00:00Z"))
        .unwrap()
        .unwrap();

    let json = serde_json::to_value(&event).unwrap();
    assert_eq!(json["type"], "link_click");
    assert_eq!(json["userId"], "u1");
    assert_eq!(json["linkId"], "link-7");
    assert_eq!(json["timestamp"], "2024-05-01T12:00:00Z");
}

// ── aggregate ────────────────────────────────────────────────────────

#[test]
fn missing_country_goes_to_unknown_bucket() {
    let conn = test_db();
    seed_user(&conn, "u1");
    let now = at("2024-05-01T00:00:00Z");
    record(&conn, view_from("u1", Some("US")), now);
    record(&conn, view_from("u1", Some("US")), now);
    record(&conn, view_from("u1", None), now);

    let buckets = aggregate(&conn, &by("u1", EventType::ProfileView, Dimension::Country)).unwrap();
    assert_eq!(buckets, vec![bucket("US", 2), bucket("Unknown", 1)]);
}

#[test]
fn missing_referrer_goes_to_direct_bucket() {
    let conn = test_db();
    seed_user(&conn, "u1");
    let now = at("2024-05-01T00:00:00Z");
    record(&conn, click_from("u1", None), now);
    record(&conn, click_from("u1", Some("")), now);
    record(&conn, click_from("u1", Some("twitter.com")), now);

    let buckets = aggregate(&conn, &by("u1", EventType::LinkClick, Dimension::Referrer)).unwrap();
    assert_eq!(
        buckets,
        vec![bucket("Direct/Unknown", 2), bucket("twitter.com", 1)]
    );
}

#[test]
fn aggregation_is_scoped_to_user_and_event_type() {
    let conn = test_db();
    seed_user(&conn, "u1");
    seed_user(&conn, "u2");
    let now = at("2024-05-01T00:00:00Z");
    record(&conn, view_from("u1", Some("DE")), now);
    record(&conn, view_from("u2", Some("DE")), now);
    record(
        &conn,
        NewEvent {
            country: Some("DE".to_string()),
            ..NewEvent::new("u1", EventType::LinkClick)
        },
        now,
    );

    let buckets = aggregate(&conn, &by("u1", EventType::ProfileView, Dimension::Country)).unwrap();
    assert_eq!(buckets, vec![bucket("DE", 1)]);
}

#[test]
fn equal_counts_are_ordered_lexicographically() {
    let conn = test_db();
    seed_user(&conn, "u1");
    let now = at("2024-05-01T00:00:00Z");
    for country in ["US", "FR", "BR"] {
        record(&conn, view_from("u1", Some(country)), now);
    }
    record(&conn, view_from("u1", None), now);
    record(&conn, view_from("u1", Some("ZA")), now);
    record(&conn, view_from("u1", Some("ZA")), now);

    let buckets = aggregate(&conn, &by("u1", EventType::ProfileView, Dimension::Country)).unwrap();
    let values: Vec<_> = buckets.iter().map(|b| b.dimension_value.as_str()).collect();
    assert_eq!(values, vec!["ZA", "BR", "FR", "US", "Unknown"]);
}

#[test]
fn date_range_end_covers_whole_last_day() {
    let conn = test_db();
    seed_user(&conn, "u1");
    record(&conn, view_from("u1", Some("IN")), at("2024-02-29T23:59:59.999Z"));
    record(&conn, view_from("u1", Some("US")), at("2024-03-01T00:00:00.000Z"));
    record(&conn, view_from("u1", Some("US")), at("2024-03-10T23:59:59.900Z"));
    record(&conn, view_from("u1", Some("GB")), at("2024-03-11T00:00:00.001Z"));

    let range = DateRange::from_dates(
        NaiveDate::from_ymd_opt(2024, 3, 1).unwrap(),
        NaiveDate::from_ymd_opt(2024, 3, 10).unwrap(),
    )
    .unwrap();
    let query = AggregationQuery {
        range: Some(range),
        ..by("u1", EventType::ProfileView, Dimension::Country)
    };

    assert_eq!(aggregate(&conn, &query).unwrap(), vec![bucket("US", 2)]);
}

#[test]
fn aggregate_with_no_events_is_empty() {
    let conn = test_db();
    let buckets = aggregate(&conn, &by("u1", EventType::LinkClick, Dimension::Referrer)).unwrap();
    assert!(buckets.is_empty());
}

// ── summary ──────────────────────────────────────────────────────────

#[test]
fn daily_counts_split_by_type_and_day() {
    let conn = test_db();
    seed_user(&conn, "u1");
    record(&conn, view_from("u1", None), at("2024-03-01T08:00:00Z"));
    record(&conn, click_from("u1", None), at("2024-03-01T09:00:00Z"));
    record(&conn, view_from("u1", None), at("2024-03-01T23:59:59.999Z"));
    record(&conn, click_from("u1", None), at("2024-03-03T00:00:00Z"));

    let days = daily_counts(&conn, "u1", None).unwrap();
    assert_eq!(days.len(), 2);
    assert_eq!(days[0].date, "2024-03-01");
    assert_eq!((days[0].profile_views, days[0].link_clicks), (2, 1));
    assert_eq!(days[1].date, "2024-03-03");
    assert_eq!((days[1].profile_views, days[1].link_clicks), (0, 1));

    let range = DateRange::from_dates(
        NaiveDate::from_ymd_opt(2024, 3, 2).unwrap(),
        NaiveDate::from_ymd_opt(2024, 3, 3).unwrap(),
    )
    .unwrap();
    assert_eq!(
        totals(&conn, "u1", Some(range)).unwrap(),
        Totals {
            profile_views: 0,
            link_clicks: 1
        }
    );
}

#[test]
fn totals_for_user_without_events_are_zero() {
    let conn = test_db();
    assert_eq!(totals(&conn, "nobody", None).unwrap(), Totals::default());
}

// ── activity ─────────────────────────────────────────────────────────

#[test]
fn activity_is_newest_first_and_paginated() {
    let conn = test_db();
    seed_user(&conn, "u1");
    let base = at("2024-01-01T00:00:00Z");
    for i in 0..5 {
        record(&conn, view_from("u1", None), base + Duration::minutes(i));
    }

    let first = list_activity(&conn, "u1", None, PageRequest::new(Some(1), Some(2))).unwrap();
    assert_eq!(first.total, 5);
    assert_eq!(first.items.len(), 2);
    assert_eq!(first.items[0].timestamp, base + Duration::minutes(4));
    assert_eq!(first.items[1].timestamp, base + Duration::minutes(3));

    let last = list_activity(&conn, "u1", None, PageRequest::new(Some(3), Some(2))).unwrap();
    assert_eq!(last.items.len(), 1);
    assert_eq!(last.items[0].timestamp, base);

    let beyond = list_activity(&conn, "u1", None, PageRequest::new(Some(9), Some(2))).unwrap();
    assert!(beyond.items.is_empty());
    assert_eq!(beyond.total, 5);
}

#[test]
fn activity_search_filters_across_fields() {
    let conn = test_db();
    seed_user(&conn, "u1");
    let now = at("2024-01-01T00:00:00Z");
    record(&conn, view_from("u1", Some("NZ")), now);
    record(&conn, click_from("u1", Some("news.ycombinator.com")), now);
    record(
        &conn,
        NewEvent {
            platform: Some("YouTube".to_string()),
            ..NewEvent::new("u1", EventType::LinkClick)
        },
        now,
    );

    let found = list_activity(&conn, "u1", Some("youtube"), PageRequest::default()).unwrap();
    assert_eq!(found.total, 1);
    assert_eq!(found.items[0].platform.as_deref(), Some("YouTube"));

    let clicks = list_activity(&conn, "u1", Some("LINK_CLICK"), PageRequest::default()).unwrap();
    assert_eq!(clicks.total, 2);

    let empty = list_activity(&conn, "u1", Some(""), PageRequest::default()).unwrap();
    let none = list_activity(&conn, "u1", None, PageRequest::default()).unwrap();
    assert_eq!(empty.total, 3);
    assert_eq!(empty.total, none.total);
}

// ── retention ────────────────────────────────────────────────────────

#[test]
fn sweep_deletes_only_events_before_cutoff() {
    let conn = test_db();
    seed_user(&conn, "u1");
    let now = at("2025-06-15T10:00:00Z");
    let policy = RetentionPolicy::new(30).unwrap();
    let cutoff = policy.cutoff(now);

    record(&conn, view_from("u1", Some("old")), cutoff - Duration::seconds(1));
    record(&conn, view_from("u1", Some("new")), cutoff + Duration::seconds(1));

    let report = sweep_expired(&conn, policy, now).unwrap();
    assert_eq!(report.deleted_count, 1);
    assert_eq!(report.cutoff, cutoff);

    let remaining: String = conn
        .query_row("SELECT country FROM events", [], |row| row.get(0))
        .unwrap();
    assert_eq!(remaining, "new");

    let again = sweep_expired(&conn, policy, now).unwrap();
    assert_eq!(again.deleted_count, 0);
}

#[test]
fn sweep_keeps_event_exactly_at_cutoff() {
    let conn = test_db();
    seed_user(&conn, "u1");
    let now = at("2025-06-15T10:00:00Z");
    let policy = RetentionPolicy::new(1).unwrap();
    record(&conn, view_from("u1", None), policy.cutoff(now));

    assert_eq!(sweep_expired(&conn, policy, now).unwrap().deleted_count, 0);
    assert_eq!(event_count(&conn), 1);
}

#[test]
fn sweep_continues_past_one_batch() {
    let mut conn = test_db();
    let total = SWEEP_BATCH_SIZE + 7;
    {
        let tx = conn.transaction().unwrap();
        {
            let mut stmt = tx
                .prepare(
                    "INSERT INTO events (user_id, event_type, occurred_at) VALUES ('u1', 'profile_view', ?1)",
                )
                .unwrap();
            for i in 0..total {
                stmt.execute([i]).unwrap();
            }
        }
        tx.commit().unwrap();
    }

    let report = sweep_expired(&conn, RetentionPolicy::default(), Utc::now()).unwrap();
    assert_eq!(report.deleted_count as i64, total);
    assert_eq!(event_count(&conn), 0);
}

// ── properties ───────────────────────────────────────────────────────

fn arb_country() -> impl Strategy<Value = Option<String>> {
    prop_oneof![
        Just(None),
        Just(Some(String::new())),
        Just(Some("US".to_string())),
        Just(Some("DE".to_string())),
        Just(Some("JP".to_string())),
    ]
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(48))]

    #[test]
    fn buckets_account_for_every_event(
        events in prop::collection::vec((arb_country(), any::<bool>(), 0i64..20), 0..40),
    ) {
        let conn = test_db();
        seed_user(&conn, "u1");
        let base = at("2024-01-01T00:00:00Z");

        let mut sorted = events.clone();
        sorted.sort_by_key(|(_, _, day)| *day);
        for (country, is_view, day) in &sorted {
            let event_type = if *is_view { EventType::ProfileView } else { EventType::LinkClick };
            let event = NewEvent {
                country: country.clone(),
                referrer: country.clone(),
                ..NewEvent::new("u1", event_type)
            };
            record(&conn, event, base + Duration::days(*day));
        }

        let range = DateRange::from_dates(
            NaiveDate::from_ymd_opt(2024, 1, 3).unwrap(),
            NaiveDate::from_ymd_opt(2024, 1, 12).unwrap(),
        )
        .unwrap();

        for range in [None, Some(range)] {
            let expected = totals(&conn, "u1", range).unwrap();
            for dimension in [Dimension::Country, Dimension::Referrer] {
                for (event_type, want) in [
                    (EventType::ProfileView, expected.profile_views),
                    (EventType::LinkClick, expected.link_clicks),
                ] {
                    let query = AggregationQuery { range, ..by("u1", event_type, dimension) };
                    let buckets = aggregate(&conn, &query).unwrap();
                    let sum: i64 = buckets.iter().map(|b| b.count).sum();
                    prop_assert_eq!(sum, want);

                    for pair in buckets.windows(2) {
                        prop_assert!(pair[0].count >= pair[1].count);
                    }
                    let mut values: Vec<_> = buckets.iter().map(|b| &b.dimension_value).collect();
                    values.sort();
                    values.dedup();
                    prop_assert_eq!(values.len(), buckets.len());
                }
            }
        }
    }

    #[test]
    fn pages_reconstruct_full_activity(
        count in 0usize..30,
        page_size in 1i64..8,
        same_instant in any::<bool>(),
    ) {
        let conn = test_db();
        seed_user(&conn, "u1");
        let base = at("2024-01-01T00:00:00Z");
        for i in 0..count {
            let offset = if same_instant { 0 } else { i as i64 };
            record(&conn, view_from("u1", None), base + Duration::seconds(offset));
        }

        let full = list_activity(&conn, "u1", None, PageRequest::new(Some(1), Some(100))).unwrap();
        prop_assert_eq!(full.total, count as i64);

        let mut collected = Vec::new();
        let mut page = 1;
        loop {
            let chunk = list_activity(&conn, "u1", None, PageRequest::new(Some(page), Some(page_size))).unwrap();
            prop_assert!((chunk.items.len() as i64) <= page_size);
            prop_assert_eq!(chunk.total, count as i64);
            if chunk.items.is_empty() {
                break;
            }
            collected.extend(chunk.items);
            page += 1;
        }

        let ids: Vec<i64> = collected.iter().map(|e| e.id).collect();
        let full_ids: Vec<i64> = full.items.iter().map(|e| e.id).collect();
        prop_assert_eq!(ids, full_ids);
    }
}
