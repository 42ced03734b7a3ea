mod common;

use common::ts;
use meeting_safe::slot_id::{canonical_time, identify, identify_all};

#[test]
fn identify_is_pure_and_deterministic() {
    let time = ts(2026, 1, 16, 9, 0);

    let first = identify("meeting-1", time);
    let second = identify("meeting-1", time);
    assert_eq!(first, second, "identical inputs must yield identical tokens");

    assert_eq!(first.len(), 16);
    assert!(first.chars().all(|c| c.is_ascii_hexdigit()));
}

#[test]
fn identify_varies_with_time_and_meeting() {
    let nine = ts(2026, 1, 16, 9, 0);
    let nine_thirty = ts(2026, 1, 16, 9, 30);

    assert_ne!(
        identify("meeting-1", nine),
        identify("meeting-1", nine_thirty),
        "different times must yield different tokens"
    );
    assert_ne!(
        identify("meeting-1", nine),
        identify("meeting-2", nine),
        "different meetings must yield different tokens"
    );
}

#[test]
fn identify_no_collisions_over_a_week_of_slots() {
    let mut tokens = std::collections::HashSet::new();
    for day in 10..17 {
        for hour in 9..17 {
            for minute in [0, 30] {
                let token = identify("meeting-1", ts(2026, 1, day, hour, minute));
                assert!(tokens.insert(token), "sample slots must not collide");
            }
        }
    }
}

#[test]
fn identify_all_collapses_duplicate_times() {
    let nine = ts(2026, 1, 16, 9, 0);
    let ten = ts(2026, 1, 16, 10, 0);
    let times = vec![nine, ten, nine];

    let (ordered, mapping) = identify_all("meeting-1", &times);

    assert_eq!(ordered.len(), 2, "duplicate time collapses to one token");
    assert_eq!(mapping.len(), 2);
    assert_eq!(mapping[&ordered[0]], nine, "first-occurrence order preserved");
    assert_eq!(mapping[&ordered[1]], ten);
}

#[test]
fn identify_all_ordering_matches_input() {
    let times: Vec<_> = (9..13).map(|h| ts(2026, 1, 16, h, 0)).collect();
    let (ordered, mapping) = identify_all("meeting-1", &times);

    assert_eq!(ordered.len(), times.len());
    for (token, time) in ordered.iter().zip(&times) {
        assert_eq!(mapping[token], *time);
        assert_eq!(*token, identify("meeting-1", *time));
    }
}

#[test]
fn canonical_time_is_second_precision_utc() {
    let time = ts(2026, 1, 16, 9, 0);
    assert_eq!(canonical_time(time), "2026-01-16T09:00:00");
}
