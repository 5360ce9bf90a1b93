//! Property tests for plate normalization, day windows and the entry/exit state machine.

mod support;

use std::collections::BTreeSet;

use chrono::{DateTime, Duration, TimeZone, Utc};
use proptest::prelude::*;

use parking_tracker::models::{
    format_duration, local_hour, offset_from_minutes, stay_minutes, DayWindow, LicensePlate,
};
use parking_tracker::services::{EntryDecision, ExitDecision, GateEvent};

use support::Harness;

fn instant(seconds: i64, millis: i64) -> DateTime<Utc> {
    Utc.timestamp_opt(seconds, 0).unwrap() + Duration::milliseconds(millis)
}

proptest! {
    #[test]
    fn prop_plate_normalization_is_idempotent(raw in "[ a-zA-Z0-9-]{0,12}") {
        let parsed = LicensePlate::parse(&raw);
        prop_assert_eq!(parsed.is_none(), raw.trim().is_empty());
        if let Some(plate) = parsed {
            prop_assert_eq!(LicensePlate::parse(plate.as_str()), Some(plate.clone()));
            prop_assert_eq!(LicensePlate::parse(&raw.to_lowercase()), Some(plate.clone()));
            prop_assert!(!plate.as_str().starts_with(' '));
            prop_assert!(!plate.as_str().ends_with(' '));
        }
    }

    #[test]
    fn prop_day_window_contains_instant(
        seconds in 0i64..4_102_444_800,
        millis in 0i64..1000,
        offset_minutes in -720i32..=840,
    ) {
        let offset = offset_from_minutes(offset_minutes).unwrap();
        let at = instant(seconds, millis);
        let window = DayWindow::containing(at, offset).unwrap();

        prop_assert!(window.contains(at));
        prop_assert_eq!(window.end - window.start, Duration::days(1) - Duration::milliseconds(1));
        prop_assert!(!window.contains(window.start - Duration::milliseconds(1)));
        prop_assert!(!window.contains(window.end + Duration::milliseconds(1)));
        prop_assert_eq!(window.start.with_timezone(&offset).date_naive(), window.date);
        prop_assert_eq!(local_hour(window.start, offset), 0);
        prop_assert!(local_hour(at, offset) < 24);
    }

    #[test]
    fn prop_stay_minutes_non_negative(a in 0i64..2_000_000_000, b in 0i64..2_000_000_000) {
        let minutes = stay_minutes(instant(a, 0), instant(b, 0));
        prop_assert!(minutes >= 0.0);
        if b >= a {
            prop_assert!((minutes - (b - a) as f64 / 60.0).abs() < 1e-6);
        }
    }

    #[test]
    fn prop_format_duration_matches_whole_minutes(minutes in 0.0f64..1_000_000.0) {
        let formatted = format_duration(minutes);
        let (h, m) = formatted
            .strip_suffix('m')
            .and_then(|rest| rest.split_once("h "))
            .unwrap();
        let h: i64 = h.parse().unwrap();
        let m: i64 = m.parse().unwrap();
        prop_assert!(m < 60);
        prop_assert_eq!(h * 60 + m, minutes.floor() as i64);
    }

    #[test]
    fn prop_tracker_agrees_with_occupancy_model(
        ops in proptest::collection::vec((0usize..3, any::<bool>(), 0i64..120), 1..40)
    ) {
        let runtime = tokio::runtime::Builder::new_current_thread()
            .enable_all()
            .build()
            .unwrap();

        runtime.block_on(async {
            let plates = ["30A-12345", "51F-99999", "29B-00001"];
            let h = Harness::at_morning();
            let mut inside: BTreeSet<&str> = BTreeSet::new();
            let mut logs = 0usize;

            for (idx, is_entry, gap) in ops {
                h.clock.advance(Duration::minutes(gap));
                let plate = plates[idx];
                let event = GateEvent::new(plate, "CAM01");

                if is_entry {
                    match h.tracker.handle_entry(&event).await.unwrap() {
                        EntryDecision::Entered(v) => {
                            assert!(inside.insert(plate), "{} entered twice", plate);
                            assert_eq!(v.entry_time, h.now());
                            logs += 1;
                        }
                        EntryDecision::AlreadyInside(_) => assert!(inside.contains(plate)),
                    }
                } else {
                    match h.tracker.handle_exit(&event).await.unwrap() {
                        ExitDecision::Exited { duration_minutes, .. } => {
                            assert!(inside.remove(plate), "{} exited while outside", plate);
                            assert!(duration_minutes >= 0.0);
                            logs += 1;
                        }
                        ExitDecision::NotAllowed => assert!(!inside.contains(plate)),
                    }
                }
            }

            let listed: BTreeSet<String> = h
                .tracker
                .vehicles_inside()
                .await
                .unwrap()
                .into_iter()
                .map(|v| v.license_plate.into_inner())
                .collect();
            let expected: BTreeSet<String> = inside.iter().map(|p| p.to_string()).collect();
            assert_eq!(listed, expected);
            assert_eq!(h.repo.log_count(), logs);
        });
    }
}
