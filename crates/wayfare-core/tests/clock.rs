use std::time::Duration;

use chrono::{TimeZone, Utc};
use wayfare_core::{Clock, ManualClock, SystemClock};

#[test]
fn manual_clock_advances_and_shares_state() {
    let start = Utc.with_ymd_and_hms(2026, 1, 1, 0, 0, 0).unwrap();
    let clock = ManualClock::new(start);
    let shared = clock.clone();

    clock.advance(Duration::from_secs(90));
    assert_eq!(shared.now(), Utc.with_ymd_and_hms(2026, 1, 1, 0, 1, 30).unwrap());

    shared.rewind(Duration::from_secs(30));
    assert_eq!(clock.now(), Utc.with_ymd_and_hms(2026, 1, 1, 0, 1, 0).unwrap());
}

#[test]
fn manual_clock_set_jumps() {
    let clock = ManualClock::default();
    let target = Utc.with_ymd_and_hms(2030, 6, 15, 8, 0, 0).unwrap();
    clock.set(target);
    assert_eq!(clock.now(), target);
}

#[test]
fn system_clock_moves_forward() {
    let clock = SystemClock;
    let a = clock.now();
    let b = clock.now();
    assert!(b >= a);
}
