use pretty_assertions::assert_eq;
use std::sync::Arc;
use steps_storage::{LedgerStore, StorageError};
use steps_types::{DailyTotal, Day, FixedClock};

fn today() -> Day {
    Day::from_ymd(2026, 10, 16).unwrap()
}

fn store_with_clock() -> (LedgerStore, Arc<FixedClock>) {
    let clock = Arc::new(FixedClock::at_noon(today()));
    let store = LedgerStore::open_in_memory(clock.clone()).unwrap();
    (store, clock)
}

// ── Seeding ──────────────────────────────────────────────────────

#[test]
fn first_reading_seeds_yesterday() {
    let (store, _) = store_with_clock();

    store.upsert(today(), 12_345).unwrap();

    assert_eq!(store.total_as_of(today().pred()).unwrap(), Some(12_345));
    assert_eq!(store.steps_between(today().pred(), today()).unwrap(), Some(0));
}

#[test]
fn later_readings_count_from_seed() {
    let (store, _) = store_with_clock();

    store.upsert(today(), 12_345).unwrap();
    store.upsert(today(), 12_395).unwrap();

    assert_eq!(store.steps_between(today().pred(), today()).unwrap(), Some(50));
    assert_eq!(store.total_as_of(today().pred()).unwrap(), Some(12_345));
}

#[test]
fn existing_yesterday_is_not_reseeded() {
    let (store, _) = store_with_clock();
    store.upsert(today().pred(), 9_000).unwrap();

    store.upsert(today(), 10_000).unwrap();

    assert_eq!(store.total_as_of(today().pred()).unwrap(), Some(9_000));
    assert_eq!(store.steps_between(today().pred(), today()).unwrap(), Some(1_000));
}

#[test]
fn record_today_follows_the_clock() {
    let (store, clock) = store_with_clock();

    assert_eq!(store.record_today(100).unwrap(), today());
    clock.advance_days(1);
    assert_eq!(store.record_today(180).unwrap(), today().succ());

    assert_eq!(store.steps_between(today(), today().succ()).unwrap(), Some(80));
}

#[test]
fn new_day_uses_previous_day_as_baseline() {
    let (store, clock) = store_with_clock();
    store.upsert(today(), 1_000).unwrap();
    store.upsert(today(), 4_000).unwrap();

    clock.advance_days(1);
    let tomorrow = today().succ();
    store.upsert(tomorrow, 4_500).unwrap();

    assert_eq!(store.total_as_of(today()).unwrap(), Some(4_000));
    assert_eq!(store.steps_between(today(), tomorrow).unwrap(), Some(500));
}

// ── Lookups ──────────────────────────────────────────────────────

#[test]
fn total_as_of_missing_day_is_none() {
    let (store, _) = store_with_clock();
    assert_eq!(store.total_as_of(today()).unwrap(), None);
}

#[test]
fn steps_between_requires_both_rows() {
    let (store, _) = store_with_clock();
    let last_week = Day::from_ymd(2026, 10, 9).unwrap();
    store.upsert(last_week, 100).unwrap();

    assert_eq!(store.steps_between(last_week, today()).unwrap(), None);
    assert_eq!(store.steps_between(last_week.pred(), last_week).unwrap(), None);
}

#[test]
fn reversed_range_leaves_storage_untouched() {
    let (store, _) = store_with_clock();
    store.upsert(today(), 500).unwrap();
    store.upsert(today(), 800).unwrap();

    assert_eq!(store.steps_between(today(), today().pred()).unwrap(), Some(-300));
    assert_eq!(store.row_count().unwrap(), 2);
    assert_eq!(store.total_as_of(today()).unwrap(), Some(800));
}

#[test]
fn upsert_replaces_row() {
    let (store, _) = store_with_clock();
    store.upsert(today(), 10).unwrap();
    store.upsert(today(), 20).unwrap();
    store.upsert(today(), 15).unwrap();

    assert_eq!(store.total_as_of(today()).unwrap(), Some(15));
    assert_eq!(store.row_count().unwrap(), 2);
}

#[test]
fn negative_total_is_rejected() {
    let (store, _) = store_with_clock();
    store.upsert(today(), 40).unwrap();
    let mut view = store.steps_today().subscribe();

    let result = store.upsert(today(), -5);

    assert!(matches!(
        result,
        Err(StorageError::NegativeTotal { steps: -5, .. })
    ));
    assert!(store.record_today(-1).is_err());
    assert_eq!(store.total_as_of(today()).unwrap(), Some(40));
    assert_eq!(store.row_count().unwrap(), 2);
    // Only the retained value, no new publication.
    assert_eq!(view.try_next(), Some(Some(0)));
    assert_eq!(view.try_next(), None);
}

#[test]
fn history_limit_beyond_row_count() {
    let (store, _) = store_with_clock();
    store.upsert(today(), 300).unwrap();

    assert_eq!(store.history(usize::MAX).unwrap().len(), 2);
}

#[test]
fn history_is_newest_first() {
    let (store, _) = store_with_clock();
    store.upsert(today(), 300).unwrap();

    let rows = store.history(10).unwrap();
    assert_eq!(
        rows,
        vec![
            DailyTotal::new(today(), 300),
            DailyTotal::new(today().pred(), 300),
        ]
    );
    assert_eq!(store.history(1).unwrap().len(), 1);
}

// ── Live view ────────────────────────────────────────────────────

#[test]
fn live_view_follows_writes() {
    let (store, _) = store_with_clock();
    let mut view = store.steps_today().subscribe();
    assert_eq!(view.try_next(), Some(None));

    store.upsert(today(), 2_000).unwrap();
    store.upsert(today(), 2_250).unwrap();

    assert_eq!(view.try_next(), Some(Some(0)));
    assert_eq!(view.try_next(), Some(Some(250)));
    assert_eq!(view.try_next(), None);
}

#[test]
fn refresh_view_picks_up_day_rollover() {
    let (store, clock) = store_with_clock();
    store.upsert(today(), 100).unwrap();
    store.upsert(today(), 400).unwrap();
    assert_eq!(store.steps_today().latest(), Some(Some(300)));

    clock.advance_days(1);
    store.refresh_view().unwrap();

    assert_eq!(store.steps_today().latest(), Some(None));
}

#[test]
fn view_generations_increase_per_write() {
    let (store, _) = store_with_clock();
    let before = store.steps_today().generation();
    store.upsert(today(), 1).unwrap();
    store.upsert(today(), 2).unwrap();
    assert_eq!(store.steps_today().generation(), before + 2);
}

#[test]
fn concurrent_writers_keep_latest_view_consistent() {
    let (store, _) = store_with_clock();
    store.upsert(today(), 0).unwrap();

    let handles: Vec<_> = (0..8)
        .map(|i| {
            let store = store.clone();
            let day = Day::from_ymd(2026, 9, 1 + i).unwrap();
            std::thread::spawn(move || {
                for n in 0..10 {
                    store.upsert(day, i64::from(n)).unwrap();
                }
            })
        })
        .collect();
    for h in handles {
        h.join().unwrap();
    }
    store.upsert(today(), 42).unwrap();

    assert_eq!(store.row_count().unwrap(), 10);
    assert_eq!(store.steps_today().latest(), Some(Some(42)));
}

// ── Persistence ──────────────────────────────────────────────────

#[test]
fn file_backed_ledger_survives_reopen() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("steps.duckdb");
    let clock = Arc::new(FixedClock::at_noon(today()));

    {
        let store = LedgerStore::open(&path, clock.clone()).unwrap();
        store.upsert(today(), 7_000).unwrap();
        store.upsert(today(), 7_600).unwrap();
    }

    let reopened = LedgerStore::open(&path, clock).unwrap();
    assert_eq!(reopened.total_as_of(today()).unwrap(), Some(7_600));
    assert_eq!(reopened.steps_today().latest(), Some(Some(600)));
}
