mod common;

use common::*;
use rust_decimal::Decimal;
use saxofolio::application::sync::{SyncOutcome, SyncState};
use saxofolio::domain::entities::account::AccountBalance;
use saxofolio::domain::entities::activity::ExistingActivity;
use saxofolio::domain::error::DomainError;
use saxofolio::domain::values::data_source::DataSource;
use saxofolio::domain::values::netting_mode::NettingMode;
use std::sync::atomic::Ordering;

fn two_positions_same_instrument() -> FakeBroker {
    FakeBroker::new()
        .with_positions(vec![closed_position("p1", 555, 10), closed_position("p2", 555, 5)])
        .with_instrument(instrument(555, "QUBT:xnas", None))
}

#[tokio::test]
async fn test_end_to_end_sync() {
    let h = setup(two_positions_same_instrument(), FakeTracker::new());

    let report = h.app.sync().await.unwrap();

    assert_eq!(report.outcome(), SyncOutcome::Complete);
    assert_eq!(report.state, SyncState::Done);
    assert_eq!(report.fetched, 2);
    assert_eq!(report.normalized, 2);
    assert_eq!(report.new, 2);
    assert_eq!(report.submitted, 2);
    assert_eq!(report.chunks.len(), 1);
    assert_eq!(report.lookups, 1);
    assert_eq!(h.broker.lookup_count(), 1);
    assert!(report.balance_updated);
    assert_eq!(h.tracker.balance_updates.lock().unwrap().len(), 1);

    let stored = h.tracker.stored();
    assert_eq!(stored.len(), 2);
    assert!(stored.iter().all(|a| a.symbol == "QUBT"));
    assert!(stored.iter().all(|a| a.data_source == DataSource::Yahoo));
    let mut comments: Vec<_> = stored.iter().map(|a| a.comment.as_str()).collect();
    comments.sort();
    assert_eq!(comments, vec!["saxoPositionId=p1", "saxoPositionId=p2"]);
}

#[tokio::test]
async fn test_rerun_imports_nothing() {
    let h = setup(two_positions_same_instrument(), FakeTracker::new());

    h.app.sync().await.unwrap();
    let second = h.app.sync().await.unwrap();

    assert_eq!(second.outcome(), SyncOutcome::Complete);
    assert_eq!(second.new, 0);
    assert_eq!(second.duplicates, 2);
    assert!(second.chunks.is_empty());
    assert_eq!(h.tracker.import_count(), 1);
    assert_eq!(h.tracker.stored().len(), 2);
    // balance is refreshed on every run
    assert_eq!(h.tracker.balance_updates.lock().unwrap().len(), 2);
}

#[tokio::test]
async fn test_failed_chunk_is_retried_by_next_run() {
    let positions = (0..23)
        .map(|i| closed_position(&format!("pos-{i}"), 1000 + i, 1))
        .collect();
    let h = setup(
        FakeBroker::new().with_positions(positions),
        FakeTracker::new().failing_on(&[1]),
    );

    let first = h.app.sync().await.unwrap();
    assert_eq!(first.outcome(), SyncOutcome::Degraded);
    assert_eq!(first.chunks.len(), 3);
    assert_eq!(first.submitted, 13);
    assert_eq!(first.failed, 10);
    assert!(!first.chunks[1].success);
    assert!(first.chunks[2].success);
    assert!(first.balance_updated);

    let second = h.app.sync().await.unwrap();
    assert_eq!(second.outcome(), SyncOutcome::Complete);
    assert_eq!(second.new, 10);
    assert_eq!(second.duplicates, 13);
    assert_eq!(h.tracker.stored().len(), 23);
}

#[tokio::test]
async fn test_configuration_error_touches_nothing() {
    let mut cfg = config();
    cfg.account_key = String::new();
    let h = setup_with(
        two_positions_same_instrument(),
        FakeTracker::new(),
        StaticSymbolMap::default(),
        cfg,
    );

    let report = h.app.sync().await.unwrap();

    assert_eq!(report.outcome(), SyncOutcome::Failed);
    assert_eq!(report.failed_at, Some(SyncState::Init));
    assert!(report.error.unwrap().contains("source account key"));
    assert!(h.broker.fetch_modes.lock().unwrap().is_empty());
    assert!(h.tracker.accounts.lock().unwrap().is_empty());
}

#[tokio::test]
async fn test_fetch_failure_ends_run() {
    let broker = two_positions_same_instrument();
    *broker.fail_fetch.lock().unwrap() = true;
    let h = setup(broker, FakeTracker::new());

    let report = h.app.sync().await.unwrap();

    assert_eq!(report.outcome(), SyncOutcome::Failed);
    assert_eq!(report.failed_at, Some(SyncState::AccountResolved));
    assert_eq!(h.tracker.import_count(), 0);
    assert!(h.tracker.balance_updates.lock().unwrap().is_empty());
}

#[tokio::test]
async fn test_held_lock_skips_run() {
    let h = setup(two_positions_same_instrument(), FakeTracker::new());
    *h.lock.holder.lock().unwrap() = Some("4242:other-run".into());

    let err = h.app.sync().await.unwrap_err();

    assert!(matches!(err, DomainError::RunInProgress(ref holder) if holder == "4242:other-run"));
    assert!(h.broker.fetch_modes.lock().unwrap().is_empty());
    assert_eq!(h.tracker.import_count(), 0);
}

#[tokio::test]
async fn test_lock_released_after_failed_run() {
    let broker = two_positions_same_instrument();
    *broker.fail_fetch.lock().unwrap() = true;
    let h = setup(broker, FakeTracker::new());

    h.app.sync().await.unwrap();

    assert!(h.lock.holder.lock().unwrap().is_none());
    assert_eq!(h.lock.releases.load(Ordering::SeqCst), 1);
}

#[tokio::test]
async fn test_unnormalizable_position_is_skipped() {
    let broker = FakeBroker::new().with_positions(vec![
        closed_position("ok-1", 10, 4),
        closed_position("zero", 11, 0),
        closed_position("ok-2", 12, 2),
    ]);
    let h = setup(broker, FakeTracker::new());

    let report = h.app.sync().await.unwrap();

    assert_eq!(report.outcome(), SyncOutcome::Complete);
    assert_eq!(report.normalization_failures, 1);
    assert_eq!(report.normalized, 2);
    assert_eq!(h.tracker.stored().len(), 2);
}

#[tokio::test]
async fn test_ids_sharing_a_prefix_are_not_merged() {
    let broker = FakeBroker::new().with_positions(vec![
        closed_position("5023811,1", 10, 4),
        closed_position("5023811,2", 10, 3),
        closed_position("5023811", 10, 2),
    ]);
    let h = setup(broker, FakeTracker::new());

    let report = h.app.sync().await.unwrap();

    assert_eq!(report.normalization_failures, 2);
    assert_eq!(report.duplicates, 0);
    assert_eq!(report.new, 1);
    let stored = h.tracker.stored();
    assert_eq!(stored.len(), 1);
    assert_eq!(stored[0].position_id(), Some("5023811"));
}

#[tokio::test]
async fn test_unknown_instruments_fall_back() {
    let broker = FakeBroker::new().with_positions(vec![closed_position("x", 777, 1)]);
    let h = setup(broker, FakeTracker::new());

    h.app.sync().await.unwrap();

    let stored = h.tracker.stored();
    assert_eq!(stored[0].symbol, "SAXO777");
    assert_eq!(stored[0].data_source, DataSource::Manual);
}

#[tokio::test]
async fn test_manual_mapping_applies() {
    let mut position = closed_position("m1", 900, 3);
    position.symbol_hint = Some("VUSA:xams".into());
    let broker = FakeBroker::new()
        .with_positions(vec![position])
        .with_instrument(instrument(900, "VUSA:xams", None));
    let h = setup_with(
        broker,
        FakeTracker::new(),
        StaticSymbolMap::with(&[("VUSA:xams", "VUSA.AS")]),
        config(),
    );

    h.app.sync().await.unwrap();

    assert_eq!(h.tracker.stored()[0].symbol, "VUSA.AS");
}

#[tokio::test]
async fn test_broken_mapping_source_is_not_fatal() {
    let symbols = StaticSymbolMap {
        fail: true,
        ..Default::default()
    };
    let h = setup_with(two_positions_same_instrument(), FakeTracker::new(), symbols, config());

    let report = h.app.sync().await.unwrap();

    assert_eq!(report.outcome(), SyncOutcome::Complete);
    assert_eq!(h.tracker.stored().len(), 2);
}

#[tokio::test]
async fn test_balance_currency_mismatch_is_reported() {
    let broker = two_positions_same_instrument();
    *broker.balance.lock().unwrap() = Some(AccountBalance {
        cash: Decimal::new(500, 0),
        currency: "EUR".into(),
    });
    let h = setup(broker, FakeTracker::new());

    let report = h.app.sync().await.unwrap();

    assert_eq!(report.outcome(), SyncOutcome::Complete);
    assert!(!report.balance_updated);
    assert!(report.balance_error.unwrap().contains("EUR"));
    assert!(h.tracker.balance_updates.lock().unwrap().is_empty());
}

#[tokio::test]
async fn test_balance_update_failure_is_not_fatal() {
    let tracker = FakeTracker::new();
    *tracker.fail_balance.lock().unwrap() = true;
    let h = setup(two_positions_same_instrument(), tracker);

    let report = h.app.sync().await.unwrap();

    assert_eq!(report.outcome(), SyncOutcome::Complete);
    assert_eq!(report.state, SyncState::Done);
    assert!(report.balance_error.is_some());
}

#[tokio::test]
async fn test_manual_activities_are_ignored_by_dedup() {
    let tracker = FakeTracker::new();
    tracker.preexisting.lock().unwrap().push(ExistingActivity {
        id: "manual-1".into(),
        symbol: Some("AAPL".into()),
        activity_type: Some("BUY".into()),
        date: None,
        quantity: None,
        unit_price: None,
        fee: None,
        currency: None,
        comment: Some("bought on a whim".into()),
    });
    let h = setup(two_positions_same_instrument(), tracker);

    let report = h.app.sync().await.unwrap();

    assert_eq!(report.new, 2);
    assert_eq!(report.duplicates, 0);
}

#[tokio::test]
async fn test_no_positions_skips_listing() {
    let h = setup(FakeBroker::new(), FakeTracker::new());

    let report = h.app.sync().await.unwrap();

    assert_eq!(report.outcome(), SyncOutcome::Complete);
    assert_eq!(report.fetched, 0);
    assert_eq!(h.tracker.list_calls.load(Ordering::SeqCst), 0);
    assert!(report.balance_updated);
}

#[tokio::test]
async fn test_netting_mode_is_passed_to_broker() {
    let mut cfg = config();
    cfg.netting_mode = NettingMode::Intraday;
    let h = setup_with(FakeBroker::new(), FakeTracker::new(), StaticSymbolMap::default(), cfg);

    h.app.sync().await.unwrap();

    assert_eq!(*h.broker.fetch_modes.lock().unwrap(), vec![NettingMode::Intraday]);
}

#[tokio::test]
async fn test_list_and_delete_activities() {
    let h = setup(two_positions_same_instrument(), FakeTracker::new());
    h.app.sync().await.unwrap();

    assert_eq!(h.app.list_activities().await.unwrap().len(), 2);
    h.app.delete_all_activities().await.unwrap();
    assert!(h.app.list_activities().await.unwrap().is_empty());
    assert!(h.lock.holder.lock().unwrap().is_none());
}

#[tokio::test]
async fn test_authorize_requires_oauth_adapter() {
    let h = setup(FakeBroker::new(), FakeTracker::new());
    let err = h.app.authorize(|_| {}).await.unwrap_err();
    assert!(matches!(err, DomainError::Configuration(_)));
}
