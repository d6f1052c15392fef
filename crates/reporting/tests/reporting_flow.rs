//! End-to-end reporting flow: load a window from the stores, edit inputs,
//! and save the week back.

use std::sync::Arc;

use async_trait::async_trait;
use chrono::NaiveDate;
use leadcenter_core::error::{LeadCenterError, LeadCenterResult};
use leadcenter_core::types::{
    PeriodType, PeriodWindow, RawReportingRecord, ReportingPayload, WeeklyTarget,
};
use leadcenter_reporting::{
    EditLock, InMemoryReportingStore, InMemoryTargetStore, PageMode, PeriodEditLock,
    ReportingSession, ReportingStore,
};

fn date(m: u32, d: u32) -> NaiveDate {
    NaiveDate::from_ymd_opt(2024, m, d).unwrap()
}

fn week(m: u32, d: u32) -> RawReportingRecord {
    RawReportingRecord::new(date(m, d), date(m, d) + chrono::Duration::days(6))
}

fn seeded_store() -> Arc<InMemoryReportingStore> {
    Arc::new(InMemoryReportingStore::from_records(
        "acme",
        vec![
            week(3, 4)
                .with_field("adSpend", 100.0)
                .with_field("leads", 4.0)
                .with_field("revenue", 2_000.0),
            week(3, 11)
                .with_field("adSpend", 150.0)
                .with_field("leads", 6.0),
            week(4, 1).with_field("adSpend", 999.0),
        ],
    ))
}

fn targets() -> Arc<InMemoryTargetStore> {
    Arc::new(InMemoryTargetStore::from_targets(
        "acme",
        vec![
            WeeklyTarget {
                start_date: date(3, 4),
                end_date: date(3, 10),
                revenue: Some(10_000.0),
                com: Some(10.0),
            },
            WeeklyTarget {
                start_date: date(3, 11),
                end_date: date(3, 17),
                revenue: Some(10_000.0),
                com: Some(20.0),
            },
        ],
    ))
}

/// Store whose writes always fail.
struct FailingStore {
    inner: InMemoryReportingStore,
}

#[async_trait]
impl ReportingStore for FailingStore {
    async fn get_reporting_data(
        &self,
        owner_id: &str,
        window: &PeriodWindow,
    ) -> LeadCenterResult<Vec<RawReportingRecord>> {
        self.inner.get_reporting_data(owner_id, window).await
    }

    async fn upsert_reporting_data(
        &self,
        _owner_id: &str,
        _payload: ReportingPayload,
    ) -> LeadCenterResult<RawReportingRecord> {
        Err(LeadCenterError::Store("connection reset".into()))
    }
}

// ---------------------------------------------------------------------------
// 1. Aggregation over a window
// ---------------------------------------------------------------------------

#[tokio::test]
async fn test_monthly_window_sums_weeks() {
    let mut session = ReportingSession::new("acme", seeded_store(), targets(), date(3, 6));
    session.select(date(3, 20), PeriodType::Monthly);
    session.refresh().await.unwrap();

    assert_eq!(session.records().len(), 2);
    assert_eq!(session.field_values()["adSpend"], 250.0);
    assert_eq!(session.field_values()["leads"], 10.0);
    assert_eq!(session.calculated_values()["totalSpend"], 250.0);
    assert_eq!(session.calculated_values()["costPerLead"], 25.0);

    // Targets: 20k revenue, com averaged to 15%.
    assert_eq!(session.targets().revenue, 20_000.0);
    assert_eq!(session.targets().com, 15.0);
    assert_eq!(session.calculated_values()["budget"], 3_000.0);
    assert_eq!(session.calculated_values()["remainingBudget"], 2_750.0);
}

#[tokio::test]
async fn test_empty_window_yields_defaults() {
    let mut session = ReportingSession::new(
        "acme",
        seeded_store(),
        Arc::new(InMemoryTargetStore::new()),
        date(6, 12),
    );
    session.refresh().await.unwrap();

    assert!(session.records().is_empty());
    assert!(!session.is_existing_data());
    assert!(session.field_values().values().all(|v| *v == 0.0));
    assert_eq!(session.targets().revenue, 0.0);
}

// ---------------------------------------------------------------------------
// 2. Editing
// ---------------------------------------------------------------------------

#[tokio::test]
async fn test_edits_clamp_and_highlight() {
    let mut session = ReportingSession::new("acme", seeded_store(), targets(), date(3, 6));
    session.refresh().await.unwrap();
    assert!(session.is_existing_data());
    assert!(!session.is_highlighted("totalSpend"));

    assert_eq!(session.handle_input_change("adSpend", Some(-50.0)).unwrap(), 0.0);
    assert_eq!(session.field_values()["adSpend"], 0.0);
    assert!(session.is_highlighted("totalSpend"));
    assert!(session.is_highlighted("costPerLead"));

    assert_eq!(session.handle_input_change("otherMarketingSpend", Some(f64::NAN)).unwrap(), 0.0);
    // Nothing changed by the second edit.
    assert!(!session.is_highlighted("totalSpend"));
}

#[tokio::test]
async fn test_locked_session_rejects_edits_and_saves() {
    let lock: Arc<dyn EditLock> = Arc::new(PeriodEditLock {
        lock_future_weeks: true,
        lock_after_weeks: None,
        today: Some(date(3, 6)),
    });
    let store = seeded_store();
    let mut session = ReportingSession::new("acme", store.clone(), targets(), date(3, 6))
        .with_edit_lock(lock)
        .with_mode(PageMode::AddActualData);
    session.refresh().await.unwrap();
    assert!(!session.edit_lock_status().is_disabled);

    session.select(date(3, 6), PeriodType::Monthly);
    session.refresh().await.unwrap();
    let status = session.edit_lock_status();
    assert!(status.is_disabled);
    assert!(status.disabled_message.is_some());

    let err = session.handle_input_change("adSpend", Some(1.0)).unwrap_err();
    assert!(matches!(err, LeadCenterError::EditLocked(_)));
    assert_eq!(session.field_values()["adSpend"], 250.0);
    assert!(session.save().await.is_err());

    session.select(date(3, 25), PeriodType::Weekly);
    assert!(session.edit_lock_status().is_disabled);
}

// ---------------------------------------------------------------------------
// 3. Saving
// ---------------------------------------------------------------------------

#[tokio::test]
async fn test_save_updates_existing_week() {
    let store = seeded_store();
    let mut session = ReportingSession::new("acme", store.clone(), targets(), date(3, 6));
    session.refresh().await.unwrap();

    session.handle_input_change("adSpend", Some(175.0)).unwrap();
    let payload = session.build_save_payload();
    assert_eq!(payload.start_date, date(3, 4));
    assert_eq!(payload.end_date, date(3, 10));
    assert!(payload.fields.keys().all(|k| session.schema().is_input(k)));

    let saved = session.save().await.unwrap();
    assert_eq!(saved.numeric("adSpend"), 175.0);
    assert_eq!(saved.numeric("revenue"), 2_000.0);
    assert_eq!(saved.version, Some(1));
    assert_eq!(store.len(), 3);

    let json = serde_json::to_value(&saved).unwrap();
    assert!(json.get("totalSpend").is_none());
    assert!(json.get("costPerLead").is_none());
}

#[tokio::test]
async fn test_save_creates_new_week() {
    let store = seeded_store();
    let mut session = ReportingSession::new("acme", store.clone(), targets(), date(3, 20));
    session.refresh().await.unwrap();
    assert!(!session.is_existing_data());

    session.handle_input_change("leads", Some(7.0)).unwrap();
    let saved = session.save().await.unwrap();
    assert!(saved.id.is_some());
    assert_eq!(saved.start_date, date(3, 18));
    assert_eq!(store.len(), 4);
    assert!(session.is_existing_data());
}

#[tokio::test]
async fn test_failed_save_leaves_state_unchanged() {
    let inner = InMemoryReportingStore::from_records("acme", vec![week(3, 4).with_field("adSpend", 100.0)]);
    let mut session = ReportingSession::new(
        "acme",
        Arc::new(FailingStore { inner }),
        targets(),
        date(3, 6),
    );
    session.refresh().await.unwrap();
    session.handle_input_change("adSpend", Some(80.0)).unwrap();

    let values = session.field_values().clone();
    let records = session.records().to_vec();

    let err = session.save().await.unwrap_err();
    assert!(matches!(err, LeadCenterError::Store(_)));
    assert_eq!(session.field_values(), &values);
    assert_eq!(session.records(), records.as_slice());
    assert!(session.is_highlighted("totalSpend"));
}

// ---------------------------------------------------------------------------
// 4. Stale loads
// ---------------------------------------------------------------------------

#[tokio::test]
async fn test_stale_load_is_discarded() {
    let mut session = ReportingSession::new("acme", seeded_store(), targets(), date(3, 6));
    let loader = session.loader();

    let first = session.current_ticket();
    let pending = loader.load(first).await.unwrap();

    // User moves to another week before the first load lands.
    let second = session.select(date(3, 13), PeriodType::Weekly);
    assert!(!session.apply(pending));
    assert!(session.records().is_empty());

    let current = loader.load(second).await.unwrap();
    assert!(session.apply(current));
    assert_eq!(session.field_values()["adSpend"], 150.0);
    assert_eq!(session.targets().com, 20.0);
}
