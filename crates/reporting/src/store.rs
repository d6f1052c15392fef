//! Reporting and target data stores.
//!
//! The traits are the seam to whatever backend holds the weekly records;
//! the in-memory implementations back the CLI and the tests.

use async_trait::async_trait;
use chrono::{NaiveDate, Utc};
use dashmap::DashMap;
use leadcenter_core::error::LeadCenterResult;
use leadcenter_core::types::{PeriodWindow, RawReportingRecord, ReportingPayload, WeeklyTarget};
use tracing::{debug, info};
use uuid::Uuid;

use crate::aggregation::sanitize_input;

#[async_trait]
pub trait ReportingStore: Send + Sync {
    /// Weekly records whose start date falls inside `window`.
    async fn get_reporting_data(
        &self,
        owner_id: &str,
        window: &PeriodWindow,
    ) -> LeadCenterResult<Vec<RawReportingRecord>>;

    /// Update the record with exactly the payload's start and end date, or
    /// create one. Returns the stored record.
    async fn upsert_reporting_data(
        &self,
        owner_id: &str,
        payload: ReportingPayload,
    ) -> LeadCenterResult<RawReportingRecord>;
}

#[async_trait]
pub trait TargetStore: Send + Sync {
    /// Weekly targets whose start date falls inside `window`.
    async fn get_target_data(
        &self,
        owner_id: &str,
        window: &PeriodWindow,
    ) -> LeadCenterResult<Vec<WeeklyTarget>>;
}

// ---------------------------------------------------------------------------
// In-memory reporting store
// ---------------------------------------------------------------------------

type RecordKey = (String, NaiveDate, NaiveDate);

#[derive(Debug, Default)]
pub struct InMemoryReportingStore {
    records: DashMap<RecordKey, RawReportingRecord>,
}

impl InMemoryReportingStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Seed the store with existing records. Records without an owner are
    /// filed under `owner_id`.
    pub fn from_records(owner_id: &str, records: Vec<RawReportingRecord>) -> Self {
        let store = Self::new();
        for mut record in records {
            let owner = record.owner().unwrap_or(owner_id).to_string();
            record.owner_id = Some(owner.clone());
            store
                .records
                .insert((owner, record.start_date, record.end_date), record);
        }
        store
    }

    /// All records of one owner, ordered by start date.
    pub fn snapshot(&self, owner_id: &str) -> Vec<RawReportingRecord> {
        let mut records: Vec<RawReportingRecord> = self
            .records
            .iter()
            .filter(|entry| entry.key().0 == owner_id)
            .map(|entry| entry.value().clone())
            .collect();
        records.sort_by_key(|r| (r.start_date, r.end_date));
        records
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }
}

#[async_trait]
impl ReportingStore for InMemoryReportingStore {
    async fn get_reporting_data(
        &self,
        owner_id: &str,
        window: &PeriodWindow,
    ) -> LeadCenterResult<Vec<RawReportingRecord>> {
        let mut records: Vec<RawReportingRecord> = self
            .records
            .iter()
            .filter(|entry| entry.key().0 == owner_id && window.contains(entry.key().1))
            .map(|entry| entry.value().clone())
            .collect();
        records.sort_by_key(|r| r.start_date);

        debug!(
            owner_id,
            start = %window.start_date,
            end = %window.end_date,
            count = records.len(),
            "Fetched reporting records"
        );
        Ok(records)
    }

    async fn upsert_reporting_data(
        &self,
        owner_id: &str,
        payload: ReportingPayload,
    ) -> LeadCenterResult<RawReportingRecord> {
        let now = Utc::now();
        let key = (owner_id.to_string(), payload.start_date, payload.end_date);

        let mut created = false;
        let mut entry = self.records.entry(key).or_insert_with(|| {
            created = true;
            let mut record = RawReportingRecord::new(payload.start_date, payload.end_date);
            record.id = Some(Uuid::new_v4().to_string());
            record.owner_id = Some(owner_id.to_string());
            record.created_at = Some(now);
            record.version = Some(0);
            record
        });

        let record = entry.value_mut();
        for (field, value) in payload.fields {
            record
                .fields
                .insert(field, serde_json::Value::from(sanitize_input(Some(value))));
        }
        record.updated_at = Some(now);
        if !created {
            record.version = Some(record.version.unwrap_or(0) + 1);
        }

        info!(
            owner_id,
            start = %record.start_date,
            end = %record.end_date,
            created,
            "Upserted reporting record"
        );
        Ok(record.clone())
    }
}

// ---------------------------------------------------------------------------
// In-memory target store
// ---------------------------------------------------------------------------

#[derive(Debug, Default)]
pub struct InMemoryTargetStore {
    targets: DashMap<String, Vec<WeeklyTarget>>,
}

impl InMemoryTargetStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn from_targets(owner_id: &str, targets: Vec<WeeklyTarget>) -> Self {
        let store = Self::new();
        store.targets.insert(owner_id.to_string(), targets);
        store
    }

    pub fn insert(&self, owner_id: &str, target: WeeklyTarget) {
        self.targets
            .entry(owner_id.to_string())
            .or_default()
            .push(target);
    }
}

#[async_trait]
impl TargetStore for InMemoryTargetStore {
    async fn get_target_data(
        &self,
        owner_id: &str,
        window: &PeriodWindow,
    ) -> LeadCenterResult<Vec<WeeklyTarget>> {
        Ok(self
            .targets
            .get(owner_id)
            .map(|targets| {
                targets
                    .iter()
                    .filter(|t| window.contains(t.start_date))
                    .cloned()
                    .collect()
            })
            .unwrap_or_default())
    }
}
