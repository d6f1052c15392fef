//! Reporting session: the editable state behind the actual-data and
//! target pages.
//!
//! A session owns one selected window at a time. Selecting a window bumps
//! a load generation and hands out a [`LoadTicket`]; data loaded under an
//! older ticket is discarded on arrival, so a slow fetch for a previous
//! selection can never overwrite the current one.

use std::collections::BTreeSet;
use std::sync::Arc;

use chrono::NaiveDate;
use leadcenter_core::error::{LeadCenterError, LeadCenterResult};
use leadcenter_core::schema::ReportingSchema;
use leadcenter_core::types::{
    FieldValues, PeriodType, PeriodWindow, RawReportingRecord, ReportingPayload, TargetValues,
    WeeklyTarget,
};
use tracing::{debug, error, info};

use crate::aggregation::{aggregate_records, sanitize_input};
use crate::calculation::{CalculationGraph, FormulaTable, TARGET_COM_KEY, TARGET_REVENUE_KEY};
use crate::edit_lock::{EditLock, EditLockStatus, PageMode, Unlocked};
use crate::store::{ReportingStore, TargetStore};
use crate::targets::process_target_data;

// ---------------------------------------------------------------------------
// Loading
// ---------------------------------------------------------------------------

/// Identifies one window selection. Only data loaded under the current
/// ticket is applied.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct LoadTicket {
    generation: u64,
    window: PeriodWindow,
}

impl LoadTicket {
    pub fn window(&self) -> &PeriodWindow {
        &self.window
    }
}

/// Records and targets fetched for one ticket.
#[derive(Debug, Clone)]
pub struct WindowData {
    pub ticket: LoadTicket,
    pub records: Vec<RawReportingRecord>,
    pub targets: Vec<WeeklyTarget>,
}

/// Detached fetcher holding only the stores, so a load can run while the
/// session itself keeps taking edits.
#[derive(Clone)]
pub struct WindowLoader {
    owner_id: String,
    store: Arc<dyn ReportingStore>,
    target_store: Arc<dyn TargetStore>,
}

impl WindowLoader {
    pub async fn load(&self, ticket: LoadTicket) -> LeadCenterResult<WindowData> {
        let records = self
            .store
            .get_reporting_data(&self.owner_id, &ticket.window)
            .await?;
        let targets = self
            .target_store
            .get_target_data(&self.owner_id, &ticket.window)
            .await?;
        Ok(WindowData {
            ticket,
            records,
            targets,
        })
    }
}

// ---------------------------------------------------------------------------
// Session
// ---------------------------------------------------------------------------

pub struct ReportingSession {
    owner_id: String,
    schema: Arc<ReportingSchema>,
    graph: Arc<dyn CalculationGraph>,
    store: Arc<dyn ReportingStore>,
    target_store: Arc<dyn TargetStore>,
    edit_lock: Arc<dyn EditLock>,
    mode: PageMode,

    selected_date: NaiveDate,
    period: PeriodType,
    generation: u64,

    records: Vec<RawReportingRecord>,
    field_values: FieldValues,
    targets: TargetValues,
    calculated: FieldValues,
    /// Calculated values as they were before the most recent edit.
    prev_calculated: FieldValues,
    last_changed: Option<String>,
}

impl ReportingSession {
    /// New weekly session on `selected_date` using the default schema and
    /// formula table, with editing unlocked. Nothing is loaded until
    /// [`refresh`](Self::refresh) runs.
    pub fn new(
        owner_id: impl Into<String>,
        store: Arc<dyn ReportingStore>,
        target_store: Arc<dyn TargetStore>,
        selected_date: NaiveDate,
    ) -> Self {
        let mut session = Self {
            owner_id: owner_id.into(),
            schema: Arc::new(ReportingSchema::default()),
            graph: Arc::new(FormulaTable::default()),
            store,
            target_store,
            edit_lock: Arc::new(Unlocked),
            mode: PageMode::AddActualData,
            selected_date,
            period: PeriodType::Weekly,
            generation: 0,
            records: Vec::new(),
            field_values: FieldValues::new(),
            targets: TargetValues::default(),
            calculated: FieldValues::new(),
            prev_calculated: FieldValues::new(),
            last_changed: None,
        };
        session.reset_values();
        session
    }

    pub fn with_schema(mut self, schema: Arc<ReportingSchema>) -> Self {
        self.schema = schema;
        self.reset_values();
        self
    }

    pub fn with_graph(mut self, graph: Arc<dyn CalculationGraph>) -> Self {
        self.graph = graph;
        self.recalculate();
        self.prev_calculated = self.calculated.clone();
        self
    }

    pub fn with_edit_lock(mut self, edit_lock: Arc<dyn EditLock>) -> Self {
        self.edit_lock = edit_lock;
        self
    }

    pub fn with_mode(mut self, mode: PageMode) -> Self {
        self.mode = mode;
        self
    }

    // --- selection & loading ---

    /// Switch to another window. Any load still in flight for the previous
    /// selection becomes stale.
    pub fn select(&mut self, date: NaiveDate, period: PeriodType) -> LoadTicket {
        self.selected_date = date;
        self.period = period;
        self.generation += 1;
        self.last_changed = None;
        debug!(
            owner_id = %self.owner_id,
            date = %date,
            period = %period,
            generation = self.generation,
            "Selected reporting window"
        );
        self.current_ticket()
    }

    pub fn current_ticket(&self) -> LoadTicket {
        LoadTicket {
            generation: self.generation,
            window: self.window(),
        }
    }

    pub fn loader(&self) -> WindowLoader {
        WindowLoader {
            owner_id: self.owner_id.clone(),
            store: Arc::clone(&self.store),
            target_store: Arc::clone(&self.target_store),
        }
    }

    /// Fetch records and targets for the current selection and apply them.
    pub async fn refresh(&mut self) -> LeadCenterResult<()> {
        let data = self.loader().load(self.current_ticket()).await?;
        self.apply(data);
        Ok(())
    }

    /// Apply loaded data. Returns `false` if it was loaded for an earlier
    /// selection and has been dropped.
    pub fn apply(&mut self, data: WindowData) -> bool {
        let WindowData {
            ticket,
            records,
            targets,
        } = data;
        self.apply_records(ticket, records) && self.apply_targets(ticket, targets)
    }

    /// Replace the window's records and re-aggregate the baseline values.
    pub fn apply_records(&mut self, ticket: LoadTicket, records: Vec<RawReportingRecord>) -> bool {
        if !self.is_current(&ticket, "records") {
            return false;
        }
        self.field_values = aggregate_records(&self.schema, &records);
        self.records = records;
        self.last_changed = None;
        self.recalculate();
        self.prev_calculated = self.calculated.clone();
        true
    }

    pub fn apply_targets(&mut self, ticket: LoadTicket, targets: Vec<WeeklyTarget>) -> bool {
        if !self.is_current(&ticket, "targets") {
            return false;
        }
        self.targets = process_target_data(&targets).unwrap_or_default();
        self.recalculate();
        // Keep the pre-edit snapshot while an edit is highlighted.
        if self.last_changed.is_none() {
            self.prev_calculated = self.calculated.clone();
        }
        true
    }

    fn is_current(&self, ticket: &LoadTicket, what: &'static str) -> bool {
        if ticket.generation == self.generation {
            return true;
        }
        debug!(
            what,
            ticket = ticket.generation,
            current = self.generation,
            "Discarding stale window data"
        );
        metrics::counter!("reporting.stale_loads").increment(1);
        false
    }

    // --- values ---

    pub fn owner_id(&self) -> &str {
        &self.owner_id
    }

    pub fn schema(&self) -> &ReportingSchema {
        &self.schema
    }

    pub fn selected_date(&self) -> NaiveDate {
        self.selected_date
    }

    pub fn period(&self) -> PeriodType {
        self.period
    }

    pub fn mode(&self) -> PageMode {
        self.mode
    }

    pub fn window(&self) -> PeriodWindow {
        PeriodWindow::for_date(self.period, self.selected_date)
    }

    pub fn records(&self) -> &[RawReportingRecord] {
        &self.records
    }

    pub fn targets(&self) -> TargetValues {
        self.targets
    }

    pub fn last_changed(&self) -> Option<&str> {
        self.last_changed.as_deref()
    }

    pub fn field_values(&self) -> &FieldValues {
        &self.field_values
    }

    pub fn calculated_values(&self) -> &FieldValues {
        &self.calculated
    }

    /// Input and calculated values in one map.
    pub fn display_values(&self) -> FieldValues {
        let mut values = self.field_values.clone();
        values.extend(self.calculated.iter().map(|(k, v)| (k.clone(), *v)));
        values
    }

    /// True when an edit since the last load changed this calculated field.
    pub fn is_highlighted(&self, field: &str) -> bool {
        self.last_changed.is_some() && self.prev_calculated.get(field) != self.calculated.get(field)
    }

    /// Fields currently highlighted, in key order. Includes fields that
    /// became unavailable.
    pub fn highlighted_fields(&self) -> Vec<&str> {
        let names: BTreeSet<&str> = self
            .calculated
            .keys()
            .chain(self.prev_calculated.keys())
            .map(String::as_str)
            .collect();
        names.into_iter().filter(|f| self.is_highlighted(f)).collect()
    }

    // --- editing ---

    pub fn edit_lock_status(&self) -> EditLockStatus {
        self.edit_lock
            .check(self.period, self.selected_date, self.mode)
    }

    fn ensure_editable(&self) -> LeadCenterResult<()> {
        let status = self.edit_lock_status();
        if status.is_disabled {
            return Err(LeadCenterError::EditLocked(
                status
                    .disabled_message
                    .unwrap_or_else(|| "editing is disabled for this window".to_string()),
            ));
        }
        Ok(())
    }

    /// Set one input field and recompute. Missing or non-finite values
    /// become 0, negatives are clamped to 0. Returns the stored value.
    pub fn handle_input_change(&mut self, field: &str, value: Option<f64>) -> LeadCenterResult<f64> {
        self.ensure_editable()?;
        if !self.schema.is_input(field) {
            return Err(LeadCenterError::Validation(format!(
                "'{field}' is not an input field"
            )));
        }

        let value = sanitize_input(value);
        self.prev_calculated = self.calculated.clone();
        self.field_values.insert(field.to_string(), value);
        self.last_changed = Some(field.to_string());
        self.recalculate();

        debug!(field, value, "Input changed");
        Ok(value)
    }

    fn reset_values(&mut self) {
        self.field_values = self.schema.defaults();
        self.last_changed = None;
        self.recalculate();
        self.prev_calculated = self.calculated.clone();
    }

    fn recalculate(&mut self) {
        let mut inputs = self.field_values.clone();
        inputs.insert(TARGET_COM_KEY.to_string(), self.targets.com);
        inputs.insert(TARGET_REVENUE_KEY.to_string(), self.targets.revenue);
        self.calculated = self.graph.calculate(&inputs);
    }

    // --- saving ---

    /// Payload for the week containing the selected date, carrying only
    /// schema input fields.
    pub fn build_save_payload(&self) -> ReportingPayload {
        let week = PeriodWindow::weekly(self.selected_date);
        let fields = self
            .schema
            .input_field_names()
            .into_iter()
            .filter_map(|name| {
                self.field_values
                    .get(name)
                    .map(|value| (name.to_string(), *value))
            })
            .collect();
        ReportingPayload {
            start_date: week.start_date,
            end_date: week.end_date,
            fields,
        }
    }

    /// Upsert the selected week. On failure nothing in the session changes.
    pub async fn save(&mut self) -> LeadCenterResult<RawReportingRecord> {
        self.ensure_editable()?;
        let payload = self.build_save_payload();
        let (start, end) = (payload.start_date, payload.end_date);

        match self
            .store
            .upsert_reporting_data(&self.owner_id, payload)
            .await
        {
            Ok(record) => {
                metrics::counter!("reporting.saves").increment(1);
                info!(
                    owner_id = %self.owner_id,
                    start = %start,
                    end = %end,
                    "Saved reporting data"
                );
                match self
                    .records
                    .iter_mut()
                    .find(|r| r.start_date == record.start_date && r.end_date == record.end_date)
                {
                    Some(existing) => *existing = record.clone(),
                    None => self.records.push(record.clone()),
                }
                Ok(record)
            }
            Err(e) => {
                metrics::counter!("reporting.save_errors").increment(1);
                error!(
                    owner_id = %self.owner_id,
                    start = %start,
                    end = %end,
                    error = %e,
                    "Failed to save reporting data"
                );
                Err(e)
            }
        }
    }

    /// Whether the loaded records include the week containing the
    /// selected date.
    pub fn is_existing_data(&self) -> bool {
        let week_start = PeriodWindow::weekly(self.selected_date).start_date;
        self.records.iter().any(|r| r.start_date == week_start)
    }
}
