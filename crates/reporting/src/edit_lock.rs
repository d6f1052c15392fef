//! Editability rules for reporting windows.

use chrono::{Duration, NaiveDate, Utc};
use leadcenter_core::config::ReportingConfig;
use leadcenter_core::types::{PeriodType, PeriodWindow};
use serde::{Deserialize, Serialize};

/// Which page is editing the window: weekly actuals, or targets.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PageMode {
    #[default]
    AddActualData,
    SetTargets,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EditLockStatus {
    pub is_disabled: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub disabled_message: Option<String>,
}

impl EditLockStatus {
    pub fn unlocked() -> Self {
        Self::default()
    }

    pub fn locked(message: impl Into<String>) -> Self {
        Self {
            is_disabled: true,
            disabled_message: Some(message.into()),
        }
    }
}

/// Decides whether a window may be edited.
pub trait EditLock: Send + Sync {
    fn check(&self, period: PeriodType, date: NaiveDate, mode: PageMode) -> EditLockStatus;
}

/// Never locks.
#[derive(Debug, Clone, Copy, Default)]
pub struct Unlocked;

impl EditLock for Unlocked {
    fn check(&self, _period: PeriodType, _date: NaiveDate, _mode: PageMode) -> EditLockStatus {
        EditLockStatus::unlocked()
    }
}

/// Date-based lock.
///
/// Actual data is entered per week, so only weekly windows are editable in
/// [`PageMode::AddActualData`]; weeks that have not started are locked when
/// `lock_future_weeks` is set, and weeks that ended more than
/// `lock_after_weeks` weeks ago are locked when that is set. Targets are
/// set ahead of time, so in [`PageMode::SetTargets`] only windows that have
/// already ended are locked.
#[derive(Debug, Clone, Default)]
pub struct PeriodEditLock {
    pub lock_future_weeks: bool,
    pub lock_after_weeks: Option<u32>,
    /// Fixed clock for tests; `None` reads the current UTC date.
    pub today: Option<NaiveDate>,
}

impl PeriodEditLock {
    pub fn from_config(config: &ReportingConfig) -> Self {
        Self {
            lock_future_weeks: config.lock_future_weeks,
            lock_after_weeks: config.lock_after_weeks,
            today: None,
        }
    }

    pub fn with_today(mut self, today: NaiveDate) -> Self {
        self.today = Some(today);
        self
    }

    fn today(&self) -> NaiveDate {
        self.today.unwrap_or_else(|| Utc::now().date_naive())
    }
}

impl EditLock for PeriodEditLock {
    fn check(&self, period: PeriodType, date: NaiveDate, mode: PageMode) -> EditLockStatus {
        let today = self.today();
        let window = PeriodWindow::for_date(period, date);

        match mode {
            PageMode::AddActualData => {
                if period != PeriodType::Weekly {
                    return EditLockStatus::locked(format!(
                        "Switch to the weekly view to edit data ({} view is read-only)",
                        period
                    ));
                }
                if self.lock_future_weeks && window.start_date > today {
                    return EditLockStatus::locked(format!(
                        "Week of {} has not started yet",
                        window.label()
                    ));
                }
                if let Some(weeks) = self.lock_after_weeks {
                    let cutoff = today - Duration::weeks(weeks as i64);
                    if window.end_date < cutoff {
                        return EditLockStatus::locked(format!(
                            "Week of {} is older than {} weeks and can no longer be edited",
                            window.label(),
                            weeks
                        ));
                    }
                }
                EditLockStatus::unlocked()
            }
            PageMode::SetTargets => {
                if window.end_date < today {
                    EditLockStatus::locked(format!(
                        "Targets for {} are in the past",
                        window.label()
                    ))
                } else {
                    EditLockStatus::unlocked()
                }
            }
        }
    }
}
