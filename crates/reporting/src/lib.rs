//! Weekly/monthly/yearly reporting: period aggregation, the calculation
//! graph for derived budget fields, edit locking, and the reporting
//! session that ties them to the data stores.

pub mod aggregation;
pub mod calculation;
pub mod edit_lock;
pub mod session;
pub mod store;
pub mod targets;

pub use aggregation::{aggregate_records, sanitize_input};
pub use calculation::{CalculationGraph, Formula, FormulaRule, FormulaTable};
pub use edit_lock::{EditLock, EditLockStatus, PageMode, PeriodEditLock, Unlocked};
pub use session::{LoadTicket, ReportingSession, WindowData, WindowLoader};
pub use store::{InMemoryReportingStore, InMemoryTargetStore, ReportingStore, TargetStore};
pub use targets::process_target_data;
