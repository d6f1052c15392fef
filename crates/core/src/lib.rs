pub mod config;
pub mod error;
pub mod format;
pub mod schema;
pub mod types;

pub use config::AppConfig;
pub use error::{LeadCenterError, LeadCenterResult};
pub use schema::{FieldDescriptor, FieldType, MetricFormat, ReportingSchema, SchemaSection};
pub use types::{
    FieldValues, PeriodType, PeriodWindow, RawReportingRecord, ReportingPayload, TargetValues,
    WeeklyTarget,
};
