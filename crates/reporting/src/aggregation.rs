//! Period aggregation: fold the weekly records of a window into one set of
//! baseline field values.

use leadcenter_core::schema::ReportingSchema;
use leadcenter_core::types::{FieldValues, RawReportingRecord};
use tracing::debug;

/// Sum every non-metadata field across `records`, starting from the
/// schema defaults. An empty slice yields the defaults unchanged.
///
/// Sums are per field and purely additive: a monthly window over four
/// weekly records gets the four values added together, a weekly window
/// over its single record gets that record's values.
pub fn aggregate_records(schema: &ReportingSchema, records: &[RawReportingRecord]) -> FieldValues {
    let mut values = schema.defaults();

    for record in records {
        for (key, value) in record.numeric_fields() {
            *values.entry(key.to_string()).or_insert(0.0) += value;
        }
    }

    debug!(
        records = records.len(),
        fields = values.len(),
        "Aggregated reporting records"
    );
    metrics::counter!("reporting.records_aggregated").increment(records.len() as u64);

    values
}

/// Coerce a user-entered value for storage: missing or non-finite input
/// becomes 0 and negatives are clamped to 0.
pub fn sanitize_input(value: Option<f64>) -> f64 {
    value.filter(|v| v.is_finite()).unwrap_or(0.0).max(0.0)
}
