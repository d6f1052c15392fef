use chrono::{DateTime, Datelike, Duration, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Field name -> numeric value. Ordered so payloads and printed reports
/// are stable.
pub type FieldValues = BTreeMap<String, f64>;

/// Keys on a stored reporting record that describe the record rather than
/// a reporting field. They are never summed.
pub const METADATA_KEYS: &[&str] = &[
    "_id",
    "id",
    "userId",
    "ownerId",
    "startDate",
    "endDate",
    "createdAt",
    "updatedAt",
    "__v",
];

pub fn is_metadata_key(key: &str) -> bool {
    METADATA_KEYS.contains(&key)
}

/// Granularity of a reporting window.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PeriodType {
    Weekly,
    Monthly,
    Yearly,
}

impl PeriodType {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Weekly => "weekly",
            Self::Monthly => "monthly",
            Self::Yearly => "yearly",
        }
    }
}

impl std::fmt::Display for PeriodType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl std::str::FromStr for PeriodType {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "weekly" | "week" => Ok(Self::Weekly),
            "monthly" | "month" => Ok(Self::Monthly),
            "yearly" | "year" => Ok(Self::Yearly),
            other => Err(format!("unknown period type '{other}'")),
        }
    }
}

/// An inclusive date range for which reporting data is queried.
///
/// Weeks run Monday through Sunday. Monthly and yearly windows cover the
/// calendar month or year containing the selected date.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PeriodWindow {
    pub start_date: NaiveDate,
    pub end_date: NaiveDate,
    pub period_type: PeriodType,
}

impl PeriodWindow {
    pub fn for_date(period_type: PeriodType, date: NaiveDate) -> Self {
        match period_type {
            PeriodType::Weekly => Self::weekly(date),
            PeriodType::Monthly => Self::monthly(date),
            PeriodType::Yearly => Self::yearly(date),
        }
    }

    pub fn weekly(date: NaiveDate) -> Self {
        let start = date - Duration::days(date.weekday().num_days_from_monday() as i64);
        Self {
            start_date: start,
            end_date: start + Duration::days(6),
            period_type: PeriodType::Weekly,
        }
    }

    pub fn monthly(date: NaiveDate) -> Self {
        let start = date - Duration::days(date.day0() as i64);
        let next_month = if date.month() == 12 {
            NaiveDate::from_ymd_opt(date.year() + 1, 1, 1)
        } else {
            NaiveDate::from_ymd_opt(date.year(), date.month() + 1, 1)
        };
        let end = next_month
            .and_then(|d| d.pred_opt())
            .unwrap_or(NaiveDate::MAX);
        Self {
            start_date: start,
            end_date: end,
            period_type: PeriodType::Monthly,
        }
    }

    pub fn yearly(date: NaiveDate) -> Self {
        let start = date - Duration::days(date.ordinal0() as i64);
        let end = NaiveDate::from_ymd_opt(date.year(), 12, 31).unwrap_or(NaiveDate::MAX);
        Self {
            start_date: start,
            end_date: end,
            period_type: PeriodType::Yearly,
        }
    }

    pub fn contains(&self, date: NaiveDate) -> bool {
        date >= self.start_date && date <= self.end_date
    }

    /// Human label, e.g. `Mar 04 - Mar 10, 2024`, `March 2024` or `2024`.
    pub fn label(&self) -> String {
        match self.period_type {
            PeriodType::Weekly => format!(
                "{} - {}",
                self.start_date.format("%b %d"),
                self.end_date.format("%b %d, %Y")
            ),
            PeriodType::Monthly => self.start_date.format("%B %Y").to_string(),
            PeriodType::Yearly => self.start_date.format("%Y").to_string(),
        }
    }
}

/// A reporting record as returned by the reporting data store: one weekly
/// window of field values plus bookkeeping metadata.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RawReportingRecord {
    /// `_id`. A plain `id` key, if present, stays in `fields`; see
    /// [`record_id`](Self::record_id).
    #[serde(rename = "_id", default, skip_serializing_if = "Option::is_none")]
    pub id: Option<String>,
    /// `userId`. A plain `ownerId` key stays in `fields`; see
    /// [`owner`](Self::owner).
    #[serde(rename = "userId", default, skip_serializing_if = "Option::is_none")]
    pub owner_id: Option<String>,
    pub start_date: NaiveDate,
    pub end_date: NaiveDate,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub created_at: Option<DateTime<Utc>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub updated_at: Option<DateTime<Utc>>,
    #[serde(rename = "__v", default, skip_serializing_if = "Option::is_none")]
    pub version: Option<u32>,
    /// Reporting fields. Stored loosely so that a malformed value in one
    /// field does not reject the whole record.
    #[serde(flatten)]
    pub fields: BTreeMap<String, serde_json::Value>,
}

impl RawReportingRecord {
    pub fn new(start_date: NaiveDate, end_date: NaiveDate) -> Self {
        Self {
            id: None,
            owner_id: None,
            start_date,
            end_date,
            created_at: None,
            updated_at: None,
            version: None,
            fields: BTreeMap::new(),
        }
    }

    /// `_id`, falling back to a plain `id` key.
    pub fn record_id(&self) -> Option<&str> {
        self.id.as_deref().or_else(|| self.metadata_str("id"))
    }

    /// `userId`, falling back to an `ownerId` key.
    pub fn owner(&self) -> Option<&str> {
        self.owner_id
            .as_deref()
            .or_else(|| self.metadata_str("ownerId"))
    }

    fn metadata_str(&self, key: &str) -> Option<&str> {
        self.fields.get(key).and_then(serde_json::Value::as_str)
    }

    /// Builder-style helper used by stores and tests.
    pub fn with_field(mut self, key: impl Into<String>, value: f64) -> Self {
        self.fields.insert(key.into(), serde_json::Value::from(value));
        self
    }

    /// Numeric value of a field. Missing, null and non-numeric values read
    /// as 0.
    pub fn numeric(&self, key: &str) -> f64 {
        self.fields.get(key).map(numeric_value).unwrap_or(0.0)
    }

    /// All non-metadata fields coerced to numbers.
    pub fn numeric_fields(&self) -> impl Iterator<Item = (&str, f64)> + '_ {
        self.fields
            .iter()
            .filter(|(key, _)| !is_metadata_key(key))
            .map(|(key, value)| (key.as_str(), numeric_value(value)))
    }
}

fn numeric_value(value: &serde_json::Value) -> f64 {
    value
        .as_f64()
        .filter(|v| v.is_finite())
        .unwrap_or(0.0)
}

/// Outbound save payload: one weekly window and its input fields.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ReportingPayload {
    pub start_date: NaiveDate,
    pub end_date: NaiveDate,
    #[serde(flatten)]
    pub fields: FieldValues,
}

/// Target figures the calculation graph compares actuals against.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct TargetValues {
    /// Target revenue for the window.
    #[serde(default)]
    pub revenue: f64,
    /// Target cost of marketing, as a percentage of revenue.
    #[serde(default)]
    pub com: f64,
}

/// Raw target record as stored per week.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct WeeklyTarget {
    pub start_date: NaiveDate,
    pub end_date: NaiveDate,
    #[serde(default)]
    pub revenue: Option<f64>,
    #[serde(default, alias = "costOfMarketingPercent")]
    pub com: Option<f64>,
}
