//! Reporting field schema: which fields exist, in which section they are
//! shown, and whether the user enters them or the calculation graph
//! derives them.

use crate::error::{LeadCenterError, LeadCenterResult};
use crate::types::FieldValues;
use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::path::Path;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum FieldType {
    /// Entered by the user and persisted.
    Input,
    /// Derived by the calculation graph, never persisted.
    Calculated,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MetricFormat {
    #[default]
    Number,
    Currency,
    Percentage,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FieldDescriptor {
    /// Field key, e.g. `adSpend`.
    pub value: String,
    pub label: String,
    pub field_type: FieldType,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub default_value: Option<f64>,
    #[serde(default)]
    pub format: MetricFormat,
}

impl FieldDescriptor {
    pub fn input(value: &str, label: &str, format: MetricFormat) -> Self {
        Self {
            value: value.to_string(),
            label: label.to_string(),
            field_type: FieldType::Input,
            default_value: None,
            format,
        }
    }

    pub fn calculated(value: &str, label: &str, format: MetricFormat) -> Self {
        Self {
            value: value.to_string(),
            label: label.to_string(),
            field_type: FieldType::Calculated,
            default_value: None,
            format,
        }
    }

    pub fn is_input(&self) -> bool {
        self.field_type == FieldType::Input
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SchemaSection {
    pub key: String,
    pub title: String,
    pub fields: Vec<FieldDescriptor>,
}

/// Ordered sections of field descriptors.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ReportingSchema {
    pub sections: Vec<SchemaSection>,
}

impl ReportingSchema {
    /// Build a schema, rejecting duplicate field keys.
    pub fn new(sections: Vec<SchemaSection>) -> LeadCenterResult<Self> {
        let schema = Self { sections };
        schema.validate()?;
        Ok(schema)
    }

    pub fn from_json_file(path: impl AsRef<Path>) -> LeadCenterResult<Self> {
        let raw = std::fs::read_to_string(path.as_ref())?;
        let schema: Self = serde_json::from_str(&raw)?;
        schema.validate()?;
        tracing::debug!(
            path = %path.as_ref().display(),
            fields = schema.fields().count(),
            "Loaded reporting schema"
        );
        Ok(schema)
    }

    pub fn validate(&self) -> LeadCenterResult<()> {
        let mut seen = HashSet::new();
        for field in self.fields() {
            if field.value.is_empty() {
                return Err(LeadCenterError::Schema(format!(
                    "field '{}' has an empty key",
                    field.label
                )));
            }
            if !seen.insert(field.value.as_str()) {
                return Err(LeadCenterError::Schema(format!(
                    "duplicate field key '{}'",
                    field.value
                )));
            }
        }
        Ok(())
    }

    pub fn fields(&self) -> impl Iterator<Item = &FieldDescriptor> {
        self.sections.iter().flat_map(|s| s.fields.iter())
    }

    pub fn section(&self, key: &str) -> Option<&SchemaSection> {
        self.sections.iter().find(|s| s.key == key)
    }

    pub fn field(&self, value: &str) -> Option<&FieldDescriptor> {
        self.fields().find(|f| f.value == value)
    }

    pub fn is_input(&self, value: &str) -> bool {
        self.field(value).is_some_and(FieldDescriptor::is_input)
    }

    pub fn input_field_names(&self) -> Vec<&str> {
        self.fields()
            .filter(|f| f.is_input())
            .map(|f| f.value.as_str())
            .collect()
    }

    pub fn calculated_field_names(&self) -> Vec<&str> {
        self.fields()
            .filter(|f| !f.is_input())
            .map(|f| f.value.as_str())
            .collect()
    }

    /// Starting values for every input field: its configured default, or 0.
    pub fn defaults(&self) -> FieldValues {
        self.fields()
            .filter(|f| f.is_input())
            .map(|f| (f.value.clone(), f.default_value.unwrap_or(0.0).max(0.0)))
            .collect()
    }
}

impl Default for ReportingSchema {
    /// The home-services reporting sheet: performance, budget and
    /// target sections.
    fn default() -> Self {
        use MetricFormat::{Currency, Number, Percentage};

        Self {
            sections: vec![
                SchemaSection {
                    key: "targets".into(),
                    title: "Performance".into(),
                    fields: vec![
                        FieldDescriptor::input("revenue", "Revenue", Currency),
                        FieldDescriptor::input("leads", "Leads", Number),
                        FieldDescriptor::input("estimatesSet", "Estimates Set", Number),
                        FieldDescriptor::input("estimatesRan", "Estimates Ran", Number),
                        FieldDescriptor::input("jobsBooked", "Jobs Booked", Number),
                        FieldDescriptor::calculated("averageJobSize", "Average Job Size", Currency),
                        FieldDescriptor::calculated("appointmentRate", "Appointment Rate", Percentage),
                        FieldDescriptor::calculated("showRate", "Show Rate", Percentage),
                        FieldDescriptor::calculated("closeRate", "Close Rate", Percentage),
                    ],
                },
                SchemaSection {
                    key: "budgetReport".into(),
                    title: "Budget Report".into(),
                    fields: vec![
                        FieldDescriptor::input("adSpend", "Ad Spend", Currency),
                        FieldDescriptor::input(
                            "otherMarketingSpend",
                            "Other Marketing Spend",
                            Currency,
                        ),
                        FieldDescriptor::calculated("budget", "Marketing Budget", Currency),
                        FieldDescriptor::calculated("totalSpend", "Total Spend", Currency),
                        FieldDescriptor::calculated("remainingBudget", "Remaining Budget", Currency),
                        FieldDescriptor::calculated("actualCom", "Cost of Marketing", Percentage),
                        FieldDescriptor::calculated("costPerLead", "Cost per Lead", Currency),
                        FieldDescriptor::calculated(
                            "costPerEstimateSet",
                            "Cost per Estimate Set",
                            Currency,
                        ),
                        FieldDescriptor::calculated(
                            "costPerJobBooked",
                            "Cost per Job Booked",
                            Currency,
                        ),
                    ],
                },
                SchemaSection {
                    key: "targetReport".into(),
                    title: "Target Report".into(),
                    fields: vec![
                        FieldDescriptor::calculated(
                            "revenueToTarget",
                            "Revenue to Target",
                            Percentage,
                        ),
                        FieldDescriptor::calculated("revenueGap", "Revenue Gap", Currency),
                        FieldDescriptor::calculated("revenuePerLead", "Revenue per Lead", Currency),
                        FieldDescriptor::calculated(
                            "targetLeadsNeeded",
                            "Leads Needed for Target",
                            Number,
                        ),
                    ],
                },
            ],
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_schema_is_valid() {
        let schema = ReportingSchema::default();
        assert!(schema.validate().is_ok());
        assert_eq!(schema.sections.len(), 3);
        assert!(schema.section("budgetReport").is_some());
        assert!(schema.is_input("adSpend"));
        assert!(!schema.is_input("budget"));
        assert!(!schema.is_input("unknown"));
    }

    #[test]
    fn test_defaults_cover_inputs_only() {
        let schema = ReportingSchema::default();
        let defaults = schema.defaults();
        assert_eq!(defaults.len(), schema.input_field_names().len());
        assert!(defaults.values().all(|v| *v == 0.0));
        assert!(!defaults.contains_key("budget"));
    }

    #[test]
    fn test_configured_default_is_used() {
        let mut field = FieldDescriptor::input("adSpend", "Ad Spend", MetricFormat::Currency);
        field.default_value = Some(75.0);
        let schema = ReportingSchema::new(vec![SchemaSection {
            key: "budget".into(),
            title: "Budget".into(),
            fields: vec![field],
        }])
        .unwrap();
        assert_eq!(schema.defaults().get("adSpend"), Some(&75.0));
    }

    #[test]
    fn test_duplicate_keys_rejected() {
        let result = ReportingSchema::new(vec![SchemaSection {
            key: "a".into(),
            title: "A".into(),
            fields: vec![
                FieldDescriptor::input("leads", "Leads", MetricFormat::Number),
                FieldDescriptor::calculated("leads", "Leads again", MetricFormat::Number),
            ],
        }]);
        assert!(matches!(result, Err(LeadCenterError::Schema(_))));
    }

    #[test]
    fn test_schema_json_shape() {
        let json = r#"{"sections":[{"key":"s","title":"S","fields":[
            {"value":"adSpend","label":"Ad Spend","fieldType":"input","defaultValue":10,"format":"currency"},
            {"value":"budget","label":"Budget","fieldType":"calculated"}
        ]}]}"#;
        let schema: ReportingSchema = serde_json::from_str(json).unwrap();
        assert_eq!(schema.input_field_names(), vec!["adSpend"]);
        assert_eq!(schema.calculated_field_names(), vec!["budget"]);
        assert_eq!(schema.field("budget").unwrap().format, MetricFormat::Number);
    }
}
