//! Calculation graph: declarative arithmetic rules that turn input fields
//! and target values into derived budget and performance fields.

use leadcenter_core::error::{LeadCenterError, LeadCenterResult};
use leadcenter_core::schema::ReportingSchema;
use leadcenter_core::types::FieldValues;
use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::path::Path;
use tracing::{debug, warn};

/// Extra input key carrying the target cost-of-marketing percentage.
pub const TARGET_COM_KEY: &str = "com";
/// Extra input key carrying the target revenue.
pub const TARGET_REVENUE_KEY: &str = "targetRevenue";

/// Maps an input map to derived fields. Implementations must be pure:
/// the same input always yields the same output. A derived field that
/// cannot be computed is left out of the result.
pub trait CalculationGraph: Send + Sync {
    fn calculate(&self, inputs: &FieldValues) -> FieldValues;
}

// ─── Formulas ───────────────────────────────────────────────────────────────

/// One arithmetic rule. Operands name input fields or earlier outputs;
/// missing inputs read as 0. A rule using an unavailable output is itself
/// unavailable.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "op", rename_all = "snake_case")]
pub enum Formula {
    Sum { fields: Vec<String> },
    Product { fields: Vec<String> },
    Difference { minuend: String, subtrahend: String },
    /// `numerator / denominator`, unavailable when the denominator is 0.
    Ratio { numerator: String, denominator: String },
    /// `numerator / denominator * 100`, unavailable when the denominator is 0.
    Percent { numerator: String, denominator: String },
    /// `value * percent / 100`.
    PercentOf { value: String, percent: String },
}

impl Formula {
    fn operands(&self) -> Vec<&str> {
        match self {
            Self::Sum { fields } | Self::Product { fields } => {
                fields.iter().map(String::as_str).collect()
            }
            Self::Difference {
                minuend,
                subtrahend,
            } => vec![minuend, subtrahend],
            Self::Ratio {
                numerator,
                denominator,
            }
            | Self::Percent {
                numerator,
                denominator,
            } => vec![numerator, denominator],
            Self::PercentOf { value, percent } => vec![value, percent],
        }
    }

    fn evaluate(&self, scope: &FieldValues) -> Option<f64> {
        let get = |key: &str| scope.get(key).copied().unwrap_or(0.0);
        let divide = |n: f64, d: f64| if d != 0.0 { Some(n / d) } else { None };

        let value = match self {
            Self::Sum { fields } => Some(fields.iter().map(|f| get(f)).sum()),
            Self::Product { fields } => Some(fields.iter().map(|f| get(f)).product()),
            Self::Difference {
                minuend,
                subtrahend,
            } => Some(get(minuend) - get(subtrahend)),
            Self::Ratio {
                numerator,
                denominator,
            } => divide(get(numerator), get(denominator)),
            Self::Percent {
                numerator,
                denominator,
            } => divide(get(numerator), get(denominator)).map(|v| v * 100.0),
            Self::PercentOf { value, percent } => Some(get(value) * get(percent) / 100.0),
        };

        value.filter(|v| v.is_finite())
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FormulaRule {
    pub output: String,
    pub formula: Formula,
}

impl FormulaRule {
    pub fn new(output: &str, formula: Formula) -> Self {
        Self {
            output: output.to_string(),
            formula,
        }
    }
}

// ─── FormulaTable ───────────────────────────────────────────────────────────

/// Ordered rule list, evaluated top to bottom. A rule may use the output
/// of any rule above it.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FormulaTable {
    pub rules: Vec<FormulaRule>,
}

impl FormulaTable {
    pub fn new(rules: Vec<FormulaRule>) -> LeadCenterResult<Self> {
        let table = Self { rules };
        table.validate()?;
        Ok(table)
    }

    pub fn from_json_file(path: impl AsRef<Path>) -> LeadCenterResult<Self> {
        let raw = std::fs::read_to_string(path.as_ref())?;
        let table: Self = serde_json::from_str(&raw)?;
        table.validate()?;
        debug!(
            path = %path.as_ref().display(),
            rules = table.rules.len(),
            "Loaded formula table"
        );
        Ok(table)
    }

    /// Outputs must be unique, and a rule may only reference outputs of
    /// rules above it.
    pub fn validate(&self) -> LeadCenterResult<()> {
        let outputs: HashSet<&str> = self.rules.iter().map(|r| r.output.as_str()).collect();
        let mut defined = HashSet::new();

        for rule in &self.rules {
            for operand in rule.formula.operands() {
                if outputs.contains(operand) && !defined.contains(operand) {
                    return Err(LeadCenterError::Schema(format!(
                        "rule '{}' uses '{}' before it is calculated",
                        rule.output, operand
                    )));
                }
            }
            if !defined.insert(rule.output.as_str()) {
                return Err(LeadCenterError::Schema(format!(
                    "duplicate formula output '{}'",
                    rule.output
                )));
            }
        }
        Ok(())
    }

    /// Cross-check against a field schema. Overwriting an input field is an
    /// error; calculated fields without a rule only warn (they stay unset).
    pub fn check_against(&self, schema: &ReportingSchema) -> LeadCenterResult<()> {
        for rule in &self.rules {
            if schema.is_input(&rule.output) {
                return Err(LeadCenterError::Schema(format!(
                    "formula output '{}' is an input field",
                    rule.output
                )));
            }
        }
        for name in schema.calculated_field_names() {
            if !self.rules.iter().any(|r| r.output == name) {
                warn!(field = name, "Calculated field has no formula");
            }
        }
        Ok(())
    }
}

impl CalculationGraph for FormulaTable {
    fn calculate(&self, inputs: &FieldValues) -> FieldValues {
        let mut scope = inputs.clone();
        let mut outputs = FieldValues::new();
        let mut unavailable: HashSet<&str> = HashSet::new();

        for rule in &self.rules {
            let blocked = rule
                .formula
                .operands()
                .iter()
                .any(|operand| unavailable.contains(operand));
            match rule.formula.evaluate(&scope).filter(|_| !blocked) {
                Some(value) => {
                    scope.insert(rule.output.clone(), value);
                    outputs.insert(rule.output.clone(), value);
                }
                None => {
                    unavailable.insert(rule.output.as_str());
                }
            }
        }

        outputs
    }
}

impl Default for FormulaTable {
    /// Rules for the default reporting schema.
    fn default() -> Self {
        use Formula::*;

        let s = |v: &str| v.to_string();
        let ratio = |n: &str, d: &str| Ratio {
            numerator: s(n),
            denominator: s(d),
        };
        let percent = |n: &str, d: &str| Percent {
            numerator: s(n),
            denominator: s(d),
        };
        let difference = |a: &str, b: &str| Difference {
            minuend: s(a),
            subtrahend: s(b),
        };

        Self {
            rules: vec![
                // Performance
                FormulaRule::new("averageJobSize", ratio("revenue", "jobsBooked")),
                FormulaRule::new("appointmentRate", percent("estimatesSet", "leads")),
                FormulaRule::new("showRate", percent("estimatesRan", "estimatesSet")),
                FormulaRule::new("closeRate", percent("jobsBooked", "estimatesRan")),
                // Budget
                FormulaRule::new(
                    "budget",
                    PercentOf {
                        value: s(TARGET_REVENUE_KEY),
                        percent: s(TARGET_COM_KEY),
                    },
                ),
                FormulaRule::new(
                    "totalSpend",
                    Sum {
                        fields: vec![s("adSpend"), s("otherMarketingSpend")],
                    },
                ),
                FormulaRule::new("remainingBudget", difference("budget", "totalSpend")),
                FormulaRule::new("actualCom", percent("totalSpend", "revenue")),
                FormulaRule::new("costPerLead", ratio("totalSpend", "leads")),
                FormulaRule::new("costPerEstimateSet", ratio("totalSpend", "estimatesSet")),
                FormulaRule::new("costPerJobBooked", ratio("totalSpend", "jobsBooked")),
                // Target
                FormulaRule::new("revenueToTarget", percent("revenue", TARGET_REVENUE_KEY)),
                FormulaRule::new("revenueGap", difference(TARGET_REVENUE_KEY, "revenue")),
                FormulaRule::new("revenuePerLead", ratio("revenue", "leads")),
                FormulaRule::new(
                    "targetLeadsNeeded",
                    ratio(TARGET_REVENUE_KEY, "revenuePerLead"),
                ),
            ],
        }
    }
}
