//! Manual lead entry: turn raw form input into a create-lead payload.

use crate::lead::LeadStatus;
use chrono::NaiveDate;
use leadcenter_core::error::{LeadCenterError, LeadCenterResult};
use leadcenter_core::format::round2;
use serde::{Deserialize, Serialize};

/// Raw form state. Every text input arrives as a string, possibly empty.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct NewLeadForm {
    pub lead_name: String,
    pub email: String,
    pub phone: String,
    pub service: String,
    pub ad_set_name: String,
    pub ad_name: String,
    pub zip: String,
    pub lead_date: String,
    pub status: LeadStatus,
    pub proposal_amount: String,
    pub job_booked_amount: String,
    pub unqualified_lead_reason: String,
    pub notes: String,
}

/// Body of the create-lead request. Empty optional fields are omitted.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NewLeadPayload {
    pub client_id: String,
    pub entry_source: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub lead_name: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub email: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub phone: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub service: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub ad_set_name: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub ad_name: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub zip: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub lead_date: Option<NaiveDate>,
    pub status: LeadStatus,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub proposal_amount: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub job_booked_amount: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub unqualified_lead_reason: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub notes: Option<String>,
}

fn non_empty(value: &str) -> Option<String> {
    let trimmed = value.trim();
    (!trimmed.is_empty()).then(|| trimmed.to_string())
}

/// Parse a money amount to 2 decimals. Blank or unparsable input reads as 0.
pub fn parse_monetary_value(value: &str) -> f64 {
    match value.trim().parse::<f64>() {
        Ok(v) if v.is_finite() => round2(v),
        _ => 0.0,
    }
}

impl NewLeadForm {
    pub fn into_payload(self, client_id: Option<&str>) -> LeadCenterResult<NewLeadPayload> {
        let client_id = client_id
            .and_then(non_empty)
            .ok_or_else(|| LeadCenterError::Validation("no client selected".into()))?;

        let email = non_empty(&self.email);
        let phone = non_empty(&self.phone);
        if email.is_none() && phone.is_none() {
            return Err(LeadCenterError::Validation(
                "provide at least an email or phone number".into(),
            ));
        }

        let lead_date = match non_empty(&self.lead_date) {
            Some(raw) => Some(NaiveDate::parse_from_str(&raw, "%Y-%m-%d").map_err(|e| {
                LeadCenterError::Validation(format!("invalid lead date '{raw}': {e}"))
            })?),
            None => None,
        };

        let unqualified_lead_reason = if self.status == LeadStatus::Unqualified {
            non_empty(&self.unqualified_lead_reason)
        } else {
            None
        };

        Ok(NewLeadPayload {
            client_id,
            entry_source: "manual".to_string(),
            lead_name: non_empty(&self.lead_name),
            email,
            phone,
            service: non_empty(&self.service),
            ad_set_name: non_empty(&self.ad_set_name),
            ad_name: non_empty(&self.ad_name),
            zip: non_empty(&self.zip),
            lead_date,
            status: self.status,
            proposal_amount: non_empty(&self.proposal_amount).map(|v| parse_monetary_value(&v)),
            job_booked_amount: non_empty(&self.job_booked_amount)
                .map(|v| parse_monetary_value(&v)),
            unqualified_lead_reason,
            notes: non_empty(&self.notes),
        })
    }
}
