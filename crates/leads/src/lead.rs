use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

/// Pipeline stage of a lead.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum LeadStatus {
    #[default]
    New,
    InProgress,
    EstimateSet,
    VirtualQuote,
    EstimateCanceled,
    ProposalPresented,
    JobBooked,
    JobLost,
    EstimateRescheduled,
    Unqualified,
}

impl LeadStatus {
    pub const ALL: [LeadStatus; 10] = [
        Self::New,
        Self::InProgress,
        Self::EstimateSet,
        Self::VirtualQuote,
        Self::EstimateCanceled,
        Self::ProposalPresented,
        Self::JobBooked,
        Self::JobLost,
        Self::EstimateRescheduled,
        Self::Unqualified,
    ];

    pub fn label(&self) -> &'static str {
        match self {
            Self::New => "New",
            Self::InProgress => "In Progress",
            Self::EstimateSet => "Estimate Set",
            Self::VirtualQuote => "Virtual Quote",
            Self::EstimateCanceled => "Estimate Canceled",
            Self::ProposalPresented => "Proposal Presented",
            Self::JobBooked => "Job Booked",
            Self::JobLost => "Job Lost",
            Self::EstimateRescheduled => "Estimate Rescheduled",
            Self::Unqualified => "Unqualified",
        }
    }
}

impl std::str::FromStr for LeadStatus {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::ALL
            .into_iter()
            .find(|status| {
                serde_json::to_value(status)
                    .ok()
                    .and_then(|v| v.as_str().map(|v| v == s))
                    .unwrap_or(false)
            })
            .ok_or_else(|| format!("unknown lead status '{s}'"))
    }
}

/// A lead as stored in the lead sheet.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Lead {
    #[serde(rename = "_id", alias = "id")]
    pub id: String,
    #[serde(default)]
    pub client_id: Option<String>,
    #[serde(default)]
    pub lead_name: Option<String>,
    #[serde(default)]
    pub email: Option<String>,
    #[serde(default)]
    pub phone: Option<String>,
    #[serde(default)]
    pub service: Option<String>,
    #[serde(default)]
    pub ad_set_name: Option<String>,
    #[serde(default)]
    pub ad_name: Option<String>,
    #[serde(default)]
    pub zip: Option<String>,
    #[serde(default)]
    pub lead_date: Option<NaiveDate>,
    #[serde(default)]
    pub status: LeadStatus,
    #[serde(default)]
    pub proposal_amount: Option<f64>,
    #[serde(default)]
    pub job_booked_amount: Option<f64>,
    #[serde(default)]
    pub unqualified_lead_reason: Option<String>,
    #[serde(default)]
    pub notes: Option<String>,
}

impl Lead {
    pub fn new(id: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            client_id: None,
            lead_name: None,
            email: None,
            phone: None,
            service: None,
            ad_set_name: None,
            ad_name: None,
            zip: None,
            lead_date: None,
            status: LeadStatus::New,
            proposal_amount: None,
            job_booked_amount: None,
            unqualified_lead_reason: None,
            notes: None,
        }
    }

    pub fn quality_score(&self) -> u32 {
        lead_quality_score(self)
    }
}

// Weight of each attribution field in the lead-quality score. Sums to 100.
const SERVICE_WEIGHT: u32 = 30;
const AD_SET_NAME_WEIGHT: u32 = 10;
const AD_NAME_WEIGHT: u32 = 10;
const LEAD_DATE_WEIGHT: u32 = 0;
const ZIP_WEIGHT: u32 = 50;

fn filled(value: &Option<String>) -> bool {
    value.as_deref().is_some_and(|v| !v.trim().is_empty())
}

/// Score (0–100) of how completely a lead is attributed: the sum of the
/// weights of its filled attribution fields.
pub fn lead_quality_score(lead: &Lead) -> u32 {
    let mut score = 0;
    if filled(&lead.service) {
        score += SERVICE_WEIGHT;
    }
    if filled(&lead.ad_set_name) {
        score += AD_SET_NAME_WEIGHT;
    }
    if filled(&lead.ad_name) {
        score += AD_NAME_WEIGHT;
    }
    if lead.lead_date.is_some() {
        score += LEAD_DATE_WEIGHT;
    }
    if filled(&lead.zip) {
        score += ZIP_WEIGHT;
    }
    score
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ScoreTier {
    Excellent,
    Good,
    Fair,
    Poor,
}

impl ScoreTier {
    pub fn for_score(score: u32) -> Self {
        match score {
            80.. => Self::Excellent,
            60..=79 => Self::Good,
            40..=59 => Self::Fair,
            _ => Self::Poor,
        }
    }
}
