//! Summaries over a page of leads: status counts, filter options, and
//! pagination bookkeeping.

use crate::lead::{Lead, LeadStatus};
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;

/// Percentage of leads that reached the estimate-set stage, `None` when
/// there are no leads.
pub fn estimate_set_rate(total_leads: u64, estimate_set: u64) -> Option<f64> {
    (total_leads > 0).then(|| estimate_set as f64 / total_leads as f64 * 100.0)
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StatusCounts {
    pub new: u64,
    pub in_progress: u64,
    pub estimate_set: u64,
    pub unqualified: u64,
    /// Every other pipeline stage.
    pub other: u64,
}

impl StatusCounts {
    pub fn from_leads(leads: &[Lead]) -> Self {
        let mut counts = Self::default();
        for lead in leads {
            match lead.status {
                LeadStatus::New => counts.new += 1,
                LeadStatus::InProgress => counts.in_progress += 1,
                LeadStatus::EstimateSet => counts.estimate_set += 1,
                LeadStatus::Unqualified => counts.unqualified += 1,
                _ => counts.other += 1,
            }
        }
        counts
    }

    pub fn total(&self) -> u64 {
        self.new + self.in_progress + self.estimate_set + self.unqualified + self.other
    }

    pub fn estimate_set_rate(&self) -> Option<f64> {
        estimate_set_rate(self.total(), self.estimate_set)
    }
}

/// Distinct values available to the lead table filters, sorted.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FilterOptions {
    pub services: Vec<String>,
    pub ad_set_names: Vec<String>,
    pub ad_names: Vec<String>,
    pub statuses: Vec<LeadStatus>,
    pub unqualified_lead_reasons: Vec<String>,
}

impl FilterOptions {
    pub fn from_leads(leads: &[Lead]) -> Self {
        fn distinct<'a>(values: impl Iterator<Item = &'a Option<String>>) -> Vec<String> {
            values
                .filter_map(|v| v.as_deref())
                .map(str::trim)
                .filter(|v| !v.is_empty())
                .map(str::to_string)
                .collect::<BTreeSet<_>>()
                .into_iter()
                .collect()
        }

        let options = Self {
            services: distinct(leads.iter().map(|l| &l.service)),
            ad_set_names: distinct(leads.iter().map(|l| &l.ad_set_name)),
            ad_names: distinct(leads.iter().map(|l| &l.ad_name)),
            statuses: leads
                .iter()
                .map(|l| l.status)
                .collect::<BTreeSet<_>>()
                .into_iter()
                .collect(),
            unqualified_lead_reasons: distinct(leads.iter().map(|l| &l.unqualified_lead_reason)),
        };
        tracing::debug!(
            leads = leads.len(),
            services = options.services.len(),
            "Built lead filter options"
        );
        options
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PaginationInfo {
    pub current_page: u64,
    pub total_pages: u64,
    pub total_count: u64,
    pub page_size: u64,
    pub has_next: bool,
    pub has_prev: bool,
}

impl PaginationInfo {
    /// Pages are 1-based. A zero page size is treated as 1, and the page is
    /// clamped to `1..=total_pages`.
    pub fn new(current_page: u64, page_size: u64, total_count: u64) -> Self {
        let page_size = page_size.max(1);
        let total_pages = total_count.div_ceil(page_size);
        let current_page = current_page.clamp(1, total_pages.max(1));
        Self {
            current_page,
            total_pages,
            total_count,
            page_size,
            has_next: current_page < total_pages,
            has_prev: current_page > 1,
        }
    }

    /// Index range of the current page within the full result set.
    pub fn range(&self) -> std::ops::Range<usize> {
        let start = self
            .current_page
            .saturating_sub(1)
            .saturating_mul(self.page_size)
            .min(self.total_count) as usize;
        let end = self
            .current_page
            .saturating_mul(self.page_size)
            .min(self.total_count) as usize;
        start..end
    }
}
