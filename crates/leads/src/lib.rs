//! Lead sheet logic: statuses, lead-quality scoring, manual entry
//! validation, and list summaries.

pub mod entry;
pub mod lead;
pub mod summary;

pub use entry::{NewLeadForm, NewLeadPayload};
pub use lead::{lead_quality_score, Lead, LeadStatus, ScoreTier};
pub use summary::{estimate_set_rate, FilterOptions, PaginationInfo, StatusCounts};
