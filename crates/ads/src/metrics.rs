//! Derived ad metrics: conversion, thumbstop, see-more and hold rates plus
//! cost-per-outcome figures computed from raw platform counters.

use crate::creative::Creative;
use leadcenter_core::format::round2;
use serde::{Deserialize, Serialize};
use std::cmp::Ordering;

// ---------------------------------------------------------------------------
// Types
// ---------------------------------------------------------------------------

/// Platform counters for one ad over a period. Every counter may be absent.
///
/// Accepts both camelCase keys and the upstream `fb_*` export keys.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RawMetricRecord {
    #[serde(default, alias = "fb_impressions")]
    pub impressions: Option<f64>,
    #[serde(default, alias = "fb_link_clicks")]
    pub link_clicks: Option<f64>,
    /// Clicks (all).
    #[serde(default, alias = "fb_clicks")]
    pub clicks: Option<f64>,
    #[serde(default, alias = "fb_spend")]
    pub spend: Option<f64>,
    #[serde(default, alias = "fb_total_leads")]
    pub total_leads: Option<f64>,
    /// Stand-in for 3-second video views, which the platform export does
    /// not provide.
    #[serde(default, alias = "fb_video_play_actions")]
    pub video_play_actions: Option<f64>,
    #[serde(default, alias = "fb_video_thruplays")]
    pub video_thruplays: Option<f64>,
    #[serde(default, alias = "fb_post_reactions")]
    pub post_reactions: Option<f64>,
    #[serde(default, alias = "fb_post_comments")]
    pub post_comments: Option<f64>,
    #[serde(default, alias = "fb_post_shares")]
    pub post_shares: Option<f64>,
    #[serde(default, alias = "fb_post_saves")]
    pub post_saves: Option<f64>,
    #[serde(default, alias = "fb_reach")]
    pub reach: Option<f64>,
    #[serde(default, alias = "fb_frequency")]
    pub frequency: Option<f64>,
}

/// Lead-sheet outcomes attributed to an ad.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LeadOutcomes {
    #[serde(default)]
    pub number_of_leads: Option<f64>,
    #[serde(default)]
    pub number_of_estimate_sets: Option<f64>,
    #[serde(default)]
    pub jobs_booked: Option<f64>,
    #[serde(default)]
    pub revenue: Option<f64>,
}

/// Computed view of an ad. Percentages are 0–100 (unbounded above);
/// `None` means the metric is unavailable for these inputs.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DerivedAdMetrics {
    pub conversion_rate: Option<f64>,
    pub thumbstop_rate: Option<f64>,
    pub see_more_rate: Option<f64>,
    pub hold_rate: Option<f64>,
    pub result_rate: Option<f64>,
    pub estimate_set_rate: Option<f64>,
    pub cost_per_lead: Option<f64>,
    pub cost_per_estimate_set: Option<f64>,
    pub cost_per_link_click: Option<f64>,
    pub cpm: Option<f64>,
    pub cost_of_marketing_percent: Option<f64>,
    pub average_job_size: Option<f64>,
}

impl DerivedAdMetrics {
    /// Copy with every value rounded to 2 decimals for display.
    pub fn rounded(&self) -> Self {
        let r = |v: Option<f64>| v.map(round2);
        Self {
            conversion_rate: r(self.conversion_rate),
            thumbstop_rate: r(self.thumbstop_rate),
            see_more_rate: r(self.see_more_rate),
            hold_rate: r(self.hold_rate),
            result_rate: r(self.result_rate),
            estimate_set_rate: r(self.estimate_set_rate),
            cost_per_lead: r(self.cost_per_lead),
            cost_per_estimate_set: r(self.cost_per_estimate_set),
            cost_per_link_click: r(self.cost_per_link_click),
            cpm: r(self.cpm),
            cost_of_marketing_percent: r(self.cost_of_marketing_percent),
            average_job_size: r(self.average_job_size),
        }
    }

    pub fn get(&self, key: MetricKey) -> Option<f64> {
        match key {
            MetricKey::ConversionRate => self.conversion_rate,
            MetricKey::ThumbstopRate => self.thumbstop_rate,
            MetricKey::SeeMoreRate => self.see_more_rate,
            MetricKey::HoldRate => self.hold_rate,
            MetricKey::ResultRate => self.result_rate,
            MetricKey::EstimateSetRate => self.estimate_set_rate,
            MetricKey::CostPerLead => self.cost_per_lead,
            MetricKey::CostPerEstimateSet => self.cost_per_estimate_set,
            MetricKey::CostPerLinkClick => self.cost_per_link_click,
            MetricKey::Cpm => self.cpm,
        }
    }
}

/// One ad as listed in the creative performance view.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AdPerformance {
    #[serde(default)]
    pub ad_name: Option<String>,
    #[serde(default)]
    pub ad_set_name: Option<String>,
    #[serde(default)]
    pub campaign_name: Option<String>,
    #[serde(default)]
    pub creative: Option<Creative>,
    #[serde(flatten)]
    pub counters: RawMetricRecord,
    #[serde(flatten)]
    pub outcomes: LeadOutcomes,
}

impl AdPerformance {
    pub fn metrics(&self) -> DerivedAdMetrics {
        derive_metrics(&self.counters, &self.outcomes)
    }

    pub fn display_name(&self) -> &str {
        self.ad_name.as_deref().unwrap_or("Untitled Ad")
    }
}

// ---------------------------------------------------------------------------
// Derivation
// ---------------------------------------------------------------------------

/// `numerator / denominator`, or `None` when either side is missing, the
/// denominator is not positive, or the result is not finite.
fn ratio(numerator: Option<f64>, denominator: Option<f64>) -> Option<f64> {
    let denominator = denominator.filter(|d| *d > 0.0)?;
    let value = numerator? / denominator;
    value.is_finite().then_some(value)
}

fn percent(numerator: Option<f64>, denominator: Option<f64>) -> Option<f64> {
    ratio(numerator, denominator).map(|v| v * 100.0)
}

/// Derive every display metric for one ad. Pure; keeps full precision.
pub fn derive_metrics(record: &RawMetricRecord, outcomes: &LeadOutcomes) -> DerivedAdMetrics {
    let impressions = record.impressions;

    // Clicks that were neither link clicks nor post engagement. Inconsistent
    // upstream counts can push this below zero; it is reported as is.
    let see_more_clicks = record.clicks.unwrap_or(0.0)
        - record.link_clicks.unwrap_or(0.0)
        - record.post_reactions.unwrap_or(0.0)
        - record.post_comments.unwrap_or(0.0)
        - record.post_shares.unwrap_or(0.0);

    DerivedAdMetrics {
        conversion_rate: percent(record.total_leads, record.link_clicks),
        thumbstop_rate: percent(record.video_play_actions, impressions),
        see_more_rate: percent(Some(see_more_clicks), impressions),
        hold_rate: percent(record.video_thruplays, impressions),
        result_rate: percent(record.total_leads, impressions),
        estimate_set_rate: percent(outcomes.number_of_estimate_sets, outcomes.number_of_leads),
        cost_per_lead: ratio(record.spend, outcomes.number_of_leads),
        cost_per_estimate_set: ratio(record.spend, outcomes.number_of_estimate_sets),
        cost_per_link_click: ratio(record.spend, record.link_clicks),
        cpm: ratio(record.spend, impressions).map(|v| v * 1000.0),
        cost_of_marketing_percent: percent(record.spend, outcomes.revenue),
        average_job_size: ratio(outcomes.revenue, outcomes.jobs_booked),
    }
}

// ---------------------------------------------------------------------------
// Ranking
// ---------------------------------------------------------------------------

/// A derived metric ads can be ranked by.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum MetricKey {
    ConversionRate,
    ThumbstopRate,
    SeeMoreRate,
    HoldRate,
    ResultRate,
    EstimateSetRate,
    CostPerLead,
    CostPerEstimateSet,
    CostPerLinkClick,
    Cpm,
}

impl MetricKey {
    /// Rates rank high-to-low, costs low-to-high.
    pub fn higher_is_better(&self) -> bool {
        !matches!(
            self,
            Self::CostPerLead | Self::CostPerEstimateSet | Self::CostPerLinkClick | Self::Cpm
        )
    }
}

impl std::str::FromStr for MetricKey {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        serde_json::from_value(serde_json::Value::String(s.to_string()))
            .map_err(|_| format!("unknown metric '{s}'"))
    }
}

/// Order ads best-first by `key`. Ads where the metric is unavailable go
/// last; ties keep their input order.
pub fn rank_ads(ads: &[AdPerformance], key: MetricKey) -> Vec<(&AdPerformance, DerivedAdMetrics)> {
    let mut ranked: Vec<_> = ads.iter().map(|ad| (ad, ad.metrics())).collect();
    let higher_is_better = key.higher_is_better();

    ranked.sort_by(|(_, a), (_, b)| match (a.get(key), b.get(key)) {
        (Some(x), Some(y)) => {
            let ord = x.partial_cmp(&y).unwrap_or(Ordering::Equal);
            if higher_is_better {
                ord.reverse()
            } else {
                ord
            }
        }
        (Some(_), None) => Ordering::Less,
        (None, Some(_)) => Ordering::Greater,
        (None, None) => Ordering::Equal,
    });

    tracing::debug!(metric = ?key, ads = ranked.len(), "Ranked ads");
    ranked
}

/// Display bucket for a percentage score bar.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ScoreBand {
    Strong,
    Good,
    Fair,
    Weak,
}

impl ScoreBand {
    pub fn for_score(score: f64) -> Self {
        if score >= 70.0 {
            Self::Strong
        } else if score >= 50.0 {
            Self::Good
        } else if score >= 40.0 {
            Self::Fair
        } else {
            Self::Weak
        }
    }

    /// Bar fill width, clamped to 0–100.
    pub fn fill_percent(score: f64) -> f64 {
        if score.is_finite() {
            score.clamp(0.0, 100.0)
        } else {
            0.0
        }
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;

    fn counters(impressions: f64, link_clicks: f64, leads: f64) -> RawMetricRecord {
        RawMetricRecord {
            impressions: Some(impressions),
            link_clicks: Some(link_clicks),
            total_leads: Some(leads),
            ..Default::default()
        }
    }

    // 1. Conversion rate ----------------------------------------------------

    #[test]
    fn test_conversion_rate_scenario() {
        let m = derive_metrics(&counters(1000.0, 50.0, 5.0), &LeadOutcomes::default());
        assert!((m.conversion_rate.unwrap() - 10.0).abs() < 1e-9);
        assert_eq!(m.rounded().conversion_rate, Some(10.0));
    }

    #[test]
    fn test_conversion_rate_none_iff_no_link_clicks() {
        for (clicks, leads) in [(0.0, 0.0), (0.0, 3.0), (7.0, 0.0), (3.0, 1.0), (200.0, 17.0)] {
            let m = derive_metrics(&counters(500.0, clicks, leads), &LeadOutcomes::default());
            if clicks == 0.0 {
                assert!(m.conversion_rate.is_none());
            } else {
                let expected = round2(100.0 * leads / clicks);
                assert_eq!(m.rounded().conversion_rate, Some(expected));
            }
        }
    }

    #[test]
    fn test_zero_impressions_make_rates_unavailable() {
        let record = RawMetricRecord {
            impressions: Some(0.0),
            video_play_actions: Some(10.0),
            clicks: Some(5.0),
            spend: Some(20.0),
            ..Default::default()
        };
        let m = derive_metrics(&record, &LeadOutcomes::default());
        assert!(m.conversion_rate.is_none());
        assert!(m.thumbstop_rate.is_none());
        assert!(m.see_more_rate.is_none());
        assert!(m.hold_rate.is_none());
        assert!(m.cpm.is_none());
    }

    // 2. Thumbstop / see-more ----------------------------------------------

    #[test]
    fn test_thumbstop_and_see_more() {
        let record = RawMetricRecord {
            impressions: Some(2000.0),
            video_play_actions: Some(500.0),
            clicks: Some(120.0),
            link_clicks: Some(60.0),
            post_reactions: Some(20.0),
            post_comments: Some(5.0),
            post_shares: Some(5.0),
            ..Default::default()
        };
        let m = derive_metrics(&record, &LeadOutcomes::default());
        assert!((m.thumbstop_rate.unwrap() - 25.0).abs() < 1e-9);
        // (120 - 60 - 20 - 5 - 5) / 2000 = 1.5%
        assert!((m.see_more_rate.unwrap() - 1.5).abs() < 1e-9);
    }

    #[test]
    fn test_see_more_rate_can_be_negative() {
        let record = RawMetricRecord {
            impressions: Some(100.0),
            clicks: Some(10.0),
            link_clicks: Some(8.0),
            post_reactions: Some(7.0),
            ..Default::default()
        };
        let m = derive_metrics(&record, &LeadOutcomes::default());
        assert!((m.see_more_rate.unwrap() - (-5.0)).abs() < 1e-9);
    }

    // 3. Cost metrics ------------------------------------------------------

    #[test]
    fn test_cost_metrics() {
        let record = RawMetricRecord {
            impressions: Some(10_000.0),
            link_clicks: Some(100.0),
            spend: Some(500.0),
            ..Default::default()
        };
        let outcomes = LeadOutcomes {
            number_of_leads: Some(20.0),
            number_of_estimate_sets: Some(5.0),
            jobs_booked: Some(2.0),
            revenue: Some(5_000.0),
        };
        let m = derive_metrics(&record, &outcomes);
        assert_eq!(m.cost_per_lead, Some(25.0));
        assert_eq!(m.cost_per_estimate_set, Some(100.0));
        assert_eq!(m.estimate_set_rate, Some(25.0));
        assert_eq!(m.cost_per_link_click, Some(5.0));
        assert_eq!(m.cpm, Some(50.0));
        assert_eq!(m.cost_of_marketing_percent, Some(10.0));
        assert_eq!(m.average_job_size, Some(2_500.0));
    }

    #[test]
    fn test_cost_metrics_unavailable_without_denominator() {
        let record = RawMetricRecord {
            spend: Some(500.0),
            ..Default::default()
        };
        let outcomes = LeadOutcomes {
            number_of_leads: Some(0.0),
            number_of_estimate_sets: None,
            ..Default::default()
        };
        let m = derive_metrics(&record, &outcomes);
        assert!(m.cost_per_lead.is_none());
        assert!(m.cost_per_estimate_set.is_none());
        assert!(m.estimate_set_rate.is_none());
        assert!(m.average_job_size.is_none());
    }

    #[test]
    fn test_never_nan_or_infinite() {
        let record = RawMetricRecord {
            impressions: Some(0.0),
            link_clicks: Some(0.0),
            clicks: Some(0.0),
            spend: Some(0.0),
            total_leads: Some(0.0),
            video_play_actions: Some(0.0),
            video_thruplays: Some(0.0),
            ..Default::default()
        };
        let outcomes = LeadOutcomes {
            number_of_leads: Some(0.0),
            number_of_estimate_sets: Some(0.0),
            jobs_booked: Some(0.0),
            revenue: Some(0.0),
        };
        let m = derive_metrics(&record, &outcomes);
        for key in [
            MetricKey::ConversionRate,
            MetricKey::ThumbstopRate,
            MetricKey::SeeMoreRate,
            MetricKey::HoldRate,
            MetricKey::ResultRate,
            MetricKey::EstimateSetRate,
            MetricKey::CostPerLead,
            MetricKey::CostPerEstimateSet,
            MetricKey::CostPerLinkClick,
            MetricKey::Cpm,
        ] {
            assert!(m.get(key).is_none(), "{key:?} should be unavailable");
        }
        assert!(m.cost_of_marketing_percent.is_none());
        assert!(m.average_job_size.is_none());
    }

    // 4. Deserialization ---------------------------------------------------

    #[test]
    fn test_ad_performance_accepts_upstream_keys() {
        let ad: AdPerformance = serde_json::from_str(
            r#"{
                "adName": "Spring promo",
                "fb_impressions": 1000,
                "fb_link_clicks": 50,
                "fb_total_leads": 5,
                "fb_spend": 100,
                "numberOfLeads": 4
            }"#,
        )
        .unwrap();
        assert_eq!(ad.display_name(), "Spring promo");
        let m = ad.metrics();
        assert_eq!(m.rounded().conversion_rate, Some(10.0));
        assert_eq!(m.cost_per_lead, Some(25.0));
    }

    // 5. Ranking -----------------------------------------------------------

    fn ad(name: &str, link_clicks: f64, leads: f64, spend: f64, crm_leads: Option<f64>) -> AdPerformance {
        AdPerformance {
            ad_name: Some(name.to_string()),
            counters: RawMetricRecord {
                impressions: Some(1000.0),
                link_clicks: Some(link_clicks),
                total_leads: Some(leads),
                spend: Some(spend),
                ..Default::default()
            },
            outcomes: LeadOutcomes {
                number_of_leads: crm_leads,
                ..Default::default()
            },
            ..Default::default()
        }
    }

    #[test]
    fn test_rank_by_rate_descending_unavailable_last() {
        let ads = vec![
            ad("low", 100.0, 2.0, 50.0, None),
            ad("none", 0.0, 0.0, 50.0, None),
            ad("high", 10.0, 5.0, 50.0, None),
        ];
        let ranked = rank_ads(&ads, MetricKey::ConversionRate);
        let names: Vec<_> = ranked.iter().map(|(a, _)| a.display_name()).collect();
        assert_eq!(names, vec!["high", "low", "none"]);
    }

    #[test]
    fn test_rank_by_cost_ascending() {
        let ads = vec![
            ad("pricey", 10.0, 1.0, 400.0, Some(4.0)),
            ad("cheap", 10.0, 1.0, 100.0, Some(4.0)),
            ad("unknown", 10.0, 1.0, 100.0, None),
        ];
        let ranked = rank_ads(&ads, MetricKey::CostPerLead);
        let names: Vec<_> = ranked.iter().map(|(a, _)| a.display_name()).collect();
        assert_eq!(names, vec!["cheap", "pricey", "unknown"]);
    }

    #[test]
    fn test_metric_key_parse() {
        assert_eq!("cost-per-lead".parse::<MetricKey>().unwrap(), MetricKey::CostPerLead);
        assert_eq!("cpm".parse::<MetricKey>().unwrap(), MetricKey::Cpm);
        assert!("ctr".parse::<MetricKey>().is_err());
    }

    #[test]
    fn test_score_band() {
        assert_eq!(ScoreBand::for_score(85.0), ScoreBand::Strong);
        assert_eq!(ScoreBand::for_score(50.0), ScoreBand::Good);
        assert_eq!(ScoreBand::for_score(45.0), ScoreBand::Fair);
        assert_eq!(ScoreBand::for_score(3.0), ScoreBand::Weak);
        assert_eq!(ScoreBand::fill_percent(140.0), 100.0);
        assert_eq!(ScoreBand::fill_percent(-4.0), 0.0);
    }
}
