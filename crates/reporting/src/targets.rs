use leadcenter_core::types::{TargetValues, WeeklyTarget};

/// Collapse the weekly targets of a window into one target pair.
///
/// Revenue targets add up across weeks. The cost-of-marketing target is a
/// ratio, so it is averaged over the weeks that set one. Returns `None`
/// when the window has no targets at all.
pub fn process_target_data(targets: &[WeeklyTarget]) -> Option<TargetValues> {
    if targets.is_empty() {
        return None;
    }

    let revenue = targets
        .iter()
        .filter_map(|t| t.revenue)
        .filter(|v| v.is_finite())
        .map(|v| v.max(0.0))
        .sum();

    let coms: Vec<f64> = targets
        .iter()
        .filter_map(|t| t.com)
        .filter(|v| v.is_finite())
        .collect();
    let com = if coms.is_empty() {
        0.0
    } else {
        coms.iter().sum::<f64>() / coms.len() as f64
    };

    Some(TargetValues { revenue, com })
}
