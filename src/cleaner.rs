use crate::model::price::PriceSeries;

pub const IQR_FENCE: f64 = 1.5;

/// Quantile with linear interpolation between order statistics (`q` in [0, 1]).
pub fn quantile(sorted: &[f64], q: f64) -> Option<f64> {
    if sorted.is_empty() {
        return None;
    }
    let pos = q.clamp(0.0, 1.0) * (sorted.len() - 1) as f64;
    let lo = pos.floor() as usize;
    let hi = pos.ceil() as usize;
    let frac = pos - lo as f64;
    Some(sorted[lo] + (sorted[hi] - sorted[lo]) * frac)
}

/// Inclusive `[Q1 - 1.5 IQR, Q3 + 1.5 IQR]` bounds over the closes.
pub fn iqr_bounds(series: &PriceSeries) -> Option<(f64, f64)> {
    let mut closes = series.closes();
    closes.sort_by(|a, b| a.total_cmp(b));
    let q1 = quantile(&closes, 0.25)?;
    let q3 = quantile(&closes, 0.75)?;
    let iqr = q3 - q1;
    Some((q1 - IQR_FENCE * iqr, q3 + IQR_FENCE * iqr))
}

/// Drops closes outside the IQR fences, preserving order. Never fails; an
/// empty result is left for downstream stages to reject.
pub fn remove_outliers(series: &PriceSeries) -> PriceSeries {
    let Some((lower, upper)) = iqr_bounds(series) else {
        return series.clone();
    };
    let kept: Vec<_> = series
        .points()
        .iter()
        .filter(|p| p.close >= lower && p.close <= upper)
        .copied()
        .collect();
    let removed = series.len() - kept.len();
    tracing::info!(
        lower,
        upper,
        removed,
        kept = kept.len(),
        "IQR outlier filter applied"
    );
    PriceSeries::from_subsequence(kept)
}
