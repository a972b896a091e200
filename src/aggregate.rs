// Pure aggregation layer: every derived figure in the report is computed by
// one of the functions below. No I/O, no shared state; the same inputs always
// produce the same outputs, so callers are free to compute metrics
// independently and tolerate individual failures.
use crate::error::AggregateError;
use crate::types::{
    AgeDecline, Category, Feature, ProvinceRecord, RegionMembership, RegionStats, TrendLine,
};
use crate::util::mean;
use std::cmp::Ordering;
use std::collections::HashSet;

/// Requested ranking direction for [`top_n`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SortOrder {
    Ascending,
    Descending,
}

/// Count provinces per category, in the fixed {High, Medium, Low} display
/// order. A label outside the known enumeration is a `DataIntegrity` error;
/// labels are assigned upstream and never corrected here.
pub fn category_counts(
    records: &[ProvinceRecord],
) -> Result<Vec<(Category, usize)>, AggregateError> {
    let mut low = 0usize;
    let mut medium = 0usize;
    let mut high = 0usize;
    for r in records {
        match Category::from_label(r.category_label)? {
            Category::Low => low += 1,
            Category::Medium => medium += 1,
            Category::High => high += 1,
        }
    }
    Ok(Category::DISPLAY_ORDER
        .iter()
        .map(|c| {
            let count = match c {
                Category::High => high,
                Category::Medium => medium,
                Category::Low => low,
            };
            (*c, count)
        })
        .collect())
}

/// Per-region `{mean, max, min, count}` of the TGM score, ordered by mean
/// descending. A region with no matching provinces is absent from the output
/// entirely. Ties keep the membership enumeration order (the sort is stable).
pub fn regional_summary(
    records: &[ProvinceRecord],
    membership: &RegionMembership,
) -> Vec<RegionStats> {
    let mut stats: Vec<RegionStats> = Vec::new();
    for (region, provinces) in membership.regions() {
        let names: HashSet<&str> = provinces.iter().map(|p| p.as_str()).collect();
        let scores: Vec<f64> = records
            .iter()
            .filter(|r| names.contains(r.name.as_str()))
            .map(|r| r.tgm_score)
            .collect();
        if scores.is_empty() {
            continue;
        }
        let max = scores.iter().copied().fold(f64::MIN, f64::max);
        let min = scores.iter().copied().fold(f64::MAX, f64::min);
        stats.push(RegionStats {
            region: region.clone(),
            mean: mean(&scores),
            max,
            min,
            count: scores.len(),
        });
    }
    stats.sort_by(|a, b| b.mean.partial_cmp(&a.mean).unwrap_or(Ordering::Equal));
    stats
}

/// The `n` records with the greatest (or smallest) value of `feature`.
/// `n` is clamped to the record count rather than erroring, so small datasets
/// never make a ranking panel fail. Ties keep the original record order.
pub fn top_n<'a>(
    records: &'a [ProvinceRecord],
    feature: Feature,
    n: usize,
    order: SortOrder,
) -> Vec<&'a ProvinceRecord> {
    let mut ranked: Vec<&ProvinceRecord> = records.iter().collect();
    ranked.sort_by(|a, b| {
        let (va, vb) = (feature.of(a), feature.of(b));
        let cmp = va.partial_cmp(&vb).unwrap_or(Ordering::Equal);
        match order {
            SortOrder::Ascending => cmp,
            SortOrder::Descending => cmp.reverse(),
        }
    });
    ranked.truncate(n.min(records.len()));
    ranked
}

/// Pearson product-moment correlation between two columns, using the sample
/// (N-1) formulation. Returns `None` when either column has zero variance or
/// there are fewer than two records; the caller labels the metric undefined
/// instead of displaying a bogus number.
pub fn pearson_correlation(records: &[ProvinceRecord], a: Feature, b: Feature) -> Option<f64> {
    let n = records.len();
    if n < 2 {
        return None;
    }
    let xs: Vec<f64> = records.iter().map(|r| a.of(r)).collect();
    let ys: Vec<f64> = records.iter().map(|r| b.of(r)).collect();
    let (mx, my) = (mean(&xs), mean(&ys));
    let mut sxy = 0.0;
    let mut sxx = 0.0;
    let mut syy = 0.0;
    for (x, y) in xs.iter().zip(ys.iter()) {
        let (dx, dy) = (x - mx, y - my);
        sxy += dx * dy;
        sxx += dx * dx;
        syy += dy * dy;
    }
    if sxx == 0.0 || syy == 0.0 {
        return None;
    }
    let denom = (n - 1) as f64;
    Some((sxy / denom) / ((sxx / denom).sqrt() * (syy / denom).sqrt()))
}

/// Least-squares line `y = slope * x + intercept` over the paired columns.
/// All-equal x values have no slope-intercept representation and fail with
/// `InvalidArgument`; callers omit the trendline in that case.
pub fn linear_trend(
    records: &[ProvinceRecord],
    x: Feature,
    y: Feature,
) -> Result<TrendLine, AggregateError> {
    if records.is_empty() {
        return Err(AggregateError::EmptyInput(
            "linear trend over zero records".to_string(),
        ));
    }
    let xs: Vec<f64> = records.iter().map(|r| x.of(r)).collect();
    let ys: Vec<f64> = records.iter().map(|r| y.of(r)).collect();
    let (mx, my) = (mean(&xs), mean(&ys));
    let mut sxy = 0.0;
    let mut sxx = 0.0;
    for (xv, yv) in xs.iter().zip(ys.iter()) {
        sxy += (xv - mx) * (yv - my);
        sxx += (xv - mx) * (xv - mx);
    }
    if sxx == 0.0 {
        return Err(AggregateError::InvalidArgument(format!(
            "all {} values are equal, trendline is vertical",
            x.label()
        )));
    }
    let slope = sxy / sxx;
    Ok(TrendLine {
        slope,
        intercept: my - slope * mx,
    })
}

/// Mean per age bracket, in the caller's bracket order (youngest to oldest
/// for this dataset), plus the display ratio `(first - last) / first`.
/// The ratio is a presentation convenience, not a statistical measure.
pub fn age_group_decline(
    records: &[ProvinceRecord],
    brackets: &[Feature],
) -> Result<AgeDecline, AggregateError> {
    if brackets.is_empty() {
        return Err(AggregateError::InvalidArgument(
            "no age brackets given".to_string(),
        ));
    }
    let means: Vec<f64> = brackets
        .iter()
        .map(|f| mean(&records.iter().map(|r| f.of(r)).collect::<Vec<f64>>()))
        .collect();
    let first = means[0];
    let last = means[means.len() - 1];
    if first == 0.0 {
        return Err(AggregateError::InvalidArgument(
            "first bracket mean is zero, decline ratio undefined".to_string(),
        ));
    }
    Ok(AgeDecline {
        means,
        decline_ratio: (first - last) / first,
    })
}

/// The single record with the greatest value of `feature`. Ties go to the
/// earliest record.
pub fn best_record<'a>(
    records: &'a [ProvinceRecord],
    feature: Feature,
) -> Result<&'a ProvinceRecord, AggregateError> {
    let mut best: Option<&ProvinceRecord> = None;
    for r in records {
        match best {
            Some(b) if feature.of(r) <= feature.of(b) => {}
            _ => best = Some(r),
        }
    }
    best.ok_or_else(|| AggregateError::EmptyInput("best record over zero records".to_string()))
}

/// The region with the greatest mean TGM. Ties go to the earliest entry,
/// which for [`regional_summary`] output is the membership enumeration order.
pub fn top_region(summary: &[RegionStats]) -> Result<&RegionStats, AggregateError> {
    let mut best: Option<&RegionStats> = None;
    for s in summary {
        match best {
            Some(b) if s.mean <= b.mean => {}
            _ => best = Some(s),
        }
    }
    best.ok_or_else(|| AggregateError::EmptyInput("top region over zero regions".to_string()))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn province(name: &str, tgm: f64, label: i64) -> ProvinceRecord {
        ProvinceRecord {
            name: name.to_string(),
            tgm_score: tgm,
            reading_frequency: tgm / 10.0,
            books_read: tgm / 20.0,
            internet_access_frequency: 5.0,
            aps_7_12: 99.0,
            aps_13_15: 95.0,
            aps_16_18: 72.0,
            aps_19_23: 25.0,
            category_label: label,
        }
    }

    fn sample() -> Vec<ProvinceRecord> {
        vec![
            province("A", 80.0, 2),
            province("B", 70.0, 1),
            province("C", 60.0, 0),
        ]
    }

    fn membership() -> RegionMembership {
        RegionMembership::new(vec![
            ("West".to_string(), vec!["A".to_string(), "B".to_string()]),
            ("East".to_string(), vec!["C".to_string()]),
            ("Ghost".to_string(), vec!["Nowhere".to_string()]),
        ])
    }

    #[test]
    fn category_counts_fixed_order_and_total() {
        let counts = category_counts(&sample()).unwrap();
        assert_eq!(
            counts,
            vec![
                (Category::High, 1),
                (Category::Medium, 1),
                (Category::Low, 1)
            ]
        );
        let total: usize = counts.iter().map(|(_, c)| c).sum();
        assert_eq!(total, 3);
    }

    #[test]
    fn category_counts_rejects_unknown_label() {
        let mut records = sample();
        records.push(province("D", 50.0, 7));
        let err = category_counts(&records).unwrap_err();
        assert!(matches!(err, AggregateError::DataIntegrity(_)));
    }

    #[test]
    fn regional_summary_matches_hand_computed_means() {
        let stats = regional_summary(&sample(), &membership());
        assert_eq!(stats.len(), 2);
        assert_eq!(stats[0].region, "West");
        assert_eq!(stats[0].mean, 75.0);
        assert_eq!(stats[0].max, 80.0);
        assert_eq!(stats[0].min, 70.0);
        assert_eq!(stats[0].count, 2);
        assert_eq!(stats[1].region, "East");
        assert_eq!(stats[1].mean, 60.0);
    }

    #[test]
    fn regional_summary_excludes_empty_regions() {
        let stats = regional_summary(&sample(), &membership());
        assert!(stats.iter().all(|s| s.region != "Ghost"));
    }

    #[test]
    fn regional_summary_breaks_ties_by_membership_order() {
        let records = vec![province("A", 70.0, 1), province("C", 70.0, 1)];
        let stats = regional_summary(&records, &membership());
        assert_eq!(stats[0].region, "West");
        assert_eq!(stats[1].region, "East");
    }

    #[test]
    fn top_n_returns_greatest_in_order() {
        let records = sample();
        let top = top_n(&records, Feature::TgmScore, 2, SortOrder::Descending);
        assert_eq!(top.len(), 2);
        assert_eq!(top[0].name, "A");
        assert_eq!(top[1].name, "B");
        assert!(top.iter().all(|r| r.tgm_score >= 60.0));
    }

    #[test]
    fn top_n_clamps_to_record_count() {
        assert_eq!(
            top_n(&sample(), Feature::TgmScore, 99, SortOrder::Descending).len(),
            3
        );
        assert!(top_n(&sample(), Feature::TgmScore, 0, SortOrder::Descending).is_empty());
    }

    #[test]
    fn top_n_ascending_and_stable_ties() {
        let records = vec![
            province("A", 70.0, 1),
            province("B", 70.0, 1),
            province("C", 60.0, 0),
        ];
        let bottom = top_n(&records, Feature::TgmScore, 3, SortOrder::Ascending);
        assert_eq!(bottom[0].name, "C");
        // equal scores keep original order
        assert_eq!(bottom[1].name, "A");
        assert_eq!(bottom[2].name, "B");
    }

    #[test]
    fn pearson_of_field_with_itself_is_one() {
        let r = pearson_correlation(&sample(), Feature::TgmScore, Feature::TgmScore).unwrap();
        assert!((r - 1.0).abs() < 1e-12);
    }

    #[test]
    fn pearson_is_symmetric() {
        let records = sample();
        let ab =
            pearson_correlation(&records, Feature::TgmScore, Feature::BooksRead).unwrap();
        let ba =
            pearson_correlation(&records, Feature::BooksRead, Feature::TgmScore).unwrap();
        assert_eq!(ab, ba);
    }

    #[test]
    fn pearson_undefined_for_constant_column() {
        // internet_access_frequency is constant in the fixture
        assert_eq!(
            pearson_correlation(
                &sample(),
                Feature::TgmScore,
                Feature::InternetAccessFrequency
            ),
            None
        );
        assert_eq!(
            pearson_correlation(&sample()[..1], Feature::TgmScore, Feature::BooksRead),
            None
        );
    }

    #[test]
    fn linear_trend_recovers_synthetic_line() {
        // y = 2x + 3 with x = reading_frequency
        let records: Vec<ProvinceRecord> = (1..=5)
            .map(|i| {
                let mut r = province(&format!("P{i}"), 0.0, 0);
                r.reading_frequency = i as f64;
                r.tgm_score = 2.0 * i as f64 + 3.0;
                r
            })
            .collect();
        let fit = linear_trend(&records, Feature::ReadingFrequency, Feature::TgmScore).unwrap();
        assert!((fit.slope - 2.0).abs() < 1e-6);
        assert!((fit.intercept - 3.0).abs() < 1e-6);
    }

    #[test]
    fn linear_trend_rejects_degenerate_x() {
        let err = linear_trend(&sample(), Feature::InternetAccessFrequency, Feature::TgmScore)
            .unwrap_err();
        assert!(matches!(err, AggregateError::InvalidArgument(_)));
        let err = linear_trend(&[], Feature::TgmScore, Feature::BooksRead).unwrap_err();
        assert!(matches!(err, AggregateError::EmptyInput(_)));
    }

    #[test]
    fn age_group_decline_ratio() {
        let mut records = sample();
        for r in &mut records {
            r.aps_7_12 = 90.0;
            r.aps_13_15 = 85.0;
            r.aps_16_18 = 60.0;
            r.aps_19_23 = 20.0;
        }
        let decline = age_group_decline(&records, &Feature::APS_BRACKETS).unwrap();
        assert_eq!(decline.means, vec![90.0, 85.0, 60.0, 20.0]);
        assert!((decline.decline_ratio - (90.0 - 20.0) / 90.0).abs() < 1e-12);
    }

    #[test]
    fn age_group_decline_guards_zero_first_mean() {
        let mut records = sample();
        for r in &mut records {
            r.aps_7_12 = 0.0;
        }
        let err = age_group_decline(&records, &Feature::APS_BRACKETS).unwrap_err();
        assert!(matches!(err, AggregateError::InvalidArgument(_)));
        let err = age_group_decline(&records, &[]).unwrap_err();
        assert!(matches!(err, AggregateError::InvalidArgument(_)));
    }

    #[test]
    fn best_record_and_top_region() {
        let records = sample();
        let best = best_record(&records, Feature::TgmScore).unwrap();
        assert_eq!(best.name, "A");
        let stats = regional_summary(&sample(), &membership());
        assert_eq!(top_region(&stats).unwrap().region, "West");
    }

    #[test]
    fn reducers_fail_on_empty_input() {
        assert!(matches!(
            best_record(&[], Feature::TgmScore).unwrap_err(),
            AggregateError::EmptyInput(_)
        ));
        assert!(matches!(
            top_region(&[]).unwrap_err(),
            AggregateError::EmptyInput(_)
        ));
    }

    #[test]
    fn aggregation_is_deterministic() {
        let records = sample();
        assert_eq!(
            regional_summary(&records, &membership()),
            regional_summary(&records, &membership())
        );
        assert_eq!(
            pearson_correlation(&records, Feature::TgmScore, Feature::BooksRead),
            pearson_correlation(&records, Feature::TgmScore, Feature::BooksRead)
        );
    }
}
