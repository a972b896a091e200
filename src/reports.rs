// Builds the full set of derived views for one report render.
//
// Every figure is computed exactly once here and every consumer (console
// preview, CSV export, JSON summary) reads the same `ReportBundle`, so the
// displayed numbers can never drift apart. Metrics are computed independently:
// when one fails it becomes a warning and the other views are still produced.
use crate::aggregate::{
    age_group_decline, best_record, category_counts, linear_trend, pearson_correlation,
    regional_summary, top_n, top_region, SortOrder,
};
use crate::loader::Dataset;
use crate::types::{
    ApsDeclineRow, Category, CategoryCountRow, CorrelationRow, Feature, KAccuracyRow,
    ProvinceRankRow, RegionMembership, RegionSummaryRow, ScatterRow, SummaryStats,
};
use crate::util::{format_number, mean};

/// How many provinces the ranking view carries; preview panels slice it.
pub const RANKING_SIZE: usize = 15;

/// Feature pairs shown as scatter panels, x before y.
pub const SCATTER_PAIRS: [(Feature, Feature); 4] = [
    (Feature::ReadingFrequency, Feature::TgmScore),
    (Feature::BooksRead, Feature::TgmScore),
    (Feature::Aps19_23, Feature::TgmScore),
    (Feature::Aps16_18, Feature::TgmScore),
];

/// Columns of the correlation matrix, in heatmap order.
pub const MATRIX_FEATURES: [Feature; 6] = [
    Feature::TgmScore,
    Feature::ReadingFrequency,
    Feature::BooksRead,
    Feature::Aps19_23,
    Feature::Aps16_18,
    Feature::InternetAccessFrequency,
];

#[derive(Debug)]
pub struct ReportBundle {
    pub category_rows: Vec<CategoryCountRow>,
    pub region_rows: Vec<RegionSummaryRow>,
    pub ranking_rows: Vec<ProvinceRankRow>,
    pub correlation_rows: Vec<CorrelationRow>,
    pub scatter_rows: Vec<ScatterRow>,
    pub decline_rows: Vec<ApsDeclineRow>,
    pub knn_rows: Vec<KAccuracyRow>,
    pub summary: SummaryStats,
    /// Metrics that failed or came back undefined, one message each.
    pub warnings: Vec<String>,
}

pub fn build_reports(dataset: &Dataset, membership: &RegionMembership) -> ReportBundle {
    let records = &dataset.provinces;
    let mut warnings: Vec<String> = Vec::new();

    // Category distribution
    let counts = match category_counts(records) {
        Ok(counts) => Some(counts),
        Err(e) => {
            warnings.push(format!("category distribution skipped: {e}"));
            None
        }
    };
    let category_rows = counts
        .as_deref()
        .map(category_rows_from)
        .unwrap_or_default();
    let high_category_count = counts.as_ref().map(|c| {
        c.iter()
            .find(|(cat, _)| *cat == Category::High)
            .map(|(_, n)| *n)
            .unwrap_or(0)
    });

    // Regional performance
    let region_stats = regional_summary(records, membership);
    let region_rows: Vec<RegionSummaryRow> = region_stats
        .iter()
        .map(|s| RegionSummaryRow {
            region: s.region.clone(),
            provinces: s.count,
            avg_tgm: format_number(s.mean, 2),
            max_tgm: format_number(s.max, 2),
            min_tgm: format_number(s.min, 2),
        })
        .collect();

    // Province ranking
    let ranking_rows: Vec<ProvinceRankRow> = top_n(
        records,
        Feature::TgmScore,
        RANKING_SIZE,
        SortOrder::Descending,
    )
    .into_iter()
    .enumerate()
    .map(|(idx, r)| ProvinceRankRow {
        rank: idx + 1,
        province: r.name.clone(),
        tgm: format_number(r.tgm_score, 2),
        category: Category::from_label(r.category_label)
            .map(|c| c.name().to_string())
            .unwrap_or_else(|_| "?".to_string()),
    })
    .collect();

    // Full correlation matrix, long form
    let mut correlation_rows: Vec<CorrelationRow> = Vec::new();
    for a in MATRIX_FEATURES {
        for b in MATRIX_FEATURES {
            let r = pearson_correlation(records, a, b);
            if r.is_none() && a != b {
                warnings.push(format!(
                    "correlation {} x {} undefined (constant column)",
                    a.label(),
                    b.label()
                ));
            }
            correlation_rows.push(CorrelationRow {
                feature_a: a.label().to_string(),
                feature_b: b.label().to_string(),
                r: r.map(|v| format!("{v:.3}")).unwrap_or_else(|| "n/a".to_string()),
            });
        }
    }

    // Scatter panels: correlation + fitted trendline per pair
    let scatter_rows: Vec<ScatterRow> = SCATTER_PAIRS
        .iter()
        .map(|(x, y)| {
            let pair = format!("{} vs {}", y.label(), x.label());
            let r = pearson_correlation(records, *x, *y);
            let trend = linear_trend(records, *x, *y);
            if let Err(e) = &trend {
                warnings.push(format!("trendline for {pair} omitted: {e}"));
            }
            let (slope, intercept) = match &trend {
                Ok(t) => (format!("{:.4}", t.slope), format!("{:.4}", t.intercept)),
                Err(_) => ("n/a".to_string(), "n/a".to_string()),
            };
            ScatterRow {
                pair,
                r: r.map(|v| format!("{v:.3}")).unwrap_or_else(|| "n/a".to_string()),
                strength: r.map(strength_label).unwrap_or("undefined").to_string(),
                slope,
                intercept,
            }
        })
        .collect();

    // APS decline by age bracket; the headline drop percentage is derived
    // here, never asserted as fixed narrative text.
    let decline = match age_group_decline(records, &Feature::APS_BRACKETS) {
        Ok(d) => Some(d),
        Err(e) => {
            warnings.push(format!("APS decline skipped: {e}"));
            None
        }
    };
    let decline_rows: Vec<ApsDeclineRow> = decline
        .as_ref()
        .map(|d| {
            Feature::APS_BRACKETS
                .iter()
                .zip(d.means.iter())
                .map(|(bracket, m)| ApsDeclineRow {
                    age_bracket: bracket.label().to_string(),
                    mean_aps: format_number(*m, 2),
                })
                .collect()
        })
        .unwrap_or_default();

    // KNN evaluation table
    let eval = &dataset.evaluation;
    let knn_rows: Vec<KAccuracyRow> = eval
        .k_results
        .iter()
        .map(|(k, accuracy)| KAccuracyRow {
            k: *k,
            accuracy: format!("{:.1}%", accuracy * 100.0),
            best: (if *k == eval.best_k { "*" } else { "" }).to_string(),
        })
        .collect();

    // Headline stats
    let tgm_scores: Vec<f64> = records.iter().map(|r| r.tgm_score).collect();
    let best = best_record(records, Feature::TgmScore);
    let top_province = match &best {
        Ok(r) => Some(r.name.clone()),
        Err(e) => {
            warnings.push(format!("top province skipped: {e}"));
            None
        }
    };
    let top_region_name = match top_region(&region_stats) {
        Ok(s) => Some(s.region.clone()),
        Err(e) => {
            warnings.push(format!("top region skipped: {e}"));
            None
        }
    };
    let corr_tgm_aps = pearson_correlation(records, Feature::TgmScore, Feature::Aps19_23);
    if corr_tgm_aps.is_none() {
        warnings.push("headline TGM x APS 19-23 correlation undefined".to_string());
    }
    let bottom = top_n(records, Feature::TgmScore, 1, SortOrder::Ascending);
    let summary = SummaryStats {
        total_provinces: records.len(),
        high_category_count,
        avg_tgm: mean(&tgm_scores),
        max_tgm: best.ok().map(|r| r.tgm_score),
        min_tgm: bottom.first().map(|r| r.tgm_score),
        top_province,
        top_region: top_region_name,
        best_k: eval.best_k,
        best_accuracy_pct: eval.best_accuracy * 100.0,
        corr_tgm_aps_19_23: corr_tgm_aps,
        aps_decline_pct: decline.as_ref().map(|d| d.decline_ratio * 100.0),
    };

    ReportBundle {
        category_rows,
        region_rows,
        ranking_rows,
        correlation_rows,
        scatter_rows,
        decline_rows,
        knn_rows,
        summary,
        warnings,
    }
}

fn category_rows_from(counts: &[(Category, usize)]) -> Vec<CategoryCountRow> {
    let total: usize = counts.iter().map(|(_, n)| n).sum();
    counts
        .iter()
        .map(|(category, n)| CategoryCountRow {
            category: category.name().to_string(),
            provinces: *n,
            share: if total == 0 {
                "0.0%".to_string()
            } else {
                format!("{:.1}%", *n as f64 / total as f64 * 100.0)
            },
        })
        .collect()
}

fn strength_label(r: f64) -> &'static str {
    let abs = r.abs();
    if abs >= 0.7 {
        "Strong"
    } else if abs >= 0.4 {
        "Moderate"
    } else {
        "Weak"
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::{ModelEvaluation, ProvinceRecord};

    fn record(name: &str, tgm: f64, freq: f64, label: i64) -> ProvinceRecord {
        ProvinceRecord {
            name: name.to_string(),
            tgm_score: tgm,
            reading_frequency: freq,
            books_read: tgm / 15.0,
            internet_access_frequency: freq + 1.0,
            aps_7_12: 99.0,
            aps_13_15: 95.0,
            aps_16_18: 72.0,
            aps_19_23: 29.0,
            category_label: label,
        }
    }

    fn dataset() -> Dataset {
        Dataset {
            provinces: vec![
                record("DI Yogyakarta", 80.0, 6.1, 2),
                record("DKI Jakarta", 70.0, 5.4, 1),
                record("Kalimantan Barat", 60.0, 4.0, 0),
            ],
            evaluation: ModelEvaluation {
                best_k: 1,
                best_accuracy: 0.833,
                k_results: vec![(1, 0.833), (3, 0.79), (5, 0.75)],
            },
        }
    }

    #[test]
    fn bundle_produces_all_views() {
        let bundle = build_reports(&dataset(), &RegionMembership::indonesia());
        assert_eq!(bundle.category_rows.len(), 3);
        assert_eq!(bundle.category_rows[0].category, "Tinggi");
        assert_eq!(bundle.category_rows[0].provinces, 1);
        // Jawa and Kalimantan have members, Sumatera and Sulawesi do not
        assert_eq!(bundle.region_rows.len(), 2);
        assert_eq!(bundle.region_rows[0].region, "Jawa");
        assert_eq!(bundle.ranking_rows.len(), 3);
        assert_eq!(bundle.ranking_rows[0].province, "DI Yogyakarta");
        assert_eq!(
            bundle.correlation_rows.len(),
            MATRIX_FEATURES.len() * MATRIX_FEATURES.len()
        );
        assert_eq!(bundle.scatter_rows.len(), SCATTER_PAIRS.len());
        assert_eq!(bundle.decline_rows.len(), 4);
        assert_eq!(bundle.knn_rows.len(), 3);
        assert_eq!(bundle.knn_rows[0].best, "*");
        assert_eq!(bundle.summary.total_provinces, 3);
        assert_eq!(bundle.summary.top_province.as_deref(), Some("DI Yogyakarta"));
        assert_eq!(bundle.summary.top_region.as_deref(), Some("Jawa"));
        assert_eq!(bundle.summary.high_category_count, Some(1));
    }

    #[test]
    fn decline_percentage_is_derived_not_asserted() {
        let bundle = build_reports(&dataset(), &RegionMembership::indonesia());
        let expected = (99.0 - 29.0) / 99.0 * 100.0;
        let got = bundle.summary.aps_decline_pct.unwrap();
        assert!((got - expected).abs() < 1e-9);
    }

    #[test]
    fn failed_metric_does_not_abort_other_views() {
        let mut ds = dataset();
        // break the category labels; everything else must still render
        ds.provinces[0].category_label = 9;
        let bundle = build_reports(&ds, &RegionMembership::indonesia());
        assert!(bundle.category_rows.is_empty());
        assert!(bundle
            .warnings
            .iter()
            .any(|w| w.contains("category distribution")));
        assert_eq!(bundle.region_rows.len(), 2);
        assert_eq!(bundle.ranking_rows.len(), 3);
        assert!(bundle.summary.aps_decline_pct.is_some());
        // the broken label shows up as "?" in the ranking, not a crash
        assert_eq!(bundle.ranking_rows[0].category, "?");
    }

    #[test]
    fn constant_column_yields_undefined_correlation_with_warning() {
        let mut ds = dataset();
        for p in &mut ds.provinces {
            p.books_read = 3.0;
        }
        let bundle = build_reports(&ds, &RegionMembership::indonesia());
        let cell = bundle
            .correlation_rows
            .iter()
            .find(|c| c.feature_a == "TGM" && c.feature_b == "Jml.Buku")
            .unwrap();
        assert_eq!(cell.r, "n/a");
        assert!(bundle.warnings.iter().any(|w| w.contains("undefined")));
    }
}
