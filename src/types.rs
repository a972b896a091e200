use serde::{Deserialize, Serialize};
use tabled::Tabled;

use crate::error::AggregateError;

/// One province entry as it appears in `dashboard_data.json`. Field names
/// follow the upstream export (Indonesian column headers), so this struct is
/// only a deserialization surface; `loader` converts it into [`ProvinceRecord`].
#[derive(Debug, Deserialize)]
pub struct RawProvince {
    #[serde(rename = "Provinsi")]
    pub name: String,
    #[serde(rename = "Tingkat Kegemaran Membaca")]
    pub tgm_score: f64,
    #[serde(rename = "Frekuensi Membaca")]
    pub reading_frequency: f64,
    #[serde(rename = "Jumlah Buku yang Dibaca")]
    pub books_read: f64,
    #[serde(rename = "Frekuensi Akses Internet")]
    pub internet_access_frequency: f64,
    #[serde(rename = "APS_7_12")]
    pub aps_7_12: f64,
    #[serde(rename = "APS_13_15")]
    pub aps_13_15: f64,
    #[serde(rename = "APS_16_18")]
    pub aps_16_18: f64,
    #[serde(rename = "APS_19_23")]
    pub aps_19_23: f64,
    #[serde(rename = "Label_TGM")]
    pub category_label: i64,
}

/// Clean, validated province row. `category_label` stays raw here; the
/// upstream classifier owns the 0/1/2 assignment and `aggregate` validates it
/// against [`Category`] at the point of use.
#[derive(Debug, Clone, PartialEq)]
pub struct ProvinceRecord {
    pub name: String,
    pub tgm_score: f64,
    pub reading_frequency: f64,
    pub books_read: f64,
    pub internet_access_frequency: f64,
    pub aps_7_12: f64,
    pub aps_13_15: f64,
    pub aps_16_18: f64,
    pub aps_19_23: f64,
    pub category_label: i64,
}

/// Reading-interest category assigned upstream by the KNN labeling step.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Category {
    Low,
    Medium,
    High,
}

impl Category {
    /// Fixed display order: reports list High first, Low last.
    pub const DISPLAY_ORDER: [Category; 3] = [Category::High, Category::Medium, Category::Low];

    pub fn from_label(label: i64) -> Result<Category, AggregateError> {
        match label {
            0 => Ok(Category::Low),
            1 => Ok(Category::Medium),
            2 => Ok(Category::High),
            other => Err(AggregateError::DataIntegrity(format!(
                "unknown category label {other} (expected 0, 1 or 2)"
            ))),
        }
    }

    pub fn name(self) -> &'static str {
        match self {
            Category::Low => "Rendah",
            Category::Medium => "Sedang",
            Category::High => "Tinggi",
        }
    }
}

/// Selector for the numeric columns of a [`ProvinceRecord`]. Aggregation
/// operations take a `Feature` instead of a field reference so rankings,
/// correlations and trendlines work over any column.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Feature {
    TgmScore,
    ReadingFrequency,
    BooksRead,
    InternetAccessFrequency,
    Aps7_12,
    Aps13_15,
    Aps16_18,
    Aps19_23,
}

impl Feature {
    pub fn of(self, r: &ProvinceRecord) -> f64 {
        match self {
            Feature::TgmScore => r.tgm_score,
            Feature::ReadingFrequency => r.reading_frequency,
            Feature::BooksRead => r.books_read,
            Feature::InternetAccessFrequency => r.internet_access_frequency,
            Feature::Aps7_12 => r.aps_7_12,
            Feature::Aps13_15 => r.aps_13_15,
            Feature::Aps16_18 => r.aps_16_18,
            Feature::Aps19_23 => r.aps_19_23,
        }
    }

    /// Short label used in correlation matrices and table headers.
    pub fn label(self) -> &'static str {
        match self {
            Feature::TgmScore => "TGM",
            Feature::ReadingFrequency => "Frek.Baca",
            Feature::BooksRead => "Jml.Buku",
            Feature::InternetAccessFrequency => "Frek.Net",
            Feature::Aps7_12 => "APS 7-12",
            Feature::Aps13_15 => "APS 13-15",
            Feature::Aps16_18 => "APS 16-18",
            Feature::Aps19_23 => "APS 19-23",
        }
    }

    /// The four school-participation brackets, youngest to oldest.
    pub const APS_BRACKETS: [Feature; 4] = [
        Feature::Aps7_12,
        Feature::Aps13_15,
        Feature::Aps16_18,
        Feature::Aps19_23,
    ];
}

/// Region-to-province assignment. Held as an ordered list so tie-breaks in
/// regional rankings follow the enumeration order, and injected into the
/// aggregator rather than read from a global so tests can substitute fixtures.
#[derive(Debug, Clone)]
pub struct RegionMembership {
    regions: Vec<(String, Vec<String>)>,
}

impl RegionMembership {
    pub fn new(regions: Vec<(String, Vec<String>)>) -> RegionMembership {
        RegionMembership { regions }
    }

    /// The four-region grouping used by the 2024 report.
    pub fn indonesia() -> RegionMembership {
        fn named(name: &str, provinces: &[&str]) -> (String, Vec<String>) {
            (
                name.to_string(),
                provinces.iter().map(|p| p.to_string()).collect(),
            )
        }
        RegionMembership::new(vec![
            named(
                "Jawa",
                &[
                    "DKI Jakarta",
                    "Jawa Barat",
                    "Jawa Tengah",
                    "DI Yogyakarta",
                    "Jawa Timur",
                    "Banten",
                ],
            ),
            named(
                "Sumatera",
                &[
                    "Aceh",
                    "Sumatera Utara",
                    "Sumatera Barat",
                    "Riau",
                    "Jambi",
                    "Sumatera Selatan",
                    "Bengkulu",
                    "Lampung",
                    "Kepulauan Bangka Belitung",
                    "Kepulauan Riau",
                ],
            ),
            named(
                "Kalimantan",
                &[
                    "Kalimantan Barat",
                    "Kalimantan Tengah",
                    "Kalimantan Selatan",
                    "Kalimantan Timur",
                    "Kalimantan Utara",
                ],
            ),
            named(
                "Sulawesi",
                &[
                    "Sulawesi Utara",
                    "Sulawesi Tengah",
                    "Sulawesi Selatan",
                    "Sulawesi Tenggara",
                    "Gorontalo",
                    "Sulawesi Barat",
                ],
            ),
        ])
    }

    pub fn regions(&self) -> &[(String, Vec<String>)] {
        &self.regions
    }

    pub fn contains(&self, province: &str) -> bool {
        self.regions
            .iter()
            .any(|(_, provinces)| provinces.iter().any(|p| p == province))
    }
}

/// KNN evaluation summary computed upstream; consumed for display only.
#[derive(Debug, Clone)]
pub struct ModelEvaluation {
    pub best_k: u32,
    pub best_accuracy: f64,
    /// Candidate k and observed accuracy, sorted by k ascending for display.
    pub k_results: Vec<(u32, f64)>,
}

/// Per-region TGM statistics. Regions with no matching provinces never
/// produce a `RegionStats`; callers see absence, not zeros or NaN.
#[derive(Debug, Clone, PartialEq)]
pub struct RegionStats {
    pub region: String,
    pub mean: f64,
    pub max: f64,
    pub min: f64,
    pub count: usize,
}

/// Least-squares fit `y = slope * x + intercept`.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct TrendLine {
    pub slope: f64,
    pub intercept: f64,
}

/// Per-bracket APS means (caller's bracket order) and the headline drop
/// between the first and last bracket.
#[derive(Debug, Clone, PartialEq)]
pub struct AgeDecline {
    pub means: Vec<f64>,
    pub decline_ratio: f64,
}

// ---- display rows (tabled previews + CSV export) ----

#[derive(Debug, Serialize, Tabled, Clone)]
pub struct CategoryCountRow {
    #[serde(rename = "Category")]
    #[tabled(rename = "Category")]
    pub category: String,
    #[serde(rename = "Provinces")]
    #[tabled(rename = "Provinces")]
    pub provinces: usize,
    #[serde(rename = "Share")]
    #[tabled(rename = "Share")]
    pub share: String,
}

#[derive(Debug, Serialize, Tabled, Clone)]
pub struct RegionSummaryRow {
    #[serde(rename = "Region")]
    #[tabled(rename = "Region")]
    pub region: String,
    #[serde(rename = "Provinces")]
    #[tabled(rename = "Provinces")]
    pub provinces: usize,
    #[serde(rename = "AvgTGM")]
    #[tabled(rename = "AvgTGM")]
    pub avg_tgm: String,
    #[serde(rename = "MaxTGM")]
    #[tabled(rename = "MaxTGM")]
    pub max_tgm: String,
    #[serde(rename = "MinTGM")]
    #[tabled(rename = "MinTGM")]
    pub min_tgm: String,
}

#[derive(Debug, Serialize, Tabled, Clone)]
pub struct ProvinceRankRow {
    #[serde(rename = "Rank")]
    #[tabled(rename = "Rank")]
    pub rank: usize,
    #[serde(rename = "Province")]
    #[tabled(rename = "Province")]
    pub province: String,
    #[serde(rename = "TGM")]
    #[tabled(rename = "TGM")]
    pub tgm: String,
    #[serde(rename = "Category")]
    #[tabled(rename = "Category")]
    pub category: String,
}

#[derive(Debug, Serialize, Tabled, Clone)]
pub struct CorrelationRow {
    #[serde(rename = "FeatureA")]
    #[tabled(rename = "FeatureA")]
    pub feature_a: String,
    #[serde(rename = "FeatureB")]
    #[tabled(rename = "FeatureB")]
    pub feature_b: String,
    #[serde(rename = "R")]
    #[tabled(rename = "R")]
    pub r: String,
}

#[derive(Debug, Serialize, Tabled, Clone)]
pub struct ScatterRow {
    #[serde(rename = "Pair")]
    #[tabled(rename = "Pair")]
    pub pair: String,
    #[serde(rename = "R")]
    #[tabled(rename = "R")]
    pub r: String,
    #[serde(rename = "Strength")]
    #[tabled(rename = "Strength")]
    pub strength: String,
    #[serde(rename = "Slope")]
    #[tabled(rename = "Slope")]
    pub slope: String,
    #[serde(rename = "Intercept")]
    #[tabled(rename = "Intercept")]
    pub intercept: String,
}

#[derive(Debug, Serialize, Tabled, Clone)]
pub struct ApsDeclineRow {
    #[serde(rename = "AgeBracket")]
    #[tabled(rename = "AgeBracket")]
    pub age_bracket: String,
    #[serde(rename = "MeanAPS")]
    #[tabled(rename = "MeanAPS")]
    pub mean_aps: String,
}

#[derive(Debug, Serialize, Tabled, Clone)]
pub struct KAccuracyRow {
    #[serde(rename = "K")]
    #[tabled(rename = "K")]
    pub k: u32,
    #[serde(rename = "Accuracy")]
    #[tabled(rename = "Accuracy")]
    pub accuracy: String,
    #[serde(rename = "Best")]
    #[tabled(rename = "Best")]
    pub best: String,
}

/// Headline figures for the summary JSON. Optional fields are metrics whose
/// computation failed or came back undefined; they serialize as null rather
/// than a bogus number.
#[derive(Debug, Serialize)]
pub struct SummaryStats {
    pub total_provinces: usize,
    pub high_category_count: Option<usize>,
    pub avg_tgm: f64,
    pub max_tgm: Option<f64>,
    pub min_tgm: Option<f64>,
    pub top_province: Option<String>,
    pub top_region: Option<String>,
    pub best_k: u32,
    pub best_accuracy_pct: f64,
    pub corr_tgm_aps_19_23: Option<f64>,
    pub aps_decline_pct: Option<f64>,
}
