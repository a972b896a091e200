use crate::error::AggregateError;
use crate::types::{ModelEvaluation, ProvinceRecord, RawProvince, RegionMembership};
use serde::Deserialize;
use std::collections::HashSet;
use std::fs::File;
use std::io::BufReader;
use std::path::Path;
use thiserror::Error;

/// Top-level shape of `dashboard_data.json`.
#[derive(Debug, Deserialize)]
struct RawDashboard {
    provinces: Vec<RawProvince>,
    knn_evaluation: RawEvaluation,
}

#[derive(Debug, Deserialize)]
struct RawEvaluation {
    best_k: u32,
    best_accuracy: f64,
    /// Keys are stringified k values; order in the file is irrelevant.
    all_k_results: std::collections::HashMap<String, f64>,
}

#[derive(Debug, Error)]
pub enum LoadError {
    #[error("cannot read input file: {0}")]
    Io(#[from] std::io::Error),
    #[error("malformed input file: {0}")]
    Parse(#[from] serde_json::Error),
    #[error(transparent)]
    Integrity(#[from] AggregateError),
}

/// Diagnostics from a single load, printed to the console after option [1].
#[derive(Debug, Clone)]
pub struct LoadReport {
    pub total_rows: usize,
    pub loaded_rows: usize,
    pub skipped_rows: usize,
    /// Provinces that belong to no region. Tolerated (they are simply absent
    /// from regional aggregates) but worth flagging as a data-quality issue.
    pub unassigned_provinces: Vec<String>,
}

/// The immutable inputs for one report render.
#[derive(Debug, Clone)]
pub struct Dataset {
    pub provinces: Vec<ProvinceRecord>,
    pub evaluation: ModelEvaluation,
}

/// Load and validate the dashboard payload.
///
/// Rows with non-finite numerics are skipped and counted; a duplicate
/// province name or a malformed evaluation table is an integrity error
/// because downstream aggregates would silently double-count.
pub fn load_dataset(
    path: &Path,
    membership: &RegionMembership,
) -> Result<(Dataset, LoadReport), LoadError> {
    let file = File::open(path)?;
    let raw: RawDashboard = serde_json::from_reader(BufReader::new(file))?;

    let total_rows = raw.provinces.len();
    let mut skipped_rows = 0usize;
    let mut seen: HashSet<String> = HashSet::new();
    let mut provinces: Vec<ProvinceRecord> = Vec::with_capacity(total_rows);

    for row in raw.provinces {
        let numerics = [
            row.tgm_score,
            row.reading_frequency,
            row.books_read,
            row.internet_access_frequency,
            row.aps_7_12,
            row.aps_13_15,
            row.aps_16_18,
            row.aps_19_23,
        ];
        if numerics.iter().any(|v| !v.is_finite()) {
            skipped_rows += 1;
            continue;
        }
        let name = row.name.trim().to_string();
        if name.is_empty() {
            skipped_rows += 1;
            continue;
        }
        if !seen.insert(name.clone()) {
            return Err(AggregateError::DataIntegrity(format!(
                "duplicate province name: {name}"
            ))
            .into());
        }
        provinces.push(ProvinceRecord {
            name,
            tgm_score: row.tgm_score,
            reading_frequency: row.reading_frequency,
            books_read: row.books_read,
            internet_access_frequency: row.internet_access_frequency,
            aps_7_12: row.aps_7_12,
            aps_13_15: row.aps_13_15,
            aps_16_18: row.aps_16_18,
            aps_19_23: row.aps_19_23,
            category_label: row.category_label,
        });
    }

    let evaluation = validate_evaluation(raw.knn_evaluation)?;

    let unassigned_provinces: Vec<String> = provinces
        .iter()
        .filter(|p| !membership.contains(&p.name))
        .map(|p| p.name.clone())
        .collect();

    let loaded_rows = provinces.len();
    let report = LoadReport {
        total_rows,
        loaded_rows,
        skipped_rows,
        unassigned_provinces,
    };
    Ok((
        Dataset {
            provinces,
            evaluation,
        },
        report,
    ))
}

fn validate_evaluation(raw: RawEvaluation) -> Result<ModelEvaluation, AggregateError> {
    if raw.best_k == 0 {
        return Err(AggregateError::DataIntegrity(
            "best_k must be a positive integer".to_string(),
        ));
    }
    if !(0.0..=1.0).contains(&raw.best_accuracy) {
        return Err(AggregateError::DataIntegrity(format!(
            "best_accuracy {} outside [0, 1]",
            raw.best_accuracy
        )));
    }
    let mut k_results: Vec<(u32, f64)> = Vec::with_capacity(raw.all_k_results.len());
    for (key, accuracy) in raw.all_k_results {
        let k: u32 = key.parse().map_err(|_| {
            AggregateError::DataIntegrity(format!("non-numeric k value in evaluation: {key:?}"))
        })?;
        if !(0.0..=1.0).contains(&accuracy) {
            return Err(AggregateError::DataIntegrity(format!(
                "accuracy {accuracy} for k={k} outside [0, 1]"
            )));
        }
        k_results.push((k, accuracy));
    }
    // k ascending for display
    k_results.sort_by_key(|(k, _)| *k);
    Ok(ModelEvaluation {
        best_k: raw.best_k,
        best_accuracy: raw.best_accuracy,
        k_results,
    })
}
