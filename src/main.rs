// Entry point and high-level CLI flow.
//
// Thin host around the aggregation layer:
// - Option [1] loads and validates the dashboard JSON, printing diagnostics.
// - Option [2] derives every report view once and renders them as console
//   previews, CSV exports, and a JSON summary.
// - After generating reports, the user can choose to go back to the
//   selection menu or exit.
mod aggregate;
mod error;
mod loader;
mod output;
mod reports;
mod types;
mod util;

use loader::Dataset;
use once_cell::sync::Lazy;
use std::io::{self, Write};
use std::path::Path;
use std::sync::Mutex;
use types::RegionMembership;

const INPUT_FILE: &str = "dashboard_data.json";

// Simple in-memory app state so we only load the JSON once but can generate
// reports multiple times in a single run.
static APP_STATE: Lazy<Mutex<AppState>> = Lazy::new(|| Mutex::new(AppState { data: None }));

struct AppState {
    data: Option<Dataset>,
}

/// Read a single line of input after printing the common "Enter choice:" prompt.
fn read_choice() -> String {
    print!("Enter choice: ");
    let _ = io::stdout().flush();
    let mut buf = String::new();
    io::stdin().read_line(&mut buf).ok();
    buf.trim().to_string()
}

/// Ask the user whether to go back to the report selection menu after
/// generating reports.
///
/// Returns `true` if the user chose `Y`, `false` if they chose `N`.
fn prompt_back_to_menu() -> bool {
    loop {
        print!("Back to Report Selection (Y/N): ");
        let _ = io::stdout().flush();
        let mut buf = String::new();
        io::stdin().read_line(&mut buf).ok();
        let resp = buf.trim().to_uppercase();
        match resp.as_str() {
            "Y" => return true,
            "N" => return false,
            _ => println!("Invalid choice. Please enter Y or N."),
        }
    }
}

/// Handle option [1]: load and validate the dashboard payload.
///
/// On success the `Dataset` is stored in `APP_STATE` and a short textual
/// summary of the load is printed, including any data-quality flags.
fn handle_load() {
    let membership = RegionMembership::indonesia();
    match loader::load_dataset(Path::new(INPUT_FILE), &membership) {
        Ok((data, load_report)) => {
            println!(
                "Processing dataset... ({} provinces loaded of {} rows)",
                util::format_int(load_report.loaded_rows as i64),
                util::format_int(load_report.total_rows as i64)
            );
            if load_report.skipped_rows > 0 {
                println!(
                    "Note: {} rows skipped due to missing or non-finite values.",
                    util::format_int(load_report.skipped_rows as i64)
                );
            }
            if !load_report.unassigned_provinces.is_empty() {
                println!(
                    "Warning: {} province(s) belong to no region and are excluded from regional aggregates: {}",
                    load_report.unassigned_provinces.len(),
                    load_report.unassigned_provinces.join(", ")
                );
            }
            println!();
            let mut state = APP_STATE.lock().unwrap();
            state.data = Some(data);
        }
        Err(e) => {
            eprintln!("Failed to load file: {}\n", e);
        }
    }
}

/// Handle option [2]: derive all views and render them.
///
/// This function is intentionally side-effectful:
/// - writes one CSV per report view,
/// - writes a JSON summary,
/// - and prints markdown previews of each view to the console.
fn handle_generate_reports() {
    let data = {
        let state = APP_STATE.lock().unwrap();
        state.data.clone()
    };
    let Some(data) = data else {
        println!("Error: No data loaded. Please load the JSON file first (option 1).\n");
        return;
    };

    println!("Generating reports...");
    println!("Outputs saved to individual files...\n");

    let membership = RegionMembership::indonesia();
    let bundle = reports::build_reports(&data, &membership);

    let file1 = "report1_category_distribution.csv";
    if let Err(e) = output::write_csv(file1, &bundle.category_rows) {
        eprintln!("Write error: {}", e);
    }
    println!("Report 1: Category Distribution\n");
    output::preview_table_rows(&bundle.category_rows, 3);
    println!("(Full table exported to {})\n", file1);

    let file2 = "report2_regional_summary.csv";
    if let Err(e) = output::write_csv(file2, &bundle.region_rows) {
        eprintln!("Write error: {}", e);
    }
    println!("Report 2: Regional TGM Performance\n");
    output::preview_table_rows(&bundle.region_rows, 4);
    println!("(Full table exported to {})\n", file2);

    let file3 = "report3_province_ranking.csv";
    if let Err(e) = output::write_csv(file3, &bundle.ranking_rows) {
        eprintln!("Write error: {}", e);
    }
    println!("Report 3: Top Provinces by TGM Score\n");
    output::preview_table_rows(&bundle.ranking_rows, 5);
    println!("(Full table exported to {})\n", file3);

    let file4 = "report4_correlation_matrix.csv";
    if let Err(e) = output::write_csv(file4, &bundle.correlation_rows) {
        eprintln!("Write error: {}", e);
    }
    println!("Report 4: Feature Correlation Matrix\n");
    output::preview_table_rows(&bundle.correlation_rows, 6);
    println!("(Full table exported to {})\n", file4);

    let file5 = "report5_aps_decline.csv";
    if let Err(e) = output::write_csv(file5, &bundle.decline_rows) {
        eprintln!("Write error: {}", e);
    }
    println!("Report 5: APS Decline by Age Group\n");
    output::preview_table_rows(&bundle.decline_rows, 4);
    println!("(Full table exported to {})\n", file5);

    let file6 = "report6_knn_evaluation.csv";
    if let Err(e) = output::write_csv(file6, &bundle.knn_rows) {
        eprintln!("Write error: {}", e);
    }
    println!("Report 6: KNN Model Evaluation\n");
    output::preview_table_rows(&bundle.knn_rows, 5);
    println!("(Full table exported to {})\n", file6);

    let file7 = "report7_scatter_trends.csv";
    if let Err(e) = output::write_csv(file7, &bundle.scatter_rows) {
        eprintln!("Write error: {}", e);
    }
    println!("Report 7: Scatter Trends (TGM against key features)\n");
    output::preview_table_rows(&bundle.scatter_rows, bundle.scatter_rows.len());
    println!("(Full table exported to {})\n", file7);

    let summary = &bundle.summary;
    if let Err(e) = output::write_json("summary.json", summary) {
        eprintln!("Write error: {}", e);
    }
    println!("Headline stats (summary.json):");
    println!(
        "  Provinces: {} | Avg TGM: {} | Top: {} | Top region: {}",
        summary.total_provinces,
        util::format_number(summary.avg_tgm, 2),
        summary.top_province.as_deref().unwrap_or("n/a"),
        summary.top_region.as_deref().unwrap_or("n/a"),
    );
    println!(
        "  Best K: {} | Accuracy: {:.1}% | TGM x APS 19-23: {} | APS drop: {}",
        summary.best_k,
        summary.best_accuracy_pct,
        summary
            .corr_tgm_aps_19_23
            .map(|r| format!("r={r:.3}"))
            .unwrap_or_else(|| "undefined".to_string()),
        summary
            .aps_decline_pct
            .map(|d| format!("{d:.0}%"))
            .unwrap_or_else(|| "n/a".to_string()),
    );
    println!();

    if !bundle.warnings.is_empty() {
        println!("Warnings:");
        for w in &bundle.warnings {
            println!("  - {}", w);
        }
        println!();
    }
}

fn main() {
    loop {
        println!("Select Report Action:");
        println!("[1] Load the file");
        println!("[2] Generate Reports\n");
        match read_choice().as_str() {
            "1" => {
                handle_load();
            }
            "2" => {
                println!();
                handle_generate_reports();
                if !prompt_back_to_menu() {
                    println!("Exiting the program.");
                    break;
                }
            }
            _ => {
                println!("Invalid choice. Please enter 1 or 2.\n");
            }
        }
    }
}
