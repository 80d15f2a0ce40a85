// Entry point and high-level CLI flow.
//
// - Option [1] loads and validates the two CSV datasets, printing
//   diagnostics.
// - Option [2] generates the six static charts, exporting each payload to
//   a JSON file (plus a CSV of the series) and printing a preview.
// - Option [3] recomputes the interactive chart for a selected continent.
// - After generating output, the user can choose to go back to the
//   selection menu or exit.
mod charts;
mod error;
mod loader;
mod output;
mod pipeline;
mod types;
mod util;

use error::DashboardError;
use once_cell::sync::Lazy;
use std::io::{self, Write};
use std::path::Path;
use std::sync::Mutex;
use types::{ChartSpec, Continent, Dataset};

const CASES_PATH: &str = "covid_cases.csv";
const WEATHER_PATH: &str = "weather_2014_2015.csv";

// Simple in-memory app state so we only load the CSVs once but can build
// charts multiple times in a single run. The datasets themselves stay
// read-only; chart builders only ever borrow them.
static APP_STATE: Lazy<Mutex<AppState>> = Lazy::new(|| {
    Mutex::new(AppState {
        cases: None,
        weather: None,
    })
});

struct AppState {
    cases: Option<Dataset>,
    weather: Option<Dataset>,
}

/// Read a single line of input after printing the common "Enter choice:" prompt.
///
/// The prompt is reused for both the main menu and the continent selection.
fn read_choice() -> String {
    print!("Enter choice: ");
    let _ = io::stdout().flush();
    let mut buf = String::new();
    io::stdin().read_line(&mut buf).ok();
    buf.trim().to_string()
}

/// Ask the user whether to go back to the selection menu after generating
/// charts.
///
/// Returns `true` if the user chose `Y`, `false` if they chose `N`.
fn prompt_back_to_menu() -> bool {
    loop {
        print!("Back to Selection Menu (Y/N): ");
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

/// Handle option [1]: load and validate both CSV files.
///
/// On success the datasets are stored in `APP_STATE` with a short textual
/// summary of what happened; a failed file leaves its slot untouched.
fn handle_load() {
    let mut state = APP_STATE.lock().unwrap();
    match loader::load_dataset(Path::new(CASES_PATH), "cases", loader::case_schema()) {
        Ok((data, report)) => {
            println!(
                "Processing case table... ({} of {} rows loaded, {} parse errors)",
                util::format_int(report.loaded_rows as i64),
                util::format_int(report.total_rows as i64),
                util::format_int(report.parse_errors as i64)
            );
            state.cases = Some(data);
        }
        Err(e) => {
            eprintln!("Failed to load {}: {}", CASES_PATH, e);
        }
    }
    match loader::load_dataset(Path::new(WEATHER_PATH), "weather", loader::weather_schema()) {
        Ok((data, report)) => {
            println!(
                "Processing weather table... ({} of {} rows loaded, {} parse errors)",
                util::format_int(report.loaded_rows as i64),
                util::format_int(report.total_rows as i64),
                util::format_int(report.parse_errors as i64)
            );
            state.weather = Some(data);
        }
        Err(e) => {
            eprintln!("Failed to load {}: {}", WEATHER_PATH, e);
        }
    }
    println!();
}

/// Export one chart: JSON payload, CSV of the series when there is one,
/// and a console preview. A failed chart is reported and skipped; the
/// remaining charts still run.
fn write_chart(file: &str, result: Result<ChartSpec, DashboardError>) {
    match result {
        Ok(spec) => {
            if let Err(e) = output::write_json(Path::new(file), &spec) {
                eprintln!("Write error: {}", e);
            }
            if let Some(series) = spec.series() {
                let csv_file = file.replace(".json", ".csv");
                if let Err(e) = output::write_series_csv(Path::new(&csv_file), series) {
                    eprintln!("Write error: {}", e);
                }
            }
            output::preview_chart(&spec, 3);
            println!("(Full payload exported to {})\n", file);
        }
        Err(e) => {
            eprintln!("Chart error: {}\n", e);
        }
    }
}

/// Handle option [2]: build all six static charts.
fn handle_generate_charts() {
    let (cases, weather) = {
        let state = APP_STATE.lock().unwrap();
        (state.cases.clone(), state.weather.clone())
    };
    let (Some(cases), Some(weather)) = (cases, weather) else {
        println!("Error: No data loaded. Please load the datasets first (option 1).\n");
        return;
    };

    println!("Generating charts...");
    println!("Payloads saved to individual files...\n");

    write_chart(
        "chart_us_states.json",
        charts::us_state_bar(&cases, charts::TOP_ROWS),
    );
    write_chart(
        "chart_country_outcomes.json",
        charts::country_stacked_bar(&cases, charts::TOP_ROWS),
    );
    write_chart(
        "chart_monthly_max_temp.json",
        charts::monthly_max_temp_line(&weather),
    );
    write_chart(
        "chart_monthly_temps.json",
        charts::monthly_temp_multiline(&weather),
    );
    write_chart(
        "chart_monthly_bubble.json",
        charts::monthly_temp_bubble(&weather, charts::MARKER_SCALE),
    );
    write_chart(
        "chart_record_temp_heatmap.json",
        charts::record_temp_heatmap(&weather),
    );
}

/// Handle option [3]: the interactive chart, recomputed for one continent.
fn handle_continent_chart() {
    let cases = {
        let state = APP_STATE.lock().unwrap();
        state.cases.clone()
    };
    let Some(cases) = cases else {
        println!("Error: No data loaded. Please load the datasets first (option 1).\n");
        return;
    };

    println!("Please select a continent:");
    for (i, continent) in Continent::ALL.iter().enumerate() {
        println!("[{}] {}", i + 1, continent.as_str());
    }
    let choice = read_choice();
    let Some(continent) = Continent::from_input(&choice) else {
        println!("Invalid choice. Please enter 1-6 or a continent name.\n");
        return;
    };

    println!();
    let file = format!(
        "chart_continent_{}.json",
        continent.as_str().to_lowercase().replace(' ', "_")
    );
    write_chart(
        &file,
        charts::continent_breakdown(&cases, continent, charts::TOP_ROWS),
    );
}

#[cfg(test)]
mod tests {
    use super::*;

    const CASES_CSV: &str = "\
Country,Continent,State,Confirmed,Deaths,Recovered
US,North America,NY,100,10,40
US,North America,CA,50,2,10
China,Asia,Hubei,800,40,600
Italy,Europe,Lombardy,300,30,60
Spain,Europe,Madrid,140,12,20
";

    const WEATHER_CSV: &str = "\
date,month,day,actual_min_temp,actual_max_temp,actual_mean_temp,average_min_temp,average_max_temp,record_max_temp
2014-07-01,Jul,Tue,66,90,78,64,88,102
2014-07-02,Jul,Wed,68,94,81,64,88,101
2014-08-01,Aug,Fri,60,86,73,60,84,99
2014-08-02,Aug,Sat,58,82,70,60,84,98
";

    #[test]
    fn end_to_end_from_csv_to_payloads() {
        let dir = tempfile::tempdir().unwrap();
        let cases_path = dir.path().join("covid_cases.csv");
        let weather_path = dir.path().join("weather_2014_2015.csv");
        std::fs::write(&cases_path, CASES_CSV).unwrap();
        std::fs::write(&weather_path, WEATHER_CSV).unwrap();

        let (cases, cases_report) =
            loader::load_dataset(&cases_path, "cases", loader::case_schema()).unwrap();
        let (weather, weather_report) =
            loader::load_dataset(&weather_path, "weather", loader::weather_schema()).unwrap();
        assert_eq!(cases_report.loaded_rows, 5);
        assert_eq!(weather_report.loaded_rows, 4);

        let specs = vec![
            charts::us_state_bar(&cases, charts::TOP_ROWS).unwrap(),
            charts::country_stacked_bar(&cases, charts::TOP_ROWS).unwrap(),
            charts::monthly_max_temp_line(&weather).unwrap(),
            charts::monthly_temp_multiline(&weather).unwrap(),
            charts::monthly_temp_bubble(&weather, charts::MARKER_SCALE).unwrap(),
            charts::record_temp_heatmap(&weather).unwrap(),
            charts::continent_breakdown(&cases, Continent::Europe, charts::TOP_ROWS).unwrap(),
        ];

        // Every series payload is internally aligned.
        for spec in &specs {
            if let Some(series) = spec.series() {
                for column in &series.columns {
                    assert_eq!(column.data.len(), series.len());
                }
            }
        }

        // Spot-check the reactive chart and persist every payload.
        let europe = specs.last().unwrap().series().unwrap();
        assert_eq!(europe.categories, vec!["Italy", "Spain"]);
        for (i, spec) in specs.iter().enumerate() {
            let path = dir.path().join(format!("chart_{}.json", i));
            output::write_json(&path, spec).unwrap();
            assert!(path.exists());
        }
    }
}

fn main() {
    env_logger::init();
    loop {
        println!("Select an option:");
        println!("[1] Load the datasets");
        println!("[2] Generate charts");
        println!("[3] Continent breakdown\n");
        match read_choice().as_str() {
            "1" => {
                handle_load();
            }
            "2" => {
                println!();
                handle_generate_charts();
                if !prompt_back_to_menu() {
                    println!("Exiting the program.");
                    break;
                }
            }
            "3" => {
                println!();
                handle_continent_chart();
                if !prompt_back_to_menu() {
                    println!("Exiting the program.");
                    break;
                }
            }
            _ => {
                println!("Invalid choice. Please enter 1, 2 or 3.\n");
            }
        }
    }
}
