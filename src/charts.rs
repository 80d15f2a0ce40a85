// Chart builders.
//
// Each function wires one chart's transform chain and returns a
// renderer-agnostic `ChartSpec`. The chains mirror the dashboard layout:
// two case-table charts, three monthly weather charts, the raw heatmap,
// and the continent breakdown recomputed per selector event.
use crate::error::{ConfigError, DashboardError};
use crate::pipeline::{self, AggFunc, Aggregate, Expr, Step};
use crate::types::{ChartData, ChartKind, ChartSpec, Continent, Dataset};
use log::info;

/// How many ranked rows the bar charts keep.
pub const TOP_ROWS: usize = 20;
/// Divisor applied to the mean temperature to size bubble markers.
pub const MARKER_SCALE: f64 = 0.5;

fn top_rows(n: usize) -> Result<Step, ConfigError> {
    if n == 0 {
        return Err(ConfigError::ZeroTruncation);
    }
    Ok(Step::Truncate(n))
}

/// Confirmed cases of the US, summed per state, top `top` states.
pub fn us_state_bar(cases: &Dataset, top: usize) -> Result<ChartSpec, DashboardError> {
    let steps = vec![
        Step::filter_eq("Country", "US"),
        Step::Normalize,
        Step::group_by(&["State"], vec![Aggregate::new("Confirmed", AggFunc::Sum)]),
        Step::sort_desc("Confirmed"),
        top_rows(top)?,
    ];
    let table = pipeline::run(cases, &steps)?;
    let series = pipeline::assemble(
        &table,
        "Confirmed cases",
        "State",
        &[("Confirmed", "Confirmed")],
    )?;
    Ok(ChartSpec {
        kind: ChartKind::Bar,
        title: "Corona Virus Confirmed Cases in The US".to_string(),
        x_label: "States".to_string(),
        y_label: "Number of confirmed cases".to_string(),
        data: ChartData::Series(series),
    })
}

/// Deaths, recovered and still-under-treatment cases per country
/// (excluding China), stacked, top `top` countries by confirmed total.
pub fn country_stacked_bar(cases: &Dataset, top: usize) -> Result<ChartSpec, DashboardError> {
    let unrecovered = Expr::col("Confirmed")
        .sub(Expr::col("Deaths"))
        .sub(Expr::col("Recovered"));
    let steps = vec![
        Step::Normalize,
        Step::derive("Unrecovered", unrecovered),
        Step::filter_ne("Country", "China"),
        Step::group_by(
            &["Country"],
            vec![
                Aggregate::new("Confirmed", AggFunc::Sum),
                Aggregate::new("Deaths", AggFunc::Sum),
                Aggregate::new("Recovered", AggFunc::Sum),
                Aggregate::new("Unrecovered", AggFunc::Sum),
            ],
        ),
        Step::sort_desc("Confirmed"),
        top_rows(top)?,
    ];
    let table = pipeline::run(cases, &steps)?;
    let series = pipeline::assemble(
        &table,
        "Cases by outcome",
        "Country",
        &[
            ("Unrecovered", "Under Treatment"),
            ("Recovered", "Recovered"),
            ("Deaths", "Deaths"),
        ],
    )?;
    Ok(ChartSpec {
        kind: ChartKind::StackedBar,
        title: format!("Corona Virus Cases in the first {top} countries except China"),
        x_label: "Country".to_string(),
        y_label: "Number of cases".to_string(),
        data: ChartData::Series(series),
    })
}

/// Highest recorded actual temperature per month.
pub fn monthly_max_temp_line(weather: &Dataset) -> Result<ChartSpec, DashboardError> {
    let steps = vec![
        Step::group_by(
            &["month"],
            vec![Aggregate::new("actual_max_temp", AggFunc::Max)],
        ),
        Step::sort_asc("month"),
    ];
    let table = pipeline::run(weather, &steps)?;
    let series = pipeline::assemble(
        &table,
        "Actual max temperature",
        "month",
        &[("actual_max_temp", "Max Temp")],
    )?;
    Ok(ChartSpec {
        kind: ChartKind::Line,
        title: "Actual Max Temperature From July 2014 to May 2015".to_string(),
        x_label: "Month".to_string(),
        y_label: "Temperature".to_string(),
        data: ChartData::Series(series),
    })
}

/// Max, min and mean actual temperature per month, three lines.
pub fn monthly_temp_multiline(weather: &Dataset) -> Result<ChartSpec, DashboardError> {
    let steps = vec![
        Step::group_by(
            &["month"],
            vec![
                Aggregate::new("actual_mean_temp", AggFunc::Mean),
                Aggregate::new("actual_min_temp", AggFunc::Min),
                Aggregate::new("actual_max_temp", AggFunc::Max),
            ],
        ),
        Step::sort_asc("month"),
    ];
    let table = pipeline::run(weather, &steps)?;
    let series = pipeline::assemble(
        &table,
        "Monthly temperatures",
        "month",
        &[
            ("actual_max_temp", "Max Temp"),
            ("actual_min_temp", "Min Temp"),
            ("actual_mean_temp", "Mean Temp"),
        ],
    )?;
    Ok(ChartSpec {
        kind: ChartKind::MultiLine,
        title: "The Actual Max, Min, and Mean Temperature of Each Month".to_string(),
        x_label: "Date".to_string(),
        y_label: "Temperature".to_string(),
        data: ChartData::Series(series),
    })
}

/// Average min vs. average max temperature per month, with markers sized
/// by the monthly mean divided by `scale`.
pub fn monthly_temp_bubble(weather: &Dataset, scale: f64) -> Result<ChartSpec, DashboardError> {
    if !scale.is_finite() || scale <= 0.0 {
        return Err(ConfigError::InvalidScale(scale).into());
    }
    let steps = vec![
        Step::group_by(
            &["month"],
            vec![
                Aggregate::new("actual_mean_temp", AggFunc::Mean),
                Aggregate::new("average_min_temp", AggFunc::Min),
                Aggregate::new("average_max_temp", AggFunc::Max),
            ],
        ),
        Step::derive(
            "marker_size",
            Expr::col("actual_mean_temp").div(Expr::constant(scale)),
        ),
        Step::sort_asc("month"),
    ];
    let table = pipeline::run(weather, &steps)?;
    let series = pipeline::assemble(
        &table,
        "Monthly temperature spread",
        "month",
        &[
            ("average_min_temp", "Average Min Temp"),
            ("average_max_temp", "Average Max Temp"),
            ("actual_mean_temp", "Mean Temp"),
            ("marker_size", "Marker Size"),
        ],
    )?;
    Ok(ChartSpec {
        kind: ChartKind::Bubble,
        title: "Average min and max temperature of each month in weather statistics".to_string(),
        x_label: "Average min temperature".to_string(),
        y_label: "Average max temperature".to_string(),
        data: ChartData::Series(series),
    })
}

/// Recorded max temperature on a day-of-week by month grid, straight from
/// the raw rows.
pub fn record_temp_heatmap(weather: &Dataset) -> Result<ChartSpec, DashboardError> {
    let grid = pipeline::grid(weather, "day", "month", "record_max_temp")?;
    Ok(ChartSpec {
        kind: ChartKind::Heatmap,
        title: "Recorded max temperature".to_string(),
        x_label: "Day of Week".to_string(),
        y_label: "Month of year".to_string(),
        data: ChartData::Grid(grid),
    })
}

/// The reactive chart: confirmed cases of one continent, summed per
/// country, top `top` countries.
///
/// Pure with respect to the selector value; every call re-runs the full
/// chain against the unfiltered case table, so concurrent selections
/// cannot contaminate each other.
pub fn continent_breakdown(
    cases: &Dataset,
    continent: Continent,
    top: usize,
) -> Result<ChartSpec, DashboardError> {
    info!("recomputing continent breakdown for {}", continent.as_str());
    let steps = vec![
        Step::filter_eq("Continent", continent.as_str()),
        Step::Normalize,
        Step::group_by(&["Country"], vec![Aggregate::new("Confirmed", AggFunc::Sum)]),
        Step::sort_desc("Confirmed"),
        top_rows(top)?,
    ];
    let table = pipeline::run(cases, &steps)?;
    let series = pipeline::assemble(
        &table,
        "Confirmed cases",
        "Country",
        &[("Confirmed", "Confirmed")],
    )?;
    Ok(ChartSpec {
        kind: ChartKind::Bar,
        title: format!("Corona Virus Confirmed Cases in {}", continent.as_str()),
        x_label: "Country".to_string(),
        y_label: "Number of confirmed cases".to_string(),
        data: ChartData::Series(series),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::SchemaError;
    use crate::types::{ColumnType, Schema, Value};

    fn case_table() -> Dataset {
        let mut ds = Dataset::new(
            "cases",
            Schema::new(&[
                ("Country", ColumnType::Text),
                ("Continent", ColumnType::Text),
                ("State", ColumnType::Text),
                ("Confirmed", ColumnType::Number),
                ("Deaths", ColumnType::Number),
                ("Recovered", ColumnType::Number),
            ]),
        );
        let rows: &[(&str, &str, &str, f64, f64, f64)] = &[
            ("US", "North America", "NY", 100.0, 10.0, 40.0),
            ("US", "North America", "CA", 50.0, 2.0, 10.0),
            ("China", "Asia", "Hubei", 800.0, 40.0, 600.0),
            ("Iran", "Asia", "Tehran", 120.0, 8.0, 30.0),
            ("Italy", "Europe", "Lombardy", 300.0, 30.0, 60.0),
            ("Spain", "Europe", "Madrid", 140.0, 12.0, 20.0),
        ];
        for (country, continent, state, confirmed, deaths, recovered) in rows {
            ds.rows.push(vec![
                Value::Text(country.to_string()),
                Value::Text(continent.to_string()),
                Value::Text(state.to_string()),
                Value::Number(*confirmed),
                Value::Number(*deaths),
                Value::Number(*recovered),
            ]);
        }
        ds
    }

    fn weather_table() -> Dataset {
        let mut ds = Dataset::new(
            "weather",
            Schema::new(&[
                ("month", ColumnType::Text),
                ("day", ColumnType::Text),
                ("actual_min_temp", ColumnType::Number),
                ("actual_max_temp", ColumnType::Number),
                ("actual_mean_temp", ColumnType::Number),
                ("average_min_temp", ColumnType::Number),
                ("average_max_temp", ColumnType::Number),
                ("record_max_temp", ColumnType::Number),
            ]),
        );
        let rows: &[(&str, &str, f64, f64, f64, f64, f64, f64)] = &[
            ("Jul", "Mon", 66.0, 90.0, 78.0, 64.0, 88.0, 102.0),
            ("Jul", "Tue", 68.0, 94.0, 81.0, 64.0, 88.0, 101.0),
            ("Aug", "Mon", 60.0, 86.0, 73.0, 60.0, 84.0, 99.0),
            ("Aug", "Tue", 58.0, 82.0, 70.0, 60.0, 84.0, 98.0),
        ];
        for (month, day, amin, amax, amean, avgmin, avgmax, recmax) in rows {
            ds.rows.push(vec![
                Value::Text(month.to_string()),
                Value::Text(day.to_string()),
                Value::Number(*amin),
                Value::Number(*amax),
                Value::Number(*amean),
                Value::Number(*avgmin),
                Value::Number(*avgmax),
                Value::Number(*recmax),
            ]);
        }
        ds
    }

    #[test]
    fn us_bar_ranks_states() {
        let spec = us_state_bar(&case_table(), 20).unwrap();
        let series = spec.series().unwrap();
        assert_eq!(series.categories, vec!["NY", "CA"]);
        assert_eq!(series.columns[0].data, vec![100.0, 50.0]);
        assert_eq!(spec.kind, ChartKind::Bar);
    }

    #[test]
    fn stacked_bar_excludes_china_and_stacks_outcomes() {
        let spec = country_stacked_bar(&case_table(), 20).unwrap();
        let series = spec.series().unwrap();
        assert!(!series.categories.iter().any(|c| c == "China"));
        // Sorted by total confirmed: Italy 300, US 150, Spain 140, Iran 120.
        assert_eq!(series.categories, vec!["Italy", "US", "Spain", "Iran"]);
        let under_treatment = series.column("Under Treatment").unwrap();
        // Italy: 300 - 30 - 60.
        assert_eq!(under_treatment.data[0], 210.0);
        assert_eq!(series.columns.len(), 3);
    }

    #[test]
    fn zero_top_n_is_rejected_before_running() {
        let err = us_state_bar(&case_table(), 0).unwrap_err();
        assert!(matches!(
            err,
            DashboardError::Config(ConfigError::ZeroTruncation)
        ));
    }

    #[test]
    fn line_takes_monthly_maxima() {
        let spec = monthly_max_temp_line(&weather_table()).unwrap();
        let series = spec.series().unwrap();
        // Month keys sort lexically, as the grouped table does.
        assert_eq!(series.categories, vec!["Aug", "Jul"]);
        assert_eq!(series.columns[0].data, vec![86.0, 94.0]);
    }

    #[test]
    fn multiline_carries_three_columns() {
        let spec = monthly_temp_multiline(&weather_table()).unwrap();
        let series = spec.series().unwrap();
        assert_eq!(series.columns.len(), 3);
        assert_eq!(series.column("Max Temp").unwrap().data, vec![86.0, 94.0]);
        assert_eq!(series.column("Min Temp").unwrap().data, vec![58.0, 66.0]);
        assert_eq!(
            series.column("Mean Temp").unwrap().data,
            vec![71.5, 79.5]
        );
    }

    #[test]
    fn bubble_marker_is_mean_over_scale() {
        // A single-row table keeps the arithmetic visible: mean 10 with
        // scale 0.5 gives marker 20.
        let mut ds = Dataset::new(
            "weather",
            Schema::new(&[
                ("month", ColumnType::Text),
                ("actual_mean_temp", ColumnType::Number),
                ("average_min_temp", ColumnType::Number),
                ("average_max_temp", ColumnType::Number),
            ]),
        );
        ds.rows.push(vec![
            Value::Text("Jul".into()),
            Value::Number(10.0),
            Value::Number(64.0),
            Value::Number(88.0),
        ]);
        let spec = monthly_temp_bubble(&ds, 0.5).unwrap();
        let series = spec.series().unwrap();
        assert_eq!(series.column("Marker Size").unwrap().data, vec![20.0]);
    }

    #[test]
    fn bubble_rejects_bad_scales() {
        let ds = weather_table();
        for bad in [0.0, -1.0, f64::NAN, f64::INFINITY] {
            let err = monthly_temp_bubble(&ds, bad).unwrap_err();
            assert!(matches!(
                err,
                DashboardError::Config(ConfigError::InvalidScale(_))
            ));
        }
    }

    #[test]
    fn heatmap_uses_raw_rows() {
        let spec = record_temp_heatmap(&weather_table()).unwrap();
        match &spec.data {
            ChartData::Grid(grid) => {
                assert_eq!(grid.x_labels, vec!["Mon", "Tue"]);
                assert_eq!(grid.y_labels, vec!["Jul", "Aug"]);
                assert_eq!(grid.cells[0][0], Some(102.0));
                assert_eq!(grid.cells[1][1], Some(98.0));
            }
            ChartData::Series(_) => panic!("heatmap must carry a grid"),
        }
    }

    #[test]
    fn continent_selections_do_not_contaminate_each_other() {
        let cases = case_table();
        let asia = continent_breakdown(&cases, Continent::Asia, 20).unwrap();
        let europe = continent_breakdown(&cases, Continent::Europe, 20).unwrap();
        let asia_series = asia.series().unwrap();
        let europe_series = europe.series().unwrap();
        assert_eq!(asia_series.categories, vec!["China", "Iran"]);
        assert_eq!(europe_series.categories, vec!["Italy", "Spain"]);
        assert!(!asia_series
            .categories
            .iter()
            .any(|c| europe_series.categories.contains(c)));
    }

    #[test]
    fn unknown_continent_value_yields_empty_series() {
        // Oceania has no rows in the fixture; the chart is empty, not an error.
        let spec = continent_breakdown(&case_table(), Continent::Oceania, 20).unwrap();
        assert!(spec.series().unwrap().is_empty());
    }

    #[test]
    fn chart_against_wrong_dataset_is_a_schema_error() {
        let err = us_state_bar(&weather_table(), 20).unwrap_err();
        assert!(matches!(
            err,
            DashboardError::Schema(SchemaError::MissingColumn { .. })
        ));
    }
}
