// CSV ingestion.
//
// Each dataset is loaded in full against an explicit schema. The header is
// validated up front so a missing column fails fast with a `SchemaError`
// instead of surfacing later as a bad aggregation; individual rows that do
// not parse are skipped and counted, the way messy exports are usually
// handled.
use crate::error::{DashboardError, SchemaError};
use crate::types::{ColumnType, Dataset, Schema, Value};
use crate::util::{parse_date_safe, parse_f64_safe};
use csv::ReaderBuilder;
use log::{debug, warn};
use std::path::Path;

#[derive(Debug, Clone)]
pub struct LoadReport {
    pub total_rows: usize,
    pub loaded_rows: usize,
    pub parse_errors: usize,
}

/// Schema of the case-report table.
pub fn case_schema() -> Schema {
    Schema::new(&[
        ("Country", ColumnType::Text),
        ("Continent", ColumnType::Text),
        ("State", ColumnType::Text),
        ("Confirmed", ColumnType::Number),
        ("Deaths", ColumnType::Number),
        ("Recovered", ColumnType::Number),
    ])
}

/// Schema of the daily-weather table.
pub fn weather_schema() -> Schema {
    Schema::new(&[
        ("date", ColumnType::Date),
        ("month", ColumnType::Text),
        ("day", ColumnType::Text),
        ("actual_min_temp", ColumnType::Number),
        ("actual_max_temp", ColumnType::Number),
        ("actual_mean_temp", ColumnType::Number),
        ("average_min_temp", ColumnType::Number),
        ("average_max_temp", ColumnType::Number),
        ("record_max_temp", ColumnType::Number),
    ])
}

/// Load a CSV file into a typed, read-only `Dataset`.
///
/// Text fields are trimmed at load so downstream grouping never fragments
/// on stray padding. Columns present in the file but absent from the
/// schema are ignored.
pub fn load_dataset(
    path: &Path,
    name: &str,
    schema: Schema,
) -> Result<(Dataset, LoadReport), DashboardError> {
    let mut rdr = ReaderBuilder::new().flexible(true).from_path(path)?;
    let headers = rdr.headers()?.clone();

    // Map every schema column to its position in the file, failing fast on
    // the first one the header does not carry.
    let mut positions: Vec<usize> = Vec::with_capacity(schema.len());
    for (column, _) in schema.columns() {
        match headers.iter().position(|h| h.trim() == column.as_str()) {
            Some(i) => positions.push(i),
            None => {
                return Err(SchemaError::MissingColumn {
                    dataset: name.to_string(),
                    column: column.clone(),
                }
                .into())
            }
        }
    }

    let mut total_rows = 0usize;
    let mut parse_errors = 0usize;
    let mut dataset = Dataset::new(name, schema);

    for result in rdr.records() {
        total_rows += 1;
        let record = match result {
            Ok(r) => r,
            Err(e) => {
                warn!("{}: row {} unreadable: {}", name, total_rows, e);
                parse_errors += 1;
                continue;
            }
        };

        let mut row = Vec::with_capacity(dataset.schema.len());
        let mut ok = true;
        for ((_, ty), &pos) in dataset.schema.columns().iter().zip(&positions) {
            let cell = record.get(pos).unwrap_or("");
            let value = match ty {
                ColumnType::Text => Some(Value::Text(cell.trim().to_string())),
                ColumnType::Number => parse_f64_safe(cell).map(Value::Number),
                ColumnType::Date => parse_date_safe(cell).map(Value::Date),
            };
            match value {
                Some(v) => row.push(v),
                None => {
                    ok = false;
                    break;
                }
            }
        }
        if ok {
            dataset.rows.push(row);
        } else {
            parse_errors += 1;
        }
    }

    let loaded_rows = dataset.len();
    debug!(
        "{}: {} of {} rows loaded, {} parse errors",
        name, loaded_rows, total_rows, parse_errors
    );
    let report = LoadReport {
        total_rows,
        loaded_rows,
        parse_errors,
    };
    Ok((dataset, report))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::DashboardError;
    use std::io::Write;

    fn write_csv(contents: &str) -> tempfile::TempDir {
        let dir = tempfile::tempdir().unwrap();
        let mut f = std::fs::File::create(dir.path().join("data.csv")).unwrap();
        f.write_all(contents.as_bytes()).unwrap();
        dir
    }

    #[test]
    fn loads_and_trims_rows() {
        let dir = write_csv(
            "Country,Continent,State,Confirmed,Deaths,Recovered\n\
             \"US \",\" North America\",NY,100,10,40\n\
             US,North America,CA,\"1,230\",5,600\n",
        );
        let (ds, report) =
            load_dataset(&dir.path().join("data.csv"), "cases", case_schema()).unwrap();
        assert_eq!(report.total_rows, 2);
        assert_eq!(report.loaded_rows, 2);
        assert_eq!(report.parse_errors, 0);
        // Padding stripped, thousands separators handled.
        assert_eq!(ds.rows[0][0], Value::Text("US".into()));
        assert_eq!(ds.rows[0][1], Value::Text("North America".into()));
        assert_eq!(ds.rows[1][3], Value::Number(1230.0));
    }

    #[test]
    fn bad_rows_are_counted_not_fatal() {
        let dir = write_csv(
            "Country,Continent,State,Confirmed,Deaths,Recovered\n\
             US,North America,NY,100,10,40\n\
             US,North America,CA,not-a-number,5,600\n",
        );
        let (ds, report) =
            load_dataset(&dir.path().join("data.csv"), "cases", case_schema()).unwrap();
        assert_eq!(report.total_rows, 2);
        assert_eq!(report.loaded_rows, 1);
        assert_eq!(report.parse_errors, 1);
        assert_eq!(ds.len(), 1);
    }

    #[test]
    fn missing_header_column_is_a_schema_error() {
        let dir = write_csv("Country,State,Confirmed\nUS,NY,100\n");
        let err = load_dataset(&dir.path().join("data.csv"), "cases", case_schema()).unwrap_err();
        match err {
            DashboardError::Schema(SchemaError::MissingColumn { dataset, column }) => {
                assert_eq!(dataset, "cases");
                assert_eq!(column, "Continent");
            }
            other => panic!("expected SchemaError, got {other:?}"),
        }
    }

    #[test]
    fn extra_columns_are_ignored() {
        let dir = write_csv(
            "Country,Continent,State,Confirmed,Deaths,Recovered,Notes\n\
             US,North America,NY,100,10,40,keep calm\n",
        );
        let (ds, _) =
            load_dataset(&dir.path().join("data.csv"), "cases", case_schema()).unwrap();
        assert_eq!(ds.schema.len(), 6);
        assert_eq!(ds.len(), 1);
    }
}
