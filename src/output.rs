// Output side: JSON chart payloads, CSV exports of a series, and markdown
// table previews for the console.
use crate::error::Result;
use crate::types::{ChartData, ChartSpec, Series};
use crate::util::format_number;
use serde::Serialize;
use std::path::Path;
use tabled::{settings::Style, Table, Tabled};

pub fn write_json<T: Serialize>(path: &Path, value: &T) -> Result<()> {
    let s = serde_json::to_string_pretty(value)?;
    std::fs::write(path, s)?;
    Ok(())
}

/// Export a series as CSV: one row per category, one column per plotted
/// quantity.
pub fn write_series_csv(path: &Path, series: &Series) -> Result<()> {
    let mut wtr = csv::Writer::from_path(path)?;
    let mut header = vec!["Category".to_string()];
    header.extend(series.columns.iter().map(|c| c.name.clone()));
    wtr.write_record(&header)?;
    for (i, category) in series.categories.iter().enumerate() {
        let mut record = vec![category.clone()];
        for column in &series.columns {
            record.push(column.data[i].to_string());
        }
        wtr.write_record(&record)?;
    }
    wtr.flush()?;
    Ok(())
}

#[derive(Tabled)]
struct PreviewRow {
    #[tabled(rename = "Category")]
    category: String,
    #[tabled(rename = "Values")]
    values: String,
}

/// Print the first `max_rows` rows of a chart to the console.
pub fn preview_chart(spec: &ChartSpec, max_rows: usize) {
    println!("{}", spec.title);
    println!("({} / {})\n", spec.x_label, spec.y_label);
    match &spec.data {
        ChartData::Series(series) => preview_series(series, max_rows),
        ChartData::Grid(grid) => {
            println!(
                "{} x {} grid, {} cells\n",
                grid.x_labels.len(),
                grid.y_labels.len(),
                grid.x_labels.len() * grid.y_labels.len()
            );
        }
    }
}

pub fn preview_series(series: &Series, max_rows: usize) {
    if series.is_empty() {
        println!("(no rows)\n");
        return;
    }
    let rows: Vec<PreviewRow> = series
        .categories
        .iter()
        .take(max_rows)
        .enumerate()
        .map(|(i, category)| PreviewRow {
            category: category.clone(),
            values: series
                .columns
                .iter()
                .map(|c| format!("{}: {}", c.name, format_number(c.data[i], 2)))
                .collect::<Vec<_>>()
                .join(", "),
        })
        .collect();
    let table_str = Table::new(rows).with(Style::markdown()).to_string();
    println!("{}\n", table_str);
}
