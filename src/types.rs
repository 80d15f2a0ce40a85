// Core data model: typed cell values, dataset schemas, and the chart-ready
// payloads handed to whatever renders them.
//
// A `Dataset` is loaded once, validated against an explicit `Schema`, and is
// read-only afterwards. Everything downstream (`Series`, `ChartSpec`) is a
// fresh value owned by the call that produced it.
use crate::error::SchemaError;
use chrono::NaiveDate;
use serde::Serialize;
use std::cmp::Ordering;

/// Semantic type of a column, fixed by the dataset schema at load time.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ColumnType {
    Text,
    Number,
    Date,
}

/// One cell of a `Record`. The variant always matches the schema's
/// `ColumnType` for that column; the loader guarantees this.
#[derive(Debug, Clone, PartialEq)]
pub enum Value {
    Text(String),
    Number(f64),
    Date(NaiveDate),
}

impl Value {
    pub fn as_number(&self) -> Option<f64> {
        match self {
            Value::Number(v) => Some(*v),
            _ => None,
        }
    }

    /// Render this value as a category label.
    ///
    /// Whole numbers drop their fractional part so group keys like year
    /// columns read as `2015`, not `2015.0`.
    pub fn label(&self) -> String {
        match self {
            Value::Text(s) => s.clone(),
            Value::Number(v) => {
                if v.fract() == 0.0 && v.abs() < 1e15 {
                    format!("{}", *v as i64)
                } else {
                    format!("{}", v)
                }
            }
            Value::Date(d) => d.format("%Y-%m-%d").to_string(),
        }
    }

    /// Total order within one column. Values of different variants never
    /// meet in practice (a column has one type); they compare equal so a
    /// stable sort leaves them where they were.
    pub fn compare(&self, other: &Value) -> Ordering {
        match (self, other) {
            (Value::Number(a), Value::Number(b)) => a.partial_cmp(b).unwrap_or(Ordering::Equal),
            (Value::Text(a), Value::Text(b)) => a.cmp(b),
            (Value::Date(a), Value::Date(b)) => a.cmp(b),
            _ => Ordering::Equal,
        }
    }
}

/// Ordered column list of a dataset: name plus semantic type.
#[derive(Debug, Clone)]
pub struct Schema {
    columns: Vec<(String, ColumnType)>,
}

impl Schema {
    pub fn new(columns: &[(&str, ColumnType)]) -> Self {
        Schema {
            columns: columns
                .iter()
                .map(|(name, ty)| (name.to_string(), *ty))
                .collect(),
        }
    }

    pub fn empty() -> Self {
        Schema { columns: Vec::new() }
    }

    pub fn push(&mut self, name: String, ty: ColumnType) {
        self.columns.push((name, ty));
    }

    pub fn len(&self) -> usize {
        self.columns.len()
    }

    pub fn is_empty(&self) -> bool {
        self.columns.is_empty()
    }

    pub fn index_of(&self, name: &str) -> Option<usize> {
        self.columns.iter().position(|(n, _)| n == name)
    }

    pub fn columns(&self) -> &[(String, ColumnType)] {
        &self.columns
    }
}

/// One row of a dataset, index-aligned with its schema.
pub type Record = Vec<Value>;

/// A named in-memory table. Immutable after load; pipeline stages take it
/// by reference and return fresh tables.
#[derive(Debug, Clone)]
pub struct Dataset {
    pub name: String,
    pub schema: Schema,
    pub rows: Vec<Record>,
}

impl Dataset {
    pub fn new(name: &str, schema: Schema) -> Self {
        Dataset {
            name: name.to_string(),
            schema,
            rows: Vec::new(),
        }
    }

    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    /// Resolve a column name to its index, or fail with the dataset name
    /// attached so the message says which table was missing it.
    pub fn column_index(&self, column: &str) -> Result<usize, SchemaError> {
        self.schema
            .index_of(column)
            .ok_or_else(|| SchemaError::MissingColumn {
                dataset: self.name.clone(),
                column: column.to_string(),
            })
    }

    /// Like `column_index`, but the column must be numeric.
    pub fn numeric_index(&self, column: &str) -> Result<usize, SchemaError> {
        let idx = self.column_index(column)?;
        match self.schema.columns()[idx].1 {
            ColumnType::Number => Ok(idx),
            _ => Err(SchemaError::NotNumeric {
                dataset: self.name.clone(),
                column: column.to_string(),
            }),
        }
    }
}

/// One plotted quantity of a `Series`, index-aligned with the categories.
#[derive(Debug, Clone, Serialize)]
pub struct ValueColumn {
    pub name: String,
    pub data: Vec<f64>,
}

/// Chart-ready output of the pipeline: ordered category labels plus one or
/// more parallel numeric columns of the same length.
#[derive(Debug, Clone, Serialize)]
pub struct Series {
    pub name: String,
    pub categories: Vec<String>,
    pub columns: Vec<ValueColumn>,
}

impl Series {
    pub fn len(&self) -> usize {
        self.categories.len()
    }

    pub fn is_empty(&self) -> bool {
        self.categories.is_empty()
    }

    pub fn column(&self, name: &str) -> Option<&ValueColumn> {
        self.columns.iter().find(|c| c.name == name)
    }
}

/// Dense two-axis grid for the heatmap. `cells[y][x]` pairs with
/// `y_labels[y]` and `x_labels[x]`; combinations never observed in the
/// input stay `None` and serialize as `null`.
#[derive(Debug, Clone, Serialize)]
pub struct HeatmapGrid {
    pub x_labels: Vec<String>,
    pub y_labels: Vec<String>,
    pub cells: Vec<Vec<Option<f64>>>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "kebab-case")]
pub enum ChartKind {
    Bar,
    StackedBar,
    Line,
    MultiLine,
    Bubble,
    Heatmap,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ChartData {
    Series(Series),
    Grid(HeatmapGrid),
}

/// Everything the rendering side needs for one chart: the kind, the
/// human-readable strings, and the data payload. Layout and styling are
/// the renderer's business.
#[derive(Debug, Clone, Serialize)]
pub struct ChartSpec {
    pub kind: ChartKind,
    pub title: String,
    pub x_label: String,
    pub y_label: String,
    pub data: ChartData,
}

impl ChartSpec {
    pub fn series(&self) -> Option<&Series> {
        match &self.data {
            ChartData::Series(s) => Some(s),
            ChartData::Grid(_) => None,
        }
    }
}

/// The fixed set of regions the interactive chart can be filtered by.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Continent {
    Asia,
    Africa,
    Europe,
    NorthAmerica,
    Oceania,
    SouthAmerica,
}

impl Continent {
    pub const ALL: [Continent; 6] = [
        Continent::Asia,
        Continent::Africa,
        Continent::Europe,
        Continent::NorthAmerica,
        Continent::Oceania,
        Continent::SouthAmerica,
    ];

    /// The spelling used in the case table's `Continent` column.
    pub fn as_str(&self) -> &'static str {
        match self {
            Continent::Asia => "Asia",
            Continent::Africa => "Africa",
            Continent::Europe => "Europe",
            Continent::NorthAmerica => "North America",
            Continent::Oceania => "Oceania",
            Continent::SouthAmerica => "South America",
        }
    }

    /// Parse menu input: either the continent name (case-insensitive) or
    /// its 1-based position in `ALL`.
    pub fn from_input(input: &str) -> Option<Continent> {
        let trimmed = input.trim();
        if let Ok(n) = trimmed.parse::<usize>() {
            return Continent::ALL.get(n.checked_sub(1)?).copied();
        }
        let lowered = trimmed.to_lowercase();
        Continent::ALL
            .iter()
            .find(|c| c.as_str().to_lowercase() == lowered)
            .copied()
    }
}
