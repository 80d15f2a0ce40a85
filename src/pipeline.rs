// The aggregation pipeline.
//
// Every chart is described as a short sequence of declarative steps over a
// read-only `Dataset`: filter, normalize, derive, group-and-aggregate,
// sort, truncate. Each step is a pure function returning a fresh table, so
// pipelines can run concurrently over the same dataset without locking.
// Group emission order is unspecified; charts that care about order append
// an explicit `Sort` step.
use crate::error::SchemaError;
use crate::types::{ColumnType, Dataset, HeatmapGrid, Schema, Series, Value, ValueColumn};
use crate::util::mean;
use log::debug;
use std::collections::HashMap;

/// Comparison used by `Step::Filter`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Cmp {
    Eq,
    NotEq,
}

/// Arithmetic over existing numeric columns, used by `Step::Derive`.
/// Division follows IEEE semantics; a zero divisor yields an infinite
/// value rather than an error.
#[derive(Debug, Clone)]
pub enum Expr {
    Column(String),
    Constant(f64),
    Add(Box<Expr>, Box<Expr>),
    Sub(Box<Expr>, Box<Expr>),
    Mul(Box<Expr>, Box<Expr>),
    Div(Box<Expr>, Box<Expr>),
}

impl Expr {
    pub fn col(name: &str) -> Expr {
        Expr::Column(name.to_string())
    }

    pub fn constant(v: f64) -> Expr {
        Expr::Constant(v)
    }

    pub fn add(self, rhs: Expr) -> Expr {
        Expr::Add(Box::new(self), Box::new(rhs))
    }

    pub fn sub(self, rhs: Expr) -> Expr {
        Expr::Sub(Box::new(self), Box::new(rhs))
    }

    pub fn mul(self, rhs: Expr) -> Expr {
        Expr::Mul(Box::new(self), Box::new(rhs))
    }

    pub fn div(self, rhs: Expr) -> Expr {
        Expr::Div(Box::new(self), Box::new(rhs))
    }
}

/// Index-resolved form of `Expr`, checked once per pipeline run instead of
/// once per row.
enum CompiledExpr {
    Column(usize),
    Constant(f64),
    Add(Box<CompiledExpr>, Box<CompiledExpr>),
    Sub(Box<CompiledExpr>, Box<CompiledExpr>),
    Mul(Box<CompiledExpr>, Box<CompiledExpr>),
    Div(Box<CompiledExpr>, Box<CompiledExpr>),
}

fn compile(expr: &Expr, table: &Dataset) -> Result<CompiledExpr, SchemaError> {
    Ok(match expr {
        Expr::Column(name) => CompiledExpr::Column(table.numeric_index(name)?),
        Expr::Constant(v) => CompiledExpr::Constant(*v),
        Expr::Add(a, b) => CompiledExpr::Add(
            Box::new(compile(a, table)?),
            Box::new(compile(b, table)?),
        ),
        Expr::Sub(a, b) => CompiledExpr::Sub(
            Box::new(compile(a, table)?),
            Box::new(compile(b, table)?),
        ),
        Expr::Mul(a, b) => CompiledExpr::Mul(
            Box::new(compile(a, table)?),
            Box::new(compile(b, table)?),
        ),
        Expr::Div(a, b) => CompiledExpr::Div(
            Box::new(compile(a, table)?),
            Box::new(compile(b, table)?),
        ),
    })
}

fn eval(expr: &CompiledExpr, row: &[Value]) -> f64 {
    match expr {
        CompiledExpr::Column(i) => row[*i].as_number().unwrap_or(f64::NAN),
        CompiledExpr::Constant(v) => *v,
        CompiledExpr::Add(a, b) => eval(a, row) + eval(b, row),
        CompiledExpr::Sub(a, b) => eval(a, row) - eval(b, row),
        CompiledExpr::Mul(a, b) => eval(a, row) * eval(b, row),
        CompiledExpr::Div(a, b) => eval(a, row) / eval(b, row),
    }
}

/// Named reduction applied within a group.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AggFunc {
    Sum,
    Mean,
    Min,
    Max,
}

/// One aggregate output of a `GroupBy` step. Without an alias the result
/// column keeps the source column's name, the way dataframe group-bys
/// usually read.
#[derive(Debug, Clone)]
pub struct Aggregate {
    pub column: String,
    pub func: AggFunc,
    pub alias: Option<String>,
}

impl Aggregate {
    pub fn new(column: &str, func: AggFunc) -> Aggregate {
        Aggregate {
            column: column.to_string(),
            func,
            alias: None,
        }
    }

    pub fn named(column: &str, func: AggFunc, alias: &str) -> Aggregate {
        Aggregate {
            column: column.to_string(),
            func,
            alias: Some(alias.to_string()),
        }
    }

    fn output_name(&self) -> &str {
        self.alias.as_deref().unwrap_or(&self.column)
    }
}

/// One declarative transform step.
#[derive(Debug, Clone)]
pub enum Step {
    Filter {
        column: String,
        cmp: Cmp,
        value: Value,
    },
    Normalize,
    Derive {
        name: String,
        expr: Expr,
    },
    GroupBy {
        keys: Vec<String>,
        aggs: Vec<Aggregate>,
    },
    Sort {
        by: String,
        descending: bool,
    },
    Truncate(usize),
}

impl Step {
    pub fn filter_eq(column: &str, value: &str) -> Step {
        Step::Filter {
            column: column.to_string(),
            cmp: Cmp::Eq,
            value: Value::Text(value.to_string()),
        }
    }

    pub fn filter_ne(column: &str, value: &str) -> Step {
        Step::Filter {
            column: column.to_string(),
            cmp: Cmp::NotEq,
            value: Value::Text(value.to_string()),
        }
    }

    pub fn derive(name: &str, expr: Expr) -> Step {
        Step::Derive {
            name: name.to_string(),
            expr,
        }
    }

    pub fn group_by(keys: &[&str], aggs: Vec<Aggregate>) -> Step {
        Step::GroupBy {
            keys: keys.iter().map(|k| k.to_string()).collect(),
            aggs,
        }
    }

    pub fn sort_asc(by: &str) -> Step {
        Step::Sort {
            by: by.to_string(),
            descending: false,
        }
    }

    pub fn sort_desc(by: &str) -> Step {
        Step::Sort {
            by: by.to_string(),
            descending: true,
        }
    }
}

/// Run a step sequence against a dataset, returning the final table.
///
/// An empty intermediate result is not an error; it flows through the
/// remaining steps and assembles into an empty series.
pub fn run(input: &Dataset, steps: &[Step]) -> Result<Dataset, SchemaError> {
    let mut table = input.clone();
    for step in steps {
        table = apply(&table, step)?;
    }
    debug!(
        "pipeline over '{}': {} steps, {} rows out",
        input.name,
        steps.len(),
        table.len()
    );
    Ok(table)
}

fn apply(table: &Dataset, step: &Step) -> Result<Dataset, SchemaError> {
    match step {
        Step::Filter { column, cmp, value } => filter(table, column, *cmp, value),
        Step::Normalize => Ok(normalize(table)),
        Step::Derive { name, expr } => derive(table, name, expr),
        Step::GroupBy { keys, aggs } => group_by(table, keys, aggs),
        Step::Sort { by, descending } => sort(table, by, *descending),
        Step::Truncate(n) => Ok(truncate(table, *n)),
    }
}

fn filter(table: &Dataset, column: &str, cmp: Cmp, value: &Value) -> Result<Dataset, SchemaError> {
    let idx = table.column_index(column)?;
    let rows = table
        .rows
        .iter()
        .filter(|row| {
            let matches = row[idx] == *value;
            match cmp {
                Cmp::Eq => matches,
                Cmp::NotEq => !matches,
            }
        })
        .cloned()
        .collect();
    Ok(Dataset {
        name: table.name.clone(),
        schema: table.schema.clone(),
        rows,
    })
}

/// Trim every text field. Must run before filtering or grouping on text
/// columns so stray padding cannot fragment groups.
fn normalize(table: &Dataset) -> Dataset {
    let rows = table
        .rows
        .iter()
        .map(|row| {
            row.iter()
                .map(|v| match v {
                    Value::Text(s) => Value::Text(s.trim().to_string()),
                    other => other.clone(),
                })
                .collect()
        })
        .collect();
    Dataset {
        name: table.name.clone(),
        schema: table.schema.clone(),
        rows,
    }
}

fn derive(table: &Dataset, name: &str, expr: &Expr) -> Result<Dataset, SchemaError> {
    let compiled = compile(expr, table)?;
    let mut schema = table.schema.clone();
    schema.push(name.to_string(), ColumnType::Number);
    let rows = table
        .rows
        .iter()
        .map(|row| {
            let mut out = row.clone();
            out.push(Value::Number(eval(&compiled, row)));
            out
        })
        .collect();
    Ok(Dataset {
        name: table.name.clone(),
        schema,
        rows,
    })
}

struct GroupAcc {
    key: Vec<Value>,
    samples: Vec<Vec<f64>>,
}

fn group_by(table: &Dataset, keys: &[String], aggs: &[Aggregate]) -> Result<Dataset, SchemaError> {
    let key_indices: Vec<usize> = keys
        .iter()
        .map(|k| table.column_index(k))
        .collect::<Result<_, _>>()?;
    let agg_indices: Vec<usize> = aggs
        .iter()
        .map(|a| table.numeric_index(&a.column))
        .collect::<Result<_, _>>()?;

    let mut groups: HashMap<Vec<String>, GroupAcc> = HashMap::new();
    for row in &table.rows {
        let label_key: Vec<String> = key_indices.iter().map(|&i| row[i].label()).collect();
        let acc = groups.entry(label_key).or_insert_with(|| GroupAcc {
            key: key_indices.iter().map(|&i| row[i].clone()).collect(),
            samples: vec![Vec::new(); aggs.len()],
        });
        for (samples, &i) in acc.samples.iter_mut().zip(&agg_indices) {
            if let Some(v) = row[i].as_number() {
                samples.push(v);
            }
        }
    }

    let mut schema = Schema::empty();
    for (key, &idx) in keys.iter().zip(&key_indices) {
        schema.push(key.clone(), table.schema.columns()[idx].1);
    }
    for agg in aggs {
        schema.push(agg.output_name().to_string(), ColumnType::Number);
    }

    let rows = groups
        .into_values()
        .map(|acc| {
            let mut row = acc.key;
            for (samples, agg) in acc.samples.iter().zip(aggs) {
                row.push(Value::Number(reduce(agg.func, samples)));
            }
            row
        })
        .collect();

    Ok(Dataset {
        name: table.name.clone(),
        schema,
        rows,
    })
}

fn reduce(func: AggFunc, samples: &[f64]) -> f64 {
    if samples.is_empty() {
        return 0.0;
    }
    match func {
        AggFunc::Sum => samples.iter().sum(),
        AggFunc::Mean => mean(samples),
        AggFunc::Min => samples.iter().copied().fold(f64::INFINITY, f64::min),
        AggFunc::Max => samples.iter().copied().fold(f64::NEG_INFINITY, f64::max),
    }
}

fn sort(table: &Dataset, by: &str, descending: bool) -> Result<Dataset, SchemaError> {
    let idx = table.column_index(by)?;
    let mut rows = table.rows.clone();
    // `sort_by` is stable, so ties keep their prior relative order and
    // reruns reproduce the same table.
    rows.sort_by(|a, b| {
        let ord = a[idx].compare(&b[idx]);
        if descending {
            ord.reverse()
        } else {
            ord
        }
    });
    Ok(Dataset {
        name: table.name.clone(),
        schema: table.schema.clone(),
        rows,
    })
}

fn truncate(table: &Dataset, n: usize) -> Dataset {
    Dataset {
        name: table.name.clone(),
        schema: table.schema.clone(),
        rows: table.rows.iter().take(n).cloned().collect(),
    }
}

/// Map a final table into a `Series`: category labels from `label_column`,
/// plus one value column per `(source column, display name)` pair, all in
/// the table's row order.
pub fn assemble(
    table: &Dataset,
    name: &str,
    label_column: &str,
    value_columns: &[(&str, &str)],
) -> Result<Series, SchemaError> {
    let label_idx = table.column_index(label_column)?;
    let mut picked: Vec<(usize, &str)> = Vec::with_capacity(value_columns.len());
    for &(source, display) in value_columns {
        picked.push((table.numeric_index(source)?, display));
    }

    let categories = table.rows.iter().map(|row| row[label_idx].label()).collect();
    let columns = picked
        .into_iter()
        .map(|(idx, display)| ValueColumn {
            name: display.to_string(),
            data: table
                .rows
                .iter()
                .map(|row| row[idx].as_number().unwrap_or(f64::NAN))
                .collect(),
        })
        .collect();

    Ok(Series {
        name: name.to_string(),
        categories,
        columns,
    })
}

/// Build a dense x/y grid of `z_column` straight from raw rows, without
/// grouping. Axis labels appear in first-observation order. If an (x, y)
/// pair repeats, the later row wins; that policy is implementation-defined
/// and nothing should rely on it.
pub fn grid(
    table: &Dataset,
    x_column: &str,
    y_column: &str,
    z_column: &str,
) -> Result<HeatmapGrid, SchemaError> {
    let xi = table.column_index(x_column)?;
    let yi = table.column_index(y_column)?;
    let zi = table.numeric_index(z_column)?;

    let mut x_labels: Vec<String> = Vec::new();
    let mut y_labels: Vec<String> = Vec::new();
    let mut x_pos: HashMap<String, usize> = HashMap::new();
    let mut y_pos: HashMap<String, usize> = HashMap::new();
    for row in &table.rows {
        let x = row[xi].label();
        if !x_pos.contains_key(&x) {
            x_pos.insert(x.clone(), x_labels.len());
            x_labels.push(x);
        }
        let y = row[yi].label();
        if !y_pos.contains_key(&y) {
            y_pos.insert(y.clone(), y_labels.len());
            y_labels.push(y);
        }
    }

    let mut cells = vec![vec![None; x_labels.len()]; y_labels.len()];
    for row in &table.rows {
        let x = x_pos[&row[xi].label()];
        let y = y_pos[&row[yi].label()];
        cells[y][x] = row[zi].as_number();
    }

    Ok(HeatmapGrid {
        x_labels,
        y_labels,
        cells,
    })
}
