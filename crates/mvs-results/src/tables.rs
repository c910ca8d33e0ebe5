//! Fixed-column result tables.
//!
//! One row per asset in insertion order. Numeric cells are rounded to
//! `RESULT_DECIMALS`; an absent figure leaves the cell empty.

use indexmap::IndexMap;
use mvs_core::{Quantity, RESULT_DECIMALS, round_to};
use mvs_project::Asset;
use serde::{Deserialize, Serialize};

use crate::{ResultsError, ResultsResult};

pub const LABEL_COLUMN: &str = "label";

pub const COST_COLUMNS: [&str; 9] = [
    LABEL_COLUMN,
    "costs_total",
    "costs_om_total",
    "costs_investment",
    "costs_upfront",
    "costs_dispatch",
    "costs_om_fix",
    "annuity_total",
    "annuity_om",
];

pub const SCALAR_COLUMNS: [&str; 6] = [
    LABEL_COLUMN,
    "optimized_add_cap",
    "total_flow",
    "annual_total_flow",
    "peak_flow",
    "average_flow",
];

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Row {
    pub label: String,
    /// One cell per non-label column.
    pub values: Vec<Option<f64>>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ResultTable {
    pub name: String,
    pub columns: Vec<String>,
    pub rows: Vec<Row>,
}

impl ResultTable {
    pub fn new(name: impl Into<String>, columns: &[&str]) -> Self {
        Self {
            name: name.into(),
            columns: columns.iter().map(|c| c.to_string()).collect(),
            rows: Vec::new(),
        }
    }

    pub fn cost_matrix() -> Self {
        Self::new("cost_matrix", &COST_COLUMNS)
    }

    pub fn scalar_matrix() -> Self {
        Self::new("scalar_matrix", &SCALAR_COLUMNS)
    }

    /// Columns after the label column.
    pub fn value_columns(&self) -> &[String] {
        self.columns.get(1..).unwrap_or(&[])
    }

    /// Append a row built from `asset`. A label already in the table is an
    /// error.
    pub fn append(&mut self, asset: &Asset) -> ResultsResult<()> {
        if self.row(&asset.label).is_some() {
            return Err(ResultsError::DuplicateRow {
                table: self.name.clone(),
                label: asset.label.clone(),
            });
        }
        let values = self
            .value_columns()
            .iter()
            .map(|column| cell_value(asset, column))
            .collect::<ResultsResult<_>>()?;
        self.rows.push(Row {
            label: asset.label.clone(),
            values,
        });
        Ok(())
    }

    pub fn row(&self, label: &str) -> Option<&Row> {
        self.rows.iter().find(|r| r.label == label)
    }

    pub fn cell(&self, label: &str, column: &str) -> Option<f64> {
        let idx = self.value_columns().iter().position(|c| c == column)?;
        self.row(label)?.values.get(idx).copied().flatten()
    }

    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }
}

fn scalar(q: Option<&Quantity>, column: &str) -> ResultsResult<Option<f64>> {
    Ok(q.map(|q| q.as_scalar(column)).transpose()?)
}

/// Value of a table column for one asset, rounded. A time series in a
/// scalar column is an error.
pub fn cell_value(asset: &Asset, column: &str) -> ResultsResult<Option<f64>> {
    let d = &asset.derived;
    let costs = d.costs.as_ref();
    let value = match column {
        "costs_total" => scalar(costs.map(|c| &c.costs_total), column)?,
        "costs_om_total" => scalar(costs.map(|c| &c.costs_om_total), column)?,
        "costs_investment" => scalar(costs.and_then(|c| c.costs_investment.as_ref()), column)?,
        "costs_upfront" => scalar(costs.and_then(|c| c.costs_upfront.as_ref()), column)?,
        "costs_dispatch" => scalar(costs.and_then(|c| c.costs_dispatch.as_ref()), column)?,
        "costs_om_fix" => scalar(costs.and_then(|c| c.costs_om_fix.as_ref()), column)?,
        "annuity_total" => scalar(costs.map(|c| &c.annuity_total), column)?,
        "annuity_om" => scalar(costs.map(|c| &c.annuity_om), column)?,
        "optimized_add_cap" => scalar(d.optimized_add_cap.as_ref(), column)?,
        "total_flow" => scalar(d.total_flow.as_ref(), column)?,
        "annual_total_flow" => scalar(d.annual_total_flow.as_ref(), column)?,
        "peak_flow" => scalar(d.peak_flow.as_ref(), column)?,
        "average_flow" => scalar(d.average_flow.as_ref(), column)?,
        _ => None,
    };
    Ok(value.map(|v| round_to(v, RESULT_DECIMALS)))
}

/// One row per table for `asset`.
pub fn append_to_tables(
    cost_matrix: &mut ResultTable,
    scalar_matrix: &mut ResultTable,
    asset: &Asset,
) -> ResultsResult<()> {
    cost_matrix.append(asset)?;
    scalar_matrix.append(asset)
}

/// Column sums over all rows, empty cells skipped.
pub fn aggregate_totals(table: &ResultTable) -> IndexMap<String, f64> {
    table
        .value_columns()
        .iter()
        .enumerate()
        .map(|(i, column)| {
            let sum = table
                .rows
                .iter()
                .filter_map(|r| r.values.get(i).copied().flatten())
                .sum();
            (column.clone(), sum)
        })
        .collect()
}
