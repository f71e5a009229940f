use std::cmp::Ordering;
use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use super::filter::TableView;
use super::model::Field;

/// Reduction applied to the values of each group.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AggOp {
    #[default]
    Mean,
    Median,
    /// Number of present values, or of rows when no value column is given.
    Count,
}

impl std::fmt::Display for AggOp {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            AggOp::Mean => write!(f, "Average"),
            AggOp::Median => write!(f, "Median"),
            AggOp::Count => write!(f, "Count"),
        }
    }
}

/// Grouped values keyed by category label. `None` means "no data".
#[derive(Debug, Clone, PartialEq)]
pub struct AggregateResult {
    pub group_key: Field,
    pub op: AggOp,
    pub groups: BTreeMap<String, Option<f64>>,
}

impl AggregateResult {
    pub fn get(&self, group: &str) -> Option<f64> {
        self.groups.get(group).copied().flatten()
    }
}

/// Descriptive statistics of one numeric column.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ColumnSummary {
    pub count: usize,
    pub mean: f64,
    pub median: f64,
    pub min: f64,
    pub max: f64,
    pub q1: f64,
    pub q3: f64,
}

// ---------------------------------------------------------------------------
// Scalar reductions
// ---------------------------------------------------------------------------

pub fn mean(values: &[f64]) -> Option<f64> {
    if values.is_empty() {
        return None;
    }
    Some(values.iter().sum::<f64>() / values.len() as f64)
}

pub fn median(values: &[f64]) -> Option<f64> {
    let sorted = sorted(values);
    quantile_sorted(&sorted, 0.5)
}

fn sorted(values: &[f64]) -> Vec<f64> {
    let mut v = values.to_vec();
    v.sort_by(|a, b| a.partial_cmp(b).unwrap_or(Ordering::Equal));
    v
}

/// Linearly interpolated quantile of already sorted values.
fn quantile_sorted(sorted: &[f64], q: f64) -> Option<f64> {
    if sorted.is_empty() {
        return None;
    }
    let pos = q * (sorted.len() - 1) as f64;
    let lo = pos.floor() as usize;
    let hi = pos.ceil() as usize;
    Some(sorted[lo] + (sorted[hi] - sorted[lo]) * (pos - lo as f64))
}

fn reduce(values: &[f64], op: AggOp) -> Option<f64> {
    match op {
        AggOp::Mean => mean(values),
        AggOp::Median => median(values),
        AggOp::Count => (!values.is_empty()).then_some(values.len() as f64),
    }
}

// ---------------------------------------------------------------------------
// Grouped aggregation
// ---------------------------------------------------------------------------

/// Group `view` by `group_key` and reduce `value_columns` with `op`.
///
/// Missing values are skipped. With several value columns, each column is
/// reduced on its own and the group's value is the mean of the column results
/// that have data. A group with no present values maps to `None`. Rows
/// without a group label are left out.
///
/// `Count` counts present values per column like any other reduction. With no
/// value columns it counts the rows of each group instead.
pub fn aggregate(
    view: &TableView<'_>,
    group_key: &Field,
    value_columns: &[Field],
    op: AggOp,
) -> AggregateResult {
    let mut rows_by_group: BTreeMap<String, Vec<usize>> = BTreeMap::new();
    for (i, listing) in view.listings() {
        if let Some(label) = listing.text(group_key) {
            rows_by_group.entry(label.into_owned()).or_default().push(i);
        }
    }

    let groups = rows_by_group
        .into_iter()
        .map(|(label, rows)| {
            let value = if op == AggOp::Count && value_columns.is_empty() {
                Some(rows.len() as f64)
            } else {
                let per_column: Vec<f64> = value_columns
                    .iter()
                    .filter_map(|field| {
                        let values: Vec<f64> =
                            rows.iter().filter_map(|&i| view.number(i, field)).collect();
                        reduce(&values, op)
                    })
                    .collect();
                mean(&per_column)
            };
            (label, value)
        })
        .collect();

    AggregateResult {
        group_key: group_key.clone(),
        op,
        groups,
    }
}

/// Unweighted mean of the per-column means of `columns`.
///
/// Columns with no present values do not take part. This is a mean of means,
/// not a mean over all underlying cells.
pub fn overall_average(view: &TableView<'_>, columns: &[Field]) -> Option<f64> {
    let means: Vec<f64> = columns
        .iter()
        .filter_map(|field| mean(&view.column(field)))
        .collect();
    mean(&means)
}

/// Row counts per label of `field`, most frequent first, ties by label.
pub fn value_counts(view: &TableView<'_>, field: &Field) -> Vec<(String, usize)> {
    let mut counts: BTreeMap<String, usize> = BTreeMap::new();
    for (_, listing) in view.listings() {
        if let Some(label) = listing.text(field) {
            *counts.entry(label.into_owned()).or_default() += 1;
        }
    }
    let mut counts: Vec<(String, usize)> = counts.into_iter().collect();
    counts.sort_by(|a, b| b.1.cmp(&a.1).then_with(|| a.0.cmp(&b.0)));
    counts
}

/// Descriptive statistics of `field` over the present values of `view`.
pub fn summarize(view: &TableView<'_>, field: &Field) -> Option<ColumnSummary> {
    summarize_values(&view.column(field))
}

/// Descriptive statistics of a slice; `None` when it is empty.
pub fn summarize_values(values: &[f64]) -> Option<ColumnSummary> {
    let values = sorted(values);
    Some(ColumnSummary {
        count: values.len(),
        mean: mean(&values)?,
        median: quantile_sorted(&values, 0.5)?,
        min: *values.first()?,
        max: *values.last()?,
        q1: quantile_sorted(&values, 0.25)?,
        q3: quantile_sorted(&values, 0.75)?,
    })
}
