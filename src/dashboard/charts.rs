//! Chart-ready shapes built from filtered and aggregated data.
//!
//! Nothing here computes new statistics; results are only reshaped into what
//! a plotting surface consumes.

use std::collections::BTreeMap;

use crate::data::aggregate::{summarize_values, AggregateResult, ColumnSummary};
use crate::data::filter::TableView;
use crate::data::model::Field;

// ---------------------------------------------------------------------------
// Bar / pie
// ---------------------------------------------------------------------------

/// Category labels with one value each.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct CategorySeries {
    pub category_label: String,
    pub value_label: String,
    pub labels: Vec<String>,
    pub values: Vec<f64>,
    /// Categories present in the data but without any value.
    pub no_data: Vec<String>,
}

impl CategorySeries {
    pub fn from_aggregate(result: &AggregateResult, value_label: String) -> Self {
        let mut series = CategorySeries {
            category_label: result.group_key.label(),
            value_label,
            ..Default::default()
        };
        for (label, value) in &result.groups {
            match value {
                Some(v) => {
                    series.labels.push(label.clone());
                    series.values.push(*v);
                }
                None => series.no_data.push(label.clone()),
            }
        }
        series
    }

    pub fn from_counts(field: &Field, counts: &[(String, usize)]) -> Self {
        CategorySeries {
            category_label: field.label(),
            value_label: "Number of Towns".into(),
            labels: counts.iter().map(|(l, _)| l.clone()).collect(),
            values: counts.iter().map(|(_, c)| *c as f64).collect(),
            no_data: Vec::new(),
        }
    }

    /// Each value as a fraction of the total, for pie slices.
    pub fn shares(&self) -> Vec<f64> {
        let total: f64 = self.values.iter().sum();
        if total <= 0.0 {
            return vec![0.0; self.values.len()];
        }
        self.values.iter().map(|v| v / total).collect()
    }
}

// ---------------------------------------------------------------------------
// Scatter
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, PartialEq)]
pub struct ScatterPoint {
    pub x: f64,
    pub y: f64,
    pub label: String,
    pub group: Option<String>,
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct ScatterSeries {
    pub x_label: String,
    pub y_label: String,
    pub points: Vec<ScatterPoint>,
}

impl ScatterSeries {
    /// Points split by colour group; ungrouped points go under `""`.
    pub fn by_group(&self) -> BTreeMap<String, Vec<[f64; 2]>> {
        let mut groups: BTreeMap<String, Vec<[f64; 2]>> = BTreeMap::new();
        for p in &self.points {
            groups
                .entry(p.group.clone().unwrap_or_default())
                .or_default()
                .push([p.x, p.y]);
        }
        groups
    }
}

/// Rows with both `x` and `y` present, labelled by town.
pub fn scatter(view: &TableView<'_>, x: &Field, y: &Field, color: Option<&Field>) -> ScatterSeries {
    let points = view
        .listings()
        .filter_map(|(i, listing)| {
            Some(ScatterPoint {
                x: view.number(i, x)?,
                y: view.number(i, y)?,
                label: listing.town.clone(),
                group: color.and_then(|f| listing.text(f)).map(|s| s.into_owned()),
            })
        })
        .collect();
    ScatterSeries {
        x_label: x.label(),
        y_label: y.label(),
        points,
    }
}

// ---------------------------------------------------------------------------
// Histogram
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct HistogramBin {
    pub start: f64,
    pub end: f64,
    pub count: usize,
}

/// A numeric series and the number of bins to draw it with.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct HistogramSeries {
    pub label: String,
    pub values: Vec<f64>,
    pub bins: usize,
}

impl HistogramSeries {
    /// Equal-width bins over `[min, max]`; the last bin includes `max`.
    pub fn bin_counts(&self) -> Vec<HistogramBin> {
        let (Some(min), Some(max)) = (
            self.values.iter().copied().reduce(f64::min),
            self.values.iter().copied().reduce(f64::max),
        ) else {
            return Vec::new();
        };
        let bins = self.bins.max(1);
        if max == min {
            return vec![HistogramBin {
                start: min,
                end: max,
                count: self.values.len(),
            }];
        }
        let width = (max - min) / bins as f64;
        let mut counts = vec![0usize; bins];
        for v in &self.values {
            let idx = (((v - min) / width) as usize).min(bins - 1);
            counts[idx] += 1;
        }
        counts
            .into_iter()
            .enumerate()
            .map(|(i, count)| HistogramBin {
                start: min + width * i as f64,
                end: min + width * (i + 1) as f64,
                count,
            })
            .collect()
    }
}

pub fn histogram(view: &TableView<'_>, field: &Field, bins: usize) -> HistogramSeries {
    HistogramSeries {
        label: field.label(),
        values: view.column(field),
        bins,
    }
}

// ---------------------------------------------------------------------------
// Long format (box / violin)
// ---------------------------------------------------------------------------

/// Wide per-column values un-pivoted into `(category, value)` records.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct LongSeries {
    /// Category names in column order.
    pub categories: Vec<String>,
    pub records: Vec<(String, f64)>,
}

impl LongSeries {
    /// Values per category, in category order. Empty categories are kept.
    pub fn grouped(&self) -> Vec<(String, Vec<f64>)> {
        self.categories
            .iter()
            .map(|c| {
                let values = self
                    .records
                    .iter()
                    .filter(|(cat, _)| cat == c)
                    .map(|(_, v)| *v)
                    .collect();
                (c.clone(), values)
            })
            .collect()
    }

    /// Box-plot statistics per category that has values.
    pub fn summaries(&self) -> Vec<(String, ColumnSummary)> {
        self.grouped()
            .into_iter()
            .filter_map(|(c, values)| Some((c, summarize_values(&values)?)))
            .collect()
    }
}

/// Un-pivot `columns` of `view`, one record per present value.
pub fn melt(view: &TableView<'_>, columns: &[Field]) -> LongSeries {
    let categories: Vec<String> = columns.iter().map(Field::label).collect();
    let mut records = Vec::new();
    for &row in view.rows() {
        for (field, category) in columns.iter().zip(&categories) {
            if let Some(v) = view.number(row, field) {
                records.push((category.clone(), v));
            }
        }
    }
    LongSeries {
        categories,
        records,
    }
}

// ---------------------------------------------------------------------------
// Map
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, PartialEq)]
pub struct MapPoint {
    pub lat: f64,
    pub lon: f64,
    pub label: String,
    pub value: Option<f64>,
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct MapSeries {
    pub value_label: String,
    pub points: Vec<MapPoint>,
}

impl MapSeries {
    /// Smallest and largest present value, for the colour scale.
    pub fn value_range(&self) -> Option<(f64, f64)> {
        let values = self.points.iter().filter_map(|p| p.value);
        let min = values.clone().reduce(f64::min)?;
        let max = values.reduce(f64::max)?;
        Some((min, max))
    }
}

/// Towns with coordinates, each carrying its `value` (possibly missing).
pub fn map_points(view: &TableView<'_>, value: &Field) -> MapSeries {
    let points = view
        .listings()
        .filter_map(|(i, listing)| {
            Some(MapPoint {
                lat: view.number(i, &Field::Latitude)?,
                lon: view.number(i, &Field::Longitude)?,
                label: listing.town.clone(),
                value: view.number(i, value),
            })
        })
        .collect();
    MapSeries {
        value_label: value.label(),
        points,
    }
}
