use std::collections::BTreeMap;
use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::data::aggregate::AggOp;
use crate::data::filter::{EmptySelection, PriceFilterMode};
use crate::data::model::{Bedrooms, Field, PriceKind};
use crate::error::ConfigError;

// ---------------------------------------------------------------------------
// Dataset schema: source column → listing field
// ---------------------------------------------------------------------------

/// Candidate header names for one field; the first present one wins.
/// Written in JSON as a string or an array of strings.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(from = "OneOrMany", into = "Vec<String>")]
pub struct ColumnNames(pub Vec<String>);

#[derive(Deserialize)]
#[serde(untagged)]
enum OneOrMany {
    One(String),
    Many(Vec<String>),
}

impl From<OneOrMany> for ColumnNames {
    fn from(v: OneOrMany) -> Self {
        match v {
            OneOrMany::One(s) => ColumnNames(vec![s]),
            OneOrMany::Many(v) => ColumnNames(v),
        }
    }
}

impl From<ColumnNames> for Vec<String> {
    fn from(c: ColumnNames) -> Self {
        c.0
    }
}

impl ColumnNames {
    fn of(names: &[&str]) -> Self {
        ColumnNames(names.iter().map(|s| s.to_string()).collect())
    }

    pub fn describe(&self) -> String {
        self.0
            .iter()
            .map(|n| format!("'{n}'"))
            .collect::<Vec<_>>()
            .join(", ")
    }
}

/// Maps the headers of a source file onto listing fields.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct DatasetSchema {
    /// Spreadsheet sheet to read; the first sheet when absent.
    pub sheet: Option<String>,
    pub town: ColumnNames,
    pub county: ColumnNames,
    pub population: ColumnNames,
    pub commute: ColumnNames,
    pub asking: BTreeMap<Bedrooms, ColumnNames>,
    pub rental: BTreeMap<Bedrooms, ColumnNames>,
    pub latitude: ColumnNames,
    pub longitude: ColumnNames,
    /// Unmapped columns that should still be coerced to numbers (e.g. rankings).
    pub numeric_columns: Vec<String>,
}

impl Default for DatasetSchema {
    fn default() -> Self {
        let per_bedroom = |patterns: &[&str]| -> BTreeMap<Bedrooms, ColumnNames> {
            Bedrooms::ALL
                .iter()
                .map(|b| {
                    let names: Vec<String> =
                        patterns.iter().map(|p| p.replace("{n}", &b.to_string())).collect();
                    (*b, ColumnNames(names))
                })
                .collect()
        };
        DatasetSchema {
            sheet: None,
            town: ColumnNames::of(&["Town", "Place", "Town/City"]),
            county: ColumnNames::of(&["County", "Region", "County/Region"]),
            population: ColumnNames::of(&["Population"]),
            commute: ColumnNames::of(&[
                "Commute Time",
                "Commute Time (mins)",
                "Commute to London",
                "Commute",
            ]),
            asking: per_bedroom(&[
                "{n} Bed Asking Price",
                "{n} Bed Avg Asking Price",
                "{n} Bedroom Asking Price",
                "{n} Bed Price",
            ]),
            rental: per_bedroom(&[
                "{n} Bed Rental Price",
                "{n} Bed Avg Rent",
                "{n} Bedroom Rental Price",
                "{n} Bed Rent",
            ]),
            latitude: ColumnNames::of(&["Latitude", "Lat"]),
            longitude: ColumnNames::of(&["Longitude", "Lon", "Lng"]),
            numeric_columns: Vec::new(),
        }
    }
}

// ---------------------------------------------------------------------------
// Filter defaults
// ---------------------------------------------------------------------------

/// Initial filter choices for a new session.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct FilterDefaults {
    pub empty_selection: EmptySelection,
    pub price_mode: PriceFilterMode,
    pub price_kind: PriceKind,
    pub bedrooms: Vec<Bedrooms>,
}

impl Default for FilterDefaults {
    fn default() -> Self {
        FilterDefaults {
            empty_selection: EmptySelection::default(),
            price_mode: PriceFilterMode::default(),
            price_kind: PriceKind::Asking,
            bedrooms: Bedrooms::ALL.to_vec(),
        }
    }
}

// ---------------------------------------------------------------------------
// Dashboard panels
// ---------------------------------------------------------------------------

/// Value columns of a panel: an explicit list, or the price columns of the
/// bedroom counts currently selected in the session.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum Columns {
    Listed(Vec<Field>),
    SelectedBedrooms { selected_bedrooms: PriceKind },
}

fn default_bins() -> usize {
    20
}

/// One chart or metric on the dashboard.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum PanelSpec {
    /// Overall average (mean of per-column means).
    Metric { title: String, columns: Columns },
    /// Row counts per category.
    CountBar { title: String, field: Field },
    /// Grouped aggregate per category.
    Bar {
        title: String,
        group: Field,
        columns: Columns,
        #[serde(default)]
        op: AggOp,
    },
    Pie { title: String, field: Field },
    Scatter {
        title: String,
        x: Field,
        y: Field,
        #[serde(default)]
        color: Option<Field>,
    },
    Histogram {
        title: String,
        column: Field,
        #[serde(default = "default_bins")]
        bins: usize,
    },
    Box { title: String, columns: Columns },
    Violin { title: String, columns: Columns },
    /// Points at latitude/longitude coloured by a value.
    Map { title: String, value: Field },
}

impl PanelSpec {
    pub fn title(&self) -> &str {
        match self {
            PanelSpec::Metric { title, .. }
            | PanelSpec::CountBar { title, .. }
            | PanelSpec::Bar { title, .. }
            | PanelSpec::Pie { title, .. }
            | PanelSpec::Scatter { title, .. }
            | PanelSpec::Histogram { title, .. }
            | PanelSpec::Box { title, .. }
            | PanelSpec::Violin { title, .. }
            | PanelSpec::Map { title, .. } => title,
        }
    }
}

fn asking_columns() -> Columns {
    Columns::SelectedBedrooms {
        selected_bedrooms: PriceKind::Asking,
    }
}

fn rental_columns() -> Columns {
    Columns::SelectedBedrooms {
        selected_bedrooms: PriceKind::Rental,
    }
}

fn default_panels() -> Vec<PanelSpec> {
    let two_bed = Bedrooms::ALL[1];
    vec![
        PanelSpec::Metric {
            title: "Overall Average Asking Price".into(),
            columns: asking_columns(),
        },
        PanelSpec::Metric {
            title: "Overall Average Monthly Rent".into(),
            columns: rental_columns(),
        },
        PanelSpec::CountBar {
            title: "Town Count by County".into(),
            field: Field::County,
        },
        PanelSpec::Bar {
            title: "Average Asking Price by County".into(),
            group: Field::County,
            columns: asking_columns(),
            op: AggOp::Mean,
        },
        PanelSpec::Bar {
            title: "Median 2 Bed Rental Yield by County".into(),
            group: Field::County,
            columns: Columns::Listed(vec![Field::Yield(two_bed)]),
            op: AggOp::Median,
        },
        PanelSpec::Scatter {
            title: "Commute Time vs 2 Bed Asking Price".into(),
            x: Field::Commute,
            y: Field::Asking(two_bed),
            color: Some(Field::County),
        },
        PanelSpec::Histogram {
            title: "Distribution of 2 Bed Asking Prices".into(),
            column: Field::Asking(two_bed),
            bins: default_bins(),
        },
        PanelSpec::Box {
            title: "Asking Prices by Bedroom Count".into(),
            columns: asking_columns(),
        },
        PanelSpec::Violin {
            title: "Monthly Rent by Bedroom Count".into(),
            columns: rental_columns(),
        },
        PanelSpec::Pie {
            title: "Share of Towns by County".into(),
            field: Field::County,
        },
        PanelSpec::Map {
            title: "2 Bed Rental Yield by Location".into(),
            value: Field::Yield(two_bed),
        },
    ]
}

// ---------------------------------------------------------------------------
// AppConfig
// ---------------------------------------------------------------------------

/// Complete dashboard configuration: how to read the data, how filters start
/// out, and which panels to render.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct AppConfig {
    pub title: String,
    pub schema: DatasetSchema,
    pub filters: FilterDefaults,
    pub panels: Vec<PanelSpec>,
}

impl Default for AppConfig {
    fn default() -> Self {
        AppConfig {
            title: "Real Estate Towns Dashboard".into(),
            schema: DatasetSchema::default(),
            filters: FilterDefaults::default(),
            panels: default_panels(),
        }
    }
}

impl AppConfig {
    /// Read a JSON configuration file. Omitted sections keep their defaults.
    pub fn from_path(path: &Path) -> Result<Self, ConfigError> {
        let text = std::fs::read_to_string(path).map_err(|source| ConfigError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        let config: AppConfig =
            serde_json::from_str(&text).map_err(|source| ConfigError::Parse {
                path: path.to_path_buf(),
                source,
            })?;
        config.validate()?;
        Ok(config)
    }

    /// Reject panel definitions that can never render.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.schema.town.0.is_empty() || self.schema.county.0.is_empty() {
            return Err(ConfigError::Invalid(
                "schema must name at least one town and one county column".into(),
            ));
        }
        for panel in &self.panels {
            match panel {
                PanelSpec::Histogram { bins: 0, title, .. } => {
                    return Err(ConfigError::Invalid(format!(
                        "panel '{title}': histogram needs at least one bin"
                    )));
                }
                PanelSpec::Metric {
                    columns: Columns::Listed(cols),
                    title,
                }
                | PanelSpec::Box {
                    columns: Columns::Listed(cols),
                    title,
                }
                | PanelSpec::Violin {
                    columns: Columns::Listed(cols),
                    title,
                }
                | PanelSpec::Bar {
                    columns: Columns::Listed(cols),
                    title,
                    op: AggOp::Mean | AggOp::Median,
                    ..
                } if cols.is_empty() => {
                    return Err(ConfigError::Invalid(format!(
                        "panel '{title}' lists no value columns"
                    )));
                }
                _ => {}
            }
        }
        Ok(())
    }
}
