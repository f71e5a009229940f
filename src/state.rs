use std::path::{Path, PathBuf};

use anyhow::Context;
use town_scout::config::AppConfig;
use town_scout::dashboard::{initial_criteria, DashboardContext};
use town_scout::data::filter::{
    EmptySelection, FilterCriteria, NumericRange, PriceFilter, PriceFilterMode, TableView,
};
use town_scout::data::loader::load_file;
use town_scout::data::model::{Bedrooms, Field, ListingTable, PriceKind};

// ---------------------------------------------------------------------------
// Application state
// ---------------------------------------------------------------------------

/// The full UI state, independent of rendering.
pub struct AppState {
    /// Dashboard configuration (schema, filter defaults, panels).
    pub config: AppConfig,

    /// Loaded table (None until user loads a file).
    pub table: Option<ListingTable>,

    /// The session's filter selections.
    pub criteria: FilterCriteria,

    /// File the table was read from.
    pub loaded_path: Option<PathBuf>,

    /// Status / error message shown in the UI.
    pub status_message: Option<String>,
}

impl Default for AppState {
    fn default() -> Self {
        Self::new(AppConfig::default())
    }
}

impl AppState {
    pub fn new(config: AppConfig) -> Self {
        Self {
            config,
            table: None,
            criteria: FilterCriteria::default(),
            loaded_path: None,
            status_message: None,
        }
    }

    /// Ingest a newly loaded table and reset the filters to the defaults.
    pub fn set_table(&mut self, table: ListingTable) {
        self.criteria = initial_criteria(&table, &self.config.filters);
        self.table = Some(table);
        self.status_message = None;
    }

    /// Read `path` with the configured schema. On failure the previous table
    /// is kept and the error is shown in the status line.
    pub fn load_path(&mut self, path: &Path) -> anyhow::Result<()> {
        let result = load_file(path, &self.config.schema)
            .with_context(|| format!("failed to load {}", path.display()));
        match result {
            Ok(table) => {
                log::debug!("Columns {:?}", table.column_names);
                self.set_table(table);
                self.loaded_path = Some(path.to_path_buf());
                Ok(())
            }
            Err(e) => {
                log::error!("{e:#}");
                self.status_message = Some(format!("Error: {e:#}"));
                Err(e)
            }
        }
    }

    /// Context for one render; `None` until a table is loaded.
    pub fn context(&self) -> Option<DashboardContext<'_>> {
        self.table
            .as_ref()
            .map(|t| DashboardContext::new(t, &self.criteria, &self.config))
    }

    // ---- Categorical selections ----

    /// Toggle a single value in a categorical field's selection.
    pub fn toggle_value(&mut self, field: &Field, value: &str) {
        let selected = self.criteria.categorical.entry(field.clone()).or_default();
        if !selected.remove(value) {
            selected.insert(value.to_string());
        }
    }

    /// Select all values of a categorical field.
    pub fn select_all(&mut self, field: &Field) {
        if let Some(values) = self.table.as_ref().and_then(|t| t.unique_values.get(field)) {
            self.criteria.categorical.insert(field.clone(), values.clone());
        }
    }

    /// Deselect all values of a categorical field.
    pub fn select_none(&mut self, field: &Field) {
        self.criteria.categorical.insert(field.clone(), Default::default());
    }

    /// Restrict a categorical field to `values`, ignoring unknown ones.
    pub fn select_only<I, S>(&mut self, field: &Field, values: I)
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let known = self.table.as_ref().and_then(|t| t.unique_values.get(field));
        let selected = values
            .into_iter()
            .filter_map(|v| {
                let v = v.as_ref();
                match known {
                    Some(known) if known.contains(v) => Some(v.to_string()),
                    _ => {
                        log::warn!("No {} named {v:?}", field.label());
                        None
                    }
                }
            })
            .collect();
        self.criteria.categorical.insert(field.clone(), selected);
    }

    pub fn set_empty_selection(&mut self, policy: EmptySelection) {
        self.criteria.empty_selection = policy;
    }

    // ---- Bedroom price filter ----

    fn price_mut(&mut self) -> &mut PriceFilter {
        let defaults = &self.config.filters;
        self.criteria.price.get_or_insert_with(|| PriceFilter {
            kind: defaults.price_kind,
            bedrooms: Default::default(),
            range: None,
            mode: defaults.price_mode,
        })
    }

    pub fn toggle_bedroom(&mut self, bedrooms: Bedrooms) {
        let selected = &mut self.price_mut().bedrooms;
        if !selected.remove(&bedrooms) {
            selected.insert(bedrooms);
        }
    }

    /// Switch between asking and rental prices. A price range set for the
    /// other kind no longer applies and is cleared.
    pub fn set_price_kind(&mut self, kind: PriceKind) {
        let price = self.price_mut();
        if price.kind != kind {
            price.kind = kind;
            price.range = None;
        }
    }

    pub fn set_price_mode(&mut self, mode: PriceFilterMode) {
        self.price_mut().mode = mode;
    }

    pub fn set_price_range(&mut self, range: Option<NumericRange>) {
        self.price_mut().range = range;
    }

    /// Bounds covering every selected bedroom price of the current kind.
    pub fn price_bounds(&self) -> Option<NumericRange> {
        let price = self.criteria.price.as_ref()?;
        price
            .fields()
            .filter_map(|f| self.column_bounds(&f))
            .reduce(|a, b| NumericRange::new(a.min.min(b.min), a.max.max(b.max)))
    }

    // ---- Plain numeric ranges ----

    pub fn set_range(&mut self, field: &Field, range: Option<NumericRange>) {
        match range {
            Some(r) => {
                self.criteria.ranges.insert(field.clone(), r);
            }
            None => {
                self.criteria.ranges.remove(field);
            }
        }
    }

    /// Smallest and largest value of `field` in the whole table.
    pub fn column_bounds(&self, field: &Field) -> Option<NumericRange> {
        let table = self.table.as_ref()?;
        let values = TableView::all(table).column(field);
        let min = values.iter().copied().reduce(f64::min)?;
        let max = values.iter().copied().reduce(f64::max)?;
        Some(NumericRange::new(min, max))
    }

    /// Back to the configured defaults.
    pub fn reset_filters(&mut self) {
        if let Some(table) = &self.table {
            self.criteria = initial_criteria(table, &self.config.filters);
        }
    }
}
