use std::collections::{BTreeMap, BTreeSet};

use serde::{Deserialize, Serialize};

use super::model::{Bedrooms, Field, Listing, ListingTable, PriceKind};

// ---------------------------------------------------------------------------
// Filter policies
// ---------------------------------------------------------------------------

/// What an empty categorical selection means.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EmptySelection {
    /// Nothing selected → no rows pass.
    #[default]
    MatchNone,
    /// Nothing selected → the field is unconstrained.
    MatchAll,
}

/// How one price range is applied across several bedroom price columns.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PriceFilterMode {
    /// A row survives only if every selected bedroom price is present and in range.
    #[default]
    RowLevel,
    /// Rows are kept; each selected price column is masked independently, so an
    /// out-of-range cell reads as missing in that column only.
    ColumnLevel,
}

/// Inclusive numeric bounds.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct NumericRange {
    pub min: f64,
    pub max: f64,
}

impl NumericRange {
    pub fn new(min: f64, max: f64) -> Self {
        NumericRange { min, max }
    }

    pub fn contains(&self, value: f64) -> bool {
        value >= self.min && value <= self.max
    }
}

/// Bedroom-count selection, optionally bounding the price columns of the
/// selected bedroom counts by one shared range.
#[derive(Debug, Clone, PartialEq)]
pub struct PriceFilter {
    pub kind: PriceKind,
    pub bedrooms: BTreeSet<Bedrooms>,
    /// `None` selects bedroom counts without constraining prices.
    pub range: Option<NumericRange>,
    pub mode: PriceFilterMode,
}

impl PriceFilter {
    pub fn fields(&self) -> impl Iterator<Item = Field> + '_ {
        self.bedrooms.iter().map(|b| self.kind.field(*b))
    }
}

// ---------------------------------------------------------------------------
// FilterCriteria
// ---------------------------------------------------------------------------

/// The active constraints of one session; all are combined with AND.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct FilterCriteria {
    /// Selected values per categorical field. Absent field → no constraint.
    pub categorical: BTreeMap<Field, BTreeSet<String>>,
    /// Inclusive bounds per numeric field.
    pub ranges: BTreeMap<Field, NumericRange>,
    pub price: Option<PriceFilter>,
    pub empty_selection: EmptySelection,
}

impl FilterCriteria {
    /// Criteria with every categorical value selected (i.e. show everything).
    pub fn select_everything(table: &ListingTable, empty_selection: EmptySelection) -> Self {
        FilterCriteria {
            categorical: table.unique_values.clone(),
            empty_selection,
            ..Default::default()
        }
    }

    /// Restrict `field` to exactly `values`.
    pub fn select<I, S>(mut self, field: Field, values: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.categorical
            .insert(field, values.into_iter().map(Into::into).collect());
        self
    }

    pub fn with_range(mut self, field: Field, range: NumericRange) -> Self {
        self.ranges.insert(field, range);
        self
    }

    pub fn with_price(mut self, price: PriceFilter) -> Self {
        self.price = Some(price);
        self
    }

    /// Whether `listing` passes the categorical and plain range constraints.
    fn admits(&self, listing: &Listing) -> bool {
        let categorical_ok = self.categorical.iter().all(|(field, selected)| {
            if selected.is_empty() {
                return self.empty_selection == EmptySelection::MatchAll;
            }
            listing
                .text(field)
                .is_some_and(|v| selected.contains(&*v))
        });
        categorical_ok
            && self.ranges.iter().all(|(field, range)| {
                listing.number(field).is_some_and(|v| range.contains(v))
            })
    }
}

// ---------------------------------------------------------------------------
// TableView – a filtered, read-only view over a ListingTable
// ---------------------------------------------------------------------------

/// Row subset of a table, plus per-column masks from column-level price filters.
#[derive(Debug, Clone, PartialEq)]
pub struct TableView<'a> {
    table: &'a ListingTable,
    rows: Vec<usize>,
    masked: BTreeMap<Field, BTreeSet<usize>>,
}

impl<'a> TableView<'a> {
    /// Every row of the table, unmasked.
    pub fn all(table: &'a ListingTable) -> Self {
        TableView {
            table,
            rows: (0..table.len()).collect(),
            masked: BTreeMap::new(),
        }
    }

    pub fn table(&self) -> &'a ListingTable {
        self.table
    }

    /// Source-table indices of the rows in this view, ascending.
    pub fn rows(&self) -> &[usize] {
        &self.rows
    }

    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    /// The listings in this view, in source order.
    pub fn listings(&self) -> impl Iterator<Item = (usize, &'a Listing)> + '_ {
        let table = self.table;
        self.rows.iter().map(move |&i| (i, &table.listings[i]))
    }

    /// Whether column-level masking hides `field` for source row `row`.
    pub fn is_masked(&self, row: usize, field: &Field) -> bool {
        self.masked.get(field).is_some_and(|rows| rows.contains(&row))
    }

    /// Fields with at least one masked cell.
    pub fn masked_fields(&self) -> impl Iterator<Item = &Field> {
        self.masked.keys()
    }

    /// Numeric value of `field` in source row `row`; masked cells read as missing.
    ///
    /// A yield is derived from its asking and rental cells, so it reads as
    /// missing when either of them is masked.
    pub fn number(&self, row: usize, field: &Field) -> Option<f64> {
        if self.is_masked(row, field) {
            return None;
        }
        if let Field::Yield(b) = field {
            if self.is_masked(row, &Field::Asking(*b)) || self.is_masked(row, &Field::Rental(*b)) {
                return None;
            }
        }
        self.table.listings.get(row)?.number(field)
    }

    /// Present (non-missing, unmasked) values of `field` across the view.
    pub fn column(&self, field: &Field) -> Vec<f64> {
        self.rows
            .iter()
            .filter_map(|&i| self.number(i, field))
            .collect()
    }
}

/// Return the rows of `view` that pass all of `criteria`.
///
/// The result is a fresh view over the same table; `view` is left untouched.
/// Categorical constraints keep rows whose value is selected, ranges keep rows
/// whose value is present and inside `[min, max]`, and the price filter either
/// drops rows or masks cells depending on its [`PriceFilterMode`].
pub fn filter<'a>(view: &TableView<'a>, criteria: &FilterCriteria) -> TableView<'a> {
    let table = view.table;
    let mut rows: Vec<usize> = view
        .rows
        .iter()
        .copied()
        .filter(|&i| criteria.admits(&table.listings[i]))
        .collect();
    let mut masked = view.masked.clone();

    if let Some((price, range)) = criteria
        .price
        .as_ref()
        .and_then(|p| p.range.map(|r| (p, r)))
    {
        let fields: Vec<Field> = price.fields().collect();
        let in_range = |i: usize, field: &Field| {
            table.listings[i]
                .number(field)
                .is_some_and(|v| range.contains(v))
        };
        match price.mode {
            PriceFilterMode::RowLevel => {
                rows.retain(|&i| fields.iter().all(|f| in_range(i, f)));
            }
            PriceFilterMode::ColumnLevel => {
                for field in &fields {
                    let out: BTreeSet<usize> = rows
                        .iter()
                        .copied()
                        .filter(|&i| !in_range(i, field))
                        .collect();
                    if !out.is_empty() {
                        masked.entry(field.clone()).or_default().extend(out);
                    }
                }
            }
        }
    }

    log::debug!("filter kept {} of {} rows", rows.len(), view.rows.len());
    TableView {
        table,
        rows,
        masked,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn bed(n: u8) -> Bedrooms {
        Bedrooms::new(n).unwrap()
    }

    fn listing(town: &str, county: &str, one_bed: Option<f64>, two_bed: Option<f64>) -> Listing {
        let mut l = Listing {
            town: town.into(),
            county: county.into(),
            ..Default::default()
        };
        l.set_asking_price(bed(1), one_bed);
        l.set_asking_price(bed(2), two_bed);
        l
    }

    fn table() -> ListingTable {
        let listings = vec![
            listing("Ash", "A", Some(150_000.0), Some(200_000.0)),
            listing("Birch", "A", Some(180_000.0), Some(420_000.0)),
            listing("Cedar", "B", None, Some(250_000.0)),
            listing("Damson", "B", Some(500_000.0), Some(260_000.0)),
            listing("Elm", "C", Some(120_000.0), None),
        ];
        let available = [Field::Town, Field::County, Field::Asking(bed(1)), Field::Asking(bed(2))]
            .into_iter()
            .collect();
        ListingTable::from_listings(listings, Vec::new(), available)
    }

    fn price(mode: PriceFilterMode) -> PriceFilter {
        PriceFilter {
            kind: PriceKind::Asking,
            bedrooms: [bed(1), bed(2)].into_iter().collect(),
            range: Some(NumericRange::new(100_000.0, 300_000.0)),
            mode,
        }
    }

    #[test]
    fn categorical_selection_keeps_members() {
        let t = table();
        let c = FilterCriteria::default().select(Field::County, ["A", "C"]);
        let v = filter(&TableView::all(&t), &c);
        assert_eq!(v.rows(), &[0, 1, 4]);
    }

    #[test]
    fn empty_selection_follows_policy() {
        let t = table();
        let none = FilterCriteria::default().select(Field::County, Vec::<String>::new());
        assert!(filter(&TableView::all(&t), &none).is_empty());

        let all = FilterCriteria {
            empty_selection: EmptySelection::MatchAll,
            ..none
        };
        assert_eq!(filter(&TableView::all(&t), &all).len(), 5);
    }

    #[test]
    fn select_everything_matches_all_rows() {
        let t = table();
        let c = FilterCriteria::select_everything(&t, EmptySelection::MatchNone);
        assert_eq!(filter(&TableView::all(&t), &c).len(), t.len());
    }

    #[test]
    fn range_is_inclusive_and_drops_missing() {
        let t = table();
        let c = FilterCriteria::default()
            .with_range(Field::Asking(bed(1)), NumericRange::new(150_000.0, 180_000.0));
        let v = filter(&TableView::all(&t), &c);
        assert_eq!(v.rows(), &[0, 1]);
    }

    #[test]
    fn row_level_price_requires_every_column_in_range() {
        let t = table();
        let c = FilterCriteria::default().with_price(price(PriceFilterMode::RowLevel));
        let v = filter(&TableView::all(&t), &c);
        // Birch fails on 2 bed, Cedar/Elm have a missing price, Damson fails on 1 bed.
        assert_eq!(v.rows(), &[0]);
    }

    #[test]
    fn column_level_price_masks_cells_independently() {
        let t = table();
        let c = FilterCriteria::default().with_price(price(PriceFilterMode::ColumnLevel));
        let v = filter(&TableView::all(&t), &c);
        assert_eq!(v.len(), 5);
        assert_eq!(v.column(&Field::Asking(bed(1))), vec![150_000.0, 180_000.0, 120_000.0]);
        assert_eq!(v.column(&Field::Asking(bed(2))), vec![200_000.0, 250_000.0, 260_000.0]);
        assert!(v.is_masked(1, &Field::Asking(bed(2))));
        assert!(!v.is_masked(1, &Field::Asking(bed(1))));
    }

    #[test]
    fn masked_price_hides_the_derived_yield() {
        let mut t = table();
        t.listings[0].set_rental_price(bed(2), Some(1_000.0));
        t.listings[1].set_rental_price(bed(2), Some(1_400.0));
        let c = FilterCriteria::default().with_price(PriceFilter {
            bedrooms: [bed(2)].into_iter().collect(),
            range: Some(NumericRange::new(0.0, 300_000.0)),
            ..price(PriceFilterMode::ColumnLevel)
        });
        let v = filter(&TableView::all(&t), &c);
        let yield_2 = Field::Yield(bed(2));

        assert!(v.is_masked(1, &Field::Asking(bed(2))));
        assert_eq!(t.listings[1].number(&yield_2), Some(4.0));
        assert_eq!(v.number(1, &yield_2), None);
        assert_eq!(v.number(0, &yield_2), Some(6.0));
        assert_eq!(v.column(&yield_2), vec![6.0]);
    }

    #[test]
    fn bedroom_selection_without_range_keeps_everything() {
        let t = table();
        let selection = PriceFilter {
            range: None,
            ..price(PriceFilterMode::RowLevel)
        };
        let v = filter(&TableView::all(&t), &FilterCriteria::default().with_price(selection));
        assert_eq!(v, TableView::all(&t));
    }

    #[test]
    fn filtered_rows_are_a_subset_and_filtering_is_idempotent() {
        let t = table();
        let criteria = [
            FilterCriteria::default().select(Field::County, ["B"]),
            FilterCriteria::default().with_price(price(PriceFilterMode::RowLevel)),
            FilterCriteria::default()
                .with_range(Field::Asking(bed(2)), NumericRange::new(0.0, 255_000.0))
                .with_price(price(PriceFilterMode::ColumnLevel)),
        ];
        let all = TableView::all(&t);
        for c in &criteria {
            let once = filter(&all, c);
            assert!(once.rows().iter().all(|r| all.rows().contains(r)));
            let twice = filter(&once, c);
            assert_eq!(once, twice);
        }
    }

    #[test]
    fn source_view_is_not_mutated() {
        let t = table();
        let all = TableView::all(&t);
        let before = all.clone();
        let _ = filter(&all, &FilterCriteria::default().with_price(price(PriceFilterMode::ColumnLevel)));
        assert_eq!(all, before);
    }
}
