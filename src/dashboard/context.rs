use std::collections::BTreeSet;

use crate::config::{AppConfig, Columns, FilterDefaults};
use crate::data::filter::{filter, FilterCriteria, PriceFilter, TableView};
use crate::data::model::{Bedrooms, Field, ListingTable};

/// Everything one render needs: the loaded table, the session's criteria,
/// the configuration, and the filtered view derived from them.
///
/// Built fresh for every interaction; nothing in it outlives the render.
pub struct DashboardContext<'a> {
    pub table: &'a ListingTable,
    pub criteria: &'a FilterCriteria,
    pub config: &'a AppConfig,
    view: TableView<'a>,
}

impl<'a> DashboardContext<'a> {
    pub fn new(table: &'a ListingTable, criteria: &'a FilterCriteria, config: &'a AppConfig) -> Self {
        let view = filter(&TableView::all(table), criteria);
        DashboardContext {
            table,
            criteria,
            config,
            view,
        }
    }

    /// Rows matching the criteria.
    pub fn view(&self) -> &TableView<'a> {
        &self.view
    }

    /// Bedroom counts chosen in the session, or the configured defaults.
    pub fn selected_bedrooms(&self) -> BTreeSet<Bedrooms> {
        match &self.criteria.price {
            Some(price) => price.bedrooms.clone(),
            None => self.config.filters.bedrooms.iter().copied().collect(),
        }
    }

    /// Concrete fields for a panel's column list.
    pub fn resolve(&self, columns: &Columns) -> Vec<Field> {
        match columns {
            Columns::Listed(fields) => fields.clone(),
            Columns::SelectedBedrooms { selected_bedrooms } => self
                .selected_bedrooms()
                .into_iter()
                .map(|b| selected_bedrooms.field(b))
                .collect(),
        }
    }
}

/// Criteria for a fresh session: every county and town selected and the
/// configured bedroom counts chosen, with no price bound yet.
pub fn initial_criteria(table: &ListingTable, defaults: &FilterDefaults) -> FilterCriteria {
    let mut criteria = FilterCriteria::select_everything(table, defaults.empty_selection);
    criteria.price = Some(PriceFilter {
        kind: defaults.price_kind,
        bedrooms: defaults.bedrooms.iter().copied().collect(),
        range: None,
        mode: defaults.price_mode,
    });
    criteria
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::data::model::{Listing, PriceKind};

    fn table() -> ListingTable {
        let listings = ["A", "B"]
            .into_iter()
            .map(|c| Listing {
                town: format!("{c}1"),
                county: c.into(),
                ..Default::default()
            })
            .collect();
        ListingTable::from_listings(listings, Vec::new(), Default::default())
    }

    #[test]
    fn initial_criteria_show_everything() {
        let t = table();
        let config = AppConfig::default();
        let criteria = initial_criteria(&t, &config.filters);
        let ctx = DashboardContext::new(&t, &criteria, &config);
        assert_eq!(ctx.view().len(), 2);
        assert_eq!(ctx.selected_bedrooms().len(), 4);
    }

    #[test]
    fn selected_bedrooms_resolve_to_price_fields() {
        let t = table();
        let config = AppConfig::default();
        let mut criteria = initial_criteria(&t, &config.filters);
        if let Some(price) = criteria.price.as_mut() {
            price.bedrooms = [Bedrooms::new(3).unwrap()].into_iter().collect();
        }
        let ctx = DashboardContext::new(&t, &criteria, &config);
        let fields = ctx.resolve(&Columns::SelectedBedrooms {
            selected_bedrooms: PriceKind::Rental,
        });
        assert_eq!(fields, vec![Field::Rental(Bedrooms::new(3).unwrap())]);
    }
}
