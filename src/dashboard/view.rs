use std::collections::BTreeSet;
use std::fmt;

use super::charts::{
    histogram, map_points, melt, scatter, CategorySeries, HistogramSeries, LongSeries, MapSeries,
    ScatterSeries,
};
use super::context::DashboardContext;
use crate::config::PanelSpec;
use crate::data::aggregate::{aggregate, overall_average, value_counts};
use crate::data::model::{format_number, Bedrooms, Field, PriceKind};

pub const NO_MATCHES: &str = "No data matches the current filters.";

/// Everything the rendering surface draws for one interaction.
#[derive(Debug, Clone, PartialEq)]
pub struct ViewModel {
    pub title: String,
    pub total_rows: usize,
    pub matched_rows: usize,
    /// Set when nothing can be charted; panels are empty then.
    pub notice: Option<String>,
    pub table: TableSection,
    /// Unique town names of the matched rows, in source order.
    pub towns: Vec<String>,
    /// Present values per column-masked price column. Differs from
    /// `matched_rows` under column-level price filtering.
    pub column_counts: Vec<(String, usize)>,
    pub panels: Vec<Panel>,
}

/// The filtered listings as display strings.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct TableSection {
    pub columns: Vec<String>,
    pub rows: Vec<Vec<String>>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct Panel {
    pub title: String,
    pub body: PanelBody,
}

#[derive(Debug, Clone, PartialEq)]
pub enum PanelBody {
    Metric { value: Option<f64>, unit: String },
    Bar(CategorySeries),
    Pie(CategorySeries),
    Scatter(ScatterSeries),
    Histogram(HistogramSeries),
    BoxPlot(LongSeries),
    Violin(LongSeries),
    Map(MapSeries),
    /// A source column the panel needs is absent from the dataset.
    Unavailable(String),
}

/// Compute the view model for `ctx`. Pure: the same context always yields
/// the same view model, and nothing outside the return value changes.
pub fn render(ctx: &DashboardContext<'_>) -> ViewModel {
    let view = ctx.view();
    let matched_rows = view.len();
    let notice = view.is_empty().then(|| NO_MATCHES.to_string());

    let panels = if view.is_empty() {
        Vec::new()
    } else {
        ctx.config
            .panels
            .iter()
            .map(|spec| Panel {
                title: spec.title().to_string(),
                body: render_panel(ctx, spec),
            })
            .collect()
    };

    let mut seen = BTreeSet::new();
    let towns = view
        .listings()
        .filter(|&(_, l)| seen.insert(l.town.as_str()))
        .map(|(_, l)| l.town.clone())
        .collect();

    let column_counts = view
        .masked_fields()
        .map(|f| (f.label(), view.column(f).len()))
        .collect();

    ViewModel {
        title: ctx.config.title.clone(),
        total_rows: ctx.table.len(),
        matched_rows,
        notice,
        table: table_section(ctx),
        towns,
        column_counts,
        panels,
    }
}

fn unavailable(fields: &[Field]) -> PanelBody {
    let names: Vec<String> = fields.iter().map(Field::label).collect();
    PanelBody::Unavailable(format!("{} data not available", names.join(", ")))
}

fn render_panel(ctx: &DashboardContext<'_>, spec: &PanelSpec) -> PanelBody {
    let view = ctx.view();
    let table = ctx.table;
    let missing = |fields: &[&Field]| -> Vec<Field> {
        fields
            .iter()
            .filter(|f| !table.has_field(f))
            .map(|f| (*f).clone())
            .collect()
    };
    // Keep only available columns; unavailable when none remain.
    let present = |fields: Vec<Field>| -> Result<Vec<Field>, PanelBody> {
        let (ok, absent): (Vec<Field>, Vec<Field>) =
            fields.into_iter().partition(|f| table.has_field(f));
        if ok.is_empty() {
            Err(unavailable(&absent))
        } else {
            Ok(ok)
        }
    };

    match spec {
        PanelSpec::Metric { columns, .. } => match present(ctx.resolve(columns)) {
            Ok(cols) => PanelBody::Metric {
                value: overall_average(view, &cols),
                unit: unit_of(&cols),
            },
            Err(body) => body,
        },
        PanelSpec::CountBar { field, .. } | PanelSpec::Pie { field, .. } => {
            let absent = missing(&[field]);
            if !absent.is_empty() {
                return unavailable(&absent);
            }
            let series = CategorySeries::from_counts(field, &value_counts(view, field));
            match spec {
                PanelSpec::Pie { .. } => PanelBody::Pie(series),
                _ => PanelBody::Bar(series),
            }
        }
        PanelSpec::Bar {
            group, columns, op, ..
        } => {
            let absent = missing(&[group]);
            if !absent.is_empty() {
                return unavailable(&absent);
            }
            match present(ctx.resolve(columns)) {
                Ok(cols) => {
                    let result = aggregate(view, group, &cols, *op);
                    PanelBody::Bar(CategorySeries::from_aggregate(
                        &result,
                        format!("{op} {}", unit_of(&cols)),
                    ))
                }
                Err(body) => body,
            }
        }
        PanelSpec::Scatter { x, y, color, .. } => {
            let absent = missing(&[x, y]);
            if !absent.is_empty() {
                return unavailable(&absent);
            }
            let color = color.as_ref().filter(|c| table.has_field(c));
            PanelBody::Scatter(scatter(view, x, y, color))
        }
        PanelSpec::Histogram { column, bins, .. } => {
            let absent = missing(&[column]);
            if !absent.is_empty() {
                return unavailable(&absent);
            }
            PanelBody::Histogram(histogram(view, column, *bins))
        }
        PanelSpec::Box { columns, .. } => match present(ctx.resolve(columns)) {
            Ok(cols) => PanelBody::BoxPlot(melt(view, &cols)),
            Err(body) => body,
        },
        PanelSpec::Violin { columns, .. } => match present(ctx.resolve(columns)) {
            Ok(cols) => PanelBody::Violin(melt(view, &cols)),
            Err(body) => body,
        },
        PanelSpec::Map { value, .. } => {
            let absent = missing(&[&Field::Latitude, &Field::Longitude, value]);
            if !absent.is_empty() {
                return unavailable(&absent);
            }
            PanelBody::Map(map_points(view, value))
        }
    }
}

/// Shared unit of a set of columns, for metric and axis labels.
fn unit_of(cols: &[Field]) -> String {
    let all = |pred: fn(&Field) -> bool| cols.iter().all(pred);
    if all(|f| matches!(f, Field::Asking(_))) {
        PriceKind::Asking.to_string()
    } else if all(|f| matches!(f, Field::Rental(_))) {
        PriceKind::Rental.to_string()
    } else if all(|f| matches!(f, Field::Yield(_))) {
        "Rental yield (%)".to_string()
    } else if let [single] = cols {
        single.label()
    } else {
        "Value".to_string()
    }
}

fn table_section(ctx: &DashboardContext<'_>) -> TableSection {
    let table = ctx.table;
    let view = ctx.view();
    let bedrooms: Vec<Bedrooms> = ctx.selected_bedrooms().into_iter().collect();

    let mut fields = vec![Field::Town, Field::County, Field::Population, Field::Commute];
    for b in &bedrooms {
        fields.push(Field::Asking(*b));
        fields.push(Field::Rental(*b));
        fields.push(Field::Yield(*b));
    }
    fields.retain(|f| table.has_field(f));
    fields.extend(table.available.iter().filter(|f| matches!(f, Field::Extra(_))).cloned());

    let rows = view
        .listings()
        .map(|(i, listing)| {
            fields
                .iter()
                .map(|f| match f {
                    Field::Town | Field::County | Field::Extra(_) => {
                        listing.text(f).map(|s| s.into_owned()).unwrap_or_default()
                    }
                    _ => view.number(i, f).map(format_number).unwrap_or_default(),
                })
                .collect()
        })
        .collect();

    TableSection {
        columns: fields.iter().map(Field::label).collect(),
        rows,
    }
}

// ---------------------------------------------------------------------------
// Text rendering (headless summary)
// ---------------------------------------------------------------------------

impl fmt::Display for ViewModel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "# {}", self.title)?;
        writeln!(f, "Showing {} of {} towns", self.matched_rows, self.total_rows)?;
        for (column, count) in &self.column_counts {
            writeln!(f, "  {column}: {count} values within the price range")?;
        }
        if let Some(notice) = &self.notice {
            writeln!(f)?;
            return writeln!(f, "{notice}");
        }
        for panel in &self.panels {
            writeln!(f)?;
            writeln!(f, "## {}", panel.title)?;
            write!(f, "{}", panel.body)?;
        }
        writeln!(f)?;
        writeln!(f, "## Towns")?;
        for town in &self.towns {
            writeln!(f, "- {town}")?;
        }
        Ok(())
    }
}

impl fmt::Display for PanelBody {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            PanelBody::Metric { value, unit } => match value {
                Some(v) => writeln!(f, "{unit}: {}", format_number(*v)),
                None => writeln!(f, "{unit}: no data"),
            },
            PanelBody::Bar(series) | PanelBody::Pie(series) => {
                for (label, value) in series.labels.iter().zip(&series.values) {
                    writeln!(f, "{label}: {}", format_number(*value))?;
                }
                for label in &series.no_data {
                    writeln!(f, "{label}: no data")?;
                }
                Ok(())
            }
            PanelBody::Scatter(series) => writeln!(
                f,
                "{} points ({} vs {})",
                series.points.len(),
                series.y_label,
                series.x_label
            ),
            PanelBody::Histogram(series) => {
                for bin in series.bin_counts() {
                    writeln!(
                        f,
                        "{} - {}: {}",
                        format_number(bin.start),
                        format_number(bin.end),
                        bin.count
                    )?;
                }
                Ok(())
            }
            PanelBody::BoxPlot(series) | PanelBody::Violin(series) => {
                for (category, s) in series.summaries() {
                    writeln!(
                        f,
                        "{category}: n={} min={} q1={} median={} q3={} max={}",
                        s.count,
                        format_number(s.min),
                        format_number(s.q1),
                        format_number(s.median),
                        format_number(s.q3),
                        format_number(s.max)
                    )?;
                }
                Ok(())
            }
            PanelBody::Map(series) => writeln!(
                f,
                "{} located towns coloured by {}",
                series.points.len(),
                series.value_label
            ),
            PanelBody::Unavailable(message) => writeln!(f, "{message}"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::{AppConfig, Columns};
    use crate::dashboard::context::initial_criteria;
    use crate::data::model::{Listing, ListingTable};

    fn bed(n: u8) -> Bedrooms {
        Bedrooms::new(n).unwrap()
    }

    fn table() -> ListingTable {
        let listings = [("Ash", "A", 200_000.0), ("Birch", "B", 300_000.0)]
            .into_iter()
            .map(|(town, county, price)| {
                let mut l = Listing {
                    town: town.into(),
                    county: county.into(),
                    ..Default::default()
                };
                l.set_asking_price(bed(2), Some(price));
                l
            })
            .collect();
        let available = [Field::Town, Field::County, Field::Asking(bed(2))]
            .into_iter()
            .collect();
        ListingTable::from_listings(listings, Vec::new(), available)
    }

    fn config(panels: Vec<PanelSpec>) -> AppConfig {
        AppConfig {
            panels,
            ..Default::default()
        }
    }

    #[test]
    fn missing_columns_degrade_to_unavailable() {
        let t = table();
        let config = config(vec![
            PanelSpec::Histogram {
                title: "Commute".into(),
                column: Field::Commute,
                bins: 10,
            },
            PanelSpec::Metric {
                title: "Avg".into(),
                columns: Columns::SelectedBedrooms {
                    selected_bedrooms: PriceKind::Asking,
                },
            },
        ]);
        let criteria = initial_criteria(&t, &config.filters);
        let vm = render(&DashboardContext::new(&t, &criteria, &config));
        assert_eq!(
            vm.panels[0].body,
            PanelBody::Unavailable("Commute Time data not available".into())
        );
        assert_eq!(
            vm.panels[1].body,
            PanelBody::Metric {
                value: Some(250_000.0),
                unit: "Asking price".into()
            }
        );
    }

    #[test]
    fn empty_result_carries_notice_and_no_panels() {
        let t = table();
        let config = AppConfig::default();
        let criteria = initial_criteria(&t, &config.filters).select(Field::County, ["Z"]);
        let vm = render(&DashboardContext::new(&t, &criteria, &config));
        assert_eq!(vm.matched_rows, 0);
        assert_eq!(vm.notice.as_deref(), Some(NO_MATCHES));
        assert!(vm.panels.is_empty());
        assert!(vm.to_string().contains(NO_MATCHES));
    }

    #[test]
    fn table_lists_available_columns_only() {
        let t = table();
        let config = config(Vec::new());
        let criteria = initial_criteria(&t, &config.filters);
        let vm = render(&DashboardContext::new(&t, &criteria, &config));
        assert_eq!(vm.table.columns, vec!["Town", "County", "2 Bed Asking Price"]);
        assert_eq!(vm.table.rows[1], vec!["Birch", "B", "300000"]);
        assert_eq!(vm.towns, vec!["Ash", "Birch"]);
    }

    fn located_table() -> ListingTable {
        let rows = [
            ("Ash", "A", Some(30.0), 200_000.0, Some(1_000.0), Some((51.1, -0.5))),
            ("Birch", "A", Some(45.0), 300_000.0, None, Some((51.2, 0.3))),
            ("Cedar", "B", None, 250_000.0, Some(1_250.0), None),
        ];
        let listings = rows
            .into_iter()
            .map(|(town, county, commute, asking, rent, coords)| {
                let mut l = Listing {
                    town: town.into(),
                    county: county.into(),
                    commute,
                    latitude: coords.map(|c| c.0),
                    longitude: coords.map(|c| c.1),
                    ..Default::default()
                };
                l.set_asking_price(bed(2), Some(asking));
                l.set_rental_price(bed(2), rent);
                l
            })
            .collect();
        let available = [
            Field::Town,
            Field::County,
            Field::Commute,
            Field::Latitude,
            Field::Longitude,
            Field::Asking(bed(2)),
            Field::Rental(bed(2)),
        ]
        .into_iter()
        .collect();
        ListingTable::from_listings(listings, Vec::new(), available)
    }

    fn body<'v>(vm: &'v ViewModel, title: &str) -> &'v PanelBody {
        &vm.panels
            .iter()
            .find(|p| p.title == title)
            .unwrap_or_else(|| panic!("no panel titled {title}"))
            .body
    }

    #[test]
    fn default_dashboard_fills_every_chart_kind() {
        let t = located_table();
        let config = AppConfig::default();
        let criteria = initial_criteria(&t, &config.filters);
        let vm = render(&DashboardContext::new(&t, &criteria, &config));
        assert_eq!(vm.panels.len(), config.panels.len());

        match body(&vm, "Commute Time vs 2 Bed Asking Price") {
            PanelBody::Scatter(series) => {
                let towns: Vec<&str> = series.points.iter().map(|p| p.label.as_str()).collect();
                assert_eq!(towns, vec!["Ash", "Birch"]);
                assert_eq!(series.points[1].x, 45.0);
                assert_eq!(series.points[1].y, 300_000.0);
                assert_eq!(series.points[0].group.as_deref(), Some("A"));
            }
            other => panic!("expected a scatter, got {other:?}"),
        }

        match body(&vm, "Asking Prices by Bedroom Count") {
            PanelBody::BoxPlot(series) => {
                assert_eq!(series.categories, vec!["2 Bed Asking Price"]);
                let values: Vec<f64> = series.records.iter().map(|r| r.1).collect();
                assert_eq!(values, vec![200_000.0, 300_000.0, 250_000.0]);
            }
            other => panic!("expected a box plot, got {other:?}"),
        }

        match body(&vm, "Monthly Rent by Bedroom Count") {
            PanelBody::Violin(series) => {
                assert_eq!(series.categories, vec!["2 Bed Monthly Rent"]);
                let values: Vec<f64> = series.records.iter().map(|r| r.1).collect();
                assert_eq!(values, vec![1_000.0, 1_250.0]);
            }
            other => panic!("expected a violin, got {other:?}"),
        }

        match body(&vm, "Share of Towns by County") {
            PanelBody::Pie(series) => {
                assert_eq!(series.labels, vec!["A", "B"]);
                assert_eq!(series.values, vec![2.0, 1.0]);
            }
            other => panic!("expected a pie, got {other:?}"),
        }

        match body(&vm, "2 Bed Rental Yield by Location") {
            PanelBody::Map(series) => {
                assert_eq!(series.points.len(), 2);
                assert_eq!(series.points[0].lon, -0.5);
                assert_eq!(series.points[0].value, Some(6.0));
                assert_eq!(series.points[1].label, "Birch");
                assert_eq!(series.points[1].value, None);
                assert_eq!(series.value_range(), Some((6.0, 6.0)));
            }
            other => panic!("expected a map, got {other:?}"),
        }
    }

    #[test]
    fn render_is_repeatable() {
        let t = table();
        let config = AppConfig::default();
        let criteria = initial_criteria(&t, &config.filters);
        let ctx = DashboardContext::new(&t, &criteria, &config);
        assert_eq!(render(&ctx), render(&ctx));
    }
}
