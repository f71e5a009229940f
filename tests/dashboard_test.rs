use std::io::Write;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use anyhow::Result;
use arrow::array::{ArrayRef, Float64Array, StringArray};
use arrow::datatypes::{DataType, Field as ArrowField, Schema};
use arrow::record_batch::RecordBatch;
use parquet::arrow::ArrowWriter;
use rust_xlsxwriter::Workbook;
use tempfile::TempDir;
use town_scout::config::{AppConfig, Columns, DatasetSchema, PanelSpec};
use town_scout::dashboard::{initial_criteria, render, DashboardContext, PanelBody, NO_MATCHES};
use town_scout::data::aggregate::{aggregate, overall_average, value_counts, AggOp};
use town_scout::data::filter::{
    filter, FilterCriteria, NumericRange, PriceFilter, PriceFilterMode, TableView,
};
use town_scout::data::loader::load_file;
use town_scout::data::model::{rental_yield, Bedrooms, Field, PriceKind};
use town_scout::error::LoadError;

const TOWNS_CSV: &str = concat!(
    "Town,County,2 Bed Asking Price,2 Bed Rental Price,Commute Time\n",
    "Ashford,A,\"£200,000\",\"£1,000\",60 mins\n",
    "Bexley,A,\"£300,000\",\"£1,250\",35 mins\n",
    "Crawley,B,\"£250,000\",N/A,45 mins\n",
    "Dartford,B,N/A,\"£1,100\",40 mins\n",
    "Epsom,C,\"£400,000\",\"£1,500\",30 mins\n",
);

fn bed(n: u8) -> Bedrooms {
    Bedrooms::new(n).unwrap()
}

fn write_file(dir: &TempDir, name: &str, contents: &str) -> Result<PathBuf> {
    let path = dir.path().join(name);
    let mut file = std::fs::File::create(&path)?;
    file.write_all(contents.as_bytes())?;
    Ok(path)
}

fn load_towns(dir: &TempDir) -> Result<town_scout::data::model::ListingTable> {
    let path = write_file(dir, "towns.csv", TOWNS_CSV)?;
    Ok(load_file(&path, &AppConfig::default().schema)?)
}

#[test]
fn filtering_one_county_counts_its_towns() -> Result<()> {
    let dir = TempDir::new()?;
    let table = load_towns(&dir)?;
    assert_eq!(table.len(), 5);

    let criteria = FilterCriteria::default().select(Field::County, ["A"]);
    let view = filter(&TableView::all(&table), &criteria);
    assert_eq!(view.len(), 2);
    assert_eq!(value_counts(&view, &Field::County), vec![("A".to_string(), 2)]);
    Ok(())
}

#[test]
fn filtered_rows_are_a_subset_and_filtering_is_idempotent() -> Result<()> {
    let dir = TempDir::new()?;
    let table = load_towns(&dir)?;
    let all = TableView::all(&table);

    for mode in [PriceFilterMode::RowLevel, PriceFilterMode::ColumnLevel] {
        let criteria = FilterCriteria::default()
            .select(Field::County, ["A", "B", "C"])
            .with_range(Field::Commute, NumericRange::new(30.0, 50.0))
            .with_price(PriceFilter {
                kind: PriceKind::Asking,
                bedrooms: [bed(2)].into_iter().collect(),
                range: Some(NumericRange::new(250_000.0, 400_000.0)),
                mode,
            });
        let once = filter(&all, &criteria);
        assert!(once.rows().iter().all(|r| all.rows().contains(r)));
        let twice = filter(&once, &criteria);
        assert_eq!(once, twice);
    }
    Ok(())
}

#[test]
fn prices_are_coerced_and_yield_derived() -> Result<()> {
    let dir = TempDir::new()?;
    let table = load_towns(&dir)?;
    let ashford = &table.listings[0];
    assert_eq!(ashford.asking_price(bed(2)), Some(200_000.0));
    assert_eq!(ashford.commute, Some(60.0));
    assert_eq!(table.listings[3].asking_price(bed(2)), None);

    assert_eq!(rental_yield(Some(1_000.0), Some(240_000.0)), Some(5.0));
    assert_eq!(rental_yield(Some(1_000.0), Some(0.0)), None);
    assert_eq!(ashford.number(&Field::Yield(bed(2))), Some(6.0));
    assert_eq!(table.listings[2].number(&Field::Yield(bed(2))), None);
    Ok(())
}

#[test]
fn groups_without_values_report_no_data() -> Result<()> {
    let dir = TempDir::new()?;
    let table = load_towns(&dir)?;
    let view = TableView::all(&table);

    let result = aggregate(&view, &Field::County, &[Field::Asking(bed(2))], AggOp::Mean);
    assert_eq!(result.get("A"), Some(250_000.0));
    assert_eq!(result.get("B"), Some(250_000.0));

    let criteria = FilterCriteria::default().select(Field::County, ["B"]);
    let only_b = filter(&view, &criteria);
    let rents = aggregate(&only_b, &Field::County, &[Field::Rental(bed(2))], AggOp::Median);
    assert_eq!(rents.get("B"), Some(1_100.0));

    let counts = aggregate(&view, &Field::County, &[], AggOp::Count);
    assert_eq!(counts.get("C"), Some(1.0));
    Ok(())
}

#[test]
fn overall_average_is_a_mean_of_column_means() -> Result<()> {
    let dir = TempDir::new()?;
    let csv = concat!(
        "Town,County,1 Bed Asking Price,2 Bed Asking Price,3 Bed Asking Price\n",
        "T1,A,100,150,300\n",
        "T2,A,,250,\n",
        "T3,A,,200,\n",
    );
    let path = write_file(&dir, "means.csv", csv)?;
    let table = load_file(&path, &AppConfig::default().schema)?;
    let view = TableView::all(&table);
    let cols = [Field::Asking(bed(1)), Field::Asking(bed(2)), Field::Asking(bed(3))];
    assert_eq!(overall_average(&view, &cols), Some(200.0));
    Ok(())
}

#[test]
fn config_file_drives_the_rendered_panels() -> Result<()> {
    let dir = TempDir::new()?;
    let table = load_towns(&dir)?;
    let config_path = write_file(
        &dir,
        "dashboard.json",
        r#"{
            "title": "Commuter Towns",
            "panels": [
                { "kind": "count_bar", "title": "Towns per county", "field": "county" },
                { "kind": "bar", "title": "Rent by county", "group": "county",
                  "columns": { "selected_bedrooms": "rental" }, "op": "median" },
                { "kind": "histogram", "title": "Population", "column": "population" }
            ]
        }"#,
    )?;
    let config = AppConfig::from_path(&config_path)?;
    let criteria = initial_criteria(&table, &config.filters);
    let vm = render(&DashboardContext::new(&table, &criteria, &config));

    assert_eq!(vm.title, "Commuter Towns");
    assert_eq!(vm.matched_rows, 5);
    assert_eq!(vm.panels.len(), 3);
    match &vm.panels[0].body {
        PanelBody::Bar(series) => {
            assert_eq!(series.labels, vec!["A", "B", "C"]);
            assert_eq!(series.values, vec![2.0, 2.0, 1.0]);
        }
        other => panic!("expected a bar chart, got {other:?}"),
    }
    match &vm.panels[1].body {
        PanelBody::Bar(series) => assert_eq!(series.values, vec![1_125.0, 1_100.0, 1_500.0]),
        other => panic!("expected a bar chart, got {other:?}"),
    }
    assert_eq!(
        vm.panels[2].body,
        PanelBody::Unavailable("Population data not available".into())
    );
    Ok(())
}

#[test]
fn invalid_config_is_rejected() -> Result<()> {
    let dir = TempDir::new()?;
    let path = write_file(
        &dir,
        "bad.json",
        r#"{ "panels": [ { "kind": "histogram", "title": "x", "column": "commute", "bins": 0 } ] }"#,
    )?;
    assert!(AppConfig::from_path(&path).is_err());
    let path = write_file(&dir, "broken.json", "{ not json")?;
    assert!(AppConfig::from_path(&path).is_err());
    Ok(())
}

#[test]
fn no_matches_renders_a_notice() -> Result<()> {
    let dir = TempDir::new()?;
    let table = load_towns(&dir)?;
    let config = AppConfig::default();
    let criteria = initial_criteria(&table, &config.filters).select(Field::County, Vec::<String>::new());
    let vm = render(&DashboardContext::new(&table, &criteria, &config));
    assert_eq!(vm.notice.as_deref(), Some(NO_MATCHES));
    assert!(vm.panels.is_empty());
    Ok(())
}

#[test]
fn column_level_price_filter_keeps_rows() -> Result<()> {
    let dir = TempDir::new()?;
    let table = load_towns(&dir)?;
    let config = AppConfig {
        panels: vec![PanelSpec::Metric {
            title: "Average asking".into(),
            columns: Columns::SelectedBedrooms {
                selected_bedrooms: PriceKind::Asking,
            },
        }],
        ..Default::default()
    };
    let mut criteria = initial_criteria(&table, &config.filters);
    criteria.price = Some(PriceFilter {
        kind: PriceKind::Asking,
        bedrooms: [bed(2)].into_iter().collect(),
        range: Some(NumericRange::new(0.0, 260_000.0)),
        mode: PriceFilterMode::ColumnLevel,
    });
    let vm = render(&DashboardContext::new(&table, &criteria, &config));
    assert_eq!(vm.matched_rows, 5);
    assert_eq!(vm.column_counts, vec![("2 Bed Asking Price".to_string(), 2)]);
    assert_eq!(
        vm.panels[0].body,
        PanelBody::Metric {
            value: Some(225_000.0),
            unit: "Asking price".into()
        }
    );
    Ok(())
}

fn write_parquet(path: &Path) -> Result<()> {
    let schema = Arc::new(Schema::new(vec![
        ArrowField::new("Town", DataType::Utf8, false),
        ArrowField::new("County", DataType::Utf8, false),
        ArrowField::new("1 Bed Asking Price", DataType::Float64, true),
        ArrowField::new("Longitude", DataType::Float64, true),
    ]));
    let columns: Vec<ArrayRef> = vec![
        Arc::new(StringArray::from(vec!["Reading", "Luton"])),
        Arc::new(StringArray::from(vec!["Berkshire", "Bedfordshire"])),
        Arc::new(Float64Array::from(vec![Some(210_000.0), None])),
        Arc::new(Float64Array::from(vec![Some(-0.97), Some(-0.42)])),
    ];
    let batch = RecordBatch::try_new(schema.clone(), columns)?;
    let mut writer = ArrowWriter::try_new(std::fs::File::create(path)?, schema, None)?;
    writer.write(&batch)?;
    writer.close()?;
    Ok(())
}

#[test]
fn parquet_files_load_like_spreadsheets() -> Result<()> {
    let dir = TempDir::new()?;
    let path = dir.path().join("towns.parquet");
    write_parquet(&path)?;

    let table = load_file(&path, &AppConfig::default().schema)?;
    assert_eq!(table.len(), 2);
    assert_eq!(table.listings[0].asking_price(bed(1)), Some(210_000.0));
    assert_eq!(table.listings[1].asking_price(bed(1)), None);
    assert_eq!(table.listings[0].longitude, Some(-0.97));
    assert!(!table.has_field(&Field::Latitude));
    Ok(())
}

fn write_xlsx(path: &Path) -> Result<()> {
    let mut workbook = Workbook::new();
    let sheet = workbook.add_worksheet();
    let headers = ["Town", "County", "2 Bed\nAsking Price", "2 Bed Rental Price", "Longitude"];
    for (col, header) in headers.iter().enumerate() {
        sheet.write_string(0, col as u16, *header)?;
    }
    sheet.write_string(1, 0, "Reading")?;
    sheet.write_string(1, 1, "Berkshire")?;
    sheet.write_number(1, 2, 325_000)?;
    sheet.write_number(1, 3, 1_350.5)?;
    sheet.write_number(1, 4, -0.97)?;
    sheet.write_string(2, 0, "Luton")?;
    sheet.write_string(2, 1, "Bedfordshire")?;
    sheet.write_string(2, 2, "£250,000")?;
    sheet.write_string(2, 3, "N/A")?;
    sheet.write_string(2, 4, "-0.42")?;
    workbook.save(path)?;
    Ok(())
}

#[test]
fn xlsx_workbooks_load_through_the_same_mapping() -> Result<()> {
    let dir = TempDir::new()?;
    let path = dir.path().join("towns.xlsx");
    write_xlsx(&path)?;

    let table = load_file(&path, &AppConfig::default().schema)?;
    assert_eq!(table.len(), 2);
    assert_eq!(table.column_names[2], "2 Bed Asking Price");

    let reading = &table.listings[0];
    assert_eq!(reading.town, "Reading");
    assert_eq!(reading.asking_price(bed(2)), Some(325_000.0));
    assert_eq!(reading.rental_price(bed(2)), Some(1_350.5));
    assert_eq!(reading.longitude, Some(-0.97));

    let luton = &table.listings[1];
    assert_eq!(luton.asking_price(bed(2)), Some(250_000.0));
    assert_eq!(luton.rental_price(bed(2)), None);
    assert_eq!(luton.longitude, Some(-0.42));
    Ok(())
}

#[test]
fn unknown_sheet_name_is_reported() -> Result<()> {
    let dir = TempDir::new()?;
    let path = dir.path().join("towns.xlsx");
    write_xlsx(&path)?;

    let schema = DatasetSchema {
        sheet: Some("Nope".into()),
        ..Default::default()
    };
    let err = load_file(&path, &schema).unwrap_err();
    assert!(matches!(err, LoadError::MissingSheet(ref name) if name == "Nope"));

    let named = DatasetSchema {
        sheet: Some("Sheet1".into()),
        ..Default::default()
    };
    assert_eq!(load_file(&path, &named)?.len(), 2);
    Ok(())
}
