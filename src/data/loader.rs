use std::collections::{BTreeMap, BTreeSet};
use std::io::Read;
use std::path::Path;

use arrow::array::{Array, AsArray};
use arrow::datatypes::{DataType, Float64Type};
use arrow::util::display::array_value_to_string;
use calamine::{open_workbook_auto, Data, Reader};
use parquet::arrow::arrow_reader::ParquetRecordBatchReaderBuilder;
use serde_json::Value as JsonValue;

use super::coerce::{coerce_cell, normalize_header, parse_coordinate};
use super::model::{format_number, Bedrooms, CellValue, Field, Listing, ListingTable};
use crate::config::{ColumnNames, DatasetSchema};
use crate::error::LoadError;

// ---------------------------------------------------------------------------
// Public entry-point
// ---------------------------------------------------------------------------

/// Raw rows read from a source file, before any column mapping.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct RawTable {
    pub headers: Vec<String>,
    pub rows: Vec<Vec<CellValue>>,
}

/// Load a listings table from a file.  Dispatch by extension.
///
/// Supported formats:
/// * `.xlsx` / `.xlsm` / `.xlsb` / `.xls` / `.ods` – first sheet (or `schema.sheet`)
/// * `.csv`, `.tsv` / `.txt` (tab separated) – header row then one town per row
/// * `.json`    – `[{ "Town": "...", "County": "...", ... }, ...]`
/// * `.parquet` – flat columns, one town per row
pub fn load_file(path: &Path, schema: &DatasetSchema) -> Result<ListingTable, LoadError> {
    let raw = read_raw(path, schema.sheet.as_deref())?;
    let table = build_table(raw, schema)?;
    log::info!(
        "Loaded {} towns from {} ({} columns)",
        table.len(),
        path.display(),
        table.column_names.len()
    );
    Ok(table)
}

/// Read `path` into a [`RawTable`] without interpreting any column.
pub fn read_raw(path: &Path, sheet: Option<&str>) -> Result<RawTable, LoadError> {
    let ext = path
        .extension()
        .and_then(|e| e.to_str())
        .unwrap_or("")
        .to_ascii_lowercase();

    match ext.as_str() {
        "csv" => read_delimited(open(path)?, b','),
        "tsv" | "txt" => read_delimited(open(path)?, b'\t'),
        "xlsx" | "xlsm" | "xlsb" | "xls" | "ods" => read_spreadsheet(path, sheet),
        "json" => read_json(open(path)?),
        "parquet" | "pq" => read_parquet(path),
        other => Err(LoadError::UnsupportedFormat(other.to_string())),
    }
}

fn open(path: &Path) -> Result<std::fs::File, LoadError> {
    std::fs::File::open(path).map_err(|source| LoadError::Io {
        path: path.to_path_buf(),
        source,
    })
}

// ---------------------------------------------------------------------------
// Delimited text
// ---------------------------------------------------------------------------

/// Header row with column names, then one row per town. Every row must have
/// as many fields as the header.
pub fn read_delimited<R: Read>(reader: R, delimiter: u8) -> Result<RawTable, LoadError> {
    let mut reader = csv::ReaderBuilder::new()
        .delimiter(delimiter)
        .has_headers(true)
        .from_reader(reader);
    let headers: Vec<String> = reader.headers()?.iter().map(str::to_string).collect();
    if headers.iter().all(|h| h.trim().is_empty()) {
        return Err(LoadError::Malformed("no header row".into()));
    }

    let mut rows = Vec::new();
    for record in reader.records() {
        let record = record?;
        rows.push(record.iter().map(text_cell).collect());
    }
    Ok(RawTable { headers, rows })
}

fn text_cell(s: &str) -> CellValue {
    if s.trim().is_empty() {
        CellValue::Missing
    } else {
        CellValue::Text(s.to_string())
    }
}

// ---------------------------------------------------------------------------
// Spreadsheets
// ---------------------------------------------------------------------------

fn read_spreadsheet(path: &Path, sheet: Option<&str>) -> Result<RawTable, LoadError> {
    let mut workbook = open_workbook_auto(path)?;
    let range = match sheet {
        Some(name) => {
            if !workbook.sheet_names().iter().any(|s| s == name) {
                return Err(LoadError::MissingSheet(name.to_string()));
            }
            workbook.worksheet_range(name)?
        }
        None => workbook
            .worksheet_range_at(0)
            .ok_or_else(|| LoadError::Malformed("workbook has no worksheets".into()))??,
    };

    let mut rows = range.rows();
    let headers: Vec<String> = rows
        .next()
        .ok_or_else(|| LoadError::Malformed("sheet is empty".into()))?
        .iter()
        .map(|c| c.to_string())
        .collect();
    let rows = rows
        .map(|r| r.iter().map(spreadsheet_cell).collect())
        .collect();
    Ok(RawTable { headers, rows })
}

fn spreadsheet_cell(cell: &Data) -> CellValue {
    match cell {
        Data::Int(i) => CellValue::Number(*i as f64),
        Data::Float(f) => CellValue::Number(*f),
        Data::String(s) => text_cell(s),
        Data::Empty | Data::Error(_) => CellValue::Missing,
        other => CellValue::Text(other.to_string()),
    }
}

// ---------------------------------------------------------------------------
// JSON
// ---------------------------------------------------------------------------

/// Expected JSON schema (records-oriented, the default `df.to_json(orient='records')`):
///
/// ```json
/// [
///   { "Town": "Reading", "County": "Berkshire", "2 Bed Asking Price": "£325,000" },
///   ...
/// ]
/// ```
fn read_json<R: Read>(reader: R) -> Result<RawTable, LoadError> {
    let root: JsonValue = serde_json::from_reader(reader)?;
    let records = root
        .as_array()
        .ok_or_else(|| LoadError::Malformed("expected a top-level JSON array".into()))?;

    let mut headers: Vec<String> = Vec::new();
    let mut objects = Vec::with_capacity(records.len());
    for (i, rec) in records.iter().enumerate() {
        let obj = rec
            .as_object()
            .ok_or_else(|| LoadError::Malformed(format!("record {i} is not a JSON object")))?;
        for key in obj.keys() {
            if !headers.contains(key) {
                headers.push(key.clone());
            }
        }
        objects.push(obj);
    }

    let rows = objects
        .iter()
        .map(|obj| {
            headers
                .iter()
                .map(|h| obj.get(h).map_or(CellValue::Missing, json_cell))
                .collect()
        })
        .collect();
    Ok(RawTable { headers, rows })
}

fn json_cell(val: &JsonValue) -> CellValue {
    match val {
        JsonValue::String(s) => text_cell(s),
        JsonValue::Number(n) => n.as_f64().map_or(CellValue::Missing, CellValue::Number),
        JsonValue::Bool(b) => CellValue::Text(b.to_string()),
        JsonValue::Null => CellValue::Missing,
        other => CellValue::Text(other.to_string()),
    }
}

// ---------------------------------------------------------------------------
// Parquet
// ---------------------------------------------------------------------------

/// Load a Parquet file with one flat column per field.
///
/// Numeric columns of any width are widened to `f64`, string columns are kept
/// as text, and anything else is rendered to text with Arrow's formatter.
/// Works with files written by both **Pandas** and **Polars**.
fn read_parquet(path: &Path) -> Result<RawTable, LoadError> {
    let builder = ParquetRecordBatchReaderBuilder::try_new(open(path)?)?;
    let headers: Vec<String> = builder
        .schema()
        .fields()
        .iter()
        .map(|f| f.name().clone())
        .collect();
    let reader = builder.build()?;

    let mut rows: Vec<Vec<CellValue>> = Vec::new();
    for batch in reader {
        let batch = batch?;
        let columns = batch
            .columns()
            .iter()
            .map(arrow_column_cells)
            .collect::<Result<Vec<_>, _>>()?;
        for row in 0..batch.num_rows() {
            rows.push(columns.iter().map(|col| col[row].clone()).collect());
        }
    }
    Ok(RawTable { headers, rows })
}

fn arrow_column_cells(col: &arrow::array::ArrayRef) -> Result<Vec<CellValue>, LoadError> {
    let data_type = col.data_type();
    if data_type.is_numeric() {
        let widened = arrow::compute::cast(col, &DataType::Float64)?;
        let values = widened.as_primitive::<Float64Type>();
        return Ok(values
            .iter()
            .map(|v| v.map_or(CellValue::Missing, CellValue::Number))
            .collect());
    }
    match data_type {
        DataType::Utf8 => Ok(col
            .as_string::<i32>()
            .iter()
            .map(|v| v.map_or(CellValue::Missing, text_cell))
            .collect()),
        DataType::LargeUtf8 => Ok(col
            .as_string::<i64>()
            .iter()
            .map(|v| v.map_or(CellValue::Missing, text_cell))
            .collect()),
        _ => (0..col.len())
            .map(|row| {
                if col.is_null(row) {
                    Ok(CellValue::Missing)
                } else {
                    Ok(CellValue::Text(array_value_to_string(col, row)?))
                }
            })
            .collect(),
    }
}

// ---------------------------------------------------------------------------
// Column mapping
// ---------------------------------------------------------------------------

/// Header positions of every schema field found in the source.
struct ColumnMap {
    town: usize,
    county: usize,
    numeric: Vec<(Field, usize)>,
    extras: Vec<(String, usize, bool)>,
}

impl ColumnMap {
    fn resolve(headers: &[String], schema: &DatasetSchema) -> Result<Self, LoadError> {
        let find = |names: &ColumnNames| {
            names.0.iter().find_map(|name| {
                let name = normalize_header(name);
                headers.iter().position(|h| h.eq_ignore_ascii_case(&name))
            })
        };
        let required = |field: &str, names: &ColumnNames| {
            find(names).ok_or_else(|| LoadError::MissingColumn {
                field: field.to_string(),
                candidates: names.describe(),
            })
        };
        let town = required("town", &schema.town)?;
        let county = required("county", &schema.county)?;

        let mut optional: Vec<(Field, &ColumnNames)> = vec![
            (Field::Population, &schema.population),
            (Field::Commute, &schema.commute),
            (Field::Latitude, &schema.latitude),
            (Field::Longitude, &schema.longitude),
        ];
        for b in Bedrooms::ALL {
            if let Some(names) = schema.asking.get(&b) {
                optional.push((Field::Asking(b), names));
            }
            if let Some(names) = schema.rental.get(&b) {
                optional.push((Field::Rental(b), names));
            }
        }

        let mut numeric = Vec::new();
        for (field, names) in optional {
            match find(names) {
                Some(idx) => numeric.push((field, idx)),
                None => log::warn!("No column for {} (looked for {})", field.label(), names.describe()),
            }
        }

        let mapped: BTreeSet<usize> = [town, county]
            .into_iter()
            .chain(numeric.iter().map(|(_, i)| *i))
            .collect();
        let numeric_extras: BTreeSet<String> = schema
            .numeric_columns
            .iter()
            .map(|n| normalize_header(n).to_lowercase())
            .collect();
        let extras = headers
            .iter()
            .enumerate()
            .filter(|(i, h)| !mapped.contains(i) && !h.is_empty())
            .map(|(i, h)| (h.clone(), i, numeric_extras.contains(&h.to_lowercase())))
            .collect();

        Ok(ColumnMap {
            town,
            county,
            numeric,
            extras,
        })
    }

    fn available(&self) -> BTreeSet<Field> {
        [Field::Town, Field::County]
            .into_iter()
            .chain(self.numeric.iter().map(|(f, _)| f.clone()))
            .chain(self.extras.iter().map(|(name, _, _)| Field::Extra(name.clone())))
            .collect()
    }
}

fn cell_text(row: &[CellValue], idx: usize) -> String {
    match row.get(idx) {
        Some(CellValue::Text(s)) => s.trim().to_string(),
        Some(CellValue::Number(v)) => format_number(*v),
        _ => String::new(),
    }
}

/// Map raw rows onto listings according to `schema`.
///
/// Headers are normalized first. Town and county columns are required; other
/// fields are optional and left missing when their column is absent. Rows
/// without a town name are skipped.
pub fn build_table(raw: RawTable, schema: &DatasetSchema) -> Result<ListingTable, LoadError> {
    let headers: Vec<String> = raw.headers.iter().map(|h| normalize_header(h)).collect();
    let map = ColumnMap::resolve(&headers, schema)?;

    let mut listings = Vec::with_capacity(raw.rows.len());
    for (row_no, row) in raw.rows.iter().enumerate() {
        let town = cell_text(row, map.town);
        if town.is_empty() {
            log::debug!("Skipping row {row_no}: no town name");
            continue;
        }
        let mut listing = Listing {
            town,
            county: cell_text(row, map.county),
            ..Default::default()
        };
        for (field, idx) in &map.numeric {
            let cell = row.get(*idx);
            let value = match field {
                Field::Latitude | Field::Longitude => cell.and_then(parse_coordinate),
                _ => cell.and_then(coerce_cell),
            };
            match field {
                Field::Population => listing.population = value,
                Field::Commute => listing.commute = value,
                Field::Latitude => listing.latitude = value,
                Field::Longitude => listing.longitude = value,
                Field::Asking(b) => listing.set_asking_price(*b, value),
                Field::Rental(b) => listing.set_rental_price(*b, value),
                _ => {}
            }
        }
        let mut extra = BTreeMap::new();
        for (name, idx, numeric) in &map.extras {
            let cell = row.get(*idx).cloned().unwrap_or(CellValue::Missing);
            let cell = if *numeric {
                coerce_cell(&cell).map_or(CellValue::Missing, CellValue::Number)
            } else {
                cell
            };
            extra.insert(name.clone(), cell);
        }
        listing.extra = extra;
        listings.push(listing);
    }

    let available = map.available();
    Ok(ListingTable::from_listings(listings, headers, available))
}
