use std::borrow::Cow;
use std::collections::{BTreeMap, BTreeSet};
use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

// ---------------------------------------------------------------------------
// CellValue – a single raw cell read from the source file
// ---------------------------------------------------------------------------

/// A raw cell as read from CSV, spreadsheet, JSON or Parquet input.
#[derive(Debug, Clone, PartialEq)]
pub enum CellValue {
    Text(String),
    Number(f64),
    Missing,
}

impl fmt::Display for CellValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            CellValue::Text(s) => write!(f, "{s}"),
            CellValue::Number(v) => write!(f, "{v}"),
            CellValue::Missing => Ok(()),
        }
    }
}

impl CellValue {
    /// Numeric view of the cell, without any coercion of text.
    pub fn as_f64(&self) -> Option<f64> {
        match self {
            CellValue::Number(v) if v.is_finite() => Some(*v),
            _ => None,
        }
    }
}

// ---------------------------------------------------------------------------
// Bedrooms / PriceKind
// ---------------------------------------------------------------------------

/// Bedroom count of a price column (1 to 4).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(try_from = "u8", into = "u8")]
pub struct Bedrooms(u8);

impl Bedrooms {
    pub const MAX: u8 = 4;

    pub const ALL: [Bedrooms; 4] = [Bedrooms(1), Bedrooms(2), Bedrooms(3), Bedrooms(4)];

    pub fn new(n: u8) -> Option<Self> {
        (1..=Self::MAX).contains(&n).then_some(Bedrooms(n))
    }

    pub fn get(self) -> u8 {
        self.0
    }

    fn index(self) -> usize {
        usize::from(self.0 - 1)
    }
}

impl TryFrom<u8> for Bedrooms {
    type Error = String;

    fn try_from(n: u8) -> Result<Self, Self::Error> {
        Bedrooms::new(n).ok_or_else(|| format!("bedroom count must be 1-{}, got {n}", Self::MAX))
    }
}

impl From<Bedrooms> for u8 {
    fn from(b: Bedrooms) -> u8 {
        b.0
    }
}

impl fmt::Display for Bedrooms {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Which of the two per-bedroom price families a filter or chart refers to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PriceKind {
    #[default]
    Asking,
    Rental,
}

impl PriceKind {
    pub fn field(self, bedrooms: Bedrooms) -> Field {
        match self {
            PriceKind::Asking => Field::Asking(bedrooms),
            PriceKind::Rental => Field::Rental(bedrooms),
        }
    }
}

impl fmt::Display for PriceKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            PriceKind::Asking => write!(f, "Asking price"),
            PriceKind::Rental => write!(f, "Monthly rent"),
        }
    }
}

// ---------------------------------------------------------------------------
// Field – typed reference to a listing attribute
// ---------------------------------------------------------------------------

/// A listing attribute that filters, aggregates and charts can refer to.
///
/// Written in configuration as `town`, `county`, `population`, `commute`,
/// `asking_<n>`, `rental_<n>`, `yield_<n>`, `latitude`, `longitude` or
/// `extra:<column name>`.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub enum Field {
    Town,
    County,
    Population,
    Commute,
    Asking(Bedrooms),
    Rental(Bedrooms),
    /// Gross rental yield, derived per row from rent and asking price.
    Yield(Bedrooms),
    Latitude,
    Longitude,
    Extra(String),
}

impl Field {
    /// Human readable name for axis labels and headings.
    pub fn label(&self) -> String {
        match self {
            Field::Town => "Town".to_string(),
            Field::County => "County".to_string(),
            Field::Population => "Population".to_string(),
            Field::Commute => "Commute Time".to_string(),
            Field::Asking(b) => format!("{b} Bed Asking Price"),
            Field::Rental(b) => format!("{b} Bed Monthly Rent"),
            Field::Yield(b) => format!("{b} Bed Rental Yield (%)"),
            Field::Latitude => "Latitude".to_string(),
            Field::Longitude => "Longitude".to_string(),
            Field::Extra(name) => name.clone(),
        }
    }

    /// Fields filtered by membership rather than by range.
    pub fn is_categorical(&self) -> bool {
        matches!(self, Field::Town | Field::County)
    }
}

impl fmt::Display for Field {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Field::Town => write!(f, "town"),
            Field::County => write!(f, "county"),
            Field::Population => write!(f, "population"),
            Field::Commute => write!(f, "commute"),
            Field::Asking(b) => write!(f, "asking_{b}"),
            Field::Rental(b) => write!(f, "rental_{b}"),
            Field::Yield(b) => write!(f, "yield_{b}"),
            Field::Latitude => write!(f, "latitude"),
            Field::Longitude => write!(f, "longitude"),
            Field::Extra(name) => write!(f, "extra:{name}"),
        }
    }
}

impl FromStr for Field {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let s = s.trim();
        if let Some(name) = s.strip_prefix("extra:") {
            return Ok(Field::Extra(name.trim().to_string()));
        }
        let field = match s {
            "town" => Field::Town,
            "county" | "region" => Field::County,
            "population" => Field::Population,
            "commute" => Field::Commute,
            "latitude" | "lat" => Field::Latitude,
            "longitude" | "lon" => Field::Longitude,
            other => {
                let (family, n) = other
                    .rsplit_once('_')
                    .ok_or_else(|| format!("unknown field '{other}'"))?;
                let bedrooms = n
                    .parse::<u8>()
                    .ok()
                    .and_then(Bedrooms::new)
                    .ok_or_else(|| format!("invalid bedroom count in field '{other}'"))?;
                match family {
                    "asking" => Field::Asking(bedrooms),
                    "rental" => Field::Rental(bedrooms),
                    "yield" => Field::Yield(bedrooms),
                    _ => return Err(format!("unknown field '{other}'")),
                }
            }
        };
        Ok(field)
    }
}

impl TryFrom<String> for Field {
    type Error = String;

    fn try_from(s: String) -> Result<Self, Self::Error> {
        s.parse()
    }
}

impl From<Field> for String {
    fn from(f: Field) -> String {
        f.to_string()
    }
}

// ---------------------------------------------------------------------------
// Listing – one row of the source table
// ---------------------------------------------------------------------------

/// Gross rental yield in percent: `monthly_rent * 12 / asking * 100`.
///
/// Missing inputs, or an asking price of zero, give `None`.
pub fn rental_yield(monthly_rent: Option<f64>, asking: Option<f64>) -> Option<f64> {
    let rent = monthly_rent?;
    let asking = asking?;
    if asking == 0.0 {
        return None;
    }
    let y = rent * 12.0 / asking * 100.0;
    y.is_finite().then_some(y)
}

/// A single town (one row of the source spreadsheet).
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Listing {
    pub town: String,
    pub county: String,
    pub population: Option<f64>,
    /// Commute time in minutes.
    pub commute: Option<f64>,
    /// Asking price indexed by bedroom count - 1.
    pub asking: [Option<f64>; 4],
    /// Monthly rent indexed by bedroom count - 1.
    pub rental: [Option<f64>; 4],
    pub latitude: Option<f64>,
    pub longitude: Option<f64>,
    /// Columns not mapped to a known field, keyed by normalized header.
    pub extra: BTreeMap<String, CellValue>,
}

impl Listing {
    pub fn asking_price(&self, b: Bedrooms) -> Option<f64> {
        self.asking[b.index()]
    }

    pub fn rental_price(&self, b: Bedrooms) -> Option<f64> {
        self.rental[b.index()]
    }

    pub fn set_asking_price(&mut self, b: Bedrooms, value: Option<f64>) {
        self.asking[b.index()] = value;
    }

    pub fn set_rental_price(&mut self, b: Bedrooms, value: Option<f64>) {
        self.rental[b.index()] = value;
    }

    /// Numeric value of `field`, `None` when missing or not numeric.
    pub fn number(&self, field: &Field) -> Option<f64> {
        match field {
            Field::Town | Field::County => None,
            Field::Population => self.population,
            Field::Commute => self.commute,
            Field::Asking(b) => self.asking_price(*b),
            Field::Rental(b) => self.rental_price(*b),
            Field::Yield(b) => rental_yield(self.rental_price(*b), self.asking_price(*b)),
            Field::Latitude => self.latitude,
            Field::Longitude => self.longitude,
            Field::Extra(name) => self.extra.get(name).and_then(CellValue::as_f64),
        }
    }

    /// Text value of `field` for grouping and display.
    pub fn text(&self, field: &Field) -> Option<Cow<'_, str>> {
        match field {
            Field::Town => Some(Cow::Borrowed(self.town.as_str())),
            Field::County => {
                (!self.county.is_empty()).then_some(Cow::Borrowed(self.county.as_str()))
            }
            Field::Extra(name) => match self.extra.get(name)? {
                CellValue::Text(s) if !s.trim().is_empty() => Some(Cow::Borrowed(s.as_str())),
                CellValue::Number(v) if v.is_finite() => Some(Cow::Owned(format_number(*v))),
                _ => None,
            },
            other => self.number(other).map(|v| Cow::Owned(format_number(v))),
        }
    }
}

/// Format a number for tables and labels: integers without decimals.
pub fn format_number(v: f64) -> String {
    if v.fract() == 0.0 && v.abs() < 1e15 {
        format!("{v:.0}")
    } else {
        format!("{v:.2}")
    }
}

// ---------------------------------------------------------------------------
// ListingTable – the loaded collection with column metadata
// ---------------------------------------------------------------------------

/// The full loaded dataset: all listings plus column metadata.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ListingTable {
    pub listings: Vec<Listing>,
    /// Normalized header names in source order.
    pub column_names: Vec<String>,
    /// Fields whose source column was present.
    pub available: BTreeSet<Field>,
    /// For each categorical field the sorted set of unique values.
    pub unique_values: BTreeMap<Field, BTreeSet<String>>,
}

impl ListingTable {
    /// Build the column indices from loaded listings.
    pub fn from_listings(
        listings: Vec<Listing>,
        column_names: Vec<String>,
        available: BTreeSet<Field>,
    ) -> Self {
        let mut unique_values: BTreeMap<Field, BTreeSet<String>> = BTreeMap::new();
        for field in [Field::Town, Field::County] {
            let values = listings
                .iter()
                .filter_map(|l| l.text(&field))
                .map(|s| s.into_owned())
                .collect();
            unique_values.insert(field, values);
        }
        ListingTable {
            listings,
            column_names,
            available,
            unique_values,
        }
    }

    /// Whether the source file carried data for `field`.
    pub fn has_field(&self, field: &Field) -> bool {
        match field {
            Field::Yield(b) => {
                self.available.contains(&Field::Asking(*b))
                    && self.available.contains(&Field::Rental(*b))
            }
            other => self.available.contains(other),
        }
    }

    /// Price fields of the given kind present in the source, by bedroom count.
    pub fn price_fields(&self, kind: PriceKind) -> Vec<Field> {
        Bedrooms::ALL
            .iter()
            .map(|b| kind.field(*b))
            .filter(|f| self.has_field(f))
            .collect()
    }

    /// Number of listings.
    pub fn len(&self) -> usize {
        self.listings.len()
    }

    /// Whether the table is empty.
    pub fn is_empty(&self) -> bool {
        self.listings.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn two_bed() -> Bedrooms {
        Bedrooms::new(2).unwrap()
    }

    #[test]
    fn yield_from_rent_and_asking() {
        let y = rental_yield(Some(1000.0), Some(240_000.0)).unwrap();
        assert!((y - 5.0).abs() < 1e-12);
    }

    #[test]
    fn yield_missing_on_zero_or_missing_asking() {
        assert_eq!(rental_yield(Some(1000.0), Some(0.0)), None);
        assert_eq!(rental_yield(Some(1000.0), None), None);
        assert_eq!(rental_yield(None, Some(240_000.0)), None);
    }

    #[test]
    fn field_names_parse_and_print() {
        for name in ["town", "county", "asking_2", "rental_4", "yield_1", "extra:Rank"] {
            let field: Field = name.parse().unwrap();
            assert_eq!(field.to_string(), name);
        }
        assert_eq!("region".parse::<Field>().unwrap(), Field::County);
        assert!("asking_5".parse::<Field>().is_err());
        assert!("price".parse::<Field>().is_err());
    }

    #[test]
    fn field_deserializes_from_json_string() {
        let fields: Vec<Field> = serde_json::from_str(r#"["yield_3", "commute"]"#).unwrap();
        assert_eq!(
            fields,
            vec![Field::Yield(Bedrooms::new(3).unwrap()), Field::Commute]
        );
    }

    #[test]
    fn listing_derives_yield_per_row() {
        let mut l = Listing::default();
        l.set_asking_price(two_bed(), Some(240_000.0));
        l.set_rental_price(two_bed(), Some(1000.0));
        let y = l.number(&Field::Yield(two_bed())).unwrap();
        assert!((y - 5.0).abs() < 1e-12);
        assert_eq!(l.text(&Field::Asking(two_bed())).as_deref(), Some("240000"));
    }

    #[test]
    fn yield_available_only_with_both_price_columns() {
        let available: BTreeSet<Field> = [Field::Town, Field::County, Field::Asking(two_bed())]
            .into_iter()
            .collect();
        let table = ListingTable::from_listings(Vec::new(), Vec::new(), available);
        assert!(!table.has_field(&Field::Yield(two_bed())));
        assert_eq!(table.price_fields(PriceKind::Asking), vec![Field::Asking(two_bed())]);
    }
}
