use std::sync::Arc;

use anyhow::Context;
use arrow::array::{ArrayRef, Float64Array, StringArray};
use arrow::datatypes::{DataType, Field, Schema};
use arrow::record_batch::RecordBatch;
use parquet::arrow::ArrowWriter;

/// Minimal deterministic PRNG (xoshiro256**)
struct SimpleRng {
    state: [u64; 4],
}

impl SimpleRng {
    fn new(seed: u64) -> Self {
        let mut s = [0u64; 4];
        let mut x = seed;
        for slot in &mut s {
            x = x.wrapping_mul(6364136223846793005).wrapping_add(1);
            *slot = x;
        }
        SimpleRng { state: s }
    }

    fn next_u64(&mut self) -> u64 {
        let result = (self.state[1].wrapping_mul(5))
            .rotate_left(7)
            .wrapping_mul(9);
        let t = self.state[1] << 17;
        self.state[2] ^= self.state[0];
        self.state[3] ^= self.state[1];
        self.state[1] ^= self.state[2];
        self.state[0] ^= self.state[3];
        self.state[2] ^= t;
        self.state[3] = self.state[3].rotate_left(45);
        result
    }

    fn next_f64(&mut self) -> f64 {
        (self.next_u64() >> 11) as f64 / (1u64 << 53) as f64
    }

    /// Box-Muller transform for normal distribution
    fn gauss(&mut self, mean: f64, std_dev: f64) -> f64 {
        let u1 = self.next_f64().max(1e-15);
        let u2 = self.next_f64();
        let z = (-2.0 * u1.ln()).sqrt() * (2.0 * std::f64::consts::PI * u2).cos();
        mean + std_dev * z
    }

    fn chance(&mut self, p: f64) -> bool {
        self.next_f64() < p
    }
}

/// County name, centre (lat, lon), 2-bed asking price level, commute base (mins).
const COUNTIES: [(&str, (f64, f64), f64, f64); 6] = [
    ("Kent", (51.20, 0.75), 310_000.0, 70.0),
    ("Surrey", (51.25, -0.45), 420_000.0, 50.0),
    ("Essex", (51.75, 0.55), 300_000.0, 60.0),
    ("Hertfordshire", (51.80, -0.25), 380_000.0, 45.0),
    ("Berkshire", (51.45, -1.05), 360_000.0, 55.0),
    ("Sussex", (50.95, -0.30), 330_000.0, 85.0),
];

const PREFIXES: [&str; 8] = ["Ash", "Oak", "Elm", "Brook", "Thorn", "Whit", "Ald", "Hazel"];
const SUFFIXES: [&str; 6] = ["ford", "ley", "bury", "ham", "field", "stead"];

/// 2-bed is the reference; other bedroom counts scale from it.
const BEDROOM_FACTORS: [f64; 4] = [0.7, 1.0, 1.35, 1.8];

struct Town {
    name: String,
    county: &'static str,
    population: f64,
    commute: f64,
    asking: [Option<f64>; 4],
    rental: [Option<f64>; 4],
    latitude: f64,
    longitude: f64,
}

fn generate_towns(rng: &mut SimpleRng) -> Vec<Town> {
    let mut towns = Vec::new();
    let mut n = 0usize;
    for &(county, (lat, lon), price, commute) in &COUNTIES {
        for _ in 0..8 {
            let name = format!(
                "{}{}",
                PREFIXES[(n + n / PREFIXES.len()) % PREFIXES.len()],
                SUFFIXES[(n / PREFIXES.len()) % SUFFIXES.len()]
            );
            n += 1;
            let level = rng.gauss(1.0, 0.15).max(0.5);
            let mut asking = [None; 4];
            let mut rental = [None; 4];
            for (i, factor) in BEDROOM_FACTORS.iter().enumerate() {
                // Some towns have no listings for a bedroom count.
                if rng.chance(0.08) {
                    continue;
                }
                let ask = (price * factor * level / 1000.0).round() * 1000.0;
                asking[i] = Some(ask);
                if !rng.chance(0.05) {
                    let gross_yield = rng.gauss(0.045, 0.006).clamp(0.025, 0.07);
                    rental[i] = Some((ask * gross_yield / 12.0).round());
                }
            }
            towns.push(Town {
                name,
                county,
                population: (rng.gauss(30_000.0, 15_000.0).max(2_000.0) / 100.0).round() * 100.0,
                commute: rng.gauss(commute, 12.0).max(15.0).round(),
                asking,
                rental,
                latitude: lat + rng.gauss(0.0, 0.12),
                longitude: lon + rng.gauss(0.0, 0.18),
            });
        }
    }
    towns
}

fn headers() -> Vec<String> {
    let mut h: Vec<String> = ["Town", "County", "Population", "Commute Time"]
        .iter()
        .map(|s| s.to_string())
        .collect();
    for b in 1..=4 {
        h.push(format!("{b} Bed Asking Price"));
    }
    for b in 1..=4 {
        h.push(format!("{b} Bed Rental Price"));
    }
    h.extend(["Latitude".to_string(), "Longitude".to_string()]);
    h
}

/// Prices formatted the way listing spreadsheets show them.
fn money(v: Option<f64>) -> String {
    let Some(v) = v else {
        return "N/A".to_string();
    };
    let digits = format!("{v:.0}");
    let mut grouped = String::new();
    for (i, c) in digits.chars().enumerate() {
        if i > 0 && (digits.len() - i) % 3 == 0 {
            grouped.push(',');
        }
        grouped.push(c);
    }
    format!("£{grouped}")
}

fn write_csv(path: &str, towns: &[Town]) -> anyhow::Result<()> {
    let mut writer = csv::Writer::from_path(path).with_context(|| format!("creating {path}"))?;
    writer.write_record(headers())?;
    for t in towns {
        let mut record = vec![
            t.name.clone(),
            t.county.to_string(),
            format!("{:.0}", t.population),
            format!("{:.0} mins", t.commute),
        ];
        record.extend(t.asking.iter().map(|v| money(*v)));
        record.extend(t.rental.iter().map(|v| money(*v)));
        record.push(format!("{:.4}", t.latitude));
        record.push(format!("{:.4}", t.longitude));
        writer.write_record(&record)?;
    }
    writer.flush()?;
    Ok(())
}

fn number_column(towns: &[Town], f: impl Fn(&Town) -> Option<f64>) -> ArrayRef {
    Arc::new(towns.iter().map(f).collect::<Float64Array>())
}

fn write_parquet(path: &str, towns: &[Town]) -> anyhow::Result<()> {
    let names = headers();
    let mut fields = vec![
        Field::new(&names[0], DataType::Utf8, false),
        Field::new(&names[1], DataType::Utf8, false),
    ];
    fields.extend(
        names[2..]
            .iter()
            .map(|n| Field::new(n, DataType::Float64, true)),
    );
    let schema = Arc::new(Schema::new(fields));

    let mut columns: Vec<ArrayRef> = vec![
        Arc::new(StringArray::from_iter_values(towns.iter().map(|t| t.name.as_str()))),
        Arc::new(StringArray::from_iter_values(towns.iter().map(|t| t.county))),
        number_column(towns, |t| Some(t.population)),
        number_column(towns, |t| Some(t.commute)),
    ];
    for i in 0..4 {
        columns.push(number_column(towns, |t| t.asking[i]));
    }
    for i in 0..4 {
        columns.push(number_column(towns, |t| t.rental[i]));
    }
    columns.push(number_column(towns, |t| Some(t.latitude)));
    columns.push(number_column(towns, |t| Some(t.longitude)));

    let batch = RecordBatch::try_new(schema.clone(), columns)
        .context("Failed to create RecordBatch")?;

    let file = std::fs::File::create(path).with_context(|| format!("creating {path}"))?;
    let mut writer = ArrowWriter::try_new(file, schema, None).context("Failed to create writer")?;
    writer.write(&batch).context("Failed to write batch")?;
    writer.close().context("Failed to close writer")?;
    Ok(())
}

fn main() -> anyhow::Result<()> {
    env_logger::init();
    let mut rng = SimpleRng::new(42);
    let towns = generate_towns(&mut rng);

    let csv_path = "sample_towns.csv";
    let parquet_path = "sample_towns.parquet";
    write_csv(csv_path, &towns)?;
    write_parquet(parquet_path, &towns)?;

    log::info!("Generated {} towns in {} counties", towns.len(), COUNTIES.len());
    println!("Wrote {} towns to {csv_path} and {parquet_path}", towns.len());
    Ok(())
}
