//! Writes a synthetic patient/event dataset as CSV and Parquet.

use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use anyhow::{Context, Result};
use arrow::array::{ArrayRef, BooleanArray, Date32Array, Float64Array, StringArray, TimestampMillisecondArray};
use arrow::datatypes::{DataType, Field, Schema, TimeUnit};
use arrow::record_batch::RecordBatch;
use clap::Parser;
use parquet::arrow::ArrowWriter;

use cohort_explorer::data::columns::{parse_bool, parse_date_millis, parse_number, parse_timestamp_millis};
use cohort_explorer::data::loader::COLUMN_TYPE_METADATA_KEY;
use cohort_explorer::data::model::ColumnType;

const DAY_MILLIS: i64 = 86_400_000;
/// 2020-01-01T00:00:00Z
const FIRST_EVENT_MILLIS: i64 = 1_577_836_800_000;

#[derive(Parser)]
#[command(about = "Generate a synthetic patients/events dataset")]
struct Args {
    /// Output directory.
    #[arg(default_value = "sample_data")]
    out_dir: PathBuf,

    /// Number of patients.
    #[arg(long, default_value_t = 200)]
    patients: usize,

    #[arg(long, default_value_t = 42)]
    seed: u64,
}

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
        let result = self.state[1].wrapping_mul(5).rotate_left(7).wrapping_mul(9);
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

    fn below(&mut self, n: u64) -> u64 {
        self.next_u64() % n.max(1)
    }

    fn pick<'a>(&mut self, items: &[&'a str]) -> &'a str {
        items[self.below(items.len() as u64) as usize]
    }

    /// Box-Muller transform for normal distribution
    fn gauss(&mut self, mean: f64, std_dev: f64) -> f64 {
        let u1 = self.next_f64().max(1e-15);
        let u2 = self.next_f64();
        let z = (-2.0 * u1.ln()).sqrt() * (2.0 * std::f64::consts::PI * u2).cos();
        mean + std_dev * z
    }
}

/// Column layout plus raw string rows, as both file formats carry them.
struct SampleTable {
    columns: Vec<(&'static str, ColumnType)>,
    rows: Vec<Vec<String>>,
}

fn patients(rng: &mut SimpleRng, count: usize) -> SampleTable {
    let names = ["Jessica", "Peter", "Amira", "Jonas", "Mei", "Carlos", "Olga", "Tariq"];
    let blood_types = ["A", "B", "AB", "0"];
    // Embedding clusters, roughly one per blood type.
    let centers = [(-4.0, -2.0), (3.0, 4.0), (5.0, -3.0), (-1.0, 5.0)];

    let rows = (0..count)
        .map(|i| {
            let cluster = rng.below(centers.len() as u64) as usize;
            let (cx, cy) = centers[cluster];
            let age = 18 + rng.below(72) as i64;
            let birthday = chrono::DateTime::from_timestamp_millis(
                FIRST_EVENT_MILLIS - age * 365 * DAY_MILLIS - rng.below(365) as i64 * DAY_MILLIS,
            )
            .map(|d| d.format("%d.%m.%Y").to_string())
            .unwrap_or_default();
            vec![
                format!("P{:04}", i + 1),
                rng.pick(&names).to_string(),
                age.to_string(),
                (rng.next_f64() < 0.25).to_string(),
                birthday,
                blood_types[cluster].to_string(),
                format!("{:.3}", rng.gauss(cx, 1.0)),
                format!("{:.3}", rng.gauss(cy, 1.0)),
            ]
        })
        .collect();

    SampleTable {
        columns: vec![
            ("PID", ColumnType::Pid),
            ("Name", ColumnType::String),
            ("Age", ColumnType::Number),
            ("Smoker", ColumnType::Boolean),
            ("Birthday", ColumnType::Date),
            ("Blood Type", ColumnType::Category),
            ("2D X", ColumnType::Number),
            ("2D Y", ColumnType::Number),
        ],
        rows,
    }
}

fn events(rng: &mut SimpleRng, patients: &SampleTable) -> SampleTable {
    let kinds = ["Visit", "Lab", "Diagnosis", "Medication"];
    let mut rows = Vec::new();
    for patient in &patients.rows {
        let mut millis = FIRST_EVENT_MILLIS + rng.below(365) as i64 * DAY_MILLIS;
        for _ in 0..1 + rng.below(6) {
            millis += rng.below(120 * DAY_MILLIS as u64) as i64;
            rows.push(vec![
                format!("E{:05}", rows.len() + 1),
                patient[0].clone(),
                rng.pick(&kinds).to_string(),
                millis.to_string(),
                format!("{:.1}", rng.gauss(100.0, 15.0)),
            ]);
        }
    }

    SampleTable {
        columns: vec![
            ("EID", ColumnType::Eid),
            ("PID", ColumnType::Pid),
            ("Kind", ColumnType::Category),
            ("Timestamp", ColumnType::Timestamp),
            ("Value", ColumnType::Number),
        ],
        rows,
    }
}

fn write_csv(path: &Path, table: &SampleTable) -> Result<()> {
    let mut writer =
        csv::Writer::from_path(path).with_context(|| format!("creating {}", path.display()))?;
    writer.write_record(table.columns.iter().map(|(name, _)| *name))?;
    writer.write_record(table.columns.iter().map(|(_, t)| t.as_str()))?;
    for row in &table.rows {
        writer.write_record(row)?;
    }
    writer.flush()?;
    Ok(())
}

/// Typed Arrow column for one table column; the declared type also goes
/// into the field metadata so loading does not depend on inference.
fn arrow_column(table: &SampleTable, index: usize) -> (Field, ArrayRef) {
    let (name, column_type) = table.columns[index];
    let cells = table.rows.iter().map(|row| row[index].as_str());
    let (data_type, array): (DataType, ArrayRef) = match column_type {
        ColumnType::Number => (
            DataType::Float64,
            Arc::new(cells.map(parse_number).collect::<Float64Array>()),
        ),
        ColumnType::Boolean => (
            DataType::Boolean,
            Arc::new(cells.map(parse_bool).collect::<BooleanArray>()),
        ),
        ColumnType::Date => (
            DataType::Date32,
            Arc::new(
                cells
                    .map(|c| parse_date_millis(c).map(|m| (m / DAY_MILLIS) as i32))
                    .collect::<Date32Array>(),
            ),
        ),
        ColumnType::Timestamp => (
            DataType::Timestamp(TimeUnit::Millisecond, None),
            Arc::new(cells.map(parse_timestamp_millis).collect::<TimestampMillisecondArray>()),
        ),
        _ => (DataType::Utf8, Arc::new(cells.map(Some).collect::<StringArray>())),
    };
    let metadata = HashMap::from([(
        COLUMN_TYPE_METADATA_KEY.to_string(),
        column_type.as_str().to_string(),
    )]);
    (Field::new(name, data_type, true).with_metadata(metadata), array)
}

fn write_parquet(path: &Path, table: &SampleTable) -> Result<()> {
    let (fields, arrays): (Vec<Field>, Vec<ArrayRef>) =
        (0..table.columns.len()).map(|i| arrow_column(table, i)).unzip();
    let schema = Arc::new(Schema::new(fields));
    let batch = RecordBatch::try_new(schema.clone(), arrays).context("building record batch")?;

    let file = std::fs::File::create(path).with_context(|| format!("creating {}", path.display()))?;
    let mut writer = ArrowWriter::try_new(file, schema, None).context("creating parquet writer")?;
    writer.write(&batch).context("writing record batch")?;
    writer.close().context("closing parquet writer")?;
    Ok(())
}

fn main() -> Result<()> {
    env_logger::init();
    let args = Args::parse();
    let mut rng = SimpleRng::new(args.seed);

    let patients = patients(&mut rng, args.patients);
    let events = events(&mut rng, &patients);

    std::fs::create_dir_all(&args.out_dir)
        .with_context(|| format!("creating {}", args.out_dir.display()))?;
    for (stem, table) in [("patients", &patients), ("events", &events)] {
        write_csv(&args.out_dir.join(format!("{stem}.csv")), table)?;
        write_parquet(&args.out_dir.join(format!("{stem}.parquet")), table)?;
    }

    println!(
        "Wrote {} patients and {} events to {}",
        patients.rows.len(),
        events.rows.len(),
        args.out_dir.display()
    );
    Ok(())
}
