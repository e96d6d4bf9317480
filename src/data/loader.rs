use std::collections::HashSet;
use std::io::Read;
use std::path::Path;
use std::sync::Arc;

use anyhow::{Context, Result, bail};
use arrow::array::{
    Array, AsArray, BooleanArray, Date32Array, Float32Array, Float64Array, Int32Array,
    Int64Array, StringArray, TimestampMillisecondArray,
};
use arrow::datatypes::{DataType, Field, TimeUnit};
use parquet::arrow::arrow_reader::ParquetRecordBatchReaderBuilder;

use super::model::{Column, ColumnType, Entity, EntityKind, EntityTable};
use crate::error::DataError;

/// Number of header rows in the CSV layout: column names, then column types.
pub const HEADER_ROW_COUNT: usize = 2;

/// Parquet field metadata key overriding the inferred column type.
pub const COLUMN_TYPE_METADATA_KEY: &str = "column_type";

/// A loaded table plus the non-fatal problems met while building it.
#[derive(Debug)]
pub struct LoadedTable {
    pub table: EntityTable,
    pub warnings: Vec<String>,
}

// ---------------------------------------------------------------------------
// Public entry-point
// ---------------------------------------------------------------------------

/// Load an entity table from a file.  Dispatch by extension.
///
/// Supported formats:
/// * `.csv`     – row 1 column names, row 2 column types, then data rows
/// * `.parquet` – one field per column, types inferred from the Arrow schema
pub fn load_file(path: &Path, kind: EntityKind) -> Result<LoadedTable> {
    let ext = path
        .extension()
        .and_then(|e| e.to_str())
        .unwrap_or("")
        .to_ascii_lowercase();

    let loaded = match ext.as_str() {
        "csv" => {
            let file = std::fs::File::open(path)
                .with_context(|| format!("opening {}", path.display()))?;
            load_csv(file, kind)
        }
        "parquet" | "pq" => load_parquet(path, kind),
        other => Err(DataError::UnsupportedExtension(other.to_string()).into()),
    }
    .with_context(|| format!("loading {} data from {}", kind.label(), path.display()))?;

    log::info!(
        "Loaded {} {} with columns {:?}",
        loaded.table.len(),
        kind,
        loaded.table.column_names()
    );
    Ok(loaded)
}

// ---------------------------------------------------------------------------
// CSV loader
// ---------------------------------------------------------------------------

/// Parse a CSV table from any reader. Empty lines are skipped.
pub fn load_csv<R: Read>(input: R, kind: EntityKind) -> Result<LoadedTable> {
    let mut reader = csv::ReaderBuilder::new()
        .has_headers(false)
        .flexible(true)
        .from_reader(input);

    let mut records = reader.records();
    let names = match records.next() {
        Some(r) => r.context("reading column names")?,
        None => bail!(DataError::MissingHeaderRows { entity: kind.label() }),
    };
    let types = match records.next() {
        Some(r) => r.context("reading column types")?,
        None => bail!(DataError::MissingHeaderRows { entity: kind.label() }),
    };
    if names.len() != types.len() {
        bail!(DataError::HeaderMismatch {
            names: names.len(),
            types: types.len(),
        });
    }

    let columns = names
        .iter()
        .zip(types.iter())
        .enumerate()
        .map(|(index, (name, ty))| Ok(Column::new(name.trim(), ty.parse()?, index)))
        .collect::<Result<Vec<_>, DataError>>()?;

    let mut raw_rows = Vec::new();
    for (row_no, result) in records.enumerate() {
        let record = result.with_context(|| format!("CSV row {}", row_no + HEADER_ROW_COUNT))?;
        raw_rows.push(record.iter().map(str::to_string).collect::<Vec<_>>());
    }

    build_table(kind, columns, raw_rows)
}

// ---------------------------------------------------------------------------
// Parquet loader
// ---------------------------------------------------------------------------

/// Load a Parquet file. Every field becomes a column; cells are stored as
/// the same raw strings the CSV layout would carry.
fn load_parquet(path: &Path, kind: EntityKind) -> Result<LoadedTable> {
    let file = std::fs::File::open(path).context("opening parquet file")?;
    let builder =
        ParquetRecordBatchReaderBuilder::try_new(file).context("reading parquet metadata")?;
    let columns = builder
        .schema()
        .fields()
        .iter()
        .enumerate()
        .map(|(index, field)| Ok(Column::new(field.name().clone(), field_column_type(field)?, index)))
        .collect::<Result<Vec<_>>>()?;
    let reader = builder.build().context("building parquet reader")?;

    let mut raw_rows = Vec::new();
    for batch_result in reader {
        let batch = batch_result.context("reading parquet record batch")?;
        for row in 0..batch.num_rows() {
            let values = (0..batch.num_columns())
                .map(|col| cell_to_string(batch.column(col), row))
                .collect::<Result<Vec<_>>>()
                .with_context(|| format!("Row {row}"))?;
            raw_rows.push(values);
        }
    }

    build_table(kind, columns, raw_rows)
}

fn field_column_type(field: &Field) -> Result<ColumnType> {
    if let Some(declared) = field.metadata().get(COLUMN_TYPE_METADATA_KEY) {
        return Ok(declared.parse()?);
    }
    Ok(match field.data_type() {
        DataType::Boolean => ColumnType::Boolean,
        DataType::Int32 | DataType::Int64 | DataType::Float32 | DataType::Float64 => {
            ColumnType::Number
        }
        DataType::Date32 => ColumnType::Date,
        DataType::Timestamp(TimeUnit::Millisecond, _) => ColumnType::Timestamp,
        DataType::Utf8 | DataType::LargeUtf8 => ColumnType::String,
        other => bail!("column '{}' has unsupported type {other:?}", field.name()),
    })
}

// -- Arrow helpers --

/// Render one Arrow cell as the raw string the filter predicates parse.
fn cell_to_string(col: &Arc<dyn Array>, row: usize) -> Result<String> {
    if col.is_null(row) {
        return Ok(String::new());
    }
    let value = match col.data_type() {
        DataType::Utf8 => col
            .as_any()
            .downcast_ref::<StringArray>()
            .context("expected StringArray")?
            .value(row)
            .to_string(),
        DataType::LargeUtf8 => col.as_string::<i64>().value(row).to_string(),
        DataType::Boolean => col
            .as_any()
            .downcast_ref::<BooleanArray>()
            .context("expected BooleanArray")?
            .value(row)
            .to_string(),
        DataType::Int32 => col
            .as_any()
            .downcast_ref::<Int32Array>()
            .context("expected Int32Array")?
            .value(row)
            .to_string(),
        DataType::Int64 => col
            .as_any()
            .downcast_ref::<Int64Array>()
            .context("expected Int64Array")?
            .value(row)
            .to_string(),
        DataType::Float32 => col
            .as_any()
            .downcast_ref::<Float32Array>()
            .context("expected Float32Array")?
            .value(row)
            .to_string(),
        DataType::Float64 => col
            .as_any()
            .downcast_ref::<Float64Array>()
            .context("expected Float64Array")?
            .value(row)
            .to_string(),
        DataType::Date32 => {
            let days = col
                .as_any()
                .downcast_ref::<Date32Array>()
                .context("expected Date32Array")?
                .value(row);
            // `yyyy-MM-dd` round-trips through the date parser.
            chrono::DateTime::from_timestamp_millis(i64::from(days) * 86_400_000)
                .map(|dt| dt.format("%Y-%m-%d").to_string())
                .with_context(|| format!("date out of range: {days} days"))?
        }
        DataType::Timestamp(TimeUnit::Millisecond, _) => col
            .as_any()
            .downcast_ref::<TimestampMillisecondArray>()
            .context("expected TimestampMillisecondArray")?
            .value(row)
            .to_string(),
        other => bail!("unsupported cell type {other:?}"),
    };
    Ok(value)
}

// ---------------------------------------------------------------------------
// Table assembly
// ---------------------------------------------------------------------------

/// Assign uids and drop malformed rows.
///
/// The uid is the cell of the table's id column (`pid` for patients, `eid`
/// for events); without such a column the data row number is used. Rows
/// with the wrong cell count, an empty id, or a duplicate id are skipped
/// with a warning.
fn build_table(
    kind: EntityKind,
    columns: Vec<Column>,
    raw_rows: Vec<Vec<String>>,
) -> Result<LoadedTable> {
    if raw_rows.is_empty() {
        bail!(DataError::NoDataRows { entity: kind.label() });
    }

    let id_index = columns
        .iter()
        .find(|c| c.column_type == kind.id_column_type())
        .map(|c| c.index);
    if id_index.is_none() {
        log::debug!("{kind} table has no {} column, using row numbers", kind.id_column_type());
    }

    let mut warnings = Vec::new();
    let mut seen = HashSet::with_capacity(raw_rows.len());
    let mut rows = Vec::with_capacity(raw_rows.len());

    for (row_no, values) in raw_rows.into_iter().enumerate() {
        let line = row_no + HEADER_ROW_COUNT + 1;
        if values.len() != columns.len() {
            warnings.push(format!(
                "{} row {line}: expected {} values but found {}, row skipped",
                kind.label(),
                columns.len(),
                values.len()
            ));
            continue;
        }
        let uid = match id_index {
            Some(i) => values[i].trim().to_string(),
            None => row_no.to_string(),
        };
        if uid.is_empty() {
            warnings.push(format!("{} row {line}: empty identifier, row skipped", kind.label()));
            continue;
        }
        if !seen.insert(uid.clone()) {
            warnings.push(format!(
                "{} row {line}: duplicate identifier '{uid}', row skipped",
                kind.label()
            ));
            continue;
        }
        rows.push(Entity::new(uid, values));
    }

    for w in &warnings {
        log::warn!("{w}");
    }
    if rows.is_empty() {
        bail!(DataError::NoDataRows { entity: kind.label() });
    }

    Ok(LoadedTable {
        table: EntityTable::new(kind, columns, rows),
        warnings,
    })
}
