use tracing::info;

use crate::{
    schema::{column_defs, ColumnTypes},
    util::validate_ident,
    Error, Row, Store,
};

pub const DEFAULT_BATCH_SIZE: usize = 1000;
/// Rows between two progress messages.
pub const PROGRESS_INTERVAL: u64 = 10_000;

pub fn staging_name(table: &str) -> String {
    format!("{}_temp", table)
}

/// Create an empty staging table for `table`, replacing any leftover from an
/// earlier run. Returns the staging table's name.
pub fn create_staging<S: Store + ?Sized>(
    store: &S,
    table: &str,
    columns: &[String],
    types: &ColumnTypes,
) -> Result<String, Error> {
    validate_ident(table)?;
    for column in columns {
        validate_ident(column)?;
    }
    let staging = staging_name(table);
    store.drop_table(&staging)?;
    store.create_table(&staging, &column_defs(columns, types))?;
    info!("created staging table {}", staging);
    Ok(staging)
}

/// Insert `rows` into `table` in batches of `batch_size`, returning the
/// number of rows inserted.
pub fn load<S, I>(
    store: &S,
    table: &str,
    columns: &[String],
    rows: I,
    batch_size: usize,
) -> Result<u64, Error>
where
    S: Store + ?Sized,
    I: IntoIterator<Item = Result<Row, Error>>,
{
    if batch_size == 0 {
        return Err(Error::InvalidBatchSize);
    }
    let mut row_count = 0;
    let mut batch = Vec::with_capacity(batch_size);
    for row in rows {
        batch.push(row?);
        if batch.len() >= batch_size {
            row_count = flush(store, table, columns, &mut batch, row_count)?;
        }
    }
    if !batch.is_empty() {
        row_count = flush(store, table, columns, &mut batch, row_count)?;
    }
    info!("loaded {} rows into {}", row_count, table);
    Ok(row_count)
}

fn flush<S: Store + ?Sized>(
    store: &S,
    table: &str,
    columns: &[String],
    batch: &mut Vec<Row>,
    loaded: u64,
) -> Result<u64, Error> {
    store.insert_rows(table, columns, batch)?;
    let row_count = loaded + batch.len() as u64;
    batch.clear();
    if row_count / PROGRESS_INTERVAL > loaded / PROGRESS_INTERVAL {
        info!("  loaded {} rows...", row_count);
    }
    Ok(row_count)
}
