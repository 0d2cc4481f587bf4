use std::path::Path;

use tracing::{error, info, warn};

use crate::{
    config::{ImportConfig, TableSource},
    feed::FeedReader,
    load::{create_staging, load, staging_name, DEFAULT_BATCH_SIZE},
    sqlite::Db,
    swap::swap,
    Error, Store,
};

/// Outcome of an import run.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Summary {
    pub succeeded: usize,
    pub failed: usize,
    pub rows_loaded: u64,
    /// Tables whose import failed, in processing order.
    pub failed_tables: Vec<String>,
}

impl Summary {
    pub fn is_complete(&self) -> bool {
        self.failed == 0
    }
}

#[derive(Debug, Clone)]
pub struct Importer {
    config: ImportConfig,
    batch_size: usize,
}

impl Importer {
    pub fn new(config: ImportConfig) -> Self {
        Importer {
            config,
            batch_size: DEFAULT_BATCH_SIZE,
        }
    }

    pub fn batch_size(mut self, batch_size: usize) -> Self {
        self.batch_size = batch_size;
        self
    }

    /// Import every mapped file found in `base_dir`, one transaction per file.
    ///
    /// A file that fails to import is logged, rolled back and counted; the
    /// remaining files are still processed. Only errors that leave the
    /// database unusable end the run early.
    pub fn run(&self, db: &mut Db, base_dir: impl AsRef<Path>) -> Result<Summary, Error> {
        let base_dir = base_dir.as_ref();
        let mut db = db.suspend_foreign_keys()?;
        let mut summary = Summary::default();
        for source in self.config.tables() {
            let path = base_dir.join(&source.file);
            info!("importing {} -> {}", source.file, source.table);
            match self.import_file(&mut db, source, &path) {
                Ok(rows) => {
                    summary.succeeded += 1;
                    summary.rows_loaded += rows;
                }
                Err(Error::MissingFile(path)) => {
                    warn!("file not found: {}", path.display());
                    summary.failed += 1;
                    summary.failed_tables.push(source.table.clone());
                }
                Err(e) if e.is_fatal() => {
                    error!("error importing {} into {}: {}", source.file, source.table, e);
                    return Err(e);
                }
                Err(e) => {
                    error!("error importing {} into {}: {}", source.file, source.table, e);
                    discard_staging(&mut db, &source.table)?;
                    summary.failed += 1;
                    summary.failed_tables.push(source.table.clone());
                }
            }
        }
        info!(
            "import completed: {} succeeded, {} failed",
            summary.succeeded, summary.failed
        );
        Ok(summary)
    }

    fn import_file(&self, db: &mut Db, source: &TableSource, path: &Path) -> Result<u64, Error> {
        let feed = FeedReader::open(path)?;
        let columns = feed.columns().to_vec();
        info!("  columns: {}", columns.join(", "));
        let tx = db.transaction()?;
        let staging = create_staging(&tx, &source.table, &columns, self.config.column_types())?;
        let rows = load(&tx, &staging, &columns, feed.rows(), self.batch_size)?;
        swap(&tx, &source.table, &staging)?;
        tx.commit()?;
        Ok(rows)
    }
}

/// Drop a staging table left by a failed import.
///
/// The failed transaction has already been rolled back, which removes the
/// staging table on SQLite; this only matters for a staging table that a
/// previous run committed and never swapped in.
fn discard_staging(db: &mut Db, table: &str) -> Result<(), Error> {
    let tx = db.transaction()?;
    match tx.drop_table(&staging_name(table)) {
        Ok(()) => tx.commit(),
        Err(e) if e.is_fatal() => Err(e),
        Err(e) => {
            warn!("could not drop staging table for {}: {}", table, e);
            Ok(())
        }
    }
}
