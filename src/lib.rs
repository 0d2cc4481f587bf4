mod config;
mod error;
mod feed;
mod import;
mod load;
mod schema;
mod sqlite;
mod swap;
mod util;

pub use config::{ImportConfig, TableSource};
pub use error::{ConfigFileError, Error};
pub use feed::{clean_field, normalize_field, FeedReader, Row, Rows};
pub use import::{Importer, Summary};
pub use load::{create_staging, load, staging_name, DEFAULT_BATCH_SIZE, PROGRESS_INTERVAL};
pub use schema::{column_defs, ColumnDef, ColumnType, ColumnTypes};
pub use sqlite::{Db, ForeignKeysSuspended, Transaction};
pub use swap::{backup_name, swap};
pub use util::{quote_ident, validate_ident};

/// A relational store that staging tables can be loaded into and swapped
/// from.
///
/// The swap protocol relies on two capabilities of the backend:
///
/// - `rename_table` is atomic: once it returns, `to` names the complete
///   table and `from` no longer resolves, with no moment in between where
///   neither or both exist.
/// - Renames do not collide silently; renaming onto an existing table name
///   must fail rather than replace it.
///
/// Table names passed in have been through [`validate_ident`];
/// implementations are still responsible for quoting them.
pub trait Store {
    fn table_exists(&self, name: &str) -> Result<bool, Error>;
    /// Drop a table if it exists.
    fn drop_table(&self, name: &str) -> Result<(), Error>;
    fn create_table(&self, name: &str, columns: &[ColumnDef]) -> Result<(), Error>;
    fn rename_table(&self, from: &str, to: &str) -> Result<(), Error>;
    /// Insert a batch of rows, positionally matched to `columns`.
    fn insert_rows(&self, table: &str, columns: &[String], rows: &[Row]) -> Result<(), Error>;
}
