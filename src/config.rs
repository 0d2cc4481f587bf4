use std::{
    collections::{HashMap, HashSet},
    fs,
    path::Path,
};

use serde::Deserialize;

use crate::{
    error::ConfigFileError,
    schema::{ColumnType, ColumnTypes},
    util::validate_ident,
    Error,
};

/// A live table and the feed file it is loaded from.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct TableSource {
    pub table: String,
    pub file: String,
}

/// Everything an import run needs to know besides the store and the input
/// directory.
#[derive(Debug, Clone)]
pub struct ImportConfig {
    tables: Vec<TableSource>,
    column_types: ColumnTypes,
}

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
struct ConfigFile {
    tables: Vec<TableSource>,
    #[serde(default)]
    column_types: Option<HashMap<String, ColumnType>>,
    #[serde(default)]
    default_type: Option<ColumnType>,
}

const GTFS_TABLES: &[(&str, &str)] = &[
    ("sp_calendar", "calendar.txt"),
    ("sp_fare_att", "fare_attributes.txt"),
    ("sp_fare_rules", "fare_rules.txt"),
    ("sp_frequencies", "frequencies.txt"),
    ("sp_routes", "routes.txt"),
    ("sp_shapes", "shapes.txt"),
    ("sp_stop", "stops.txt"),
    ("sp_stop_times", "stop_times.txt"),
    ("sp_trip", "trips.txt"),
];

impl ImportConfig {
    /// Build a configuration, checking that table names are usable and
    /// unique.
    pub fn new(tables: Vec<TableSource>, column_types: ColumnTypes) -> Result<Self, Error> {
        let mut seen = HashSet::new();
        for source in &tables {
            validate_ident(&source.table)?;
            if !seen.insert(source.table.as_str()) {
                return Err(Error::Config(format!(
                    "table {} is mapped more than once",
                    source.table
                )));
            }
            if source.file.is_empty() {
                return Err(Error::Config(format!(
                    "table {} has no source file",
                    source.table
                )));
            }
        }
        Ok(ImportConfig {
            tables,
            column_types,
        })
    }

    /// The built-in GTFS table mapping and column types.
    pub fn gtfs() -> Self {
        ImportConfig {
            tables: GTFS_TABLES
                .iter()
                .map(|(table, file)| TableSource {
                    table: table.to_string(),
                    file: file.to_string(),
                })
                .collect(),
            column_types: ColumnTypes::gtfs(),
        }
    }

    /// Load a configuration from a JSON file.
    ///
    /// Column types and the default type are optional; when missing, the
    /// built-in GTFS ones are used.
    pub fn from_file(path: impl AsRef<Path>) -> Result<Self, Error> {
        let path = path.as_ref();
        let wrap = |source: ConfigFileError| Error::ConfigFile {
            path: path.to_owned(),
            source,
        };
        let text = fs::read_to_string(path).map_err(|e| wrap(e.into()))?;
        let file: ConfigFile = serde_json::from_str(&text).map_err(|e| wrap(e.into()))?;
        let builtin = ColumnTypes::gtfs();
        let column_types = match (file.column_types, file.default_type) {
            (None, None) => builtin,
            (overrides, default) => ColumnTypes::new(
                overrides.unwrap_or_else(|| builtin.overrides().clone()),
                default.unwrap_or_else(|| builtin.default_type()),
            ),
        };
        ImportConfig::new(file.tables, column_types)
    }

    pub fn tables(&self) -> &[TableSource] {
        &self.tables
    }

    pub fn column_types(&self) -> &ColumnTypes {
        &self.column_types
    }
}
