use std::{collections::HashMap, fmt, str::FromStr};

use serde::Deserialize;

use crate::Error;

/// Storage type of a staging table column.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(try_from = "String")]
pub enum ColumnType {
    TinyInt,
    Int,
    Decimal { precision: u8, scale: u8 },
    VarChar(u16),
}

impl ColumnType {
    pub const DEFAULT: ColumnType = ColumnType::VarChar(255);
}

impl fmt::Display for ColumnType {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self {
            ColumnType::TinyInt => write!(f, "TINYINT"),
            ColumnType::Int => write!(f, "INT"),
            ColumnType::Decimal { precision, scale } => {
                write!(f, "DECIMAL({},{})", precision, scale)
            }
            ColumnType::VarChar(len) => write!(f, "VARCHAR({})", len),
        }
    }
}

impl FromStr for ColumnType {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self, Error> {
        let invalid = || Error::Config(format!("unsupported column type {:?}", s));
        let normalized: String = s
            .chars()
            .filter(|c| !c.is_whitespace())
            .collect::<String>()
            .to_ascii_uppercase();
        let (name, args) = match normalized.find('(') {
            Some(open) => {
                let args = normalized[open + 1..]
                    .strip_suffix(')')
                    .ok_or_else(invalid)?;
                (&normalized[..open], Some(args))
            }
            None => (normalized.as_str(), None),
        };
        match (name, args) {
            ("TINYINT", None) => Ok(ColumnType::TinyInt),
            ("INT", None) | ("INTEGER", None) => Ok(ColumnType::Int),
            ("DECIMAL", Some(args)) => {
                let mut parts = args.splitn(2, ',');
                let precision = parts.next().and_then(|p| p.parse().ok());
                let scale = parts.next().and_then(|p| p.parse().ok());
                match (precision, scale) {
                    (Some(precision), Some(scale)) if scale <= precision => {
                        Ok(ColumnType::Decimal { precision, scale })
                    }
                    _ => Err(invalid()),
                }
            }
            ("VARCHAR", Some(len)) => len.parse().map(ColumnType::VarChar).map_err(|_| invalid()),
            _ => Err(invalid()),
        }
    }
}

impl std::convert::TryFrom<String> for ColumnType {
    type Error = Error;

    fn try_from(s: String) -> Result<Self, Error> {
        s.parse()
    }
}

/// Maps column names to storage types, falling back to a default for
/// columns without an override.
#[derive(Debug, Clone, PartialEq)]
pub struct ColumnTypes {
    overrides: HashMap<String, ColumnType>,
    default: ColumnType,
}

impl ColumnTypes {
    pub fn new(overrides: HashMap<String, ColumnType>, default: ColumnType) -> Self {
        ColumnTypes { overrides, default }
    }

    /// The overrides used for GTFS feeds.
    pub fn gtfs() -> Self {
        use ColumnType::*;

        const COORDINATE: ColumnType = Decimal {
            precision: 10,
            scale: 6,
        };
        let overrides = [
            // calendar.txt
            ("monday", TinyInt),
            ("tuesday", TinyInt),
            ("wednesday", TinyInt),
            ("thursday", TinyInt),
            ("friday", TinyInt),
            ("saturday", TinyInt),
            ("sunday", TinyInt),
            ("start_date", VarChar(8)),
            ("end_date", VarChar(8)),
            // calendar_dates.txt
            ("date", VarChar(8)),
            ("exception_type", TinyInt),
            // fare_attributes.txt
            ("price", COORDINATE),
            ("payment_method", TinyInt),
            ("transfers", VarChar(10)),
            ("transfer_duration", Int),
            // frequencies.txt
            ("headway_secs", Int),
            ("start_time", VarChar(10)),
            ("end_time", VarChar(10)),
            // routes.txt
            ("route_type", Int),
            // shapes.txt
            ("shape_pt_lat", COORDINATE),
            ("shape_pt_lon", COORDINATE),
            ("shape_pt_sequence", Int),
            (
                "shape_dist_traveled",
                Decimal {
                    precision: 10,
                    scale: 2,
                },
            ),
            // stops.txt
            ("stop_lat", COORDINATE),
            ("stop_lon", COORDINATE),
            // stop_times.txt
            ("arrival_time", VarChar(10)),
            ("departure_time", VarChar(10)),
            ("stop_sequence", Int),
            // trips.txt
            ("direction_id", TinyInt),
        ];
        ColumnTypes {
            overrides: overrides
                .iter()
                .map(|(name, ty)| (name.to_string(), *ty))
                .collect(),
            default: ColumnType::DEFAULT,
        }
    }

    pub fn resolve(&self, column: &str) -> ColumnType {
        self.overrides.get(column).copied().unwrap_or(self.default)
    }

    pub fn default_type(&self) -> ColumnType {
        self.default
    }

    pub fn overrides(&self) -> &HashMap<String, ColumnType> {
        &self.overrides
    }
}

/// A column of a table about to be created.
#[derive(Debug, Clone, PartialEq)]
pub struct ColumnDef {
    pub name: String,
    pub ty: ColumnType,
}

/// Resolve a storage type for each column of a header, keeping header order.
pub fn column_defs(columns: &[String], types: &ColumnTypes) -> Vec<ColumnDef> {
    columns
        .iter()
        .map(|name| ColumnDef {
            name: name.clone(),
            ty: types.resolve(name),
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;

    #[rstest]
    #[case("stop_lat", ColumnType::Decimal { precision: 10, scale: 6 })]
    #[case("arrival_time", ColumnType::VarChar(10))]
    #[case("stop_sequence", ColumnType::Int)]
    #[case("monday", ColumnType::TinyInt)]
    #[case("agency_id", ColumnType::VarChar(255))]
    fn resolves_gtfs_columns(#[case] column: &str, #[case] expected: ColumnType) {
        assert_eq!(ColumnTypes::gtfs().resolve(column), expected);
    }

    #[rstest]
    #[case("TINYINT", ColumnType::TinyInt)]
    #[case("int", ColumnType::Int)]
    #[case("DECIMAL(10, 2)", ColumnType::Decimal { precision: 10, scale: 2 })]
    #[case("varchar(8)", ColumnType::VarChar(8))]
    fn parses_type_names(#[case] text: &str, #[case] expected: ColumnType) {
        assert_eq!(text.parse::<ColumnType>().expect("valid type"), expected);
    }

    #[rstest]
    #[case("TEXT); DROP TABLE sp_stop; --")]
    #[case("DECIMAL(2,6)")]
    #[case("VARCHAR")]
    #[case("BLOB")]
    fn rejects_unsupported_type_names(#[case] text: &str) {
        assert!(text.parse::<ColumnType>().is_err());
    }

    #[test]
    fn renders_sql_type_names() {
        assert_eq!(
            ColumnType::Decimal {
                precision: 10,
                scale: 6
            }
            .to_string(),
            "DECIMAL(10,6)"
        );
        assert_eq!(ColumnType::DEFAULT.to_string(), "VARCHAR(255)");
    }

    #[test]
    fn column_defs_follow_header_order() {
        let columns = vec!["stop_name".to_string(), "stop_lat".to_string()];
        let defs = column_defs(&columns, &ColumnTypes::gtfs());
        assert_eq!(defs[0].name, "stop_name");
        assert_eq!(defs[0].ty, ColumnType::DEFAULT);
        assert_eq!(defs[1].name, "stop_lat");
    }
}
