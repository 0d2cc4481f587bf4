use std::{
    fmt,
    fs::File,
    io,
    path::{Path, PathBuf},
};

use crate::Error;

/// A data row; `None` marks a field that was empty after cleaning.
pub type Row = Vec<Option<String>>;

const BOM: char = '\u{feff}';

/// A comma-separated feed file, opened and positioned after its header.
pub struct FeedReader {
    path: PathBuf,
    columns: Vec<String>,
    reader: csv::Reader<File>,
}

impl FeedReader {
    pub fn open(path: impl AsRef<Path>) -> Result<Self, Error> {
        let path = path.as_ref();
        let file = File::open(path).map_err(|e| {
            if e.kind() == io::ErrorKind::NotFound {
                Error::MissingFile(path.to_owned())
            } else {
                Error::Csv {
                    path: path.to_owned(),
                    source: e.into(),
                }
            }
        })?;
        let mut reader = csv::ReaderBuilder::new()
            .has_headers(false)
            .flexible(true)
            .from_reader(file);
        let mut header = csv::StringRecord::new();
        let found = reader.read_record(&mut header).map_err(|source| Error::Csv {
            path: path.to_owned(),
            source,
        })?;
        if !found {
            return Err(Error::EmptyFile(path.to_owned()));
        }
        let columns = header
            .iter()
            .enumerate()
            .map(|(i, field)| {
                let field = if i == 0 {
                    field.trim_start_matches(BOM)
                } else {
                    field
                };
                clean_field(field).to_owned()
            })
            .collect();
        Ok(FeedReader {
            path: path.to_owned(),
            columns,
            reader,
        })
    }

    /// Column names from the header record, cleaned like data fields.
    pub fn columns(&self) -> &[String] {
        &self.columns
    }

    /// Consume the reader, yielding the remaining records as cleaned rows.
    pub fn rows(self) -> Rows {
        Rows {
            records: self.reader.into_records(),
            path: self.path,
            width: self.columns.len(),
        }
    }
}

impl fmt::Debug for FeedReader {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        f.debug_struct("FeedReader")
            .field("path", &self.path)
            .field("columns", &self.columns)
            .finish()
    }
}

/// Lazily parsed data rows of a feed file.
pub struct Rows {
    records: csv::StringRecordsIntoIter<File>,
    path: PathBuf,
    width: usize,
}

impl Iterator for Rows {
    type Item = Result<Row, Error>;

    fn next(&mut self) -> Option<Self::Item> {
        let record = match self.records.next()? {
            Ok(record) => record,
            Err(source) => {
                return Some(Err(Error::Csv {
                    path: self.path.clone(),
                    source,
                }))
            }
        };
        if record.len() > self.width {
            return Some(Err(Error::MalformedRow {
                path: self.path.clone(),
                line: record.position().map_or(0, |pos| pos.line()),
                expected: self.width,
                found: record.len(),
            }));
        }
        let mut row: Row = record.iter().map(normalize_field).collect();
        row.resize(self.width, None);
        Some(Ok(row))
    }
}

/// Trim surrounding whitespace and one layer of enclosing double quotes.
pub fn clean_field(field: &str) -> &str {
    let field = field.trim();
    field
        .strip_prefix('"')
        .and_then(|inner| inner.strip_suffix('"'))
        .map_or(field, str::trim)
}

/// Clean a field, mapping empty results to `None`.
pub fn normalize_field(field: &str) -> Option<String> {
    match clean_field(field) {
        "" => None,
        cleaned => Some(cleaned.to_owned()),
    }
}

#[cfg(test)]
mod tests {
    use std::fs;

    use super::*;
    use rstest::{fixture, rstest};
    use tempfile::TempDir;

    #[fixture]
    fn temp_dir() -> TempDir {
        TempDir::new().expect("create temp dir")
    }

    fn write_feed(dir: &TempDir, name: &str, content: &str) -> PathBuf {
        let path = dir.path().join(name);
        fs::write(&path, content).expect("write feed file");
        path
    }

    #[rstest]
    #[case("  Main St ", Some("Main St"))]
    #[case("\"\"", None)]
    #[case("   ", None)]
    #[case("", None)]
    #[case("\" quoted \"", Some("quoted"))]
    #[case("\"", Some("\""))]
    fn normalizes_fields(#[case] raw: &str, #[case] expected: Option<&str>) {
        assert_eq!(normalize_field(raw).as_deref(), expected);
    }

    #[rstest]
    fn reads_header_and_rows(temp_dir: TempDir) {
        let path = write_feed(
            &temp_dir,
            "stops.txt",
            "stop_id,stop_lat,stop_lon,stop_name\n1,40.7,-74.0,Main St\n2,,,\n",
        );
        let feed = FeedReader::open(&path).expect("open feed");
        assert_eq!(
            feed.columns(),
            &["stop_id", "stop_lat", "stop_lon", "stop_name"]
        );
        let rows: Vec<Row> = feed
            .rows()
            .collect::<Result<_, _>>()
            .expect("read rows");
        assert_eq!(rows.len(), 2);
        assert_eq!(
            rows[0],
            vec![
                Some("1".to_string()),
                Some("40.7".to_string()),
                Some("-74.0".to_string()),
                Some("Main St".to_string())
            ]
        );
        assert_eq!(rows[1], vec![Some("2".to_string()), None, None, None]);
    }

    #[rstest]
    fn strips_byte_order_mark_and_quotes_from_header(temp_dir: TempDir) {
        let path = write_feed(
            &temp_dir,
            "routes.txt",
            "\u{feff}\"route_id\", route_type \nR1,3\n",
        );
        let feed = FeedReader::open(&path).expect("open feed");
        assert_eq!(feed.columns(), &["route_id", "route_type"]);
    }

    #[rstest]
    fn pads_short_rows(temp_dir: TempDir) {
        let path = write_feed(&temp_dir, "trips.txt", "route_id,trip_id,direction_id\nR1,T1\n");
        let rows: Vec<Row> = FeedReader::open(&path)
            .expect("open feed")
            .rows()
            .collect::<Result<_, _>>()
            .expect("read rows");
        assert_eq!(
            rows[0],
            vec![Some("R1".to_string()), Some("T1".to_string()), None]
        );
    }

    #[rstest]
    fn rejects_long_rows(temp_dir: TempDir) {
        let path = write_feed(&temp_dir, "trips.txt", "route_id,trip_id\nR1,T1\nR2,T2,extra\n");
        let mut rows = FeedReader::open(&path).expect("open feed").rows();
        assert!(rows.next().expect("first row").is_ok());
        match rows.next().expect("second row") {
            Err(Error::MalformedRow {
                line,
                expected,
                found,
                ..
            }) => {
                assert_eq!(line, 3);
                assert_eq!(expected, 2);
                assert_eq!(found, 3);
            }
            other => panic!("expected malformed row, got {:?}", other),
        }
    }

    #[rstest]
    fn missing_file_is_reported(temp_dir: TempDir) {
        let err = FeedReader::open(temp_dir.path().join("shapes.txt")).expect_err("missing");
        assert!(matches!(err, Error::MissingFile(_)));
    }

    #[rstest]
    fn empty_file_has_no_header(temp_dir: TempDir) {
        let path = write_feed(&temp_dir, "shapes.txt", "");
        let err = FeedReader::open(&path).expect_err("empty");
        assert!(matches!(err, Error::EmptyFile(_)));
    }
}
