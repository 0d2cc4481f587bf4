use std::{
    ops::{Deref, DerefMut},
    path::Path,
};

use rusqlite::{params_from_iter, Connection, OptionalExtension};
use tracing::{debug, warn};

use crate::{util::quote_ident, ColumnDef, Error, Row, Store};

#[derive(Debug)]
pub struct Db {
    conn: Connection,
}

impl Db {
    pub fn open(path: impl AsRef<Path>) -> Result<Self, Error> {
        let path = path.as_ref();
        let conn = Connection::open(path).map_err(|source| Error::Connection {
            path: path.to_owned(),
            source,
        })?;
        // Opening is lazy; touch the schema so an unusable file fails here.
        conn.query_row("SELECT count(*) FROM sqlite_master", [], |row| {
            row.get::<_, i64>(0)
        })
        .map_err(|source| Error::Connection {
            path: path.to_owned(),
            source,
        })?;
        Ok(Db { conn })
    }

    pub fn open_in_memory() -> Result<Self, Error> {
        let conn = Connection::open_in_memory().map_err(|source| Error::Connection {
            path: ":memory:".into(),
            source,
        })?;
        Ok(Db { conn })
    }

    pub fn connection(&self) -> &Connection {
        &self.conn
    }

    pub fn transaction(&mut self) -> Result<Transaction<'_>, Error> {
        Ok(Transaction {
            tx: self
                .conn
                .transaction()
                .map_err(|source| Error::Transaction {
                    operation: "begin transaction",
                    source,
                })?,
        })
    }

    /// Turn off foreign key enforcement until the returned guard is dropped.
    ///
    /// Legacy rename semantics are switched on for the same span, so that
    /// renaming a live table to its backup name leaves views and triggers
    /// pointing at the live name. Both settings are restored to their
    /// previous values on drop.
    pub fn suspend_foreign_keys(&mut self) -> Result<ForeignKeysSuspended<'_>, Error> {
        let foreign_keys = self.pragma_bool("foreign_keys")?;
        let legacy_alter_table = self.pragma_bool("legacy_alter_table")?;
        self.set_pragma("foreign_keys", false)?;
        self.set_pragma("legacy_alter_table", true)?;
        debug!("foreign key enforcement suspended");
        Ok(ForeignKeysSuspended {
            db: self,
            foreign_keys,
            legacy_alter_table,
        })
    }

    fn pragma_bool(&self, name: &str) -> Result<bool, Error> {
        self.conn
            .pragma_query_value(None, name, |row| row.get(0))
            .map_err(|source| Error::Transaction {
                operation: "query pragma",
                source,
            })
    }

    fn set_pragma(&self, name: &str, value: bool) -> Result<(), Error> {
        self.conn
            .pragma_update(None, name, value)
            .map_err(|source| Error::Transaction {
                operation: "update pragma",
                source,
            })
    }
}

/// Scope during which foreign key enforcement is off; see
/// [`Db::suspend_foreign_keys`].
#[derive(Debug)]
pub struct ForeignKeysSuspended<'db> {
    db: &'db mut Db,
    foreign_keys: bool,
    legacy_alter_table: bool,
}

impl<'db> Deref for ForeignKeysSuspended<'db> {
    type Target = Db;

    fn deref(&self) -> &Db {
        self.db
    }
}

impl<'db> DerefMut for ForeignKeysSuspended<'db> {
    fn deref_mut(&mut self) -> &mut Db {
        self.db
    }
}

impl<'db> Drop for ForeignKeysSuspended<'db> {
    fn drop(&mut self) {
        let restored = self
            .db
            .set_pragma("legacy_alter_table", self.legacy_alter_table)
            .and_then(|_| self.db.set_pragma("foreign_keys", self.foreign_keys));
        match restored {
            Ok(()) => debug!("foreign key enforcement restored"),
            Err(e) => warn!("could not restore foreign key enforcement: {}", e),
        }
    }
}

pub struct Transaction<'conn> {
    tx: rusqlite::Transaction<'conn>,
}

impl<'conn> Transaction<'conn> {
    pub fn commit(self) -> Result<(), Error> {
        self.tx.commit().map_err(|source| Error::Transaction {
            operation: "commit transaction",
            source,
        })
    }

    fn ddl(&self, operation: &'static str, table: &str, sql: &str) -> Result<(), Error> {
        self.tx
            .execute(sql, [])
            .map(|_| ())
            .map_err(|source| Error::Ddl {
                operation,
                table: table.to_owned(),
                source,
            })
    }
}

impl<'conn> Store for Transaction<'conn> {
    fn table_exists(&self, name: &str) -> Result<bool, Error> {
        self.tx
            .query_row(
                "SELECT 1 FROM sqlite_master WHERE type = 'table' AND name = ?1",
                [name],
                |_| Ok(()),
            )
            .optional()
            .map(|found| found.is_some())
            .map_err(|source| Error::Ddl {
                operation: "look up",
                table: name.to_owned(),
                source,
            })
    }

    fn drop_table(&self, name: &str) -> Result<(), Error> {
        self.ddl(
            "drop",
            name,
            &format!("DROP TABLE IF EXISTS {}", quote_ident(name)),
        )
    }

    fn create_table(&self, name: &str, columns: &[ColumnDef]) -> Result<(), Error> {
        let columns_sql = columns
            .iter()
            .map(|col| format!("{} {}", quote_ident(&col.name), col.ty))
            .collect::<Vec<_>>()
            .join(", ");
        self.ddl(
            "create",
            name,
            &format!("CREATE TABLE {} ({})", quote_ident(name), columns_sql),
        )
    }

    fn rename_table(&self, from: &str, to: &str) -> Result<(), Error> {
        self.ddl(
            "rename",
            from,
            &format!(
                "ALTER TABLE {} RENAME TO {}",
                quote_ident(from),
                quote_ident(to)
            ),
        )
    }

    fn insert_rows(&self, table: &str, columns: &[String], rows: &[Row]) -> Result<(), Error> {
        let wrap = |source| Error::Insert {
            table: table.to_owned(),
            source,
        };
        let columns_sql = columns
            .iter()
            .map(|col| quote_ident(col))
            .collect::<Vec<_>>()
            .join(", ");
        let placeholders = (1..=columns.len())
            .map(|i| format!("?{}", i))
            .collect::<Vec<_>>()
            .join(", ");
        let mut stmt = self
            .tx
            .prepare_cached(&format!(
                "INSERT INTO {} ({}) VALUES ({})",
                quote_ident(table),
                columns_sql,
                placeholders
            ))
            .map_err(wrap)?;
        for row in rows {
            stmt.execute(params_from_iter(row.iter())).map_err(wrap)?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ColumnType;
    use rstest::{fixture, rstest};

    #[fixture]
    fn db() -> Db {
        Db::open_in_memory().expect("open in-memory database")
    }

    fn foreign_keys(db: &Db) -> bool {
        db.connection()
            .pragma_query_value(None, "foreign_keys", |row| row.get(0))
            .expect("query foreign_keys")
    }

    #[rstest]
    fn suspends_and_restores_foreign_keys(mut db: Db) {
        db.connection()
            .pragma_update(None, "foreign_keys", true)
            .expect("enable foreign keys");
        {
            let guard = db.suspend_foreign_keys().expect("suspend");
            assert!(!foreign_keys(&guard));
        }
        assert!(foreign_keys(&db));
    }

    #[rstest]
    fn creates_renames_and_drops_tables(mut db: Db) {
        let tx = db.transaction().expect("begin");
        let columns = vec![ColumnDef {
            name: "stop_id".into(),
            ty: ColumnType::DEFAULT,
        }];
        tx.create_table("sp_stop_temp", &columns).expect("create");
        assert!(tx.table_exists("sp_stop_temp").expect("lookup"));
        tx.rename_table("sp_stop_temp", "sp_stop").expect("rename");
        assert!(!tx.table_exists("sp_stop_temp").expect("lookup"));
        assert!(tx.table_exists("sp_stop").expect("lookup"));
        tx.drop_table("sp_stop").expect("drop");
        tx.drop_table("sp_stop").expect("drop missing table");
        assert!(!tx.table_exists("sp_stop").expect("lookup"));
    }

    #[rstest]
    fn hostile_column_names_are_quoted(mut db: Db) {
        let name = r#"x" TEXT); DROP TABLE victim; --"#;
        db.connection()
            .execute_batch("CREATE TABLE victim (id INT)")
            .expect("create victim");
        let tx = db.transaction().expect("begin");
        let columns = vec![ColumnDef {
            name: name.into(),
            ty: ColumnType::DEFAULT,
        }];
        tx.create_table("sp_stop_temp", &columns).expect("create");
        tx.insert_rows(
            "sp_stop_temp",
            &[name.to_string()],
            &[vec![Some("1".into())]],
        )
        .expect("insert");
        assert!(tx.table_exists("victim").expect("lookup"));
    }

    #[rstest]
    fn rejects_rows_wider_than_columns(mut db: Db) {
        let tx = db.transaction().expect("begin");
        let columns = vec![ColumnDef {
            name: "stop_id".into(),
            ty: ColumnType::DEFAULT,
        }];
        tx.create_table("sp_stop_temp", &columns).expect("create");
        let err = tx
            .insert_rows(
                "sp_stop_temp",
                &["stop_id".to_string()],
                &[vec![Some("1".into()), Some("2".into())]],
            )
            .expect_err("too many values");
        assert!(matches!(err, Error::Insert { .. }));
    }
}
