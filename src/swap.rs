use tracing::info;

use crate::{Error, Store};

pub fn backup_name(table: &str) -> String {
    format!("{}_backup", table)
}

/// Replace `live` with `staging`.
///
/// The outgoing live table is renamed to its backup name before the staging
/// table takes its place, and only dropped afterwards. If this sequence is
/// interrupted, a backup table is what remains; the next swap for the same
/// table removes it.
pub fn swap<S: Store + ?Sized>(store: &S, live: &str, staging: &str) -> Result<(), Error> {
    let backup = backup_name(live);
    if store.table_exists(live)? {
        store.drop_table(&backup)?;
        store.rename_table(live, &backup)?;
    }
    store.rename_table(staging, live)?;
    // Also absorbs a backup left by a crash between the two renames.
    store.drop_table(&backup)?;
    info!("swapped tables: {} -> {}", staging, live);
    Ok(())
}
